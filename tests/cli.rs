mod common;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

use common::{SAMPLE_FILE, TestWorkspace, fixture_path};

fn report() -> Command {
    Command::cargo_bin("sales-report").expect("binary exists")
}

fn sample_arg() -> String {
    fixture_path(SAMPLE_FILE).to_str().unwrap().to_string()
}

#[test]
fn overview_prints_metrics_and_cleaned_rows() {
    report()
        .args(["-i", &sample_arg(), "overview", "--rows", "3"])
        .assert()
        .success()
        .stdout(contains("Business overview"))
        .stdout(contains("$1,455,000"))
        .stdout(contains("Cleaned sales data (3 of 9 rows)"))
        .stdout(contains("dropped without net revenue"));
}

#[test]
fn sales_view_lists_months_categories_and_cities() {
    report()
        .args(["sales", "--input", &sample_arg()])
        .assert()
        .success()
        .stdout(contains("## Monthly net revenue"))
        .stdout(contains("2024-03"))
        .stdout(contains("## Revenue by category"))
        .stdout(contains("Barranquilla"));
}

#[test]
fn products_view_respects_top() {
    report()
        .args(["-i", &sample_arg(), "products", "--top", "2"])
        .assert()
        .success()
        .stdout(contains("## Top 2 products by revenue"))
        .stdout(contains("Monitor 24"))
        .stdout(contains("Teclado").not())
        .stdout(contains("## Revenue by manufacturer"));
}

#[test]
fn group_view_emits_json() {
    let output = report()
        .args([
            "-i",
            &sample_arg(),
            "--format",
            "json",
            "group",
            "--by",
            "canal",
            "--measure",
            "quantity",
            "--sort",
        ])
        .output()
        .expect("run");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    let rows = &json["sections"][0]["data"]["rows"];
    assert_eq!(rows[0]["key"], "web");
    assert_eq!(rows[0]["value"], "8");
    assert_eq!(rows[1]["key"], "tienda");
    assert_eq!(rows[1]["value"], "8");
}

#[test]
fn unknown_group_column_fails() {
    report()
        .args(["-i", &sample_arg(), "group", "--by", "region"])
        .assert()
        .failure()
        .stderr(contains("unknown column 'region'"));
}

#[test]
fn missing_source_reports_data_unavailable() {
    let workspace = TestWorkspace::new();
    let missing = workspace.path().join("reporte_ventas_final.csv");
    report()
        .args(["-i", missing.to_str().unwrap(), "overview"])
        .assert()
        .failure()
        .stderr(contains("data unavailable"));
}

#[test]
fn missing_columns_report_schema_mismatch() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("ventas.csv", "order_id,order_date\n1,2024-01-01\n");
    report()
        .args(["-i", path.to_str().unwrap(), "sales"])
        .assert()
        .failure()
        .stderr(contains("data unavailable").and(contains("missing required column(s)")));
}
