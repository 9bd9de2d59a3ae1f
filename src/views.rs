//! Report pages assembled from aggregation queries.
//!
//! A [`Page`] is a titled list of [`Section`]s. Each section carries display
//! rows for the text renderer and a typed JSON payload for `--format json`.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    aggregate::{self, DerivedTable, Measure},
    data::{SalesRecord, format_currency, format_date, format_grouped},
    loader::SalesTable,
    schema::SalesColumn,
    table::{self, Align},
};

const MISSING_KEY: &str = "(missing)";

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub title: String,
    #[serde(skip)]
    pub headers: Vec<String>,
    #[serde(skip)]
    pub rows: Vec<Vec<String>>,
    #[serde(skip)]
    pub aligns: Vec<Align>,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub title: String,
    pub sections: Vec<Section>,
}

impl Page {
    pub fn render_text(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "{}", self.title);
        for section in &self.sections {
            let _ = writeln!(output);
            let _ = writeln!(output, "## {}", section.title);
            output.push_str(&table::render_table(
                &section.headers,
                &section.rows,
                &section.aligns,
            ));
        }
        output
    }

    pub fn render_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Serializing report page")
    }
}

/// Headline metrics, the cleaning summary, and the cleaned rows.
pub fn overview(table: &SalesTable, row_limit: Option<usize>) -> Result<Page> {
    let metrics = aggregate::summarize(table)?;
    let report = table.report();

    let metrics_section = Section {
        title: "Key metrics".to_string(),
        headers: strings(&["metric", "value"]),
        rows: vec![
            vec![
                "Net revenue (COP)".to_string(),
                format_currency(metrics.total_revenue),
            ],
            vec![
                "Items sold".to_string(),
                format_grouped(Decimal::from(metrics.total_units), 0),
            ],
            vec![
                "Orders".to_string(),
                format_grouped(Decimal::from(metrics.total_orders), 0),
            ],
        ],
        aligns: vec![Align::Left, Align::Right],
        data: serde_json::to_value(metrics).context("Serializing metrics")?,
    };

    let cleaning_section = Section {
        title: "Cleaning".to_string(),
        headers: strings(&["step", "rows"]),
        rows: [
            ("rows read", report.rows_read),
            ("unparseable order dates", report.unparsed_dates),
            ("order dates forward-filled", report.filled_dates),
            ("rows left without a date", report.undated_rows),
            ("dropped without net revenue", report.dropped_missing_revenue),
            ("quantities set to zero", report.zero_filled_quantities),
            ("unparseable unit prices", report.unparsed_unit_prices),
        ]
        .iter()
        .map(|(label, count)| vec![label.to_string(), count.to_string()])
        .collect(),
        aligns: vec![Align::Left, Align::Right],
        data: serde_json::to_value(report).context("Serializing cleaning report")?,
    };

    let shown = &table.records()[..row_limit.unwrap_or(table.len()).min(table.len())];
    let mut aligns = vec![Align::Left; table.headers().len()];
    for column in [
        SalesColumn::Quantity,
        SalesColumn::UnitPriceCop,
        SalesColumn::IngresoNetoItem,
    ] {
        aligns[column as usize] = Align::Right;
    }
    let data_section = Section {
        title: format!("Cleaned sales data ({} of {} rows)", shown.len(), table.len()),
        headers: table.headers(),
        rows: shown.iter().map(record_cells).collect(),
        aligns,
        data: serde_json::to_value(shown).context("Serializing cleaned rows")?,
    };

    Ok(Page {
        title: "Business overview".to_string(),
        sections: vec![metrics_section, cleaning_section, data_section],
    })
}

/// Monthly revenue plus revenue by category and by city.
pub fn sales(table: &SalesTable) -> Result<Page> {
    let by_category = aggregate::sort_desc(aggregate::sum_by(
        table,
        SalesColumn::Category.name(),
        Measure::REVENUE.name(),
    )?);
    let by_city = aggregate::sort_desc(aggregate::sum_by(
        table,
        SalesColumn::CiudadCliente.name(),
        Measure::REVENUE.name(),
    )?);
    Ok(Page {
        title: "Sales analysis".to_string(),
        sections: vec![
            derived_section(
                "Monthly net revenue",
                "month",
                &aggregate::sales_over_time(table)?,
            )?,
            derived_section("Revenue by category", "category", &by_category)?,
            derived_section("Revenue by city", "city", &by_city)?,
        ],
    })
}

/// Product rankings by revenue and by units, plus revenue by manufacturer.
pub fn products(table: &SalesTable, top: usize) -> Result<Page> {
    let product = SalesColumn::ProductName.name();
    let by_revenue = aggregate::top_n(table, product, Measure::REVENUE.name(), top)?;
    let by_units = aggregate::top_n(table, product, Measure::QUANTITY.name(), top)?;
    let by_manufacturer = aggregate::sort_desc(aggregate::sum_by(
        table,
        SalesColumn::Manufacturer.name(),
        Measure::REVENUE.name(),
    )?);
    Ok(Page {
        title: "Products and manufacturers".to_string(),
        sections: vec![
            derived_section(&format!("Top {top} products by revenue"), product, &by_revenue)?,
            derived_section(
                &format!("Top {top} products by quantity sold"),
                product,
                &by_units,
            )?,
            derived_section("Revenue by manufacturer", "manufacturer", &by_manufacturer)?,
        ],
    })
}

/// Ad-hoc `measure` totals per `key`, optionally ranked.
pub fn group(
    table: &SalesTable,
    key: &str,
    measure: &str,
    top: Option<usize>,
    sort: bool,
) -> Result<Page> {
    let derived = match top {
        Some(n) => aggregate::top_n(table, key, measure, n)?,
        None if sort => aggregate::sort_desc(aggregate::sum_by(table, key, measure)?),
        None => aggregate::sum_by(table, key, measure)?,
    };
    let total = derived.total()?;
    Ok(Page {
        title: format!("{measure} by {key}"),
        sections: vec![derived_section(
            &format!(
                "{} group(s), total {}",
                derived.len(),
                format_measure(measure, total)
            ),
            key,
            &derived,
        )?],
    })
}

fn derived_section(title: &str, key_label: &str, derived: &DerivedTable) -> Result<Section> {
    let rows = derived
        .rows
        .iter()
        .map(|row| {
            vec![
                row.key.clone().unwrap_or_else(|| MISSING_KEY.to_string()),
                format_measure(&derived.measure_column, row.value),
            ]
        })
        .collect();
    Ok(Section {
        title: title.to_string(),
        headers: vec![key_label.to_string(), derived.measure_column.clone()],
        rows,
        aligns: vec![Align::Left, Align::Right],
        data: serde_json::to_value(derived).context("Serializing derived table")?,
    })
}

fn format_measure(measure: &str, value: Decimal) -> String {
    if measure == SalesColumn::Quantity.name() {
        format_grouped(value, 0)
    } else {
        format_currency(value)
    }
}

fn record_cells(record: &SalesRecord) -> Vec<String> {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    let mut cells = vec![
        text(&record.order_id),
        record.order_date.map(format_date).unwrap_or_default(),
        text(&record.product_name),
        text(&record.category),
        text(&record.manufacturer),
        text(&record.ciudad_cliente),
        record.quantity.to_string(),
        record
            .unit_price_cop
            .map(|price| price.normalize().to_string())
            .unwrap_or_default(),
        record.ingreso_neto_item.normalize().to_string(),
    ];
    cells.extend(record.extra.iter().map(text));
    cells
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{LoadOptions, load_from_reader};

    const SAMPLE: &str = "order_id,order_date,product_name,category,manufacturer,ciudad_cliente,quantity,unit_price_cop,ingreso_neto_item,canal\n\
        A1,2024-01-05,Audífonos,Audio,Sonix,Bogotá,2,50000,100000,web\n\
        A1,2024-01-05,Cable,Accesorios,Acme,Bogotá,1,5000,5000,web\n\
        A2,2024-02-10,Parlante,Audio,Sonix,Medellín,3,100000,300000,tienda\n";

    fn sample() -> SalesTable {
        load_from_reader(SAMPLE.as_bytes(), &LoadOptions::default()).expect("load sample")
    }

    #[test]
    fn overview_reports_metrics_and_limits_rows() {
        let page = overview(&sample(), Some(1)).unwrap();
        let metrics = &page.sections[0];
        assert_eq!(metrics.rows[0][1], "$405,000");
        assert_eq!(metrics.rows[1][1], "6");
        assert_eq!(metrics.rows[2][1], "2");
        let data = &page.sections[2];
        assert_eq!(data.rows.len(), 1);
        assert_eq!(data.headers.last().map(String::as_str), Some("canal"));
        assert_eq!(data.rows[0][9], "web");
    }

    #[test]
    fn sales_page_orders_months_and_ranks_categories() {
        let page = sales(&sample()).unwrap();
        let months = page.sections[0]
            .rows
            .iter()
            .map(|row| row[0].as_str())
            .collect::<Vec<_>>();
        assert_eq!(months, vec!["2024-01", "2024-02"]);
        assert_eq!(page.sections[1].rows[0], strings(&["Audio", "$400,000"]));
        assert_eq!(page.sections[2].rows[0], strings(&["Medellín", "$300,000"]));
    }

    #[test]
    fn products_page_formats_units_without_currency() {
        let page = products(&sample(), 2).unwrap();
        assert_eq!(page.sections[0].title, "Top 2 products by revenue");
        assert_eq!(page.sections[0].rows.len(), 2);
        assert_eq!(page.sections[1].rows[0], strings(&["Parlante", "3"]));
        assert_eq!(page.sections[2].rows[0], strings(&["Sonix", "$400,000"]));
    }

    #[test]
    fn group_page_surfaces_unknown_columns() {
        let err = group(&sample(), "region", "quantity", None, false).unwrap_err();
        assert!(err.to_string().contains("unknown column 'region'"));
    }

    #[test]
    fn render_json_includes_typed_payloads() {
        let page = group(&sample(), "canal", "quantity", Some(1), false).unwrap();
        let json: serde_json::Value = serde_json::from_str(&page.render_json().unwrap()).unwrap();
        assert_eq!(json["sections"][0]["data"]["rows"][0]["key"], "web");
        assert!(page.render_text().contains("## 1 group(s), total 3"));
    }
}
