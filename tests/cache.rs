mod common;

use std::sync::Arc;

use common::{TestWorkspace, sales_csv};
use sales_report::{cache::SnapshotCache, error::ReportError, loader::LoadOptions};

const ROW_A: &str = "1,2024-01-05,Mouse,Accesorios,Logi,Cali,1,50,50";
const ROW_B: &str = "2,2024-02-05,Teclado,Accesorios,Logi,Cali,2,80,160";

#[test]
fn repeated_requests_share_one_snapshot() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("ventas.csv", &sales_csv(&[ROW_A]));
    let options = LoadOptions::default();
    let mut cache = SnapshotCache::new();

    let first = cache.get_or_load(&path, &options).expect("first load");
    let second = cache.get_or_load(&path, &options).expect("second load");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.len(), 1);
    let digest = &cache.fingerprint().expect("fingerprint").digest;
    assert_eq!(digest.len(), 64);
}

#[test]
fn rewriting_identical_contents_keeps_the_snapshot() {
    let workspace = TestWorkspace::new();
    let contents = sales_csv(&[ROW_A]);
    let path = workspace.write("ventas.csv", &contents);
    let options = LoadOptions::default();
    let mut cache = SnapshotCache::new();

    let first = cache.get_or_load(&path, &options).expect("first load");
    workspace.write("ventas.csv", &contents);
    let second = cache.get_or_load(&path, &options).expect("second load");
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn changed_contents_rebuild_the_snapshot() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("ventas.csv", &sales_csv(&[ROW_A]));
    let options = LoadOptions::default();
    let mut cache = SnapshotCache::new();

    let first = cache.get_or_load(&path, &options).expect("first load");
    workspace.write("ventas.csv", &sales_csv(&[ROW_A, ROW_B]));
    let second = cache.get_or_load(&path, &options).expect("reload");
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 2);
}

#[test]
fn invalidate_forces_a_reload() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("ventas.csv", &sales_csv(&[ROW_A]));
    let options = LoadOptions::default();
    let mut cache = SnapshotCache::new();

    let first = cache.get_or_load(&path, &options).expect("first load");
    cache.invalidate();
    assert!(!cache.is_loaded());
    let second = cache.get_or_load(&path, &options).expect("reload");
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(*first, *second);
}

#[test]
fn different_options_do_not_reuse_the_snapshot() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("ventas.csv", &sales_csv(&[ROW_A]));
    let mut cache = SnapshotCache::new();

    let comma = cache
        .get_or_load(&path, &LoadOptions::default())
        .expect("comma load");
    let semicolon = LoadOptions {
        delimiter: b';',
        ..LoadOptions::default()
    };
    let err = cache.get_or_load(&path, &semicolon).unwrap_err();
    assert!(matches!(err, ReportError::SchemaMismatch { .. }));
    let again = cache
        .get_or_load(&path, &LoadOptions::default())
        .expect("comma reload");
    assert!(Arc::ptr_eq(&comma, &again));
}

#[test]
fn failed_load_leaves_no_snapshot() {
    let workspace = TestWorkspace::new();
    let mut cache = SnapshotCache::new();
    let err = cache
        .get_or_load(&workspace.path().join("missing.csv"), &LoadOptions::default())
        .unwrap_err();
    assert!(matches!(err, ReportError::SourceUnavailable { .. }));
    assert!(!cache.is_loaded());
}
