mod common;

use std::path::Path;
use std::sync::Arc;

use catalog_loader::ingestion::{CatalogLoader, InlineSource};
use catalog_loader::store::{DepartmentStore, MemoryCatalog, ProductStore};
use catalog_loader::types::RunOutcome;

use common::{
    CountingSource, CountingStore, FailingSource, RecordingObserver, catalog_csv, header,
};

#[test]
fn non_empty_store_skips_without_opening_the_source() {
    let mut store = CountingStore::default();
    let first = CatalogLoader::new(&mut store).run(&InlineSource::new(&catalog_csv(5)));
    assert_eq!(first.outcome, RunOutcome::Completed);
    let writes_after_first = store.batch_sizes.len();
    let saves_after_first = store.department_saves;

    let source = CountingSource::new(catalog_csv(50));
    let obs = Arc::new(RecordingObserver::default());
    let second = CatalogLoader::new(&mut store)
        .with_observer(obs.clone())
        .run(&source);

    assert_eq!(second.outcome, RunOutcome::Skipped);
    assert_eq!(second.products_loaded, 0);
    assert_eq!(second.departments_created, 0);
    assert_eq!(source.opens.get(), 0);
    assert_eq!(store.batch_sizes.len(), writes_after_first);
    assert_eq!(store.department_saves, saves_after_first);
    assert_eq!(ProductStore::count(&store.inner).unwrap(), 5);
    assert_eq!(*obs.skipped.lock().unwrap(), vec![(5, 3)]);
    assert_eq!(obs.finished.lock().unwrap().len(), 1);
}

#[test]
fn missing_file_is_logged_not_raised() {
    let obs = Arc::new(RecordingObserver::default());
    let mut loader = CatalogLoader::new(MemoryCatalog::new()).with_observer(obs.clone());
    let summary = loader.run(Path::new("tests/fixtures/does_not_exist.csv"));

    assert_eq!(summary.outcome, RunOutcome::SourceFailed);
    assert_eq!(summary.products_loaded, 0);
    let failures = obs.failures.lock().unwrap().clone();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].starts_with("io error"));

    // The store is usable afterwards and still empty.
    let store = loader.into_store();
    assert_eq!(ProductStore::count(&store).unwrap(), 0);
    assert_eq!(DepartmentStore::count(&store).unwrap(), 0);
}

#[test]
fn read_failure_keeps_flushed_batches_only() {
    let source = FailingSource {
        text: catalog_csv(1500),
    };
    let mut store = CountingStore::default();
    let summary = CatalogLoader::new(&mut store).run(&source);

    assert_eq!(summary.outcome, RunOutcome::SourceFailed);
    assert_eq!(store.batch_sizes, vec![1000]);
    assert_eq!(summary.products_loaded, 1000);
    assert_eq!(ProductStore::count(&store.inner).unwrap(), 1000);
    assert_eq!(store.commits, 1);
}

#[test]
fn repeated_sku_is_rejected_and_the_run_continues() {
    // 1200 valid rows, then a repeat of SKU7 and one more fresh row.
    let mut csv = catalog_csv(1200);
    csv.push_str("9999,1.00,Tops,Dup,Acme,2.00,Dept0,SKU7,1\n");
    csv.push_str("10000,1.00,Tops,Fresh,Acme,2.00,Dept0,SKU10000,1\n");

    let obs = Arc::new(RecordingObserver::default());
    let mut store = CountingStore::default();
    let summary = CatalogLoader::new(&mut store)
        .with_observer(obs.clone())
        .run(&InlineSource::new(&csv));

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.products_loaded, 1201);
    assert_eq!(summary.rows_rejected, 1);
    assert_eq!(store.batch_sizes, vec![1000, 201]);
    assert_eq!(store.commits, 1);
    assert_eq!(store.rollbacks, 0);

    let rejected = obs.rejected.lock().unwrap().clone();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].0, 1202);
    assert_eq!(rejected[0].2, "duplicate_sku");

    let dup_name = store
        .inner
        .products()
        .iter()
        .find(|p| p.sku() == "SKU7")
        .and_then(|p| p.fields.name.clone());
    assert_eq!(dup_name.as_deref(), Some("Shirt, no. 7"));
}

#[test]
fn store_failure_rolls_back_the_whole_run() {
    let obs = Arc::new(RecordingObserver::default());
    let mut store = CountingStore {
        fail_on_batch: Some(2),
        ..CountingStore::default()
    };
    let summary = CatalogLoader::new(&mut store)
        .with_observer(obs.clone())
        .run(&InlineSource::new(&catalog_csv(1200)));

    assert_eq!(summary.outcome, RunOutcome::StoreFailed);
    assert_eq!(summary.products_loaded, 0);
    assert_eq!(summary.departments_created, 0);
    assert_eq!(store.batch_sizes, vec![1000, 200]);
    assert_eq!(store.rollbacks, 1);
    assert_eq!(store.commits, 0);
    assert_eq!(ProductStore::count(&store.inner).unwrap(), 0);
    assert_eq!(DepartmentStore::count(&store.inner).unwrap(), 0);

    let failures = obs.failures.lock().unwrap().clone();
    assert_eq!(failures, vec!["store error: duplicate product sku 'SKU1001'".to_string()]);
}

#[test]
fn garbage_lines_never_stop_the_run() {
    let csv = format!(
        "{}\n\n,,,,,,,,\n\"unterminated,1,2\nNA,NA,NA,NA,NA,NA,NA,NA,NA\n\
         1,1.00,c,n,b,2.00,Dept,SKU1,1\n",
        header()
    );
    let mut loader = CatalogLoader::new(MemoryCatalog::new());
    let summary = loader.run(&InlineSource::new(&csv));

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.rows_rejected, 4);
    assert_eq!(summary.products_loaded, 1);
}

#[test]
fn invalid_utf8_is_replaced_not_fatal() {
    let mut bytes = format!("{}\n", header()).into_bytes();
    bytes.extend_from_slice(b"1,1.00,c,Caf\xe9,b,2.00,Dept,SKU1,1\n");
    let mut loader = CatalogLoader::new(MemoryCatalog::new());
    let summary = loader.run(&InlineSource(&bytes));

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(
        loader.store().products()[0].fields.name.as_deref(),
        Some("Caf\u{fffd}")
    );
}
