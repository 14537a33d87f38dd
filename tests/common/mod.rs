#![allow(dead_code)]

use std::cell::Cell;
use std::io::{self, Cursor, Read};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use catalog_loader::error::{StoreError, StoreResult};
use catalog_loader::ingestion::csv::HEADER;
use catalog_loader::ingestion::{CsvSource, LoadObserver, RejectedRow};
use catalog_loader::store::{CatalogStore, DepartmentStore, MemoryCatalog, ProductStore};
use catalog_loader::types::{
    Department, DepartmentId, DepartmentSummary, LoadSummary, NewProduct, Product,
};

pub fn header() -> String {
    HEADER.join(",")
}

/// Header plus `rows` valid rows spread over three departments.
pub fn catalog_csv(rows: usize) -> String {
    let mut out = header();
    out.push('\n');
    for i in 1..=rows {
        out.push_str(&format!(
            "{i},1.50,Tops,\"Shirt, no. {i}\",Acme,3.00,Dept{},SKU{i},{}\n",
            i % 3,
            i % 10
        ));
    }
    out
}

pub fn tmp_file(ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("catalog-loader-test-{nanos}.{ext}"))
}

/// [`MemoryCatalog`] wrapper that records every store call the loader makes.
///
/// With `fail_on_batch: Some(n)`, the n-th `save_all` call (1-based) fails as if the store had
/// hit a unique-key violation on the batch's first sku.
#[derive(Debug, Default)]
pub struct CountingStore {
    pub inner: MemoryCatalog,
    pub fail_on_batch: Option<usize>,
    pub batch_sizes: Vec<usize>,
    pub department_lookups: Cell<usize>,
    pub department_saves: usize,
    pub commits: usize,
    pub rollbacks: usize,
}

impl ProductStore for CountingStore {
    fn count(&self) -> StoreResult<u64> {
        ProductStore::count(&self.inner)
    }

    fn save_all(&mut self, batch: &[NewProduct]) -> StoreResult<Vec<Product>> {
        self.batch_sizes.push(batch.len());
        if self.fail_on_batch == Some(self.batch_sizes.len()) {
            return Err(StoreError::Duplicate {
                entity: "product sku",
                key: batch.first().map(|p| p.sku.clone()).unwrap_or_default(),
            });
        }
        self.inner.save_all(batch)
    }

    fn find_by_department_id(&self, department: DepartmentId) -> StoreResult<Vec<Product>> {
        self.inner.find_by_department_id(department)
    }
}

impl DepartmentStore for CountingStore {
    fn count(&self) -> StoreResult<u64> {
        DepartmentStore::count(&self.inner)
    }

    fn find_by_name(&self, name: &str) -> StoreResult<Option<Department>> {
        self.department_lookups.set(self.department_lookups.get() + 1);
        self.inner.find_by_name(name)
    }

    fn save(&mut self, name: &str) -> StoreResult<Department> {
        self.department_saves += 1;
        self.inner.save(name)
    }

    fn find_all_with_product_count(&self) -> StoreResult<Vec<DepartmentSummary>> {
        self.inner.find_all_with_product_count()
    }
}

impl CatalogStore for CountingStore {
    fn begin(&mut self) -> StoreResult<()> {
        self.inner.begin()
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.commits += 1;
        self.inner.commit()
    }

    fn rollback(&mut self) -> StoreResult<()> {
        self.rollbacks += 1;
        self.inner.rollback()
    }
}

/// In-memory source that counts how often it is opened.
#[derive(Debug, Default)]
pub struct CountingSource {
    pub text: String,
    pub opens: Cell<usize>,
}

impl CountingSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            opens: Cell::new(0),
        }
    }
}

impl CsvSource for CountingSource {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        self.opens.set(self.opens.get() + 1);
        Ok(Box::new(self.text.as_bytes()))
    }
}

/// Source whose reader fails once its text is exhausted, like a file on a vanishing disk.
#[derive(Debug)]
pub struct FailingSource {
    pub text: String,
}

struct FailAtEnd {
    data: Cursor<Vec<u8>>,
}

impl Read for FailAtEnd {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Err(io::Error::other("device went away")),
            n => Ok(n),
        }
    }
}

impl CsvSource for FailingSource {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(FailAtEnd {
            data: Cursor::new(self.text.clone().into_bytes()),
        }))
    }
}

/// Observer that keeps everything it is told.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub rejected: Mutex<Vec<(u64, String, &'static str)>>,
    pub batches: Mutex<Vec<usize>>,
    pub skipped: Mutex<Vec<(u64, u64)>>,
    pub failures: Mutex<Vec<String>>,
    pub finished: Mutex<Vec<LoadSummary>>,
}

impl LoadObserver for RecordingObserver {
    fn on_skipped(&self, products: u64, departments: u64) {
        self.skipped.lock().unwrap().push((products, departments));
    }

    fn on_row_rejected(&self, row: RejectedRow<'_>) {
        self.rejected
            .lock()
            .unwrap()
            .push((row.line_number, row.line.to_string(), row.reason.as_str()));
    }

    fn on_batch_flushed(&self, size: usize) {
        self.batches.lock().unwrap().push(size);
    }

    fn on_failure(&self, error: &catalog_loader::LoadError) {
        self.failures.lock().unwrap().push(error.to_string());
    }

    fn on_finished(&self, summary: &LoadSummary) {
        self.finished.lock().unwrap().push(summary.clone());
    }
}
