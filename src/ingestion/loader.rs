//! The one-shot catalog load.
//!
//! [`CatalogLoader::run`] drives the whole pipeline inside one store transaction:
//!
//! 1. idempotency check: a store that already holds products or departments is left alone
//! 2. stream the source line by line, discarding the header
//! 3. decode each row, reject repeated skus, resolve its department, buffer the product
//! 4. write a batch every [`BATCH_SIZE`] products, then the final partial batch
//! 5. commit and report a [`LoadSummary`]
//!
//! `run` never returns an error and never panics on bad input: rejected rows are logged and
//! skipped, source failures keep what was already flushed, store failures roll the run back.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use super::csv::decode_line;
use super::departments::{DepartmentCache, resolve};
use super::observability::{CompositeObserver, LoadObserver, RejectedRow, TracingObserver};
use crate::error::{LoadError, LoadResult, RejectReason, StoreResult};
use crate::store::{CatalogStore, DepartmentStore, ProductStore, Transaction};
use crate::types::{LoadSummary, NewProduct, RunOutcome};

/// Products buffered before one bulk write.
pub const BATCH_SIZE: usize = 1000;

/// Something the loader can read catalog CSV from.
///
/// `open` is called at most once per run, and not at all when the run is skipped.
pub trait CsvSource {
    fn open(&self) -> io::Result<Box<dyn Read + '_>>;
}

impl CsvSource for Path {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(File::open(self)?))
    }
}

impl CsvSource for PathBuf {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        self.as_path().open()
    }
}

/// CSV text already in memory.
#[derive(Debug, Clone, Copy)]
pub struct InlineSource<'a>(pub &'a [u8]);

impl<'a> InlineSource<'a> {
    pub fn new(text: &'a str) -> Self {
        Self(text.as_bytes())
    }
}

impl CsvSource for InlineSource<'_> {
    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(self.0))
    }
}

/// Counters accumulated while a run streams.
#[derive(Debug, Default)]
struct Progress {
    products_loaded: u64,
    departments_created: u64,
    departments_total: u64,
    rows_rejected: u64,
    batches_flushed: u64,
}

/// Loads a catalog CSV into a [`CatalogStore`] exactly once.
///
/// `S` may be an owned store or `&mut` to one.
pub struct CatalogLoader<S> {
    store: S,
    observers: Vec<Arc<dyn LoadObserver>>,
}

impl<S: CatalogStore> CatalogLoader<S> {
    /// A loader reporting through [`TracingObserver`].
    pub fn new(store: S) -> Self {
        Self {
            store,
            observers: vec![Arc::new(TracingObserver)],
        }
    }

    /// Attach an observer in addition to the built-in tracing output.
    pub fn with_observer(mut self, observer: Arc<dyn LoadObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Run the load. See the module docs for the state machine and failure handling.
    pub fn run<C: CsvSource + ?Sized>(&mut self, source: &C) -> LoadSummary {
        let started = Instant::now();
        let observer = CompositeObserver::new(self.observers.clone());
        let mut progress = Progress::default();

        let outcome = match self.load(source, &observer, &mut progress) {
            Ok(outcome) => outcome,
            Err(err) => {
                observer.on_failure(&err);
                RunOutcome::StoreFailed
            }
        };

        // A failed store run was rolled back, so nothing it counted survived.
        if outcome == RunOutcome::StoreFailed {
            progress.products_loaded = 0;
            progress.departments_created = 0;
            progress.departments_total = 0;
        }

        let summary = LoadSummary {
            outcome,
            products_loaded: progress.products_loaded,
            departments_created: progress.departments_created,
            departments_total: progress.departments_total,
            rows_rejected: progress.rows_rejected,
            batches_flushed: progress.batches_flushed,
            duration_ms: started.elapsed().as_millis().min(u64::MAX as u128) as u64,
        };
        observer.on_finished(&summary);
        summary
    }

    /// Everything inside the transaction. Store errors propagate (and roll back via the guard);
    /// source errors are reported here and end the stream early.
    fn load<C: CsvSource + ?Sized>(
        &mut self,
        source: &C,
        observer: &dyn LoadObserver,
        progress: &mut Progress,
    ) -> LoadResult<RunOutcome> {
        let mut tx = Transaction::begin(&mut self.store)?;

        let products = ProductStore::count(&*tx)?;
        let departments = DepartmentStore::count(&*tx)?;
        if products > 0 || departments > 0 {
            observer.on_skipped(products, departments);
            return Ok(RunOutcome::Skipped);
        }

        info!("loading product data from CSV");
        let outcome = match stream_rows(&mut *tx, source, observer, progress) {
            Ok(()) => RunOutcome::Completed,
            Err(err @ LoadError::Io(_)) => {
                observer.on_failure(&err);
                RunOutcome::SourceFailed
            }
            Err(err) => return Err(err),
        };

        progress.products_loaded = ProductStore::count(&*tx)?;
        progress.departments_total = DepartmentStore::count(&*tx)?;
        tx.commit()?;
        Ok(outcome)
    }
}

fn stream_rows<T, C>(
    store: &mut T,
    source: &C,
    observer: &dyn LoadObserver,
    progress: &mut Progress,
) -> LoadResult<()>
where
    T: CatalogStore + ?Sized,
    C: CsvSource + ?Sized,
{
    let mut reader = BufReader::new(source.open()?);
    let mut cache = DepartmentCache::new();
    let mut seen_skus: HashSet<String> = HashSet::new();
    let mut batch: Vec<NewProduct> = Vec::with_capacity(BATCH_SIZE);
    let mut buf = Vec::new();
    let mut line_number: u64 = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_number += 1;
        if line_number == 1 {
            continue;
        }

        let line = String::from_utf8_lossy(strip_line_ending(&buf));
        // The store held no products at start, so a repeat can only come from the source.
        let accepted = decode_line(&line).and_then(|record| {
            if seen_skus.insert(record.sku.clone()) {
                Ok(record)
            } else {
                Err(RejectReason::DuplicateSku)
            }
        });
        let record = match accepted {
            Ok(record) => record,
            Err(reason) => {
                progress.rows_rejected += 1;
                observer.on_row_rejected(RejectedRow {
                    line_number,
                    line: &line,
                    reason: &reason,
                });
                continue;
            }
        };

        let department = resolve(&record.department, &mut cache, store)?;
        progress.departments_created = cache.created();
        batch.push(record.into_new_product(department));

        if batch.len() >= BATCH_SIZE {
            flush(store, &mut batch, observer, progress)?;
        }
    }

    if !batch.is_empty() {
        flush(store, &mut batch, observer, progress)?;
    }
    Ok(())
}

fn flush<T: ProductStore + ?Sized>(
    store: &mut T,
    batch: &mut Vec<NewProduct>,
    observer: &dyn LoadObserver,
    progress: &mut Progress,
) -> StoreResult<()> {
    store.save_all(batch)?;
    progress.batches_flushed += 1;
    observer.on_batch_flushed(batch.len());
    batch.clear();
    Ok(())
}

fn strip_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

#[cfg(test)]
mod tests {
    use super::strip_line_ending;

    #[test]
    fn strips_lf_and_crlf_only_once() {
        assert_eq!(strip_line_ending(b"a,b\n"), b"a,b");
        assert_eq!(strip_line_ending(b"a,b\r\n"), b"a,b");
        assert_eq!(strip_line_ending(b"a,b"), b"a,b");
        assert_eq!(strip_line_ending(b"a,b\n\n"), b"a,b\n");
    }
}
