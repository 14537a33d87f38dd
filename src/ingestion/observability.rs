use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::{LoadError, RejectReason};
use crate::types::LoadSummary;

/// A row left out of the load.
#[derive(Debug, Clone, Copy)]
pub struct RejectedRow<'a> {
    /// 1-based line number in the source file (the header is line 1).
    pub line_number: u64,
    /// The raw line, without its terminator.
    pub line: &'a str,
    pub reason: &'a RejectReason,
}

/// Observer interface for load progress and outcomes.
///
/// Every method has a no-op default; implementors pick what they need (metrics, audit files,
/// test assertions).
pub trait LoadObserver: Send + Sync {
    /// The store already held data; the run did nothing.
    fn on_skipped(&self, _products: u64, _departments: u64) {}

    /// A row was rejected and will not be loaded.
    fn on_row_rejected(&self, _row: RejectedRow<'_>) {}

    /// A batch of `_size` products was written.
    fn on_batch_flushed(&self, _size: usize) {}

    /// A run-level failure ended the run early.
    fn on_failure(&self, _error: &LoadError) {}

    /// The run ended (including skipped and failed runs).
    fn on_finished(&self, _summary: &LoadSummary) {}
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn LoadObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn LoadObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl LoadObserver for CompositeObserver {
    fn on_skipped(&self, products: u64, departments: u64) {
        for o in &self.observers {
            o.on_skipped(products, departments);
        }
    }

    fn on_row_rejected(&self, row: RejectedRow<'_>) {
        for o in &self.observers {
            o.on_row_rejected(row);
        }
    }

    fn on_batch_flushed(&self, size: usize) {
        for o in &self.observers {
            o.on_batch_flushed(size);
        }
    }

    fn on_failure(&self, error: &LoadError) {
        for o in &self.observers {
            o.on_failure(error);
        }
    }

    fn on_finished(&self, summary: &LoadSummary) {
        for o in &self.observers {
            o.on_finished(summary);
        }
    }
}

/// Reports load events through `tracing`. This is the loader's default observer.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl LoadObserver for TracingObserver {
    fn on_skipped(&self, products: u64, departments: u64) {
        info!(products, departments, "store already contains catalog data; skipping CSV load");
    }

    fn on_row_rejected(&self, row: RejectedRow<'_>) {
        warn!(
            line_number = row.line_number,
            reason = row.reason.as_str(),
            detail = %row.reason,
            line = row.line,
            "skipping row"
        );
    }

    fn on_batch_flushed(&self, size: usize) {
        info!(size, "saved a batch of products");
    }

    fn on_failure(&self, error: &LoadError) {
        error!(error = %error, "failed to load CSV data");
    }

    fn on_finished(&self, summary: &LoadSummary) {
        info!(
            outcome = ?summary.outcome,
            products = summary.products_loaded,
            departments_created = summary.departments_created,
            departments = summary.departments_total,
            rejected = summary.rows_rejected,
            batches = summary.batches_flushed,
            elapsed_ms = summary.duration_ms,
            "finished loading catalog"
        );
    }
}
