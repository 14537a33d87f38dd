//! The CSV catalog load pipeline.
//!
//! Most callers should use [`CatalogLoader`] (from [`loader`]), which:
//!
//! - skips the run when the store already holds data
//! - streams and decodes the CSV source, rejecting bad rows without stopping
//! - resolves departments through a run-scoped [`DepartmentCache`]
//! - writes products in batches of [`BATCH_SIZE`]
//! - optionally reports progress to a [`LoadObserver`]
//!
//! The building blocks are public as well:
//! - [`fields`]: per-cell sanitization and coercion
//! - [`csv`]: line splitting and record decoding
//! - [`departments`]: department get-or-create

pub mod csv;
pub mod departments;
pub mod fields;
pub mod loader;
pub mod observability;

pub use departments::{DepartmentCache, resolve};
pub use loader::{BATCH_SIZE, CatalogLoader, CsvSource, InlineSource};
pub use observability::{CompositeObserver, LoadObserver, RejectedRow, TracingObserver};
