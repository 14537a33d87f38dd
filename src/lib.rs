//! `catalog-loader` loads a flat CSV file of catalog records into a normalized store of
//! products referencing departments, once, at process startup.
//!
//! The primary entrypoint is [`ingestion::CatalogLoader`]. It runs inside one store
//! transaction and is idempotent across restarts: if the store already holds products or
//! departments, the run is skipped without reading the file.
//!
//! ## Source format
//!
//! The first line is a header and is always discarded. Data lines are positional:
//!
//! ```text
//! id,cost,category,name,brand,retail_price,department,sku,distribution_center_id
//! ```
//!
//! - commas inside a pair of double quotes are literal, wherever the quotes start
//! - an empty cell or `NA` (any case) means "no value"
//! - fewer than 9 fields is a malformed line; it is skipped, not fatal
//! - unparsable numbers become null with a warning
//! - rows without a department or sku, or repeating an earlier sku, are skipped
//!
//! ## Quick example
//!
//! ```rust
//! use catalog_loader::ingestion::{CatalogLoader, InlineSource};
//! use catalog_loader::store::{DepartmentStore, MemoryCatalog};
//! use catalog_loader::types::RunOutcome;
//!
//! let csv = "id,cost,category,name,brand,retail_price,department,sku,distribution_center_id\n\
//!            1,10.00,Shoes,\"Air Max, 2020\",Nike,20.00,Footwear,SKU123,5\n";
//!
//! let mut loader = CatalogLoader::new(MemoryCatalog::new());
//! let summary = loader.run(&InlineSource::new(csv));
//! assert_eq!(summary.outcome, RunOutcome::Completed);
//! assert_eq!(summary.products_loaded, 1);
//!
//! let store = loader.into_store();
//! let footwear = store.find_by_name("Footwear").unwrap().unwrap();
//! assert_eq!(store.products()[0].department(), &footwear);
//! assert_eq!(store.products()[0].fields.name.as_deref(), Some("Air Max, 2020"));
//!
//! // A second run against the same store is a no-op.
//! let mut again = CatalogLoader::new(store);
//! assert_eq!(again.run(&InlineSource::new(csv)).outcome, RunOutcome::Skipped);
//! ```
//!
//! ## Durable store (feature `sqlite`, on by default)
//!
//! ```no_run
//! use std::path::Path;
//!
//! use catalog_loader::ingestion::CatalogLoader;
//! use catalog_loader::store::SqliteCatalog;
//!
//! # fn main() -> Result<(), catalog_loader::StoreError> {
//! let store = SqliteCatalog::open("catalog.db")?;
//! let summary = CatalogLoader::new(store).run(Path::new("products.csv"));
//! println!("loaded {} products", summary.products_loaded);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: field parsing, record decoding, department resolution, the loader
//! - [`store`]: store traits, the transaction guard, in-memory and SQLite stores
//! - [`types`]: records, entities and the run summary
//! - [`error`]: error and rejection types

pub mod error;
pub mod ingestion;
pub mod store;
pub mod types;

pub use error::{LoadError, LoadResult, RejectReason, StoreError, StoreResult};
