//! Core data model types for the catalog load.
//!
//! A CSV row is decoded into a [`CandidateRecord`], its department name is resolved to a
//! [`Department`], and the pair becomes a [`NewProduct`] that a store persists as a [`Product`].

use std::fmt;

use bigdecimal::BigDecimal;
use serde::Serialize;

/// Store-assigned identity of a [`Department`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DepartmentId(pub i64);

impl fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named dimension entity referenced by products.
///
/// Names are unique within a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
}

/// One decoded, validated, not yet persisted catalog row.
///
/// String fields are trimmed with one enclosing quote pair removed; `NA` and blanks are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    /// The `id` column of the source file.
    pub csv_id: Option<i32>,
    pub cost: Option<BigDecimal>,
    pub category: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub retail_price: Option<BigDecimal>,
    /// Department name; required.
    pub department: String,
    /// Required and unique across the store.
    pub sku: String,
    pub distribution_center_id: Option<i32>,
}

impl CandidateRecord {
    /// Attach the resolved department, producing a row ready for [`crate::store::ProductStore::save_all`].
    pub fn into_new_product(self, department: Department) -> NewProduct {
        NewProduct {
            csv_id: self.csv_id,
            cost: self.cost,
            category: self.category,
            name: self.name,
            brand: self.brand,
            retail_price: self.retail_price,
            department,
            sku: self.sku,
            distribution_center_id: self.distribution_center_id,
        }
    }
}

/// A product with its department reference, waiting in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewProduct {
    pub csv_id: Option<i32>,
    pub cost: Option<BigDecimal>,
    pub category: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub retail_price: Option<BigDecimal>,
    pub department: Department,
    pub sku: String,
    pub distribution_center_id: Option<i32>,
}

/// A persisted catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: i64,
    #[serde(flatten)]
    pub fields: NewProduct,
}

impl Product {
    pub fn department(&self) -> &Department {
        &self.fields.department
    }

    pub fn sku(&self) -> &str {
        &self.fields.sku
    }
}

/// A department with the number of products referencing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartmentSummary {
    pub id: DepartmentId,
    pub name: String,
    pub product_count: u64,
}

/// How a load run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The source was read to the end and every batch was committed.
    Completed,
    /// The store already held data; nothing was read or written.
    Skipped,
    /// The source could not be opened or read; batches flushed before the failure were kept.
    SourceFailed,
    /// The store failed; the run was rolled back.
    StoreFailed,
}

/// Result of one [`crate::ingestion::CatalogLoader::run`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub outcome: RunOutcome,
    /// Products in the store when the run ended; 0 for skipped and rolled-back runs.
    pub products_loaded: u64,
    /// Departments created by this run.
    pub departments_created: u64,
    /// Departments in the store when the run ended.
    pub departments_total: u64,
    pub rows_rejected: u64,
    pub batches_flushed: u64,
    pub duration_ms: u64,
}
