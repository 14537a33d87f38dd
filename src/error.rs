use std::fmt;

use thiserror::Error;

use crate::types::DepartmentId;

/// Convenience result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Convenience result type for run-level loader operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Error type returned by [`crate::store`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite error (feature-gated behind `sqlite`).
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A unique key (department name, product SKU) is already taken.
    #[error("duplicate {entity} '{key}'")]
    Duplicate { entity: &'static str, key: String },

    /// A product references a department the store does not hold.
    #[error("unknown department {0}")]
    UnknownDepartment(DepartmentId),

    /// Transaction demarcation was used out of order (e.g. commit without begin).
    #[error("transaction error: {message}")]
    Transaction { message: String },
}

/// Run-level failures inside [`crate::ingestion::CatalogLoader`].
///
/// These never escape [`crate::ingestion::CatalogLoader::run`]; they are logged and folded into
/// the returned [`crate::types::RunOutcome`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source could not be opened or read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The store rejected a read or write.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Why a single row was left out of the load.
///
/// Rejections are data-quality events, not errors: the row is skipped and the run continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Fewer than [`crate::ingestion::csv::REQUIRED_COLUMNS`] fields.
    MalformedLine { fields: usize },
    /// The department column is empty or `NA`.
    MissingDepartment,
    /// The sku column is empty or `NA`.
    MissingSku,
    /// The sku already appeared earlier in the source.
    DuplicateSku,
    /// Field mapping failed unexpectedly.
    ParseError { message: String },
}

impl RejectReason {
    /// Stable snake_case label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedLine { .. } => "malformed_line",
            Self::MissingDepartment => "missing_department",
            Self::MissingSku => "missing_sku",
            Self::DuplicateSku => "duplicate_sku",
            Self::ParseError { .. } => "parse_error",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedLine { fields } => write!(f, "malformed_line ({fields} fields)"),
            Self::ParseError { message } => write!(f, "parse_error ({message})"),
            other => f.write_str(other.as_str()),
        }
    }
}
