//! CSV record decoding.
//!
//! Turns one physical line of the catalog file into a [`CandidateRecord`] or a [`RejectReason`].
//! Columns are positional; see [`HEADER`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use bigdecimal::BigDecimal;
use csv::StringRecord;
use tracing::error;

use super::fields::{parse_decimal, parse_integer, sanitize_string};
use crate::error::RejectReason;
use crate::types::CandidateRecord;

/// Minimum number of fields in a data line.
pub const REQUIRED_COLUMNS: usize = 9;

/// Column layout of the source file (its first line, always discarded).
pub const HEADER: [&str; REQUIRED_COLUMNS] = [
    "id",
    "cost",
    "category",
    "name",
    "brand",
    "retail_price",
    "department",
    "sku",
    "distribution_center_id",
];

const COL_ID: usize = 0;
const COL_COST: usize = 1;
const COL_CATEGORY: usize = 2;
const COL_NAME: usize = 3;
const COL_BRAND: usize = 4;
const COL_RETAIL_PRICE: usize = 5;
const COL_DEPARTMENT: usize = 6;
const COL_SKU: usize = 7;
const COL_DISTRIBUTION_CENTER_ID: usize = 8;

/// Split a single line on commas that are not inside a pair of double quotes.
///
/// A comma separates fields when an even number of `"` follow it on the line, so a quoted
/// section may start anywhere in a field (`Tee "L, XL"`, ` "Air Max, 2020"`). Quote characters
/// stay in the cells; [`sanitize_string`] strips the enclosing pair. Empty trailing fields are
/// kept and an empty line is one empty field.
pub fn split_line(line: &str) -> StringRecord {
    let mut quotes_after = line.bytes().filter(|&b| b == b'"').count();
    let mut record = StringRecord::new();
    let mut start = 0;

    for (idx, byte) in line.bytes().enumerate() {
        match byte {
            b'"' => quotes_after -= 1,
            b',' if quotes_after % 2 == 0 => {
                record.push_field(&line[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    record.push_field(&line[start..]);
    record
}

/// Decode one data line.
pub fn decode_line(line: &str) -> Result<CandidateRecord, RejectReason> {
    decode_record(&split_line(line))
}

/// Decode an already split record.
///
/// Rules:
///
/// - fewer than [`REQUIRED_COLUMNS`] fields is `malformed_line`, nothing else is parsed
/// - numeric cells that do not parse become `None` (see [`super::fields`])
/// - a null department is `missing_department`, a null sku is `missing_sku`
/// - a panic while mapping fields is caught here and becomes `parse_error`
pub fn decode_record(record: &StringRecord) -> Result<CandidateRecord, RejectReason> {
    if record.len() < REQUIRED_COLUMNS {
        return Err(RejectReason::MalformedLine {
            fields: record.len(),
        });
    }

    let cols = guard_row(|| map_columns(record))?;

    let department = cols.department.ok_or(RejectReason::MissingDepartment)?;
    let sku = cols.sku.ok_or(RejectReason::MissingSku)?;

    Ok(CandidateRecord {
        csv_id: cols.csv_id,
        cost: cols.cost,
        category: cols.category,
        name: cols.name,
        brand: cols.brand,
        retail_price: cols.retail_price,
        department,
        sku,
        distribution_center_id: cols.distribution_center_id,
    })
}

/// Field-parsed columns before record-level validation.
struct MappedColumns {
    csv_id: Option<i32>,
    cost: Option<BigDecimal>,
    category: Option<String>,
    name: Option<String>,
    brand: Option<String>,
    retail_price: Option<BigDecimal>,
    department: Option<String>,
    sku: Option<String>,
    distribution_center_id: Option<i32>,
}

fn map_columns(record: &StringRecord) -> MappedColumns {
    let col = |idx: usize| record.get(idx);
    MappedColumns {
        csv_id: parse_integer(col(COL_ID)),
        cost: parse_decimal(col(COL_COST)),
        category: sanitize_string(col(COL_CATEGORY)),
        name: sanitize_string(col(COL_NAME)),
        brand: sanitize_string(col(COL_BRAND)),
        retail_price: parse_decimal(col(COL_RETAIL_PRICE)),
        department: sanitize_string(col(COL_DEPARTMENT)),
        sku: sanitize_string(col(COL_SKU)),
        distribution_center_id: parse_integer(col(COL_DISTRIBUTION_CENTER_ID)),
    }
}

/// Run one row's field mapping, turning a panic into a `parse_error` rejection.
fn guard_row<T>(map: impl FnOnce() -> T) -> Result<T, RejectReason> {
    panic::catch_unwind(AssertUnwindSafe(map)).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        error!(%message, "field mapping panicked");
        RejectReason::ParseError { message }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
