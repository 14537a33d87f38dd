//! SQLite-backed [`CatalogStore`].
//!
//! Decimals are stored as TEXT so `10.00` reads back as `10.00`.

use std::path::Path;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};

use super::{CatalogStore, DepartmentStore, ProductStore};
use crate::error::{StoreError, StoreResult};
use crate::types::{Department, DepartmentId, DepartmentSummary, NewProduct, Product};

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;
CREATE TABLE IF NOT EXISTS departments (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS products (
    id                     INTEGER PRIMARY KEY AUTOINCREMENT,
    csv_id                 INTEGER,
    cost                   TEXT,
    category               TEXT,
    name                   TEXT,
    brand                  TEXT,
    retail_price           TEXT,
    department_id          INTEGER NOT NULL REFERENCES departments(id),
    sku                    TEXT NOT NULL UNIQUE,
    distribution_center_id INTEGER
);
CREATE INDEX IF NOT EXISTS idx_products_department_id ON products(department_id);
";

const INSERT_PRODUCT: &str = "INSERT INTO products \
    (csv_id, cost, category, name, brand, retail_price, department_id, sku, distribution_center_id) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

const SELECT_PRODUCTS_BY_DEPARTMENT: &str = "SELECT p.id, p.csv_id, p.cost, p.category, p.name, \
    p.brand, p.retail_price, d.id, d.name, p.sku, p.distribution_center_id \
    FROM products p JOIN departments d ON d.id = p.department_id \
    WHERE p.department_id = ?1 ORDER BY p.id";

const SELECT_DEPARTMENT_SUMMARIES: &str = "SELECT d.id, d.name, COUNT(p.id) \
    FROM departments d LEFT JOIN products p ON p.department_id = d.id \
    GROUP BY d.id, d.name ORDER BY d.name";

/// A catalog stored in a SQLite database.
#[derive(Debug)]
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// A private in-memory database; contents vanish when the value is dropped.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn count_rows(&self, table: &str) -> StoreResult<u64> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
        Ok(n as u64)
    }

    fn insert_products(&self, batch: &[NewProduct]) -> StoreResult<Vec<Product>> {
        let mut stmt = self.conn.prepare_cached(INSERT_PRODUCT)?;
        let mut saved = Vec::with_capacity(batch.len());
        for p in batch {
            stmt.execute(params![
                p.csv_id,
                p.cost.as_ref().map(BigDecimal::to_string),
                p.category,
                p.name,
                p.brand,
                p.retail_price.as_ref().map(BigDecimal::to_string),
                p.department.id.0,
                p.sku,
                p.distribution_center_id,
            ])
            .map_err(|e| unique_violation(e, "product sku", &p.sku))?;
            saved.push(Product {
                id: self.conn.last_insert_rowid(),
                fields: p.clone(),
            });
        }
        Ok(saved)
    }
}

/// Map a UNIQUE constraint failure to [`StoreError::Duplicate`]; pass anything else through.
fn unique_violation(err: rusqlite::Error, entity: &'static str, key: &str) -> StoreError {
    let duplicate = matches!(
        &err,
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == ErrorCode::ConstraintViolation && msg.contains("UNIQUE")
    );
    if duplicate {
        StoreError::Duplicate {
            entity,
            key: key.to_owned(),
        }
    } else {
        StoreError::Sqlite(err)
    }
}

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<BigDecimal>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        BigDecimal::from_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        fields: NewProduct {
            csv_id: row.get(1)?,
            cost: decimal_column(row, 2)?,
            category: row.get(3)?,
            name: row.get(4)?,
            brand: row.get(5)?,
            retail_price: decimal_column(row, 6)?,
            department: Department {
                id: DepartmentId(row.get(7)?),
                name: row.get(8)?,
            },
            sku: row.get(9)?,
            distribution_center_id: row.get(10)?,
        },
    })
}

impl ProductStore for SqliteCatalog {
    fn count(&self) -> StoreResult<u64> {
        self.count_rows("products")
    }

    fn save_all(&mut self, batch: &[NewProduct]) -> StoreResult<Vec<Product>> {
        // The savepoint makes the batch atomic with or without an enclosing transaction.
        self.conn.execute_batch("SAVEPOINT save_all")?;
        match self.insert_products(batch) {
            Ok(saved) => {
                self.conn.execute_batch("RELEASE save_all")?;
                Ok(saved)
            }
            Err(e) => {
                self.conn
                    .execute_batch("ROLLBACK TO save_all; RELEASE save_all")?;
                Err(e)
            }
        }
    }

    fn find_by_department_id(&self, department: DepartmentId) -> StoreResult<Vec<Product>> {
        let mut stmt = self.conn.prepare_cached(SELECT_PRODUCTS_BY_DEPARTMENT)?;
        let rows = stmt.query_map([department.0], product_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl DepartmentStore for SqliteCatalog {
    fn count(&self) -> StoreResult<u64> {
        self.count_rows("departments")
    }

    fn find_by_name(&self, name: &str) -> StoreResult<Option<Department>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, name FROM departments WHERE name = ?1")?;
        let found = stmt
            .query_row([name], |r| {
                Ok(Department {
                    id: DepartmentId(r.get(0)?),
                    name: r.get(1)?,
                })
            })
            .optional()?;
        Ok(found)
    }

    fn save(&mut self, name: &str) -> StoreResult<Department> {
        self.conn
            .execute("INSERT INTO departments (name) VALUES (?1)", [name])
            .map_err(|e| unique_violation(e, "department", name))?;
        Ok(Department {
            id: DepartmentId(self.conn.last_insert_rowid()),
            name: name.to_owned(),
        })
    }

    fn find_all_with_product_count(&self) -> StoreResult<Vec<DepartmentSummary>> {
        let mut stmt = self.conn.prepare_cached(SELECT_DEPARTMENT_SUMMARIES)?;
        let rows = stmt.query_map([], |r| {
            Ok(DepartmentSummary {
                id: DepartmentId(r.get(0)?),
                name: r.get(1)?,
                product_count: r.get::<_, i64>(2)? as u64,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl CatalogStore for SqliteCatalog {
    fn begin(&mut self) -> StoreResult<()> {
        if !self.conn.is_autocommit() {
            return Err(StoreError::Transaction {
                message: "transaction already open".to_string(),
            });
        }
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}
