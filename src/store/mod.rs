//! Store collaborators for the catalog load.
//!
//! The loader only needs the small operation set below. Two implementations ship with the crate:
//!
//! - [`memory::MemoryCatalog`]: in-process maps, used by tests and embedders
//! - [`sqlite::SqliteCatalog`]: durable SQLite file (feature `sqlite`)
//!
//! Both enforce unique department names and unique product SKUs.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::ops::{Deref, DerefMut};

use tracing::warn;

use crate::error::StoreResult;
use crate::types::{Department, DepartmentId, DepartmentSummary, NewProduct, Product};

pub use memory::MemoryCatalog;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCatalog;

/// Persistence for [`Product`]s.
pub trait ProductStore {
    /// Number of stored products.
    fn count(&self) -> StoreResult<u64>;

    /// Persist a batch in one bulk operation.
    ///
    /// The batch is all-or-nothing: on error none of its rows are stored.
    fn save_all(&mut self, batch: &[NewProduct]) -> StoreResult<Vec<Product>>;

    /// Products referencing `department`, in insertion order.
    fn find_by_department_id(&self, department: DepartmentId) -> StoreResult<Vec<Product>>;
}

/// Persistence for [`Department`]s.
pub trait DepartmentStore {
    /// Number of stored departments.
    fn count(&self) -> StoreResult<u64>;

    /// Exact-match lookup by name.
    fn find_by_name(&self, name: &str) -> StoreResult<Option<Department>>;

    /// Create a department. Fails with [`crate::error::StoreError::Duplicate`] if the name exists.
    fn save(&mut self, name: &str) -> StoreResult<Department>;

    /// Every department with its product count, ordered by name.
    fn find_all_with_product_count(&self) -> StoreResult<Vec<DepartmentSummary>>;
}

/// A store holding both entities, with explicit transaction demarcation.
///
/// Prefer [`Transaction`] over calling these directly; it rolls back on every exit path.
pub trait CatalogStore: ProductStore + DepartmentStore {
    fn begin(&mut self) -> StoreResult<()>;
    fn commit(&mut self) -> StoreResult<()>;
    fn rollback(&mut self) -> StoreResult<()>;
}

impl<S: ProductStore + ?Sized> ProductStore for &mut S {
    fn count(&self) -> StoreResult<u64> {
        (**self).count()
    }

    fn save_all(&mut self, batch: &[NewProduct]) -> StoreResult<Vec<Product>> {
        (**self).save_all(batch)
    }

    fn find_by_department_id(&self, department: DepartmentId) -> StoreResult<Vec<Product>> {
        (**self).find_by_department_id(department)
    }
}

impl<S: DepartmentStore + ?Sized> DepartmentStore for &mut S {
    fn count(&self) -> StoreResult<u64> {
        (**self).count()
    }

    fn find_by_name(&self, name: &str) -> StoreResult<Option<Department>> {
        (**self).find_by_name(name)
    }

    fn save(&mut self, name: &str) -> StoreResult<Department> {
        (**self).save(name)
    }

    fn find_all_with_product_count(&self) -> StoreResult<Vec<DepartmentSummary>> {
        (**self).find_all_with_product_count()
    }
}

impl<S: CatalogStore + ?Sized> CatalogStore for &mut S {
    fn begin(&mut self) -> StoreResult<()> {
        (**self).begin()
    }

    fn commit(&mut self) -> StoreResult<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> StoreResult<()> {
        (**self).rollback()
    }
}

/// Scoped transaction over a [`CatalogStore`].
///
/// Dereferences to the store. Dropping the guard without [`Transaction::commit`] rolls back.
pub struct Transaction<'a, S: CatalogStore + ?Sized> {
    store: &'a mut S,
    finished: bool,
}

impl<'a, S: CatalogStore + ?Sized> Transaction<'a, S> {
    pub fn begin(store: &'a mut S) -> StoreResult<Self> {
        store.begin()?;
        Ok(Self {
            store,
            finished: false,
        })
    }

    /// Make the transaction's writes durable. If the commit itself fails, the drop rolls back.
    pub fn commit(mut self) -> StoreResult<()> {
        self.store.commit()?;
        self.finished = true;
        Ok(())
    }

    pub fn rollback(mut self) -> StoreResult<()> {
        self.finished = true;
        self.store.rollback()
    }
}

impl<S: CatalogStore + ?Sized> Deref for Transaction<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &*self.store
    }
}

impl<S: CatalogStore + ?Sized> DerefMut for Transaction<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut *self.store
    }
}

impl<S: CatalogStore + ?Sized> Drop for Transaction<'_, S> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.store.rollback() {
                warn!(error = %e, "rollback on drop failed");
            }
        }
    }
}
