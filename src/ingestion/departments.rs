//! Department get-or-create with a run-scoped cache.

use std::collections::HashMap;

use tracing::debug;

use crate::error::StoreResult;
use crate::store::DepartmentStore;
use crate::types::Department;

/// Department name to identity, for the lifetime of one load run.
///
/// Not thread-safe; the loader owns it and runs on a single thread.
#[derive(Debug, Default)]
pub struct DepartmentCache {
    by_name: HashMap<String, Department>,
    created: u64,
}

impl DepartmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Department> {
        self.by_name.get(name)
    }

    /// Number of distinct names seen so far.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Departments this cache had to create in the store.
    pub fn created(&self) -> u64 {
        self.created
    }
}

/// Return the department named `name`, creating it in `store` if neither the cache nor the
/// store knows it.
///
/// The store is consulted at most once per distinct name per cache. Names match exactly.
pub fn resolve<S>(name: &str, cache: &mut DepartmentCache, store: &mut S) -> StoreResult<Department>
where
    S: DepartmentStore + ?Sized,
{
    if let Some(department) = cache.get(name) {
        return Ok(department.clone());
    }

    let department = match store.find_by_name(name)? {
        Some(existing) => existing,
        None => {
            let created = store.save(name)?;
            cache.created += 1;
            debug!(department = %created.name, id = %created.id, "created department");
            created
        }
    };
    cache.by_name.insert(name.to_owned(), department.clone());
    Ok(department)
}
