//! In-memory [`CatalogStore`].

use std::collections::{HashMap, HashSet};

use super::{CatalogStore, DepartmentStore, ProductStore};
use crate::error::{StoreError, StoreResult};
use crate::types::{Department, DepartmentId, DepartmentSummary, NewProduct, Product};

#[derive(Debug, Clone, Default)]
struct State {
    departments: Vec<Department>,
    department_ids: HashMap<String, DepartmentId>,
    products: Vec<Product>,
    skus: HashSet<String>,
}

/// A catalog held in process memory.
///
/// Ids are assigned sequentially from 1. A transaction snapshots the whole state on `begin` and
/// restores it on `rollback`; transactions do not nest.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: State,
    snapshot: Option<State>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored products in insertion order.
    pub fn products(&self) -> &[Product] {
        &self.state.products
    }

    /// All stored departments in insertion order.
    pub fn departments(&self) -> &[Department] {
        &self.state.departments
    }

    fn department(&self, id: DepartmentId) -> Option<&Department> {
        self.state.departments.iter().find(|d| d.id == id)
    }
}

impl ProductStore for MemoryCatalog {
    fn count(&self) -> StoreResult<u64> {
        Ok(self.state.products.len() as u64)
    }

    fn save_all(&mut self, batch: &[NewProduct]) -> StoreResult<Vec<Product>> {
        // Validate the whole batch before touching state so a failure stores nothing.
        let mut batch_skus = HashSet::with_capacity(batch.len());
        for p in batch {
            if self.state.skus.contains(&p.sku) || !batch_skus.insert(p.sku.as_str()) {
                return Err(StoreError::Duplicate {
                    entity: "product sku",
                    key: p.sku.clone(),
                });
            }
            if self.department(p.department.id).is_none() {
                return Err(StoreError::UnknownDepartment(p.department.id));
            }
        }

        let mut saved = Vec::with_capacity(batch.len());
        for p in batch {
            let product = Product {
                id: self.state.products.len() as i64 + 1,
                fields: p.clone(),
            };
            self.state.skus.insert(p.sku.clone());
            self.state.products.push(product.clone());
            saved.push(product);
        }
        Ok(saved)
    }

    fn find_by_department_id(&self, department: DepartmentId) -> StoreResult<Vec<Product>> {
        Ok(self
            .state
            .products
            .iter()
            .filter(|p| p.department().id == department)
            .cloned()
            .collect())
    }
}

impl DepartmentStore for MemoryCatalog {
    fn count(&self) -> StoreResult<u64> {
        Ok(self.state.departments.len() as u64)
    }

    fn find_by_name(&self, name: &str) -> StoreResult<Option<Department>> {
        Ok(self
            .state
            .department_ids
            .get(name)
            .and_then(|&id| self.department(id))
            .cloned())
    }

    fn save(&mut self, name: &str) -> StoreResult<Department> {
        if self.state.department_ids.contains_key(name) {
            return Err(StoreError::Duplicate {
                entity: "department",
                key: name.to_owned(),
            });
        }
        let department = Department {
            id: DepartmentId(self.state.departments.len() as i64 + 1),
            name: name.to_owned(),
        };
        self.state
            .department_ids
            .insert(department.name.clone(), department.id);
        self.state.departments.push(department.clone());
        Ok(department)
    }

    fn find_all_with_product_count(&self) -> StoreResult<Vec<DepartmentSummary>> {
        let mut counts: HashMap<DepartmentId, u64> = HashMap::new();
        for p in &self.state.products {
            *counts.entry(p.department().id).or_default() += 1;
        }
        let mut out: Vec<DepartmentSummary> = self
            .state
            .departments
            .iter()
            .map(|d| DepartmentSummary {
                id: d.id,
                name: d.name.clone(),
                product_count: counts.get(&d.id).copied().unwrap_or(0),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

impl CatalogStore for MemoryCatalog {
    fn begin(&mut self) -> StoreResult<()> {
        if self.snapshot.is_some() {
            return Err(StoreError::Transaction {
                message: "transaction already open".to_string(),
            });
        }
        self.snapshot = Some(self.state.clone());
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| StoreError::Transaction {
                message: "commit without an open transaction".to_string(),
            })
    }

    fn rollback(&mut self) -> StoreResult<()> {
        let snapshot = self.snapshot.take().ok_or_else(|| StoreError::Transaction {
            message: "rollback without an open transaction".to_string(),
        })?;
        self.state = snapshot;
        Ok(())
    }
}
