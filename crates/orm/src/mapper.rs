use std::any::TypeId;
use std::sync::Arc;

use anyhow::Result;
use moka::sync::Cache;

use crate::Row;
use crate::error::Error;
use crate::materialize::materialize;
use crate::options::MapperOptions;
use crate::poco::Poco;
use crate::resolver::{Plan, resolve};

// Columns are joined with a unit separator, which cannot appear in a label
// returned by any mainstream engine.
const SIGNATURE_DELIMITER: char = '\u{1f}';

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PlanKey {
    type_id: TypeId,
    signature: String,
}

/// Maps rows onto [`Poco`] types, caching one resolved [`Plan`] per target
/// type and result-set shape.
///
/// Cloning is cheap and clones share the cache.
#[derive(Clone)]
pub struct Mapper {
    separator: Arc<str>,
    plans: Cache<PlanKey, Arc<Plan>>,
}

impl std::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("separator", &self.separator)
            .field("cached_plans", &self.plans.entry_count())
            .finish()
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(&MapperOptions::default())
    }
}

impl Mapper {
    /// Creates a mapper with the given options.
    #[must_use]
    pub fn new(options: &MapperOptions) -> Self {
        Self {
            separator: Arc::from(options.separator.as_str()),
            plans: Cache::builder().max_capacity(options.plan_capacity).build(),
        }
    }

    /// Path separator used for prefixed column labels.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Resolve (or fetch from cache) the plan for `T` and the given ordered
    /// column labels.
    ///
    /// Label order is part of the cache key: repeated labels are assigned by
    /// position.
    ///
    /// # Errors
    ///
    /// Returns a resolution [`Error`] if the columns cannot be mapped onto `T`.
    pub fn plan<T: Poco>(&self, columns: &[&str]) -> Result<Arc<Plan>, Error> {
        let key = PlanKey {
            type_id: TypeId::of::<T>(),
            signature: columns.join(&SIGNATURE_DELIMITER.to_string()),
        };

        if let Some(plan) = self.plans.get(&key) {
            return Ok(plan);
        }

        // concurrent misses may resolve the same key twice; both results are equal
        let plan = Arc::new(resolve(&T::descriptor()?, columns, &self.separator)?);
        self.plans.insert(key, Arc::clone(&plan));
        Ok(plan)
    }

    /// Map every row of one result set onto `T`, preserving row order.
    ///
    /// # Errors
    ///
    /// Returns an error if the columns cannot be resolved or a value cannot be
    /// converted.
    pub fn map_rows<T: Poco>(&self, rows: &[Row]) -> Result<Vec<T>> {
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };

        let columns: Vec<&str> = first.columns().collect();
        let plan = self.plan::<T>(&columns)?;
        rows.iter().map(|row| materialize::<T>(&plan, row)).collect()
    }

    /// Map a single row onto `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the columns cannot be resolved or a value cannot be
    /// converted.
    pub fn map_row<T: Poco>(&self, row: &Row) -> Result<T> {
        let columns: Vec<&str> = row.columns().collect();
        let plan = self.plan::<T>(&columns)?;
        materialize(&plan, row)
    }
}
