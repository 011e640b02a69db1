use anyhow::{Context, Result};
use fromenv::FromEnv;

const DEFAULT_SEPARATOR: &str = "__";
const DEFAULT_PLAN_CAPACITY: u64 = 1024;

/// Options controlling how column labels are mapped.
///
/// Loaded from environment variables through [`rowmap_sql::FromEnv`] or built
/// in code.
#[derive(Debug, Clone, FromEnv)]
pub struct MapperOptions {
    /// Separator between path segments in prefixed column labels.
    #[env(from = "ROWMAP_PATH_SEPARATOR", default = "__")]
    pub separator: String,

    /// Maximum number of cached column plans.
    #[env(from = "ROWMAP_PLAN_CAPACITY", default = "1024")]
    pub plan_capacity: u64,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            plan_capacity: DEFAULT_PLAN_CAPACITY,
        }
    }
}

impl rowmap_sql::FromEnv for MapperOptions {
    fn from_env() -> Result<Self> {
        Self::from_env().finalize().context("issue loading mapper options")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = MapperOptions::default();
        assert_eq!(options.separator, "__");
        assert_eq!(options.plan_capacity, 1024);
    }
}
