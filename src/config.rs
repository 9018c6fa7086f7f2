use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::limits::{Limit, SandboxLimits};
use crate::pool::{DEFAULT_MATRIX_CAPACITY, DEFAULT_VECTOR_CAPACITY};

#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "PoolConfig::default_vector_capacity")]
    pub vector_capacity: usize,
    #[serde(default = "PoolConfig::default_matrix_capacity")]
    pub matrix_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptConfig {
    /// Upper bound on guest operations per call; 0 disables the bound.
    #[serde(default)]
    pub max_operations: u64,
    #[serde(default = "ScriptConfig::default_fast_operators")]
    pub fast_operators: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SandboxConfig {
    #[serde(default)]
    pub pools: PoolConfig,
    #[serde(default)]
    pub script: ScriptConfig,
}

#[derive(Debug, Clone, Default)]
pub struct SandboxOverrides {
    pub vector_capacity: Option<usize>,
    pub max_operations: Option<u64>,
    pub fast_operators: Option<bool>,
}

impl PoolConfig {
    const fn default_vector_capacity() -> usize {
        DEFAULT_VECTOR_CAPACITY
    }

    const fn default_matrix_capacity() -> usize {
        DEFAULT_MATRIX_CAPACITY
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            vector_capacity: Self::default_vector_capacity(),
            matrix_capacity: Self::default_matrix_capacity(),
        }
    }
}

impl ScriptConfig {
    const fn default_fast_operators() -> bool {
        true
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self { max_operations: 0, fast_operators: Self::default_fast_operators() }
    }
}

impl SandboxConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &SandboxOverrides) {
        if let Some(capacity) = overrides.vector_capacity {
            self.pools.vector_capacity = capacity;
        }
        if let Some(max_operations) = overrides.max_operations {
            self.script.max_operations = max_operations;
        }
        if let Some(fast_operators) = overrides.fast_operators {
            self.script.fast_operators = fast_operators;
        }
    }
}

impl SandboxLimits for SandboxConfig {
    fn limit(&self, key: Limit) -> Option<u64> {
        match key {
            Limit::VectorPoolCapacity => Some(self.pools.vector_capacity as u64),
            Limit::MatrixPoolCapacity => Some(self.pools.matrix_capacity as u64),
            Limit::MaxOperations => (self.script.max_operations > 0).then_some(self.script.max_operations),
        }
    }
}

impl SandboxOverrides {
    pub fn is_empty(&self) -> bool {
        self.vector_capacity.is_none() && self.max_operations.is_none() && self.fast_operators.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.vector_capacity.is_some() {
            fields.push("vector_capacity");
        }
        if self.max_operations.is_some() {
            fields.push("max_operations");
        }
        if self.fast_operators.is_some() {
            fields.push("fast_operators");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: SandboxConfig = serde_json::from_str(r#"{ "pools": { "vector_capacity": 12 } }"#).unwrap();
        assert_eq!(cfg.pools.vector_capacity, 12);
        assert_eq!(cfg.pools.matrix_capacity, DEFAULT_MATRIX_CAPACITY);
        assert!(cfg.script.fast_operators);
        assert_eq!(cfg.limit(Limit::MaxOperations), None);
    }

    #[test]
    fn load_reads_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "script": {{ "max_operations": 5000 }} }}"#).unwrap();
        let cfg = SandboxConfig::load(file.path()).unwrap();
        assert_eq!(cfg.limit(Limit::MaxOperations), Some(5000));
        assert_eq!(cfg.limit(Limit::VectorPoolCapacity), Some(DEFAULT_VECTOR_CAPACITY as u64));
    }

    #[test]
    fn unreadable_config_falls_back() {
        let cfg = SandboxConfig::load_or_default("does/not/exist.json");
        assert_eq!(cfg.pools.vector_capacity, DEFAULT_VECTOR_CAPACITY);
    }

    #[test]
    fn overrides_replace_values() {
        let mut cfg = SandboxConfig::default();
        let overrides = SandboxOverrides { vector_capacity: Some(8), ..Default::default() };
        cfg.apply_overrides(&overrides);
        assert_eq!(cfg.pools.vector_capacity, 8);
        assert_eq!(overrides.applied_fields(), vec!["vector_capacity"]);
    }
}
