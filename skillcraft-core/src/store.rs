//! # Plan Store
//!
//! Named, persisted plans. A plan is saved as its JSON record and rebound
//! against a registry when loaded, so a run can stop after any step and be
//! resumed later from the stored cursor.

use crate::error::{self, Result};
use crate::plan::{Plan, PlanRecord};
use crate::registry::FunctionRegistry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Storage backend trait
pub trait PlanStoreBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    fn set(&mut self, key: &str, value: serde_json::Value) -> Result<()>;
    fn delete(&mut self, key: &str) -> Result<()>;
    fn exists(&self, key: &str) -> bool;
    fn keys(&self) -> Vec<String>;
}

/// In-memory storage (volatile, but useful for testing)
#[derive(Debug, Clone, Default)]
pub struct MemoryPlanStore {
    data: HashMap<String, serde_json::Value>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlanStoreBackend for MemoryPlanStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: serde_json::Value) -> Result<()> {
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }
}

/// File-based storage, one pretty-printed JSON file per plan
pub struct FilePlanStore {
    base_path: PathBuf,
}

impl FilePlanStore {
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path).map_err(|e| {
            error::io_error(format!("Failed to create plan dir {}", base_path.display()))
                .with_operation("store::new")
                .set_source(e)
        })?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        // Sanitize key for use as filename
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        self.base_path.join(format!("{}.json", safe_key))
    }
}

impl PlanStoreBackend for FilePlanStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let path = self.key_to_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| {
            error::io_error(format!("Failed to read {}", path.display()))
                .with_operation("store::get")
                .set_source(e)
        })?;
        let value = serde_json::from_str(&content).map_err(|e| {
            error::serialization_error(format!("{} is not valid JSON", path.display()))
                .with_operation("store::get")
                .set_source(e)
        })?;
        Ok(Some(value))
    }

    fn set(&mut self, key: &str, value: serde_json::Value) -> Result<()> {
        let path = self.key_to_path(key);
        let content = serde_json::to_string_pretty(&value).map_err(|e| {
            error::serialization_error("failed to encode plan")
                .with_operation("store::set")
                .set_source(e)
        })?;
        std::fs::write(&path, content).map_err(|e| {
            error::io_error(format!("Failed to write {}", path.display()))
                .with_operation("store::set")
                .set_source(e)
        })
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let path = self.key_to_path(key);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| {
                error::io_error(format!("Failed to delete {}", path.display()))
                    .with_operation("store::delete")
                    .set_source(e)
            })?;
        }
        Ok(())
    }

    fn exists(&self, key: &str) -> bool {
        self.key_to_path(key).exists()
    }

    fn keys(&self) -> Vec<String> {
        std::fs::read_dir(&self.base_path)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| {
                        let path = e.path();
                        if path.extension().map(|ext| ext == "json").unwrap_or(false) {
                            path.file_stem()
                                .and_then(|s| s.to_str())
                                .map(|s| s.to_string())
                        } else {
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// High-level plan store
pub struct PlanStore {
    backend: Box<dyn PlanStoreBackend>,
    /// Namespace prefix for keys
    namespace: Option<String>,
}

impl PlanStore {
    /// Create a store with an in-memory backend
    pub fn memory() -> Self {
        Self::with_backend(MemoryPlanStore::new())
    }

    /// Create a store with a file backend rooted at `path`
    pub fn file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::with_backend(FilePlanStore::new(path)?))
    }

    /// Create a store with a custom backend
    pub fn with_backend(backend: impl PlanStoreBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            namespace: None,
        }
    }

    /// Set namespace for all operations
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn full_key(&self, key: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, key),
            None => key.to_string(),
        }
    }

    /// Save `plan` under `name`, replacing any earlier version
    pub fn save(&mut self, name: &str, plan: &Plan) -> Result<()> {
        let value = serde_json::to_value(plan.to_record()).map_err(|e| {
            error::serialization_error("failed to encode plan")
                .with_operation("store::save")
                .set_source(e)
        })?;
        self.backend.set(&self.full_key(name), value)
    }

    /// Load the plan saved under `name`, rebinding it when a registry is given
    pub fn load(&self, name: &str, registry: Option<&dyn FunctionRegistry>) -> Result<Plan> {
        let value = self
            .backend
            .get(&self.full_key(name))?
            .ok_or_else(|| error::storage_not_found(name).with_operation("store::load"))?;

        let record: PlanRecord = serde_json::from_value(value).map_err(|e| {
            error::serialization_error(format!("stored plan '{}' is malformed", name))
                .with_operation("store::load")
                .set_source(e)
        })?;

        let mut plan = Plan::from_record(record)?;
        if let Some(registry) = registry {
            plan.bind_functions(registry);
        }
        Ok(plan)
    }

    /// Delete a saved plan
    pub fn delete(&mut self, name: &str) -> Result<()> {
        self.backend.delete(&self.full_key(name))
    }

    /// Check if a plan is saved under `name`
    pub fn exists(&self, name: &str) -> bool {
        self.backend.exists(&self.full_key(name))
    }

    /// Names of saved plans, sorted
    pub fn list(&self) -> Vec<String> {
        let prefix = self.namespace.as_ref().map(|ns| format!("{}.", ns));
        let mut names: Vec<String> = self
            .backend
            .keys()
            .into_iter()
            .filter_map(|k| {
                if let Some(ref p) = prefix {
                    k.strip_prefix(p).map(|s| s.to_string())
                } else {
                    Some(k)
                }
            })
            .collect();
        names.sort();
        names
    }
}
