use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;

use super::Versioner;
use crate::fs::Filesystem;

/// Constructor for a versioner: folder id, folder filesystem, string parameters
pub type VersionerFactory =
    fn(&str, Arc<dyn Filesystem>, &HashMap<String, String>) -> Arc<dyn Versioner>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("versioner not found: {0}")]
    NotFound(String),
}

/// Registry mapping versioning type names to their constructors
#[derive(Clone)]
pub struct VersionerRegistry {
    factories: BTreeMap<String, VersionerFactory>,
}

impl VersionerRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, kind: impl Into<String>, factory: VersionerFactory) {
        self.factories.insert(kind.into(), factory);
    }

    pub fn create(
        &self,
        kind: &str,
        folder_id: &str,
        filesystem: Arc<dyn Filesystem>,
        params: &HashMap<String, String>,
    ) -> Result<Arc<dyn Versioner>, RegistryError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| RegistryError::NotFound(kind.to_string()))?;
        Ok(factory(folder_id, filesystem, params))
    }

    pub fn has_versioner(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Create a registry with the built-in versioners
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("trashcan", super::trashcan::factory);
        registry
    }
}

impl Default for VersionerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
