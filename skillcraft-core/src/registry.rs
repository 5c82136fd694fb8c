//! # Function Registry
//!
//! Where plans and planners find functions. Lookups are case-insensitive on
//! both the collection and the function name; functions registered without
//! a collection live in [`GLOBAL_COLLECTION`].

use crate::error::{self, Result};
use crate::function::{FunctionView, SkillFunction, GLOBAL_COLLECTION};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Catalog of registered functions, grouped by collection in
/// registration order
#[derive(Debug, Clone, Default, Serialize)]
pub struct FunctionsView {
    pub native_functions: IndexMap<String, Vec<FunctionView>>,
    pub semantic_functions: IndexMap<String, Vec<FunctionView>>,
}

impl FunctionsView {
    /// Add a view to the right group
    pub fn add(&mut self, view: FunctionView) {
        let group = if view.is_semantic {
            &mut self.semantic_functions
        } else {
            &mut self.native_functions
        };
        group.entry(view.collection.clone()).or_default().push(view);
    }

    /// Every view, semantic functions first (the order planners list them)
    pub fn iter(&self) -> impl Iterator<Item = &FunctionView> {
        self.semantic_functions
            .values()
            .chain(self.native_functions.values())
            .flatten()
    }

    /// Total number of functions
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read-only lookup of functions by `(collection, name)`
pub trait FunctionRegistry: Send + Sync {
    /// Find a function; `None` collection means the global collection
    fn resolve(&self, collection: Option<&str>, name: &str) -> Option<Arc<dyn SkillFunction>>;

    /// Describe every registered function
    fn list_all(&self) -> FunctionsView;
}

/// In-memory registry
#[derive(Default)]
pub struct SkillCollection {
    /// Folded collection -> folded name -> function
    collections: IndexMap<String, IndexMap<String, Arc<dyn SkillFunction>>>,
}

impl std::fmt::Debug for SkillCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillCollection")
            .field("functions", &self.len())
            .finish()
    }
}

fn fold(s: &str) -> String {
    s.to_ascii_lowercase()
}

impl SkillCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the text, time and file skills
    pub fn with_core_skills() -> Self {
        let mut collection = Self::new();
        crate::skills::register_core_skills(&mut collection);
        collection
    }

    /// Register a function, replacing any function with the same name
    pub fn add_function(&mut self, function: Arc<dyn SkillFunction>) -> &mut Self {
        let view = function.describe();
        let collection = if view.collection.is_empty() {
            GLOBAL_COLLECTION
        } else {
            view.collection.as_str()
        };
        debug!(collection, name = %view.name, "registering function");

        let key = fold(&view.name);
        self.collections
            .entry(fold(collection))
            .or_default()
            .insert(key, function);
        self
    }

    /// Register an owned function
    pub fn register(&mut self, function: impl SkillFunction + 'static) -> &mut Self {
        self.add_function(Arc::new(function))
    }

    /// Builder-style registration
    pub fn with_function(mut self, function: impl SkillFunction + 'static) -> Self {
        self.register(function);
        self
    }

    /// Find a function or fail with `FunctionNotFound`
    pub fn get_function(&self, collection: Option<&str>, name: &str) -> Result<Arc<dyn SkillFunction>> {
        self.resolve(collection, name)
            .ok_or_else(|| error::function_not_found(collection, name))
    }

    /// Check if a function exists
    pub fn contains(&self, collection: Option<&str>, name: &str) -> bool {
        self.resolve(collection, name).is_some()
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.collections.values().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FunctionRegistry for SkillCollection {
    fn resolve(&self, collection: Option<&str>, name: &str) -> Option<Arc<dyn SkillFunction>> {
        let collection = collection.filter(|c| !c.is_empty()).unwrap_or(GLOBAL_COLLECTION);
        self.collections
            .get(&fold(collection))
            .and_then(|functions| functions.get(&fold(name)))
            .cloned()
    }

    fn list_all(&self) -> FunctionsView {
        let mut view = FunctionsView::default();
        for function in self.collections.values().flat_map(|c| c.values()) {
            view.add(function.describe().clone());
        }
        view
    }
}
