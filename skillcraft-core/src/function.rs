//! # Skill Functions
//!
//! The single capability every plan leaf wraps. A function describes itself
//! with a [`FunctionView`] (used by planners to build the catalog and by
//! the executor to find declared parameters) and turns the call variables
//! into a string result.

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::variables::ContextVariables;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Collection used for functions registered without one
pub const GLOBAL_COLLECTION: &str = "_GLOBAL_FUNCTIONS_";

/// A declared function parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterView {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl ParameterView {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            default_value: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// Self-description of a function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionView {
    pub collection: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParameterView>,
    #[serde(default)]
    pub is_semantic: bool,
}

impl FunctionView {
    pub fn new(collection: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
            is_semantic: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.parameters.push(ParameterView::new(name, description));
        self
    }

    pub fn with_parameter_view(mut self, parameter: ParameterView) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn semantic(mut self) -> Self {
        self.is_semantic = true;
        self
    }

    /// `collection.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.collection, self.name)
    }

    /// Whether this function lives in the global collection
    pub fn is_global(&self) -> bool {
        self.collection.eq_ignore_ascii_case(GLOBAL_COLLECTION)
    }

    /// Fill in parameter defaults missing from `variables`
    pub fn apply_defaults(&self, variables: &mut ContextVariables) {
        for parameter in &self.parameters {
            if let Some(default) = &parameter.default_value {
                if variables.get_non_empty(&parameter.name).is_none() {
                    variables.set(parameter.name.clone(), default.clone());
                }
            }
        }
    }
}

/// An invocable skill
#[async_trait]
pub trait SkillFunction: Send + Sync {
    /// Describe this function
    fn describe(&self) -> &FunctionView;

    /// Run against the variables of `context`, returning the result text
    async fn invoke(&self, context: &ExecutionContext) -> Result<String>;
}

impl fmt::Debug for dyn SkillFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SkillFunction({})", self.describe().qualified_name())
    }
}

type NativeHandler = dyn Fn(&ContextVariables) -> Result<String> + Send + Sync;

/// A function backed by a Rust closure over the call variables
pub struct NativeFunction {
    view: FunctionView,
    handler: Arc<NativeHandler>,
}

impl NativeFunction {
    pub fn new<F>(view: FunctionView, handler: F) -> Self
    where
        F: Fn(&ContextVariables) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            view,
            handler: Arc::new(handler),
        }
    }
}

#[async_trait]
impl SkillFunction for NativeFunction {
    fn describe(&self) -> &FunctionView {
        &self.view
    }

    async fn invoke(&self, context: &ExecutionContext) -> Result<String> {
        let mut variables = context.variables().clone();
        self.view.apply_defaults(&mut variables);
        (self.handler)(&variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SkillCollection;

    fn echo() -> NativeFunction {
        NativeFunction::new(
            FunctionView::new("TestSkill", "Echo")
                .with_description("Echo the input")
                .with_parameter_view(ParameterView::new("suffix", "").with_default("!")),
            |vars| Ok(format!("{}{}", vars.input(), vars.get("suffix").unwrap_or(""))),
        )
    }

    #[test]
    fn test_function_view() {
        let view = FunctionView::new("FileIOSkill", "WriteAsync")
            .with_description("Write a file")
            .with_parameter("path", "Destination file")
            .with_parameter("content", "File content");

        assert_eq!(view.qualified_name(), "FileIOSkill.WriteAsync");
        assert_eq!(view.parameters.len(), 2);
        assert!(!view.is_semantic);
        assert!(!view.is_global());
        assert!(FunctionView::new(GLOBAL_COLLECTION, "Joke").is_global());
    }

    #[tokio::test]
    async fn test_native_function_defaults() {
        let function = echo();
        let registry = Arc::new(SkillCollection::new());

        let ctx = ExecutionContext::new(registry.clone())
            .with_variables(ContextVariables::with_input("hi"));
        assert_eq!(function.invoke(&ctx).await.unwrap(), "hi!");

        let mut vars = ContextVariables::with_input("hi");
        vars.set("suffix", "?");
        let ctx = ExecutionContext::new(registry).with_variables(vars);
        assert_eq!(function.invoke(&ctx).await.unwrap(), "hi?");
    }

    #[test]
    fn test_debug_names_function() {
        let function: Arc<dyn SkillFunction> = Arc::new(echo());
        assert_eq!(format!("{:?}", function), "SkillFunction(TestSkill.Echo)");
    }
}
