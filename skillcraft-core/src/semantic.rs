//! # Semantic Functions
//!
//! A function whose body is a prompt. The `{{$name}}` placeholders become
//! declared parameters; invoking renders the prompt against the call
//! variables and asks the completion backend for the answer.

use crate::context::ExecutionContext;
use crate::error::{Error, ErrorKind, Result};
use crate::function::{FunctionView, ParameterView, SkillFunction};
use crate::provider::{CompletionSettings, LlmProvider};
use crate::template::{prompt_variables, render_prompt};
use crate::variables::INPUT_KEY;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct SemanticFunction {
    view: FunctionView,
    template: String,
    settings: CompletionSettings,
    provider: Option<Arc<dyn LlmProvider>>,
}

impl SemanticFunction {
    /// Create a semantic function; placeholders other than `input` are
    /// declared as parameters in first-use order
    pub fn new(collection: impl Into<String>, name: impl Into<String>, template: impl Into<String>) -> Self {
        let template = template.into();
        let mut view = FunctionView::new(collection, name).semantic();
        for variable in prompt_variables(&template) {
            if !variable.eq_ignore_ascii_case(INPUT_KEY) {
                view.parameters.push(ParameterView::new(variable, ""));
            }
        }
        Self {
            view,
            template,
            settings: CompletionSettings::default(),
            provider: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.view.description = description.into();
        self
    }

    /// Describe a declared parameter
    pub fn with_parameter_description(mut self, name: &str, description: impl Into<String>) -> Self {
        let description = description.into();
        match self
            .view
            .parameters
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(name))
        {
            Some(parameter) => parameter.description = description,
            None => self.view.parameters.push(ParameterView::new(name, description)),
        }
        self
    }

    pub fn with_settings(mut self, settings: CompletionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use this backend instead of the one on the context
    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }
}

#[async_trait]
impl SkillFunction for SemanticFunction {
    fn describe(&self) -> &FunctionView {
        &self.view
    }

    async fn invoke(&self, context: &ExecutionContext) -> Result<String> {
        let provider = self
            .provider
            .as_ref()
            .or_else(|| context.completion())
            .ok_or_else(|| {
                Error::new(ErrorKind::ProviderUnavailable, "no completion backend configured")
                    .with_operation("semantic::invoke")
                    .with_context("function", self.view.qualified_name())
                    .permanent()
            })?;

        let mut variables = context.variables().clone();
        self.view.apply_defaults(&mut variables);
        let prompt = render_prompt(&self.template, &variables);
        debug!(function = %self.view.qualified_name(), provider = provider.name(), "rendering semantic function");

        provider
            .complete_text(&prompt, &self.settings)
            .await
            .map_err(|e| {
                e.into_error()
                    .with_operation("semantic::invoke")
                    .with_context("function", self.view.qualified_name())
            })
    }
}
