//! # Execution Context
//!
//! What a running step sees: its variables, the function registry, the
//! completion backend and a cancellation token. Scoped contexts share
//! everything except the variables.

use crate::provider::LlmProvider;
use crate::registry::FunctionRegistry;
use crate::variables::ContextVariables;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct ExecutionContext {
    variables: ContextVariables,
    functions: Arc<dyn FunctionRegistry>,
    completion: Option<Arc<dyn LlmProvider>>,
    cancellation: CancellationToken,
}

impl ExecutionContext {
    pub fn new(functions: Arc<dyn FunctionRegistry>) -> Self {
        Self {
            variables: ContextVariables::new(),
            functions,
            completion: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_variables(mut self, variables: ContextVariables) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_completion(mut self, completion: Arc<dyn LlmProvider>) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn variables(&self) -> &ContextVariables {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut ContextVariables {
        &mut self.variables
    }

    pub fn functions(&self) -> &Arc<dyn FunctionRegistry> {
        &self.functions
    }

    pub fn completion(&self) -> Option<&Arc<dyn LlmProvider>> {
        self.completion.as_ref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// A child context with the same registry, backend and token but its
    /// own variables
    pub fn scoped(&self, variables: ContextVariables) -> Self {
        Self {
            variables,
            functions: Arc::clone(&self.functions),
            completion: self.completion.clone(),
            cancellation: self.cancellation.clone(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// The primary result (`input`)
    pub fn result(&self) -> &str {
        self.variables.input()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("variables", &self.variables)
            .field("completion", &self.completion.as_ref().map(|c| c.name().to_string()))
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SkillCollection;

    #[test]
    fn test_scoped_shares_token_not_variables() {
        let token = CancellationToken::new();
        let mut parent = ExecutionContext::new(Arc::new(SkillCollection::new()))
            .with_cancellation(token.clone());
        parent.variables_mut().update("parent");

        let child = parent.scoped(ContextVariables::with_input("child"));
        assert_eq!(child.result(), "child");
        assert_eq!(parent.result(), "parent");

        token.cancel();
        assert!(child.is_cancelled());
        assert!(parent.is_cancelled());
    }
}
