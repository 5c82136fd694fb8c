//! # Skillcraft Core
//!
//! Plans made of skills, and the engine that runs them one step at a time.
//!
//! ## Core Concepts
//! - **Variables**: Ordered, case-insensitive string bag with a primary `input`
//! - **Skills**: Functions (native closures or prompt templates) grouped in collections
//! - **Registry**: Case-insensitive lookup of skills by `(collection, name)`
//! - **Plans**: Trees of steps with a cursor, state and named parameters/outputs
//! - **Executor**: Resolves each step's variables, runs it, folds the result back
//! - **Provider**: Trait-based LLM communication (OpenAI-compatible, Anthropic)

pub mod context;
pub mod error;
pub mod function;
pub mod plan;
pub mod provider;
pub mod registry;
pub mod semantic;
pub mod skills;
pub mod store;
pub mod template;
pub mod variables;

pub use context::ExecutionContext;
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use function::{FunctionView, NativeFunction, ParameterView, SkillFunction, GLOBAL_COLLECTION};
pub use plan::{Plan, PlanRecord, PLAN_COLLECTION};
pub use provider::{
    create_provider, AnthropicProvider, ChatMessage, CompletionRequest, CompletionResponse,
    CompletionSettings, FinishReason, LlmProvider, OpenAIProvider, ProviderConfig, ProviderError,
    ProviderType, Role, Usage,
};
pub use registry::{FunctionRegistry, FunctionsView, SkillCollection};
pub use semantic::SemanticFunction;
pub use store::{FilePlanStore, MemoryPlanStore, PlanStore, PlanStoreBackend};
pub use template::{expand_variables, render_prompt};
pub use variables::{ContextVariables, INPUT_KEY};

// Cancellation for ExecutionContext::with_cancellation
pub use tokio_util::sync::CancellationToken;
