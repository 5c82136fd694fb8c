//! Single-step planner backed by a completion model.

use std::sync::Arc;

use async_trait::async_trait;
use skillcraft_core::{Error, FunctionRegistry, LlmProvider, Plan, Result};
use tracing::{debug, info, warn};

use crate::config::ActionPlannerConfig;
use crate::planner::Planner;
use crate::prompt;
use crate::response::{ActionPlanResponse, PlanStepResponse};

const OPERATION: &str = "planner::create_plan";

/// Picks the one registered function that best serves a goal.
///
/// The resulting plan has the chosen function as its only step (or no step
/// at all when nothing fits) and the suggested arguments in its state.
pub struct ActionPlanner {
    functions: Arc<dyn FunctionRegistry>,
    provider: Arc<dyn LlmProvider>,
    config: ActionPlannerConfig,
}

impl ActionPlanner {
    pub fn new(functions: Arc<dyn FunctionRegistry>, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            functions,
            provider,
            config: ActionPlannerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ActionPlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ActionPlannerConfig {
        &self.config
    }

    /// The function catalog as the model sees it
    pub fn list_functions(&self) -> String {
        prompt::function_catalog(&self.functions.list_all(), &self.config)
    }

    fn build_plan(&self, goal: &str, step: PlanStepResponse) -> Result<Plan> {
        let mut plan = Plan::new(goal);

        match step.function_parts() {
            Some((collection, name)) => {
                let function = self.functions.resolve(collection, name).ok_or_else(|| {
                    warn!(function = %step.function, "planner picked an unknown function");
                    Error::function_not_found(collection, name).with_operation(OPERATION)
                })?;
                plan.add_function_step(function);
            }
            None => info!(goal, "no function matches the goal"),
        }

        for (key, value) in step.parameters.iter() {
            plan.state_mut().set(key, value);
        }

        if !step.rationale.is_empty() {
            plan = plan.with_rationale(step.rationale);
        }
        Ok(plan)
    }
}

#[async_trait]
impl Planner for ActionPlanner {
    async fn create_plan(&self, goal: &str) -> Result<Plan> {
        if goal.trim().is_empty() {
            return Err(Error::invalid_goal("the goal specified is empty").with_operation(OPERATION));
        }

        let catalog = self.list_functions();
        let prompt = prompt::planner_prompt(goal, &catalog, &self.config);
        debug!(provider = self.provider.name(), prompt_len = prompt.len(), "requesting plan");

        let completion = self
            .provider
            .complete_text(&prompt, &self.config.completion_settings())
            .await
            .map_err(|e| e.into_error().with_operation(OPERATION).with_context("goal", goal))?;

        let response = ActionPlanResponse::from_completion(&completion, &self.config.stop_sequence)
            .map_err(|e| {
                warn!(error = %e, "planner returned an unusable answer");
                e.with_context("completion", completion.clone())
            })?;

        let plan = self.build_plan(goal, response.plan)?;
        info!(goal, steps = plan.steps().len(), "plan created");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillcraft_core::{
        CompletionRequest, CompletionResponse, ErrorKind, ExecutionContext, FinishReason, FunctionView,
        NativeFunction, ProviderError, SkillCollection, Usage, GLOBAL_COLLECTION,
    };
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    /// Answers every request with the same text and records what it was sent
    struct ScriptedProvider {
        answer: String,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn new(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: answer.to_string(),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last_prompt(&self) -> String {
            let requests = self.requests.lock().unwrap();
            requests.last().unwrap().messages[0].content.clone().unwrap()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "scripted-1"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ProviderError> {
            self.requests.lock().unwrap().push(request);
            Ok(CompletionResponse {
                id: "plan-1".into(),
                model: "scripted-1".into(),
                content: Some(self.answer.clone()),
                finish_reason: FinishReason::Stop,
                usage: Usage::default(),
            })
        }
    }

    fn registry() -> Arc<SkillCollection> {
        let mut collection = SkillCollection::with_core_skills();
        collection.register(NativeFunction::new(
            FunctionView::new("this", "ListOfFunctions").with_description("List all functions"),
            |_| Ok(String::new()),
        ));
        collection.register(NativeFunction::new(
            FunctionView::new(GLOBAL_COLLECTION, "Greet").with_description("Say hello"),
            |vars| Ok(format!("hello {}", vars.input())),
        ));
        Arc::new(collection)
    }

    const WRITE_ANSWER: &str = r#"
"the list contains a function that allows to create files",
"function": "FileIOSkill.WriteAsync",
"parameters": {
"path": "something.txt",
"content": null
}}}"#;

    #[tokio::test]
    async fn test_write_file_goal() {
        let provider = ScriptedProvider::new(WRITE_ANSWER);
        let planner = ActionPlanner::new(registry(), provider.clone());

        let plan = assert_ok!(planner.create_plan("create a file called \"something.txt\"").await);
        assert_eq!(provider.calls(), 1);
        assert_eq!(plan.description(), "create a file called \"something.txt\"");
        assert_eq!(plan.steps().len(), 1);
        assert_eq!(plan.steps()[0].qualified_name(), "FileIOSkill.WriteAsync");
        assert_eq!(plan.state().get("path"), Some("something.txt"));
        assert!(!plan.state().contains_key("content"));
        assert_eq!(
            plan.rationale(),
            Some("the list contains a function that allows to create files")
        );
    }

    #[tokio::test]
    async fn test_request_settings_and_prompt() {
        let provider = ScriptedProvider::new(WRITE_ANSWER);
        let planner = ActionPlanner::new(registry(), provider.clone());
        assert_ok!(planner.create_plan("create a file").await);

        let request = provider.requests.lock().unwrap()[0].clone();
        assert_eq!(request.max_tokens, Some(1024));
        assert_eq!(request.stop, Some(vec!["#END-OF-PLAN".to_string()]));

        let prompt = provider.last_prompt();
        assert!(prompt.contains("FileIOSkill.WriteAsync\nParameter \"path\": Destination file."));
        assert!(prompt.contains("Goal: create a file\n"));
        assert!(!prompt.contains("ListOfFunctions"));
    }

    #[tokio::test]
    async fn test_no_matching_function() {
        let answer = r#" "the list does not contain functions to tell jokes or something funny",
"function": "",
"parameters": {}
}}}"#;
        let provider = ScriptedProvider::new(answer);
        let planner = ActionPlanner::new(registry(), provider.clone());

        let plan = assert_ok!(planner.create_plan("tell me a joke").await);
        assert!(plan.steps().is_empty());
        assert!(plan.state().is_empty());
        assert_eq!(plan.description(), "tell me a joke");

        let mut plan = plan;
        let mut ctx = ExecutionContext::new(registry());
        ctx.variables_mut().update("tell me a joke");
        assert_ok!(plan.invoke(&mut ctx).await);
        assert_eq!(ctx.result(), "tell me a joke");
        assert_eq!(ctx.variables().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_goal() {
        let provider = ScriptedProvider::new(WRITE_ANSWER);
        let planner = ActionPlanner::new(registry(), provider.clone());

        let err = assert_err!(planner.create_plan("").await);
        assert_eq!(err.kind(), ErrorKind::InvalidGoal);
        let err = assert_err!(planner.create_plan("   \n").await);
        assert_eq!(err.kind(), ErrorKind::InvalidGoal);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_answer() {
        let provider = ScriptedProvider::new("I think you should write a file.");
        let planner = ActionPlanner::new(registry(), provider.clone());

        let err = assert_err!(planner.create_plan("create a file").await);
        assert_eq!(err.kind(), ErrorKind::InvalidPlan);
        assert!(err.source_ref().is_some());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_function() {
        let provider = ScriptedProvider::new(r#" "r", "function": "EmailSkill.Send", "parameters": {}}}"#);
        let planner = ActionPlanner::new(registry(), provider);

        let err = assert_err!(planner.create_plan("email my boss").await);
        assert_eq!(err.kind(), ErrorKind::FunctionNotFound);
    }

    #[tokio::test]
    async fn test_bare_name_resolves_globally() {
        let provider = ScriptedProvider::new(r#" "r", "function": "greet", "parameters": {"input": "world"}}}"#);
        let planner = ActionPlanner::new(registry(), provider);

        let plan = assert_ok!(planner.create_plan("say hello to the world").await);
        assert_eq!(plan.steps()[0].name(), "Greet");
        assert_eq!(plan.state().input(), "world");
    }

    #[tokio::test]
    async fn test_sloppy_answer() {
        let answer = "\"r\",\n\"Function\": \"TextSkill.Uppercase\",\n\"Parameters\": {\"input\": \"shout\",},\n}}\n#END-OF-PLAN\nGoal: next";
        let provider = ScriptedProvider::new(answer);
        let planner = ActionPlanner::new(registry(), provider);

        let plan = assert_ok!(planner.create_plan("shout").await);
        assert_eq!(plan.steps()[0].qualified_name(), "TextSkill.Uppercase");
    }

    #[tokio::test]
    async fn test_excluded_collection_hidden() {
        let provider = ScriptedProvider::new(WRITE_ANSWER);
        let config = ActionPlannerConfig::default().exclude_collection("TimeSkill");
        let planner = ActionPlanner::new(registry(), provider).with_config(config);

        let catalog = planner.list_functions();
        assert!(!catalog.contains("TimeSkill"));
        assert!(!catalog.contains("this."));
        assert!(catalog.contains("TextSkill.Uppercase"));
    }

    #[tokio::test]
    async fn test_plan_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let answer = format!(
            r#" "write it", "function": "FileIOSkill.WriteAsync", "parameters": {{"path": {}, "content": "planned"}}}}}}"#,
            serde_json::to_string(&path.to_string_lossy()).unwrap()
        );
        let functions = registry();
        let planner = ActionPlanner::new(functions.clone(), ScriptedProvider::new(&answer));

        let mut plan = assert_ok!(planner.create_plan("write a file").await);
        let mut ctx = ExecutionContext::new(functions);
        assert_ok!(plan.invoke(&mut ctx).await);

        assert!(!plan.has_next_step());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "planned");
    }
}
