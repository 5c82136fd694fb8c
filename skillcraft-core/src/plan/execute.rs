//! Step variable resolution and the plan executor

use super::Plan;
use crate::context::ExecutionContext;
use crate::error::{self, ErrorKind, Result};
use crate::template::expand_variables;
use crate::variables::{ContextVariables, INPUT_KEY};
use futures_util::future::BoxFuture;
use tracing::{debug, info, warn};

impl Plan {
    /// Build the argument bag for `step`, the next child of this plan.
    ///
    /// Input comes from the call site, then from state, then defaults to
    /// this plan's description (or empty when `step` is itself composite).
    /// Declared parameters are copied from the call site or state when
    /// non-empty; named parameters are applied last and always win.
    pub fn next_step_variables(&self, variables: &ContextVariables, step: &Plan) -> ContextVariables {
        let default_input = if step.steps.is_empty() {
            self.description.as_str()
        } else {
            ""
        };
        let input = [variables.input(), self.state.input()]
            .into_iter()
            .find(|v| !v.is_empty())
            .unwrap_or(default_input);

        let mut step_variables = ContextVariables::with_input(input);

        for parameter in step.describe().parameters {
            let value = variables
                .get_non_empty(&parameter.name)
                .or_else(|| self.state.get_non_empty(&parameter.name));
            if let Some(value) = value {
                step_variables.set(parameter.name.clone(), value);
            }
        }

        for (key, template) in step.named_parameters.iter() {
            if !template.is_empty() {
                step_variables.set(key, expand_variables(template, variables, &self.state));
            } else if let Some(value) = variables
                .get_non_empty(key)
                .or_else(|| self.state.get_non_empty(key))
            {
                step_variables.set(key, value);
            }
        }

        step_variables
    }

    /// Run the child under the cursor and fold its result into state.
    ///
    /// A no-op once every step has run. Fails with `Cancelled` before the
    /// step starts if the context's token is cancelled. On failure the
    /// cursor stays put and state is untouched.
    pub fn invoke_next_step<'a>(&'a mut self, context: &'a ExecutionContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if !self.has_next_step() {
                return Ok(());
            }

            let index = self.next_step_index;
            if context.is_cancelled() {
                info!(plan = %self.name, step_index = index, "plan cancelled");
                return Err(error::cancelled(index).with_context("plan", self.name.clone()));
            }

            let variables = self.next_step_variables(context.variables(), &self.steps[index]);
            debug!(
                plan = %self.name,
                step_index = index,
                variables = ?variables.keys().collect::<Vec<_>>(),
                "resolved step variables"
            );

            let step = &mut self.steps[index];
            let step_name = step.qualified_name();
            if step.function.is_none() && step.steps.is_empty() {
                return Err(error::function_not_bound(step_name)
                    .with_operation("plan::invoke_next_step")
                    .with_context("step_index", index.to_string()));
            }

            info!(step = %step_name, step_index = index, "running plan step");
            let mut step_context = context.scoped(variables);
            if let Err(err) = step.invoke(&mut step_context).await {
                // Failures from nested plans are already wrapped by the innermost step
                if matches!(
                    err.kind(),
                    ErrorKind::Cancelled | ErrorKind::FunctionNotBound | ErrorKind::FunctionInvokeFailed
                ) {
                    return Err(err);
                }
                warn!(step = %step_name, step_index = index, error = %err, "plan step failed");
                return Err(error::step_failed(step_name, index, err).with_operation("plan::invoke_next_step"));
            }

            let result = step_context.result().trim().to_string();
            let outputs: Vec<String> = step
                .named_outputs
                .keys()
                .filter(|key| !key.eq_ignore_ascii_case(INPUT_KEY))
                .map(str::to_string)
                .collect();

            self.state.update(result.clone());
            for key in outputs {
                self.state.set(key, result.clone());
            }
            self.next_step_index += 1;
            Ok(())
        })
    }

    /// Run this plan to completion.
    ///
    /// A leaf invokes its function once and stores the result as the
    /// context input. A composite runs its remaining steps in order,
    /// checking for cancellation before each one.
    pub fn invoke<'a>(&'a mut self, context: &'a mut ExecutionContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if let Some(function) = self.function.clone() {
                let result = function.invoke(context).await?;
                context.variables_mut().update(result);
                return Ok(());
            }

            while self.has_next_step() {
                context.variables_mut().merge_missing(&self.state);
                self.invoke_next_step(context).await?;

                let input = self.state.input().to_string();
                context.variables_mut().update(input);
            }
            Ok(())
        })
    }

    /// Run one step with a fresh set of call-site variables
    pub async fn run_next_step(&mut self, context: &ExecutionContext, variables: ContextVariables) -> Result<()> {
        let step_context = context.scoped(variables);
        self.invoke_next_step(&step_context).await
    }

    /// Set the context input, then [`invoke`](Self::invoke)
    pub async fn invoke_with_input(&mut self, input: impl Into<String>, context: &mut ExecutionContext) -> Result<()> {
        context.variables_mut().update(input);
        self.invoke(context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::function::{FunctionView, NativeFunction, SkillFunction};
    use crate::registry::SkillCollection;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio_test::{assert_err, assert_ok};
    use tokio_util::sync::CancellationToken;

    fn context() -> ExecutionContext {
        ExecutionContext::new(Arc::new(SkillCollection::new()))
    }

    fn native<F>(collection: &str, name: &str, params: &[&str], f: F) -> Arc<dyn SkillFunction>
    where
        F: Fn(&ContextVariables) -> Result<String> + Send + Sync + 'static,
    {
        let mut view = FunctionView::new(collection, name);
        for p in params {
            view = view.with_parameter(*p, "");
        }
        Arc::new(NativeFunction::new(view, f))
    }

    /// Records every bag it was called with and returns `reply`
    fn recorder(name: &str, params: &[&str], reply: &'static str) -> (Arc<dyn SkillFunction>, Arc<Mutex<Vec<ContextVariables>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();
        let function = native("TestSkill", name, params, move |vars| {
            seen.lock().unwrap().push(vars.clone());
            Ok(reply.to_string())
        });
        (function, calls)
    }

    fn upper() -> Arc<dyn SkillFunction> {
        native("TextSkill", "Uppercase", &[], |vars| Ok(vars.input().to_uppercase()))
    }

    #[test]
    fn test_default_input_is_description() {
        let (step, _) = recorder("Echo", &[], "");
        let plan = Plan::with_steps("write a poem", [Plan::from_function(step)]);

        let vars = plan.next_step_variables(&ContextVariables::new(), &plan.steps()[0]);
        assert_eq!(vars.input(), "write a poem");
    }

    #[test]
    fn test_default_input_empty_for_composite_child() {
        let (step, _) = recorder("Echo", &[], "");
        let child = Plan::with_steps("inner", [Plan::from_function(step)]);
        let plan = Plan::with_steps("outer", [child]);

        let vars = plan.next_step_variables(&ContextVariables::new(), &plan.steps()[0]);
        assert_eq!(vars.input(), "");
    }

    #[test]
    fn test_input_precedence() {
        let (step, _) = recorder("Echo", &[], "");
        let plan = Plan::with_steps("goal", [Plan::from_function(step)]).with_state("input", "from state");

        let vars = plan.next_step_variables(&ContextVariables::with_input("from caller"), &plan.steps()[0]);
        assert_eq!(vars.input(), "from caller");

        // empty call-site input falls through to state
        let vars = plan.next_step_variables(&ContextVariables::with_input(""), &plan.steps()[0]);
        assert_eq!(vars.input(), "from state");
    }

    #[test]
    fn test_declared_parameters() {
        let (step, _) = recorder("Write", &["path", "content", "mode"], "");
        let plan = Plan::with_steps("goal", [Plan::from_function(step)])
            .with_state("path", "state.txt")
            .with_state("content", "from state")
            .with_state("unrelated", "x");

        let mut call = ContextVariables::new();
        call.set("path", "call.txt");
        call.set("content", "");

        let vars = plan.next_step_variables(&call, &plan.steps()[0]);
        assert_eq!(vars.get("path"), Some("call.txt"));
        assert_eq!(vars.get("content"), Some("from state"));
        assert_eq!(vars.get("mode"), None);
        assert_eq!(vars.get("unrelated"), None);
    }

    #[test]
    fn test_named_parameters_override_declared() {
        let (step, _) = recorder("Write", &["path"], "");
        let plan = Plan::with_steps(
            "goal",
            [Plan::from_function(step)
                .with_named_parameter("path", "$dir/$file")
                .with_named_parameter("mode", "")],
        )
        .with_state("dir", "/tmp")
        .with_state("mode", "append");

        let mut call = ContextVariables::new();
        call.set("path", "ignored.txt");
        call.set("file", "out.txt");

        let vars = plan.next_step_variables(&call, &plan.steps()[0]);
        assert_eq!(vars.get("path"), Some("/tmp/out.txt"));
        assert_eq!(vars.get("mode"), Some("append"));
    }

    #[tokio::test]
    async fn test_cursor_advances_and_stops() {
        let mut plan = Plan::with_steps(
            "goal",
            (0..3).map(|_| Plan::from_function(upper())).collect::<Vec<_>>(),
        );
        let ctx = context();

        for n in 1..=5 {
            assert_ok!(plan.invoke_next_step(&ctx).await);
            assert_eq!(plan.next_step_index(), n.min(3));
        }
        assert!(!plan.has_next_step());
    }

    #[tokio::test]
    async fn test_result_trimmed_into_state() {
        let padded = native("TestSkill", "Pad", &[], |_| Ok("  spaced out \n".to_string()));
        let mut plan = Plan::with_steps("goal", [Plan::from_function(padded)]);

        assert_ok!(plan.invoke_next_step(&context()).await);
        assert_eq!(plan.state().input(), "spaced out");
    }

    #[tokio::test]
    async fn test_named_output_aliasing() {
        let (first, _) = recorder("First", &[], "alpha");
        let (second, calls) = recorder("Second", &["previous"], "beta");

        let mut plan = Plan::with_steps(
            "goal",
            [
                Plan::from_function(first)
                    .with_named_output("previous")
                    .with_named_output("INPUT"),
                Plan::from_function(second).with_named_parameter("label", "got $previous"),
            ],
        );

        let mut ctx = context();
        assert_ok!(plan.invoke(&mut ctx).await);

        assert_eq!(plan.state().get("previous"), Some("alpha"));
        assert_eq!(plan.state().input(), "beta");
        assert_eq!(ctx.result(), "beta");

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].get("previous"), Some("alpha"));
        assert_eq!(calls[0].get("label"), Some("got alpha"));
        assert_eq!(calls[0].input(), "alpha");
    }

    #[tokio::test]
    async fn test_chain_threads_input() {
        let exclaim = native("TestSkill", "Exclaim", &[], |vars| Ok(format!("{}!", vars.input())));
        let mut plan = Plan::with_steps("goal", [Plan::from_function(upper()), Plan::from_function(exclaim)]);

        let mut ctx = context();
        assert_ok!(plan.invoke_with_input("hello", &mut ctx).await);
        assert_eq!(ctx.result(), "HELLO!");
        assert_eq!(plan.next_step_index(), 2);
    }

    #[tokio::test]
    async fn test_failing_step_keeps_cursor() {
        let failing = native("WriterSkill", "Summarize", &[], |_| {
            Err(Error::inference_failed("model unavailable"))
        });
        let mut plan = Plan::with_steps("goal", [Plan::from_function(upper()), Plan::from_function(failing)]);

        let mut ctx = context();
        let err = assert_err!(plan.invoke_with_input("x", &mut ctx).await);

        assert_eq!(plan.next_step_index(), 1);
        assert_eq!(plan.state().input(), "X");
        assert_eq!(err.kind(), ErrorKind::FunctionInvokeFailed);
        assert!(err.message().contains("WriterSkill.Summarize"));
        assert!(err.message().contains("model unavailable"));
        assert_eq!(err.context_value("step_index"), Some("1"));
        assert!(err.source_ref().is_some());
    }

    #[tokio::test]
    async fn test_unbound_step_fails_fast() {
        let mut unbound = Plan::new("orphan");
        unbound.collection = "FunSkill".to_string();
        let mut plan = Plan::with_steps("goal", [unbound]);

        let mut ctx = context();
        let err = assert_err!(plan.invoke(&mut ctx).await);
        assert_eq!(err.kind(), ErrorKind::FunctionNotBound);
        assert!(err.message().contains("FunSkill.orphan"));
        assert_eq!(plan.next_step_index(), 0);
    }

    #[tokio::test]
    async fn test_empty_plan_is_noop() {
        let mut plan = Plan::new("nothing to do");
        let mut ctx = context();
        ctx.variables_mut().update("unchanged");

        assert_ok!(plan.invoke(&mut ctx).await);
        assert_eq!(ctx.result(), "unchanged");
        assert_eq!(plan.next_step_index(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_before_next_step() {
        let token = CancellationToken::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let stop = {
            let token = token.clone();
            let runs = runs.clone();
            native("TestSkill", "Stop", &[], move |_| {
                runs.fetch_add(1, Ordering::SeqCst);
                token.cancel();
                Ok("stopped".to_string())
            })
        };
        let never = {
            let runs = runs.clone();
            native("TestSkill", "Never", &[], move |_| {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(String::new())
            })
        };

        let mut plan = Plan::with_steps("goal", [Plan::from_function(stop), Plan::from_function(never)]);
        let mut ctx = context().with_cancellation(token);

        let err = assert_err!(plan.invoke(&mut ctx).await);
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(plan.next_step_index(), 1);
        assert_eq!(plan.state().input(), "stopped");
    }

    #[tokio::test]
    async fn test_single_step_respects_cancelled_token() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counted = {
            let runs = runs.clone();
            native("TestSkill", "Counted", &[], move |_| {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok("ran".to_string())
            })
        };
        let mut plan = Plan::with_steps("goal", [Plan::from_function(counted)]);

        let token = CancellationToken::new();
        token.cancel();
        let ctx = context().with_cancellation(token);

        let err = assert_err!(plan.invoke_next_step(&ctx).await);
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(plan.next_step_index(), 0);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(plan.state().is_empty());

        let err = assert_err!(plan.run_next_step(&ctx, ContextVariables::new()).await);
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_nested_failure_wrapped_once() {
        let failing = native("W", "Fail", &[], |_| Err(Error::inference_failed("boom")));
        let inner = Plan::with_steps("inner", [Plan::from_function(failing)]);
        let mut plan = Plan::with_steps("outer", [inner]);

        let mut ctx = context();
        let err = assert_err!(plan.invoke(&mut ctx).await);
        assert_eq!(err.kind(), ErrorKind::FunctionInvokeFailed);
        assert!(err.message().contains("W.Fail"));
        assert!(err.message().contains("boom"));
        assert_eq!(err.message().matches("error occurred while running plan step").count(), 1);
        assert_eq!(plan.next_step_index(), 0);
    }

    #[tokio::test]
    async fn test_nested_plan() {
        let inner = Plan::with_steps("inner", [Plan::from_function(upper())]).with_named_output("shout");
        let exclaim = native("TestSkill", "Exclaim", &["shout"], |vars| {
            Ok(format!("{}!", vars.get("shout").unwrap_or("")))
        });
        let mut plan = Plan::with_steps("outer", [inner, Plan::from_function(exclaim)]);

        let mut ctx = context();
        assert_ok!(plan.invoke_with_input("hey", &mut ctx).await);
        assert_eq!(ctx.result(), "HEY!");
        assert_eq!(plan.state().get("shout"), Some("HEY"));
        assert_eq!(plan.steps()[0].next_step_index(), 1);
    }

    #[tokio::test]
    async fn test_run_next_step_uses_fresh_variables() {
        let (step, calls) = recorder("Echo", &[], "done");
        let mut plan = Plan::with_steps("goal", [Plan::from_function(step)]);
        let ctx = context().with_variables(ContextVariables::with_input("ignored"));

        assert_ok!(plan.run_next_step(&ctx, ContextVariables::with_input("fresh")).await);
        assert_eq!(calls.lock().unwrap()[0].input(), "fresh");
        assert_eq!(plan.state().input(), "done");
    }

    #[tokio::test]
    async fn test_leaf_plan_invoke() {
        let mut plan = Plan::from_function(upper());
        let mut ctx = context();
        assert_ok!(plan.invoke_with_input("leaf", &mut ctx).await);
        assert_eq!(ctx.result(), "LEAF");
    }
}
