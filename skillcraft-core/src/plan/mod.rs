//! # Plans
//!
//! A plan is a tree. A leaf wraps one bound function; a composite owns an
//! ordered list of child plans and a cursor (`next_step_index`) pointing at
//! the next child to run.
//!
//! ## Structure
//! - `mod.rs`: the node type and its builder API
//! - `execute.rs`: step variable resolution and the executor
//! - `persist.rs`: JSON encode/decode and function rebinding
//!
//! Only the executor mutates `state` and the cursor, and the cursor only
//! moves forward.

mod execute;
mod persist;

pub use persist::PlanRecord;

use crate::function::{FunctionView, SkillFunction};
use crate::variables::ContextVariables;
use std::fmt;
use std::sync::Arc;

/// Collection name of plans that do not wrap a function
pub const PLAN_COLLECTION: &str = "skillcraft.Plan";

#[derive(Clone)]
pub struct Plan {
    name: String,
    collection: String,
    description: String,
    state: ContextVariables,
    steps: Vec<Plan>,
    named_parameters: ContextVariables,
    named_outputs: ContextVariables,
    next_step_index: usize,
    function: Option<Arc<dyn SkillFunction>>,
    rationale: Option<String>,
}

impl Plan {
    // =========================================================================
    // Construction
    // =========================================================================

    /// An empty plan for `goal`; the goal is both name and description
    pub fn new(goal: impl Into<String>) -> Self {
        let goal = goal.into();
        Self {
            name: goal.clone(),
            collection: PLAN_COLLECTION.to_string(),
            description: goal,
            state: ContextVariables::new(),
            steps: Vec::new(),
            named_parameters: ContextVariables::new(),
            named_outputs: ContextVariables::new(),
            next_step_index: 0,
            function: None,
            rationale: None,
        }
    }

    /// A plan for `goal` with the given steps
    pub fn with_steps(goal: impl Into<String>, steps: impl IntoIterator<Item = Plan>) -> Self {
        let mut plan = Self::new(goal);
        plan.add_steps(steps);
        plan
    }

    /// A leaf wrapping `function`; identity is copied from its view
    pub fn from_function(function: Arc<dyn SkillFunction>) -> Self {
        let mut plan = Self::new(String::new());
        plan.set_function(function);
        plan
    }

    pub(crate) fn set_function(&mut self, function: Arc<dyn SkillFunction>) {
        let view = function.describe();
        self.name = view.name.clone();
        self.collection = view.collection.clone();
        self.description = view.description.clone();
        self.function = Some(function);
    }

    /// Append a child plan
    pub fn add_step(&mut self, step: Plan) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Append several child plans
    pub fn add_steps(&mut self, steps: impl IntoIterator<Item = Plan>) -> &mut Self {
        self.steps.extend(steps);
        self
    }

    /// Append a leaf for `function`
    pub fn add_function_step(&mut self, function: Arc<dyn SkillFunction>) -> &mut Self {
        self.add_step(Plan::from_function(function))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Bind a parameter of this step; `$name` placeholders are expanded
    /// when the step runs
    pub fn with_named_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.named_parameters.set(key, value);
        self
    }

    /// Also store this step's result in the parent's state under `key`
    pub fn with_named_output(mut self, key: impl Into<String>) -> Self {
        self.named_outputs.set(key, "");
        self
    }

    /// Seed a state variable
    pub fn with_state(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.state.set(key, value);
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// `collection.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.collection, self.name)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn state(&self) -> &ContextVariables {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ContextVariables {
        &mut self.state
    }

    pub fn steps(&self) -> &[Plan] {
        &self.steps
    }

    pub fn named_parameters(&self) -> &ContextVariables {
        &self.named_parameters
    }

    pub fn named_parameters_mut(&mut self) -> &mut ContextVariables {
        &mut self.named_parameters
    }

    pub fn named_outputs(&self) -> &ContextVariables {
        &self.named_outputs
    }

    pub fn named_outputs_mut(&mut self) -> &mut ContextVariables {
        &mut self.named_outputs
    }

    pub fn next_step_index(&self) -> usize {
        self.next_step_index
    }

    pub fn function(&self) -> Option<&Arc<dyn SkillFunction>> {
        self.function.as_ref()
    }

    /// Why the planner picked this plan, when it said
    pub fn rationale(&self) -> Option<&str> {
        self.rationale.as_deref()
    }

    /// Whether the cursor has children left to run
    pub fn has_next_step(&self) -> bool {
        self.next_step_index < self.steps.len()
    }

    /// Whether this node runs a bound function rather than children
    pub fn is_leaf(&self) -> bool {
        self.steps.is_empty() && self.function.is_some()
    }

    /// The bound function's view, or a parameterless view of this node
    pub fn describe(&self) -> FunctionView {
        match &self.function {
            Some(function) => function.describe().clone(),
            None => FunctionView::new(self.collection.clone(), self.name.clone())
                .with_description(self.description.clone()),
        }
    }
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("name", &self.name)
            .field("collection", &self.collection)
            .field("description", &self.description)
            .field("next_step_index", &self.next_step_index)
            .field("state", &self.state)
            .field("named_parameters", &self.named_parameters)
            .field("named_outputs", &self.named_outputs)
            .field("bound", &self.function.is_some())
            .field("steps", &self.steps)
            .finish()
    }
}
