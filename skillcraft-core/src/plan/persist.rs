//! JSON persistence for plans
//!
//! Plans are stored as a recursive [`PlanRecord`]. Function bindings are not
//! stored; leaves are rebound by `(skill_name, name)` against a registry
//! after loading.

use super::Plan;
use crate::error::{self, Result};
use crate::registry::FunctionRegistry;
use crate::variables::ContextVariables;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Serialized form of a plan node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanRecord {
    pub name: String,
    pub skill_name: String,
    pub description: String,
    pub next_step_index: usize,
    pub state: ContextVariables,
    pub named_parameters: ContextVariables,
    pub named_outputs: ContextVariables,
    pub steps: Vec<PlanRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Plan {
    /// Encode this tree as a record
    pub fn to_record(&self) -> PlanRecord {
        PlanRecord {
            name: self.name.clone(),
            skill_name: self.collection.clone(),
            description: self.description.clone(),
            next_step_index: self.next_step_index,
            state: self.state.clone(),
            named_parameters: self.named_parameters.clone(),
            named_outputs: self.named_outputs.clone(),
            steps: self.steps.iter().map(Plan::to_record).collect(),
            rationale: self.rationale.clone(),
        }
    }

    /// Decode a record into an unbound tree.
    ///
    /// Fails with `InvalidPlan` when any node's cursor is past its steps.
    pub fn from_record(record: PlanRecord) -> Result<Plan> {
        if record.next_step_index > record.steps.len() {
            return Err(error::invalid_plan(format!(
                "next_step_index {} exceeds {} steps",
                record.next_step_index,
                record.steps.len()
            ))
            .with_operation("plan::from_record")
            .with_context("plan", record.name));
        }

        let steps = record
            .steps
            .into_iter()
            .map(Plan::from_record)
            .collect::<Result<Vec<_>>>()?;

        Ok(Plan {
            name: record.name,
            collection: record.skill_name,
            description: record.description,
            state: record.state,
            steps,
            named_parameters: record.named_parameters,
            named_outputs: record.named_outputs,
            next_step_index: record.next_step_index,
            function: None,
            rationale: record.rationale,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.to_record()).map_err(|e| {
            error::serialization_error("failed to serialize plan")
                .with_operation("plan::to_json")
                .set_source(e)
        })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_record()).map_err(|e| {
            error::serialization_error("failed to serialize plan")
                .with_operation("plan::to_json")
                .set_source(e)
        })
    }

    /// Decode a plan and, when a registry is given, rebind its leaves.
    ///
    /// Without a registry the plan can be inspected but not run.
    pub fn from_json(json: &str, registry: Option<&dyn FunctionRegistry>) -> Result<Plan> {
        let record: PlanRecord = serde_json::from_str(json).map_err(|e| {
            error::serialization_error(format!("failed to parse plan JSON: {}", e))
                .with_operation("plan::from_json")
                .set_source(e)
        })?;

        let mut plan = Plan::from_record(record)?;
        if let Some(registry) = registry {
            plan.bind_functions(registry);
        }
        Ok(plan)
    }

    /// Bind every leaf whose `(collection, name)` is registered.
    ///
    /// Returns how many leaves were bound. Leaves that are not found stay
    /// unbound; see [`unbound_steps`](Self::unbound_steps).
    pub fn bind_functions(&mut self, registry: &dyn FunctionRegistry) -> usize {
        if self.steps.is_empty() {
            return match registry.resolve(Some(&self.collection), &self.name) {
                Some(function) => {
                    self.set_function(function);
                    1
                }
                None => {
                    debug!(step = %self.qualified_name(), "no registered function for step");
                    0
                }
            };
        }

        self.steps
            .iter_mut()
            .map(|step| step.bind_functions(registry))
            .sum()
    }

    /// Qualified names of the steps the executor would reject as unbound
    pub fn unbound_steps(&self) -> Vec<String> {
        let mut unbound = Vec::new();
        for step in &self.steps {
            if step.steps.is_empty() {
                if step.function.is_none() {
                    unbound.push(step.qualified_name());
                }
            } else {
                unbound.extend(step.unbound_steps());
            }
        }
        unbound
    }
}
