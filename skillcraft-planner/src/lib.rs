//! # Skillcraft Planner
//!
//! Turns a natural-language goal into a [`Plan`](skillcraft_core::Plan).
//!
//! [`ActionPlanner`] asks a completion backend to pick exactly one function
//! from the registry catalog and fills in its parameters. The answer comes
//! back as a small JSON fragment which is parsed and bound here.

pub mod action_planner;
pub mod config;
pub mod planner;
pub mod prompt;
pub mod response;

pub use action_planner::ActionPlanner;
pub use config::{ActionPlannerConfig, PLANNER_COLLECTION, STOP_SEQUENCE};
pub use planner::Planner;
pub use response::{ActionPlanResponse, PlanStepResponse};
