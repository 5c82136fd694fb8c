//! Planner trait definition.

use async_trait::async_trait;
use skillcraft_core::{Plan, Result};

/// Anything that can turn a goal into a runnable plan
#[async_trait]
pub trait Planner: Send + Sync {
    async fn create_plan(&self, goal: &str) -> Result<Plan>;
}
