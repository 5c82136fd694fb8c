//! Action planner configuration

use skillcraft_core::CompletionSettings;

/// Marker the model writes after the plan JSON
pub const STOP_SEQUENCE: &str = "#END-OF-PLAN";

/// Collection name reserved for the planner itself; never offered to the model
pub const PLANNER_COLLECTION: &str = "this";

/// Configuration for [`ActionPlanner`](crate::ActionPlanner)
#[derive(Debug, Clone)]
pub struct ActionPlannerConfig {
    /// Maximum tokens the model may spend on the plan
    pub max_tokens: usize,
    pub temperature: f32,
    pub stop_sequence: String,
    /// Collections hidden from the catalog (case-insensitive)
    pub excluded_collections: Vec<String>,
    /// Functions hidden from the catalog, by bare name (case-insensitive)
    pub excluded_functions: Vec<String>,
    /// Replaces the built-in prompt template. Must contain
    /// `{{$available_functions}}` and `{{$input}}`.
    pub prompt: Option<String>,
}

impl Default for ActionPlannerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.0,
            stop_sequence: STOP_SEQUENCE.to_string(),
            excluded_collections: vec![PLANNER_COLLECTION.to_string()],
            excluded_functions: Vec::new(),
            prompt: None,
        }
    }
}

impl ActionPlannerConfig {
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn exclude_collection(mut self, collection: impl Into<String>) -> Self {
        self.excluded_collections.push(collection.into());
        self
    }

    pub fn exclude_function(mut self, name: impl Into<String>) -> Self {
        self.excluded_functions.push(name.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Whether `collection` is hidden. The planner collection always is.
    pub fn is_collection_excluded(&self, collection: &str) -> bool {
        collection.eq_ignore_ascii_case(PLANNER_COLLECTION)
            || self
                .excluded_collections
                .iter()
                .any(|c| c.eq_ignore_ascii_case(collection))
    }

    pub fn is_function_excluded(&self, name: &str) -> bool {
        self.excluded_functions
            .iter()
            .any(|f| f.eq_ignore_ascii_case(name))
    }

    /// Completion settings for the planning request
    pub fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings::default()
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
            .with_stop_sequence(self.stop_sequence.clone())
    }
}
