//! Planner prompt and function catalog
//!
//! The catalog lists each function as
//!
//! ```text
//! // Write a file.
//! FileIOSkill.WriteAsync
//! Parameter "path": Destination file.
//! Parameter "content": File content.
//! ```
//!
//! and is spliced into the prompt together with the worked examples and the
//! goal. The prompt ends with the opening of the JSON answer so the model
//! only has to continue it.

use crate::config::ActionPlannerConfig;
use skillcraft_core::template::render_prompt;
use skillcraft_core::{ContextVariables, FunctionView, FunctionsView, INPUT_KEY};
use std::collections::HashSet;
use std::fmt::Write;

/// Placeholder for the catalog in the prompt template
pub const AVAILABLE_FUNCTIONS_KEY: &str = "available_functions";
pub const GOOD_EXAMPLES_KEY: &str = "good_examples";
pub const EDGE_CASE_EXAMPLES_KEY: &str = "edge_case_examples";

/// The JSON the model is asked to continue
pub const RESPONSE_PREFIX: &str = r#"{"plan":{ "rationale":"#;

pub const GOOD_EXAMPLES: &str = r#"[EXAMPLE]
- List of functions:
// Read a file.
FileIOSkill.ReadAsync
Parameter "path": Source file.
// Write a file.
FileIOSkill.WriteAsync
Parameter "path": Destination file.
Parameter "content": File content.
// Get the current time.
TimeSkill.Time
No parameters.
// Makes a POST request to a uri.
HttpSkill.PostAsync
Parameter "body": The body of the request.
- End list of functions.
Goal: create a file called "something.txt".
{"plan":{
"rationale": "the list contains a function that allows to create files",
"function": "FileIOSkill.WriteAsync",
"parameters": {
"path": "something.txt",
"content": null
}}}
#END-OF-PLAN
"#;

pub const EDGE_CASE_EXAMPLES: &str = r#"[EXAMPLE]
- List of functions:
// Get the current time.
TimeSkill.Time
No parameters.
// Write a file.
FileIOSkill.WriteAsync
Parameter "path": Destination file.
Parameter "content": File content.
// Makes a POST request to a uri.
HttpSkill.PostAsync
Parameter "body": The body of the request.
// Read a file.
FileIOSkill.ReadAsync
Parameter "path": Source file.
- End list of functions.
Goal: tell me a joke.
{"plan":{
"rationale": "the list does not contain functions to tell jokes or something funny",
"function": "",
"parameters": {}
}}}
#END-OF-PLAN
"#;

pub const DEFAULT_PROMPT: &str = r#"A planner takes a list of functions, a goal, and chooses which function to use.
For each function the list includes details about the input parameters.
[START OF EXAMPLES]
{{$good_examples}}
{{$edge_case_examples}}
[END OF EXAMPLES]
[REAL SCENARIO STARTS HERE]
- List of functions:
{{$available_functions}}
- End list of functions.
Goal: {{$input}}
{"plan":{ "rationale":"#;

fn add_period(text: &str) -> String {
    if text.ends_with('.') {
        text.to_string()
    } else {
        format!("{}.", text)
    }
}

fn write_function(out: &mut String, view: &FunctionView) {
    // Writing to a String cannot fail
    let _ = writeln!(out, "// {}", add_period(&view.description));
    let _ = writeln!(out, "{}.{}", view.collection, view.name);
    if view.parameters.is_empty() {
        out.push_str("No parameters.\n");
    }
    for param in &view.parameters {
        let description = if param.description.is_empty() {
            &param.name
        } else {
            &param.description
        };
        let _ = writeln!(out, "Parameter \"{}\": {}", param.name, add_period(description));
    }
}

/// Render the function catalog the model chooses from.
///
/// Native functions come first, then semantic ones, each in registration
/// order. Excluded collections and functions are skipped, as is any repeat
/// of an already listed `(collection, name)`.
pub fn function_catalog(functions: &FunctionsView, config: &ActionPlannerConfig) -> String {
    let mut out = String::new();
    let mut seen = HashSet::new();

    let groups = functions
        .native_functions
        .iter()
        .chain(functions.semantic_functions.iter());

    for (collection, views) in groups {
        if config.is_collection_excluded(collection) {
            continue;
        }
        for view in views {
            if config.is_function_excluded(&view.name) {
                continue;
            }
            let key = (view.collection.to_ascii_lowercase(), view.name.to_ascii_lowercase());
            if !seen.insert(key) {
                continue;
            }
            write_function(&mut out, view);
        }
    }

    // The template already breaks the line after the catalog
    while out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Build the full planning prompt for `goal`
pub fn planner_prompt(goal: &str, catalog: &str, config: &ActionPlannerConfig) -> String {
    let template = config.prompt.as_deref().unwrap_or(DEFAULT_PROMPT);

    let mut vars = ContextVariables::new();
    vars.set(GOOD_EXAMPLES_KEY, GOOD_EXAMPLES);
    vars.set(EDGE_CASE_EXAMPLES_KEY, EDGE_CASE_EXAMPLES);
    vars.set(AVAILABLE_FUNCTIONS_KEY, catalog);
    vars.set(INPUT_KEY, goal);

    render_prompt(template, &vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillcraft_core::{FunctionRegistry, FunctionView, NativeFunction, SkillCollection};

    fn noop(view: FunctionView) -> NativeFunction {
        NativeFunction::new(view, |_| Ok(String::new()))
    }

    fn registry() -> SkillCollection {
        let mut collection = SkillCollection::new();
        collection
            .register(noop(
                FunctionView::new("FileIOSkill", "WriteAsync")
                    .with_description("Write a file")
                    .with_parameter("path", "Destination file")
                    .with_parameter("content", "File content."),
            ))
            .register(noop(
                FunctionView::new("TimeSkill", "Time").with_description("Get the current time."),
            ))
            .register(noop(
                FunctionView::new("this", "ListOfFunctions").with_description("List all functions"),
            ))
            .register(noop(
                FunctionView::new("MathSkill", "Add")
                    .with_description("Add numbers")
                    .with_parameter("amount", ""),
            ));
        collection
    }

    #[test]
    fn test_catalog_format() {
        let catalog = function_catalog(&registry().list_all(), &ActionPlannerConfig::default());
        let expected = "// Write a file.\n\
                        FileIOSkill.WriteAsync\n\
                        Parameter \"path\": Destination file.\n\
                        Parameter \"content\": File content.\n\
                        // Get the current time.\n\
                        TimeSkill.Time\n\
                        No parameters.\n\
                        // Add numbers.\n\
                        MathSkill.Add\n\
                        Parameter \"amount\": amount.";
        assert_eq!(catalog, expected);
    }

    #[test]
    fn test_catalog_skips_planner_collection() {
        let catalog = function_catalog(&registry().list_all(), &ActionPlannerConfig::default());
        assert!(!catalog.contains("ListOfFunctions"));
        assert!(!catalog.contains("this."));
    }

    #[test]
    fn test_catalog_exclusions() {
        let config = ActionPlannerConfig::default()
            .exclude_collection("mathskill")
            .exclude_function("time");
        let catalog = function_catalog(&registry().list_all(), &config);
        assert!(catalog.contains("FileIOSkill.WriteAsync"));
        assert!(!catalog.contains("MathSkill"));
        assert!(!catalog.contains("TimeSkill.Time"));
    }

    #[test]
    fn test_catalog_dedupes() {
        let mut view = FunctionsView::default();
        view.add(FunctionView::new("FileIOSkill", "WriteAsync").with_description("Write a file"));
        view.add(FunctionView::new("fileioskill", "writeasync").with_description("Write a file"));
        let catalog = function_catalog(&view, &ActionPlannerConfig::default());
        assert_eq!(catalog.matches("WriteAsync").count(), 1);
    }

    #[test]
    fn test_prompt_layout() {
        let catalog = "// Get the current time.\nTimeSkill.Time\nNo parameters.";
        let prompt = planner_prompt("what time is it?", catalog, &ActionPlannerConfig::default());

        assert!(prompt.contains("Goal: create a file called \"something.txt\"."));
        assert!(prompt.contains("Goal: tell me a joke."));
        assert!(prompt.contains(&format!("- List of functions:\n{}\n- End list of functions.\nGoal: what time is it?", catalog)));
        assert!(prompt.ends_with(RESPONSE_PREFIX));
        assert!(!prompt.contains("{{$"));
    }

    #[test]
    fn test_prompt_override() {
        let config = ActionPlannerConfig::default().with_prompt("Functions:\n{{$available_functions}}\nGoal: {{$input}}");
        let prompt = planner_prompt("say hi", "A.B", &config);
        assert_eq!(prompt, "Functions:\nA.B\nGoal: say hi");
    }
}
