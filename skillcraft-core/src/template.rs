//! # Templates
//!
//! Two small placeholder syntaxes:
//!
//! - `$name` in plan named parameters, resolved against the call-site
//!   variables first and the plan state second ([`expand_variables`]).
//! - `{{$name}}` in semantic function prompts, resolved against the call
//!   variables only ([`render_prompt`]).
//!
//! A name is one or more word characters and always matches as a whole
//! token, so `$name` never eats the front of `$name2`.

use crate::variables::ContextVariables;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLAN_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\w+)").expect("Valid regex pattern"));

static PROMPT_VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*\$(\w+)\s*\}\}").expect("Valid regex pattern"));

/// Replace every `$name` in `input`.
///
/// Lookup order is `variables`, then `state`, then the empty string.
pub fn expand_variables(input: &str, variables: &ContextVariables, state: &ContextVariables) -> String {
    PLAN_VARIABLE
        .replace_all(input, |caps: &Captures<'_>| {
            let name = &caps[1];
            variables
                .get(name)
                .or_else(|| state.get(name))
                .unwrap_or("")
                .to_string()
        })
        .into_owned()
}

/// Replace every `{{$name}}` in `template` with the matching variable,
/// or the empty string when it is missing.
pub fn render_prompt(template: &str, variables: &ContextVariables) -> String {
    PROMPT_VARIABLE
        .replace_all(template, |caps: &Captures<'_>| {
            variables.get(&caps[1]).unwrap_or("").to_string()
        })
        .into_owned()
}

/// Names referenced by `{{$name}}` placeholders, in first-use order
pub fn prompt_variables(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PROMPT_VARIABLE.captures_iter(template) {
        let name = &caps[1];
        if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            names.push(name.to_string());
        }
    }
    names
}
