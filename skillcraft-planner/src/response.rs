//! Parsing of the planner's JSON answer
//!
//! The model continues the prompt after `{"plan":{ "rationale":`, so the
//! text to parse is that prefix plus the completion. Models are sloppy with
//! JSON; this parser:
//!
//! - cuts the completion at the stop marker if the backend echoed it
//! - drops trailing commas before `}` and `]`
//! - reads only the first JSON value and ignores anything after it
//! - matches property names case-insensitively
//! - keeps numbers and booleans as their JSON text and skips `null` parameters

use crate::prompt::RESPONSE_PREFIX;
use serde_json::{Map, Value};
use skillcraft_core::{ContextVariables, Error, Result};

const OPERATION: &str = "planner::parse_response";

/// The parsed answer
#[derive(Debug, Clone, Default)]
pub struct ActionPlanResponse {
    pub plan: PlanStepResponse,
}

/// The single step the model picked
#[derive(Debug, Clone, Default)]
pub struct PlanStepResponse {
    pub rationale: String,
    /// `"collection.name"`, a bare `"name"`, or empty when nothing fits
    pub function: String,
    pub parameters: ContextVariables,
}

impl PlanStepResponse {
    /// Split `function` into `(collection, name)` on the first `.`.
    ///
    /// Returns `None` when the model picked nothing.
    pub fn function_parts(&self) -> Option<(Option<&str>, &str)> {
        let function = self.function.trim();
        if function.is_empty() {
            return None;
        }
        Some(match function.split_once('.') {
            Some((collection, name)) => (Some(collection), name),
            None => (None, function),
        })
    }
}

impl ActionPlanResponse {
    /// Parse a raw completion (the text after the response prefix).
    pub fn from_completion(completion: &str, stop_sequence: &str) -> Result<Self> {
        let completion = match completion.find(stop_sequence) {
            Some(at) if !stop_sequence.is_empty() => &completion[..at],
            _ => completion,
        };
        let json = format!("{}{}", RESPONSE_PREFIX, completion);
        Self::from_json(&json)
    }

    /// Parse a complete `{"plan": {...}}` document
    pub fn from_json(json: &str) -> Result<Self> {
        let cleaned = strip_trailing_commas(json);
        let value = serde_json::Deserializer::from_str(&cleaned)
            .into_iter::<Value>()
            .next()
            .ok_or_else(|| invalid("plan parsing error, empty response"))?
            .map_err(|e| invalid("plan parsing error, invalid JSON").set_source(e))?;

        let root = value
            .as_object()
            .ok_or_else(|| invalid("the plan response is not a JSON object"))?;
        let plan = match field(root, "plan") {
            Some(Value::Object(plan)) => plan,
            Some(Value::Null) | None => return Err(invalid("the plan deserialized to a null object")),
            Some(_) => return Err(invalid("'plan' must be an object")),
        };

        Ok(Self {
            plan: PlanStepResponse {
                rationale: string_field(plan, "rationale")?,
                function: string_field(plan, "function")?,
                parameters: parameters(plan)?,
            },
        })
    }
}

fn invalid(message: &str) -> Error {
    Error::invalid_plan(message).with_operation(OPERATION)
}

fn field<'a>(object: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    object.get(name).or_else(|| {
        object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

fn string_field(object: &Map<String, Value>, name: &'static str) -> Result<String> {
    match field(object, name) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(invalid("plan field must be a string")
            .with_context("field", name)
            .with_context("value", other.to_string())),
    }
}

fn parameters(plan: &Map<String, Value>) -> Result<ContextVariables> {
    let mut vars = ContextVariables::new();
    let object = match field(plan, "parameters") {
        None | Some(Value::Null) => return Ok(vars),
        Some(Value::Object(object)) => object,
        Some(_) => return Err(invalid("'parameters' must be an object")),
    };

    for (name, value) in object {
        match value {
            Value::Null => continue,
            Value::String(s) => vars.set(name.as_str(), s.as_str()),
            other => vars.set(name.as_str(), other.to_string()),
        }
    }
    Ok(vars)
}

/// Remove commas that directly precede a closing `}` or `]`, leaving string
/// contents untouched
pub fn strip_trailing_commas(json: &str) -> String {
    let chars: Vec<char> = json.chars().collect();
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}
