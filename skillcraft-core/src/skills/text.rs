//! TextSkill: string helpers over `input`

use crate::function::{FunctionView, NativeFunction};
use crate::registry::SkillCollection;

pub const COLLECTION: &str = "TextSkill";

fn view(name: &str, description: &str) -> FunctionView {
    FunctionView::new(COLLECTION, name).with_description(description)
}

pub fn register(collection: &mut SkillCollection) {
    collection
        .register(NativeFunction::new(
            view("Uppercase", "Convert a string to uppercase"),
            |vars| Ok(vars.input().to_uppercase()),
        ))
        .register(NativeFunction::new(
            view("Lowercase", "Convert a string to lowercase"),
            |vars| Ok(vars.input().to_lowercase()),
        ))
        .register(NativeFunction::new(
            view("Trim", "Trim whitespace from the start and end of a string"),
            |vars| Ok(vars.input().trim().to_string()),
        ))
        .register(NativeFunction::new(
            view("Length", "Get the length of a string"),
            |vars| Ok(vars.input().chars().count().to_string()),
        ))
        .register(NativeFunction::new(
            view("Concat", "Concatenate two strings into one")
                .with_parameter("input2", "Second string to append"),
            |vars| Ok(format!("{}{}", vars.input(), vars.get("input2").unwrap_or(""))),
        ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::registry::FunctionRegistry;
    use crate::variables::ContextVariables;
    use std::sync::Arc;

    async fn run(name: &str, vars: ContextVariables) -> String {
        let mut collection = SkillCollection::new();
        register(&mut collection);
        let function = collection.resolve(Some(COLLECTION), name).unwrap();
        let ctx = ExecutionContext::new(Arc::new(SkillCollection::new())).with_variables(vars);
        function.invoke(&ctx).await.unwrap()
    }

    #[tokio::test]
    async fn test_text_functions() {
        assert_eq!(run("Uppercase", ContextVariables::with_input("abc")).await, "ABC");
        assert_eq!(run("lowercase", ContextVariables::with_input("ABC")).await, "abc");
        assert_eq!(run("Trim", ContextVariables::with_input("  x ")).await, "x");
        assert_eq!(run("Length", ContextVariables::with_input("héllo")).await, "5");

        let mut vars = ContextVariables::with_input("foo");
        vars.set("input2", "bar");
        assert_eq!(run("Concat", vars).await, "foobar");
    }
}
