//! # Core Skills
//!
//! Small built-in collections so a registry is useful out of the box:
//! `TextSkill`, `TimeSkill` and `FileIOSkill`.

pub mod file_io;
pub mod text;
pub mod time;

pub use file_io::FileIoFunction;

use crate::registry::SkillCollection;

/// Register every core skill into `collection`
pub fn register_core_skills(collection: &mut SkillCollection) {
    text::register(collection);
    time::register(collection);
    file_io::register(collection);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FunctionRegistry;

    #[test]
    fn test_core_skills() {
        let collection = SkillCollection::with_core_skills();
        assert!(collection.contains(Some("FileIOSkill"), "WriteAsync"));
        assert!(collection.contains(Some("TextSkill"), "Uppercase"));
        assert!(collection.contains(Some("TimeSkill"), "Today"));

        let view = collection.list_all();
        assert_eq!(view.native_functions.len(), 3);
        assert!(view.semantic_functions.is_empty());
    }
}
