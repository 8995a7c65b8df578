//! Built-in "Project React" curriculum.

use crate::model::{Curriculum, CurriculumError, ModuleDescriptor, ModuleKey};

/// Module the panel opens on for a new learner.
pub const INITIAL_MODULE: &str = "0-introduction";

/// `(module key, number of tasks between intro and completed)`.
const PROJECT_REACT: &[(&str, u32)] = &[
    ("0-introduction", 4),
    ("1-react-fundamentals", 6),
    ("2-state-and-event-handlers", 6),
    ("3-effects-and-data-fetching", 9),
    ("4-routes-and-navigation", 12),
    ("5-hooks-and-performance", 10),
];

/// Builds a curriculum from a `(key, task count)` table.
///
/// # Errors
///
/// Returns `CurriculumError` if a key is blank or the table fails
/// `Curriculum::new` validation.
pub fn from_table(table: &[(&str, u32)], initial: &str) -> Result<Curriculum, CurriculumError> {
    let modules = table
        .iter()
        .map(|(key, tasks)| {
            ModuleKey::new(*key)
                .map(|key| ModuleDescriptor::from_task_count(key, *tasks))
                .map_err(|_| CurriculumError::InvalidKey((*key).to_owned()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let initial =
        ModuleKey::new(initial).map_err(|_| CurriculumError::InvalidKey(initial.to_owned()))?;
    Curriculum::new(modules, initial)
}

/// The shipped curriculum.
///
/// # Errors
///
/// Only fails if the static table above is edited into an invalid state.
pub fn project_react() -> Result<Curriculum, CurriculumError> {
    from_table(PROJECT_REACT, INITIAL_MODULE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_react_is_valid() {
        let curriculum = project_react().unwrap();
        assert_eq!(curriculum.len(), 6);
        assert_eq!(curriculum.initial_module().as_str(), INITIAL_MODULE);
    }

    #[test]
    fn every_module_has_intro_and_completed() {
        let curriculum = project_react().unwrap();
        for module in curriculum.modules() {
            assert!(module.step_count() >= 2, "{}", module.key());
        }
    }

    #[test]
    fn step_counts_match_lessons() {
        let curriculum = project_react().unwrap();
        let counts: Vec<_> = curriculum
            .modules()
            .iter()
            .map(ModuleDescriptor::step_count)
            .collect();
        assert_eq!(counts, vec![6, 8, 8, 11, 14, 12]);
    }

    #[test]
    fn from_table_rejects_blank_key() {
        let err = from_table(&[("  ", 2)], "intro").unwrap_err();
        assert_eq!(err, CurriculumError::InvalidKey("  ".into()));
    }

    #[test]
    fn from_table_rejects_blank_initial_key() {
        let err = from_table(&[("intro", 2)], "").unwrap_err();
        assert_eq!(err, CurriculumError::InvalidKey(String::new()));
    }
}
