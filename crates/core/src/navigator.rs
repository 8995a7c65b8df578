use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{
    ContentHandle, Curriculum, CurriculumError, ModuleKey, ModuleStatus, NavigationPosition,
    ProgressMap,
};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NavigationError {
    #[error("module not found: {0}")]
    ModuleNotFound(String),
}

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// Outcome of a single step move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMove {
    Moved { from: u32, to: u32 },
    /// Already on the first/last step; nothing changed.
    AtBoundary,
}

impl StepMove {
    #[must_use]
    pub fn is_moved(self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// What `Navigator::restore` had to fix in the persisted values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Stored current module was unknown and replaced by the initial module.
    pub reset_current: bool,
    /// Modules that had no stored index and were set to 0.
    pub filled: Vec<ModuleKey>,
    /// Modules whose stored index was past the last step.
    pub clamped: Vec<ModuleKey>,
    /// Stored keys that are not part of the curriculum.
    pub dropped: Vec<ModuleKey>,
    /// Raw stored entries that never made it into the progress map because
    /// the key or the index did not decode. Filled in by the caller that
    /// decoded them.
    pub rejected: Vec<String>,
}

impl Reconciliation {
    #[must_use]
    pub fn progress_changed(&self) -> bool {
        !(self.filled.is_empty()
            && self.clamped.is_empty()
            && self.dropped.is_empty()
            && self.rejected.is_empty())
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        !self.reset_current && !self.progress_changed()
    }
}

/// Progress through a module as a percentage in `[0, 100]`.
///
/// A module with a single step counts as complete.
#[must_use]
pub fn percentage(index: u32, step_count: u32) -> f64 {
    if step_count <= 1 {
        return 100.0;
    }
    let last = step_count - 1;
    f64::from(index.min(last)) * 100.0 / f64::from(last)
}

//
// ─── NAVIGATOR ─────────────────────────────────────────────────────────────────
//

/// Position state machine over a curriculum.
///
/// Each module is a linear chain `0 → … → n-1`; switching modules never
/// touches another module's index.
#[derive(Debug, Clone)]
pub struct Navigator {
    curriculum: Arc<Curriculum>,
    current: ModuleKey,
    progress: ProgressMap,
}

impl Navigator {
    /// Fresh state: initial module, every index at 0.
    #[must_use]
    pub fn new(curriculum: Arc<Curriculum>) -> Self {
        let current = curriculum.initial_module().clone();
        let progress = ProgressMap::zeroed(&curriculum);
        Self {
            curriculum,
            current,
            progress,
        }
    }

    /// Rebuild from persisted values, repairing anything that no longer fits
    /// the curriculum.
    #[must_use]
    pub fn restore(
        curriculum: Arc<Curriculum>,
        current: Option<ModuleKey>,
        stored: Option<ProgressMap>,
    ) -> (Self, Reconciliation) {
        let mut report = Reconciliation::default();

        let current = match current {
            Some(key) if curriculum.contains(key.as_str()) => key,
            Some(key) => {
                warn!(module = %key, "stored module is not in the curriculum, using initial module");
                report.reset_current = true;
                curriculum.initial_module().clone()
            }
            None => curriculum.initial_module().clone(),
        };

        let stored = stored.unwrap_or_default();
        let mut progress = ProgressMap::new();
        for module in curriculum.modules() {
            let key = module.key();
            let index = match stored.get(key.as_str()) {
                Some(index) if index <= module.last_index() => index,
                Some(index) => {
                    warn!(module = %key, index, "stored step past the last step, clamping");
                    report.clamped.push(key.clone());
                    module.last_index()
                }
                None => {
                    report.filled.push(key.clone());
                    0
                }
            };
            progress.set(key.clone(), index);
        }
        for (key, _) in stored.iter() {
            if !curriculum.contains(key.as_str()) {
                warn!(module = %key, "dropping progress for unknown module");
                report.dropped.push(key.clone());
            }
        }

        let navigator = Self {
            curriculum,
            current,
            progress,
        };
        (navigator, report)
    }

    #[must_use]
    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    #[must_use]
    pub fn current_module(&self) -> &ModuleKey {
        &self.current
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressMap {
        &self.progress
    }

    /// Jump to `key`, resuming at its stored step.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::ModuleNotFound` if `key` is not in the
    /// curriculum; state is left untouched.
    pub fn select_module(&mut self, key: &str) -> Result<(), NavigationError> {
        let module = self
            .curriculum
            .module(key)
            .map_err(|_| NavigationError::ModuleNotFound(key.to_owned()))?;
        debug!(from = %self.current, to = %module.key(), "select module");
        self.current = module.key().clone();
        Ok(())
    }

    /// Move one step forward; no-op on the completed step.
    pub fn advance_step(&mut self) -> StepMove {
        let index = self.current_index();
        if index >= self.last_index() {
            return StepMove::AtBoundary;
        }
        self.set_current_index(index + 1)
    }

    /// Move one step back; no-op on the intro step.
    pub fn retreat_step(&mut self) -> StepMove {
        let index = self.current_index();
        if index == 0 {
            return StepMove::AtBoundary;
        }
        self.set_current_index(index - 1)
    }

    #[must_use]
    pub fn current_position(&self) -> NavigationPosition {
        NavigationPosition {
            module: self.current.clone(),
            step: self.current_index(),
        }
    }

    /// # Errors
    ///
    /// Returns `NavigationError::ModuleNotFound` for keys outside the curriculum.
    pub fn status_for(&self, key: &str) -> Result<ModuleStatus, NavigationError> {
        let count = self
            .curriculum
            .step_count(key)
            .map_err(|_| NavigationError::ModuleNotFound(key.to_owned()))?;
        let index = self.progress.get(key).unwrap_or(0);
        Ok(ModuleStatus::classify(index, count))
    }

    #[must_use]
    pub fn progress_percentage(&self) -> f64 {
        percentage(self.current_index(), self.current_step_count())
    }

    #[must_use]
    pub fn is_at_first_step(&self) -> bool {
        self.current_index() == 0
    }

    #[must_use]
    pub fn is_at_last_step(&self) -> bool {
        self.current_index() >= self.last_index()
    }

    /// Content for the current position.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError` only if the progress map and curriculum
    /// disagree, which `restore` rules out.
    pub fn current_content(&self) -> Result<&ContentHandle, CurriculumError> {
        self.curriculum
            .content(self.current.as_str(), self.current_index())
    }

    fn current_index(&self) -> u32 {
        self.progress.get(self.current.as_str()).unwrap_or(0)
    }

    fn current_step_count(&self) -> u32 {
        self.curriculum
            .step_count(self.current.as_str())
            .unwrap_or(1)
    }

    fn last_index(&self) -> u32 {
        self.current_step_count().saturating_sub(1)
    }

    fn set_current_index(&mut self, to: u32) -> StepMove {
        let from = self.current_index();
        self.progress.set(self.current.clone(), to);
        debug!(module = %self.current, from, to, "step moved");
        StepMove::Moved { from, to }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModuleDescriptor;

    fn key(raw: &str) -> ModuleKey {
        ModuleKey::new(raw).unwrap()
    }

    /// `intro` has 6 steps (0-5), `basics` has 8 steps (0-7).
    fn curriculum() -> Arc<Curriculum> {
        Arc::new(
            Curriculum::new(
                vec![
                    ModuleDescriptor::from_task_count(key("intro"), 4),
                    ModuleDescriptor::from_task_count(key("basics"), 6),
                ],
                key("intro"),
            )
            .unwrap(),
        )
    }

    #[test]
    fn starts_on_initial_module_with_zeroed_progress() {
        let nav = Navigator::new(curriculum());
        assert_eq!(
            nav.current_position(),
            NavigationPosition {
                module: key("intro"),
                step: 0
            }
        );
        assert_eq!(nav.progress().get("basics"), Some(0));
        assert!(nav.is_at_first_step());
        assert!(!nav.is_at_last_step());
    }

    #[test]
    fn advance_never_passes_last_step() {
        let mut nav = Navigator::new(curriculum());
        for _ in 0..20 {
            let _ = nav.advance_step();
            assert!(nav.current_position().step <= 5);
        }
        assert_eq!(nav.current_position().step, 5);
        assert_eq!(nav.advance_step(), StepMove::AtBoundary);
    }

    #[test]
    fn retreat_never_goes_below_zero() {
        let mut nav = Navigator::new(curriculum());
        assert_eq!(nav.retreat_step(), StepMove::AtBoundary);
        let _ = nav.advance_step();
        for _ in 0..5 {
            let _ = nav.retreat_step();
        }
        assert_eq!(nav.current_position().step, 0);
    }

    #[test]
    fn advance_then_retreat_is_inverse_away_from_boundaries() {
        let mut nav = Navigator::new(curriculum());
        let _ = nav.advance_step();
        let _ = nav.advance_step();
        let before = nav.current_position();
        assert_eq!(nav.advance_step(), StepMove::Moved { from: 2, to: 3 });
        assert_eq!(nav.retreat_step(), StepMove::Moved { from: 3, to: 2 });
        assert_eq!(nav.current_position(), before);
    }

    #[test]
    fn module_switches_are_lossless() {
        let mut nav = Navigator::new(curriculum());
        let _ = nav.advance_step();
        let _ = nav.advance_step();
        nav.select_module("basics").unwrap();
        let _ = nav.advance_step();
        nav.select_module("intro").unwrap();
        assert_eq!(nav.current_position().step, 2);
        assert_eq!(nav.progress().get("basics"), Some(1));
    }

    #[test]
    fn select_unknown_module_leaves_state_untouched() {
        let mut nav = Navigator::new(curriculum());
        let _ = nav.advance_step();
        let before = nav.current_position();
        let err = nav.select_module("advanced").unwrap_err();
        assert_eq!(err, NavigationError::ModuleNotFound("advanced".into()));
        assert_eq!(nav.current_position(), before);
    }

    #[test]
    fn percentage_is_monotonic_from_zero_to_hundred() {
        let mut nav = Navigator::new(curriculum());
        let mut last = nav.progress_percentage();
        assert!(last.abs() < f64::EPSILON);
        while nav.advance_step().is_moved() {
            let now = nav.progress_percentage();
            assert!(now >= last);
            last = now;
        }
        assert!((last - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percentage_treats_single_step_as_complete() {
        assert!((percentage(0, 1) - 100.0).abs() < f64::EPSILON);
        assert!((percentage(0, 0) - 100.0).abs() < f64::EPSILON);
        assert!((percentage(2, 5) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn completing_intro_then_switching_to_basics() {
        let mut nav = Navigator::new(curriculum());
        for _ in 0..5 {
            let _ = nav.advance_step();
        }
        assert_eq!(nav.current_position().step, 5);
        assert!(nav.is_at_last_step());
        assert!((nav.progress_percentage() - 100.0).abs() < f64::EPSILON);

        nav.select_module("basics").unwrap();
        assert_eq!(
            nav.current_position(),
            NavigationPosition {
                module: key("basics"),
                step: 0
            }
        );
        assert_eq!(nav.status_for("intro").unwrap(), ModuleStatus::Completed);
        assert_eq!(
            nav.status_for("basics").unwrap(),
            ModuleStatus::InProgress { step: 1, of: 8 }
        );
    }

    #[test]
    fn retreat_leaves_completed_step() {
        let mut nav = Navigator::new(curriculum());
        for _ in 0..5 {
            let _ = nav.advance_step();
        }
        assert_eq!(nav.retreat_step(), StepMove::Moved { from: 5, to: 4 });
        assert!(!nav.status_for("intro").unwrap().is_completed());
    }

    #[test]
    fn current_content_tracks_position() {
        let mut nav = Navigator::new(curriculum());
        assert_eq!(nav.current_content().unwrap().as_str(), "intro/intro");
        let _ = nav.advance_step();
        assert_eq!(nav.current_content().unwrap().as_str(), "intro/step-1");
    }

    #[test]
    fn restore_keeps_valid_state_exactly() {
        let stored: ProgressMap = [(key("intro"), 5), (key("basics"), 3)]
            .into_iter()
            .collect();
        let (nav, report) = Navigator::restore(curriculum(), Some(key("basics")), Some(stored.clone()));
        assert!(report.is_clean());
        assert_eq!(nav.current_position().step, 3);
        assert_eq!(nav.progress(), &stored);
    }

    #[test]
    fn restore_repairs_stale_values() {
        let stored: ProgressMap = [(key("intro"), 42), (key("legacy"), 1)]
            .into_iter()
            .collect();
        let (nav, report) = Navigator::restore(curriculum(), Some(key("legacy")), Some(stored));

        assert!(report.reset_current);
        assert_eq!(report.clamped, vec![key("intro")]);
        assert_eq!(report.filled, vec![key("basics")]);
        assert_eq!(report.dropped, vec![key("legacy")]);
        assert_eq!(nav.current_module(), &key("intro"));
        assert_eq!(nav.progress().get("intro"), Some(5));
        assert_eq!(nav.progress().get("basics"), Some(0));
        assert_eq!(nav.progress().get("legacy"), None);
    }

    #[test]
    fn rejected_entries_mark_progress_changed() {
        let report = Reconciliation {
            rejected: vec!["legacy".into()],
            ..Reconciliation::default()
        };
        assert!(report.progress_changed());
        assert!(!report.is_clean());
    }
}
