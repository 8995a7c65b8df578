use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::curriculum::Curriculum;
use crate::model::ids::ModuleKey;

/// Per-module record of the current step index.
///
/// Serializes as a plain object, e.g. `{"intro": 5, "basics": 3}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressMap(BTreeMap<ModuleKey, u32>);

impl ProgressMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every module of `curriculum` mapped to step 0.
    #[must_use]
    pub fn zeroed(curriculum: &Curriculum) -> Self {
        Self(curriculum.module_keys().map(|k| (k.clone(), 0)).collect())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<u32> {
        self.0.get(key).copied()
    }

    pub fn set(&mut self, key: ModuleKey, index: u32) {
        self.0.insert(key, index);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleKey, u32)> {
        self.0.iter().map(|(k, v)| (k, *v))
    }
}

impl FromIterator<(ModuleKey, u32)> for ProgressMap {
    fn from_iter<T: IntoIterator<Item = (ModuleKey, u32)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What the rendering layer consumes: the current module and its step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationPosition {
    pub module: ModuleKey,
    pub step: u32,
}

/// Completion classification of a single module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    Completed,
    /// `step` is 1-based.
    InProgress { step: u32, of: u32 },
}

impl ModuleStatus {
    #[must_use]
    pub fn classify(index: u32, step_count: u32) -> Self {
        if index.saturating_add(1) >= step_count {
            Self::Completed
        } else {
            Self::InProgress {
                step: index.saturating_add(1),
                of: step_count,
            }
        }
    }

    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("Completed"),
            Self::InProgress { step, of } => write!(f, "({step} of {of} tasks)"),
        }
    }
}
