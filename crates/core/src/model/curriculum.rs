use std::collections::HashSet;

use thiserror::Error;

use crate::model::ids::{ContentHandle, ModuleKey};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Invalid curriculum table or a lookup that falls outside of it.
///
/// The registry is built from trusted static data, so any of these reaching
/// a caller is a data-integrity defect rather than a user error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CurriculumError {
    #[error("curriculum must contain at least one module")]
    Empty,

    #[error("duplicate module key: {0}")]
    DuplicateModule(ModuleKey),

    #[error("module {module} has {count} steps, at least 2 are required")]
    TooFewSteps { module: ModuleKey, count: usize },

    #[error("initial module {0} is not part of the curriculum")]
    UnknownInitialModule(ModuleKey),

    #[error("module {module} must run intro, tasks 1..=n in order, then completed")]
    MalformedSteps { module: ModuleKey },

    #[error("invalid module key: {0:?}")]
    InvalidKey(String),

    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("step {index} is out of range for module {module} ({count} steps)")]
    StepOutOfRange {
        module: ModuleKey,
        index: u32,
        count: u32,
    },
}

//
// ─── STEPS ─────────────────────────────────────────────────────────────────────
//

/// Position of a step inside its module's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Always index 0.
    Intro,
    /// 1-based task number.
    Task(u32),
    /// Always the last index.
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDescriptor {
    kind: StepKind,
    content: ContentHandle,
}

impl StepDescriptor {
    #[must_use]
    pub fn new(kind: StepKind, content: ContentHandle) -> Self {
        Self { kind, content }
    }

    #[must_use]
    pub fn kind(&self) -> StepKind {
        self.kind
    }

    #[must_use]
    pub fn content(&self) -> &ContentHandle {
        &self.content
    }
}

//
// ─── MODULES ───────────────────────────────────────────────────────────────────
//

/// One lesson: a key plus its ordered step chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    key: ModuleKey,
    steps: Vec<StepDescriptor>,
}

impl ModuleDescriptor {
    #[must_use]
    pub fn new(key: ModuleKey, steps: Vec<StepDescriptor>) -> Self {
        Self { key, steps }
    }

    /// Builds the canonical `intro, task 1..=tasks, completed` chain.
    ///
    /// Content handles are `<key>/intro`, `<key>/step-<n>` and `<key>/completed`.
    #[must_use]
    pub fn from_task_count(key: ModuleKey, tasks: u32) -> Self {
        let mut steps = Vec::with_capacity(tasks as usize + 2);
        steps.push(StepDescriptor::new(
            StepKind::Intro,
            ContentHandle::new(format!("{key}/intro")),
        ));
        for task in 1..=tasks {
            steps.push(StepDescriptor::new(
                StepKind::Task(task),
                ContentHandle::new(format!("{key}/step-{task}")),
            ));
        }
        steps.push(StepDescriptor::new(
            StepKind::Completed,
            ContentHandle::new(format!("{key}/completed")),
        ));
        Self { key, steps }
    }

    #[must_use]
    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    #[must_use]
    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }

    /// Number of steps, intro and completed marker included.
    #[must_use]
    pub fn step_count(&self) -> u32 {
        // Bounded by `Curriculum::new`.
        u32::try_from(self.steps.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn last_index(&self) -> u32 {
        self.step_count().saturating_sub(1)
    }

    #[must_use]
    pub fn step(&self, index: u32) -> Option<&StepDescriptor> {
        self.steps.get(index as usize)
    }

    /// Intro first, completed last, `Task(1..)` numbered by position between.
    fn is_well_formed(&self) -> bool {
        let last = self.steps.len().saturating_sub(1);
        self.steps.iter().enumerate().all(|(pos, step)| match step.kind {
            StepKind::Intro => pos == 0,
            StepKind::Completed => pos == last,
            StepKind::Task(n) => pos != 0 && pos != last && n as usize == pos,
        })
    }
}

//
// ─── CURRICULUM ────────────────────────────────────────────────────────────────
//

/// Immutable, ordered registry of modules.
///
/// Built once from a declarative table and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curriculum {
    modules: Vec<ModuleDescriptor>,
    initial: ModuleKey,
}

impl Curriculum {
    /// Validates and freezes a curriculum table.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError` if the table is empty, holds duplicate keys,
    /// holds a module with fewer than two steps or a step chain that is not
    /// `intro, task 1..=n, completed`, or `initial` is not one of the modules.
    pub fn new(modules: Vec<ModuleDescriptor>, initial: ModuleKey) -> Result<Self, CurriculumError> {
        if modules.is_empty() {
            return Err(CurriculumError::Empty);
        }

        let mut seen = HashSet::with_capacity(modules.len());
        for module in &modules {
            if !seen.insert(module.key.as_str()) {
                return Err(CurriculumError::DuplicateModule(module.key.clone()));
            }
            let count = module.steps.len();
            if count < 2 || u32::try_from(count).is_err() {
                return Err(CurriculumError::TooFewSteps {
                    module: module.key.clone(),
                    count,
                });
            }
            if !module.is_well_formed() {
                return Err(CurriculumError::MalformedSteps {
                    module: module.key.clone(),
                });
            }
        }

        if !seen.contains(initial.as_str()) {
            return Err(CurriculumError::UnknownInitialModule(initial));
        }

        Ok(Self { modules, initial })
    }

    #[must_use]
    pub fn initial_module(&self) -> &ModuleKey {
        &self.initial
    }

    /// Module keys in curriculum order.
    pub fn module_keys(&self) -> impl Iterator<Item = &ModuleKey> {
        self.modules.iter().map(ModuleDescriptor::key)
    }

    #[must_use]
    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.modules.iter().any(|m| m.key.as_str() == key)
    }

    /// Looks up a module by key.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError::UnknownModule` if the key is not registered.
    pub fn module(&self, key: &str) -> Result<&ModuleDescriptor, CurriculumError> {
        self.modules
            .iter()
            .find(|m| m.key.as_str() == key)
            .ok_or_else(|| CurriculumError::UnknownModule(key.to_owned()))
    }

    /// Step count of a module.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError::UnknownModule` if the key is not registered.
    pub fn step_count(&self, key: &str) -> Result<u32, CurriculumError> {
        self.module(key).map(ModuleDescriptor::step_count)
    }

    /// Content handle at `(key, index)`.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError::UnknownModule` or `CurriculumError::StepOutOfRange`.
    pub fn content(&self, key: &str, index: u32) -> Result<&ContentHandle, CurriculumError> {
        let module = self.module(key)?;
        module
            .step(index)
            .map(StepDescriptor::content)
            .ok_or_else(|| CurriculumError::StepOutOfRange {
                module: module.key.clone(),
                index,
                count: module.step_count(),
            })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
