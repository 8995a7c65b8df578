use course_core::model::{ContentHandle, ModuleKey, ModuleStatus};

/// One entry of the module picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleListItem {
    pub key: ModuleKey,
    pub status: ModuleStatus,
    pub label: String,
}

impl ModuleListItem {
    #[must_use]
    pub fn new(key: ModuleKey, status: ModuleStatus) -> Self {
        Self {
            key,
            status,
            label: status.to_string(),
        }
    }
}

/// Render-facing snapshot of the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub module: ModuleKey,
    pub step: u32,
    pub content: ContentHandle,
    pub progress_percentage: f64,
    pub previous_disabled: bool,
    pub next_disabled: bool,
    pub modules: Vec<ModuleListItem>,
    /// False once the panel fell back to in-memory operation.
    pub persistent: bool,
}
