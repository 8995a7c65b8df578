use std::sync::Arc;

use course_core::model::{ContentHandle, Curriculum, ModuleStatus, NavigationPosition};
use course_core::{Navigator, StepMove};
use storage::repository::KeyValueStore;
use tracing::{debug, info, warn};

use super::config::PanelConfig;
use super::persistence::NavigationStore;
use super::view::{ModuleListItem, PanelView};
use crate::error::{PanelError, PersistenceError};

/// User gesture coming from the panel UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelIntent {
    Previous,
    Next,
    SelectModule(String),
}

/// Wires the navigator to durable storage and derives render values.
///
/// Construction is the only await on the store's read side, so no gesture
/// can race with the initial load.
pub struct PanelController {
    navigator: Navigator,
    store: NavigationStore,
    persistent: bool,
}

impl PanelController {
    /// Load the saved position, seeding any absent entry with defaults.
    ///
    /// A read failure is not fatal: the panel starts from defaults and stays
    /// in memory for the rest of the session.
    pub async fn bootstrap(
        curriculum: Arc<Curriculum>,
        kv: Arc<dyn KeyValueStore>,
        config: &PanelConfig,
    ) -> Self {
        let store = NavigationStore::new(kv, config);

        let stored = match store.load().await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "navigation state unavailable, continuing in memory");
                return Self {
                    navigator: Navigator::new(curriculum),
                    store,
                    persistent: false,
                };
            }
        };

        let module_present = stored.module.is_some();
        let progress_present = stored.progress.is_some();
        let (navigator, mut report) = Navigator::restore(curriculum, stored.module, stored.progress);
        report.rejected = stored.rejected;

        let mut controller = Self {
            navigator,
            store,
            persistent: true,
        };

        if !module_present || report.reset_current {
            info!(module = %controller.navigator.current_module(), "seeding current module");
            controller.persist_module().await;
        }
        if !progress_present || report.progress_changed() {
            info!("seeding module progress");
            controller.persist_progress().await;
        }

        if report.is_clean() {
            debug!(
                module = %controller.navigator.current_module(),
                step = controller.navigator.current_position().step,
                "panel ready"
            );
        } else {
            info!(
                module = %controller.navigator.current_module(),
                step = controller.navigator.current_position().step,
                reset_current = report.reset_current,
                filled = report.filled.len(),
                clamped = report.clamped.len(),
                dropped = report.dropped.len(),
                rejected = report.rejected.len(),
                "panel ready after repairing stored navigation"
            );
        }
        controller
    }

    /// Advance within the current module and save if anything changed.
    pub async fn next(&mut self) -> StepMove {
        let moved = self.navigator.advance_step();
        if moved.is_moved() {
            self.persist_progress().await;
        }
        moved
    }

    /// Step back within the current module and save if anything changed.
    pub async fn previous(&mut self) -> StepMove {
        let moved = self.navigator.retreat_step();
        if moved.is_moved() {
            self.persist_progress().await;
        }
        moved
    }

    /// # Errors
    ///
    /// Returns `PanelError::Navigation` for unknown keys; nothing is changed
    /// or written in that case.
    pub async fn select_module(&mut self, key: &str) -> Result<(), PanelError> {
        self.navigator.select_module(key)?;
        self.persist_module().await;
        Ok(())
    }

    /// Apply a gesture and return the refreshed view.
    ///
    /// # Errors
    ///
    /// Returns `PanelError` if the gesture is rejected or the view cannot be
    /// built.
    pub async fn dispatch(&mut self, intent: PanelIntent) -> Result<PanelView, PanelError> {
        match intent {
            PanelIntent::Previous => {
                let _ = self.previous().await;
            }
            PanelIntent::Next => {
                let _ = self.next().await;
            }
            PanelIntent::SelectModule(key) => self.select_module(&key).await?,
        }
        self.view()
    }

    #[must_use]
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    #[must_use]
    pub fn current_position(&self) -> NavigationPosition {
        self.navigator.current_position()
    }

    /// Whether writes still reach the durable store.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// # Errors
    ///
    /// Returns `PanelError::Curriculum` if the position falls outside the
    /// curriculum.
    pub fn current_content_handle(&self) -> Result<&ContentHandle, PanelError> {
        Ok(self.navigator.current_content()?)
    }

    #[must_use]
    pub fn is_at_first_step(&self) -> bool {
        self.navigator.is_at_first_step()
    }

    #[must_use]
    pub fn is_at_last_step(&self) -> bool {
        self.navigator.is_at_last_step()
    }

    #[must_use]
    pub fn progress_percentage(&self) -> f64 {
        self.navigator.progress_percentage()
    }

    /// Picker entries in curriculum order.
    #[must_use]
    pub fn module_list(&self) -> Vec<ModuleListItem> {
        let progress = self.navigator.progress();
        self.navigator
            .curriculum()
            .modules()
            .iter()
            .map(|module| {
                let index = progress.get(module.key().as_str()).unwrap_or(0);
                let status = ModuleStatus::classify(index, module.step_count());
                ModuleListItem::new(module.key().clone(), status)
            })
            .collect()
    }

    /// # Errors
    ///
    /// Returns `PanelError::Curriculum` if the position falls outside the
    /// curriculum.
    pub fn view(&self) -> Result<PanelView, PanelError> {
        let position = self.navigator.current_position();
        Ok(PanelView {
            content: self.current_content_handle()?.clone(),
            module: position.module,
            step: position.step,
            progress_percentage: self.progress_percentage(),
            previous_disabled: self.is_at_first_step(),
            next_disabled: self.is_at_last_step(),
            modules: self.module_list(),
            persistent: self.persistent,
        })
    }

    async fn persist_module(&mut self) {
        if !self.persistent {
            return;
        }
        let result = self
            .store
            .save_module(self.navigator.current_module())
            .await;
        self.on_write(result);
    }

    async fn persist_progress(&mut self) {
        if !self.persistent {
            return;
        }
        let result = self.store.save_progress(self.navigator.progress()).await;
        self.on_write(result);
    }

    fn on_write(&mut self, result: Result<(), PersistenceError>) {
        if let Err(err) = result {
            warn!(error = %err, "failed to save navigation state, continuing in memory");
            self.persistent = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{ModuleDescriptor, ModuleKey};
    use storage::repository::InMemoryStore;

    fn key(raw: &str) -> ModuleKey {
        ModuleKey::new(raw).unwrap()
    }

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

    async fn panel(kv: &InMemoryStore) -> PanelController {
        PanelController::bootstrap(curriculum(), Arc::new(kv.clone()), &PanelConfig::default())
            .await
    }

    #[tokio::test]
    async fn boundary_moves_do_not_write() {
        let kv = InMemoryStore::new();
        let mut panel = panel(&kv).await;
        kv.set("project-react-moduleProgress", "sentinel")
            .await
            .unwrap();

        assert_eq!(panel.previous().await, StepMove::AtBoundary);
        assert_eq!(
            kv.get("project-react-moduleProgress")
                .await
                .unwrap()
                .as_deref(),
            Some("sentinel")
        );
    }

    #[tokio::test]
    async fn dispatch_returns_refreshed_view() {
        let kv = InMemoryStore::new();
        let mut panel = panel(&kv).await;

        let view = panel.dispatch(PanelIntent::Next).await.unwrap();
        assert_eq!(view.step, 1);
        assert_eq!(view.content.as_str(), "intro/step-1");
        assert!(!view.previous_disabled);
        assert!(!view.next_disabled);

        let view = panel
            .dispatch(PanelIntent::SelectModule("basics".into()))
            .await
            .unwrap();
        assert_eq!(view.module, key("basics"));
        assert!(view.previous_disabled);
        assert_eq!(view.modules[0].label, "(2 of 6 tasks)");
        assert_eq!(view.modules[1].label, "(1 of 8 tasks)");
    }

    #[tokio::test]
    async fn dispatch_rejects_unknown_module() {
        let kv = InMemoryStore::new();
        let mut panel = panel(&kv).await;

        let err = panel
            .dispatch(PanelIntent::SelectModule("advanced".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::Navigation(_)));
        assert_eq!(panel.current_position().module, key("intro"));
        assert_eq!(
            kv.get("project-react-module").await.unwrap().as_deref(),
            Some("\"intro\"")
        );
    }
}
