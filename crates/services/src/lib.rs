#![forbid(unsafe_code)]

pub mod error;
pub mod panel;

pub use error::{PanelConfigError, PanelError, PersistenceError};
pub use panel::{
    ModuleListItem, NavigationStore, PanelConfig, PanelController, PanelIntent, PanelView,
    StoredNavigation,
};
