mod config;
mod controller;
mod persistence;
mod view;

// Public API of the panel subsystem.
pub use config::PanelConfig;
pub use controller::{PanelController, PanelIntent};
pub use persistence::{NavigationStore, StoredNavigation};
pub use view::{ModuleListItem, PanelView};
