#![forbid(unsafe_code)]

pub mod catalog;
pub mod model;
pub mod navigator;
pub mod time;

pub use navigator::{NavigationError, Navigator, Reconciliation, StepMove};
pub use time::Clock;
