pub mod curriculum;
mod ids;
mod progress;

pub use curriculum::{Curriculum, CurriculumError, ModuleDescriptor, StepDescriptor, StepKind};
pub use ids::{ContentHandle, ModuleKey, ParseKeyError};
pub use progress::{ModuleStatus, NavigationPosition, ProgressMap};
