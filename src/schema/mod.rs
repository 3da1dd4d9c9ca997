pub mod definition;
pub mod lock;
pub mod ordering;
pub mod registry;

pub(crate) mod applier;

pub use definition::*;
pub use lock::*;
pub use ordering::{MigrationPlan, MigrationTask, TaskKey};
pub use registry::*;
