pub mod definition;
pub mod handle;
mod serde_ids;

pub use definition::*;
pub use handle::*;

pub(crate) use serde_ids::id_map;
