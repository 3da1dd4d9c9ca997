pub mod checksum;
pub mod envelope;
pub mod version;

pub use checksum::*;
pub use envelope::*;
pub use version::*;
