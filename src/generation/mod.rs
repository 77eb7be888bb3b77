//! Generation manager: result cache and single-flight de-duplication.

pub mod key;
pub mod manager;

pub use key::{GenerationKey, SCOPE_PARAM};
pub use manager::GenerationManager;
