//! Group completion domain.
//!
//! - [`status::CompletionStatus`]: how many participants finished the survey

pub mod status;

pub use status::{CompletionStatus, QUORUM_MIN_PARTICIPANTS};
