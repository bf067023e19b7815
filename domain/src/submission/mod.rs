//! Survey submission domain.
//!
//! - [`batch::SubmissionBatch`]: one confirmed question's rankings
//! - [`batch::SubmissionStatus`]: delivery state used for idempotency

pub mod batch;

pub use batch::{SubmissionBatch, SubmissionStatus};
