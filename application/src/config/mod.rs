//! Application-level configuration.
//!
//! - [`SessionTiming`]: countdown lengths, poll intervals and penalty size

pub mod session_timing;

pub use session_timing::SessionTiming;
