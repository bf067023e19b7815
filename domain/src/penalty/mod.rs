//! Question penalty domain.
//!
//! - [`ledger::PenaltyLedger`]: client-side idempotency cache for penalties
//! - [`ledger::PenaltyRecord`]: an applied (session, question) penalty

pub mod ledger;

pub use ledger::{DEFAULT_PENALTY_POINTS, PenaltyClaim, PenaltyLedger, PenaltyRecord};
