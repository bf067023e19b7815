//! Peer-ranking domain.
//!
//! - [`slot::RankSlot`]: 1st / 2nd / 3rd position
//! - [`slot::RankingSelection`]: slot → participant mapping for one question
//! - [`board::RankingBoard`]: per-question confirm/lock state machine

pub mod board;
pub mod slot;

pub use board::{ConfirmOutcome, NextStep, QuestionRanking, RankingBoard, RankingError};
pub use slot::{RankSlot, RankedChoice, RankingSelection};
