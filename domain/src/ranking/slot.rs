//! Rank slots and selections

use crate::core::error::DomainError;
use crate::core::ids::ParticipantId;
use serde::{Deserialize, Serialize};

/// One of the three fixed rank positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RankSlot {
    First,
    Second,
    Third,
}

impl RankSlot {
    pub const ALL: [RankSlot; 3] = [RankSlot::First, RankSlot::Second, RankSlot::Third];

    /// 1-based rank number
    pub fn number(&self) -> u8 {
        match self {
            RankSlot::First => 1,
            RankSlot::Second => 2,
            RankSlot::Third => 3,
        }
    }

    fn index(&self) -> usize {
        usize::from(self.number() - 1)
    }

    pub fn label(&self) -> &'static str {
        match self {
            RankSlot::First => "1st",
            RankSlot::Second => "2nd",
            RankSlot::Third => "3rd",
        }
    }
}

impl TryFrom<u8> for RankSlot {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RankSlot::First),
            2 => Ok(RankSlot::Second),
            3 => Ok(RankSlot::Third),
            other => Err(DomainError::InvalidRankSlot(other)),
        }
    }
}

impl From<RankSlot> for u8 {
    fn from(slot: RankSlot) -> Self {
        slot.number()
    }
}

impl std::fmt::Display for RankSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A single rank assignment as sent to the session service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedChoice {
    pub rank: RankSlot,
    pub participant_id: ParticipantId,
}

/// Slot → participant mapping for one question
///
/// A slot holds at most one participant by construction. Assignment goes
/// through [`RankingBoard`](super::board::RankingBoard), which also keeps a
/// participant out of more than one slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankingSelection {
    slots: [Option<ParticipantId>; 3],
}

impl RankingSelection {
    pub fn get(&self, slot: RankSlot) -> Option<&ParticipantId> {
        self.slots[slot.index()].as_ref()
    }

    /// Slot the participant currently occupies, if any
    pub fn slot_of(&self, participant: &ParticipantId) -> Option<RankSlot> {
        RankSlot::ALL
            .into_iter()
            .find(|slot| self.get(*slot) == Some(participant))
    }

    pub fn count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Filled slots in rank order
    pub fn choices(&self) -> Vec<RankedChoice> {
        RankSlot::ALL
            .into_iter()
            .filter_map(|rank| {
                self.get(rank).map(|participant| RankedChoice {
                    rank,
                    participant_id: participant.clone(),
                })
            })
            .collect()
    }

    pub(crate) fn set(&mut self, slot: RankSlot, participant: ParticipantId) {
        self.slots[slot.index()] = Some(participant);
    }

    pub(crate) fn take(&mut self, slot: RankSlot) -> Option<ParticipantId> {
        self.slots[slot.index()].take()
    }
}
