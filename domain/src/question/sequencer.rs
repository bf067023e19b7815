//! Deterministic question sequencing
//!
//! Every student sees the same questions in a different order, so question
//! numbers cannot be used to compare answers across the group. The order is
//! reproducible from `(student id, session id)` alone:
//!
//! 1. hash the seed string (`h = h * 31 + c`, 32-bit wrapping)
//! 2. seed a linear-congruential generator with the hash
//! 3. drive a Fisher–Yates shuffle from the generator

use super::entities::{Question, QuestionSet};
use crate::core::ids::{SessionId, StudentId};
use serde::{Deserialize, Serialize};

/// 32-bit string hash of a seed
pub fn seed_hash(seed: &str) -> u32 {
    let mut hash: i32 = 0;
    for c in seed.chars() {
        hash = hash.wrapping_mul(31).wrapping_add(c as i32);
    }
    hash.unsigned_abs()
}

/// Linear-congruential generator (mod 2^31), high bits only
struct Lcg {
    state: u64,
}

impl Lcg {
    const MULTIPLIER: u64 = 1_103_515_245;
    const INCREMENT: u64 = 12_345;
    const MASK: u64 = 0x7fff_ffff;

    fn new(seed: u32) -> Self {
        Self {
            state: u64::from(seed) & Self::MASK,
        }
    }

    /// Next 15 random bits
    fn next_bits(&mut self) -> u64 {
        self.state = (self.state * Self::MULTIPLIER + Self::INCREMENT) & Self::MASK;
        (self.state >> 16) & 0x7fff
    }

    /// Uniform-enough value in `0..bound`
    fn below(&mut self, bound: usize) -> usize {
        let value = (self.next_bits() << 15) | self.next_bits();
        (value % bound as u64) as usize
    }
}

/// Shuffle `items` in place, deterministically for `seed`
pub fn shuffle_with_seed<T>(items: &mut [T], seed: &str) {
    let mut rng = Lcg::new(seed_hash(seed));
    for i in (1..items.len()).rev() {
        let j = rng.below(i + 1);
        items.swap(i, j);
    }
}

/// Per-student question ordering (Value Object)
///
/// Generated once when the survey starts and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOrder {
    seed: String,
    ids: Vec<String>,
}

impl QuestionOrder {
    pub fn generate(student: &StudentId, session: &SessionId, questions: &QuestionSet) -> Self {
        let seed = format!("{}{}", student, session);
        Self::from_seed(seed, questions)
    }

    pub fn from_seed(seed: impl Into<String>, questions: &QuestionSet) -> Self {
        let seed = seed.into();
        let mut ids: Vec<String> = questions.questions().iter().map(|q| q.id.clone()).collect();
        shuffle_with_seed(&mut ids, &seed);
        Self { seed, ids }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.ids.len()
    }

    /// Questions in this order, looked up in `questions`
    pub fn resolve<'a>(&self, questions: &'a QuestionSet) -> Vec<&'a Question> {
        self.ids.iter().filter_map(|id| questions.get(id)).collect()
    }
}
