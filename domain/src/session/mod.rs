//! Session domain.
//!
//! - [`phase::Phase`]: the timed stages of a discussion session
//! - [`entities::Session`]: the client-side view of a session and its countdown
//! - [`entities::Participant`]: a group member that can be ranked
//! - [`clock::reconcile`]: remote/local precedence for the phase clock

pub mod clock;
pub mod entities;
pub mod phase;
