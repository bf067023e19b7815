//! Core domain concepts shared across all subdomains.
//!
//! - [`ids::SessionId`], [`ids::StudentId`], [`ids::ParticipantId`]: identifiers
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod ids;
