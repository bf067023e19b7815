//! HTTP session service adapter
//!
//! Implements the [`SessionService`](huddle_application::SessionService)
//! port over the session service's REST/JSON API using `reqwest`. Response
//! shapes are normalized in [`dto`] so the rest of the crate only sees
//! domain types.

mod dto;
pub mod error;
mod service;

pub use error::HttpServiceError;
pub use service::HttpSessionService;
