//! Local session state persistence
//!
//! Provides [`JsonFileStateStore`], the filesystem implementation of the
//! [`SessionStateStore`](huddle_application::SessionStateStore) port.

mod json_store;

pub use json_store::JsonFileStateStore;
