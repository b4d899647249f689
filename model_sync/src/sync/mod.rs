//! Sync module for model_sync
//!
//! The facade the boundary layer talks to, and the records it exchanges.

pub mod records;
pub mod service;

pub use records::{ApplyRequest, ApplyResponse, ChangeRecord, DiffRequest, DiffResponse};
pub use service::SyncService;
