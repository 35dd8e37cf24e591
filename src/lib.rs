//! Agora - topic lifecycle engine
//!
//! Agora runs the recurring poll + discussion cycle: topics move through
//! time-gated phases (voting, results, blackout, discussion), accumulate a
//! vote ledger with a justify-your-re-vote rule, and are rotated into an
//! immutable archive once their window elapses - idempotently, no matter
//! how many uncoordinated callers trigger the rotation.

pub mod auth;
pub mod config;
pub mod db;
pub mod jobs;
pub mod lifecycle;
pub mod phase;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{AgoraError, Result};
