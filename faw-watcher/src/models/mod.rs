//! Data models for faw-watcher

pub mod action_units;
pub mod affect;
pub mod session;

pub use action_units::AuTable;
pub use affect::{AffectAggregate, AffectScore};
pub use session::{SessionFolder, SessionState};
