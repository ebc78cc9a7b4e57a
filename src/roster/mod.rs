//! Roster assembly: per-player and bulk [crate::data::player::PlayerData], snapshot routing
//! and the table sync pipeline.

pub mod assembler;
pub mod resolve;
pub mod sync;

pub use assembler::{enrich_units, RosterAssembler};
pub use resolve::{resolve_snapshot, route_snapshot, SnapshotQuery, SnapshotRoute};
pub use sync::{sync_tables, SyncError, SyncOutcome};
