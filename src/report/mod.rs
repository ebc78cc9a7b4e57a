//! Report building: single-player snapshots, guild rollups and the sinks they are written to.

pub mod events;
pub mod rollup;
pub mod sink;
pub mod snapshot;

pub use events::{resolve_event_definitions, EventDefinitions, EventTable};
pub use rollup::{guild_rollup, RollupRow};
pub use sink::{CsvSink, MemorySink, OutputSink, ReportRow, SinkError};
pub use snapshot::{SnapshotCriteria, SnapshotReport, SnapshotReporter};
