pub mod coerce;
pub mod service;

pub use service::{BatchStats, FeedOutcome, SyncOptions, SyncReport, SyncService};
