pub mod models;

pub use models::{DataSource, SyncState, SyncStatus, Track, TrackStatus};
