pub mod data_source;
pub mod track;

pub use data_source::{DataSource, SyncState, SyncStatus};
pub use track::{Track, TrackStatus};
