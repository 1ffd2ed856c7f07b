use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Idle,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub status: SyncState,
    /// Percent complete, only meaningful while running
    pub progress: Option<f64>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// An external catalog the platform indexes (DSP, rights database, ...).
///
/// State is written by backend sync jobs only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub connected: bool,
    #[serde(default)]
    pub indexed_tracks: u64,
    #[serde(default)]
    pub indexed_artists: u64,
    pub last_sync: Option<SyncStatus>,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_field_rename() {
        let json = serde_json::json!({
            "id": "src_spotify",
            "name": "Spotify",
            "type": "dsp",
            "connected": true,
            "indexedTracks": 1200,
            "lastSync": { "status": "running", "progress": 42.0, "startedAt": null, "finishedAt": null },
            "lastError": null
        });

        let source: DataSource = serde_json::from_value(json).unwrap();
        assert_eq!(source.kind, "dsp");
        assert_eq!(source.indexed_artists, 0);
        assert_eq!(source.last_sync.unwrap().status, SyncState::Running);
    }
}
