use pubflow_shared::{DataSource, Track, TrackStatus};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogSeed {
    #[serde(default)]
    tracks: Vec<Track>,
    #[serde(default)]
    data_sources: Vec<DataSource>,
}

/// In-memory view of the catalog. Writers are seeding and sync jobs.
#[derive(Default)]
pub struct CatalogStore {
    tracks: RwLock<HashMap<String, Track>>,
    data_sources: RwLock<HashMap<String, DataSource>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn from_seed_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read catalog seed {}: {}", path.display(), e))?;
        let seed: CatalogSeed = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid catalog seed {}: {}", path.display(), e))?;

        let store = Self::new();
        for track in seed.tracks {
            store.upsert_track(track).await;
        }
        for source in seed.data_sources {
            store.upsert_data_source(source).await;
        }

        tracing::info!(
            "Loaded catalog seed: {} tracks, {} data sources",
            store.tracks.read().await.len(),
            store.data_sources.read().await.len()
        );
        Ok(store)
    }

    pub async fn upsert_track(&self, track: Track) {
        self.tracks.write().await.insert(track.id.clone(), track);
    }

    pub async fn upsert_data_source(&self, source: DataSource) {
        self.data_sources
            .write()
            .await
            .insert(source.id.clone(), source);
    }

    pub async fn list_tracks(&self, status: Option<TrackStatus>) -> Vec<Track> {
        let mut tracks: Vec<Track> = self
            .tracks
            .read()
            .await
            .values()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        tracks.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        tracks
    }

    pub async fn get_track(&self, id: &str) -> Option<Track> {
        self.tracks.read().await.get(id).cloned()
    }

    pub async fn list_data_sources(&self) -> Vec<DataSource> {
        let mut sources: Vec<DataSource> =
            self.data_sources.read().await.values().cloned().collect();
        sources.sort_by(|a, b| a.name.cmp(&b.name));
        sources
    }

    pub async fn get_data_source(&self, id: &str) -> Option<DataSource> {
        self.data_sources.read().await.get(id).cloned()
    }
}
