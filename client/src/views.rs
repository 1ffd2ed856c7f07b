//! Formatting used by the catalog components.

use pubflow_shared::{DataSource, SyncState, Track, TrackStatus};

pub fn format_duration(ms: u64) -> String {
    let total = ms / 1000;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// `950`, `1.2K`, `3.4M`
pub fn format_count(n: u64) -> String {
    fn scaled(n: u64, unit: f64, suffix: &str) -> String {
        let value = format!("{:.1}", n as f64 / unit);
        format!("{}{}", value.trim_end_matches(".0"), suffix)
    }

    match n {
        0..=999 => n.to_string(),
        // Anything that would print as 1000.0K is shown in millions
        1_000..=999_949 => scaled(n, 1_000.0, "K"),
        _ => scaled(n, 1_000_000.0, "M"),
    }
}

pub struct TrackCard<'a> {
    track: &'a Track,
}

impl<'a> TrackCard<'a> {
    pub fn new(track: &'a Track) -> Self {
        Self { track }
    }

    pub fn artist_line(&self) -> String {
        if self.track.artists.is_empty() {
            "Unknown artist".to_string()
        } else {
            self.track.artists.join(", ")
        }
    }

    pub fn duration(&self) -> Option<String> {
        self.track.duration_ms.map(format_duration)
    }

    /// Whole percent, clamped to 0..=100.
    pub fn confidence_percent(&self) -> Option<u8> {
        self.track
            .match_confidence
            .filter(|c| c.is_finite())
            .map(|c| (c.clamp(0.0, 1.0) * 100.0).round() as u8)
    }

    pub fn status_label(&self) -> &'static str {
        match self.track.status {
            TrackStatus::Matched => "Matched",
            TrackStatus::Pending => "Pending",
            TrackStatus::Unmatched => "Unmatched",
            TrackStatus::Enriched => "Enriched",
        }
    }

    /// Most specific identifier available, labelled.
    pub fn primary_identifier(&self) -> Option<(&'static str, &str)> {
        let t = self.track;
        t.isrc
            .as_deref()
            .map(|v| ("ISRC", v))
            .or_else(|| t.iswc.as_deref().map(|v| ("ISWC", v)))
            .or_else(|| t.upc.as_deref().map(|v| ("UPC", v)))
    }

    pub fn release_year(&self) -> Option<&str> {
        self.track
            .release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .filter(|y| y.chars().all(|c| c.is_ascii_digit()))
    }
}

pub struct DataSourceCard<'a> {
    source: &'a DataSource,
}

impl<'a> DataSourceCard<'a> {
    pub fn new(source: &'a DataSource) -> Self {
        Self { source }
    }

    pub fn connection_label(&self) -> &'static str {
        if self.source.connected {
            "Connected"
        } else {
            "Not connected"
        }
    }

    pub fn indexed_summary(&self) -> String {
        format!(
            "{} tracks · {} artists",
            format_count(self.source.indexed_tracks),
            format_count(self.source.indexed_artists)
        )
    }

    pub fn progress(&self) -> Option<u8> {
        let sync = self.source.last_sync.as_ref()?;
        if sync.status != SyncState::Running {
            return None;
        }
        sync.progress
            .filter(|p| p.is_finite())
            .map(|p| p.clamp(0.0, 100.0).round() as u8)
    }

    pub fn sync_summary(&self) -> String {
        match self.source.last_sync.as_ref().map(|s| s.status) {
            None | Some(SyncState::Idle) => "Never synced".to_string(),
            Some(SyncState::Running) => match self.progress() {
                Some(p) => format!("Syncing… {}%", p),
                None => "Syncing…".to_string(),
            },
            Some(SyncState::Completed) => "Synced".to_string(),
            Some(SyncState::Failed) => "Sync failed".to_string(),
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.source.last_error.as_deref().filter(|e| !e.is_empty())
    }
}

/// Whether a navigation item pointing at `target` is highlighted on `current`.
pub fn is_active(current: &str, target: &str, exact: bool) -> bool {
    let current = current.split(['?', '#']).next().unwrap_or(current);
    let current = normalize(current);
    let target = normalize(target);

    if exact || target == "/" {
        return current == target;
    }

    current == target
        || current
            .strip_prefix(target)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}
