use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    Matched,
    Pending,
    Unmatched,
    Enriched,
}

impl TrackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackStatus::Matched => "matched",
            TrackStatus::Pending => "pending",
            TrackStatus::Unmatched => "unmatched",
            TrackStatus::Enriched => "enriched",
        }
    }
}

impl std::str::FromStr for TrackStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "matched" => Ok(TrackStatus::Matched),
            "pending" => Ok(TrackStatus::Pending),
            "unmatched" => Ok(TrackStatus::Unmatched),
            "enriched" => Ok(TrackStatus::Enriched),
            other => Err(format!("unknown track status: {}", other)),
        }
    }
}

/// A recording as known to the catalog service.
///
/// Owned by the backend; clients only ever read it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub image_url: Option<String>,
    pub duration_ms: Option<u64>,
    /// ISO-8601 date as delivered by the upstream source (may be year-only)
    pub release_date: Option<String>,
    pub status: TrackStatus,
    /// Data sources this record was assembled from
    #[serde(default)]
    pub sources: Vec<String>,
    /// Match confidence in `[0, 1]`
    pub match_confidence: Option<f64>,
    pub isrc: Option<String>,
    pub iswc: Option<String>,
    pub upc: Option<String>,
    pub label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_wire_format_is_camel_case() {
        let json = serde_json::json!({
            "id": "trk_1",
            "title": "Blue Monday",
            "artists": ["New Order"],
            "album": "Power, Corruption & Lies",
            "imageUrl": null,
            "durationMs": 448000,
            "releaseDate": "1983-03-07",
            "status": "enriched",
            "sources": ["spotify", "musicbrainz"],
            "matchConfidence": 0.97,
            "isrc": "GBAAP8300005",
            "iswc": null,
            "upc": null,
            "label": "Factory"
        });

        let track: Track = serde_json::from_value(json).unwrap();
        assert_eq!(track.status, TrackStatus::Enriched);
        assert_eq!(track.duration_ms, Some(448000));
        assert_eq!(track.sources.len(), 2);

        let back = serde_json::to_value(&track).unwrap();
        assert_eq!(back["matchConfidence"], 0.97);
        assert_eq!(back["status"], "enriched");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Matched".parse::<TrackStatus>(), Ok(TrackStatus::Matched));
        assert!("lost".parse::<TrackStatus>().is_err());
    }
}
