//! JSON snapshot of the trail store, written when a slave exits.

use crate::error::NodeError;
use crate::sample::{Rgb, Sample};
use crate::trail_store::{MessageCounters, TrailStore};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-object summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackExport {
    pub name: String,
    pub latest: Sample,
    /// History oldest → newest
    pub history: Vec<Sample>,
    pub segments: usize,
    pub segments_total: u64,
    pub afterimages: usize,
    pub samples: u64,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailExport {
    pub head: usize,
    pub ticks: u64,
    pub counters: MessageCounters,
    pub mean_distance: Option<f64>,
    pub tracks: Vec<TrackExport>,
}

impl TrailExport {
    pub fn from_store(store: &TrailStore) -> Self {
        let tracks = store
            .records()
            .map(|record| TrackExport {
                name: record.name().to_string(),
                latest: record.latest(),
                history: record.history_samples(),
                segments: record.segments().len(),
                segments_total: record.segments().total_pushed(),
                afterimages: record.afterimages().len(),
                samples: record.ingested(),
                color: store.color_for(record.name()),
            })
            .collect();

        Self {
            head: store.head(),
            ticks: store.ticks(),
            counters: store.counters(),
            mean_distance: store.latest_mean_distance(),
            tracks,
        }
    }

    pub fn to_json(&self) -> Result<String, NodeError> {
        serde_json::to_string_pretty(self).map_err(|e| NodeError::Export(e.to_string()))
    }

    /// Writes the snapshot as pretty-printed JSON.
    pub async fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), NodeError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| NodeError::Export(format!("{}: {}", path.display(), e)))?;
        tracing::info!("trail snapshot written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrailConfig;

    #[tokio::test]
    async fn test_export_roundtrips_through_file() {
        let mut store = TrailStore::new(TrailConfig {
            expected_objects: 2,
            ..TrailConfig::default()
        });
        for payload in [&b"A~0~0~1\n"[..], b"B~0~0~2\n", b"A~0~0~1\n", b"junk\n"] {
            store.ingest_datagram(payload, Rgb::WHITE);
        }

        let export = TrailExport::from_store(&store);
        assert_eq!(export.tracks.len(), 2);
        assert_eq!(export.tracks[0].name, "A");
        assert_eq!(export.tracks[0].samples, 2);
        assert_eq!(export.tracks[1].history, vec![Sample::new(0.0, 0.0, 2.0)]);
        assert_eq!(export.counters.invalid, 1);
        assert_eq!(export.mean_distance, Some(1.0));

        let path = std::env::temp_dir().join(format!("gesture-trails-export-{}.json", std::process::id()));
        export.write_to_file(&path).await.unwrap();
        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: TrailExport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, export);
        tokio::fs::remove_file(&path).await.unwrap();
    }
}
