//! Trend pivot aggregation.
//!
//! Turns the sparse `(year, topic, frequency)` records served by
//! `GET /api/trends` into a dense year × topic matrix plus one colored
//! series per topic, which is the shape a multi-series time chart needs.
//!
//! Policies:
//! - Topics keep first-occurrence order; years are sorted ascending.
//! - Absent `(year, topic)` pairs are `0`.
//! - When several records share a `(year, topic)` pair, the first one in
//!   input order wins. Later duplicates are ignored, never summed.
//! - Colors depend only on first-occurrence order (or, opt-in, on a digest
//!   of the topic name), so re-pivoting the same input is stable.

use crate::config::{ColorAssignment, TrendsConfig};
use crate::coordinator::RequestCoordinator;
use crate::error::RequestError;
use crate::transport::ApiRequest;
use crate::types::TrendRecord;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const TRENDS_OPERATION: &str = "trends";
pub const TRENDS_PATH: &str = "/api/trends";

/// Key holding the year in a flat-serialized matrix row.
pub const YEAR_KEY: &str = "year";

/// Key under which a topic's value appears in a flat-serialized row.
///
/// A topic literally named `year` would shadow the row's year, so it is
/// written as `topic:year` instead.
pub fn data_key(topic: &str) -> String {
    if topic == YEAR_KEY {
        format!("topic:{topic}")
    } else {
        topic.to_string()
    }
}

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

/// Ordered series colors plus the rule mapping topics onto them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<String>,
    assignment: ColorAssignment,
}

impl Palette {
    /// Build a palette. An empty color list falls back to the defaults.
    pub fn new(colors: Vec<String>, assignment: ColorAssignment) -> Self {
        let colors = if colors.is_empty() {
            TrendsConfig::default().palette
        } else {
            colors
        };
        Self { colors, assignment }
    }

    pub fn from_config(config: &TrendsConfig) -> Self {
        Self::new(config.palette.clone(), config.color_assignment)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn color(&self, index: usize) -> &str {
        &self.colors[index % self.colors.len()]
    }

    /// Palette index for a topic first seen at `first_seen`.
    pub fn index_for(&self, topic: &str, first_seen: usize) -> usize {
        match self.assignment {
            ColorAssignment::FirstSeen => first_seen % self.colors.len(),
            ColorAssignment::TopicHash => {
                let digest = Sha256::digest(topic.as_bytes());
                let mut prefix = [0u8; 8];
                prefix.copy_from_slice(&digest[..8]);
                (u64::from_be_bytes(prefix) % self.colors.len() as u64) as usize
            }
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::from_config(&TrendsConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Pivot output
// ---------------------------------------------------------------------------

/// A topic line in the chart and its assigned color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSeries {
    pub topic: String,
    /// Key of this topic's values in the flat-serialized rows.
    pub key: String,
    /// Index into the palette.
    pub color: usize,
    /// The palette entry at `color`.
    pub stroke: String,
}

/// One year of the dense matrix.
///
/// `values` holds every known topic, in series order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotRow {
    pub year: i32,
    pub values: Vec<(String, u64)>,
}

impl PivotRow {
    pub fn get(&self, topic: &str) -> Option<u64> {
        self.values
            .iter()
            .find(|(t, _)| t == topic)
            .map(|(_, v)| *v)
    }

    pub fn total(&self) -> u64 {
        self.values.iter().map(|(_, v)| v).sum()
    }
}

/// Rows serialize flat, the way chart libraries consume them:
/// `{"year": 2020, "A": 10, "B": 0}`. Topic keys come from [`data_key`].
impl Serialize for PivotRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry(YEAR_KEY, &self.year)?;
        for (topic, value) in &self.values {
            map.serialize_entry(&data_key(topic), value)?;
        }
        map.end()
    }
}

/// Dense `|years| × |topics|` matrix with years ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PivotMatrix {
    rows: Vec<PivotRow>,
}

impl PivotMatrix {
    pub fn rows(&self) -> &[PivotRow] {
        &self.rows
    }

    pub fn years(&self) -> Vec<i32> {
        self.rows.iter().map(|r| r.year).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(|r| r.values.len()).sum()
    }

    pub fn value(&self, year: i32, topic: &str) -> Option<u64> {
        self.rows.iter().find(|r| r.year == year)?.get(topic)
    }
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrendPivot {
    pub matrix: PivotMatrix,
    pub series: Vec<TopicSeries>,
}

/// Pivot with the default palette.
pub fn pivot(records: &[TrendRecord]) -> TrendPivot {
    pivot_with(records, &Palette::default())
}

/// Pivot sparse records into a dense matrix and colored series.
pub fn pivot_with(records: &[TrendRecord], palette: &Palette) -> TrendPivot {
    let mut seen = HashSet::new();
    let topics: Vec<&str> = records
        .iter()
        .map(|r| r.topic.as_str())
        .filter(|t| seen.insert(*t))
        .collect();

    let years: BTreeSet<i32> = records.iter().map(|r| r.year).collect();

    // First record per (year, topic) wins.
    let mut cells: HashMap<(i32, &str), u64> = HashMap::with_capacity(records.len());
    for record in records {
        cells
            .entry((record.year, record.topic.as_str()))
            .or_insert(record.frequency);
    }

    let rows = years
        .into_iter()
        .map(|year| PivotRow {
            year,
            values: topics
                .iter()
                .map(|&topic| {
                    let value = cells.get(&(year, topic)).copied().unwrap_or(0);
                    (topic.to_string(), value)
                })
                .collect(),
        })
        .collect();

    let series = topics
        .iter()
        .enumerate()
        .map(|(first_seen, &topic)| {
            let color = palette.index_for(topic, first_seen);
            TopicSeries {
                topic: topic.to_string(),
                key: data_key(topic),
                color,
                stroke: palette.color(color).to_string(),
            }
        })
        .collect();

    TrendPivot {
        matrix: PivotMatrix { rows },
        series,
    }
}

// ---------------------------------------------------------------------------
// Trend view
// ---------------------------------------------------------------------------

/// Read-only view model for the trend chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSnapshot {
    pub matrix: PivotMatrix,
    pub series: Vec<TopicSeries>,
    /// Number of records the matrix was built from.
    pub record_count: usize,
    /// Message of the last failed fetch; the matrix is empty in that case.
    pub error: Option<String>,
}

impl TrendSnapshot {
    fn failed(error: &RequestError) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

/// Fetches trend records and keeps the latest pivoted snapshot.
pub struct TrendView {
    coordinator: Arc<RequestCoordinator>,
    palette: Palette,
    snapshot: Mutex<TrendSnapshot>,
}

impl TrendView {
    pub fn new(coordinator: Arc<RequestCoordinator>, palette: Palette) -> Self {
        Self {
            coordinator,
            palette,
            snapshot: Mutex::new(TrendSnapshot::default()),
        }
    }

    /// Fetch `GET /api/trends`, pivot it and replace the snapshot.
    ///
    /// A failed fetch leaves an empty snapshot carrying the error. A
    /// superseded fetch changes nothing.
    pub async fn refresh(&self) -> TrendSnapshot {
        let issued = self
            .coordinator
            .issue::<Vec<TrendRecord>>(TRENDS_OPERATION, ApiRequest::get(TRENDS_PATH))
            .await;

        let mut snapshot = self.snapshot.lock().unwrap();
        match issued.outcome {
            Ok(records) => {
                let TrendPivot { matrix, series } = pivot_with(&records, &self.palette);
                debug!(
                    records = records.len(),
                    years = matrix.rows().len(),
                    topics = series.len(),
                    "Pivoted trend records"
                );
                *snapshot = TrendSnapshot {
                    matrix,
                    series,
                    record_count: records.len(),
                    error: None,
                };
            }
            Err(e) if e.is_superseded() => {}
            Err(e) => {
                warn!(error = %e, "Trend fetch failed; showing empty chart");
                *snapshot = TrendSnapshot::failed(&e);
            }
        }
        snapshot.clone()
    }

    pub fn snapshot(&self) -> TrendSnapshot {
        self.snapshot.lock().unwrap().clone()
    }
}
