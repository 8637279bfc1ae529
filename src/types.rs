use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the capacity feed.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Record {
    pub name: String,
    pub stage: String,
    pub capacity: f64,
    pub lat: f64,
    pub lon: f64,
    pub label: String,
}

/// Display severity for a zone's occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSymbol {
    Empty,
    Free,
    HalfFull,
    MostlyFull,
    Full,
}

impl StatusSymbol {
    pub fn glyph(self) -> &'static str {
        match self {
            StatusSymbol::Empty => "",
            StatusSymbol::Free => "🟢",
            StatusSymbol::HalfFull => "🟡",
            StatusSymbol::MostlyFull => "🟠",
            StatusSymbol::Full => "🔴",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub lat: f64,
    pub lon: f64,
    pub capacity: f64,
    pub label: String,
    /// Resolved hex color, clamped to the color domain.
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapCenter {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapDataset {
    pub points: Vec<MapPoint>,
    pub color_scale: Vec<String>,
    pub color_domain: [f64; 2],
    pub color_title: String,
    pub center: MapCenter,
    pub zoom: f64,
    pub style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// Position within this snapshot only; not a persistent key.
    pub id: usize,
    pub name: String,
    pub stage: String,
    pub status: StatusSymbol,
    pub glyph: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableColumn {
    pub id: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDataset {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<TableRow>,
}

/// Everything derived from one successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub map: MapDataset,
    pub table: TableDataset,
    pub fetched_at: DateTime<Utc>,
}
