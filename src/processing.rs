use crate::classify::Classifier;
use crate::config::MapConfig;
use crate::render::ColorScale;
use crate::types::{
    MapCenter, MapDataset, MapPoint, Record, StatusSymbol, TableColumn, TableDataset, TableRow,
};
use serde::Serialize;

/// Everything the projection needs besides the records themselves.
#[derive(Debug, Clone)]
pub struct Projector {
    classifier: Classifier,
    scale: ColorScale,
    map: MapConfig,
}

impl Projector {
    pub fn new(classifier: Classifier, scale: ColorScale, map: MapConfig) -> Self {
        Self {
            classifier,
            scale,
            map,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn scale(&self) -> &ColorScale {
        &self.scale
    }

    /// Derive both views from one record set. Order is preserved and no
    /// record is dropped.
    pub fn project(&self, records: &[Record]) -> (MapDataset, TableDataset) {
        (self.map_dataset(records), self.table_dataset(records))
    }

    fn map_dataset(&self, records: &[Record]) -> MapDataset {
        let points = records
            .iter()
            .map(|r| MapPoint {
                lat: r.lat,
                lon: r.lon,
                capacity: r.capacity,
                label: r.label.clone(),
                color: self.scale.hex_at(r.capacity),
            })
            .collect();

        MapDataset {
            points,
            color_scale: self.map.color_scale.clone(),
            color_domain: self.map.color_domain,
            color_title: self.map.color_title.clone(),
            center: MapCenter {
                lat: self.map.center_lat,
                lon: self.map.center_lon,
            },
            zoom: self.map.zoom,
            style: self.map.style.clone(),
        }
    }

    fn table_dataset(&self, records: &[Record]) -> TableDataset {
        let rows = records
            .iter()
            .enumerate()
            .map(|(id, r)| {
                let status = self.classifier.classify(r.capacity);
                TableRow {
                    id,
                    name: r.name.clone(),
                    stage: r.stage.clone(),
                    status,
                    glyph: status.glyph().to_string(),
                }
            })
            .collect();

        TableDataset {
            columns: table_columns(),
            rows,
        }
    }
}

pub fn table_columns() -> Vec<TableColumn> {
    vec![
        TableColumn {
            id: "name",
            name: "Zona Espectáculo",
        },
        TableColumn {
            id: "stage",
            name: "Troço",
        },
        TableColumn {
            id: "status",
            name: "Status",
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub status: StatusSymbol,
    pub glyph: &'static str,
    pub pt: String,
    pub es: String,
    pub en: String,
}

/// Glyph legend in Portuguese, Spanish and English, worded from the
/// classifier's actual thresholds. `Empty` has no glyph and is omitted.
pub fn legend(classifier: &Classifier) -> Vec<LegendEntry> {
    classifier
        .tiers()
        .iter()
        .filter(|tier| tier.status != StatusSymbol::Empty)
        .map(|tier| {
            let above = tier.above;
            let (pt, es, en) = match tier.status {
                StatusSymbol::Full => (
                    "Lotação Esgotada".to_string(),
                    "Sin Capacidad".to_string(),
                    "Full Capacity".to_string(),
                ),
                StatusSymbol::Free => (
                    "Livre".to_string(),
                    "Libre".to_string(),
                    "Free".to_string(),
                ),
                _ => (
                    format!("Lotação acima dos {above}%"),
                    format!("Capacidad superior al {above}%"),
                    format!("Capacity above {above}%"),
                ),
            };
            LegendEntry {
                status: tier.status,
                glyph: tier.status.glyph(),
                pt,
                es,
                en,
            }
        })
        .collect()
}
