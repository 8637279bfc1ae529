use crate::types::{Snapshot, StatusSymbol};
use geo::{HaversineDistance, Point};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::Serialize;

// Zone positions are stored in a local equirectangular projection so that
// euclidean nearest-neighbour matches ground distance closely enough.
struct ZoneEntry {
    index: usize,
    position: [f64; 2],
}

impl RTreeObject for ZoneEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for ZoneEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestZone {
    pub id: usize,
    pub name: String,
    pub stage: String,
    pub label: String,
    pub capacity: f64,
    pub status: StatusSymbol,
    pub glyph: String,
    pub distance_m: f64,
}

pub struct ZoneIndex {
    tree: RTree<ZoneEntry>,
    lon_scale: f64,
}

impl ZoneIndex {
    pub fn build(snapshot: &Snapshot) -> Self {
        let points = &snapshot.map.points;
        let mean_lat = if points.is_empty() {
            0.0
        } else {
            points.iter().map(|p| p.lat).sum::<f64>() / points.len() as f64
        };
        let lon_scale = mean_lat.to_radians().cos();

        let entries = points
            .iter()
            .enumerate()
            .map(|(index, p)| ZoneEntry {
                index,
                position: [p.lon * lon_scale, p.lat],
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
            lon_scale,
        }
    }

    /// Non-finite coordinates never match a zone.
    pub fn nearest(&self, snapshot: &Snapshot, lat: f64, lon: f64) -> Option<NearestZone> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        let entry = self.tree.nearest_neighbor(&[lon * self.lon_scale, lat])?;
        let point = snapshot.map.points.get(entry.index)?;
        let row = snapshot.table.rows.get(entry.index)?;

        let distance_m =
            Point::new(lon, lat).haversine_distance(&Point::new(point.lon, point.lat));
        Some(NearestZone {
            id: row.id,
            name: row.name.clone(),
            stage: row.stage.clone(),
            label: point.label.clone(),
            capacity: point.capacity,
            status: row.status,
            glyph: row.glyph.clone(),
            distance_m,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use crate::config::MapConfig;
    use crate::processing::Projector;
    use crate::types::Record;
    use chrono::Utc;

    fn snapshot(records: &[Record]) -> Snapshot {
        let map = MapConfig::default();
        let projector = Projector::new(Classifier::default(), map.color_scale().unwrap(), map);
        let (map, table) = projector.project(records);
        Snapshot {
            map,
            table,
            fetched_at: Utc::now(),
        }
    }

    fn zone(name: &str, lat: f64, lon: f64) -> Record {
        Record {
            name: name.to_string(),
            stage: "1".to_string(),
            capacity: 42.0,
            lat,
            lon,
            label: name.to_string(),
        }
    }

    #[test]
    fn finds_closest_zone() {
        let snap = snapshot(&[
            zone("Fafe", 41.45, -8.17),
            zone("Arganil", 40.22, -8.05),
            zone("Lousã", 40.11, -8.25),
        ]);
        let index = ZoneIndex::build(&snap);
        let hit = index.nearest(&snap, 41.40, -8.20).unwrap();
        assert_eq!(hit.name, "Fafe");
        assert_eq!(hit.id, 0);
        assert!(hit.distance_m > 1_000.0 && hit.distance_m < 10_000.0);

        let hit = index.nearest(&snap, 40.12, -8.24).unwrap();
        assert_eq!(hit.name, "Lousã");
        assert_eq!(hit.status, StatusSymbol::Free);
    }

    #[test]
    fn empty_snapshot_has_no_nearest() {
        let snap = snapshot(&[]);
        assert!(ZoneIndex::build(&snap).nearest(&snap, 40.0, -8.0).is_none());
    }

    #[test]
    fn non_finite_query_has_no_nearest() {
        let snap = snapshot(&[
            zone("Fafe", 41.45, -8.17),
            zone("Arganil", 40.22, -8.05),
            zone("Lousã", 40.11, -8.25),
            zone("Góis", 40.15, -8.11),
            zone("Mortágua", 40.40, -8.23),
        ]);
        let index = ZoneIndex::build(&snap);
        assert!(index.nearest(&snap, f64::NAN, -8.0).is_none());
        assert!(index.nearest(&snap, 40.0, f64::NAN).is_none());
        assert!(index.nearest(&snap, f64::INFINITY, -8.0).is_none());
        assert!(index.nearest(&snap, 40.0, f64::NEG_INFINITY).is_none());
    }
}
