//! Heatmap generation over stored location fixes.
//!
//! Bins points into a fixed-size degree grid and represents each bin's
//! density by stacking translucent circles: hotter bins get more layers, so
//! overlap deepens the color. This is a deliberate crude approximation of a
//! heat surface, not kernel density estimation.
//!
//! Generation is a pure function over a snapshot of records: same input,
//! same circles, no side effects. The caller clears previously drawn shapes
//! before applying a new result.

use std::collections::BTreeMap;

use log::debug;

use crate::geo_utils;
use crate::{Bounds, GpsPoint, LocationRecord};

/// Grid cell size in degrees. 0.001° ≈ 111 m of latitude.
pub const CELL_SIZE_DEGREES: f64 = 0.001;

/// Stroke width for every heat circle.
pub const STROKE_WIDTH: f32 = 1.0;

/// Red with low alpha; stacked layers intensify the fill.
pub const FILL_RGBA: [u8; 4] = [255, 0, 0, 100];

/// Minimum fitted view radius before the margin, in kilometers.
const MIN_VIEW_RADIUS_KM: f64 = 0.5;

/// Extra view radius added around the fitted bounds, in kilometers.
const VIEW_MARGIN_KM: f64 = 0.5;

/// Configuration for heatmap generation.
#[derive(Debug, Clone)]
pub struct HeatmapConfig {
    /// Grid cell size in degrees.
    pub cell_size_degrees: f64,
    /// Base circle radius in meters, normally driven by a UI slider.
    pub base_radius_meters: f64,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            cell_size_degrees: CELL_SIZE_DEGREES,
            base_radius_meters: 100.0,
        }
    }
}

/// Grid coordinate: (latitude cell, longitude cell).
pub type CellCoord = (i32, i32);

/// A single occupied cell in the heatmap grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatCell {
    /// Grid index along latitude: `floor(lat / cell_size)`.
    pub lat_cell: i32,
    /// Grid index along longitude: `floor(lng / cell_size)`.
    pub lng_cell: i32,
    /// Cell center for rendering.
    pub center: GpsPoint,
    /// Number of records that fell into this cell.
    pub count: u32,
    /// Layer count in 1..=3 derived from count relative to the hottest cell.
    pub intensity: u32,
}

/// One drawable circle handed to the map surface.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatCircle {
    pub center: GpsPoint,
    pub radius_meters: f64,
    pub stroke_width: f32,
    pub fill_rgba: [u8; 4],
}

/// Map region that bounds all input points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: GpsPoint,
    pub radius_km: f64,
}

/// Complete heatmap result.
#[derive(Debug, Clone)]
pub struct Heatmap {
    /// Occupied cells in deterministic (lat_cell, lng_cell) order.
    pub cells: Vec<HeatCell>,
    /// Circles to draw, stacked per cell in intensity order.
    pub circles: Vec<HeatCircle>,
    /// Region covering all input records; `None` for empty input.
    pub view: Option<MapView>,
    /// Largest cell count in this snapshot.
    pub max_count: u32,
    /// Total number of input records.
    pub total_points: u32,
}

/// Group records into grid cells keyed by `floor(coord / cell_size)`.
///
/// Every record maps to exactly one cell, so the counts sum to the input
/// length. Returned in sorted key order so repeated runs are identical.
pub fn bin_records(records: &[LocationRecord], cell_size: f64) -> BTreeMap<CellCoord, u32> {
    let mut bins: BTreeMap<CellCoord, u32> = BTreeMap::new();
    for r in records {
        let lat_cell = (r.latitude / cell_size).floor() as i32;
        let lng_cell = (r.longitude / cell_size).floor() as i32;
        *bins.entry((lat_cell, lng_cell)).or_insert(0) += 1;
    }
    bins
}

/// Layer count for a cell: ceil(5 * count / max), clamped to 1..=3.
///
/// The 5x ramp dates back to a planned 1..5 scale; the clamp keeps at most
/// three stacked layers. Kept as-is: the hottest cell always saturates at 3,
/// and anything at half the max or above saturates with it.
fn intensity(count: u32, max_count: u32) -> u32 {
    ((5.0 * count as f64 / max_count as f64).ceil() as u32).clamp(1, 3)
}

/// Generate a heatmap from a snapshot of stored records.
///
/// Empty input produces an empty result with no view change.
pub fn generate_heatmap(records: &[LocationRecord], config: &HeatmapConfig) -> Heatmap {
    if records.is_empty() {
        return Heatmap {
            cells: vec![],
            circles: vec![],
            view: None,
            max_count: 0,
            total_points: 0,
        };
    }

    let cell_size = config.cell_size_degrees;
    let bins = bin_records(records, cell_size);
    let max_count = bins.values().copied().max().unwrap_or(1);

    let cells: Vec<HeatCell> = bins
        .iter()
        .map(|(&(lat_cell, lng_cell), &count)| HeatCell {
            lat_cell,
            lng_cell,
            center: GpsPoint::new(
                (lat_cell as f64 + 0.5) * cell_size,
                (lng_cell as f64 + 0.5) * cell_size,
            ),
            count,
            intensity: intensity(count, max_count),
        })
        .collect();

    let mut circles = Vec::new();
    for cell in &cells {
        for layer in 0..cell.intensity {
            circles.push(HeatCircle {
                center: cell.center,
                radius_meters: config.base_radius_meters * 0.3 + (layer as f64) * 10.0,
                stroke_width: STROKE_WIDTH,
                fill_rgba: FILL_RGBA,
            });
        }
    }

    let points: Vec<GpsPoint> = records.iter().map(|r| r.point()).collect();
    let view = Bounds::from_points(&points).map(|bounds| MapView {
        center: bounds.center(),
        radius_km: geo_utils::half_diagonal_km(&bounds).max(MIN_VIEW_RADIUS_KM) + VIEW_MARGIN_KM,
    });

    debug!(
        "[Heatmap] {} record(s) -> {} cell(s), max count {}, {} circle(s)",
        records.len(),
        cells.len(),
        max_count,
        circles.len()
    );

    Heatmap {
        cells,
        circles,
        view,
        max_count,
        total_points: records.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, lat: f64, lng: f64) -> LocationRecord {
        LocationRecord {
            id,
            latitude: lat,
            longitude: lng,
            captured_at: id,
        }
    }

    #[test]
    fn test_empty_input_produces_nothing() {
        let heatmap = generate_heatmap(&[], &HeatmapConfig::default());
        assert!(heatmap.cells.is_empty());
        assert!(heatmap.circles.is_empty());
        assert!(heatmap.view.is_none());
        assert_eq!(heatmap.max_count, 0);
    }

    #[test]
    fn test_bin_counts_partition_records() {
        let records = vec![
            record(1, 51.5001, -0.1201),
            record(2, 51.5002, -0.1202),
            record(3, 51.5015, -0.1203),
            record(4, -33.8688, 151.2093),
        ];
        let bins = bin_records(&records, CELL_SIZE_DEGREES);
        let total: u32 = bins.values().sum();
        assert_eq!(total as usize, records.len());
    }

    #[test]
    fn test_negative_coordinates_floor_down() {
        // floor(-0.0001 / 0.001) = -1, not 0
        let bins = bin_records(&[record(1, -0.0001, -0.0001)], CELL_SIZE_DEGREES);
        assert_eq!(bins.get(&(-1, -1)), Some(&1));
    }

    #[test]
    fn test_intensity_bounds_and_max_saturation() {
        let records = vec![
            record(1, 10.0001, 20.0001),
            record(2, 10.0001, 20.0001),
            record(3, 10.0001, 20.0001),
            record(4, 10.0001, 20.0001),
            record(5, 10.0001, 20.0001),
            record(6, 10.0001, 20.0001),
            record(7, 10.0051, 20.0051),
        ];
        let heatmap = generate_heatmap(&records, &HeatmapConfig::default());
        for cell in &heatmap.cells {
            assert!((1..=3).contains(&cell.intensity));
        }
        let hottest = heatmap
            .cells
            .iter()
            .max_by_key(|c| c.count)
            .unwrap();
        assert_eq!(hottest.count, heatmap.max_count);
        assert_eq!(hottest.intensity, 3);
    }

    #[test]
    fn test_two_bin_example_both_saturate() {
        // Three records, two cells: counts 2 and 1. With the 5x ramp both
        // cells land on intensity 3 (ceil(5*1/2) = 3), a deliberately coarse
        // result of the clamp.
        let records = vec![
            record(1, 10.0001, 20.0001),
            record(2, 10.0009, 20.0009),
            record(3, 10.0011, 20.0011),
        ];
        let heatmap = generate_heatmap(&records, &HeatmapConfig::default());

        assert_eq!(heatmap.cells.len(), 2);
        let dense = heatmap
            .cells
            .iter()
            .find(|c| (c.lat_cell, c.lng_cell) == (10000, 20000))
            .unwrap();
        let sparse = heatmap
            .cells
            .iter()
            .find(|c| (c.lat_cell, c.lng_cell) == (10001, 20001))
            .unwrap();

        assert_eq!(dense.count, 2);
        assert_eq!(sparse.count, 1);
        assert_eq!(heatmap.max_count, 2);
        assert_eq!(dense.intensity, 3);
        assert_eq!(sparse.intensity, 3);
        assert_eq!(heatmap.circles.len(), 6);
    }

    #[test]
    fn test_cell_centers_and_circle_radii() {
        let config = HeatmapConfig {
            cell_size_degrees: CELL_SIZE_DEGREES,
            base_radius_meters: 100.0,
        };
        let heatmap = generate_heatmap(
            &[
                record(1, 10.0001, 20.0001),
                record(2, 10.0002, 20.0002),
                record(3, 10.0003, 20.0003),
            ],
            &config,
        );

        assert_eq!(heatmap.cells.len(), 1);
        let cell = &heatmap.cells[0];
        assert!((cell.center.latitude - 10.0005).abs() < 1e-9);
        assert!((cell.center.longitude - 20.0005).abs() < 1e-9);

        // Single cell at intensity 3: layers at base*0.3 + 0/10/20 m
        let radii: Vec<f64> = heatmap.circles.iter().map(|c| c.radius_meters).collect();
        assert_eq!(radii, vec![30.0, 40.0, 50.0]);
        for circle in &heatmap.circles {
            assert_eq!(circle.stroke_width, STROKE_WIDTH);
            assert_eq!(circle.fill_rgba, FILL_RGBA);
        }
    }

    #[test]
    fn test_view_floors_at_half_km_plus_margin() {
        // Tight cluster: half diagonal well under 0.5 km, so the view radius
        // is the 0.5 km floor plus the 0.5 km margin.
        let heatmap = generate_heatmap(
            &[
                record(1, 10.0001, 20.0001),
                record(2, 10.0011, 20.0011),
            ],
            &HeatmapConfig::default(),
        );
        let view = heatmap.view.unwrap();
        assert!((view.center.latitude - 10.0006).abs() < 1e-9);
        assert!((view.center.longitude - 20.0006).abs() < 1e-9);
        assert!((view.radius_km - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_view_grows_with_spread() {
        // ~0.1° spread: half diagonal is far above the floor
        let heatmap = generate_heatmap(
            &[record(1, 10.0, 20.0), record(2, 10.1, 20.1)],
            &HeatmapConfig::default(),
        );
        let view = heatmap.view.unwrap();
        assert!(view.radius_km > 5.0);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let records = vec![
            record(1, 51.5001, -0.1201),
            record(2, 51.5031, -0.1231),
            record(3, 51.5061, -0.1261),
        ];
        let a = generate_heatmap(&records, &HeatmapConfig::default());
        let b = generate_heatmap(&records, &HeatmapConfig::default());
        assert_eq!(a.cells, b.cells);
        assert_eq!(a.circles, b.circles);
        assert_eq!(a.view, b.view);
    }
}
