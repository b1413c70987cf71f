//! # Heatpath
//!
//! Periodic GPS location tracking with a grid-density heatmap visualization.
//!
//! This library is the core of a single-user, single-device location diary:
//! - A cancellable tracking loop that samples the device position at a fixed
//!   interval and persists each fix
//! - A SQLite-backed point store with lazy, thread-safe initialization
//! - A pure spatial binner that turns the stored points into stacked
//!   translucent circles plus a map region that bounds them
//!
//! Platform concerns (the actual GPS sensor, the permission prompt, the map
//! widget) stay behind the traits in [`platform`]; the shell application
//! implements those and drives everything through [`HeatmapSession`].
//!
//! ## Quick Start
//!
//! ```rust
//! use heatpath::{HeatmapConfig, generate_heatmap, LocationRecord};
//!
//! let records = vec![
//!     LocationRecord { id: 1, latitude: 51.5074, longitude: -0.1278, captured_at: 100 },
//!     LocationRecord { id: 2, latitude: 51.5075, longitude: -0.1279, captured_at: 110 },
//! ];
//!
//! let heatmap = generate_heatmap(&records, &HeatmapConfig::default());
//! assert_eq!(heatmap.cells.len(), 1); // both fixes land in the same 0.001° cell
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

pub mod geo_utils;
pub mod heatmap;
pub mod platform;
pub mod session;
pub mod store;
pub mod tracking;

pub use heatmap::{
    generate_heatmap, HeatCell, HeatCircle, Heatmap, HeatmapConfig, MapView,
};
pub use platform::{Accuracy, LocationSensor, MapSurface, Permission, PermissionService};
pub use session::HeatmapSession;
pub use store::LocationStore;
pub use tracking::{CancelToken, TrackEvent, TrackOutcome, Tracker, TrackerConfig};

/// Initialize logging for Android builds.
#[cfg(target_os = "android")]
pub fn init_platform_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("HeatpathRust"),
    );
}

/// No-op on non-Android platforms; hosts install their own `log` backend.
#[cfg(not(target_os = "android"))]
pub fn init_platform_logging() {}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use heatpath::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// One persisted location fix.
///
/// Immutable once stored: the id is assigned by the store on insert and
/// records are only ever removed in bulk via [`LocationStore::clear`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationRecord {
    /// Store-assigned identifier (monotonic per database).
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// Capture time as Unix seconds, UTC.
    pub captured_at: i64,
}

impl LocationRecord {
    /// The record's coordinate as a [`GpsPoint`].
    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// Bounding box over a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points. Returns `None` for empty input.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// Current wall-clock time as Unix seconds, UTC.
pub fn current_unix_time() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// ============================================================================
// Errors
// ============================================================================

/// Failure while accessing the point store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Failure reported by the location sensor.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SensorError(pub String);

/// Terminal failure of a tracking run.
///
/// Cancellation is not represented here: a stopped loop is a normal outcome
/// ([`TrackOutcome::Stopped`]), never an error.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("sensor failure: {0}")]
    Sensor(#[from] SensorError),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_validity() {
        assert!(GpsPoint::new(51.5074, -0.1278).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_bounds_from_points() {
        let points = vec![
            GpsPoint::new(51.50, -0.13),
            GpsPoint::new(51.51, -0.12),
            GpsPoint::new(51.505, -0.125),
        ];
        let bounds = Bounds::from_points(&points).unwrap();
        assert_eq!(bounds.min_lat, 51.50);
        assert_eq!(bounds.max_lat, 51.51);
        assert_eq!(bounds.min_lng, -0.13);
        assert_eq!(bounds.max_lng, -0.12);

        let center = bounds.center();
        assert!((center.latitude - 51.505).abs() < 1e-9);
        assert!((center.longitude - (-0.125)).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_empty() {
        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_current_unix_time_is_recent() {
        // 2024-01-01 as a sanity floor
        assert!(current_unix_time() > 1_704_067_200);
    }
}
