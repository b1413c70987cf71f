//! Platform collaborator seams.
//!
//! The library never talks to a real GPS chip or map widget. The mobile
//! shell implements these traits over the native APIs; tests and demos
//! implement them with scripted fakes.

use std::future::Future;
use std::time::Duration;

use crate::heatmap::HeatCircle;
use crate::tracking::CancelToken;
use crate::{GpsPoint, SensorError};

/// Result of a location permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Accuracy target for a position fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    Low,
    Medium,
    High,
}

impl Accuracy {
    /// Rough horizontal accuracy the sensor should aim for, in meters.
    pub fn target_meters(self) -> f64 {
        match self {
            Accuracy::Low => 500.0,
            Accuracy::Medium => 100.0,
            Accuracy::High => 10.0,
        }
    }
}

/// Prompts the user for while-in-use location access.
pub trait PermissionService {
    fn request_location_permission(&self) -> impl Future<Output = Permission> + Send;
}

/// Produces single position fixes on demand.
///
/// Contract: a fix request is bounded by `timeout` and must observe
/// `cancel`; a cancelled or timed-out request resolves to `Ok(None)` rather
/// than an error. `Err` is reserved for genuine sensor failures.
pub trait LocationSensor {
    fn get_fix(
        &self,
        accuracy: Accuracy,
        timeout: Duration,
        cancel: CancelToken,
    ) -> impl Future<Output = Result<Option<GpsPoint>, SensorError>> + Send;
}

/// The map widget the heatmap is drawn onto.
///
/// Methods take `&self`: real map controls are shared handles, so
/// implementations use interior mutability. Shape identity is by value; the
/// caller keeps the circles it added and passes them back to remove them.
pub trait MapSurface {
    fn add_shape(&self, circle: HeatCircle);
    fn remove_shape(&self, circle: &HeatCircle);
    fn set_view(&self, center: GpsPoint, radius_km: f64);
}
