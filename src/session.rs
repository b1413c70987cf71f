//! Session state and action handlers for the single tracking screen.
//!
//! Holds what the original screen kept in mutable page fields: the circles
//! currently on the map and the slider-driven base radius. Each handler is
//! the error boundary for its action: failures are caught here and turned
//! into the status string the UI displays, so nothing propagates further.

use std::sync::{Arc, Mutex};

use log::warn;

use crate::heatmap::{self, HeatCircle, HeatmapConfig};
use crate::platform::{LocationSensor, MapSurface, PermissionService};
use crate::store::LocationStore;
use crate::tracking::{TrackCallback, TrackOutcome, Tracker};
use crate::StoreError;

/// View-model for the tracking + heatmap screen.
pub struct HeatmapSession<M: MapSurface> {
    store: Arc<LocationStore>,
    tracker: Arc<Tracker>,
    map: Arc<M>,
    drawn: Mutex<Vec<HeatCircle>>,
    base_radius_meters: Mutex<f64>,
}

impl<M: MapSurface> HeatmapSession<M> {
    pub fn new(store: Arc<LocationStore>, tracker: Arc<Tracker>, map: Arc<M>) -> Self {
        Self {
            store,
            tracker,
            map,
            drawn: Mutex::new(Vec::new()),
            base_radius_meters: Mutex::new(HeatmapConfig::default().base_radius_meters),
        }
    }

    /// Update the base circle radius from the UI slider.
    pub fn set_base_radius(&self, meters: f64) {
        *self.base_radius_meters.lock().unwrap() = meters;
    }

    pub fn base_radius(&self) -> f64 {
        *self.base_radius_meters.lock().unwrap()
    }

    /// Start the tracking loop; resolves when it ends. Returns the final
    /// status line ("Tracking stopped.", "Location permission denied.", ...).
    pub async fn start<P, S>(
        &self,
        permissions: &P,
        sensor: &S,
        on_event: Option<TrackCallback>,
    ) -> String
    where
        P: PermissionService,
        S: LocationSensor,
    {
        let outcome = self
            .tracker
            .start(permissions, sensor, &self.store, &*self.map, on_event)
            .await;
        if let TrackOutcome::Failed(e) = &outcome {
            warn!("[Session] Tracking ended with error: {}", e);
        }
        outcome.status_line()
    }

    /// Stop the tracking loop if one is running.
    pub fn stop(&self) {
        self.tracker.stop();
    }

    /// Recompute the heatmap from the stored points and redraw it.
    pub fn refresh(&self) -> String {
        match self.try_refresh() {
            Ok(points) => format!("Heatmap drawn. Points: {}", points),
            Err(e) => {
                warn!("[Session] Refresh failed: {}", e);
                format!("Error: {}", e)
            }
        }
    }

    fn try_refresh(&self) -> Result<u32, StoreError> {
        let records = self.store.list_all()?;
        let config = HeatmapConfig {
            base_radius_meters: self.base_radius(),
            ..HeatmapConfig::default()
        };
        let result = heatmap::generate_heatmap(&records, &config);

        let mut drawn = self.drawn.lock().unwrap();
        for circle in drawn.drain(..) {
            self.map.remove_shape(&circle);
        }
        for circle in &result.circles {
            self.map.add_shape(circle.clone());
        }
        *drawn = result.circles;

        if let Some(view) = result.view {
            self.map.set_view(view.center, view.radius_km);
        }
        Ok(result.total_points)
    }

    /// Wipe the store and remove every drawn circle.
    pub fn clear(&self) -> String {
        match self.store.clear() {
            Ok(_) => {
                self.tracker.reset_saved_count();
                let mut drawn = self.drawn.lock().unwrap();
                for circle in drawn.drain(..) {
                    self.map.remove_shape(&circle);
                }
                "Database cleared + heatmap removed.".to_string()
            }
            Err(e) => {
                warn!("[Session] Clear failed: {}", e);
                format!("Error: {}", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::TrackerConfig;
    use crate::GpsPoint;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingMap {
        shapes: StdMutex<Vec<HeatCircle>>,
        views: StdMutex<Vec<(GpsPoint, f64)>>,
    }

    impl MapSurface for RecordingMap {
        fn add_shape(&self, circle: HeatCircle) {
            self.shapes.lock().unwrap().push(circle);
        }
        fn remove_shape(&self, circle: &HeatCircle) {
            let mut shapes = self.shapes.lock().unwrap();
            if let Some(pos) = shapes.iter().position(|c| c == circle) {
                shapes.remove(pos);
            }
        }
        fn set_view(&self, center: GpsPoint, radius_km: f64) {
            self.views.lock().unwrap().push((center, radius_km));
        }
    }

    fn session() -> HeatmapSession<RecordingMap> {
        HeatmapSession::new(
            Arc::new(LocationStore::in_memory().unwrap()),
            Arc::new(Tracker::new(TrackerConfig::default())),
            Arc::new(RecordingMap::default()),
        )
    }

    #[test]
    fn test_refresh_empty_store_draws_nothing() {
        let session = session();
        assert_eq!(session.refresh(), "Heatmap drawn. Points: 0");
        assert!(session.map.shapes.lock().unwrap().is_empty());
        assert!(session.map.views.lock().unwrap().is_empty());
    }

    #[test]
    fn test_refresh_draws_and_redraws_without_leftovers() {
        let session = session();
        session.store.add(10.0001, 20.0001, 100).unwrap();
        session.store.add(10.0009, 20.0009, 110).unwrap();
        session.store.add(10.0011, 20.0011, 120).unwrap();

        assert_eq!(session.refresh(), "Heatmap drawn. Points: 3");
        // Two cells, both at intensity 3
        assert_eq!(session.map.shapes.lock().unwrap().len(), 6);
        assert_eq!(session.map.views.lock().unwrap().len(), 1);

        // A second refresh replaces, not accumulates
        assert_eq!(session.refresh(), "Heatmap drawn. Points: 3");
        assert_eq!(session.map.shapes.lock().unwrap().len(), 6);
    }

    #[test]
    fn test_slider_changes_circle_radius() {
        let session = session();
        session.store.add(10.0001, 20.0001, 100).unwrap();

        session.set_base_radius(200.0);
        session.refresh();

        let shapes = session.map.shapes.lock().unwrap();
        assert!(shapes.iter().any(|c| c.radius_meters == 60.0)); // 200 * 0.3
    }

    #[test]
    fn test_clear_removes_points_and_shapes() {
        let session = session();
        session.store.add(10.0001, 20.0001, 100).unwrap();
        session.refresh();
        assert!(!session.map.shapes.lock().unwrap().is_empty());

        assert_eq!(session.clear(), "Database cleared + heatmap removed.");
        assert!(session.map.shapes.lock().unwrap().is_empty());
        assert!(session.store.list_all().unwrap().is_empty());
        assert_eq!(session.tracker.saved_count(), 0);

        // Refresh over the cleared store stays empty
        let views_before = session.map.views.lock().unwrap().len();
        assert_eq!(session.refresh(), "Heatmap drawn. Points: 0");
        assert_eq!(session.map.views.lock().unwrap().len(), views_before);
    }
}
