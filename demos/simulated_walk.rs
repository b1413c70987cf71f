//! End-to-end demo: a simulated walk through London, tracked and rendered.
//!
//! Run with: cargo run --example simulated_walk

use std::sync::{Arc, Mutex};
use std::time::Duration;

use heatpath::{
    Accuracy, CancelToken, GpsPoint, HeatmapSession, HeatCircle, LocationSensor, LocationStore,
    MapSurface, Permission, PermissionService, SensorError, Tracker, TrackerConfig,
};

struct GrantedPermissions;

impl PermissionService for GrantedPermissions {
    async fn request_location_permission(&self) -> Permission {
        Permission::Granted
    }
}

/// Walks a small loop around Hyde Park, one step per fix request.
struct SimulatedWalk {
    steps: Mutex<Vec<GpsPoint>>,
}

impl SimulatedWalk {
    fn new() -> Self {
        let mut steps = Vec::new();
        for i in 0..12 {
            // ~15 m strides north-east, with a revisit of the start
            let t = (i % 8) as f64;
            steps.push(GpsPoint::new(51.5073 + t * 0.00014, -0.1657 + t * 0.00019));
        }
        Self {
            steps: Mutex::new(steps),
        }
    }
}

impl LocationSensor for SimulatedWalk {
    async fn get_fix(
        &self,
        _accuracy: Accuracy,
        _timeout: Duration,
        cancel: CancelToken,
    ) -> Result<Option<GpsPoint>, SensorError> {
        let next = self.steps.lock().unwrap().pop();
        match next {
            Some(point) => Ok(Some(point)),
            None => {
                cancel.cancelled().await;
                Ok(None)
            }
        }
    }
}

/// Map surface that narrates draw calls to stdout.
#[derive(Default)]
struct ConsoleMap {
    shape_count: Mutex<usize>,
}

impl MapSurface for ConsoleMap {
    fn add_shape(&self, circle: HeatCircle) {
        *self.shape_count.lock().unwrap() += 1;
        println!(
            "  [map] circle at ({:.5}, {:.5}) r={:.0}m",
            circle.center.latitude, circle.center.longitude, circle.radius_meters
        );
    }

    fn remove_shape(&self, _circle: &HeatCircle) {
        *self.shape_count.lock().unwrap() -= 1;
    }

    fn set_view(&self, center: GpsPoint, radius_km: f64) {
        println!(
            "  [map] view -> ({:.5}, {:.5}) radius {:.2} km",
            center.latitude, center.longitude, radius_km
        );
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    env_logger::init();

    let store = Arc::new(LocationStore::in_memory().expect("open store"));
    let tracker = Arc::new(Tracker::new(TrackerConfig {
        sample_interval: Duration::from_millis(50),
        ..TrackerConfig::default()
    }));
    let map = Arc::new(ConsoleMap::default());
    let session = HeatmapSession::new(Arc::clone(&store), Arc::clone(&tracker), Arc::clone(&map));

    println!("== start tracking ==");
    let stopper = Arc::clone(&tracker);
    let walk = SimulatedWalk::new();
    let (status, ()) = tokio::join!(
        session.start(
            &GrantedPermissions,
            &walk,
            Some(Arc::new(|event: &heatpath::TrackEvent| {
                println!("  [status] {}", event)
            })),
        ),
        async {
            tokio::time::sleep(Duration::from_millis(700)).await;
            stopper.stop();
        }
    );
    println!("  [status] {}", status);

    println!("== refresh heatmap ==");
    session.set_base_radius(120.0);
    println!("  [status] {}", session.refresh());

    println!("== clear ==");
    println!("  [status] {}", session.clear());
}
