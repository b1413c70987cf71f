//! Cancellable periodic location sampling.
//!
//! One [`Tracker`] owns the "active loop" slot for the process: starting
//! while a loop is running is rejected, and stopping when nothing runs is a
//! no-op. The loop itself is a single cooperative task that requests a fix,
//! persists it, recenters the map on it, then sleeps until the next sample.
//! A shared [`CancelToken`] interrupts the in-flight fix and the sleep;
//! cancellation ends the run with a neutral "stopped" outcome, never an
//! error.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::Notify;

use crate::geo_utils;
use crate::platform::{Accuracy, LocationSensor, MapSurface, Permission, PermissionService};
use crate::store::LocationStore;
use crate::{current_unix_time, GpsPoint, TrackError};

/// Loop timing and sampling parameters.
///
/// Defaults are the production values; tests and demos inject shorter
/// intervals.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Accuracy target passed to each fix request.
    pub accuracy: Accuracy,
    /// Per-request fix timeout.
    pub fix_timeout: Duration,
    /// Sleep between samples.
    pub sample_interval: Duration,
    /// Map view radius used when following the latest fix, in kilometers.
    pub follow_radius_km: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::Medium,
            fix_timeout: Duration::from_secs(10),
            sample_interval: Duration::from_secs(10),
            follow_radius_km: 1.0,
        }
    }
}

/// Shared cancellation signal.
///
/// Cloneable handle over one flag: `cancel` is sticky and wakes every task
/// parked in [`CancelToken::cancelled`]. Checked at each suspension point of
/// the tracking loop and passed into sensor fix requests so they can unwind
/// early too.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolve once cancellation has been signalled.
    pub async fn cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            // Register before re-checking so a concurrent cancel() between
            // the check and the await cannot be missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Progress report emitted while the loop runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackEvent {
    Started,
    /// A fix was persisted; `count` is the running saved tally.
    Saved { count: u32, point: GpsPoint },
}

impl std::fmt::Display for TrackEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackEvent::Started => write!(f, "Tracking started..."),
            TrackEvent::Saved { count, point } => write!(
                f,
                "Saved #{}: {:.5}, {:.5}",
                count, point.latitude, point.longitude
            ),
        }
    }
}

/// How a tracking run ended (or failed to begin).
#[derive(Debug)]
pub enum TrackOutcome {
    /// Rejected: another loop already holds the active slot.
    AlreadyRunning,
    /// The permission prompt was denied; the loop never started.
    PermissionDenied,
    /// Normal termination via cancellation.
    Stopped { saved: u32 },
    /// Sensor or storage failure terminated the loop.
    Failed(TrackError),
}

impl TrackOutcome {
    /// User-visible status line for this outcome.
    pub fn status_line(&self) -> String {
        match self {
            TrackOutcome::AlreadyRunning => "Tracking already running...".to_string(),
            TrackOutcome::PermissionDenied => "Location permission denied.".to_string(),
            TrackOutcome::Stopped { .. } => "Tracking stopped.".to_string(),
            TrackOutcome::Failed(e) => format!("Error: {}", e),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TrackOutcome::Failed(_))
    }
}

/// Event callback invoked from inside the loop.
pub type TrackCallback = Arc<dyn Fn(&TrackEvent) + Send + Sync>;

/// Owner of the single active tracking loop.
pub struct Tracker {
    config: TrackerConfig,
    active: AtomicBool,
    cancel: Mutex<Option<CancelToken>>,
    saved_count: AtomicU32,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            active: AtomicBool::new(false),
            cancel: Mutex::new(None),
            saved_count: AtomicU32::new(0),
        }
    }

    /// Whether a loop currently holds the active slot.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Total fixes saved since the last reset.
    pub fn saved_count(&self) -> u32 {
        self.saved_count.load(Ordering::SeqCst)
    }

    /// Reset the running saved tally (after clearing the store).
    pub fn reset_saved_count(&self) {
        self.saved_count.store(0, Ordering::SeqCst);
    }

    /// Signal the active loop to stop. No-op when nothing is running.
    pub fn stop(&self) {
        if let Some(token) = self.cancel.lock().unwrap().as_ref() {
            info!("[Tracker] Stop requested");
            token.cancel();
        }
    }

    /// Run the tracking loop until cancellation or failure.
    ///
    /// Acquires the active slot, prompts for permission, then samples
    /// `sensor` every `sample_interval`, persisting each fix into `store`
    /// and recentering `map` on it. The slot is released on every exit path
    /// so a new start can follow a stop or a failure.
    pub async fn start<P, S, M>(
        &self,
        permissions: &P,
        sensor: &S,
        store: &LocationStore,
        map: &M,
        on_event: Option<TrackCallback>,
    ) -> TrackOutcome
    where
        P: PermissionService,
        S: LocationSensor,
        M: MapSurface,
    {
        if self.active.swap(true, Ordering::SeqCst) {
            return TrackOutcome::AlreadyRunning;
        }

        let token = CancelToken::new();
        *self.cancel.lock().unwrap() = Some(token.clone());

        let result = self
            .run_loop(permissions, sensor, store, map, &token, on_event)
            .await;

        *self.cancel.lock().unwrap() = None;
        self.active.store(false, Ordering::SeqCst);

        match result {
            Ok(()) => {
                info!("[Tracker] Stopped ({} fix(es) saved)", self.saved_count());
                TrackOutcome::Stopped {
                    saved: self.saved_count(),
                }
            }
            Err(TrackError::PermissionDenied) => {
                warn!("[Tracker] Location permission denied");
                TrackOutcome::PermissionDenied
            }
            Err(e) => {
                warn!("[Tracker] Loop failed: {}", e);
                TrackOutcome::Failed(e)
            }
        }
    }

    async fn run_loop<P, S, M>(
        &self,
        permissions: &P,
        sensor: &S,
        store: &LocationStore,
        map: &M,
        token: &CancelToken,
        on_event: Option<TrackCallback>,
    ) -> Result<(), TrackError>
    where
        P: PermissionService,
        S: LocationSensor,
        M: MapSurface,
    {
        if permissions.request_location_permission().await == Permission::Denied {
            return Err(TrackError::PermissionDenied);
        }

        info!("[Tracker] Started");
        if let Some(cb) = &on_event {
            cb(&TrackEvent::Started);
        }

        let mut last_fix: Option<GpsPoint> = None;

        loop {
            if token.is_cancelled() {
                break;
            }

            let fix = sensor
                .get_fix(self.config.accuracy, self.config.fix_timeout, token.clone())
                .await?;

            if let Some(point) = fix {
                store.add(point.latitude, point.longitude, current_unix_time())?;
                let count = self.saved_count.fetch_add(1, Ordering::SeqCst) + 1;

                if let Some(prev) = last_fix {
                    debug!(
                        "[Tracker] Fix #{} moved {:.1} m since previous",
                        count,
                        geo_utils::haversine_distance(&prev, &point)
                    );
                }
                last_fix = Some(point);

                if let Some(cb) = &on_event {
                    cb(&TrackEvent::Saved { count, point });
                }
                map.set_view(point, self.config.follow_radius_km);
            }

            if token.is_cancelled() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.sample_interval) => {}
                _ = token.cancelled() => break,
            }
        }

        Ok(())
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
