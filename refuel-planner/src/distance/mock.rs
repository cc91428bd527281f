//! Mock distance provider for testing without API access.
//!
//! Road distances are derived from the great-circle distance scaled by a
//! fixed road factor, and durations from a fixed average speed, so results
//! are deterministic.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::{GeoPoint, SegmentMetrics};
use crate::geo::haversine_km;

use super::client::DistanceProvider;
use super::error::DistanceError;
use super::types::Waypoint;

/// Deterministic in-process distance provider.
#[derive(Debug, Clone)]
pub struct MockDistanceClient {
    road_factor: f64,
    speed_kmh: f64,

    /// Addresses the mock knows how to resolve.
    places: HashMap<String, GeoPoint>,

    /// Fixed metrics for specific legs, keyed by the waypoints' display form.
    legs: HashMap<(String, String), SegmentMetrics>,

    /// Legs with no road between them.
    unreachable: HashSet<(String, String)>,

    /// Artificial latency for specific legs.
    delays: HashMap<(String, String), Duration>,

    /// Every request fails when set.
    outage: bool,

    calls: Arc<AtomicUsize>,

    /// Legs in the order their lookups finished.
    completed: Arc<Mutex<Vec<(String, String)>>>,
}

impl Default for MockDistanceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDistanceClient {
    /// Road factor 1.2 over the great-circle distance, 80 km/h.
    pub fn new() -> Self {
        Self {
            road_factor: 1.2,
            speed_kmh: 80.0,
            places: HashMap::new(),
            legs: HashMap::new(),
            unreachable: HashSet::new(),
            delays: HashMap::new(),
            outage: false,
            calls: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_road_factor(mut self, factor: f64) -> Self {
        self.road_factor = factor;
        self
    }

    pub fn with_speed(mut self, speed_kmh: f64) -> Self {
        self.speed_kmh = speed_kmh;
        self
    }

    /// Register an address so it can be used as a waypoint.
    pub fn with_place(mut self, address: impl Into<String>, point: GeoPoint) -> Self {
        self.places.insert(address.into(), point);
        self
    }

    /// Return exactly `metrics` for the leg `from -> to`.
    pub fn with_leg(mut self, from: &Waypoint, to: &Waypoint, metrics: SegmentMetrics) -> Self {
        self.legs.insert((from.to_string(), to.to_string()), metrics);
        self
    }

    /// Report no route between `a` and `b` (in either direction).
    pub fn with_unreachable(mut self, a: &Waypoint, b: &Waypoint) -> Self {
        self.unreachable.insert((a.to_string(), b.to_string()));
        self.unreachable.insert((b.to_string(), a.to_string()));
        self
    }

    /// Delay the answer for `from -> to` by `delay`.
    pub fn with_delay(mut self, from: &Waypoint, to: &Waypoint, delay: Duration) -> Self {
        self.delays.insert((from.to_string(), to.to_string()), delay);
        self
    }

    /// Fail every request as if the provider were down.
    pub fn with_outage(mut self) -> Self {
        self.outage = true;
        self
    }

    /// Number of `driving_distance` calls made so far, across all clones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Legs (as display strings) in the order their lookups completed.
    pub fn completion_order(&self) -> Vec<(String, String)> {
        self.completed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn resolve(&self, waypoint: &Waypoint) -> Result<GeoPoint, DistanceError> {
        match waypoint {
            Waypoint::Coordinates(point) => Ok(*point),
            Waypoint::Address(text) => self.places.get(text).copied().ok_or_else(|| {
                DistanceError::InvalidInput(format!("could not resolve {text}"))
            }),
        }
    }

    fn answer(
        &self,
        key: (String, String),
        origin: &Waypoint,
        destination: &Waypoint,
    ) -> Result<SegmentMetrics, DistanceError> {
        if self.outage {
            return Err(DistanceError::Api {
                status: "UNAVAILABLE".to_string(),
                message: "mock provider outage".to_string(),
            });
        }

        if let Some(metrics) = self.legs.get(&key) {
            return Ok(*metrics);
        }
        if self.unreachable.contains(&key) {
            return Err(DistanceError::RouteUnavailable {
                origin: key.0,
                destination: key.1,
            });
        }

        let from = self.resolve(origin)?;
        let to = self.resolve(destination)?;

        let distance_km = haversine_km(from, to) * self.road_factor;
        let duration_min = distance_km / self.speed_kmh * 60.0;

        SegmentMetrics::new(distance_km, duration_min).map_err(|e| DistanceError::Api {
            status: "MOCK".to_string(),
            message: e.to_string(),
        })
    }
}

impl DistanceProvider for MockDistanceClient {
    async fn driving_distance(
        &self,
        origin: &Waypoint,
        destination: &Waypoint,
    ) -> Result<SegmentMetrics, DistanceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let key = (origin.to_string(), destination.to_string());
        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        let result = self.answer(key.clone(), origin, destination);
        self.completed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(key);
        result
    }
}
