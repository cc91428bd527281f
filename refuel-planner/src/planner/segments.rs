//! Road distances for the legs of a candidate route.
//!
//! A route with stops `[s1, s2]` has legs origin→s1, s1→s2 and
//! s2→destination; a route with no stops has the single leg
//! origin→destination. Each leg is looked up in the distance cache first
//! and only requested from the provider on a miss.

use std::time::Duration;

use futures::future::try_join_all;
use tracing::debug;

use crate::cache::DistanceCache;
use crate::distance::{DistanceError, DistanceProvider, Waypoint};
use crate::domain::{GeoPoint, SegmentMetrics, StationLocation};
use crate::geocode::TripEndpoints;

/// Origin and destination of a trip with their optional text labels.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteEnds {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub origin_label: Option<String>,
    pub destination_label: Option<String>,
}

impl RouteEnds {
    pub fn new(origin: GeoPoint, destination: GeoPoint) -> Self {
        Self {
            origin,
            destination,
            origin_label: None,
            destination_label: None,
        }
    }

    /// Attach the address text the endpoints were entered as.
    pub fn with_labels(mut self, origin: impl Into<String>, destination: impl Into<String>) -> Self {
        self.origin_label = Some(origin.into());
        self.destination_label = Some(destination.into());
        self
    }

    fn origin_endpoint(&self) -> Endpoint {
        Endpoint::labelled(self.origin_label.as_deref(), self.origin)
    }

    fn destination_endpoint(&self) -> Endpoint {
        Endpoint::labelled(self.destination_label.as_deref(), self.destination)
    }
}

impl From<TripEndpoints> for RouteEnds {
    fn from(trip: TripEndpoints) -> Self {
        RouteEnds::new(trip.origin, trip.destination)
            .with_labels(trip.origin_label, trip.destination_label)
    }
}

/// One end of a leg: the waypoint sent to the provider and the identity
/// used in cache keys.
#[derive(Debug, Clone)]
struct Endpoint {
    key: String,
    waypoint: Waypoint,
}

impl Endpoint {
    fn labelled(label: Option<&str>, point: GeoPoint) -> Self {
        let waypoint = Waypoint::labelled_or(label, point);
        Self {
            key: waypoint.to_string(),
            waypoint,
        }
    }

    fn station(station: &StationLocation) -> Self {
        Self {
            key: station.id.to_string(),
            waypoint: Waypoint::Coordinates(station.location),
        }
    }
}

/// A single leg to be measured.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    /// `"{from}->{to}"`, where stations are identified by id and trip ends
    /// by label (or coordinates when unlabeled).
    pub cache_key: String,
    pub from: Waypoint,
    pub to: Waypoint,
}

impl Leg {
    fn between(from: &Endpoint, to: &Endpoint) -> Self {
        Self {
            cache_key: format!("{}->{}", from.key, to.key),
            from: from.waypoint.clone(),
            to: to.waypoint.clone(),
        }
    }
}

/// Legs of the route origin → `stops`... → destination, in driving order.
pub fn route_legs(ends: &RouteEnds, stops: &[StationLocation]) -> Vec<Leg> {
    let mut endpoints = Vec::with_capacity(stops.len() + 2);
    endpoints.push(ends.origin_endpoint());
    endpoints.extend(stops.iter().map(Endpoint::station));
    endpoints.push(ends.destination_endpoint());

    endpoints
        .windows(2)
        .map(|pair| Leg::between(&pair[0], &pair[1]))
        .collect()
}

/// Road distance lookups through a cache.
pub struct RouteDistances<P, C> {
    provider: P,
    cache: C,
    cache_timeout: Duration,
}

impl<P: DistanceProvider, C: DistanceCache> RouteDistances<P, C> {
    /// Cache results for two hours.
    pub fn new(provider: P, cache: C) -> Self {
        Self {
            provider,
            cache,
            cache_timeout: Duration::from_secs(2 * 3600),
        }
    }

    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Metrics of one leg, from the cache when possible.
    pub async fn point_to_point(&self, leg: &Leg) -> Result<SegmentMetrics, DistanceError> {
        if let Some(hit) = self.cache.get(&leg.cache_key).await {
            debug!(key = %leg.cache_key, "distance cache hit");
            return Ok(hit);
        }

        debug!(key = %leg.cache_key, "distance cache miss");
        let metrics = self.provider.driving_distance(&leg.from, &leg.to).await?;
        self.cache
            .set(&leg.cache_key, metrics, self.cache_timeout)
            .await;
        Ok(metrics)
    }

    /// Metrics of every leg, looked up concurrently.
    ///
    /// Results are in leg order. Any failing leg fails the whole call.
    pub async fn route_segments(&self, legs: &[Leg]) -> Result<Vec<SegmentMetrics>, DistanceError> {
        try_join_all(legs.iter().map(|leg| self.point_to_point(leg))).await
    }
}
