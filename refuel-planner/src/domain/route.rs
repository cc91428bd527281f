//! Candidate and validated route types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::StationId;
use super::error::DomainError;

/// Distance and duration of one leg of a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentMetrics {
    pub distance_km: f64,
    pub duration_min: f64,
}

impl SegmentMetrics {
    /// Create metrics, rejecting negative or non-finite values.
    pub fn new(distance_km: f64, duration_min: f64) -> Result<Self, DomainError> {
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(DomainError::InvalidSegment("distance must be finite and >= 0"));
        }
        if !duration_min.is_finite() || duration_min < 0.0 {
            return Err(DomainError::InvalidSegment("duration must be finite and >= 0"));
        }
        Ok(Self {
            distance_km,
            duration_min,
        })
    }
}

/// An ordered list of refuelling stops between origin and destination.
///
/// Routes are never mutated in place; extending a route produces a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateRoute(Vec<StationId>);

impl CandidateRoute {
    pub fn new(stops: Vec<StationId>) -> Self {
        Self(stops)
    }

    /// A route with no stops (origin straight to destination).
    pub fn direct() -> Self {
        Self(Vec::new())
    }

    pub fn stops(&self) -> &[StationId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<StationId> {
        self.0.first().copied()
    }

    /// A new route with `stop` appended.
    pub fn extended(&self, stop: StationId) -> Self {
        let mut stops = self.0.clone();
        stops.push(stop);
        Self(stops)
    }

    /// Number of legs driven: one more than the number of stops.
    pub fn segment_count(&self) -> usize {
        self.0.len() + 1
    }

    /// Canonical key of the first `len` stops, e.g. `"12_7_40"`.
    ///
    /// `len` is clamped to the route length.
    pub fn prefix_key(&self, len: usize) -> String {
        let len = len.min(self.0.len());
        self.0[..len]
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl fmt::Display for CandidateRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("[direct]");
        }
        write!(f, "[{}]", self.prefix_key(self.0.len()))
    }
}

impl From<Vec<StationId>> for CandidateRoute {
    fn from(stops: Vec<StationId>) -> Self {
        Self(stops)
    }
}

/// A candidate route that passed fuel validation, with its leg metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedRoute {
    pub route: CandidateRoute,
    pub segments: Vec<SegmentMetrics>,

    /// Estimated fuel burned over the whole trip, in litres.
    pub fuel_consumption_l: f64,
}

impl ValidatedRoute {
    /// Build a validated route, checking that there is one metric per leg.
    pub fn new(
        route: CandidateRoute,
        segments: Vec<SegmentMetrics>,
        fuel_consumption_l: f64,
    ) -> Result<Self, DomainError> {
        if segments.len() != route.segment_count() {
            return Err(DomainError::SegmentCountMismatch {
                expected: route.segment_count(),
                actual: segments.len(),
            });
        }
        Ok(Self {
            route,
            segments,
            fuel_consumption_l,
        })
    }

    pub fn total_distance_km(&self) -> f64 {
        self.segments.iter().map(|s| s.distance_km).sum()
    }

    pub fn total_duration_min(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_min).sum()
    }
}
