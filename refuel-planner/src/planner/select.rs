//! Route selection: validate candidate routes and pick the best ones.
//!
//! Candidates often share leading stops, so validation outcomes are
//! memoised per stop prefix for the duration of one selection call. A
//! prefix that failed rules out every candidate extending it; a prefix that
//! passed lets a candidate resume validation after it.

use std::collections::{HashMap, HashSet};

use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::cache::DistanceCache;
use crate::distance::{DistanceError, DistanceProvider};
use crate::domain::{CandidateRoute, SegmentMetrics, StationId, StationLocation, ValidatedRoute};
use crate::fuel::{SpeedBand, average_speed_kmh};
use crate::stations::StationRepository;

use super::error::PlanError;
use super::segments::{RouteDistances, RouteEnds, route_legs};
use super::validate::{FuelParams, Validation, validate_segments};

/// Best routes found among a set of candidates.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Valid route with the shortest total duration.
    pub best_by_time: Option<ValidatedRoute>,

    /// Valid route with the lowest estimated fuel consumption.
    pub best_by_efficiency: Option<ValidatedRoute>,

    /// How much less fuel the most efficient route burns than the mean of
    /// the other valid routes, in percent.
    pub efficiency_improvement_pct: Option<f64>,

    /// Stations that could not be reached from the origin as a first stop.
    pub failed_first_stations: HashSet<StationId>,

    /// Number of candidates that passed validation.
    pub valid_routes: usize,
}

impl Selection {
    /// Whether both a fastest and a most efficient route were found.
    pub fn is_complete(&self) -> bool {
        self.best_by_time.is_some() && self.best_by_efficiency.is_some()
    }
}

#[derive(Debug, Clone)]
enum PrefixOutcome {
    Failed,
    /// Metrics of the legs up to and including the prefix's last stop.
    Passed(Vec<SegmentMetrics>),
}

/// What the memo knows about a candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoLookup {
    /// A prefix of the candidate already failed.
    Skip,
    /// The first `segments.len()` legs are already validated.
    Resume { segments: Vec<SegmentMetrics> },
}

/// Validation outcomes keyed by stop prefix (`"12_7"`).
#[derive(Debug, Default)]
pub struct PrefixMemo {
    entries: HashMap<String, PrefixOutcome>,
}

impl PrefixMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Longest validated prefix of `route`, or `Skip` if any prefix failed.
    pub fn lookup(&self, route: &CandidateRoute) -> MemoLookup {
        let mut validated = Vec::new();
        for len in 1..=route.len() {
            match self.entries.get(&route.prefix_key(len)) {
                Some(PrefixOutcome::Failed) => return MemoLookup::Skip,
                Some(PrefixOutcome::Passed(segments)) => validated = segments.clone(),
                None => break,
            }
        }
        MemoLookup::Resume {
            segments: validated,
        }
    }

    /// Record the outcome of validating `route` with leg metrics
    /// `segments`: prefixes whose last leg is before `failed_at` passed,
    /// the rest failed.
    pub fn record(&mut self, route: &CandidateRoute, segments: &[SegmentMetrics], failed_at: usize) {
        for len in 1..=route.len() {
            let outcome = if len - 1 < failed_at && len <= segments.len() {
                PrefixOutcome::Passed(segments[..len].to_vec())
            } else {
                PrefixOutcome::Failed
            };
            self.entries.insert(route.prefix_key(len), outcome);
        }
    }
}

/// Estimated fuel for a whole route at its average speed, in litres.
pub fn route_fuel_litres(band: &SpeedBand, optimal_per_100km: f64, segments: &[SegmentMetrics]) -> f64 {
    let distance: f64 = segments.iter().map(|s| s.distance_km).sum();
    let duration: f64 = segments.iter().map(|s| s.duration_min).sum();
    let factor = average_speed_kmh(distance, duration)
        .map(|v| band.adjustment_factor(v))
        .unwrap_or(1.0);
    optimal_per_100km / 100.0 * distance * factor
}

/// Percentage by which `best` undercuts the mean of the other values.
///
/// `None` with fewer than two values or when the mean of the others is not
/// positive.
pub fn efficiency_improvement(consumptions: &[f64], best: f64) -> Option<f64> {
    if consumptions.len() < 2 {
        return None;
    }
    let others = consumptions.iter().sum::<f64>() - best;
    let mean_other = others / (consumptions.len() - 1) as f64;
    if !mean_other.is_finite() || mean_other <= 0.0 {
        return None;
    }
    Some((1.0 - best / mean_other) * 100.0)
}

async fn resolve_stops<R: StationRepository>(
    repo: &R,
    route: &CandidateRoute,
) -> Result<Vec<StationLocation>, PlanError> {
    let stations = try_join_all(route.stops().iter().map(|id| repo.get_by_id(*id))).await?;
    Ok(stations.iter().map(|s| s.as_location()).collect())
}

/// Validate each candidate and pick the fastest and most fuel-efficient.
///
/// Candidates are processed in order; memoisation and the failed-first-stop
/// set are updated between candidates. Distance provider errors abort the
/// selection, except a missing road for one candidate, which only drops
/// that candidate.
pub async fn select_best_routes<P, C, R>(
    distances: &RouteDistances<P, C>,
    repo: &R,
    ends: &RouteEnds,
    candidates: &[CandidateRoute],
    params: &FuelParams,
    band: &SpeedBand,
) -> Result<Selection, PlanError>
where
    P: DistanceProvider,
    C: DistanceCache,
    R: StationRepository,
{
    let mut memo = PrefixMemo::new();
    let mut selection = Selection::default();
    let mut best_duration = f64::INFINITY;
    let mut best_fuel = f64::INFINITY;
    let mut consumptions = Vec::new();

    for (index, route) in candidates.iter().enumerate() {
        let mut segments = match memo.lookup(route) {
            MemoLookup::Skip => {
                debug!(index, %route, "skipping route with failed prefix");
                continue;
            }
            MemoLookup::Resume { segments } => segments,
        };
        let validated_legs = segments.len();

        let stops = resolve_stops(repo, route).await?;
        let legs = route_legs(ends, &stops);
        let remaining = match distances.route_segments(&legs[validated_legs..]).await {
            Ok(metrics) => metrics,
            Err(e @ DistanceError::RouteUnavailable { .. }) => {
                warn!(index, %route, error = %e, "dropping route without a road");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let outcome = validate_segments(band, params, &remaining, validated_legs);
        segments.extend(remaining);
        memo.record(route, &segments, outcome.index());

        let Validation::Passed(_) = outcome else {
            debug!(index, %route, failed_at = outcome.index(), "route failed validation");
            if outcome.index() == 0
                && let Some(first) = route.first()
            {
                selection.failed_first_stations.insert(first);
            }
            continue;
        };

        let fuel = route_fuel_litres(band, params.optimal_consumption_per_100km, &segments);
        let validated = ValidatedRoute::new(route.clone(), segments, fuel)?;
        let duration = validated.total_duration_min();
        debug!(index, %route, duration, fuel, "route passed validation");

        consumptions.push(fuel);
        if duration < best_duration {
            best_duration = duration;
            selection.best_by_time = Some(validated.clone());
        }
        if fuel < best_fuel {
            best_fuel = fuel;
            selection.best_by_efficiency = Some(validated);
        }
    }

    selection.valid_routes = consumptions.len();
    selection.efficiency_improvement_pct = efficiency_improvement(&consumptions, best_fuel);
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryDistanceCache;
    use crate::distance::{MockDistanceClient, Waypoint};
    use crate::domain::{GeoPoint, Station};
    use crate::fuel::speed_adjustment_factor;
    use crate::stations::InMemoryStationRepository;

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    fn m(distance_km: f64, duration_min: f64) -> SegmentMetrics {
        SegmentMetrics::new(distance_km, duration_min).unwrap()
    }

    fn route(ids: &[u64]) -> CandidateRoute {
        CandidateRoute::new(ids.iter().copied().map(StationId).collect())
    }

    const A: u64 = 1;
    const B: u64 = 2;
    const C: u64 = 3;

    fn loc(id: u64) -> GeoPoint {
        match id {
            A => p(0.0, 1.0),
            B => p(0.0, 2.0),
            _ => p(0.5, 2.0),
        }
    }

    fn at(id: u64) -> Waypoint {
        Waypoint::Coordinates(loc(id))
    }

    fn origin() -> Waypoint {
        Waypoint::Address("Origin".into())
    }

    fn dest() -> Waypoint {
        Waypoint::Address("Destination".into())
    }

    fn ends() -> RouteEnds {
        RouteEnds::new(p(0.0, 0.0), p(0.0, 3.0)).with_labels("Origin", "Destination")
    }

    fn repo() -> InMemoryStationRepository {
        InMemoryStationRepository::new([A, B, C].map(|id| Station::new(StationId(id), loc(id))))
            .unwrap()
    }

    fn mock() -> MockDistanceClient {
        MockDistanceClient::new()
            .with_place("Origin", p(0.0, 0.0))
            .with_place("Destination", p(0.0, 3.0))
    }

    fn params(starting_fuel_l: f64) -> FuelParams {
        FuelParams {
            optimal_consumption_per_100km: 6.0,
            tank_size_l: 50.0,
            starting_fuel_l,
            safety_coeff: 0.1,
        }
    }

    #[tokio::test]
    async fn failed_first_leg_skips_siblings_via_memo() {
        // Origin -> A burns far more than the 5 L in the tank
        let provider = mock().with_leg(&origin(), &at(A), m(500.0, 300.0));
        let distances = RouteDistances::new(provider.clone(), MemoryDistanceCache::new());

        let selection = select_best_routes(
            &distances,
            &repo(),
            &ends(),
            &[route(&[A, B]), route(&[A, C])],
            &params(5.0),
            &SpeedBand::default(),
        )
        .await
        .unwrap();

        // only the first route's three legs were ever requested
        assert_eq!(provider.call_count(), 3);
        assert!(selection.best_by_time.is_none());
        assert!(selection.failed_first_stations.contains(&StationId(A)));
        assert_eq!(selection.valid_routes, 0);
        assert_eq!(selection.efficiency_improvement_pct, None);
    }

    #[tokio::test]
    async fn later_failure_does_not_mark_first_station() {
        // B -> Destination is far too long for one tank
        let provider = mock().with_leg(&at(B), &dest(), m(2000.0, 1200.0));
        let distances = RouteDistances::new(provider, MemoryDistanceCache::new());

        let selection = select_best_routes(
            &distances,
            &repo(),
            &ends(),
            &[route(&[A, B])],
            &params(40.0),
            &SpeedBand::default(),
        )
        .await
        .unwrap();

        assert!(selection.best_by_time.is_none());
        assert!(selection.failed_first_stations.is_empty());
    }

    #[tokio::test]
    async fn passed_prefix_is_not_recomputed() {
        let provider = mock();
        let distances = RouteDistances::new(provider.clone(), MemoryDistanceCache::new());

        let selection = select_best_routes(
            &distances,
            &repo(),
            &ends(),
            &[route(&[A, B]), route(&[A, C])],
            &params(40.0),
            &SpeedBand::default(),
        )
        .await
        .unwrap();

        // [A, B]: 3 legs. [A, C]: prefix [A] reused, so only A->C and C->D.
        assert_eq!(provider.call_count(), 5);
        assert_eq!(selection.valid_routes, 2);

        let best = selection.best_by_time.unwrap();
        assert_eq!(best.segments.len(), 3);
    }

    #[tokio::test]
    async fn picks_fastest_and_most_efficient() {
        // A: 100 km/h both legs (fast, drag penalty). B: 66 km/h (optimal band).
        let provider = mock()
            .with_leg(&origin(), &at(A), m(100.0, 60.0))
            .with_leg(&at(A), &dest(), m(100.0, 60.0))
            .with_leg(&origin(), &at(B), m(110.0, 100.0))
            .with_leg(&at(B), &dest(), m(110.0, 100.0));
        let distances = RouteDistances::new(provider, MemoryDistanceCache::new());

        let selection = select_best_routes(
            &distances,
            &repo(),
            &ends(),
            &[route(&[A]), route(&[B])],
            &params(40.0),
            &SpeedBand::default(),
        )
        .await
        .unwrap();

        assert!(selection.is_complete());
        assert_eq!(selection.best_by_time.as_ref().unwrap().route, route(&[A]));
        assert_eq!(selection.best_by_efficiency.as_ref().unwrap().route, route(&[B]));

        let fuel_a = 0.06 * 200.0 * speed_adjustment_factor(100.0);
        let fuel_b = 0.06 * 220.0;
        let expected = (1.0 - fuel_b / fuel_a) * 100.0;
        let got = selection.efficiency_improvement_pct.unwrap();
        assert!((got - expected).abs() < 1e-9, "got {got}, expected {expected}");
    }

    #[tokio::test]
    async fn missing_road_drops_only_that_candidate() {
        let provider = mock().with_unreachable(&origin(), &at(A));
        let distances = RouteDistances::new(provider, MemoryDistanceCache::new());

        let selection = select_best_routes(
            &distances,
            &repo(),
            &ends(),
            &[route(&[A]), route(&[B])],
            &params(40.0),
            &SpeedBand::default(),
        )
        .await
        .unwrap();

        assert_eq!(selection.valid_routes, 1);
        assert_eq!(selection.best_by_time.unwrap().route, route(&[B]));
    }

    #[tokio::test]
    async fn provider_outage_is_an_error() {
        let distances = RouteDistances::new(mock().with_outage(), MemoryDistanceCache::new());

        let err = select_best_routes(
            &distances,
            &repo(),
            &ends(),
            &[route(&[A])],
            &params(40.0),
            &SpeedBand::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PlanError::Distance(_)));
    }

    #[tokio::test]
    async fn unknown_station_is_an_error() {
        let distances = RouteDistances::new(mock(), MemoryDistanceCache::new());

        let err = select_best_routes(
            &distances,
            &repo(),
            &ends(),
            &[route(&[99])],
            &params(40.0),
            &SpeedBand::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PlanError::Stations(_)));
    }

    #[test]
    fn memo_records_prefixes_up_to_failure() {
        let mut memo = PrefixMemo::new();
        let r = route(&[A, B, C]);
        let segs = vec![m(1.0, 1.0), m(2.0, 2.0), m(3.0, 3.0), m(4.0, 4.0)];
        memo.record(&r, &segs, 2);

        assert_eq!(memo.len(), 3);
        assert_eq!(
            memo.lookup(&route(&[A, B])),
            MemoLookup::Resume {
                segments: segs[..2].to_vec()
            }
        );
        assert_eq!(memo.lookup(&route(&[A, B, C])), MemoLookup::Skip);
        assert_eq!(
            memo.lookup(&route(&[B])),
            MemoLookup::Resume { segments: vec![] }
        );
    }

    #[test]
    fn improvement_needs_two_routes_and_positive_mean() {
        assert_eq!(efficiency_improvement(&[10.0], 10.0), None);
        assert_eq!(efficiency_improvement(&[0.0, 0.0], 0.0), None);

        let pct = efficiency_improvement(&[8.0, 10.0, 12.0], 8.0).unwrap();
        assert!((pct - 27.272727).abs() < 1e-5);
    }

    #[test]
    fn route_fuel_uses_average_speed() {
        let segs = [m(50.0, 60.0), m(50.0, 60.0)];
        // 50 km/h average: factor 1 + 1.6 * (10/60)^2
        let expected = 0.06 * 100.0 * speed_adjustment_factor(50.0);
        assert!((route_fuel_litres(&SpeedBand::default(), 6.0, &segs) - expected).abs() < 1e-12);
    }
}
