//! Trip planning: direct check, then search and selection with retries.
//!
//! Straight-line ranges are derived from the vehicle's fuel and the
//! road-to-straight-line ratio of the direct leg. Each failed attempt
//! shrinks the ranges and remembers which first stops were unreachable.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::DistanceCache;
use crate::distance::DistanceProvider;
use crate::domain::{CandidateRoute, SegmentMetrics, StationId, ValidatedRoute, Vehicle};
use crate::fuel::{SpeedBand, segment_fuel_litres};
use crate::geo::haversine_km;
use crate::stations::StationRepository;

use super::config::PlannerConfig;
use super::corridor::{CorridorQuery, plan_refuel_stops};
use super::error::PlanError;
use super::segments::{RouteDistances, RouteEnds, route_legs};
use super::select::{route_fuel_litres, select_best_routes};
use super::validate::FuelParams;

/// A trip to plan.
#[derive(Debug, Clone)]
pub struct TripRequest {
    pub ends: RouteEnds,
    pub vehicle: Vehicle,

    /// Fuel in the tank at the origin (litres).
    pub fuel_left_l: f64,
}

impl TripRequest {
    /// Rejects fuel levels outside `[0, tank]`.
    pub fn new(ends: RouteEnds, vehicle: Vehicle, fuel_left_l: f64) -> Result<Self, PlanError> {
        if !fuel_left_l.is_finite() || fuel_left_l < 0.0 || fuel_left_l > vehicle.tank_size_l {
            return Err(PlanError::InvalidInput(format!(
                "fuel left must be between 0 and {} litres, got {fuel_left_l}",
                vehicle.tank_size_l
            )));
        }
        Ok(Self {
            ends,
            vehicle,
            fuel_left_l,
        })
    }

    fn fuel_params(&self, safety_coeff: f64) -> FuelParams {
        FuelParams {
            optimal_consumption_per_100km: self.vehicle.optimal_consumption_per_100km,
            tank_size_l: self.vehicle.tank_size_l,
            starting_fuel_l: self.fuel_left_l,
            safety_coeff,
        }
    }
}

/// Outcome of planning a trip.
#[derive(Debug, Clone)]
pub enum TripPlan {
    /// The destination is reachable without refuelling.
    Direct { route: ValidatedRoute },

    WithStops {
        best_by_time: ValidatedRoute,
        best_by_efficiency: ValidatedRoute,
        efficiency_improvement_pct: Option<f64>,
        /// Attempts used, starting at 1.
        attempts: usize,
    },

    /// Every attempt failed.
    NoRoute {
        excluded_first_stations: HashSet<StationId>,
        attempts: usize,
    },
}

impl TripPlan {
    pub fn is_found(&self) -> bool {
        !matches!(self, TripPlan::NoRoute { .. })
    }
}

/// Straight-line ranges for one attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeEstimate {
    pub estimated_range_km: f64,
    pub full_tank_range_km: f64,
}

/// Ranges for an attempt given the consumption at trip average speed
/// (`consumption_per_100km`) and the straight-line/road ratio.
///
/// The usable fuel now is `fuel - 0.1 * tank`, but never less than
/// `0.05 * tank`; a full tank counts as `0.9 * tank`.
pub fn estimate_ranges(
    vehicle: &Vehicle,
    fuel_left_l: f64,
    consumption_per_100km: f64,
    geo_to_road: f64,
    range_factor: f64,
) -> RangeEstimate {
    let tank = vehicle.tank_size_l;
    let scale = geo_to_road * 100.0 * range_factor / consumption_per_100km;
    RangeEstimate {
        estimated_range_km: (fuel_left_l - 0.1 * tank).max(0.05 * tank) * scale,
        full_tank_range_km: 0.9 * tank * scale,
    }
}

/// How much fuel to buy at the last stop of a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RefuelWindow {
    /// Enough to finish the last leg (litres).
    pub min_litres: f64,
    /// Enough to fill the tank (litres).
    pub max_litres: f64,
}

impl RefuelWindow {
    /// Window at the last stop of `route`, assuming the tank was filled at
    /// every earlier stop. `None` for a route without stops.
    pub fn at_last_stop(route: &ValidatedRoute, params: &FuelParams, band: &SpeedBand) -> Option<Self> {
        if route.route.is_empty() {
            return None;
        }
        let n = route.segments.len();
        let (arrival_leg, last_leg) = (route.segments.get(n - 2)?, route.segments.get(n - 1)?);

        let fuel_before = if n == 2 {
            params.starting_fuel_l
        } else {
            params.tank_size_l
        };
        let burn = |leg: &SegmentMetrics| segment_fuel_litres(band, params.optimal_consumption_per_100km, leg);
        let fuel_left = (fuel_before - burn(arrival_leg)).max(0.0);

        Some(Self {
            min_litres: round2((burn(last_leg) - fuel_left).max(0.0)),
            max_litres: round2((params.tank_size_l - fuel_left).clamp(0.0, params.tank_size_l)),
        })
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Plan a trip end to end.
///
/// Returns [`TripPlan::Direct`] when the vehicle would still arrive with
/// more than the reserve (`safety_coeff * tank`) in the tank. Otherwise runs up to `max_attempts` corridor searches and
/// selections. Running out of attempts is reported as
/// [`TripPlan::NoRoute`]; errors are reserved for bad input and provider
/// failures.
pub async fn plan_trip<P, C, R>(
    distances: &RouteDistances<P, C>,
    repo: &R,
    config: &PlannerConfig,
    request: &TripRequest,
) -> Result<TripPlan, PlanError>
where
    P: DistanceProvider,
    C: DistanceCache,
    R: StationRepository,
{
    let ends = &request.ends;
    let band = &config.speed_band;
    let params = request.fuel_params(config.safety_coeff);

    let direct = distances.route_segments(&route_legs(ends, &[])).await?;
    let road_km: f64 = direct.iter().map(|s| s.distance_km).sum();
    let geo_km = haversine_km(ends.origin, ends.destination);
    let geo_to_road = if road_km > 0.0 { geo_km / road_km } else { 1.0 };

    let direct_fuel = route_fuel_litres(band, params.optimal_consumption_per_100km, &direct);
    let fuel_at_destination = request.fuel_left_l - direct_fuel;
    if !request
        .vehicle
        .needs_refill(fuel_at_destination, config.safety_coeff)
    {
        info!(road_km, fuel = direct_fuel, fuel_at_destination, "destination reachable without refuelling");
        let route = ValidatedRoute::new(CandidateRoute::direct(), direct, direct_fuel)?;
        return Ok(TripPlan::Direct { route });
    }

    let duration_min: f64 = direct.iter().map(|s| s.duration_min).sum();
    let consumption = band.factor_for(road_km, duration_min) * params.optimal_consumption_per_100km;
    debug!(geo_km, road_km, geo_to_road, consumption, "direct leg needs refuelling");

    let mut excluded = HashSet::new();
    for attempt in 0..config.max_attempts {
        let ranges = estimate_ranges(
            &request.vehicle,
            request.fuel_left_l,
            consumption,
            geo_to_road,
            config.range_factor(attempt),
        );
        info!(
            attempt = attempt + 1,
            estimated_range_km = ranges.estimated_range_km,
            full_tank_range_km = ranges.full_tank_range_km,
            "searching for refuelling stops"
        );

        let query = CorridorQuery {
            origin: ends.origin,
            destination: ends.destination,
            estimated_range_km: ranges.estimated_range_km,
            full_tank_range_km: ranges.full_tank_range_km,
            excluded_first: &excluded,
        };
        let Some(candidates) = plan_refuel_stops(repo, config, &query).await? else {
            info!(attempt = attempt + 1, "no candidate routes");
            continue;
        };

        let selection =
            select_best_routes(distances, repo, ends, &candidates, &params, band).await?;
        excluded.extend(selection.failed_first_stations.iter().copied());

        if let (Some(best_by_time), Some(best_by_efficiency)) =
            (selection.best_by_time, selection.best_by_efficiency)
        {
            info!(
                attempt = attempt + 1,
                fastest = %best_by_time.route,
                most_efficient = %best_by_efficiency.route,
                "refuelling route found"
            );
            return Ok(TripPlan::WithStops {
                best_by_time,
                best_by_efficiency,
                efficiency_improvement_pct: selection.efficiency_improvement_pct,
                attempts: attempt + 1,
            });
        }
        info!(
            attempt = attempt + 1,
            candidates = candidates.len(),
            excluded = excluded.len(),
            "no candidate passed validation"
        );
    }

    Ok(TripPlan::NoRoute {
        excluded_first_stations: excluded,
        attempts: config.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryDistanceCache;
    use crate::distance::{MockDistanceClient, Waypoint};
    use crate::domain::{GeoPoint, Station};
    use crate::stations::InMemoryStationRepository;

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    // about 500 km along the equator
    fn ends() -> RouteEnds {
        RouteEnds::new(p(0.0, 0.0), p(0.0, 4.5)).with_labels("Home", "Coast")
    }

    fn mock() -> MockDistanceClient {
        MockDistanceClient::new()
            .with_place("Home", p(0.0, 0.0))
            .with_place("Coast", p(0.0, 4.5))
    }

    fn vehicle() -> Vehicle {
        Vehicle::new(40.0, 6.0).unwrap()
    }

    fn repo(stations: &[(u64, f64)]) -> InMemoryStationRepository {
        InMemoryStationRepository::new(
            stations
                .iter()
                .map(|&(id, lon)| Station::new(StationId(id), p(0.0, lon))),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn short_trip_is_direct() {
        let provider = mock().with_place("Town", p(0.0, 1.0));
        let distances = RouteDistances::new(provider, MemoryDistanceCache::new());
        let request = TripRequest::new(
            RouteEnds::new(p(0.0, 0.0), p(0.0, 1.0)).with_labels("Home", "Town"),
            vehicle(),
            30.0,
        )
        .unwrap();

        let plan = plan_trip(&distances, &repo(&[]), &PlannerConfig::default(), &request)
            .await
            .unwrap();
        let TripPlan::Direct { route } = plan else {
            panic!("expected direct plan, got {plan:?}");
        };
        assert!(route.route.is_empty());
        assert_eq!(route.segments.len(), 1);
    }

    #[tokio::test]
    async fn arriving_on_the_reserve_is_not_direct() {
        // 267 km road at 80 km/h burns ~16.3 L, leaving ~3.7 L of 40 L
        let provider = mock().with_place("Town", p(0.0, 2.0));
        let distances = RouteDistances::new(provider, MemoryDistanceCache::new());
        let request = TripRequest::new(
            RouteEnds::new(p(0.0, 0.0), p(0.0, 2.0)).with_labels("Home", "Town"),
            vehicle(),
            20.0,
        )
        .unwrap();

        let plan = plan_trip(&distances, &repo(&[]), &PlannerConfig::default(), &request)
            .await
            .unwrap();
        assert!(
            matches!(plan, TripPlan::NoRoute { .. }),
            "expected refuel planning, got {plan:?}"
        );

        // with a fuller tank the same trip needs no stop
        let request = TripRequest { fuel_left_l: 25.0, ..request };
        let plan = plan_trip(&distances, &repo(&[]), &PlannerConfig::default(), &request)
            .await
            .unwrap();
        assert!(matches!(plan, TripPlan::Direct { .. }));
    }

    #[tokio::test]
    async fn long_trip_gets_one_stop() {
        let provider = mock();
        let distances = RouteDistances::new(provider.clone(), MemoryDistanceCache::new());
        let request = TripRequest::new(ends(), vehicle(), 20.0).unwrap();

        let plan = plan_trip(
            &distances,
            &repo(&[(1, 1.35), (2, 2.7), (3, 4.05)]),
            &PlannerConfig::default(),
            &request,
        )
        .await
        .unwrap();

        let TripPlan::WithStops {
            best_by_time,
            best_by_efficiency,
            efficiency_improvement_pct,
            attempts,
        } = plan
        else {
            panic!("expected stops, got {plan:?}");
        };
        assert_eq!(attempts, 1);
        assert_eq!(best_by_time.route, CandidateRoute::new(vec![StationId(1)]));
        assert_eq!(best_by_efficiency.route, best_by_time.route);
        // a single valid candidate has nothing to compare against
        assert_eq!(efficiency_improvement_pct, None);
    }

    #[tokio::test]
    async fn no_stations_is_no_route() {
        let distances = RouteDistances::new(mock(), MemoryDistanceCache::new());
        let request = TripRequest::new(ends(), vehicle(), 20.0).unwrap();

        let plan = plan_trip(&distances, &repo(&[]), &PlannerConfig::default(), &request)
            .await
            .unwrap();
        assert!(!plan.is_found());
        assert!(matches!(
            &plan,
            TripPlan::NoRoute { attempts: 3, excluded_first_stations } if excluded_first_stations.is_empty()
        ));
    }

    #[tokio::test]
    async fn unreachable_first_stop_is_excluded_on_retry() {
        let station = p(0.0, 1.35);
        let provider = mock().with_leg(
            &Waypoint::Address("Home".into()),
            &Waypoint::Coordinates(station),
            SegmentMetrics::new(1000.0, 600.0).unwrap(),
        );
        let distances = RouteDistances::new(provider, MemoryDistanceCache::new());
        let request = TripRequest::new(ends(), vehicle(), 20.0).unwrap();

        let plan = plan_trip(&distances, &repo(&[(1, 1.35)]), &PlannerConfig::default(), &request)
            .await
            .unwrap();

        let TripPlan::NoRoute {
            excluded_first_stations,
            attempts,
        } = plan
        else {
            panic!("expected no route, got {plan:?}");
        };
        assert_eq!(attempts, 3);
        assert!(excluded_first_stations.contains(&StationId(1)));
    }

    #[tokio::test]
    async fn provider_outage_is_an_error() {
        let distances = RouteDistances::new(mock().with_outage(), MemoryDistanceCache::new());
        let request = TripRequest::new(ends(), vehicle(), 20.0).unwrap();

        let err = plan_trip(&distances, &repo(&[]), &PlannerConfig::default(), &request)
            .await
            .unwrap_err();
        assert!(err.is_provider_error());
    }

    #[test]
    fn fuel_left_must_fit_the_tank() {
        assert!(TripRequest::new(ends(), vehicle(), 41.0).is_err());
        assert!(TripRequest::new(ends(), vehicle(), -1.0).is_err());
        assert!(TripRequest::new(ends(), vehicle(), 40.0).is_ok());
    }

    #[test]
    fn ranges_shrink_with_factor() {
        // 40 L tank, 20 L left, 8 L/100km, straight line is 80% of road
        let full = estimate_ranges(&vehicle(), 20.0, 8.0, 0.8, 1.0);
        assert!((full.estimated_range_km - 160.0).abs() < 1e-9);
        assert!((full.full_tank_range_km - 360.0).abs() < 1e-9);

        let shrunk = estimate_ranges(&vehicle(), 20.0, 8.0, 0.8, 0.5);
        assert!((shrunk.estimated_range_km - 80.0).abs() < 1e-9);

        // nearly empty tank still assumes 5% usable
        let empty = estimate_ranges(&vehicle(), 1.0, 8.0, 1.0, 1.0);
        assert!((empty.estimated_range_km - 25.0).abs() < 1e-9);
    }

    #[test]
    fn refuel_window_at_last_stop() {
        let params = FuelParams {
            optimal_consumption_per_100km: 5.0,
            tank_size_l: 50.0,
            starting_fuel_l: 20.0,
            safety_coeff: 0.1,
        };
        let band = SpeedBand::default();
        let seg = |km: f64| SegmentMetrics::new(km, km).unwrap(); // 60 km/h

        // one stop: arrive with 20 - 5 = 15 L, last leg needs 20 L
        let route = ValidatedRoute::new(
            CandidateRoute::new(vec![StationId(1)]),
            vec![seg(100.0), seg(400.0)],
            25.0,
        )
        .unwrap();
        let window = RefuelWindow::at_last_stop(&route, &params, &band).unwrap();
        assert_eq!(window, RefuelWindow { min_litres: 5.0, max_litres: 35.0 });

        // two stops: arrive at the last one with 50 - 10 = 40 L
        let route = ValidatedRoute::new(
            CandidateRoute::new(vec![StationId(1), StationId(2)]),
            vec![seg(100.0), seg(200.0), seg(100.0)],
            20.0,
        )
        .unwrap();
        let window = RefuelWindow::at_last_stop(&route, &params, &band).unwrap();
        assert_eq!(window, RefuelWindow { min_litres: 0.0, max_litres: 10.0 });

        let direct = ValidatedRoute::new(CandidateRoute::direct(), vec![seg(10.0)], 0.5).unwrap();
        assert_eq!(RefuelWindow::at_last_stop(&direct, &params, &band), None);
    }
}
