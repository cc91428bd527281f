//! Station corridor search.
//!
//! Produces up to `top_n` candidate stop sequences from origin to
//! destination using straight-line distances only:
//!
//! 1. Find stations within the current range of the current origin that
//!    can still reach the destination on a full tank.
//! 2. If there are none, force a stop at the reachable station closest to
//!    the destination, treat the tank as full, and search again from there
//!    (relaxation). Give up after `max_stations` forced stops.
//! 3. Otherwise keep the stations inside the detour corridor around the
//!    straight line to the destination, rank them by total detour and emit
//!    one candidate per station.
//!
//! This is a greedy nearest-first heuristic. It can miss feasible routes
//! that an exhaustive graph search would find.

use std::collections::HashSet;

use futures::future::join_all;
use tracing::debug;

use crate::domain::{CandidateRoute, GeoPoint, StationId, StationLocation};
use crate::geo::{detour_radius_km, haversine_km, perpendicular_distance_km};
use crate::stations::StationRepository;

use super::config::PlannerConfig;
use super::error::PlanError;

/// Inputs of one corridor search.
#[derive(Debug, Clone)]
pub struct CorridorQuery<'a> {
    pub origin: GeoPoint,
    pub destination: GeoPoint,

    /// Straight-line range on the fuel currently in the tank (km).
    pub estimated_range_km: f64,

    /// Straight-line range on a full tank (km).
    pub full_tank_range_km: f64,

    /// Stations that must not be the first stop of any route.
    pub excluded_first: &'a HashSet<StationId>,
}

impl CorridorQuery<'_> {
    fn check(&self) -> Result<(), PlanError> {
        for (name, value) in [
            ("estimated range", self.estimated_range_km),
            ("full tank range", self.full_tank_range_km),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PlanError::InvalidInput(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Search state carried from one step to the next.
///
/// Each step consumes the previous state and produces a new one.
#[derive(Debug)]
struct SearchState {
    origin: GeoPoint,
    range_km: f64,

    /// Forced stops chosen by relaxation so far.
    stops: Vec<StationId>,

    /// Candidate routes collected so far.
    routes: Vec<CandidateRoute>,

    /// Runner-up stations from the latest relaxation step, closest to the
    /// destination first.
    fallback: Vec<StationLocation>,
}

impl SearchState {
    fn start(query: &CorridorQuery<'_>) -> Self {
        Self {
            origin: query.origin,
            range_km: query.estimated_range_km,
            stops: Vec::new(),
            routes: Vec::new(),
            fallback: Vec::new(),
        }
    }

    /// Stop at `station` with a full tank; remaining stations become the
    /// fallback list.
    fn relax(self, station: StationLocation, rest: Vec<StationLocation>, full_tank_range_km: f64) -> Self {
        let mut stops = self.stops;
        stops.push(station.id);
        Self {
            origin: station.location,
            range_km: full_tank_range_km,
            stops,
            routes: self.routes,
            fallback: rest,
        }
    }

    /// Swap the last forced stop for the next fallback station, consuming
    /// it from the fallback list.
    fn retry_with_fallback(self, full_tank_range_km: f64) -> Self {
        let mut fallback = self.fallback;
        let mut stops = self.stops;
        let mut origin = self.origin;

        if !fallback.is_empty() {
            let alternative = fallback.remove(0);
            if let Some(last) = stops.last_mut() {
                *last = alternative.id;
            }
            origin = alternative.location;
        }

        Self {
            origin,
            range_km: full_tank_range_km,
            stops,
            routes: self.routes,
            fallback,
        }
    }

    fn candidate(&self, last: StationId) -> CandidateRoute {
        CandidateRoute::new(self.stops.clone()).extended(last)
    }
}

/// Score stations on the blocking pool, `batch_size` per task, and sort
/// ascending by score. Ties keep input order.
async fn rank_stations<F>(
    stations: Vec<StationLocation>,
    batch_size: usize,
    score: F,
) -> Result<Vec<(f64, StationLocation)>, PlanError>
where
    F: Fn(&StationLocation) -> f64 + Copy + Send + 'static,
{
    let tasks = stations.chunks(batch_size.max(1)).map(|chunk| {
        let chunk = chunk.to_vec();
        tokio::task::spawn_blocking(move || {
            chunk
                .into_iter()
                .map(|s| (score(&s), s))
                .collect::<Vec<_>>()
        })
    });

    let mut scored = Vec::with_capacity(stations.len());
    for batch in join_all(tasks).await {
        scored.extend(batch.map_err(|e| PlanError::Worker(e.to_string()))?);
    }
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(scored)
}

/// Find candidate stop sequences for a trip.
///
/// Returns `Ok(None)` when no candidate can be produced. Errors are
/// reserved for bad input and station lookup failures.
pub async fn plan_refuel_stops<R: StationRepository>(
    repo: &R,
    config: &PlannerConfig,
    query: &CorridorQuery<'_>,
) -> Result<Option<Vec<CandidateRoute>>, PlanError> {
    query.check()?;
    if config.top_n == 0 {
        return Err(PlanError::InvalidInput("top_n must be at least 1".to_string()));
    }

    let destination = query.destination;
    let full_range = query.full_tank_range_km;
    let top_n = config.top_n;
    let mut state = SearchState::start(query);

    loop {
        let first_step = state.stops.is_empty();
        let mut nearby = repo.find_within_radius(state.origin, state.range_km).await?;
        // a route never visits the same station twice
        nearby.retain(|s| !state.stops.contains(&s.id));
        let reaching: Vec<StationLocation> = nearby
            .iter()
            .filter(|s| haversine_km(s.location, destination) <= full_range)
            .copied()
            .collect();

        debug!(
            origin = %state.origin,
            range_km = state.range_km,
            nearby = nearby.len(),
            reaching = reaching.len(),
            stops = ?state.stops,
            "corridor search step"
        );

        if reaching.is_empty() {
            if state.stops.len() >= config.max_stations {
                debug!(max_stations = config.max_stations, "stop limit reached");
                return Ok(None);
            }

            let mut ranked = rank_stations(nearby, config.batch_size, move |s| {
                haversine_km(s.location, destination)
            })
            .await?;
            if first_step {
                ranked.retain(|(_, s)| !query.excluded_first.contains(&s.id));
            }

            let mut ranked = ranked.into_iter().map(|(_, s)| s);
            let Some(closest) = ranked.next() else {
                debug!("no station to relax towards");
                return Ok(None);
            };

            debug!(station = %closest.id, "forcing stop closest to destination");
            state = state.relax(closest, ranked.collect(), full_range);
            continue;
        }

        let available: Vec<StationLocation> = if first_step {
            reaching
                .into_iter()
                .filter(|s| !query.excluded_first.contains(&s.id))
                .collect()
        } else {
            reaching
        };
        if available.is_empty() {
            debug!("every candidate is an excluded first stop");
            return Ok(None);
        }

        let origin = state.origin;
        let radius = detour_radius_km(
            haversine_km(origin, destination),
            config.detour_fraction,
            config.min_detour_km,
        );
        let near_route: Vec<StationLocation> = available
            .into_iter()
            .filter(|s| perpendicular_distance_km(origin, destination, s.location) <= radius)
            .collect();

        let ranked = rank_stations(near_route, config.batch_size, move |s| {
            haversine_km(origin, s.location) + haversine_km(s.location, destination)
        })
        .await?;

        for (_, station) in ranked.iter().take(top_n) {
            if state.routes.len() == top_n {
                break;
            }
            let route = state.candidate(station.id);
            debug!(%route, "candidate route");
            state.routes.push(route);
        }

        if !state.routes.is_empty() && state.routes.len() < top_n && !state.fallback.is_empty() {
            debug!(found = state.routes.len(), "too few candidates, trying fallback stop");
            state = state.retry_with_fallback(full_range);
            continue;
        }

        if ranked.is_empty() {
            debug!("no station inside the detour corridor");
            return Ok(None);
        }

        if state.stops.is_empty() {
            return Ok(Some(
                ranked
                    .iter()
                    .take(top_n)
                    .map(|(_, s)| CandidateRoute::new(vec![s.id]))
                    .collect(),
            ));
        }
        return Ok(Some(state.routes));
    }
}
