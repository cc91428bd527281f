use std::process::ExitCode;

use tracing::{error, info};

use refuel_planner::cache::{BoundedDistanceCache, CacheConfig};
use refuel_planner::distance::{DistanceClientConfig, DistanceMatrixClient};
use refuel_planner::domain::{DrivingConditions, Vehicle};
use refuel_planner::geocode::{GeocoderConfig, NominatimGeocoder, TripEndpoints};
use refuel_planner::planner::{
    FuelParams, PlannerConfig, RefuelWindow, RouteDistances, RouteEnds, TripPlan, TripRequest,
    plan_trip,
};
use refuel_planner::stations::InMemoryStationRepository;
use refuel_planner::telemetry::init_tracing;

fn env_var(name: &str) -> Result<String, String> {
    std::env::var(name).map_err(|_| format!("{name} not set"))
}

fn env_f64(name: &str) -> Result<f64, String> {
    let raw = env_var(name)?;
    raw.trim()
        .parse()
        .map_err(|_| format!("{name} is not a number: {raw:?}"))
}

fn driving_conditions() -> Result<DrivingConditions, String> {
    match std::env::var("VEHICLE_CONDITIONS").as_deref() {
        Err(_) | Ok("mixed") => Ok(DrivingConditions::Mixed),
        Ok("city") => Ok(DrivingConditions::City),
        Ok("highway") => Ok(DrivingConditions::Highway),
        Ok(other) => Err(format!("VEHICLE_CONDITIONS must be city, mixed or highway, got {other:?}")),
    }
}

async fn run() -> Result<(), String> {
    let api_key = env_var("DISTANCE_API_KEY")?;
    let stations_file = env_var("STATIONS_FILE")?;
    let origin = env_var("TRIP_ORIGIN")?;
    let destination = env_var("TRIP_DESTINATION")?;

    let vehicle = Vehicle::from_reported(
        env_f64("VEHICLE_TANK_L")?,
        env_f64("VEHICLE_CONSUMPTION")?,
        driving_conditions()?,
    )
    .map_err(|e| e.to_string())?;
    let fuel_left_l = env_f64("FUEL_LEFT_L")?;

    let repo = InMemoryStationRepository::from_json_file(&stations_file)
        .map_err(|e| format!("loading {stations_file}: {e}"))?;
    info!(stations = repo.len(), file = %stations_file, "loaded station dataset");

    let geocoder = NominatimGeocoder::new(GeocoderConfig::default()).map_err(|e| e.to_string())?;
    let endpoints = TripEndpoints::resolve(&geocoder, &origin, &destination)
        .await
        .map_err(|e| e.to_string())?;
    info!(origin = %endpoints.origin, destination = %endpoints.destination, "resolved trip endpoints");

    let config = PlannerConfig::default();
    let client = DistanceMatrixClient::new(DistanceClientConfig::new(api_key))
        .map_err(|e| e.to_string())?;
    let distances = RouteDistances::new(client, BoundedDistanceCache::new(&CacheConfig::default()))
        .with_cache_timeout(config.distance_cache_timeout);

    let request = TripRequest::new(RouteEnds::from(endpoints), vehicle, fuel_left_l)
        .map_err(|e| e.to_string())?;
    let plan = plan_trip(&distances, &repo, &config, &request)
        .await
        .map_err(|e| e.to_string())?;

    match plan {
        TripPlan::Direct { route } => {
            info!(
                distance_km = route.total_distance_km(),
                duration_min = route.total_duration_min(),
                fuel_l = route.fuel_consumption_l,
                "no refuelling needed"
            );
        }
        TripPlan::WithStops {
            best_by_time,
            best_by_efficiency,
            efficiency_improvement_pct,
            attempts,
        } => {
            let params = FuelParams {
                optimal_consumption_per_100km: vehicle.optimal_consumption_per_100km,
                tank_size_l: vehicle.tank_size_l,
                starting_fuel_l: fuel_left_l,
                safety_coeff: config.safety_coeff,
            };
            for (label, route) in [("fastest", &best_by_time), ("most efficient", &best_by_efficiency)] {
                let window = RefuelWindow::at_last_stop(route, &params, &config.speed_band);
                info!(
                    route = %route.route,
                    distance_km = route.total_distance_km(),
                    duration_min = route.total_duration_min(),
                    fuel_l = route.fuel_consumption_l,
                    refuel_min_l = window.map(|w| w.min_litres),
                    refuel_max_l = window.map(|w| w.max_litres),
                    "{label} route"
                );
            }
            info!(?efficiency_improvement_pct, attempts, "planning finished");
        }
        TripPlan::NoRoute {
            excluded_first_stations,
            attempts,
        } => {
            return Err(format!(
                "no reasonable route found after {attempts} attempts ({} unreachable first stops)",
                excluded_first_stations.len()
            ));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "planning failed");
            ExitCode::FAILURE
        }
    }
}
