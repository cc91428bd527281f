//! Planner configuration.

use std::time::Duration;

use crate::fuel::SpeedBand;

/// Configuration parameters for refuel planning.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Number of candidate routes the corridor search collects.
    pub top_n: usize,

    /// Maximum number of forced stops accumulated by relaxation before the
    /// search gives up.
    pub max_stations: usize,

    /// Fraction of the tank kept as reserve at every leg boundary.
    pub safety_coeff: f64,

    /// Detour corridor half-width as a fraction of the straight-line
    /// distance to the destination.
    pub detour_fraction: f64,

    /// Lower bound on the detour corridor half-width (km).
    pub min_detour_km: f64,

    /// Number of search/selection attempts before reporting no route.
    pub max_attempts: usize,

    /// Range multiplier applied per failed attempt (`shrink^attempt`).
    pub range_shrink: f64,

    /// Stations scored per blocking task during detour ranking.
    pub batch_size: usize,

    /// How long road distances stay in the distance cache.
    pub distance_cache_timeout: Duration,

    /// Speed band of the consumption model.
    pub speed_band: SpeedBand,
}

impl PlannerConfig {
    /// Create a new configuration with the given search parameters.
    pub fn new(top_n: usize, max_stations: usize, safety_coeff: f64) -> Self {
        Self {
            top_n,
            max_stations,
            safety_coeff,
            ..Self::default()
        }
    }

    pub fn with_detour(mut self, fraction: f64, min_km: f64) -> Self {
        self.detour_fraction = fraction;
        self.min_detour_km = min_km;
        self
    }

    pub fn with_attempts(mut self, max_attempts: usize, range_shrink: f64) -> Self {
        self.max_attempts = max_attempts;
        self.range_shrink = range_shrink;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_distance_cache_timeout(mut self, timeout: Duration) -> Self {
        self.distance_cache_timeout = timeout;
        self
    }

    /// Range multiplier for a zero-based attempt number.
    pub fn range_factor(&self, attempt: usize) -> f64 {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        self.range_shrink.powi(exp)
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            top_n: 3,
            max_stations: 6,
            safety_coeff: 0.1,
            detour_fraction: 0.25,
            min_detour_km: 10.0,
            max_attempts: 3,
            range_shrink: 7.0 / 8.0,
            batch_size: 8,
            distance_cache_timeout: Duration::from_secs(2 * 3600),
            speed_band: SpeedBand::default(),
        }
    }
}
