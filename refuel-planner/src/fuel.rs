//! Speed-dependent fuel consumption model.
//!
//! A vehicle burns its rated ("optimal") consumption only inside an optimal
//! speed band. Below the band stop-start driving costs more; above it
//! aerodynamic drag does. The penalty grows with the square of the relative
//! distance from the band edge.

use crate::domain::SegmentMetrics;

/// Speed band and penalty coefficients of the consumption model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedBand {
    /// Lower edge of the optimal band (km/h).
    pub low_optimal_kmh: f64,

    /// Upper edge of the optimal band (km/h).
    pub high_optimal_kmh: f64,

    /// Penalty coefficient below the band.
    pub alpha_low: f64,

    /// Penalty coefficient above the band.
    pub alpha_high: f64,
}

impl Default for SpeedBand {
    fn default() -> Self {
        Self {
            low_optimal_kmh: 60.0,
            high_optimal_kmh: 70.0,
            alpha_low: 1.6,
            alpha_high: 0.9,
        }
    }
}

impl SpeedBand {
    /// Multiplier applied to the optimal consumption at `speed_kmh`.
    ///
    /// Returns 1.0 inside `[low_optimal, high_optimal]`.
    pub fn adjustment_factor(&self, speed_kmh: f64) -> f64 {
        if speed_kmh < self.low_optimal_kmh {
            let rel = (speed_kmh - self.low_optimal_kmh) / self.low_optimal_kmh;
            1.0 + self.alpha_low * rel * rel
        } else if speed_kmh > self.high_optimal_kmh {
            let rel = (speed_kmh - self.high_optimal_kmh) / self.high_optimal_kmh;
            1.0 + self.alpha_high * rel * rel
        } else {
            1.0
        }
    }

    /// Adjustment factor for a leg, or 1.0 when the leg takes no time.
    pub fn factor_for(&self, distance_km: f64, duration_min: f64) -> f64 {
        average_speed_kmh(distance_km, duration_min)
            .map(|v| self.adjustment_factor(v))
            .unwrap_or(1.0)
    }
}

/// Adjustment factor with the default speed band.
pub fn speed_adjustment_factor(speed_kmh: f64) -> f64 {
    SpeedBand::default().adjustment_factor(speed_kmh)
}

/// Average speed over a distance driven in a duration.
///
/// Returns `None` for a zero or negative duration.
pub fn average_speed_kmh(distance_km: f64, duration_min: f64) -> Option<f64> {
    if duration_min > 0.0 {
        Some(distance_km / duration_min * 60.0)
    } else {
        None
    }
}

/// Litres burned on one leg at the leg's average speed.
pub fn segment_fuel_litres(
    band: &SpeedBand,
    optimal_consumption_per_100km: f64,
    segment: &SegmentMetrics,
) -> f64 {
    optimal_consumption_per_100km / 100.0
        * segment.distance_km
        * band.factor_for(segment.distance_km, segment.duration_min)
}
