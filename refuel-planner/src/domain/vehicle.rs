//! Vehicle fuel parameters.

use serde::{Deserialize, Serialize};

use crate::fuel::SpeedBand;

use super::error::DomainError;

/// Typical driving conditions a driver reports their consumption for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrivingConditions {
    City,
    #[default]
    Mixed,
    Highway,
}

impl DrivingConditions {
    /// Representative average speed for these conditions (km/h).
    pub fn typical_speed_kmh(&self) -> f64 {
        match self {
            DrivingConditions::City => 40.0,
            DrivingConditions::Mixed => 60.0,
            DrivingConditions::Highway => 90.0,
        }
    }
}

/// Tank size and rated consumption of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Fuel tank capacity in litres.
    pub tank_size_l: f64,

    /// Consumption inside the optimal speed band, litres per 100 km.
    pub optimal_consumption_per_100km: f64,
}

impl Vehicle {
    /// Create a vehicle from its optimal consumption.
    pub fn new(tank_size_l: f64, optimal_consumption_per_100km: f64) -> Result<Self, DomainError> {
        if !tank_size_l.is_finite() || tank_size_l <= 0.0 {
            return Err(DomainError::InvalidVehicle("tank size must be positive"));
        }
        if !optimal_consumption_per_100km.is_finite() || optimal_consumption_per_100km <= 0.0 {
            return Err(DomainError::InvalidVehicle("consumption must be positive"));
        }
        Ok(Self {
            tank_size_l,
            optimal_consumption_per_100km,
        })
    }

    /// Create a vehicle from the consumption a driver observes under
    /// `conditions`, converting it to the optimal-band figure.
    pub fn from_reported(
        tank_size_l: f64,
        reported_per_100km: f64,
        conditions: DrivingConditions,
    ) -> Result<Self, DomainError> {
        Self::new(
            tank_size_l,
            optimal_from_reported(reported_per_100km, conditions),
        )
    }

    /// Consumption the driver would observe under `conditions`.
    pub fn reported_consumption(&self, conditions: DrivingConditions) -> f64 {
        reported_from_optimal(self.optimal_consumption_per_100km, conditions)
    }

    /// Whether `fuel_left_l` is at or below the safety reserve.
    pub fn needs_refill(&self, fuel_left_l: f64, safety_coeff: f64) -> bool {
        fuel_left_l <= safety_coeff * self.tank_size_l
    }
}

/// Convert consumption observed under `conditions` to the optimal-band figure.
pub fn optimal_from_reported(reported_per_100km: f64, conditions: DrivingConditions) -> f64 {
    let factor = SpeedBand::default().adjustment_factor(conditions.typical_speed_kmh());
    round2(reported_per_100km / factor)
}

/// Consumption a driver would observe under `conditions` given the
/// optimal-band figure.
pub fn reported_from_optimal(optimal_per_100km: f64, conditions: DrivingConditions) -> f64 {
    let factor = SpeedBand::default().adjustment_factor(conditions.typical_speed_kmh());
    round2(optimal_per_100km * factor)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
