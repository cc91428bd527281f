//! Fuel feasibility check for a route's legs.

use tracing::debug;

use crate::domain::SegmentMetrics;
use crate::fuel::{SpeedBand, segment_fuel_litres};

/// Vehicle and fuel inputs for validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuelParams {
    /// Litres per 100 km inside the optimal speed band.
    pub optimal_consumption_per_100km: f64,
    pub tank_size_l: f64,

    /// Fuel in the tank before the first leg being validated.
    pub starting_fuel_l: f64,
    pub safety_coeff: f64,
}

/// Outcome of validating a run of legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// Every leg kept the reserve. Carries the total number of legs
    /// covered, including previously validated ones.
    Passed(usize),

    /// The leg at this (route-global) index dropped below the reserve.
    FailedAt(usize),
}

impl Validation {
    pub fn passed(&self) -> bool {
        matches!(self, Validation::Passed(_))
    }

    /// `Passed(n)` maps to `n`, `FailedAt(i)` to `i`.
    pub fn index(&self) -> usize {
        match self {
            Validation::Passed(n) | Validation::FailedAt(n) => *n,
        }
    }
}

/// Simulate fuel use over `segments`, which start at route leg
/// `prior_validated`.
///
/// Leg 0 of the route starts with `starting_fuel_l` and must keep
/// `min(coeff * tank / 2, starting / 2)`. Every later leg starts with a
/// full tank and must keep `coeff * tank`.
pub fn validate_segments(
    band: &SpeedBand,
    params: &FuelParams,
    segments: &[SegmentMetrics],
    prior_validated: usize,
) -> Validation {
    let first_leg_margin =
        (params.safety_coeff * params.tank_size_l / 2.0).min(params.starting_fuel_l / 2.0);
    let margin = params.safety_coeff * params.tank_size_l;

    for (offset, segment) in segments.iter().enumerate() {
        let index = prior_validated + offset;
        let consumption =
            segment_fuel_litres(band, params.optimal_consumption_per_100km, segment);

        let (fuel_before, reserve) = if index == 0 {
            (params.starting_fuel_l, first_leg_margin)
        } else {
            (params.tank_size_l, margin)
        };
        let fuel_left = fuel_before - consumption;

        debug!(
            segment = index,
            distance_km = segment.distance_km,
            consumption,
            fuel_left,
            reserve,
            "validating leg"
        );

        if fuel_left < reserve {
            debug!(segment = index, fuel_left, reserve, "leg drops below reserve");
            return Validation::FailedAt(index);
        }
    }

    Validation::Passed(prior_validated + segments.len())
}

/// Slice-based form of [`validate_segments`].
///
/// Returns `(passed, index)` where `index` is the failing leg, or the total
/// leg count on success. When the slices differ in length, the first leg
/// missing a distance or a duration fails unless an earlier leg already did.
pub fn validate(
    distances: &[f64],
    durations: &[f64],
    optimal_consumption_per_100km: f64,
    tank_size_l: f64,
    starting_fuel_l: f64,
    prior_validated: usize,
    safety_coeff: f64,
) -> (bool, usize) {
    let segments: Vec<SegmentMetrics> = distances
        .iter()
        .zip(durations)
        .map(|(&distance_km, &duration_min)| SegmentMetrics {
            distance_km,
            duration_min,
        })
        .collect();

    let params = FuelParams {
        optimal_consumption_per_100km,
        tank_size_l,
        starting_fuel_l,
        safety_coeff,
    };
    let outcome = validate_segments(&SpeedBand::default(), &params, &segments, prior_validated);
    if outcome.passed() && distances.len() != durations.len() {
        debug!(
            distances = distances.len(),
            durations = durations.len(),
            "leg without a paired distance and duration"
        );
        return (false, prior_validated + segments.len());
    }
    (outcome.passed(), outcome.index())
}
