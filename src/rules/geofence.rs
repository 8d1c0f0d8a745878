use serde::Serialize;
use thiserror::Error;

use crate::model::work_unit::{GeoPoint, WorkUnit};

/// Radius of the sphere whose meridian quadrant is exactly 10 000 km.
pub const EARTH_RADIUS_M: f64 = 20_000_000.0 / std::f64::consts::PI;

/// Distances are reported with millimetre precision.
const DISTANCE_SCALE: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeofenceFix {
    pub distance_m: f64,
    pub radius_m: f64,
    pub within_range: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeofenceError {
    #[error("work unit {unit_id} has no registered coordinates")]
    UnitNotConfigured { unit_id: u64 },
}

/// Great-circle distance between two points in meters (haversine).
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi_a = a.latitude.to_radians();
    let phi_b = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi_a.cos() * phi_b.cos() * (d_lambda / 2.0).sin().powi(2);
    let meters = 2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin();

    (meters * DISTANCE_SCALE).round() / DISTANCE_SCALE
}

/// Checks a clock event against the unit's circle. The boundary is inclusive.
pub fn evaluate(event: GeoPoint, unit: &WorkUnit) -> Result<GeofenceFix, GeofenceError> {
    let center = unit
        .center()
        .ok_or(GeofenceError::UnitNotConfigured { unit_id: unit.id })?;

    let distance_m = distance_m(event, center);
    Ok(GeofenceFix {
        distance_m,
        radius_m: unit.radius_m,
        within_range: distance_m <= unit.radius_m,
    })
}
