use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[schema(example = -6.2)]
    pub latitude: f64,
    #[schema(example = 106.816666)]
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A named location employees are assigned to; its registered point is the
/// geofence center for every clock event of those employees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct WorkUnit {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Head Office")]
    pub name: String,
    #[schema(example = -6.2, nullable = true)]
    pub latitude: Option<f64>,
    #[schema(example = 106.816666, nullable = true)]
    pub longitude: Option<f64>,
    #[schema(example = 100.0)]
    pub radius_m: f64,
}

impl WorkUnit {
    /// Registered geofence center, if both coordinates are present.
    pub fn center(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
            _ => None,
        }
    }
}
