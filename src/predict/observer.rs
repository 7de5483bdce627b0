use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::error::PredictError;

pub const MIN_ALTITUDE_M: f64 = -1000.0;

/// A fixed point on the ground, WGS-84 geodetic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Observer {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl Observer {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Result<Self, PredictError> {
        if !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(PredictError::invalid(
                "latitude",
                format!("must be between -90 and 90 degrees, got {}", latitude_deg),
            ));
        }
        if !(-180.0..=180.0).contains(&longitude_deg) {
            return Err(PredictError::invalid(
                "longitude",
                format!("must be between -180 and 180 degrees, got {}", longitude_deg),
            ));
        }
        if !(altitude_m >= MIN_ALTITUDE_M) || !altitude_m.is_finite() {
            return Err(PredictError::invalid(
                "altitude",
                format!("must be >= {} meters, got {}", MIN_ALTITUDE_M, altitude_m),
            ));
        }
        Ok(Self {
            latitude_deg,
            longitude_deg,
            altitude_m,
        })
    }

    /// Parse `"lat, lon"` as written in the config file.
    pub fn from_coordinates(coordinates: &str, altitude_m: Option<f64>) -> Result<Self, PredictError> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return Err(PredictError::invalid(
                "coordinates",
                format!("expected \"lat, lon\", got {:?}", coordinates),
            ));
        }
        let lat = parts[0]
            .parse()
            .map_err(|_| PredictError::invalid("latitude", format!("not a number: {:?}", parts[0])))?;
        let lon = parts[1]
            .parse()
            .map_err(|_| PredictError::invalid("longitude", format!("not a number: {:?}", parts[1])))?;
        Self::new(lat, lon, altitude_m.unwrap_or(0.0))
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        // WGS-84 constants
        let a = 6378.137;
        let e2 = 0.00669437999014;
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        [
            (n + alt_km) * cos_lat * lon.cos(),
            (n + alt_km) * cos_lat * lon.sin(),
            (n * (1.0 - e2) + alt_km) * sin_lat,
        ]
    }
}
