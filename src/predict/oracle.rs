use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sgp4::{Constants, Elements};
use utoipa::ToSchema;

use crate::elements::OrbitalElementSet;
use crate::predict::error::PredictError;
use crate::predict::observer::Observer;

const MINUTES_PER_DAY: f64 = 1440.0;

/// Topocentric elevation of one object as seen by one observer.
///
/// Implementations evaluate a whole batch of instants per call; the pass
/// finder never asks for a single instant at a time.
pub trait ElevationOracle {
    fn elevations(&self, instants: &[DateTime<Utc>]) -> Result<Vec<f64>, PredictError>;

    /// Orbital period if it can be derived from the elements.
    fn orbital_period(&self) -> Option<Duration> {
        None
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct LookAngles {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
}

/// SGP4-backed oracle bound to one element set and one observer.
pub struct Sgp4Oracle {
    elements: Elements,
    constants: Constants,
    observer: Observer,
}

impl Sgp4Oracle {
    pub fn new(set: &OrbitalElementSet, observer: Observer) -> Result<Self, PredictError> {
        let elements = set.to_elements()?;
        let constants = Constants::from_elements(&elements)?;
        Ok(Self {
            elements,
            constants,
            observer,
        })
    }

    pub fn look_angles(&self, timestamp: DateTime<Utc>) -> Result<LookAngles, PredictError> {
        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&timestamp.naive_utc())
            .map_err(|e| PredictError::Propagation(e.to_string()))?;

        let prediction = self
            .constants
            .propagate(minutes)
            .map_err(|e| PredictError::Propagation(e.to_string()))?;

        let sidereal = sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(
            &timestamp.naive_utc(),
        ));

        let sat_ecef = teme_to_ecef_position(prediction.position, sidereal);
        let sta_ecef = self.observer.position_ecef_km();

        let dr = [
            sat_ecef[0] - sta_ecef[0],
            sat_ecef[1] - sta_ecef[1],
            sat_ecef[2] - sta_ecef[2],
        ];
        let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

        let (east, north, up) = ecef_to_enu(dr, self.observer.lat_rad(), self.observer.lon_rad());
        let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
        let elevation_deg = if range_km > 0.0 {
            (up / range_km).asin().to_degrees()
        } else {
            0.0
        };

        Ok(LookAngles {
            azimuth_deg,
            elevation_deg,
            range_km,
        })
    }
}

impl ElevationOracle for Sgp4Oracle {
    fn elevations(&self, instants: &[DateTime<Utc>]) -> Result<Vec<f64>, PredictError> {
        instants
            .iter()
            .map(|t| self.look_angles(*t).map(|a| a.elevation_deg))
            .collect()
    }

    fn orbital_period(&self) -> Option<Duration> {
        period_from_mean_motion(self.elements.mean_motion)
    }
}

/// Period from mean motion in revolutions per day.
pub fn period_from_mean_motion(revs_per_day: f64) -> Option<Duration> {
    if !revs_per_day.is_finite() || revs_per_day <= 0.0 {
        return None;
    }
    let seconds = MINUTES_PER_DAY * 60.0 / revs_per_day;
    Some(Duration::milliseconds((seconds * 1000.0).round() as i64))
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::tests_support::parse_element_set;
    use crate::elements::tests_support::iss_payload;

    #[test]
    fn iss_period_is_about_93_minutes() {
        let set = parse_element_set(&iss_payload(), 25544).unwrap().elements;
        let observer = Observer::new(28.6139, 77.2090, 0.0).unwrap();
        let oracle = Sgp4Oracle::new(&set, observer).unwrap();
        let period = oracle.orbital_period().unwrap();
        assert!((period.num_seconds() - 5576).abs() < 5, "{}", period);
    }

    #[test]
    fn bad_mean_motion_gives_no_period() {
        assert!(period_from_mean_motion(0.0).is_none());
        assert!(period_from_mean_motion(f64::NAN).is_none());
        assert_eq!(
            period_from_mean_motion(1.0).unwrap(),
            Duration::minutes(1440)
        );
    }

    #[test]
    fn batch_matches_single_evaluation() {
        let set = parse_element_set(&iss_payload(), 25544).unwrap().elements;
        let observer = Observer::new(28.6139, 77.2090, 0.0).unwrap();
        let oracle = Sgp4Oracle::new(&set, observer).unwrap();

        let start = DateTime::parse_from_rfc3339("2020-07-13T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let instants: Vec<_> = (0..5).map(|i| start + Duration::minutes(i * 7)).collect();
        let batch = oracle.elevations(&instants).unwrap();

        for (t, el) in instants.iter().zip(&batch) {
            let single = oracle.look_angles(*t).unwrap();
            assert_eq!(single.elevation_deg, *el);
            assert!((-90.0..=90.0).contains(el));
            assert!((0.0..360.0).contains(&single.azimuth_deg));
            // LEO object: somewhere between overhead and the far horizon
            assert!(single.range_km > 300.0 && single.range_km < 14_000.0);
        }
    }

    #[test]
    fn zenith_direction_is_all_up() {
        let (east, north, up) = ecef_to_enu([1.0, 0.0, 0.0], 0.0, 0.0);
        assert!(east.abs() < 1e-12 && north.abs() < 1e-12);
        assert!((up - 1.0).abs() < 1e-12);
    }
}
