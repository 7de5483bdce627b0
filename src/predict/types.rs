use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::predict::error::PredictError;
use crate::predict::observer::Observer;

pub const MIN_HOURS: u32 = 1;
pub const MAX_HOURS: u32 = 168;
pub const DEFAULT_FINE_RESOLUTION_MINUTES: f64 = 1.0;
pub const MAX_FINE_RESOLUTION_MINUTES: f64 = 5.0;
/// Finer steps are rounded up to this.
pub const MIN_FINE_RESOLUTION_MS: i64 = 1_000;

/// A predicted visibility window.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PassEvent {
    pub start: DateTime<Utc>,
    pub peak: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub max_elevation_deg: f64,
}

impl PassEvent {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &PassEvent) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl PartialOrd for PassEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.start.cmp(&other.start))
    }
}

/// Everything needed to predict passes of one object for one observer.
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    pub observer: Observer,
    pub catalog_id: u32,
    pub hours: u32,
    pub min_elevation_deg: f64,
    pub fine_resolution_minutes: Option<f64>,
}

impl PredictionRequest {
    pub fn validate(&self) -> Result<(), PredictError> {
        // Re-run the observer checks in case it was built by hand.
        Observer::new(
            self.observer.latitude_deg,
            self.observer.longitude_deg,
            self.observer.altitude_m,
        )?;

        if self.catalog_id == 0 {
            return Err(PredictError::invalid(
                "catalog_id",
                "must be a positive integer, got 0",
            ));
        }
        if !(MIN_HOURS..=MAX_HOURS).contains(&self.hours) {
            return Err(PredictError::invalid(
                "hours",
                format!(
                    "must be between {} and {}, got {}",
                    MIN_HOURS, MAX_HOURS, self.hours
                ),
            ));
        }
        if !(0.0..=90.0).contains(&self.min_elevation_deg) {
            return Err(PredictError::invalid(
                "min_elevation",
                format!(
                    "must be between 0 and 90 degrees, got {}",
                    self.min_elevation_deg
                ),
            ));
        }
        if let Some(resolution) = self.fine_resolution_minutes {
            if !(resolution > 0.0 && resolution <= MAX_FINE_RESOLUTION_MINUTES) {
                return Err(PredictError::invalid(
                    "resolution",
                    format!(
                        "must be greater than 0 and at most {} minutes, got {}",
                        MAX_FINE_RESOLUTION_MINUTES, resolution
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn look_ahead(&self) -> Duration {
        Duration::hours(self.hours as i64)
    }

    pub fn fine_resolution(&self) -> Duration {
        let minutes = self
            .fine_resolution_minutes
            .unwrap_or(DEFAULT_FINE_RESOLUTION_MINUTES);
        let ms = (minutes * 60_000.0).round() as i64;
        Duration::milliseconds(ms.max(MIN_FINE_RESOLUTION_MS))
    }
}

/// Sort by start time. Unordered pairs (never produced here) keep their
/// relative order.
pub fn sort_passes(passes: &mut [PassEvent]) {
    passes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::minutes(minutes)
    }

    fn event(start: i64, end: i64) -> PassEvent {
        PassEvent {
            start: at(start),
            peak: at((start + end) / 2),
            end: at(end),
            max_elevation_deg: 30.0,
        }
    }

    fn request(hours: u32) -> PredictionRequest {
        PredictionRequest {
            observer: Observer::new(0.0, 0.0, 0.0).unwrap(),
            catalog_id: 25544,
            hours,
            min_elevation_deg: 10.0,
            fine_resolution_minutes: None,
        }
    }

    #[test]
    fn duration_and_overlap() {
        let a = event(0, 10);
        assert_eq!(a.duration().num_seconds(), 600);
        assert!(a.overlaps(&event(10, 20)));
        assert!(a.overlaps(&event(-5, 2)));
        assert!(!a.overlaps(&event(11, 20)));
    }

    #[test]
    fn sorting_is_by_start() {
        let mut passes = vec![event(100, 110), event(0, 10), event(50, 55)];
        sort_passes(&mut passes);
        let starts: Vec<_> = passes.iter().map(|p| p.start).collect();
        assert_eq!(starts, vec![at(0), at(50), at(100)]);
        assert!(event(0, 10) < event(1, 2));
    }

    #[test]
    fn hours_out_of_range_are_rejected() {
        assert!(request(1).validate().is_ok());
        assert!(request(168).validate().is_ok());
        for hours in [0, 169, 200] {
            match request(hours).validate() {
                Err(PredictError::InvalidInput { field, .. }) => assert_eq!(field, "hours"),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn elevation_and_resolution_ranges() {
        let mut req = request(6);
        req.min_elevation_deg = -1.0;
        assert!(req.validate().is_err());
        req.min_elevation_deg = 91.0;
        assert!(req.validate().is_err());
        req.min_elevation_deg = 90.0;
        assert!(req.validate().is_ok());

        req.fine_resolution_minutes = Some(0.0);
        assert!(req.validate().is_err());
        req.fine_resolution_minutes = Some(5.5);
        assert!(req.validate().is_err());
        req.fine_resolution_minutes = Some(0.5);
        assert!(req.validate().is_ok());
        assert_eq!(req.fine_resolution(), Duration::seconds(30));
    }

    #[test]
    fn tiny_resolution_is_rounded_up_to_a_second() {
        let mut req = request(168);
        req.fine_resolution_minutes = Some(1e-7);
        assert!(req.validate().is_ok());
        assert_eq!(req.fine_resolution(), Duration::seconds(1));

        req.fine_resolution_minutes = None;
        assert_eq!(req.fine_resolution(), Duration::minutes(1));
    }

    #[test]
    fn catalog_id_zero_is_rejected() {
        let mut req = request(6);
        req.catalog_id = 0;
        assert!(matches!(
            req.validate(),
            Err(PredictError::InvalidInput { field: "catalog_id", .. })
        ));
    }
}
