//! Refraction and horizon adjustments applied to geometric elevation
//! before it is compared against a visibility threshold.

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Below this no refraction is applied.
pub const REFRACTION_CUTOFF_DEG: f64 = -5.0;
/// Lowest angle at which the atmosphere still lets anything through.
pub const EXTINCTION_FLOOR_DEG: f64 = -2.0;

const REFRACTION_DAMPING: f64 = 0.5;
const ALTITUDE_FACTOR_FLOOR: f64 = 0.7;
const ALTITUDE_FACTOR_SPAN_M: f64 = 3000.0;
// Bennett's formula diverges near -4.4 degrees.
const BENNETT_MIN_ELEVATION_DEG: f64 = -1.0;

/// Corrects raw elevations for a given observer altitude.
#[derive(Debug, Clone, Copy)]
pub struct Corrector {
    altitude_m: f64,
    floor_deg: f64,
}

impl Corrector {
    pub fn new(altitude_m: f64) -> Self {
        Self {
            altitude_m,
            floor_deg: visibility_floor_deg(altitude_m),
        }
    }

    pub fn correct(&self, raw_deg: f64) -> f64 {
        (raw_deg + refraction_deg(raw_deg, self.altitude_m)).max(self.floor_deg)
    }

    pub fn correct_all(&self, raw: &mut [f64]) {
        for el in raw.iter_mut() {
            *el = self.correct(*el);
        }
    }
}

/// Apparent lift in degrees from atmospheric refraction.
pub fn refraction_deg(raw_deg: f64, altitude_m: f64) -> f64 {
    if raw_deg <= REFRACTION_CUTOFF_DEG {
        return 0.0;
    }
    let h = raw_deg.max(BENNETT_MIN_ELEVATION_DEG);
    let arcmin = 1.0 / (h + 7.31 / (h + 4.4)).to_radians().tan();
    arcmin / 60.0 * altitude_factor(altitude_m) * REFRACTION_DAMPING
}

/// Thinner air above the observer bends less: 1.0 at sea level falling
/// linearly to 0.7 at 3000 m and staying there.
pub fn altitude_factor(altitude_m: f64) -> f64 {
    let reduction = (1.0 - ALTITUDE_FACTOR_FLOOR) * altitude_m.max(0.0) / ALTITUDE_FACTOR_SPAN_M;
    (1.0 - reduction).max(ALTITUDE_FACTOR_FLOOR)
}

/// Dip of the geometric horizon below the horizontal, in degrees.
pub fn horizon_dip_deg(altitude_m: f64) -> f64 {
    let height_km = altitude_m.max(0.0) / 1000.0;
    (2.0 * height_km / EARTH_RADIUS_KM).sqrt().to_degrees()
}

/// Nothing is reported below this angle.
pub fn visibility_floor_deg(altitude_m: f64) -> f64 {
    (-horizon_dip_deg(altitude_m)).min(EXTINCTION_FLOOR_DEG)
}
