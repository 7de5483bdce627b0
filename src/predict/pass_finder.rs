use chrono::Duration;

use crate::predict::correction::Corrector;
use crate::predict::error::PredictError;
use crate::predict::oracle::ElevationOracle;
use crate::predict::sampling::{linspace, stepped, SampleSeries, Window};
use crate::predict::types::{sort_passes, PassEvent, MIN_FINE_RESOLUTION_MS};

/// Lowest sampling density accepted for the first scan.
pub const MIN_SAMPLES_PER_ORBIT: u32 = 12;

/// Tunables for the three search phases.
#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    /// Phase 1 samples per orbital period, at least [`MIN_SAMPLES_PER_ORBIT`].
    pub samples_per_orbit: u32,
    pub max_coarse_step: Duration,
    /// Added to the threshold during phase 1.
    pub hysteresis_deg: f64,
    /// Phase 1 candidates are stretched by this many coarse steps at the end.
    pub padding_steps: i32,
    pub refine_divisor: i32,
    pub min_refine_step: Duration,
    pub fine_buffer: Duration,
    pub min_fine_samples: usize,
    /// Used when the elements give no usable period.
    pub default_period: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            samples_per_orbit: 36,
            max_coarse_step: Duration::minutes(30),
            hysteresis_deg: 2.0,
            padding_steps: 2,
            refine_divisor: 4,
            min_refine_step: Duration::minutes(2),
            fine_buffer: Duration::minutes(15),
            min_fine_samples: 50,
            default_period: Duration::minutes(90),
        }
    }
}

impl SearchSettings {
    pub fn coarse_step(&self, period: Option<Duration>) -> Duration {
        let period = period
            .filter(|p| *p > Duration::zero())
            .unwrap_or_else(|| {
                log::debug!(
                    "No orbital period available, assuming {} min",
                    self.default_period.num_minutes()
                );
                self.default_period
            });
        let samples = self.samples_per_orbit.max(MIN_SAMPLES_PER_ORBIT);
        (period / samples as i32)
            .min(self.max_coarse_step)
            .max(Duration::seconds(1))
    }

    pub fn refine_step(&self, coarse_step: Duration) -> Duration {
        (coarse_step / self.refine_divisor.max(1)).max(self.min_refine_step)
    }
}

/// Find every visibility window of the oracle's object inside `window`.
///
/// Elevations are corrected with `corrector` before being compared with
/// `min_elevation_deg`. Passes already in progress at either edge of the
/// window are truncated to it. The result is sorted by start.
pub fn find_passes(
    oracle: &dyn ElevationOracle,
    corrector: &Corrector,
    window: Window,
    min_elevation_deg: f64,
    fine_resolution: Duration,
    settings: &SearchSettings,
) -> Result<Vec<PassEvent>, PredictError> {
    if window.duration() <= Duration::zero() {
        return Ok(Vec::new());
    }

    let coarse_step = settings.coarse_step(oracle.orbital_period());
    let candidates = ultra_coarse_scan(
        oracle,
        corrector,
        &window,
        coarse_step,
        min_elevation_deg + settings.hysteresis_deg,
        settings.padding_steps,
    )?;

    let refine_step = settings.refine_step(coarse_step);
    let mut refined = Vec::new();
    for candidate in &candidates {
        refined.extend(coarse_refine(
            oracle,
            corrector,
            candidate,
            refine_step,
            min_elevation_deg,
        )?);
    }
    // Padded rough windows can overlap, so the same run may show up twice.
    let refined = merge_overlapping(refined);

    let mut passes = Vec::new();
    for candidate in &refined {
        let extended =
            candidate.extend_within(settings.fine_buffer, settings.fine_buffer, &window);
        passes.extend(fine_refine(
            oracle,
            corrector,
            candidate,
            &extended,
            fine_resolution,
            settings.min_fine_samples,
            min_elevation_deg,
        )?);
    }

    sort_passes(&mut passes);
    let passes = merge_passes(passes);

    log::debug!(
        "Coarse step {}s: {} candidates, {} refined, {} passes",
        coarse_step.num_seconds(),
        candidates.len(),
        refined.len(),
        passes.len()
    );

    Ok(passes)
}

/// Phase 1: sample the whole window and keep rough windows above the
/// hysteresis threshold.
pub fn ultra_coarse_scan(
    oracle: &dyn ElevationOracle,
    corrector: &Corrector,
    window: &Window,
    step: Duration,
    threshold: f64,
    padding_steps: i32,
) -> Result<Vec<Window>, PredictError> {
    let series = SampleSeries::collect(oracle, corrector, stepped(window, step))?;
    let padding = step * padding_steps;

    Ok(series
        .runs_above(threshold)
        .into_iter()
        .map(|run| {
            let start = series.instants[run.first];
            // Up to the first sample back below, or the window end if it never drops.
            let end = series
                .instants
                .get(run.last + 1)
                .copied()
                .unwrap_or(window.end);
            Window::new(start, (end + padding).min(window.end))
        })
        .collect())
}

/// Phase 2: resample one rough window against the real threshold. May split
/// it when the first scan merged neighbouring passes. Falls back to the
/// rough window when the finer grid sees nothing above threshold.
pub fn coarse_refine(
    oracle: &dyn ElevationOracle,
    corrector: &Corrector,
    candidate: &Window,
    step: Duration,
    threshold: f64,
) -> Result<Vec<Window>, PredictError> {
    let series = SampleSeries::collect(oracle, corrector, stepped(candidate, step))?;
    let windows: Vec<Window> = series
        .runs_above(threshold)
        .into_iter()
        .map(|run| Window::new(series.instants[run.first], series.instants[run.last]))
        .collect();

    if windows.is_empty() {
        return Ok(vec![*candidate]);
    }
    Ok(windows)
}

/// Coalesce windows that share any instant.
pub fn merge_overlapping(mut windows: Vec<Window>) -> Vec<Window> {
    windows.sort_by_key(|w| w.start);
    let mut merged: Vec<Window> = Vec::with_capacity(windows.len());
    for window in windows {
        match merged.last_mut() {
            Some(last) if window.start <= last.end => {
                log::debug!(
                    "Coarse windows {}..{} and {}..{} overlap, merging",
                    last.start,
                    last.end,
                    window.start,
                    window.end
                );
                last.end = last.end.max(window.end);
            }
            _ => merged.push(window),
        }
    }
    merged
}

/// Collapse start-sorted events that overlap, which happens when neighbouring
/// candidates' extended windows both reach the same pass. The higher peak is
/// kept.
fn merge_passes(passes: Vec<PassEvent>) -> Vec<PassEvent> {
    let mut merged: Vec<PassEvent> = Vec::with_capacity(passes.len());
    for pass in passes {
        match merged.last_mut() {
            Some(last) if last.overlaps(&pass) => {
                log::debug!("Pass at {} found twice, merging", pass.start);
                if pass.max_elevation_deg > last.max_elevation_deg {
                    last.peak = pass.peak;
                    last.max_elevation_deg = pass.max_elevation_deg;
                }
                last.end = last.end.max(pass.end);
            }
            _ => merged.push(pass),
        }
    }
    merged
}

/// Phase 3: sample `extended` at the fine resolution and pull out start,
/// peak and end of every run above threshold that overlaps the candidate.
/// Empty when nothing in reach clears the threshold.
pub fn fine_refine(
    oracle: &dyn ElevationOracle,
    corrector: &Corrector,
    candidate: &Window,
    extended: &Window,
    resolution: Duration,
    min_samples: usize,
    threshold: f64,
) -> Result<Vec<PassEvent>, PredictError> {
    let resolution_ms = resolution.num_milliseconds().max(MIN_FINE_RESOLUTION_MS);
    let intervals = (extended.duration().num_milliseconds() + resolution_ms - 1) / resolution_ms;
    let count = (intervals as usize + 1).max(min_samples);

    let series = SampleSeries::collect(oracle, corrector, linspace(extended, count))?;

    Ok(series
        .runs_above(threshold)
        .into_iter()
        .filter(|run| {
            series.instants[run.first] <= candidate.end
                && series.instants[run.last] >= candidate.start
        })
        .map(|run| {
            let peak = series.argmax(run.first, run.last);
            PassEvent {
                start: series.instants[run.first],
                peak: series.instants[peak],
                end: series.instants[run.last],
                max_elevation_deg: series.elevations[peak],
            }
        })
        .collect())
}
