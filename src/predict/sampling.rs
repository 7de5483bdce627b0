use chrono::{DateTime, Duration, Utc};

use crate::predict::correction::Corrector;
use crate::predict::error::PredictError;
use crate::predict::oracle::ElevationOracle;

/// Half-open in spirit, but both ends are sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Grow by `before` and `after`, never leaving `bounds`.
    pub fn extend_within(&self, before: Duration, after: Duration, bounds: &Window) -> Window {
        Window {
            start: (self.start - before).max(bounds.start),
            end: (self.end + after).min(bounds.end),
        }
    }
}

/// A run of consecutive samples at or above a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub first: usize,
    pub last: usize,
}

/// Corrected elevations sampled over one window.
#[derive(Debug, Clone)]
pub struct SampleSeries {
    pub instants: Vec<DateTime<Utc>>,
    pub elevations: Vec<f64>,
}

impl SampleSeries {
    pub fn collect(
        oracle: &dyn ElevationOracle,
        corrector: &Corrector,
        instants: Vec<DateTime<Utc>>,
    ) -> Result<Self, PredictError> {
        let mut elevations = oracle.elevations(&instants)?;
        if elevations.len() != instants.len() {
            return Err(PredictError::Propagation(format!(
                "oracle returned {} elevations for {} instants",
                elevations.len(),
                instants.len()
            )));
        }
        corrector.correct_all(&mut elevations);
        Ok(Self {
            instants,
            elevations,
        })
    }

    /// Maximal runs of samples with elevation >= `threshold`.
    pub fn runs_above(&self, threshold: f64) -> Vec<Run> {
        let mut runs = Vec::new();
        let mut first = None;

        for (i, el) in self.elevations.iter().enumerate() {
            match (*el >= threshold, first) {
                (true, None) => first = Some(i),
                (false, Some(f)) => {
                    runs.push(Run { first: f, last: i - 1 });
                    first = None;
                }
                _ => {}
            }
        }
        if let Some(f) = first {
            runs.push(Run {
                first: f,
                last: self.elevations.len() - 1,
            });
        }
        runs
    }

    /// Index of the highest sample in `first..=last`; earliest on ties.
    pub fn argmax(&self, first: usize, last: usize) -> usize {
        let mut best = first;
        for i in first..=last {
            if self.elevations[i] > self.elevations[best] {
                best = i;
            }
        }
        best
    }
}

/// `start`, `start + step`, ... and always `end` itself.
pub fn stepped(window: &Window, step: Duration) -> Vec<DateTime<Utc>> {
    let mut instants = Vec::new();
    if step <= Duration::zero() {
        return vec![window.start, window.end];
    }
    let mut cursor = window.start;
    while cursor < window.end {
        instants.push(cursor);
        cursor += step;
    }
    instants.push(window.end);
    instants
}

/// `count` evenly spaced instants covering the window, both ends included.
pub fn linspace(window: &Window, count: usize) -> Vec<DateTime<Utc>> {
    if count < 2 || window.duration() <= Duration::zero() {
        return vec![window.start];
    }
    let span_ms = window.duration().num_milliseconds();
    let intervals = (count - 1) as i64;
    (0..count as i64)
        .map(|i| window.start + Duration::milliseconds(span_ms * i / intervals))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::minutes(minutes)
    }

    fn series(elevations: Vec<f64>) -> SampleSeries {
        SampleSeries {
            instants: (0..elevations.len() as i64).map(at).collect(),
            elevations,
        }
    }

    #[test]
    fn stepped_grid_ends_on_window_end() {
        let grid = stepped(&Window::new(at(0), at(10)), Duration::minutes(4));
        assert_eq!(grid, vec![at(0), at(4), at(8), at(10)]);
        let exact = stepped(&Window::new(at(0), at(8)), Duration::minutes(4));
        assert_eq!(exact, vec![at(0), at(4), at(8)]);
    }

    #[test]
    fn linspace_covers_both_ends() {
        let grid = linspace(&Window::new(at(0), at(10)), 11);
        assert_eq!(grid.len(), 11);
        assert_eq!(grid[0], at(0));
        assert_eq!(grid[5], at(5));
        assert_eq!(grid[10], at(10));
    }

    #[test]
    fn runs_include_open_edges() {
        let s = series(vec![5.0, 1.0, 6.0, 7.0, 0.0, 9.0]);
        assert_eq!(
            s.runs_above(5.0),
            vec![
                Run { first: 0, last: 0 },
                Run { first: 2, last: 3 },
                Run { first: 5, last: 5 },
            ]
        );
        assert!(s.runs_above(10.0).is_empty());
    }

    #[test]
    fn argmax_prefers_earliest_tie() {
        let s = series(vec![1.0, 8.0, 3.0, 8.0, 2.0]);
        assert_eq!(s.argmax(0, 4), 1);
        assert_eq!(s.argmax(2, 4), 3);
    }

    #[test]
    fn extension_is_clamped() {
        let bounds = Window::new(at(0), at(60));
        let w = Window::new(at(5), at(50)).extend_within(
            Duration::minutes(15),
            Duration::minutes(15),
            &bounds,
        );
        assert_eq!(w, bounds);
    }
}
