//! Time-window selection over a sampled channel.
//!
//! A window `[start, end]` is resolved against the time channel into an
//! inclusive index range. Selections that contain no samples are reported as
//! [`CoreError::WindowOutOfRange`] instead of producing an empty mean.

use std::ops::RangeInclusive;

use crate::numeric::{Real, mean};
use crate::{CoreError, CoreResult};

/// Time bounds for a windowed statistic. `end = None` runs to the last sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowSpec {
    pub start: Real,
    #[cfg_attr(feature = "serde", serde(default))]
    pub end: Option<Real>,
}

impl WindowSpec {
    pub fn new(start: Real, end: Real) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// Window from `start` to the last sample.
    pub fn from_start(start: Real) -> Self {
        Self { start, end: None }
    }

    /// Window covering every sample.
    pub fn full() -> Self {
        Self::from_start(Real::NEG_INFINITY)
    }

    pub fn contains(&self, t: Real) -> bool {
        t >= self.start && self.end.is_none_or(|end| t <= end)
    }

    fn out_of_range(&self) -> CoreError {
        CoreError::WindowOutOfRange {
            start: self.start,
            end: self.end,
        }
    }
}

/// Inclusive sample index bounds `[first, last]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub first: usize,
    pub last: usize,
}

impl WindowBounds {
    pub fn sample_count(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn range(&self) -> RangeInclusive<usize> {
        self.first..=self.last
    }

    /// Restrict `values` to this window.
    pub fn slice<'a>(&self, values: &'a [Real]) -> CoreResult<&'a [Real]> {
        values.get(self.range()).ok_or(CoreError::InvalidArg {
            what: "window bounds exceed channel length",
        })
    }
}

/// Locate the sample indices covered by `spec`.
///
/// `times` must be non-decreasing. `first` and `last` are the first and last
/// samples that fall inside the window; an empty selection is an error.
pub fn locate_window(times: &[Real], spec: WindowSpec) -> CoreResult<WindowBounds> {
    let first = times
        .iter()
        .position(|&t| spec.contains(t))
        .ok_or_else(|| spec.out_of_range())?;
    let last = times
        .iter()
        .rposition(|&t| spec.contains(t))
        .ok_or_else(|| spec.out_of_range())?;
    Ok(WindowBounds { first, last })
}

/// Arithmetic mean of `values` over `bounds`, inclusive.
pub fn windowed_mean(values: &[Real], bounds: WindowBounds) -> CoreResult<Real> {
    let slice = bounds.slice(values)?;
    mean(slice).ok_or(CoreError::InvalidArg {
        what: "empty window",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: [Real; 5] = [0.0, 1.0, 2.0, 3.0, 4.0];

    #[test]
    fn locates_inclusive_bounds() {
        let bounds = locate_window(&T, WindowSpec::new(1.0, 3.0)).unwrap();
        assert_eq!(bounds, WindowBounds { first: 1, last: 3 });
        assert_eq!(bounds.sample_count(), 3);
    }

    #[test]
    fn bounds_between_samples_snap_inward() {
        let bounds = locate_window(&T, WindowSpec::new(0.5, 3.5)).unwrap();
        assert_eq!(bounds, WindowBounds { first: 1, last: 3 });
    }

    #[test]
    fn open_end_runs_to_last_sample() {
        let bounds = locate_window(&T, WindowSpec::from_start(2.0)).unwrap();
        assert_eq!(bounds, WindowBounds { first: 2, last: 4 });
    }

    #[test]
    fn end_past_data_clamps_to_last_sample() {
        let bounds = locate_window(&T, WindowSpec::new(3.0, 100.0)).unwrap();
        assert_eq!(bounds, WindowBounds { first: 3, last: 4 });
    }

    #[test]
    fn start_beyond_data_is_out_of_range() {
        let err = locate_window(&T, WindowSpec::new(10.0, 20.0)).unwrap_err();
        assert!(matches!(err, CoreError::WindowOutOfRange { .. }));
    }

    #[test]
    fn empty_series_is_out_of_range() {
        let err = locate_window(&[], WindowSpec::from_start(0.0)).unwrap_err();
        assert!(matches!(err, CoreError::WindowOutOfRange { .. }));
    }

    #[test]
    fn inverted_window_is_out_of_range() {
        let err = locate_window(&T, WindowSpec::new(3.0, 1.0)).unwrap_err();
        assert!(matches!(err, CoreError::WindowOutOfRange { .. }));
    }

    #[test]
    fn end_before_first_sample_is_out_of_range() {
        let times = [5.0, 6.0];
        let err = locate_window(&times, WindowSpec::new(0.0, 1.0)).unwrap_err();
        assert!(matches!(err, CoreError::WindowOutOfRange { .. }));
    }

    #[test]
    fn windowed_mean_over_bounds() {
        let values = [10.0, 1.0, 2.0, 3.0, 10.0];
        let bounds = locate_window(&T, WindowSpec::new(1.0, 3.0)).unwrap();
        assert_eq!(windowed_mean(&values, bounds).unwrap(), 2.0);
    }

    #[test]
    fn windowed_mean_rejects_short_channel() {
        let bounds = WindowBounds { first: 1, last: 9 };
        assert!(windowed_mean(&[1.0, 2.0], bounds).is_err());
    }

    #[test]
    fn full_window_covers_everything() {
        let bounds = locate_window(&[-3.0, 0.0, 7.5], WindowSpec::full()).unwrap();
        assert_eq!(bounds, WindowBounds { first: 0, last: 2 });
    }

    #[test]
    fn bounds_select_exactly_the_contained_samples() {
        let times = [0.0, 0.5, 1.0, 1.5, 2.0, 2.5];
        let spec = WindowSpec::new(0.75, 2.0);
        let bounds = locate_window(&times, spec).unwrap();
        assert_eq!(bounds, WindowBounds { first: 2, last: 4 });
        let inside: Vec<usize> = (0..times.len()).filter(|&i| spec.contains(times[i])).collect();
        assert_eq!(inside, bounds.range().collect::<Vec<_>>());

        assert!(WindowSpec::from_start(1.0).contains(1e9));
        assert!(!spec.contains(2.5));
    }

    #[test]
    fn window_between_samples_is_out_of_range() {
        let err = locate_window(&T, WindowSpec::new(1.5, 1.7)).unwrap_err();
        assert!(matches!(err, CoreError::WindowOutOfRange { .. }));
    }
}
