//! Smoothing operators for per-run traces.
//!
//! - `MovingAverage`: centered window that shrinks at the series edges, so
//!   every output sample is the mean of at least one input sample.
//! - `LocalPolynomial`: Savitzky-Golay filter. Interior samples use the
//!   least-squares polynomial over the centered window; the first and last
//!   half-windows are evaluated from polynomials fitted to the first and last
//!   full windows.

use nalgebra::DMatrix;

use crate::numeric::{Real, mean};
use crate::{CoreError, CoreResult};

/// Smoothing applied to a trace before it is averaged or plotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "method", rename_all = "snake_case")
)]
pub enum Smoothing {
    #[default]
    None,
    MovingAverage {
        window: usize,
    },
    LocalPolynomial {
        window: usize,
        order: usize,
    },
}

impl Smoothing {
    /// Check parameters without touching any data.
    pub fn validate(&self) -> CoreResult<()> {
        match *self {
            Smoothing::None => Ok(()),
            Smoothing::MovingAverage { window } => {
                if window == 0 {
                    return Err(invalid(window, "moving average window must be at least 1"));
                }
                Ok(())
            }
            Smoothing::LocalPolynomial { window, order } => {
                if window % 2 == 0 {
                    return Err(invalid(window, "local polynomial window must be odd"));
                }
                if window <= order {
                    return Err(invalid(
                        window,
                        format!("local polynomial window must exceed polynomial order {order}"),
                    ));
                }
                Ok(())
            }
        }
    }

    pub fn apply(&self, values: &[Real]) -> CoreResult<Vec<Real>> {
        match *self {
            Smoothing::None => Ok(values.to_vec()),
            Smoothing::MovingAverage { window } => moving_average(values, window),
            Smoothing::LocalPolynomial { window, order } => savitzky_golay(values, window, order),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Smoothing::None)
    }
}

fn invalid(window: usize, reason: impl Into<String>) -> CoreError {
    CoreError::InvalidSmoothingWindow {
        window,
        reason: reason.into(),
    }
}

/// Centered moving average with edge-shrinking windows.
///
/// Sample `i` averages `[i - window/2, i + (window-1)/2]` clipped to the
/// series, which matches a centered rolling mean with `min_periods = 1`.
pub fn moving_average(values: &[Real], window: usize) -> CoreResult<Vec<Real>> {
    Smoothing::MovingAverage { window }.validate()?;

    let before = window / 2;
    let after = (window - 1) / 2;
    let n = values.len();

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let lo = i.saturating_sub(before);
        let hi = (i + after).min(n - 1);
        // lo <= i <= hi, so the slice is never empty
        out.push(mean(&values[lo..=hi]).unwrap_or(values[i]));
    }
    Ok(out)
}

/// Savitzky-Golay smoothing with polynomial edge fits.
pub fn savitzky_golay(values: &[Real], window: usize, order: usize) -> CoreResult<Vec<Real>> {
    Smoothing::LocalPolynomial { window, order }.validate()?;

    let n = values.len();
    if n < window {
        return Err(invalid(
            window,
            format!("series has {n} samples, fewer than the window"),
        ));
    }

    let half = window / 2;
    let fit = least_squares_operator(window, order)?;

    let mut out = vec![0.0; n];

    // Interior: value of the fitted polynomial at the window centre.
    for (i, slot) in out.iter_mut().enumerate().take(n - half).skip(half) {
        let segment = &values[i - half..=i + half];
        *slot = (0..window).map(|j| fit[(0, j)] * segment[j]).sum();
    }

    // Edges: evaluate the first/last window's polynomial at the edge offsets.
    let head = polynomial_coefficients(&fit, &values[..window]);
    for (i, slot) in out.iter_mut().enumerate().take(half) {
        *slot = evaluate(&head, i as Real - half as Real);
    }
    let tail_start = n - window;
    let tail = polynomial_coefficients(&fit, &values[tail_start..]);
    for (i, slot) in out.iter_mut().enumerate().skip(n - half) {
        *slot = evaluate(&tail, (i - tail_start) as Real - half as Real);
    }

    Ok(out)
}

/// `(A^T A)^-1 A^T` for the Vandermonde matrix of offsets `-half..=half`.
fn least_squares_operator(window: usize, order: usize) -> CoreResult<DMatrix<Real>> {
    let half = (window / 2) as Real;
    let vandermonde =
        DMatrix::from_fn(window, order + 1, |r, c| (r as Real - half).powi(c as i32));
    let normal = vandermonde.transpose() * &vandermonde;
    let inverse = normal.try_inverse().ok_or(CoreError::InvalidArg {
        what: "singular local polynomial fit",
    })?;
    Ok(inverse * vandermonde.transpose())
}

fn polynomial_coefficients(fit: &DMatrix<Real>, segment: &[Real]) -> Vec<Real> {
    (0..fit.nrows())
        .map(|k| (0..fit.ncols()).map(|j| fit[(k, j)] * segment[j]).sum())
        .collect()
}

fn evaluate(coefficients: &[Real], x: Real) -> Real {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}
