use crate::{CoreError, CoreResult};

/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> CoreResult<Real> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Arithmetic mean, shifted by the first sample.
///
/// A constant slice returns that constant bit-for-bit. Returns `None` for an
/// empty slice.
pub fn mean(values: &[Real]) -> Option<Real> {
    let (&first, rest) = values.split_first()?;
    let offset: Real = rest.iter().map(|v| v - first).sum();
    Some(first + offset / values.len() as Real)
}

/// `num / den`, failing with `DegenerateWindow` on an exactly-zero divisor.
pub fn checked_div(num: Real, den: Real, what: &'static str) -> CoreResult<Real> {
    if den == 0.0 {
        return Err(CoreError::DegenerateWindow { what });
    }
    Ok(num / den)
}
