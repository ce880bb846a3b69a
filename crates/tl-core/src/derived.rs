//! Wheel/terrain quantities derived from windowed channel means.
//!
//! Each function is independent of the others so that a caller can compute
//! any subset for a run.

use crate::numeric::{Real, checked_div};
use crate::{CoreError, CoreResult};

/// Linear velocity of a non-slipping wheel: `omega * r`.
pub fn expected_velocity(angular_rate: Real, wheel_radius: Real) -> Real {
    angular_rate * wheel_radius
}

/// Longitudinal slip in percent: `(1 - v / v_expected) * 100`.
pub fn slip_percent(mean_velocity: Real, expected_velocity: Real) -> CoreResult<Real> {
    let ratio = checked_div(mean_velocity, expected_velocity, "expected velocity")?;
    Ok((1.0 - ratio) * 100.0)
}

/// Effective rolling radius: `v / omega`.
pub fn effective_radius(mean_velocity: Real, angular_rate: Real) -> CoreResult<Real> {
    checked_div(mean_velocity, angular_rate, "angular rate")
}

/// Drawbar coefficient of a single sample: `sqrt(f_x^2 + f_y^2) / f_z`.
pub fn drawbar_coefficient(f_x: Real, f_y: Real, f_z: Real) -> CoreResult<Real> {
    checked_div((f_x * f_x + f_y * f_y).sqrt(), f_z, "f_z")
}

/// Per-sample drawbar coefficient for equally long force channels.
pub fn drawbar_trace(f_x: &[Real], f_y: &[Real], f_z: &[Real]) -> CoreResult<Vec<Real>> {
    if f_x.len() != f_y.len() || f_x.len() != f_z.len() {
        return Err(CoreError::InvalidArg {
            what: "force channels differ in length",
        });
    }
    f_x.iter()
        .zip(f_y)
        .zip(f_z)
        .map(|((&x, &y), &z)| drawbar_coefficient(x, y, z))
        .collect()
}
