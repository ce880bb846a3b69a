use thiserror::Error;

use crate::numeric::Real;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Window out of range: no samples in [{start}, {}]", fmt_end(.end))]
    WindowOutOfRange { start: Real, end: Option<Real> },

    #[error("Degenerate window: {what} is zero")]
    DegenerateWindow { what: &'static str },

    #[error("Invalid smoothing window {window}: {reason}")]
    InvalidSmoothingWindow { window: usize, reason: String },

    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

fn fmt_end(end: &Option<Real>) -> String {
    end.map_or_else(|| "last sample".to_string(), |e| e.to_string())
}
