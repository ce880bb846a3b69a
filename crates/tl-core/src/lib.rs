//! tl-core: numeric foundation for tractionlab.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - window (time-window location and windowed means)
//! - derived (slip, effective radius, drawbar coefficient)
//! - smoothing (moving average, local polynomial)
//! - error (shared error types)

pub mod derived;
pub mod error;
pub mod numeric;
pub mod smoothing;
pub mod window;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use smoothing::Smoothing;
pub use window::{WindowBounds, WindowSpec, locate_window, windowed_mean};
