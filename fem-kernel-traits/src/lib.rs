//! Scalar abstraction shared by the `fem-kernel` crates.
use nalgebra::RealField;

pub use nalgebra;

/// Real scalar used for coordinates, basis values and element tensors.
pub trait Real: RealField + Copy {
    /// Converts a tabulated `f64` constant (quadrature weights, reference vertices, ...).
    fn from_constant(value: f64) -> Self {
        nalgebra::convert(value)
    }

    /// Converts a count or an exponent.
    fn from_count(value: usize) -> Self {
        nalgebra::convert(value as f64)
    }

    /// Lossy conversion used for diagnostics and error reports.
    fn to_f64(self) -> f64 {
        self.to_subset().unwrap_or(f64::NAN)
    }
}

impl<T: RealField + Copy> Real for T {}
