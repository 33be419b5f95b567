//! Quadrature rules for the UFC reference cells.
//!
//! All rules are expressed on the reference domains used by the form-assembly contract:
//!
//! - interval: $[0, 1]$,
//! - triangle: the convex hull of $(0, 0)$, $(1, 0)$, $(0, 1)$,
//! - tetrahedron: the convex hull of the origin and the three unit vectors,
//! - quadrilateral and hexahedron: $[0, 1]^2$ and $[0, 1]^3$.
//!
//! The weights of a rule sum to the volume of its reference domain.

use serde::{Deserialize, Serialize};

pub mod simplex;
pub mod tensor;
pub mod univariate;

/// A point in reference coordinates.
pub type Point<const D: usize> = [f64; D];

/// Weights and points of a rule in `D` reference dimensions.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// Strategy used to pick a rule for a requested polynomial degree.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuadratureScheme {
    /// Tabulated low-order simplex rules where available, Gauss-type rules otherwise.
    #[default]
    Default,
    /// Collapsed (simplices) or tensor (boxes) Gauss rules for every degree.
    Canonical,
}

/// The rule for a 0-dimensional domain, a single point of weight one.
pub fn point_rule() -> Rule<0> {
    (vec![1.0], vec![[]])
}

/// Number of Gauss points per axis needed to integrate a polynomial of the given degree exactly
/// on an interval or a box.
pub fn num_gauss_points_for_degree(degree: usize) -> usize {
    // 2n - 1 >= degree
    (degree + 2) / 2
}
