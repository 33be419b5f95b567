//! Quadrature rules on reference cells and facets, converted to the scalar type of the engine.
//!
//! The rules themselves live in `fem-kernel-quadrature`; this module selects a rule per cell
//! shape and maps facet rules onto the facets of a cell.
use crate::cell::CellShape;
use crate::error::FormError;
use fem_kernel_quadrature::simplex::{tetrahedron, triangle};
use fem_kernel_quadrature::tensor::{hexahedron_gauss_for_degree, quadrilateral_gauss_for_degree};
use fem_kernel_quadrature::univariate::gauss_for_degree;
use fem_kernel_quadrature::{point_rule, Rule};
use fem_kernel_traits::Real;

pub use fem_kernel_quadrature::QuadratureScheme;

/// Highest polynomial degree for which rules are created.
pub const MAX_QUADRATURE_DEGREE: usize = 40;

/// Weights and points of a rule in `dim` dimensions, points stored row-major `[point][dim]`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureRule<T> {
    dim: usize,
    weights: Vec<T>,
    points: Vec<T>,
}

impl<T: Real> QuadratureRule<T> {
    pub fn new(dim: usize, weights: Vec<T>, points: Vec<T>) -> Result<Self, FormError> {
        if points.len() != weights.len() * dim {
            return Err(FormError::invalid_argument(format!(
                "{} weights do not match {} point coordinates in dimension {}",
                weights.len(),
                points.len(),
                dim
            )));
        }
        Ok(Self { dim, weights, points })
    }

    fn from_rule<const D: usize>((weights, points): Rule<D>) -> Self {
        Self {
            dim: D,
            weights: weights.into_iter().map(T::from_constant).collect(),
            points: points.iter().flatten().copied().map(T::from_constant).collect(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn num_points(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    pub fn points(&self) -> &[T] {
        &self.points
    }

    pub fn point(&self, i: usize) -> &[T] {
        &self.points[i * self.dim..(i + 1) * self.dim]
    }

    /// Approximates the integral of `f` over the domain of the rule.
    pub fn integrate(&self, f: impl Fn(&[T]) -> T) -> T {
        self.weights
            .iter()
            .enumerate()
            .fold(T::zero(), |acc, (i, &w)| acc + w * f(self.point(i)))
    }
}

/// A rule on the reference cell that integrates polynomials of the given degree exactly.
pub fn create_quadrature<T: Real>(
    cell: CellShape,
    degree: usize,
    scheme: QuadratureScheme,
) -> Result<QuadratureRule<T>, FormError> {
    if degree > MAX_QUADRATURE_DEGREE {
        return Err(FormError::invalid_argument(format!(
            "quadrature degree {} exceeds the maximum {}",
            degree, MAX_QUADRATURE_DEGREE
        )));
    }
    Ok(match cell {
        CellShape::Vertex => QuadratureRule::from_rule(point_rule()),
        CellShape::Interval => QuadratureRule::from_rule(gauss_for_degree(degree)),
        CellShape::Triangle => QuadratureRule::from_rule(triangle(degree, scheme)),
        CellShape::Tetrahedron => QuadratureRule::from_rule(tetrahedron(degree, scheme)),
        CellShape::Quadrilateral => QuadratureRule::from_rule(quadrilateral_gauss_for_degree(degree)),
        CellShape::Hexahedron => QuadratureRule::from_rule(hexahedron_gauss_for_degree(degree)),
    })
}

/// Maps a rule on the reference facet onto facet `facet` of the cell.
///
/// The weights are left untouched, so they sum to the measure of the reference facet.
pub fn map_facet_quadrature<T: Real>(
    cell: CellShape,
    facet: usize,
    facet_rule: &QuadratureRule<T>,
) -> Result<QuadratureRule<T>, FormError> {
    let tdim = cell.topological_dimension();
    let mut points = vec![T::zero(); facet_rule.num_points() * tdim];
    for (i, point) in points.chunks_exact_mut(tdim).enumerate() {
        cell.map_facet_point(facet, facet_rule.point(i), point)?;
    }
    QuadratureRule::new(tdim, facet_rule.weights().to_vec(), points)
}

/// Rules for every facet of the cell, each given in cell reference coordinates.
pub fn create_facet_quadratures<T: Real>(
    cell: CellShape,
    degree: usize,
    scheme: QuadratureScheme,
) -> Result<Vec<QuadratureRule<T>>, FormError> {
    let facet_shape = cell
        .facet_shape()
        .ok_or_else(|| FormError::invalid_argument(format!("{} has no facets", cell)))?;
    let facet_rule = create_quadrature(facet_shape, degree, scheme)?;
    (0..cell.num_facets())
        .map(|facet| map_facet_quadrature(cell, facet, &facet_rule))
        .collect()
}
