//! Strategies for property-based tests of the geometry engine.
use crate::cell::{CellOrientation, CellShape};
use ::proptest::collection::vec;
use ::proptest::prelude::*;

/// Points strictly inside the reference cell, `tdim` coordinates each.
///
/// Simplex points are convex combinations of the vertices with weights bounded away from zero.
pub fn reference_point(cell: CellShape) -> impl Strategy<Value = Vec<f64>> {
    let tdim = cell.topological_dimension();
    let num_vertices = cell.num_vertices();
    let simplex = cell.is_simplex();
    vec(0.05..1.0, num_vertices.max(tdim)).prop_map(move |params| {
        if simplex {
            let total: f64 = params.iter().sum();
            let mut point = vec![0.0; tdim];
            for (v, lambda) in params.iter().enumerate() {
                for (x, vertex) in point.iter_mut().zip(cell.reference_vertices()[v]) {
                    *x += lambda / total * vertex;
                }
            }
            point
        } else {
            params[..tdim].iter().map(|&t| 0.05 + 0.9 * (t - 0.05) / 0.95).collect()
        }
    })
}

/// Coordinate dofs of an affine image of the reference cell in `gdim >= tdim` dimensions.
///
/// The linear part is the embedding of a strictly diagonally dominant matrix, so the cell is
/// never degenerate.
pub fn affine_cell_coordinates(cell: CellShape, gdim: usize) -> impl Strategy<Value = Vec<f64>> {
    let tdim = cell.topological_dimension();
    let perturbation = vec(-0.2..0.2, gdim * tdim);
    let translation = vec(-5.0..5.0, gdim);
    (perturbation, translation, 0.5..2.0).prop_map(move |(perturbation, translation, scale)| {
        let mut coordinates = Vec::with_capacity(cell.num_vertices() * gdim);
        for vertex in cell.reference_vertices() {
            for i in 0..gdim {
                let mut x = translation[i];
                for (a, &v) in vertex.iter().enumerate() {
                    let identity = if i == a { 1.0 } else { 0.0 };
                    x += scale * (identity + perturbation[i * tdim + a]) * v;
                }
                coordinates.push(x);
            }
        }
        coordinates
    })
}

/// Coordinate dofs of a convex, generally non-affine, perturbation of the unit square.
pub fn perturbed_quadrilateral_coordinates() -> impl Strategy<Value = Vec<f64>> {
    vec(-0.15..0.15, 8).prop_map(|perturbation| {
        CellShape::Quadrilateral
            .reference_vertices()
            .iter()
            .flat_map(|vertex| vertex.iter().copied())
            .zip(perturbation)
            .map(|(x, dx)| x + dx)
            .collect()
    })
}

pub fn cell_orientation() -> impl Strategy<Value = CellOrientation> {
    prop_oneof![Just(CellOrientation::Reference), Just(CellOrientation::Flipped)]
}
