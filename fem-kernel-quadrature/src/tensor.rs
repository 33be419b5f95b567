//! Tensor-product Gauss rules on the reference quadrilateral $[0, 1]^2$ and hexahedron $[0, 1]^3$.

use crate::univariate::gauss;
use crate::{num_gauss_points_for_degree, Rule};

/// Forms the D-fold tensor product of a one-dimensional rule.
///
/// The first coordinate varies slowest.
fn tensor_product<const D: usize>(rule_1d: &Rule<1>) -> Rule<D> {
    let (weights_1d, points_1d) = rule_1d;
    let n = weights_1d.len();
    let total = n.pow(D as u32);

    let mut weights = Vec::with_capacity(total);
    let mut points = Vec::with_capacity(total);
    for linear_index in 0..total {
        let mut point = [0.0; D];
        let mut weight = 1.0;
        let mut remainder = linear_index;
        for axis in (0..D).rev() {
            let i = remainder % n;
            remainder /= n;
            point[axis] = points_1d[i][0];
            weight *= weights_1d[i];
        }
        weights.push(weight);
        points.push(point);
    }
    (weights, points)
}

/// A Gauss rule for the reference quadrilateral with the given number of points per axis.
pub fn quadrilateral_gauss(num_points_per_dim: usize) -> Rule<2> {
    tensor_product(&gauss(num_points_per_dim))
}

/// A Gauss rule for the reference hexahedron with the given number of points per axis.
pub fn hexahedron_gauss(num_points_per_dim: usize) -> Rule<3> {
    tensor_product(&gauss(num_points_per_dim))
}

/// The quadrilateral Gauss rule exact for polynomials of the given degree in each variable.
pub fn quadrilateral_gauss_for_degree(degree: usize) -> Rule<2> {
    quadrilateral_gauss(num_gauss_points_for_degree(degree))
}

/// The hexahedron Gauss rule exact for polynomials of the given degree in each variable.
pub fn hexahedron_gauss_for_degree(degree: usize) -> Rule<3> {
    hexahedron_gauss(num_gauss_points_for_degree(degree))
}
