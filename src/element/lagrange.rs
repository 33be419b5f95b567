//! Lagrange elements: $P_k$ on simplices, $Q_k$ on quadrilaterals and hexahedra.
use crate::cell::CellShape;
use crate::element::ciarlet::{CiarletDefinition, CiarletElement};
use crate::element::{ElementFamily, EntityDofs, MapKind};
use crate::error::FormError;
use crate::polynomial::MonomialSet;
use fem_kernel_traits::Real;
use nalgebra::DMatrix;

/// Equispaced nodes of degree `degree`, ordered by the entity they belong to: vertices, then
/// edge interiors, face interiors and finally the cell interior, each in UFC entity order.
///
/// Degree zero yields the cell midpoint.
fn lattice_nodes(cell: CellShape, degree: usize) -> Vec<(usize, usize, Vec<f64>)> {
    let tdim = cell.topological_dimension();
    let coords = cell.reference_vertices();
    if degree == 0 {
        let midpoint = cell.reference_midpoint::<f64>();
        return vec![(tdim, 0, midpoint)];
    }

    let k = degree as f64;
    // v0 + sum_m s_m (v_m - v0)
    let combine = |vertices: &[usize], steps: &[(usize, usize)]| -> Vec<f64> {
        let v0 = coords[vertices[0]];
        (0..tdim)
            .map(|i| {
                steps.iter().fold(v0[i], |acc, &(m, s)| {
                    acc + (s as f64 / k) * (coords[vertices[m]][i] - v0[i])
                })
            })
            .collect()
    };

    let mut nodes = Vec::new();
    for d in 0..=tdim {
        for (e, vertices) in cell.entity_vertices(d).iter().enumerate() {
            let mut push = |point| nodes.push((d, e, point));
            match (d, vertices.len()) {
                (0, _) => push(coords[vertices[0]].to_vec()),
                (1, _) => (1..degree).for_each(|i| push(combine(vertices, &[(1, i)]))),
                (2, 3) => {
                    for j in 1..degree {
                        for i in 1..degree - j {
                            push(combine(vertices, &[(1, i), (2, j)]));
                        }
                    }
                }
                (2, _) => {
                    for j in 1..degree {
                        for i in 1..degree {
                            push(combine(vertices, &[(1, i), (2, j)]));
                        }
                    }
                }
                (3, 4) => {
                    for l in 1..degree {
                        for j in 1..degree - l {
                            for i in 1..degree - j - l {
                                push(combine(vertices, &[(1, i), (2, j), (3, l)]));
                            }
                        }
                    }
                }
                _ => {
                    for l in 1..degree {
                        for j in 1..degree {
                            for i in 1..degree {
                                push(combine(vertices, &[(1, i), (2, j), (4, l)]));
                            }
                        }
                    }
                }
            }
        }
    }
    nodes
}

pub(crate) fn nodal_definition<T: Real>(
    family: ElementFamily,
    cell: CellShape,
    degree: usize,
    discontinuous: bool,
) -> Result<CiarletDefinition<T>, FormError> {
    let tdim = cell.topological_dimension();
    let nodes = lattice_nodes(cell, degree);
    let polynomials = if cell.is_simplex() {
        MonomialSet::total_degree(tdim, degree)
    } else {
        MonomialSet::tensor_degree(tdim, degree)
    };
    debug_assert_eq!(nodes.len(), polynomials.len());

    let mut entity_dofs = EntityDofs::new(cell);
    let mut points = Vec::with_capacity(nodes.len() * tdim);
    for (dof, (d, e, point)) in nodes.iter().enumerate() {
        if discontinuous {
            entity_dofs.push(tdim, 0, dof);
        } else {
            entity_dofs.push(*d, *e, dof);
        }
        points.extend(point.iter().map(|&x| T::from_constant(x)));
    }

    let n = nodes.len();
    Ok(CiarletDefinition {
        family,
        cell,
        degree,
        geometric_dimension: tdim,
        mapping: MapKind::Identity,
        reference_value_shape: Vec::new(),
        value_shape: Vec::new(),
        polynomials,
        spanning_set: DMatrix::identity(n, n),
        points,
        interpolation: DMatrix::identity(n, n),
        entity_dofs,
        point_evaluation: true,
    })
}

impl<T: Real> CiarletElement<T> {
    /// The continuous Lagrange element of degree `degree >= 1`.
    pub fn lagrange(cell: CellShape, degree: usize) -> Result<Self, FormError> {
        if degree == 0 {
            return Err(FormError::invalid_argument(
                "continuous Lagrange elements require degree at least 1",
            ));
        }
        Self::from_definition(nodal_definition(ElementFamily::Lagrange, cell, degree, false)?)
    }

    /// The discontinuous Lagrange element. All dofs belong to the cell interior.
    pub fn discontinuous_lagrange(cell: CellShape, degree: usize) -> Result<Self, FormError> {
        Self::from_definition(nodal_definition(ElementFamily::DiscontinuousLagrange, cell, degree, true)?)
    }

    /// A single global constant.
    pub fn real(cell: CellShape) -> Result<Self, FormError> {
        Self::from_definition(nodal_definition(ElementFamily::Real, cell, 0, true)?)
    }
}
