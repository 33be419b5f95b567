//! Pushforward of reference basis values and derivatives to physical cells.
//!
//! For affine cells the physical derivative of order `n` is the reference derivative contracted
//! with $K$ along each of its `n` axes. On non-affine cells the chain rule also involves the
//! higher derivatives of the coordinate field, and for Piola maps the derivatives of the Piola
//! factor. Both are handled exactly by composing truncated Taylor expansions ([`Jet`]s): the
//! local inverse map $\xi(h)$ with $x(X_q + \xi) = x_q + h$ is expanded through the fixed point
//! iteration $\xi \leftarrow K (h - N(\xi))$, where $N$ collects the terms of order two and
//! higher of the coordinate field.
use crate::cell::CellOrientation;
use crate::coordinate_map::{CoordinateMapping, GeometryTable};
use crate::element::{check_derivative_order, BasisTable, MapKind, ReferenceElement};
use crate::error::{check_len, FormError};
use crate::jet::{Jet, MultiIndexSet};
use crate::polynomial::{derivative_counts, derivative_index, num_derivatives};
use fem_kernel_traits::Real;
use std::sync::Arc;

/// Pushes the reference table forward with the given mapping, for derivative orders
/// `0..=order`.
///
/// `value_size` is the number of physical components. Mixed mappings must be pushed forward
/// per sub-element, see [`ReferenceElement::transform_reference_basis_derivatives`].
pub fn push_forward<T: Real>(
    mapping: MapKind,
    reference: &BasisTable<T>,
    geometry: &GeometryTable<T>,
    order: usize,
    value_size: usize,
) -> Result<BasisTable<T>, FormError> {
    check_derivative_order(order)?;
    let (tdim, gdim) = (geometry.topological_dimension(), geometry.geometric_dimension());
    if reference.dim() != tdim || reference.num_points() != geometry.num_points() {
        return Err(FormError::invalid_argument(
            "reference table does not match the points of the geometry table",
        ));
    }
    if reference.max_order() < order || geometry.supported_order() < order {
        return Err(FormError::invalid_argument(format!(
            "derivatives of order {} were not tabulated",
            order
        )));
    }
    let reference_value_size = reference.value_size();
    let compatible = match mapping {
        MapKind::Identity => value_size == reference_value_size,
        MapKind::ContravariantPiola | MapKind::CovariantPiola => reference_value_size == tdim && value_size == gdim,
        MapKind::Mixed => {
            return Err(FormError::invalid_argument(
                "mixed elements are pushed forward per sub-element",
            ))
        }
    };
    if !compatible {
        return Err(FormError::invalid_argument(format!(
            "value sizes {} (reference) and {} (physical) are incompatible with {:?}",
            reference_value_size, value_size, mapping
        )));
    }

    let mut physical = BasisTable::zeros(gdim, order, reference.num_points(), reference.num_dofs(), value_size);
    let first_order_exact = order == 0 || (order == 1 && mapping == MapKind::Identity);
    if geometry.is_affine() || first_order_exact {
        for q in 0..geometry.num_points() {
            push_forward_point_affine(mapping, reference, geometry, q, order, &mut physical);
        }
    } else {
        let chain_rule = ChainRule::new(tdim, gdim, order);
        for q in 0..geometry.num_points() {
            chain_rule.push_forward_point(mapping, reference, geometry, q, &mut physical);
        }
    }
    Ok(physical)
}

/// The Piola factor $M$ with $v = M V$ at point `q`, `[value_size][tdim]`.
fn piola_matrix<T: Real>(mapping: MapKind, geometry: &GeometryTable<T>, q: usize) -> Option<Vec<T>> {
    let (tdim, gdim) = (geometry.topological_dimension(), geometry.geometric_dimension());
    match mapping {
        MapKind::ContravariantPiola => {
            let det = geometry.determinant(q);
            Some(geometry.jacobian(q).iter().map(|&j| j / det).collect())
        }
        MapKind::CovariantPiola => {
            let k = geometry.inverse(q);
            Some((0..gdim * tdim).map(|idx| k[(idx % tdim) * gdim + idx / tdim]).collect())
        }
        _ => None,
    }
}

fn push_forward_point_affine<T: Real>(
    mapping: MapKind,
    reference: &BasisTable<T>,
    geometry: &GeometryTable<T>,
    q: usize,
    order: usize,
    physical: &mut BasisTable<T>,
) {
    let (tdim, gdim) = (geometry.topological_dimension(), geometry.geometric_dimension());
    let k = geometry.inverse(q);
    let m = piola_matrix(mapping, geometry, q);
    let nc = reference.value_size();

    for n in 0..=order {
        for dof in 0..reference.num_dofs() {
            // Replace the reference axes by physical axes one at a time
            let mut current = reference.dof_block(n, q, dof).to_vec();
            for axis in 0..n {
                let outer = num_derivatives(gdim, axis);
                let inner = num_derivatives(tdim, n - axis - 1) * nc;
                let mut next = vec![T::zero(); outer * gdim * inner];
                for p in 0..outer {
                    for i in 0..gdim {
                        for a in 0..tdim {
                            let factor = k[a * gdim + i];
                            let source = &current[(p * tdim + a) * inner..(p * tdim + a + 1) * inner];
                            let target = &mut next[(p * gdim + i) * inner..(p * gdim + i + 1) * inner];
                            for (t, &s) in target.iter_mut().zip(source) {
                                *t += factor * s;
                            }
                        }
                    }
                }
                current = next;
            }

            let out = physical.dof_block_mut(n, q, dof);
            match &m {
                None => out.copy_from_slice(&current),
                Some(m) => {
                    for (out_d, cur_d) in out.chunks_exact_mut(gdim).zip(current.chunks_exact(tdim)) {
                        for i in 0..gdim {
                            out_d[i] = (0..tdim).fold(T::zero(), |acc, a| acc + m[i * tdim + a] * cur_d[a]);
                        }
                    }
                }
            }
        }
    }
}

/// Exact chain rule through a non-affine coordinate map.
struct ChainRule {
    tdim: usize,
    gdim: usize,
    order: usize,
    physical_set: Arc<MultiIndexSet>,
    reference_set: MultiIndexSet,
    /// For each reference multi-index: the multi-index with one fewer power and the axis removed.
    predecessors: Vec<(usize, usize)>,
}

impl ChainRule {
    fn new(tdim: usize, gdim: usize, order: usize) -> Self {
        let reference_set = MultiIndexSet::new(tdim, order);
        let predecessors = reference_set
            .indices()
            .iter()
            .map(|beta| match beta.iter().position(|&b| b > 0) {
                Some(axis) => {
                    let mut previous = *beta;
                    previous[axis] -= 1;
                    (reference_set.index_of(previous).unwrap_or(0), axis)
                }
                None => (0, 0),
            })
            .collect();
        Self {
            tdim,
            gdim,
            order,
            physical_set: Arc::new(MultiIndexSet::new(gdim, order)),
            reference_set,
            predecessors,
        }
    }

    fn degree(beta: &[usize; 3]) -> usize {
        beta.iter().sum()
    }

    /// All powers $\xi^\beta / \beta!$ of the reference displacement.
    fn scaled_powers<T: Real>(&self, xi: &[Jet<T>]) -> Vec<Jet<T>> {
        let mut powers: Vec<Jet<T>> = Vec::with_capacity(self.reference_set.len());
        powers.push(Jet::constant(&self.physical_set, T::one()));
        for idx in 1..self.reference_set.len() {
            let (previous, axis) = self.predecessors[idx];
            let power = powers[previous].mul(&xi[axis]);
            powers.push(power);
        }
        for (idx, power) in powers.iter_mut().enumerate() {
            *power = power.scale(T::one() / T::from_constant(self.reference_set.factorial(idx)));
        }
        powers
    }

    /// Taylor expansion of a coordinate derivative about the point, $\sum_\beta D^{\beta + \gamma}
    /// x_g \, \xi^\beta / \beta!$, truncated so that only tabulated derivatives are used.
    fn expand_coordinate<T: Real>(
        &self,
        geometry: &GeometryTable<T>,
        q: usize,
        g: usize,
        gamma: [usize; 3],
        min_degree: usize,
        powers: &[Jet<T>],
    ) -> Jet<T> {
        let mut jet = Jet::zero(&self.physical_set);
        let gamma_degree = Self::degree(&gamma);
        for (idx, beta) in self.reference_set.indices().iter().enumerate() {
            let degree = Self::degree(beta);
            if degree < min_degree || degree + gamma_degree > self.order + 1 {
                continue;
            }
            let alpha = [beta[0] + gamma[0], beta[1] + gamma[1], beta[2] + gamma[2]];
            let n = degree + gamma_degree;
            let derivative = geometry.coordinate_derivative(n, q, g, derivative_index(self.tdim, &alpha));
            jet.add_scaled(derivative, &powers[idx]);
        }
        jet
    }

    /// Taylor expansion of $\xi(h)$.
    fn inverse_map<T: Real>(&self, geometry: &GeometryTable<T>, q: usize) -> Vec<Jet<T>> {
        let (tdim, gdim) = (self.tdim, self.gdim);
        let k = geometry.inverse(q);
        let h: Vec<Jet<T>> = (0..gdim).map(|g| Jet::variable(&self.physical_set, g)).collect();
        let apply_k = |rhs: &[Jet<T>]| -> Vec<Jet<T>> {
            (0..tdim)
                .map(|a| {
                    let mut jet = Jet::zero(&self.physical_set);
                    for g in 0..gdim {
                        jet.add_scaled(k[a * gdim + g], &rhs[g]);
                    }
                    jet
                })
                .collect()
        };

        let mut xi = apply_k(&h);
        // Each iteration fixes one more order
        for _ in 1..self.order {
            let powers = self.scaled_powers(&xi);
            let rhs: Vec<Jet<T>> = (0..gdim)
                .map(|g| h[g].sub(&self.expand_coordinate(geometry, q, g, [0; 3], 2, &powers)))
                .collect();
            xi = apply_k(&rhs);
        }
        xi
    }

    /// The Piola factor as jets, `[gdim][tdim]`.
    fn piola_jets<T: Real>(
        &self,
        mapping: MapKind,
        geometry: &GeometryTable<T>,
        q: usize,
        powers: &[Jet<T>],
    ) -> Option<Vec<Jet<T>>> {
        let (tdim, gdim) = (self.tdim, self.gdim);
        if mapping == MapKind::Identity {
            return None;
        }
        let mut j = Vec::with_capacity(gdim * tdim);
        for g in 0..gdim {
            for t in 0..tdim {
                let mut gamma = [0; 3];
                gamma[t] = 1;
                j.push(self.expand_coordinate(geometry, q, g, gamma, 0, powers));
            }
        }

        let square = gdim == tdim;
        // Metric tensor J^T J on manifolds
        let metric: Vec<Jet<T>> = if square {
            Vec::new()
        } else {
            let mut metric = Vec::with_capacity(tdim * tdim);
            for a in 0..tdim {
                for b in 0..tdim {
                    let mut entry = Jet::zero(&self.physical_set);
                    for g in 0..gdim {
                        entry = entry.add(&j[g * tdim + a].mul(&j[g * tdim + b]));
                    }
                    metric.push(entry);
                }
            }
            metric
        };

        let m = match mapping {
            MapKind::ContravariantPiola => {
                let det = if square {
                    determinant(&j, tdim)
                } else {
                    determinant(&metric, tdim)
                        .sqrt()
                        .scale(geometry.orientation().sign::<T>())
                };
                let det_inv = det.recip();
                j.iter().map(|entry| entry.mul(&det_inv)).collect()
            }
            _ => {
                // M = K^T
                let (source, n) = if square { (&j, tdim) } else { (&metric, tdim) };
                let det_inv = determinant(source, n).recip();
                let adj = adjugate(source, n);
                let mut m = vec![Jet::zero(&self.physical_set); gdim * tdim];
                for i in 0..gdim {
                    for a in 0..tdim {
                        let k_ai = if square {
                            adj[a * tdim + i].mul(&det_inv)
                        } else {
                            let mut entry = Jet::zero(&self.physical_set);
                            for b in 0..tdim {
                                entry = entry.add(&adj[a * tdim + b].mul(&j[i * tdim + b]));
                            }
                            entry.mul(&det_inv)
                        };
                        m[i * tdim + a] = k_ai;
                    }
                }
                m
            }
        };
        Some(m)
    }

    fn push_forward_point<T: Real>(
        &self,
        mapping: MapKind,
        reference: &BasisTable<T>,
        geometry: &GeometryTable<T>,
        q: usize,
        physical: &mut BasisTable<T>,
    ) {
        let (tdim, gdim, order) = (self.tdim, self.gdim, self.order);
        let xi = self.inverse_map(geometry, q);
        let powers = self.scaled_powers(&xi);
        let piola = self.piola_jets(mapping, geometry, q, &powers);

        let reference_indices: Vec<(usize, usize)> = self
            .reference_set
            .indices()
            .iter()
            .map(|beta| (Self::degree(beta), derivative_index(tdim, beta)))
            .collect();
        let physical_indices: Vec<Vec<[usize; 3]>> = (0..=order)
            .map(|n| {
                (0..num_derivatives(gdim, n))
                    .map(|d| derivative_counts(gdim, n, d))
                    .collect()
            })
            .collect();

        let nc = reference.value_size();
        for dof in 0..reference.num_dofs() {
            let reference_jets: Vec<Jet<T>> = (0..nc)
                .map(|c| {
                    let mut jet = Jet::zero(&self.physical_set);
                    for (idx, &(n, d)) in reference_indices.iter().enumerate() {
                        jet.add_scaled(reference.get(n, q, dof, d, c), &powers[idx]);
                    }
                    jet
                })
                .collect();

            let physical_jets = match &piola {
                None => reference_jets,
                Some(m) => (0..gdim)
                    .map(|i| {
                        let mut jet = Jet::zero(&self.physical_set);
                        for a in 0..tdim {
                            jet = jet.add(&m[i * tdim + a].mul(&reference_jets[a]));
                        }
                        jet
                    })
                    .collect(),
            };

            for (n, counts) in physical_indices.iter().enumerate() {
                for (d, alpha) in counts.iter().enumerate() {
                    for (c, jet) in physical_jets.iter().enumerate() {
                        *physical.get_mut(n, q, dof, d, c) = jet.derivative(*alpha);
                    }
                }
            }
        }
    }
}

fn determinant<T: Real>(m: &[Jet<T>], n: usize) -> Jet<T> {
    match n {
        1 => m[0].clone(),
        2 => m[0].mul(&m[3]).sub(&m[1].mul(&m[2])),
        _ => {
            let adj = adjugate(m, 3);
            m[0].mul(&adj[0]).add(&m[1].mul(&adj[3])).add(&m[2].mul(&adj[6]))
        }
    }
}

/// Adjugate of a row-major `n x n` matrix of jets, `n <= 3`.
fn adjugate<T: Real>(m: &[Jet<T>], n: usize) -> Vec<Jet<T>> {
    let cross = |a: usize, b: usize, c: usize, d: usize| m[a].mul(&m[b]).sub(&m[c].mul(&m[d]));
    match n {
        1 => vec![Jet::constant(m[0].set(), T::one())],
        2 => vec![m[3].clone(), m[1].scale(-T::one()), m[2].scale(-T::one()), m[0].clone()],
        _ => vec![
            cross(4, 8, 5, 7),
            cross(2, 7, 1, 8),
            cross(1, 5, 2, 4),
            cross(5, 6, 3, 8),
            cross(0, 8, 2, 6),
            cross(2, 3, 0, 5),
            cross(3, 7, 4, 6),
            cross(1, 6, 0, 7),
            cross(0, 4, 1, 3),
        ],
    }
}

/// Evaluates physical basis derivatives of total order `order` at physical points.
///
/// The points are mapped back to the reference cell with the inverse coordinate map, so this
/// may fail with [`FormError::NonConvergence`] on non-affine cells. Points outside the cell are
/// rejected with [`FormError::InvalidArgument`]. The output layout is
/// `values[point][dof][derivative(gdim^order)][component]`.
pub fn evaluate_physical_basis_derivatives<T: Real>(
    element: &dyn ReferenceElement<T>,
    values: &mut [T],
    order: usize,
    x: &[T],
    coordinate_dofs: &[T],
    orientation: CellOrientation,
    coordinate_mapping: &CoordinateMapping<T>,
) -> Result<(), FormError> {
    check_derivative_order(order)?;
    let (tdim, gdim) = (
        coordinate_mapping.topological_dimension(),
        coordinate_mapping.geometric_dimension(),
    );
    let num_points = x.len() / gdim;
    check_len("x", x.len(), num_points * gdim)?;
    check_len(
        "values",
        values.len(),
        num_points * element.space_dimension() * num_derivatives(gdim, order) * element.value_size(),
    )?;

    let mut points = vec![T::zero(); num_points * tdim];
    coordinate_mapping.compute_reference_coordinates_in_cell(&mut points, x, coordinate_dofs, orientation)?;
    let geometry = coordinate_mapping.tabulate_geometry(&points, order, coordinate_dofs, orientation)?;
    let reference = element.tabulate_reference_basis(order, &points);
    let physical = element.transform_reference_basis_derivatives(&reference, &geometry, order)?;
    values.copy_from_slice(physical.order(order));
    Ok(())
}
