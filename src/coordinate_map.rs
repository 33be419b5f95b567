//! Mapping between reference and physical cell coordinates.
//!
//! The coordinate field of a cell is $x(X) = \sum_k x_k \phi_k(X)$, where $\phi_k$ are the basis
//! functions of a scalar Lagrange element and $x_k$ the coordinate dofs, given row-major as
//! `coordinate_dofs[dof][gdim]`. Buffer layouts are `X[point][tdim]`, `x[point][gdim]`,
//! `J[point][gdim][tdim]` and `K[point][tdim][gdim]`.
use crate::cell::{CellOrientation, CellShape};
use crate::dofmap::{dofmap_for_element, DofMap};
use crate::element::{check_reference_points, CiarletElement, MixedElement, ReferenceElement};
use crate::error::{check_len, FormError};
use crate::optimize::calculus::{JacobianSolveError, VectorFunctionBuilder};
use crate::optimize::newton::{newton, newton_line_search, BacktrackingLineSearch, NewtonError, NewtonSettings};
use crate::polynomial::num_derivatives;
use fem_kernel_traits::Real;
use itertools::izip;
use log::{debug, trace, warn};
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::sync::Arc;

/// Settings for the Newton iteration of the non-affine inverse map.
///
/// The iteration starts at the reference midpoint. On square cells it solves
/// $x(X) - x = 0$ and stops once $|x(X) - x| \leq \mathrm{tolerance} \cdot h$, with $h$ the largest
/// distance between two coordinate dofs. On manifold cells it performs Gauss-Newton steps on
/// $J^T (x(X) - x) = 0$ with tolerance $\mathrm{tolerance} \cdot h^2$, which yields the
/// least-squares projection onto the cell.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InverseMapSettings {
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Retry a failed iteration with a backtracking line search.
    pub line_search: bool,
}

impl Default for InverseMapSettings {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            tolerance: 1e-12,
            line_search: false,
        }
    }
}

/// Geometry of a cell tabulated at a set of reference points.
///
/// Besides $x$, $J$, $\det J$ and $K$, non-affine tables carry the derivatives of the coordinate
/// field of orders `2..=order + 1`, which the pushforward of derivatives of order `order` needs.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryTable<T> {
    tdim: usize,
    gdim: usize,
    num_points: usize,
    order: usize,
    affine: bool,
    orientation: CellOrientation,
    points: Vec<T>,
    jacobians: Vec<T>,
    determinants: Vec<T>,
    inverses: Vec<T>,
    /// `higher_derivatives[n - 2]` has layout `[point][gdim][derivative(tdim^n)]`.
    higher_derivatives: Vec<Vec<T>>,
}

impl<T: Real> GeometryTable<T> {
    /// Assembles a table for an affine cell from precomputed geometry.
    ///
    /// Affine tables support pushforward of any derivative order.
    pub fn affine(
        tdim: usize,
        gdim: usize,
        x: Vec<T>,
        jacobians: Vec<T>,
        determinants: Vec<T>,
        inverses: Vec<T>,
        orientation: CellOrientation,
    ) -> Result<Self, FormError> {
        let num_points = determinants.len();
        check_len("x", x.len(), num_points * gdim)?;
        check_len("J", jacobians.len(), num_points * gdim * tdim)?;
        check_len("K", inverses.len(), num_points * gdim * tdim)?;
        Ok(Self {
            tdim,
            gdim,
            num_points,
            order: usize::MAX,
            affine: true,
            orientation,
            points: x,
            jacobians,
            determinants,
            inverses,
            higher_derivatives: Vec::new(),
        })
    }

    pub fn topological_dimension(&self) -> usize {
        self.tdim
    }

    pub fn geometric_dimension(&self) -> usize {
        self.gdim
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Highest derivative order the table supports in a pushforward.
    pub fn supported_order(&self) -> usize {
        self.order
    }

    pub fn is_affine(&self) -> bool {
        self.affine
    }

    pub fn orientation(&self) -> CellOrientation {
        self.orientation
    }

    /// Physical coordinates `x[point][gdim]`.
    pub fn physical_points(&self) -> &[T] {
        &self.points
    }

    pub fn point(&self, q: usize) -> &[T] {
        &self.points[q * self.gdim..(q + 1) * self.gdim]
    }

    pub fn jacobians(&self) -> &[T] {
        &self.jacobians
    }

    /// $J$ at point `q`, `[gdim][tdim]`.
    pub fn jacobian(&self, q: usize) -> &[T] {
        let n = self.gdim * self.tdim;
        &self.jacobians[q * n..(q + 1) * n]
    }

    pub fn determinants(&self) -> &[T] {
        &self.determinants
    }

    pub fn determinant(&self, q: usize) -> T {
        self.determinants[q]
    }

    pub fn inverses(&self) -> &[T] {
        &self.inverses
    }

    /// $K$ at point `q`, `[tdim][gdim]`.
    pub fn inverse(&self, q: usize) -> &[T] {
        let n = self.gdim * self.tdim;
        &self.inverses[q * n..(q + 1) * n]
    }

    /// The derivative of order `order >= 1` of coordinate component `g` at point `q`, for the
    /// derivative tuple with index `derivative`.
    pub fn coordinate_derivative(&self, order: usize, q: usize, g: usize, derivative: usize) -> T {
        match order {
            0 => self.point(q)[g],
            1 => self.jacobian(q)[g * self.tdim + derivative],
            _ if self.affine => T::zero(),
            _ => {
                let nd = num_derivatives(self.tdim, order);
                self.higher_derivatives[order - 2][(q * self.gdim + g) * nd + derivative]
            }
        }
    }
}

/// Determinant of `J[gdim][tdim]`: signed for square matrices, and
/// $\pm\sqrt{\det(J^T J)}$ with the sign of the orientation for manifold cells.
pub fn jacobian_determinant<T: Real>(jacobian: &[T], gdim: usize, tdim: usize, orientation: CellOrientation) -> T {
    let j = DMatrix::from_row_slice(gdim, tdim, jacobian);
    if gdim == tdim {
        j.determinant()
    } else {
        orientation.sign::<T>() * (j.transpose() * &j).determinant().sqrt()
    }
}

/// Writes the inverse `K[tdim][gdim]` of `J[gdim][tdim]`, or the pseudo-inverse
/// $(J^T J)^{-1} J^T$ for manifold cells.
pub fn jacobian_inverse<T: Real>(
    inverse: &mut [T],
    jacobian: &[T],
    determinant: T,
    gdim: usize,
    tdim: usize,
) -> Result<(), FormError> {
    check_len("K", inverse.len(), gdim * tdim)?;
    if determinant == T::zero() {
        return Err(FormError::invalid_argument("degenerate cell: the Jacobian determinant is zero"));
    }
    let j = DMatrix::from_row_slice(gdim, tdim, jacobian);
    let k = if gdim == tdim {
        j.try_inverse()
    } else {
        (j.transpose() * &j).try_inverse().map(|m| m * j.transpose())
    }
    .ok_or_else(|| FormError::invalid_argument("degenerate cell: the Jacobian is singular"))?;
    for a in 0..tdim {
        for i in 0..gdim {
            inverse[a * gdim + i] = k[(a, i)];
        }
    }
    Ok(())
}

/// The coordinate mapping of cells with a Lagrange coordinate field.
#[derive(Debug, Clone)]
pub struct CoordinateMapping<T> {
    signature: String,
    element: Arc<dyn ReferenceElement<T>>,
    gdim: usize,
    settings: InverseMapSettings,
}

impl<T: Real> CoordinateMapping<T> {
    /// A coordinate mapping with the given scalar element as coordinate field.
    pub fn new(element: Arc<dyn ReferenceElement<T>>, gdim: usize) -> Result<Self, FormError> {
        let tdim = element.topological_dimension();
        if element.value_rank() != 0 || !element.has_reference_dof_coordinates() {
            return Err(FormError::invalid_argument(format!(
                "coordinate fields require a scalar nodal element, got {}",
                element.signature()
            )));
        }
        if gdim < tdim || gdim > 3 {
            return Err(FormError::invalid_argument(format!(
                "geometric dimension {} is incompatible with topological dimension {}",
                gdim, tdim
            )));
        }
        let signature = format!("CoordinateMapping({}, gdim={})", element.signature(), gdim);
        Ok(Self {
            signature,
            element,
            gdim,
            settings: InverseMapSettings::default(),
        })
    }

    /// The Lagrange coordinate mapping of the given degree.
    pub fn lagrange(cell: CellShape, degree: usize, gdim: usize) -> Result<Self, FormError> {
        let element = CiarletElement::lagrange(cell, degree)?.with_geometric_dimension(gdim)?;
        Self::new(Arc::new(element), gdim)
    }

    pub fn with_inverse_map_settings(self, settings: InverseMapSettings) -> Self {
        Self { settings, ..self }
    }

    pub fn inverse_map_settings(&self) -> &InverseMapSettings {
        &self.settings
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn cell_shape(&self) -> CellShape {
        self.element.cell_shape()
    }

    pub fn topological_dimension(&self) -> usize {
        self.element.topological_dimension()
    }

    pub fn geometric_dimension(&self) -> usize {
        self.gdim
    }

    pub fn degree(&self) -> usize {
        self.element.degree()
    }

    /// Number of coordinate dofs (nodes) per cell.
    pub fn num_coordinate_dofs(&self) -> usize {
        self.element.space_dimension()
    }

    /// Whether the map from reference to physical coordinates is affine.
    pub fn is_affine(&self) -> bool {
        self.cell_shape().is_simplex() && self.degree() == 1
    }

    /// The scalar element of the coordinate field.
    pub fn scalar_element(&self) -> &Arc<dyn ReferenceElement<T>> {
        &self.element
    }

    /// The vector-valued element of the coordinate field.
    pub fn create_coordinate_finite_element(&self) -> Result<Arc<dyn ReferenceElement<T>>, FormError> {
        Ok(Arc::new(MixedElement::vector(Arc::clone(&self.element), self.gdim)?))
    }

    pub fn create_coordinate_dofmap(&self) -> Result<Arc<dyn DofMap>, FormError> {
        Ok(dofmap_for_element(self.create_coordinate_finite_element()?.as_ref()))
    }

    fn check_coordinate_dofs(&self, coordinate_dofs: &[T]) -> Result<(), FormError> {
        check_len(
            "coordinate_dofs",
            coordinate_dofs.len(),
            self.num_coordinate_dofs() * self.gdim,
        )
    }

    fn num_points(&self, name: &str, len: usize, dim: usize) -> Result<usize, FormError> {
        if len % dim == 0 {
            Ok(len / dim)
        } else {
            Err(FormError::invalid_argument(format!(
                "buffer `{}` has length {}, which is not a multiple of {}",
                name, len, dim
            )))
        }
    }

    /// Contracts the coordinate dofs with derivatives of order `order` of the basis.
    fn contract(&self, table: &crate::element::BasisTable<T>, order: usize, coordinate_dofs: &[T], out: &mut [T]) {
        let nd = table.num_derivatives(order);
        let num_dofs = self.num_coordinate_dofs();
        for q in 0..table.num_points() {
            for g in 0..self.gdim {
                for d in 0..nd {
                    out[(q * self.gdim + g) * nd + d] = (0..num_dofs).fold(T::zero(), |acc, k| {
                        acc + coordinate_dofs[k * self.gdim + g] * table.get(order, q, k, d, 0)
                    });
                }
            }
        }
    }

    /// $x$ and $J$ at a single reference point, without validation.
    fn evaluate_point(&self, point: &[T], coordinate_dofs: &[T]) -> (Vec<T>, Vec<T>) {
        let table = self.element.tabulate_reference_basis(1, point);
        let mut x = vec![T::zero(); self.gdim];
        let mut j = vec![T::zero(); self.gdim * self.topological_dimension()];
        self.contract(&table, 0, coordinate_dofs, &mut x);
        self.contract(&table, 1, coordinate_dofs, &mut j);
        (x, j)
    }

    /// Tabulates the geometry at reference points, with the coordinate derivatives needed to
    /// push forward derivatives up to `order`.
    pub fn tabulate_geometry(
        &self,
        points: &[T],
        order: usize,
        coordinate_dofs: &[T],
        orientation: CellOrientation,
    ) -> Result<GeometryTable<T>, FormError> {
        self.check_coordinate_dofs(coordinate_dofs)?;
        let (tdim, gdim) = (self.topological_dimension(), self.gdim);
        let num_points = self.num_points("X", points.len(), tdim)?;
        let affine = self.is_affine();
        let max_coordinate_order = if affine { 1 } else { order + 1 };

        let table = self.element.tabulate_reference_basis(max_coordinate_order, points);
        let mut x = vec![T::zero(); num_points * gdim];
        let mut jacobians = vec![T::zero(); num_points * gdim * tdim];
        self.contract(&table, 0, coordinate_dofs, &mut x);
        self.contract(&table, 1, coordinate_dofs, &mut jacobians);
        let higher_derivatives = (2..=max_coordinate_order)
            .map(|n| {
                let mut derivatives = vec![T::zero(); num_points * gdim * num_derivatives(tdim, n)];
                self.contract(&table, n, coordinate_dofs, &mut derivatives);
                derivatives
            })
            .collect();

        let mut determinants = vec![T::zero(); num_points];
        let mut inverses = vec![T::zero(); num_points * gdim * tdim];
        for q in 0..num_points {
            let j = &jacobians[q * gdim * tdim..(q + 1) * gdim * tdim];
            determinants[q] = jacobian_determinant(j, gdim, tdim, orientation);
            jacobian_inverse(
                &mut inverses[q * gdim * tdim..(q + 1) * gdim * tdim],
                j,
                determinants[q],
                gdim,
                tdim,
            )?;
        }

        Ok(GeometryTable {
            tdim,
            gdim,
            num_points,
            order: if affine { usize::MAX } else { order },
            affine,
            orientation,
            points: x,
            jacobians,
            determinants,
            inverses,
            higher_derivatives,
        })
    }

    /// Computes `x[point][gdim]` from `X[point][tdim]`.
    pub fn compute_physical_coordinates(&self, x: &mut [T], points: &[T], coordinate_dofs: &[T]) -> Result<(), FormError> {
        self.check_coordinate_dofs(coordinate_dofs)?;
        let num_points = self.num_points("X", points.len(), self.topological_dimension())?;
        check_len("x", x.len(), num_points * self.gdim)?;
        let table = self.element.tabulate_reference_basis(0, points);
        self.contract(&table, 0, coordinate_dofs, x);
        Ok(())
    }

    /// Computes `J[point][gdim][tdim]` at `X[point][tdim]`.
    pub fn compute_jacobians(&self, jacobians: &mut [T], points: &[T], coordinate_dofs: &[T]) -> Result<(), FormError> {
        self.check_coordinate_dofs(coordinate_dofs)?;
        let tdim = self.topological_dimension();
        let num_points = self.num_points("X", points.len(), tdim)?;
        check_len("J", jacobians.len(), num_points * self.gdim * tdim)?;
        let table = self.element.tabulate_reference_basis(1, points);
        self.contract(&table, 1, coordinate_dofs, jacobians);
        Ok(())
    }

    pub fn compute_jacobian_determinants(
        &self,
        determinants: &mut [T],
        jacobians: &[T],
        orientation: CellOrientation,
    ) -> Result<(), FormError> {
        let n = self.gdim * self.topological_dimension();
        let num_points = self.num_points("J", jacobians.len(), n)?;
        check_len("detJ", determinants.len(), num_points)?;
        for (det, j) in determinants.iter_mut().zip(jacobians.chunks_exact(n)) {
            *det = jacobian_determinant(j, self.gdim, self.topological_dimension(), orientation);
        }
        Ok(())
    }

    pub fn compute_jacobian_inverses(&self, inverses: &mut [T], jacobians: &[T], determinants: &[T]) -> Result<(), FormError> {
        let (tdim, gdim) = (self.topological_dimension(), self.gdim);
        let n = gdim * tdim;
        let num_points = self.num_points("J", jacobians.len(), n)?;
        check_len("detJ", determinants.len(), num_points)?;
        check_len("K", inverses.len(), num_points * n)?;
        for (k, j, &det) in izip!(inverses.chunks_exact_mut(n), jacobians.chunks_exact(n), determinants) {
            jacobian_inverse(k, j, det, gdim, tdim)?;
        }
        Ok(())
    }

    /// Computes `x`, `J`, `detJ` and `K` at `X` from a single basis tabulation.
    #[allow(clippy::too_many_arguments)]
    pub fn compute_geometry(
        &self,
        x: &mut [T],
        jacobians: &mut [T],
        determinants: &mut [T],
        inverses: &mut [T],
        points: &[T],
        coordinate_dofs: &[T],
        orientation: CellOrientation,
    ) -> Result<(), FormError> {
        let geometry = self.tabulate_geometry(points, 0, coordinate_dofs, orientation)?;
        let num_points = geometry.num_points();
        let n = self.gdim * self.topological_dimension();
        check_len("x", x.len(), num_points * self.gdim)?;
        check_len("J", jacobians.len(), num_points * n)?;
        check_len("detJ", determinants.len(), num_points)?;
        check_len("K", inverses.len(), num_points * n)?;
        x.copy_from_slice(geometry.physical_points());
        jacobians.copy_from_slice(geometry.jacobians());
        determinants.copy_from_slice(geometry.determinants());
        inverses.copy_from_slice(geometry.inverses());
        Ok(())
    }

    /// Computes `x` and `J` at the midpoint of the reference cell.
    pub fn compute_midpoint_geometry(&self, x: &mut [T], jacobian: &mut [T], coordinate_dofs: &[T]) -> Result<(), FormError> {
        self.check_coordinate_dofs(coordinate_dofs)?;
        check_len("x", x.len(), self.gdim)?;
        check_len("J", jacobian.len(), self.gdim * self.topological_dimension())?;
        let (x_mid, j_mid) = self.evaluate_point(&self.cell_shape().reference_midpoint(), coordinate_dofs);
        x.copy_from_slice(&x_mid);
        jacobian.copy_from_slice(&j_mid);
        Ok(())
    }

    /// Like [`Self::compute_reference_coordinates`], but fails with
    /// [`FormError::InvalidArgument`] if a point of `x` lies outside the cell.
    pub fn compute_reference_coordinates_in_cell(
        &self,
        points: &mut [T],
        x: &[T],
        coordinate_dofs: &[T],
        orientation: CellOrientation,
    ) -> Result<(), FormError> {
        self.compute_reference_coordinates(points, x, coordinate_dofs, orientation)?;
        check_reference_points(self.cell_shape(), points)?;
        Ok(())
    }

    /// Computes `X[point][tdim]` from `x[point][gdim]`.
    ///
    /// Affine cells are inverted in closed form. Other cells use Newton's method as described in
    /// [`InverseMapSettings`] and may fail with [`FormError::NonConvergence`]. The result does
    /// not depend on the orientation, which only affects the sign of $\det J$.
    pub fn compute_reference_coordinates(
        &self,
        points: &mut [T],
        x: &[T],
        coordinate_dofs: &[T],
        orientation: CellOrientation,
    ) -> Result<(), FormError> {
        self.check_coordinate_dofs(coordinate_dofs)?;
        let (tdim, gdim) = (self.topological_dimension(), self.gdim);
        let num_points = self.num_points("x", x.len(), gdim)?;
        check_len("X", points.len(), num_points * tdim)?;

        let midpoint = self.cell_shape().reference_midpoint::<T>();
        if self.is_affine() {
            // X = X_mid + K (x - x(X_mid))
            let (x_mid, j) = self.evaluate_point(&midpoint, coordinate_dofs);
            let det = jacobian_determinant(&j, gdim, tdim, orientation);
            let mut k = vec![T::zero(); tdim * gdim];
            jacobian_inverse(&mut k, &j, det, gdim, tdim)?;
            for (reference, physical) in points.chunks_exact_mut(tdim).zip(x.chunks_exact(gdim)) {
                for a in 0..tdim {
                    reference[a] = (0..gdim).fold(midpoint[a], |acc, i| acc + k[a * gdim + i] * (physical[i] - x_mid[i]));
                }
            }
            return Ok(());
        }

        let scale = self.cell_diameter(coordinate_dofs);
        for (q, (reference, physical)) in points.chunks_exact_mut(tdim).zip(x.chunks_exact(gdim)).enumerate() {
            reference.copy_from_slice(&midpoint);
            self.inverse_map_point(reference, physical, coordinate_dofs, scale)
                .map_err(|err| {
                    debug!("Inverse map failed for point {}: {}", q, err);
                    err
                })?;
        }
        Ok(())
    }

    /// Computes `X`, `J`, `detJ` and `K` from physical points `x`.
    #[allow(clippy::too_many_arguments)]
    pub fn compute_reference_geometry(
        &self,
        points: &mut [T],
        jacobians: &mut [T],
        determinants: &mut [T],
        inverses: &mut [T],
        x: &[T],
        coordinate_dofs: &[T],
        orientation: CellOrientation,
    ) -> Result<(), FormError> {
        self.compute_reference_coordinates(points, x, coordinate_dofs, orientation)?;
        let mut x_mapped = vec![T::zero(); x.len()];
        self.compute_geometry(
            &mut x_mapped,
            jacobians,
            determinants,
            inverses,
            points,
            coordinate_dofs,
            orientation,
        )
    }

    /// Largest distance between two coordinate dofs.
    fn cell_diameter(&self, coordinate_dofs: &[T]) -> T {
        let nodes: Vec<_> = coordinate_dofs.chunks_exact(self.gdim).collect();
        let mut diameter = T::zero();
        for (i, a) in nodes.iter().enumerate() {
            for b in &nodes[i + 1..] {
                let distance = a
                    .iter()
                    .zip(b.iter())
                    .fold(T::zero(), |acc, (&p, &q)| acc + (p - q) * (p - q))
                    .sqrt();
                diameter = diameter.max(distance);
            }
        }
        diameter
    }

    fn inverse_map_point(&self, reference: &mut [T], target: &[T], coordinate_dofs: &[T], scale: T) -> Result<(), FormError> {
        let (tdim, gdim) = (self.topological_dimension(), self.gdim);
        let square = tdim == gdim;
        let solves = Cell::new(0);

        let function = VectorFunctionBuilder::with_dimension(tdim)
            .with_function(|f: &mut DVectorViewMut<T>, point: &DVectorView<T>| {
                let point: Vec<T> = point.iter().copied().collect();
                let (x, j) = self.evaluate_point(&point, coordinate_dofs);
                let residual = DVector::from_iterator(gdim, x.iter().zip(target).map(|(&a, &b)| a - b));
                if square {
                    f.copy_from(&residual);
                } else {
                    f.copy_from(&(DMatrix::from_row_slice(gdim, tdim, &j).transpose() * residual));
                }
            })
            .with_jacobian_solver(|sol: &mut DVectorViewMut<T>, point: &DVectorView<T>, rhs: &DVectorView<T>| {
                solves.set(solves.get() + 1);
                let point: Vec<T> = point.iter().copied().collect();
                let (_, j) = self.evaluate_point(&point, coordinate_dofs);
                let j = DMatrix::from_row_slice(gdim, tdim, &j);
                let system = if square { j } else { j.transpose() * &j };
                let solution = system
                    .lu()
                    .solve(&rhs.clone_owned())
                    .ok_or_else(|| JacobianSolveError::from("singular coordinate map Jacobian"))?;
                sol.copy_from(&solution);
                Ok(())
            });

        let tolerance = T::from_constant(self.settings.tolerance) * if square { scale } else { scale * scale };
        let settings = NewtonSettings {
            max_iterations: Some(self.settings.max_iterations),
            tolerance,
        };
        let initial = DVector::from_column_slice(reference);
        let mut point = initial.clone();
        let mut f = DVector::zeros(tdim);
        let mut dx = DVector::zeros(tdim);

        let mut function = function;
        let result = match newton(&mut function, &mut point, &mut f, &mut dx, settings) {
            Err(err) if self.settings.line_search => {
                warn!("Inverse map failed without line search ({}), retrying with backtracking", err);
                point.copy_from(&initial);
                newton_line_search(
                    &mut function,
                    &mut point,
                    &mut f,
                    &mut dx,
                    settings,
                    &mut BacktrackingLineSearch::default(),
                )
            }
            result => result,
        };

        match result {
            Ok(outcome) => {
                trace!(
                    "Inverse map converged in {} iterations (residual {})",
                    outcome.iterations,
                    outcome.residual_norm
                );
                reference.copy_from_slice(point.as_slice());
                Ok(())
            }
            Err(err) => {
                let residual = match err {
                    NewtonError::MaximumIterationsReached { residual_norm, .. } => residual_norm,
                    _ => f64::NAN,
                };
                Err(FormError::NonConvergence {
                    iterations: err.iterations().unwrap_or_else(|| solves.get()),
                    residual,
                })
            }
        }
    }
}
