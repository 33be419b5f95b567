//! Reference finite elements.
//!
//! A [`ReferenceElement`] evaluates its basis functions and their derivatives of arbitrary order
//! at points of the reference cell, and knows how these reference values are pushed forward to
//! a physical cell ([`MapKind`]). Elements are immutable and shared behind `Arc`, so one element
//! serves every cell of a mesh and every thread.
use crate::cell::{CellOrientation, CellShape};
use crate::coordinate_map::{CoordinateMapping, GeometryTable};
use crate::error::{check_len, FormError};
use crate::polynomial::{num_derivatives, MAX_DERIVATIVE_ORDER};
use crate::pushforward::push_forward;
use fem_kernel_traits::Real;
use std::fmt::Debug;
use std::ops::Range;
use std::sync::Arc;

mod ciarlet;
mod lagrange;
mod mixed;
mod nedelec;
mod raviart_thomas;

pub use ciarlet::CiarletElement;
pub use mixed::MixedElement;

/// Absolute tolerance used when checking that evaluation points lie in the reference cell.
pub const REFERENCE_DOMAIN_TOLERANCE: f64 = 1e-10;

/// How reference basis values are mapped to physical values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MapKind {
    /// $v(x) = V(X)$, componentwise.
    Identity,
    /// $v(x) = \frac{1}{\det J} J V(X)$, preserving normal components.
    ContravariantPiola,
    /// $v(x) = K^T V(X)$, preserving tangential components.
    CovariantPiola,
    /// Sub-elements are mapped individually.
    Mixed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ElementFamily {
    Lagrange,
    DiscontinuousLagrange,
    Real,
    RaviartThomas,
    NedelecFirstKind,
    Mixed,
}

impl ElementFamily {
    pub fn name(self) -> &'static str {
        match self {
            Self::Lagrange => "Lagrange",
            Self::DiscontinuousLagrange => "Discontinuous Lagrange",
            Self::Real => "Real",
            Self::RaviartThomas => "Raviart-Thomas",
            Self::NedelecFirstKind => "Nedelec 1st kind H(curl)",
            Self::Mixed => "Mixed",
        }
    }
}

/// Local dofs associated with each sub-entity of the reference cell.
///
/// Indexed as `[dimension][entity]`. All entities of one dimension carry the same number of
/// dofs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDofs {
    dofs: Vec<Vec<Vec<usize>>>,
}

impl EntityDofs {
    pub fn new(cell: CellShape) -> Self {
        let dofs = (0..=cell.topological_dimension())
            .map(|d| vec![Vec::new(); cell.num_entities(d)])
            .collect();
        Self { dofs }
    }

    pub fn push(&mut self, dim: usize, entity: usize, dof: usize) {
        self.dofs[dim][entity].push(dof);
    }

    /// Local dofs of entity `entity` of dimension `dim`, empty if the entity does not exist.
    pub fn dofs(&self, dim: usize, entity: usize) -> &[usize] {
        self.dofs
            .get(dim)
            .and_then(|entities| entities.get(entity))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn num_entity_dofs(&self, dim: usize) -> usize {
        self.dofs(dim, 0).len()
    }

    /// Total number of dofs over all entities.
    pub fn len(&self) -> usize {
        self.dofs.iter().flatten().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merges entity dofs of several elements on the same cell, shifting each by its offset.
    pub fn concatenate<'a>(cell: CellShape, parts: impl IntoIterator<Item = (&'a EntityDofs, usize)>) -> Self {
        let mut merged = Self::new(cell);
        for (part, offset) in parts {
            for (d, entities) in part.dofs.iter().enumerate() {
                for (e, dofs) in entities.iter().enumerate() {
                    merged.dofs[d][e].extend(dofs.iter().map(|dof| dof + offset));
                }
            }
        }
        merged
    }
}

/// Basis values and derivatives of orders `0..=max_order` at a set of points.
///
/// The block for order `n` has the row-major layout `[point][dof][derivative][component]` with
/// `dim^n` derivatives ordered as described in [`crate::polynomial`].
#[derive(Debug, Clone, PartialEq)]
pub struct BasisTable<T> {
    dim: usize,
    num_points: usize,
    num_dofs: usize,
    value_size: usize,
    orders: Vec<Vec<T>>,
}

impl<T: Real> BasisTable<T> {
    pub fn zeros(dim: usize, max_order: usize, num_points: usize, num_dofs: usize, value_size: usize) -> Self {
        let orders = (0..=max_order)
            .map(|n| vec![T::zero(); num_points * num_dofs * num_derivatives(dim, n) * value_size])
            .collect();
        Self {
            dim,
            num_points,
            num_dofs,
            value_size,
            orders,
        }
    }

    /// Number of variables derivatives are taken with respect to.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn max_order(&self) -> usize {
        self.orders.len() - 1
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    pub fn value_size(&self) -> usize {
        self.value_size
    }

    pub fn num_derivatives(&self, order: usize) -> usize {
        num_derivatives(self.dim, order)
    }

    /// The flat block of the given derivative order.
    pub fn order(&self, order: usize) -> &[T] {
        &self.orders[order]
    }

    pub fn order_mut(&mut self, order: usize) -> &mut [T] {
        &mut self.orders[order]
    }

    fn index(&self, order: usize, point: usize, dof: usize, derivative: usize, component: usize) -> usize {
        let nd = self.num_derivatives(order);
        ((point * self.num_dofs + dof) * nd + derivative) * self.value_size + component
    }

    pub fn get(&self, order: usize, point: usize, dof: usize, derivative: usize, component: usize) -> T {
        self.orders[order][self.index(order, point, dof, derivative, component)]
    }

    pub fn get_mut(&mut self, order: usize, point: usize, dof: usize, derivative: usize, component: usize) -> &mut T {
        let index = self.index(order, point, dof, derivative, component);
        &mut self.orders[order][index]
    }

    /// The `[derivative][component]` block of one dof at one point.
    pub fn dof_block(&self, order: usize, point: usize, dof: usize) -> &[T] {
        let len = self.num_derivatives(order) * self.value_size;
        let start = self.index(order, point, dof, 0, 0);
        &self.orders[order][start..start + len]
    }

    pub fn dof_block_mut(&mut self, order: usize, point: usize, dof: usize) -> &mut [T] {
        let len = self.num_derivatives(order) * self.value_size;
        let start = self.index(order, point, dof, 0, 0);
        &mut self.orders[order][start..start + len]
    }

    /// Extracts the sub-table of the given dofs and components.
    pub fn block(&self, dofs: Range<usize>, components: Range<usize>) -> Self {
        let mut block = Self::zeros(self.dim, self.max_order(), self.num_points, dofs.len(), components.len());
        for n in 0..=self.max_order() {
            for q in 0..self.num_points {
                for (i, dof) in dofs.clone().enumerate() {
                    for d in 0..self.num_derivatives(n) {
                        for (c, component) in components.clone().enumerate() {
                            *block.get_mut(n, q, i, d, c) = self.get(n, q, dof, d, component);
                        }
                    }
                }
            }
        }
        block
    }

    /// Writes `block` at the given dof and component offsets.
    pub fn set_block(&mut self, dof_offset: usize, component_offset: usize, block: &BasisTable<T>) {
        debug_assert_eq!(self.dim, block.dim);
        debug_assert_eq!(self.num_points, block.num_points);
        let max_order = self.max_order().min(block.max_order());
        for n in 0..=max_order {
            for q in 0..self.num_points {
                for i in 0..block.num_dofs {
                    for d in 0..self.num_derivatives(n) {
                        for c in 0..block.value_size {
                            *self.get_mut(n, q, dof_offset + i, d, component_offset + c) = block.get(n, q, i, d, c);
                        }
                    }
                }
            }
        }
    }
}

/// A finite element defined on a reference cell.
///
/// Point buffers are row-major `[point][tdim]` slices. Only the public `evaluate_*` operations
/// check that points lie in the reference domain; [`ReferenceElement::tabulate_reference_basis`]
/// is the unchecked kernel used internally, for instance by Newton iterations that may step
/// outside the cell.
pub trait ReferenceElement<T: Real>: Debug + Send + Sync {
    fn signature(&self) -> &str;

    fn family(&self) -> ElementFamily;

    fn cell_shape(&self) -> CellShape;

    /// Dimension of the space the physical cell is embedded in.
    fn geometric_dimension(&self) -> usize;

    /// Number of basis functions.
    fn space_dimension(&self) -> usize;

    fn degree(&self) -> usize;

    /// Physical value shape.
    fn value_shape(&self) -> &[usize];

    fn reference_value_shape(&self) -> &[usize];

    fn mapping(&self) -> MapKind;

    fn entity_dofs(&self) -> &EntityDofs;

    /// Tabulates all derivatives of orders `0..=max_order` at the given reference points,
    /// without validating the points.
    fn tabulate_reference_basis(&self, max_order: usize, points: &[T]) -> BasisTable<T>;

    /// Reference points at which [`ReferenceElement::map_dofs`] expects function values.
    fn interpolation_points(&self) -> Vec<T>;

    /// Computes the dof values of a function from its physical values `values`, given as
    /// `[point][component]` at the physical images of the interpolation points.
    fn map_dofs(
        &self,
        dofs: &mut [T],
        values: &[T],
        coordinate_dofs: &[T],
        orientation: CellOrientation,
        coordinate_mapping: &CoordinateMapping<T>,
    ) -> Result<(), FormError>;

    fn topological_dimension(&self) -> usize {
        self.cell_shape().topological_dimension()
    }

    fn value_rank(&self) -> usize {
        self.value_shape().len()
    }

    fn value_dimension(&self, axis: usize) -> Result<usize, FormError> {
        self.value_shape()
            .get(axis)
            .copied()
            .ok_or_else(|| FormError::invalid_argument(format!("value axis {} out of range", axis)))
    }

    fn value_size(&self) -> usize {
        self.value_shape().iter().product()
    }

    fn reference_value_rank(&self) -> usize {
        self.reference_value_shape().len()
    }

    fn reference_value_dimension(&self, axis: usize) -> Result<usize, FormError> {
        self.reference_value_shape()
            .get(axis)
            .copied()
            .ok_or_else(|| FormError::invalid_argument(format!("reference value axis {} out of range", axis)))
    }

    fn reference_value_size(&self) -> usize {
        self.reference_value_shape().iter().product()
    }

    /// Evaluates all basis functions, `values[point][dof][reference_component]`.
    fn evaluate_reference_basis(&self, values: &mut [T], points: &[T]) -> Result<(), FormError> {
        self.evaluate_reference_basis_derivatives(values, 0, points)
    }

    /// Evaluates all derivatives of total order `order`,
    /// `values[point][dof][derivative][reference_component]`.
    fn evaluate_reference_basis_derivatives(&self, values: &mut [T], order: usize, points: &[T]) -> Result<(), FormError> {
        check_derivative_order(order)?;
        let num_points = check_reference_points(self.cell_shape(), points)?;
        let tdim = self.topological_dimension();
        let expected = num_points * self.space_dimension() * num_derivatives(tdim, order) * self.reference_value_size();
        check_len("values", values.len(), expected)?;
        let table = self.tabulate_reference_basis(order, points);
        values.copy_from_slice(table.order(order));
        Ok(())
    }

    /// Pushes reference values and derivatives up to `order` forward to physical space.
    ///
    /// The returned table is expressed in `gdim` variables with `value_size` components.
    fn transform_reference_basis_derivatives(
        &self,
        reference: &BasisTable<T>,
        geometry: &GeometryTable<T>,
        order: usize,
    ) -> Result<BasisTable<T>, FormError> {
        push_forward(self.mapping(), reference, geometry, order, self.value_size())
    }

    /// Reference coordinates of the dofs, `[dof][tdim]`, for point-evaluation elements.
    fn reference_dof_coordinates(&self) -> Option<Vec<T>> {
        None
    }

    fn has_reference_dof_coordinates(&self) -> bool {
        self.reference_dof_coordinates().is_some()
    }

    fn tabulate_reference_dof_coordinates(&self, coordinates: &mut [T]) -> Result<(), FormError> {
        let dof_coordinates = self
            .reference_dof_coordinates()
            .ok_or_else(|| FormError::contract_mismatch(format!("{} has no dof coordinates", self.signature())))?;
        check_len("coordinates", coordinates.len(), dof_coordinates.len())?;
        coordinates.copy_from_slice(&dof_coordinates);
        Ok(())
    }

    fn num_sub_elements(&self) -> usize {
        0
    }

    fn sub_element(&self, index: usize) -> Result<Arc<dyn ReferenceElement<T>>, FormError> {
        Err(FormError::contract_mismatch(format!(
            "sub-element index {} out of bounds for {} with {} sub-elements",
            index,
            self.signature(),
            self.num_sub_elements()
        )))
    }
}

pub(crate) fn check_derivative_order(order: usize) -> Result<(), FormError> {
    if order > MAX_DERIVATIVE_ORDER {
        Err(FormError::invalid_argument(format!(
            "derivative order {} exceeds the maximum {}",
            order, MAX_DERIVATIVE_ORDER
        )))
    } else {
        Ok(())
    }
}

/// Validates a `[point][tdim]` buffer of reference points and returns the number of points.
pub(crate) fn check_reference_points<T: Real>(cell: CellShape, points: &[T]) -> Result<usize, FormError> {
    let tdim = cell.topological_dimension();
    if tdim == 0 {
        return Err(FormError::invalid_argument(format!(
            "reference points are undefined on {} cells",
            cell
        )));
    }
    if points.len() % tdim != 0 {
        return Err(FormError::invalid_argument(format!(
            "point buffer length {} is not a multiple of {}",
            points.len(),
            tdim
        )));
    }
    let tol = T::from_constant(REFERENCE_DOMAIN_TOLERANCE);
    if let Some(point) = points.chunks_exact(tdim).find(|point| !cell.contains(point, tol)) {
        return Err(FormError::invalid_argument(format!(
            "point {:?} lies outside the reference {}",
            point.iter().map(|x| x.to_f64()).collect::<Vec<_>>(),
            cell
        )));
    }
    Ok(points.len() / tdim)
}
