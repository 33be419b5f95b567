use crate::cell::{CellOrientation, CellShape};
use crate::coordinate_map::CoordinateMapping;
use crate::element::{BasisTable, ElementFamily, EntityDofs, MapKind, ReferenceElement};
use crate::error::{check_len, FormError};
use crate::polynomial::{derivative_counts, MonomialSet};
use fem_kernel_traits::Real;
use nalgebra::DMatrix;

/// The data needed to construct a [`CiarletElement`].
///
/// The element space is spanned by the rows of `spanning_set`, given as coefficients in
/// `polynomials` with columns ordered `component * polynomials.len() + monomial`. The dofs are
/// the rows of `interpolation`, which act on reference values at `points` with columns ordered
/// `component * num_points + point`.
#[derive(Debug, Clone)]
pub(crate) struct CiarletDefinition<T> {
    pub family: ElementFamily,
    pub cell: CellShape,
    pub degree: usize,
    pub geometric_dimension: usize,
    pub mapping: MapKind,
    pub reference_value_shape: Vec<usize>,
    pub value_shape: Vec<usize>,
    pub polynomials: MonomialSet,
    pub spanning_set: DMatrix<T>,
    pub points: Vec<T>,
    pub interpolation: DMatrix<T>,
    pub entity_dofs: EntityDofs,
    pub point_evaluation: bool,
}

/// An element given by a polynomial space and a set of linear functionals (Ciarlet's
/// definition).
///
/// The basis is the one dual to the functionals: with $D_{kj} = l_k(w_j)$ for the spanning
/// functions $w_j$, the basis coefficients are $(D^T)^{-1}$ applied to the spanning set.
#[derive(Debug, Clone)]
pub struct CiarletElement<T> {
    signature: String,
    family: ElementFamily,
    cell: CellShape,
    degree: usize,
    geometric_dimension: usize,
    mapping: MapKind,
    reference_value_shape: Vec<usize>,
    value_shape: Vec<usize>,
    polynomials: MonomialSet,
    coefficients: DMatrix<T>,
    points: Vec<T>,
    interpolation: DMatrix<T>,
    entity_dofs: EntityDofs,
    point_evaluation: bool,
}

impl<T: Real> CiarletElement<T> {
    pub(crate) fn from_definition(definition: CiarletDefinition<T>) -> Result<Self, FormError> {
        let CiarletDefinition {
            family,
            cell,
            degree,
            geometric_dimension,
            mapping,
            reference_value_shape,
            value_shape,
            polynomials,
            spanning_set,
            points,
            interpolation,
            entity_dofs,
            point_evaluation,
        } = definition;

        let tdim = cell.topological_dimension();
        if tdim == 0 {
            return Err(FormError::invalid_argument("elements on vertex cells are not supported"));
        }
        if geometric_dimension < tdim || geometric_dimension > 3 {
            return Err(FormError::invalid_argument(format!(
                "geometric dimension {} is incompatible with {}",
                geometric_dimension, cell
            )));
        }

        let dim = spanning_set.nrows();
        let num_monomials = polynomials.len();
        let value_size: usize = reference_value_shape.iter().product();
        let num_points = points.len() / tdim;
        check_len("interpolation points", points.len(), num_points * tdim)?;
        check_len("spanning set columns", spanning_set.ncols(), value_size * num_monomials)?;
        check_len("interpolation rows", interpolation.nrows(), dim)?;
        check_len("interpolation columns", interpolation.ncols(), value_size * num_points)?;
        check_len("entity dofs", entity_dofs.len(), dim)?;

        // Spanning functions evaluated at the points, rows ordered as the interpolation columns
        let mut monomial_values = DMatrix::zeros(num_points, num_monomials);
        let mut row = vec![T::zero(); num_monomials];
        for (q, point) in points.chunks_exact(tdim).enumerate() {
            polynomials.evaluate_derivative(point, [0; 3], &mut row);
            for (p, &value) in row.iter().enumerate() {
                monomial_values[(q, p)] = value;
            }
        }
        let mut spanning_values = DMatrix::zeros(value_size * num_points, dim);
        for c in 0..value_size {
            let block = &monomial_values * spanning_set.columns(c * num_monomials, num_monomials).transpose();
            spanning_values.rows_mut(c * num_points, num_points).copy_from(&block);
        }

        let dual_matrix = &interpolation * spanning_values;
        let coefficients = dual_matrix.transpose().lu().solve(&spanning_set).ok_or_else(|| {
            FormError::invalid_argument(format!(
                "the functionals of the {} element on {} are not unisolvent",
                family.name(),
                cell
            ))
        })?;

        let signature = format!("FiniteElement('{}', {}, {})", family.name(), cell, degree);
        Ok(Self {
            signature,
            family,
            cell,
            degree,
            geometric_dimension,
            mapping,
            reference_value_shape,
            value_shape,
            polynomials,
            coefficients,
            points,
            interpolation,
            entity_dofs,
            point_evaluation,
        })
    }

    /// Basis coefficients in the monomial set, `[dof][component * num_monomials + monomial]`.
    pub fn coefficients(&self) -> &DMatrix<T> {
        &self.coefficients
    }

    /// The dof functionals as a matrix acting on reference values at the interpolation points.
    pub fn interpolation_matrix(&self) -> &DMatrix<T> {
        &self.interpolation
    }

    /// The same element on cells embedded in `gdim` dimensions.
    ///
    /// Piola-mapped elements take `gdim` physical components.
    pub fn with_geometric_dimension(self, gdim: usize) -> Result<Self, FormError> {
        if gdim < self.cell.topological_dimension() || gdim > 3 {
            return Err(FormError::invalid_argument(format!(
                "geometric dimension {} is incompatible with {}",
                gdim, self.cell
            )));
        }
        let value_shape = match self.mapping {
            MapKind::ContravariantPiola | MapKind::CovariantPiola => vec![gdim],
            _ => self.value_shape,
        };
        Ok(Self {
            geometric_dimension: gdim,
            value_shape,
            ..self
        })
    }

    /// Applies the pull-back of the element's mapping to physical values at the interpolation
    /// points.
    fn pull_back(
        &self,
        values: &[T],
        coordinate_dofs: &[T],
        orientation: CellOrientation,
        coordinate_mapping: &CoordinateMapping<T>,
    ) -> Result<Vec<T>, FormError> {
        let tdim = self.cell.topological_dimension();
        let gdim = self.geometric_dimension;
        let num_points = self.points.len() / tdim;
        match self.mapping {
            MapKind::Identity | MapKind::Mixed => Ok(values.to_vec()),
            MapKind::ContravariantPiola | MapKind::CovariantPiola => {
                let geometry = coordinate_mapping.tabulate_geometry(&self.points, 0, coordinate_dofs, orientation)?;
                let mut reference = vec![T::zero(); num_points * tdim];
                for q in 0..num_points {
                    let v = &values[q * gdim..(q + 1) * gdim];
                    let j = geometry.jacobian(q);
                    let k = geometry.inverse(q);
                    for a in 0..tdim {
                        reference[q * tdim + a] = match self.mapping {
                            // V = det(J) K v
                            MapKind::ContravariantPiola => {
                                let det = geometry.determinant(q);
                                (0..gdim).fold(T::zero(), |acc, i| acc + det * k[a * gdim + i] * v[i])
                            }
                            // V = J^T v
                            _ => (0..gdim).fold(T::zero(), |acc, i| acc + j[i * tdim + a] * v[i]),
                        };
                    }
                }
                Ok(reference)
            }
        }
    }
}

impl<T: Real> ReferenceElement<T> for CiarletElement<T> {
    fn signature(&self) -> &str {
        &self.signature
    }

    fn family(&self) -> ElementFamily {
        self.family
    }

    fn cell_shape(&self) -> CellShape {
        self.cell
    }

    fn geometric_dimension(&self) -> usize {
        self.geometric_dimension
    }

    fn space_dimension(&self) -> usize {
        self.coefficients.nrows()
    }

    fn degree(&self) -> usize {
        self.degree
    }

    fn value_shape(&self) -> &[usize] {
        &self.value_shape
    }

    fn reference_value_shape(&self) -> &[usize] {
        &self.reference_value_shape
    }

    fn mapping(&self) -> MapKind {
        self.mapping
    }

    fn entity_dofs(&self) -> &EntityDofs {
        &self.entity_dofs
    }

    fn tabulate_reference_basis(&self, max_order: usize, points: &[T]) -> BasisTable<T> {
        let tdim = self.cell.topological_dimension();
        let num_points = points.len() / tdim;
        let num_monomials = self.polynomials.len();
        let value_size = self.reference_value_size();
        let mut table = BasisTable::zeros(tdim, max_order, num_points, self.space_dimension(), value_size);

        let mut monomials = vec![T::zero(); num_monomials];
        for (q, point) in points.chunks_exact(tdim).enumerate() {
            for n in 0..=max_order {
                for d in 0..table.num_derivatives(n) {
                    self.polynomials
                        .evaluate_derivative(point, derivative_counts(tdim, n, d), &mut monomials);
                    for dof in 0..self.space_dimension() {
                        for c in 0..value_size {
                            let coefficients = self.coefficients.row(dof);
                            let value = (0..num_monomials).fold(T::zero(), |acc, p| {
                                acc + coefficients[c * num_monomials + p] * monomials[p]
                            });
                            *table.get_mut(n, q, dof, d, c) = value;
                        }
                    }
                }
            }
        }
        table
    }

    fn interpolation_points(&self) -> Vec<T> {
        self.points.clone()
    }

    fn map_dofs(
        &self,
        dofs: &mut [T],
        values: &[T],
        coordinate_dofs: &[T],
        orientation: CellOrientation,
        coordinate_mapping: &CoordinateMapping<T>,
    ) -> Result<(), FormError> {
        let num_points = self.points.len() / self.cell.topological_dimension();
        check_len("dofs", dofs.len(), self.space_dimension())?;
        check_len("values", values.len(), num_points * self.value_size())?;
        let reference = self.pull_back(values, coordinate_dofs, orientation, coordinate_mapping)?;

        let value_size = self.reference_value_size();
        for (i, dof) in dofs.iter_mut().enumerate() {
            *dof = T::zero();
            for c in 0..value_size {
                for q in 0..num_points {
                    *dof += self.interpolation[(i, c * num_points + q)] * reference[q * value_size + c];
                }
            }
        }
        Ok(())
    }

    fn reference_dof_coordinates(&self) -> Option<Vec<T>> {
        self.point_evaluation.then(|| self.points.clone())
    }
}

/// A monomial term `(coefficient, exponent)`.
pub(crate) type Term = (f64, [usize; 3]);

/// Builds the spanning-set matrix of vector-valued polynomials, each given as one list of terms
/// per component.
pub(crate) fn vector_spanning_set<T: Real>(
    polynomials: &MonomialSet,
    functions: &[&[&[Term]]],
) -> Result<DMatrix<T>, FormError> {
    let num_monomials = polynomials.len();
    let value_size = functions.first().map_or(0, |f| f.len());
    let mut spanning_set = DMatrix::zeros(functions.len(), value_size * num_monomials);
    for (j, components) in functions.iter().enumerate() {
        for (c, terms) in components.iter().enumerate() {
            for &(coefficient, exponent) in terms.iter() {
                let p = polynomials.index_of(exponent).ok_or_else(|| {
                    FormError::invalid_argument(format!(
                        "monomial {:?} does not belong to the polynomial set",
                        exponent
                    ))
                })?;
                spanning_set[(j, c * num_monomials + p)] += T::from_constant(coefficient);
            }
        }
    }
    Ok(spanning_set)
}

/// Point-moment functionals $l_i(V) = V(x_i) \cdot t_i$, one per point.
///
/// Returns the flattened points and the interpolation matrix.
pub(crate) fn directional_point_functionals<T: Real>(points: &[Vec<f64>], directions: &[Vec<f64>]) -> (Vec<T>, DMatrix<T>) {
    let num_points = points.len();
    let value_size = directions.first().map_or(0, Vec::len);
    let mut interpolation = DMatrix::zeros(num_points, value_size * num_points);
    for (i, direction) in directions.iter().enumerate() {
        for (c, &t) in direction.iter().enumerate() {
            interpolation[(i, c * num_points + i)] = T::from_constant(t);
        }
    }
    let flat = points.iter().flatten().map(|&x| T::from_constant(x)).collect();
    (flat, interpolation)
}

/// Vertex coordinates of an entity, and their centroid.
pub(crate) fn entity_geometry(cell: CellShape, dim: usize, entity: usize) -> (Vec<&'static [f64]>, Vec<f64>) {
    let coords = cell.reference_vertices();
    let vertices: Vec<_> = cell.entity_vertices(dim)[entity].iter().map(|&v| coords[v]).collect();
    let tdim = cell.topological_dimension();
    let centroid = (0..tdim)
        .map(|i| vertices.iter().map(|v| v[i]).sum::<f64>() / vertices.len() as f64)
        .collect();
    (vertices, centroid)
}
