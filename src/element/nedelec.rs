//! Lowest-order Nédélec (first kind) H(curl) elements on triangles and tetrahedra.
use crate::cell::CellShape;
use crate::element::ciarlet::{
    directional_point_functionals, entity_geometry, vector_spanning_set, CiarletDefinition, CiarletElement, Term,
};
use crate::element::{ElementFamily, EntityDofs, MapKind};
use crate::error::FormError;
use crate::polynomial::MonomialSet;
use fem_kernel_traits::Real;

const ONE: [usize; 3] = [0, 0, 0];
const X: [usize; 3] = [1, 0, 0];
const Y: [usize; 3] = [0, 1, 0];
const Z: [usize; 3] = [0, 0, 1];

/// $(1, 0)$, $(0, 1)$ and $(-y, x)$.
const TRIANGLE_SPANNING_SET: &[&[&[Term]]] = &[
    &[&[(1.0, ONE)], &[]],
    &[&[], &[(1.0, ONE)]],
    &[&[(-1.0, Y)], &[(1.0, X)]],
];

/// The unit vectors and $e_i \times (x, y, z)$.
const TETRAHEDRON_SPANNING_SET: &[&[&[Term]]] = &[
    &[&[(1.0, ONE)], &[], &[]],
    &[&[], &[(1.0, ONE)], &[]],
    &[&[], &[], &[(1.0, ONE)]],
    &[&[], &[(-1.0, Z)], &[(1.0, Y)]],
    &[&[(1.0, Z)], &[], &[(-1.0, X)]],
    &[&[(-1.0, Y)], &[(1.0, X)], &[]],
];

impl<T: Real> CiarletElement<T> {
    /// The degree 1 Nédélec element of the first kind, mapped by the covariant Piola transform.
    ///
    /// The dofs are tangential components $V \cdot (v_1 - v_0)$ at edge midpoints.
    pub fn nedelec_first_kind(cell: CellShape, geometric_dimension: usize) -> Result<Self, FormError> {
        let tdim = cell.topological_dimension();
        let spanning: &[&[&[Term]]] = match cell {
            CellShape::Triangle => TRIANGLE_SPANNING_SET,
            CellShape::Tetrahedron => TETRAHEDRON_SPANNING_SET,
            _ => {
                return Err(FormError::invalid_argument(format!(
                    "Nedelec elements are not available on {}",
                    cell
                )))
            }
        };

        let mut entity_dofs = EntityDofs::new(cell);
        let mut points = Vec::new();
        let mut tangents = Vec::new();
        for edge in 0..cell.num_entities(1) {
            let (v, midpoint) = entity_geometry(cell, 1, edge);
            entity_dofs.push(1, edge, edge);
            points.push(midpoint);
            tangents.push((0..tdim).map(|i| v[1][i] - v[0][i]).collect());
        }

        let polynomials = MonomialSet::total_degree(tdim, 1);
        let spanning_set = vector_spanning_set(&polynomials, spanning)?;
        let (points, interpolation) = directional_point_functionals(&points, &tangents);
        Self::from_definition(CiarletDefinition {
            family: ElementFamily::NedelecFirstKind,
            cell,
            degree: 1,
            geometric_dimension,
            mapping: MapKind::CovariantPiola,
            reference_value_shape: vec![tdim],
            value_shape: vec![geometric_dimension],
            polynomials,
            spanning_set,
            points,
            interpolation,
            entity_dofs,
            point_evaluation: false,
        })
    }
}
