//! Lowest-order Raviart-Thomas elements on triangles and tetrahedra.
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

/// $(1, 0)$, $(0, 1)$ and $(x, y)$.
const TRIANGLE_SPANNING_SET: &[&[&[Term]]] = &[
    &[&[(1.0, ONE)], &[]],
    &[&[], &[(1.0, ONE)]],
    &[&[(1.0, X)], &[(1.0, Y)]],
];

/// The unit vectors and $(x, y, z)$.
const TETRAHEDRON_SPANNING_SET: &[&[&[Term]]] = &[
    &[&[(1.0, ONE)], &[], &[]],
    &[&[], &[(1.0, ONE)], &[]],
    &[&[], &[], &[(1.0, ONE)]],
    &[&[(1.0, X)], &[(1.0, Y)], &[(1.0, Z)]],
];

impl<T: Real> CiarletElement<T> {
    /// The degree 1 Raviart-Thomas element, mapped by the contravariant Piola transform.
    ///
    /// The dofs are normal components at facet midpoints. On the triangle the normal of the
    /// edge from `v0` to `v1` is $(v_{0,y} - v_{1,y}, v_{1,x} - v_{0,x})$, on the tetrahedron
    /// the normal of the face `(v0, v1, v2)` is $(v_1 - v_0) \times (v_2 - v_0)$. Both are
    /// scaled by the facet measure.
    pub fn raviart_thomas(cell: CellShape, geometric_dimension: usize) -> Result<Self, FormError> {
        let tdim = cell.topological_dimension();
        let spanning: &[&[&[Term]]] = match cell {
            CellShape::Triangle => TRIANGLE_SPANNING_SET,
            CellShape::Tetrahedron => TETRAHEDRON_SPANNING_SET,
            _ => {
                return Err(FormError::invalid_argument(format!(
                    "Raviart-Thomas elements are not available on {}",
                    cell
                )))
            }
        };

        let mut entity_dofs = EntityDofs::new(cell);
        let mut points = Vec::new();
        let mut normals = Vec::new();
        for facet in 0..cell.num_facets() {
            let (v, midpoint) = entity_geometry(cell, tdim - 1, facet);
            let normal = if tdim == 2 {
                vec![v[0][1] - v[1][1], v[1][0] - v[0][0]]
            } else {
                let a: Vec<f64> = (0..3).map(|i| v[1][i] - v[0][i]).collect();
                let b: Vec<f64> = (0..3).map(|i| v[2][i] - v[0][i]).collect();
                vec![
                    a[1] * b[2] - a[2] * b[1],
                    a[2] * b[0] - a[0] * b[2],
                    a[0] * b[1] - a[1] * b[0],
                ]
            };
            entity_dofs.push(tdim - 1, facet, facet);
            points.push(midpoint);
            normals.push(normal);
        }

        let polynomials = MonomialSet::total_degree(tdim, 1);
        let spanning_set = vector_spanning_set(&polynomials, spanning)?;
        let (points, interpolation) = directional_point_functionals(&points, &normals);
        Self::from_definition(CiarletDefinition {
            family: ElementFamily::RaviartThomas,
            cell,
            degree: 1,
            geometric_dimension,
            mapping: MapKind::ContravariantPiola,
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
