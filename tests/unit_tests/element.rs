use crate::reference_coordinates;
use fem_kernel::cell::{CellOrientation, CellShape};
use fem_kernel::coordinate_map::CoordinateMapping;
use fem_kernel::element::{CiarletElement, ElementFamily, MapKind, MixedElement, ReferenceElement};
use fem_kernel::error::FormError;
use fem_kernel::polynomial::{num_derivatives, MAX_DERIVATIVE_ORDER};
use fem_kernel::proptest::reference_point;
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::DMatrix;
use proptest::prelude::*;
use std::sync::Arc;

const LAGRANGE_CELLS: [CellShape; 5] = [
    CellShape::Interval,
    CellShape::Triangle,
    CellShape::Quadrilateral,
    CellShape::Tetrahedron,
    CellShape::Hexahedron,
];

/// Reference values of all basis functions at all points, `[dof][point * value_size + c]`.
fn basis_at_points(element: &dyn ReferenceElement<f64>, points: &[f64]) -> DMatrix<f64> {
    let table = element.tabulate_reference_basis(0, points);
    let value_size = element.reference_value_size();
    DMatrix::from_fn(element.space_dimension(), table.num_points() * value_size, |dof, col| {
        table.get(0, col / value_size, dof, 0, col % value_size)
    })
}

#[test]
fn lagrange_basis_is_nodal() {
    for cell in LAGRANGE_CELLS {
        for degree in 1..=3 {
            let element = CiarletElement::<f64>::lagrange(cell, degree).unwrap();
            let nodes = element.reference_dof_coordinates().unwrap();
            let values = basis_at_points(&element, &nodes);
            let n = element.space_dimension();
            assert_matrix_eq!(values, DMatrix::identity(n, n), comp = abs, tol = 1e-10);
        }
    }
}

#[test]
fn lagrange_dimensions() {
    let expected = [
        (CellShape::Interval, 2, 3),
        (CellShape::Triangle, 1, 3),
        (CellShape::Triangle, 2, 6),
        (CellShape::Triangle, 3, 10),
        (CellShape::Tetrahedron, 2, 10),
        (CellShape::Quadrilateral, 2, 9),
        (CellShape::Hexahedron, 1, 8),
    ];
    for (cell, degree, dim) in expected {
        let element = CiarletElement::<f64>::lagrange(cell, degree).unwrap();
        assert_eq!(element.space_dimension(), dim);
        assert_eq!(element.degree(), degree);
        assert_eq!(element.family(), ElementFamily::Lagrange);
        assert_eq!(element.mapping(), MapKind::Identity);
        assert_eq!(element.value_rank(), 0);
        assert_eq!(element.value_size(), 1);
    }
    assert!(CiarletElement::<f64>::lagrange(CellShape::Triangle, 0).is_err());
    assert!(CiarletElement::<f64>::lagrange(CellShape::Vertex, 1).is_err());
}

#[test]
fn p2_triangle_dofs_follow_entities() {
    let element = CiarletElement::<f64>::lagrange(CellShape::Triangle, 2).unwrap();
    let entity_dofs = element.entity_dofs();
    assert_eq!(entity_dofs.num_entity_dofs(0), 1);
    assert_eq!(entity_dofs.num_entity_dofs(1), 1);
    assert_eq!(entity_dofs.num_entity_dofs(2), 0);
    assert_eq!(entity_dofs.dofs(0, 2), &[2]);
    assert_eq!(entity_dofs.dofs(1, 0), &[3]);

    // Edge 0 joins vertices 1 and 2
    let nodes = element.reference_dof_coordinates().unwrap();
    assert_eq!(&nodes[6..8], &[0.5, 0.5]);
}

#[test]
fn discontinuous_lagrange_dofs_belong_to_cell() {
    let element = CiarletElement::<f64>::discontinuous_lagrange(CellShape::Triangle, 1).unwrap();
    assert_eq!(element.family(), ElementFamily::DiscontinuousLagrange);
    assert_eq!(element.entity_dofs().num_entity_dofs(0), 0);
    assert_eq!(element.entity_dofs().dofs(2, 0), &[0, 1, 2]);

    let constant = CiarletElement::<f64>::discontinuous_lagrange(CellShape::Tetrahedron, 0).unwrap();
    assert_eq!(constant.space_dimension(), 1);
}

#[test]
fn real_element_is_a_single_constant() {
    let element = CiarletElement::<f64>::real(CellShape::Quadrilateral).unwrap();
    assert_eq!(element.family(), ElementFamily::Real);
    assert_eq!(element.space_dimension(), 1);
    let mut values = vec![0.0; 2];
    element.evaluate_reference_basis(&mut values, &[0.1, 0.9, 0.7, 0.2]).unwrap();
    for value in values {
        assert_scalar_eq!(value, 1.0, comp = abs, tol = 1e-14);
    }
}

#[test]
fn evaluation_validates_arguments() {
    let element = CiarletElement::<f64>::lagrange(CellShape::Triangle, 1).unwrap();

    let mut values = vec![0.0; 3];
    let outside = element.evaluate_reference_basis(&mut values, &[0.8, 0.8]);
    assert!(matches!(outside, Err(FormError::InvalidArgument(_))));

    let mut values = vec![0.0; 2];
    assert!(element.evaluate_reference_basis(&mut values, &[0.2, 0.2]).is_err());

    let order = MAX_DERIVATIVE_ORDER + 1;
    let mut values = vec![0.0; 3 * num_derivatives(2, order)];
    assert!(element
        .evaluate_reference_basis_derivatives(&mut values, order, &[0.2, 0.2])
        .is_err());
}

#[test]
fn p1_triangle_gradients() {
    let element = CiarletElement::<f64>::lagrange(CellShape::Triangle, 1).unwrap();
    let mut values = vec![0.0; 3 * 2];
    element
        .evaluate_reference_basis_derivatives(&mut values, 1, &[0.3, 0.1])
        .unwrap();
    let expected = [-1.0, -1.0, 1.0, 0.0, 0.0, 1.0];
    for (&value, &e) in values.iter().zip(&expected) {
        assert_scalar_eq!(value, e, comp = abs, tol = 1e-12);
    }

    let mut values = vec![0.0; 3 * 4];
    element
        .evaluate_reference_basis_derivatives(&mut values, 2, &[0.3, 0.1])
        .unwrap();
    assert!(values.iter().all(|v| v.abs() < 1e-12));
}

#[test]
fn q1_quadrilateral_mixed_derivative() {
    let element = CiarletElement::<f64>::lagrange(CellShape::Quadrilateral, 1).unwrap();
    // Derivatives of order 2 are ordered xx, xy, yx, yy
    let mut values = vec![0.0; 4 * 4];
    element
        .evaluate_reference_basis_derivatives(&mut values, 2, &[0.25, 0.75])
        .unwrap();
    let expected_xy = [1.0, -1.0, -1.0, 1.0];
    for (dof, &xy) in expected_xy.iter().enumerate() {
        let block = &values[dof * 4..(dof + 1) * 4];
        assert_scalar_eq!(block[0], 0.0, comp = abs, tol = 1e-12);
        assert_scalar_eq!(block[1], xy, comp = abs, tol = 1e-12);
        assert_scalar_eq!(block[2], xy, comp = abs, tol = 1e-12);
        assert_scalar_eq!(block[3], 0.0, comp = abs, tol = 1e-12);
    }
}

/// Applying the dof functionals to the basis functions on the reference cell gives the identity.
fn assert_dual_basis(element: &dyn ReferenceElement<f64>) {
    let cell = element.cell_shape();
    let gdim = element.geometric_dimension();
    let cmap = CoordinateMapping::lagrange(cell, 1, gdim).unwrap();
    let coordinate_dofs = reference_coordinates(cell);
    let points = element.interpolation_points();
    let table = element.tabulate_reference_basis(0, &points);
    let value_size = element.value_size();
    let n = element.space_dimension();

    let mut functionals = DMatrix::zeros(n, n);
    for j in 0..n {
        let values: Vec<f64> = (0..table.num_points())
            .flat_map(|q| table.dof_block(0, q, j).to_vec())
            .collect();
        assert_eq!(values.len(), table.num_points() * value_size);
        let mut dofs = vec![0.0; n];
        element
            .map_dofs(&mut dofs, &values, &coordinate_dofs, CellOrientation::Reference, &cmap)
            .unwrap();
        functionals.set_column(j, &nalgebra::DVector::from_vec(dofs));
    }
    assert_matrix_eq!(functionals, DMatrix::identity(n, n), comp = abs, tol = 1e-10);
}

#[test]
fn dof_functionals_are_dual_to_basis() {
    assert_dual_basis(&CiarletElement::<f64>::lagrange(CellShape::Tetrahedron, 2).unwrap());
    assert_dual_basis(&CiarletElement::<f64>::raviart_thomas(CellShape::Triangle, 2).unwrap());
    assert_dual_basis(&CiarletElement::<f64>::raviart_thomas(CellShape::Tetrahedron, 3).unwrap());
    assert_dual_basis(&CiarletElement::<f64>::nedelec_first_kind(CellShape::Triangle, 2).unwrap());
    assert_dual_basis(&CiarletElement::<f64>::nedelec_first_kind(CellShape::Tetrahedron, 3).unwrap());
}

#[test]
fn piola_elements_have_vector_values() {
    let rt = CiarletElement::<f64>::raviart_thomas(CellShape::Triangle, 2).unwrap();
    assert_eq!(rt.space_dimension(), 3);
    assert_eq!(rt.mapping(), MapKind::ContravariantPiola);
    assert_eq!(rt.value_shape(), &[2]);
    assert_eq!(rt.reference_value_shape(), &[2]);
    assert_eq!(rt.entity_dofs().num_entity_dofs(1), 1);
    assert!(!rt.has_reference_dof_coordinates());
    let mut coordinates = vec![0.0; 6];
    assert!(matches!(
        rt.tabulate_reference_dof_coordinates(&mut coordinates),
        Err(FormError::ContractMismatch(_))
    ));

    let nedelec = CiarletElement::<f64>::nedelec_first_kind(CellShape::Tetrahedron, 3).unwrap();
    assert_eq!(nedelec.space_dimension(), 6);
    assert_eq!(nedelec.mapping(), MapKind::CovariantPiola);

    // Manifold embedding changes the physical shape only
    let embedded = CiarletElement::<f64>::raviart_thomas(CellShape::Triangle, 3).unwrap();
    assert_eq!(embedded.value_shape(), &[3]);
    assert_eq!(embedded.reference_value_shape(), &[2]);
    assert!(CiarletElement::<f64>::raviart_thomas(CellShape::Quadrilateral, 2).is_err());
}

#[test]
fn vector_element_blocks() {
    let scalar: Arc<dyn ReferenceElement<f64>> = Arc::new(CiarletElement::<f64>::lagrange(CellShape::Triangle, 1).unwrap());
    let vector = MixedElement::vector(scalar.clone(), 2).unwrap();
    assert_eq!(vector.space_dimension(), 6);
    assert_eq!(vector.value_shape(), &[2]);
    assert_eq!(vector.num_sub_elements(), 2);
    assert_eq!(vector.dof_range(1), 3..6);
    assert!(matches!(vector.sub_element(2), Err(FormError::ContractMismatch(_))));

    let table = vector.tabulate_reference_basis(0, &[0.2, 0.3]);
    // Dof 4 is the second scalar basis function in the second component
    assert_scalar_eq!(table.get(0, 0, 4, 0, 0), 0.0, comp = abs, tol = 1e-15);
    assert_scalar_eq!(table.get(0, 0, 4, 0, 1), 0.2, comp = abs, tol = 1e-14);

    let nested = MixedElement::vector(Arc::new(vector) as Arc<dyn ReferenceElement<f64>>, 2);
    assert!(nested.is_err());
}

#[test]
fn tensor_element_shapes() {
    let scalar: Arc<dyn ReferenceElement<f64>> = Arc::new(CiarletElement::<f64>::lagrange(CellShape::Triangle, 1).unwrap());

    let full = MixedElement::tensor(scalar.clone(), &[2, 3], false).unwrap();
    assert_eq!(full.value_rank(), 2);
    assert_eq!(full.value_shape(), &[2, 3]);
    assert_eq!(full.value_dimension(1).unwrap(), 3);
    assert_eq!(full.value_size(), 6);
    assert_eq!(full.reference_value_shape(), &[2, 3]);
    assert_eq!(full.num_sub_elements(), 6);
    assert_eq!(full.space_dimension(), 18);
    assert_eq!(full.dof_range(4), 12..15);
    assert_eq!(full.value_range(4), 4..5);
    assert_dual_basis(&full);

    let symmetric = MixedElement::tensor(scalar.clone(), &[2, 2], true).unwrap();
    assert_eq!(symmetric.value_rank(), 2);
    assert_eq!(symmetric.value_size(), 4);
    assert_eq!(symmetric.reference_value_shape(), &[3]);
    assert_eq!(symmetric.reference_value_size(), 3);
    assert_eq!(symmetric.num_sub_elements(), 3);
    assert_eq!(symmetric.space_dimension(), 9);
    assert_eq!(symmetric.dof_range(1), 3..6);
    assert_eq!(symmetric.value_range(1), 1..2);
    assert_eq!(symmetric.value_range(2), 3..4);

    assert!(MixedElement::tensor(scalar.clone(), &[2, 3], true).is_err());
    assert!(MixedElement::tensor(scalar.clone(), &[], false).is_err());
    let vector: Arc<dyn ReferenceElement<f64>> = Arc::new(MixedElement::vector(scalar, 2).unwrap());
    assert!(MixedElement::tensor(vector, &[2, 2], false).is_err());
}

#[test]
fn symmetric_tensor_values_are_mirrored() {
    let scalar: Arc<dyn ReferenceElement<f64>> = Arc::new(CiarletElement::<f64>::lagrange(CellShape::Triangle, 1).unwrap());
    let symmetric = MixedElement::tensor(scalar, &[2, 2], true).unwrap();
    let cmap = CoordinateMapping::lagrange(CellShape::Triangle, 1, 2).unwrap();
    let coordinate_dofs = [0.0, 0.0, 2.0, 0.0, 0.0, 1.0];
    let point = [0.2, 0.3];

    let reference = symmetric.tabulate_reference_basis(0, &point);
    let geometry = cmap
        .tabulate_geometry(&point, 0, &coordinate_dofs, CellOrientation::Reference)
        .unwrap();
    let physical = symmetric
        .transform_reference_basis_derivatives(&reference, &geometry, 0)
        .unwrap();
    assert_eq!(physical.value_size(), 4);

    // Dof 4 is the second scalar basis function of the off-diagonal entry
    let expected = [0.0, 0.2, 0.2, 0.0];
    for (c, &value) in expected.iter().enumerate() {
        assert_scalar_eq!(physical.get(0, 0, 4, 0, c), value, comp = abs, tol = 1e-14);
    }
    // Dof 7 belongs to the (1, 1) entry only
    assert_scalar_eq!(physical.get(0, 0, 7, 0, 3), 0.2, comp = abs, tol = 1e-14);
    assert_scalar_eq!(physical.get(0, 0, 7, 0, 1), 0.0, comp = abs, tol = 1e-15);
}

#[test]
fn mixed_element_of_piola_and_scalar() {
    let rt: Arc<dyn ReferenceElement<f64>> = Arc::new(CiarletElement::<f64>::raviart_thomas(CellShape::Triangle, 2).unwrap());
    let dg: Arc<dyn ReferenceElement<f64>> =
        Arc::new(CiarletElement::discontinuous_lagrange(CellShape::Triangle, 0).unwrap());
    let mixed = MixedElement::new(vec![rt, dg]).unwrap();
    assert_eq!(mixed.mapping(), MapKind::Mixed);
    assert_eq!(mixed.space_dimension(), 4);
    assert_eq!(mixed.value_size(), 3);
    assert_eq!(mixed.value_range(1), 2..3);
    assert_dual_basis(&mixed);

    let quad: Arc<dyn ReferenceElement<f64>> = Arc::new(CiarletElement::<f64>::lagrange(CellShape::Quadrilateral, 1).unwrap());
    let tri: Arc<dyn ReferenceElement<f64>> = Arc::new(CiarletElement::<f64>::lagrange(CellShape::Triangle, 1).unwrap());
    assert!(MixedElement::new(vec![quad, tri]).is_err());
}

proptest! {
    #[test]
    fn lagrange_basis_is_partition_of_unity(point in reference_point(CellShape::Tetrahedron)) {
        let element = CiarletElement::<f64>::lagrange(CellShape::Tetrahedron, 3).unwrap();
        let table = element.tabulate_reference_basis(1, &point);
        let n = element.space_dimension();
        let sum: f64 = (0..n).map(|dof| table.get(0, 0, dof, 0, 0)).sum();
        prop_assert!((sum - 1.0).abs() < 1e-10);
        for d in 0..3 {
            let gradient_sum: f64 = (0..n).map(|dof| table.get(1, 0, dof, d, 0)).sum();
            prop_assert!(gradient_sum.abs() < 1e-9);
        }
    }

    #[test]
    fn q2_basis_is_partition_of_unity(point in reference_point(CellShape::Hexahedron)) {
        let element = CiarletElement::<f64>::lagrange(CellShape::Hexahedron, 2).unwrap();
        let table = element.tabulate_reference_basis(0, &point);
        let sum: f64 = (0..element.space_dimension()).map(|dof| table.get(0, 0, dof, 0, 0)).sum();
        prop_assert!((sum - 1.0).abs() < 1e-10);
    }
}
