use fem_kernel::cell::{CellOrientation, CellShape, RAW_SHAPE_NONE};
use fem_kernel::error::FormError;
use matrixcompare::assert_scalar_eq;

#[test]
fn entity_counts_match_reference_cells() {
    let expected: [(CellShape, &[usize]); 6] = [
        (CellShape::Vertex, &[1]),
        (CellShape::Interval, &[2, 1]),
        (CellShape::Triangle, &[3, 3, 1]),
        (CellShape::Quadrilateral, &[4, 4, 1]),
        (CellShape::Tetrahedron, &[4, 6, 4, 1]),
        (CellShape::Hexahedron, &[8, 12, 6, 1]),
    ];
    for (cell, counts) in expected {
        assert_eq!(cell.topological_dimension() + 1, counts.len());
        for (d, &count) in counts.iter().enumerate() {
            assert_eq!(cell.num_entities(d), count, "{} entities of dimension {}", cell, d);
        }
        assert_eq!(cell.num_entities(counts.len()), 0);
    }
}

#[test]
fn facet_shapes() {
    assert_eq!(CellShape::Vertex.facet_shape(), None);
    assert_eq!(CellShape::Interval.facet_shape(), Some(CellShape::Vertex));
    assert_eq!(CellShape::Triangle.facet_shape(), Some(CellShape::Interval));
    assert_eq!(CellShape::Quadrilateral.facet_shape(), Some(CellShape::Interval));
    assert_eq!(CellShape::Tetrahedron.facet_shape(), Some(CellShape::Triangle));
    assert_eq!(CellShape::Hexahedron.facet_shape(), Some(CellShape::Quadrilateral));
    assert_eq!(CellShape::Vertex.num_facets(), 0);
    assert_eq!(CellShape::Hexahedron.num_facets(), 6);
}

#[test]
fn raw_shape_values_round_trip_and_none_is_rejected() {
    for cell in CellShape::ALL {
        assert_eq!(CellShape::from_raw(cell.to_raw()), Ok(cell));
    }
    assert!(matches!(
        CellShape::from_raw(RAW_SHAPE_NONE),
        Err(FormError::ContractMismatch(_))
    ));
    assert!(matches!(CellShape::from_raw(9), Err(FormError::InvalidArgument(_))));
    assert!(CellOrientation::from_raw(2).is_err());
    assert_eq!(CellOrientation::from_raw(1), Ok(CellOrientation::Flipped));
}

#[test]
fn triangle_edges_are_numbered_by_opposite_vertex() {
    let cell = CellShape::Triangle;
    assert_eq!(cell.facet_vertices(0).unwrap(), &[1, 2]);
    assert_eq!(cell.facet_vertices(1).unwrap(), &[0, 2]);
    assert_eq!(cell.facet_vertices(2).unwrap(), &[0, 1]);
    assert!(cell.facet_vertices(3).is_err());
}

#[test]
fn closure_of_triangle_edge() {
    let closure = CellShape::Triangle.sub_entity_closure(1, 0).unwrap();
    assert_eq!(closure, vec![(0, 1), (0, 2), (1, 0)]);

    let closure = CellShape::Tetrahedron.sub_entity_closure(3, 0).unwrap();
    assert_eq!(closure.len(), 4 + 6 + 4 + 1);

    assert!(CellShape::Triangle.sub_entity_closure(1, 3).is_err());
}

#[test]
fn reference_midpoints_and_volumes() {
    let midpoint = CellShape::Tetrahedron.reference_midpoint::<f64>();
    for x in midpoint {
        assert_scalar_eq!(x, 0.25, comp = abs, tol = 1e-15);
    }
    let midpoint = CellShape::Hexahedron.reference_midpoint::<f64>();
    for x in midpoint {
        assert_scalar_eq!(x, 0.5, comp = abs, tol = 1e-15);
    }
    assert_eq!(CellShape::Triangle.reference_volume(), 0.5);
    assert_eq!(CellShape::Quadrilateral.reference_volume(), 1.0);
}

#[test]
fn contains_respects_tolerance() {
    let cell = CellShape::Triangle;
    assert!(cell.contains(&[0.5, 0.5], 0.0));
    assert!(!cell.contains(&[0.5, 0.5 + 1e-8], 1e-10));
    assert!(cell.contains(&[0.5, 0.5 + 1e-12], 1e-10));
    assert!(!cell.contains(&[-0.1, 0.2], 1e-10));
    assert!(!cell.contains(&[0.1], 1e-10));
    assert!(CellShape::Quadrilateral.contains(&[1.0, 1.0], 0.0));
}

#[test]
fn facet_points_map_onto_facet() {
    let mut point = [0.0; 2];
    CellShape::Triangle.map_facet_point(0, &[0.25], &mut point).unwrap();
    assert_scalar_eq!(point[0], 0.75, comp = abs, tol = 1e-15);
    assert_scalar_eq!(point[1], 0.25, comp = abs, tol = 1e-15);

    let mut point = [0.0; 3];
    CellShape::Hexahedron
        .map_facet_point(5, &[0.5, 0.25], &mut point)
        .unwrap();
    assert_eq!(point, [0.5, 0.25, 1.0]);

    let mut point = [0.0; 2];
    assert!(CellShape::Triangle.map_facet_point(0, &[0.1, 0.1], &mut point).is_err());
}

#[test]
fn reference_normals_point_outward() {
    let s = 1.0 / 2f64.sqrt();
    let expected: [(usize, [f64; 2]); 3] = [(0, [s, s]), (1, [-1.0, 0.0]), (2, [0.0, -1.0])];
    for (facet, normal) in expected {
        let computed = CellShape::Triangle.facet_reference_normal::<f64>(facet).unwrap();
        for (c, e) in computed.iter().zip(normal) {
            assert_scalar_eq!(*c, e, comp = abs, tol = 1e-14);
        }
    }

    assert_eq!(CellShape::Interval.facet_reference_normal::<f64>(0).unwrap(), vec![-1.0]);
    assert_eq!(CellShape::Interval.facet_reference_normal::<f64>(1).unwrap(), vec![1.0]);

    // Every hexahedron face normal is a signed unit axis
    for facet in 0..6 {
        let normal = CellShape::Hexahedron.facet_reference_normal::<f64>(facet).unwrap();
        let norm: f64 = normal.iter().map(|n| n * n).sum();
        assert_scalar_eq!(norm, 1.0, comp = abs, tol = 1e-14);
        assert_eq!(normal.iter().filter(|n| n.abs() > 0.5).count(), 1);
    }
}

#[test]
fn orientation_sign() {
    assert_eq!(CellOrientation::default(), CellOrientation::Reference);
    assert_eq!(CellOrientation::Reference.sign::<f64>(), 1.0);
    assert_eq!(CellOrientation::Flipped.sign::<f64>(), -1.0);
}
