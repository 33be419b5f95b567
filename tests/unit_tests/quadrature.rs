use fem_kernel::cell::CellShape;
use fem_kernel::error::FormError;
use fem_kernel::quadrature::{
    create_facet_quadratures, create_quadrature, map_facet_quadrature, QuadratureRule, QuadratureScheme,
    MAX_QUADRATURE_DEGREE,
};
use matrixcompare::assert_scalar_eq;

fn weight_sum(rule: &QuadratureRule<f64>) -> f64 {
    rule.weights().iter().sum()
}

#[test]
fn weights_sum_to_reference_volume() {
    for cell in CellShape::ALL {
        for scheme in [QuadratureScheme::Default, QuadratureScheme::Canonical] {
            for degree in 0..=6 {
                let rule = create_quadrature::<f64>(cell, degree, scheme).unwrap();
                assert_eq!(rule.dim(), cell.topological_dimension());
                assert_eq!(rule.points().len(), rule.num_points() * rule.dim());
                assert_scalar_eq!(weight_sum(&rule), cell.reference_volume(), comp = abs, tol = 1e-13);
            }
        }
    }
}

#[test]
fn points_lie_inside_reference_cells() {
    for cell in CellShape::ALL {
        let rule = create_quadrature::<f64>(cell, 5, QuadratureScheme::Default).unwrap();
        for i in 0..rule.num_points() {
            assert!(cell.contains(rule.point(i), 1e-14), "{:?} outside {}", rule.point(i), cell);
        }
    }
}

#[test]
fn triangle_rule_integrates_quadratic_exactly() {
    let rule = create_quadrature::<f64>(CellShape::Triangle, 2, QuadratureScheme::Default).unwrap();
    // int x^2 = 1/12, int xy = 1/24 over the reference triangle
    assert_scalar_eq!(rule.integrate(|p| p[0] * p[0]), 1.0 / 12.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(rule.integrate(|p| p[0] * p[1]), 1.0 / 24.0, comp = abs, tol = 1e-14);
}

#[test]
fn hexahedron_rule_integrates_trilinear_product() {
    let rule = create_quadrature::<f64>(CellShape::Hexahedron, 3, QuadratureScheme::Default).unwrap();
    let integral = rule.integrate(|p| p[0] * p[0] * p[0] * p[1] * p[2]);
    assert_scalar_eq!(integral, 1.0 / 16.0, comp = abs, tol = 1e-14);
}

#[test]
fn degree_above_maximum_is_rejected() {
    let result = create_quadrature::<f64>(CellShape::Interval, MAX_QUADRATURE_DEGREE + 1, QuadratureScheme::Default);
    assert!(matches!(result, Err(FormError::InvalidArgument(_))));
}

#[test]
fn rule_constructor_checks_lengths() {
    assert!(QuadratureRule::new(2, vec![0.5], vec![0.1, 0.2]).is_ok());
    assert!(QuadratureRule::new(2, vec![0.5], vec![0.1]).is_err());
}

#[test]
fn facet_rules_lie_on_their_facets() {
    for cell in [
        CellShape::Interval,
        CellShape::Triangle,
        CellShape::Quadrilateral,
        CellShape::Tetrahedron,
        CellShape::Hexahedron,
    ] {
        let rules = create_facet_quadratures::<f64>(cell, 3, QuadratureScheme::Default).unwrap();
        assert_eq!(rules.len(), cell.num_facets());
        for (facet, rule) in rules.iter().enumerate() {
            let facet_shape = cell.facet_shape().unwrap();
            assert_scalar_eq!(weight_sum(rule), facet_shape.reference_volume(), comp = abs, tol = 1e-13);

            // The outward normal is orthogonal to every difference of facet points
            let normal = cell.facet_reference_normal::<f64>(facet).unwrap();
            let vertex = cell.reference_vertex::<f64>(cell.facet_vertices(facet).unwrap()[0]);
            for i in 0..rule.num_points() {
                let point = rule.point(i);
                assert!(cell.contains(point, 1e-14));
                let offset: f64 = (0..point.len()).map(|k| normal[k] * (point[k] - vertex[k])).sum();
                assert_scalar_eq!(offset, 0.0, comp = abs, tol = 1e-14);
            }
        }
    }
}

#[test]
fn mapping_onto_missing_facet_fails() {
    let rule = create_quadrature::<f64>(CellShape::Interval, 2, QuadratureScheme::Default).unwrap();
    assert!(map_facet_quadrature(CellShape::Triangle, 3, &rule).is_err());
    assert!(create_facet_quadratures::<f64>(CellShape::Vertex, 2, QuadratureScheme::Default).is_err());
}
