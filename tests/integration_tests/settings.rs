use fem_kernel::cell::{CellOrientation, CellShape};
use fem_kernel::coordinate_map::{CoordinateMapping, InverseMapSettings};
use fem_kernel::element::{CiarletElement, ReferenceElement};
use fem_kernel::integral::{Functional, Integral, IntegralType, QuadratureIntegralBuilder, TabulationSettings};
use fem_kernel::proptest::affine_cell_coordinates;
use fem_kernel::quadrature::QuadratureScheme;
use matrixcompare::assert_scalar_eq;
use proptest::prelude::*;
use std::sync::Arc;

#[test]
fn tabulation_settings_from_json() {
    let defaults: TabulationSettings = serde_json::from_str("{}").unwrap();
    assert_eq!(defaults, TabulationSettings::default());
    assert_eq!(defaults.quadrature_degree, 2);
    assert_eq!(defaults.inverse_map, None);

    let json = r#"{
        "quadrature_degree": 4,
        "scheme": "Canonical",
        "inverse_map": { "max_iterations": 5, "line_search": true }
    }"#;
    let settings: TabulationSettings = serde_json::from_str(json).unwrap();
    assert_eq!(settings.quadrature_degree, 4);
    assert_eq!(settings.scheme, QuadratureScheme::Canonical);
    let inverse_map = settings.inverse_map.unwrap();
    assert_eq!(inverse_map.max_iterations, 5);
    assert!(inverse_map.line_search);
    assert_eq!(inverse_map.tolerance, 1e-12);

    let round_trip: TabulationSettings = serde_json::from_str(&serde_json::to_string(&settings).unwrap()).unwrap();
    assert_eq!(round_trip, settings);
    assert!(serde_json::from_str::<TabulationSettings>(r#"{ "scheme": "Fancy" }"#).is_err());

    // Settings flow into the integrals built with them
    let cmap = Arc::new(CoordinateMapping::<f64>::lagrange(CellShape::Quadrilateral, 1, 2).unwrap());
    let integral = QuadratureIntegralBuilder::new(cmap)
        .with_settings(settings)
        .build_quadrature_integral(IntegralType::Cell, Arc::new(Functional::measure()))
        .unwrap();
    assert_eq!(integral.settings(), &settings);
    assert_eq!(integral.coordinate_mapping().inverse_map_settings(), &inverse_map);
}

#[test]
fn coordinate_mapping_keeps_its_inverse_map_settings() {
    let own = InverseMapSettings {
        max_iterations: 7,
        ..InverseMapSettings::default()
    };
    let cmap = Arc::new(
        CoordinateMapping::<f64>::lagrange(CellShape::Quadrilateral, 1, 2)
            .unwrap()
            .with_inverse_map_settings(own),
    );
    let integral = QuadratureIntegralBuilder::new(cmap.clone())
        .build_quadrature_integral(IntegralType::Custom, Arc::new(Functional::measure()))
        .unwrap();
    assert_eq!(integral.coordinate_mapping().inverse_map_settings(), &own);

    let overridden = InverseMapSettings {
        line_search: true,
        ..InverseMapSettings::default()
    };
    let integral = QuadratureIntegralBuilder::new(cmap)
        .with_settings(TabulationSettings {
            inverse_map: Some(overridden),
            ..TabulationSettings::default()
        })
        .build_quadrature_integral(IntegralType::Custom, Arc::new(Functional::measure()))
        .unwrap();
    assert_eq!(integral.coordinate_mapping().inverse_map_settings(), &overridden);
}

#[test]
fn p1_basis_at_centroid() {
    let element = CiarletElement::<f64>::lagrange(CellShape::Triangle, 1).unwrap();
    let mut values = [0.0; 3];
    element
        .evaluate_reference_basis(&mut values, &[1.0 / 3.0, 1.0 / 3.0])
        .unwrap();
    for value in values {
        assert_scalar_eq!(value, 1.0 / 3.0, comp = abs, tol = 1e-15);
    }
}

proptest! {
    #[test]
    fn jacobian_determinant_is_twice_the_area(
        coordinate_dofs in affine_cell_coordinates(CellShape::Triangle, 2)
    ) {
        let cmap = CoordinateMapping::lagrange(CellShape::Triangle, 1, 2).unwrap();
        let geometry = cmap
            .tabulate_geometry(&[0.25, 0.25], 0, &coordinate_dofs, CellOrientation::Reference)
            .unwrap();
        let x = &coordinate_dofs;
        let signed_area = 0.5 * ((x[2] - x[0]) * (x[5] - x[1]) - (x[4] - x[0]) * (x[3] - x[1]));
        prop_assert!((geometry.determinant(0) - 2.0 * signed_area).abs() < 1e-12);

        // The measure integral recovers the area
        let integral = QuadratureIntegralBuilder::new(Arc::new(cmap))
            .build(IntegralType::Cell, Arc::new(Functional::measure()))
            .unwrap();
        let Integral::Cell(integral) = integral else {
            panic!("expected a cell integral");
        };
        let mut a = [0.0];
        integral.tabulate_tensor(&mut a, &[], &coordinate_dofs, CellOrientation::Flipped).unwrap();
        prop_assert!((a[0] - signed_area.abs()).abs() < 1e-12);
    }
}
