use fem_kernel_quadrature::univariate::{gauss, gauss_for_degree};
use matrixcompare::assert_scalar_eq;

#[test]
fn gauss_is_exact_for_monomials_up_to_twice_the_point_count_minus_one() {
    for n in 1..=12 {
        let (weights, points) = gauss(n);
        assert_eq!(weights.len(), n);
        for alpha in 0..2 * n {
            let integral: f64 = weights
                .iter()
                .zip(&points)
                .map(|(w, [x])| w * x.powi(alpha as i32))
                .sum();
            let expected = 1.0 / (alpha as f64 + 1.0);
            assert_scalar_eq!(integral, expected, comp = abs, tol = 1e-14);
        }
    }
}

#[test]
fn gauss_points_are_sorted_and_interior() {
    let (_, points) = gauss(7);
    for pair in points.windows(2) {
        assert!(pair[0][0] < pair[1][0]);
    }
    assert!(points.iter().all(|[x]| 0.0 < *x && *x < 1.0));
}

#[test]
fn gauss_for_degree_picks_minimal_point_count() {
    assert_eq!(gauss_for_degree(0).0.len(), 1);
    assert_eq!(gauss_for_degree(1).0.len(), 1);
    assert_eq!(gauss_for_degree(2).0.len(), 2);
    assert_eq!(gauss_for_degree(3).0.len(), 2);
    assert_eq!(gauss_for_degree(4).0.len(), 3);
}

#[test]
#[should_panic]
fn gauss_rejects_zero_points() {
    gauss(0);
}
