use fem_kernel_optimize::calculus::{DifferentiableVectorFunction, JacobianSolveError, VectorFunction, VectorFunctionBuilder};
use fem_kernel_optimize::newton::*;
use matrixcompare::assert_scalar_eq;
use nalgebra::{DVector, DVectorView, DVectorViewMut, Matrix3, Vector3};
use numeric_literals::replace_numeric_literals;

struct LinearSystem;

impl LinearSystem {
    #[replace_numeric_literals(f64::from(literal))]
    fn matrix() -> Matrix3<f64> {
        Matrix3::new(5, 1, 2, 1, 4, 2, 2, 2, 4)
    }
}

impl VectorFunction<f64> for LinearSystem {
    fn dimension(&self) -> usize {
        3
    }

    fn eval_into(&mut self, f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>) {
        let r = Self::matrix() * x - Vector3::new(1.0, 2.0, 3.0);
        f.copy_from(&r);
    }
}

impl DifferentiableVectorFunction<f64> for LinearSystem {
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<f64>,
        _x: &DVectorView<f64>,
        rhs: &DVectorView<f64>,
    ) -> Result<(), JacobianSolveError> {
        let a_inv = Self::matrix()
            .try_inverse()
            .ok_or_else(|| JacobianSolveError::from("singular"))?;
        sol.copy_from(&(a_inv * rhs));
        Ok(())
    }
}

#[test]
fn newton_converges_in_single_iteration_for_linear_system() {
    let expected_solution = Vector3::new(-0.125, 1.0 / 6.0, 35.0 / 48.0);
    let settings = NewtonSettings {
        max_iterations: Some(2),
        tolerance: 1e-12,
    };

    let mut f = DVector::zeros(3);
    let mut x = DVector::zeros(3);
    let mut dx = DVector::zeros(3);

    let outcome = newton(LinearSystem, &mut x, &mut f, &mut dx, settings).unwrap();
    assert!((x - expected_solution).norm() < 1e-12);
    assert_eq!(outcome.iterations, 1);
    assert!(outcome.residual_norm <= 1e-12);
}

fn sqrt_two_function() -> impl DifferentiableVectorFunction<f64> {
    VectorFunctionBuilder::with_dimension(1)
        .with_function(|f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>| f[0] = x[0] * x[0] - 2.0)
        .with_jacobian_solver(
            |sol: &mut DVectorViewMut<f64>, x: &DVectorView<f64>, rhs: &DVectorView<f64>| {
                sol[0] = rhs[0] / (2.0 * x[0]);
                Ok(())
            },
        )
}

#[test]
fn newton_converges_quadratically_for_scalar_root() {
    let settings = NewtonSettings {
        max_iterations: Some(20),
        tolerance: 1e-14,
    };
    let mut x = DVector::from_element(1, 1.0);
    let mut f = DVector::zeros(1);
    let mut dx = DVector::zeros(1);

    let outcome = newton(sqrt_two_function(), &mut x, &mut f, &mut dx, settings).unwrap();
    assert_scalar_eq!(x[0], 2.0f64.sqrt(), comp = abs, tol = 1e-14);
    assert!(outcome.iterations <= 6);
}

#[test]
fn newton_reports_iteration_budget_exhaustion() {
    let settings = NewtonSettings {
        max_iterations: Some(1),
        tolerance: 1e-14,
    };
    let mut x = DVector::from_element(1, 10.0);
    let mut f = DVector::zeros(1);
    let mut dx = DVector::zeros(1);

    let err = newton(sqrt_two_function(), &mut x, &mut f, &mut dx, settings).unwrap_err();
    match err {
        NewtonError::MaximumIterationsReached { iterations, residual_norm } => {
            assert_eq!(iterations, 1);
            assert!(residual_norm > 1.0);
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn newton_propagates_jacobian_failure() {
    let function = VectorFunctionBuilder::with_dimension(1)
        .with_function(|f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>| f[0] = x[0] - 1.0)
        .with_jacobian_solver(|_: &mut DVectorViewMut<f64>, _: &DVectorView<f64>, _: &DVectorView<f64>| {
            Err(JacobianSolveError::from("singular"))
        });
    let settings = NewtonSettings {
        max_iterations: None,
        tolerance: 1e-12,
    };
    let mut x = DVector::zeros(1);
    let mut f = DVector::zeros(1);
    let mut dx = DVector::zeros(1);

    let err = newton(function, &mut x, &mut f, &mut dx, settings).unwrap_err();
    assert!(matches!(err, NewtonError::JacobianError(_)));
}

#[test]
fn backtracking_line_search_damps_overshooting_steps() {
    // atan has a root at 0, but full Newton steps diverge from |x| > 1.39
    let function = VectorFunctionBuilder::with_dimension(1)
        .with_function(|f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>| f[0] = x[0].atan())
        .with_jacobian_solver(
            |sol: &mut DVectorViewMut<f64>, x: &DVectorView<f64>, rhs: &DVectorView<f64>| {
                sol[0] = rhs[0] * (1.0 + x[0] * x[0]);
                Ok(())
            },
        );
    let settings = NewtonSettings {
        max_iterations: Some(50),
        tolerance: 1e-12,
    };
    let mut x = DVector::from_element(1, 3.0);
    let mut f = DVector::zeros(1);
    let mut dx = DVector::zeros(1);

    let mut line_search = BacktrackingLineSearch::default();
    newton_line_search(function, &mut x, &mut f, &mut dx, settings, &mut line_search).unwrap();
    assert_scalar_eq!(x[0], 0.0, comp = abs, tol = 1e-10);
}

#[test]
fn newton_settings_deserialize_from_json() {
    let settings: NewtonSettings<f64> = serde_json::from_str(r#"{ "max_iterations": 15, "tolerance": 1e-10 }"#).unwrap();
    assert_eq!(settings.max_iterations, Some(15));
    assert_eq!(settings.tolerance, 1e-10);
}
