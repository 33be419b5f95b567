use fem_kernel_traits::Real;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut, Scalar};
use numeric_literals::replace_float_literals;
use std::error::Error;

/// Error produced when a (possibly approximate) Jacobian system cannot be solved.
pub type JacobianSolveError = Box<dyn Error + Send + Sync>;

/// A function $F: \mathbb{R}^n \rightarrow \mathbb{R}^n$.
pub trait VectorFunction<T>
where
    T: Scalar,
{
    fn dimension(&self) -> usize;
    fn eval_into(&mut self, f: &mut DVectorViewMut<T>, x: &DVectorView<T>);
}

impl<T, X> VectorFunction<T> for &mut X
where
    T: Scalar,
    X: VectorFunction<T>,
{
    fn dimension(&self) -> usize {
        X::dimension(self)
    }

    fn eval_into(&mut self, f: &mut DVectorViewMut<T>, x: &DVectorView<T>) {
        X::eval_into(self, f, x)
    }
}

/// A vector function whose linearization can be inverted.
///
/// The "Jacobian" does not need to be exact. Gauss-Newton type methods solve the normal
/// equations $J^T J \, \delta = J^T r$ in place of the true Jacobian of $J^T r$.
pub trait DifferentiableVectorFunction<T>: VectorFunction<T>
where
    T: Scalar,
{
    /// Solves `J(x) sol = rhs`.
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<T>,
        x: &DVectorView<T>,
        rhs: &DVectorView<T>,
    ) -> Result<(), JacobianSolveError>;
}

impl<T, X> DifferentiableVectorFunction<T> for &mut X
where
    T: Scalar,
    X: DifferentiableVectorFunction<T>,
{
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<T>,
        x: &DVectorView<T>,
        rhs: &DVectorView<T>,
    ) -> Result<(), JacobianSolveError> {
        X::solve_jacobian_system(self, sol, x, rhs)
    }
}

/// Builds a [`DifferentiableVectorFunction`] from closures.
///
/// ```
/// # use fem_kernel_optimize::calculus::{VectorFunction, VectorFunctionBuilder};
/// # use nalgebra::{DVector, DVectorView, DVectorViewMut};
/// let mut square = VectorFunctionBuilder::with_dimension(1)
///     .with_function(|f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>| f[0] = x[0] * x[0] - 2.0);
/// let mut f = DVector::zeros(1);
/// square.eval_into(&mut DVectorViewMut::from(&mut f), &DVectorView::from(&DVector::from_element(1, 2.0)));
/// assert_eq!(f[0], 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct VectorFunctionBuilder {
    dimension: usize,
}

#[derive(Debug, Clone)]
pub struct ConcreteVectorFunction<F, J> {
    dimension: usize,
    function: F,
    jacobian_solver: J,
}

impl VectorFunctionBuilder {
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn with_function<F, T>(self, function: F) -> ConcreteVectorFunction<F, ()>
    where
        T: Scalar,
        F: FnMut(&mut DVectorViewMut<T>, &DVectorView<T>),
    {
        ConcreteVectorFunction {
            dimension: self.dimension,
            function,
            jacobian_solver: (),
        }
    }
}

impl<F> ConcreteVectorFunction<F, ()> {
    pub fn with_jacobian_solver<J, T>(self, jacobian_solver: J) -> ConcreteVectorFunction<F, J>
    where
        T: Scalar,
        J: FnMut(&mut DVectorViewMut<T>, &DVectorView<T>, &DVectorView<T>) -> Result<(), JacobianSolveError>,
    {
        ConcreteVectorFunction {
            dimension: self.dimension,
            function: self.function,
            jacobian_solver,
        }
    }
}

impl<F, J, T> VectorFunction<T> for ConcreteVectorFunction<F, J>
where
    T: Scalar,
    F: FnMut(&mut DVectorViewMut<T>, &DVectorView<T>),
{
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn eval_into(&mut self, f: &mut DVectorViewMut<T>, x: &DVectorView<T>) {
        (self.function)(f, x)
    }
}

impl<F, J, T> DifferentiableVectorFunction<T> for ConcreteVectorFunction<F, J>
where
    T: Scalar,
    F: FnMut(&mut DVectorViewMut<T>, &DVectorView<T>),
    J: FnMut(&mut DVectorViewMut<T>, &DVectorView<T>, &DVectorView<T>) -> Result<(), JacobianSolveError>,
{
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<T>,
        x: &DVectorView<T>,
        rhs: &DVectorView<T>,
    ) -> Result<(), JacobianSolveError> {
        (self.jacobian_solver)(sol, x, rhs)
    }
}

/// Approximates the Jacobian of $f: \mathbb{R}^n \rightarrow \mathbb{R}^m$ with central
/// differences of step `h`.
///
/// The result is the $m \times n$ matrix with entries $J_{ij} = \partial f_i / \partial x_j$.
/// Used to cross-check analytic Jacobians of coordinate maps.
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn approximate_jacobian_fd<T>(m: usize, mut f: impl FnMut(&DVector<T>, &mut DVector<T>), x: &DVector<T>, h: T) -> DMatrix<T>
where
    T: Real,
{
    let n = x.len();
    let mut jacobian = DMatrix::zeros(m, n);
    let mut x_perturbed = x.clone();
    let mut f_plus = DVector::zeros(m);
    let mut f_minus = DVector::zeros(m);

    for j in 0..n {
        x_perturbed[j] = x[j] + h;
        f(&x_perturbed, &mut f_plus);
        x_perturbed[j] = x[j] - h;
        f(&x_perturbed, &mut f_minus);
        x_perturbed[j] = x[j];

        let mut column = jacobian.column_mut(j);
        column.copy_from(&f_plus);
        column -= &f_minus;
        column /= 2.0 * h;
    }

    jacobian
}
