use crate::calculus::{DifferentiableVectorFunction, JacobianSolveError, VectorFunction};
use fem_kernel_traits::Real;
use itertools::iterate;
use log::{debug, trace};
use nalgebra::{DVectorView, DVectorViewMut, Scalar};
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::Display;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewtonSettings<T> {
    /// `None` iterates until convergence.
    pub max_iterations: Option<usize>,
    /// Absolute tolerance on the residual norm $|F(x)|_2$.
    pub tolerance: T,
}

/// Summary of a converged iteration.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NewtonOutcome<T> {
    pub iterations: usize,
    pub residual_norm: T,
}

#[derive(Debug)]
pub enum NewtonError {
    /// The iteration budget was exhausted. Carries the last residual norm.
    MaximumIterationsReached { iterations: usize, residual_norm: f64 },
    /// The residual became NaN or infinite, typically because the iterate left the
    /// domain where the function is well behaved.
    NonFiniteResidual { iterations: usize },
    /// Solving the Jacobian system failed.
    JacobianError(JacobianSolveError),
    /// The line search failed to produce an acceptable step.
    LineSearchError(Box<dyn Error + Send + Sync>),
}

impl NewtonError {
    /// Number of iterations performed before failing, if known.
    pub fn iterations(&self) -> Option<usize> {
        match self {
            Self::MaximumIterationsReached { iterations, .. } => Some(*iterations),
            Self::NonFiniteResidual { iterations } => Some(*iterations),
            _ => None,
        }
    }
}

impl Display for NewtonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            NewtonError::MaximumIterationsReached {
                iterations,
                residual_norm,
            } => {
                write!(
                    f,
                    "Failed to converge within {} iterations (residual norm {:e}).",
                    iterations, residual_norm
                )
            }
            NewtonError::NonFiniteResidual { iterations } => {
                write!(f, "Residual is not finite after {} iterations.", iterations)
            }
            NewtonError::JacobianError(err) => {
                write!(f, "Failed to solve Jacobian system. Error: {}", err)
            }
            NewtonError::LineSearchError(err) => {
                write!(f, "Line search failed to produce valid step. Error: {}", err)
            }
        }
    }
}

impl Error for NewtonError {}

/// Attempts to solve the non-linear equation F(x) = 0, starting from the given `x`.
///
/// The iteration has converged once `|F(x)|_2 <= tolerance`. The buffers `f` and `dx` are
/// scratch space of the same dimension as `x`; no heap allocation is performed.
pub fn newton<'a, T, F>(
    function: F,
    x: impl Into<DVectorViewMut<'a, T>>,
    f: impl Into<DVectorViewMut<'a, T>>,
    dx: impl Into<DVectorViewMut<'a, T>>,
    settings: NewtonSettings<T>,
) -> Result<NewtonOutcome<T>, NewtonError>
where
    T: Real,
    F: DifferentiableVectorFunction<T>,
{
    newton_line_search(function, x, f, dx, settings, &mut NoLineSearch)
}

/// Same as [`newton`], but with a configurable line search.
#[replace_float_literals(T::from_f64(literal).unwrap())]
pub fn newton_line_search<'a, T, F>(
    mut function: F,
    x: impl Into<DVectorViewMut<'a, T>>,
    f: impl Into<DVectorViewMut<'a, T>>,
    dx: impl Into<DVectorViewMut<'a, T>>,
    settings: NewtonSettings<T>,
    line_search: &mut impl LineSearch<T, F>,
) -> Result<NewtonOutcome<T>, NewtonError>
where
    T: Real,
    F: DifferentiableVectorFunction<T>,
{
    let mut x = x.into();
    let mut f = f.into();
    let mut minus_dx = dx.into();

    assert_eq!(x.nrows(), f.nrows());
    assert_eq!(minus_dx.nrows(), f.nrows());

    function.eval_into(&mut f, &DVectorView::from(&x));

    let mut iter = 0;
    loop {
        let residual_norm = f.norm();
        trace!("Newton iteration {}: residual norm {}", iter, residual_norm);
        if !residual_norm.is_finite() {
            return Err(NewtonError::NonFiniteResidual { iterations: iter });
        }
        if residual_norm <= settings.tolerance {
            debug!("Newton converged in {} iterations (residual norm {})", iter, residual_norm);
            return Ok(NewtonOutcome {
                iterations: iter,
                residual_norm,
            });
        }
        if settings.max_iterations == Some(iter) {
            return Err(NewtonError::MaximumIterationsReached {
                iterations: iter,
                residual_norm: residual_norm.to_f64(),
            });
        }

        // J (-dx) = f
        function
            .solve_jacobian_system(&mut minus_dx, &DVectorView::from(&x), &DVectorView::from(&f))
            .map_err(NewtonError::JacobianError)?;
        minus_dx *= -1.0;

        let step_length = line_search
            .step(
                &mut function,
                DVectorViewMut::from(&mut f),
                DVectorViewMut::from(&mut x),
                DVectorView::from(&minus_dx),
            )
            .map_err(NewtonError::LineSearchError)?;
        trace!("Newton step length at iteration {}: {}", iter, step_length);
        iter += 1;
    }
}

pub trait LineSearch<T: Scalar, F: VectorFunction<T>> {
    /// Moves `x` along `direction` and leaves `f = F(x)` for the new iterate.
    ///
    /// Returns the accepted step length.
    fn step(
        &mut self,
        function: &mut F,
        f: DVectorViewMut<T>,
        x: DVectorViewMut<T>,
        direction: DVectorView<T>,
    ) -> Result<T, Box<dyn Error + Send + Sync>>;
}

/// A single full step.
#[derive(Clone, Debug, Default)]
pub struct NoLineSearch;

impl<T, F> LineSearch<T, F> for NoLineSearch
where
    T: Real,
    F: VectorFunction<T>,
{
    fn step(
        &mut self,
        function: &mut F,
        mut f: DVectorViewMut<T>,
        mut x: DVectorViewMut<T>,
        direction: DVectorView<T>,
    ) -> Result<T, Box<dyn Error + Send + Sync>> {
        x.axpy(T::one(), &direction, T::one());
        function.eval_into(&mut f, &DVectorView::from(&x));
        Ok(T::one())
    }
}

/// Backtracking line search on $g(x) = \frac{1}{2} |F(x)|^2$ with the Armijo condition.
///
/// See Nocedal & Wright (2006), Numerical Optimization, Chapter 3.1. Assuming the direction
/// $p$ solves the Newton system, the sufficient decrease condition reduces to
/// $g(x + \alpha p) \leq (1 - c \alpha) g(x)$.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BacktrackingLineSearch {
    /// The Armijo parameter `c` in (0, 1).
    pub sufficient_decrease: f64,
    /// Smallest step length tried before giving up.
    pub min_step: f64,
}

impl Default for BacktrackingLineSearch {
    fn default() -> Self {
        Self {
            sufficient_decrease: 1e-4,
            min_step: 1e-6,
        }
    }
}

impl<T, F> LineSearch<T, F> for BacktrackingLineSearch
where
    T: Real,
    F: VectorFunction<T>,
{
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn step(
        &mut self,
        function: &mut F,
        mut f: DVectorViewMut<T>,
        mut x: DVectorViewMut<T>,
        direction: DVectorView<T>,
    ) -> Result<T, Box<dyn Error + Send + Sync>> {
        let c = T::from_constant(self.sufficient_decrease);
        let alpha_min = T::from_constant(self.min_step);
        let g_initial = 0.5 * f.magnitude_squared();

        // Shrink slowly at first, then by a factor 4 per trial.
        let mut alphas = [1.0, 0.75, 0.5]
            .into_iter()
            .chain(iterate(0.25, |alpha| 0.25 * *alpha));

        // x_{k+1} = x_k + (alpha_k - alpha_{k-1}) p keeps a single buffer for x
        let mut alpha_prev = 0.0;
        loop {
            let alpha = alphas.next().unwrap_or(alpha_min);
            x.axpy(alpha - alpha_prev, &direction, T::one());
            function.eval_into(&mut f, &DVectorView::from(&x));

            let g = 0.5 * f.magnitude_squared();
            if g <= (1.0 - c * alpha) * g_initial {
                return Ok(alpha);
            } else if alpha < alpha_min {
                return Err(Box::from(format!(
                    "step length {} is smaller than minimum allowed step length {}",
                    alpha, alpha_min
                )));
            }
            alpha_prev = alpha;
        }
    }
}
