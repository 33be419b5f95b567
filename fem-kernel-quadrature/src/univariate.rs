//! Gauss-Legendre rules on the reference interval `[0, 1]`.

use crate::{num_gauss_points_for_degree, Rule};
use std::f64::consts::PI;

/// Values of the Legendre polynomials $P_n$ and $P_{n-1}$ at a point.
///
/// The derivative formula is singular at |x| == 1, so this is only valid in the open interval
/// (-1, 1), which contains all Gauss points.
#[derive(Debug, Default)]
struct LegendreRecurrence {
    n: usize,
    x: f64,
    p_n: f64,
    p_n_minus_1: f64,
}

impl LegendreRecurrence {
    fn evaluate(n: usize, x: f64) -> Self {
        // m P_m(x) = (2m - 1) x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
        let mut p_n = 1.0;
        let mut p_n_minus_1 = 0.0;
        for m in 1..=n {
            let m = m as f64;
            let p_n_minus_2 = p_n_minus_1;
            p_n_minus_1 = p_n;
            p_n = ((2.0 * m - 1.0) * x * p_n_minus_1 - (m - 1.0) * p_n_minus_2) / m;
        }
        Self {
            n,
            x,
            p_n,
            p_n_minus_1,
        }
    }

    fn value(&self) -> f64 {
        self.p_n
    }

    fn derivative(&self) -> f64 {
        // P_n'(x) = n (x P_n(x) - P_{n - 1}(x)) / (x^2 - 1)
        let n = self.n as f64;
        n * (self.x * self.p_n - self.p_n_minus_1) / (self.x * self.x - 1.0)
    }
}

/// Gauss-Legendre nodes and weights on [-1, 1], in increasing order of the nodes.
fn legendre_nodes(n: usize) -> (Vec<f64>, Vec<f64>) {
    const MAX_NEWTON_ITERATIONS: usize = 100;

    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];

    // Roots are symmetric about the origin, so only the first half is computed
    // (cf. Numerical Recipes, 3rd edition, section 4.6)
    for i in 0..(n + 1) / 2 {
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut recurrence = LegendreRecurrence::evaluate(n, x);
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let dx = -recurrence.value() / recurrence.derivative();
            x += dx;
            recurrence = LegendreRecurrence::evaluate(n, x);
            if dx.abs() <= 1e-15 {
                break;
            }
        }

        let dp = recurrence.derivative();
        let w = 2.0 / ((1.0 - x * x) * dp * dp);

        // The initial guesses decrease from 1 towards 0
        nodes[n - 1 - i] = x;
        weights[n - 1 - i] = w;
        nodes[i] = -x;
        weights[i] = w;
    }

    (nodes, weights)
}

/// Gauss quadrature on the reference interval `[0, 1]` with the given number of points.
///
/// With `n` points the rule integrates polynomials of degree up to `2 n - 1` exactly.
/// Points are returned in increasing order.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss(num_points: usize) -> Rule<1> {
    assert!(num_points > 0, "number of points must be positive");
    let (nodes, weights) = legendre_nodes(num_points);
    let points = nodes.iter().map(|&x| [0.5 * (x + 1.0)]).collect();
    let weights = weights.iter().map(|&w| 0.5 * w).collect();
    (weights, points)
}

/// The Gauss rule on `[0, 1]` with the fewest points that is exact for the given degree.
pub fn gauss_for_degree(degree: usize) -> Rule<1> {
    gauss(num_gauss_points_for_degree(degree))
}
