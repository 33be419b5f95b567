//! Monomial spanning sets and the ordering of derivative multi-indices.
//!
//! Derivatives of order `n` in `dim` variables are enumerated as all tuples
//! $(d_1, \dots, d_n) \in \{0, \dots, \mathrm{dim} - 1\}^n$ in lexicographic order. The tuple
//! $(d_1, \dots, d_n)$ has index $\sum_i d_i \, \mathrm{dim}^{n - i}$, so there are
//! $\mathrm{dim}^n$ entries per order. Tuples that are permutations of each other denote the
//! same derivative and hold identical values.
use fem_kernel_traits::Real;

/// Highest derivative order accepted by basis evaluation and pushforward.
pub const MAX_DERIVATIVE_ORDER: usize = 8;

/// Number of derivative tuples of order `order` in `dim` variables.
pub fn num_derivatives(dim: usize, order: usize) -> usize {
    dim.pow(order as u32)
}

/// The derivative tuple with the given index.
pub fn derivative_tuple(dim: usize, order: usize, index: usize) -> Vec<usize> {
    let mut tuple = vec![0; order];
    let mut remainder = index;
    for entry in tuple.iter_mut().rev() {
        *entry = remainder % dim;
        remainder /= dim;
    }
    tuple
}

/// Number of derivatives taken along each axis by the tuple with the given index.
pub fn derivative_counts(dim: usize, order: usize, index: usize) -> [usize; 3] {
    let mut counts = [0; 3];
    for axis in derivative_tuple(dim, order, index) {
        counts[axis] += 1;
    }
    counts
}

/// Index of the sorted tuple representing the derivative with the given per-axis counts.
pub fn derivative_index(dim: usize, counts: &[usize]) -> usize {
    let mut index = 0;
    for (axis, &count) in counts.iter().enumerate().take(dim) {
        for _ in 0..count {
            index = index * dim + axis;
        }
    }
    index
}

/// A set of monomials $x^{a} y^{b} z^{c}$ in up to three variables.
///
/// Unused exponent slots are zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonomialSet {
    dim: usize,
    degree: usize,
    exponents: Vec<[usize; 3]>,
}

impl MonomialSet {
    /// All monomials of total degree at most `degree`, graded by total degree.
    pub fn total_degree(dim: usize, degree: usize) -> Self {
        let mut exponents = Vec::new();
        for d in 0..=degree {
            match dim {
                0 => {
                    if d == 0 {
                        exponents.push([0, 0, 0]);
                    }
                }
                1 => exponents.push([d, 0, 0]),
                2 => exponents.extend((0..=d).map(|j| [d - j, j, 0])),
                _ => {
                    for k in 0..=d {
                        exponents.extend((0..=d - k).map(|j| [d - j - k, j, k]));
                    }
                }
            }
        }
        Self { dim, degree, exponents }
    }

    /// All monomials of degree at most `degree` in each variable separately.
    pub fn tensor_degree(dim: usize, degree: usize) -> Self {
        let n = degree + 1;
        let exponents = (0..n.pow(dim as u32))
            .map(|linear| {
                let mut exponent = [0; 3];
                let mut remainder = linear;
                for e in exponent.iter_mut().take(dim) {
                    *e = remainder % n;
                    remainder /= n;
                }
                exponent
            })
            .collect();
        Self { dim, degree, exponents }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn len(&self) -> usize {
        self.exponents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exponents.is_empty()
    }

    pub fn exponents(&self) -> &[[usize; 3]] {
        &self.exponents
    }

    pub fn index_of(&self, exponent: [usize; 3]) -> Option<usize> {
        self.exponents.iter().position(|e| *e == exponent)
    }

    /// Evaluates the derivative with the given per-axis `counts` of every monomial at `point`.
    pub fn evaluate_derivative<T: Real>(&self, point: &[T], counts: [usize; 3], values: &mut [T]) {
        debug_assert_eq!(point.len(), self.dim);
        debug_assert_eq!(values.len(), self.len());
        for (value, exponent) in values.iter_mut().zip(&self.exponents) {
            let mut product = T::one();
            for axis in 0..self.dim {
                let (a, c) = (exponent[axis], counts[axis]);
                if c > a {
                    product = T::zero();
                    break;
                }
                // Falling factorial a (a - 1) ... (a - c + 1)
                let factor: usize = (a - c + 1..=a).product();
                product *= T::from_count(factor) * point[axis].powi((a - c) as i32);
            }
            *value = product;
        }
    }
}
