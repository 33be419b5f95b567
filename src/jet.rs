//! Truncated multivariate Taylor polynomials.
//!
//! A [`Jet`] of order `k` in `n` variables stores the Taylor coefficients
//! $c_\alpha = D^\alpha f(p) / \alpha!$ of a function about a point `p` for all multi-indices
//! with $|\alpha| \leq k$. Arithmetic on jets is exact up to order `k`, which makes them a
//! convenient vehicle for the chain rule through non-affine coordinate maps at arbitrary order.
use crate::polynomial::MonomialSet;
use fem_kernel_traits::Real;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// The multi-indices of a jet space together with the multiplication table.
#[derive(Debug)]
pub struct MultiIndexSet {
    num_variables: usize,
    order: usize,
    indices: Vec<[usize; 3]>,
    lookup: FxHashMap<[usize; 3], usize>,
    /// Triplets `(i, j, k)` with `indices[i] + indices[j] == indices[k]`.
    products: Vec<(usize, usize, usize)>,
    factorials: Vec<f64>,
}

impl MultiIndexSet {
    /// Multi-indices in `num_variables <= 3` variables up to total degree `order`, graded so that
    /// the zero multi-index comes first.
    pub fn new(num_variables: usize, order: usize) -> Self {
        assert!(num_variables <= 3, "at most three variables are supported");
        let indices = MonomialSet::total_degree(num_variables, order).exponents().to_vec();
        let lookup: FxHashMap<_, _> = indices.iter().enumerate().map(|(i, alpha)| (*alpha, i)).collect();

        let mut products = Vec::new();
        for (i, a) in indices.iter().enumerate() {
            for (j, b) in indices.iter().enumerate() {
                let sum = [a[0] + b[0], a[1] + b[1], a[2] + b[2]];
                if let Some(&k) = lookup.get(&sum) {
                    products.push((i, j, k));
                }
            }
        }

        let factorial = |n: usize| (1..=n).map(|i| i as f64).product::<f64>();
        let factorials = indices
            .iter()
            .map(|alpha| alpha.iter().map(|&a| factorial(a)).product())
            .collect();

        Self {
            num_variables,
            order,
            indices,
            lookup,
            products,
            factorials,
        }
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[[usize; 3]] {
        &self.indices
    }

    pub fn index_of(&self, alpha: [usize; 3]) -> Option<usize> {
        self.lookup.get(&alpha).copied()
    }

    /// $\alpha!$ for the multi-index with the given position.
    pub fn factorial(&self, index: usize) -> f64 {
        self.factorials[index]
    }
}

/// A truncated Taylor polynomial over a shared [`MultiIndexSet`].
#[derive(Debug, Clone)]
pub struct Jet<T> {
    set: Arc<MultiIndexSet>,
    coefficients: Vec<T>,
}

impl<T: Real> Jet<T> {
    pub fn zero(set: &Arc<MultiIndexSet>) -> Self {
        Self {
            set: Arc::clone(set),
            coefficients: vec![T::zero(); set.len()],
        }
    }

    pub fn constant(set: &Arc<MultiIndexSet>, value: T) -> Self {
        let mut jet = Self::zero(set);
        jet.coefficients[0] = value;
        jet
    }

    /// The jet of the coordinate function $h_i$ about the origin.
    pub fn variable(set: &Arc<MultiIndexSet>, i: usize) -> Self {
        let mut jet = Self::zero(set);
        let mut alpha = [0; 3];
        alpha[i] = 1;
        if let Some(k) = set.index_of(alpha) {
            jet.coefficients[k] = T::one();
        }
        jet
    }

    pub fn set(&self) -> &Arc<MultiIndexSet> {
        &self.set
    }

    pub fn coefficients(&self) -> &[T] {
        &self.coefficients
    }

    pub fn coefficients_mut(&mut self) -> &mut [T] {
        &mut self.coefficients
    }

    pub fn constant_term(&self) -> T {
        self.coefficients[0]
    }

    /// The Taylor coefficient of $h^\alpha$, zero if $|\alpha|$ exceeds the order.
    pub fn coefficient(&self, alpha: [usize; 3]) -> T {
        self.set
            .index_of(alpha)
            .map(|k| self.coefficients[k])
            .unwrap_or_else(T::zero)
    }

    /// The partial derivative $D^\alpha$ at the expansion point.
    pub fn derivative(&self, alpha: [usize; 3]) -> T {
        self.set
            .index_of(alpha)
            .map(|k| self.coefficients[k] * T::from_constant(self.set.factorial(k)))
            .unwrap_or_else(T::zero)
    }

    /// `self += factor * other`.
    pub fn add_scaled(&mut self, factor: T, other: &Jet<T>) {
        debug_assert!(Arc::ptr_eq(&self.set, &other.set));
        for (a, &b) in self.coefficients.iter_mut().zip(&other.coefficients) {
            *a += factor * b;
        }
    }

    pub fn add(&self, other: &Jet<T>) -> Jet<T> {
        let mut result = self.clone();
        result.add_scaled(T::one(), other);
        result
    }

    pub fn sub(&self, other: &Jet<T>) -> Jet<T> {
        let mut result = self.clone();
        result.add_scaled(-T::one(), other);
        result
    }

    pub fn scale(&self, factor: T) -> Jet<T> {
        let mut result = self.clone();
        result.coefficients.iter_mut().for_each(|c| *c *= factor);
        result
    }

    /// Truncated product.
    pub fn mul(&self, other: &Jet<T>) -> Jet<T> {
        debug_assert!(Arc::ptr_eq(&self.set, &other.set));
        let mut result = Self::zero(&self.set);
        for &(i, j, k) in &self.set.products {
            result.coefficients[k] += self.coefficients[i] * other.coefficients[j];
        }
        result
    }

    /// Evaluates $\sum_k s_k u^k$ where $u$ is `self` without its constant term.
    fn compose_series(&self, series: &[T]) -> Jet<T> {
        let mut u = self.clone();
        u.coefficients[0] = T::zero();
        let order = self.set.order;
        let mut result = Self::constant(&self.set, series[order]);
        for k in (0..order).rev() {
            result = result.mul(&u);
            result.coefficients[0] += series[k];
        }
        result
    }

    /// Reciprocal. The constant term must be non-zero.
    pub fn recip(&self) -> Jet<T> {
        let a0 = self.constant_term();
        // 1 / (a0 + u) = sum_k (-1)^k u^k / a0^(k + 1)
        let mut series = Vec::with_capacity(self.set.order + 1);
        let mut term = T::one() / a0;
        for _ in 0..=self.set.order {
            series.push(term);
            term = -term / a0;
        }
        self.compose_series(&series)
    }

    /// Square root. The constant term must be positive.
    pub fn sqrt(&self) -> Jet<T> {
        let a0 = self.constant_term();
        // sqrt(a0 + u) = sum_k binom(1/2, k) a0^(1/2 - k) u^k
        let half = T::from_constant(0.5);
        let mut series = Vec::with_capacity(self.set.order + 1);
        let mut term = a0.sqrt();
        for k in 0..=self.set.order {
            series.push(term);
            term = term * (half - T::from_count(k)) / (T::from_count(k + 1) * a0);
        }
        self.compose_series(&series)
    }
}
