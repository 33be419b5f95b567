use crate::element::BasisTable;
use fem_kernel_traits::Real;
use std::fmt;
use std::fmt::Debug;

/// Physical data of one cell at all quadrature points of a tabulation.
#[derive(Debug, Clone)]
pub struct SideValues<T> {
    pub(crate) gdim: usize,
    pub(crate) points: Vec<T>,
    pub(crate) normals: Option<Vec<T>>,
    pub(crate) arguments: Vec<BasisTable<T>>,
    /// One single-dof table per coefficient holding the coefficient's value.
    pub(crate) coefficients: Vec<BasisTable<T>>,
}

/// The data an [`Integrand`] sees at a single quadrature point.
///
/// Cell and facet integrals have a single side, interior facet integrals have two. Argument
/// and coefficient values are physical values and derivatives in the layout of
/// [`BasisTable`].
#[derive(Debug, Clone, Copy)]
pub struct IntegrandPoint<'a, T> {
    pub(crate) point: usize,
    pub(crate) sides: &'a [SideValues<T>],
}

impl<'a, T: Real> IntegrandPoint<'a, T> {
    pub fn num_sides(&self) -> usize {
        self.sides.len()
    }

    /// Index of the quadrature point.
    pub fn index(&self) -> usize {
        self.point
    }

    pub fn geometric_dimension(&self) -> usize {
        self.sides[0].gdim
    }

    /// Physical coordinates of the point as seen from `side`.
    pub fn x(&self, side: usize) -> &'a [T] {
        let gdim = self.sides[side].gdim;
        &self.sides[side].points[self.point * gdim..(self.point + 1) * gdim]
    }

    /// Outward unit normal of the facet of `side`, if the integral has one.
    pub fn normal(&self, side: usize) -> Option<&'a [T]> {
        let gdim = self.sides[side].gdim;
        self.sides[side]
            .normals
            .as_ref()
            .map(|normals| &normals[self.point * gdim..(self.point + 1) * gdim])
    }

    pub fn num_arguments(&self) -> usize {
        self.sides[0].arguments.len()
    }

    /// Number of dofs of argument `slot` on a single side.
    pub fn argument_dimension(&self, slot: usize) -> usize {
        self.sides[0].arguments[slot].num_dofs()
    }

    pub fn argument_value_size(&self, slot: usize) -> usize {
        self.sides[0].arguments[slot].value_size()
    }

    pub fn argument(&self, side: usize, slot: usize) -> &'a BasisTable<T> {
        &self.sides[side].arguments[slot]
    }

    /// Component `component` of derivative `derivative` of order `order` of basis function
    /// `dof` of argument `slot`.
    pub fn argument_value(
        &self,
        side: usize,
        slot: usize,
        dof: usize,
        order: usize,
        derivative: usize,
        component: usize,
    ) -> T {
        self.sides[side].arguments[slot].get(order, self.point, dof, derivative, component)
    }

    pub fn coefficient_value_size(&self, coefficient: usize) -> usize {
        self.sides[0].coefficients[coefficient].value_size()
    }

    pub fn coefficient_value(
        &self,
        side: usize,
        coefficient: usize,
        order: usize,
        derivative: usize,
        component: usize,
    ) -> T {
        self.sides[side].coefficients[coefficient].get(order, self.point, 0, derivative, component)
    }

    /// Flat index into the element tensor of the entry with the given `(side, dof)` per
    /// argument.
    pub fn tensor_index(&self, indices: &[(usize, usize)]) -> usize {
        let num_sides = self.num_sides();
        indices.iter().enumerate().fold(0, |index, (slot, &(side, dof))| {
            let n = self.argument_dimension(slot);
            index * num_sides * n + side * n + dof
        })
    }
}

/// The integrand of a quadrature integral.
///
/// `accumulate` adds `scale` times the integrand at one point to every entry of the element
/// tensor, where `scale` already contains the quadrature weight and the measure of the mapped
/// cell or facet.
pub trait Integrand<T: Real>: Debug + Send + Sync {
    /// Number of arguments, i.e. the rank of the element tensor.
    fn rank(&self) -> usize;

    /// Highest derivative order of argument and coefficient values used.
    fn derivative_order(&self) -> usize {
        0
    }

    /// Coefficients that are read.
    fn coefficients(&self) -> Vec<usize> {
        Vec::new()
    }

    fn accumulate(&self, point: &IntegrandPoint<'_, T>, scale: T, a: &mut [T]);
}

/// Componentwise inner product of two basis functions on the given sides.
fn inner_product<T: Real>(
    point: &IntegrandPoint<'_, T>,
    (side_i, i): (usize, usize),
    (side_j, j): (usize, usize),
    order: usize,
) -> T {
    let derivatives = point.argument(side_i, 0).num_derivatives(order);
    let value_size = point.argument_value_size(0).min(point.argument_value_size(1));
    let mut sum = T::zero();
    for d in 0..derivatives {
        for c in 0..value_size {
            sum += point.argument_value(side_i, 0, i, order, d, c) * point.argument_value(side_j, 1, j, order, d, c);
        }
    }
    sum
}

fn accumulate_bilinear<T: Real>(
    point: &IntegrandPoint<'_, T>,
    scale: T,
    a: &mut [T],
    order: usize,
    coupling: impl Fn(usize, usize) -> Option<T>,
) {
    let (n0, n1) = (point.argument_dimension(0), point.argument_dimension(1));
    for s0 in 0..point.num_sides() {
        for s1 in 0..point.num_sides() {
            let Some(factor) = coupling(s0, s1) else {
                continue;
            };
            for i in 0..n0 {
                for j in 0..n1 {
                    let index = point.tensor_index(&[(s0, i), (s1, j)]);
                    a[index] += scale * factor * inner_product(point, (s0, i), (s1, j), order);
                }
            }
        }
    }
}

/// $\int u \cdot v$, per side.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mass;

impl<T: Real> Integrand<T> for Mass {
    fn rank(&self) -> usize {
        2
    }

    fn accumulate(&self, point: &IntegrandPoint<'_, T>, scale: T, a: &mut [T]) {
        accumulate_bilinear(point, scale, a, 0, |s0, s1| (s0 == s1).then(T::one));
    }
}

/// $\int \nabla u : \nabla v$, per side.
#[derive(Debug, Clone, Copy, Default)]
pub struct Laplace;

impl<T: Real> Integrand<T> for Laplace {
    fn rank(&self) -> usize {
        2
    }

    fn derivative_order(&self) -> usize {
        1
    }

    fn accumulate(&self, point: &IntegrandPoint<'_, T>, scale: T, a: &mut [T]) {
        accumulate_bilinear(point, scale, a, 1, |s0, s1| (s0 == s1).then(T::one));
    }
}

/// $\gamma \int [u] \cdot [v]$ with the jump $[u] = u_0 - u_1$ across an interior facet.
///
/// With a single side this is a scaled mass integrand.
#[derive(Debug, Clone, Copy)]
pub struct JumpPenalty {
    pub penalty: f64,
}

impl<T: Real> Integrand<T> for JumpPenalty {
    fn rank(&self) -> usize {
        2
    }

    fn accumulate(&self, point: &IntegrandPoint<'_, T>, scale: T, a: &mut [T]) {
        let penalty = T::from_constant(self.penalty);
        let sign = |side: usize| if side == 0 { T::one() } else { -T::one() };
        accumulate_bilinear(point, scale, a, 0, |s0, s1| Some(penalty * sign(s0) * sign(s1)));
    }
}

#[derive(Debug, Clone, Copy)]
enum Density {
    Constant(f64),
    Coefficient(usize),
}

impl Density {
    fn value<T: Real>(&self, point: &IntegrandPoint<'_, T>, side: usize, component: usize) -> T {
        match *self {
            Density::Constant(value) => T::from_constant(value),
            Density::Coefficient(j) => point.coefficient_value(side, j, 0, 0, component),
        }
    }

    fn coefficients(&self) -> Vec<usize> {
        match *self {
            Density::Constant(_) => Vec::new(),
            Density::Coefficient(j) => vec![j],
        }
    }
}

/// $\int f \cdot v$ with a constant or a coefficient $f$ of the same value shape as $v$.
#[derive(Debug, Clone, Copy)]
pub struct Source {
    density: Density,
}

impl Source {
    pub fn constant(value: f64) -> Self {
        Self {
            density: Density::Constant(value),
        }
    }

    pub fn coefficient(coefficient: usize) -> Self {
        Self {
            density: Density::Coefficient(coefficient),
        }
    }
}

impl<T: Real> Integrand<T> for Source {
    fn rank(&self) -> usize {
        1
    }

    fn coefficients(&self) -> Vec<usize> {
        self.density.coefficients()
    }

    fn accumulate(&self, point: &IntegrandPoint<'_, T>, scale: T, a: &mut [T]) {
        let n = point.argument_dimension(0);
        for side in 0..point.num_sides() {
            for i in 0..n {
                let mut value = T::zero();
                for c in 0..point.argument_value_size(0) {
                    value += self.density.value(point, side, c) * point.argument_value(side, 0, i, 0, 0, c);
                }
                a[point.tensor_index(&[(side, i)])] += scale * value;
            }
        }
    }
}

/// $\int f$, summed over the components of $f$.
///
/// On interior facets an unrestricted functional integrates the average of the two sides, so
/// [`Functional::measure`] is the facet measure. [`Functional::restricted`] reads one side only.
#[derive(Debug, Clone, Copy)]
pub struct Functional {
    density: Density,
    restriction: Option<usize>,
}

impl Functional {
    /// The measure of the integration domain.
    pub fn measure() -> Self {
        Self {
            density: Density::Constant(1.0),
            restriction: None,
        }
    }

    pub fn coefficient(coefficient: usize) -> Self {
        Self {
            density: Density::Coefficient(coefficient),
            restriction: None,
        }
    }

    /// Evaluates the density on `side` of interior facets, where `side` is 0 or 1 and larger
    /// values select side 1. Ignored on one-sided domains.
    pub fn restricted(self, side: usize) -> Self {
        Self {
            restriction: Some(side),
            ..self
        }
    }

    fn sides(&self, num_sides: usize) -> Vec<usize> {
        match self.restriction {
            Some(side) if num_sides > 1 => vec![side.min(num_sides - 1)],
            _ => (0..num_sides).collect(),
        }
    }
}

impl<T: Real> Integrand<T> for Functional {
    fn rank(&self) -> usize {
        0
    }

    fn coefficients(&self) -> Vec<usize> {
        self.density.coefficients()
    }

    fn accumulate(&self, point: &IntegrandPoint<'_, T>, scale: T, a: &mut [T]) {
        let sides = self.sides(point.num_sides());
        let components = match self.density {
            Density::Constant(_) => 1,
            Density::Coefficient(j) => point.coefficient_value_size(j),
        };
        let mut value = T::zero();
        for &side in &sides {
            for c in 0..components {
                value += self.density.value(point, side, c);
            }
        }
        a[0] += scale * value / T::from_count(sides.len());
    }
}

/// An integrand given by a closure.
pub struct FnIntegrand<F> {
    rank: usize,
    derivative_order: usize,
    coefficients: Vec<usize>,
    function: F,
}

impl<F> FnIntegrand<F> {
    pub fn new(rank: usize, function: F) -> Self {
        Self {
            rank,
            derivative_order: 0,
            coefficients: Vec::new(),
            function,
        }
    }

    pub fn with_derivative_order(self, derivative_order: usize) -> Self {
        Self {
            derivative_order,
            ..self
        }
    }

    pub fn with_coefficients(self, coefficients: Vec<usize>) -> Self {
        Self { coefficients, ..self }
    }
}

impl<F> Debug for FnIntegrand<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnIntegrand")
            .field("rank", &self.rank)
            .field("derivative_order", &self.derivative_order)
            .field("coefficients", &self.coefficients)
            .finish()
    }
}

impl<T, F> Integrand<T> for FnIntegrand<F>
where
    T: Real,
    F: Fn(&IntegrandPoint<'_, T>, T, &mut [T]) + Send + Sync,
{
    fn rank(&self) -> usize {
        self.rank
    }

    fn derivative_order(&self) -> usize {
        self.derivative_order
    }

    fn coefficients(&self) -> Vec<usize> {
        self.coefficients.clone()
    }

    fn accumulate(&self, point: &IntegrandPoint<'_, T>, scale: T, a: &mut [T]) {
        (self.function)(point, scale, a)
    }
}
