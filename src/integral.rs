//! Integrals: per-cell producers of element tensors.
//!
//! Every integral kind has its own trait with a `tabulate_tensor` method taking exactly the
//! per-call context of that kind. [`Integral`] is the tagged union used by forms. The element
//! tensor `A` is a flat row-major array with one axis per argument; its length is the product of
//! the argument space dimensions, each multiplied by [`Integral::num_cells`]. For interior
//! facets the axis of argument `i` holds the dofs of cell 0 followed by those of cell 1.
//!
//! Coefficients are passed as `w[coefficient][dof]`. Only coefficients whose
//! [`enabled_coefficients`](CellIntegral::enabled_coefficients) flag is set are read, the other
//! slices may be empty.
use crate::cell::CellOrientation;
use crate::error::FormError;
use fem_kernel_traits::Real;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Debug, Display};
use std::sync::Arc;

mod integrand;
mod kernel;

pub use integrand::*;
pub use kernel::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntegralType {
    Cell,
    ExteriorFacet,
    InteriorFacet,
    Vertex,
    Custom,
}

impl IntegralType {
    pub const ALL: [IntegralType; 5] = [
        IntegralType::Cell,
        IntegralType::ExteriorFacet,
        IntegralType::InteriorFacet,
        IntegralType::Vertex,
        IntegralType::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Cell => "cell",
            Self::ExteriorFacet => "exterior_facet",
            Self::InteriorFacet => "interior_facet",
            Self::Vertex => "vertex",
            Self::Custom => "custom",
        }
    }

    /// Number of cells whose data enters one tabulation.
    pub fn num_cells(self) -> usize {
        match self {
            Self::InteriorFacet => 2,
            _ => 1,
        }
    }
}

impl Display for IntegralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub trait CellIntegral<T: Real>: Debug + Send + Sync {
    fn enabled_coefficients(&self) -> &[bool];

    fn tabulate_tensor(
        &self,
        a: &mut [T],
        w: &[&[T]],
        coordinate_dofs: &[T],
        orientation: CellOrientation,
    ) -> Result<(), FormError>;
}

pub trait ExteriorFacetIntegral<T: Real>: Debug + Send + Sync {
    fn enabled_coefficients(&self) -> &[bool];

    fn tabulate_tensor(
        &self,
        a: &mut [T],
        w: &[&[T]],
        coordinate_dofs: &[T],
        facet: usize,
        orientation: CellOrientation,
    ) -> Result<(), FormError>;
}

/// Integral over a facet shared by two cells.
///
/// Coefficient slices hold the dofs of cell 0 followed by the dofs of cell 1.
pub trait InteriorFacetIntegral<T: Real>: Debug + Send + Sync {
    fn enabled_coefficients(&self) -> &[bool];

    fn tabulate_tensor(
        &self,
        a: &mut [T],
        w: &[&[T]],
        coordinate_dofs: [&[T]; 2],
        facets: [usize; 2],
        orientations: [CellOrientation; 2],
    ) -> Result<(), FormError>;
}

pub trait VertexIntegral<T: Real>: Debug + Send + Sync {
    fn enabled_coefficients(&self) -> &[bool];

    fn tabulate_tensor(
        &self,
        a: &mut [T],
        w: &[&[T]],
        coordinate_dofs: &[T],
        vertex: usize,
        orientation: CellOrientation,
    ) -> Result<(), FormError>;
}

/// Integral with caller-provided quadrature.
///
/// `points` are physical points `[point][gdim]` inside the cell, `weights` are physical
/// weights, and `normals`, when given, are physical unit normals `[point][gdim]`.
pub trait CustomIntegral<T: Real>: Debug + Send + Sync {
    fn enabled_coefficients(&self) -> &[bool];

    fn tabulate_tensor(
        &self,
        a: &mut [T],
        w: &[&[T]],
        coordinate_dofs: &[T],
        points: &[T],
        weights: &[T],
        normals: Option<&[T]>,
        orientation: CellOrientation,
    ) -> Result<(), FormError>;
}

/// An integral of any kind.
#[derive(Debug, Clone)]
pub enum Integral<T: Real> {
    Cell(Arc<dyn CellIntegral<T>>),
    ExteriorFacet(Arc<dyn ExteriorFacetIntegral<T>>),
    InteriorFacet(Arc<dyn InteriorFacetIntegral<T>>),
    Vertex(Arc<dyn VertexIntegral<T>>),
    Custom(Arc<dyn CustomIntegral<T>>),
}

impl<T: Real> Integral<T> {
    pub fn integral_type(&self) -> IntegralType {
        match self {
            Self::Cell(_) => IntegralType::Cell,
            Self::ExteriorFacet(_) => IntegralType::ExteriorFacet,
            Self::InteriorFacet(_) => IntegralType::InteriorFacet,
            Self::Vertex(_) => IntegralType::Vertex,
            Self::Custom(_) => IntegralType::Custom,
        }
    }

    pub fn enabled_coefficients(&self) -> &[bool] {
        match self {
            Self::Cell(integral) => integral.enabled_coefficients(),
            Self::ExteriorFacet(integral) => integral.enabled_coefficients(),
            Self::InteriorFacet(integral) => integral.enabled_coefficients(),
            Self::Vertex(integral) => integral.enabled_coefficients(),
            Self::Custom(integral) => integral.enabled_coefficients(),
        }
    }

    pub fn num_cells(&self) -> usize {
        self.integral_type().num_cells()
    }
}
