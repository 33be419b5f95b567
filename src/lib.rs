//! Geometry and element tensor tabulation for finite element form assembly.
//!
//! The crate implements the local, per-cell side of finite element assembly: reference cells,
//! reference elements with derivatives of arbitrary order, coordinate mappings between reference
//! and physical cells (including curved cells and manifolds), the pushforward of basis values to
//! physical cells, local dof maps, integrals producing element tensors, and forms collecting
//! integrals by subdomain.
//!
//! All buffers are flat row-major slices. Fallible operations return [`error::FormError`].

pub mod assembly;
pub mod cell;
pub mod contract;
pub mod coordinate_map;
pub mod dofmap;
pub mod element;
pub mod error;
pub mod form;
pub mod integral;
pub mod jet;
pub mod polynomial;
pub mod pushforward;
pub mod quadrature;

pub(crate) mod workspace;

pub mod optimize {
    pub use fem_kernel_optimize::*;
}

#[cfg(feature = "proptest")]
pub mod proptest;

pub use fem_kernel_traits::Real;

pub extern crate nalgebra;
