//! Local assembly: routing cells to the integrals of a form and tabulating element tensors.
//!
//! The global assembler owns the mesh and the global linear system. For every cell (or facet,
//! vertex, ...) it hands the per-cell data to a [`LocalAssembler`], which selects the integral
//! registered for the subdomain of the cell, falling back to the default integral of that kind,
//! and tabulates the element tensor.
use crate::cell::CellOrientation;
use crate::contract::{ContractVersion, CONTRACT_VERSION};
use crate::form::Form;
use crate::integral::{Integral, IntegralType};
use crate::workspace::{with_thread_local_workspace, Workspace};
use eyre::WrapErr;
use fem_kernel_traits::Real;
use log::{debug, trace};
use rayon::prelude::*;
use std::cell::RefCell;
use std::sync::Arc;

thread_local! { static TENSOR_WORKSPACE: RefCell<Workspace> = RefCell::new(Workspace::default()) }

/// Per-cell data supplied by the global assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct CellData<T> {
    /// Coordinate dofs `[num_coordinate_dofs][gdim]`.
    pub coordinate_dofs: Vec<T>,
    pub orientation: CellOrientation,
    pub subdomain_id: usize,
    /// Dofs of each coefficient on this cell, `[coefficient][dof]`.
    pub coefficients: Vec<Vec<T>>,
}

impl<T> CellData<T> {
    pub fn new(coordinate_dofs: Vec<T>) -> Self {
        Self {
            coordinate_dofs,
            orientation: CellOrientation::default(),
            subdomain_id: 0,
            coefficients: Vec::new(),
        }
    }

    pub fn with_orientation(self, orientation: CellOrientation) -> Self {
        Self { orientation, ..self }
    }

    pub fn with_subdomain_id(self, subdomain_id: usize) -> Self {
        Self { subdomain_id, ..self }
    }

    pub fn with_coefficients(self, coefficients: Vec<Vec<T>>) -> Self {
        Self { coefficients, ..self }
    }

    fn coefficient_slices(&self) -> Vec<&[T]> {
        self.coefficients.iter().map(Vec::as_slice).collect()
    }
}

/// Tabulates element tensors of a form, cell by cell.
///
/// Construction verifies that the form was generated against a compatible contract version, so
/// no tabulation ever runs across a version mismatch.
#[derive(Debug, Clone)]
pub struct LocalAssembler<T: Real> {
    form: Arc<Form<T>>,
}

impl<T: Real> LocalAssembler<T> {
    /// Creates an assembler for a form generated against `generator_version` of the contract.
    pub fn new(form: Arc<Form<T>>, generator_version: ContractVersion) -> eyre::Result<Self> {
        CONTRACT_VERSION
            .check_compatible(&generator_version)
            .wrap_err_with(|| format!("cannot assemble form {}", form.signature()))?;
        debug!(
            "Local assembler for form {} (contract {})",
            form.signature(),
            generator_version
        );
        Ok(Self { form })
    }

    pub fn form(&self) -> &Arc<Form<T>> {
        &self.form
    }

    pub fn tensor_size(&self, kind: IntegralType) -> usize {
        self.form.tensor_size(kind)
    }

    fn integral(&self, kind: IntegralType, subdomain_id: usize) -> Option<&Integral<T>> {
        let integral = self.form.integral_for(kind, subdomain_id);
        if integral.is_none() {
            trace!("No {} integral for subdomain {}", kind, subdomain_id);
        }
        integral
    }

    /// Tabulates the cell integral of the cell's subdomain into `a`.
    ///
    /// Returns `false` and leaves `a` untouched when the form has no cell integral for the
    /// subdomain.
    pub fn tabulate_cell(&self, a: &mut [T], cell: &CellData<T>) -> eyre::Result<bool> {
        match self.integral(IntegralType::Cell, cell.subdomain_id) {
            Some(Integral::Cell(integral)) => {
                integral
                    .tabulate_tensor(a, &cell.coefficient_slices(), &cell.coordinate_dofs, cell.orientation)
                    .wrap_err_with(|| format!("failed to tabulate cell integral (subdomain {})", cell.subdomain_id))?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn tabulate_exterior_facet(&self, a: &mut [T], cell: &CellData<T>, facet: usize) -> eyre::Result<bool> {
        match self.integral(IntegralType::ExteriorFacet, cell.subdomain_id) {
            Some(Integral::ExteriorFacet(integral)) => {
                integral
                    .tabulate_tensor(
                        a,
                        &cell.coefficient_slices(),
                        &cell.coordinate_dofs,
                        facet,
                        cell.orientation,
                    )
                    .wrap_err_with(|| format!("failed to tabulate exterior facet integral on facet {}", facet))?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Tabulates the interior facet integral of the facet shared by two cells.
    ///
    /// The subdomain of the facet is taken from `cells[0]`.
    pub fn tabulate_interior_facet(
        &self,
        a: &mut [T],
        cells: [&CellData<T>; 2],
        facets: [usize; 2],
    ) -> eyre::Result<bool> {
        match self.integral(IntegralType::InteriorFacet, cells[0].subdomain_id) {
            Some(Integral::InteriorFacet(integral)) => {
                let num_coefficients = cells[0].coefficients.len().max(cells[1].coefficients.len());
                let joined: Vec<Vec<T>> = (0..num_coefficients)
                    .map(|j| {
                        cells
                            .iter()
                            .flat_map(|cell| cell.coefficients.get(j).into_iter().flatten())
                            .copied()
                            .collect()
                    })
                    .collect();
                let w: Vec<&[T]> = joined.iter().map(Vec::as_slice).collect();
                integral
                    .tabulate_tensor(
                        a,
                        &w,
                        [cells[0].coordinate_dofs.as_slice(), cells[1].coordinate_dofs.as_slice()],
                        facets,
                        [cells[0].orientation, cells[1].orientation],
                    )
                    .wrap_err_with(|| format!("failed to tabulate interior facet integral on facets {:?}", facets))?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn tabulate_vertex(&self, a: &mut [T], cell: &CellData<T>, vertex: usize) -> eyre::Result<bool> {
        match self.integral(IntegralType::Vertex, cell.subdomain_id) {
            Some(Integral::Vertex(integral)) => {
                integral
                    .tabulate_tensor(
                        a,
                        &cell.coefficient_slices(),
                        &cell.coordinate_dofs,
                        vertex,
                        cell.orientation,
                    )
                    .wrap_err_with(|| format!("failed to tabulate vertex integral at vertex {}", vertex))?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Tabulates the custom integral of the cell's subdomain with physical quadrature points.
    pub fn tabulate_custom(
        &self,
        a: &mut [T],
        cell: &CellData<T>,
        points: &[T],
        weights: &[T],
        normals: Option<&[T]>,
    ) -> eyre::Result<bool> {
        match self.integral(IntegralType::Custom, cell.subdomain_id) {
            Some(Integral::Custom(integral)) => {
                integral
                    .tabulate_tensor(
                        a,
                        &cell.coefficient_slices(),
                        &cell.coordinate_dofs,
                        points,
                        weights,
                        normals,
                        cell.orientation,
                    )
                    .wrap_err("failed to tabulate custom integral")?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Tabulates the cell tensors of all cells in parallel.
    ///
    /// Cells without a cell integral get a zero tensor.
    pub fn tabulate_cells_par(&self, cells: &[CellData<T>]) -> eyre::Result<Vec<Vec<T>>> {
        let size = self.tensor_size(IntegralType::Cell);
        cells
            .par_iter()
            .enumerate()
            .map(|(i, cell)| {
                let mut a = vec![T::zero(); size];
                self.tabulate_cell(&mut a, cell)
                    .wrap_err_with(|| format!("cell {}", i))?;
                Ok(a)
            })
            .collect()
    }

    /// Tabulates the cell tensors of all cells in parallel and passes each to `consumer`
    /// together with the cell index.
    ///
    /// The tensor buffer is a per-thread workspace reused across cells. Cells without a cell
    /// integral are skipped.
    pub fn for_each_cell_tensor_par<F>(&self, cells: &[CellData<T>], consumer: F) -> eyre::Result<()>
    where
        F: Fn(usize, &[T]) + Sync,
    {
        let size = self.tensor_size(IntegralType::Cell);
        cells.par_iter().enumerate().try_for_each(|(i, cell)| {
            with_thread_local_workspace(&TENSOR_WORKSPACE, |buffer: &mut Vec<T>| -> eyre::Result<()> {
                buffer.resize(size, T::zero());
                if self.tabulate_cell(buffer, cell).wrap_err_with(|| format!("cell {}", i))? {
                    consumer(i, buffer);
                }
                Ok(())
            })
        })
    }
}
