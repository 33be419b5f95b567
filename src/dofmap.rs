//! Local dof maps: classification of local dofs by mesh entity and local-to-global numbering.
//!
//! Global numbers are produced with the entity-offset rule: dofs on entities of dimension `d`
//! are numbered after all dofs on entities of lower dimension in the whole mesh, so the global
//! number of the `j`-th dof on the entity with global index `i` is
//!
//! $$ \sum_{d' < d} n_{d'} N_{d'} + n_d \, i + j, $$
//!
//! where $n_d$ is the number of dofs per entity of dimension `d` and $N_d$ the number of such
//! entities in the mesh. Sub-dof maps of mixed elements are numbered one after the other.
use crate::cell::CellShape;
use crate::element::{ElementFamily, EntityDofs, ReferenceElement};
use crate::error::{check_len, FormError};
use fem_kernel_traits::Real;
use std::fmt::Debug;
use std::ops::Range;
use std::sync::Arc;

pub trait DofMap: Debug + Send + Sync {
    fn signature(&self) -> &str;

    fn cell_shape(&self) -> CellShape;

    /// Number of dofs not associated with any mesh entity, such as the global constant of a
    /// `Real` space.
    fn num_global_support_dofs(&self) -> usize;

    /// Number of dofs associated with mesh entities of a single cell.
    fn num_element_support_dofs(&self) -> usize;

    fn num_element_dofs(&self) -> usize {
        self.num_global_support_dofs() + self.num_element_support_dofs()
    }

    /// Number of dofs on each entity of dimension `dim`.
    fn num_entity_dofs(&self, dim: usize) -> usize;

    /// Number of dofs on the closure of an entity of dimension `dim`.
    fn num_entity_closure_dofs(&self, dim: usize) -> usize {
        self.cell_shape()
            .sub_entity_closure(dim, 0)
            .map(|closure| closure.iter().map(|&(d, _)| self.num_entity_dofs(d)).sum())
            .unwrap_or(0)
    }

    fn num_facet_dofs(&self) -> usize {
        match self.cell_shape().topological_dimension() {
            0 => 0,
            tdim => self.num_entity_closure_dofs(tdim - 1),
        }
    }

    /// Number of global dofs on a mesh with `num_global_entities[d]` entities of dimension `d`.
    fn global_dimension(&self, num_global_entities: &[usize]) -> Result<usize, FormError>;

    /// Local dofs on entity `entity` of dimension `dim`.
    fn entity_dofs(&self, dim: usize, entity: usize) -> Result<Vec<usize>, FormError>;

    /// Local dofs on the closure of entity `entity` of dimension `dim`.
    fn entity_closure_dofs(&self, dim: usize, entity: usize) -> Result<Vec<usize>, FormError> {
        let mut dofs = Vec::new();
        for (d, e) in self.cell_shape().sub_entity_closure(dim, entity)? {
            dofs.extend(self.entity_dofs(d, e)?);
        }
        Ok(dofs)
    }

    /// Writes the global dof numbers of a cell.
    ///
    /// `entity_indices[d]` holds the global indices of the cell's entities of dimension `d`, in
    /// the local entity order of the reference cell.
    fn tabulate_dofs(
        &self,
        dofs: &mut [usize],
        num_global_entities: &[usize],
        entity_indices: &[&[usize]],
    ) -> Result<(), FormError>;

    fn tabulate_entity_dofs(&self, dofs: &mut [usize], dim: usize, entity: usize) -> Result<(), FormError> {
        let local = self.entity_dofs(dim, entity)?;
        check_len("dofs", dofs.len(), local.len())?;
        dofs.copy_from_slice(&local);
        Ok(())
    }

    fn tabulate_entity_closure_dofs(&self, dofs: &mut [usize], dim: usize, entity: usize) -> Result<(), FormError> {
        let local = self.entity_closure_dofs(dim, entity)?;
        check_len("dofs", dofs.len(), local.len())?;
        dofs.copy_from_slice(&local);
        Ok(())
    }

    /// Local dofs on the closure of a facet.
    fn tabulate_facet_dofs(&self, dofs: &mut [usize], facet: usize) -> Result<(), FormError> {
        let tdim = self.cell_shape().topological_dimension();
        if tdim == 0 {
            return Err(FormError::invalid_argument("vertex cells have no facets"));
        }
        self.tabulate_entity_closure_dofs(dofs, tdim - 1, facet)
    }

    fn num_sub_dofmaps(&self) -> usize {
        0
    }

    fn sub_dofmap(&self, index: usize) -> Result<Arc<dyn DofMap>, FormError> {
        Err(FormError::contract_mismatch(format!(
            "dof map {} has no sub-dof map {}",
            self.signature(),
            index
        )))
    }
}

/// Creates the dof map matching the entity layout of an element.
pub fn dofmap_for_element<T: Real>(element: &dyn ReferenceElement<T>) -> Arc<dyn DofMap> {
    if element.num_sub_elements() > 0 {
        let sub_dofmaps = (0..element.num_sub_elements())
            .filter_map(|i| element.sub_element(i).ok())
            .map(|sub_element| dofmap_for_element(sub_element.as_ref()))
            .collect();
        Arc::new(MixedDofMap::new(
            format!("DofMap({})", element.signature()),
            element.cell_shape(),
            sub_dofmaps,
        ))
    } else if element.family() == ElementFamily::Real {
        Arc::new(GlobalDofMap::new(element.cell_shape(), element.space_dimension()))
    } else {
        Arc::new(ElementDofMap::new(
            format!("DofMap({})", element.signature()),
            element.cell_shape(),
            element.entity_dofs().clone(),
        ))
    }
}

fn check_entity(cell: CellShape, dim: usize, entity: usize) -> Result<(), FormError> {
    if dim > cell.topological_dimension() || entity >= cell.num_entities(dim) {
        Err(FormError::invalid_argument(format!(
            "{} has no entity {} of dimension {}",
            cell, entity, dim
        )))
    } else {
        Ok(())
    }
}

/// Dof map of an element whose dofs all live on mesh entities.
#[derive(Debug, Clone)]
pub struct ElementDofMap {
    signature: String,
    cell: CellShape,
    entity_dofs: EntityDofs,
}

impl ElementDofMap {
    pub fn new(signature: String, cell: CellShape, entity_dofs: EntityDofs) -> Self {
        Self {
            signature,
            cell,
            entity_dofs,
        }
    }

    fn check_global_counts(&self, num_global_entities: &[usize]) -> Result<(), FormError> {
        let tdim = self.cell.topological_dimension();
        if num_global_entities.len() <= tdim {
            return Err(FormError::invalid_argument(format!(
                "expected global entity counts for dimensions 0..={}, got {}",
                tdim,
                num_global_entities.len()
            )));
        }
        Ok(())
    }
}

impl DofMap for ElementDofMap {
    fn signature(&self) -> &str {
        &self.signature
    }

    fn cell_shape(&self) -> CellShape {
        self.cell
    }

    fn num_global_support_dofs(&self) -> usize {
        0
    }

    fn num_element_support_dofs(&self) -> usize {
        self.entity_dofs.len()
    }

    fn num_entity_dofs(&self, dim: usize) -> usize {
        self.entity_dofs.num_entity_dofs(dim)
    }

    fn global_dimension(&self, num_global_entities: &[usize]) -> Result<usize, FormError> {
        self.check_global_counts(num_global_entities)?;
        Ok((0..=self.cell.topological_dimension())
            .map(|d| self.num_entity_dofs(d) * num_global_entities[d])
            .sum())
    }

    fn entity_dofs(&self, dim: usize, entity: usize) -> Result<Vec<usize>, FormError> {
        check_entity(self.cell, dim, entity)?;
        Ok(self.entity_dofs.dofs(dim, entity).to_vec())
    }

    fn tabulate_dofs(
        &self,
        dofs: &mut [usize],
        num_global_entities: &[usize],
        entity_indices: &[&[usize]],
    ) -> Result<(), FormError> {
        check_len("dofs", dofs.len(), self.num_element_dofs())?;
        self.check_global_counts(num_global_entities)?;

        let mut offset = 0;
        for d in 0..=self.cell.topological_dimension() {
            let per_entity = self.num_entity_dofs(d);
            if per_entity == 0 {
                continue;
            }
            let indices = entity_indices.get(d).copied().unwrap_or(&[]);
            check_len("entity_indices", indices.len(), self.cell.num_entities(d))?;
            if let Some(&global_entity) = indices.iter().find(|&&index| index >= num_global_entities[d]) {
                return Err(FormError::invalid_argument(format!(
                    "global entity {} of dimension {} is out of range for {} entities",
                    global_entity, d, num_global_entities[d]
                )));
            }
            for (e, &global_entity) in indices.iter().enumerate() {
                for (j, &local) in self.entity_dofs.dofs(d, e).iter().enumerate() {
                    dofs[local] = offset + per_entity * global_entity + j;
                }
            }
            offset += per_entity * num_global_entities[d];
        }
        Ok(())
    }
}

/// Dof map of a space of global constants, such as the `Real` element.
#[derive(Debug, Clone)]
pub struct GlobalDofMap {
    signature: String,
    cell: CellShape,
    num_dofs: usize,
}

impl GlobalDofMap {
    pub fn new(cell: CellShape, num_dofs: usize) -> Self {
        Self {
            signature: format!("GlobalDofMap({}, {})", cell, num_dofs),
            cell,
            num_dofs,
        }
    }
}

impl DofMap for GlobalDofMap {
    fn signature(&self) -> &str {
        &self.signature
    }

    fn cell_shape(&self) -> CellShape {
        self.cell
    }

    fn num_global_support_dofs(&self) -> usize {
        self.num_dofs
    }

    fn num_element_support_dofs(&self) -> usize {
        0
    }

    fn num_entity_dofs(&self, _dim: usize) -> usize {
        0
    }

    fn global_dimension(&self, _num_global_entities: &[usize]) -> Result<usize, FormError> {
        Ok(self.num_dofs)
    }

    fn entity_dofs(&self, dim: usize, entity: usize) -> Result<Vec<usize>, FormError> {
        check_entity(self.cell, dim, entity)?;
        Ok(Vec::new())
    }

    fn tabulate_dofs(&self, dofs: &mut [usize], _: &[usize], _: &[&[usize]]) -> Result<(), FormError> {
        check_len("dofs", dofs.len(), self.num_dofs)?;
        for (i, dof) in dofs.iter_mut().enumerate() {
            *dof = i;
        }
        Ok(())
    }
}

/// Dof map of a mixed or vector element.
///
/// Local dofs of sub-dof map `i` occupy [`MixedDofMap::local_range`], and its global dofs are
/// numbered after the global dofs of all previous sub-dof maps.
#[derive(Debug, Clone)]
pub struct MixedDofMap {
    signature: String,
    cell: CellShape,
    sub_dofmaps: Vec<Arc<dyn DofMap>>,
    local_offsets: Vec<usize>,
}

impl MixedDofMap {
    pub fn new(signature: String, cell: CellShape, sub_dofmaps: Vec<Arc<dyn DofMap>>) -> Self {
        let mut local_offsets = vec![0];
        for dofmap in &sub_dofmaps {
            let last = local_offsets.last().copied().unwrap_or(0);
            local_offsets.push(last + dofmap.num_element_dofs());
        }
        Self {
            signature,
            cell,
            sub_dofmaps,
            local_offsets,
        }
    }

    pub fn sub_dofmaps(&self) -> &[Arc<dyn DofMap>] {
        &self.sub_dofmaps
    }

    pub fn local_range(&self, index: usize) -> Range<usize> {
        self.local_offsets[index]..self.local_offsets[index + 1]
    }

    /// Concatenates the local dofs collected from each sub-dof map, shifted by its local offset.
    fn collect_local(
        &self,
        mut local: impl FnMut(&dyn DofMap) -> Result<Vec<usize>, FormError>,
    ) -> Result<Vec<usize>, FormError> {
        let mut dofs = Vec::new();
        for (dofmap, &offset) in self.sub_dofmaps.iter().zip(&self.local_offsets) {
            dofs.extend(local(dofmap.as_ref())?.into_iter().map(|dof| dof + offset));
        }
        Ok(dofs)
    }
}

impl DofMap for MixedDofMap {
    fn signature(&self) -> &str {
        &self.signature
    }

    fn cell_shape(&self) -> CellShape {
        self.cell
    }

    fn num_global_support_dofs(&self) -> usize {
        self.sub_dofmaps.iter().map(|m| m.num_global_support_dofs()).sum()
    }

    fn num_element_support_dofs(&self) -> usize {
        self.sub_dofmaps.iter().map(|m| m.num_element_support_dofs()).sum()
    }

    fn num_entity_dofs(&self, dim: usize) -> usize {
        self.sub_dofmaps.iter().map(|m| m.num_entity_dofs(dim)).sum()
    }

    fn global_dimension(&self, num_global_entities: &[usize]) -> Result<usize, FormError> {
        let mut dimension = 0;
        for dofmap in &self.sub_dofmaps {
            dimension += dofmap.global_dimension(num_global_entities)?;
        }
        Ok(dimension)
    }

    fn entity_dofs(&self, dim: usize, entity: usize) -> Result<Vec<usize>, FormError> {
        self.collect_local(|dofmap| dofmap.entity_dofs(dim, entity))
    }

    fn entity_closure_dofs(&self, dim: usize, entity: usize) -> Result<Vec<usize>, FormError> {
        self.collect_local(|dofmap| dofmap.entity_closure_dofs(dim, entity))
    }

    fn tabulate_dofs(
        &self,
        dofs: &mut [usize],
        num_global_entities: &[usize],
        entity_indices: &[&[usize]],
    ) -> Result<(), FormError> {
        check_len("dofs", dofs.len(), self.num_element_dofs())?;
        let mut global_offset = 0;
        for (i, dofmap) in self.sub_dofmaps.iter().enumerate() {
            let block = &mut dofs[self.local_range(i)];
            dofmap.tabulate_dofs(block, num_global_entities, entity_indices)?;
            for dof in block.iter_mut() {
                *dof += global_offset;
            }
            global_offset += dofmap.global_dimension(num_global_entities)?;
        }
        Ok(())
    }

    fn num_sub_dofmaps(&self) -> usize {
        self.sub_dofmaps.len()
    }

    fn sub_dofmap(&self, index: usize) -> Result<Arc<dyn DofMap>, FormError> {
        self.sub_dofmaps.get(index).cloned().ok_or_else(|| {
            FormError::contract_mismatch(format!(
                "sub-dof map index {} out of bounds for {} with {} sub-dof maps",
                index,
                self.signature,
                self.sub_dofmaps.len()
            ))
        })
    }
}
