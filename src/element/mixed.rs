use crate::cell::{CellOrientation, CellShape};
use crate::coordinate_map::{CoordinateMapping, GeometryTable};
use crate::element::{BasisTable, ElementFamily, EntityDofs, MapKind, ReferenceElement};
use crate::error::{check_len, FormError};
use fem_kernel_traits::Real;
use std::ops::Range;
use std::sync::Arc;

/// Cumulative offsets `[0, n_0, n_0 + n_1, ...]`.
fn offsets(sizes: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut offsets = vec![0];
    for size in sizes {
        offsets.push(offsets.last().copied().unwrap_or(0) + size);
    }
    offsets
}

/// An element composed of sub-elements on the same cell.
///
/// The dofs of sub-element `i` occupy the contiguous range [`MixedElement::dof_range`], in
/// declaration order, and its values occupy a contiguous block of the flattened value vector.
/// Vector and tensor elements are mixed elements of identical scalar sub-elements. For a
/// symmetric tensor element, sub-element `k` holds one independent component and its values
/// appear at both mirrored positions of the physical value.
#[derive(Debug, Clone)]
pub struct MixedElement<T> {
    signature: String,
    family: ElementFamily,
    cell: CellShape,
    geometric_dimension: usize,
    degree: usize,
    mapping: MapKind,
    value_shape: Vec<usize>,
    reference_value_shape: Vec<usize>,
    sub_elements: Vec<Arc<dyn ReferenceElement<T>>>,
    entity_dofs: EntityDofs,
    dof_offsets: Vec<usize>,
    value_offsets: Vec<usize>,
    /// Physical component offsets at which each sub-element's values are written.
    value_placements: Vec<Vec<usize>>,
    reference_value_offsets: Vec<usize>,
    point_offsets: Vec<usize>,
}

impl<T: Real> MixedElement<T> {
    pub fn new(sub_elements: Vec<Arc<dyn ReferenceElement<T>>>) -> Result<Self, FormError> {
        let signature = format!(
            "MixedElement({})",
            sub_elements
                .iter()
                .map(|element| element.signature())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let value_size = sub_elements.iter().map(|element| element.value_size()).sum();
        Self::from_parts(signature, ElementFamily::Mixed, sub_elements, vec![value_size], None)
    }

    /// `n` copies of a scalar element with value shape `[n]`.
    pub fn vector(element: Arc<dyn ReferenceElement<T>>, n: usize) -> Result<Self, FormError> {
        if element.value_rank() != 0 {
            return Err(FormError::invalid_argument(format!(
                "vector elements require a scalar sub-element, got {}",
                element.signature()
            )));
        }
        let signature = format!("VectorElement({}, dim={})", element.signature(), n);
        let family = element.family();
        Self::from_parts(signature, family, vec![element; n], vec![n], None)
    }

    /// Copies of a scalar element with value shape `shape`, flattened row-major.
    ///
    /// A symmetric element requires a square rank-2 shape `[n, n]` and has one sub-element per
    /// entry `(i, j)` with `i <= j`, in row-major order. Its reference value shape is the
    /// number of independent components. Otherwise there is one sub-element per entry and the
    /// reference value shape equals `shape`.
    pub fn tensor(element: Arc<dyn ReferenceElement<T>>, shape: &[usize], symmetric: bool) -> Result<Self, FormError> {
        if element.value_rank() != 0 {
            return Err(FormError::invalid_argument(format!(
                "tensor elements require a scalar sub-element, got {}",
                element.signature()
            )));
        }
        if shape.is_empty() || shape.contains(&0) {
            return Err(FormError::invalid_argument(format!(
                "invalid tensor value shape {:?}",
                shape
            )));
        }
        let signature = format!(
            "TensorElement({}, shape={:?}, symmetric={})",
            element.signature(),
            shape,
            symmetric
        );
        let family = element.family();

        if !symmetric {
            let size = shape.iter().product();
            return Self::from_parts(signature, family, vec![element; size], shape.to_vec(), Some(shape.to_vec()));
        }

        let n = match shape {
            &[rows, cols] if rows == cols => rows,
            _ => {
                return Err(FormError::invalid_argument(format!(
                    "symmetric tensor elements require a square rank-2 shape, got {:?}",
                    shape
                )))
            }
        };
        let placements: Vec<Vec<usize>> = (0..n)
            .flat_map(|i| (i..n).map(move |j| (i, j)))
            .map(|(i, j)| if i == j { vec![i * n + j] } else { vec![i * n + j, j * n + i] })
            .collect();
        let num_independent = placements.len();
        let mut tensor = Self::from_parts(
            signature,
            family,
            vec![element; num_independent],
            shape.to_vec(),
            Some(vec![num_independent]),
        )?;
        tensor.value_offsets = placements.iter().map(|p| p[0]).collect();
        tensor.value_placements = placements;
        Ok(tensor)
    }

    fn from_parts(
        signature: String,
        family: ElementFamily,
        sub_elements: Vec<Arc<dyn ReferenceElement<T>>>,
        value_shape: Vec<usize>,
        reference_value_shape: Option<Vec<usize>>,
    ) -> Result<Self, FormError> {
        let first = sub_elements
            .first()
            .ok_or_else(|| FormError::invalid_argument("mixed elements need at least one sub-element"))?;
        let cell = first.cell_shape();
        let geometric_dimension = first.geometric_dimension();
        if let Some(element) = sub_elements
            .iter()
            .find(|element| element.cell_shape() != cell || element.geometric_dimension() != geometric_dimension)
        {
            return Err(FormError::invalid_argument(format!(
                "sub-element {} does not share the cell and geometric dimension of {}",
                element.signature(),
                first.signature()
            )));
        }

        let tdim = cell.topological_dimension();
        let degree = sub_elements.iter().map(|element| element.degree()).max().unwrap_or(0);
        let mapping = if sub_elements
            .iter()
            .all(|element| element.mapping() == MapKind::Identity)
        {
            MapKind::Identity
        } else {
            MapKind::Mixed
        };
        let reference_value_shape = reference_value_shape
            .unwrap_or_else(|| vec![sub_elements.iter().map(|e| e.reference_value_size()).sum()]);
        let dof_offsets = offsets(sub_elements.iter().map(|e| e.space_dimension()));
        let value_offsets = offsets(sub_elements.iter().map(|e| e.value_size()));
        let value_placements = value_offsets[..sub_elements.len()]
            .iter()
            .map(|&offset| vec![offset])
            .collect();
        let reference_value_offsets = offsets(sub_elements.iter().map(|e| e.reference_value_size()));
        let point_offsets = offsets(sub_elements.iter().map(|e| e.interpolation_points().len() / tdim));
        let entity_dofs = EntityDofs::concatenate(
            cell,
            sub_elements
                .iter()
                .zip(&dof_offsets)
                .map(|(element, &offset)| (element.entity_dofs(), offset)),
        );

        Ok(Self {
            signature,
            family,
            cell,
            geometric_dimension,
            degree,
            mapping,
            value_shape,
            reference_value_shape,
            sub_elements,
            entity_dofs,
            dof_offsets,
            value_offsets,
            value_placements,
            reference_value_offsets,
            point_offsets,
        })
    }

    pub fn sub_elements(&self) -> &[Arc<dyn ReferenceElement<T>>] {
        &self.sub_elements
    }

    /// Local dofs of sub-element `i`.
    pub fn dof_range(&self, i: usize) -> Range<usize> {
        self.dof_offsets[i]..self.dof_offsets[i + 1]
    }

    /// Physical value components of sub-element `i`. For symmetric tensor elements this is the
    /// entry `(i, j)` with `i <= j`.
    pub fn value_range(&self, i: usize) -> Range<usize> {
        let start = self.value_offsets[i];
        start..start + self.sub_elements[i].value_size()
    }

    /// Reference value components of sub-element `i`.
    pub fn reference_value_range(&self, i: usize) -> Range<usize> {
        self.reference_value_offsets[i]..self.reference_value_offsets[i + 1]
    }
}

impl<T: Real> ReferenceElement<T> for MixedElement<T> {
    fn signature(&self) -> &str {
        &self.signature
    }

    fn family(&self) -> ElementFamily {
        self.family
    }

    fn cell_shape(&self) -> CellShape {
        self.cell
    }

    fn geometric_dimension(&self) -> usize {
        self.geometric_dimension
    }

    fn space_dimension(&self) -> usize {
        self.dof_offsets.last().copied().unwrap_or(0)
    }

    fn degree(&self) -> usize {
        self.degree
    }

    fn value_shape(&self) -> &[usize] {
        &self.value_shape
    }

    fn reference_value_shape(&self) -> &[usize] {
        &self.reference_value_shape
    }

    fn mapping(&self) -> MapKind {
        self.mapping
    }

    fn entity_dofs(&self) -> &EntityDofs {
        &self.entity_dofs
    }

    fn tabulate_reference_basis(&self, max_order: usize, points: &[T]) -> BasisTable<T> {
        let tdim = self.cell.topological_dimension();
        let mut table = BasisTable::zeros(
            tdim,
            max_order,
            points.len() / tdim,
            self.space_dimension(),
            self.reference_value_size(),
        );
        for (i, element) in self.sub_elements.iter().enumerate() {
            let block = element.tabulate_reference_basis(max_order, points);
            table.set_block(self.dof_offsets[i], self.reference_value_offsets[i], &block);
        }
        table
    }

    fn interpolation_points(&self) -> Vec<T> {
        self.sub_elements
            .iter()
            .flat_map(|element| element.interpolation_points())
            .collect()
    }

    /// `values` holds all physical components at every point of the concatenated interpolation
    /// points. Each sub-element reads its own components at its own points.
    fn map_dofs(
        &self,
        dofs: &mut [T],
        values: &[T],
        coordinate_dofs: &[T],
        orientation: CellOrientation,
        coordinate_mapping: &CoordinateMapping<T>,
    ) -> Result<(), FormError> {
        let value_size = self.value_size();
        let num_points = self.point_offsets.last().copied().unwrap_or(0);
        check_len("dofs", dofs.len(), self.space_dimension())?;
        check_len("values", values.len(), num_points * value_size)?;

        for (i, element) in self.sub_elements.iter().enumerate() {
            let components = self.value_range(i);
            let sub_values: Vec<T> = (self.point_offsets[i]..self.point_offsets[i + 1])
                .flat_map(|q| values[q * value_size + components.start..q * value_size + components.end].iter())
                .copied()
                .collect();
            element.map_dofs(
                &mut dofs[self.dof_range(i)],
                &sub_values,
                coordinate_dofs,
                orientation,
                coordinate_mapping,
            )?;
        }
        Ok(())
    }

    fn transform_reference_basis_derivatives(
        &self,
        reference: &BasisTable<T>,
        geometry: &GeometryTable<T>,
        order: usize,
    ) -> Result<BasisTable<T>, FormError> {
        let mut physical = BasisTable::zeros(
            geometry.geometric_dimension(),
            order,
            reference.num_points(),
            self.space_dimension(),
            self.value_size(),
        );
        for (i, element) in self.sub_elements.iter().enumerate() {
            let block = reference.block(self.dof_range(i), self.reference_value_range(i));
            let transformed = element.transform_reference_basis_derivatives(&block, geometry, order)?;
            for &offset in &self.value_placements[i] {
                physical.set_block(self.dof_offsets[i], offset, &transformed);
            }
        }
        Ok(physical)
    }

    fn reference_dof_coordinates(&self) -> Option<Vec<T>> {
        let mut coordinates = Vec::new();
        for element in &self.sub_elements {
            coordinates.extend(element.reference_dof_coordinates()?);
        }
        Some(coordinates)
    }

    fn num_sub_elements(&self) -> usize {
        self.sub_elements.len()
    }

    fn sub_element(&self, index: usize) -> Result<Arc<dyn ReferenceElement<T>>, FormError> {
        self.sub_elements.get(index).cloned().ok_or_else(|| {
            FormError::contract_mismatch(format!(
                "sub-element index {} out of bounds for {} with {} sub-elements",
                index,
                self.signature,
                self.sub_elements.len()
            ))
        })
    }
}
