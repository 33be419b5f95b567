use fem_kernel::cell::CellShape;
use fem_kernel::dofmap::{dofmap_for_element, DofMap, GlobalDofMap};
use fem_kernel::element::{CiarletElement, MixedElement, ReferenceElement};
use fem_kernel::error::FormError;
use std::sync::Arc;

fn lagrange(cell: CellShape, degree: usize) -> Arc<dyn ReferenceElement<f64>> {
    Arc::new(CiarletElement::<f64>::lagrange(cell, degree).unwrap())
}

/// Two triangles sharing the edge between vertices 1 and 2:
/// cell 0 = (0, 1, 2) and cell 1 = (1, 3, 2).
/// Global edges: 0 = (1, 2), 1 = (0, 2), 2 = (0, 1), 3 = (2, 3), 4 = (1, 3).
const NUM_ENTITIES: [usize; 3] = [4, 5, 2];
const CELL_VERTICES: [[usize; 3]; 2] = [[0, 1, 2], [1, 3, 2]];
// Local edge i is opposite local vertex i
const CELL_EDGES: [[usize; 3]; 2] = [[0, 1, 2], [3, 0, 4]];

fn tabulate(dofmap: &dyn DofMap, cell: usize) -> Vec<usize> {
    let mut dofs = vec![0; dofmap.num_element_dofs()];
    let cells = [cell];
    let entity_indices: [&[usize]; 3] = [&CELL_VERTICES[cell], &CELL_EDGES[cell], &cells];
    dofmap
        .tabulate_dofs(&mut dofs, &NUM_ENTITIES, &entity_indices)
        .unwrap();
    dofs
}

#[test]
fn p1_dofs_follow_vertex_numbers() {
    let dofmap = dofmap_for_element(lagrange(CellShape::Triangle, 1).as_ref());
    assert_eq!(dofmap.num_element_dofs(), 3);
    assert_eq!(dofmap.global_dimension(&NUM_ENTITIES).unwrap(), 4);
    assert_eq!(tabulate(dofmap.as_ref(), 0), vec![0, 1, 2]);
    assert_eq!(tabulate(dofmap.as_ref(), 1), vec![1, 3, 2]);
}

#[test]
fn p2_edge_dofs_are_offset_by_vertex_count() {
    let dofmap = dofmap_for_element(lagrange(CellShape::Triangle, 2).as_ref());
    assert_eq!(dofmap.num_entity_dofs(0), 1);
    assert_eq!(dofmap.num_entity_dofs(1), 1);
    assert_eq!(dofmap.num_entity_dofs(2), 0);
    assert_eq!(dofmap.global_dimension(&NUM_ENTITIES).unwrap(), 9);

    assert_eq!(tabulate(dofmap.as_ref(), 0), vec![0, 1, 2, 4, 5, 6]);
    assert_eq!(tabulate(dofmap.as_ref(), 1), vec![1, 3, 2, 7, 4, 8]);

    // The shared edge gets the same global dof from both cells
    let dofs = [tabulate(dofmap.as_ref(), 0), tabulate(dofmap.as_ref(), 1)];
    assert_eq!(dofs[0][3], dofs[1][4]);
}

#[test]
fn closure_and_facet_dofs() {
    let dofmap = dofmap_for_element(lagrange(CellShape::Triangle, 2).as_ref());
    assert_eq!(dofmap.num_entity_closure_dofs(1), 3);
    assert_eq!(dofmap.num_facet_dofs(), 3);
    assert_eq!(dofmap.entity_closure_dofs(1, 0).unwrap(), vec![1, 2, 3]);
    assert_eq!(dofmap.entity_closure_dofs(1, 2).unwrap(), vec![0, 1, 5]);
    assert_eq!(dofmap.entity_closure_dofs(2, 0).unwrap(), vec![0, 1, 2, 3, 4, 5]);

    let mut facet_dofs = [0; 3];
    dofmap.tabulate_facet_dofs(&mut facet_dofs, 1).unwrap();
    assert_eq!(facet_dofs, [0, 2, 4]);

    let mut edge_dofs = [0; 1];
    dofmap.tabulate_entity_dofs(&mut edge_dofs, 1, 2).unwrap();
    assert_eq!(edge_dofs, [5]);
    assert!(dofmap.tabulate_entity_dofs(&mut [0; 2], 1, 2).is_err());
}

#[test]
fn cubic_tetrahedron_counts() {
    let dofmap = dofmap_for_element(lagrange(CellShape::Tetrahedron, 3).as_ref());
    assert_eq!(dofmap.num_element_dofs(), 20);
    assert_eq!(
        (0..=3).map(|d| dofmap.num_entity_dofs(d)).collect::<Vec<_>>(),
        vec![1, 2, 1, 0]
    );
    // Face closure: 3 vertices, 3 edges with 2 dofs each and the face dof
    assert_eq!(dofmap.num_facet_dofs(), 10);
    // 5 vertices, 9 edges, 7 faces and 2 cells in a mesh of two tetrahedra
    assert_eq!(dofmap.global_dimension(&[5, 9, 7, 2]).unwrap(), 5 + 18 + 7);
}

#[test]
fn vector_dofmap_numbers_components_in_blocks() {
    let vector = MixedElement::vector(lagrange(CellShape::Triangle, 1), 2).unwrap();
    let dofmap = dofmap_for_element(&vector);
    assert_eq!(dofmap.num_sub_dofmaps(), 2);
    assert_eq!(dofmap.num_element_dofs(), 6);
    assert_eq!(dofmap.global_dimension(&NUM_ENTITIES).unwrap(), 8);
    assert_eq!(tabulate(dofmap.as_ref(), 1), vec![1, 3, 2, 5, 7, 6]);

    // Closure dofs are listed per sub-dof map
    assert_eq!(dofmap.entity_closure_dofs(1, 0).unwrap(), vec![1, 2, 4, 5]);
    assert_eq!(dofmap.sub_dofmap(1).unwrap().num_element_dofs(), 3);
    assert!(matches!(dofmap.sub_dofmap(2), Err(FormError::ContractMismatch(_))));
}

#[test]
fn real_space_has_global_support() {
    let real: Arc<dyn ReferenceElement<f64>> = Arc::new(CiarletElement::<f64>::real(CellShape::Triangle).unwrap());
    let dofmap = dofmap_for_element(real.as_ref());
    assert_eq!(dofmap.num_global_support_dofs(), 1);
    assert_eq!(dofmap.num_element_support_dofs(), 0);
    assert_eq!(dofmap.global_dimension(&NUM_ENTITIES).unwrap(), 1);
    assert!(dofmap.entity_dofs(0, 1).unwrap().is_empty());

    // A Lagrange multiplier appended to P1 is numbered after all vertex dofs
    let mixed = MixedElement::new(vec![lagrange(CellShape::Triangle, 1), real]).unwrap();
    let dofmap = dofmap_for_element(&mixed);
    assert_eq!(dofmap.global_dimension(&NUM_ENTITIES).unwrap(), 5);
    assert_eq!(tabulate(dofmap.as_ref(), 0), vec![0, 1, 2, 4]);
    assert_eq!(tabulate(dofmap.as_ref(), 1), vec![1, 3, 2, 4]);

    let multipliers = GlobalDofMap::new(CellShape::Interval, 3);
    let mut dofs = [9; 3];
    multipliers.tabulate_dofs(&mut dofs, &[], &[]).unwrap();
    assert_eq!(dofs, [0, 1, 2]);
}

#[test]
fn invalid_queries_are_rejected() {
    let dofmap = dofmap_for_element(lagrange(CellShape::Triangle, 2).as_ref());
    assert!(matches!(
        dofmap.global_dimension(&[4, 5]),
        Err(FormError::InvalidArgument(_))
    ));
    assert!(dofmap.entity_dofs(1, 3).is_err());
    assert!(dofmap.entity_dofs(3, 0).is_err());
    assert!(matches!(dofmap.sub_dofmap(0), Err(FormError::ContractMismatch(_))));

    let mut dofs = vec![0; 5];
    let cells = [0];
    let entity_indices: [&[usize]; 3] = [&CELL_VERTICES[0], &CELL_EDGES[0], &cells];
    assert!(dofmap
        .tabulate_dofs(&mut dofs, &NUM_ENTITIES, &entity_indices)
        .is_err());

    // Too few vertex indices for a triangle
    let mut dofs = vec![0; 6];
    let entity_indices: [&[usize]; 3] = [&[0, 1], &CELL_EDGES[0], &cells];
    assert!(dofmap
        .tabulate_dofs(&mut dofs, &NUM_ENTITIES, &entity_indices)
        .is_err());
    // Edge 5 does not exist in a mesh with five edges
    let entity_indices: [&[usize]; 3] = [&CELL_VERTICES[0], &[0, 1, 5], &cells];
    assert!(matches!(
        dofmap.tabulate_dofs(&mut dofs, &NUM_ENTITIES, &entity_indices),
        Err(FormError::InvalidArgument(_))
    ));
}
