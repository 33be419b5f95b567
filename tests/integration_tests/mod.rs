use fem_kernel::assembly::{CellData, LocalAssembler};
use fem_kernel::cell::CellShape;
use fem_kernel::dofmap::DofMap;
use nalgebra::DMatrix;
use rustc_hash::FxHashMap;

mod interior_facets;
mod settings;

/// A uniform triangulation of the unit square with explicit edge numbering.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    pub vertices: Vec<[f64; 2]>,
    pub cells: Vec<[usize; 3]>,
    /// Global edge of each local edge, where local edge `i` is opposite local vertex `i`.
    pub cell_edges: Vec<[usize; 3]>,
    /// `(cell, local facet)` pairs of each edge.
    pub edge_cells: Vec<Vec<(usize, usize)>>,
}

impl TriangleMesh {
    /// Splits each of the `n x n` squares into two counter-clockwise triangles.
    pub fn unit_square(n: usize) -> Self {
        let h = 1.0 / n as f64;
        let vertices = (0..=n)
            .flat_map(|j| (0..=n).map(move |i| [i as f64 * h, j as f64 * h]))
            .collect();
        let index = |i: usize, j: usize| j * (n + 1) + i;
        let mut cells = Vec::new();
        for j in 0..n {
            for i in 0..n {
                cells.push([index(i, j), index(i + 1, j), index(i, j + 1)]);
                cells.push([index(i + 1, j), index(i + 1, j + 1), index(i, j + 1)]);
            }
        }

        let mut edge_indices = FxHashMap::default();
        let mut edge_cells: Vec<Vec<(usize, usize)>> = Vec::new();
        let mut cell_edges = Vec::with_capacity(cells.len());
        for (c, cell) in cells.iter().enumerate() {
            let mut edges = [0; 3];
            for (facet, edge) in edges.iter_mut().enumerate() {
                let local = CellShape::Triangle.facet_vertices(facet).unwrap();
                let (a, b) = (cell[local[0]], cell[local[1]]);
                let key = (a.min(b), a.max(b));
                let next = edge_cells.len();
                *edge = *edge_indices.entry(key).or_insert(next);
                if *edge == next {
                    edge_cells.push(Vec::new());
                }
                edge_cells[*edge].push((c, facet));
            }
            cell_edges.push(edges);
        }

        Self {
            vertices,
            cells,
            cell_edges,
            edge_cells,
        }
    }

    pub fn num_entities(&self) -> [usize; 3] {
        [self.vertices.len(), self.edge_cells.len(), self.cells.len()]
    }

    pub fn coordinate_dofs(&self, cell: usize) -> Vec<f64> {
        self.cells[cell]
            .iter()
            .flat_map(|&v| self.vertices[v])
            .collect()
    }

    pub fn cell_dofs(&self, dofmap: &dyn DofMap, cell: usize) -> Vec<usize> {
        let mut dofs = vec![0; dofmap.num_element_dofs()];
        let cells = [cell];
        let entity_indices: [&[usize]; 3] = [&self.cells[cell], &self.cell_edges[cell], &cells];
        dofmap
            .tabulate_dofs(&mut dofs, &self.num_entities(), &entity_indices)
            .unwrap();
        dofs
    }

    pub fn cell_data(&self) -> Vec<CellData<f64>> {
        (0..self.cells.len())
            .map(|c| CellData::new(self.coordinate_dofs(c)))
            .collect()
    }

    pub fn interior_facets(&self) -> impl Iterator<Item = [(usize, usize); 2]> + '_ {
        self.edge_cells
            .iter()
            .filter(|cells| cells.len() == 2)
            .map(|cells| [cells[0], cells[1]])
    }
}

/// Assembles the global matrix of a bilinear form whose arguments share `dofmap`.
pub fn assemble_matrix(mesh: &TriangleMesh, assembler: &LocalAssembler<f64>, dofmap: &dyn DofMap) -> DMatrix<f64> {
    let n = dofmap.global_dimension(&mesh.num_entities()).unwrap();
    let mut matrix = DMatrix::zeros(n, n);
    let tensors = assembler.tabulate_cells_par(&mesh.cell_data()).unwrap();
    for (c, tensor) in tensors.iter().enumerate() {
        let dofs = mesh.cell_dofs(dofmap, c);
        let local = dofs.len();
        for (i, &row) in dofs.iter().enumerate() {
            for (j, &col) in dofs.iter().enumerate() {
                matrix[(row, col)] += tensor[i * local + j];
            }
        }
    }
    matrix
}
