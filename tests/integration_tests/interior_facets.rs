use super::TriangleMesh;
use fem_kernel::assembly::{CellData, LocalAssembler};
use fem_kernel::cell::CellShape;
use fem_kernel::contract::CONTRACT_VERSION;
use fem_kernel::coordinate_map::CoordinateMapping;
use fem_kernel::element::{CiarletElement, ReferenceElement};
use fem_kernel::form::FormBuilder;
use fem_kernel::integral::{IntegralType, JumpPenalty, QuadratureIntegralBuilder};
use matrixcompare::assert_scalar_eq;
use std::sync::Arc;

fn jump_assembler(element: Arc<dyn ReferenceElement<f64>>) -> LocalAssembler<f64> {
    let cmap = Arc::new(CoordinateMapping::lagrange(CellShape::Triangle, 1, 2).unwrap());
    let integral = QuadratureIntegralBuilder::new(cmap.clone())
        .with_arguments(vec![element.clone(), element.clone()])
        .build(IntegralType::InteriorFacet, Arc::new(JumpPenalty { penalty: 1.0 }))
        .unwrap();
    let form = FormBuilder::new(cmap)
        .with_argument(element.clone())
        .with_argument(element)
        .with_default_integral(integral)
        .build()
        .unwrap();
    LocalAssembler::new(Arc::new(form), CONTRACT_VERSION).unwrap()
}

/// $u^T A u$ for the interior facet tensor `a` and the local dofs of both cells.
fn quadratic_form(a: &[f64], u: &[f64]) -> f64 {
    let n = u.len();
    (0..n)
        .flat_map(|i| (0..n).map(move |j| (i, j)))
        .map(|(i, j)| u[i] * a[i * n + j] * u[j])
        .sum()
}

/// Sum over interior facets of the jump energy of a function given by its local dofs per cell.
fn jump_energy(mesh: &TriangleMesh, assembler: &LocalAssembler<f64>, local_dofs: &[Vec<f64>], swap: bool) -> f64 {
    let cells: Vec<CellData<f64>> = mesh.cell_data();
    let size = assembler.tensor_size(IntegralType::InteriorFacet);
    let mut energy = 0.0;
    for [mut first, mut second] in mesh.interior_facets() {
        if swap {
            std::mem::swap(&mut first, &mut second);
        }
        let mut a = vec![0.0; size];
        let tabulated = assembler
            .tabulate_interior_facet(&mut a, [&cells[first.0], &cells[second.0]], [first.1, second.1])
            .unwrap();
        assert!(tabulated);
        let u: Vec<f64> = local_dofs[first.0]
            .iter()
            .chain(&local_dofs[second.0])
            .copied()
            .collect();
        energy += quadratic_form(&a, &u);
    }
    energy
}

#[test]
fn continuous_functions_have_no_jumps() {
    let mesh = TriangleMesh::unit_square(3);
    let p1: Arc<dyn ReferenceElement<f64>> = Arc::new(CiarletElement::<f64>::lagrange(CellShape::Triangle, 1).unwrap());
    let assembler = jump_assembler(p1);
    assert_eq!(assembler.tensor_size(IntegralType::InteriorFacet), 36);

    let f = |v: &[f64; 2]| 1.0 + 2.0 * v[0] - 3.0 * v[1] * v[1];
    let local_dofs: Vec<Vec<f64>> = mesh
        .cells
        .iter()
        .map(|cell| cell.iter().map(|&v| f(&mesh.vertices[v])).collect())
        .collect();
    assert_scalar_eq!(jump_energy(&mesh, &assembler, &local_dofs, false), 0.0, comp = abs, tol = 1e-12);
}

#[test]
fn piecewise_constants_jump_across_edges() {
    let mesh = TriangleMesh::unit_square(2);
    let dg0: Arc<dyn ReferenceElement<f64>> =
        Arc::new(CiarletElement::<f64>::discontinuous_lagrange(CellShape::Triangle, 0).unwrap());
    let assembler = jump_assembler(dg0);
    assert_eq!(assembler.tensor_size(IntegralType::InteriorFacet), 4);

    let values: Vec<f64> = (0..mesh.cells.len()).map(|c| c as f64).collect();
    let local_dofs: Vec<Vec<f64>> = values.iter().map(|&v| vec![v]).collect();

    let expected: f64 = mesh
        .interior_facets()
        .map(|[(c0, f0), (c1, _)]| {
            let vertices = CellShape::Triangle.facet_vertices(f0).unwrap();
            let [a, b] = [vertices[0], vertices[1]].map(|v| mesh.vertices[mesh.cells[c0][v]]);
            let length = ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt();
            (values[c0] - values[c1]).powi(2) * length
        })
        .sum();
    assert!(expected > 0.0);

    let forward = jump_energy(&mesh, &assembler, &local_dofs, false);
    let backward = jump_energy(&mesh, &assembler, &local_dofs, true);
    assert_scalar_eq!(forward, expected, comp = abs, tol = 1e-12);
    assert_scalar_eq!(backward, expected, comp = abs, tol = 1e-12);
}
