//! Reference cells: shapes, topology and reference geometry.
//!
//! The numbering of vertices and sub-entities follows the UFC conventions. Simplex edges are
//! numbered by the vertex they do *not* contain (in reverse order on the tetrahedron), and the
//! vertices of the quadrilateral and hexahedron are ordered lexicographically with the first
//! coordinate varying fastest.
use crate::error::FormError;
use fem_kernel_traits::Real;
use nalgebra::{DMatrix, Vector3};
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Display;

/// The shape of a reference cell.
///
/// The raw integer values used at the contract boundary are `0..=5` in declaration order. The
/// raw value `6` ([`RAW_SHAPE_NONE`]) denotes an unset shape and has no variant: an absent shape
/// is represented by `Option<CellShape>`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellShape {
    Interval,
    Triangle,
    Quadrilateral,
    Tetrahedron,
    Hexahedron,
    Vertex,
}

/// Raw value of the unset ("none") cell shape.
pub const RAW_SHAPE_NONE: i32 = 6;

/// Orientation of a manifold cell relative to its reference orientation.
///
/// Only meaningful when the topological dimension is smaller than the geometric dimension.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellOrientation {
    #[default]
    Reference,
    Flipped,
}

impl CellOrientation {
    pub fn from_raw(value: i32) -> Result<Self, FormError> {
        match value {
            0 => Ok(Self::Reference),
            1 => Ok(Self::Flipped),
            _ => Err(FormError::invalid_argument(format!("invalid cell orientation {}", value))),
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            Self::Reference => 0,
            Self::Flipped => 1,
        }
    }

    /// `1` for the reference orientation, `-1` for flipped cells.
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn sign<T: Real>(self) -> T {
        match self {
            Self::Reference => 1.0,
            Self::Flipped => -1.0,
        }
    }
}

type Topology = &'static [&'static [usize]];
type Vertices = &'static [&'static [f64]];

const VERTICES: Topology = &[&[0], &[1], &[2], &[3], &[4], &[5], &[6], &[7]];

const INTERVAL_EDGES: Topology = &[&[0, 1]];
const TRIANGLE_EDGES: Topology = &[&[1, 2], &[0, 2], &[0, 1]];
const QUADRILATERAL_EDGES: Topology = &[&[0, 1], &[0, 2], &[1, 3], &[2, 3]];
const TETRAHEDRON_EDGES: Topology = &[&[2, 3], &[1, 3], &[1, 2], &[0, 3], &[0, 2], &[0, 1]];
#[rustfmt::skip]
const HEXAHEDRON_EDGES: Topology = &[
    &[0, 1], &[0, 2], &[0, 4], &[1, 3], &[1, 5], &[2, 3],
    &[2, 6], &[3, 7], &[4, 5], &[4, 6], &[5, 7], &[6, 7],
];

const TRIANGLE_FACES: Topology = &[&[0, 1, 2]];
const QUADRILATERAL_FACES: Topology = &[&[0, 1, 2, 3]];
const TETRAHEDRON_FACES: Topology = &[&[1, 2, 3], &[0, 2, 3], &[0, 1, 3], &[0, 1, 2]];
#[rustfmt::skip]
const HEXAHEDRON_FACES: Topology = &[
    &[0, 1, 2, 3], &[0, 1, 4, 5], &[0, 2, 4, 6],
    &[1, 3, 5, 7], &[2, 3, 6, 7], &[4, 5, 6, 7],
];

const TETRAHEDRON_CELLS: Topology = &[&[0, 1, 2, 3]];
const HEXAHEDRON_CELLS: Topology = &[&[0, 1, 2, 3, 4, 5, 6, 7]];

const POINT_COORDS: Vertices = &[&[]];
const INTERVAL_COORDS: Vertices = &[&[0.0], &[1.0]];
const TRIANGLE_COORDS: Vertices = &[&[0.0, 0.0], &[1.0, 0.0], &[0.0, 1.0]];
const QUADRILATERAL_COORDS: Vertices = &[&[0.0, 0.0], &[1.0, 0.0], &[0.0, 1.0], &[1.0, 1.0]];
const TETRAHEDRON_COORDS: Vertices = &[&[0.0, 0.0, 0.0], &[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0], &[0.0, 0.0, 1.0]];
#[rustfmt::skip]
const HEXAHEDRON_COORDS: Vertices = &[
    &[0.0, 0.0, 0.0], &[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0], &[1.0, 1.0, 0.0],
    &[0.0, 0.0, 1.0], &[1.0, 0.0, 1.0], &[0.0, 1.0, 1.0], &[1.0, 1.0, 1.0],
];

impl CellShape {
    pub const ALL: [CellShape; 6] = [
        CellShape::Interval,
        CellShape::Triangle,
        CellShape::Quadrilateral,
        CellShape::Tetrahedron,
        CellShape::Hexahedron,
        CellShape::Vertex,
    ];

    /// Converts a raw shape value. The unset value and unknown values are rejected.
    pub fn from_raw(value: i32) -> Result<Self, FormError> {
        match value {
            0 => Ok(Self::Interval),
            1 => Ok(Self::Triangle),
            2 => Ok(Self::Quadrilateral),
            3 => Ok(Self::Tetrahedron),
            4 => Ok(Self::Hexahedron),
            5 => Ok(Self::Vertex),
            RAW_SHAPE_NONE => Err(FormError::contract_mismatch("cell shape is unset")),
            _ => Err(FormError::invalid_argument(format!("unknown cell shape {}", value))),
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            Self::Interval => 0,
            Self::Triangle => 1,
            Self::Quadrilateral => 2,
            Self::Tetrahedron => 3,
            Self::Hexahedron => 4,
            Self::Vertex => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::Triangle => "triangle",
            Self::Quadrilateral => "quadrilateral",
            Self::Tetrahedron => "tetrahedron",
            Self::Hexahedron => "hexahedron",
            Self::Vertex => "vertex",
        }
    }

    pub fn topological_dimension(self) -> usize {
        match self {
            Self::Vertex => 0,
            Self::Interval => 1,
            Self::Triangle | Self::Quadrilateral => 2,
            Self::Tetrahedron | Self::Hexahedron => 3,
        }
    }

    pub fn is_simplex(self) -> bool {
        matches!(self, Self::Interval | Self::Triangle | Self::Tetrahedron | Self::Vertex)
    }

    /// Vertex lists of all sub-entities of dimension `dim`. Empty if `dim` exceeds the
    /// topological dimension.
    pub fn entity_vertices(self, dim: usize) -> &'static [&'static [usize]] {
        match (self, dim) {
            (_, 0) => &VERTICES[..self.reference_vertices().len()],
            (Self::Interval, 1) => INTERVAL_EDGES,
            (Self::Triangle, 1) => TRIANGLE_EDGES,
            (Self::Triangle, 2) => TRIANGLE_FACES,
            (Self::Quadrilateral, 1) => QUADRILATERAL_EDGES,
            (Self::Quadrilateral, 2) => QUADRILATERAL_FACES,
            (Self::Tetrahedron, 1) => TETRAHEDRON_EDGES,
            (Self::Tetrahedron, 2) => TETRAHEDRON_FACES,
            (Self::Tetrahedron, 3) => TETRAHEDRON_CELLS,
            (Self::Hexahedron, 1) => HEXAHEDRON_EDGES,
            (Self::Hexahedron, 2) => HEXAHEDRON_FACES,
            (Self::Hexahedron, 3) => HEXAHEDRON_CELLS,
            _ => &[],
        }
    }

    pub fn num_entities(self, dim: usize) -> usize {
        self.entity_vertices(dim).len()
    }

    pub fn num_vertices(self) -> usize {
        self.reference_vertices().len()
    }

    /// Number of facets, i.e. sub-entities of codimension one. A vertex has none.
    pub fn num_facets(self) -> usize {
        match self.topological_dimension() {
            0 => 0,
            tdim => self.num_entities(tdim - 1),
        }
    }

    /// The shape of the facets, or `None` for a vertex.
    pub fn facet_shape(self) -> Option<CellShape> {
        match self {
            Self::Vertex => None,
            Self::Interval => Some(Self::Vertex),
            Self::Triangle | Self::Quadrilateral => Some(Self::Interval),
            Self::Tetrahedron => Some(Self::Triangle),
            Self::Hexahedron => Some(Self::Quadrilateral),
        }
    }

    /// Reference coordinates of the vertices.
    pub fn reference_vertices(self) -> &'static [&'static [f64]] {
        match self {
            Self::Vertex => POINT_COORDS,
            Self::Interval => INTERVAL_COORDS,
            Self::Triangle => TRIANGLE_COORDS,
            Self::Quadrilateral => QUADRILATERAL_COORDS,
            Self::Tetrahedron => TETRAHEDRON_COORDS,
            Self::Hexahedron => HEXAHEDRON_COORDS,
        }
    }

    /// Reference coordinates of vertex `i` converted to `T`.
    pub fn reference_vertex<T: Real>(self, i: usize) -> Vec<T> {
        self.reference_vertices()[i]
            .iter()
            .map(|&c| T::from_constant(c))
            .collect()
    }

    /// Centroid of the reference cell.
    pub fn reference_midpoint<T: Real>(self) -> Vec<T> {
        let tdim = self.topological_dimension();
        let vertices = self.reference_vertices();
        let mut midpoint = vec![T::zero(); tdim];
        for vertex in vertices {
            for (m, &c) in midpoint.iter_mut().zip(vertex.iter()) {
                *m += T::from_constant(c);
            }
        }
        let n = T::from_count(vertices.len());
        midpoint.iter_mut().for_each(|m| *m /= n);
        midpoint
    }

    /// Measure of the reference cell (`1` for a vertex).
    pub fn reference_volume(self) -> f64 {
        match self {
            Self::Triangle => 0.5,
            Self::Tetrahedron => 1.0 / 6.0,
            _ => 1.0,
        }
    }

    /// Whether `point` lies in the reference cell, up to the absolute tolerance `tol`.
    pub fn contains<T: Real>(self, point: &[T], tol: T) -> bool {
        if point.len() != self.topological_dimension() {
            return false;
        }
        let non_negative = point.iter().all(|&x| x >= -tol);
        if self.is_simplex() {
            let sum = point.iter().fold(T::zero(), |acc, &x| acc + x);
            non_negative && sum <= T::one() + tol
        } else {
            non_negative && point.iter().all(|&x| x <= T::one() + tol)
        }
    }

    /// Vertex list of facet `facet`.
    pub fn facet_vertices(self, facet: usize) -> Result<&'static [usize], FormError> {
        let num_facets = self.num_facets();
        if facet >= num_facets {
            return Err(FormError::invalid_argument(format!(
                "facet index {} out of range for {} with {} facets",
                facet,
                self.name(),
                num_facets
            )));
        }
        Ok(self.entity_vertices(self.topological_dimension() - 1)[facet])
    }

    /// All sub-entities `(dim, index)` contained in the closure of entity `(dim, index)`,
    /// ordered by dimension and then by entity index.
    pub fn sub_entity_closure(self, dim: usize, index: usize) -> Result<Vec<(usize, usize)>, FormError> {
        let entity = self
            .entity_vertices(dim)
            .get(index)
            .ok_or_else(|| {
                FormError::invalid_argument(format!(
                    "entity ({}, {}) does not exist on {}",
                    dim,
                    index,
                    self.name()
                ))
            })?;
        let mut closure = Vec::new();
        for d in 0..=dim {
            for (i, vertices) in self.entity_vertices(d).iter().enumerate() {
                if vertices.iter().all(|v| entity.contains(v)) {
                    closure.push((d, i));
                }
            }
        }
        Ok(closure)
    }

    /// The `tdim x (tdim - 1)` Jacobian of the affine map from the reference facet to facet
    /// `facet` of this cell.
    ///
    /// Column `k` is the difference between facet vertex `k + 1` and facet vertex `0`, which is
    /// also correct for quadrilateral facets thanks to the lexicographic vertex ordering.
    pub fn facet_reference_jacobian<T: Real>(self, facet: usize) -> Result<DMatrix<T>, FormError> {
        let vertices = self.facet_vertices(facet)?;
        let tdim = self.topological_dimension();
        let coords = self.reference_vertices();
        let v0 = coords[vertices[0]];
        Ok(DMatrix::from_fn(tdim, tdim - 1, |i, k| {
            T::from_constant(coords[vertices[k + 1]][i] - v0[i])
        }))
    }

    /// Maps a point on the reference facet to the reference coordinates of this cell.
    pub fn map_facet_point<T: Real>(self, facet: usize, facet_point: &[T], point: &mut [T]) -> Result<(), FormError> {
        let vertices = self.facet_vertices(facet)?;
        let tdim = self.topological_dimension();
        let coords = self.reference_vertices();
        if facet_point.len() + 1 != tdim || point.len() != tdim {
            return Err(FormError::invalid_argument("facet point has the wrong dimension"));
        }
        let v0 = coords[vertices[0]];
        for i in 0..tdim {
            point[i] = T::from_constant(v0[i]);
            for (k, &xi) in facet_point.iter().enumerate() {
                point[i] += xi * T::from_constant(coords[vertices[k + 1]][i] - v0[i]);
            }
        }
        Ok(())
    }

    /// Outward unit normal of facet `facet` of the reference cell.
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn facet_reference_normal<T: Real>(self, facet: usize) -> Result<Vec<T>, FormError> {
        let tdim = self.topological_dimension();
        let jacobian = self.facet_reference_jacobian::<T>(facet)?;
        let mut normal = match tdim {
            1 => vec![1.0],
            2 => vec![jacobian[(1, 0)], -jacobian[(0, 0)]],
            3 => {
                let t0 = Vector3::new(jacobian[(0, 0)], jacobian[(1, 0)], jacobian[(2, 0)]);
                let t1 = Vector3::new(jacobian[(0, 1)], jacobian[(1, 1)], jacobian[(2, 1)]);
                t0.cross(&t1).iter().copied().collect()
            }
            _ => unreachable!("facet_vertices rejects cells without facets"),
        };

        // Orient away from the cell midpoint
        let vertices = self.facet_vertices(facet)?;
        let cell_midpoint = self.reference_midpoint::<T>();
        let mut facet_midpoint = vec![0.0; tdim];
        for &v in vertices {
            for (m, c) in facet_midpoint.iter_mut().zip(self.reference_vertex::<T>(v)) {
                *m += c / T::from_count(vertices.len());
            }
        }
        let outward = normal
            .iter()
            .zip(facet_midpoint.iter().zip(&cell_midpoint))
            .fold(0.0, |acc, (&n, (&f, &c))| acc + n * (f - c));
        let norm = normal.iter().fold(0.0, |acc, &n| acc + n * n).sqrt();
        let scale = if outward < 0.0 { -1.0 / norm } else { 1.0 / norm };
        normal.iter_mut().for_each(|n| *n *= scale);
        Ok(normal)
    }
}

impl Display for CellShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
