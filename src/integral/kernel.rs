//! Integrals evaluated by numerical quadrature of an [`Integrand`].
use crate::cell::CellOrientation;
use crate::coordinate_map::{CoordinateMapping, GeometryTable, InverseMapSettings};
use crate::element::{BasisTable, ReferenceElement};
use crate::error::{check_len, FormError};
use crate::integral::{
    CellIntegral, CustomIntegral, ExteriorFacetIntegral, Integral, IntegralType, Integrand, IntegrandPoint,
    InteriorFacetIntegral, SideValues, VertexIntegral,
};
use crate::quadrature::{create_facet_quadratures, create_quadrature, QuadratureRule, QuadratureScheme};
use fem_kernel_traits::Real;
use itertools::izip;
use log::trace;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Settings of quadrature integrals.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabulationSettings {
    /// Polynomial degree the quadrature rule integrates exactly.
    pub quadrature_degree: usize,
    pub scheme: QuadratureScheme,
    /// Overrides the inverse map settings of the coordinate mapping, which recovers reference
    /// points of custom and interior facet integrals. `None` keeps the mapping's own settings.
    pub inverse_map: Option<InverseMapSettings>,
}

impl Default for TabulationSettings {
    fn default() -> Self {
        Self {
            quadrature_degree: 2,
            scheme: QuadratureScheme::default(),
            inverse_map: None,
        }
    }
}

/// An integral of any kind computed by quadrature of an [`Integrand`].
///
/// Use [`QuadratureIntegralBuilder`] to construct one.
#[derive(Debug)]
pub struct QuadratureIntegral<T: Real> {
    integral_type: IntegralType,
    coordinate_mapping: CoordinateMapping<T>,
    arguments: Vec<Arc<dyn ReferenceElement<T>>>,
    coefficients: Vec<Arc<dyn ReferenceElement<T>>>,
    enabled_coefficients: Vec<bool>,
    integrand: Arc<dyn Integrand<T>>,
    /// Cell rule for cell integrals, one rule per facet for facet integrals.
    rules: Vec<QuadratureRule<T>>,
    settings: TabulationSettings,
}

#[derive(Debug)]
pub struct QuadratureIntegralBuilder<T: Real> {
    coordinate_mapping: Arc<CoordinateMapping<T>>,
    arguments: Vec<Arc<dyn ReferenceElement<T>>>,
    coefficients: Vec<Arc<dyn ReferenceElement<T>>>,
    settings: TabulationSettings,
}

impl<T: Real> QuadratureIntegralBuilder<T> {
    pub fn new(coordinate_mapping: Arc<CoordinateMapping<T>>) -> Self {
        Self {
            coordinate_mapping,
            arguments: Vec::new(),
            coefficients: Vec::new(),
            settings: TabulationSettings::default(),
        }
    }

    /// Sets the argument elements, test function first.
    pub fn with_arguments(self, arguments: Vec<Arc<dyn ReferenceElement<T>>>) -> Self {
        Self { arguments, ..self }
    }

    pub fn with_coefficients(self, coefficients: Vec<Arc<dyn ReferenceElement<T>>>) -> Self {
        Self { coefficients, ..self }
    }

    pub fn with_settings(self, settings: TabulationSettings) -> Self {
        Self { settings, ..self }
    }

    pub fn with_quadrature_degree(mut self, degree: usize) -> Self {
        self.settings.quadrature_degree = degree;
        self
    }

    /// Builds an integral of the given kind.
    pub fn build(&self, integral_type: IntegralType, integrand: Arc<dyn Integrand<T>>) -> Result<Integral<T>, FormError> {
        let integral = Arc::new(self.build_quadrature_integral(integral_type, integrand)?);
        Ok(match integral_type {
            IntegralType::Cell => Integral::Cell(integral),
            IntegralType::ExteriorFacet => Integral::ExteriorFacet(integral),
            IntegralType::InteriorFacet => Integral::InteriorFacet(integral),
            IntegralType::Vertex => Integral::Vertex(integral),
            IntegralType::Custom => Integral::Custom(integral),
        })
    }

    pub fn build_quadrature_integral(
        &self,
        integral_type: IntegralType,
        integrand: Arc<dyn Integrand<T>>,
    ) -> Result<QuadratureIntegral<T>, FormError> {
        let cmap = &self.coordinate_mapping;
        if integrand.rank() != self.arguments.len() {
            return Err(FormError::invalid_argument(format!(
                "integrand of rank {} given {} arguments",
                integrand.rank(),
                self.arguments.len()
            )));
        }
        for element in self.arguments.iter().chain(&self.coefficients) {
            if element.cell_shape() != cmap.cell_shape() || element.geometric_dimension() != cmap.geometric_dimension() {
                return Err(FormError::invalid_argument(format!(
                    "element {} does not live on the cell of {}",
                    element.signature(),
                    cmap.signature()
                )));
            }
        }
        let mut enabled_coefficients = vec![false; self.coefficients.len()];
        for j in integrand.coefficients() {
            let enabled = enabled_coefficients.get_mut(j).ok_or_else(|| {
                FormError::invalid_argument(format!(
                    "integrand reads coefficient {} of {}",
                    j,
                    self.coefficients.len()
                ))
            })?;
            *enabled = true;
        }

        let cell = cmap.cell_shape();
        let degree = self.settings.quadrature_degree;
        let scheme = self.settings.scheme;
        let rules = match integral_type {
            IntegralType::Cell => vec![create_quadrature(cell, degree, scheme)?],
            IntegralType::ExteriorFacet | IntegralType::InteriorFacet => create_facet_quadratures(cell, degree, scheme)?,
            IntegralType::Vertex | IntegralType::Custom => Vec::new(),
        };

        Ok(QuadratureIntegral {
            integral_type,
            coordinate_mapping: match self.settings.inverse_map {
                Some(inverse_map) => cmap.as_ref().clone().with_inverse_map_settings(inverse_map),
                None => cmap.as_ref().clone(),
            },
            arguments: self.arguments.clone(),
            coefficients: self.coefficients.clone(),
            enabled_coefficients,
            integrand,
            rules,
            settings: self.settings,
        })
    }
}

/// Measure of the mapped reference facet, $\sqrt{\det(F^T F)}$ with $F = J J_{facet}$.
fn facet_scale<T: Real>(jacobian: &[T], facet_jacobian: &DMatrix<T>, gdim: usize, tdim: usize) -> T {
    if tdim == 1 {
        return T::one();
    }
    let f = DMatrix::from_row_slice(gdim, tdim, jacobian) * facet_jacobian;
    (f.transpose() * &f).determinant().sqrt()
}

/// Physical outward unit normal $K^T n_{ref}$ normalized.
fn physical_normal<T: Real>(inverse: &[T], reference_normal: &[T], gdim: usize, tdim: usize) -> Vec<T> {
    let mut normal: Vec<T> = (0..gdim)
        .map(|i| (0..tdim).fold(T::zero(), |acc, a| acc + inverse[a * gdim + i] * reference_normal[a]))
        .collect();
    let norm = normal.iter().fold(T::zero(), |acc, &n| acc + n * n).sqrt();
    normal.iter_mut().for_each(|n| *n /= norm);
    normal
}

impl<T: Real> QuadratureIntegral<T> {
    pub fn integral_type(&self) -> IntegralType {
        self.integral_type
    }

    pub fn settings(&self) -> &TabulationSettings {
        &self.settings
    }

    pub fn coordinate_mapping(&self) -> &CoordinateMapping<T> {
        &self.coordinate_mapping
    }

    /// Length of the element tensor.
    pub fn tensor_size(&self) -> usize {
        let num_cells = self.integral_type.num_cells();
        self.arguments
            .iter()
            .map(|element| num_cells * element.space_dimension())
            .product()
    }

    fn check_kind(&self, expected: IntegralType) -> Result<(), FormError> {
        if self.integral_type == expected {
            Ok(())
        } else {
            Err(FormError::invalid_argument(format!(
                "{} integral tabulated as a {} integral",
                self.integral_type, expected
            )))
        }
    }

    fn check_coefficients(&self, w: &[&[T]]) -> Result<(), FormError> {
        check_len("w", w.len(), self.coefficients.len())?;
        let num_cells = self.integral_type.num_cells();
        for (j, element) in self.coefficients.iter().enumerate() {
            if self.enabled_coefficients[j] {
                check_len("w[j]", w[j].len(), num_cells * element.space_dimension())?;
            }
        }
        Ok(())
    }

    /// Evaluates arguments and coefficients at reference points of one cell.
    fn evaluate_side(
        &self,
        geometry: &GeometryTable<T>,
        points: &[T],
        normals: Option<Vec<T>>,
        w: &[&[T]],
        side: usize,
    ) -> Result<SideValues<T>, FormError> {
        let order = self.integrand.derivative_order();
        let physical_table = |element: &Arc<dyn ReferenceElement<T>>| {
            let reference = element.tabulate_reference_basis(order, points);
            element.transform_reference_basis_derivatives(&reference, geometry, order)
        };
        let arguments = self
            .arguments
            .iter()
            .map(|element| physical_table(element))
            .collect::<Result<Vec<_>, _>>()?;

        let gdim = geometry.geometric_dimension();
        let num_points = geometry.num_points();
        let mut coefficients = Vec::with_capacity(self.coefficients.len());
        for (j, element) in self.coefficients.iter().enumerate() {
            let mut values = BasisTable::zeros(gdim, order, num_points, 1, element.value_size());
            if self.enabled_coefficients[j] {
                let n = element.space_dimension();
                let dofs = &w[j][side * n..(side + 1) * n];
                let table = physical_table(element)?;
                for k in 0..=order {
                    for q in 0..num_points {
                        let value = values.dof_block_mut(k, q, 0);
                        for (dof, &w_dof) in dofs.iter().enumerate() {
                            for (v, &phi) in value.iter_mut().zip(table.dof_block(k, q, dof)) {
                                *v += w_dof * phi;
                            }
                        }
                    }
                }
            }
            coefficients.push(values);
        }

        Ok(SideValues {
            gdim,
            points: geometry.physical_points().to_vec(),
            normals,
            arguments,
            coefficients,
        })
    }

    fn accumulate(&self, a: &mut [T], sides: &[SideValues<T>], scales: &[T]) -> Result<(), FormError> {
        check_len("A", a.len(), self.tensor_size())?;
        a.iter_mut().for_each(|entry| *entry = T::zero());
        for (q, &scale) in scales.iter().enumerate() {
            let point = IntegrandPoint { point: q, sides };
            self.integrand.accumulate(&point, scale, a);
        }
        Ok(())
    }

    /// Geometry, facet scales and normals of a facet rule.
    fn facet_geometry(
        &self,
        coordinate_dofs: &[T],
        facet: usize,
        orientation: CellOrientation,
    ) -> Result<(GeometryTable<T>, Vec<T>, Vec<T>), FormError> {
        let cmap = &self.coordinate_mapping;
        let cell = cmap.cell_shape();
        let rule = self.rules.get(facet).ok_or_else(|| {
            FormError::invalid_argument(format!("facet {} does not exist on {}", facet, cell))
        })?;
        let (tdim, gdim) = (cmap.topological_dimension(), cmap.geometric_dimension());
        let geometry = cmap.tabulate_geometry(rule.points(), self.integrand.derivative_order(), coordinate_dofs, orientation)?;
        let facet_jacobian = cell.facet_reference_jacobian::<T>(facet)?;
        let reference_normal = cell.facet_reference_normal::<T>(facet)?;
        let mut scales = Vec::with_capacity(rule.num_points());
        let mut normals = Vec::with_capacity(rule.num_points() * gdim);
        for (&weight, j, k) in izip!(
            rule.weights(),
            geometry.jacobians().chunks_exact(gdim * tdim),
            geometry.inverses().chunks_exact(gdim * tdim)
        ) {
            scales.push(weight * facet_scale(j, &facet_jacobian, gdim, tdim));
            normals.extend(physical_normal(k, &reference_normal, gdim, tdim));
        }
        Ok((geometry, scales, normals))
    }
}

impl<T: Real> CellIntegral<T> for QuadratureIntegral<T> {
    fn enabled_coefficients(&self) -> &[bool] {
        &self.enabled_coefficients
    }

    fn tabulate_tensor(
        &self,
        a: &mut [T],
        w: &[&[T]],
        coordinate_dofs: &[T],
        orientation: CellOrientation,
    ) -> Result<(), FormError> {
        self.check_kind(IntegralType::Cell)?;
        self.check_coefficients(w)?;
        let rule = &self.rules[0];
        let geometry = self.coordinate_mapping.tabulate_geometry(
            rule.points(),
            self.integrand.derivative_order(),
            coordinate_dofs,
            orientation,
        )?;
        let scales: Vec<T> = rule
            .weights()
            .iter()
            .zip(geometry.determinants())
            .map(|(&weight, &det)| weight * det.abs())
            .collect();
        let side = self.evaluate_side(&geometry, rule.points(), None, w, 0)?;
        self.accumulate(a, &[side], &scales)
    }
}

impl<T: Real> ExteriorFacetIntegral<T> for QuadratureIntegral<T> {
    fn enabled_coefficients(&self) -> &[bool] {
        &self.enabled_coefficients
    }

    fn tabulate_tensor(
        &self,
        a: &mut [T],
        w: &[&[T]],
        coordinate_dofs: &[T],
        facet: usize,
        orientation: CellOrientation,
    ) -> Result<(), FormError> {
        self.check_kind(IntegralType::ExteriorFacet)?;
        self.check_coefficients(w)?;
        let (geometry, scales, normals) = self.facet_geometry(coordinate_dofs, facet, orientation)?;
        let side = self.evaluate_side(&geometry, self.rules[facet].points(), Some(normals), w, 0)?;
        self.accumulate(a, &[side], &scales)
    }
}

impl<T: Real> InteriorFacetIntegral<T> for QuadratureIntegral<T> {
    fn enabled_coefficients(&self) -> &[bool] {
        &self.enabled_coefficients
    }

    fn tabulate_tensor(
        &self,
        a: &mut [T],
        w: &[&[T]],
        coordinate_dofs: [&[T]; 2],
        facets: [usize; 2],
        orientations: [CellOrientation; 2],
    ) -> Result<(), FormError> {
        self.check_kind(IntegralType::InteriorFacet)?;
        self.check_coefficients(w)?;
        let cmap = &self.coordinate_mapping;
        let order = self.integrand.derivative_order();

        // Side 0 owns the quadrature rule, side 1 sees the same physical points
        let (geometry0, scales, normals0) = self.facet_geometry(coordinate_dofs[0], facets[0], orientations[0])?;
        let points0 = self.rules[facets[0]].points();
        let mut points1 = vec![T::zero(); points0.len()];
        cmap.compute_reference_coordinates(
            &mut points1,
            geometry0.physical_points(),
            coordinate_dofs[1],
            orientations[1],
        )?;
        trace!("Interior facet points mapped to cell 1: {:?}", points1);

        let cell = cmap.cell_shape();
        let (tdim, gdim) = (cmap.topological_dimension(), cmap.geometric_dimension());
        let geometry1 = cmap.tabulate_geometry(&points1, order, coordinate_dofs[1], orientations[1])?;
        let reference_normal1 = cell.facet_reference_normal::<T>(facets[1])?;
        let normals1 = (0..geometry1.num_points())
            .flat_map(|q| physical_normal(geometry1.inverse(q), &reference_normal1, gdim, tdim))
            .collect();

        let side0 = self.evaluate_side(&geometry0, points0, Some(normals0), w, 0)?;
        let side1 = self.evaluate_side(&geometry1, &points1, Some(normals1), w, 1)?;
        self.accumulate(a, &[side0, side1], &scales)
    }
}

impl<T: Real> VertexIntegral<T> for QuadratureIntegral<T> {
    fn enabled_coefficients(&self) -> &[bool] {
        &self.enabled_coefficients
    }

    fn tabulate_tensor(
        &self,
        a: &mut [T],
        w: &[&[T]],
        coordinate_dofs: &[T],
        vertex: usize,
        orientation: CellOrientation,
    ) -> Result<(), FormError> {
        self.check_kind(IntegralType::Vertex)?;
        self.check_coefficients(w)?;
        let cell = self.coordinate_mapping.cell_shape();
        if vertex >= cell.num_vertices() {
            return Err(FormError::invalid_argument(format!(
                "vertex {} does not exist on {}",
                vertex, cell
            )));
        }
        let point = cell.reference_vertex::<T>(vertex);
        let geometry = self.coordinate_mapping.tabulate_geometry(
            &point,
            self.integrand.derivative_order(),
            coordinate_dofs,
            orientation,
        )?;
        let side = self.evaluate_side(&geometry, &point, None, w, 0)?;
        self.accumulate(a, &[side], &[T::one()])
    }
}

impl<T: Real> CustomIntegral<T> for QuadratureIntegral<T> {
    fn enabled_coefficients(&self) -> &[bool] {
        &self.enabled_coefficients
    }

    fn tabulate_tensor(
        &self,
        a: &mut [T],
        w: &[&[T]],
        coordinate_dofs: &[T],
        points: &[T],
        weights: &[T],
        normals: Option<&[T]>,
        orientation: CellOrientation,
    ) -> Result<(), FormError> {
        self.check_kind(IntegralType::Custom)?;
        self.check_coefficients(w)?;
        let cmap = &self.coordinate_mapping;
        let (tdim, gdim) = (cmap.topological_dimension(), cmap.geometric_dimension());
        check_len("points", points.len(), weights.len() * gdim)?;
        if let Some(normals) = normals {
            check_len("normals", normals.len(), points.len())?;
        }

        let mut reference_points = vec![T::zero(); weights.len() * tdim];
        cmap.compute_reference_coordinates_in_cell(&mut reference_points, points, coordinate_dofs, orientation)?;
        let geometry = cmap.tabulate_geometry(
            &reference_points,
            self.integrand.derivative_order(),
            coordinate_dofs,
            orientation,
        )?;
        let side = self.evaluate_side(
            &geometry,
            &reference_points,
            normals.map(<[T]>::to_vec),
            w,
            0,
        )?;
        self.accumulate(a, &[side], weights)
    }
}
