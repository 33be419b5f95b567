//! Forms: the integrals of a variational form together with the spaces of its arguments and
//! coefficients.
//!
//! Integrals are registered per [`IntegralType`] and subdomain id. Subdomain ids of one kind
//! are dense, `0..max_subdomain_id`, and ids without a registered integral fall back to the
//! optional default integral of that kind.
use crate::contract::CONTRACT_VERSION;
use crate::coordinate_map::CoordinateMapping;
use crate::dofmap::{dofmap_for_element, DofMap};
use crate::element::ReferenceElement;
use crate::error::FormError;
use crate::integral::{
    CellIntegral, CustomIntegral, ExteriorFacetIntegral, Integral, IntegralType, InteriorFacetIntegral,
    VertexIntegral,
};
use fem_kernel_traits::Real;
use log::{debug, warn};
use std::sync::Arc;

/// An element with its dof map and the coordinate mapping of the cells it lives on.
#[derive(Debug, Clone)]
pub struct FunctionSpace<T: Real> {
    element: Arc<dyn ReferenceElement<T>>,
    dofmap: Arc<dyn DofMap>,
    coordinate_mapping: Arc<CoordinateMapping<T>>,
}

impl<T: Real> FunctionSpace<T> {
    pub fn new(
        element: Arc<dyn ReferenceElement<T>>,
        coordinate_mapping: Arc<CoordinateMapping<T>>,
    ) -> Result<Self, FormError> {
        if element.cell_shape() != coordinate_mapping.cell_shape()
            || element.geometric_dimension() != coordinate_mapping.geometric_dimension()
        {
            return Err(FormError::invalid_argument(format!(
                "element {} is incompatible with coordinate mapping {}",
                element.signature(),
                coordinate_mapping.signature()
            )));
        }
        let dofmap = dofmap_for_element(element.as_ref());
        Ok(Self {
            element,
            dofmap,
            coordinate_mapping,
        })
    }

    pub fn element(&self) -> &Arc<dyn ReferenceElement<T>> {
        &self.element
    }

    pub fn dofmap(&self) -> &Arc<dyn DofMap> {
        &self.dofmap
    }

    pub fn coordinate_mapping(&self) -> &Arc<CoordinateMapping<T>> {
        &self.coordinate_mapping
    }
}

/// Integrals of one kind, indexed by subdomain id.
#[derive(Debug, Clone)]
pub struct IntegralTable<T: Real> {
    subdomains: Vec<Option<Integral<T>>>,
    default: Option<Integral<T>>,
}

impl<T: Real> Default for IntegralTable<T> {
    fn default() -> Self {
        Self {
            subdomains: Vec::new(),
            default: None,
        }
    }
}

impl<T: Real> IntegralTable<T> {
    /// One past the largest registered subdomain id.
    pub fn max_subdomain_id(&self) -> usize {
        self.subdomains.len()
    }

    pub fn has_integrals(&self) -> bool {
        self.default.is_some() || self.subdomains.iter().any(Option::is_some)
    }

    /// The integral registered for `subdomain_id`, if any.
    pub fn get(&self, subdomain_id: usize) -> Option<&Integral<T>> {
        self.subdomains.get(subdomain_id).and_then(Option::as_ref)
    }

    pub fn default_integral(&self) -> Option<&Integral<T>> {
        self.default.as_ref()
    }

    /// The integral for `subdomain_id`, or the default integral.
    pub fn get_or_default(&self, subdomain_id: usize) -> Option<&Integral<T>> {
        self.get(subdomain_id).or(self.default.as_ref())
    }

    fn integrals(&self) -> impl Iterator<Item = &Integral<T>> {
        self.subdomains.iter().flatten().chain(self.default.iter())
    }
}

/// Generates the typed per-kind accessors of [`Form`].
macro_rules! integral_kind_accessors {
    ($kind:ident, $trait_name:ident, $max:ident, $has:ident, $create:ident, $create_default:ident) => {
        pub fn $max(&self) -> usize {
            self.integrals(IntegralType::$kind).max_subdomain_id()
        }

        pub fn $has(&self) -> bool {
            self.integrals(IntegralType::$kind).has_integrals()
        }

        /// The integral registered for the subdomain, or `None` if the subdomain has none.
        ///
        /// Fails if `subdomain_id` is not below the maximum subdomain id of this kind.
        pub fn $create(&self, subdomain_id: usize) -> Result<Option<Arc<dyn $trait_name<T>>>, FormError> {
            Ok(match self.integral(IntegralType::$kind, subdomain_id)? {
                Some(Integral::$kind(integral)) => Some(integral.clone()),
                _ => None,
            })
        }

        pub fn $create_default(&self) -> Option<Arc<dyn $trait_name<T>>> {
            match self.integrals(IntegralType::$kind).default_integral() {
                Some(Integral::$kind(integral)) => Some(integral.clone()),
                _ => None,
            }
        }
    };
}

/// A compiled variational form of rank `r` with `n` coefficients.
///
/// Spaces `0..r` belong to the arguments, test function first, and spaces `r..r + n` to the
/// coefficients.
#[derive(Debug, Clone)]
pub struct Form<T: Real> {
    signature: String,
    rank: usize,
    coordinate_mapping: Arc<CoordinateMapping<T>>,
    spaces: Vec<FunctionSpace<T>>,
    coefficient_names: Vec<String>,
    original_coefficient_positions: Vec<usize>,
    integrals: [IntegralTable<T>; 5],
}

fn kind_index(kind: IntegralType) -> usize {
    match kind {
        IntegralType::Cell => 0,
        IntegralType::ExteriorFacet => 1,
        IntegralType::InteriorFacet => 2,
        IntegralType::Vertex => 3,
        IntegralType::Custom => 4,
    }
}

impl<T: Real> Form<T> {
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn num_coefficients(&self) -> usize {
        self.spaces.len() - self.rank
    }

    /// Position of coefficient `i` in the original, uncompacted coefficient list.
    pub fn original_coefficient_position(&self, i: usize) -> Result<usize, FormError> {
        self.original_coefficient_positions.get(i).copied().ok_or_else(|| {
            FormError::contract_mismatch(format!(
                "coefficient {} out of bounds for a form with {} coefficients",
                i,
                self.num_coefficients()
            ))
        })
    }

    pub fn coefficient_name(&self, i: usize) -> Option<&str> {
        self.coefficient_names.get(i).map(String::as_str)
    }

    pub fn coefficient_number(&self, name: &str) -> Option<usize> {
        self.coefficient_names.iter().position(|n| n == name)
    }

    pub fn coordinate_mapping(&self) -> &Arc<CoordinateMapping<T>> {
        &self.coordinate_mapping
    }

    pub fn create_coordinate_mapping(&self) -> Arc<CoordinateMapping<T>> {
        self.coordinate_mapping.clone()
    }

    pub fn create_coordinate_finite_element(&self) -> Result<Arc<dyn ReferenceElement<T>>, FormError> {
        self.coordinate_mapping.create_coordinate_finite_element()
    }

    pub fn create_coordinate_dofmap(&self) -> Result<Arc<dyn DofMap>, FormError> {
        self.coordinate_mapping.create_coordinate_dofmap()
    }

    /// Space `i` of the `rank + num_coefficients` arguments and coefficients.
    pub fn function_space(&self, i: usize) -> Result<&FunctionSpace<T>, FormError> {
        self.spaces.get(i).ok_or_else(|| {
            FormError::contract_mismatch(format!(
                "function space {} out of bounds for a form with {} arguments and coefficients",
                i,
                self.spaces.len()
            ))
        })
    }

    pub fn create_finite_element(&self, i: usize) -> Result<Arc<dyn ReferenceElement<T>>, FormError> {
        Ok(self.function_space(i)?.element().clone())
    }

    pub fn create_dofmap(&self, i: usize) -> Result<Arc<dyn DofMap>, FormError> {
        Ok(self.function_space(i)?.dofmap().clone())
    }

    pub fn integrals(&self, kind: IntegralType) -> &IntegralTable<T> {
        &self.integrals[kind_index(kind)]
    }

    /// The integral registered for a subdomain, failing for ids beyond the maximum of the kind.
    pub fn integral(&self, kind: IntegralType, subdomain_id: usize) -> Result<Option<&Integral<T>>, FormError> {
        let table = self.integrals(kind);
        if subdomain_id >= table.max_subdomain_id() {
            return Err(FormError::invalid_argument(format!(
                "subdomain id {} out of range for {} integrals (maximum {})",
                subdomain_id,
                kind,
                table.max_subdomain_id()
            )));
        }
        Ok(table.get(subdomain_id))
    }

    /// The integral an assembler uses for a subdomain: the registered one, or the default.
    pub fn integral_for(&self, kind: IntegralType, subdomain_id: usize) -> Option<&Integral<T>> {
        self.integrals(kind).get_or_default(subdomain_id)
    }

    /// Length of the element tensor of integrals of the given kind.
    pub fn tensor_size(&self, kind: IntegralType) -> usize {
        self.spaces[..self.rank]
            .iter()
            .map(|space| kind.num_cells() * space.element().space_dimension())
            .product()
    }

    integral_kind_accessors!(
        Cell,
        CellIntegral,
        max_cell_subdomain_id,
        has_cell_integrals,
        create_cell_integral,
        create_default_cell_integral
    );
    integral_kind_accessors!(
        ExteriorFacet,
        ExteriorFacetIntegral,
        max_exterior_facet_subdomain_id,
        has_exterior_facet_integrals,
        create_exterior_facet_integral,
        create_default_exterior_facet_integral
    );
    integral_kind_accessors!(
        InteriorFacet,
        InteriorFacetIntegral,
        max_interior_facet_subdomain_id,
        has_interior_facet_integrals,
        create_interior_facet_integral,
        create_default_interior_facet_integral
    );
    integral_kind_accessors!(
        Vertex,
        VertexIntegral,
        max_vertex_subdomain_id,
        has_vertex_integrals,
        create_vertex_integral,
        create_default_vertex_integral
    );
    integral_kind_accessors!(
        Custom,
        CustomIntegral,
        max_custom_subdomain_id,
        has_custom_integrals,
        create_custom_integral,
        create_default_custom_integral
    );
}

#[derive(Debug)]
pub struct FormBuilder<T: Real> {
    signature: Option<String>,
    coordinate_mapping: Arc<CoordinateMapping<T>>,
    arguments: Vec<Arc<dyn ReferenceElement<T>>>,
    coefficients: Vec<(String, Arc<dyn ReferenceElement<T>>)>,
    original_coefficient_positions: Option<Vec<usize>>,
    integrals: Vec<(Option<usize>, Integral<T>)>,
}

impl<T: Real> FormBuilder<T> {
    pub fn new(coordinate_mapping: Arc<CoordinateMapping<T>>) -> Self {
        Self {
            signature: None,
            coordinate_mapping,
            arguments: Vec::new(),
            coefficients: Vec::new(),
            original_coefficient_positions: None,
            integrals: Vec::new(),
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Adds the next argument, test function first.
    pub fn with_argument(mut self, element: Arc<dyn ReferenceElement<T>>) -> Self {
        self.arguments.push(element);
        self
    }

    pub fn with_coefficient(mut self, name: impl Into<String>, element: Arc<dyn ReferenceElement<T>>) -> Self {
        self.coefficients.push((name.into(), element));
        self
    }

    /// Positions of the coefficients in the original coefficient list, identity by default.
    pub fn with_original_coefficient_positions(mut self, positions: Vec<usize>) -> Self {
        self.original_coefficient_positions = Some(positions);
        self
    }

    pub fn with_integral(mut self, subdomain_id: usize, integral: Integral<T>) -> Self {
        self.integrals.push((Some(subdomain_id), integral));
        self
    }

    pub fn with_default_integral(mut self, integral: Integral<T>) -> Self {
        self.integrals.push((None, integral));
        self
    }

    pub fn build(self) -> Result<Form<T>, FormError> {
        let rank = self.arguments.len();
        let num_coefficients = self.coefficients.len();
        let spaces = self
            .arguments
            .iter()
            .chain(self.coefficients.iter().map(|(_, element)| element))
            .map(|element| FunctionSpace::new(element.clone(), self.coordinate_mapping.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let coefficient_names: Vec<String> = self.coefficients.iter().map(|(name, _)| name.clone()).collect();
        for (i, name) in coefficient_names.iter().enumerate() {
            if coefficient_names[..i].contains(name) {
                return Err(FormError::invalid_argument(format!("duplicate coefficient name {}", name)));
            }
        }

        let original_coefficient_positions = self
            .original_coefficient_positions
            .unwrap_or_else(|| (0..num_coefficients).collect());
        if original_coefficient_positions.len() != num_coefficients {
            return Err(FormError::invalid_argument(format!(
                "{} original coefficient positions given for {} coefficients",
                original_coefficient_positions.len(),
                num_coefficients
            )));
        }
        for (i, position) in original_coefficient_positions.iter().enumerate() {
            if original_coefficient_positions[..i].contains(position) {
                return Err(FormError::invalid_argument(format!(
                    "original coefficient position {} assigned twice",
                    position
                )));
            }
        }

        let mut integrals: [IntegralTable<T>; 5] = Default::default();
        for (subdomain_id, integral) in self.integrals {
            if integral.enabled_coefficients().len() != num_coefficients {
                return Err(FormError::invalid_argument(format!(
                    "{} integral declares {} coefficients, the form has {}",
                    integral.integral_type(),
                    integral.enabled_coefficients().len(),
                    num_coefficients
                )));
            }
            let kind = integral.integral_type();
            let table = &mut integrals[kind_index(kind)];
            let slot = match subdomain_id {
                Some(id) => {
                    if table.subdomains.len() <= id {
                        table.subdomains.resize(id + 1, None);
                    }
                    &mut table.subdomains[id]
                }
                None => &mut table.default,
            };
            if slot.is_some() {
                return Err(FormError::invalid_argument(format!(
                    "{} integral registered twice for subdomain {:?}",
                    kind, subdomain_id
                )));
            }
            *slot = Some(integral);
        }

        if integrals.iter().all(|table| !table.has_integrals()) {
            warn!("Form of rank {} built without any integrals", rank);
        }

        let signature = self.signature.unwrap_or_else(|| {
            let elements: Vec<&str> = spaces.iter().map(|space| space.element().signature()).collect();
            format!(
                "Form(rank={}, coefficients={}, elements=[{}], contract={})",
                rank,
                num_coefficients,
                elements.join(", "),
                CONTRACT_VERSION
            )
        });
        debug!("Built form {}", signature);

        Ok(Form {
            signature,
            rank,
            coordinate_mapping: self.coordinate_mapping,
            spaces,
            coefficient_names,
            original_coefficient_positions,
            integrals,
        })
    }
}
