use crate::{error::TypeResolutionError, members::MethodDefinition, TypeDescription};
use std::fmt::{Debug, Formatter};

/// Parameter or return type as declared on a method signature.
#[derive(Clone, PartialEq)]
pub enum MethodType {
    Base(TypeDescription),
    /// Index into the method's own generic parameter list.
    MethodGeneric(usize),
}

impl From<TypeDescription> for MethodType {
    fn from(value: TypeDescription) -> Self {
        MethodType::Base(value)
    }
}

impl From<&TypeDescription> for MethodType {
    fn from(value: &TypeDescription) -> Self {
        MethodType::Base(value.clone())
    }
}

impl Debug for MethodType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MethodType::Base(t) => write!(f, "{t}"),
            MethodType::MethodGeneric(i) => write!(f, "!!{i}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenericParameter {
    pub name: String,
    pub constraints: Vec<TypeDescription>,
}

impl GenericParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraints: vec![],
        }
    }

    pub fn constrained_to(mut self, constraint: &TypeDescription) -> Self {
        self.constraints.push(constraint.clone());
        self
    }

    fn has_only_class_constraints(&self) -> bool {
        !self.constraints.is_empty()
            && self
                .constraints
                .iter()
                .all(|c| c.is_class() && !c.is_named("System.ValueType"))
    }
}

/// Concrete arguments substituted for a method's generic parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericLookup {
    pub method_generics: Vec<TypeDescription>,
}

impl GenericLookup {
    pub fn new(method_generics: Vec<TypeDescription>) -> Self {
        Self { method_generics }
    }

    pub fn make_concrete(&self, t: &MethodType) -> Result<TypeDescription, TypeResolutionError> {
        match t {
            MethodType::Base(ty) => Ok(ty.clone()),
            MethodType::MethodGeneric(index) => self
                .method_generics
                .get(*index)
                .cloned()
                .ok_or(TypeResolutionError::UnboundGeneric(*index)),
        }
    }
}

/// Whether a method can be exposed at all. Non-generic methods always can;
/// generic ones need every generic parameter used by a parameter to carry
/// only class constraints, and the return type may not be a bare generic
/// unless a parameter mentions it too.
pub fn is_supported_method(method: &MethodDefinition) -> bool {
    if !method.is_generic() {
        return true;
    }
    let mut has_valid_generic_parameter = false;
    let mut return_type_valid = !matches!(method.return_type, Some(MethodType::MethodGeneric(_)));

    for parameter in &method.parameters {
        let MethodType::MethodGeneric(index) = &parameter.ty else {
            continue;
        };
        let Some(generic) = method.generic_parameters.get(*index) else {
            return false;
        };
        if !generic.has_only_class_constraints() {
            return false;
        }
        has_valid_generic_parameter = true;
        if !return_type_valid && method.return_type.as_ref() == Some(&parameter.ty) {
            return_type_valid = true;
        }
    }

    has_valid_generic_parameter && return_type_valid
}

/// Specializes each generic parameter to its first constraint.
pub fn make_generic_method_with_constraints(
    method: &MethodDefinition,
) -> Result<GenericLookup, TypeResolutionError> {
    method
        .generic_parameters
        .iter()
        .enumerate()
        .map(|(index, g)| {
            g.constraints
                .first()
                .cloned()
                .ok_or_else(|| TypeResolutionError::Specialization {
                    method: method.name.clone(),
                    index,
                })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(GenericLookup::new)
}
