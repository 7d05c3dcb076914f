//! # hostlua-types
//!
//! Runtime representation of host types, their members, and host values.
//! This crate is the reflection metadata the binding layer walks when it
//! builds dispatch tables for the scripting side.
//!
//! ## Core Types
//!
//! - **[`TypeDescription`]**: Cheap handle to a host type definition; equality is identity.
//! - **[`MethodDescription`](members::MethodDescription)**: A method paired with its declaring type.
//! - **[`FieldDescription`](members::FieldDescription)**: A field paired with its declaring type.
//! - **[`TypeRegistry`](registry::TypeRegistry)**: The loaded host type universe.
//! - **[`TypeBuilder`](builder::TypeBuilder)**: Declares host types the way a reflecting host reports them.
//! - **[`HostValue`](value::HostValue)**: A value living on the host side.
use crate::{
    members::{EventDefinition, FieldDefinition, MethodDefinition, PropertyDefinition},
    value::FieldStorage,
};
use parking_lot::RwLock;
use std::{
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    sync::Arc,
};

pub mod builder;
pub mod comparer;
pub mod error;
pub mod generics;
pub mod members;
pub mod registry;
pub mod value;

pub use builder::TypeBuilder;
pub use error::{HostException, TypeResolutionError};
pub use members::{FieldDescription, MethodDescription};
pub use registry::{CoreTypes, TypeRegistry};
pub use value::{Delegate, HostValue, Object, ObjectRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    NonPublic,
}

/// Member filter used when enumerating declared members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemberAccess {
    #[default]
    Public,
    NonPublic,
    All,
}

impl MemberAccess {
    pub fn admits(self, visibility: Visibility) -> bool {
        match self {
            MemberAccess::Public => visibility == Visibility::Public,
            MemberAccess::NonPublic => visibility == Visibility::NonPublic,
            MemberAccess::All => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Char,
    Int32,
    Int64,
    Single,
    Double,
    String,
}

impl PrimitiveKind {
    pub fn is_integral(self) -> bool {
        matches!(self, PrimitiveKind::Char | PrimitiveKind::Int32 | PrimitiveKind::Int64)
    }

    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Single | PrimitiveKind::Double)
    }
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Delegate,
    Enum { members: Vec<(String, i64)> },
    Array { element: TypeDescription },
    Primitive(PrimitiveKind),
}

/// Immutable metadata for one host type. Only the static field storage is mutable.
pub struct TypeDefinition {
    pub namespace: String,
    pub name: String,
    /// Names of the enclosing classes, outermost first.
    pub enclosing: Vec<String>,
    pub kind: TypeKind,
    pub extends: Option<TypeDescription>,
    pub interfaces: Vec<TypeDescription>,
    pub visibility: Visibility,
    pub is_abstract: bool,
    pub is_generic_definition: bool,
    pub is_extension_container: bool,
    pub fields: Vec<Arc<FieldDefinition>>,
    pub properties: Vec<Arc<PropertyDefinition>>,
    pub events: Vec<Arc<EventDefinition>>,
    pub methods: Vec<Arc<MethodDefinition>>,
    pub constructors: Vec<Arc<MethodDefinition>>,
    pub nested_types: Vec<TypeDescription>,
    statics: RwLock<FieldStorage>,
}

impl TypeDefinition {
    pub(crate) fn new(namespace: String, name: String, kind: TypeKind) -> Self {
        Self {
            namespace,
            name,
            enclosing: vec![],
            kind,
            extends: None,
            interfaces: vec![],
            visibility: Visibility::Public,
            is_abstract: false,
            is_generic_definition: false,
            is_extension_container: false,
            fields: vec![],
            properties: vec![],
            events: vec![],
            methods: vec![],
            constructors: vec![],
            nested_types: vec![],
            statics: RwLock::new(FieldStorage::default()),
        }
    }
}

#[derive(Clone)]
pub struct TypeDescription(Arc<TypeDefinition>);

impl TypeDescription {
    pub(crate) fn new(definition: TypeDefinition) -> Self {
        let statics = definition
            .fields
            .iter()
            .filter(|f| f.is_static)
            .map(|f| (f.name.clone(), f.default_value.clone()))
            .collect::<FieldStorage>();
        *definition.statics.write() = statics;
        Self(Arc::new(definition))
    }

    pub fn definition(&self) -> &TypeDefinition {
        &self.0
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn namespace(&self) -> &str {
        &self.0.namespace
    }

    /// `Namespace.Outer+Inner` form.
    pub fn full_name(&self) -> String {
        let mut out = String::new();
        if !self.0.namespace.is_empty() {
            out.push_str(&self.0.namespace);
            out.push('.');
        }
        for outer in &self.0.enclosing {
            out.push_str(outer);
            out.push('+');
        }
        out.push_str(&self.0.name);
        out
    }

    pub fn is_named(&self, full_name: &str) -> bool {
        self.full_name() == full_name
    }

    pub fn base(&self) -> Option<&TypeDescription> {
        self.0.extends.as_ref()
    }

    pub fn is_nested(&self) -> bool {
        !self.0.enclosing.is_empty()
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.0.kind, TypeKind::Enum { .. })
    }

    pub fn is_delegate(&self) -> bool {
        matches!(self.0.kind, TypeKind::Delegate)
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.0.kind, TypeKind::Interface)
    }

    pub fn is_class(&self) -> bool {
        matches!(
            self.0.kind,
            TypeKind::Class | TypeKind::Delegate | TypeKind::Array { .. } | TypeKind::Primitive(PrimitiveKind::String)
        )
    }

    pub fn is_value_type(&self) -> bool {
        match &self.0.kind {
            TypeKind::Struct | TypeKind::Enum { .. } => true,
            TypeKind::Primitive(p) => *p != PrimitiveKind::String,
            _ => false,
        }
    }

    pub fn primitive(&self) -> Option<PrimitiveKind> {
        match self.0.kind {
            TypeKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<&TypeDescription> {
        match &self.0.kind {
            TypeKind::Array { element } => Some(element),
            _ => None,
        }
    }

    pub fn enum_members(&self) -> &[(String, i64)] {
        match &self.0.kind {
            TypeKind::Enum { members } => members,
            _ => &[],
        }
    }

    pub fn enum_value(&self, member: &str) -> Option<i64> {
        self.enum_members()
            .iter()
            .find(|(name, _)| name == member)
            .map(|(_, v)| *v)
    }

    pub fn statics(&self) -> &RwLock<FieldStorage> {
        &self.0.statics
    }

    pub fn find_method(&self, name: &str) -> Option<MethodDescription> {
        self.0
            .methods
            .iter()
            .find(|m| m.name == name)
            .map(|m| MethodDescription::new(self.clone(), m.clone()))
    }
}

impl Debug for TypeDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

impl Display for TypeDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

impl PartialEq for TypeDescription {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TypeDescription {}

impl Hash for TypeDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_includes_enclosing_classes() {
        let inner = TypeBuilder::class("Game.World", "Cell")
            .nested_in(&["Grid"])
            .build();
        assert_eq!(inner.full_name(), "Game.World.Grid+Cell");

        let global = TypeBuilder::class("", "Loose").build();
        assert_eq!(global.full_name(), "Loose");
    }

    #[test]
    fn test_identity_is_pointer_equality() {
        let a = TypeBuilder::class("A", "T").build();
        let b = TypeBuilder::class("A", "T").build();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_member_access_filter() {
        assert!(MemberAccess::Public.admits(Visibility::Public));
        assert!(!MemberAccess::Public.admits(Visibility::NonPublic));
        assert!(MemberAccess::NonPublic.admits(Visibility::NonPublic));
        assert!(MemberAccess::All.admits(Visibility::NonPublic));
    }
}
