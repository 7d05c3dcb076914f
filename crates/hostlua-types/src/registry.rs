use crate::{
    builder::TypeBuilder, error::TypeResolutionError, value::HostValue, PrimitiveKind,
    TypeDescription, TypeKind,
};
use dashmap::DashMap;

/// Handles to the built-in types every host universe starts with.
#[derive(Debug, Clone)]
pub struct CoreTypes {
    pub object: TypeDescription,
    pub value_type: TypeDescription,
    pub enum_type: TypeDescription,
    pub delegate: TypeDescription,
    pub array: TypeDescription,
    pub type_type: TypeDescription,
    pub void: TypeDescription,
    pub string: TypeDescription,
    pub boolean: TypeDescription,
    pub char: TypeDescription,
    pub int32: TypeDescription,
    pub int64: TypeDescription,
    pub single: TypeDescription,
    pub double: TypeDescription,
}

impl CoreTypes {
    fn new() -> Self {
        let object = TypeBuilder::class("System", "Object").build();
        let value_type = TypeBuilder::class("System", "ValueType")
            .extends(&object)
            .abstract_type()
            .build();
        let enum_type = TypeBuilder::class("System", "Enum")
            .extends(&value_type)
            .abstract_type()
            .build();
        let class = |name: &str| {
            TypeBuilder::class("System", name)
                .extends(&object)
                .abstract_type()
                .build()
        };
        let primitive = |name: &str, kind: PrimitiveKind| {
            let base = if kind == PrimitiveKind::String {
                &object
            } else {
                &value_type
            };
            TypeBuilder::new("System", name, TypeKind::Primitive(kind))
                .extends(base)
                .build()
        };
        Self {
            delegate: class("Delegate"),
            array: class("Array"),
            type_type: class("Type"),
            void: TypeBuilder::new("System", "Void", TypeKind::Struct)
                .extends(&value_type)
                .build(),
            string: primitive("String", PrimitiveKind::String),
            boolean: primitive("Boolean", PrimitiveKind::Boolean),
            char: primitive("Char", PrimitiveKind::Char),
            int32: primitive("Int32", PrimitiveKind::Int32),
            int64: primitive("Int64", PrimitiveKind::Int64),
            single: primitive("Single", PrimitiveKind::Single),
            double: primitive("Double", PrimitiveKind::Double),
            enum_type,
            value_type,
            object,
        }
    }

    fn all(&self) -> [&TypeDescription; 14] {
        [
            &self.object,
            &self.value_type,
            &self.enum_type,
            &self.delegate,
            &self.array,
            &self.type_type,
            &self.void,
            &self.string,
            &self.boolean,
            &self.char,
            &self.int32,
            &self.int64,
            &self.single,
            &self.double,
        ]
    }
}

/// The loaded host type universe, shareable between binding contexts.
pub struct TypeRegistry {
    types: DashMap<String, TypeDescription>,
    arrays: DashMap<TypeDescription, TypeDescription>,
    core: CoreTypes,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        let core = CoreTypes::new();
        let types = DashMap::new();
        for t in core.all() {
            types.insert(t.full_name(), t.clone());
        }
        Self {
            types,
            arrays: DashMap::new(),
            core,
        }
    }

    pub fn core(&self) -> &CoreTypes {
        &self.core
    }

    /// Registers a type and, recursively, its nested types.
    pub fn register(&self, ty: &TypeDescription) -> Result<(), TypeResolutionError> {
        let name = ty.full_name();
        if let Some(existing) = self.types.get(&name) {
            if existing.value() == ty {
                return Ok(());
            }
            return Err(TypeResolutionError::DuplicateType(name));
        }
        tracing::trace!(type_name = %name, "registering host type");
        self.types.insert(name, ty.clone());
        for nested in &ty.definition().nested_types {
            self.register(nested)?;
        }
        Ok(())
    }

    pub fn get(&self, full_name: &str) -> Option<TypeDescription> {
        self.types.get(full_name).map(|t| t.value().clone())
    }

    pub fn find(&self, full_name: &str) -> Result<TypeDescription, TypeResolutionError> {
        self.get(full_name)
            .ok_or_else(|| TypeResolutionError::TypeNotFound(full_name.to_string()))
    }

    pub fn all_types(&self) -> Vec<TypeDescription> {
        self.types.iter().map(|t| t.value().clone()).collect()
    }

    /// Whether any registered type lives in `namespace` or below it.
    pub fn has_namespace(&self, namespace: &str) -> bool {
        let prefix = format!("{namespace}.");
        self.types
            .iter()
            .any(|t| t.namespace() == namespace || t.namespace().starts_with(&prefix))
    }

    pub fn array_of(&self, element: &TypeDescription) -> TypeDescription {
        self.arrays
            .entry(element.clone())
            .or_insert_with(|| {
                TypeBuilder::new(
                    element.namespace(),
                    &format!("{}[]", element.name()),
                    TypeKind::Array {
                        element: element.clone(),
                    },
                )
                .extends(&self.core.array)
                .build()
            })
            .value()
            .clone()
    }

    /// Types declaring extension methods.
    pub fn extension_containers(&self) -> Vec<TypeDescription> {
        self.types
            .iter()
            .filter(|t| t.definition().is_extension_container)
            .map(|t| t.value().clone())
            .collect()
    }

    /// Runtime type of any host value; `None` for null.
    pub fn type_of(&self, value: &HostValue) -> Option<TypeDescription> {
        let core = &self.core;
        Some(match value {
            HostValue::Null => return None,
            HostValue::Boolean(_) => core.boolean.clone(),
            HostValue::Char(_) => core.char.clone(),
            HostValue::Int32(_) => core.int32.clone(),
            HostValue::Int64(_) => core.int64.clone(),
            HostValue::Single(_) => core.single.clone(),
            HostValue::Double(_) => core.double.clone(),
            HostValue::String(_) => core.string.clone(),
            HostValue::Type(_) => core.type_type.clone(),
            other => return other.carried_type(),
        })
    }

    pub fn class_builder(&self, namespace: &str, name: &str) -> TypeBuilder {
        TypeBuilder::class(namespace, name).extends(&self.core.object)
    }

    pub fn struct_builder(&self, namespace: &str, name: &str) -> TypeBuilder {
        TypeBuilder::new(namespace, name, TypeKind::Struct).extends(&self.core.value_type)
    }

    pub fn enum_builder(&self, namespace: &str, name: &str, members: &[(&str, i64)]) -> TypeBuilder {
        TypeBuilder::new(
            namespace,
            name,
            TypeKind::Enum {
                members: members.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
            },
        )
        .extends(&self.core.enum_type)
    }

    pub fn delegate_builder(&self, namespace: &str, name: &str) -> TypeBuilder {
        TypeBuilder::new(namespace, name, TypeKind::Delegate).extends(&self.core.delegate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_types_are_seeded() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.find("System.Object").ok(), Some(registry.core().object.clone()));
        assert_eq!(registry.find("System.Int32").ok(), Some(registry.core().int32.clone()));
        assert!(registry.has_namespace("System"));
        assert!(!registry.has_namespace("Sys"));
    }

    #[test]
    fn test_register_is_idempotent_and_rejects_duplicates() {
        let registry = TypeRegistry::new();
        let ty = registry.class_builder("Game", "Player").build();
        registry.register(&ty).unwrap();
        registry.register(&ty).unwrap();
        let impostor = registry.class_builder("Game", "Player").build();
        assert_eq!(
            registry.register(&impostor),
            Err(TypeResolutionError::DuplicateType("Game.Player".into()))
        );
    }

    #[test]
    fn test_nested_types_register_with_outer() {
        let registry = TypeRegistry::new();
        let inner = registry.class_builder("Game", "Inner").nested_in(&["Outer"]).build();
        let outer = registry.class_builder("Game", "Outer").nested(&inner).build();
        registry.register(&outer).unwrap();
        assert_eq!(registry.get("Game.Outer+Inner"), Some(inner));
    }

    #[test]
    fn test_array_types_are_cached() {
        let registry = TypeRegistry::new();
        let a = registry.array_of(&registry.core().int32);
        let b = registry.array_of(&registry.core().int32);
        assert_eq!(a, b);
        assert_eq!(a.full_name(), "System.Int32[]");
    }

    #[test]
    fn test_type_of_values() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.type_of(&HostValue::Int32(1)), Some(registry.core().int32.clone()));
        assert_eq!(registry.type_of(&HostValue::Null), None);
    }
}
