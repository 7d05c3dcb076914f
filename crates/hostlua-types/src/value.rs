use crate::{comparer::ancestors, PrimitiveKind, TypeDescription, TypeKind};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::{
    collections::HashMap,
    fmt::{Debug, Formatter},
    hash::{Hash, Hasher},
    sync::Arc,
};

#[derive(Clone, Debug, PartialEq)]
pub enum HostValue {
    Null,
    Boolean(bool),
    Char(char),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    String(Arc<str>),
    /// Reference-type instance; shared.
    Object(ObjectRef),
    /// Boxed copy of a value-type instance.
    ValueType(Box<Object>),
    Enum { ty: TypeDescription, value: i64 },
    Type(TypeDescription),
    Delegate(Delegate),
}

impl HostValue {
    pub fn string(s: impl AsRef<str>) -> Self {
        HostValue::String(Arc::from(s.as_ref()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// Zero value for a slot of type `ty`.
    pub fn default_for(ty: &TypeDescription) -> Self {
        match &ty.definition().kind {
            TypeKind::Primitive(p) => match p {
                PrimitiveKind::Boolean => HostValue::Boolean(false),
                PrimitiveKind::Char => HostValue::Char('\0'),
                PrimitiveKind::Int32 => HostValue::Int32(0),
                PrimitiveKind::Int64 => HostValue::Int64(0),
                PrimitiveKind::Single => HostValue::Single(0.0),
                PrimitiveKind::Double => HostValue::Double(0.0),
                PrimitiveKind::String => HostValue::Null,
            },
            TypeKind::Struct => HostValue::ValueType(Box::new(Object::new(ty))),
            TypeKind::Enum { .. } => HostValue::Enum {
                ty: ty.clone(),
                value: 0,
            },
            _ => HostValue::Null,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HostValue::Int32(i) => Some(*i as i64),
            HostValue::Int64(i) => Some(*i),
            HostValue::Char(c) => Some(*c as i64),
            HostValue::Enum { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HostValue::Single(f) => Some(*f as f64),
            HostValue::Double(f) => Some(*f),
            other => other.as_i64().map(|i| i as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            HostValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_delegate(&self) -> Option<&Delegate> {
        match self {
            HostValue::Delegate(d) => Some(d),
            _ => None,
        }
    }

    /// Runtime type of values that carry one; primitives need the registry.
    pub fn carried_type(&self) -> Option<TypeDescription> {
        match self {
            HostValue::Object(o) => Some(o.read().description.clone()),
            HostValue::ValueType(o) => Some(o.description.clone()),
            HostValue::Enum { ty, .. } => Some(ty.clone()),
            HostValue::Delegate(d) => Some(d.ty.clone()),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<HostValue> {
        match self {
            HostValue::Object(o) => o.read().storage.get(name).cloned(),
            HostValue::ValueType(o) => o.storage.get(name).cloned(),
            _ => None,
        }
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Boolean(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::Int32(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        HostValue::Int64(value)
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Double(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::string(value)
    }
}

impl From<ObjectRef> for HostValue {
    fn from(value: ObjectRef) -> Self {
        HostValue::Object(value)
    }
}

/// Named field slots of one instance or of one type's statics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldStorage {
    values: HashMap<String, HostValue>,
}

impl FieldStorage {
    pub fn get(&self, name: &str) -> Option<&HostValue> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: &str, value: HostValue) {
        match self.values.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.values.insert(name.to_string(), value);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, HostValue)> for FieldStorage {
    fn from_iter<T: IntoIterator<Item = (String, HostValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    pub description: TypeDescription,
    pub storage: FieldStorage,
    /// Only populated for array instances.
    pub elements: Vec<HostValue>,
}

impl Object {
    /// Instance with every declared and inherited instance field at its default.
    pub fn new(description: &TypeDescription) -> Self {
        let mut chain: Vec<TypeDescription> = ancestors(description).collect();
        chain.reverse();
        chain.push(description.clone());
        let storage = chain
            .iter()
            .flat_map(|t| crate::members::storage_for(&t.definition().fields).values)
            .collect();
        Self {
            description: description.clone(),
            storage,
            elements: vec![],
        }
    }

    pub fn array(description: &TypeDescription, elements: Vec<HostValue>) -> Self {
        Self {
            description: description.clone(),
            storage: FieldStorage::default(),
            elements,
        }
    }
}

/// Shared handle to a reference-type instance. Equality is identity.
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<Object>>);

impl ObjectRef {
    pub fn new(object: Object) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Object> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Object> {
        self.0.write()
    }

    pub fn as_ptr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn description(&self) -> TypeDescription {
        self.0.read().description.clone()
    }
}

impl Debug for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{:#x}", self.description(), self.as_ptr())
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_ptr().hash(state);
    }
}

/// Host-side view of script callables captured as a delegate.
/// Targets are opaque callable ids owned by the bridge.
#[derive(Clone, Debug, PartialEq)]
pub struct Delegate {
    pub ty: TypeDescription,
    targets: Vec<u64>,
}

impl Delegate {
    pub fn new(ty: &TypeDescription, target: u64) -> Self {
        Self {
            ty: ty.clone(),
            targets: vec![target],
        }
    }

    pub fn targets(&self) -> &[u64] {
        &self.targets
    }

    /// `a + b`; a null left side yields `b`.
    pub fn combine(current: &HostValue, added: &Delegate) -> HostValue {
        match current {
            HostValue::Delegate(d) => {
                let mut targets = d.targets.clone();
                targets.extend_from_slice(&added.targets);
                HostValue::Delegate(Delegate {
                    ty: d.ty.clone(),
                    targets,
                })
            }
            _ => HostValue::Delegate(added.clone()),
        }
    }

    /// `a - b`; removes the last occurrence of `b`'s targets, null when empty.
    pub fn remove(current: &HostValue, removed: &Delegate) -> HostValue {
        let HostValue::Delegate(d) = current else {
            return HostValue::Null;
        };
        let mut targets = d.targets.clone();
        for t in &removed.targets {
            if let Some(pos) = targets.iter().rposition(|x| x == t) {
                targets.remove(pos);
            }
        }
        if targets.is_empty() {
            HostValue::Null
        } else {
            HostValue::Delegate(Delegate {
                ty: d.ty.clone(),
                targets,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{members::FieldDefinition, registry::TypeRegistry};

    #[test]
    fn test_new_object_has_inherited_fields() {
        let registry = TypeRegistry::new();
        let core = registry.core();
        let base = registry
            .class_builder("Game", "Base")
            .field(FieldDefinition::new("hp", &core.int32))
            .build();
        let derived = registry
            .class_builder("Game", "Derived")
            .extends(&base)
            .field(FieldDefinition::new("name", &core.string))
            .build();
        let obj = Object::new(&derived);
        assert_eq!(obj.storage.get("hp"), Some(&HostValue::Int32(0)));
        assert_eq!(obj.storage.get("name"), Some(&HostValue::Null));
    }

    #[test]
    fn test_object_ref_identity() {
        let registry = TypeRegistry::new();
        let ty = registry.class_builder("Game", "Thing").build();
        let a = ObjectRef::new(Object::new(&ty));
        let b = ObjectRef::new(Object::new(&ty));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_delegate_combine_and_remove() {
        let registry = TypeRegistry::new();
        let action = registry.delegate_builder("System", "Action").build();
        let one = Delegate::new(&action, 1);
        let two = Delegate::new(&action, 2);
        let both = Delegate::combine(&Delegate::combine(&HostValue::Null, &one), &two);
        assert_eq!(both.as_delegate().map(|d| d.targets().to_vec()), Some(vec![1, 2]));
        let only_two = Delegate::remove(&both, &one);
        assert_eq!(only_two.as_delegate().map(|d| d.targets().to_vec()), Some(vec![2]));
        assert!(Delegate::remove(&only_two, &two).is_null());
    }
}
