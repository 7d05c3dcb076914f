//! Member classification and wrapper generation.
//!
//! [`reflect`] walks the declared members of one type and sorts them into the
//! buckets a [`TypeBinding`](crate::binding::TypeBinding) is made of. The walk
//! is deterministic, so a lazily bound member regenerates exactly the wrapper
//! an eager bind would have produced.
use crate::{
    binding::Metamethod,
    callable::NativeFunction,
    extension::ExtensionMap,
    lazy::LazyMemberKind,
    overload::{CallShape, OverloadGroup},
    wrap::{EventWrap, FieldGetter, FieldSetter, ItemGetter, ItemSetter, MethodWrap},
};
use hostlua_types::{
    comparer::TypeComparer,
    generics::{is_supported_method, MethodType},
    members::{EventDefinition, MethodDefinition, PropertyDefinition},
    CoreTypes, FieldDescription, HostValue, MemberAccess, MethodDescription, TypeDescription,
    Visibility,
};
use std::{collections::HashMap, sync::Arc};

#[derive(Debug, Clone)]
pub enum MemberSource {
    Field(FieldDescription),
    /// Property accessor, bound as a one-candidate method.
    Accessor(MethodDescription),
    Event(Arc<EventDefinition>),
    Methods(Vec<MethodDescription>),
}

#[derive(Debug, Clone)]
pub struct ClassifiedMember {
    /// Script-visible name.
    pub name: String,
    pub is_static: bool,
    pub kind: LazyMemberKind,
    pub source: MemberSource,
}

#[derive(Debug, Default)]
pub struct Reflection {
    /// Static readonly and literal fields, captured by value.
    pub constants: Vec<(String, HostValue)>,
    pub members: Vec<ClassifiedMember>,
    pub operators: Vec<(Metamethod, Vec<MethodDescription>)>,
    /// Indexers whose key cannot be a string.
    pub indexers: Vec<Arc<PropertyDefinition>>,
}

impl Reflection {
    pub fn find(&self, kind: LazyMemberKind, name: &str, is_static: bool) -> Option<&ClassifiedMember> {
        self.members
            .iter()
            .find(|m| m.kind == kind && m.is_static == is_static && m.name == name)
    }
}

fn is_hotfix_slot(core: &CoreTypes, field: &hostlua_types::members::FieldDefinition) -> bool {
    field.is_static
        && (field.name.starts_with("__Hotfix") || field.name.starts_with("_c__Hotfix"))
        && (field.field_type.is_delegate() || field.field_type == core.delegate)
}

fn accepts_string(core: &CoreTypes, ty: &MethodType) -> bool {
    match ty {
        MethodType::Base(ty) => TypeComparer::new(core).is_assignable(&core.string, ty),
        MethodType::MethodGeneric(_) => false,
    }
}

/// Method groups keyed by (name, staticness), kept in first-seen order.
#[derive(Default)]
struct PendingMethods {
    order: Vec<(String, bool)>,
    groups: HashMap<(String, bool), Vec<MethodDescription>>,
}

impl PendingMethods {
    fn contains(&self, key: &(String, bool)) -> bool {
        self.groups.contains_key(key)
    }

    fn push(&mut self, key: (String, bool), method: MethodDescription) {
        if !self.groups.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.groups.entry(key).or_default().push(method);
    }

    fn into_groups(mut self) -> Vec<((String, bool), Vec<MethodDescription>)> {
        self.order
            .into_iter()
            .filter_map(|key| {
                let group = self.groups.remove(&key)?;
                Some((key, group))
            })
            .collect()
    }
}

/// Classifies the declared members of `ty` admitted by `access`.
///
/// With [`MemberAccess::NonPublic`] the method walk also takes public
/// overloads of every non-public method name, so a name resolves through one
/// group. Extension methods are merged into instance groups only when public
/// members are part of the walk.
pub fn reflect(
    core: &CoreTypes,
    ty: &TypeDescription,
    access: MemberAccess,
    extensions: Option<&ExtensionMap>,
) -> Reflection {
    let def = ty.definition();
    let mut out = Reflection::default();

    for field in def.fields.iter().filter(|f| access.admits(f.visibility)) {
        if is_hotfix_slot(core, field) {
            continue;
        }
        let name = if def.events.iter().any(|e| e.name == field.name) {
            format!("&{}", field.name)
        } else {
            field.name.clone()
        };
        let description = FieldDescription::new(ty.clone(), field.clone());
        if field.is_static && (field.is_readonly || field.is_literal) {
            let value = description
                .read(None)
                .unwrap_or_else(|| field.default_value.clone());
            out.constants.push((name, value));
            continue;
        }
        for kind in [LazyMemberKind::FieldGet, LazyMemberKind::FieldSet] {
            out.members.push(ClassifiedMember {
                name: name.clone(),
                is_static: field.is_static,
                kind,
                source: MemberSource::Field(description.clone()),
            });
        }
    }

    for event in def.events.iter().filter(|e| access.admits(e.visibility)) {
        out.members.push(ClassifiedMember {
            name: event.name.clone(),
            is_static: event.is_static,
            kind: LazyMemberKind::Event,
            source: MemberSource::Event(event.clone()),
        });
    }

    if access.admits(Visibility::Public) {
        out.indexers = def
            .properties
            .iter()
            .filter(|p| p.is_indexer() && access.admits(p.visibility))
            .filter(|p| !p.index_parameters.first().is_some_and(|i| accepts_string(core, &i.ty)))
            .cloned()
            .collect();
    }

    // Names with a non-public overload are rebuilt whole when private
    // members are made accessible.
    let hidden: Vec<&str> = def
        .methods
        .iter()
        .filter(|m| m.visibility == Visibility::NonPublic)
        .map(|m| m.name.as_str())
        .collect();
    let methods: Vec<&Arc<MethodDefinition>> = if access == MemberAccess::NonPublic {
        def.methods
            .iter()
            .filter(|m| hidden.contains(&m.name.as_str()))
            .collect()
    } else {
        def.methods.iter().filter(|m| access.admits(m.visibility)).collect()
    };

    let mut pending = PendingMethods::default();

    for method in methods {
        if !is_supported_method(method) {
            tracing::trace!(type_name = %ty, method = ?method, "skipping unsupported generic method");
            continue;
        }
        let key = (method.name.clone(), method.is_static);
        let description = MethodDescription::new(ty.clone(), method.clone());
        if pending.contains(&key) {
            pending.push(key, description);
            continue;
        }
        let name = method.name.as_str();
        let arity = method.parameters.len();
        if method.special_name
            && ((name == "get_Item" && arity == 1) || (name == "set_Item" && arity == 2))
            && !accepts_string(core, &method.parameters[0].ty)
        {
            continue;
        }
        if method.special_name && (name.starts_with("add_") || name.starts_with("remove_")) {
            continue;
        }
        if method.special_name && name.starts_with("op_") {
            if Metamethod::from_operator_method(name).is_some() {
                pending.push(key, description);
            }
            continue;
        }
        let accessor = if !method.special_name {
            None
        } else if let Some(prop) = name.strip_prefix("get_").filter(|_| arity != 1) {
            Some((prop, LazyMemberKind::PropertyGet))
        } else if let Some(prop) = name.strip_prefix("set_").filter(|_| arity != 2) {
            Some((prop, LazyMemberKind::PropertySet))
        } else {
            None
        };
        if let Some((prop, kind)) = accessor {
            out.members.push(ClassifiedMember {
                name: prop.to_string(),
                is_static: method.is_static,
                kind,
                source: MemberSource::Accessor(description),
            });
            continue;
        }
        if name == ".ctor" {
            continue;
        }
        pending.push(key, description);
    }

    if let Some(extensions) = extensions {
        for method in extensions.methods_of(ty) {
            let name = method.name();
            if access.admits(Visibility::Public) || hidden.contains(&name) {
                pending.push((name.to_string(), false), method.clone());
            }
        }
    }

    for ((name, is_static), group) in pending.into_groups() {
        if let Some(op) = Metamethod::from_operator_method(&name) {
            match out.operators.iter_mut().find(|(m, _)| *m == op) {
                Some((_, existing)) => existing.extend(group),
                None => out.operators.push((op, group)),
            }
            continue;
        }
        out.members.push(ClassifiedMember {
            name,
            is_static,
            kind: LazyMemberKind::Method,
            source: MemberSource::Methods(group),
        });
    }

    out
}

/// Builds the wrapper for one classified member.
pub fn generate(ty: &TypeDescription, member: &ClassifiedMember) -> NativeFunction {
    let shape = if member.is_static {
        CallShape::Static
    } else {
        CallShape::Instance
    };
    match (&member.source, member.kind) {
        (MemberSource::Field(field), LazyMemberKind::FieldSet) => FieldSetter {
            field: field.clone(),
        }
        .into(),
        (MemberSource::Field(field), _) => FieldGetter {
            field: field.clone(),
        }
        .into(),
        (MemberSource::Accessor(method), _) => MethodWrap {
            group: OverloadGroup::new(&method.parent, &member.name, shape, [method.clone()]),
        }
        .into(),
        (MemberSource::Event(event), _) => EventWrap {
            owner: ty.clone(),
            event: event.clone(),
        }
        .into(),
        (MemberSource::Methods(methods), _) => MethodWrap {
            group: OverloadGroup::new(ty, &member.name, shape, methods.iter().cloned()),
        }
        .into(),
    }
}

pub fn generate_operator(ty: &TypeDescription, op: Metamethod, methods: &[MethodDescription]) -> NativeFunction {
    MethodWrap {
        group: OverloadGroup::new(ty, op.name(), CallShape::Static, methods.iter().cloned()),
    }
    .into()
}

pub fn generate_item_accessors(
    ty: &TypeDescription,
    indexers: &[Arc<PropertyDefinition>],
) -> Option<(NativeFunction, NativeFunction)> {
    if indexers.is_empty() {
        return None;
    }
    let getter = ItemGetter {
        owner: ty.clone(),
        properties: indexers.to_vec(),
    };
    let setter = ItemSetter {
        owner: ty.clone(),
        properties: indexers.to_vec(),
    };
    Some((getter.into(), setter.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostlua_types::{
        builder::PropertyBuilder,
        members::{FieldDefinition, MethodDefinition, Parameter},
        TypeRegistry,
    };

    fn kinds(r: &Reflection) -> Vec<(String, bool, LazyMemberKind)> {
        r.members
            .iter()
            .map(|m| (m.name.clone(), m.is_static, m.kind))
            .collect()
    }

    #[test]
    fn test_classification_buckets() {
        let registry = TypeRegistry::new();
        let core = registry.core().clone();
        let handler = registry.delegate_builder("Game", "Handler").build();
        let ty = registry
            .class_builder("Game", "Unit")
            .field(FieldDefinition::new("hp", &core.int32))
            .field(FieldDefinition::new("MaxHp", &core.int32).literal(HostValue::Int32(100)))
            .field(FieldDefinition::new("__Hotfix0_Update", &handler).static_field())
            .auto_property("Name", &core.string, false)
            .event("Died", &handler, false)
            .method(MethodDefinition::new("Hit", |_| Ok(HostValue::Null)).param("n", &core.int32))
            .method(MethodDefinition::new("Hit", |_| Ok(HostValue::Null)))
            .operator(
                MethodDefinition::new("op_Addition", |_| Ok(HostValue::Null))
                    .param("a", &core.object)
                    .param("b", &core.object),
            )
            .operator(MethodDefinition::new("op_Implicit", |_| Ok(HostValue::Null)).param("a", &core.object))
            .build();

        let r = reflect(&core, &ty, MemberAccess::Public, None);
        assert_eq!(r.constants.len(), 1);
        assert_eq!(r.constants[0], ("MaxHp".to_string(), HostValue::Int32(100)));
        assert_eq!(
            kinds(&r),
            vec![
                ("hp".to_string(), false, LazyMemberKind::FieldGet),
                ("hp".to_string(), false, LazyMemberKind::FieldSet),
                ("Died".to_string(), false, LazyMemberKind::Event),
                ("Name".to_string(), false, LazyMemberKind::PropertyGet),
                ("Name".to_string(), false, LazyMemberKind::PropertySet),
                ("Hit".to_string(), false, LazyMemberKind::Method),
            ]
        );
        match &r.find(LazyMemberKind::Method, "Hit", false).map(|m| &m.source) {
            Some(MemberSource::Methods(group)) => assert_eq!(group.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(r.operators.len(), 1);
        assert_eq!(r.operators[0].0, Metamethod::Add);
    }

    #[test]
    fn test_event_backing_field_is_prefixed_with_private_access() {
        let registry = TypeRegistry::new();
        let core = registry.core().clone();
        let handler = registry.delegate_builder("Game", "Handler").build();
        let ty = registry.class_builder("Game", "Door").event("Opened", &handler, false).build();
        let r = reflect(&core, &ty, MemberAccess::NonPublic, None);
        assert!(r.find(LazyMemberKind::FieldGet, "&Opened", false).is_some());
        assert!(r.find(LazyMemberKind::FieldGet, "Opened", false).is_none());
    }

    #[test]
    fn test_string_indexer_stays_a_method() {
        let registry = TypeRegistry::new();
        let core = registry.core().clone();
        let ty = registry
            .class_builder("Game", "Bag")
            .property(
                PropertyBuilder::indexer(&core.int32, Parameter::new("i", &core.int32))
                    .getter(|_| Ok(HostValue::Int32(0))),
            )
            .property(
                PropertyBuilder::indexer(&core.int32, Parameter::new("key", &core.string))
                    .getter(|_| Ok(HostValue::Int32(1))),
            )
            .build();
        let r = reflect(&core, &ty, MemberAccess::Public, None);
        assert_eq!(r.indexers.len(), 1);
        match r.find(LazyMemberKind::Method, "get_Item", false).map(|m| &m.source) {
            Some(MemberSource::Methods(group)) => {
                assert_eq!(group.len(), 1);
                assert_eq!(group[0].method.parameters[0].ty, MethodType::Base(core.string.clone()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_non_public_walk_joins_public_overloads() {
        let registry = TypeRegistry::new();
        let core = registry.core().clone();
        let ty = registry
            .class_builder("Game", "Vault")
            .method(MethodDefinition::new("Open", |_| Ok(HostValue::Null)))
            .method(
                MethodDefinition::new("Open", |_| Ok(HostValue::Null))
                    .param("code", &core.int32)
                    .non_public(),
            )
            .method(MethodDefinition::new("Close", |_| Ok(HostValue::Null)))
            .build();
        let r = reflect(&core, &ty, MemberAccess::NonPublic, None);
        assert!(r.find(LazyMemberKind::Method, "Close", false).is_none());
        match r.find(LazyMemberKind::Method, "Open", false).map(|m| &m.source) {
            Some(MemberSource::Methods(group)) => assert_eq!(group.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }
}
