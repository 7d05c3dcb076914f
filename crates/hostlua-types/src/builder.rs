//! Declarative construction of host types.
//!
//! Accessors are emitted the way a reflecting host reports them: property
//! `get_X`/`set_X` and event `add_X`/`remove_X` methods appear in the method
//! list flagged special-name, and auto events carry a same-named backing field.
use crate::{
    error::HostException,
    members::{
        EventDefinition, FieldDefinition, Invocation, MethodDefinition, NativeBody, Parameter,
        PropertyDefinition,
    },
    value::{Delegate, HostValue},
    TypeDefinition, TypeDescription, TypeKind, Visibility,
};
use std::sync::Arc;

pub struct TypeBuilder {
    def: TypeDefinition,
}

impl TypeBuilder {
    pub fn new(namespace: &str, name: &str, kind: TypeKind) -> Self {
        Self {
            def: TypeDefinition::new(namespace.to_string(), name.to_string(), kind),
        }
    }

    pub fn class(namespace: &str, name: &str) -> Self {
        Self::new(namespace, name, TypeKind::Class)
    }

    pub fn interface(namespace: &str, name: &str) -> Self {
        Self::new(namespace, name, TypeKind::Interface).abstract_type()
    }

    pub fn extends(mut self, base: &TypeDescription) -> Self {
        self.def.extends = Some(base.clone());
        self
    }

    pub fn implements(mut self, interface: &TypeDescription) -> Self {
        self.def.interfaces.push(interface.clone());
        self
    }

    pub fn nested_in(mut self, enclosing: &[&str]) -> Self {
        self.def.enclosing = enclosing.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn non_public(mut self) -> Self {
        self.def.visibility = Visibility::NonPublic;
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.def.is_abstract = true;
        self
    }

    pub fn generic_definition(mut self) -> Self {
        self.def.is_generic_definition = true;
        self
    }

    pub fn extension_container(mut self) -> Self {
        self.def.is_extension_container = true;
        self
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.def.fields.push(Arc::new(field));
        self
    }

    pub fn method(mut self, method: MethodDefinition) -> Self {
        self.def.methods.push(Arc::new(method));
        self
    }

    /// Constructor bodies receive the fresh instance as `this`.
    pub fn constructor(mut self, mut ctor: MethodDefinition) -> Self {
        ctor.name = ".ctor".to_string();
        ctor.special_name = true;
        ctor.is_static = false;
        self.def.constructors.push(Arc::new(ctor));
        self
    }

    /// Static operator method such as `op_Addition`.
    pub fn operator(self, op: MethodDefinition) -> Self {
        self.method(op.static_method().special())
    }

    pub fn property(mut self, property: PropertyBuilder) -> Self {
        let PropertyBuilder {
            name,
            ty,
            is_static,
            visibility,
            index_parameters,
            getter,
            setter,
        } = property;

        let accessor = |prefix: &str, body: NativeBody| MethodDefinition {
            name: format!("{prefix}{name}"),
            is_static,
            special_name: true,
            visibility,
            is_extension: false,
            parameters: index_parameters.clone(),
            return_type: None,
            generic_parameters: vec![],
            body,
        };
        let getter = getter.map(|body| {
            let mut m = accessor("get_", body);
            m.return_type = Some(ty.clone().into());
            Arc::new(m)
        });
        let setter = setter.map(|body| {
            let mut m = accessor("set_", body);
            m.parameters.push(Parameter::new("value", &ty));
            Arc::new(m)
        });
        self.def.methods.extend(getter.iter().cloned());
        self.def.methods.extend(setter.iter().cloned());
        self.def.properties.push(Arc::new(PropertyDefinition {
            name,
            property_type: ty,
            index_parameters,
            getter,
            setter,
            is_static,
            visibility,
        }));
        self
    }

    /// Property backed by a hidden `<Name>k__BackingField`.
    pub fn auto_property(self, name: &str, ty: &TypeDescription, is_static: bool) -> Self {
        let backing = format!("<{name}>k__BackingField");
        let mut field = FieldDefinition::new(backing.clone(), ty).non_public();
        if is_static {
            field = field.static_field();
        }
        let get_name = backing.clone();
        let set_name = backing;
        let mut property = PropertyBuilder::new(name, ty)
            .getter(move |inv| {
                if is_static {
                    inv.static_field(&get_name)
                } else {
                    inv.this_field(&get_name)
                }
            })
            .setter(move |mut inv| {
                let value = inv.arg(0)?.clone();
                if is_static {
                    inv.set_static_field(&set_name, value);
                } else {
                    inv.set_this_field(&set_name, value)?;
                }
                Ok(HostValue::Null)
            });
        if is_static {
            property = property.static_property();
        }
        self.field(field).property(property)
    }

    /// Field-like event with a same-named backing field.
    pub fn event(mut self, name: &str, handler_type: &TypeDescription, is_static: bool) -> Self {
        let mut backing = FieldDefinition::new(name, handler_type).non_public();
        if is_static {
            backing = backing.static_field();
        }
        let accessor = move |prefix: &str, combine: fn(&HostValue, &Delegate) -> HostValue| {
            let field = name.to_string();
            let mut m = MethodDefinition::new(format!("{prefix}{name}"), move |mut inv| {
                let handler = match inv.arg(0)? {
                    HostValue::Delegate(d) => d.clone(),
                    HostValue::Null => return Ok(HostValue::Null),
                    other => {
                        return Err(HostException::new(format!(
                            "event handler must be a delegate, got {other:?}"
                        )))
                    }
                };
                if is_static {
                    let current = inv.static_field(&field)?;
                    inv.set_static_field(&field, combine(&current, &handler));
                } else {
                    let current = inv.this_field(&field)?;
                    inv.set_this_field(&field, combine(&current, &handler))?;
                }
                Ok(HostValue::Null)
            })
            .param("value", handler_type)
            .special();
            m.is_static = is_static;
            Arc::new(m)
        };
        let add = accessor("add_", Delegate::combine);
        let remove = accessor("remove_", Delegate::remove);
        self.def.methods.push(add.clone());
        self.def.methods.push(remove.clone());
        self.def.events.push(Arc::new(EventDefinition {
            name: name.to_string(),
            handler_type: handler_type.clone(),
            add,
            remove,
            is_static,
            visibility: Visibility::Public,
        }));
        self.field(backing)
    }

    pub fn nested(mut self, nested: &TypeDescription) -> Self {
        self.def.nested_types.push(nested.clone());
        self
    }

    pub fn build(self) -> TypeDescription {
        TypeDescription::new(self.def)
    }
}

pub struct PropertyBuilder {
    name: String,
    ty: TypeDescription,
    is_static: bool,
    visibility: Visibility,
    index_parameters: Vec<Parameter>,
    getter: Option<NativeBody>,
    setter: Option<NativeBody>,
}

impl PropertyBuilder {
    pub fn new(name: &str, ty: &TypeDescription) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.clone(),
            is_static: false,
            visibility: Visibility::Public,
            index_parameters: vec![],
            getter: None,
            setter: None,
        }
    }

    /// Indexer property; by convention named `Item`.
    pub fn indexer(ty: &TypeDescription, index: Parameter) -> Self {
        let mut p = Self::new("Item", ty);
        p.index_parameters.push(index);
        p
    }

    pub fn static_property(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn non_public(mut self) -> Self {
        self.visibility = Visibility::NonPublic;
        self
    }

    pub fn getter(
        mut self,
        body: impl Fn(Invocation<'_>) -> Result<HostValue, HostException> + Send + Sync + 'static,
    ) -> Self {
        self.getter = Some(Arc::new(body));
        self
    }

    /// The assigned value arrives as the last argument.
    pub fn setter(
        mut self,
        body: impl Fn(Invocation<'_>) -> Result<HostValue, HostException> + Send + Sync + 'static,
    ) -> Self {
        self.setter = Some(Arc::new(body));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;

    #[test]
    fn test_property_emits_special_accessors() {
        let registry = TypeRegistry::new();
        let int32 = registry.core().int32.clone();
        let ty = registry
            .class_builder("Game", "Player")
            .auto_property("Level", &int32, false)
            .build();
        let names: Vec<_> = ty
            .definition()
            .methods
            .iter()
            .filter(|m| m.special_name)
            .map(|m| m.name.clone())
            .collect();
        assert_eq!(names, vec!["get_Level", "set_Level"]);
        assert!(ty
            .definition()
            .fields
            .iter()
            .any(|f| f.name == "<Level>k__BackingField"));
    }

    #[test]
    fn test_event_emits_backing_field_and_accessors() {
        let registry = TypeRegistry::new();
        let action = registry.delegate_builder("System", "Action").build();
        let ty = registry
            .class_builder("Game", "Button")
            .event("Clicked", &action, false)
            .build();
        let def = ty.definition();
        assert_eq!(def.events.len(), 1);
        assert!(def.fields.iter().any(|f| f.name == "Clicked"));
        assert!(def.methods.iter().any(|m| m.name == "add_Clicked" && m.special_name));
        assert!(def.methods.iter().any(|m| m.name == "remove_Clicked" && m.special_name));
    }

    #[test]
    fn test_indexer_accessors_take_index_parameters() {
        let registry = TypeRegistry::new();
        let core = registry.core();
        let ty = registry
            .class_builder("Game", "Grid")
            .property(
                PropertyBuilder::indexer(&core.double, Parameter::new("i", &core.int32))
                    .getter(|_| Ok(HostValue::Double(0.0)))
                    .setter(|_| Ok(HostValue::Null)),
            )
            .build();
        let def = ty.definition();
        assert!(def.properties[0].is_indexer());
        let set = def.methods.iter().find(|m| m.name == "set_Item").unwrap();
        assert_eq!(set.parameters.len(), 2);
    }
}
