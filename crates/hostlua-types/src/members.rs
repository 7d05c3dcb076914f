use crate::{
    error::HostException,
    generics::{GenericParameter, MethodType},
    value::{FieldStorage, HostValue},
    TypeDescription, Visibility,
};
use std::{
    fmt::{Debug, Formatter},
    hash::{Hash, Hasher},
    sync::Arc,
};

/// Native implementation of a method, accessor, operator or constructor.
pub type NativeBody = Arc<dyn Fn(Invocation<'_>) -> Result<HostValue, HostException> + Send + Sync>;

/// Everything a native body sees when it is called.
pub struct Invocation<'a> {
    pub declaring_type: &'a TypeDescription,
    /// The receiver. For constructors this is the freshly allocated instance.
    pub this: Option<&'a mut HostValue>,
    /// Arguments in declaration order; out and ref slots are written back by the body.
    pub args: &'a mut [HostValue],
    pub generic_args: &'a [TypeDescription],
}

impl Invocation<'_> {
    pub fn arg(&self, index: usize) -> Result<&HostValue, HostException> {
        self.args
            .get(index)
            .ok_or_else(|| HostException::new(format!("missing argument {index}")))
    }

    pub fn this_field(&self, name: &str) -> Result<HostValue, HostException> {
        match self.this.as_deref() {
            Some(HostValue::Object(obj)) => obj.read().storage.get(name).cloned(),
            Some(HostValue::ValueType(obj)) => obj.storage.get(name).cloned(),
            _ => None,
        }
        .ok_or_else(|| {
            HostException::new(format!(
                "{} has no instance field {name}",
                self.declaring_type
            ))
        })
    }

    pub fn set_this_field(&mut self, name: &str, value: HostValue) -> Result<(), HostException> {
        match self.this.as_deref_mut() {
            Some(HostValue::Object(obj)) => {
                obj.write().storage.set(name, value);
                Ok(())
            }
            Some(HostValue::ValueType(obj)) => {
                obj.storage.set(name, value);
                Ok(())
            }
            _ => Err(HostException::new(format!(
                "{} has no receiver for field {name}",
                self.declaring_type
            ))),
        }
    }

    pub fn static_field(&self, name: &str) -> Result<HostValue, HostException> {
        self.declaring_type
            .statics()
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| {
                HostException::new(format!("{} has no static field {name}", self.declaring_type))
            })
    }

    pub fn set_static_field(&self, name: &str, value: HostValue) {
        self.declaring_type.statics().write().set(name, value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterMode {
    #[default]
    In,
    Out,
    Ref,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub ty: MethodType,
    pub mode: ParameterMode,
    /// Trailing `params T[]` parameter.
    pub is_params: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: impl Into<MethodType>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            mode: ParameterMode::In,
            is_params: false,
        }
    }

    pub fn out(mut self) -> Self {
        self.mode = ParameterMode::Out;
        self
    }

    pub fn by_ref(mut self) -> Self {
        self.mode = ParameterMode::Ref;
        self
    }

    pub fn params(mut self) -> Self {
        self.is_params = true;
        self
    }
}

pub struct MethodDefinition {
    pub name: String,
    pub is_static: bool,
    pub special_name: bool,
    pub visibility: Visibility,
    pub is_extension: bool,
    pub parameters: Vec<Parameter>,
    /// `None` for void.
    pub return_type: Option<MethodType>,
    pub generic_parameters: Vec<GenericParameter>,
    pub body: NativeBody,
}

impl MethodDefinition {
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(Invocation<'_>) -> Result<HostValue, HostException> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            is_static: false,
            special_name: false,
            visibility: Visibility::Public,
            is_extension: false,
            parameters: vec![],
            return_type: None,
            generic_parameters: vec![],
            body: Arc::new(body),
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: impl Into<MethodType>) -> Self {
        self.parameters.push(Parameter::new(name, ty));
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn returns(mut self, ty: impl Into<MethodType>) -> Self {
        self.return_type = Some(ty.into());
        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn special(mut self) -> Self {
        self.special_name = true;
        self
    }

    pub fn non_public(mut self) -> Self {
        self.visibility = Visibility::NonPublic;
        self
    }

    pub fn extension(mut self) -> Self {
        self.is_extension = true;
        self.is_static = true;
        self
    }

    pub fn generic(mut self, parameter: GenericParameter) -> Self {
        self.generic_parameters.push(parameter);
        self
    }

    pub fn is_generic(&self) -> bool {
        !self.generic_parameters.is_empty()
    }

    /// Count of parameters a caller supplies; out parameters are produced, not consumed.
    pub fn input_arity(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.mode != ParameterMode::Out)
            .count()
    }

    pub fn is_variadic(&self) -> bool {
        self.parameters.last().is_some_and(|p| p.is_params)
    }
}

impl Debug for MethodDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}({})",
            if self.is_static { "static " } else { "" },
            self.name,
            self.parameters
                .iter()
                .map(|p| format!("{:?}", p.ty))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: TypeDescription,
    pub is_static: bool,
    pub is_readonly: bool,
    /// Compile-time constant.
    pub is_literal: bool,
    pub visibility: Visibility,
    pub default_value: HostValue,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: &TypeDescription) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.clone(),
            is_static: false,
            is_readonly: false,
            is_literal: false,
            visibility: Visibility::Public,
            default_value: HostValue::default_for(field_type),
        }
    }

    pub fn static_field(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.is_readonly = true;
        self
    }

    pub fn literal(mut self, value: HostValue) -> Self {
        self.is_literal = true;
        self.is_static = true;
        self.default_value = value;
        self
    }

    pub fn initial(mut self, value: HostValue) -> Self {
        self.default_value = value;
        self
    }

    pub fn non_public(mut self) -> Self {
        self.visibility = Visibility::NonPublic;
        self
    }
}

#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    pub name: String,
    pub property_type: TypeDescription,
    pub index_parameters: Vec<Parameter>,
    pub getter: Option<Arc<MethodDefinition>>,
    pub setter: Option<Arc<MethodDefinition>>,
    pub is_static: bool,
    pub visibility: Visibility,
}

impl PropertyDefinition {
    pub fn is_indexer(&self) -> bool {
        !self.index_parameters.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct EventDefinition {
    pub name: String,
    pub handler_type: TypeDescription,
    pub add: Arc<MethodDefinition>,
    pub remove: Arc<MethodDefinition>,
    pub is_static: bool,
    pub visibility: Visibility,
}

#[derive(Clone)]
pub struct MethodDescription {
    pub parent: TypeDescription,
    pub method: Arc<MethodDefinition>,
}

impl MethodDescription {
    pub fn new(parent: TypeDescription, method: Arc<MethodDefinition>) -> Self {
        Self { parent, method }
    }

    pub fn name(&self) -> &str {
        &self.method.name
    }

    pub fn is_static(&self) -> bool {
        self.method.is_static
    }
}

impl Debug for MethodDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{:?}", self.parent, self.method)
    }
}

impl PartialEq for MethodDescription {
    fn eq(&self, other: &Self) -> bool {
        self.parent == other.parent && Arc::ptr_eq(&self.method, &other.method)
    }
}

impl Eq for MethodDescription {}

impl Hash for MethodDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parent.hash(state);
        Arc::as_ptr(&self.method).hash(state);
    }
}

#[derive(Clone)]
pub struct FieldDescription {
    pub parent: TypeDescription,
    pub field: Arc<FieldDefinition>,
}

impl FieldDescription {
    pub fn new(parent: TypeDescription, field: Arc<FieldDefinition>) -> Self {
        Self { parent, field }
    }

    pub fn read(&self, target: Option<&HostValue>) -> Option<HostValue> {
        if self.field.is_static {
            return self.parent.statics().read().get(&self.field.name).cloned();
        }
        match target? {
            HostValue::Object(obj) => obj.read().storage.get(&self.field.name).cloned(),
            HostValue::ValueType(obj) => obj.storage.get(&self.field.name).cloned(),
            _ => None,
        }
    }

    /// Returns `false` when there is no storage to write into.
    pub fn write(&self, target: Option<&mut HostValue>, value: HostValue) -> bool {
        if self.field.is_static {
            self.parent.statics().write().set(&self.field.name, value);
            return true;
        }
        match target {
            Some(HostValue::Object(obj)) => {
                obj.write().storage.set(&self.field.name, value);
                true
            }
            Some(HostValue::ValueType(obj)) => {
                obj.storage.set(&self.field.name, value);
                true
            }
            _ => false,
        }
    }
}

impl Debug for FieldDescription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}::{}: {}",
            if self.field.is_static { "static " } else { "" },
            self.parent,
            self.field.name,
            self.field.field_type
        )
    }
}

pub(crate) fn storage_for(fields: &[Arc<FieldDefinition>]) -> FieldStorage {
    fields
        .iter()
        .filter(|f| !f.is_static)
        .map(|f| (f.name.clone(), f.default_value.clone()))
        .collect()
}
