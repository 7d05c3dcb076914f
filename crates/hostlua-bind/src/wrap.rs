//! Generated member wrappers.
use crate::{
    callable::ScriptCallable, context::BridgeContext, error::ScriptError, overload::OverloadGroup,
};
use hostlua_types::{
    generics::MethodType,
    members::{EventDefinition, Invocation, MethodDefinition, PropertyDefinition},
    Delegate, FieldDescription, HostException, HostValue, TypeDescription,
};
use hostlua_value::{CallFrame, ProxyKey, ScriptValue};
use std::sync::Arc;

pub type HostFunctionBody =
    Arc<dyn Fn(&mut BridgeContext, &mut CallFrame) -> Result<(), ScriptError> + Send + Sync>;

impl BridgeContext {
    /// Resolves `target` to an instance of `ty`, or reports what was found instead.
    pub(crate) fn expect_instance(
        &self,
        target: &ScriptValue,
        ty: &TypeDescription,
        while_doing: &str,
    ) -> Result<(HostValue, ProxyKey), ScriptError> {
        let found = match target {
            ScriptValue::UserData(proxy) => {
                let value = self
                    .translator
                    .resolve(proxy)
                    .ok_or_else(|| ScriptError::StaleProxy(proxy.ty.to_string()))?;
                if self.compatibility(target, ty).is_some() {
                    return Ok((value.clone(), proxy.key));
                }
                proxy.ty.to_string()
            }
            ScriptValue::Nil => "null".to_string(),
            other => other.type_name().to_string(),
        };
        Err(ScriptError::TypeMismatch(format!(
            "Expected type {ty}, but got {found}, while {while_doing}"
        )))
    }

    /// Runs an accessor body against a receiver and writes a mutated
    /// value-type receiver back into its cache entry.
    pub(crate) fn run_accessor(
        &mut self,
        owner: &TypeDescription,
        method: &MethodDefinition,
        receiver: Option<(HostValue, ProxyKey)>,
        mut args: Vec<HostValue>,
    ) -> Result<HostValue, HostException> {
        let (mut this, key) = match receiver {
            Some((value, key)) => (Some(value), Some(key)),
            None => (None, None),
        };
        let ret = (method.body)(Invocation {
            declaring_type: owner,
            this: this.as_mut(),
            args: &mut args,
            generic_args: &[],
        })?;
        if let (Some(key), Some(value @ HostValue::ValueType(_))) = (key, this) {
            self.translator.update(key, value);
        }
        Ok(ret)
    }
}

/// Method group, property accessor or operator.
pub struct MethodWrap {
    pub group: OverloadGroup,
}

impl ScriptCallable for MethodWrap {
    fn call(&self, ctx: &mut BridgeContext, frame: &mut CallFrame) -> Result<(), ScriptError> {
        ctx.invoke_overloads(&self.group, frame)
    }

    fn name(&self) -> String {
        format!("{}.{}", self.group.owner, self.group.name)
    }
}

pub struct FieldGetter {
    pub field: FieldDescription,
}

impl ScriptCallable for FieldGetter {
    fn call(&self, ctx: &mut BridgeContext, frame: &mut CallFrame) -> Result<(), ScriptError> {
        let name = &self.field.field.name;
        let value = if self.field.field.is_static {
            self.field.read(None)
        } else {
            let (target, _) = ctx.expect_instance(
                frame.arg(0),
                &self.field.parent,
                &format!("get field {name}"),
            )?;
            self.field.read(Some(&target))
        }
        .ok_or_else(|| ScriptError::MemberNotFound {
            type_name: self.field.parent.to_string(),
            member: name.clone(),
        })?;
        let pushed = ctx.push_any(value)?;
        frame.push(pushed);
        Ok(())
    }

    fn name(&self) -> String {
        format!("{}.{}", self.field.parent, self.field.field.name)
    }
}

pub struct FieldSetter {
    pub field: FieldDescription,
}

impl ScriptCallable for FieldSetter {
    fn call(&self, ctx: &mut BridgeContext, frame: &mut CallFrame) -> Result<(), ScriptError> {
        let field = &self.field.field;
        let (target, value) = if field.is_static {
            (None, frame.arg(0))
        } else {
            let target = ctx.expect_instance(
                frame.arg(0),
                &self.field.parent,
                &format!("set field {}", field.name),
            )?;
            (Some(target), frame.arg(1))
        };
        if ctx.compatibility(value, &field.field_type).is_none() {
            return Err(ScriptError::TypeMismatch(format!(
                "{}.{} Expected type {}",
                self.field.parent.name(),
                field.name,
                field.field_type
            )));
        }
        let host = ctx.to_host(value, &field.field_type)?;
        match target {
            None => {
                self.field.write(None, host);
            }
            Some((mut obj, key)) => {
                self.field.write(Some(&mut obj), host);
                if matches!(obj, HostValue::ValueType(_)) {
                    ctx.translator.update(key, obj);
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> String {
        format!("{}.{}", self.field.parent, self.field.field.name)
    }
}

fn index_type(property: &PropertyDefinition) -> Option<&TypeDescription> {
    match &property.index_parameters.first()?.ty {
        MethodType::Base(ty) => Some(ty),
        MethodType::MethodGeneric(_) => None,
    }
}

fn accessor_failure(verb: &str, owner: &TypeDescription, property: &str, e: HostException) -> ScriptError {
    ScriptError::Invocation {
        message: format!("try to {verb} {owner}.{property} throw a exception:{}", e.message),
        stack_trace: e.stack_trace,
    }
}

/// Indexer access by non-string keys. Pushes `true, value` on a hit and
/// `false` when no indexer accepts the key.
pub struct ItemGetter {
    pub owner: TypeDescription,
    pub properties: Vec<Arc<PropertyDefinition>>,
}

impl ScriptCallable for ItemGetter {
    fn call(&self, ctx: &mut BridgeContext, frame: &mut CallFrame) -> Result<(), ScriptError> {
        let Some(first) = self.properties.first() else {
            frame.push(ScriptValue::Boolean(false));
            return Ok(());
        };
        let receiver =
            ctx.expect_instance(frame.arg(0), &self.owner, &format!("get prop {}", first.name))?;
        let key = frame.arg(1).clone();
        for property in &self.properties {
            let (Some(index_ty), Some(getter)) = (index_type(property), &property.getter) else {
                continue;
            };
            if ctx.compatibility(&key, index_ty).is_none() {
                continue;
            }
            let index = ctx.to_host(&key, index_ty)?;
            let value = ctx
                .run_accessor(&self.owner, getter, Some(receiver.clone()), vec![index])
                .map_err(|e| accessor_failure("get", &self.owner, &property.name, e))?;
            frame.push(ScriptValue::Boolean(true));
            let pushed = ctx.push_any(value)?;
            frame.push(pushed);
            return Ok(());
        }
        frame.push(ScriptValue::Boolean(false));
        Ok(())
    }

    fn name(&self) -> String {
        format!("{}.get_Item", self.owner)
    }
}

/// Indexer assignment by non-string keys. Pushes `true` when an indexer took
/// the write.
pub struct ItemSetter {
    pub owner: TypeDescription,
    pub properties: Vec<Arc<PropertyDefinition>>,
}

impl ScriptCallable for ItemSetter {
    fn call(&self, ctx: &mut BridgeContext, frame: &mut CallFrame) -> Result<(), ScriptError> {
        let Some(first) = self.properties.first() else {
            frame.push(ScriptValue::Boolean(false));
            return Ok(());
        };
        let receiver =
            ctx.expect_instance(frame.arg(0), &self.owner, &format!("set prop {}", first.name))?;
        let key = frame.arg(1).clone();
        let value = frame.arg(2).clone();
        for property in &self.properties {
            let (Some(index_ty), Some(setter)) = (index_type(property), &property.setter) else {
                continue;
            };
            if ctx.compatibility(&key, index_ty).is_none() {
                continue;
            }
            if value.is_nil() || ctx.compatibility(&value, &property.property_type).is_none() {
                return Err(ScriptError::TypeMismatch(format!(
                    "{}.{} Expected type {}",
                    self.owner.name(),
                    property.name,
                    property.property_type
                )));
            }
            let args = vec![
                ctx.to_host(&key, index_ty)?,
                ctx.to_host(&value, &property.property_type)?,
            ];
            ctx.run_accessor(&self.owner, setter, Some(receiver.clone()), args)
                .map_err(|e| accessor_failure("set", &self.owner, &property.name, e))?;
            frame.push(ScriptValue::Boolean(true));
            return Ok(());
        }
        frame.push(ScriptValue::Boolean(false));
        Ok(())
    }

    fn name(&self) -> String {
        format!("{}.set_Item", self.owner)
    }
}

/// `obj:Event("+", fn)` / `obj:Event("-", fn)`; static events omit `obj`.
pub struct EventWrap {
    pub owner: TypeDescription,
    pub event: Arc<EventDefinition>,
}

impl ScriptCallable for EventWrap {
    fn call(&self, ctx: &mut BridgeContext, frame: &mut CallFrame) -> Result<(), ScriptError> {
        let invalid = || {
            ScriptError::Runtime(format!(
                "invalid arguments to {}.{}",
                self.owner, self.event.name
            ))
        };
        let (receiver, first) = if self.event.is_static {
            (None, 0)
        } else {
            let receiver = ctx.expect_instance(
                frame.arg(0),
                &self.owner,
                &format!("access event {}", self.event.name),
            )?;
            (Some(receiver), 1)
        };
        let accessor = match frame.arg(first).as_str() {
            Some("+") => &self.event.add,
            Some("-") => &self.event.remove,
            _ => return Err(invalid()),
        };
        let handler = frame.arg(first + 1);
        if !matches!(handler, ScriptValue::Function(_)) {
            return Err(invalid());
        }
        let delegate = ctx.to_host(handler, &self.event.handler_type)?;
        ctx.run_accessor(&self.owner, accessor, receiver, vec![delegate])?;
        Ok(())
    }

    fn name(&self) -> String {
        format!("{}.{}", self.owner, self.event.name)
    }
}

/// Call slot of a class table.
pub struct ConstructorWrap {
    pub group: OverloadGroup,
}

impl ScriptCallable for ConstructorWrap {
    fn call(&self, ctx: &mut BridgeContext, frame: &mut CallFrame) -> Result<(), ScriptError> {
        let owner = &self.group.owner;
        let has_default = self
            .group
            .candidates
            .iter()
            .any(|c| c.method.method.input_arity() == 0);
        if frame.arg_count() == 0 && owner.is_value_type() && !has_default {
            let pushed = ctx.push_any(HostValue::default_for(owner))?;
            frame.push(pushed);
            return Ok(());
        }
        if self.group.is_empty() {
            return Err(ScriptError::Runtime(format!("No constructor for {owner}")));
        }
        ctx.invoke_overloads(&self.group, frame)
    }

    fn name(&self) -> String {
        format!("{}.ctor", self.group.owner)
    }
}

/// `Enum.__CastFrom(v)` for integers, member names and existing values.
pub struct EnumCastFrom {
    pub ty: TypeDescription,
}

impl ScriptCallable for EnumCastFrom {
    fn call(&self, ctx: &mut BridgeContext, frame: &mut CallFrame) -> Result<(), ScriptError> {
        let arg = frame.arg(0);
        let value = match arg {
            ScriptValue::String(name) => self.ty.enum_value(name),
            ScriptValue::UserData(proxy) => match ctx.translator.resolve(proxy) {
                Some(HostValue::Enum { ty, value }) if ty == &self.ty => Some(*value),
                _ => None,
            },
            other => other.as_integer(),
        }
        .ok_or_else(|| ScriptError::Runtime(format!("invalid value for enum {}", self.ty)))?;
        let pushed = ctx.push_any(HostValue::Enum {
            ty: self.ty.clone(),
            value,
        })?;
        frame.push(pushed);
        Ok(())
    }

    fn name(&self) -> String {
        format!("{}.__CastFrom", self.ty)
    }
}

/// `Handler(f)`: wraps a script function as a delegate of `ty`.
pub struct DelegateCtor {
    pub ty: TypeDescription,
}

impl ScriptCallable for DelegateCtor {
    fn call(&self, ctx: &mut BridgeContext, frame: &mut CallFrame) -> Result<(), ScriptError> {
        let ScriptValue::Function(handle) = frame.arg(0) else {
            return Err(ScriptError::Runtime(format!(
                "delegate ctor of {} expects a function",
                self.ty
            )));
        };
        let pushed = ctx.push_any(HostValue::Delegate(Delegate::new(&self.ty, handle.raw())))?;
        frame.push(pushed);
        Ok(())
    }

    fn name(&self) -> String {
        format!("{}.ctor", self.ty)
    }
}

/// A callable supplied by the embedder rather than generated from metadata.
pub struct HostFunction {
    pub name: String,
    pub body: HostFunctionBody,
}

impl ScriptCallable for HostFunction {
    fn call(&self, ctx: &mut BridgeContext, frame: &mut CallFrame) -> Result<(), ScriptError> {
        (self.body)(ctx, frame)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
