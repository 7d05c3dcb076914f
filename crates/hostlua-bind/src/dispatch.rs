//! Entry points for the scripting runtime's metatable protocol.
//!
//! Member lookups walk the target type and then its ancestors, derived to
//! root, skipping any type whose tables are not registered in this context.
//! Reads that miss everywhere yield nil; writes that miss everywhere fail.
use crate::{
    binding::{Metamethod, TypeBinding},
    callable::ScriptCallable,
    context::BridgeContext,
    error::{BindError, ScriptError},
};
use hostlua_types::{comparer::ancestors, HostValue, TypeDescription};
use hostlua_value::{
    CallFrame, CallableHandle, ProxyRef, ScriptKey, ScriptValue, TableId, TableKind,
};

fn key_name(key: &ScriptValue) -> String {
    match key {
        ScriptValue::String(s) => s.to_string(),
        ScriptValue::Integer(i) => i.to_string(),
        ScriptValue::Number(n) => n.to_string(),
        ScriptValue::Boolean(b) => b.to_string(),
        other => other.type_name().to_string(),
    }
}

impl BridgeContext {
    /// `ty` followed by its base chain, as recorded when `ty` was bound.
    fn lookup_chain(&self, ty: &TypeDescription) -> Vec<TypeDescription> {
        let rest: Vec<TypeDescription> = match self.bindings.get(ty) {
            Some(binding) => binding.ancestors.clone(),
            None => ancestors(ty).collect(),
        };
        std::iter::once(ty.clone()).chain(rest).collect()
    }

    pub fn call_handle(&mut self, handle: CallableHandle, frame: &mut CallFrame) -> Result<(), ScriptError> {
        let function = self
            .callable(handle)
            .ok_or_else(|| ScriptError::NotCallable("function".into()))?;
        function.call(self, frame)
    }

    /// Calls a script-visible callable. Class tables are callable and
    /// construct an instance; delegate proxies call each of their targets.
    pub fn call(&mut self, function: &ScriptValue, args: Vec<ScriptValue>) -> Result<Vec<ScriptValue>, ScriptError> {
        match function {
            ScriptValue::Function(handle) => {
                let mut frame = CallFrame::new(args);
                self.call_handle(*handle, &mut frame)?;
                Ok(frame.into_results())
            }
            ScriptValue::Table(id) if self.class_of_table(*id).is_some() => self.construct(function, args),
            ScriptValue::UserData(proxy) => match self.translator.resolve(proxy) {
                Some(HostValue::Delegate(delegate)) => {
                    let delegate = delegate.clone();
                    self.call_targets(&delegate, args)
                }
                Some(_) => Err(ScriptError::NotCallable(proxy.ty.to_string())),
                None => Err(ScriptError::StaleProxy(proxy.ty.to_string())),
            },
            other => Err(ScriptError::NotCallable(other.type_name().into())),
        }
    }

    fn call_first(&mut self, handle: CallableHandle, args: Vec<ScriptValue>) -> Result<ScriptValue, ScriptError> {
        let mut frame = CallFrame::new(args);
        self.call_handle(handle, &mut frame)?;
        Ok(frame.first_result())
    }

    pub fn index(&mut self, target: &ScriptValue, key: &ScriptValue) -> Result<ScriptValue, ScriptError> {
        match target {
            ScriptValue::UserData(proxy) => self.obj_index(proxy, key),
            ScriptValue::Table(id) => {
                let raw = match ScriptKey::from_value(key) {
                    Some(k) => self.heap.raw_get(*id, &k),
                    None => ScriptValue::Nil,
                };
                if !raw.is_nil() {
                    return Ok(raw);
                }
                match self.heap.kind(*id).cloned() {
                    Some(TableKind::Class(ty)) => self.cls_index(&ty, key),
                    Some(TableKind::Namespace(prefix)) => self.import(*id, &prefix, key),
                    _ => Ok(ScriptValue::Nil),
                }
            }
            other => Err(ScriptError::NotIndexable(other.type_name().into())),
        }
    }

    pub fn new_index(
        &mut self,
        target: &ScriptValue,
        key: &ScriptValue,
        value: ScriptValue,
    ) -> Result<(), ScriptError> {
        match target {
            ScriptValue::UserData(proxy) => self.obj_new_index(proxy, key, value),
            ScriptValue::Table(id) => {
                let raw_key = ScriptKey::from_value(key)
                    .ok_or_else(|| ScriptError::Runtime(format!("invalid table key {}", key.type_name())))?;
                let exists = !self.heap.raw_get(*id, &raw_key).is_nil();
                match self.heap.kind(*id).cloned() {
                    Some(TableKind::Class(ty)) if !exists => self.cls_new_index(&ty, key, value),
                    _ => {
                        self.heap.raw_set(*id, raw_key, value);
                        Ok(())
                    }
                }
            }
            other => Err(ScriptError::NotIndexable(other.type_name().into())),
        }
    }

    /// Resolves a namespace miss: a registered type under `prefix.key` is
    /// bound, a deeper namespace gets its own table, anything else is nil.
    fn import(&mut self, table: TableId, prefix: &str, key: &ScriptValue) -> Result<ScriptValue, ScriptError> {
        let Some(name) = key.as_str() else {
            return Ok(ScriptValue::Nil);
        };
        let full = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        if let Some(ty) = self.registry.get(&full) {
            return Ok(ScriptValue::Table(self.bind(&ty)?));
        }
        if self.registry.has_namespace(&full) {
            let id = self.heap.create(TableKind::Namespace(full));
            self.heap.raw_set(table, name.into(), ScriptValue::Table(id));
            return Ok(ScriptValue::Table(id));
        }
        Ok(ScriptValue::Nil)
    }

    fn proxied(&self, proxy: &ProxyRef) -> Result<HostValue, ScriptError> {
        self.translator
            .resolve(proxy)
            .cloned()
            .ok_or_else(|| ScriptError::StaleProxy(proxy.ty.to_string()))
    }

    fn obj_index(&mut self, proxy: &ProxyRef, key: &ScriptValue) -> Result<ScriptValue, ScriptError> {
        let instance = self.proxied(proxy)?;
        self.ensure_bound(&proxy.ty)?;
        let target = ScriptValue::UserData(proxy.clone());
        for ty in self.lookup_chain(&proxy.ty) {
            let Some(binding) = self.bindings.get(&ty) else {
                continue;
            };
            let item_getter = binding.item_getter;
            if let Some(name) = key.as_str() {
                if let Some(slot) = binding.methods.get(name) {
                    return Ok(ScriptValue::Function(slot.callable()));
                }
                if let Some(slot) = binding.getters.get(name).copied() {
                    return self.call_first(slot.callable(), vec![target]);
                }
            }
            if ty.element_type().is_some() {
                if let Some(found) = self.array_get(&instance, key)? {
                    return Ok(found);
                }
            }
            if let Some(getter) = item_getter {
                let mut frame = CallFrame::new(vec![target.clone(), key.clone()]);
                self.call_handle(getter, &mut frame)?;
                if let [ScriptValue::Boolean(true), value, ..] = frame.results() {
                    return Ok(value.clone());
                }
            }
        }
        Ok(ScriptValue::Nil)
    }

    fn array_get(&mut self, instance: &HostValue, key: &ScriptValue) -> Result<Option<ScriptValue>, ScriptError> {
        let Some(array) = instance.as_object() else {
            return Ok(None);
        };
        if key.as_str() == Some("Length") {
            let len = array.read().elements.len();
            return Ok(Some(ScriptValue::Integer(len as i64)));
        }
        let Some(index) = key.as_integer() else {
            return Ok(None);
        };
        let element = {
            let guard = array.read();
            usize::try_from(index).ok().and_then(|i| guard.elements.get(i).cloned())
        };
        match element {
            Some(value) => Ok(Some(self.push_any(value)?)),
            None => Err(ScriptError::Runtime(format!("index {index} out of range"))),
        }
    }

    fn array_set(&mut self, instance: &HostValue, ty: &TypeDescription, key: &ScriptValue, value: &ScriptValue) -> Result<bool, ScriptError> {
        let (Some(array), Some(element), Some(index)) = (instance.as_object(), ty.element_type(), key.as_integer()) else {
            return Ok(false);
        };
        if self.compatibility(value, element).is_none() {
            return Err(ScriptError::TypeMismatch(format!(
                "{ty}[{index}] Expected type {element}"
            )));
        }
        let converted = self.to_host(value, element)?;
        let mut guard = array.write();
        match usize::try_from(index).ok().and_then(|i| guard.elements.get_mut(i)) {
            Some(slot) => {
                *slot = converted;
                Ok(true)
            }
            None => Err(ScriptError::Runtime(format!("index {index} out of range"))),
        }
    }

    fn obj_new_index(&mut self, proxy: &ProxyRef, key: &ScriptValue, value: ScriptValue) -> Result<(), ScriptError> {
        let instance = self.proxied(proxy)?;
        self.ensure_bound(&proxy.ty)?;
        let target = ScriptValue::UserData(proxy.clone());
        for ty in self.lookup_chain(&proxy.ty) {
            let Some(binding) = self.bindings.get(&ty) else {
                continue;
            };
            let item_setter = binding.item_setter;
            if let Some(slot) = key.as_str().and_then(|name| binding.setters.get(name)).copied() {
                let mut frame = CallFrame::new(vec![target, value]);
                return self.call_handle(slot.callable(), &mut frame);
            }
            if ty.element_type().is_some() && self.array_set(&instance, &ty, key, &value)? {
                return Ok(());
            }
            if let Some(setter) = item_setter {
                let mut frame = CallFrame::new(vec![target.clone(), key.clone(), value.clone()]);
                self.call_handle(setter, &mut frame)?;
                if frame.first_result() == ScriptValue::Boolean(true) {
                    return Ok(());
                }
            }
        }
        Err(ScriptError::NoSuchField {
            type_name: proxy.ty.to_string(),
            member: key_name(key),
        })
    }

    fn cls_index(&mut self, ty: &TypeDescription, key: &ScriptValue) -> Result<ScriptValue, ScriptError> {
        let Some(name) = key.as_str() else {
            return Ok(ScriptValue::Nil);
        };
        for (depth, t) in self.lookup_chain(ty).into_iter().enumerate() {
            let Some(binding) = self.bindings.get(&t) else {
                continue;
            };
            if depth > 0 {
                let raw = self.heap.raw_get(binding.class_table, &name.into());
                if !raw.is_nil() {
                    return Ok(raw);
                }
            }
            if let Some(slot) = binding.class_methods.get(name) {
                return Ok(ScriptValue::Function(slot.callable()));
            }
            if let Some(slot) = binding.class_getters.get(name).copied() {
                return self.call_first(slot.callable(), vec![]);
            }
        }
        if let Some(nested) = self.registry.get(&format!("{}+{name}", ty.full_name())) {
            return Ok(ScriptValue::Table(self.bind(&nested)?));
        }
        Ok(ScriptValue::Nil)
    }

    fn cls_new_index(&mut self, ty: &TypeDescription, key: &ScriptValue, value: ScriptValue) -> Result<(), ScriptError> {
        if let Some(name) = key.as_str() {
            for t in self.lookup_chain(ty) {
                let slot = self
                    .bindings
                    .get(&t)
                    .and_then(|b| b.class_setters.get(name))
                    .copied();
                if let Some(slot) = slot {
                    let mut frame = CallFrame::new(vec![value]);
                    return self.call_handle(slot.callable(), &mut frame);
                }
            }
        }
        Err(ScriptError::NoSuchField {
            type_name: ty.to_string(),
            member: key_name(key),
        })
    }

    /// `target:name(args...)`. Unlike a plain read, a missing member is an error.
    pub fn invoke_member(
        &mut self,
        target: &ScriptValue,
        name: &str,
        args: Vec<ScriptValue>,
    ) -> Result<Vec<ScriptValue>, ScriptError> {
        let function = self.index(target, &ScriptValue::string(name))?;
        if function.is_nil() {
            let type_name = match target {
                ScriptValue::UserData(proxy) => proxy.ty.to_string(),
                ScriptValue::Table(id) => match self.class_of_table(*id) {
                    Some(ty) => ty.to_string(),
                    None => "table".into(),
                },
                other => other.type_name().into(),
            };
            return Err(ScriptError::MemberNotFound {
                type_name,
                member: name.to_string(),
            });
        }
        let args = match target {
            ScriptValue::UserData(_) => std::iter::once(target.clone()).chain(args).collect(),
            _ => args,
        };
        self.call(&function, args)
    }

    /// Calls the constructor slot of a class table.
    pub fn construct(&mut self, class: &ScriptValue, args: Vec<ScriptValue>) -> Result<Vec<ScriptValue>, ScriptError> {
        let ty = class
            .as_table()
            .and_then(|id| self.class_of_table(id))
            .ok_or_else(|| ScriptError::NotCallable(class.type_name().into()))?;
        let constructor = self
            .bindings
            .get(&ty)
            .ok_or_else(|| BindError::MissingBinding(ty.to_string()))?
            .constructor
            .ok_or_else(|| ScriptError::Runtime(format!("No constructor for {ty}")))?;
        let mut frame = CallFrame::new(args);
        self.call_handle(constructor, &mut frame)?;
        Ok(frame.into_results())
    }

    fn operator_of(&self, operand: &ScriptValue, op: Metamethod) -> Option<CallableHandle> {
        let proxy = operand.as_proxy()?;
        self.bindings
            .get(&proxy.ty)
            .and_then(|b: &TypeBinding| b.operators.get(&op))
            .copied()
    }

    /// Operator metamethods. The left operand's type is consulted first,
    /// then the right one's; equality falls back to identity.
    pub fn arith(&mut self, op: Metamethod, lhs: &ScriptValue, rhs: &ScriptValue) -> Result<ScriptValue, ScriptError> {
        let handle = self.operator_of(lhs, op).or_else(|| self.operator_of(rhs, op));
        match handle {
            Some(handle) => {
                let args = if op.is_unary() {
                    vec![lhs.clone()]
                } else {
                    vec![lhs.clone(), rhs.clone()]
                };
                self.call_first(handle, args)
            }
            None if op == Metamethod::Eq => Ok(ScriptValue::Boolean(lhs == rhs)),
            None => {
                let culprit = if lhs.as_proxy().is_some() { lhs } else { rhs };
                let type_name = match culprit.as_proxy() {
                    Some(proxy) => proxy.ty.to_string(),
                    None => culprit.type_name().to_string(),
                };
                Err(ScriptError::Runtime(format!(
                    "attempt to perform {} on a {type_name} value",
                    op.name()
                )))
            }
        }
    }

    /// `__tostring`: the instance's own `ToString` when it has one.
    pub fn to_string(&mut self, value: &ScriptValue) -> Result<String, ScriptError> {
        let Some(proxy) = value.as_proxy() else {
            return Ok(key_name(value));
        };
        let method = self.index(value, &ScriptValue::string("ToString"))?;
        if let ScriptValue::Function(handle) = method {
            let result = self.call_first(handle, vec![value.clone()])?;
            if let Some(s) = result.as_str() {
                return Ok(s.to_string());
            }
        }
        Ok(format!("{}: {}", proxy.ty, proxy.key))
    }

    /// `__gc`: the script side dropped its proxy.
    pub fn gc(&mut self, value: &ScriptValue) -> bool {
        match value.as_proxy() {
            Some(proxy) if self.translator.owns(proxy) => self.translator.release(proxy.key).is_some(),
            _ => false,
        }
    }
}
