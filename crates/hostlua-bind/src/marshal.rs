//! Conversions between script values and host values, and the
//! compatibility test overload resolution ranks candidates with.
use crate::{
    context::BridgeContext,
    error::{BindError, ScriptError},
};
use hostlua_types::{
    comparer::TypeComparer, Delegate, HostValue, Object, ObjectRef, PrimitiveKind,
    TypeDescription,
};
use hostlua_value::{ProxyRef, ScriptValue, TableKind};

/// How well an argument fits a parameter; lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Compatibility {
    Exact,
    Assignable,
    Variadic,
}

impl BridgeContext {
    /// `None` when `value` cannot be passed where `ty` is expected.
    pub fn compatibility(&self, value: &ScriptValue, ty: &TypeDescription) -> Option<Compatibility> {
        use Compatibility::*;
        let core = self.registry.core();
        if ty == &core.object {
            return match value {
                ScriptValue::UserData(p) if self.is_released(p) => Some(Assignable),
                ScriptValue::UserData(p) if p.ty == core.object => self.translator.owns(p).then_some(Exact),
                ScriptValue::UserData(p) => self.translator.owns(p).then_some(Assignable),
                ScriptValue::Table(id) => self.class_of_table(*id).map(|_| Assignable),
                _ => Some(Assignable),
            };
        }
        match value {
            ScriptValue::Nil => (!ty.is_value_type()).then_some(Assignable),
            ScriptValue::Boolean(_) => (ty.primitive() == Some(PrimitiveKind::Boolean)).then_some(Exact),
            ScriptValue::Integer(i) => match ty.primitive() {
                Some(PrimitiveKind::Int64) => Some(Exact),
                Some(PrimitiveKind::Int32) => i32::try_from(*i).ok().map(|_| Exact),
                Some(PrimitiveKind::Double | PrimitiveKind::Single) => Some(Assignable),
                Some(PrimitiveKind::Char) => u32::try_from(*i)
                    .ok()
                    .and_then(char::from_u32)
                    .map(|_| Assignable),
                _ if ty.is_enum() => Some(Assignable),
                _ => None,
            },
            ScriptValue::Number(n) => match ty.primitive() {
                Some(PrimitiveKind::Double | PrimitiveKind::Single) => Some(Exact),
                Some(PrimitiveKind::Int64) => value.as_integer().map(|_| Assignable),
                Some(PrimitiveKind::Int32) => value
                    .as_integer()
                    .and_then(|i| i32::try_from(i).ok())
                    .map(|_| Assignable),
                _ if ty.is_enum() && n.fract() == 0.0 => Some(Assignable),
                _ => None,
            },
            ScriptValue::String(s) => match ty.primitive() {
                Some(PrimitiveKind::String) => Some(Exact),
                Some(PrimitiveKind::Char) => (s.chars().count() == 1).then_some(Assignable),
                _ if ty.is_enum() => ty.enum_value(s).map(|_| Assignable),
                _ => None,
            },
            ScriptValue::Function(_) => (ty.is_delegate() || ty == &core.delegate).then_some(Assignable),
            ScriptValue::UserData(p) if self.is_released(p) => (!ty.is_value_type()).then_some(Assignable),
            ScriptValue::UserData(p) => {
                if !self.translator.owns(p) {
                    return None;
                }
                if &p.ty == ty {
                    Some(Exact)
                } else if TypeComparer::new(core).is_assignable(&p.ty, ty) {
                    Some(Assignable)
                } else {
                    None
                }
            }
            ScriptValue::Table(id) => {
                (ty == &core.type_type && self.class_of_table(*id).is_some()).then_some(Exact)
            }
        }
    }

    /// A proxy of this context whose instance has already been collected.
    /// As an argument it reads as null.
    fn is_released(&self, proxy: &ProxyRef) -> bool {
        proxy.tag == self.translator.tag() && !self.translator.owns(proxy)
    }

    pub(crate) fn class_of_table(&self, id: hostlua_value::TableId) -> Option<TypeDescription> {
        match self.heap.kind(id)? {
            TableKind::Class(ty) => Some(ty.clone()),
            _ => None,
        }
    }

    /// Converts a script value for a slot of type `ty`. Callers check
    /// [`compatibility`](Self::compatibility) first; a value that still does
    /// not fit is reported as a type mismatch.
    pub fn to_host(&self, value: &ScriptValue, ty: &TypeDescription) -> Result<HostValue, ScriptError> {
        let core = self.registry.core();
        let mismatch = || {
            ScriptError::TypeMismatch(format!("{} expected, got {}", ty, value.type_name()))
        };
        Ok(match value {
            ScriptValue::Nil => HostValue::Null,
            ScriptValue::Boolean(b) => HostValue::Boolean(*b),
            ScriptValue::Integer(_) | ScriptValue::Number(_) => {
                if ty.is_enum() {
                    return value
                        .as_integer()
                        .map(|v| HostValue::Enum { ty: ty.clone(), value: v })
                        .ok_or_else(mismatch);
                }
                match (ty.primitive(), value) {
                    (Some(PrimitiveKind::Int32), v) => v
                        .as_integer()
                        .and_then(|i| i32::try_from(i).ok())
                        .map(HostValue::Int32)
                        .ok_or_else(mismatch)?,
                    (Some(PrimitiveKind::Int64), v) => {
                        v.as_integer().map(HostValue::Int64).ok_or_else(mismatch)?
                    }
                    (Some(PrimitiveKind::Single), v) => {
                        v.as_number().map(|n| HostValue::Single(n as f32)).ok_or_else(mismatch)?
                    }
                    (Some(PrimitiveKind::Double), v) => {
                        v.as_number().map(HostValue::Double).ok_or_else(mismatch)?
                    }
                    (Some(PrimitiveKind::Char), v) => v
                        .as_integer()
                        .and_then(|i| u32::try_from(i).ok())
                        .and_then(char::from_u32)
                        .map(HostValue::Char)
                        .ok_or_else(mismatch)?,
                    (_, ScriptValue::Integer(i)) if ty == &core.object => HostValue::Int64(*i),
                    (_, ScriptValue::Number(n)) if ty == &core.object => HostValue::Double(*n),
                    _ => return Err(mismatch()),
                }
            }
            ScriptValue::String(s) => match ty.primitive() {
                Some(PrimitiveKind::Char) => s.chars().next().map(HostValue::Char).ok_or_else(mismatch)?,
                _ if ty.is_enum() => ty
                    .enum_value(s)
                    .map(|v| HostValue::Enum { ty: ty.clone(), value: v })
                    .ok_or_else(mismatch)?,
                _ => HostValue::String(s.clone()),
            },
            ScriptValue::Function(handle) => {
                let delegate_type = if ty.is_delegate() { ty } else { &core.delegate };
                HostValue::Delegate(Delegate::new(delegate_type, handle.raw()))
            }
            ScriptValue::UserData(proxy) if self.is_released(proxy) => HostValue::Null,
            ScriptValue::UserData(proxy) => self
                .translator
                .resolve(proxy)
                .cloned()
                .ok_or_else(|| ScriptError::StaleProxy(proxy.ty.to_string()))?,
            ScriptValue::Table(id) => self
                .class_of_table(*id)
                .map(HostValue::Type)
                .ok_or_else(mismatch)?,
        })
    }

    /// Pushes any host value into script form, wrapping instances through the
    /// identity cache and binding their runtime type on first sight.
    pub fn push_any(&mut self, value: HostValue) -> Result<ScriptValue, BindError> {
        let ty = match &value {
            HostValue::Null => return Ok(ScriptValue::Nil),
            HostValue::Boolean(b) => return Ok(ScriptValue::Boolean(*b)),
            HostValue::Char(c) => return Ok(ScriptValue::Integer(*c as i64)),
            HostValue::Int32(i) => return Ok(ScriptValue::Integer(*i as i64)),
            HostValue::Int64(i) => return Ok(ScriptValue::Integer(*i)),
            HostValue::Single(f) => return Ok(ScriptValue::Number(*f as f64)),
            HostValue::Double(f) => return Ok(ScriptValue::Number(*f)),
            HostValue::String(s) => return Ok(ScriptValue::String(s.clone())),
            HostValue::Delegate(d) => match d.targets() {
                [single] => {
                    if let Some(handle) = hostlua_value::CallableHandle::from_raw(*single) {
                        return Ok(ScriptValue::Function(handle));
                    }
                    d.ty.clone()
                }
                _ => d.ty.clone(),
            },
            HostValue::Type(_) => self.registry.core().type_type.clone(),
            HostValue::Object(o) => o.description(),
            HostValue::ValueType(o) => o.description.clone(),
            HostValue::Enum { ty, .. } => ty.clone(),
        };
        self.ensure_bound(&ty)?;
        Ok(ScriptValue::UserData(self.translator.translate(value, &ty)))
    }

    /// Allocates a host array of `element` values.
    pub fn new_array(&self, element: &TypeDescription, values: Vec<HostValue>) -> HostValue {
        let ty = self.registry.array_of(element);
        HostValue::Object(ObjectRef::new(Object::array(&ty, values)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostlua_types::TypeRegistry;
    use std::sync::Arc;

    fn context() -> BridgeContext {
        BridgeContext::new(Arc::new(TypeRegistry::new()))
    }

    #[test]
    fn test_integer_prefers_integral_parameters() {
        let ctx = context();
        let core = ctx.registry().core().clone();
        let three = ScriptValue::Integer(3);
        assert_eq!(ctx.compatibility(&three, &core.int32), Some(Compatibility::Exact));
        assert_eq!(ctx.compatibility(&three, &core.double), Some(Compatibility::Assignable));
        assert_eq!(ctx.compatibility(&three, &core.string), None);
    }

    #[test]
    fn test_fractional_number_only_fits_floating() {
        let ctx = context();
        let core = ctx.registry().core().clone();
        let half = ScriptValue::Number(2.5);
        assert_eq!(ctx.compatibility(&half, &core.int32), None);
        assert_eq!(ctx.compatibility(&half, &core.double), Some(Compatibility::Exact));
        assert_eq!(
            ctx.compatibility(&ScriptValue::Number(2.0), &core.int32),
            Some(Compatibility::Assignable)
        );
    }

    #[test]
    fn test_nil_fits_references_only() {
        let ctx = context();
        let core = ctx.registry().core().clone();
        assert_eq!(ctx.compatibility(&ScriptValue::Nil, &core.string), Some(Compatibility::Assignable));
        assert_eq!(ctx.compatibility(&ScriptValue::Nil, &core.int32), None);
    }

    #[test]
    fn test_out_of_range_integer_rejected_for_int32() {
        let ctx = context();
        let core = ctx.registry().core().clone();
        let big = ScriptValue::Integer(i64::from(i32::MAX) + 1);
        assert_eq!(ctx.compatibility(&big, &core.int32), None);
        assert_eq!(ctx.compatibility(&big, &core.int64), Some(Compatibility::Exact));
    }

    #[test]
    fn test_primitive_push_and_read() {
        let mut ctx = context();
        let core = ctx.registry().core().clone();
        assert_eq!(ctx.push_any(HostValue::Int32(7)).unwrap(), ScriptValue::Integer(7));
        assert_eq!(
            ctx.to_host(&ScriptValue::Integer(7), &core.double).unwrap(),
            HostValue::Double(7.0)
        );
        assert_eq!(
            ctx.to_host(&ScriptValue::string("x"), &core.char).unwrap(),
            HostValue::Char('x')
        );
    }

    #[test]
    fn test_pushing_an_object_binds_its_type() {
        let mut ctx = context();
        let ty = ctx.registry().class_builder("Game", "Crate").build();
        let obj = ObjectRef::new(Object::new(&ty));
        let pushed = ctx.push_any(HostValue::Object(obj)).unwrap();
        assert!(matches!(pushed, ScriptValue::UserData(_)));
        assert!(ctx.is_bound(&ty));
    }
}
