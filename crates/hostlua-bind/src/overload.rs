//! Overload groups and call-time resolution.
//!
//! Candidates are filtered by arity, every argument position is ranked with
//! [`Compatibility`], and the candidate with the best worst-position rank
//! wins. Remaining ties go to the candidate with fewer non-exact positions,
//! then to declaration order.
use crate::{context::BridgeContext, error::ScriptError, marshal::Compatibility};
use hostlua_types::{
    generics::{is_supported_method, make_generic_method_with_constraints, GenericLookup},
    members::{Invocation, ParameterMode},
    HostValue, MethodDescription, Object, ObjectRef, TypeDescription,
};
use hostlua_value::{CallFrame, ProxyKey, ScriptValue};

/// How the script-side arguments line up with a candidate's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// Argument 0 is the receiver.
    Instance,
    Static,
    /// Arguments map to parameters; the instance is allocated by the call.
    Constructor,
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub method: MethodDescription,
    pub generics: GenericLookup,
    /// Extension methods take the receiver as their first parameter.
    pub is_extension: bool,
}

#[derive(Debug, Clone)]
pub struct OverloadGroup {
    pub owner: TypeDescription,
    pub name: String,
    pub shape: CallShape,
    pub candidates: Vec<Candidate>,
}

impl OverloadGroup {
    /// Builds a group, dropping generic methods that cannot be specialized.
    pub fn new(
        owner: &TypeDescription,
        name: &str,
        shape: CallShape,
        methods: impl IntoIterator<Item = MethodDescription>,
    ) -> Self {
        let candidates = methods
            .into_iter()
            .filter_map(|method| {
                if !is_supported_method(&method.method) {
                    tracing::debug!(method = ?method, "skipping unsupported generic method");
                    return None;
                }
                let generics = match make_generic_method_with_constraints(&method.method) {
                    Ok(g) => g,
                    Err(e) => {
                        tracing::debug!(method = ?method, error = %e, "generic method not supported");
                        return None;
                    }
                };
                let is_extension = method.method.is_extension && shape == CallShape::Instance;
                Some(Candidate {
                    method,
                    generics,
                    is_extension,
                })
            })
            .collect();
        Self {
            owner: owner.clone(),
            name: name.to_string(),
            shape,
            candidates,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Index of the first argument fed to parameters for `candidate`.
    fn first_input(&self, candidate: &Candidate) -> usize {
        match self.shape {
            CallShape::Instance if !candidate.is_extension => 1,
            _ => 0,
        }
    }
}

/// Rank of a matched candidate; compares worst position first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Rank {
    worst: Compatibility,
    inexact: usize,
}

impl BridgeContext {
    fn match_candidate(
        &self,
        group: &OverloadGroup,
        candidate: &Candidate,
        args: &[ScriptValue],
    ) -> Option<Rank> {
        let inputs = args.get(group.first_input(candidate)..).unwrap_or_default();
        let method = &candidate.method.method;
        let fixed = method.input_arity();
        let variadic = method.is_variadic();
        if !(inputs.len() == fixed || (variadic && inputs.len() + 1 >= fixed)) {
            return None;
        }

        let mut tiers = Vec::with_capacity(fixed);
        let mut position = 0;
        for parameter in method.parameters.iter().filter(|p| p.mode != ParameterMode::Out) {
            let ty = candidate.generics.make_concrete(&parameter.ty).ok()?;
            if parameter.is_params {
                let rest = &inputs[position.min(inputs.len())..];
                let as_array = match rest {
                    [single] => self.compatibility(single, &ty),
                    _ => None,
                };
                match as_array {
                    Some(tier) => tiers.push(tier),
                    None => {
                        let element = ty.element_type()?;
                        for value in rest {
                            self.compatibility(value, element)?;
                            tiers.push(Compatibility::Variadic);
                        }
                        if rest.is_empty() {
                            tiers.push(Compatibility::Variadic);
                        }
                    }
                }
                break;
            }
            tiers.push(self.compatibility(inputs.get(position)?, &ty)?);
            position += 1;
        }

        Some(Rank {
            worst: tiers.iter().copied().max().unwrap_or(Compatibility::Exact),
            inexact: tiers.iter().filter(|t| **t != Compatibility::Exact).count(),
        })
    }

    /// Picks the candidate for `args`, or fails with "no matching overload".
    pub fn resolve_overload<'g>(
        &self,
        group: &'g OverloadGroup,
        args: &[ScriptValue],
    ) -> Result<&'g Candidate, ScriptError> {
        let best = group
            .candidates
            .iter()
            .enumerate()
            .filter_map(|(i, c)| self.match_candidate(group, c, args).map(|rank| (rank, i, c)))
            .min_by_key(|(rank, i, _)| (*rank, *i))
            .map(|(_, _, c)| c);
        self.metrics.record_overload_resolution(best.is_some());
        best.ok_or_else(|| {
            tracing::debug!(
                type_name = %group.owner,
                member = %group.name,
                arg_count = args.len(),
                "no matching overload"
            );
            ScriptError::NoMatchingOverload {
                type_name: group.owner.to_string(),
                member: group.name.clone(),
            }
        })
    }

    fn receiver(
        &self,
        group: &OverloadGroup,
        args: &[ScriptValue],
    ) -> Result<(HostValue, Option<ProxyKey>), ScriptError> {
        let target = args.first().unwrap_or(&ScriptValue::Nil);
        let wrong_target = || {
            ScriptError::TypeMismatch(format!(
                "target for {}.{} should be {}, got {}",
                group.owner,
                group.name,
                group.owner,
                target.type_name()
            ))
        };
        let ScriptValue::UserData(proxy) = target else {
            return Err(wrong_target());
        };
        let value = self
            .translator
            .resolve(proxy)
            .cloned()
            .ok_or_else(|| ScriptError::StaleProxy(proxy.ty.to_string()))?;
        if self.compatibility(target, &group.owner).is_none() {
            return Err(wrong_target());
        }
        Ok((value, Some(proxy.key)))
    }

    /// Converts the inputs of `candidate` into host arguments in parameter order.
    fn host_arguments(
        &self,
        group: &OverloadGroup,
        candidate: &Candidate,
        args: &[ScriptValue],
    ) -> Result<Vec<HostValue>, ScriptError> {
        let inputs = args.get(group.first_input(candidate)..).unwrap_or_default();
        let mut out = Vec::with_capacity(candidate.method.method.parameters.len());
        let mut position = 0;
        for parameter in &candidate.method.method.parameters {
            let ty = candidate
                .generics
                .make_concrete(&parameter.ty)
                .map_err(|e| ScriptError::Runtime(e.to_string()))?;
            if parameter.mode == ParameterMode::Out {
                out.push(HostValue::default_for(&ty));
                continue;
            }
            if parameter.is_params {
                let rest = &inputs[position.min(inputs.len())..];
                match rest {
                    [single] if self.compatibility(single, &ty).is_some() => {
                        out.push(self.to_host(single, &ty)?)
                    }
                    _ => {
                        let element = ty.element_type().cloned().ok_or_else(|| {
                            ScriptError::TypeMismatch(format!("{ty} is not an array type"))
                        })?;
                        let values = rest
                            .iter()
                            .map(|v| self.to_host(v, &element))
                            .collect::<Result<Vec<_>, _>>()?;
                        out.push(HostValue::Object(ObjectRef::new(Object::array(&ty, values))));
                    }
                }
                position = inputs.len();
                continue;
            }
            let value = inputs.get(position).unwrap_or(&ScriptValue::Nil);
            out.push(self.to_host(value, &ty)?);
            position += 1;
        }
        Ok(out)
    }

    /// Resolves and invokes one call against `group`, pushing the return
    /// value followed by out/ref values into `frame`.
    pub(crate) fn invoke_overloads(
        &mut self,
        group: &OverloadGroup,
        frame: &mut CallFrame,
    ) -> Result<(), ScriptError> {
        let candidate = self.resolve_overload(group, frame.args())?.clone();
        let method = candidate.method.method.clone();
        let mut args = self.host_arguments(group, &candidate, frame.args())?;

        let (mut this, receiver_key) = match group.shape {
            CallShape::Instance if !candidate.is_extension => {
                let (value, key) = self.receiver(group, frame.args())?;
                (Some(value), key)
            }
            CallShape::Constructor => {
                let instance = Object::new(&group.owner);
                let value = if group.owner.is_value_type() {
                    HostValue::ValueType(Box::new(instance))
                } else {
                    HostValue::Object(ObjectRef::new(instance))
                };
                (Some(value), None)
            }
            _ => (None, None),
        };

        tracing::trace!(method = ?candidate.method, "invoking");
        let ret = (method.body)(Invocation {
            declaring_type: &candidate.method.parent,
            this: this.as_mut(),
            args: &mut args,
            generic_args: &candidate.generics.method_generics,
        })?;

        if let (Some(key), Some(value @ HostValue::ValueType(_))) = (receiver_key, &this) {
            self.translator.update(key, value.clone());
        }

        if group.shape == CallShape::Constructor {
            let instance = this.unwrap_or(HostValue::Null);
            frame.push(self.push_any(instance)?);
            return Ok(());
        }
        if method.return_type.is_some() {
            frame.push(self.push_any(ret)?);
        }
        for (parameter, value) in method.parameters.iter().zip(args) {
            if parameter.mode != ParameterMode::In {
                frame.push(self.push_any(value)?);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostlua_types::{generics::MethodType, members::MethodDefinition, TypeRegistry};
    use std::sync::Arc;

    fn describe(ty: &TypeDescription) -> Vec<MethodDescription> {
        ty.definition()
            .methods
            .iter()
            .map(|m| MethodDescription::new(ty.clone(), m.clone()))
            .collect()
    }

    #[test]
    fn test_exact_beats_assignable_and_ties_keep_declaration_order() {
        let registry = Arc::new(TypeRegistry::new());
        let core = registry.core().clone();
        let ty = registry
            .class_builder("Game", "Math")
            .method(
                MethodDefinition::new("F", |_| Ok(HostValue::string("double")))
                    .static_method()
                    .param("x", &core.double)
                    .returns(&core.string),
            )
            .method(
                MethodDefinition::new("F", |_| Ok(HostValue::string("int")))
                    .static_method()
                    .param("x", &core.int32)
                    .returns(&core.string),
            )
            .method(
                MethodDefinition::new("F", |_| Ok(HostValue::string("long")))
                    .static_method()
                    .param("x", &core.int64)
                    .returns(&core.string),
            )
            .build();
        let ctx = BridgeContext::new(registry);
        let group = OverloadGroup::new(&ty, "F", CallShape::Static, describe(&ty));

        let picked = ctx.resolve_overload(&group, &[ScriptValue::Integer(1)]).unwrap();
        assert_eq!(picked.method.method.parameters[0].ty, MethodType::Base(core.int32.clone()));

        let picked = ctx.resolve_overload(&group, &[ScriptValue::Number(1.5)]).unwrap();
        assert_eq!(picked.method.method.parameters[0].ty, MethodType::Base(core.double.clone()));
    }

    #[test]
    fn test_arity_filter_and_variadic_tail() {
        let registry = Arc::new(TypeRegistry::new());
        let core = registry.core().clone();
        let ints = registry.array_of(&core.int32);
        let ty = registry
            .class_builder("Game", "Log")
            .method(
                MethodDefinition::new("Write", |_| Ok(HostValue::Null))
                    .static_method()
                    .param("format", &core.string)
                    .with_parameter(hostlua_types::members::Parameter::new("rest", &ints).params()),
            )
            .build();
        let ctx = BridgeContext::new(registry);
        let group = OverloadGroup::new(&ty, "Write", CallShape::Static, describe(&ty));

        assert!(ctx.resolve_overload(&group, &[ScriptValue::string("x")]).is_ok());
        assert!(ctx
            .resolve_overload(
                &group,
                &[ScriptValue::string("x"), ScriptValue::Integer(1), ScriptValue::Integer(2)]
            )
            .is_ok());
        assert!(ctx.resolve_overload(&group, &[]).is_err());
        let err = ctx
            .resolve_overload(&group, &[ScriptValue::string("x"), ScriptValue::string("y")])
            .unwrap_err();
        assert_eq!(
            err,
            ScriptError::NoMatchingOverload {
                type_name: "Game.Log".into(),
                member: "Write".into()
            }
        );
    }
}
