//! On-demand member binding.
//!
//! A lazily bound type fills its tables with [`LazyStub`]s. The first call
//! through a stub classifies that one member, installs the generated wrapper
//! in the same slot as [`MemberSlot::Bound`] and only then forwards the call,
//! so the install is visible before the first result is.
use crate::{
    binding::{MemberSlot, MemberTable},
    callable::ScriptCallable,
    context::BridgeContext,
    error::{BindError, ScriptError},
    generator::{generate, reflect},
};
use hostlua_types::{MemberAccess, TypeDescription};
use hostlua_value::{CallFrame, CallableHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LazyMemberKind {
    Method,
    FieldGet,
    FieldSet,
    PropertyGet,
    PropertySet,
    Event,
}

/// What a placeholder knows about the member it stands for.
#[derive(Debug, Clone)]
pub struct LazyMember {
    pub ty: TypeDescription,
    pub kind: LazyMemberKind,
    pub name: String,
    pub is_static: bool,
    pub access: MemberAccess,
}

impl LazyMember {
    pub fn table(&self) -> MemberTable {
        MemberTable::for_member(self.kind, self.is_static)
    }
}

pub struct LazyStub {
    pub member: LazyMember,
}

impl ScriptCallable for LazyStub {
    fn call(&self, ctx: &mut BridgeContext, frame: &mut CallFrame) -> Result<(), ScriptError> {
        let handle = ctx.resolve_lazy(&self.member)?;
        ctx.call_handle(handle, frame)
    }

    fn name(&self) -> String {
        format!("{}.{} (unbound)", self.member.ty, self.member.name)
    }
}

impl BridgeContext {
    /// Binds a placeholder's member for good and returns the real callable.
    /// Calling it again after the transition returns the installed handle.
    pub fn resolve_lazy(&mut self, member: &LazyMember) -> Result<CallableHandle, ScriptError> {
        let table = member.table();
        let binding = self
            .bindings
            .get(&member.ty)
            .ok_or_else(|| BindError::MissingBinding(member.ty.to_string()))?;
        if let Some(MemberSlot::Bound(handle)) = binding.slot(table, &member.name) {
            return Ok(handle);
        }

        let extensions = self.extension_map();
        let reflection = reflect(
            self.registry.core(),
            &member.ty,
            member.access,
            extensions.as_deref(),
        );
        let classified = reflection
            .find(member.kind, &member.name, member.is_static)
            .ok_or_else(|| ScriptError::MemberNotFound {
                type_name: member.ty.to_string(),
                member: member.name.clone(),
            })?;
        let handle = self.register_callable(generate(&member.ty, classified))?;

        let binding = self
            .bindings
            .get_mut(&member.ty)
            .ok_or_else(|| BindError::MissingBinding(member.ty.to_string()))?;
        binding
            .table_mut(table)
            .insert(member.name.clone(), MemberSlot::Bound(handle));
        self.metrics.record_lazy_resolution();
        tracing::debug!(
            type_name = %member.ty,
            member = %member.name,
            kind = ?member.kind,
            "lazily bound member"
        );
        Ok(handle)
    }
}
