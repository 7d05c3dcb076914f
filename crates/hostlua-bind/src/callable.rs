//! Native-backed callables reachable from script.
//!
//! Every function value the bridge hands to the scripting runtime is a
//! [`NativeFunction`] registered with the context and addressed by a
//! [`CallableHandle`](hostlua_value::CallableHandle).
use crate::{
    context::BridgeContext,
    error::ScriptError,
    lazy::LazyStub,
    wrap::{
        ConstructorWrap, DelegateCtor, EnumCastFrom, EventWrap, FieldGetter, FieldSetter, HostFunction,
        ItemGetter, ItemSetter, MethodWrap,
    },
};
use enum_dispatch::enum_dispatch;
use hostlua_value::CallFrame;

#[enum_dispatch]
pub trait ScriptCallable {
    /// Reads arguments from `frame` and pushes results into it.
    fn call(&self, ctx: &mut BridgeContext, frame: &mut CallFrame) -> Result<(), ScriptError>;

    /// `Type.Member` style name used in diagnostics.
    fn name(&self) -> String;
}

#[enum_dispatch(ScriptCallable)]
pub enum NativeFunction {
    MethodWrap,
    FieldGetter,
    FieldSetter,
    ItemGetter,
    ItemSetter,
    EventWrap,
    ConstructorWrap,
    DelegateCtor,
    EnumCastFrom,
    LazyStub,
    HostFunction,
}
