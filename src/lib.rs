//! # hostlua
//!
//! Reflection-driven bindings between a Lua-style scripting runtime and a
//! statically typed host object model.
//!
//! Embedders describe host types with [`types::TypeBuilder`], register them
//! in a shared [`types::TypeRegistry`] and open one [`BridgeContext`] per
//! scripting context. The context answers the runtime's metatable protocol
//! (`index`, `new_index`, `call`, operators) and owns the identity cache
//! that keeps one proxy per host instance.

pub use hostlua_bind as bind;
pub use hostlua_types as types;
pub use hostlua_value as value;

pub use hostlua_bind::{
    BindError, BindingMode, BridgeConfig, BridgeContext, BridgeError, Metamethod, ScriptError,
};
pub use hostlua_types::{HostValue, TypeDescription, TypeRegistry};
pub use hostlua_value::ScriptValue;

pub mod prelude {
    pub use hostlua_bind::{
        BindError, BindingMode, BridgeConfig, BridgeContext, Metamethod, ScriptError,
    };
    pub use hostlua_types::{
        builder::PropertyBuilder,
        members::{FieldDefinition, MethodDefinition, Parameter},
        HostException, HostValue, TypeBuilder, TypeDescription, TypeRegistry,
    };
    pub use hostlua_value::{CallFrame, ScriptValue};
}
