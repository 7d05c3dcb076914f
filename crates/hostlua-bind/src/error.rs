use hostlua_types::{HostException, TypeResolutionError};
use thiserror::Error;

/// Registration-time failures. These indicate an initialization ordering
/// problem and are reported to whoever asked for the binding.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindError {
    #[error("can not find the metatable for {0}")]
    MissingBinding(String),
    #[error("can not find the class for {0}")]
    MissingClassTable(String),
    #[error("{path} is not a table, cannot place {type_name} under it")]
    NamespaceConflict { path: String, type_name: String },
    #[error("too many native callables registered in one context")]
    CallableLimit,
    #[error("Type resolution failed: {0}")]
    TypeResolution(#[from] TypeResolutionError),
}

/// Errors raised into the running script. All of them are catchable there
/// and leave the context usable.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScriptError {
    #[error("can not find {member} for {type_name}")]
    MemberNotFound { type_name: String, member: String },
    #[error("invalid arguments to {type_name}.{member}: no matching overload")]
    NoMatchingOverload { type_name: String, member: String },
    #[error("{0}")]
    TypeMismatch(String),
    #[error("cannot set {member} on {type_name}, no such field")]
    NoSuchField { type_name: String, member: String },
    #[error("host exception: {message}, stack: {stack_trace}")]
    Invocation { message: String, stack_trace: String },
    #[error("attempt to use a released {0}")]
    StaleProxy(String),
    #[error("attempt to call a {0} value")]
    NotCallable(String),
    #[error("attempt to index a {0} value")]
    NotIndexable(String),
    #[error("{0}")]
    Runtime(String),
}

impl From<HostException> for ScriptError {
    fn from(e: HostException) -> Self {
        ScriptError::Invocation {
            message: e.message,
            stack_trace: e.stack_trace,
        }
    }
}

impl From<BindError> for ScriptError {
    fn from(e: BindError) -> Self {
        ScriptError::Runtime(e.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BridgeError {
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Script(#[from] ScriptError),
}
