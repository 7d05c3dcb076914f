use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeResolutionError {
    #[error("Type not found: {0}")]
    TypeNotFound(String),
    #[error("Type already registered: {0}")]
    DuplicateType(String),
    #[error("Unbound method generic parameter !!{0}")]
    UnboundGeneric(usize),
    #[error("Generic parameter {index} of {method} has no constraint to specialize to")]
    Specialization { method: String, index: usize },
}

/// An exception thrown by native host code.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{message}")]
pub struct HostException {
    pub message: String,
    pub stack_trace: String,
}

impl HostException {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack_trace: String::new(),
        }
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = stack_trace.into();
        self
    }
}
