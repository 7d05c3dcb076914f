use crate::{CallFrame, CallableHandle};
use hostlua_types::{HostValue, TypeDescription};

/// Primitive value exchange between host and scripting runtime.
///
/// The binding layer only ever talks to the runtime through these four
/// operations; the runtime's own stack machinery stays behind them.
pub trait ValueExchange {
    type Error;
    type Callable;

    /// Pushes a host value as the next result of `frame`.
    fn push_value(&mut self, frame: &mut CallFrame, value: HostValue) -> Result<(), Self::Error>;

    /// Reads argument `index` of `frame` converted to `expected`.
    fn read_value(
        &mut self,
        frame: &CallFrame,
        index: usize,
        expected: &TypeDescription,
    ) -> Result<HostValue, Self::Error>;

    /// Builds the error that aborts the current protected call.
    fn raise_error(&self, message: String) -> Self::Error;

    /// Installs a native-backed callable reachable from script.
    fn register_callable(&mut self, callable: Self::Callable) -> Result<CallableHandle, Self::Error>;
}
