//! # hostlua-value
//!
//! Script-side values and the low-level exchange channel the binding layer
//! pushes and reads them through.
//!
//! ## Core Types
//!
//! - **[`ScriptValue`]**: A value as the scripting runtime sees it.
//! - **[`ProxyRef`]**: Script-side handle standing in for a host instance.
//! - **[`TableHeap`](table::TableHeap)**: Tables owned by one scripting context.
//! - **[`CallFrame`](stack::CallFrame)**: Argument and result window of one native call.
//! - **[`ValueExchange`](exchange::ValueExchange)**: push/read/raise/register primitives.
use hostlua_types::TypeDescription;
use std::{fmt, sync::Arc};

pub mod exchange;
pub mod stack;
pub mod table;

pub use exchange::ValueExchange;
pub use stack::CallFrame;
pub use table::{ScriptTable, TableHeap, TableKind};

/// Handle of a native-backed callable registered with a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallableHandle(u32);

impl CallableHandle {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn raw(self) -> u64 {
        self.0 as u64
    }

    pub fn from_raw(raw: u64) -> Option<Self> {
        u32::try_from(raw).ok().map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(u32);

impl TableId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Marker identifying which identity cache minted a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheTag(pub u64);

/// Slot index plus generation; a released slot bumps its generation so
/// old keys never alias a newer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyKey {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for ProxyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRef {
    pub key: ProxyKey,
    /// Runtime type of the instance; selects its dispatch tables.
    pub ty: TypeDescription,
    pub tag: CacheTag,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ScriptValue {
    #[default]
    Nil,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(Arc<str>),
    Function(CallableHandle),
    UserData(ProxyRef),
    Table(TableId),
}

impl ScriptValue {
    pub fn string(s: impl AsRef<str>) -> Self {
        ScriptValue::String(Arc::from(s.as_ref()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Nil => "nil",
            ScriptValue::Boolean(_) => "boolean",
            ScriptValue::Integer(_) | ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Function(_) => "function",
            ScriptValue::UserData(_) => "userdata",
            ScriptValue::Table(_) => "table",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, ScriptValue::Nil)
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, ScriptValue::Nil | ScriptValue::Boolean(false))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integers, and numbers with no fractional part.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ScriptValue::Integer(i) => Some(*i),
            ScriptValue::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScriptValue::Integer(i) => Some(*i as f64),
            ScriptValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&ProxyRef> {
        match self {
            ScriptValue::UserData(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<TableId> {
        match self {
            ScriptValue::Table(t) => Some(*t),
            _ => None,
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Boolean(value)
    }
}

impl From<i64> for ScriptValue {
    fn from(value: i64) -> Self {
        ScriptValue::Integer(value)
    }
}

impl From<i32> for ScriptValue {
    fn from(value: i32) -> Self {
        ScriptValue::Integer(value as i64)
    }
}

impl From<f64> for ScriptValue {
    fn from(value: f64) -> Self {
        ScriptValue::Number(value)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::string(value)
    }
}

impl From<TableId> for ScriptValue {
    fn from(value: TableId) -> Self {
        ScriptValue::Table(value)
    }
}

/// Hashable subset of [`ScriptValue`] usable as a table key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScriptKey {
    Boolean(bool),
    Integer(i64),
    String(Arc<str>),
}

impl ScriptKey {
    pub fn from_value(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::Boolean(b) => Some(ScriptKey::Boolean(*b)),
            ScriptValue::String(s) => Some(ScriptKey::String(s.clone())),
            other => other.as_integer().map(ScriptKey::Integer),
        }
    }

    pub fn to_value(&self) -> ScriptValue {
        match self {
            ScriptKey::Boolean(b) => ScriptValue::Boolean(*b),
            ScriptKey::Integer(i) => ScriptValue::Integer(*i),
            ScriptKey::String(s) => ScriptValue::String(s.clone()),
        }
    }
}

impl From<&str> for ScriptKey {
    fn from(value: &str) -> Self {
        ScriptKey::String(Arc::from(value))
    }
}

impl From<String> for ScriptKey {
    fn from(value: String) -> Self {
        ScriptKey::String(Arc::from(value))
    }
}
