//! # hostlua-bind
//!
//! The binding generator and object bridge between a scripting runtime and
//! the host object model described by `hostlua-types`.
//!
//! ## Subsystems
//!
//! - **Identity Cache** (`translator`): One live proxy key per host instance.
//! - **Overload Resolver** (`overload`, `marshal`): Ranks candidates against call-time arguments.
//! - **Type Binding Generator** (`generator`, `binding`, `wrap`): Reflects a type into dispatch tables.
//! - **Lazy Member Resolver** (`lazy`): Placeholder slots that bind a member on first use.
//! - **Namespace Table Builder** (`namespace`): Dotted type names as a tree of tables.
//! - **Dispatch** (`dispatch`): `__index`, `__newindex`, `__call` and operator entry points.

pub mod binding;
pub mod callable;
pub mod config;
pub mod context;
mod dispatch;
pub mod error;
pub mod extension;
pub mod generator;
pub mod lazy;
mod marshal;
pub mod metrics;
pub mod namespace;
pub mod overload;
pub mod sync;
pub mod translator;
pub mod wrap;

pub use binding::{MemberSlot, Metamethod, TypeBinding};
pub use callable::{NativeFunction, ScriptCallable};
pub use config::{BindingMode, BridgeConfig};
pub use context::BridgeContext;
pub use error::{BindError, BridgeError, ScriptError};
pub use marshal::Compatibility;
pub use metrics::{BindingMetrics, BindingStats};
pub use sync::SharedContext;
pub use translator::ObjectTranslator;
