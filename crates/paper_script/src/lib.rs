//! Paper Scripting Layer
//!
//! Game logic reaches engine entities only through an [`Entity`] handle: a
//! 64-bit UUID plus a handful of internal calls answered by the host.
//!
//! ## Architecture
//!
//! - **Handle:** [`Entity`] wraps a [`Uuid`] and nothing else. Component and
//!   name lookups are forwarded to the thread's installed [`InternalCalls`].
//! - **Scripts:** Rust scripts implement [`EntityScript`] / [`ScriptType`];
//!   JavaScript scripts run in QuickJS via [`runtime::ScriptRuntime`].
//! - **Host:** [`ScriptEngine`] owns the scene table and script instances and
//!   drives `on_create` / `on_update` / `on_destroy`. It also keeps per-entity
//!   [`ScriptField`] values and applies them to new instances.

pub mod component;
pub mod components;
pub mod engine;
pub mod entity;
pub mod error;
pub mod ffi;
pub mod field;
pub mod internal_calls;
pub mod runtime;
pub mod script;

pub use component::ScriptComponent;
pub use engine::{ScriptEngine, ScriptHost};
pub use entity::Entity;
pub use error::ScriptError;
pub use field::{ScriptField, ScriptFieldType, ScriptValue};
pub use internal_calls::{current_host, install_host, HostGuard, InternalCalls};
pub use script::{EntityScript, ScriptClass, ScriptClassRegistry, ScriptInstance, ScriptType};

pub use paper_core;
pub use paper_core::{Component, ComponentId, Uuid};
pub use rquickjs;
