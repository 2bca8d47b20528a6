//! Paper Engine Core
//!
//! Contains the host-side building blocks the scripting layer talks to:
//! - Entity identifiers (`Uuid`)
//! - Component type tags and the global component registry
//! - The in-memory scene table
//! - Fixed-tick simulation time

pub mod component;
pub mod scene;
pub mod time;
pub mod uuid;

pub use component::{
    id_of_name, meta_of, register_component, try_register_component, Component, ComponentError,
    ComponentId, ComponentMeta,
};
pub use scene::{EntityRecord, Scene, SceneError};
pub use uuid::{ParseUuidError, Uuid};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
