//! Built-in component tags
//!
//! IDs below 100 are reserved for the engine's own components.

use crate::define_script_component;
use paper_core::Component;

define_script_component!(
    /// Identity data every entity carries (UUID and display name).
    pub struct Data, 1, "Data"
);

define_script_component!(
    /// Position, rotation and scale.
    pub struct Transform, 2, "Transform"
);

define_script_component!(pub struct SpriteRenderer, 3, "SpriteRenderer");

define_script_component!(pub struct CircleRenderer, 4, "CircleRenderer");

define_script_component!(
    /// Marks an entity as driven by a script class.
    pub struct Script, 5, "Script"
);

/// Register every built-in component with the global registry.
pub fn register_builtin_components() {
    Data::ensure_registered();
    Transform::ensure_registered();
    SpriteRenderer::ensure_registered();
    CircleRenderer::ensure_registered();
    Script::ensure_registered();
}
