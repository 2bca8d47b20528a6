// component.rs - Script-side component wrappers
//
// A wrapper is a transient view: it carries only the entity it was looked up
// on. It is built fresh by every successful `Entity::get_component` call.

use crate::entity::Entity;
use paper_core::Component;

/// A component type that scripts can look up on an [`Entity`].
pub trait ScriptComponent: Component {
    /// Build a view bound to `entity`. Only called after the host confirmed
    /// the component is attached.
    fn attach(entity: Entity) -> Self;

    /// The entity this view was obtained from.
    fn entity(&self) -> Entity;
}

/// Declare a script component wrapper struct.
///
/// Expands to a `Copy` struct holding the owning entity, plus
/// `Component` and `ScriptComponent` impls.
///
/// # Example
/// ```ignore
/// define_script_component!(
///     /// Hit points.
///     pub struct Health, 100, "Health"
/// );
/// ```
#[macro_export]
macro_rules! define_script_component {
    ($(#[$meta:meta])* $vis:vis struct $ty:ident, $id:expr, $name:expr) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        $vis struct $ty {
            entity: $crate::Entity,
        }

        impl $crate::paper_core::Component for $ty {
            const ID: $crate::paper_core::ComponentId = $id;
            const NAME: &'static str = $name;
        }

        impl $crate::ScriptComponent for $ty {
            fn attach(entity: $crate::Entity) -> Self {
                Self { entity }
            }

            fn entity(&self) -> $crate::Entity {
                self.entity
            }
        }
    };
}
