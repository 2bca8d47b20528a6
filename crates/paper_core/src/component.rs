// component.rs - Runtime component type tags
//
// Components are identified by u32 IDs, not Rust TypeIds.
// The ID is what crosses the internal-call boundary, so Rust wrappers and
// script-defined components (which only know a name) resolve to the same tag.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

pub type ComponentId = u32;

/// Metadata describing a component type known to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentMeta {
    pub id: ComponentId,
    pub name: String,
}

#[derive(Default)]
struct Registry {
    by_id: HashMap<ComponentId, ComponentMeta>,
    by_name: HashMap<String, ComponentId>,
}

/// Global registry shared by Rust-defined and script-defined components.
static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::default()));

/// Why a component could not be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    #[error("Component name mismatch for id {id}: was '{existing}', now '{requested}'")]
    IdConflict {
        id: ComponentId,
        existing: String,
        requested: String,
    },

    #[error("Component name '{name}' already registered with id {existing}, cannot rebind to {requested}")]
    NameConflict {
        name: String,
        existing: ComponentId,
        requested: ComponentId,
    },
}

/// Register a component's metadata, reporting conflicts instead of panicking.
///
/// Re-registering an id is allowed as long as the name matches.
pub fn try_register_component(meta: ComponentMeta) -> Result<(), ComponentError> {
    let mut registry = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);

    if let Some(prev) = registry.by_id.get(&meta.id) {
        if prev.name != meta.name {
            return Err(ComponentError::IdConflict {
                id: meta.id,
                existing: prev.name.clone(),
                requested: meta.name,
            });
        }
        return Ok(());
    }
    if let Some(&prev_id) = registry.by_name.get(&meta.name) {
        return Err(ComponentError::NameConflict {
            name: meta.name,
            existing: prev_id,
            requested: meta.id,
        });
    }

    tracing::debug!(id = meta.id, name = %meta.name, "registered component");
    registry.by_name.insert(meta.name.clone(), meta.id);
    registry.by_id.insert(meta.id, meta);
    Ok(())
}

/// Register a component's metadata.
///
/// # Panics
/// Panics if the id or the name is already bound to a different component.
/// Use [`try_register_component`] for ids that come from user input.
pub fn register_component(meta: ComponentMeta) {
    if let Err(err) = try_register_component(meta) {
        panic!("{err}");
    }
}

/// Look up component metadata by ID.
pub fn meta_of(id: ComponentId) -> Option<ComponentMeta> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .by_id
        .get(&id)
        .cloned()
}

/// Resolve a registered component name to its ID.
pub fn id_of_name(name: &str) -> Option<ComponentId> {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .by_name
        .get(name)
        .copied()
}

/// Type tag for a component kind.
///
/// Implementors carry no component data; the host owns that. The constants
/// are the stable identity passed to the host instead of a reflective type.
pub trait Component: 'static + Sized + Send + Sync {
    /// Globally unique component ID.
    const ID: ComponentId;

    /// Human-readable name, also used by scripts to refer to the component.
    const NAME: &'static str;

    /// Register this component with the global registry.
    /// Should be called once during startup.
    fn ensure_registered() {
        register_component(ComponentMeta {
            id: Self::ID,
            name: Self::NAME.to_string(),
        });
    }
}

/// Helper macro to implement the Component trait.
///
/// # Example
/// ```ignore
/// struct Health;
///
/// define_component!(Health, 1, "Health");
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $id:expr, $name:expr) => {
        impl $crate::component::Component for $ty {
            const ID: $crate::component::ComponentId = $id;
            const NAME: &'static str = $name;
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sprite;
    define_component!(Sprite, 9001, "TestSprite");

    struct Collider;
    define_component!(Collider, 9002, "TestCollider");

    #[test]
    fn registered_component_resolves_both_ways() {
        Sprite::ensure_registered();

        let meta = meta_of(Sprite::ID).expect("sprite registered");
        assert_eq!(meta.name, "TestSprite");
        assert_eq!(id_of_name("TestSprite"), Some(9001));
    }

    #[test]
    fn re_registration_is_idempotent() {
        Collider::ensure_registered();
        Collider::ensure_registered();
        assert_eq!(id_of_name(Collider::NAME), Some(Collider::ID));
    }

    #[test]
    fn unknown_component_is_absent() {
        assert!(meta_of(9999).is_none());
        assert!(id_of_name("NoSuchComponent").is_none());
    }

    #[test]
    #[should_panic(expected = "Component name mismatch")]
    fn conflicting_name_for_same_id_panics() {
        register_component(ComponentMeta {
            id: 9010,
            name: "TestFirst".to_string(),
        });
        register_component(ComponentMeta {
            id: 9010,
            name: "TestSecond".to_string(),
        });
    }

    #[test]
    fn fallible_registration_reports_conflicts() {
        let first = ComponentMeta {
            id: 9030,
            name: "TestStamina".to_string(),
        };
        assert_eq!(try_register_component(first.clone()), Ok(()));
        assert_eq!(try_register_component(first), Ok(()));

        assert_eq!(
            try_register_component(ComponentMeta {
                id: 9030,
                name: "TestFatigue".to_string(),
            }),
            Err(ComponentError::IdConflict {
                id: 9030,
                existing: "TestStamina".to_string(),
                requested: "TestFatigue".to_string(),
            })
        );
        assert_eq!(
            try_register_component(ComponentMeta {
                id: 9031,
                name: "TestStamina".to_string(),
            }),
            Err(ComponentError::NameConflict {
                name: "TestStamina".to_string(),
                existing: 9030,
                requested: 9031,
            })
        );
        // A failed attempt leaves nothing behind.
        assert!(meta_of(9031).is_none());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn conflicting_id_for_same_name_panics() {
        register_component(ComponentMeta {
            id: 9020,
            name: "TestShared".to_string(),
        });
        register_component(ComponentMeta {
            id: 9021,
            name: "TestShared".to_string(),
        });
    }
}
