//! Entity handle
//!
//! The only thing script code holds for an engine entity. A handle is a
//! `Copy` UUID; components, names and script instances live in the host and
//! are re-queried on every call, so a handle never goes stale locally. It can
//! only outlive the host-side entity, in which case lookups report not-found.

use crate::component::ScriptComponent;
use crate::error::ScriptError;
use crate::internal_calls::with_host;
use crate::script::{EntityScript, ScriptInstance};
use paper_core::Uuid;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Handle to a host-managed entity.
///
/// Equality, ordering and hashing use the UUID alone: two handles with the
/// same UUID are the same entity.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    uuid: Uuid,
}

impl Entity {
    /// Placeholder handle (UUID 0). Refers to no entity.
    pub const NONE: Entity = Entity { uuid: Uuid::NIL };

    /// Wrap a UUID handed out by the host. No validation happens here.
    pub(crate) const fn from_uuid(uuid: Uuid) -> Self {
        Self { uuid }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// False for the placeholder handle. A true result does not mean the
    /// host-side entity still exists.
    pub fn is_valid(&self) -> bool {
        !self.uuid.is_nil()
    }

    /// Whether the host reports component `T` attached to this entity.
    ///
    /// Stale handles and a missing host read as "not attached"; use
    /// [`try_has_component`](Self::try_has_component) to tell them apart.
    pub fn has_component<T: ScriptComponent>(&self) -> bool {
        self.try_has_component::<T>()
            .unwrap_or_else(|err| self.not_found(T::NAME, err))
    }

    pub fn try_has_component<T: ScriptComponent>(&self) -> Result<bool, ScriptError> {
        if !self.is_valid() {
            return Ok(false);
        }
        with_host(|host| host.entity_has_component(self.uuid, T::ID))?
    }

    /// A fresh `T` view bound to this entity, if the component is attached.
    pub fn get_component<T: ScriptComponent>(&self) -> Option<T> {
        self.has_component::<T>().then(|| T::attach(*self))
    }

    pub fn try_get_component<T: ScriptComponent>(&self) -> Result<Option<T>, ScriptError> {
        Ok(self.try_has_component::<T>()?.then(|| T::attach(*self)))
    }

    /// Resolve another entity by display name. Matching is up to the host.
    pub fn get_entity_by_name(&self, name: &str) -> Option<Entity> {
        Self::find_by_name(name)
    }

    pub fn try_get_entity_by_name(&self, name: &str) -> Result<Option<Entity>, ScriptError> {
        Self::try_find_by_name(name)
    }

    /// Like [`get_entity_by_name`](Self::get_entity_by_name), without a
    /// receiver.
    pub fn find_by_name(name: &str) -> Option<Entity> {
        Self::try_find_by_name(name).unwrap_or_else(|err| {
            tracing::warn!(%name, error = %err, "entity name lookup failed");
            None
        })
    }

    pub fn try_find_by_name(name: &str) -> Result<Option<Entity>, ScriptError> {
        let uuid = with_host(|host| host.entity_get_entity_by_name(name))?;
        Ok((!uuid.is_nil()).then(|| Entity::from_uuid(uuid)))
    }

    /// The script instance the host has bound to this entity.
    pub fn script_instance(&self) -> Option<ScriptInstance> {
        if !self.is_valid() {
            return None;
        }
        with_host(|host| host.entity_get_script_instance(self.uuid))
            .ok()
            .flatten()
    }

    /// Recover the concrete script bound to this entity.
    ///
    /// `None` when no script is bound or the bound script is not a `T`.
    pub fn as_script<T: EntityScript>(&self) -> Option<Rc<RefCell<T>>> {
        self.script_instance()?.downcast::<T>()
    }

    fn not_found(&self, component: &str, err: ScriptError) -> bool {
        match err {
            ScriptError::StaleHandle(_) => {
                tracing::debug!(entity = %self, %component, "component lookup on stale handle");
            }
            err => {
                tracing::warn!(entity = %self, %component, error = %err, "component lookup failed");
            }
        }
        false
    }
}

/// The base handle is itself a script with no behavior.
impl EntityScript for Entity {}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.uuid)
    }
}
