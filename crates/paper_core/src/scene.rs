//! Scene - the host-side entity table
//!
//! Holds what the internal calls need to answer: which UUIDs are live, their
//! display names, which component tags are attached, and which script class
//! (if any) is bound. Component data is not stored here.

use crate::component::{Component, ComponentId};
use crate::uuid::Uuid;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Errors raised by scene mutations and queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("uuid 0 is reserved and cannot name an entity")]
    NilUuid,

    #[error("entity {0} already exists")]
    DuplicateUuid(Uuid),

    #[error("entity {0} does not exist")]
    UnknownEntity(Uuid),
}

/// One live entity.
#[derive(Debug, Clone)]
pub struct EntityRecord {
    uuid: Uuid,
    name: String,
    components: BTreeSet<ComponentId>,
    script_class: Option<String>,
}

impl EntityRecord {
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_component(&self, id: ComponentId) -> bool {
        self.components.contains(&id)
    }

    pub fn script_class(&self) -> Option<&str> {
        self.script_class.as_deref()
    }
}

/// Entity table for one running scene.
#[derive(Debug, Clone)]
pub struct Scene {
    name: String,
    next_uuid: u64,
    entities: HashMap<Uuid, EntityRecord>,
    // Creation order, used for name lookup and hook dispatch.
    order: Vec<Uuid>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_uuid: 1,
            entities: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create an entity with a fresh UUID.
    ///
    /// UUIDs come from a counter that only moves forward, so a destroyed
    /// entity's UUID is never handed out again.
    pub fn create_entity(&mut self, name: impl Into<String>) -> Uuid {
        let mut uuid = Uuid::from_raw(self.next_uuid);
        while self.entities.contains_key(&uuid) {
            self.next_uuid += 1;
            uuid = Uuid::from_raw(self.next_uuid);
        }
        self.next_uuid += 1;
        self.insert(uuid, name.into());
        uuid
    }

    /// Create an entity with a caller-chosen UUID (e.g. loaded from disk).
    pub fn create_entity_with_uuid(
        &mut self,
        uuid: Uuid,
        name: impl Into<String>,
    ) -> Result<Uuid, SceneError> {
        if uuid.is_nil() {
            return Err(SceneError::NilUuid);
        }
        if self.entities.contains_key(&uuid) {
            return Err(SceneError::DuplicateUuid(uuid));
        }
        self.insert(uuid, name.into());
        Ok(uuid)
    }

    fn insert(&mut self, uuid: Uuid, name: String) {
        tracing::trace!(scene = %self.name, %uuid, %name, "entity created");
        self.entities.insert(
            uuid,
            EntityRecord {
                uuid,
                name,
                components: BTreeSet::new(),
                script_class: None,
            },
        );
        self.order.push(uuid);
    }

    /// Remove an entity. Returns false if it was not live.
    pub fn destroy_entity(&mut self, uuid: Uuid) -> bool {
        if self.entities.remove(&uuid).is_none() {
            return false;
        }
        self.order.retain(|&u| u != uuid);
        tracing::trace!(scene = %self.name, %uuid, "entity destroyed");
        true
    }

    pub fn contains(&self, uuid: Uuid) -> bool {
        self.entities.contains_key(&uuid)
    }

    pub fn entity(&self, uuid: Uuid) -> Option<&EntityRecord> {
        self.entities.get(&uuid)
    }

    fn record_mut(&mut self, uuid: Uuid) -> Result<&mut EntityRecord, SceneError> {
        self.entities
            .get_mut(&uuid)
            .ok_or(SceneError::UnknownEntity(uuid))
    }

    /// First live entity, in creation order, whose name matches exactly.
    pub fn find_by_name(&self, name: &str) -> Option<Uuid> {
        self.order
            .iter()
            .copied()
            .find(|uuid| self.entities.get(uuid).is_some_and(|e| e.name == name))
    }

    /// Attach a component tag. Returns false if it was already attached.
    pub fn add_component_id(&mut self, uuid: Uuid, id: ComponentId) -> Result<bool, SceneError> {
        Ok(self.record_mut(uuid)?.components.insert(id))
    }

    pub fn add_component<T: Component>(&mut self, uuid: Uuid) -> Result<bool, SceneError> {
        self.add_component_id(uuid, T::ID)
    }

    /// Detach a component tag. Returns false if it was not attached.
    pub fn remove_component_id(
        &mut self,
        uuid: Uuid,
        id: ComponentId,
    ) -> Result<bool, SceneError> {
        Ok(self.record_mut(uuid)?.components.remove(&id))
    }

    pub fn remove_component<T: Component>(&mut self, uuid: Uuid) -> Result<bool, SceneError> {
        self.remove_component_id(uuid, T::ID)
    }

    pub fn has_component_id(&self, uuid: Uuid, id: ComponentId) -> Result<bool, SceneError> {
        self.entities
            .get(&uuid)
            .map(|e| e.has_component(id))
            .ok_or(SceneError::UnknownEntity(uuid))
    }

    /// Bind (or with `None`, unbind) the script class instantiated for this
    /// entity at runtime start.
    pub fn set_script_class(
        &mut self,
        uuid: Uuid,
        class_name: Option<String>,
    ) -> Result<(), SceneError> {
        self.record_mut(uuid)?.script_class = class_name;
        Ok(())
    }

    /// Live entities in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> + '_ {
        self.order.iter().filter_map(|uuid| self.entities.get(uuid))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("[Scene]")
    }
}
