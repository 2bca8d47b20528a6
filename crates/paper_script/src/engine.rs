//! Script engine - the host side of the scripting layer
//!
//! [`ScriptHost`] answers the internal calls from its scene table and the
//! live instance map. [`ScriptEngine`] owns the host and drives the
//! lifecycle hooks. The host also keeps per-entity field values, applied to
//! each instance right after it is created.
//!
//! Hooks always run with no borrow of the host held, so a script may call
//! back into `Entity` lookups (or even mutate the scene) from inside a hook.

use crate::entity::Entity;
use crate::error::ScriptError;
use crate::field::ScriptValue;
use crate::internal_calls::{install_host, HostGuard, InternalCalls};
use crate::script::{ScriptClass, ScriptClassRegistry, ScriptInstance, ScriptType};
use paper_core::{ComponentId, Scene, SceneError, Uuid};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

#[derive(Default)]
struct Instances {
    by_uuid: HashMap<Uuid, ScriptInstance>,
    // Instantiation order; hooks run in this order.
    order: Vec<Uuid>,
}

impl Instances {
    fn insert(&mut self, uuid: Uuid, instance: ScriptInstance) {
        if self.by_uuid.insert(uuid, instance).is_none() {
            self.order.push(uuid);
        }
    }

    fn remove(&mut self, uuid: Uuid) -> Option<ScriptInstance> {
        let instance = self.by_uuid.remove(&uuid)?;
        self.order.retain(|&u| u != uuid);
        Some(instance)
    }

    fn snapshot(&self) -> Vec<ScriptInstance> {
        self.order
            .iter()
            .filter_map(|uuid| self.by_uuid.get(uuid).cloned())
            .collect()
    }
}

type FieldValues = BTreeMap<String, ScriptValue>;

/// Scene table, class registry and script instances behind the internal calls.
pub struct ScriptHost {
    scene: RefCell<Scene>,
    classes: RefCell<ScriptClassRegistry>,
    instances: RefCell<Instances>,
    fields: RefCell<HashMap<Uuid, FieldValues>>,
}

impl ScriptHost {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene: RefCell::new(scene),
            classes: RefCell::new(ScriptClassRegistry::new()),
            instances: RefCell::new(Instances::default()),
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn scene(&self) -> Ref<'_, Scene> {
        self.scene.borrow()
    }

    pub fn scene_mut(&self) -> RefMut<'_, Scene> {
        self.scene.borrow_mut()
    }

    pub fn classes(&self) -> Ref<'_, ScriptClassRegistry> {
        self.classes.borrow()
    }

    pub fn instance(&self, uuid: Uuid) -> Option<ScriptInstance> {
        self.instances.borrow().by_uuid.get(&uuid).cloned()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.borrow().order.len()
    }

    /// Stored field values for `uuid`, by field name.
    pub fn field_values(&self, uuid: Uuid) -> BTreeMap<String, ScriptValue> {
        self.fields.borrow().get(&uuid).cloned().unwrap_or_default()
    }
}

impl InternalCalls for ScriptHost {
    fn entity_has_component(
        &self,
        uuid: Uuid,
        component: ComponentId,
    ) -> Result<bool, ScriptError> {
        self.scene
            .borrow()
            .has_component_id(uuid, component)
            .map_err(|err| match err {
                SceneError::UnknownEntity(uuid) => ScriptError::StaleHandle(uuid),
                err => err.into(),
            })
    }

    fn entity_get_entity_by_name(&self, name: &str) -> Uuid {
        self.scene.borrow().find_by_name(name).unwrap_or(Uuid::NIL)
    }

    fn entity_get_script_instance(&self, uuid: Uuid) -> Option<ScriptInstance> {
        if !self.scene.borrow().contains(uuid) {
            return None;
        }
        self.instance(uuid)
    }
}

/// Drives script instances for one scene.
pub struct ScriptEngine {
    host: Rc<ScriptHost>,
    // Present while the runtime is running.
    guard: Option<HostGuard>,
}

impl ScriptEngine {
    pub fn new(scene: Scene) -> Self {
        Self {
            host: Rc::new(ScriptHost::new(scene)),
            guard: None,
        }
    }

    pub fn host(&self) -> &Rc<ScriptHost> {
        &self.host
    }

    pub fn scene(&self) -> Ref<'_, Scene> {
        self.host.scene()
    }

    pub fn scene_mut(&self) -> RefMut<'_, Scene> {
        self.host.scene_mut()
    }

    pub fn register_class(&self, class: ScriptClass) -> Result<(), ScriptError> {
        self.host.classes.borrow_mut().register(class)
    }

    pub fn register_type<T: ScriptType>(&self) -> Result<(), ScriptError> {
        self.register_class(ScriptClass::of::<T>())
    }

    pub fn entity_class_exists(&self, class_name: &str) -> bool {
        self.host.classes().contains(class_name)
    }

    pub fn entity_class(&self, class_name: &str) -> Option<ScriptClass> {
        self.host.classes().get(class_name).cloned()
    }

    /// Handle for a live scene entity.
    pub fn entity(&self, uuid: Uuid) -> Option<Entity> {
        self.scene()
            .contains(uuid)
            .then(|| Entity::from_uuid(uuid))
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_some()
    }

    /// Install the host on this thread, instantiate every scripted entity and
    /// call `on_create` on each, in scene creation order.
    ///
    /// Nothing is instantiated if any bound class is unknown.
    pub fn on_runtime_start(&mut self) -> Result<(), ScriptError> {
        if self.is_running() {
            return Err(ScriptError::AlreadyRunning);
        }

        let bound: Vec<(Uuid, String)> = self
            .scene()
            .iter()
            .filter_map(|e| e.script_class().map(|class| (e.uuid(), class.to_string())))
            .collect();

        let classes: Vec<(Uuid, ScriptClass)> = bound
            .into_iter()
            .map(|(uuid, name)| {
                self.entity_class(&name)
                    .map(|class| (uuid, class))
                    .ok_or(ScriptError::UnknownClass(name))
            })
            .collect::<Result<_, _>>()?;

        self.guard = Some(install_host(self.host.clone()));

        let mut created = Vec::with_capacity(classes.len());
        for (uuid, class) in classes {
            match class.instantiate(Entity::from_uuid(uuid)) {
                Ok(instance) => {
                    self.apply_fields(&instance);
                    self.host.instances.borrow_mut().insert(uuid, instance.clone());
                    created.push(instance);
                }
                Err(err) => {
                    self.host.instances.replace(Instances::default());
                    self.guard = None;
                    return Err(err);
                }
            }
        }

        tracing::info!(
            scene = %self.scene().name(),
            instances = created.len(),
            "script runtime started"
        );

        for instance in created {
            instance.invoke_on_create();
        }
        Ok(())
    }

    /// Call `on_destroy` on every instance, drop them all and uninstall the
    /// host. Does nothing if the runtime is not running.
    pub fn on_runtime_stop(&mut self) {
        if !self.is_running() {
            return;
        }

        let instances = self.host.instances.borrow().snapshot();
        for instance in &instances {
            instance.invoke_on_destroy();
        }
        self.host.instances.replace(Instances::default());
        self.guard = None;

        tracing::info!(
            scene = %self.scene().name(),
            instances = instances.len(),
            "script runtime stopped"
        );
    }

    /// Instantiate the entity's bound script class. Returns the existing
    /// instance if one is already live.
    pub fn create_script_entity(&self, uuid: Uuid) -> Result<ScriptInstance, ScriptError> {
        if let Some(instance) = self.host.instance(uuid) {
            return Ok(instance);
        }

        let class_name = {
            let scene = self.scene();
            let record = scene.entity(uuid).ok_or(SceneError::UnknownEntity(uuid))?;
            record
                .script_class()
                .ok_or(ScriptError::NoScriptClass(uuid))?
                .to_string()
        };
        let class = self
            .entity_class(&class_name)
            .ok_or(ScriptError::UnknownClass(class_name))?;

        let instance = class.instantiate(Entity::from_uuid(uuid))?;
        self.apply_fields(&instance);
        tracing::debug!(entity = %uuid, class = class.name(), "script instance created");
        self.host
            .instances
            .borrow_mut()
            .insert(uuid, instance.clone());
        Ok(instance)
    }

    /// Drop the entity's instance without calling any hook.
    pub fn destroy_script_entity(&self, uuid: Uuid) -> Option<ScriptInstance> {
        let removed = self.host.instances.borrow_mut().remove(uuid);
        if removed.is_some() {
            tracing::debug!(entity = %uuid, "script instance dropped");
        }
        removed
    }

    /// Instantiate (if needed) and call `on_create`.
    pub fn on_create_entity(&self, uuid: Uuid) -> Result<(), ScriptError> {
        let instance = self.create_script_entity(uuid)?;
        let _host = install_host(self.host.clone());
        instance.invoke_on_create();
        Ok(())
    }

    /// Call `on_destroy`, then drop the instance.
    pub fn on_destroy_entity(&self, uuid: Uuid) -> Result<(), ScriptError> {
        let instance = self.instance_or_err(uuid)?;
        {
            let _host = install_host(self.host.clone());
            instance.invoke_on_destroy();
        }
        self.destroy_script_entity(uuid);
        Ok(())
    }

    pub fn on_update_entity(&self, uuid: Uuid, dt: f32) -> Result<(), ScriptError> {
        let instance = self.instance_or_err(uuid)?;
        let _host = install_host(self.host.clone());
        instance.invoke_on_update(dt);
        Ok(())
    }

    /// Destroy an entity: call its script's `on_destroy` (while the entity is
    /// still live), drop the instance and its stored fields, then remove it
    /// from the scene. Returns false if the entity was not live.
    pub fn destroy_entity(&self, uuid: Uuid) -> bool {
        if !self.scene().contains(uuid) {
            return false;
        }
        if let Some(instance) = self.host.instance(uuid) {
            {
                let _host = install_host(self.host.clone());
                instance.invoke_on_destroy();
            }
            self.destroy_script_entity(uuid);
        }
        self.host.fields.borrow_mut().remove(&uuid);
        self.scene_mut().destroy_entity(uuid)
    }

    /// Call `on_update` on every live instance, in instantiation order.
    ///
    /// Instances whose entity was removed from the scene directly (not via
    /// [`destroy_entity`](Self::destroy_entity)) are dropped without hooks.
    pub fn on_update(&self, dt: f32) {
        let instances = self.host.instances.borrow().snapshot();
        let _host = install_host(self.host.clone());
        for instance in instances {
            let uuid = instance.entity().uuid();
            if !self.scene().contains(uuid) {
                tracing::debug!(entity = %uuid, "dropping instance of removed entity");
                self.destroy_script_entity(uuid);
                continue;
            }
            instance.invoke_on_update(dt);
        }
    }

    /// Store a field value for `uuid`. A live instance is updated at once;
    /// otherwise the value is applied when the instance is created.
    pub fn set_entity_field(
        &self,
        uuid: Uuid,
        name: &str,
        value: ScriptValue,
    ) -> Result<(), ScriptError> {
        if !self.scene().contains(uuid) {
            return Err(SceneError::UnknownEntity(uuid).into());
        }
        if let Some(instance) = self.host.instance(uuid) {
            instance.set_field_value(name, value.clone())?;
        }
        self.host
            .fields
            .borrow_mut()
            .entry(uuid)
            .or_default()
            .insert(name.to_string(), value);
        Ok(())
    }

    /// The stored value, falling back to the live instance's current value.
    pub fn entity_field(&self, uuid: Uuid, name: &str) -> Option<ScriptValue> {
        if let Some(instance) = self.host.instance(uuid) {
            if let Ok(value) = instance.get_field_value(name) {
                return Some(value);
            }
        }
        self.host.fields.borrow().get(&uuid)?.get(name).cloned()
    }

    fn apply_fields(&self, instance: &ScriptInstance) {
        let uuid = instance.entity().uuid();
        for (name, value) in self.host.field_values(uuid) {
            if let Err(err) = instance.set_field_value(&name, value) {
                tracing::warn!(
                    entity = %uuid,
                    class = instance.class_name(),
                    field = %name,
                    error = %err,
                    "stored field not applied"
                );
            }
        }
    }

    pub fn entity_script_instance(&self, uuid: Uuid) -> Option<ScriptInstance> {
        self.host.instance(uuid)
    }

    fn instance_or_err(&self, uuid: Uuid) -> Result<ScriptInstance, ScriptError> {
        self.host.instance(uuid).ok_or(ScriptError::NoInstance(uuid))
    }
}

impl Drop for ScriptEngine {
    fn drop(&mut self) {
        // Break the host <-> instance cycle that script backends may hold.
        self.host.instances.replace(Instances::default());
    }
}
