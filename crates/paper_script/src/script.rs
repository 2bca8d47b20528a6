//! Script classes and instances
//!
//! A [`ScriptClass`] is a named factory. Instantiating it for an entity
//! yields a [`ScriptInstance`]: the lifecycle hooks plus a type-erased handle
//! used to recover the concrete script (`Entity::as_script`). Classes may
//! also declare [`ScriptField`]s the host can read and write.

use crate::entity::Entity;
use crate::error::ScriptError;
use crate::field::{ScriptField, ScriptValue};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Lifecycle hooks driven by the host. All default to doing nothing.
///
/// The host calls these; a script never calls them on itself.
pub trait EntityScript: 'static {
    /// Called once after the runtime starts (or the entity is spawned).
    fn on_create(&mut self) {}

    /// Called once before the instance is dropped.
    fn on_destroy(&mut self) {}

    /// Called once per simulation tick with the elapsed seconds.
    fn on_update(&mut self, _dt: f32) {}

    /// Current value of a declared field, or `None` if not exposed.
    fn get_field(&self, _field: &ScriptField) -> Option<ScriptValue> {
        None
    }

    /// Store a declared field. The value's type already matches the
    /// declaration. Returns false if the script does not accept it.
    fn set_field(&mut self, _field: &ScriptField, _value: ScriptValue) -> bool {
        false
    }
}

/// A Rust script class.
pub trait ScriptType: EntityScript + Sized {
    /// Stable, host-recognizable class name.
    const CLASS_NAME: &'static str;

    fn new(entity: Entity) -> Self;

    /// Fields the host may read and write through `get_field`/`set_field`.
    fn fields() -> Vec<ScriptField> {
        Vec::new()
    }
}

/// Shared handle to one instantiated script.
///
/// Clones refer to the same instance.
#[derive(Clone)]
pub struct ScriptInstance {
    class_name: Rc<str>,
    entity: Entity,
    hooks: Rc<RefCell<dyn EntityScript>>,
    object: Rc<dyn Any>,
    fields: Rc<[ScriptField]>,
}

impl ScriptInstance {
    pub fn new<T: EntityScript>(class_name: impl Into<Rc<str>>, entity: Entity, script: T) -> Self {
        let cell = Rc::new(RefCell::new(script));
        let hooks: Rc<RefCell<dyn EntityScript>> = cell.clone();
        Self {
            class_name: class_name.into(),
            entity,
            hooks,
            object: cell,
            fields: Rc::from(Vec::new()),
        }
    }

    /// Build an instance whose narrowing handle is separate from its hooks.
    /// Used by backends whose script object lives outside Rust.
    pub(crate) fn with_object(
        class_name: impl Into<Rc<str>>,
        entity: Entity,
        hooks: Rc<RefCell<dyn EntityScript>>,
        object: Rc<dyn Any>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            entity,
            hooks,
            object,
            fields: Rc::from(Vec::new()),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// The concrete script, if this instance is a `T`.
    pub fn downcast<T: EntityScript>(&self) -> Option<Rc<RefCell<T>>> {
        Rc::clone(&self.object).downcast::<RefCell<T>>().ok()
    }

    pub(crate) fn object(&self) -> &Rc<dyn Any> {
        &self.object
    }

    /// Whether both handles refer to the same instance.
    pub fn ptr_eq(&self, other: &ScriptInstance) -> bool {
        Rc::ptr_eq(&self.hooks, &other.hooks)
    }

    /// Fields of the class this instance was created from.
    pub fn fields(&self) -> &[ScriptField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ScriptField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn get_field_value(&self, name: &str) -> Result<ScriptValue, ScriptError> {
        let field = self.declared(name)?;
        let script = self
            .hooks
            .try_borrow()
            .map_err(|_| ScriptError::InstanceBusy(self.entity.uuid()))?;
        script
            .get_field(field)
            .ok_or_else(|| self.unknown_field(name))
    }

    /// Set a declared field. The value must have the declared type.
    pub fn set_field_value(&self, name: &str, value: ScriptValue) -> Result<(), ScriptError> {
        let field = self.declared(name)?;
        if value.field_type() != field.field_type {
            return Err(ScriptError::FieldTypeMismatch {
                field: field.name.clone(),
                expected: field.field_type,
                found: value.field_type(),
            });
        }
        let mut script = self
            .hooks
            .try_borrow_mut()
            .map_err(|_| ScriptError::InstanceBusy(self.entity.uuid()))?;
        if script.set_field(field, value) {
            Ok(())
        } else {
            Err(self.unknown_field(name))
        }
    }

    fn declared(&self, name: &str) -> Result<&ScriptField, ScriptError> {
        self.field(name).ok_or_else(|| self.unknown_field(name))
    }

    fn unknown_field(&self, name: &str) -> ScriptError {
        ScriptError::UnknownField {
            class: self.class_name.to_string(),
            field: name.to_string(),
        }
    }

    pub fn invoke_on_create(&self) {
        self.invoke("on_create", |script| script.on_create());
    }

    pub fn invoke_on_destroy(&self) {
        self.invoke("on_destroy", |script| script.on_destroy());
    }

    pub fn invoke_on_update(&self, dt: f32) {
        self.invoke("on_update", |script| script.on_update(dt));
    }

    fn invoke(&self, hook: &'static str, f: impl FnOnce(&mut dyn EntityScript)) {
        match self.hooks.try_borrow_mut() {
            Ok(mut script) => f(&mut *script),
            // The script is already running one of its own hooks.
            Err(_) => tracing::error!(
                class = %self.class_name,
                entity = %self.entity,
                hook,
                "reentrant hook call skipped"
            ),
        }
    }
}

impl fmt::Debug for ScriptInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptInstance")
            .field("class_name", &self.class_name)
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}

type Factory = dyn Fn(Entity) -> Result<ScriptInstance, ScriptError>;

/// Named factory for script instances.
#[derive(Clone)]
pub struct ScriptClass {
    name: Rc<str>,
    factory: Rc<Factory>,
    fields: Rc<[ScriptField]>,
}

impl ScriptClass {
    /// Class backed by the Rust type `T`.
    pub fn of<T: ScriptType>() -> Self {
        Self::from_fn(T::CLASS_NAME, |entity| {
            Ok(ScriptInstance::new(T::CLASS_NAME, entity, T::new(entity)))
        })
        .with_fields(T::fields())
    }

    pub fn from_fn(
        name: impl Into<Rc<str>>,
        factory: impl Fn(Entity) -> Result<ScriptInstance, ScriptError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            factory: Rc::new(factory),
            fields: Rc::from(Vec::new()),
        }
    }

    /// Replace the declared fields.
    pub fn with_fields(mut self, fields: Vec<ScriptField>) -> Self {
        self.fields = fields.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[ScriptField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ScriptField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn instantiate(&self, entity: Entity) -> Result<ScriptInstance, ScriptError> {
        let mut instance = (self.factory)(entity)?;
        instance.fields = Rc::clone(&self.fields);
        Ok(instance)
    }
}

impl fmt::Debug for ScriptClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptClass")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Script classes known to the host, by full class name.
#[derive(Debug, Default, Clone)]
pub struct ScriptClassRegistry {
    classes: HashMap<String, ScriptClass>,
}

impl ScriptClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class: ScriptClass) -> Result<(), ScriptError> {
        if self.classes.contains_key(class.name()) {
            return Err(ScriptError::DuplicateClass(class.name().to_string()));
        }
        tracing::debug!(class = class.name(), "registered script class");
        self.classes.insert(class.name().to_string(), class);
        Ok(())
    }

    pub fn register_type<T: ScriptType>(&mut self) -> Result<(), ScriptError> {
        self.register(ScriptClass::of::<T>())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ScriptClass> {
        self.classes.get(name)
    }

    /// Registered class names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ScriptFieldType;
    use paper_core::Uuid;

    #[derive(Default)]
    struct Counter {
        created: u32,
        updates: Vec<f32>,
        destroyed: bool,
    }

    impl EntityScript for Counter {
        fn on_create(&mut self) {
            self.created += 1;
        }

        fn on_destroy(&mut self) {
            self.destroyed = true;
        }

        fn on_update(&mut self, dt: f32) {
            self.updates.push(dt);
        }
    }

    impl ScriptType for Counter {
        const CLASS_NAME: &'static str = "Tests.Counter";

        fn new(_entity: Entity) -> Self {
            Self::default()
        }
    }

    struct Silent;
    impl EntityScript for Silent {}

    struct Turret {
        range: f64,
        label: String,
    }

    impl EntityScript for Turret {
        fn get_field(&self, field: &ScriptField) -> Option<ScriptValue> {
            match field.name.as_str() {
                "range" => Some(ScriptValue::Float(self.range)),
                "label" => Some(ScriptValue::String(self.label.clone())),
                _ => None,
            }
        }

        fn set_field(&mut self, field: &ScriptField, value: ScriptValue) -> bool {
            match (field.name.as_str(), value) {
                ("range", ScriptValue::Float(range)) => self.range = range,
                ("label", ScriptValue::String(label)) => self.label = label,
                _ => return false,
            }
            true
        }
    }

    impl ScriptType for Turret {
        const CLASS_NAME: &'static str = "Tests.Turret";

        fn new(_entity: Entity) -> Self {
            Self {
                range: 10.0,
                label: String::new(),
            }
        }

        fn fields() -> Vec<ScriptField> {
            vec![
                ScriptField::new("range", ScriptFieldType::Float),
                ScriptField::new("label", ScriptFieldType::String),
                ScriptField::new("ammo", ScriptFieldType::Int),
            ]
        }
    }

    fn entity(raw: u64) -> Entity {
        Entity::from_uuid(Uuid::from_raw(raw))
    }

    #[test]
    fn hooks_reach_concrete_script() {
        let instance = ScriptClass::of::<Counter>().instantiate(entity(1)).unwrap();
        instance.invoke_on_create();
        instance.invoke_on_update(0.5);
        instance.invoke_on_update(0.25);
        instance.invoke_on_destroy();

        let counter = instance.downcast::<Counter>().unwrap();
        let counter = counter.borrow();
        assert_eq!(counter.created, 1);
        assert_eq!(counter.updates, vec![0.5, 0.25]);
        assert!(counter.destroyed);
    }

    #[test]
    fn default_hooks_are_noops() {
        let instance = ScriptInstance::new("Tests.Silent", entity(2), Silent);
        instance.invoke_on_create();
        instance.invoke_on_update(1.0);
        instance.invoke_on_destroy();
        assert!(instance.downcast::<Silent>().is_some());
    }

    #[test]
    fn downcast_to_wrong_type_is_none() {
        let instance = ScriptInstance::new("Tests.Silent", entity(2), Silent);
        assert!(instance.downcast::<Counter>().is_none());
    }

    #[test]
    fn clones_share_state() {
        let instance = ScriptClass::of::<Counter>().instantiate(entity(3)).unwrap();
        let clone = instance.clone();
        clone.invoke_on_create();

        assert!(instance.ptr_eq(&clone));
        assert_eq!(instance.downcast::<Counter>().unwrap().borrow().created, 1);
        assert_eq!(instance.class_name(), "Tests.Counter");
        assert_eq!(instance.entity(), entity(3));
    }

    #[test]
    fn reentrant_hook_is_skipped() {
        let instance = ScriptClass::of::<Counter>().instantiate(entity(4)).unwrap();
        let held = instance.downcast::<Counter>().unwrap();
        let _borrow = held.borrow_mut();

        // Must not panic while the script is borrowed.
        instance.invoke_on_create();
    }

    #[test]
    fn registry_rejects_duplicates() {
        let mut registry = ScriptClassRegistry::new();
        registry.register_type::<Counter>().unwrap();
        assert!(matches!(
            registry.register_type::<Counter>(),
            Err(ScriptError::DuplicateClass(name)) if name == "Tests.Counter"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_lookup() {
        let mut registry = ScriptClassRegistry::new();
        registry.register_type::<Counter>().unwrap();
        registry
            .register(ScriptClass::from_fn("Tests.Silent", |e| {
                Ok(ScriptInstance::new("Tests.Silent", e, Silent))
            }))
            .unwrap();

        assert!(registry.contains("Tests.Counter"));
        assert!(!registry.contains("Tests.Missing"));
        assert_eq!(registry.get("Tests.Silent").map(ScriptClass::name), Some("Tests.Silent"));
        assert_eq!(registry.names(), vec!["Tests.Counter", "Tests.Silent"]);
    }

    #[test]
    fn class_declares_fields_from_type() {
        let class = ScriptClass::of::<Turret>();
        let names: Vec<_> = class.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["range", "label", "ammo"]);
        assert_eq!(
            class.field("range").map(|f| f.field_type),
            Some(ScriptFieldType::Float)
        );
        assert!(class.field("speed").is_none());
        assert!(ScriptClass::of::<Counter>().fields().is_empty());
    }

    #[test]
    fn field_values_read_and_write_through_instance() {
        let instance = ScriptClass::of::<Turret>().instantiate(entity(5)).unwrap();
        assert_eq!(instance.fields().len(), 3);
        assert_eq!(instance.get_field_value("range").unwrap(), ScriptValue::Float(10.0));

        instance
            .set_field_value("range", ScriptValue::Float(25.0))
            .unwrap();
        instance
            .set_field_value("label", ScriptValue::String("north".into()))
            .unwrap();
        let turret = instance.downcast::<Turret>().unwrap();
        assert_eq!(turret.borrow().range, 25.0);
        assert_eq!(turret.borrow().label, "north");
    }

    #[test]
    fn field_errors() {
        let instance = ScriptClass::of::<Turret>().instantiate(entity(6)).unwrap();
        assert!(matches!(
            instance.set_field_value("range", ScriptValue::Int(3)),
            Err(ScriptError::FieldTypeMismatch {
                expected: ScriptFieldType::Float,
                found: ScriptFieldType::Int,
                ..
            })
        ));
        assert!(matches!(
            instance.get_field_value("speed"),
            Err(ScriptError::UnknownField { field, .. }) if field == "speed"
        ));
        // Declared but not handled by the script.
        assert!(matches!(
            instance.set_field_value("ammo", ScriptValue::Int(3)),
            Err(ScriptError::UnknownField { field, .. }) if field == "ammo"
        ));

        let held = instance.downcast::<Turret>().unwrap();
        let _borrow = held.borrow_mut();
        assert!(matches!(
            instance.get_field_value("range"),
            Err(ScriptError::InstanceBusy(_))
        ));
    }
}
