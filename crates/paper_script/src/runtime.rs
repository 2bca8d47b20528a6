//! Script runtime management
//!
//! Provides a QuickJS runtime for JavaScript game logic. Scripts see the same
//! surface as Rust scripts: an `Entity` base class with `hasComponent`,
//! `getComponent`, `getEntityByName`, `as` and the lifecycle methods, backed
//! by the `Entity_*` internal calls installed with [`ScriptRuntime::bind_host`].
//! Until a host is bound, lookups read as not found.
//!
//! A class declares host-visible fields as a static map from property name to
//! type name:
//!
//! ```js
//! class Turret extends Entity {}
//! Turret.fields = { range: "float", target: "entity" };
//! ```

use crate::entity::Entity;
use crate::error::ScriptError;
use crate::ffi;
use crate::field::{ScriptField, ScriptFieldType, ScriptValue};
use crate::internal_calls::InternalCalls;
use crate::script::{EntityScript, ScriptClass, ScriptInstance};
use paper_core::{id_of_name, Uuid};
use rquickjs::function::This;
use rquickjs::{Context, Ctx, FromJs, Function, IntoJs, Object, Persistent, Runtime, Value};
use std::cell::RefCell;
use std::path::Path;
use std::rc::{Rc, Weak};

/// Base classes every script builds on. `Entity_*` are resolved at call
/// time, so the prelude can run before a host is bound. `__PAPER_NIL` is set
/// from Rust before it runs.
const PRELUDE: &str = r#"
class Entity {
    constructor(uuid) {
        this.uuid = typeof uuid === "string" ? uuid : __PAPER_NIL;
    }

    isValid() {
        return this.uuid !== __PAPER_NIL;
    }

    equals(other) {
        return other instanceof Entity && other.uuid === this.uuid;
    }

    hasComponent(type) {
        if (!this.isValid() || typeof Entity_HasComponent !== "function") return false;
        return Entity_HasComponent(this.uuid, String(type && type.componentName));
    }

    getComponent(type) {
        if (!this.hasComponent(type)) return null;
        const component = new type();
        component.entity = this;
        return component;
    }

    getEntityByName(name) {
        if (typeof Entity_GetEntityByName !== "function") return null;
        return __paperEntity(Entity_GetEntityByName(String(name)));
    }

    as(type) {
        if (!this.isValid() || typeof Entity_GetScriptInstance !== "function") return null;
        const instance = Entity_GetScriptInstance(this.uuid);
        return instance instanceof type ? instance : null;
    }

    onCreate() {}
    onDestroy() {}
    onUpdate(dt) {}
}

class Component {
    constructor() {
        this.entity = null;
    }
}

function __paperEntity(uuid) {
    return typeof uuid === "string" && uuid !== __PAPER_NIL ? new Entity(uuid) : null;
}

function __paperFields(className) {
    const declared = (0, eval)(className).fields || {};
    return Object.keys(declared).map((name) => name + ":" + declared[name]).join("\n");
}

function __paperInstantiate(className, uuid) {
    const type = (0, eval)(className);
    if (typeof type !== "function") {
        throw new TypeError(className + " is not a class");
    }
    const instance = new type(uuid);
    instance.uuid = uuid;
    return instance;
}
"#;

/// Script execution context
pub struct ScriptRuntime {
    #[allow(dead_code)] // Kept alive for context lifetime
    runtime: Runtime,
    pub context: Context,
}

impl ScriptRuntime {
    pub fn new() -> Result<Self, ScriptError> {
        let runtime = Runtime::new()?;
        let context = Context::full(&runtime)?;

        let script_runtime = Self { runtime, context };
        script_runtime
            .context
            .with(|ctx| ctx.globals().set("__PAPER_NIL", ffi::NIL_JS))?;
        script_runtime.execute(PRELUDE)?;
        Ok(script_runtime)
    }

    pub fn execute_file(&self, path: &Path) -> Result<(), ScriptError> {
        let source = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "executing script file");
        self.execute(&source)
    }

    pub fn execute(&self, source: &str) -> Result<(), ScriptError> {
        self.context
            .with(|ctx| ctx.eval::<(), _>(source).map_err(|err| js_error(&ctx, err)))
    }

    /// Evaluate an expression and convert its value.
    pub fn eval<T>(&self, source: &str) -> Result<T, ScriptError>
    where
        T: for<'js> FromJs<'js>,
    {
        self.context
            .with(|ctx| ctx.eval::<T, _>(source).map_err(|err| js_error(&ctx, err)))
    }

    /// Call a JavaScript function by name with no arguments.
    pub fn call_function(&self, name: &str) -> Result<(), ScriptError> {
        self.context.with(|ctx| -> Result<(), ScriptError> {
            let func: Function = ctx.globals().get(name)?;
            func.call::<_, ()>(()).map_err(|err| js_error(&ctx, err))
        })
    }

    /// Install the `Entity_*` internal calls, answered by `host`.
    pub fn bind_host(&self, host: Rc<dyn InternalCalls>) -> Result<(), ScriptError> {
        self.context
            .with(|ctx| install_internal_calls(&ctx, host))
            .map_err(ScriptError::from)
    }

    /// A script class that instantiates the JS class `class_name`.
    ///
    /// The class must already be defined in this runtime. Its static `fields`
    /// map, if any, becomes the class's declared fields.
    pub fn script_class(self: &Rc<Self>, class_name: &str) -> Result<ScriptClass, ScriptError> {
        if !ffi::is_class_path(class_name) {
            return Err(ScriptError::InvalidClassName(class_name.to_string()));
        }
        let is_defined = format!(
            "(() => {{ try {{ return typeof {class_name} === \"function\"; }} catch (e) {{ return false; }} }})()"
        );
        if !self.eval::<bool>(&is_defined)? {
            return Err(ScriptError::UnknownClass(class_name.to_string()));
        }

        let fields = self.declared_fields(class_name)?;

        let runtime = Rc::downgrade(self);
        let name = class_name.to_string();
        Ok(ScriptClass::from_fn(class_name, move |entity| {
            instantiate(&runtime, &name, entity)
        })
        .with_fields(fields))
    }

    fn declared_fields(&self, class_name: &str) -> Result<Vec<ScriptField>, ScriptError> {
        let listing = self.context.with(|ctx| -> Result<String, ScriptError> {
            let list: Function = ctx.globals().get("__paperFields")?;
            list.call::<_, String>((class_name,))
                .map_err(|err| js_error(&ctx, err))
        })?;

        listing
            .lines()
            .map(|line| {
                let (name, type_name) = line
                    .split_once(':')
                    .ok_or_else(|| ScriptError::InvalidField(format!("{class_name}: {line}")))?;
                let field_type = ScriptFieldType::from_name(type_name).ok_or_else(|| {
                    ScriptError::InvalidField(format!(
                        "{class_name}.{name} has unknown type '{type_name}'"
                    ))
                })?;
                Ok(ScriptField::new(name, field_type))
            })
            .collect()
    }
}

fn instantiate(
    runtime: &Weak<ScriptRuntime>,
    class_name: &str,
    entity: Entity,
) -> Result<ScriptInstance, ScriptError> {
    let runtime = runtime.upgrade().ok_or(ScriptError::RuntimeDropped)?;

    let value = runtime.context.with(|ctx| -> Result<_, ScriptError> {
        let construct: Function = ctx.globals().get("__paperInstantiate")?;
        let object = construct
            .call::<_, Object>((class_name, ffi::uuid_to_js(entity.uuid())))
            .map_err(|err| js_error(&ctx, err))?;
        Ok(Persistent::save(&ctx, object))
    })?;

    let object = Rc::new(JsObject { value, runtime });
    let hooks: Rc<RefCell<dyn EntityScript>> = Rc::new(RefCell::new(JsScript {
        class_name: class_name.to_string(),
        object: Rc::clone(&object),
    }));
    tracing::debug!(entity = %entity, class = class_name, "instantiated JS script");
    Ok(ScriptInstance::with_object(class_name, entity, hooks, object))
}

fn install_internal_calls<'js>(
    ctx: &Ctx<'js>,
    host: Rc<dyn InternalCalls>,
) -> rquickjs::Result<()> {
    let globals = ctx.globals();

    let calls = Rc::clone(&host);
    let has_component_fn = Function::new(ctx.clone(), move |uuid: String, component: String| {
        has_component(&*calls, &uuid, &component)
    })?;
    globals.set("Entity_HasComponent", has_component_fn)?;

    let calls = Rc::clone(&host);
    let get_entity_by_name = Function::new(ctx.clone(), move |name: String| {
        ffi::uuid_to_js(calls.entity_get_entity_by_name(&name))
    })?;
    globals.set("Entity_GetEntityByName", get_entity_by_name)?;

    let get_script_instance = Function::new(
        ctx.clone(),
        move |ctx: Ctx<'js>, uuid: String| -> rquickjs::Result<Option<Object<'js>>> {
            script_object(&ctx, &*host, &uuid)
        },
    )?;
    globals.set("Entity_GetScriptInstance", get_script_instance)?;

    Ok(())
}

fn has_component(host: &dyn InternalCalls, uuid: &str, component: &str) -> bool {
    let uuid = ffi::uuid_from_js(uuid);
    if uuid.is_nil() {
        return false;
    }
    let Some(id) = id_of_name(component) else {
        tracing::debug!(%component, "script asked for unregistered component");
        return false;
    };
    host.entity_has_component(uuid, id).unwrap_or_else(|err| {
        tracing::debug!(entity = %uuid, %component, error = %err, "component lookup failed");
        false
    })
}

/// The JS object bound to `uuid`. Rust scripts have no JS face and read as
/// absent.
fn script_object<'js>(
    ctx: &Ctx<'js>,
    host: &dyn InternalCalls,
    uuid: &str,
) -> rquickjs::Result<Option<Object<'js>>> {
    let uuid = ffi::uuid_from_js(uuid);
    if uuid.is_nil() {
        return Ok(None);
    }
    let Some(instance) = host.entity_get_script_instance(uuid) else {
        return Ok(None);
    };
    match Rc::clone(instance.object()).downcast::<JsObject>() {
        Ok(object) => object.value.clone().restore(ctx).map(Some),
        Err(_) => Ok(None),
    }
}

/// A JS script object kept alive outside the context.
struct JsObject {
    // Declared first: must be released before the runtime.
    value: Persistent<Object<'static>>,
    runtime: Rc<ScriptRuntime>,
}

/// Forwards lifecycle hooks to a JS object's methods.
struct JsScript {
    class_name: String,
    object: Rc<JsObject>,
}

impl JsScript {
    fn invoke(&self, method: &'static str, dt: Option<f32>) {
        let result = self.object.runtime.context.with(|ctx| -> Result<(), ScriptError> {
            let object = self.object.value.clone().restore(&ctx)?;
            let func: Option<Function> = object.get(method)?;
            let Some(func) = func else {
                return Ok(());
            };
            let called = match dt {
                Some(dt) => func.call::<_, ()>((This(object), dt)),
                None => func.call::<_, ()>((This(object),)),
            };
            called.map_err(|err| js_error(&ctx, err))
        });

        if let Err(err) = result {
            tracing::error!(class = %self.class_name, method, error = %err, "script hook failed");
        }
    }

    fn read_field(&self, field: &ScriptField) -> Result<Option<ScriptValue>, ScriptError> {
        self.object.runtime.context.with(|ctx| -> Result<_, ScriptError> {
            let object = self.object.value.clone().restore(&ctx)?;
            let value: Value = object.get(field.name.as_str())?;
            Ok(value_from_js(&value, field.field_type))
        })
    }

    fn write_field(&self, field: &ScriptField, value: &ScriptValue) -> Result<(), ScriptError> {
        self.object.runtime.context.with(|ctx| -> Result<(), ScriptError> {
            let object = self.object.value.clone().restore(&ctx)?;
            let value = value_to_js(&ctx, value)?;
            object.set(field.name.as_str(), value)?;
            Ok(())
        })
    }
}

impl EntityScript for JsScript {
    fn get_field(&self, field: &ScriptField) -> Option<ScriptValue> {
        self.read_field(field).unwrap_or_else(|err| {
            tracing::error!(class = %self.class_name, field = %field.name, error = %err, "reading field failed");
            None
        })
    }

    fn set_field(&mut self, field: &ScriptField, value: ScriptValue) -> bool {
        match self.write_field(field, &value) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(class = %self.class_name, field = %field.name, error = %err, "writing field failed");
                false
            }
        }
    }

    fn on_create(&mut self) {
        self.invoke("onCreate", None);
    }

    fn on_destroy(&mut self) {
        self.invoke("onDestroy", None);
    }

    fn on_update(&mut self, dt: f32) {
        self.invoke("onUpdate", Some(dt));
    }
}

/// Read a property as `field_type`. `None` if the value has another type;
/// `null`/`undefined` entity fields read as the nil entity.
fn value_from_js(value: &Value<'_>, field_type: ScriptFieldType) -> Option<ScriptValue> {
    match field_type {
        ScriptFieldType::Bool => value.as_bool().map(ScriptValue::Bool),
        ScriptFieldType::Int => value.as_number().map(|n| ScriptValue::Int(n as i64)),
        ScriptFieldType::Float => value.as_number().map(ScriptValue::Float),
        ScriptFieldType::String => value
            .as_string()
            .and_then(|s| s.to_string().ok())
            .map(ScriptValue::String),
        ScriptFieldType::Entity => {
            if value.is_null() || value.is_undefined() {
                return Some(ScriptValue::Entity(Uuid::NIL));
            }
            let uuid: String = value.as_object()?.get("uuid").ok()?;
            Some(ScriptValue::Entity(ffi::uuid_from_js(&uuid)))
        }
    }
}

fn value_to_js<'js>(ctx: &Ctx<'js>, value: &ScriptValue) -> Result<Value<'js>, ScriptError> {
    let value = match value {
        ScriptValue::Bool(b) => (*b).into_js(ctx)?,
        // JS numbers are doubles.
        ScriptValue::Int(i) => (*i as f64).into_js(ctx)?,
        ScriptValue::Float(f) => (*f).into_js(ctx)?,
        ScriptValue::String(s) => s.as_str().into_js(ctx)?,
        ScriptValue::Entity(uuid) => {
            let make: Function = ctx.globals().get("__paperEntity")?;
            make.call::<_, Value>((ffi::uuid_to_js(*uuid),))
                .map_err(|err| js_error(ctx, err))?
        }
    };
    Ok(value)
}

/// Turn a pending JS exception into a readable error.
fn js_error(ctx: &Ctx<'_>, err: rquickjs::Error) -> ScriptError {
    if !matches!(err, rquickjs::Error::Exception) {
        return ScriptError::Js(err);
    }
    let thrown = ctx.catch();
    let message = if let Some(exception) = thrown.as_exception() {
        exception
            .message()
            .unwrap_or_else(|| "exception without message".to_string())
    } else if let Some(text) = thrown.as_string() {
        text.to_string().unwrap_or_default()
    } else {
        format!("{thrown:?}")
    };
    ScriptError::JsException(message)
}
