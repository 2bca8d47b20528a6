//! Runtime settings
//!
//! Loaded from a JSON file; every field has a default so a partial file (or
//! no file at all) still boots.

use anyhow::{bail, Context, Result};
use paper_core::time::DEFAULT_TICK_RATE_HZ;
use paper_core::{id_of_name, try_register_component, ComponentId, ComponentMeta, Scene, Uuid};
use paper_script::{ScriptEngine, ScriptValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Runtime settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scene: SceneSettings,
    /// JavaScript file defining the scene's script classes.
    pub script_file: Option<PathBuf>,
    /// Components beyond the built-ins that scenes and scripts may name.
    pub components: Vec<ComponentSettings>,
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    pub name: String,
    pub entities: Vec<EntitySettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySettings {
    pub name: String,
    #[serde(default)]
    pub uuid: Option<Uuid>,
    #[serde(default)]
    pub components: Vec<String>,
    /// Script class bound to this entity.
    #[serde(default)]
    pub script: Option<String>,
    /// Script field values, e.g. `{ "speed": { "float": 4.0 } }`.
    #[serde(default)]
    pub fields: BTreeMap<String, ScriptValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSettings {
    pub id: ComponentId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub ticks: u64,
    pub tick_rate_hz: u32,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            name: "[Scene]".to_string(),
            entities: Vec::new(),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            ticks: 60,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
        }
    }
}

impl Settings {
    /// Read settings from `path`. A relative `script_file` is resolved
    /// against the settings file's directory. A missing file yields the
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "settings file not found, using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading settings from {}", path.display()))
            }
        };
        let mut settings: Settings = serde_json::from_str(&text)
            .with_context(|| format!("parsing settings in {}", path.display()))?;

        if let (Some(script), Some(dir)) = (&settings.script_file, path.parent()) {
            if script.is_relative() {
                settings.script_file = Some(dir.join(script));
            }
        }
        Ok(settings)
    }

    /// Register the extra components with the global registry.
    pub fn register_components(&self) -> Result<()> {
        for component in &self.components {
            try_register_component(ComponentMeta {
                id: component.id,
                name: component.name.clone(),
            })
            .context("registering components from settings")?;
        }
        Ok(())
    }

    /// Build the scene and an engine over it, with each entity's field values
    /// stored for its script.
    pub fn build_engine(&self) -> Result<ScriptEngine> {
        let (scene, uuids) = self.build_scene()?;
        let engine = ScriptEngine::new(scene);
        for (entity, uuid) in self.scene.entities.iter().zip(uuids) {
            for (name, value) in &entity.fields {
                engine
                    .set_entity_field(uuid, name, value.clone())
                    .with_context(|| format!("setting field '{}' of '{}'", name, entity.name))?;
            }
        }
        Ok(engine)
    }

    /// Build the scene table, returning each settings entity's UUID in
    /// settings order. Component names must already be registered.
    fn build_scene(&self) -> Result<(Scene, Vec<Uuid>)> {
        let mut scene = Scene::new(self.scene.name.clone());
        let mut uuids = Vec::with_capacity(self.scene.entities.len());
        for entity in &self.scene.entities {
            let uuid = match entity.uuid {
                Some(uuid) => scene
                    .create_entity_with_uuid(uuid, entity.name.clone())
                    .with_context(|| format!("creating entity '{}'", entity.name))?,
                None => scene.create_entity(entity.name.clone()),
            };
            for name in &entity.components {
                let Some(id) = id_of_name(name) else {
                    bail!("entity '{}' uses unknown component '{}'", entity.name, name);
                };
                scene.add_component_id(uuid, id)?;
            }
            scene.set_script_class(uuid, entity.script.clone())?;
            uuids.push(uuid);
        }
        Ok((scene, uuids))
    }

    /// Distinct script class names in first-use order.
    pub fn script_classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = Vec::new();
        for class in self.scene.entities.iter().filter_map(|e| e.script.as_deref()) {
            if !classes.contains(&class) {
                classes.push(class);
            }
        }
        classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SANDBOX: &str = r#"{
        "scene": {
            "name": "Sandbox",
            "entities": [
                { "name": "Player", "uuid": 42, "components": ["SettingsHealth"], "script": "Player",
                  "fields": { "speed": { "float": 4.5 }, "camera": { "entity": 1 } } },
                { "name": "Camera" },
                { "name": "Enemy", "script": "Enemy" },
                { "name": "Enemy", "script": "Enemy" }
            ]
        },
        "components": [{ "id": 700, "name": "SettingsHealth" }],
        "simulation": { "ticks": 3 }
    }"#;

    #[test]
    fn defaults_fill_missing_fields() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.scene.name, "[Scene]");
        assert!(settings.script_file.is_none());
        assert_eq!(settings.simulation.ticks, 60);
        assert_eq!(settings.simulation.tick_rate_hz, DEFAULT_TICK_RATE_HZ);
    }

    #[test]
    fn builds_scene_from_settings() {
        let settings: Settings = serde_json::from_str(SANDBOX).unwrap();
        settings.register_components().unwrap();
        let (scene, uuids) = settings.build_scene().unwrap();

        assert_eq!(scene.name(), "Sandbox");
        assert_eq!(scene.len(), 4);
        assert_eq!(settings.simulation.ticks, 3);
        assert_eq!(settings.simulation.tick_rate_hz, DEFAULT_TICK_RATE_HZ);

        let player = scene.find_by_name("Player").unwrap();
        assert_eq!(player, Uuid::from_raw(42));
        assert_eq!(scene.has_component_id(player, 700), Ok(true));
        assert_eq!(scene.entity(player).unwrap().script_class(), Some("Player"));

        let camera = scene.find_by_name("Camera").unwrap();
        assert_eq!(scene.entity(camera).unwrap().script_class(), None);
        assert_eq!(uuids.len(), 4);
        assert_eq!(uuids[0], player);
        assert_eq!(uuids[1], camera);
    }

    #[test]
    fn script_classes_are_distinct() {
        let settings: Settings = serde_json::from_str(SANDBOX).unwrap();
        assert_eq!(settings.script_classes(), vec!["Player", "Enemy"]);
    }

    #[test]
    fn unknown_component_is_rejected() {
        let settings: Settings = serde_json::from_str(
            r#"{ "scene": { "entities": [{ "name": "A", "components": ["NoSuchThing"] }] } }"#,
        )
        .unwrap();
        let err = settings.build_scene().unwrap_err();
        assert!(err.to_string().contains("NoSuchThing"));
    }

    #[test]
    fn duplicate_uuid_is_rejected() {
        let settings: Settings = serde_json::from_str(
            r#"{ "scene": { "entities": [
                { "name": "A", "uuid": 5 },
                { "name": "B", "uuid": 5 }
            ] } }"#,
        )
        .unwrap();
        assert!(settings.build_scene().is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/paper/settings.json")).unwrap();
        assert_eq!(settings.scene.name, "[Scene]");
        assert!(settings.scene.entities.is_empty());
        assert_eq!(settings.simulation.ticks, 60);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        // A directory exists but cannot be read as a file.
        let err = Settings::load(&std::env::temp_dir()).unwrap_err();
        assert!(err.to_string().contains("reading settings"));
    }

    #[test]
    fn colliding_component_is_an_error() {
        paper_core::register_component(ComponentMeta {
            id: 710,
            name: "SettingsShield".to_string(),
        });
        let settings: Settings =
            serde_json::from_str(r#"{ "components": [{ "id": 710, "name": "SettingsArmor" }] }"#)
                .unwrap();
        let err = settings.register_components().unwrap_err();
        assert!(format!("{err:#}").contains("name mismatch"));

        let settings: Settings =
            serde_json::from_str(r#"{ "components": [{ "id": 711, "name": "SettingsShield" }] }"#)
                .unwrap();
        assert!(settings.register_components().is_err());
    }

    #[test]
    fn engine_receives_entity_fields() {
        let settings: Settings = serde_json::from_str(SANDBOX).unwrap();
        settings.register_components().unwrap();
        let engine = settings.build_engine().unwrap();

        let player = Uuid::from_raw(42);
        assert_eq!(engine.entity_field(player, "speed"), Some(ScriptValue::Float(4.5)));
        assert_eq!(
            engine.entity_field(player, "camera"),
            Some(ScriptValue::Entity(Uuid::from_raw(1)))
        );
        let camera = engine.scene().find_by_name("Camera").unwrap();
        assert!(engine.host().field_values(camera).is_empty());
    }
}
