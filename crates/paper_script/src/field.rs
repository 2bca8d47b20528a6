//! Script fields
//!
//! A class declares which of its properties the host may read and write.
//! Values set on the host before an entity's script exists are kept per
//! entity and applied when the instance is created.

use paper_core::Uuid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag of a script field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptFieldType {
    Bool,
    Int,
    Float,
    String,
    Entity,
}

impl ScriptFieldType {
    /// Name used in JS field declarations (`static fields = { speed: "float" }`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Entity => "entity",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(Self::Bool),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "string" => Some(Self::String),
            "entity" => Some(Self::Entity),
            _ => None,
        }
    }
}

impl fmt::Display for ScriptFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A field value. Serialized externally tagged, e.g. `{ "float": 2.5 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Another entity, by UUID. [`Uuid::NIL`] stands for "no entity".
    Entity(Uuid),
}

impl ScriptValue {
    pub fn field_type(&self) -> ScriptFieldType {
        match self {
            Self::Bool(_) => ScriptFieldType::Bool,
            Self::Int(_) => ScriptFieldType::Int,
            Self::Float(_) => ScriptFieldType::Float,
            Self::String(_) => ScriptFieldType::String,
            Self::Entity(_) => ScriptFieldType::Entity,
        }
    }
}

/// One declared field of a script class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptField {
    pub name: String,
    pub field_type: ScriptFieldType,
}

impl ScriptField {
    pub fn new(name: impl Into<String>, field_type: ScriptFieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}
