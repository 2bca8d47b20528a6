use crate::field::ScriptFieldType;
use paper_core::{SceneError, Uuid};
use thiserror::Error;

/// Errors surfaced by the scripting layer.
///
/// Plain not-found results (missing component, unknown name, no script
/// bound) are not errors; they come back as `None` / `false`.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("no script host is installed on this thread")]
    NoHost,

    #[error("entity {0} is not live in the host")]
    StaleHandle(Uuid),

    #[error("entity {0} has no script class bound")]
    NoScriptClass(Uuid),

    #[error("entity {0} has no script instance")]
    NoInstance(Uuid),

    #[error("script class '{0}' is not registered")]
    UnknownClass(String),

    #[error("script class '{0}' is already registered")]
    DuplicateClass(String),

    #[error("'{0}' is not a valid script class name")]
    InvalidClassName(String),

    #[error("script class '{class}' has no field '{field}'")]
    UnknownField { class: String, field: String },

    #[error("field '{field}' is {expected}, got {found}")]
    FieldTypeMismatch {
        field: String,
        expected: ScriptFieldType,
        found: ScriptFieldType,
    },

    #[error("invalid field declaration: {0}")]
    InvalidField(String),

    #[error("script instance of entity {0} is busy running a hook")]
    InstanceBusy(Uuid),

    #[error("script runtime is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("script runtime was dropped")]
    RuntimeDropped,

    #[error("JavaScript exception: {0}")]
    JsException(String),

    #[error("JavaScript engine error: {0}")]
    Js(#[from] rquickjs::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
