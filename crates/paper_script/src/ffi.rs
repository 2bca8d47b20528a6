//! FFI layer between Rust and scripts
//!
//! UUIDs cross into JavaScript as 16-digit hex strings: JS numbers cannot
//! hold every `u64` exactly.

use paper_core::Uuid;

/// JS form of [`Uuid::NIL`].
pub const NIL_JS: &str = "0000000000000000";

pub fn uuid_to_js(uuid: Uuid) -> String {
    uuid.to_string()
}

/// Malformed input maps to [`Uuid::NIL`], which every lookup treats as
/// "no entity".
pub fn uuid_from_js(text: &str) -> Uuid {
    text.parse().unwrap_or(Uuid::NIL)
}

/// Whether `name` is a dotted path of JS identifiers (`Player`,
/// `Game.Enemies.Boss`). Only such names are ever spliced into JS source.
pub fn is_class_path(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_marshalling() {
        assert_eq!(uuid_to_js(Uuid::NIL), NIL_JS);
        assert_eq!(uuid_from_js(&uuid_to_js(Uuid::from_raw(42))), Uuid::from_raw(42));
        assert_eq!(uuid_from_js("not a uuid"), Uuid::NIL);
        assert_eq!(uuid_from_js(""), Uuid::NIL);
    }

    #[test]
    fn class_paths() {
        assert!(is_class_path("Player"));
        assert!(is_class_path("Game.Enemies.Boss"));
        assert!(is_class_path("_private$1"));
        assert!(!is_class_path(""));
        assert!(!is_class_path("1Player"));
        assert!(!is_class_path("Game..Boss"));
        assert!(!is_class_path("Player; alert(1)"));
        assert!(!is_class_path("Player()"));
    }
}
