// ABOUTME: Serde entry point for entity payloads with path-aware error reporting
// ABOUTME: Maps serde_path_to_error failures onto DeserializationError with the dotted field path

use crate::error::DeserializationError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decode one entity payload. The root must be a JSON object.
pub(crate) fn from_value<T: DeserializeOwned>(
    entity: &'static str,
    payload: &Value,
) -> Result<T, DeserializationError> {
    if !payload.is_object() {
        return Err(DeserializationError::NotAnObject {
            entity,
            field: "$".to_string(),
        });
    }
    serde_path_to_error::deserialize(payload).map_err(|err| classify(entity, &err))
}

fn classify(
    entity: &'static str,
    err: &serde_path_to_error::Error<serde_json::Error>,
) -> DeserializationError {
    let path = match err.path().to_string() {
        root if root == "." => String::new(),
        path => path,
    };
    let message = err.inner().to_string();

    // missing_field is reported at the enclosing object
    if let Some(key) = message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.strip_suffix('`'))
    {
        let field = if path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", path, key)
        };
        return DeserializationError::MissingField { entity, field };
    }

    let field = if path.is_empty() { "$".to_string() } else { path };
    let is_null =
        message.starts_with("invalid type: null") || message.starts_with("invalid type: unit value");
    if is_null {
        DeserializationError::MissingField { entity, field }
    } else if message.contains("expected struct ") {
        DeserializationError::NotAnObject { entity, field }
    } else {
        DeserializationError::InvalidType {
            entity,
            field,
            reason: message,
        }
    }
}

/// JSON `null` decodes like an absent key
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
