//! Request body decoding.
//!
//! The body is decoded before any other source so that query, path, header
//! and cookie values override what the body set.

use crate::RequestContext;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::map::Entry;
use serde_json::Value;
use std::error::Error;

/// Default maximum body size accepted by a binder (1 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Decodes a request body into the bind target.
pub trait BodyDecoder<T>: Send + Sync {
    /// Returns true if this decoder handles the request's body.
    fn accepts(&self, request: &RequestContext) -> bool;

    /// Decodes `body` into `target`.
    fn decode(&self, body: &[u8], target: &mut T) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Decodes `application/json` bodies with `serde_json`.
///
/// The body is decoded into the existing target: members present in the
/// JSON object overwrite the matching fields, nested objects merge member by
/// member, and fields the body does not mention keep their current values.
/// A `null` body leaves the target unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody;

impl<T: Serialize + DeserializeOwned> BodyDecoder<T> for JsonBody {
    fn accepts(&self, request: &RequestContext) -> bool {
        is_json(request.content_type())
    }

    fn decode(&self, body: &[u8], target: &mut T) -> Result<(), Box<dyn Error + Send + Sync>> {
        let incoming: Value = serde_json::from_slice(body)?;
        if incoming.is_null() {
            return Ok(());
        }

        let mut current = serde_json::to_value(&*target)?;
        merge(&mut current, incoming);
        *target = serde_json::from_value(current)?;
        Ok(())
    }
}

/// Lays `incoming` over `current`. Objects merge key by key; any other value
/// replaces what was there.
fn merge(current: &mut Value, incoming: Value) {
    match (current, incoming) {
        (Value::Object(current), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match current.entry(key) {
                    Entry::Occupied(mut slot) if !value.is_null() => merge(slot.get_mut(), value),
                    Entry::Occupied(mut slot) => {
                        slot.insert(value);
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(value);
                    }
                }
            }
        }
        (current, incoming) => *current = incoming,
    }
}

/// Returns true if `content_type` names JSON, ignoring parameters such as
/// `charset`.
pub(crate) fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .is_some_and(|m| m.essence_str() == mime::APPLICATION_JSON.essence_str())
}

/// Returns true if `body` has no content other than whitespace.
pub(crate) fn is_blank(body: &[u8]) -> bool {
    body.iter().all(u8::is_ascii_whitespace)
}
