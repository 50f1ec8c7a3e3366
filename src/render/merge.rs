//! Mounting resolved values into the aggregate output

use serde_json::{Map, Value};

use crate::error::{RenderError, Result};
use crate::path::MountAnchor;

/// Merge `incoming` into `target`
///
/// Objects merge key by key; anything else replaces the target.
pub fn deep_merge(target: &mut Value, incoming: Value) {
    match (target, incoming) {
        (Value::Object(existing), Value::Object(incoming)) => merge_objects(existing, incoming),
        (target, incoming) => *target = incoming,
    }
}

/// Merge two objects, later keys winning on conflicts
pub fn merge_objects(target: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match target.get_mut(&key) {
            Some(existing) => deep_merge(existing, value),
            None => {
                target.insert(key, value);
            }
        }
    }
}

/// Merge a template's value at its mount anchor
///
/// A value mounted at the root must be an object.
pub fn merge_at(out: &mut Map<String, Value>, anchor: &MountAnchor, value: Value, id: &str) -> Result<()> {
    let Some((last, parents)) = anchor.keys().split_last() else {
        return match value {
            Value::Object(incoming) => {
                merge_objects(out, incoming);
                Ok(())
            }
            other => Err(RenderError::InvalidAnchor {
                id: id.to_string(),
                reason: format!("a template mounted at the root must return an object, got {}", kind(&other)),
            }),
        };
    };

    let parent = object_at(out, parents).ok_or_else(|| RenderError::InvalidAnchor {
        id: id.to_string(),
        reason: format!("cannot create objects along '{}'", anchor),
    })?;
    match parent.get_mut(last) {
        Some(existing) => deep_merge(existing, value),
        None => {
            parent.insert(last.clone(), value);
        }
    }
    Ok(())
}

/// Append a list contributor's value to the list at its mount anchor
///
/// The value is wrapped in `push_depth - 1` singleton lists first. A missing
/// list is created; any other value in its place is an error.
pub fn push_at(
    out: &mut Map<String, Value>,
    anchor: &MountAnchor,
    value: Value,
    push_depth: usize,
    id: &str,
) -> Result<()> {
    let Some((last, parents)) = anchor.keys().split_last() else {
        return Err(RenderError::array_mismatch(
            id,
            "a list contributor cannot be mounted at the root",
        ));
    };

    let parent = object_at(out, parents).ok_or_else(|| RenderError::InvalidAnchor {
        id: id.to_string(),
        reason: format!("cannot create objects along '{}'", anchor),
    })?;
    let list = parent.entry(last.clone()).or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(items) = list else {
        return Err(RenderError::array_mismatch(
            anchor.to_string(),
            format!("{} is not a list but '{}' contributes to it", kind(list), id),
        ));
    };

    items.push(wrap(value, push_depth));
    Ok(())
}

/// Wrap a value in `depth - 1` singleton lists
pub fn wrap(value: Value, depth: usize) -> Value {
    (1..depth).fold(value, |inner, _| Value::Array(vec![inner]))
}

/// Walk to the object at `keys`, replacing anything in the way with `{}`
fn object_at<'a>(map: &'a mut Map<String, Value>, keys: &[String]) -> Option<&'a mut Map<String, Value>> {
    let Some((first, rest)) = keys.split_first() else {
        return Some(map);
    };
    let slot = map.entry(first.clone()).or_insert(Value::Null);
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    object_at(slot.as_object_mut()?, rest)
}

/// Short name of a JSON value's type, for messages
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
