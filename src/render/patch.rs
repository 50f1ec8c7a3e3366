//! Whole-output operations applied after every template is mounted
//!
//! `__override` is deep-merged over the aggregate. `__patch` is a list of
//! `[path, value]` pairs applied in order:
//!
//! ```text
//! [["site/title", "Renamed"],        replace an existing value
//!  ["site/colors/[]", "green"],      push onto an existing list
//!  ["site/grid/[]/[]", 1],           push [1]
//!  ["site/draft"]]                   mark absent
//! ```

use serde_json::Value;
use tracing::debug;

use super::merge::{deep_merge, kind, wrap};
use super::output::Output;
use crate::error::{RenderError, Result};
use crate::path::ARRAY_SEG;

/// Deep-merge an `__override` value over the aggregate
pub fn apply_override(output: &mut Output, value: &Value) -> Result<()> {
    if !value.is_object() {
        return Err(RenderError::InvalidOverride {
            reason: format!("expected an object, got {}", kind(value)),
        });
    }
    debug!("apply override");
    deep_merge(output.value_mut(), value.clone());
    Ok(())
}

/// A single parsed `__patch` entry
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Replace the existing value at a path
    Replace { path: Vec<String>, value: Value },
    /// Mark an existing object key absent
    Remove { path: Vec<String> },
    /// Append to an existing list, wrapped `depth - 1` times
    Push {
        path: Vec<String>,
        depth: usize,
        value: Value,
    },
}

impl PatchOp {
    /// Parse one `[path, value]` or `[path]` entry
    pub fn parse(entry: &Value) -> Result<Self> {
        let (raw, value) = match entry.as_array().map(Vec::as_slice) {
            Some([Value::String(raw)]) => (raw, None),
            Some([Value::String(raw), value]) => (raw, Some(value.clone())),
            _ => {
                return Err(RenderError::invalid_patch(
                    entry.to_string(),
                    "entries must be [path, value] or [path]",
                ))
            }
        };

        if raw.trim().is_empty() {
            return Err(RenderError::invalid_patch(raw.as_str(), "patch path is empty"));
        }
        let segments: Vec<String> = raw.split('/').map(|s| s.trim().to_string()).collect();
        if segments.iter().any(String::is_empty) {
            return Err(RenderError::invalid_patch(raw.as_str(), "patch path has empty segments"));
        }

        let depth = segments.iter().rev().take_while(|s| *s == ARRAY_SEG).count();
        let path: Vec<String> = segments[..segments.len() - depth].to_vec();
        if path.is_empty() {
            return Err(RenderError::invalid_patch(raw.as_str(), "patch path names no key"));
        }
        if path.iter().any(|s| s == ARRAY_SEG) {
            return Err(RenderError::invalid_patch(
                raw.as_str(),
                "'[]' may only appear at the end of a patch path",
            ));
        }

        match (depth, value) {
            (0, Some(value)) => Ok(Self::Replace { path, value }),
            (0, None) => Ok(Self::Remove { path }),
            (depth, Some(value)) => Ok(Self::Push { path, depth, value }),
            (_, None) => Err(RenderError::invalid_patch(raw.as_str(), "a push needs a value")),
        }
    }
}

/// Apply a `__patch` list in order
pub fn apply_patches(output: &mut Output, patches: &Value) -> Result<()> {
    let Value::Array(entries) = patches else {
        return Err(RenderError::invalid_patch(
            "",
            format!("__patch must be a list, got {}", kind(patches)),
        ));
    };
    for entry in entries {
        apply_patch(output, PatchOp::parse(entry)?)?;
    }
    Ok(())
}

/// Apply one patch operation
pub fn apply_patch(output: &mut Output, op: PatchOp) -> Result<()> {
    debug!(?op, "apply patch");
    match op {
        PatchOp::Replace { path, value } => {
            *existing_slot(output.value_mut(), &path)? = value;
            output.clear_absent_under(&path);
        }
        PatchOp::Remove { path } => {
            let parents = &path[..path.len().saturating_sub(1)];
            if matches!(walk(output.value_mut(), parents), Some(Value::Array(_))) {
                return Err(RenderError::invalid_patch(
                    path.join("/"),
                    "list elements cannot be marked absent",
                ));
            }
            let slot = existing_slot(output.value_mut(), &path)?;
            *slot = Value::Null;
            output.clear_absent_under(&path);
            output.mark_absent(path);
        }
        PatchOp::Push { path, depth, value } => {
            let display = format!("{}/{}", path.join("/"), ARRAY_SEG);
            let target = walk(output.value_mut(), &path)
                .ok_or_else(|| RenderError::array_mismatch(display.as_str(), "no list exists at this path"))?;
            let Value::Array(items) = target else {
                return Err(RenderError::array_mismatch(
                    display.as_str(),
                    format!("cannot push onto {}", kind(target)),
                ));
            };
            items.push(wrap(value, depth));
        }
    }
    Ok(())
}

/// Follow object keys and list indices without creating anything
fn walk<'a>(root: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    path.iter().try_fold(root, |current, seg| match current {
        Value::Object(map) => map.get_mut(seg),
        Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    })
}

/// The existing value at `path`, which must already exist
fn existing_slot<'a>(root: &'a mut Value, path: &[String]) -> Result<&'a mut Value> {
    let joined = path.join("/");
    let Some((last, parents)) = path.split_last() else {
        return Err(RenderError::invalid_patch(joined, "patch path is empty"));
    };
    let parent = walk(root, parents)
        .ok_or_else(|| RenderError::invalid_patch(joined.as_str(), "path does not exist"))?;
    match parent {
        Value::Object(map) => map
            .get_mut(last)
            .ok_or_else(|| RenderError::invalid_patch(joined.as_str(), format!("key '{}' does not exist", last))),
        Value::Array(items) => last
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get_mut(i))
            .ok_or_else(|| RenderError::invalid_patch(joined.as_str(), format!("no list element '{}'", last))),
        other => Err(RenderError::invalid_patch(
            joined.as_str(),
            format!("cannot index into {}", kind(other)),
        )),
    }
}
