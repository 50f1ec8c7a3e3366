//! The aggregate render result
//!
//! Keys patched to the absence marker stay in memory as `null` and are only
//! dropped when the output is serialized.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Aggregate output of one render
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Output {
    value: Value,
    absent: Vec<Vec<String>>,
}

impl Output {
    pub(crate) fn new(value: Map<String, Value>) -> Self {
        Self {
            value: Value::Object(value),
            absent: Vec::new(),
        }
    }

    /// The in-memory aggregate; absent keys hold `null`
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Whether the `/`-delimited path was patched to absent
    pub fn is_absent(&self, path: &str) -> bool {
        let segments: Vec<&str> = path.split('/').collect();
        self.absent.iter().any(|p| p.iter().map(String::as_str).eq(segments.iter().copied()))
    }

    /// Paths marked absent, `/`-delimited
    pub fn absent_paths(&self) -> impl Iterator<Item = String> + '_ {
        self.absent.iter().map(|p| p.join("/"))
    }

    pub(crate) fn mark_absent(&mut self, path: Vec<String>) {
        if !self.absent.contains(&path) {
            self.absent.push(path);
        }
    }

    /// Forget absence marks at or below `path`
    pub(crate) fn clear_absent_under(&mut self, path: &[String]) {
        self.absent.retain(|p| !p.starts_with(path));
    }

    /// Serialized form, with absent keys removed
    pub fn to_json(&self) -> Value {
        self.clone().into_json()
    }

    /// Consume into the serialized form, with absent keys removed
    pub fn into_json(self) -> Value {
        let mut value = self.value;
        for path in &self.absent {
            remove_path(&mut value, path);
        }
        value
    }
}

impl Serialize for Output {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn remove_path(value: &mut Value, path: &[String]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let parent = parents.iter().try_fold(value, |current, seg| match current {
        Value::Object(map) => map.get_mut(seg),
        Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    });
    if let Some(Value::Object(map)) = parent {
        map.shift_remove(last);
    }
}
