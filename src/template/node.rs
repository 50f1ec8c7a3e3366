//! Template nodes and composition thunks
//!
//! A generator returns a [`TemplateNode`]: plain JSON with deferred
//! composition calls ([`Thunk`]) allowed at any depth. Thunks carry only a
//! selector and arguments; where they resolve is decided later by the
//! position they end up in.

use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{RenderError, Result};
use crate::path::{SlotPath, TagName, TemplateRef};

/// Arguments passed to a template
pub type Args = Map<String, Value>;

/// A tree produced by a generator, possibly holding pending composition calls
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// A pure value, copied to the output unchanged
    Value(Value),
    /// A deferred composition call
    Apply(Thunk),
    Object(IndexMap<String, TemplateNode>),
    Array(Vec<TemplateNode>),
}

impl TemplateNode {
    /// Build an object node from key/node pairs, keeping their order
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, TemplateNode)>,
    {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Whether the tree still holds a composition call
    pub fn has_thunks(&self) -> bool {
        match self {
            Self::Value(_) => false,
            Self::Apply(_) => true,
            Self::Object(entries) => entries.values().any(Self::has_thunks),
            Self::Array(items) => items.iter().any(Self::has_thunks),
        }
    }

    /// Convert a thunk-free tree into a plain value
    ///
    /// Returns `None` if any composition call remains.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Apply(_) => None,
            Self::Object(entries) => {
                let mut out = Map::new();
                for (key, node) in entries {
                    out.insert(key, node.into_value()?);
                }
                Some(Value::Object(out))
            }
            Self::Array(items) => items
                .into_iter()
                .map(Self::into_value)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
        }
    }
}

impl From<Value> for TemplateNode {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for TemplateNode {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<String> for TemplateNode {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<Thunk> for TemplateNode {
    fn from(thunk: Thunk) -> Self {
        Self::Apply(thunk)
    }
}

impl From<Vec<TemplateNode>> for TemplateNode {
    fn from(items: Vec<TemplateNode>) -> Self {
        Self::Array(items)
    }
}

/// Target of a composition call: `tag` or `group::tag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub group: Option<String>,
    pub tag: TagName,
}

impl Selector {
    /// Parse a selector
    ///
    /// Selectors never contain path separators and never carry a file
    /// extension.
    pub fn parse(raw: &str, config: &Config) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RenderError::invalid_id(raw, "apply selector is empty"));
        }
        if trimmed.contains('/') || trimmed.contains('\\') {
            return Err(RenderError::invalid_id(raw, "apply selector must not contain path separators"));
        }

        let (group, tag) = match trimmed.split_once("::") {
            None => (None, trimmed),
            Some((group, tag)) => {
                let (group, tag) = (group.trim(), tag.trim());
                if group.is_empty() || tag.is_empty() || tag.contains("::") {
                    return Err(RenderError::invalid_id(raw, "invalid group selector syntax"));
                }
                (Some(group.to_string()), tag)
            }
        };

        if tag == "." || tag == ".." {
            return Err(RenderError::invalid_id(raw, "apply selector must not be '.' or '..'"));
        }
        if config.has_reserved_extension(tag) {
            return Err(RenderError::NoExplicitFileTypes { tag: tag.to_string() });
        }

        Ok(Self {
            group,
            tag: TagName::new(tag),
        })
    }

    /// Lookup reference relative to the caller's directory
    ///
    /// The slot path is taken literally as directory names, so a call made
    /// inside a list looks in a `[]` directory.
    pub fn lookup_ref(&self, slot: &SlotPath, config: &Config) -> TemplateRef {
        let mut dir = slot.to_fs_rel();
        if let Some(group) = &self.group {
            dir = dir.child(config.group_dir(group));
        }
        TemplateRef::new(dir, self.tag.clone())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}::{}", group, self.tag),
            None => write!(f, "{}", self.tag),
        }
    }
}

/// A deferred composition call
#[derive(Debug, Clone, PartialEq)]
pub struct Thunk {
    pub selector: Selector,
    pub args: Args,
}

/// Tool-set handed to every generator invocation
#[derive(Debug, Clone, Copy)]
pub struct Tools<'a> {
    config: &'a Config,
}

impl<'a> Tools<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Defer a call to another template with no arguments
    pub fn apply(&self, selector: &str) -> Result<TemplateNode> {
        self.apply_with(selector, Args::new())
    }

    /// Defer a call to another template
    ///
    /// Only the selector is checked here; nothing is looked up until the
    /// returned node is resolved.
    pub fn apply_with(&self, selector: &str, args: Args) -> Result<TemplateNode> {
        let selector = Selector::parse(selector, self.config)?;
        Ok(TemplateNode::Apply(Thunk { selector, args }))
    }
}
