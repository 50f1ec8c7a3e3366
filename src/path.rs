//! Path kinds used by the engine
//!
//! Four addressing schemes coexist and must never be confused:
//!
//! - [`FsRelPath`]: real directory names relative to some directory on disk.
//!   May contain group, hidden, and `[]` segments.
//! - [`MountAnchor`]: object keys locating a value in the output. Never
//!   contains `[]` or group/hidden segments.
//! - [`SlotPath`]: position of a node inside one template's returned tree,
//!   using [`SlotSeg::List`] whenever a list is descended into.
//! - [`SlotAnchor`]: a mount anchor followed by a slot path.
//!
//! [`TemplateId`] is the user-facing logical id. Conversions between the
//! kinds are explicit and one-directional.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::{Config, DirKind};
use crate::error::{RenderError, Result};

/// Directory name and slot marker for list positions
pub const ARRAY_SEG: &str = "[]";

/// A validated, `/`-delimited logical template id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateId {
    raw: String,
    dir: FsRelPath,
    tag: TagName,
}

impl TemplateId {
    /// Parse and validate a template id
    ///
    /// Rejects empty ids, empty segments, and `.`/`..` segments.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RenderError::invalid_id(raw, "template id is empty"));
        }

        let mut segments: Vec<String> = trimmed.split('/').map(|s| s.trim().to_string()).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(RenderError::invalid_id(raw, "template id has empty segments"));
        }
        if segments.iter().any(|s| s == "." || s == "..") {
            return Err(RenderError::invalid_id(raw, "template id must not contain '.' or '..'"));
        }
        if segments.iter().any(|s| s.contains('\\')) {
            return Err(RenderError::invalid_id(raw, "template id must not contain '\\'"));
        }

        let tag = segments.pop().unwrap_or_default();
        Ok(Self {
            raw: trimmed.to_string(),
            dir: FsRelPath::from_segments(segments),
            tag: TagName(tag),
        })
    }

    /// The id as given (trimmed)
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Split into the directory part and the tag
    pub fn to_ref(&self) -> TemplateRef {
        TemplateRef::new(self.dir.clone(), self.tag.clone())
    }
}

impl FromStr for TemplateId {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A template's file name without extension
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagName(String);

impl TagName {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directory names relative to some directory on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FsRelPath(Vec<String>);

impl FsRelPath {
    /// The empty relative path
    pub fn root() -> Self {
        Self::default()
    }

    pub(crate) fn from_segments(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append one directory name
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }

    /// Concatenate two relative paths
    pub fn join(&self, other: &FsRelPath) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }

    /// Resolve against a base directory
    pub fn resolve(&self, base: &Path) -> PathBuf {
        let mut path = base.to_path_buf();
        for seg in &self.0 {
            path.push(seg);
        }
        path
    }

    /// Segments that remain after dropping group and hidden directories
    pub fn logical_segments<'a>(&'a self, config: &'a Config) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .map(String::as_str)
            .filter(move |seg| !matches!(config.classify(seg), DirKind::Group | DirKind::Hidden))
    }
}

impl fmt::Display for FsRelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// A (directory, tag) pair naming exactly one template artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRef {
    pub dir: FsRelPath,
    pub tag: TagName,
}

impl TemplateRef {
    pub fn new(dir: FsRelPath, tag: TagName) -> Self {
        Self { dir, tag }
    }
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dir.is_empty() {
            write!(f, "{}", self.tag)
        } else {
            write!(f, "{}/{}", self.dir, self.tag)
        }
    }
}

/// Object-key path where a value is mounted in the output
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MountAnchor(Vec<String>);

impl MountAnchor {
    /// The output root
    pub fn root() -> Self {
        Self::default()
    }

    /// Derive the mount anchor of a template directory
    ///
    /// Group and hidden segments are dropped, then the path is cut at the
    /// first `[]`.
    pub fn derive(dir: &FsRelPath, config: &Config) -> Self {
        Self(
            dir.logical_segments(config)
                .take_while(|seg| *seg != ARRAY_SEG)
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn keys(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MountAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// How a template in a `[]` directory contributes to its list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListContribution {
    /// Number of consecutive `[]` segments starting at the first one
    pub push_depth: usize,
}

impl ListContribution {
    /// `None` when the directory has no `[]` segment after dropping
    /// group and hidden directories
    pub fn derive(dir: &FsRelPath, config: &Config) -> Option<Self> {
        let push_depth = dir
            .logical_segments(config)
            .skip_while(|seg| *seg != ARRAY_SEG)
            .take_while(|seg| *seg == ARRAY_SEG)
            .count();
        (push_depth > 0).then_some(Self { push_depth })
    }
}

/// One step of a slot path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotSeg {
    Key(String),
    /// Any element of a list; positions are never numbered
    List,
}

impl SlotSeg {
    pub fn as_str(&self) -> &str {
        match self {
            SlotSeg::Key(key) => key,
            SlotSeg::List => ARRAY_SEG,
        }
    }
}

/// Position of a node inside one template's returned tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SlotPath(Vec<SlotSeg>);

impl SlotPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[SlotSeg] {
        &self.0
    }

    /// Descend into an object entry
    ///
    /// The key becomes a directory name during lookup, so it must be a single
    /// plain segment: not empty, not `.` or `..`, and free of separators.
    pub fn push_key(&self, key: &str) -> Result<Self> {
        if key.is_empty() {
            return Err(RenderError::invalid_id(key, "slot key is empty"));
        }
        if key == "." || key == ".." {
            return Err(RenderError::invalid_id(key, "slot key must not be '.' or '..'"));
        }
        if key.contains('/') || key.contains('\\') || Path::new(key).is_absolute() {
            return Err(RenderError::invalid_id(key, "slot key must not contain path separators"));
        }
        let mut segments = self.0.clone();
        segments.push(SlotSeg::Key(key.to_string()));
        Ok(Self(segments))
    }

    /// Descend into a list element
    pub fn push_list(&self) -> Self {
        let mut segments = self.0.clone();
        segments.push(SlotSeg::List);
        Self(segments)
    }

    /// Interpret the slot literally as directory names, `[]` included
    pub fn to_fs_rel(&self) -> FsRelPath {
        FsRelPath(self.0.iter().map(|seg| seg.as_str().to_string()).collect())
    }
}

impl fmt::Display for SlotPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.0.iter().map(SlotSeg::as_str).collect();
        f.write_str(&parts.join("/"))
    }
}

/// Absolute logical address of a slot: mount anchor followed by slot path
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SlotAnchor(Vec<SlotSeg>);

impl SlotAnchor {
    pub fn new(anchor: &MountAnchor, slot: &SlotPath) -> Self {
        let mut segments: Vec<SlotSeg> = anchor.0.iter().cloned().map(SlotSeg::Key).collect();
        segments.extend(slot.0.iter().cloned());
        Self(segments)
    }

    pub fn segments(&self) -> &[SlotSeg] {
        &self.0
    }

    /// Keys before the first list position
    pub fn to_mount_anchor(&self) -> MountAnchor {
        MountAnchor(
            self.0
                .iter()
                .map_while(|seg| match seg {
                    SlotSeg::Key(key) => Some(key.clone()),
                    SlotSeg::List => None,
                })
                .collect(),
        )
    }
}

impl fmt::Display for SlotAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.0.iter().map(SlotSeg::as_str).collect();
        f.write_str(&parts.join("/"))
    }
}
