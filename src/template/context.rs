//! Execution contexts for templates and the slots inside their output

use std::path::PathBuf;

use crate::error::{RenderError, Result};
use crate::path::{FsRelPath, MountAnchor, SlotAnchor, SlotPath};

/// Context of one executing template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    /// Logical id, for diagnostics
    pub id: String,
    /// Object-key path the template's value is mounted under
    pub anchor: MountAnchor,
    /// Template root directory
    pub template_dir: PathBuf,
    /// Real directory of this template, relative to the root
    pub path: FsRelPath,
    /// File the template was loaded from
    pub filename: String,
    depth: usize,
    lineage: Vec<String>,
}

impl TemplateContext {
    /// Context for a top-level template
    pub fn root(
        id: impl Into<String>,
        anchor: MountAnchor,
        template_dir: impl Into<PathBuf>,
        path: FsRelPath,
        filename: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            lineage: vec![id.clone()],
            id,
            anchor,
            template_dir: template_dir.into(),
            path,
            filename: filename.into(),
            depth: 0,
        }
    }

    /// Context for a template invoked through a composition call
    ///
    /// Fails once the chain of nested calls grows past `max_depth`.
    pub fn child(
        &self,
        id: impl Into<String>,
        anchor: MountAnchor,
        path: FsRelPath,
        filename: impl Into<String>,
        max_depth: usize,
    ) -> Result<Self> {
        let id = id.into();
        let mut lineage = self.lineage.clone();
        lineage.push(id.clone());

        if self.depth + 1 > max_depth {
            return Err(RenderError::RecursionLimit {
                limit: max_depth,
                chain: lineage,
            });
        }

        Ok(Self {
            id,
            anchor,
            template_dir: self.template_dir.clone(),
            path,
            filename: filename.into(),
            depth: self.depth + 1,
            lineage,
        })
    }

    /// Number of composition calls between the top-level template and this one
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Ids from the top-level template down to this one
    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    /// Absolute directory of this template
    pub fn dir(&self) -> PathBuf {
        self.path.resolve(&self.template_dir)
    }
}

/// Position of a node being resolved inside one template's returned tree
#[derive(Debug, Clone)]
pub struct SlotContext<'a> {
    pub template: &'a TemplateContext,
    pub slot_path: SlotPath,
    pub slot_anchor: SlotAnchor,
}

impl<'a> SlotContext<'a> {
    pub fn new(template: &'a TemplateContext, slot_path: SlotPath) -> Self {
        let slot_anchor = SlotAnchor::new(&template.anchor, &slot_path);
        Self {
            template,
            slot_path,
            slot_anchor,
        }
    }
}
