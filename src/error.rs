//! Error taxonomy for retrieval, composition, and rendering
//!
//! Every variant is fatal to the render that raised it. The kebab-case
//! [`RenderError::code`] is stable and leads each rendered message.

use std::path::PathBuf;

use thiserror::Error;

/// Error type produced by a generator body
pub type GeneratorError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = RenderError> = std::result::Result<T, E>;

/// Errors that can occur while rendering a set of templates
#[derive(Debug, Error)]
pub enum RenderError {
    /// Malformed template id or apply selector
    #[error("invalid-template-id: '{id}': {reason}")]
    InvalidTemplateId { id: String, reason: String },

    /// A tag carried one of the reserved file extensions
    #[error("no-explicit-file-types: template tag must not include a file extension: '{tag}'")]
    NoExplicitFileTypes { tag: String },

    /// Both a literal and a function file exist for the same tag
    #[error(
        "no-duplicate-templates: '{tag}' resolves to both {} and {}",
        literal.display(),
        function.display()
    )]
    NoDuplicateTemplates {
        tag: String,
        literal: PathBuf,
        function: PathBuf,
    },

    /// No file matched the reference, directly or through group layers
    #[error("template-not-found: '{path}' under {}", root.display())]
    TemplateNotFound { path: String, root: PathBuf },

    /// Implicit group lookup matched more than one file
    #[error("ambiguous-template-name: '{path}' matches {}", hits.join(", "))]
    AmbiguousTemplateName { path: String, hits: Vec<String> },

    /// A function file did not yield a callable generator
    #[error("invalid-template-type: {}: {reason}", path.display())]
    InvalidTemplateType { path: PathBuf, reason: String },

    /// Arguments were passed to a literal template
    #[error("invalid-template-args: literal template '{path}' called with args: {args}")]
    InvalidTemplateArgs { path: String, args: String },

    /// The generator itself failed
    #[error("template-execution-error: template '{id}' failed: {source}")]
    TemplateExecution {
        id: String,
        #[source]
        source: GeneratorError,
    },

    /// A value cannot be mounted where its id places it
    #[error("invalid-anchor: '{id}': {reason}")]
    InvalidAnchor { id: String, reason: String },

    /// A list operation met something that is not a list
    #[error("array-type-mismatch: '{path}': {reason}")]
    ArrayTypeMismatch { path: String, reason: String },

    /// Reading or parsing a template file failed
    #[error("unexpected-read-error: {}: {reason}", path.display())]
    UnexpectedRead { path: PathBuf, reason: String },

    /// The `__override` argument is unusable
    #[error("invalid-override: {reason}")]
    InvalidOverride { reason: String },

    /// A `__patch` entry is malformed or targets a missing location
    #[error("invalid-patch: '{path}': {reason}")]
    InvalidPatch { path: String, reason: String },

    /// Composition calls nested deeper than the configured limit
    #[error("recursion-limit-exceeded: depth {limit} exceeded: {}", chain.join(" -> "))]
    RecursionLimit { limit: usize, chain: Vec<String> },
}

impl RenderError {
    /// The stable taxonomy code of this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTemplateId { .. } => "invalid-template-id",
            Self::NoExplicitFileTypes { .. } => "no-explicit-file-types",
            Self::NoDuplicateTemplates { .. } => "no-duplicate-templates",
            Self::TemplateNotFound { .. } => "template-not-found",
            Self::AmbiguousTemplateName { .. } => "ambiguous-template-name",
            Self::InvalidTemplateType { .. } => "invalid-template-type",
            Self::InvalidTemplateArgs { .. } => "invalid-template-args",
            Self::TemplateExecution { .. } => "template-execution-error",
            Self::InvalidAnchor { .. } => "invalid-anchor",
            Self::ArrayTypeMismatch { .. } => "array-type-mismatch",
            Self::UnexpectedRead { .. } => "unexpected-read-error",
            Self::InvalidOverride { .. } => "invalid-override",
            Self::InvalidPatch { .. } => "invalid-patch",
            Self::RecursionLimit { .. } => "recursion-limit-exceeded",
        }
    }

    /// Create an invalid template id error
    pub fn invalid_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTemplateId {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an array type mismatch error
    pub fn array_mismatch(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ArrayTypeMismatch {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid patch error
    pub fn invalid_patch(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPatch {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an unexpected read error
    pub fn read_error(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::UnexpectedRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Walk the source chain down to the innermost render error
    ///
    /// Generators often fail because a nested `apply` failed; this recovers
    /// that nested error from inside a `template-execution-error`.
    pub fn root_cause(&self) -> &RenderError {
        let mut current = self;
        while let Self::TemplateExecution { source, .. } = current {
            match source.downcast_ref::<RenderError>() {
                Some(inner) => current = inner,
                None => break,
            }
        }
        current
    }
}
