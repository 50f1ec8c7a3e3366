//! Rendering a set of templates into one aggregate output
//!
//! Each template id is retrieved from the template root, resolved, and
//! mounted where its directory places it. Directories named `[]` turn a
//! template into a list contributor. After every id is processed the
//! reserved `__override` and `__patch` arguments are applied.

mod merge;
mod output;
mod patch;

pub use merge::{deep_merge, merge_at, merge_objects, push_at};
pub use output::Output;
pub use patch::{apply_override, apply_patch, apply_patches, PatchOp};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::path::{ListContribution, MountAnchor, TemplateId};
use crate::template::{retrieve, Args, Artifact, FsLoader, Resolver, TemplateContext, TemplateLoader};

/// Argument deep-merged over the whole output
pub const OVERRIDE_KEY: &str = "__override";

/// Argument holding `[path, value]` patch entries
pub const PATCH_KEY: &str = "__patch";

/// A configured renderer
pub struct Engine {
    config: Config,
    loader: Box<dyn TemplateLoader>,
}

impl Engine {
    /// Create an engine reading templates with [`FsLoader`]
    pub fn new(config: Config) -> Self {
        Self::with_loader(config, FsLoader::new())
    }

    /// Create an engine with a custom template loader
    pub fn with_loader(config: Config, loader: impl TemplateLoader + 'static) -> Self {
        Self {
            config,
            loader: Box::new(loader),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Render template ids in order into one output
    ///
    /// Every failure aborts the whole render.
    pub fn render<S: AsRef<str>>(&self, ids: &[S], args: &Args) -> Result<Output> {
        let ids = ids
            .iter()
            .map(|id| TemplateId::parse(id.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut out = Map::new();
        for id in &ids {
            self.render_one(id, args, &mut out)?;
        }

        let mut output = Output::new(out);
        if let Some(value) = args.get(OVERRIDE_KEY) {
            apply_override(&mut output, value)?;
        }
        if let Some(patches) = args.get(PATCH_KEY) {
            apply_patches(&mut output, patches)?;
        }

        info!(
            templates = ids.len(),
            root = %self.config.template_dir.display(),
            "Rendered templates"
        );
        Ok(output)
    }

    fn render_one(&self, id: &TemplateId, args: &Args, out: &mut Map<String, Value>) -> Result<()> {
        let root = &self.config.template_dir;
        let reference = id.to_ref();
        let retrieved = retrieve(&reference, root, &self.config, self.loader.as_ref())?;

        let anchor = MountAnchor::derive(&reference.dir, &self.config);
        let contribution = ListContribution::derive(&reference.dir, &self.config);

        let value = match &retrieved.artifact {
            Artifact::Literal(value) => value.clone(),
            Artifact::Function(generator) => {
                let ctx = TemplateContext::root(
                    id.as_str(),
                    anchor.clone(),
                    root.clone(),
                    reference.dir.clone(),
                    retrieved.filename(),
                );
                Resolver::new(&self.config, self.loader.as_ref()).run(generator.as_ref(), args, &ctx)?
            }
        };

        match contribution {
            None => {
                debug!(id = %id, anchor = %anchor, "mount");
                merge_at(out, &anchor, value, id.as_str())
            }
            Some(ListContribution { push_depth }) => {
                debug!(id = %id, anchor = %anchor, push_depth, "push");
                push_at(out, &anchor, value, push_depth, id.as_str())
            }
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("config", &self.config).finish_non_exhaustive()
    }
}

/// Render with the default filesystem loader
pub fn render<S: AsRef<str>>(config: &Config, ids: &[S], args: &Args) -> Result<Output> {
    Engine::new(config.clone()).render(ids, args)
}
