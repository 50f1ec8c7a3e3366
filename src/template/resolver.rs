//! Node resolution: turns template trees with composition calls into JSON

use serde_json::{Map, Value};
use tracing::debug;

use super::context::{SlotContext, TemplateContext};
use super::loader::{Artifact, Generator, TemplateLoader};
use super::node::{Args, TemplateNode, Thunk, Tools};
use super::retriever::retrieve;
use crate::config::Config;
use crate::error::{RenderError, Result};
use crate::path::{SlotPath, TemplateRef};

/// Resolves template nodes against one configuration and loader
pub struct Resolver<'a> {
    config: &'a Config,
    loader: &'a dyn TemplateLoader,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a Config, loader: &'a dyn TemplateLoader) -> Self {
        Self { config, loader }
    }

    /// Run a generator and resolve what it returns
    ///
    /// Only the generator's own failure becomes `template-execution-error`;
    /// errors raised while resolving its tree keep their code.
    pub fn run(&self, generator: &dyn Generator, args: &Args, ctx: &TemplateContext) -> Result<Value> {
        let tools = Tools::new(self.config);
        let node = generator
            .generate(args, ctx, &tools)
            .map_err(|source| RenderError::TemplateExecution {
                id: ctx.id.clone(),
                source,
            })?;
        self.resolve(node, ctx, &SlotPath::root())
    }

    /// Resolve a node at `slot` within the tree returned by `ctx`'s template
    pub fn resolve(&self, node: TemplateNode, ctx: &TemplateContext, slot: &SlotPath) -> Result<Value> {
        match node {
            TemplateNode::Value(value) => Ok(value),
            TemplateNode::Apply(thunk) => self.invoke(thunk, &SlotContext::new(ctx, slot.clone())),
            TemplateNode::Array(items) => {
                // list elements share one slot: `[]`, never an index
                let element = slot.push_list();
                items
                    .into_iter()
                    .map(|item| self.resolve(item, ctx, &element))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            TemplateNode::Object(entries) => {
                let mut out = Map::new();
                for (key, child) in entries {
                    // only keys on the way to a composition call become directory names
                    let value = match child {
                        TemplateNode::Value(value) => value,
                        child if !child.has_thunks() => self.resolve(child, ctx, slot)?,
                        child => self.resolve(child, ctx, &slot.push_key(&key)?)?,
                    };
                    out.insert(key, value);
                }
                Ok(Value::Object(out))
            }
        }
    }

    /// Execute a composition call at its final position
    pub fn invoke(&self, thunk: Thunk, slot: &SlotContext<'_>) -> Result<Value> {
        let caller = slot.template;
        let lookup = thunk.selector.lookup_ref(&slot.slot_path, self.config);
        debug!(
            caller = %caller.id,
            selector = %thunk.selector,
            slot = %slot.slot_anchor,
            lookup = %lookup,
            "apply"
        );

        let retrieved = retrieve(&lookup, &caller.dir(), self.config, self.loader)?;
        match retrieved.artifact {
            Artifact::Literal(value) => {
                if !thunk.args.is_empty() {
                    return Err(RenderError::InvalidTemplateArgs {
                        path: lookup.to_string(),
                        args: Value::Object(thunk.args).to_string(),
                    });
                }
                Ok(value)
            }
            Artifact::Function(generator) => {
                let path = caller.path.join(&lookup.dir);
                let id = TemplateRef::new(path.clone(), lookup.tag.clone()).to_string();
                let filename = retrieved
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let ctx = caller.child(
                    id,
                    slot.slot_anchor.to_mount_anchor(),
                    path,
                    filename,
                    self.config.max_depth,
                )?;
                self.run(generator.as_ref(), &thunk.args, &ctx)
            }
        }
    }
}
