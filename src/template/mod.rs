//! Template discovery, loading, and composition
//!
//! Templates live in a directory tree. A literal file (`*.json`) is plain
//! data; a function file (`*.gen`) is a generator that may defer calls to
//! other templates. Those calls resolve relative to the caller's directory
//! and to the position they occupy in the returned tree:
//!
//! ```text
//! site.gen                 {"hero": {"$apply": "heroTheme"}}
//! site/hero/heroTheme.json {"accent": "teal"}
//! ```
//!
//! Rendering `site` yields `{"hero": {"accent": "teal"}}`.

mod context;
mod finder;
mod generator;
mod loader;
mod node;
mod resolver;
mod retriever;

pub use context::{SlotContext, TemplateContext};
pub use finder::find;
pub use generator::{CtxField, DirectiveError, Expr};
pub use loader::{Artifact, Declarative, FsLoader, Generator, GeneratorRegistry, RegistryError, TemplateLoader};
pub use node::{Args, Selector, TemplateNode, Thunk, Tools};
pub use resolver::Resolver;
pub use retriever::{retrieve, Retrieved};
