//! tempstack - compose JSON documents from a directory tree of templates
//!
//! Templates are small JSON files (literals) or generator documents
//! (functions) laid out on disk. A template's directory decides where its
//! value lands in the output; group directories (`.dark`) hold variants
//! without changing that location, and `[]` directories collect values into
//! lists. Generators defer calls to other templates, which are resolved by
//! the position the call ends up in.
//!
//! # Example
//!
//! ```rust,no_run
//! use serde_json::json;
//! use tempstack::{render, Args, Config};
//!
//! let config = Config::new().with_template_dir("templates");
//! let mut args = Args::new();
//! args.insert("title".into(), json!("My Site"));
//!
//! let output = render(&config, &["site", "site/style/layout"], &args).unwrap();
//! println!("{}", serde_json::to_string_pretty(&output).unwrap());
//! ```

pub mod config;
pub mod error;
pub mod path;
pub mod render;
pub mod template;

pub use config::{Config, ConfigError, DirKind};
pub use error::{GeneratorError, RenderError, Result};
pub use path::{FsRelPath, MountAnchor, SlotAnchor, SlotPath, TagName, TemplateId, TemplateRef};
pub use render::{render, Engine, Output, OVERRIDE_KEY, PATCH_KEY};
pub use template::{
    Args, Artifact, FsLoader, Generator, GeneratorRegistry, TemplateContext, TemplateLoader, TemplateNode, Tools,
};
