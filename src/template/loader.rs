//! Loading template artifacts from disk
//!
//! The engine never decides how a function template is executed; it asks a
//! [`TemplateLoader`]. [`FsLoader`] reads literal files as JSON and function
//! files as declarative generator documents, with `{"$native": "name"}`
//! delegating to Rust closures in a [`GeneratorRegistry`].

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::context::TemplateContext;
use super::generator::{native_name, Expr};
use super::node::{Args, TemplateNode, Tools};
use crate::error::{GeneratorError, RenderError, Result};

/// A callable template
pub trait Generator: Send + Sync {
    fn generate(&self, args: &Args, ctx: &TemplateContext, tools: &Tools<'_>) -> Result<TemplateNode, GeneratorError>;
}

impl<F> Generator for F
where
    F: Fn(&Args, &TemplateContext, &Tools<'_>) -> Result<TemplateNode, GeneratorError> + Send + Sync,
{
    fn generate(&self, args: &Args, ctx: &TemplateContext, tools: &Tools<'_>) -> Result<TemplateNode, GeneratorError> {
        self(args, ctx, tools)
    }
}

impl fmt::Debug for dyn Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Generator(..)")
    }
}

/// A loaded template: either plain data or a generator
#[derive(Clone)]
pub enum Artifact {
    Literal(Value),
    Function(Arc<dyn Generator>),
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Source of template artifacts
pub trait TemplateLoader {
    /// Read a literal data file
    fn load_literal(&self, path: &Path) -> Result<Value>;

    /// Obtain the generator defined by a function file
    fn load_function(&self, path: &Path) -> Result<Arc<dyn Generator>>;
}

/// Errors that can occur when registering generators
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("generator '{0}' is already registered")]
    Duplicate(String),
}

/// Named Rust generators reachable from `{"$native": "name"}` files
#[derive(Default, Clone)]
pub struct GeneratorRegistry {
    generators: HashMap<String, Arc<dyn Generator>>,
}

impl GeneratorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure under a name
    pub fn register<F>(&mut self, name: &str, generator: F) -> Result<(), RegistryError>
    where
        F: Fn(&Args, &TemplateContext, &Tools<'_>) -> Result<TemplateNode, GeneratorError> + Send + Sync + 'static,
    {
        self.register_generator(name, Arc::new(generator))
    }

    /// Register a shared generator under a name
    pub fn register_generator(&mut self, name: &str, generator: Arc<dyn Generator>) -> Result<(), RegistryError> {
        if self.generators.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }
        self.generators.insert(name.to_string(), generator);
        Ok(())
    }

    /// Look up a generator by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Generator>> {
        self.generators.get(name).cloned()
    }

    /// Check if a generator exists
    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Get all registered generator names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.generators.keys().map(String::as_str)
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("GeneratorRegistry").field("generators", &names).finish()
    }
}

/// A generator backed by a parsed generator document
#[derive(Debug)]
pub struct Declarative {
    body: Expr,
}

impl Declarative {
    pub fn new(body: Expr) -> Self {
        Self { body }
    }
}

impl Generator for Declarative {
    fn generate(&self, args: &Args, ctx: &TemplateContext, tools: &Tools<'_>) -> Result<TemplateNode, GeneratorError> {
        self.body.eval(args, ctx, tools)
    }
}

/// Loader reading templates from the filesystem
#[derive(Debug, Default, Clone)]
pub struct FsLoader {
    registry: GeneratorRegistry,
}

impl FsLoader {
    /// Create a loader without native generators
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader resolving `$native` references in `registry`
    pub fn with_registry(registry: GeneratorRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    fn read_json(path: &Path) -> Result<Value> {
        let content = fs::read_to_string(path).map_err(|e| RenderError::read_error(path, e))?;
        serde_json::from_str(&content).map_err(|e| RenderError::read_error(path, format!("invalid JSON: {}", e)))
    }
}

impl TemplateLoader for FsLoader {
    fn load_literal(&self, path: &Path) -> Result<Value> {
        debug!(path = %path.display(), "load literal");
        Self::read_json(path)
    }

    fn load_function(&self, path: &Path) -> Result<Arc<dyn Generator>> {
        debug!(path = %path.display(), "load function");
        let doc = Self::read_json(path)?;
        let invalid = |reason: String| RenderError::InvalidTemplateType {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(name) = native_name(&doc).map_err(|e| invalid(e.to_string()))? {
            return self
                .registry
                .get(name)
                .ok_or_else(|| invalid(format!("no native generator named '{}'", name)));
        }

        let body = Expr::parse(&doc).map_err(|e| invalid(e.to_string()))?;
        Ok(Arc::new(Declarative::new(body)))
    }
}
