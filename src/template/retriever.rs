//! Template retrieval
//!
//! Turns a [`TemplateRef`] into a loaded [`Artifact`]. Exact files under the
//! given root win; otherwise the group-transparent finder must produce
//! exactly one hit.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::finder::find;
use super::loader::{Artifact, TemplateLoader};
use crate::config::Config;
use crate::error::{RenderError, Result};
use crate::path::TemplateRef;

/// A loaded artifact and the file it came from
#[derive(Debug, Clone)]
pub struct Retrieved {
    pub artifact: Artifact,
    pub path: PathBuf,
}

impl Retrieved {
    /// File name of the artifact
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Retrieve the artifact named by `reference` relative to `root`
pub fn retrieve(
    reference: &TemplateRef,
    root: &Path,
    config: &Config,
    loader: &dyn TemplateLoader,
) -> Result<Retrieved> {
    let tag = reference.tag.as_str();
    if config.has_reserved_extension(tag) {
        return Err(RenderError::NoExplicitFileTypes { tag: tag.to_string() });
    }

    let dir = reference.dir.resolve(root);
    let literal = dir.join(config.literal_filename(tag));
    let function = dir.join(config.function_filename(tag));

    match (literal.is_file(), function.is_file()) {
        (true, true) => {
            return Err(RenderError::NoDuplicateTemplates {
                tag: reference.to_string(),
                literal,
                function,
            })
        }
        (true, false) => {
            debug!(reference = %reference, path = %literal.display(), "retrieve: exact literal");
            return load(literal, config, loader);
        }
        (false, true) => {
            debug!(reference = %reference, path = %function.display(), "retrieve: exact function");
            return load(function, config, loader);
        }
        (false, false) => {}
    }

    let hits = find(root, &reference.dir, &reference.tag, config)?;
    match hits.as_slice() {
        [] => Err(RenderError::TemplateNotFound {
            path: reference.to_string(),
            root: root.to_path_buf(),
        }),
        [hit] => {
            debug!(reference = %reference, hit = %hit, "retrieve: group hit");
            load(hit.resolve(root), config, loader)
        }
        _ => Err(RenderError::AmbiguousTemplateName {
            path: reference.to_string(),
            hits: hits.iter().map(ToString::to_string).collect(),
        }),
    }
}

fn load(path: PathBuf, config: &Config, loader: &dyn TemplateLoader) -> Result<Retrieved> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let artifact = if ext == config.literal_ext {
        Artifact::Literal(loader.load_literal(&path)?)
    } else if ext == config.function_ext {
        Artifact::Function(loader.load_function(&path)?)
    } else {
        return Err(RenderError::read_error(&path, "unrecognized template file extension"));
    };
    Ok(Retrieved { artifact, path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{FsRelPath, TagName};
    use crate::template::loader::FsLoader;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn reference(dir: &[&str], tag: &str) -> TemplateRef {
        let dir = dir.iter().fold(FsRelPath::root(), |p, s| p.child(*s));
        TemplateRef::new(dir, TagName::new(tag))
    }

    fn get(root: &Path, dir: &[&str], tag: &str) -> Result<Retrieved> {
        retrieve(&reference(dir, tag), root, &Config::default(), &FsLoader::new())
    }

    #[test]
    fn test_exact_literal() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "site/style/layout.json", r#""compact""#);
        let retrieved = get(tmp.path(), &["site", "style"], "layout").unwrap();
        assert!(matches!(retrieved.artifact, Artifact::Literal(ref v) if v == &json!("compact")));
        assert_eq!(retrieved.filename(), "layout.json");
    }

    #[test]
    fn test_exact_function() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "site.gen", r#"{"name": {"$arg": "name"}}"#);
        let retrieved = get(tmp.path(), &[], "site").unwrap();
        assert!(matches!(retrieved.artifact, Artifact::Function(_)));
    }

    #[test]
    fn test_duplicate_templates() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "site.json", "{}");
        write(tmp.path(), "site.gen", "{}");
        assert_eq!(get(tmp.path(), &[], "site").unwrap_err().code(), "no-duplicate-templates");
    }

    #[test]
    fn test_explicit_extension() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "site.json", "{}");
        assert_eq!(get(tmp.path(), &[], "site.json").unwrap_err().code(), "no-explicit-file-types");
    }

    #[test]
    fn test_group_fallback() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "config/.only/settings.json", r#"{"debug": true}"#);
        let retrieved = get(tmp.path(), &["config"], "settings").unwrap();
        assert!(retrieved.path.ends_with("config/.only/settings.json"));
    }

    #[test]
    fn test_ambiguous_group_hits() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "config/.a/feature.json", "1");
        write(tmp.path(), "config/.b/feature.json", "2");
        let err = get(tmp.path(), &["config"], "feature").unwrap_err();
        assert_eq!(err.code(), "ambiguous-template-name");
        let RenderError::AmbiguousTemplateName { hits, .. } = err else {
            unreachable!()
        };
        assert_eq!(hits, vec!["config/.a/feature.json", "config/.b/feature.json"]);
    }

    #[test]
    fn test_not_found() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(get(tmp.path(), &["nope"], "x").unwrap_err().code(), "template-not-found");
    }

    #[test]
    fn test_unrecognized_extension_hit() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "notes/.a/readme.txt", "hello");
        assert_eq!(get(tmp.path(), &["notes"], "readme").unwrap_err().code(), "unexpected-read-error");
    }
}
