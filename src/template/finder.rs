//! Group-transparent template search
//!
//! Group directories are invisible layers: they never consume an anchor
//! segment, so `config/.dark/feature.json` is found when looking for
//! `feature` under `config`. Once a directory holds an exact hit, its group
//! layers are not searched.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::config::{Config, DirKind};
use crate::error::{RenderError, Result};
use crate::path::{FsRelPath, TagName};

/// Find every file named `tag` (any extension) under `anchor`, looking
/// through group directories
///
/// Hits are relative to `root` and include the file name.
pub fn find(root: &Path, anchor: &FsRelPath, tag: &TagName, config: &Config) -> Result<Vec<FsRelPath>> {
    let mut hits = Vec::new();
    visit(root, FsRelPath::root(), anchor.segments(), tag, config, &mut hits)?;
    debug!(
        root = %root.display(),
        anchor = %anchor,
        tag = %tag,
        hits = hits.len(),
        "find"
    );
    Ok(hits)
}

struct Entry {
    name: String,
    is_dir: bool,
}

fn read_entries(dir: &Path) -> Result<Option<Vec<Entry>>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(RenderError::read_error(dir, e)),
    };

    let mut entries = Vec::new();
    for entry in read {
        let entry = entry.map_err(|e| RenderError::read_error(dir, e))?;
        let is_dir = entry
            .file_type()
            .map_err(|e| RenderError::read_error(entry.path(), e))?
            .is_dir();
        entries.push(Entry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Some(entries))
}

fn visit(
    dir: &Path,
    current: FsRelPath,
    remaining: &[String],
    tag: &TagName,
    config: &Config,
    hits: &mut Vec<FsRelPath>,
) -> Result<()> {
    let Some(entries) = read_entries(dir)? else {
        return Ok(());
    };

    match remaining.split_first() {
        None => {
            let direct: Vec<FsRelPath> = entries
                .iter()
                .filter(|e| !e.is_dir && file_stem(&e.name) == tag.as_str())
                .map(|e| current.child(e.name.clone()))
                .collect();

            if !direct.is_empty() {
                hits.extend(direct);
                return Ok(());
            }

            for entry in entries.iter().filter(|e| e.is_dir) {
                if config.classify(&entry.name) == DirKind::Group {
                    visit(
                        &dir.join(&entry.name),
                        current.child(entry.name.clone()),
                        remaining,
                        tag,
                        config,
                        hits,
                    )?;
                }
            }
        }
        Some((next, rest)) => {
            for entry in entries.iter().filter(|e| e.is_dir) {
                let child_dir = dir.join(&entry.name);
                let child_path = current.child(entry.name.clone());
                if &entry.name == next {
                    visit(&child_dir, child_path, rest, tag, config, hits)?;
                } else if config.classify(&entry.name) == DirKind::Group {
                    visit(&child_dir, child_path, remaining, tag, config, hits)?;
                }
            }
        }
    }

    Ok(())
}

/// File name up to the last `.`
fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}
