//! Stage PWA artifacts into the bundler's output directory and render
//! the diagnostic tree listing.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

/// One artifact to place into the output directory.
struct Artifact {
    name: &'static str,
    required: bool,
}

/// Artifacts copied after a successful build, in copy order.
/// The icon is best-effort; the manifest and service worker are not.
const ARTIFACTS: &[Artifact] = &[
    Artifact {
        name: "manifest.json",
        required: true,
    },
    Artifact {
        name: "sw.js",
        required: true,
    },
    Artifact {
        name: "vite.svg",
        required: false,
    },
];

/// Cap on file entries shown per directory in the tree listing.
const MAX_TREE_ENTRIES: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("required artifact missing: {0}")]
    MissingSource(PathBuf),
    #[error("failed to copy {name}")]
    Copy {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Copy the artifact set from `project_dir` into `dist_dir`, overwriting
/// same-named files. Returns the names actually copied, in order; the
/// optional icon is skipped silently when absent.
///
/// # Errors
///
/// Returns [`StageError::MissingSource`] when a required artifact is
/// absent from `project_dir`, or [`StageError::Copy`] when a copy fails.
pub fn copy_artifacts(
    project_dir: &Path,
    dist_dir: &Path,
) -> Result<Vec<&'static str>, StageError> {
    let mut copied = Vec::new();
    for artifact in ARTIFACTS {
        let src = project_dir.join(artifact.name);
        if !src.is_file() {
            if artifact.required {
                return Err(StageError::MissingSource(src));
            }
            continue;
        }
        fs::copy(&src, dist_dir.join(artifact.name)).map_err(|source| StageError::Copy {
            name: artifact.name,
            source,
        })?;
        copied.push(artifact.name);
    }
    Ok(copied)
}

/// Render `dir` as an indented tree. Traversal depth is unlimited;
/// each directory shows at most [`MAX_TREE_ENTRIES`] file entries,
/// sorted by name so the output is deterministic.
///
/// # Errors
///
/// Returns an error if a directory cannot be read.
pub fn render_tree(dir: &Path) -> anyhow::Result<String> {
    let name = dir
        .file_name()
        .map_or_else(|| dir.display().to_string(), |n| n.to_string_lossy().into_owned());
    let mut out = String::new();
    render_dir(dir, &name, 0, &mut out)?;
    Ok(out)
}

fn render_dir(dir: &Path, name: &str, depth: usize, out: &mut String) -> anyhow::Result<()> {
    let indent = "  ".repeat(depth);
    let _ = writeln!(out, "{indent}{name}/");

    let mut entries: Vec<fs::DirEntry> = fs::read_dir(dir)
        .with_context(|| format!("failed to read directory {}", dir.display()))?
        .filter_map(Result::ok)
        .collect();
    entries.sort_by_key(fs::DirEntry::file_name);

    let (dirs, files): (Vec<_>, Vec<_>) = entries.into_iter().partition(|e| e.path().is_dir());

    let file_indent = "  ".repeat(depth + 1);
    for entry in files.iter().take(MAX_TREE_ENTRIES) {
        let _ = writeln!(out, "{file_indent}{}", entry.file_name().to_string_lossy());
    }

    for entry in dirs {
        let child_name = entry.file_name().to_string_lossy().into_owned();
        render_dir(&entry.path(), &child_name, depth + 1, out)?;
    }
    Ok(())
}
