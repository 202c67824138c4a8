use crate::error::{ParityError, Result, ResultExt};
use crate::model::RelPath;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Directory name of the scratch area inside the working area.
pub const STAGING_DIR: &str = "staging";

/// Local preparation of upload source material.
///
/// Paths are relative to the staging area; `.` and `..` segments are
/// rejected so an action can never escape it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StagingAction {
    /// Copy a reference-tree entry into the staging directory `into`,
    /// keeping its name. The reference tree is only read.
    CopyFromReference { from: String, into: String },
    /// Create an empty file unless it already exists.
    Touch { path: String },
    /// Create or replace a file with `contents`.
    WriteFile { path: String, contents: String },
    /// Remove a file or directory; absent paths are fine.
    Remove { path: String },
}

/// The scratch area (`<workdir>/staging`).
#[derive(Debug, Clone)]
pub struct Staging {
    root: PathBuf,
}

impl Staging {
    /// # Errors
    ///
    /// Returns an I/O error when the staging directory cannot be created.
    pub fn open(workdir: &Path) -> Result<Self> {
        let root = workdir.join(STAGING_DIR);
        fs::create_dir_all(&root).with_context(|| format!("creating {}", root.display()))?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Apply `action`, reading reference entries from `reference_root`.
    ///
    /// # Errors
    ///
    /// Returns [`ParityError::InvalidOperation`] for paths that leave the
    /// staging area or a missing reference entry, or an I/O error.
    pub fn apply(&self, action: &StagingAction, reference_root: &Path) -> Result<()> {
        debug!(?action, "staging");
        match action {
            StagingAction::CopyFromReference { from, into } => {
                let from = contained(from)?;
                let name = from
                    .name()
                    .ok_or_else(|| ParityError::invalid_operation("cannot stage the reference root"))?
                    .to_string();
                let source = from.to_fs_path(reference_root);
                if !source.exists() {
                    return Err(ParityError::invalid_operation(format!(
                        "reference entry not found: {from}"
                    )));
                }
                let dest_dir = contained(into)?.to_fs_path(&self.root);
                fs::create_dir_all(&dest_dir).with_context(|| format!("creating {}", dest_dir.display()))?;
                copy_tree(&source, &dest_dir.join(name))
            }
            StagingAction::Touch { path } => {
                let target = self.prepare_file(path)?;
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&target)
                    .with_context(|| format!("touching {}", target.display()))?;
                Ok(())
            }
            StagingAction::WriteFile { path, contents } => {
                let target = self.prepare_file(path)?;
                fs::write(&target, contents).with_context(|| format!("writing {}", target.display()))
            }
            StagingAction::Remove { path } => {
                let target = contained(path)?.to_fs_path(&self.root);
                remove_path(&target)
            }
        }
    }

    /// Remove everything in the staging area.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the area cannot be emptied.
    pub fn clear(&self) -> Result<()> {
        remove_path(&self.root)?;
        fs::create_dir_all(&self.root).with_context(|| format!("creating {}", self.root.display()))
    }

    fn prepare_file(&self, path: &str) -> Result<PathBuf> {
        let relative = contained(path)?;
        if relative.is_root() {
            return Err(ParityError::invalid_operation("staging file path is empty"));
        }
        let target = relative.to_fs_path(&self.root);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        Ok(target)
    }
}

fn contained(path: &str) -> Result<RelPath> {
    let relative = RelPath::parse(path);
    if relative.segments().iter().any(|s| s == "." || s == "..") {
        return Err(ParityError::invalid_operation(format!(
            "staging path must stay inside the staging area: {path}"
        )));
    }
    Ok(relative)
}

fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.with_context(|| format!("walking {}", source.display()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .with_context(|| format!("relativizing {}", entry.path().display()))?;
        let target = if relative.as_os_str().is_empty() {
            dest.to_path_buf()
        } else {
            dest.join(relative)
        };
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).with_context(|| format!("creating {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| format!("copying to {}", target.display()))?;
        }
    }
    Ok(())
}

fn remove_path(path: &Path) -> Result<()> {
    let removed = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match removed {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("removing {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_from_reference_keeps_name() {
        let temp = TempDir::new().unwrap();
        let reference = temp.path().join("reference");
        fs::create_dir_all(reference.join("01/s01/ss01")).unwrap();
        let staging = Staging::open(temp.path()).unwrap();

        staging
            .apply(
                &StagingAction::CopyFromReference {
                    from: "01".to_string(),
                    into: String::new(),
                },
                &reference,
            )
            .unwrap();
        assert!(staging.root().join("01/s01/ss01").is_dir());
        assert!(reference.join("01/s01/ss01").is_dir());
    }

    #[test]
    fn test_touch_and_write() {
        let temp = TempDir::new().unwrap();
        let staging = Staging::open(temp.path()).unwrap();
        let reference = temp.path().join("reference");

        staging
            .apply(
                &StagingAction::Touch {
                    path: "01/s01/another.txt".to_string(),
                },
                &reference,
            )
            .unwrap();
        staging
            .apply(
                &StagingAction::WriteFile {
                    path: "file01nonempty.txt".to_string(),
                    contents: "newfile01contents".to_string(),
                },
                &reference,
            )
            .unwrap();

        assert_eq!(fs::metadata(staging.root().join("01/s01/another.txt")).unwrap().len(), 0);
        assert_eq!(
            fs::read_to_string(staging.root().join("file01nonempty.txt")).unwrap(),
            "newfile01contents"
        );
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let temp = TempDir::new().unwrap();
        let staging = Staging::open(temp.path()).unwrap();
        let err = staging
            .apply(
                &StagingAction::WriteFile {
                    path: "../reference/oops".to_string(),
                    contents: String::new(),
                },
                temp.path(),
            )
            .unwrap_err();
        assert!(matches!(err, ParityError::InvalidOperation { .. }));
        assert!(!temp.path().join("reference/oops").exists());
    }

    #[test]
    fn test_clear_and_remove() {
        let temp = TempDir::new().unwrap();
        let staging = Staging::open(temp.path()).unwrap();
        fs::create_dir_all(staging.root().join("a/b")).unwrap();
        staging
            .apply(&StagingAction::Remove { path: "a".to_string() }, temp.path())
            .unwrap();
        staging
            .apply(&StagingAction::Remove { path: "missing".to_string() }, temp.path())
            .unwrap();
        fs::write(staging.root().join("x"), "").unwrap();
        staging.clear().unwrap();
        assert_eq!(fs::read_dir(staging.root()).unwrap().count(), 0);
    }
}
