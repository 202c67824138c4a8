//! Independent local replication of remote commands.
//!
//! The [`MirrorEngine`] owns the reference tree (`<workdir>/reference`) and
//! is the only component that mutates it. Every operation encodes the
//! intended contract of the remote command family, derived from the
//! arguments alone; nothing here consults the remote side.

use crate::error::{OptionExt, ParityError, Result, ResultExt};
use crate::model::{EntryKind, Operation, PatternMode, RelPath, TreeSnapshot};
use crate::pattern::{self, Location};
use crate::snapshot::snapshot_local;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directory name of the reference tree inside the working area.
pub const REFERENCE_DIR: &str = "reference";

/// Outcome of a mirrored delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub removed: Vec<RelPath>,
    /// Matched but left in place (the root, or a non-empty directory
    /// without `recursive`).
    pub skipped: Vec<RelPath>,
}

/// Owner of the reference tree and the mirrored current position.
#[derive(Debug)]
pub struct MirrorEngine {
    workdir: PathBuf,
    root: PathBuf,
    cwd: RelPath,
}

impl MirrorEngine {
    /// Open (creating if needed) the reference tree under `workdir`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the reference directory cannot be created.
    pub fn open(workdir: &Path) -> Result<Self> {
        let root = workdir.join(REFERENCE_DIR);
        fs::create_dir_all(&root).with_context(|| format!("creating {}", root.display()))?;
        Ok(Self {
            workdir: workdir.to_path_buf(),
            root,
            cwd: RelPath::root(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn cwd(&self) -> &RelPath {
        &self.cwd
    }

    /// Canonical snapshot of the reference tree.
    ///
    /// # Errors
    ///
    /// Returns an error when the tree cannot be walked.
    pub fn snapshot(&self) -> Result<TreeSnapshot> {
        snapshot_local(&self.root)
    }

    /// Apply the local equivalent of `op`.
    ///
    /// # Errors
    ///
    /// Returns the error of the matching operation.
    pub fn apply(&mut self, op: &Operation) -> Result<()> {
        op.validate()?;
        debug!(op = %op, cwd = %self.cwd, "mirroring operation");
        match op {
            Operation::Upload {
                sources,
                destination,
                create,
            } => self.upload(sources, destination.as_deref(), *create),
            Operation::Delete {
                targets,
                recursive,
                mode,
            } => self.delete(targets, *recursive, *mode).map(|_| ()),
            Operation::ChangeDirectory { path } => self.change_directory(path),
            Operation::MakeDirectories { paths } => self.make_directories(paths),
        }
    }

    /// Copy working-area relative `sources` to `destination` (the current
    /// position when `None`).
    ///
    /// An existing directory receives every source under its own name,
    /// merging directories and overwriting same-named files. An existing
    /// file can only be replaced by a single file source. A missing path
    /// takes exactly one source under the new name, provided its parent is a
    /// directory (or `create` is set).
    ///
    /// # Errors
    ///
    /// Returns [`ParityError::InvalidDestination`] when the destination
    /// cannot receive the sources, [`ParityError::InvalidOperation`] for a
    /// missing source, or an I/O error.
    pub fn upload(&mut self, sources: &[String], destination: Option<&str>, create: bool) -> Result<()> {
        let local_sources = sources
            .iter()
            .map(|source| self.local_source(source))
            .collect::<Result<Vec<_>>>()?;

        let shown = destination.unwrap_or(".");
        let listing = self.snapshot()?;
        let mut location = pattern::locate(&listing, &self.cwd, shown);
        if create && location == Location::Unreachable {
            let target = pattern::normalize(&self.cwd, shown);
            let parent = target.parent();
            self.create_chain(&parent)?;
            location = match target.name() {
                Some(name) => Location::Missing {
                    parent,
                    name: name.to_string(),
                },
                None => Location::Existing {
                    path: target,
                    kind: EntryKind::Directory,
                },
            };
        }

        match location {
            Location::Existing {
                path,
                kind: EntryKind::Directory,
            } => {
                for source in &local_sources {
                    let name = source_name(source)?;
                    self.copy_entry(source, &path.join(name))?;
                }
                Ok(())
            }
            Location::Existing {
                path,
                kind: EntryKind::File,
            } => match local_sources.as_slice() {
                [single] if single.is_file() => self.copy_entry(single, &path),
                [_] => Err(ParityError::invalid_destination(shown, "a directory cannot replace a file")),
                _ => Err(ParityError::invalid_destination(shown, "several sources onto a file")),
            },
            Location::Missing { parent, name } => match local_sources.as_slice() {
                [single] => self.copy_entry(single, &parent.join(name)),
                _ => Err(ParityError::invalid_destination(shown, "several sources onto a new name")),
            },
            Location::Unreachable => Err(ParityError::invalid_destination(
                shown,
                "destination folder not found",
            )),
        }
    }

    /// Remove every entry matched by each target, resolved one target at a
    /// time against the current tree.
    ///
    /// The root is never removed. A non-empty directory is only removed
    /// when `recursive` is set; otherwise it is skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns a pattern error for a malformed target, or an I/O error.
    pub fn delete(&mut self, targets: &[String], recursive: bool, mode: PatternMode) -> Result<DeleteSummary> {
        let mut summary = DeleteSummary::default();
        for target in targets {
            let listing = self.snapshot()?;
            let matched = pattern::resolve(&listing, &self.cwd, target, mode)?;
            if matched.is_empty() {
                warn!(target = %target, "delete target matched nothing");
            }
            for path in matched {
                if path.is_root() {
                    warn!(target = %target, "refusing to remove the namespace root");
                    summary.skipped.push(path);
                    continue;
                }
                let kind = listing.kind_of(&path);
                if kind == Some(EntryKind::Directory) && !recursive && listing.has_descendants(&path) {
                    warn!(path = %path, "non-empty directory needs a recursive delete");
                    summary.skipped.push(path);
                    continue;
                }
                self.remove(&path)?;
                summary.removed.push(path);
            }
        }
        debug!(removed = summary.removed.len(), skipped = summary.skipped.len(), "delete mirrored");
        Ok(summary)
    }

    /// Move the mirrored current position.
    ///
    /// # Errors
    ///
    /// Returns [`ParityError::NotADirectory`] when `path` is a file and
    /// [`ParityError::InvalidOperation`] when it does not exist.
    pub fn change_directory(&mut self, path: &str) -> Result<()> {
        let listing = self.snapshot()?;
        match pattern::locate(&listing, &self.cwd, path) {
            Location::Existing {
                path: target,
                kind: EntryKind::Directory,
            } => {
                self.cwd = target;
                Ok(())
            }
            Location::Existing { .. } => Err(ParityError::NotADirectory {
                path: path.to_string(),
            }),
            Location::Missing { .. } | Location::Unreachable => Err(ParityError::invalid_operation(
                format!("no such directory: {path}"),
            )),
        }
    }

    /// Create each directory chain, parents included; existing directories
    /// are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`ParityError::NotADirectory`] when a chain crosses a file.
    pub fn make_directories(&mut self, paths: &[String]) -> Result<()> {
        for path in paths {
            let target = pattern::normalize(&self.cwd, path);
            self.create_chain(&target)?;
        }
        Ok(())
    }

    /// Empty the reference tree and return to the root.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the tree cannot be removed or recreated.
    pub fn reset(&mut self) -> Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| format!("removing {}", self.root.display()));
            }
        }
        fs::create_dir_all(&self.root).with_context(|| format!("creating {}", self.root.display()))?;
        self.return_to_root();
        Ok(())
    }

    pub fn return_to_root(&mut self) {
        self.cwd = RelPath::root();
    }

    fn local_source(&self, source: &str) -> Result<PathBuf> {
        let path = self.workdir.join(source);
        if fs::symlink_metadata(&path).is_err() {
            return Err(ParityError::invalid_operation(format!("upload source not found: {source}")));
        }
        Ok(path)
    }

    fn create_chain(&self, target: &RelPath) -> Result<()> {
        let mut current = RelPath::root();
        for segment in target.segments() {
            current = current.join(segment.clone());
            let fs_path = current.to_fs_path(&self.root);
            if fs_path.is_file() {
                return Err(ParityError::NotADirectory {
                    path: current.to_string(),
                });
            }
            if !fs_path.exists() {
                fs::create_dir(&fs_path).with_context(|| format!("creating {}", fs_path.display()))?;
            }
        }
        Ok(())
    }

    /// Copy a local file or directory to `target`, merging into existing
    /// directories and overwriting existing files.
    fn copy_entry(&self, source: &Path, target: &RelPath) -> Result<()> {
        let target_fs = target.to_fs_path(&self.root);
        if source.is_file() {
            if target_fs.is_dir() {
                return Err(ParityError::invalid_destination(
                    target.to_string(),
                    "a file cannot replace a directory",
                ));
            }
            fs::copy(source, &target_fs).with_context(|| format!("copying to {}", target_fs.display()))?;
            return Ok(());
        }
        if target_fs.is_file() {
            return Err(ParityError::invalid_destination(
                target.to_string(),
                "a directory cannot replace a file",
            ));
        }

        fs::create_dir_all(&target_fs).with_context(|| format!("creating {}", target_fs.display()))?;
        for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
            let entry = entry.with_context(|| format!("walking {}", source.display()))?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .with_context(|| format!("relativizing {}", entry.path().display()))?;
            let dest = target_fs.join(relative);
            if entry.file_type().is_dir() {
                if dest.is_file() {
                    return Err(ParityError::invalid_destination(
                        target.to_string(),
                        "a directory cannot replace a file",
                    ));
                }
                fs::create_dir_all(&dest).with_context(|| format!("creating {}", dest.display()))?;
            } else {
                if dest.is_dir() {
                    return Err(ParityError::invalid_destination(
                        target.to_string(),
                        "a file cannot replace a directory",
                    ));
                }
                fs::copy(entry.path(), &dest).with_context(|| format!("copying to {}", dest.display()))?;
            }
        }
        debug!(source = %source.display(), target = %target, "copied into reference tree");
        Ok(())
    }

    fn remove(&self, path: &RelPath) -> Result<()> {
        let fs_path = path.to_fs_path(&self.root);
        let removed = if fs_path.is_dir() {
            fs::remove_dir_all(&fs_path)
        } else {
            fs::remove_file(&fs_path)
        };
        match removed {
            Ok(()) => {
                debug!(path = %path, "removed from reference tree");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("removing {}", fs_path.display())),
        }
    }
}

fn source_name(source: &Path) -> Result<String> {
    source
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_invalid(|| format!("upload source has no name: {}", source.display()))
}
