//! Namespace enumeration into canonical [`TreeSnapshot`]s.
//!
//! The local side walks a directory; the remote side parses the output of
//! the listing command. Both produce the same entry shape and go through
//! [`TreeSnapshot::from_entries`], so equivalence is plain equality.

use crate::driver::{CommandDriver, DriverError};
use crate::error::{OptionExt, Result, ResultExt};
use crate::model::{CommandName, CommandSpec, EntryKind, NamespaceEntry, RelPath, TreeSnapshot};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Snapshot every file and directory beneath `root`, empty directories included.
///
/// # Errors
///
/// Returns an error when the tree cannot be walked or holds a name that is
/// not valid UTF-8.
pub fn snapshot_local(root: &Path) -> Result<TreeSnapshot> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("relativizing {}", entry.path().display()))?;
        let path = RelPath::from_relative_fs(relative)
            .ok_or_invalid(|| format!("unsupported local name: {}", relative.display()))?;
        let kind = if entry.file_type().is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        entries.push(NamespaceEntry::new(path, kind));
    }
    Ok(TreeSnapshot::from_entries(entries))
}

/// Parse one listing into entries of `kind`.
///
/// Records are separated by `\n` only (a trailing `\r` is dropped), so
/// embedded spaces survive. The root line (`/` or `.`) and blank lines are
/// skipped; a leading `/` or `./` is stripped.
///
/// # Errors
///
/// Returns [`DriverError::MalformedListing`] when the output is not UTF-8.
pub fn parse_listing(command: &str, bytes: &[u8], kind: EntryKind) -> std::result::Result<Vec<NamespaceEntry>, DriverError> {
    let text = std::str::from_utf8(bytes).map_err(|err| DriverError::MalformedListing {
        command: command.to_string(),
        reason: err.to_string(),
    })?;

    let mut entries = Vec::new();
    for record in text.split('\n') {
        let record = record.strip_suffix('\r').unwrap_or(record);
        if record.is_empty() || record == "/" || record == "." {
            continue;
        }
        let record = record
            .strip_prefix("./")
            .or_else(|| record.strip_prefix('/'))
            .unwrap_or(record);
        let path = RelPath::parse(record);
        if !path.is_root() {
            entries.push(NamespaceEntry::new(path, kind));
        }
    }
    Ok(entries)
}

fn listing_spec(kind: Option<EntryKind>) -> CommandSpec {
    let spec = CommandSpec::new(CommandName::Find);
    let spec = match kind {
        Some(EntryKind::Directory) => spec.flag_value("type", "d"),
        Some(EntryKind::File) => spec.flag_value("type", "f"),
        None => spec,
    };
    spec.arg("/")
}

/// Snapshot the remote namespace.
///
/// The listing is requested once per kind; a path reported under both
/// kinds is a directory.
///
/// # Errors
///
/// Returns the driver's error when either listing fails or is malformed.
pub fn snapshot_remote(driver: &mut dyn CommandDriver) -> std::result::Result<TreeSnapshot, DriverError> {
    let mut entries = Vec::new();
    for kind in [EntryKind::Directory, EntryKind::File] {
        let spec = listing_spec(Some(kind));
        let invocation = driver.invoke(&spec)?;
        entries.extend(parse_listing(&spec.to_string(), &invocation.stdout, kind)?);
    }
    let snapshot = TreeSnapshot::from_entries(entries);
    debug!(entries = snapshot.len(), "remote snapshot taken");
    Ok(snapshot)
}

/// Number of entries the remote namespace reports below its root.
///
/// # Errors
///
/// Returns the driver's error when the listing fails or is malformed.
pub fn remote_entry_count(driver: &mut dyn CommandDriver) -> std::result::Result<usize, DriverError> {
    let spec = listing_spec(None);
    let invocation = driver.invoke(&spec)?;
    Ok(parse_listing(&spec.to_string(), &invocation.stdout, EntryKind::File)?.len())
}
