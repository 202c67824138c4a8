use super::RelPath;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a namespace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
        }
    }

    const fn marker(self) -> char {
        match self {
            Self::File => 'f',
            Self::Directory => 'd',
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file or directory relative to a namespace root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NamespaceEntry {
    pub path: RelPath,
    pub kind: EntryKind,
}

impl NamespaceEntry {
    #[must_use]
    pub const fn new(path: RelPath, kind: EntryKind) -> Self {
        Self { path, kind }
    }

    #[must_use]
    pub fn file(path: &str) -> Self {
        Self::new(RelPath::parse(path), EntryKind::File)
    }

    #[must_use]
    pub fn directory(path: &str) -> Self {
        Self::new(RelPath::parse(path), EntryKind::Directory)
    }
}

impl fmt::Display for NamespaceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.marker(), self.path)
    }
}

/// Canonical, order-independent listing of a namespace.
///
/// Entries are unique by path and sorted by [`RelPath`] order, so two
/// snapshots are equivalent exactly when they are equal. The root itself is
/// never an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeSnapshot {
    entries: Vec<NamespaceEntry>,
}

impl TreeSnapshot {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Canonicalize entries from any source order.
    ///
    /// Duplicate paths collapse into one entry; if a path is reported with
    /// both kinds, the directory wins. Root entries are dropped.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = NamespaceEntry>,
    {
        let mut merged: BTreeMap<RelPath, EntryKind> = BTreeMap::new();
        for entry in entries {
            if entry.path.is_root() {
                continue;
            }
            merged
                .entry(entry.path)
                .and_modify(|kind| *kind = (*kind).max(entry.kind))
                .or_insert(entry.kind);
        }
        Self {
            entries: merged
                .into_iter()
                .map(|(path, kind)| NamespaceEntry::new(path, kind))
                .collect(),
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[NamespaceEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Kind of the entry at `path`; the root always reads as a directory.
    #[must_use]
    pub fn kind_of(&self, path: &RelPath) -> Option<EntryKind> {
        if path.is_root() {
            return Some(EntryKind::Directory);
        }
        self.entries
            .binary_search_by(|entry| entry.path.cmp(path))
            .ok()
            .map(|idx| self.entries[idx].kind)
    }

    #[must_use]
    pub fn contains(&self, path: &RelPath) -> bool {
        self.kind_of(path).is_some()
    }

    /// Direct children of `dir`, in canonical order.
    pub fn children_of<'a>(&'a self, dir: &'a RelPath) -> impl Iterator<Item = &'a NamespaceEntry> + 'a {
        self.entries.iter().filter(move |entry| entry.path.is_child_of(dir))
    }

    /// True when `dir` has at least one descendant.
    #[must_use]
    pub fn has_descendants(&self, dir: &RelPath) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.path != *dir && entry.path.starts_with(dir))
    }

    /// Compare `self` (actual) against `expected`.
    #[must_use]
    pub fn diff(&self, expected: &Self) -> SnapshotDiff {
        let actual: BTreeMap<&RelPath, EntryKind> =
            self.entries.iter().map(|e| (&e.path, e.kind)).collect();
        let wanted: BTreeMap<&RelPath, EntryKind> =
            expected.entries.iter().map(|e| (&e.path, e.kind)).collect();

        let mut diff = SnapshotDiff::default();
        for (path, kind) in &actual {
            match wanted.get(path) {
                None => diff
                    .unexpected
                    .push(NamespaceEntry::new((*path).clone(), *kind)),
                Some(expected_kind) if expected_kind != kind => {
                    diff.kind_mismatches.push(KindMismatch {
                        path: (*path).clone(),
                        actual: *kind,
                        expected: *expected_kind,
                    });
                }
                Some(_) => {}
            }
        }
        for (path, kind) in &wanted {
            if !actual.contains_key(path) {
                diff.missing.push(NamespaceEntry::new((*path).clone(), *kind));
            }
        }
        diff
    }

    /// SHA-256 over the canonical listing, hex encoded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for entry in &self.entries {
            hasher.update(entry.to_string().as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }

    /// One line per entry: `d /path` or `f /path`.
    #[must_use]
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return "(empty)".to_string();
        }
        self.entries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<NamespaceEntry> for TreeSnapshot {
    fn from_iter<I: IntoIterator<Item = NamespaceEntry>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

/// A path present on both sides with different kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindMismatch {
    pub path: RelPath,
    pub actual: EntryKind,
    pub expected: EntryKind,
}

/// Entry-level difference between an actual and an expected snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDiff {
    /// Present in the actual namespace, absent from the expectation.
    pub unexpected: Vec<NamespaceEntry>,
    /// Expected but absent from the actual namespace.
    pub missing: Vec<NamespaceEntry>,
    pub kind_mismatches: Vec<KindMismatch>,
}

impl SnapshotDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unexpected.is_empty() && self.missing.is_empty() && self.kind_mismatches.is_empty()
    }

    /// `+` unexpected, `-` missing, `~` kind mismatch.
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        for entry in &self.unexpected {
            lines.push(format!("+ {entry}"));
        }
        for entry in &self.missing {
            lines.push(format!("- {entry}"));
        }
        for mismatch in &self.kind_mismatches {
            lines.push(format!(
                "~ {} (remote: {}, expected: {})",
                mismatch.path, mismatch.actual, mismatch.expected
            ));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<NamespaceEntry> {
        vec![
            NamespaceEntry::directory("d"),
            NamespaceEntry::directory("a/b/c"),
            NamespaceEntry::file("d/e/f/file.txt"),
            NamespaceEntry::directory("a"),
            NamespaceEntry::directory("d/e"),
            NamespaceEntry::directory("a/b"),
            NamespaceEntry::directory("d/e/f"),
        ]
    }

    #[test]
    fn test_canonical_order_ignores_input_order() {
        let forward = TreeSnapshot::from_entries(sample());
        let mut reversed = sample();
        reversed.reverse();
        assert_eq!(forward, TreeSnapshot::from_entries(reversed));
        assert_eq!(forward.entries()[0].path, RelPath::parse("a"));
        assert_eq!(forward.len(), 7);
    }

    #[test]
    fn test_duplicates_collapse_and_directory_wins() {
        let snapshot = TreeSnapshot::from_entries([
            NamespaceEntry::file("x"),
            NamespaceEntry::directory("x"),
            NamespaceEntry::file("x"),
            NamespaceEntry::new(RelPath::root(), EntryKind::Directory),
        ]);
        assert_eq!(snapshot.entries(), &[NamespaceEntry::directory("x")]);
    }

    #[test]
    fn test_kind_of_and_children() {
        let snapshot = TreeSnapshot::from_entries(sample());
        assert_eq!(snapshot.kind_of(&RelPath::root()), Some(EntryKind::Directory));
        assert_eq!(
            snapshot.kind_of(&RelPath::parse("d/e/f/file.txt")),
            Some(EntryKind::File)
        );
        assert_eq!(snapshot.kind_of(&RelPath::parse("nope")), None);

        let root = RelPath::root();
        let top: Vec<String> = snapshot
            .children_of(&root)
            .map(|e| e.path.to_string())
            .collect();
        assert_eq!(top, vec!["/a", "/d"]);
        assert!(snapshot.has_descendants(&RelPath::parse("d/e")));
        assert!(!snapshot.has_descendants(&RelPath::parse("a/b/c")));
    }

    #[test]
    fn test_diff_reports_each_side() {
        let actual = TreeSnapshot::from_entries([
            NamespaceEntry::directory("a"),
            NamespaceEntry::file("b"),
            NamespaceEntry::file("extra"),
        ]);
        let expected = TreeSnapshot::from_entries([
            NamespaceEntry::directory("a"),
            NamespaceEntry::directory("b"),
            NamespaceEntry::file("gone"),
        ]);
        let diff = actual.diff(&expected);
        assert_eq!(diff.unexpected, vec![NamespaceEntry::file("extra")]);
        assert_eq!(diff.missing, vec![NamespaceEntry::file("gone")]);
        assert_eq!(diff.kind_mismatches.len(), 1);
        assert_eq!(
            diff.render(),
            "+ f /extra\n- f /gone\n~ /b (remote: file, expected: directory)"
        );
        assert!(actual.diff(&actual).is_empty());
    }

    #[test]
    fn test_fingerprint_depends_on_structure_only() {
        let a = TreeSnapshot::from_entries(sample());
        let mut shuffled = sample();
        shuffled.swap(0, 5);
        assert_eq!(a.fingerprint(), TreeSnapshot::from_entries(shuffled).fingerprint());
        assert_ne!(a.fingerprint(), TreeSnapshot::empty().fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_render() {
        assert_eq!(TreeSnapshot::empty().render(), "(empty)");
        let snapshot = TreeSnapshot::from_entries([
            NamespaceEntry::file("ls 01/common file.txt"),
            NamespaceEntry::directory("ls 01"),
        ]);
        assert_eq!(snapshot.render(), "d /ls 01\nf /ls 01/common file.txt");
    }
}
