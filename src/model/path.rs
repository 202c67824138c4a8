use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A namespace path relative to the namespace root, kept as segments.
///
/// Segments are stored verbatim: embedded whitespace is never split or
/// trimmed. Ordering is segment-wise lexicographic with byte-wise segment
/// comparison, which is the canonical snapshot order.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelPath(Vec<String>);

impl RelPath {
    /// The namespace root.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Build from already-split segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Split a forward-slash separated path. Empty segments are dropped;
    /// `.` and `..` are kept as literal segments (resolution is structural
    /// and belongs to the pattern matcher).
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self(
            text.split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Convert a path relative to a local root into segments.
    ///
    /// Returns `None` for non-UTF-8 names or components that are not plain
    /// names (`..`, prefixes, root).
    #[must_use]
    pub fn from_relative_fs(path: &Path) -> Option<Self> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(name) => segments.push(name.to_str()?.to_string()),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(Self(segments))
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Last segment, `None` for the root.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Parent path; the root is its own parent.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut segments = self.0.clone();
        segments.pop();
        Self(segments)
    }

    #[must_use]
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// True when `self` equals `ancestor` or lies beneath it.
    #[must_use]
    pub fn starts_with(&self, ancestor: &Self) -> bool {
        self.0.starts_with(&ancestor.0)
    }

    /// True when `self` is a direct child of `dir`.
    #[must_use]
    pub fn is_child_of(&self, dir: &Self) -> bool {
        self.0.len() == dir.0.len() + 1 && self.starts_with(dir)
    }

    /// Location of this path beneath a local directory.
    #[must_use]
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for segment in &self.0 {
            path.push(segment);
        }
        path
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl Serialize for RelPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RelPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::parse(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_whitespace() {
        let path = RelPath::parse("ls 01/ls s02/ls ss01");
        assert_eq!(path.segments(), &["ls 01", "ls s02", "ls ss01"]);
        assert_eq!(path.to_string(), "/ls 01/ls s02/ls ss01");
    }

    #[test]
    fn test_parse_drops_empty_segments() {
        assert_eq!(RelPath::parse("/01//s01/"), RelPath::from_segments(["01", "s01"]));
        assert!(RelPath::parse("/").is_root());
        assert_eq!(RelPath::root().to_string(), "/");
    }

    #[test]
    fn test_parent_of_root_is_root() {
        assert!(RelPath::root().parent().is_root());
        assert_eq!(RelPath::parse("a/b").parent(), RelPath::parse("a"));
    }

    #[test]
    fn test_child_relation() {
        let dir = RelPath::parse("a");
        assert!(RelPath::parse("a/b").is_child_of(&dir));
        assert!(!RelPath::parse("a/b/c").is_child_of(&dir));
        assert!(!RelPath::parse("ab").is_child_of(&dir));
        assert!(RelPath::parse("a").is_child_of(&RelPath::root()));
    }

    #[test]
    fn test_segment_order_is_not_string_order() {
        // "a/b" < "a b" segment-wise, although '/' > ' ' byte-wise.
        assert!(RelPath::parse("a/b") < RelPath::parse("a b"));
        assert!(RelPath::parse("a") < RelPath::parse("a/b"));
    }

    #[test]
    fn test_from_relative_fs() {
        let path = RelPath::from_relative_fs(Path::new("ls 01/ls s01")).unwrap();
        assert_eq!(path, RelPath::parse("ls 01/ls s01"));
        assert!(RelPath::from_relative_fs(Path::new("../x")).is_none());
    }

    #[test]
    fn test_serde_as_string() {
        let path = RelPath::parse("01/s 01");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/01/s 01\"");
        let back: RelPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
