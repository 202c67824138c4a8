//! Path expression resolution against a namespace listing.
//!
//! Expressions are split on `/` and matched one segment at a time, so a
//! wildcard never crosses a directory boundary and whitespace inside a
//! segment is just another character. `.` and `..` segments move the
//! frontier structurally in both modes; `..` at the root stays at the root.

mod local;

pub use local::{expand_local_glob, has_wildcard};

use crate::model::{EntryKind, PatternMode, RelPath, TreeSnapshot};
use regex::Regex;
use std::collections::BTreeSet;
use thiserror::Error;

/// Malformed path expression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Empty path expression")]
    Empty,

    #[error("Invalid regular expression in '{pattern}' (segment '{segment}'): {reason}")]
    InvalidRegex {
        pattern: String,
        segment: String,
        reason: String,
    },
}

impl PatternError {
    /// The offending expression.
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::InvalidRegex { pattern, .. } => pattern,
        }
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Current,
    Parent,
    Literal(String),
    Expr(Regex),
}

/// A path expression compiled for one pattern mode.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    absolute: bool,
    segments: Vec<Segment>,
}

impl CompiledPattern {
    /// Compile `pattern` under `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Empty`] for an empty expression and
    /// [`PatternError::InvalidRegex`] when a segment does not compile.
    pub fn compile(pattern: &str, mode: PatternMode) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }

        let mut segments = Vec::new();
        for raw in pattern.split('/').filter(|s| !s.is_empty()) {
            let segment = match raw {
                "." => Segment::Current,
                ".." => Segment::Parent,
                _ => match mode {
                    PatternMode::Glob if !has_wildcard(raw) => Segment::Literal(raw.to_string()),
                    PatternMode::Glob => Segment::Expr(compile_segment(pattern, raw, &glob_to_regex(raw))?),
                    PatternMode::ExtendedRegex => {
                        Segment::Expr(compile_segment(pattern, raw, &format!("^(?:{raw})$"))?)
                    }
                },
            };
            segments.push(segment);
        }

        Ok(Self {
            source: pattern.to_string(),
            absolute: pattern.starts_with('/'),
            segments,
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every path in `listing` denoted by this expression, evaluated from `cwd`.
    ///
    /// Intermediate segments only traverse directories. A pattern that
    /// reduces to the root (`/`, `.` at the root, `..` at the root) yields the
    /// root itself; callers decide what that means.
    #[must_use]
    pub fn resolve(&self, listing: &TreeSnapshot, cwd: &RelPath) -> BTreeSet<RelPath> {
        let start = if self.absolute { RelPath::root() } else { cwd.clone() };
        let mut frontier = BTreeSet::from([start]);
        let last = self.segments.len().saturating_sub(1);

        for (idx, segment) in self.segments.iter().enumerate() {
            let mut next = BTreeSet::new();
            for base in &frontier {
                match segment {
                    Segment::Current => {
                        next.insert(base.clone());
                    }
                    Segment::Parent => {
                        next.insert(base.parent());
                    }
                    Segment::Literal(name) => {
                        let candidate = base.join(name.clone());
                        if listing.contains(&candidate) {
                            next.insert(candidate);
                        }
                    }
                    Segment::Expr(regex) => {
                        next.extend(
                            listing
                                .children_of(base)
                                .filter(|entry| entry.path.name().is_some_and(|n| regex.is_match(n)))
                                .map(|entry| entry.path.clone()),
                        );
                    }
                }
            }
            if idx < last {
                next.retain(|path| listing.kind_of(path) == Some(EntryKind::Directory));
            }
            frontier = next;
            if frontier.is_empty() {
                break;
            }
        }

        frontier
    }
}

/// Resolve `pattern` against `listing` from `cwd`.
///
/// No match is not an error; it yields an empty set.
///
/// # Errors
///
/// Returns a [`PatternError`] when the expression is malformed.
pub fn resolve(
    listing: &TreeSnapshot,
    cwd: &RelPath,
    pattern: &str,
    mode: PatternMode,
) -> Result<BTreeSet<RelPath>, PatternError> {
    Ok(CompiledPattern::compile(pattern, mode)?.resolve(listing, cwd))
}

/// Where a literal path lands in a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Existing { path: RelPath, kind: EntryKind },
    /// Absent, but its parent is an existing directory.
    Missing { parent: RelPath, name: String },
    /// Some intermediate segment is absent or not a directory.
    Unreachable,
}

/// Resolve a literal (wildcard-free) path from `cwd`, structurally.
#[must_use]
pub fn locate(listing: &TreeSnapshot, cwd: &RelPath, path: &str) -> Location {
    let mut current = if path.starts_with('/') {
        RelPath::root()
    } else {
        cwd.clone()
    };
    if listing.kind_of(&current) != Some(EntryKind::Directory) {
        return Location::Unreachable;
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    for (idx, segment) in segments.iter().enumerate() {
        match *segment {
            "." => {}
            ".." => current = current.parent(),
            name => {
                let candidate = current.join(name);
                match listing.kind_of(&candidate) {
                    Some(EntryKind::Directory) => current = candidate,
                    Some(EntryKind::File) if idx + 1 == segments.len() => {
                        return Location::Existing {
                            path: candidate,
                            kind: EntryKind::File,
                        };
                    }
                    None if idx + 1 == segments.len() => {
                        return Location::Missing {
                            parent: current,
                            name: name.to_string(),
                        };
                    }
                    _ => return Location::Unreachable,
                }
            }
        }
    }

    Location::Existing {
        path: current,
        kind: EntryKind::Directory,
    }
}

/// Resolve `path` from `cwd` lexically; `.` and `..` are applied without
/// consulting any namespace.
#[must_use]
pub fn normalize(cwd: &RelPath, path: &str) -> RelPath {
    let mut current = if path.starts_with('/') {
        RelPath::root()
    } else {
        cwd.clone()
    };
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        current = match segment {
            "." => current,
            ".." => current.parent(),
            name => current.join(name),
        };
    }
    current
}

pub(crate) fn glob_to_regex(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 8);
    out.push('^');
    for ch in segment.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

fn compile_segment(pattern: &str, segment: &str, regex: &str) -> Result<Regex, PatternError> {
    Regex::new(regex).map_err(|err| PatternError::InvalidRegex {
        pattern: pattern.to_string(),
        segment: segment.to_string(),
        reason: err.to_string(),
    })
}
