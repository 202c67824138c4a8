use super::glob_to_regex;
use crate::error::{ParityError, Result, ResultExt};
use regex::Regex;
use std::fs;
use std::path::Path;

/// True when `segment` contains a glob wildcard.
#[must_use]
pub fn has_wildcard(segment: &str) -> bool {
    segment.contains(['*', '?'])
}

/// Expand a working-area relative upload source.
///
/// Only the last segment may carry wildcards; it is matched against the
/// entries of its parent directory on the local filesystem. Sources without
/// wildcards are returned unchanged. Matches come back sorted so the remote
/// invocation is deterministic.
///
/// # Errors
///
/// Returns an error when the parent directory cannot be read or the
/// expression does not compile.
pub fn expand_local_glob(workdir: &Path, source: &str) -> Result<Vec<String>> {
    let (parent, last) = match source.rsplit_once('/') {
        Some((parent, last)) => (Some(parent), last),
        None => (None, source),
    };
    if !has_wildcard(last) {
        return Ok(vec![source.to_string()]);
    }

    let regex = Regex::new(&glob_to_regex(last))
        .map_err(|err| ParityError::invalid_operation(format!("bad source glob '{source}': {err}")))?;
    let dir = match parent {
        Some(parent) => workdir.join(parent),
        None => workdir.to_path_buf(),
    };

    let mut matches = Vec::new();
    for entry in fs::read_dir(&dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if regex.is_match(&name) {
            matches.push(match parent {
                Some(parent) => format!("{parent}/{name}"),
                None => name,
            });
        }
    }
    matches.sort();
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_expand_suffix_glob() {
        let temp = TempDir::new().unwrap();
        let fixture = temp.path().join("fixture");
        fs::create_dir_all(fixture.join("le01")).unwrap();
        fs::write(fixture.join("file01.txt"), "").unwrap();
        fs::write(fixture.join("file01nonempty.txt"), "x").unwrap();

        let expanded = expand_local_glob(temp.path(), "fixture/*txt").unwrap();
        assert_eq!(
            expanded,
            vec!["fixture/file01.txt", "fixture/file01nonempty.txt"]
        );
    }

    #[test]
    fn test_plain_source_is_unchanged() {
        let temp = TempDir::new().unwrap();
        let expanded = expand_local_glob(temp.path(), "fixture/ls 01").unwrap();
        assert_eq!(expanded, vec!["fixture/ls 01"]);
    }

    #[test]
    fn test_missing_parent_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(expand_local_glob(temp.path(), "nowhere/*").is_err());
    }
}
