use super::{CommandName, CommandSpec};
use crate::error::{ParityError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How delete targets are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternMode {
    #[default]
    Glob,
    ExtendedRegex,
}

impl fmt::Display for PatternMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Glob => f.write_str("glob"),
            Self::ExtendedRegex => f.write_str("extended_regex"),
        }
    }
}

/// One logical remote command with its arguments.
///
/// The same value drives both the remote invocation (through
/// [`Operation::command_spec`]) and the local mirror, so both sides always
/// see identical arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Upload local sources (working-area relative) to a remote destination.
    ///
    /// With `create`, a missing parent chain of the destination is created
    /// first.
    Upload {
        sources: Vec<String>,
        destination: Option<String>,
        #[serde(default)]
        create: bool,
    },
    /// Remove every entry matched by each target pattern.
    Delete {
        targets: Vec<String>,
        recursive: bool,
        mode: PatternMode,
    },
    /// Move the session's current position.
    ChangeDirectory { path: String },
    /// Create directory chains, parents included.
    MakeDirectories { paths: Vec<String> },
}

impl Operation {
    #[must_use]
    pub fn upload<I, S>(sources: I, destination: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Upload {
            sources: sources.into_iter().map(Into::into).collect(),
            destination: destination.map(str::to_string),
            create: false,
        }
    }

    /// Upload a single source, creating the destination's parents.
    #[must_use]
    pub fn upload_creating(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::Upload {
            sources: vec![source.into()],
            destination: Some(destination.into()),
            create: true,
        }
    }

    #[must_use]
    pub fn delete<I, S>(targets: I, recursive: bool, mode: PatternMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Delete {
            targets: targets.into_iter().map(Into::into).collect(),
            recursive,
            mode,
        }
    }

    #[must_use]
    pub fn cd(path: impl Into<String>) -> Self {
        Self::ChangeDirectory { path: path.into() }
    }

    #[must_use]
    pub fn mkdir<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MakeDirectories {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Short family name for logs and reports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Upload { .. } => "upload",
            Self::Delete { .. } => "delete",
            Self::ChangeDirectory { .. } => "change_directory",
            Self::MakeDirectories { .. } => "make_directories",
        }
    }

    /// Structural checks shared by the remote and local sides.
    ///
    /// # Errors
    ///
    /// Returns [`ParityError::InvalidOperation`] for empty argument lists.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Upload { sources, .. } => {
                if sources.is_empty() {
                    return Err(ParityError::invalid_operation("upload needs at least one source"));
                }
            }
            Self::Delete { targets, .. } => {
                if targets.is_empty() {
                    return Err(ParityError::invalid_operation("delete needs at least one target"));
                }
            }
            Self::ChangeDirectory { path } => {
                if path.is_empty() {
                    return Err(ParityError::invalid_operation("empty directory path"));
                }
            }
            Self::MakeDirectories { paths } => {
                if paths.is_empty() {
                    return Err(ParityError::invalid_operation("mkdir needs at least one path"));
                }
            }
        }
        Ok(())
    }

    /// Remote invocation for this operation.
    ///
    /// Several upload sources without a destination name the current
    /// position explicitly, since the tool reads a trailing argument as the
    /// destination.
    #[must_use]
    pub fn command_spec(&self) -> CommandSpec {
        match self {
            Self::Upload {
                sources,
                destination,
                create,
            } => {
                let mut spec = CommandSpec::new(CommandName::Put);
                if *create {
                    spec = spec.flag("c");
                }
                let spec = spec.args(sources.iter().cloned());
                match destination {
                    Some(destination) => spec.arg(destination.clone()),
                    None if sources.len() > 1 => spec.arg("."),
                    None => spec,
                }
            }
            Self::Delete {
                targets,
                recursive,
                mode,
            } => {
                let mut spec = CommandSpec::new(CommandName::Rm);
                if *recursive {
                    spec = spec.flag("r").flag("f");
                }
                if *mode == PatternMode::ExtendedRegex {
                    spec = spec.flag("use-pcre");
                }
                spec.args(targets.iter().cloned())
            }
            Self::ChangeDirectory { path } => CommandSpec::new(CommandName::Cd).arg(path.clone()),
            Self::MakeDirectories { paths } => CommandSpec::new(CommandName::Mkdir)
                .flag("p")
                .args(paths.iter().cloned()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_spec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_spec_flags() {
        let op = Operation::delete(["ls 01/../le01/les0[12]"], true, PatternMode::ExtendedRegex);
        assert_eq!(
            op.command_spec().argv(),
            vec!["-f", "-r", "--use-pcre", "ls 01/../le01/les0[12]"]
        );
        let plain = Operation::delete(["file01.txt"], false, PatternMode::Glob);
        assert_eq!(plain.command_spec().argv(), vec!["file01.txt"]);
    }

    #[test]
    fn test_upload_spec_appends_destination() {
        let op = Operation::upload(["fixture/le01", "fixture/lf01"], Some("/01/s01"));
        assert_eq!(
            op.command_spec().argv(),
            vec!["fixture/le01", "fixture/lf01", "/01/s01"]
        );
        assert_eq!(Operation::upload(["fixture/le01"], None).command_spec().argv(), vec!["fixture/le01"]);
    }

    #[test]
    fn test_several_sources_without_destination_target_current_position() {
        let op = Operation::upload(["fixture/le01", "fixture/lf01"], None);
        assert!(op.validate().is_ok());
        assert_eq!(op.command_spec().argv(), vec!["fixture/le01", "fixture/lf01", "."]);
    }

    #[test]
    fn test_upload_creating_sets_flag() {
        let op = Operation::upload_creating("fixture/file01.txt", "new_dir/renamed.txt");
        assert_eq!(
            op.command_spec().argv(),
            vec!["-c", "fixture/file01.txt", "new_dir/renamed.txt"]
        );
    }

    #[test]
    fn test_mkdir_spec() {
        let op = Operation::mkdir(["01/s01/ss01", "01/s02/ss01"]);
        assert_eq!(op.command_spec().argv(), vec!["-p", "01/s01/ss01", "01/s02/ss01"]);
    }

    #[test]
    fn test_validate() {
        assert!(Operation::upload(["a", "b"], None).validate().is_ok());
        assert!(Operation::upload(Vec::<String>::new(), Some("/")).validate().is_err());
        assert!(Operation::upload(["a", "b"], Some("/")).validate().is_ok());
        assert!(Operation::delete(Vec::<String>::new(), true, PatternMode::Glob).validate().is_err());
        assert!(Operation::cd("").validate().is_err());
    }

    #[test]
    fn test_serde_tagging() {
        let op = Operation::cd("le01");
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "change_directory");
        assert_eq!(json["path"], "le01");
    }
}
