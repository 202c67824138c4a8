//! In-memory stand-in for the remote tool.
//!
//! Understands the command vocabulary the harness emits and keeps its
//! namespace as a map of paths. Upload sources are read from the working
//! area on disk, exactly like the real tool run from that directory.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tree_parity::driver::{CapturedOutput, CommandDriver, DriverError, Invocation};
use tree_parity::model::{CommandName, CommandSpec, EntryKind, NamespaceEntry, PatternMode, RelPath, TreeSnapshot};
use tree_parity::pattern::{self, Location};
use walkdir::WalkDir;

/// Deliberate misbehaviour, for checking that the harness notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Defect {
    /// Uploads skip directories that hold nothing.
    DropsEmptyDirectories,
    /// Uploads to an unreachable destination succeed without doing anything.
    AcceptsMissingDestination,
}

#[derive(Debug)]
pub struct FakeRemote {
    workdir: PathBuf,
    nodes: BTreeMap<RelPath, EntryKind>,
    cwd: RelPath,
    session: Option<String>,
    defect: Option<Defect>,
    pub calls: Vec<String>,
}

type Outcome = Result<String, String>;

impl FakeRemote {
    pub fn new(workdir: &Path) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
            nodes: BTreeMap::new(),
            cwd: RelPath::root(),
            session: None,
            defect: None,
            calls: Vec::new(),
        }
    }

    pub fn logged_in(workdir: &Path, email: &str) -> Self {
        let mut remote = Self::new(workdir);
        remote.session = Some(email.to_string());
        remote
    }

    #[must_use]
    pub fn with_defect(mut self, defect: Defect) -> Self {
        self.defect = Some(defect);
        self
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Put an entry (and its parents) straight into the namespace.
    pub fn seed(&mut self, path: &str, kind: EntryKind) {
        let path = RelPath::parse(path);
        self.create_chain(&path.parent());
        self.nodes.insert(path, kind);
    }

    pub fn tree(&self) -> TreeSnapshot {
        self.nodes
            .iter()
            .map(|(path, kind)| NamespaceEntry::new(path.clone(), *kind))
            .collect()
    }

    fn dispatch(&mut self, spec: &CommandSpec) -> Outcome {
        match spec.name {
            CommandName::Whoami => self.session.clone().map(|email| format!("{email}\n")).ok_or_else(not_logged_in),
            CommandName::Logout => {
                if self.session.take().is_some() {
                    Ok(String::new())
                } else {
                    Err(not_logged_in())
                }
            }
            CommandName::Login => match spec.positional_args.as_slice() {
                [email, _password] => {
                    self.session = Some(email.clone());
                    Ok(String::new())
                }
                _ => Err("Usage: login email password".to_string()),
            },
            _ if self.session.is_none() => Err(not_logged_in()),
            CommandName::Find => self.find(spec),
            CommandName::Cd => self.cd(spec),
            CommandName::Mkdir => self.mkdir(spec),
            CommandName::Rm => self.rm(spec),
            CommandName::Put => self.put(spec),
        }
    }

    fn find(&self, spec: &CommandSpec) -> Outcome {
        let wanted = match spec.flags.get("type") {
            Some(Some(kind)) if kind == "d" => Some(EntryKind::Directory),
            Some(Some(kind)) if kind == "f" => Some(EntryKind::File),
            Some(_) => return Err("Invalid type".to_string()),
            None => None,
        };
        let mut out = String::new();
        if wanted != Some(EntryKind::File) {
            out.push_str("/\n");
        }
        for (path, kind) in &self.nodes {
            if wanted.is_none_or(|wanted| wanted == *kind) {
                let _ = writeln!(out, "{path}");
            }
        }
        Ok(out)
    }

    fn cd(&mut self, spec: &CommandSpec) -> Outcome {
        let target = spec.positional_args.first().map_or("/", String::as_str);
        match pattern::locate(&self.tree(), &self.cwd, target) {
            Location::Existing {
                path,
                kind: EntryKind::Directory,
            } => {
                self.cwd = path;
                Ok(String::new())
            }
            Location::Existing { .. } => Err(format!("{target} is not a directory")),
            _ => Err(format!("Couldn't find {target}")),
        }
    }

    fn mkdir(&mut self, spec: &CommandSpec) -> Outcome {
        let parents = spec.has_flag("p");
        for raw in &spec.positional_args {
            let target = pattern::normalize(&self.cwd, raw);
            if !parents && !self.is_dir(&target.parent()) {
                return Err(format!("Couldn't find parent of {raw}"));
            }
            if self.nodes.get(&target) == Some(&EntryKind::File) {
                return Err(format!("{raw} exists and is a file"));
            }
            self.create_chain(&target);
        }
        Ok(String::new())
    }

    fn rm(&mut self, spec: &CommandSpec) -> Outcome {
        let recursive = spec.has_flag("r");
        let mode = if spec.has_flag("use-pcre") {
            PatternMode::ExtendedRegex
        } else {
            PatternMode::Glob
        };
        let mut failures = Vec::new();
        for target in &spec.positional_args {
            let tree = self.tree();
            let matched = pattern::resolve(&tree, &self.cwd, target, mode).map_err(|err| err.to_string())?;
            if matched.is_empty() {
                failures.push(format!("No such file or directory: {target}"));
                continue;
            }
            for path in matched {
                if path.is_root() {
                    failures.push("Cannot remove the root folder".to_string());
                    continue;
                }
                if tree.kind_of(&path) == Some(EntryKind::Directory) && !recursive && tree.has_descendants(&path) {
                    failures.push(format!("Unable to delete folder {path}: use -r"));
                    continue;
                }
                self.nodes.retain(|node, _| !node.starts_with(&path));
            }
        }
        if failures.is_empty() {
            Ok(String::new())
        } else {
            Err(failures.join("\n"))
        }
    }

    fn put(&mut self, spec: &CommandSpec) -> Outcome {
        let create = spec.has_flag("c");
        let (sources, destination) = match spec.positional_args.as_slice() {
            [] => return Err("Usage: put localpath [remotepath]".to_string()),
            [single] => (std::slice::from_ref(single), "."),
            [sources @ .., destination] => (sources, destination.as_str()),
        };
        let sources: Vec<PathBuf> = sources.iter().map(|source| self.workdir.join(source)).collect();
        if let Some(missing) = sources.iter().find(|source| !source.exists()) {
            return Err(format!("Local file not found: {}", missing.display()));
        }

        let mut location = pattern::locate(&self.tree(), &self.cwd, destination);
        if location == Location::Unreachable && create {
            let target = pattern::normalize(&self.cwd, destination);
            self.create_chain(&target.parent());
            location = match target.name() {
                Some(name) => Location::Missing {
                    parent: target.parent(),
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
                for source in &sources {
                    let Some(name) = source.file_name().and_then(|n| n.to_str()) else {
                        return Err(format!("Unusable source name: {}", source.display()));
                    };
                    self.upload_entry(source, &path.join(name))?;
                }
                Ok(String::new())
            }
            Location::Existing {
                path,
                kind: EntryKind::File,
            } => match sources.as_slice() {
                [single] if single.is_file() => self.upload_entry(single, &path).map(|()| String::new()),
                _ => Err("Destination is not valid".to_string()),
            },
            Location::Missing { parent, name } => match sources.as_slice() {
                [single] => self.upload_entry(single, &parent.join(name)).map(|()| String::new()),
                _ => Err("Destination is not valid".to_string()),
            },
            Location::Unreachable if self.defect == Some(Defect::AcceptsMissingDestination) => Ok(String::new()),
            Location::Unreachable => Err("Couldn't find destination folder".to_string()),
        }
    }

    fn upload_entry(&mut self, source: &Path, target: &RelPath) -> Result<(), String> {
        for entry in WalkDir::new(source).sort_by_file_name() {
            let entry = entry.map_err(|err| err.to_string())?;
            let relative = entry.path().strip_prefix(source).map_err(|err| err.to_string())?;
            let Some(relative) = RelPath::from_relative_fs(relative) else {
                return Err(format!("Unusable local path: {}", entry.path().display()));
            };
            let mut path = target.clone();
            for segment in relative.segments() {
                path = path.join(segment.clone());
            }

            let kind = if entry.file_type().is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            match (self.nodes.get(&path), kind) {
                (Some(EntryKind::File), EntryKind::Directory) | (Some(EntryKind::Directory), EntryKind::File) => {
                    return Err("Destination is not valid".to_string());
                }
                _ => {}
            }
            if kind == EntryKind::Directory
                && self.defect == Some(Defect::DropsEmptyDirectories)
                && is_empty_dir(entry.path())
            {
                continue;
            }
            self.nodes.insert(path, kind);
        }
        Ok(())
    }

    fn create_chain(&mut self, target: &RelPath) {
        let mut current = RelPath::root();
        for segment in target.segments() {
            current = current.join(segment.clone());
            self.nodes.entry(current.clone()).or_insert(EntryKind::Directory);
        }
    }

    fn is_dir(&self, path: &RelPath) -> bool {
        path.is_root() || self.nodes.get(path) == Some(&EntryKind::Directory)
    }
}

impl CommandDriver for FakeRemote {
    fn invoke(&mut self, spec: &CommandSpec) -> Result<Invocation, DriverError> {
        self.calls.push(spec.to_string());
        match self.dispatch(spec) {
            Ok(stdout) => Ok(Invocation {
                stdout: stdout.into_bytes(),
                stderr: Vec::new(),
                duration: Duration::ZERO,
            }),
            Err(stderr) => Err(DriverError::NonZero {
                command: spec.to_string(),
                status: "exit status: 1".to_string(),
                output: CapturedOutput {
                    stdout: String::new(),
                    stderr,
                },
            }),
        }
    }
}

fn not_logged_in() -> String {
    "Not logged in".to_string()
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path).is_ok_and(|mut entries| entries.next().is_none())
}
