//! Deterministic baseline tree used by every scenario.
//!
//! ```text
//! fixture/
//! ├── file01.txt              (empty)
//! ├── file01nonempty.txt      ("file01contents")
//! ├── le01/les01/less01
//! ├── le01/les02/{less01,less02}
//! ├── lf01/lfs01/lfss01/commonfile.txt
//! ├── lf01/lfs02/{lfss01,lfss02}/commonfile.txt
//! ├── ls 01/ls s01/ls ss01/common file.txt
//! └── ls 01/ls s02/{ls ss01,ls ss02}/common file.txt
//! ```

use crate::error::{ParityError, Result, ResultExt};
use crate::model::{RelPath, TreeSnapshot};
use crate::snapshot::snapshot_local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Directory name of the fixture inside the working area.
pub const FIXTURE_DIR: &str = "fixture";

pub const EMPTY_FILE: &str = "file01.txt";
pub const NONEMPTY_FILE: &str = "file01nonempty.txt";
pub const NONEMPTY_CONTENTS: &str = "file01contents";

/// One nested chain: top directory, second-level prefix, leaf prefix and
/// the file placed in every leaf (if any).
struct Chain {
    top: &'static str,
    mid: &'static str,
    leaf: &'static str,
    leaf_file: Option<&'static str>,
}

const CHAINS: [Chain; 3] = [
    Chain {
        top: "le01",
        mid: "les0",
        leaf: "less0",
        leaf_file: None,
    },
    Chain {
        top: "lf01",
        mid: "lfs0",
        leaf: "lfss0",
        leaf_file: Some("commonfile.txt"),
    },
    Chain {
        top: "ls 01",
        mid: "ls s0",
        leaf: "ls ss0",
        leaf_file: Some("common file.txt"),
    },
];

/// Second-level index and leaf index of every leaf: one branch with a single
/// leaf, one branch point with two siblings.
const LEAVES: [(u8, u8); 3] = [(1, 1), (2, 1), (2, 2)];

impl Chain {
    fn leaf_paths(&self) -> impl Iterator<Item = RelPath> + '_ {
        LEAVES.iter().map(move |(mid, leaf)| {
            RelPath::from_segments([
                self.top.to_string(),
                format!("{}{mid}", self.mid),
                format!("{}{leaf}", self.leaf),
            ])
        })
    }
}

/// A built fixture and its canonical manifest.
#[derive(Debug, Clone)]
pub struct Fixture {
    root: PathBuf,
    manifest: TreeSnapshot,
}

impl Fixture {
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn manifest(&self) -> &TreeSnapshot {
        &self.manifest
    }

    /// SHA-256 of the canonical manifest.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        self.manifest.fingerprint()
    }

    /// Names of the fixture's top-level entries, in canonical order.
    #[must_use]
    pub fn top_level_entries(&self) -> Vec<String> {
        let root = RelPath::root();
        self.manifest
            .children_of(&root)
            .filter_map(|entry| entry.path.name().map(str::to_string))
            .collect()
    }
}

/// Working-area relative upload source for a fixture entry.
#[must_use]
pub fn source_path(relative: &str) -> String {
    format!("{FIXTURE_DIR}/{relative}")
}

/// Build the fixture under `root`.
///
/// `root` must be absent or empty. Rebuilding after a clean yields the same
/// names and file contents.
///
/// # Errors
///
/// Returns [`ParityError::Precondition`] when `root` already holds entries,
/// or an I/O error when the tree cannot be written.
pub fn build_fixture(root: &Path) -> Result<Fixture> {
    if root.exists() {
        let mut existing = fs::read_dir(root).with_context(|| format!("reading {}", root.display()))?;
        if existing.next().is_some() {
            return Err(ParityError::precondition(format!(
                "fixture directory {} is not empty",
                root.display()
            )));
        }
    }
    fs::create_dir_all(root).with_context(|| format!("creating {}", root.display()))?;

    write_file(&root.join(EMPTY_FILE), "")?;
    write_file(&root.join(NONEMPTY_FILE), NONEMPTY_CONTENTS)?;

    for chain in &CHAINS {
        for leaf in chain.leaf_paths() {
            let dir = leaf.to_fs_path(root);
            fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
            if let Some(name) = chain.leaf_file {
                write_file(&dir.join(name), "")?;
            }
        }
    }

    let manifest = snapshot_local(root)?;
    info!(
        root = %root.display(),
        entries = manifest.len(),
        fingerprint = %manifest.fingerprint(),
        "fixture built"
    );
    Ok(Fixture {
        root: root.to_path_buf(),
        manifest,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}
