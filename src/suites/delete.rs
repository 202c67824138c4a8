use crate::fixture::{EMPTY_FILE, Fixture, NONEMPTY_FILE, source_path};
use crate::model::{Operation, PatternMode};
use crate::scenario::{Scenario, Suite};

fn rm(targets: &[&str]) -> Operation {
    Operation::delete(targets.iter().copied(), false, PatternMode::Glob)
}

fn rm_rf(targets: &[&str]) -> Operation {
    Operation::delete(targets.iter().copied(), true, PatternMode::Glob)
}

fn rm_rf_regex(targets: &[&str]) -> Operation {
    Operation::delete(targets.iter().copied(), true, PatternMode::ExtendedRegex)
}

/// Delete family. Baseline: every top-level fixture entry uploaded to `/`.
#[must_use]
pub fn delete_suite(fixture: &Fixture) -> Suite {
    let baseline_sources: Vec<String> = fixture
        .top_level_entries()
        .iter()
        .map(|name| source_path(name))
        .collect();

    let scenarios = vec![
        Scenario::new("clean comparison"),
        Scenario::new("empty file").remote(rm(&[EMPTY_FILE])),
        Scenario::new("re-upload over an existing file")
            .remote(Operation::upload([source_path(EMPTY_FILE)], Some("/"))),
        Scenario::new("non-empty file").remote(rm(&[NONEMPTY_FILE])),
        Scenario::new("empty folder").remote(rm_rf(&["le01/les01/less01"])),
        Scenario::new("folder with one file").remote(rm_rf(&["lf01/lfs01/lfss01"])),
        Scenario::new("entire empty folder structure").remote(rm_rf(&["le01"])),
        Scenario::new("entire non-empty folder structure").remote(rm_rf(&["lf01"])),
        Scenario::new("multiple targets").remote(rm_rf(&["lf01", "le01/les01"])),
        Scenario::new("current folder as .")
            .remote(Operation::cd("le01"))
            .remote(rm_rf(&["."]))
            .remote(Operation::cd("/")),
        Scenario::new("parent folder as ..")
            .remote(Operation::cd("le01/les01"))
            .remote(rm_rf(&[".."]))
            .remote(Operation::cd("/")),
        Scenario::new("sibling through ../")
            .remote(Operation::cd("le01/les01"))
            .remote(rm_rf(&["../les01"]))
            .remote(Operation::cd("/")),
        Scenario::new("names with spaces").remote(rm_rf(&["ls 01"])),
        Scenario::new("structural .. with a glob").remote(rm_rf(&["ls 01/../le01/les01", "lf01/../ls*/ls s02"])),
        Scenario::new("structural .. with extended regex")
            .remote(rm_rf_regex(&["ls 01/../le01/les0[12]", "lf01/../ls.*/ls s0[12]"])),
        Scenario::new("nested file with spaces").remote(rm(&["ls 01/ls s02/ls ss01/common file.txt"])),
        Scenario::new("glob over sibling folders").remote(rm_rf(&["le01/les*"])),
        Scenario::new("extended regex over sibling folders")
            .remote(Operation::mkdir(["x1", "x2", "x10"]))
            .remote(rm_rf_regex(&["x[12]"])),
        Scenario::new("single-character glob over sibling folders")
            .remote(Operation::mkdir(["x1", "x2", "x10"]))
            .remote(rm_rf(&["x?"])),
        Scenario::new("nested file without recursion").remote(rm(&["lf01/lfs01/lfss01/commonfile.txt"])),
        Scenario::new("non-empty folder without recursion")
            .remote(rm(&["lf01"]))
            .expecting_failure(),
    ];

    Suite {
        name: "delete".to_string(),
        baseline: vec![Operation::upload(baseline_sources, Some("/"))],
        scenarios,
    }
}
