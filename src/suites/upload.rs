use crate::fixture::{EMPTY_FILE, NONEMPTY_FILE, source_path};
use crate::model::Operation;
use crate::scenario::{STAGING_DIR, Scenario, StagingAction, Suite};

fn staged(relative: &str) -> String {
    format!("{STAGING_DIR}/{relative}")
}

fn put<S: AsRef<str>>(sources: &[S], destination: Option<&str>) -> Operation {
    Operation::upload(sources.iter().map(AsRef::as_ref), destination)
}

/// Upload family. Baseline: `01/s01/ss01`, `01/s02/ss01`, `01/s02/ss02`.
#[must_use]
pub fn upload_suite() -> Suite {
    let empty_file = source_path(EMPTY_FILE);
    let nonempty_file = source_path(NONEMPTY_FILE);
    let le01 = source_path("le01");
    let lf01 = source_path("lf01");
    let root_file = format!("/{EMPTY_FILE}");

    let scenarios = vec![
        Scenario::new("clean comparison"),
        Scenario::new("empty file, no destination").remote(put(&[&empty_file], None)),
        Scenario::new("empty file onto /").remote(put(&[&empty_file], Some("/"))),
        Scenario::new("non-empty file, no destination").remote(put(&[&nonempty_file], None)),
        Scenario::new("updated non-empty file")
            .stage(StagingAction::WriteFile {
                path: NONEMPTY_FILE.to_string(),
                contents: "newfile01contents".to_string(),
            })
            .remote(put(&[&staged(NONEMPTY_FILE)], None)),
        Scenario::new("empty folder").remote(put(&[&source_path("le01/les01/less01")], None)),
        Scenario::new("folder with one file").remote(put(&[&source_path("lf01/lfs01/lfss01")], None)),
        Scenario::new("entire empty folder structure").remote(put(&[&le01], None)),
        Scenario::new("entire non-empty folder structure").remote(put(&[&lf01], None)),
        Scenario::new("structure into subfolder").remote(put(&[&le01], Some("/01/s01"))),
        Scenario::new("copy of the exact structure")
            .stage(StagingAction::CopyFromReference {
                from: "01".to_string(),
                into: String::new(),
            })
            .remote(put(&[&staged("01/s01")], Some("/01/s01"))),
        Scenario::new("merge an increased structure")
            .stage(StagingAction::CopyFromReference {
                from: "01".to_string(),
                into: String::new(),
            })
            .stage(StagingAction::Touch {
                path: "01/s01/another.txt".to_string(),
            })
            .remote(put(&[&staged("01/s01")], Some("/01/"))),
        Scenario::new("multiple sources").remote(put(&[&le01, &lf01], Some("/01/s01"))),
        Scenario::new("local wildcard").remote(put(&[&source_path("*txt")], Some("/01/s01"))),
        Scenario::new("destination through ..")
            .remote(Operation::cd("01"))
            .remote(put(&[&le01], Some("../01/s01")))
            .remote(Operation::cd("/")),
        Scenario::new("names with spaces").remote(put(&[&source_path("ls 01")], None)),
        Scenario::new("replace a file at the root")
            .remote(put(&[&empty_file], Some("/")))
            .remote(put(&[&nonempty_file], Some(root_file.as_str()))),
        Scenario::new("replace a file in a subfolder")
            .remote(put(&[&nonempty_file], Some("/01/s01/target.txt")))
            .remote(put(&[&empty_file], Some("/01/s01/target.txt"))),
        Scenario::new("upload under a new name").remote(put(&[&nonempty_file], Some("/01/renamed.txt"))),
        Scenario::new("create missing destination folders")
            .remote(Operation::upload_creating(&nonempty_file, "/new_dir/deeper/renamed.txt")),
        Scenario::new("multiple files onto a file")
            .remote(put(&[&empty_file], Some("/target.txt")))
            .remote(put(&[&empty_file, &nonempty_file], Some("/target.txt")))
            .expecting_failure(),
        Scenario::new("missing destination folder")
            .remote(put(&[&empty_file], Some("/missing/deeper/file.txt")))
            .expecting_failure(),
        Scenario::new("folder onto a file")
            .remote(put(&[&empty_file], Some("/target.txt")))
            .remote(put(&[&le01], Some("/target.txt")))
            .expecting_failure(),
    ];

    Suite {
        name: "upload".to_string(),
        baseline: vec![Operation::mkdir(["01/s01/ss01", "01/s02/ss01", "01/s02/ss02"])],
        scenarios,
    }
}
