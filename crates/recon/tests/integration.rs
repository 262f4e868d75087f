use std::path::{Path, PathBuf};

use cowork_recon::codec::parse_dataset;
use cowork_recon::{
    reconcile, reconcile_with, KeySpec, KeyStrategy, MalformedPolicy, MergeConfig, MergeError,
    MergeOptions,
};

const HEADER: &str = "Name,Address,Detail URL,Phone,Website,Email";

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Temp dir holding `incoming.csv` and, optionally, `data.csv`.
fn workspace(incoming: &str, master: Option<&str>) -> (tempfile::TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let incoming_path = dir.path().join("incoming.csv");
    let master_path = dir.path().join("data.csv");
    std::fs::write(&incoming_path, incoming).unwrap();
    if let Some(master) = master {
        std::fs::write(&master_path, master).unwrap();
    }
    (dir, incoming_path, master_path)
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

fn names(path: &Path) -> Vec<String> {
    parse_dataset(&read(path))
        .records
        .into_iter()
        .map(|r| r.field(0).to_string())
        .collect()
}

fn no_tmp_files(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .unwrap()
        .all(|e| !e.unwrap().file_name().to_string_lossy().ends_with(".tmp"))
}

// -------------------------------------------------------------------------
// Bootstrap
// -------------------------------------------------------------------------

#[test]
fn bootstrap_copies_incoming_verbatim() {
    // Deliberately messy: duplicates, CRLF, no trailing newline.
    let incoming = format!("{HEADER}\r\nAcme,1 Main\r\nACME,2 Side\r\n\"Beta\",3 Back");
    let (dir, incoming_path, master_path) = workspace(&incoming, None);

    let report = reconcile(&incoming_path, &master_path).unwrap();

    assert!(report.summary.bootstrapped);
    assert_eq!(report.appended_count(), 0);
    assert_eq!(report.summary.incoming_rows, 3);
    assert_eq!(std::fs::read(&master_path).unwrap(), incoming.as_bytes());
    // Incoming is left alone on bootstrap.
    assert_eq!(read(&incoming_path), incoming);
    assert!(no_tmp_files(dir.path()));
}

#[test]
fn bootstrap_dry_run_writes_nothing() {
    let (_dir, incoming_path, master_path) = workspace(&format!("{HEADER}\nAcme\n"), None);
    let opts = MergeOptions {
        dry_run: true,
        ..MergeOptions::default()
    };

    let report = reconcile_with(&incoming_path, &master_path, &opts).unwrap();

    assert!(report.summary.bootstrapped);
    assert!(report.meta.dry_run);
    assert!(!master_path.exists());
}

#[test]
fn empty_master_is_bootstrapped_and_rerun_appends_nothing() {
    let incoming = format!("{HEADER}\nAcme,1 Main\nBeta,2 Side\n");
    for empty in ["", " \n\n"] {
        let (_dir, incoming_path, master_path) = workspace(&incoming, Some(empty));

        let first = reconcile(&incoming_path, &master_path).unwrap();
        assert!(first.summary.bootstrapped);
        assert_eq!(read(&master_path), incoming);

        let second = reconcile(&incoming_path, &master_path).unwrap();
        assert!(!second.summary.bootstrapped);
        assert_eq!(second.appended_count(), 0);

        let master = parse_dataset(&read(&master_path));
        assert_eq!(master.header, HEADER);
        assert_eq!(names(&master_path), vec!["Acme", "Beta"]);
    }
}

// -------------------------------------------------------------------------
// Missing input
// -------------------------------------------------------------------------

#[test]
fn missing_incoming_is_fatal_and_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let incoming_path = dir.path().join("maps_data_playwright.csv");
    let master_path = dir.path().join("data.csv");
    std::fs::write(&master_path, format!("{HEADER}\n\"Acme\"")).unwrap();

    let err = reconcile(&incoming_path, &master_path).unwrap_err();

    assert!(matches!(err, MergeError::MissingIncoming(ref p) if p == &incoming_path));
    assert!(err.to_string().contains("maps_data_playwright.csv"));
    assert_eq!(read(&master_path), format!("{HEADER}\n\"Acme\""));
    assert!(!incoming_path.exists());
}

#[test]
fn same_file_under_another_spelling_is_rejected() {
    let content = format!("{HEADER}\nAcme,1\nacme,2\n");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("x.csv");
    std::fs::write(&path, &content).unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    let alias = dir.path().join("sub").join("..").join("x.csv");
    assert_ne!(path, alias);

    let err = reconcile(&path, &alias).unwrap_err();

    assert!(matches!(err, MergeError::ConfigValidation(_)));
    assert!(err.to_string().contains("different files"));
    assert_eq!(read(&path), content);
    assert!(no_tmp_files(dir.path()));
}

// -------------------------------------------------------------------------
// Dedup
// -------------------------------------------------------------------------

#[test]
fn internal_duplicates_against_header_only_master() {
    let incoming = format!("{HEADER}\nAcme,1 Main\nACME,2 Side\nBeta,3 Back\n");
    let (_dir, incoming_path, master_path) = workspace(&incoming, Some(HEADER));

    let report = reconcile(&incoming_path, &master_path).unwrap();

    assert_eq!(report.summary.kept_rows, 2);
    assert_eq!(report.summary.removed_rows, 1);
    assert_eq!(report.summary.duplicates, 1);
    assert_eq!(report.appended_count(), 2);
    assert_eq!(report.appended_keys, vec!["acme", "beta"]);

    assert_eq!(
        read(&incoming_path),
        format!("{HEADER}\n\"Acme\",\"1 Main\"\n\"Beta\",\"3 Back\"")
    );
    assert_eq!(
        read(&master_path),
        format!("{HEADER}\n\"Acme\",\"1 Main\"\n\"Beta\",\"3 Back\"")
    );
}

#[test]
fn cross_file_duplicates_only_filter_the_append() {
    let incoming = format!("{HEADER}\nbeta works,1 Main\nGamma,2 Side\n");
    let master = format!("{HEADER}\n\"Beta Works\",\"9 Old Rd\"");
    let (_dir, incoming_path, master_path) = workspace(&incoming, Some(&master));

    let report = reconcile(&incoming_path, &master_path).unwrap();

    assert_eq!(report.summary.kept_rows, 2);
    assert_eq!(report.summary.removed_rows, 0);
    assert_eq!(report.appended_count(), 1);
    assert_eq!(names(&incoming_path), vec!["beta works", "Gamma"]);
    assert_eq!(names(&master_path), vec!["Beta Works", "Gamma"]);
}

#[test]
fn empty_names_are_excluded() {
    let incoming = format!("{HEADER}\n\"\",1 Main\n\"   \",2 Side\nDelta,3 Back\n");
    let (_dir, incoming_path, master_path) = workspace(&incoming, Some(HEADER));

    let report = reconcile(&incoming_path, &master_path).unwrap();

    assert_eq!(report.summary.empty_keys, 2);
    assert_eq!(report.summary.duplicates, 0);
    assert_eq!(report.appended_count(), 1);
    assert_eq!(names(&incoming_path), vec!["Delta"]);
    assert_eq!(names(&master_path), vec!["Delta"]);
}

#[test]
fn header_is_kept_even_when_it_differs_from_master() {
    let incoming = "Title,Where\nAcme,1 Main\n";
    let master = format!("{HEADER}\n");
    let (_dir, incoming_path, master_path) = workspace(incoming, Some(&master));

    reconcile(&incoming_path, &master_path).unwrap();

    assert!(read(&incoming_path).starts_with("Title,Where\n"));
    assert_eq!(read(&master_path), format!("{HEADER}\n\"Acme\",\"1 Main\""));
}

#[test]
fn nothing_new_leaves_master_untouched() {
    let master = format!("{HEADER}\n\"Acme\",\"1 Main\"\n");
    let (_dir, incoming_path, master_path) =
        workspace(&format!("{HEADER}\nacme,other\n"), Some(&master));

    let report = reconcile(&incoming_path, &master_path).unwrap();

    assert_eq!(report.appended_count(), 0);
    assert_eq!(read(&master_path), master);
}

#[test]
fn name_address_strategy_keeps_branches() {
    let incoming = format!("{HEADER}\nRegus,1 Main\nRegus,2 Queen\n");
    let master = format!("{HEADER}\n\"Regus\",\"2 Queen\"");
    let (_dir, incoming_path, master_path) = workspace(&incoming, Some(&master));
    let opts = MergeOptions {
        key: KeySpec::with_strategy(KeyStrategy::NameAddress),
        ..MergeOptions::default()
    };

    let report = reconcile_with(&incoming_path, &master_path, &opts).unwrap();

    assert_eq!(report.meta.key_strategy, "name_address");
    assert_eq!(report.summary.kept_rows, 2);
    assert_eq!(report.appended_count(), 1);
    assert_eq!(
        read(&master_path),
        format!("{HEADER}\n\"Regus\",\"2 Queen\"\n\"Regus\",\"1 Main\"")
    );
}

// -------------------------------------------------------------------------
// Idempotence + format
// -------------------------------------------------------------------------

#[test]
fn second_run_appends_nothing() {
    let incoming = format!("{HEADER}\nAcme,1 Main\nacme,dup\nBeta,\"2 Side, Unit 4\"\n");
    let (_dir, incoming_path, master_path) = workspace(&incoming, Some(HEADER));

    let first = reconcile(&incoming_path, &master_path).unwrap();
    let cleaned = read(&incoming_path);
    let master_after_first = read(&master_path);

    let second = reconcile(&incoming_path, &master_path).unwrap();

    assert_eq!(first.appended_count(), 2);
    assert_eq!(second.appended_count(), 0);
    assert_eq!(second.summary.removed_rows, 0);
    assert_eq!(read(&incoming_path), cleaned);
    assert_eq!(read(&master_path), master_after_first);
}

#[test]
fn quotes_and_commas_survive_the_round_trip() {
    let name = r#"He said "hi""#;
    let address = "Main St, Suite 2";
    let incoming = format!("{HEADER}\n\"He said \"\"hi\"\"\",\"Main St, Suite 2\"\n");
    let (_dir, incoming_path, master_path) = workspace(&incoming, Some(HEADER));

    reconcile(&incoming_path, &master_path).unwrap();

    for path in [&incoming_path, &master_path] {
        let ds = parse_dataset(&read(path));
        assert_eq!(ds.records.len(), 1);
        assert_eq!(ds.records[0].field(0), name);
        assert_eq!(ds.records[0].field(1), address);
    }
}

#[test]
fn master_with_trailing_newline_gets_no_blank_line() {
    let master = format!("{HEADER}\n\"Acme\",\"1 Main\"\n");
    let (_dir, incoming_path, master_path) =
        workspace(&format!("{HEADER}\nBeta,2 Side\n"), Some(&master));

    reconcile(&incoming_path, &master_path).unwrap();

    assert_eq!(
        read(&master_path),
        format!("{HEADER}\n\"Acme\",\"1 Main\"\n\"Beta\",\"2 Side\"")
    );
}

// -------------------------------------------------------------------------
// Malformed lines + dry run
// -------------------------------------------------------------------------

#[test]
fn malformed_lines_are_skipped_by_default() {
    let incoming = format!("{HEADER}\nAcme,1 Main\n\"Broken,2 Side\nBeta,3 Back\n");
    let (_dir, incoming_path, master_path) = workspace(&incoming, Some(HEADER));

    let report = reconcile(&incoming_path, &master_path).unwrap();

    assert_eq!(report.summary.incoming_rows, 3);
    assert_eq!(report.summary.malformed_lines, 1);
    assert_eq!(report.summary.removed_rows, 1);
    assert_eq!(report.malformed[0].line_number, 3);
    assert_eq!(names(&incoming_path), vec!["Acme", "Beta"]);
}

#[test]
fn strict_policy_aborts_before_writing() {
    let incoming = format!("{HEADER}\nAcme,1 Main\nacme,dup\n\"Broken,2 Side\n");
    let (dir, incoming_path, master_path) = workspace(&incoming, Some(HEADER));
    let opts = MergeOptions {
        malformed: MalformedPolicy::Strict,
        ..MergeOptions::default()
    };

    let err = reconcile_with(&incoming_path, &master_path, &opts).unwrap_err();

    match err {
        MergeError::Malformed { ref path, ref lines } => {
            assert_eq!(path, &incoming_path);
            assert_eq!(lines.len(), 1);
        }
        ref other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("line 4"));
    assert_eq!(read(&incoming_path), incoming);
    assert_eq!(read(&master_path), HEADER);
    assert!(no_tmp_files(dir.path()));
}

#[test]
fn strict_policy_also_checks_master() {
    let master = format!("{HEADER}\nok\"bad\n");
    let (_dir, incoming_path, master_path) =
        workspace(&format!("{HEADER}\nAcme\n"), Some(&master));
    let opts = MergeOptions {
        malformed: MalformedPolicy::Strict,
        ..MergeOptions::default()
    };

    let err = reconcile_with(&incoming_path, &master_path, &opts).unwrap_err();
    assert!(matches!(err, MergeError::Malformed { ref path, .. } if path == &master_path));
}

#[test]
fn dry_run_reports_without_writing() {
    let incoming = format!("{HEADER}\nAcme,1 Main\nACME,2 Side\nBeta,3 Back\n");
    let (dir, incoming_path, master_path) = workspace(&incoming, Some(HEADER));
    let opts = MergeOptions {
        dry_run: true,
        ..MergeOptions::default()
    };

    let report = reconcile_with(&incoming_path, &master_path, &opts).unwrap();

    assert_eq!(report.appended_count(), 2);
    assert_eq!(report.summary.duplicates, 1);
    assert_eq!(read(&incoming_path), incoming);
    assert_eq!(read(&master_path), HEADER);
    assert!(no_tmp_files(dir.path()));
}

// -------------------------------------------------------------------------
// Fixtures + config
// -------------------------------------------------------------------------

#[test]
fn fixture_batch_via_config() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["incoming.csv", "master.csv", "cowork.toml"] {
        std::fs::copy(fixtures_dir().join(name), dir.path().join(name)).unwrap();
    }

    let config = MergeConfig::load(&dir.path().join("cowork.toml")).unwrap();
    let report = reconcile_with(
        &config.files.incoming,
        &config.files.master,
        &config.options(false),
    )
    .unwrap();

    assert_eq!(report.summary.incoming_rows, 6);
    assert_eq!(report.summary.kept_rows, 4);
    assert_eq!(report.summary.duplicates, 1);
    assert_eq!(report.summary.empty_keys, 1);
    assert_eq!(report.appended_count(), 3);

    assert_eq!(
        names(&config.files.master),
        vec![
            "The Hive Ottawa",
            "Commons London",
            "Workhaus Toronto",
            "Foundry Hamilton",
            r#"Desk "Co" Kitchener"#,
        ]
    );

    let master = read(&config.files.master);
    assert!(!master.contains("\n\n"), "no blank line between old and new rows");
    assert_eq!(master.matches("Name,Address").count(), 1);
}
