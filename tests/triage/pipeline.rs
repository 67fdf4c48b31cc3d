//! End-to-end runs of [`Runner::run_single_test`] with a fake valgrind.

use memtriage::triage::{Runner, TriageConfig, Verdict, DIVIDER, EXIT_FAILURE, EXIT_PASS};
use memtriage::MemtriageError;

use crate::common::reports::*;
use crate::common::test_utils::FakeMemcheck;

fn run(fake: &FakeMemcheck, config: TriageConfig) -> (memtriage::Result<Verdict>, String) {
    let runner = Runner::new(config)
        .unwrap()
        .with_search_path(fake.search_path());
    let mut out = Vec::new();
    let result = runner.run_single_test(&fake.target(), &mut out);
    (result, String::from_utf8(out).unwrap())
}

#[test]
fn missing_executable_is_reported_before_instrumenting() {
    let fake = FakeMemcheck::with_report(&document(&[]));
    let runner = Runner::new(TriageConfig::default())
        .unwrap()
        .with_search_path(fake.search_path());
    let mut out = Vec::new();
    let err = runner
        .run_single_test(&fake.dir.path().join("does-not-exist"), &mut out)
        .unwrap_err();

    assert!(err.is_setup_error());
    assert!(err.to_string().contains("NOT FOUND"));
    assert!(out.is_empty());
    // The tool never ran
    assert!(!fake.dir.path().join("args.txt").exists());
}

#[test]
fn missing_tool_is_a_setup_error() {
    let fake = FakeMemcheck::without_tool();
    let runner = Runner::new(TriageConfig::default())
        .unwrap()
        .with_search_path(fake.dir.path().as_os_str());
    let err = runner
        .run_single_test(&fake.target(), &mut Vec::new())
        .unwrap_err();
    assert!(matches!(err, MemtriageError::ToolNotFound { ref tool } if tool == "valgrind"));
}

#[test]
fn definitely_lost_in_suite_fails_with_frame_line() {
    let xml = document(&[error(
        "Leak_DefinitelyLost",
        "40 bytes in 1 blocks are definitely lost in loss record 3 of 7",
        SUITE_FRAME,
    )]);
    let fake = FakeMemcheck::with_report(&xml);
    let (result, out) = run(&fake, TriageConfig::default());
    let verdict = result.unwrap();

    assert!(out.starts_with(">> running valgrind memcheck on "));
    assert_eq!(verdict.exit_code(), EXIT_FAILURE);
    let report = verdict.render();
    assert_eq!(
        report,
        format!(
            "40 bytes in 1 blocks are definitely lost in loss record 3 of 7\n\
             \toperator new(unsigned long)\n\
             \tvigra::detail::TestSuite::run() (unittest.hxx:601)\n\
             {DIVIDER}\n"
        )
    );
}

#[test]
fn possibly_lost_passes() {
    let xml = document(&[error("Leak_PossiblyLost", "40 bytes possibly lost", SUITE_FRAME)]);
    let fake = FakeMemcheck::with_report(&xml);
    let (result, _) = run(&fake, TriageConfig::default());
    let verdict = result.unwrap();
    assert_eq!(verdict, Verdict::Pass);
    assert_eq!(verdict.exit_code(), EXIT_PASS);
    assert_eq!(verdict.render(), "PASS\n");
}

#[test]
fn definitely_lost_in_system_code_passes() {
    let xml = document(&[error("Leak_DefinitelyLost", "lost", SYSTEM_FRAMES)]);
    let fake = FakeMemcheck::with_report(&xml);
    let (result, _) = run(&fake, TriageConfig::default());
    assert!(result.unwrap().is_pass());
}

#[test]
fn empty_report_passes() {
    let fake = FakeMemcheck::with_report(&document(&[]));
    let (result, _) = run(&fake, TriageConfig::default());
    assert!(result.unwrap().is_pass());
}

#[test]
fn tool_receives_fixed_flags_and_target() {
    let fake = FakeMemcheck::with_report(&document(&[]));
    let (result, _) = run(&fake, TriageConfig::default());
    result.unwrap();

    let args = fake.recorded_args();
    assert_eq!(
        args,
        vec![
            "--tool=memcheck".to_string(),
            "--child-silent-after-fork=yes".to_string(),
            "--leak-check=full".to_string(),
            "--xml=yes".to_string(),
            "--xml-fd=3".to_string(),
            "--num-callers=50".to_string(),
            fake.target().display().to_string(),
        ]
    );
}

#[test]
fn noise_lines_in_report_are_ignored() {
    let xml = format!(
        "<unknown program name>: warning: unknown option\n{}profiling: /build/x.gcda: cannot merge previous GCDA file\n",
        document(&[error("Leak_DefinitelyLost", "lost", TEST_FILE_FRAME)])
    );
    let fake = FakeMemcheck::with_report(&xml);
    let (result, _) = run(&fake, TriageConfig::default());
    assert!(!result.unwrap().is_pass());
}

#[test]
fn truncated_report_is_malformed() {
    let full = document(&[error("Leak_DefinitelyLost", "lost", TEST_FILE_FRAME)]);
    let fake = FakeMemcheck::with_report(&full[..full.len() / 2]);
    let (result, _) = run(&fake, TriageConfig::default());
    assert!(matches!(result, Err(MemtriageError::MalformedReport(_))));
}

#[test]
fn configured_markers_change_attribution() {
    let xml = document(&[error("Leak_DefinitelyLost", "lost", SYSTEM_FRAMES)]);
    let fake = FakeMemcheck::with_report(&xml);
    let config = TriageConfig::from_json_str(r#"{"markers": {"project_markers": ["_dl_init"]}}"#)
        .unwrap();
    let (result, _) = run(&fake, config);
    assert!(!result.unwrap().is_pass());
}
