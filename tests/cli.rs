use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn minmod() -> Command {
    Command::new(env!("CARGO_BIN_EXE_minmod"))
}

fn write(dir: &Path, name: &str, source: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, source).unwrap();
    path
}

fn run(path: &Path, extra: &[&str]) -> Output {
    minmod().arg(path).args(extra).output().expect("failed to run minmod")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

// --- Successful runs ---

#[test]
fn empty_program_prints_empty_stacks() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&write(dir.path(), "empty.(m)m", "-- nothing\n"), &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "Final stacks:\nIS: []\nDS: []\n");
}

#[test]
fn set_defines_loggable_instruction() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&write(dir.path(), "set.(m)m", "[A [B].. SET]. _x. SET"), &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("_x: [A [B].. SET]"), "got: {text}");
    assert!(!text.contains("\nA:"), "non-loggable name dumped: {text}");
}

#[test]
fn invoked_definition_feeds_data_stack() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&write(dir.path(), "call.(m)m", "[A. B.]. X. SET X"), &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("DS: [B A]"), "got: {}", stdout(&out));
}

#[test]
fn if_skips_value_under_empty_condition() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&write(dir.path(), "if.(m)m", "[A]. [B]. [C]. []. IF"), &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("DS: [[B] [A]]"), "got: {}", stdout(&out));
}

#[test]
fn self_containing_data_stack_renders() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&write(dir.path(), "cycle.(m)m", "DS. UNWRAP"), &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("DS: [&[...]]"), "got: {}", stdout(&out));
}

#[test]
fn custom_loggable_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&write(dir.path(), "log.(m)m", "[B]. RESULT. SET A."), &["--loggable", "^RES"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("RESULT: [B]"), "got: {text}");
    assert!(text.contains("DS: [A]"), "got: {text}");
}

#[test]
fn imports_are_inlined_once() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("lib")).unwrap();
    write(&dir.path().join("lib"), "defs.(m)m", "[L]. _lib. SET");
    let main = write(dir.path(), "main.(m)m", "<./lib/defs.(m)m>\n<./lib/defs.(m)m>\n_lib. UNWRAP");
    let out = run(&main, &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("_lib: [L]"), "got: {text}");
    assert!(text.contains("DS: [&[L]]"), "got: {text}");
}

// --- Failures ---

#[test]
fn uninitialized_instruction_fails_with_state() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&write(dir.path(), "bad.(m)m", "A. X"), &["--color", "never"]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("error[MM-R006]"), "stderr: {err}");
    assert!(err.contains("\"X\""), "stderr: {err}");
    let text = stdout(&out);
    assert!(text.contains("DS: [A]"), "got: {text}");
    assert!(text.contains("IS: [[X]]"), "got: {text}");
}

#[test]
fn wrong_extension_rejected_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&write(dir.path(), "prog.txt", "A"), &["--color", "never"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("MM-S004"), "stderr: {}", stderr(&out));
    assert!(stdout(&out).is_empty());
}

#[test]
fn unbalanced_close_points_at_source() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&write(dir.path(), "close.(m)m", "A\nB ]"), &["--color", "never"]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("error[MM-S007]"), "stderr: {err}");
    assert!(err.contains("close.(m)m:2:3"), "stderr: {err}");
    assert!(err.contains("2 | B ]"), "stderr: {err}");
    assert!(stdout(&out).is_empty());
}

#[test]
fn parse_error_points_at_source() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&write(dir.path(), "dots.(m)m", "A\n[ .. B]"), &["--color", "never"]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("error[MM-P003]"), "stderr: {err}");
    assert!(err.contains("dots.(m)m:2:3"), "stderr: {err}");
    assert!(stdout(&out).is_empty());
}

#[test]
fn stack_split_across_import_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "b.(m)m", "B ]");
    let main = write(dir.path(), "a.(m)m", "[A <./b.(m)m>");
    let out = run(&main, &["--color", "never"]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("MM-S007"), "stderr: {err}");
    assert!(err.contains("a.(m)m:1:1"), "stderr: {err}");
    assert!(stdout(&out).is_empty());
}

#[test]
fn executed_reference_is_malformed_frame() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&write(dir.path(), "ref.(m)m", "[A.]. UNWRAP DS. X. SET X"), &["--color", "never"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("error[MM-R008]"), "stderr: {}", stderr(&out));
    assert!(stdout(&out).starts_with("Final stacks:"));
}

#[test]
fn lex_error_in_import_names_imported_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "bad.(m)m", "A $");
    let main = write(dir.path(), "main.(m)m", "<./bad.(m)m>");
    let out = run(&main, &["--color", "never"]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("MM-S001"), "stderr: {err}");
    assert!(err.contains("bad.(m)m:1:3"), "stderr: {err}");
}

#[test]
fn missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&dir.path().join("nope.(m)m"), &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("MM-S005"), "stderr: {}", stderr(&out));
}

#[test]
fn invalid_loggable_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&write(dir.path(), "p.(m)m", "A"), &["--loggable", "("]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("--loggable"), "stderr: {}", stderr(&out));
}

// --- JSON ---

#[test]
fn json_snapshot_on_success() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&write(dir.path(), "j.(m)m", "[A]. [B]. IF"), &["--json"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let v: serde_json::Value = serde_json::from_str(stdout(&out).trim()).unwrap();
    assert_eq!(v["status"], "success");
    assert_eq!(v["steps"], 6);
    assert_eq!(v["stacks"][1]["name"], "DS");
    assert_eq!(v["stacks"][1]["value"], "[[A]]");
    assert!(v.get("error").is_none());
}

#[test]
fn json_snapshot_on_failure() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&write(dir.path(), "j.(m)m", "SET"), &["--json"]);
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_str(stdout(&out).trim()).unwrap();
    assert_eq!(v["status"], "failure");
    assert_eq!(v["error"]["code"], "MM-R001");
}

#[test]
fn json_diagnostic_for_unclosed_stack() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&write(dir.path(), "j.(m)m", "[A"), &["--json"]);
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_str(stderr(&out).trim()).unwrap();
    assert_eq!(v["code"], "MM-S007");
    assert_eq!(v["labels"][0]["col"], 1);
}

// --- Other modes ---

#[test]
fn explain_known_code() {
    let out = minmod().args(["--explain", "MM-R006"]).output().expect("failed to run minmod");
    assert!(out.status.success());
    assert!(stdout(&out).contains("uninitialized instruction"));
}

#[test]
fn explain_unknown_code() {
    let out = minmod().args(["--explain", "MM-X000"]).output().expect("failed to run minmod");
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn debug_mode_traces_each_step() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&write(dir.path(), "d.(m)m", "A."), &["-d"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let err = stderr(&out);
    assert!(err.contains("-- step 1\nIS: [[A.]]\nDS: []"), "stderr: {err}");
    assert!(err.contains("-- step 3"), "stderr: {err}");
    assert!(stdout(&out).contains("DS: [A]"));
}
