//! End-to-end tests for the pipesh binary.
//!
//! Each test feeds a script to the compiled shell over a piped stdin
//! and asserts on the collected stdout/stderr. Keeping fork and wait
//! inside a separate spawned process avoids any interaction with the
//! multithreaded test harness.

use std::io::Write;
use std::process::{Command, Output, Stdio};

/// Run the shell to completion on `script` (one command line per
/// input line) and collect its output.
fn run_shell(script: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_pipesh"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn pipesh");

    child
        .stdin
        .take()
        .expect("stdin was piped")
        .write_all(script.as_bytes())
        .expect("failed to write script");

    child.wait_with_output().expect("failed to wait for pipesh")
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn single_command_inherits_stdio() {
    let output = run_shell("echo solo\n");
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("solo"));
}

#[test]
fn two_stage_pipeline_moves_bytes_through_the_pipe() {
    let output = run_shell("echo hi | cat\n");
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("hi"));
}

#[test]
fn three_stage_pipeline_prints_only_the_last_stage() {
    let output = run_shell("false | true | echo done\n");
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("done"));
    assert!(!stderr_of(&output).contains("command not found"));
}

#[test]
fn missing_command_is_reported_and_the_loop_survives() {
    let output = run_shell("nonexistentcmd123\necho still alive\n");
    assert!(output.status.success());
    assert!(
        stderr_of(&output).contains("command not found: nonexistentcmd123"),
        "stderr was: {}",
        stderr_of(&output)
    );
    assert!(stdout_of(&output).contains("still alive"));
}

#[test]
fn missing_pipeline_stage_does_not_stop_its_siblings() {
    let output = run_shell("nonexistentcmd123 | echo reached\n");
    assert!(output.status.success());
    assert!(stderr_of(&output).contains("command not found: nonexistentcmd123"));
    assert!(stdout_of(&output).contains("reached"));
}

#[test]
fn parse_error_is_reported_and_the_loop_survives() {
    let output = run_shell("echo a | | cat\necho recovered\n");
    assert!(output.status.success());
    assert!(stderr_of(&output).contains("empty command"));
    assert!(stdout_of(&output).contains("recovered"));
}

#[test]
fn blank_lines_are_skipped() {
    let output = run_shell("\n   \necho after blanks\n");
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("after blanks"));
}

#[test]
fn quoting_keeps_pipes_literal() {
    let output = run_shell("echo 'a | b'\n");
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("a | b"));
}

#[test]
fn descriptor_table_is_stable_across_iterations() {
    // A child's fd listing reflects everything it inherited from the
    // shell; if the loop leaked a pipe end per line, the second count
    // would be higher than the first.
    let probe = "sh -c 'ls /proc/self/fd | wc -l'\n";
    let mut script = String::from(probe);
    for _ in 0..40 {
        script.push_str("echo x | cat\n");
    }
    script.push_str(probe);

    let output = run_shell(&script);
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    let counts: Vec<&str> = stdout
        .lines()
        .filter(|l| l.trim().chars().all(|c| c.is_ascii_digit()) && !l.trim().is_empty())
        .collect();
    assert!(
        counts.len() >= 2,
        "expected two fd counts in output: {stdout:?}"
    );
    assert_eq!(
        counts.first(),
        counts.last(),
        "fd table grew across iterations: {stdout:?}"
    );
}
