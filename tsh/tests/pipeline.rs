use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

use tempfile::{NamedTempFile, tempdir};

fn run_tsh(input: &str) -> Output {
    spawn_tsh(input).wait_with_output().expect("failed to wait for tsh")
}

fn spawn_tsh(input: &str) -> Child {
    let mut child = Command::new(env!("CARGO_BIN_EXE_tsh"))
        .arg("-p")
        .env("TSH_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to execute tsh");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input.as_bytes())
        .expect("write input");
    child
}

#[test]
fn input_redirect_feeds_command() {
    let mut input = NamedTempFile::new().expect("create temp input");
    writeln!(input, "hello").unwrap();
    writeln!(input, "world").unwrap();

    let output = run_tsh(&format!("/bin/cat < {}\n", input.path().display()));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello\nworld\n");
}

#[test]
fn output_redirect_creates_and_truncates() {
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("out.txt");
    fs::write(&path, "previous content that is longer").unwrap();

    let output = run_tsh(&format!("printf sample > {}\n", path.display()));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "");
    assert_eq!(fs::read_to_string(&path).unwrap(), "sample");

    let fresh = dir.path().join("fresh.txt");
    run_tsh(&format!("/bin/echo made > {}\n", fresh.display()));
    assert_eq!(fs::read_to_string(&fresh).unwrap(), "made\n");
}

#[test]
fn missing_input_file_is_reported() {
    let dir = tempdir().expect("create temp dir");
    let missing = dir.path().join("missing.txt");
    let output = run_tsh(&format!("/bin/cat < {}\njobs\n", missing.display()));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        format!("tsh: {}: No such file or directory\n", missing.display())
    );
}

#[test]
fn pipeline_carries_data_left_to_right() {
    let output = run_tsh("/bin/echo hi | tr a-z A-Z\n");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "HI\n");
}

#[test]
fn three_stage_pipeline_with_redirections() {
    let dir = tempdir().expect("create temp dir");
    let input = dir.path().join("in.txt");
    let result = dir.path().join("n.txt");
    fs::write(&input, "b\na\nb\nc\n").unwrap();

    run_tsh(&format!(
        "sort < {} | uniq | wc -l > {}\n",
        input.display(),
        result.display()
    ));
    assert_eq!(fs::read_to_string(&result).unwrap().trim(), "3");
}

#[test]
fn short_pipeline_completes_without_leftover_jobs() {
    let output = run_tsh("false | true\njobs\n");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn malformed_redirect_is_a_syntax_error() {
    let output = run_tsh("/bin/cat <\njobs\n");
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "syntax error: missing file name after '<'\n"
    );
}

#[test]
fn pipeline_job_lasts_until_every_stage_ends() {
    let mut child = spawn_tsh("sleep 1 | true\njobs\n/bin/echo done\n");
    let started = Instant::now();
    let mut reader = BufReader::new(child.stdout.take().expect("stdout"));
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    assert_eq!(line, "done\n");
    assert!(started.elapsed() >= Duration::from_millis(900));
    assert_eq!(child.wait().unwrap().code(), Some(0));
}

#[test]
fn interrupt_reaches_every_stage() {
    let child = spawn_tsh("sleep 5 | sleep 5\njobs\n");
    let started = Instant::now();
    std::thread::sleep(Duration::from_millis(500));
    nix::sys::signal::kill(
        nix::unistd::Pid::from_raw(child.id() as i32),
        nix::sys::signal::Signal::SIGINT,
    )
    .expect("signal tsh");
    let output = child.wait_with_output().unwrap();
    let out = String::from_utf8_lossy(&output.stdout);
    assert!(out.starts_with("Job [1] ("), "{out}");
    assert_eq!(out.lines().count(), 1, "{out}");
    // the pipe closes only once both stages are gone
    assert!(started.elapsed() < Duration::from_secs(4));
}
