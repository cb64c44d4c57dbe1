#![cfg(unix)]

use std::fs;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cutr::error::Error;
use cutr::hooks::{execute_phase, HookExecutor, Phase};
use cutr::value::{Value, Values};
use tempfile::TempDir;

fn values() -> Values {
    let mut values = Values::new();
    values.insert("name".to_string(), Value::from("demo"));
    values
}

fn commands(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

/// Shared buffer usable as a `'static` sink.
#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_commands_run_in_order_in_work_dir() {
    let dir = TempDir::new().unwrap();
    let cmds = commands(&["echo first > log.txt", "echo {{ .name }} >> log.txt"]);

    HookExecutor::default().run_phase(Phase::PostGeneration, &cmds, dir.path(), &values()).unwrap();

    assert_eq!(fs::read_to_string(dir.path().join("log.txt")).unwrap(), "first\ndemo\n");
}

#[test]
fn test_stops_at_first_failure() {
    let dir = TempDir::new().unwrap();
    let cmds = commands(&["touch one", "exit 3", "touch two"]);

    let err = HookExecutor::default()
        .run_phase(Phase::PreGeneration, &cmds, dir.path(), &values())
        .unwrap_err();

    match err {
        Error::HookCommandError { phase, command, reason } => {
            assert_eq!(phase, "pre-generation");
            assert_eq!(command, "exit 3");
            assert_eq!(reason, "exit status 3");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(dir.path().join("one").exists());
    assert!(!dir.path().join("two").exists());
}

#[test]
fn test_stderr_is_attached_to_failure() {
    let dir = TempDir::new().unwrap();
    let cmds = commands(&["echo broken pipe >&2; exit 1"]);

    let err = HookExecutor::default()
        .run_phase(Phase::PostGeneration, &cmds, dir.path(), &values())
        .unwrap_err();
    assert!(err.to_string().contains("exit status 1 (stderr: broken pipe)"), "{err}");
}

#[test]
fn test_render_error_stops_at_that_command() {
    let dir = TempDir::new().unwrap();
    let cmds = commands(&["touch created", "echo {{ .missing }}"]);

    let err = HookExecutor::default()
        .run_phase(Phase::PostGeneration, &cmds, dir.path(), &values())
        .unwrap_err();

    match err {
        Error::TemplateExecutionError { context, .. } => {
            assert!(context.starts_with("render hook command `echo {{ .missing }}`"), "{context}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(dir.path().join("created").exists());
}

#[test]
fn test_parse_error_runs_nothing() {
    let dir = TempDir::new().unwrap();
    let cmds = commands(&["touch created", "echo {{ if .name }}"]);

    let err = HookExecutor::default()
        .run_phase(Phase::PreGeneration, &cmds, dir.path(), &values())
        .unwrap_err();

    assert!(matches!(err, Error::TemplateParseError { .. }));
    assert!(!dir.path().join("created").exists());
}

#[test]
fn test_unknown_command_fails() {
    let dir = TempDir::new().unwrap();
    let cmds = commands(&["definitely-not-a-real-command-4242"]);

    let err = HookExecutor::default()
        .run_phase(Phase::PreGeneration, &cmds, dir.path(), &values())
        .unwrap_err();
    assert!(matches!(err, Error::HookCommandError { ref reason, .. } if reason.starts_with("exit status 127")));
}

#[test]
fn test_timeout_kills_command() {
    let dir = TempDir::new().unwrap();
    let cmds = commands(&["exec sleep 5"]);
    let started = Instant::now();

    let err = HookExecutor::new(Duration::from_millis(200))
        .run_phase(Phase::PostGeneration, &cmds, dir.path(), &values())
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(matches!(
        err,
        Error::HookCommandError { ref reason, .. } if reason == "killed after exceeding the hook timeout"
    ));
}

#[test]
fn test_timeout_kills_forked_children() {
    let dir = TempDir::new().unwrap();
    let cmds = commands(&["sleep 5; true", "touch after"]);
    let started = Instant::now();

    let err = HookExecutor::new(Duration::from_millis(200))
        .run_phase(Phase::PreGeneration, &cmds, dir.path(), &values())
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
    assert!(matches!(
        err,
        Error::HookCommandError { ref reason, .. } if reason == "killed after exceeding the hook timeout"
    ));
    assert!(!dir.path().join("after").exists());
}

#[test]
fn test_timeout_kills_forked_children_while_streaming() {
    let dir = TempDir::new().unwrap();
    let cmds = commands(&["echo started; sleep 5; echo never"]);
    let sink = SharedSink::default();
    let started = Instant::now();

    let err = HookExecutor::new(Duration::from_millis(300))
        .with_sink(sink.clone())
        .run_phase(Phase::PostGeneration, &cmds, dir.path(), &values())
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
    assert!(matches!(err, Error::HookCommandError { .. }));
    let output = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
    assert_eq!(output, "started\n");
}

/// Sink that rejects every write.
struct BrokenSink;

impl Write for BrokenSink {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "sink closed"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_sink_failure_fails_the_command() {
    let dir = TempDir::new().unwrap();
    let cmds = commands(&["yes | head -c 1000000", "touch after"]);
    let started = Instant::now();

    let err = HookExecutor::new(Duration::from_secs(30))
        .with_sink(BrokenSink)
        .run_phase(Phase::PostGeneration, &cmds, dir.path(), &values())
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(10));
    match err {
        Error::HookCommandError { reason, .. } => {
            assert!(reason.starts_with("failed to forward output: sink closed"), "{reason}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!dir.path().join("after").exists());
}

#[test]
fn test_background_process_does_not_hold_the_phase() {
    let dir = TempDir::new().unwrap();
    let cmds = commands(&["sleep 5 & echo done"]);
    let started = Instant::now();

    HookExecutor::new(Duration::from_secs(30))
        .run_phase(Phase::PostGeneration, &cmds, dir.path(), &values())
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
}

#[test]
fn test_streaming_forwards_stdout_only() {
    let dir = TempDir::new().unwrap();
    let sink = SharedSink::default();
    let cmds = commands(&["echo hello {{ .name }}", "echo quiet >&2", "echo bye"]);

    let mut executor = HookExecutor::default().with_sink(sink.clone());
    assert!(executor.is_streaming());
    executor.run_phase(Phase::PostGeneration, &cmds, dir.path(), &values()).unwrap();

    let output = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
    assert_eq!(output, "hello demo\nbye\n");
}

#[test]
fn test_empty_phase_is_noop() {
    let missing_dir = std::path::Path::new("/nonexistent/cutr/hooks");
    let deadline = Instant::now();
    assert!(execute_phase(Phase::PreGeneration, &[], missing_dir, &values(), deadline, None).is_ok());
}

#[test]
fn test_phase_display() {
    assert_eq!(Phase::PreGeneration.to_string(), "pre-generation");
    assert_eq!(Phase::PostGeneration.to_string(), "post-generation");
}
