//! Pre and post generation hooks.
//!
//! A hook phase is an ordered list of shell command templates. Each command is
//! rendered against the collected values and run through the shell in the
//! phase's working directory. The first failure stops the phase.

use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{Error, Result};
use crate::template::Template;
use crate::value::Values;

/// Default bound on a hook phase.
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long output is still collected after the command exits.
const OUTPUT_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Runs in the template directory before rendering
    PreGeneration,
    /// Runs in the output directory after rendering
    PostGeneration,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::PreGeneration => f.write_str("pre-generation"),
            Phase::PostGeneration => f.write_str("post-generation"),
        }
    }
}

/// Runs hook phases with a timeout and an optional live output sink.
pub struct HookExecutor {
    timeout: Duration,
    sink: Option<Box<dyn Write + Send>>,
}

impl Default for HookExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_HOOK_TIMEOUT)
    }
}

impl HookExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, sink: None }
    }

    /// Forwards each command's standard output to `sink` while it runs.
    pub fn with_sink<W: Write + Send + 'static>(mut self, sink: W) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.sink.is_some()
    }

    /// Runs `commands` in order, bounded by this executor's timeout.
    pub fn run_phase(
        &mut self,
        phase: Phase,
        commands: &[String],
        work_dir: &Path,
        values: &Values,
    ) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        execute_phase(phase, commands, work_dir, values, deadline, self.sink.as_deref_mut())
    }
}

/// Runs a hook phase.
///
/// All commands are parsed before the first one starts, so a syntax error in
/// any of them fails the phase without side effects. Each command is rendered
/// right before it runs and execution stops at the first failing command.
/// `deadline` bounds the whole phase: a command still running when it passes
/// is killed along with its process group and the phase fails.
///
/// With a `sink`, standard output is forwarded to it as it is produced.
/// Without one, standard error is captured and attached to the failure.
pub fn execute_phase<'s>(
    phase: Phase,
    commands: &[String],
    work_dir: &Path,
    values: &Values,
    deadline: Instant,
    mut sink: Option<&mut (dyn Write + Send + 's)>,
) -> Result<()> {
    if commands.is_empty() {
        return Ok(());
    }

    let context = |command: &str| format!("render hook command `{command}` ({phase})");
    let mut parsed = Vec::with_capacity(commands.len());
    for command in commands {
        let command = command.as_str();
        let template = Template::parse(command).map_err(|e| e.with_context(context(command)))?;
        parsed.push((command, template));
    }

    for &(source, ref template) in &parsed {
        let command = template.render(values).map_err(|e| e.with_context(context(source)))?;
        debug!("Running {phase} hook in '{}': {command}", work_dir.display());
        run_command(phase, &command, work_dir, deadline, sink.as_deref_mut())?;
    }
    debug!("{phase} hooks finished");
    Ok(())
}

fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

/// Output read from the child by a reader thread.
enum Chunk {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
}

fn run_command<'s>(
    phase: Phase,
    command: &str,
    work_dir: &Path,
    deadline: Instant,
    mut sink: Option<&mut (dyn Write + Send + 's)>,
) -> Result<()> {
    let fail = |reason: String| Error::HookCommandError {
        phase: phase.to_string(),
        command: command.to_string(),
        reason,
    };

    let mut cmd = shell_command(command);
    cmd.current_dir(work_dir).stdin(Stdio::null());
    if sink.is_some() {
        cmd.stdout(Stdio::piped()).stderr(Stdio::null());
    } else {
        cmd.stdout(Stdio::null()).stderr(Stdio::piped());
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = cmd.spawn().map_err(|e| fail(format!("failed to start: {e}")))?;

    // Readers are detached: a background process holding the pipes must not
    // keep the phase alive past its deadline.
    let (tx, rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        spawn_reader(stdout, Chunk::Stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_reader(stderr, Chunk::Stderr, tx.clone());
    }
    drop(tx);

    let mut captured = Vec::new();
    let mut status: Option<ExitStatus> = None;
    let mut drain_until = deadline;
    let mut connected = true;

    loop {
        if status.is_none() {
            let exited = child
                .try_wait()
                .map_err(|e| fail(format!("failed to wait for process: {e}")))?;
            if let Some(exited) = exited {
                status = Some(exited);
                drain_until = deadline.min(Instant::now() + OUTPUT_GRACE);
            }
        }

        let now = Instant::now();
        match status {
            Some(_) if !connected || now >= drain_until => break,
            None if now >= deadline => {
                terminate(&mut child);
                return Err(fail("killed after exceeding the hook timeout".to_string()));
            }
            _ => {}
        }

        let wait = POLL_INTERVAL.min(drain_until.saturating_duration_since(now));
        if !connected {
            thread::sleep(wait);
            continue;
        }
        match rx.recv_timeout(wait) {
            Ok(Chunk::Stdout(bytes)) => {
                if let Some(out) = sink.as_deref_mut() {
                    if let Err(e) = out.write_all(&bytes).and_then(|()| out.flush()) {
                        terminate(&mut child);
                        return Err(fail(format!("failed to forward output: {e}")));
                    }
                }
            }
            Ok(Chunk::Stderr(bytes)) => captured.extend_from_slice(&bytes),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => connected = false,
        }
    }

    let Some(status) = status else {
        return Err(fail("process exited without a status".to_string()));
    };
    if status.success() {
        return Ok(());
    }
    let captured = String::from_utf8_lossy(&captured);
    let captured = captured.trim();
    if captured.is_empty() {
        Err(fail(describe_status(status)))
    } else {
        Err(fail(format!("{} (stderr: {captured})", describe_status(status))))
    }
}

/// Reads `from` chunk by chunk until EOF or until nobody is listening.
fn spawn_reader<R>(mut from: R, wrap: fn(Vec<u8>) -> Chunk, tx: Sender<Chunk>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match from.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(wrap(buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Kills the child and everything it started, then reaps it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: killpg only sends a signal. The child was spawned as the
            // leader of its own group and has not been reaped yet.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit status {code}"),
        None => {
            #[cfg(unix)]
            {
                use std::os::unix::process::ExitStatusExt;
                if let Some(signal) = status.signal() {
                    return format!("terminated by signal {signal}");
                }
            }
            "terminated without an exit code".to_string()
        }
    }
}
