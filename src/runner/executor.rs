//! Compiler execution
//!
//! Maps a [`TestCase`] to `<compiler> [--parse-only|--semantic-only] <fixture>` and runs it as a child process,
//! capturing both streams, the exit status and the wall-clock time.
//!
//! Nothing in here returns an error to the caller. A compiler that cannot be launched, cannot be waited on, or
//! overruns the optional timeout produces a [`ProcessOutput`] whose [`Termination`] says so, with the failure
//! text on stderr and exit status `-1`.

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use super::interfaces::CompilerExecutor;
use crate::case::TestCase;

/// Exit status recorded when no real status exists.
pub const SYNTHETIC_EXIT_STATUS: i32 = -1;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long captured streams may stay open after the deadline or the kill.
const READER_GRACE: Duration = Duration::from_millis(100);

/// How the child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited on its own with a status code.
    Exited,
    /// Killed by the given signal (Unix).
    Signaled(i32),
    /// Killed by the harness after the timeout elapsed.
    TimedOut,
    /// Never started, or could not be waited on.
    LaunchFailed,
}

impl Termination {
    /// Whether the compiler actually ran to completion, successfully or not.
    pub fn completed(self) -> bool {
        matches!(self, Termination::Exited | Termination::Signaled(_))
    }
}

/// Everything captured from one compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// The invocation, rendered for display
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    /// Exit status; `-signal` for signal deaths, `-1` when there is none
    pub return_code: i32,
    pub duration: Duration,
    pub termination: Termination,
}

impl ProcessOutput {
    /// A normally exited process.
    pub fn exited(
        command: impl Into<String>,
        return_code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
            return_code,
            duration: Duration::ZERO,
            termination: Termination::Exited,
        }
    }

    /// A process that could not be launched or waited on.
    pub fn launch_failure(command: impl Into<String>, error: &io::Error, duration: Duration) -> Self {
        Self {
            command: command.into(),
            stdout: String::new(),
            stderr: error.to_string(),
            return_code: SYNTHETIC_EXIT_STATUS,
            duration,
            termination: Termination::LaunchFailed,
        }
    }
}

/// Build the argument vector for a fixture: program, optional mode flag, fixture path.
pub fn build_invocation(compiler: &Path, case: &TestCase) -> Vec<OsString> {
    let mut argv = vec![compiler.as_os_str().to_owned()];
    if let Some(flag) = case.mode().flag() {
        argv.push(OsString::from(flag));
    }
    argv.push(case.filename().as_os_str().to_owned());
    argv
}

fn render_invocation(argv: &[OsString]) -> String {
    argv.iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs the real compiler binary.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    compiler: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new(compiler: impl Into<PathBuf>) -> Self {
        Self {
            compiler: compiler.into(),
            timeout: None,
        }
    }

    /// Kill the compiler if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, argv: &[OsString], command: String, start: Instant) -> io::Result<ProcessOutput> {
        let (program, args) = argv.split_first().ok_or_else(|| io::Error::other("empty invocation"))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // A deadline past the end of the clock means no deadline at all.
        let deadline = self.timeout.and_then(|t| start.checked_add(t).map(|d| (t, d)));
        let Some((timeout, deadline)) = deadline else {
            let output = child.wait_with_output()?;
            let (return_code, termination) = classify(output.status);
            return Ok(ProcessOutput {
                command,
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                return_code,
                duration: start.elapsed(),
                termination,
            });
        };

        // Pipes must be drained while polling or a full pipe buffer stalls the child.
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let status = wait_with_deadline(&mut child, deadline)?;

        // Descendants of a killed child may still hold the pipes open.
        let drain_by = match status {
            Some(_) => deadline,
            None => Instant::now(),
        };
        let drain_by = drain_by.checked_add(READER_GRACE).unwrap_or(drain_by);
        let stdout = collect_reader(stdout, drain_by);
        let mut stderr = collect_reader(stderr, drain_by);

        let (return_code, termination) = match status {
            Some(status) => classify(status),
            None => {
                if !stderr.is_empty() && !stderr.ends_with('\n') {
                    stderr.push('\n');
                }
                stderr.push_str(&format!("timed out after {:.1}s", timeout.as_secs_f64()));
                (SYNTHETIC_EXIT_STATUS, Termination::TimedOut)
            }
        };

        Ok(ProcessOutput {
            command,
            stdout,
            stderr,
            return_code,
            duration: start.elapsed(),
            termination,
        })
    }
}

impl CompilerExecutor for ProcessExecutor {
    #[tracing::instrument(skip_all, fields(fixture = %case.filename().display()))]
    fn execute(&self, case: &TestCase) -> ProcessOutput {
        let argv = build_invocation(&self.compiler, case);
        let command = render_invocation(&argv);
        tracing::debug!("Running command: {command}");

        let start = Instant::now();
        match self.run(&argv, command.clone(), start) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(command = %command, "failed to run compiler: {e}");
                ProcessOutput::launch_failure(command, &e, start.elapsed())
            }
        }
    }
}

/// Poll until the child exits or the deadline passes. `None` means it was killed.
fn wait_with_deadline(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Take a reader's text, or give up on it (empty) if the pipe is still open at `by`.
fn collect_reader(reader: Option<mpsc::Receiver<String>>, by: Instant) -> String {
    reader
        .and_then(|rx| rx.recv_timeout(by.saturating_duration_since(Instant::now())).ok())
        .unwrap_or_default()
}

fn classify(status: ExitStatus) -> (i32, Termination) {
    if let Some(code) = status.code() {
        return (code, Termination::Exited);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return (-signal, Termination::Signaled(signal));
        }
    }
    (SYNTHETIC_EXIT_STATUS, Termination::Exited)
}
