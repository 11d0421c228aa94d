//! External Command Execution
//!
//! Runs a single package-manager invocation and converts every outcome
//! (non-zero exit, missing executable, timeout) into a [`CommandOutcome`].
//! Nothing in this module returns an error for a failing child process.
//!
//! Commands are always structured: a program plus explicit arguments,
//! handed to the OS without going through a shell.

use std::fmt;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

/// Interval for polling a child process when a timeout is configured.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long to wait for pipe readers once a timed-out child has been killed.
const KILL_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Creates a command line with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Returns true if any argument equals `arg` exactly.
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Result of running one external command.
///
/// `output` holds captured stdout followed by stderr on success. On failure
/// it holds diagnostic text: the exit status, the reason the executable
/// could not be started, or the timeout that was hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// True when the child exited with status zero
    pub succeeded: bool,
    /// Combined stdout and stderr, or failure diagnostics
    pub output: String,
    /// Captured stdout alone
    pub stdout: String,
}

impl CommandOutcome {
    /// A successful outcome whose output was all written to stdout.
    pub fn success(output: impl Into<String>) -> Self {
        let output = output.into();
        Self {
            succeeded: true,
            stdout: output.clone(),
            output,
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output: output.into(),
            stdout: String::new(),
        }
    }

    /// Replaces the captured stdout, keeping `output` as is.
    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    /// Last non-empty line of output, trimmed.
    pub fn last_line(&self) -> Option<&str> {
        last_non_empty(&self.output)
    }

    /// Last non-empty line written to stdout, ignoring stderr.
    pub fn stdout_last_line(&self) -> Option<&str> {
        last_non_empty(&self.stdout)
    }

    /// One-line description suitable for summaries and logs.
    pub fn diagnostic(&self) -> String {
        self.last_line()
            .map(str::to_string)
            .unwrap_or_else(|| {
                if self.succeeded {
                    "ok".to_string()
                } else {
                    "command failed without output".to_string()
                }
            })
    }
}

/// Executes external commands.
///
/// Implementations spawn at most one process per call and never retry.
pub trait CommandRunner {
    /// Runs `command` to completion.
    ///
    /// With `capture_output` the child's stdout and stderr are collected
    /// into the outcome; otherwise the child inherits the terminal and
    /// streams directly to the user.
    fn run(&self, command: &CommandLine, capture_output: bool) -> CommandOutcome;
}

/// Runs commands as real OS processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    /// Creates a runner that waits indefinitely for each child.
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Creates a runner that kills children running longer than `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandLine, capture_output: bool) -> CommandOutcome {
        debug!("Running: {}", command);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).stdin(Stdio::null());

        if capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        // A timed child gets its own process group so the whole tree can be killed.
        #[cfg(unix)]
        if self.timeout.is_some() {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return spawn_failure(command, &e),
        };

        let outcome = match self.timeout {
            Some(limit) => wait_with_timeout(child, limit, command),
            None => wait(child, command),
        };

        if !outcome.succeeded {
            debug!("'{}' failed: {}", command, outcome.diagnostic());
        }

        outcome
    }
}

/// Converts a spawn error into a failed outcome.
fn spawn_failure(command: &CommandLine, err: &io::Error) -> CommandOutcome {
    if err.kind() == io::ErrorKind::NotFound {
        CommandOutcome::failure(format!("executable not found: {}", command.program))
    } else {
        CommandOutcome::failure(format!("failed to start '{}': {}", command.program, err))
    }
}

/// Waits for the child with no time limit.
fn wait(child: Child, command: &CommandLine) -> CommandOutcome {
    match child.wait_with_output() {
        Ok(output) => outcome_from(output.status, &output.stdout, &output.stderr),
        Err(e) => CommandOutcome::failure(format!(
            "failed to wait for '{}': {}",
            command.program, e
        )),
    }
}

/// Polls the child until it exits or `limit` elapses, killing it in the latter case.
///
/// Pipes are drained on helper threads so a chatty child cannot block on a
/// full pipe while we poll. After a kill the readers get a short grace
/// period; a descendant still holding the pipes is not waited for.
fn wait_with_timeout(mut child: Child, limit: Duration, command: &CommandLine) -> CommandOutcome {
    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);
    let started = Instant::now();

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Ok(status),
            Ok(None) if started.elapsed() >= limit => {
                warn!("'{}' exceeded {:?}, killing it", command, limit);
                kill_tree(&mut child, command);
                break Err(format!("timed out after {:?}", limit));
            }
            Ok(None) => thread::sleep(WAIT_POLL_INTERVAL),
            Err(e) => {
                kill_tree(&mut child, command);
                break Err(format!("failed to wait for '{}': {}", command.program, e));
            }
        }
    };

    match status {
        Ok(status) => {
            let stdout = collect(stdout, None);
            let stderr = collect(stderr, None);
            outcome_from(status, &stdout, &stderr)
        }
        Err(reason) => {
            let stdout = collect(stdout, Some(KILL_DRAIN_GRACE));
            let stderr = collect(stderr, Some(KILL_DRAIN_GRACE));
            let captured = join_streams(&stdout, &stderr);
            let mut text = captured.trim_end().to_string();
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&reason);
            CommandOutcome::failure(text)
        }
    }
}

/// Kills the child and, on unix, every process in its group.
fn kill_tree(child: &mut Child, command: &CommandLine) {
    #[cfg(unix)]
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: kill(2) with a negated pid signals the group created at spawn.
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }

    if let Err(e) = child.kill() {
        debug!("Failed to kill '{}': {}", command.program, e);
    }
    let _ = child.wait();
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

/// Takes a reader's bytes, waiting at most `grace` when given.
fn collect(reader: Option<Receiver<Vec<u8>>>, grace: Option<Duration>) -> Vec<u8> {
    let Some(rx) = reader else {
        return Vec::new();
    };
    match grace {
        Some(grace) => rx.recv_timeout(grace).unwrap_or_default(),
        None => rx.recv().unwrap_or_default(),
    }
}

fn last_non_empty(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
}

fn join_streams(stdout: &[u8], stderr: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stdout).into_owned();
    let err = String::from_utf8_lossy(stderr);

    if !err.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&err);
    }

    text
}

fn outcome_from(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> CommandOutcome {
    let text = join_streams(stdout, stderr);

    if status.success() {
        return CommandOutcome::success(text).with_stdout(String::from_utf8_lossy(stdout));
    }

    let code = status
        .code()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string());

    if text.trim().is_empty() {
        CommandOutcome::failure(format!("exited with status {}", code))
    } else {
        CommandOutcome::failure(format!("exited with status {}\n{}", code, text))
    }
}

/// Test double that records every command and answers from a closure.
#[cfg(test)]
pub(crate) mod scripted {
    use std::cell::RefCell;

    use super::{CommandLine, CommandOutcome, CommandRunner};

    pub(crate) struct ScriptedRunner<F> {
        respond: F,
        calls: RefCell<Vec<CommandLine>>,
    }

    impl<F> ScriptedRunner<F>
    where
        F: Fn(&CommandLine) -> CommandOutcome,
    {
        pub(crate) fn new(respond: F) -> Self {
            Self {
                respond,
                calls: RefCell::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> Vec<CommandLine> {
            self.calls.borrow().clone()
        }

        pub(crate) fn count_with_arg(&self, arg: &str) -> usize {
            self.calls.borrow().iter().filter(|c| c.has_arg(arg)).count()
        }
    }

    impl<F> CommandRunner for ScriptedRunner<F>
    where
        F: Fn(&CommandLine) -> CommandOutcome,
    {
        fn run(&self, command: &CommandLine, _capture_output: bool) -> CommandOutcome {
            self.calls.borrow_mut().push(command.clone());
            (self.respond)(command)
        }
    }
}
