//! Bounded execution of external diagnostic commands.
//!
//! A command gets one wall-clock budget covering both process exit and
//! stdout collection. Stdout is drained on a helper thread while the
//! caller polls for exit, so a child that writes more than a pipe buffer
//! can never stall the probe past its deadline.

use std::fmt;
use std::io::{self, Read};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{killpg, Signal};
#[cfg(unix)]
use nix::unistd::Pid;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use tracing::{debug, warn};

use crate::errors::{ProbeError, ProbeResult};
use crate::outcome::ProbeOutcome;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(5);
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|arg| (*arg).to_string()).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum CommandOutcome {
    /// Exited in time with non-empty stdout.
    Output(String),
    /// Exited in time without writing anything.
    Silent,
    /// The program is not installed.
    NotFound,
    TimedOut,
    Failed(ProbeError),
}

impl CommandOutcome {
    /// Classification used by presence-style commands (`which su`,
    /// `pidof <name>`), where any output at all is the signal.
    pub fn into_presence_outcome(self, command: &CommandSpec) -> ProbeOutcome {
        match self {
            Self::Output(_) => ProbeOutcome::detected(format!("`{}` produced output", command)),
            Self::Silent => ProbeOutcome::Clear,
            Self::NotFound => ProbeOutcome::ToolMissing {
                tool: command.program.clone(),
            },
            Self::TimedOut => ProbeOutcome::TimedOut {
                detail: format!("`{}` did not exit in time", command),
            },
            Self::Failed(err) => ProbeOutcome::faulted(format!("`{}`: {}", command, err)),
        }
    }
}

/// Owns a spawned child until it has been reaped.
///
/// Dropping an unreaped guard kills and waits on the child, so every exit
/// path out of a probe releases the process and its pipes. A guard built
/// with [`ChildGuard::group_leader`] also kills every process left in the
/// child's process group, which closes pipe ends inherited by descendants.
#[derive(Debug)]
pub struct ChildGuard {
    child: Child,
    reaped: bool,
    group_leader: bool,
    group_killed: bool,
}

impl ChildGuard {
    pub fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
            group_leader: false,
            group_killed: false,
        }
    }

    /// The child must have been spawned as leader of its own process group.
    pub fn group_leader(child: Child) -> Self {
        Self {
            child,
            reaped: false,
            group_leader: true,
            group_killed: false,
        }
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Polls for exit until `deadline`. Returns `Ok(false)` when the child
    /// is still running at the deadline.
    pub fn wait_until(&mut self, deadline: Instant) -> io::Result<bool> {
        loop {
            if self.child.try_wait()?.is_some() {
                self.reaped = true;
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            thread::sleep(WAIT_POLL_INTERVAL.min(deadline - now));
        }
    }

    pub fn terminate(&mut self) {
        self.kill_group();
        if self.reaped {
            return;
        }
        if let Err(err) = self.child.kill() {
            // InvalidInput means the child already exited.
            if err.kind() != io::ErrorKind::InvalidInput {
                warn!(pid = self.child.id(), error = %err, "failed killing probe child");
            }
        }
        match self.child.wait() {
            Ok(_) => self.reaped = true,
            Err(err) => warn!(pid = self.child.id(), error = %err, "failed reaping probe child"),
        }
    }
}

impl ChildGuard {
    #[cfg(unix)]
    fn kill_group(&mut self) {
        if !self.group_leader || self.group_killed {
            return;
        }
        self.group_killed = true;
        let pgid = Pid::from_raw(self.child.id() as i32);
        match killpg(pgid, Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(err) => warn!(
                pgid = self.child.id(),
                error = %err,
                "failed killing probe process group"
            ),
        }
    }

    #[cfg(not(unix))]
    fn kill_group(&mut self) {}
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.terminate();
    }
}

pub fn run_bounded(command: &CommandSpec, timeout: Duration) -> CommandOutcome {
    let deadline = Instant::now() + timeout;
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    #[cfg(unix)]
    cmd.process_group(0);
    let mut guard = match cmd.spawn() {
        Ok(child) => ChildGuard::group_leader(child),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(command = %command, "probe command not installed");
            return CommandOutcome::NotFound;
        }
        Err(err) => return CommandOutcome::Failed(ProbeError::Spawn(err)),
    };

    let Some(stdout) = guard.take_stdout() else {
        return CommandOutcome::Failed(ProbeError::OutputChannelClosed);
    };
    let output = match drain_in_background(stdout) {
        Ok(rx) => rx,
        Err(err) => return CommandOutcome::Failed(err),
    };

    match guard.wait_until(deadline) {
        Ok(true) => {}
        Ok(false) => {
            guard.terminate();
            wait_for_reader(&output);
            warn!(
                command = %command,
                pid = guard.id(),
                timeout_ms = timeout.as_millis() as u64,
                "probe command timed out; child killed"
            );
            return CommandOutcome::TimedOut;
        }
        Err(err) => return CommandOutcome::Failed(ProbeError::Wait(err)),
    }

    let budget = deadline
        .saturating_duration_since(Instant::now())
        .max(OUTPUT_DRAIN_GRACE);
    match output.recv_timeout(budget) {
        Ok(Ok(bytes)) if bytes.is_empty() => CommandOutcome::Silent,
        Ok(Ok(bytes)) => CommandOutcome::Output(String::from_utf8_lossy(&bytes).into_owned()),
        Ok(Err(err)) => CommandOutcome::Failed(err),
        // A descendant kept the pipe open after the child exited.
        Err(RecvTimeoutError::Timeout) => {
            guard.terminate();
            wait_for_reader(&output);
            warn!(command = %command, "probe command left a descendant holding stdout");
            CommandOutcome::TimedOut
        }
        Err(RecvTimeoutError::Disconnected) => {
            CommandOutcome::Failed(ProbeError::OutputChannelClosed)
        }
    }
}

fn drain_in_background(
    mut stdout: ChildStdout,
) -> ProbeResult<mpsc::Receiver<ProbeResult<Vec<u8>>>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("rootguard-stdout".to_string())
        .spawn(move || {
            let mut buf = Vec::new();
            let result = stdout
                .read_to_end(&mut buf)
                .map(|_| buf)
                .map_err(ProbeError::Io);
            drop(stdout);
            let _ = tx.send(result);
        })
        .map_err(ProbeError::Io)?;
    Ok(rx)
}

/// Once the process group is gone the pipe reaches EOF; the reader closes
/// its end before reporting, so a reply here means the descriptor is released.
fn wait_for_reader(output: &mpsc::Receiver<ProbeResult<Vec<u8>>>) {
    if output.recv_timeout(OUTPUT_DRAIN_GRACE).is_err() {
        debug!("stdout reader still running after process group kill");
    }
}
