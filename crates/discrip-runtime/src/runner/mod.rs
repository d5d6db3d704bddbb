//! Invocation of `makemkvcon` against a single drive.
//!
//! # Lifecycle of one command
//!
//! 1. Acquire the device lock and allocate the next command number
//! 2. Emit `Start`, spawn the tool with stdout piped
//! 3. Decode stdout line by line into the queue and the command history
//! 4. Once the tool exits, drain what is still buffered and reap it
//! 5. Emit `Stop`, optionally wait for the consumer to drain the queue
//!
//! The lock is held for the whole sequence, so commands against one drive
//! never interleave and drive control requests wait for them.

mod queue;
mod setup;

pub use queue::EVENT_QUEUE_CAPACITY;
pub use setup::{SetupError, prime, register_key};

use std::ffi::OsString;
use std::io;
use std::process::Stdio;
use std::time::Duration;

use discrip_core::{CommandExecution, DiscSummary, Event, Source, decode};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::lock::DeviceLock;
use crate::shutdown::shutdown_child;
use queue::EventQueue;

/// Executable name looked up on `PATH`.
pub const PROGRAM: &str = "makemkvcon";

/// Flags passed ahead of every command: robot mode with messages and
/// progress on stdout and no minimum title length.
pub const DEFAULT_ARGS: [&str; 4] = ["-r", "--messages=-stdout", "--progress=-stdout", "--minlength=0"];

/// How long a single read may block before the child's liveness is checked.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while running command: {0}")]
    Io(#[from] io::Error),
}

/// How the tool is launched.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub program: OsString,
    pub base_args: Vec<OsString>,
    pub read_timeout: Duration,
    pub queue_capacity: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: PROGRAM.into(),
            base_args: DEFAULT_ARGS.iter().map(OsString::from).collect(),
            read_timeout: READ_TIMEOUT,
            queue_capacity: EVENT_QUEUE_CAPACITY,
        }
    }
}

impl RunnerConfig {
    /// Launch `program` with `base_args` in front of every command instead of
    /// the stock `makemkvcon` invocation.
    #[must_use]
    pub fn with_program<I, S>(mut self, program: impl Into<OsString>, base_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.program = program.into();
        self.base_args = base_args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub(crate) fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.base_args);
        command
    }

    /// The tool with the base flags minus the robot-mode output flags, for
    /// one-off commands whose output is not decoded.
    pub(crate) fn setup_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(
            self.base_args
                .iter()
                .filter(|arg| arg.to_str().is_none_or(|arg| !DEFAULT_ARGS.contains(&arg))),
        );
        command
    }

    pub(crate) fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

/// Runs tool commands against one source and exposes their events.
pub struct CommandRunner {
    source: Source,
    config: RunnerConfig,
    lock: DeviceLock,
    queue: EventQueue,
}

impl CommandRunner {
    pub fn new(source: Source, config: RunnerConfig) -> Self {
        Self::with_lock(source, config, DeviceLock::new())
    }

    /// Share an existing device lock, typically the drive controller's.
    pub fn with_lock(source: Source, config: RunnerConfig, lock: DeviceLock) -> Self {
        let queue = EventQueue::new(config.queue_capacity);
        Self {
            source,
            config,
            lock,
            queue,
        }
    }

    pub const fn source(&self) -> &Source {
        &self.source
    }

    pub fn device_lock(&self) -> DeviceLock {
        self.lock.clone()
    }

    /// Next queued event, waiting until one is available.
    ///
    /// Events from consecutive commands arrive in command order, each run
    /// bracketed by its own `Start`/`Stop`. A run that is cancelled part way
    /// still queues its `Stop`.
    pub async fn next_event(&self) -> Event {
        self.queue.pull().await
    }

    /// Number of events pushed but not yet pulled.
    pub fn pending_events(&self) -> usize {
        self.queue.pending()
    }

    /// Run the tool with `args` appended to the base flags.
    ///
    /// With `wait_for_drain` the device stays locked until every queued event
    /// has been pulled through [`next_event`](Self::next_event).
    pub async fn run<S: AsRef<str>>(
        &self,
        args: &[S],
        wait_for_drain: bool,
    ) -> Result<CommandExecution, RunnerError> {
        let mut next_number = self.lock.acquire().await;
        let command_number = *next_number;
        *next_number += 1;

        let discarded_before = self.queue.discarded();
        let mut history = Vec::new();
        self.emit(Event::Start { command_number }, &mut history);
        let bracket = StopOnDrop {
            queue: &self.queue,
            command_number,
            armed: true,
        };

        let outcome = self.execute(command_number, args, &mut history).await;

        // Stop is emitted even for failed commands so consumers waiting on
        // it are released.
        bracket.disarm();
        self.emit(Event::Stop { command_number }, &mut history);

        let discarded = self.queue.discarded() - discarded_before;
        if discarded > 0 {
            warn!(command_number, discarded, "Event queue overflowed, oldest events discarded");
        }
        if wait_for_drain {
            self.queue.wait_drained().await;
        }
        drop(next_number);

        outcome.map(|()| CommandExecution {
            command_number,
            history,
        })
    }

    /// `info <selector>` against this runner's source.
    pub async fn run_info(&self, wait_for_drain: bool) -> Result<CommandExecution, RunnerError> {
        let selector = self.source.selector();
        self.run(&["info", selector.as_str()], wait_for_drain).await
    }

    /// Scan the source and fold the output into a structured summary.
    pub async fn get_info(&self) -> Result<DiscSummary, RunnerError> {
        let execution = self.run_info(false).await?;
        Ok(DiscSummary::from_history(&execution.history))
    }

    async fn execute<S: AsRef<str>>(
        &self,
        command_number: u64,
        args: &[S],
        history: &mut Vec<Event>,
    ) -> Result<(), RunnerError> {
        let mut command = self.config.command();
        command
            .args(args.iter().map(AsRef::as_ref))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| RunnerError::Spawn {
            program: self.config.program_name(),
            source,
        })?;
        debug!(command_number, pid = ?child.id(), source = %self.source, "Spawned makemkvcon");

        let Some(stdout) = child.stdout.take() else {
            shutdown_child(child).await?;
            return Err(RunnerError::Io(io::Error::other("child stdout was not captured")));
        };

        if let Err(e) = self.stream_output(command_number, &mut child, stdout, history).await {
            warn!(command_number, error = %e, "Reading tool output failed, stopping child");
            if let Err(shutdown_error) = shutdown_child(child).await {
                warn!(command_number, error = %shutdown_error, "Failed to stop child");
            }
            return Err(e);
        }

        let status = child.wait().await?;
        debug!(command_number, %status, "makemkvcon exited");
        Ok(())
    }

    /// Forward every line of `stdout` until EOF, or until the child has
    /// exited and nothing more arrives within one read timeout.
    async fn stream_output(
        &self,
        command_number: u64,
        child: &mut Child,
        stdout: ChildStdout,
        history: &mut Vec<Event>,
    ) -> Result<(), RunnerError> {
        let mut reader = BufReader::new(stdout);
        // read_until is cancel safe: bytes read before a timeout stay in buf.
        let mut buf = Vec::with_capacity(1024);
        let mut exited = false;

        loop {
            match timeout(self.config.read_timeout, reader.read_until(b'\n', &mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(_)) => {
                    if buf.ends_with(b"\n") {
                        self.handle_line(command_number, &buf, history);
                        buf.clear();
                    }
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    if exited {
                        debug!(command_number, "Child exited and output went quiet");
                        break;
                    }
                    exited = child.try_wait()?.is_some();
                }
            }
        }

        if !buf.is_empty() {
            self.handle_line(command_number, &buf, history);
        }
        Ok(())
    }

    fn handle_line(&self, command_number: u64, raw: &[u8], history: &mut Vec<Event>) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\r', '\n']);
        match decode(line) {
            Ok(Some(event)) => self.emit(event, history),
            Ok(None) => {}
            Err(e) => warn!(command_number, error = %e, line, "Skipping undecodable line"),
        }
    }

    fn emit(&self, event: Event, history: &mut Vec<Event>) {
        history.push(event.clone());
        self.queue.push(event);
    }
}

/// Queues the `Stop` for a command whose run future is dropped before it
/// could emit one itself.
struct StopOnDrop<'a> {
    queue: &'a EventQueue,
    command_number: u64,
    armed: bool,
}

impl StopOnDrop<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!(command_number = self.command_number, "Run cancelled, closing its event stream");
            self.queue.push(Event::Stop {
                command_number: self.command_number,
            });
        }
    }
}
