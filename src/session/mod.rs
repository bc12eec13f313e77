// src/session/mod.rs

//! SteamCMD session driver
//!
//! SteamCMD is an interactive program: it prints output, then the prompt
//! `Steam>` without a trailing newline, then waits for a command line. The
//! driver runs it under a pseudo-terminal and turns that into a synchronous
//! request/response cycle: everything printed since the previous prompt is
//! handed to a responder, and the responder's answer is written back as the
//! next command. The conversation ends when the responder answers `quit`.
//!
//! Two flows of control take part in a session:
//! - a reader thread that scans the terminal and calls the responder
//! - the calling thread, which waits for the child to exit while watching
//!   for cancellation and reader failure
//!
//! The child is killed and the terminal closed on every exit path.

pub mod reader;
pub mod script;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::pty::openpty;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::{Pid, setsid};
use std::fs::File;
use std::io::{self, ErrorKind, Read, Write};
use std::os::fd::AsFd;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

use reader::{Event, PromptReader};
use script::{QUIT, Script};

/// How often the waiting thread checks for cancellation
const WAIT_INTERVAL: Duration = Duration::from_millis(100);

/// How long a terminal read blocks before re-checking for teardown
const READ_POLL_MS: u16 = 100;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to open pseudo-terminal: {0}")]
    Pty(#[source] Errno),

    #[error("Failed to start {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to {op}: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Session cancelled")]
    Cancelled,

    #[error("SteamCMD exited with {0}")]
    ExitStatus(ExitStatus),

    #[error("Terminal reader thread panicked")]
    ReaderPanicked,
}

/// Cancellation flag shared between a session and whoever may stop it
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// End of output: EOF, or EIO once every slave handle is closed
fn is_closed(e: &io::Error) -> bool {
    e.kind() == ErrorKind::UnexpectedEof || e.raw_os_error() == Some(libc::EIO)
}

/// Drive one conversation over an output stream and a command sink
///
/// Output lines are collected until the prompt appears; the responder then
/// receives them joined with `\n` and its answer is written as one line.
/// After `quit` has been written the responder is not called again, but the
/// remaining output is drained until the stream closes. Returns the number
/// of responder calls.
pub fn converse<R, W, F>(input: R, output: &mut W, responder: &mut F) -> io::Result<usize>
where
    R: Read,
    W: Write + ?Sized,
    F: FnMut(&str) -> String + ?Sized,
{
    let mut reader = PromptReader::new(input);
    let mut lines: Vec<String> = Vec::new();
    let mut partial: Vec<u8> = Vec::new();
    let mut calls = 0;
    let mut quitting = false;

    loop {
        let event = match reader.next_event() {
            Ok(event) => event,
            Err(e) if is_closed(&e) => break,
            Err(e) => return Err(e),
        };

        match event {
            Event::Prompt if quitting => lines.clear(),
            Event::Prompt => {
                let accumulated = lines.join("\n");
                lines.clear();

                let command = responder(&accumulated);
                calls += 1;
                info!("steamcmd> {}", command);

                let mut line = Vec::with_capacity(command.len() + 1);
                line.extend_from_slice(command.as_bytes());
                line.push(b'\n');
                output.write_all(&line)?;
                output.flush()?;

                quitting = command == QUIT;
            }
            Event::Line { data, more } => {
                partial.extend_from_slice(&data);
                if more {
                    continue;
                }
                let text = String::from_utf8_lossy(&partial);
                let text = text.trim_end();
                if !text.is_empty() {
                    debug!("steamcmd: {}", text);
                    lines.push(text.to_string());
                }
                partial.clear();
            }
        }
    }

    Ok(calls)
}

/// Terminal master side, read with a timeout so teardown can interrupt it
struct PtyInput<'a> {
    file: File,
    teardown: &'a AtomicBool,
}

impl Read for PtyInput<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let ready = {
                let mut fds = [PollFd::new(self.file.as_fd(), PollFlags::POLLIN)];
                poll(&mut fds, PollTimeout::from(READ_POLL_MS))
            };
            match ready {
                Ok(0) => {
                    if self.teardown.load(Ordering::SeqCst) {
                        return Err(io::Error::new(
                            ErrorKind::ConnectionAborted,
                            "terminal closed by session teardown",
                        ));
                    }
                }
                Ok(_) => return self.file.read(buf),
                Err(Errno::EINTR) => {}
                Err(e) => return Err(io::Error::from(e)),
            }
        }
    }
}

/// Kills the child's process group and reaps the child when dropped
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    fn kill_group(&self) {
        // The child called setsid, so its pid is also its process group
        if let Ok(pid) = i32::try_from(self.child.id()) {
            let _ = killpg(Pid::from_raw(pid), Signal::SIGKILL);
        }
    }

    fn terminate(&mut self) {
        self.kill_group();
        if !self.reaped {
            let _ = self.child.kill();
            let _ = self.child.wait();
            self.reaped = true;
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Why the waiting thread stopped
enum WaitOutcome {
    Exited(ExitStatus),
    ReaderFailed,
}

/// A SteamCMD executable and the settings for running it
#[derive(Debug, Clone)]
pub struct SteamCmd {
    executable: PathBuf,
    cancel: CancelToken,
}

impl SteamCmd {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            cancel: CancelToken::new(),
        }
    }

    /// Use `token` to stop sessions from another thread
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run one session, blocking until SteamCMD exits
    pub fn run<F>(&self, mut responder: F) -> Result<(), SessionError>
    where
        F: FnMut(&str) -> String + Send,
    {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }

        let pty = openpty(None, None).map_err(SessionError::Pty)?;
        let master = File::from(pty.master);
        let writer = master.try_clone().map_err(|source| SessionError::Io {
            op: "duplicate terminal handle",
            source,
        })?;

        let slave_handle = |source| SessionError::Io {
            op: "duplicate terminal handle",
            source,
        };
        let stdin = pty.slave.try_clone().map_err(slave_handle)?;
        let stdout = pty.slave.try_clone().map_err(slave_handle)?;

        let mut command = Command::new(&self.executable);
        command
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(pty.slave));
        // SAFETY: only async-signal-safe calls run between fork and exec
        unsafe {
            command.pre_exec(|| {
                setsid().map_err(io::Error::from)?;
                if libc::ioctl(0, libc::TIOCSCTTY as _, 0) == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        info!("Starting {}", self.executable.display());
        let child = command.spawn().map_err(|source| SessionError::Spawn {
            path: self.executable.clone(),
            source,
        })?;
        // Release our copies of the slave side so reads see EIO once the child exits
        drop(command);
        let mut guard = ChildGuard::new(child);

        let teardown = AtomicBool::new(false);
        let reader_failed = AtomicBool::new(false);

        let (waited, read) = thread::scope(|scope| {
            let teardown = &teardown;
            let reader_failed = &reader_failed;
            let responder = &mut responder;

            let reader = scope.spawn(move || {
                let input = PtyInput {
                    file: master,
                    teardown,
                };
                let mut output = writer;
                match converse(input, &mut output, responder) {
                    Ok(calls) => Ok(calls),
                    Err(e) if teardown.load(Ordering::SeqCst) => {
                        debug!("Terminal read ended during teardown: {}", e);
                        Ok(0)
                    }
                    Err(e) => {
                        reader_failed.store(true, Ordering::SeqCst);
                        Err(e)
                    }
                }
            });

            let waited = self.wait(&mut guard, reader_failed);
            teardown.store(true, Ordering::SeqCst);
            if waited.is_err() {
                guard.terminate();
            }
            (waited, reader.join())
        });

        let read = read.map_err(|_| SessionError::ReaderPanicked)?;
        let waited = match waited {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(read_err) = read {
                    debug!("Terminal error after session failure: {}", read_err);
                }
                return Err(e);
            }
        };

        read.map_err(|source| SessionError::Io {
            op: "talk to steamcmd",
            source,
        })?;

        match waited {
            WaitOutcome::Exited(status) if status.success() => {
                debug!("SteamCMD exited cleanly");
                Ok(())
            }
            WaitOutcome::Exited(status) => Err(SessionError::ExitStatus(status)),
            WaitOutcome::ReaderFailed => Err(SessionError::Io {
                op: "talk to steamcmd",
                source: io::Error::other("terminal reader stopped"),
            }),
        }
    }

    /// Run `initial` to completion and return its final state
    pub fn run_script<S: Script + Send>(&self, initial: S) -> Result<S, SessionError> {
        let mut state = initial;
        self.run(|output| {
            let (next, command) = state.transition(output);
            state = next;
            command
        })?;
        Ok(state)
    }

    fn wait(
        &self,
        guard: &mut ChildGuard,
        reader_failed: &AtomicBool,
    ) -> Result<WaitOutcome, SessionError> {
        loop {
            if self.cancel.is_cancelled() {
                warn!("Cancelling SteamCMD session");
                guard.terminate();
                return Err(SessionError::Cancelled);
            }
            if reader_failed.load(Ordering::SeqCst) {
                guard.terminate();
                return Ok(WaitOutcome::ReaderFailed);
            }

            match guard.child.wait_timeout(WAIT_INTERVAL) {
                Ok(Some(status)) => {
                    guard.reaped = true;
                    return Ok(WaitOutcome::Exited(status));
                }
                Ok(None) => continue,
                Err(source) => {
                    return Err(SessionError::Io {
                        op: "wait for steamcmd",
                        source,
                    });
                }
            }
        }
    }
}
