// src/report.rs

//! User-facing status reporting
//!
//! Update commands produce a handful of short status lines ("ARK Server is
//! up-to-date", "ARK MOD[...] was updated (restart required)"). They are
//! meant for whoever runs the server, possibly through a chat relay reading
//! a file, so they go through a [`Reporter`] rather than the log.
//!
//! - `WriterReporter`: appends lines to stdout or a file
//! - `LogReporter`: forwards lines to tracing
//! - `SilentReporter`: discards everything

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::config::OutputTarget;
use crate::error::{Error, Result};

/// Sink for status lines
pub trait Reporter: Send + Sync {
    /// Deliver one line. Delivery failures never abort the caller.
    fn notify(&self, message: &str);
}

/// Writes each line to an `io::Write`
pub struct WriterReporter {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl WriterReporter {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Append to `path`, creating it if needed
    pub fn append_to(path: &Path) -> Result<Self> {
        let file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::IoError(format!("Failed to open {}: {e}", path.display())))?;
        Ok(Self::new(Box::new(file)))
    }

    pub fn for_target(target: &OutputTarget) -> Result<Self> {
        match target {
            OutputTarget::Stdout => Ok(Self::stdout()),
            OutputTarget::File(path) => Self::append_to(path),
        }
    }
}

impl Reporter for WriterReporter {
    fn notify(&self, message: &str) {
        let Ok(mut writer) = self.writer.lock() else {
            warn!("Status output unavailable, dropped: {}", message);
            return;
        };
        if let Err(e) = writeln!(writer, "{}", message).and_then(|_| writer.flush()) {
            warn!("Failed to write status line: {}", e);
        }
    }
}

/// Forwards lines to the log
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn notify(&self, message: &str) {
        info!("{}", message);
    }
}

/// Drops every line
#[derive(Debug, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn notify(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Clonable in-memory writer
    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Failing;

    impl Write for Failing {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_reporter_lines() {
        let buf = Shared::default();
        let reporter = WriterReporter::new(Box::new(buf.clone()));
        reporter.notify("ARK Server is up-to-date");
        reporter.notify("ARK MOD[1](Test) is up-to-date");

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(
            text,
            "ARK Server is up-to-date\nARK MOD[1](Test) is up-to-date\n"
        );
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let reporter = WriterReporter::new(Box::new(Failing));
        reporter.notify("ARK Server update required");
    }

    #[test]
    fn test_append_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.log");
        std::fs::write(&path, "earlier\n").unwrap();

        let reporter = WriterReporter::for_target(&OutputTarget::File(path.clone())).unwrap();
        reporter.notify("ARK Server was updated. (restart required)");
        drop(reporter);

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "earlier\nARK Server was updated. (restart required)\n"
        );
    }
}
