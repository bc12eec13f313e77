// src/session/reader.rs

//! Prompt-aware line scanner for SteamCMD output
//!
//! SteamCMD ends every command with the prompt `Steam>` and no newline, so a
//! plain line reader would never return it. Before reading each line the
//! scanner looks ahead for the prompt and reports it as its own event.

use std::io::{self, ErrorKind, Read};

/// Prompt printed by SteamCMD when it is ready for a command
pub const PROMPT: &[u8] = b"Steam>";

/// Longest line fragment returned before the rest is reported as a continuation
const LINE_CAPACITY: usize = 4096;

/// Size of each read from the underlying stream
const READ_CHUNK: usize = 4096;

/// One unit of SteamCMD output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The prompt token was found at the current position and consumed
    Prompt,
    /// A line without its newline; `more` is set when the line continues
    /// in the next event
    Line { data: Vec<u8>, more: bool },
}

/// Buffered scanner over a byte stream
pub struct PromptReader<R> {
    inner: R,
    buf: Vec<u8>,
    pos: usize,
}

impl<R: Read> PromptReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(LINE_CAPACITY),
            pos: 0,
        }
    }

    fn buffered(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    /// Read once more from the stream; `false` on end of stream
    fn fill_more(&mut self) -> io::Result<bool> {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }

        let start = self.buf.len();
        self.buf.resize(start + READ_CHUNK, 0);
        loop {
            match self.inner.read(&mut self.buf[start..]) {
                Ok(n) => {
                    self.buf.truncate(start + n);
                    return Ok(n > 0);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.truncate(start);
                    return Err(e);
                }
            }
        }
    }

    /// Look at the next `n` bytes without consuming them
    pub fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        while self.buffered().len() < n {
            if !self.fill_more()? {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "stream ended while looking ahead",
                ));
            }
        }
        Ok(&self.buffered()[..n])
    }

    /// Drop `n` already-buffered bytes
    pub fn discard(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.buf.len());
    }

    /// Read up to the next newline
    pub fn read_line(&mut self) -> io::Result<(Vec<u8>, bool)> {
        loop {
            if let Some(idx) = self.buffered().iter().position(|&b| b == b'\n') {
                let line = self.buffered()[..idx].to_vec();
                self.discard(idx + 1);
                return Ok((line, false));
            }

            if self.buffered().len() >= LINE_CAPACITY {
                let line = self.buffered()[..LINE_CAPACITY].to_vec();
                self.discard(LINE_CAPACITY);
                return Ok((line, true));
            }

            if !self.fill_more()? {
                if self.buffered().is_empty() {
                    return Err(io::Error::new(ErrorKind::UnexpectedEof, "stream ended"));
                }
                let line = self.buffered().to_vec();
                self.discard(line.len());
                return Ok((line, false));
            }
        }
    }

    /// Next prompt or line
    pub fn next_event(&mut self) -> io::Result<Event> {
        if self.peek(PROMPT.len())? == PROMPT {
            self.discard(PROMPT.len());
            return Ok(Event::Prompt);
        }
        let (data, more) = self.read_line()?;
        Ok(Event::Line { data, more })
    }
}
