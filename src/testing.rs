//! Synthetic keypads for the unit tests.
//!
//! A [`SyntheticDevice`] implements [`Connector`] on top of an in-memory
//! pipe. Every line written by the host is recorded and handed to a
//! responder, whose answer lines are queued for the channel's reader, which
//! behaves like a serial port: reads block up to the read timeout and then
//! fail with `TimedOut`.

use std::{
    collections::VecDeque,
    io::{self, Read, Write},
    sync::{Arc, Condvar, Mutex},
    thread,
    time::Duration,
};

use serialport::Parity;

use crate::{
    channel::{Connector, Link},
    settings::LineSettings,
    Error, Result,
};

type Responder = dyn Fn(&str) -> Vec<String> + Send + Sync;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Presence {
    Present,
    Busy,
    Absent,
}

/// A scripted keypad.
#[derive(Clone)]
pub(crate) struct SyntheticDevice {
    presence: Presence,
    fail_writes: bool,
    hang_up: bool,
    answer_delay: Duration,
    respond: Arc<Responder>,
    written: Arc<Mutex<Vec<String>>>,
    opened_with: Arc<Mutex<Vec<Parity>>>,
}

impl SyntheticDevice {
    /// A keypad answering each written line with `respond(line)`.
    pub(crate) fn answering<F>(respond: F) -> Self
    where
        F: Fn(&str) -> Vec<String> + Send + Sync + 'static,
    {
        SyntheticDevice {
            presence: Presence::Present,
            fail_writes: false,
            hang_up: false,
            answer_delay: Duration::from_secs(0),
            respond: Arc::new(respond),
            written: Arc::new(Mutex::new(Vec::new())),
            opened_with: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A keypad that never answers.
    pub(crate) fn silent() -> Self {
        Self::answering(|_| Vec::new())
    }

    /// A keypad answering `get` with `pairs` followed by `GET END`.
    pub(crate) fn with_config(pairs: &[(&str, &str)]) -> Self {
        let mut answer: Vec<String> = pairs
            .iter()
            .map(|(key, value)| format!("GET {}={}", key, value))
            .collect();
        answer.push("GET END".into());
        Self::answering(move |command| {
            if command == "get" {
                answer.clone()
            } else {
                Vec::new()
            }
        })
    }

    /// No port exists for this keypad.
    pub(crate) fn absent() -> Self {
        let mut device = Self::silent();
        device.presence = Presence::Absent;
        device
    }

    /// Another process holds this keypad's port.
    pub(crate) fn busy() -> Self {
        let mut device = Self::silent();
        device.presence = Presence::Busy;
        device
    }

    /// Writes fail as if the cable had been pulled.
    pub(crate) fn unplugged_on_write(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// The link reaches end of stream once the first answer has been read.
    pub(crate) fn hang_up_after_answer(mut self) -> Self {
        self.hang_up = true;
        self
    }

    /// Answers arrive `delay` after the command was written.
    pub(crate) fn answering_late(mut self, delay: Duration) -> Self {
        self.answer_delay = delay;
        self
    }

    /// Every line written so far, in order, across all connections.
    pub(crate) fn written(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }

    /// The parity of every connection opened so far.
    pub(crate) fn opened_with(&self) -> Vec<Parity> {
        self.opened_with.lock().unwrap().clone()
    }
}

impl Connector for SyntheticDevice {
    fn connect(&self, port_name: &str, line: &LineSettings) -> Result<Link> {
        match self.presence {
            Presence::Absent => return Err(Error::PortAbsent(port_name.into())),
            Presence::Busy => return Err(Error::PortUnavailable(port_name.into())),
            Presence::Present => {}
        }
        self.opened_with.lock().unwrap().push(line.parity);

        let pipe = Arc::new(Pipe::default());
        Ok(Link {
            reader: Box::new(PipeReader {
                pipe: Arc::clone(&pipe),
                timeout: line.read_timeout,
                hang_up: self.hang_up,
                served: false,
            }),
            writer: Box::new(ScriptedWriter {
                pipe,
                partial: Vec::new(),
                fail: self.fail_writes,
                delay: self.answer_delay,
                respond: Arc::clone(&self.respond),
                written: Arc::clone(&self.written),
            }),
        })
    }
}

// =============================================================================
// Private stuff
// =============================================================================

#[derive(Default)]
struct Pipe {
    bytes: Mutex<VecDeque<u8>>,
    ready: Condvar,
}

impl Pipe {
    fn deliver(&self, answer: Vec<String>) {
        let mut bytes = self.bytes.lock().unwrap();
        for reply in answer {
            bytes.extend(reply.bytes());
            bytes.extend(b"\r\n".iter().copied());
        }
        self.ready.notify_all();
    }
}

struct PipeReader {
    pipe: Arc<Pipe>,
    timeout: Duration,
    hang_up: bool,
    served: bool,
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes = self.pipe.bytes.lock().unwrap();
        if self.hang_up && self.served && bytes.is_empty() {
            return Ok(0);
        }
        let (mut bytes, _) = self
            .pipe
            .ready
            .wait_timeout_while(bytes, self.timeout, |bytes| bytes.is_empty())
            .unwrap();
        if bytes.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "operation timed out"));
        }
        let count = buf.len().min(bytes.len());
        for (slot, byte) in buf.iter_mut().zip(bytes.drain(..count)) {
            *slot = byte;
        }
        self.served = true;
        Ok(count)
    }
}

struct ScriptedWriter {
    pipe: Arc<Pipe>,
    partial: Vec<u8>,
    fail: bool,
    delay: Duration,
    respond: Arc<Responder>,
    written: Arc<Mutex<Vec<String>>>,
}

impl Write for ScriptedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        for &byte in buf {
            if byte != b'\n' {
                self.partial.push(byte);
                continue;
            }
            let line = String::from_utf8_lossy(&self.partial).into_owned();
            self.partial.clear();
            self.written.lock().unwrap().push(line.clone());

            let answer = (self.respond)(&line);
            if answer.is_empty() {
                continue;
            }
            if self.delay > Duration::from_secs(0) {
                let pipe = Arc::clone(&self.pipe);
                let delay = self.delay;
                thread::spawn(move || {
                    thread::sleep(delay);
                    pipe.deliver(answer);
                });
            } else {
                self.pipe.deliver(answer);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
