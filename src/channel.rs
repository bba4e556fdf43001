//! A line oriented channel over one exclusive serial connection.
//!
//! The channel owns the connection for the duration of a single operation
//! (probe, send, poll or console session). Received lines are delivered to a
//! subscriber callback on a dedicated receive thread, while the caller keeps
//! writing commands from its own flow of control:
//!
//! ```text
//!   caller thread                     receive thread
//!   -------------                     --------------
//!   open() ──────────────┐
//!   subscribe(on_line) ──┼──spawn──>  loop {
//!   write_line("get")    │              read line        (outside the gate)
//!   ...wait...           │              lock gate
//!   close() ──lock gate──┘              if closed: stop
//!     mark closed                       on_line(line)    (under the gate)
//!     join thread <───────────────────  unlock gate
//!                                     }
//! ```
//!
//! Dispatching a line and closing the channel are serialized by the same
//! gate mutex, so once `close` returns no callback is running and none will
//! run again. The receive thread wakes up at least once per serial read
//! timeout to notice that the channel was closed.

mod connector;
mod lines;

pub use connector::{Connector, Link, SerialConnector};
pub(crate) use lines::LineReader;

use std::{
    io::{self, Read, Write},
    sync::{Arc, Mutex, MutexGuard},
    thread::{self, JoinHandle},
};

use log::{debug, info, trace};

use crate::{protocol::LINE_TERMINATOR, settings::LineSettings, Error, Result};

// =============================================================================
// Public Interface
// =============================================================================

/// An open channel to one keypad endpoint.
///
/// Dropping the channel closes it.
pub struct Channel {
    port_name: String,
    writer: Option<Box<dyn Write + Send>>,
    /// Present until the channel is subscribed.
    reader: Option<Box<dyn Read + Send>>,
    /// `true` while the channel is open. Held while a line is dispatched.
    gate: Arc<Mutex<bool>>,
    receiver: Option<JoinHandle<()>>,
}

impl Channel {
    /// Opens the endpoint named `port_name` through `connector`.
    pub fn open(connector: &dyn Connector, port_name: &str, line: &LineSettings) -> Result<Self> {
        let link = connector.connect(port_name, line)?;
        debug!("channel to {} open", port_name);
        Ok(Channel {
            port_name: port_name.to_owned(),
            writer: Some(link.writer),
            reader: Some(link.reader),
            gate: Arc::new(Mutex::new(true)),
            receiver: None,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn is_open(&self) -> bool {
        *lock(&self.gate)
    }

    /// Writes `text` followed by the line terminator and flushes.
    pub fn write_line(&mut self, text: &str) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            Error::Transport(io::Error::new(
                io::ErrorKind::NotConnected,
                "channel is closed",
            ))
        })?;
        debug!("{} -> {:?}", self.port_name, text);
        writer.write_all(text.as_bytes())?;
        writer.write_all(LINE_TERMINATOR.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Writes each line in order, stopping at the first failure.
    pub fn write_lines<I, S>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.write_line(line.as_ref())?;
        }
        Ok(())
    }

    /// Starts delivering received lines to `on_line`, terminator stripped,
    /// from a dedicated receive thread. A channel can be subscribed once.
    ///
    /// The callback is dropped when the receive thread ends, which happens
    /// when the channel is closed or the link reaches end of stream or fails.
    pub fn subscribe<F>(&mut self, mut on_line: F) -> Result<()>
    where
        F: FnMut(&str) + Send + 'static,
    {
        let reader = self.reader.take().ok_or_else(|| {
            Error::Transport(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "channel already subscribed or closed",
            ))
        })?;
        let gate = Arc::clone(&self.gate);
        let port_name = self.port_name.clone();

        let handle = thread::Builder::new()
            .name(format!("rx {}", self.port_name))
            .spawn(move || {
                let mut lines = LineReader::new(reader);
                loop {
                    match lines.next_line() {
                        Ok(Some(line)) => {
                            let open = lock(&gate);
                            if !*open {
                                break;
                            }
                            trace!("{} <- {:?}", port_name, line);
                            on_line(&line);
                        }
                        Ok(None) => {
                            debug!("{} reached end of stream", port_name);
                            break;
                        }
                        Err(ref e)
                            if e.kind() == io::ErrorKind::TimedOut
                                || e.kind() == io::ErrorKind::WouldBlock =>
                        {
                            if !*lock(&gate) {
                                break;
                            }
                        }
                        Err(ref e) => {
                            info!("{} receive error: {}", port_name, e);
                            break;
                        }
                    }
                }
                trace!("{} receive thread done", port_name);
            })?;

        self.receiver = Some(handle);
        Ok(())
    }

    /// Closes the channel. Idempotent.
    ///
    /// Waits for an in-flight callback to return, then for the receive thread
    /// to exit, before releasing the port.
    pub fn close(&mut self) {
        {
            let mut open = lock(&self.gate);
            if !*open {
                return;
            }
            *open = false;
        }
        if let Some(handle) = self.receiver.take() {
            if handle.join().is_err() {
                info!("{} receive thread panicked", self.port_name);
            }
        }
        self.writer = None;
        self.reader = None;
        debug!("channel to {} closed", self.port_name);
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// A panic inside a subscriber must not make closing impossible.
fn lock(gate: &Mutex<bool>) -> MutexGuard<'_, bool> {
    gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SyntheticDevice;
    use crate::SettingsBuilder;

    use std::{
        sync::mpsc,
        time::{Duration, Instant},
    };

    fn line() -> LineSettings {
        let settings = SettingsBuilder::new().finalize();
        settings.line(settings.query_parity)
    }

    #[test]
    fn writes_terminated_lines() {
        let device = SyntheticDevice::silent();
        let mut channel = Channel::open(&device, "COM1", &line()).unwrap();
        channel.write_lines(&["hkey1.rest 1800", "save"]).unwrap();
        channel.close();
        assert_eq!(device.written(), vec!["hkey1.rest 1800", "save"]);
    }

    #[test]
    fn delivers_lines_to_the_subscriber() {
        let device = SyntheticDevice::answering(|command| match command {
            "ping" => vec!["pong\r".into(), "again".into()],
            _ => vec![],
        });
        let mut channel = Channel::open(&device, "COM1", &line()).unwrap();

        let (tx, rx) = mpsc::channel();
        channel
            .subscribe(move |line| {
                let _ = tx.send(line.to_owned());
            })
            .unwrap();
        channel.write_line("ping").unwrap();

        let timeout = Duration::from_secs(2);
        assert_eq!(rx.recv_timeout(timeout).unwrap(), "pong");
        assert_eq!(rx.recv_timeout(timeout).unwrap(), "again");
    }

    #[test]
    fn close_is_idempotent_and_stops_delivery() {
        let device = SyntheticDevice::silent();
        let mut channel = Channel::open(&device, "COM1", &line()).unwrap();

        let (tx, rx) = mpsc::channel::<String>();
        channel
            .subscribe(move |line| {
                let _ = tx.send(line.to_owned());
            })
            .unwrap();

        let start = Instant::now();
        channel.close();
        channel.close();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(!channel.is_open());

        // The callback (and its sender) went away with the receive thread.
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(100)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn close_waits_for_an_in_flight_callback() {
        let device = SyntheticDevice::answering(|_| vec!["slow".into()]);
        let mut channel = Channel::open(&device, "COM1", &line()).unwrap();

        let (started_tx, started_rx) = mpsc::channel();
        let finished = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&finished);
        channel
            .subscribe(move |_| {
                let _ = started_tx.send(());
                thread::sleep(Duration::from_millis(100));
                *flag.lock().unwrap() = true;
            })
            .unwrap();
        channel.write_line("go").unwrap();

        started_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        channel.close();
        assert!(*finished.lock().unwrap());
    }

    #[test]
    fn writing_after_close_fails() {
        let device = SyntheticDevice::silent();
        let mut channel = Channel::open(&device, "COM1", &line()).unwrap();
        channel.close();
        assert!(matches!(channel.write_line("save"), Err(Error::Transport(_))));
    }

    #[test]
    fn subscribing_twice_fails() {
        let device = SyntheticDevice::silent();
        let mut channel = Channel::open(&device, "COM1", &line()).unwrap();
        channel.subscribe(|_| {}).unwrap();
        assert!(channel.subscribe(|_| {}).is_err());
    }

    #[test]
    fn write_failures_are_transport_errors() {
        let device = SyntheticDevice::silent().unplugged_on_write();
        let mut channel = Channel::open(&device, "COM1", &line()).unwrap();
        assert!(matches!(channel.write_line("save"), Err(Error::Transport(_))));
    }
}
