//! Interactive raw command sessions.
//!
//! A session keeps the keypad's port open from start to end, so no other
//! process (or other operation of this crate) can talk to the keypad in the
//! meantime. Lines are written as typed, nothing is read back.

use crate::{
    channel::{Channel, Connector},
    model::{ConnectionState, Device},
    settings::Settings,
    Error, Result,
};

/// Words ending a console session.
pub const EXIT_WORDS: &[&str] = &["exit", "q", "quit"];

/// An open console session on one keypad.
pub struct Session {
    channel: Channel,
}

impl Session {
    /// Opens a session on a connected `device`.
    pub fn open(connector: &dyn Connector, settings: &Settings, device: &Device) -> Result<Self> {
        if device.state != ConnectionState::Connected {
            return Err(Error::NotConnected(device.state));
        }
        let channel = Channel::open(
            connector,
            &device.port_name,
            &settings.line(settings.query_parity),
        )?;
        Ok(Session { channel })
    }

    /// `true` if `input` ends the session.
    pub fn is_exit(input: &str) -> bool {
        EXIT_WORDS.contains(&input.trim())
    }

    pub fn send(&mut self, line: &str) -> Result<()> {
        self.channel.write_line(line)
    }

    pub fn close(mut self) {
        self.channel.close();
    }
}
