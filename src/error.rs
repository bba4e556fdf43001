//! Error types of the device communication layer.

use std::{fmt, io, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::model::ConnectionState;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the device layer.
///
/// `PortAbsent` and `PortUnavailable` are produced by the channel but are
/// absorbed by the prober, which maps them to a [`ConnectionState`]. Lines
/// that do not match the protocol grammar are never errors.
#[derive(Debug, Error)]
pub enum Error {
    /// No serial endpoint with that name exists on the system.
    #[error("no serial port `{0}`")]
    PortAbsent(String),

    /// The endpoint exists but another process holds it exclusively.
    #[error("serial port `{0}` is in use by another process")]
    PortUnavailable(String),

    /// The serial port could not be opened or configured.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Reading from or writing to an open channel failed, usually because
    /// the keypad was unplugged mid-command.
    #[error("transport failure: {0}")]
    Transport(#[from] io::Error),

    /// A bounded wait elapsed before its completion condition held.
    #[error("{what} did not complete within {after:?}")]
    Timeout { what: &'static str, after: Duration },

    /// The receive path ended while an operation was waiting on it.
    #[error("device stopped responding on `{0}`")]
    Disconnected(String),

    /// The device is not in a state where the operation makes sense.
    #[error("device is {0}")]
    NotConnected(ConnectionState),

    /// More than one volume was mounted while waiting for the bootloader.
    #[error("several new volumes appeared: {0:?}")]
    AmbiguousVolume(Vec<PathBuf>),

    #[error("firmware image `{}` {reason}", .path.display())]
    InvalidFirmware {
        path: PathBuf,
        reason: FirmwareProblem,
    },

    /// The firmware image could not be copied onto the bootloader volume.
    #[error("failed to copy the firmware onto `{}`: {source}", .volume.display())]
    Install {
        volume: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The bootloader entry command could not be run or reported failure.
    #[error("failed to trigger the bootloader: {0}")]
    Trigger(String),
}

/// Why a firmware image was rejected before flashing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FirmwareProblem {
    Missing,
    NotUf2,
}

impl fmt::Display for FirmwareProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirmwareProblem::Missing => f.write_str("does not exist"),
            FirmwareProblem::NotUf2 => f.write_str("is not a .uf2 file"),
        }
    }
}

impl Error {
    pub(crate) fn timeout(what: &'static str, after: Duration) -> Self {
        Error::Timeout { what, after }
    }
}
