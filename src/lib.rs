//! `minipad` talks to minipad hall effect keypads over their USB serial line.
//!
//! A keypad answers plain text commands terminated by a newline. This crate
//! implements the host side of that protocol:
//!
//! * **probing** an endpoint: is it there, is it in use by someone else, and
//!   what configuration does the keypad report (`get`),
//! * **parsing** the reported key/value pairs into a typed [`Configuration`],
//! * **sampling** the raw and mapped hall effect sensor values (`out`),
//! * **flashing** a new `.uf2` firmware image through the keypad's mass
//!   storage bootloader,
//! * a few helpers built on top of those: sending raw commands, calibrating
//!   the rest and down positions and an interactive console session.
//!
//! Every operation opens the serial port, does its exchange and closes the
//! port again, so a keypad is never held for longer than needed and other
//! programs can use it in between. Operations on the same endpoint must not
//! overlap; the port is exclusive and the second one would see the keypad as
//! [`ConnectionState::Busy`].
//!
//! Transport and mass storage access go through small traits
//! ([`Connector`](channel::Connector), [`VolumeSource`](flash::VolumeSource)
//! and [`BootTrigger`](flash::BootTrigger)) so that everything above them can
//! run against real hardware or against synthetic devices.
//!
//! ```no_run
//! use minipad::{channel::SerialConnector, Endpoint, SettingsBuilder};
//!
//! let settings = SettingsBuilder::new().finalize();
//! let device = minipad::probe(&SerialConnector, &settings, Endpoint(3))?;
//! println!("{} is {}", device, device.state);
//! # Ok::<(), minipad::Error>(())
//! ```
//!
//! The library logs through the `log` facade and never prints on its own.

pub mod calibration;
pub mod channel;
pub mod discovery;
mod error;
pub mod flash;
mod model;
mod parser;
mod poller;
mod prober;
pub mod protocol;
pub mod report;
mod session;
mod settings;

#[cfg(test)]
mod testing;

pub use calibration::Calibration;
pub use error::{Error, FirmwareProblem, Result};
pub use model::{
    Configuration, ConnectionState, Device, DigitalKey, Endpoint, HallEffectKey,
};
pub use parser::{decode_bool, decode_char, decode_int, parse};
pub use poller::{poll, SensorSample, UNSET};
pub use prober::{probe, send, ResponseMap};
pub use session::{Session, EXIT_WORDS};
pub use settings::{
    DataBits, FlowControl, LineSettings, Parity, Settings, SettingsBuilder, StopBits,
};
