//! Opening the physical link behind a channel.

use std::io::{Read, Write};

use log::debug;
use serialport::ErrorKind;

use crate::{settings::LineSettings, Error, Result};

/// The two halves of an open serial link.
pub struct Link {
    /// Read half, owned by the channel's receive thread once subscribed.
    pub reader: Box<dyn Read + Send>,
    /// Write half, used by the caller's flow of control.
    pub writer: Box<dyn Write + Send>,
}

/// Opens links to endpoints. Implemented over real serial ports by
/// [`SerialConnector`]; tests substitute synthetic keypads.
pub trait Connector: Send + Sync {
    /// Opens `port_name` exclusively with the given line parameters.
    ///
    /// Fails with [`Error::PortAbsent`] when no such port exists and with
    /// [`Error::PortUnavailable`] when another process holds it.
    fn connect(&self, port_name: &str, line: &LineSettings) -> Result<Link>;
}

/// Connects to keypads through the operating system's serial ports.
#[derive(Debug, Default, Copy, Clone)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    fn connect(&self, port_name: &str, line: &LineSettings) -> Result<Link> {
        let mut port = serialport::new(port_name, line.baud_rate)
            .data_bits(line.data_bits)
            .stop_bits(line.stop_bits)
            .parity(line.parity)
            .flow_control(line.flow_control)
            .timeout(line.read_timeout)
            .open()
            .map_err(|err| classify_open_error(port_name, err))?;

        // The keypad only starts talking once both control lines are up.
        port.write_request_to_send(true)?;
        port.write_data_terminal_ready(true)?;

        debug!(
            "opened {} at {} baud, parity {:?}",
            port_name, line.baud_rate, line.parity
        );

        let reader = port.try_clone()?;
        Ok(Link {
            reader: Box::new(reader),
            writer: Box::new(port),
        })
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// Maps the open failures the prober cares about to their own variants.
fn classify_open_error(port_name: &str, err: serialport::Error) -> Error {
    let description = err.description.to_lowercase();
    if description.contains("busy") || description.contains("denied") {
        return Error::PortUnavailable(port_name.into());
    }
    match err.kind() {
        ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
            Error::PortUnavailable(port_name.into())
        }
        ErrorKind::NoDevice | ErrorKind::Io(std::io::ErrorKind::NotFound) => {
            Error::PortAbsent(port_name.into())
        }
        _ => Error::Serial(err),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
