use std::{cmp::Ordering, fmt};

use super::Configuration;

// =============================================================================
// Public Interface
// =============================================================================

/// Connection state of a keypad, ordered `Disconnected < Busy < Connected`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ConnectionState {
    /// No device is present at the addressed endpoint.
    Disconnected,
    /// A device is present but its serial port is held by another process.
    Busy,
    /// The port was opened and the query exchange completed.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Busy => "busy",
            ConnectionState::Connected => "connected",
        };
        f.write_str(text)
    }
}

/// The addressable serial path to one keypad, identified by a small integer
/// (the number the operating system appended to the port name).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Endpoint(pub u32);

impl Endpoint {
    /// Builds the OS port name by appending the endpoint number to `prefix`,
    /// e.g. `COM` + `4` or `/dev/ttyACM` + `0`.
    pub fn port_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.0)
    }

    /// Recovers the endpoint number from a port name ending in digits.
    pub fn from_port_name(name: &str) -> Option<Self> {
        let digits = name
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| &name[i..])?;
        digits.parse().ok().map(Endpoint)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One physical keypad as seen by the most recent probe.
///
/// Two devices compare equal when they live on the same endpoint, whatever
/// their state or configuration.
#[derive(Debug, Clone)]
pub struct Device {
    pub endpoint: Endpoint,
    /// The OS name of the serial port, e.g. `COM4`.
    pub port_name: String,
    pub state: ConnectionState,
    pub firmware_version: Option<String>,
    pub configuration: Configuration,
}

impl Device {
    /// A device that could not be talked to: no version, empty configuration.
    pub fn unreachable(endpoint: Endpoint, port_name: String, state: ConnectionState) -> Self {
        Device {
            endpoint,
            port_name,
            state,
            firmware_version: None,
            configuration: Configuration::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.endpoint == other.endpoint
    }
}
impl Eq for Device {}

impl PartialOrd for Device {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Device {
    fn cmp(&self, other: &Self) -> Ordering {
        self.endpoint.cmp(&other.endpoint)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.configuration.name {
            Some(name) => write!(f, "{} ({})", name, self.port_name),
            None => f.write_str(&self.port_name),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
