//! Discovering the state and configuration of a keypad.
//!
//! A probe opens the endpoint, writes `get` and collects the `GET key=value`
//! answer until `GET END` arrives or the probe timeout elapses. The answer is
//! accepted as is in both cases, so a slow keypad shows up as connected with
//! a partly unknown configuration rather than as an error. The channel is
//! always closed before returning.

use std::{
    sync::mpsc::{self, RecvTimeoutError},
    time::{Duration, Instant},
};

use log::{debug, info, warn};

use crate::{
    channel::{Channel, Connector},
    model::{ConnectionState, Device, Endpoint},
    parser,
    protocol::{self, GetLine},
    settings::Settings,
    Error, Result,
};

// =============================================================================
// Public Interface
// =============================================================================

/// The key/value pairs of a `get` answer, in arrival order.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ResponseMap {
    entries: Vec<(String, String)>,
}

impl ResponseMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pair unless `key` is already present. Returns `false` and
    /// keeps the first value for a duplicate key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if self.get(&key).is_some() {
            return false;
        }
        self.entries.push((key, value.into()));
        true
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Probes the keypad at `endpoint`.
///
/// A missing port yields a [`ConnectionState::Disconnected`] device and a
/// port held by another process a [`ConnectionState::Busy`] one, both with an
/// empty configuration and without any protocol write. Only transport
/// failures on an open channel are returned as errors.
pub fn probe(connector: &dyn Connector, settings: &Settings, endpoint: Endpoint) -> Result<Device> {
    let port_name = endpoint.port_name(&settings.port_prefix);
    let line = settings.line(settings.query_parity);

    let mut channel = match Channel::open(connector, &port_name, &line) {
        Ok(channel) => channel,
        Err(Error::PortAbsent(_)) => {
            debug!("{} is disconnected", port_name);
            return Ok(Device::unreachable(endpoint, port_name, ConnectionState::Disconnected));
        }
        Err(Error::PortUnavailable(_)) => {
            debug!("{} is busy", port_name);
            return Ok(Device::unreachable(endpoint, port_name, ConnectionState::Busy));
        }
        Err(e) => return Err(e),
    };

    let values = query(&mut channel, settings.probe_timeout);
    channel.close();
    let values = values?;

    Ok(Device {
        endpoint,
        port_name,
        state: ConnectionState::Connected,
        firmware_version: values.get("version").map(str::to_owned),
        configuration: parser::parse(&values),
    })
}

/// Opens `endpoint` with the query parity, writes every command in order and
/// closes it again. No answer is expected.
pub fn send<I, S>(connector: &dyn Connector, settings: &Settings, endpoint: Endpoint, commands: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let port_name = endpoint.port_name(&settings.port_prefix);
    let mut channel = Channel::open(connector, &port_name, &settings.line(settings.query_parity))?;
    let result = channel.write_lines(commands);
    channel.close();
    result
}

// =============================================================================
// Private stuff
// =============================================================================

/// Runs the `get` exchange on an open channel.
fn query(channel: &mut Channel, timeout: Duration) -> Result<ResponseMap> {
    let (tx, rx) = mpsc::channel();
    channel.subscribe(move |line| {
        if let Some(parsed) = GetLine::parse(line) {
            let _ = tx.send(parsed);
        }
    })?;
    channel.write_line(protocol::GET)?;

    let mut values = ResponseMap::new();
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(GetLine::Pair(key, value)) => {
                if !values.insert(key.clone(), value) {
                    warn!("{} sent `{}` twice, keeping the first value", channel.port_name(), key);
                }
            }
            Ok(GetLine::End) => break,
            Err(RecvTimeoutError::Timeout) => {
                info!(
                    "{} did not finish answering `get` within {:?} ({} values)",
                    channel.port_name(),
                    timeout,
                    values.len()
                );
                break;
            }
            Err(RecvTimeoutError::Disconnected) => {
                info!("{} stopped answering `get`", channel.port_name());
                break;
            }
        }
    }
    Ok(values)
}

// =============================================================================
// Unit Tests
// =============================================================================
