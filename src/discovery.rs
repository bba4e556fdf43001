//! Finding the endpoints of connected keypads.
//!
//! Keypads enumerate as USB serial devices with their own vendor and product
//! ids. Every matching port is turned into an [`Endpoint`] from the number at
//! the end of its name.

use log::debug;
use serialport::{available_ports, SerialPortInfo, SerialPortType};

use crate::{
    channel::Connector,
    model::{Device, Endpoint},
    prober,
    protocol::{MINIPAD_PID, MINIPAD_VID},
    settings::Settings,
    Result,
};

/// Endpoints of the USB serial ports with the keypad's VID/PID, sorted.
///
/// Only ports present right now are found; an unplugged keypad has no port.
pub fn keypad_endpoints() -> Result<Vec<Endpoint>> {
    endpoints_of(available_ports())
}

/// Probes every endpoint in turn. A failing probe is kept as an `Err` next
/// to its endpoint, the others are unaffected.
pub fn probe_all(
    connector: &dyn Connector,
    settings: &Settings,
    endpoints: &[Endpoint],
) -> Vec<(Endpoint, Result<Device>)> {
    endpoints
        .iter()
        .map(|&endpoint| (endpoint, prober::probe(connector, settings, endpoint)))
        .collect()
}

fn endpoints_of(ports: serialport::Result<Vec<SerialPortInfo>>) -> Result<Vec<Endpoint>> {
    let ports = ports?;
    debug!("{} serial ports present", ports.len());
    Ok(matching_endpoints(&ports, MINIPAD_VID, MINIPAD_PID))
}

fn matching_endpoints(ports: &[SerialPortInfo], vid: u16, pid: u16) -> Vec<Endpoint> {
    let mut endpoints: Vec<Endpoint> = ports
        .iter()
        .filter(|port| match &port.port_type {
            SerialPortType::UsbPort(usb) => usb.vid == vid && usb.pid == pid,
            _ => false,
        })
        .filter_map(|port| Endpoint::from_port_name(&port.port_name))
        .collect();
    endpoints.sort();
    endpoints.dedup();
    endpoints
}
