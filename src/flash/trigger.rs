//! Switching a keypad into its bootloader.
//!
//! The keypad reboots into its mass storage bootloader when its serial port
//! is set to 1200 baud. This is done out of band by the operating system's
//! own port configuration tool, no line is written.

use std::process::{Command, Stdio};

use log::debug;

use crate::{protocol::BOOTLOADER_BAUD_RATE, Error, Result};

/// Sends the "enter bootloader" signal to a keypad.
pub trait BootTrigger {
    fn trigger(&self, port_name: &str) -> Result<()>;
}

/// Changes the port speed to the bootloader baud rate with `mode` (Windows)
/// or `stty` (elsewhere).
#[derive(Debug, Default, Copy, Clone)]
pub struct BaudTouch;

impl BootTrigger for BaudTouch {
    fn trigger(&self, port_name: &str) -> Result<()> {
        let mut command = baud_command(port_name);
        command.stdout(Stdio::null()).stderr(Stdio::null());
        debug!("running {:?}", command);
        let status = match command.status() {
            Ok(status) => status,
            Err(e) => return Err(Error::Trigger(format!("{:?}: {}", command, e))),
        };
        if !status.success() {
            return Err(Error::Trigger(format!("{:?} exited with {}", command, status)));
        }
        Ok(())
    }
}

#[cfg(windows)]
fn baud_command(port_name: &str) -> Command {
    let mut command = Command::new("mode.com");
    command.arg(format!("{}:BAUD={}", port_name, BOOTLOADER_BAUD_RATE));
    command
}

#[cfg(target_os = "macos")]
fn baud_command(port_name: &str) -> Command {
    let mut command = Command::new("stty");
    command
        .arg("-f")
        .arg(port_name)
        .arg(BOOTLOADER_BAUD_RATE.to_string());
    command
}

#[cfg(not(any(windows, target_os = "macos")))]
fn baud_command(port_name: &str) -> Command {
    let mut command = Command::new("stty");
    command
        .arg("-F")
        .arg(port_name)
        .arg(BOOTLOADER_BAUD_RATE.to_string());
    command
}
