//! The `minitool` subcommands.
//!
//! Every command returns the process exit code. Commands addressing a single
//! keypad probe it first and stop early when it is busy or disconnected.

use std::{error, fmt, io::stdout, path::Path, time::Duration};

use console::{style, StyledObject};
use crossterm::{
    cursor::{MoveDown, MoveUp},
    execute, terminal,
};
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};

use minipad::{
    calibration::{self, Calibration},
    channel::SerialConnector,
    discovery,
    flash::{self, BaudTouch, MountedVolumes},
    protocol, report, ConnectionState, Device, Endpoint, Error, FirmwareProblem, Session, Settings,
};

use crate::keyboard;

pub(crate) const SUCCESS: i32 = 0;
pub(crate) const BUSY: i32 = 1;
pub(crate) const DISCONNECTED: i32 = 2;
pub(crate) const PROBE_FAILED: i32 = 3;
pub(crate) const COMMAND_FAILED: i32 = 4;
pub(crate) const NOT_UF2: i32 = 5;
pub(crate) const FIRMWARE_MISSING: i32 = 6;

type CommandResult = Result<(), Box<dyn error::Error>>;

//==============================================================================
// Public Interface
//==============================================================================

/// Lists the keypads plugged into this machine.
pub(crate) fn devices(settings: &Settings, show_all: bool) -> i32 {
    let endpoints = match discovery::keypad_endpoints() {
        Ok(endpoints) => endpoints,
        Err(e) => {
            report_error("failed to enumerate the serial ports", &e);
            return PROBE_FAILED;
        }
    };
    debug!("{} keypad endpoints found", endpoints.len());
    let results = discovery::probe_all(&SerialConnector, settings, &endpoints);

    let count = |state: ConnectionState| {
        results
            .iter()
            .filter(|(_, result)| matches!(result, Ok(device) if device.state == state))
            .count()
    };

    println!(
        "List of connected minipads ({} connected, {} busy):",
        count(ConnectionState::Connected),
        count(ConnectionState::Busy)
    );
    let mut reachable: Vec<&Device> = results
        .iter()
        .filter_map(|(_, result)| result.as_ref().ok())
        .filter(|device| device.state != ConnectionState::Disconnected)
        .collect();
    reachable.sort_by_key(|device| device.state);
    for device in reachable {
        println!("  {} {}", device, styled_state(device.state));
    }

    if show_all {
        let errors: Vec<(Endpoint, &Error)> = results
            .iter()
            .filter_map(|(endpoint, result)| result.as_ref().err().map(|e| (*endpoint, e)))
            .collect();

        println!();
        println!(
            "List of unreachable minipads ({} disconnected, {} error):",
            count(ConnectionState::Disconnected),
            errors.len()
        );
        for (_, result) in &results {
            if let Ok(device) = result {
                if device.state == ConnectionState::Disconnected {
                    println!("  {} {}", device.port_name, styled_state(device.state));
                }
            }
        }
        for (endpoint, e) in errors {
            info!("probing endpoint {} failed: {}", endpoint, e);
            println!(
                "  {} {}",
                endpoint.port_name(&settings.port_prefix),
                style("error").red()
            );
        }
    }

    SUCCESS
}

/// Prints everything the keypad reports about itself.
pub(crate) fn info(settings: &Settings, endpoint: Endpoint) -> i32 {
    let device = match minipad::probe(&SerialConnector, settings, endpoint) {
        Ok(device) => device,
        Err(e) => {
            report_error("failed to query the minipad", &e);
            return PROBE_FAILED;
        }
    };

    match device.state {
        ConnectionState::Disconnected => {
            println!("{}", style("Disconnected").red());
            return DISCONNECTED;
        }
        ConnectionState::Busy => {
            println!("{}", style("Busy").yellow());
            return BUSY;
        }
        ConnectionState::Connected => println!("{}", style("Connected").green()),
    }

    let configuration = &device.configuration;
    println!("Name: {}", style(&device).bold());
    println!(
        "Version: {}",
        device.firmware_version.as_deref().unwrap_or("unknown")
    );
    println!();
    for (label, value) in report::summary(configuration) {
        println!("{}: {}", label, value);
    }

    println!();
    println!(
        "{}",
        style(format!(
            "Hall Effect Keys ({}):",
            configuration.hall_effect_keys.len()
        ))
        .bold()
    );
    if configuration.hall_effect_keys.is_empty() {
        println!("This minipad has no Hall Effect keys.");
    }
    for key in &configuration.hall_effect_keys {
        println!("{}", key);
    }

    println!();
    println!(
        "{}",
        style(format!("Digital Keys ({}):", configuration.digital_keys.len())).bold()
    );
    if configuration.digital_keys.is_empty() {
        println!("This minipad has no digital keys.");
    }
    for key in &configuration.digital_keys {
        println!("{}", key);
    }

    SUCCESS
}

/// Reboots the keypad into its bootloader without flashing anything.
pub(crate) fn boot(settings: &Settings, endpoint: Endpoint) -> i32 {
    send(settings, endpoint, protocol::BOOT)
}

/// Sends one raw command line.
pub(crate) fn send(settings: &Settings, endpoint: Endpoint, command: &str) -> i32 {
    if let Err(code) = connected_device(settings, endpoint) {
        return code;
    }
    match minipad::send(&SerialConnector, settings, endpoint, vec![command]) {
        Ok(()) => {
            println!("OK");
            SUCCESS
        }
        Err(e) => {
            report_error("failed to send the command", &e);
            COMMAND_FAILED
        }
    }
}

pub(crate) fn calibrate(settings: &Settings, endpoint: Endpoint) -> i32 {
    let device = match connected_device(settings, endpoint) {
        Ok(device) => device,
        Err(code) => return code,
    };
    match run_calibration(settings, &device) {
        Ok(()) => SUCCESS,
        Err(e) => {
            report_error("calibration failed", &e);
            COMMAND_FAILED
        }
    }
}

/// Draws the travel of every hall effect key live until `Esc` is pressed.
pub(crate) fn visualize(settings: &Settings, endpoint: Endpoint) -> i32 {
    let device = match connected_device(settings, endpoint) {
        Ok(device) => device,
        Err(code) => return code,
    };

    let configuration = &device.configuration;
    let (travel, resolution) = match (
        configuration.travel_distance,
        configuration.analog_resolution,
    ) {
        (Some(travel), Some(resolution)) => (travel, resolution),
        _ => {
            println!(
                "{}: {} did not report its travel distance and analog resolution",
                style("error").red(),
                device
            );
            return PROBE_FAILED;
        }
    };
    if configuration.hall_effect_keys.is_empty() {
        println!("This minipad has no Hall Effect keys.");
        return SUCCESS;
    }

    println!("{}", style(format!("  Visualizer for {}", device)).bold());
    println!("  press {} to stop", style("Esc").cyan());
    match run_visualizer(settings, &device, travel, resolution) {
        Ok(()) => SUCCESS,
        Err(e) => {
            report_error("visualizer stopped", &e);
            COMMAND_FAILED
        }
    }
}

/// Installs `image` through the keypad's bootloader.
pub(crate) fn flash(settings: &Settings, endpoint: Endpoint, image: &Path) -> i32 {
    match flash::validate_firmware(image) {
        Ok(()) => {}
        Err(Error::InvalidFirmware { reason, .. }) => {
            println!(
                "{}: the specified firmware file {}",
                style("error").red(),
                reason
            );
            return match reason {
                FirmwareProblem::Missing => FIRMWARE_MISSING,
                FirmwareProblem::NotUf2 => NOT_UF2,
            };
        }
        Err(e) => {
            report_error("failed to check the firmware file", &e);
            return COMMAND_FAILED;
        }
    }

    if let Err(code) = connected_device(settings, endpoint) {
        return code;
    }

    let pb = spinner();
    pb.set_message("⌛ Waiting for bootloader...");
    let volume = match flash::enter_bootloader_and_await_volume(
        &BaudTouch,
        &MountedVolumes,
        settings,
        endpoint,
    ) {
        Ok(volume) => volume,
        Err(e) => {
            pb.finish_with_message("❌ The bootloader did not show up");
            report_error("failed to enter the bootloader", &e);
            return COMMAND_FAILED;
        }
    };

    pb.set_message(format!("Flashing {}...", style(volume.display()).cyan()));
    match flash::install_firmware(image, &volume) {
        Ok(target) => {
            pb.finish_with_message(format!(
                "👍 Firmware written to {}",
                style(target.display()).green()
            ));
            SUCCESS
        }
        Err(e) => {
            pb.finish_with_message("💥 Flashing failed!");
            report_error("failed to install the firmware", &e);
            COMMAND_FAILED
        }
    }
}

/// Forwards typed lines to the keypad until an exit word is entered.
pub(crate) fn console(settings: &Settings, endpoint: Endpoint) -> i32 {
    let device = match connected_device(settings, endpoint) {
        Ok(device) => device,
        Err(code) => return code,
    };
    let mut session = match Session::open(&SerialConnector, settings, &device) {
        Ok(session) => session,
        Err(e) => {
            report_error("failed to open the console", &e);
            return COMMAND_FAILED;
        }
    };

    let theme = ColorfulTheme::default();
    let prompt = device.to_string();
    loop {
        let input = match Input::<String>::with_theme(&theme)
            .with_prompt(&prompt)
            .allow_empty(true)
            .interact_text()
        {
            Ok(input) => input,
            Err(e) => {
                report_error("failed to read the input", &e);
                break;
            }
        };
        if Session::is_exit(&input) {
            break;
        }
        if let Err(e) = session.send(&input) {
            report_error("failed to send the command", &e);
        }
    }
    session.close();

    SUCCESS
}

//==============================================================================
// Private stuff
//==============================================================================

/// Probes `endpoint`, returning the device if it is connected or the exit
/// code to leave with otherwise.
fn connected_device(settings: &Settings, endpoint: Endpoint) -> Result<Device, i32> {
    let device = match minipad::probe(&SerialConnector, settings, endpoint) {
        Ok(device) => device,
        Err(e) => {
            report_error("failed to query the minipad", &e);
            return Err(PROBE_FAILED);
        }
    };
    match device.state {
        ConnectionState::Connected => Ok(device),
        state => {
            println!(
                "The minipad on {} is currently {}",
                style(&device.port_name).cyan(),
                styled_state(state)
            );
            Err(if state == ConnectionState::Busy {
                BUSY
            } else {
                DISCONNECTED
            })
        }
    }
}

fn run_calibration(settings: &Settings, device: &Device) -> CommandResult {
    let connector = SerialConnector;
    let hid_enabled = device.configuration.any_hid_enabled();
    minipad::send(
        &connector,
        settings,
        device.endpoint,
        calibration::prepare_commands(),
    )?;

    println!(
        "Please make sure all keys are {} and press the enter key.",
        style("fully released").green()
    );
    keyboard::wait_for_enter()?;
    let released = minipad::poll(&connector, settings, device)?.raw;

    println!();
    println!(
        "Please make sure all keys are {} and press the enter key.",
        style("fully pressed").red()
    );
    keyboard::wait_for_enter()?;
    let pressed = minipad::poll(&connector, settings, device)?.raw;

    let calibration = Calibration::from_readings(&released, &pressed);
    println!();
    println!("{}", style("Results:").bold());
    let keys = &device.configuration.hall_effect_keys;
    for (index, ((rest, down), key)) in calibration
        .rest
        .iter()
        .zip(&calibration.down)
        .zip(keys)
        .enumerate()
    {
        println!(
            "hkey{}: rest={} (current: {}) down={} (current: {})",
            index + 1,
            rest,
            known(key.rest_position),
            down,
            known(key.down_position)
        );
    }

    println!();
    let theme = ColorfulTheme::default();
    let apply = Confirm::with_theme(&theme)
        .with_prompt("Would you like to apply the new calibration values?")
        .default(true)
        .interact()?;
    if apply {
        minipad::send(&connector, settings, device.endpoint, calibration.commands())?;
        println!("New calibration applied.");
    }

    let mut enable_answer = None;
    if calibration::asks_to_enable_hid(hid_enabled, apply) {
        println!();
        enable_answer = Some(
            Confirm::with_theme(&theme)
                .with_prompt("Would you like to enable HID output?")
                .default(false)
                .interact()?,
        );
    }

    let follow_up = calibration::follow_up_commands(hid_enabled, apply, enable_answer);
    if !follow_up.is_empty() {
        minipad::send(&connector, settings, device.endpoint, follow_up)?;
        if enable_answer == Some(true) {
            println!("HID output enabled.");
        } else {
            info!("HID output restored on {}", device);
        }
    }
    Ok(())
}

fn run_visualizer(settings: &Settings, device: &Device, travel: i32, resolution: i32) -> CommandResult {
    let connector = SerialConnector;
    let keys = device.configuration.hall_effect_keys.len();

    loop {
        let sample = minipad::poll(&connector, settings, device)?;
        let (width, _) = terminal::size()?;
        let width = width as usize;

        for (index, (raw, mapped)) in sample.raw.iter().zip(&sample.mapped).enumerate() {
            let line = report::render_bar(index, *raw, *mapped, keys, travel, resolution, width);
            println!(
                "{}{}{}",
                line.prefix,
                style(&line.bar).white().bold(),
                line.suffix
            );
        }
        // Blank rows wipe what a terminal resize leaves behind.
        for _ in 0..keys {
            println!("{:w$}", "", w = width.saturating_sub(1));
        }
        execute!(stdout(), MoveUp((keys * 2) as u16))?;

        if keyboard::poll_escape(Duration::from_millis(10))? {
            execute!(stdout(), MoveDown(keys as u16))?;
            return Ok(());
        }
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(120);
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"])
            .template("{spinner:.blue} {msg}"),
    );
    pb
}

fn styled_state(state: ConnectionState) -> StyledObject<String> {
    let text = state.to_string();
    match state {
        ConnectionState::Connected => style(text).green(),
        ConnectionState::Busy => style(text).yellow(),
        ConnectionState::Disconnected => style(text).red(),
    }
}

fn known(value: Option<i32>) -> String {
    value.map_or_else(|| "?".into(), |value| value.to_string())
}

fn report_error(message: &str, error: &dyn fmt::Display) {
    println!("{}: {}", style("error").red(), message);
    println!("   {} {}", style("-->").cyan(), error);
}
