//! Reflashing a keypad through its mass storage bootloader.
//!
//! The sequence is:
//!
//! 1. snapshot the mounted volumes,
//! 2. signal the keypad to reboot into its bootloader (1200 baud touch),
//! 3. poll the mounted volumes until exactly one new volume shows up,
//! 4. copy the `.uf2` image onto it as `firmware.uf2`; the keypad flashes
//!    itself and reboots.
//!
//! Volume removals and unchanged snapshots never end the wait, so a keypad
//! that doesn't come back only ever causes a timeout.

mod trigger;
mod volumes;

pub use trigger::{BaudTouch, BootTrigger};
pub use volumes::{MountedVolumes, VolumeSet, VolumeSource};

use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use log::{debug, info};
use retry::{delay, retry_with_index};

use crate::{
    model::Endpoint,
    protocol::{FIRMWARE_EXTENSION, FIRMWARE_FILE_NAME},
    settings::Settings,
    Error, FirmwareProblem, Result,
};

// =============================================================================
// Public Interface
// =============================================================================

/// Reboots the keypad at `endpoint` into its bootloader and returns the
/// volume it mounts.
///
/// Polls every `settings.volume_poll_interval`; gives up with
/// [`Error::Timeout`] after `settings.bootloader_timeout`, or waits forever
/// when that is `None`.
pub fn enter_bootloader_and_await_volume(
    trigger: &dyn BootTrigger,
    volumes: &dyn VolumeSource,
    settings: &Settings,
    endpoint: Endpoint,
) -> Result<PathBuf> {
    let port_name = endpoint.port_name(&settings.port_prefix);
    let baseline = volumes.snapshot()?;
    debug!("{} volumes mounted before entering the bootloader", baseline.len());

    trigger.trigger(&port_name)?;
    info!("{} asked to enter its bootloader", port_name);

    await_new_volume(
        volumes,
        &baseline,
        settings.volume_poll_interval,
        settings.bootloader_timeout,
    )
}

/// Polls `volumes` until exactly one volume absent from `baseline` appears.
///
/// Fails with [`Error::AmbiguousVolume`] if several appear between two polls.
pub fn await_new_volume(
    volumes: &dyn VolumeSource,
    baseline: &VolumeSet,
    poll_interval: Duration,
    timeout: Option<Duration>,
) -> Result<PathBuf> {
    let started = Instant::now();
    loop {
        let current = volumes.snapshot()?;
        let mut added: Vec<PathBuf> = current.difference(baseline).cloned().collect();
        match added.len() {
            0 => {}
            1 => {
                let volume = added.remove(0);
                info!("bootloader volume {} mounted", volume.display());
                return Ok(volume);
            }
            _ => return Err(Error::AmbiguousVolume(added)),
        }

        if let Some(timeout) = timeout {
            if started.elapsed() >= timeout {
                return Err(Error::timeout("waiting for the bootloader volume", timeout));
            }
        }
        thread::sleep(poll_interval);
    }
}

/// Checks that `image` exists and is a `.uf2` file.
pub fn validate_firmware(image: &Path) -> Result<()> {
    if !image.is_file() {
        return Err(Error::InvalidFirmware {
            path: image.to_owned(),
            reason: FirmwareProblem::Missing,
        });
    }
    if image.extension().and_then(|ext| ext.to_str()) != Some(FIRMWARE_EXTENSION) {
        return Err(Error::InvalidFirmware {
            path: image.to_owned(),
            reason: FirmwareProblem::NotUf2,
        });
    }
    Ok(())
}

/// Copies `image` onto `volume` as `firmware.uf2`, overwriting any previous
/// copy. A freshly mounted volume may refuse writes for a moment, so the copy
/// is retried a few times.
pub fn install_firmware(image: &Path, volume: &Path) -> Result<PathBuf> {
    let target = volume.join(FIRMWARE_FILE_NAME);
    let result = retry_with_index(delay::Fixed::from_millis(500).take(4), |index| {
        debug!("copying {} to {} ({})", image.display(), target.display(), index);
        fs::copy(image, &target)
    });

    match result {
        Ok(bytes) => {
            info!("{} bytes written to {}", bytes, target.display());
            Ok(target)
        }
        Err(retry::Error::Operation {
            error,
            total_delay,
            tries,
        }) => {
            info!(
                "failed to copy the firmware after {:?} and {} tries: {}",
                total_delay, tries, error
            );
            Err(Error::Install {
                volume: volume.to_owned(),
                source: error,
            })
        }
        Err(retry::Error::Internal(message)) => Err(Error::Install {
            volume: volume.to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::Other, message),
        }),
    }
}

/// Validates `image`, reboots the keypad into its bootloader and installs
/// the image on the volume it mounts. Returns the path of the written file.
pub fn flash(
    trigger: &dyn BootTrigger,
    volumes: &dyn VolumeSource,
    settings: &Settings,
    endpoint: Endpoint,
    image: &Path,
) -> Result<PathBuf> {
    validate_firmware(image)?;
    let volume = enter_bootloader_and_await_volume(trigger, volumes, settings, endpoint)?;
    install_firmware(image, &volume)
}

// =============================================================================
// Unit Tests
// =============================================================================
