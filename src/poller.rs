//! Sampling the hall effect sensors.
//!
//! The sensor output listener on the keypad uses a different parity than the
//! configuration listener. A sample opens its own channel, writes `out` and
//! waits until every hall effect key has reported an `OUT hkey<n>=<raw>
//! <mapped>` line. Readings arriving more than once for the same key simply
//! overwrite the previous one.

use std::{
    sync::mpsc::{self, RecvTimeoutError},
    time::Instant,
};

use log::{debug, warn};

use crate::{
    channel::{Channel, Connector},
    model::{ConnectionState, Device},
    protocol::{self, Reading},
    settings::Settings,
    Error, Result,
};

/// Slot value of a key that hasn't reported yet.
pub const UNSET: i32 = -1;

/// One reading per hall effect key, indexed like
/// [`Configuration::hall_effect_keys`](crate::Configuration::hall_effect_keys).
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SensorSample {
    /// Raw analog values.
    pub raw: Vec<i32>,
    /// Values mapped onto the travel distance.
    pub mapped: Vec<i32>,
}

impl SensorSample {
    fn unset(keys: usize) -> Self {
        SensorSample {
            raw: vec![UNSET; keys],
            mapped: vec![UNSET; keys],
        }
    }

    fn is_complete(&self) -> bool {
        !self.raw.contains(&UNSET)
    }
}

/// Samples every hall effect key of a connected `device`.
///
/// Blocks until each key has reported. With a `sample_timeout` set in
/// `settings` the wait fails with [`Error::Timeout`] once it elapses; without
/// one a keypad that stops answering blocks the caller forever. The channel
/// is closed on every path.
pub fn poll(connector: &dyn Connector, settings: &Settings, device: &Device) -> Result<SensorSample> {
    if device.state != ConnectionState::Connected {
        return Err(Error::NotConnected(device.state));
    }

    let keys = device.configuration.hall_effect_keys.len();
    let line = settings.line(settings.sample_parity);
    let mut channel = Channel::open(connector, &device.port_name, &line)?;

    let result = sample(&mut channel, settings, keys);
    channel.close();
    result
}

fn sample(channel: &mut Channel, settings: &Settings, keys: usize) -> Result<SensorSample> {
    let (tx, rx) = mpsc::channel();
    channel.subscribe(move |line| {
        if let Some(reading) = Reading::parse(line) {
            let _ = tx.send(reading);
        }
    })?;
    channel.write_line(protocol::OUT)?;

    let mut sample = SensorSample::unset(keys);
    let deadline = settings.sample_timeout.map(|timeout| Instant::now() + timeout);

    while !sample.is_complete() {
        let received = match deadline {
            Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        let reading = match received {
            Ok(reading) => reading,
            Err(RecvTimeoutError::Timeout) => {
                let missing = sample.raw.iter().filter(|raw| **raw == UNSET).count();
                debug!("{} of {} keys never reported", missing, keys);
                return Err(Error::timeout(
                    "sensor sampling",
                    settings.sample_timeout.unwrap_or_default(),
                ));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(Error::Disconnected(channel.port_name().into()));
            }
        };

        if reading.index >= keys {
            warn!(
                "{} reported hkey{} but has {} hall effect keys",
                channel.port_name(),
                reading.index + 1,
                keys
            );
            continue;
        }
        sample.raw[reading.index] = reading.raw;
        sample.mapped[reading.index] = reading.mapped;
    }

    Ok(sample)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{Configuration, Endpoint, HallEffectKey},
        testing::SyntheticDevice,
        SettingsBuilder,
    };

    use serialport::Parity;
    use std::time::Duration;

    fn device(keys: usize) -> Device {
        let mut device = Device::unreachable(Endpoint(1), "COM1".into(), ConnectionState::Connected);
        device.configuration = Configuration {
            hall_effect_keys: vec![HallEffectKey::default(); keys],
            ..Configuration::default()
        };
        device
    }

    fn settings() -> Settings {
        SettingsBuilder::new()
            .sample_timeout(Some(Duration::from_secs(2)))
            .finalize()
    }

    #[test]
    fn waits_for_every_key() {
        let keypad = SyntheticDevice::answering(|command| match command {
            "out" => vec!["OUT hkey1=100 50".into(), "OUT hkey2=200 80".into()],
            _ => vec![],
        });
        let sample = poll(&keypad, &settings(), &device(2)).unwrap();
        assert_eq!(sample.raw, vec![100, 200]);
        assert_eq!(sample.mapped, vec![50, 80]);
        assert_eq!(keypad.written(), vec!["out"]);
        assert_eq!(keypad.opened_with(), vec![Parity::None]);
    }

    #[test]
    fn ignores_noise_and_out_of_range_keys() {
        let keypad = SyntheticDevice::answering(|command| match command {
            "out" => vec![
                "OUT hkey3=999 999".into(),
                "garbage".into(),
                "OUT hkey2=200 80".into(),
                "OUT hkey0=1 1".into(),
                "OUT hkey1=100 50".into(),
            ],
            _ => vec![],
        });
        let sample = poll(&keypad, &settings(), &device(2)).unwrap();
        assert_eq!(sample.raw, vec![100, 200]);
        assert_eq!(sample.mapped, vec![50, 80]);
    }

    #[test]
    fn incomplete_sample_times_out() {
        let keypad = SyntheticDevice::answering(|command| match command {
            "out" => vec!["OUT hkey1=100 50".into()],
            _ => vec![],
        });
        let settings = SettingsBuilder::new()
            .sample_timeout(Some(Duration::from_millis(100)))
            .finalize();
        assert!(matches!(
            poll(&keypad, &settings, &device(2)),
            Err(Error::Timeout { .. })
        ));
    }

    #[test]
    fn without_a_timeout_a_late_answer_still_completes() {
        let keypad = SyntheticDevice::answering(|command| match command {
            "out" => vec!["OUT hkey1=100 50".into(), "OUT hkey2=200 80".into()],
            _ => vec![],
        })
        .answering_late(Duration::from_millis(300));
        let settings = SettingsBuilder::new().sample_timeout(None).finalize();

        let started = Instant::now();
        let sample = poll(&keypad, &settings, &device(2)).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert_eq!(sample.raw, vec![100, 200]);
        assert_eq!(sample.mapped, vec![50, 80]);
    }

    #[test]
    fn hang_up_before_every_key_reported() {
        let keypad = SyntheticDevice::answering(|command| match command {
            "out" => vec!["OUT hkey1=100 50".into()],
            _ => vec![],
        })
        .hang_up_after_answer();
        let settings = SettingsBuilder::new().sample_timeout(None).finalize();
        assert!(matches!(
            poll(&keypad, &settings, &device(2)),
            Err(Error::Disconnected(ref port)) if port == "COM1"
        ));
    }

    #[test]
    fn keypad_without_hall_effect_keys() {
        let keypad = SyntheticDevice::silent();
        let sample = poll(&keypad, &settings(), &device(0)).unwrap();
        assert_eq!(sample, SensorSample::default());
    }

    #[test]
    fn requires_a_connected_device() {
        let keypad = SyntheticDevice::silent();
        let mut busy = device(2);
        busy.state = ConnectionState::Busy;
        assert!(matches!(
            poll(&keypad, &settings(), &busy),
            Err(Error::NotConnected(ConnectionState::Busy))
        ));
        assert!(keypad.opened_with().is_empty());
    }
}
