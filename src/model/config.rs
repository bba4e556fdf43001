use super::{DigitalKey, HallEffectKey};

/// The configuration reported by a keypad in answer to the `get` command.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Configuration {
    /// The name of the keypad.
    pub name: Option<String>,
    /// Minimum gap between the lower and upper hysteresis, and between the
    /// upper hysteresis and the travel distance.
    pub hysteresis_tolerance: Option<i32>,
    /// Minimum rapid trigger sensitivity, up and down.
    pub rapid_trigger_tolerance: Option<i32>,
    /// Travel distance of the hall effect keys, in hundredths of a millimeter.
    pub travel_distance: Option<i32>,
    /// Resolution of the analog to digital converter, in bits.
    pub analog_resolution: Option<i32>,
    /// Sized exactly to the `hkeys` count reported by the device.
    pub hall_effect_keys: Vec<HallEffectKey>,
    /// Sized exactly to the `dkeys` count reported by the device.
    pub digital_keys: Vec<DigitalKey>,
}

impl Configuration {
    /// `true` when at least one hall effect key reports HID output enabled.
    pub fn any_hid_enabled(&self) -> bool {
        self.hall_effect_keys
            .iter()
            .any(|key| key.base.hid_enabled == Some(true))
    }
}
