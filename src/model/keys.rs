/// A plain switch key.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct DigitalKey {
    /// 0-based index; the wire protocol numbers keys from 1.
    pub index: Option<usize>,
    /// The character sent over HID when the key is pressed.
    pub key_char: Option<char>,
    pub hid_enabled: Option<bool>,
}

/// An analog key whose travel is measured continuously by a hall effect
/// sensor.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct HallEffectKey {
    /// The fields shared with digital keys.
    pub base: DigitalKey,
    pub rapid_trigger: Option<bool>,
    pub continuous_rapid_trigger: Option<bool>,
    /// Rapid trigger sensitivity when the key travels up.
    pub rapid_trigger_up_sensitivity: Option<i32>,
    /// Rapid trigger sensitivity when the key travels down.
    pub rapid_trigger_down_sensitivity: Option<i32>,
    /// Below this value the key is pressed and rapid trigger becomes active.
    pub lower_hysteresis: Option<i32>,
    /// Above this value the key is released and rapid trigger is inactive.
    pub upper_hysteresis: Option<i32>,
    /// Raw sensor value with the key at rest.
    pub rest_position: Option<i32>,
    /// Raw sensor value with the key fully pressed.
    pub down_position: Option<i32>,
}
