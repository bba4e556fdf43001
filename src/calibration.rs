//! Calibration of the hall effect key rest and down positions.
//!
//! HID output is switched off while calibrating so that pressing the keys
//! doesn't type anything. The sensors are sampled once with all keys
//! released and once with all keys fully pressed; a small tolerance moves
//! both positions inwards so that sensor noise still reaches them.

use crate::protocol::{self, hall_effect_key_command, hid_command};

/// Margin applied to the measured rest and down positions.
pub const TOLERANCE: i32 = 3;

/// New rest and down positions, one per hall effect key.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Calibration {
    pub rest: Vec<i32>,
    pub down: Vec<i32>,
}

impl Calibration {
    /// Derives the positions from raw readings taken with the keys released
    /// and fully pressed.
    pub fn from_readings(released: &[i32], pressed: &[i32]) -> Self {
        Calibration {
            rest: released.iter().map(|raw| raw - TOLERANCE).collect(),
            down: pressed.iter().map(|raw| raw + TOLERANCE).collect(),
        }
    }

    /// The commands storing the calibration on the keypad, ending with
    /// `save`.
    pub fn commands(&self) -> Vec<String> {
        let mut commands: Vec<String> = self
            .rest
            .iter()
            .zip(&self.down)
            .enumerate()
            .flat_map(|(index, (rest, down))| {
                vec![
                    hall_effect_key_command(index, "rest", rest),
                    hall_effect_key_command(index, "down", down),
                ]
            })
            .collect();
        commands.push(protocol::SAVE.into());
        commands
    }
}

/// Commands turning HID output of the hall effect keys off before sampling.
pub fn prepare_commands() -> Vec<String> {
    vec![hid_command(false)]
}

/// Commands turning HID output back on and persisting it.
pub fn enable_hid_commands() -> Vec<String> {
    vec![hid_command(true), protocol::SAVE.into()]
}

/// `true` when the user should be asked whether to turn HID output on,
/// which is only the case after applying a calibration to a keypad that had
/// HID off on every key.
pub fn asks_to_enable_hid(hid_was_enabled: bool, applied: bool) -> bool {
    applied && !hid_was_enabled
}

/// The commands restoring HID output once the user decided whether to apply
/// the calibration. `enable_answer` is the answer to the question asked when
/// [`asks_to_enable_hid`] holds.
///
/// Applying ends with `save`, which also persists HID as off, so a keypad
/// that had HID on gets it back on and saved. A declined calibration saved
/// nothing and only needs HID switched back on.
pub fn follow_up_commands(
    hid_was_enabled: bool,
    applied: bool,
    enable_answer: Option<bool>,
) -> Vec<String> {
    match (hid_was_enabled, applied) {
        (true, true) => enable_hid_commands(),
        (true, false) => vec![hid_command(true)],
        (false, true) if enable_answer == Some(true) => enable_hid_commands(),
        (false, _) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_moves_positions_inwards() {
        let calibration = Calibration::from_readings(&[1800, 1790], &[1100, 1120]);
        assert_eq!(calibration.rest, vec![1797, 1787]);
        assert_eq!(calibration.down, vec![1103, 1123]);
    }

    #[test]
    fn commands_use_wire_indexes_and_save() {
        let calibration = Calibration::from_readings(&[1800, 1790], &[1100, 1120]);
        assert_eq!(
            calibration.commands(),
            vec![
                "hkey1.rest 1797",
                "hkey1.down 1103",
                "hkey2.rest 1787",
                "hkey2.down 1123",
                "save",
            ]
        );
    }

    #[test]
    fn hid_toggling() {
        assert_eq!(prepare_commands(), vec!["hkey.hid 0"]);
        assert_eq!(enable_hid_commands(), vec!["hkey.hid 1", "save"]);
    }

    #[test]
    fn applied_calibration_restores_and_saves_hid() {
        assert!(!asks_to_enable_hid(true, true));
        assert_eq!(
            follow_up_commands(true, true, None),
            vec!["hkey.hid 1", "save"]
        );
    }

    #[test]
    fn declined_calibration_switches_hid_back_on_unsaved() {
        assert!(!asks_to_enable_hid(true, false));
        assert_eq!(follow_up_commands(true, false, None), vec!["hkey.hid 1"]);
        assert!(follow_up_commands(false, false, None).is_empty());
    }

    #[test]
    fn hid_off_everywhere_is_only_enabled_on_request() {
        assert!(asks_to_enable_hid(false, true));
        assert_eq!(
            follow_up_commands(false, true, Some(true)),
            vec!["hkey.hid 1", "save"]
        );
        assert!(follow_up_commands(false, true, Some(false)).is_empty());
    }
}
