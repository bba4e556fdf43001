//! The keypad line protocol.
//!
//! The host and the keypad exchange newline terminated ASCII lines:
//!
//! ```text
//! host                               keypad
//!  | ---- get ------------------------> |
//!  | <--- GET name=minipad ------------ |
//!  | <--- GET hkeys=2 ----------------- |
//!  | <--- ... ------------------------- |
//!  | <--- GET END --------------------- |
//!  |                                    |
//!  | ---- out ------------------------> |
//!  | <--- OUT hkey1=1800 400 ---------- |
//!  | <--- OUT hkey2=1795 400 ---------- |
//! ```
//!
//! Any other line written by the host (`hkey1.rest 1800`, `save`, `boot`...)
//! is a command without a guaranteed answer. Keys are numbered from 1 on the
//! wire and from 0 everywhere else in this crate.

/// Requests the whole configuration.
pub const GET: &str = "get";
/// Requests one sensor reading per hall effect key.
pub const OUT: &str = "out";
/// Persists the current configuration on the keypad.
pub const SAVE: &str = "save";
/// Reboots the keypad into its bootloader.
pub const BOOT: &str = "boot";

/// Appended by the channel to every line written.
pub const LINE_TERMINATOR: &str = "\n";

const GET_PREFIX: &str = "GET ";
const GET_END: &str = "GET END";
const OUT_PREFIX: &str = "OUT hkey";

/// Serial speed the keypad interprets as a request to enter the bootloader.
pub const BOOTLOADER_BAUD_RATE: u32 = 1200;
/// Name under which the firmware image is copied to the bootloader volume.
pub const FIRMWARE_FILE_NAME: &str = "firmware.uf2";
/// Required extension of firmware images.
pub const FIRMWARE_EXTENSION: &str = "uf2";

/// USB vendor id of the keypad.
pub const MINIPAD_VID: u16 = 0x0727;
/// USB product id of the keypad.
pub const MINIPAD_PID: u16 = 0x0727;

// =============================================================================
// Received lines
// =============================================================================

/// A line received in answer to [`GET`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum GetLine {
    /// `GET <key>=<value>`; the value is everything after the first `=`.
    Pair(String, String),
    /// `GET END`
    End,
}

impl GetLine {
    /// Parses one received line, `None` if it doesn't belong to the `get`
    /// exchange.
    pub fn parse(line: &str) -> Option<Self> {
        if line == GET_END {
            return Some(GetLine::End);
        }
        let rest = line.strip_prefix(GET_PREFIX)?;
        let separator = rest.find('=')?;
        Some(GetLine::Pair(
            rest[..separator].to_owned(),
            rest[separator + 1..].to_owned(),
        ))
    }
}

/// One sensor reading received in answer to [`OUT`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Reading {
    /// 0-based hall effect key index.
    pub index: usize,
    /// Raw analog value.
    pub raw: i32,
    /// Value mapped onto the travel distance.
    pub mapped: i32,
}

impl Reading {
    /// Parses `OUT hkey<n>=<raw> <mapped>` where `n` is 1-based. Anything
    /// else, including `hkey0`, yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix(OUT_PREFIX)?;
        let mut parts = rest.splitn(2, '=');
        let number: usize = parts.next()?.parse().ok()?;
        let mut values = parts.next()?.split(' ');
        let raw = values.next()?.parse().ok()?;
        let mapped = values.next()?.parse().ok()?;
        Some(Reading {
            index: number.checked_sub(1)?,
            raw,
            mapped,
        })
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Command setting a hall effect key property, `hkey<n>.<field> <value>`.
pub fn hall_effect_key_command(index: usize, field: &str, value: impl std::fmt::Display) -> String {
    format!("hkey{}.{} {}", index + 1, field, value)
}

/// Command setting `field` on every hall effect key at once, `hkey.<field> <value>`.
pub fn all_hall_effect_keys_command(field: &str, value: impl std::fmt::Display) -> String {
    format!("hkey.{} {}", field, value)
}

/// Command switching HID output of all hall effect keys on or off.
pub fn hid_command(enabled: bool) -> String {
    all_hall_effect_keys_command("hid", if enabled { 1 } else { 0 })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_pairs_split_on_the_first_equal_sign() {
        assert_eq!(
            GetLine::parse("GET name=a=b"),
            Some(GetLine::Pair("name".into(), "a=b".into()))
        );
        assert_eq!(
            GetLine::parse("GET hkey3.rest=1800"),
            Some(GetLine::Pair("hkey3.rest".into(), "1800".into()))
        );
        assert_eq!(
            GetLine::parse("GET name="),
            Some(GetLine::Pair("name".into(), "".into()))
        );
    }

    #[test]
    fn get_end_is_matched_exactly() {
        assert_eq!(GetLine::parse("GET END"), Some(GetLine::End));
        assert_eq!(GetLine::parse("GET END "), None);
        assert_eq!(GetLine::parse("get END"), None);
    }

    #[test]
    fn unrelated_lines_are_not_get_lines() {
        assert_eq!(GetLine::parse("OUT hkey1=1 2"), None);
        assert_eq!(GetLine::parse("GET novalue"), None);
        assert_eq!(GetLine::parse(""), None);
    }

    #[test]
    fn readings_use_one_based_indexes_on_the_wire() {
        assert_eq!(
            Reading::parse("OUT hkey1=100 50"),
            Some(Reading {
                index: 0,
                raw: 100,
                mapped: 50
            })
        );
        assert_eq!(
            Reading::parse("OUT hkey12=-3 0"),
            Some(Reading {
                index: 11,
                raw: -3,
                mapped: 0
            })
        );
    }

    #[test]
    fn malformed_readings_are_rejected() {
        assert_eq!(Reading::parse("OUT hkey0=100 50"), None);
        assert_eq!(Reading::parse("OUT hkey1=100"), None);
        assert_eq!(Reading::parse("OUT hkeyx=100 50"), None);
        assert_eq!(Reading::parse("OUT hkey1=abc 50"), None);
        assert_eq!(Reading::parse("OUT dkey1=100 50"), None);
        assert_eq!(Reading::parse("GET END"), None);
    }

    #[test]
    fn command_builders() {
        assert_eq!(hall_effect_key_command(0, "rest", 1800), "hkey1.rest 1800");
        assert_eq!(hall_effect_key_command(2, "down", 1100), "hkey3.down 1100");
        assert_eq!(hid_command(false), "hkey.hid 0");
        assert_eq!(hid_command(true), "hkey.hid 1");
    }
}
