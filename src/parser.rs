//! Conversion of the flat `get` answer into a [`Configuration`].
//!
//! Parsing never fails: a missing or malformed value leaves its field
//! unknown. Key counts come from `hkeys`/`dkeys` and exactly that many keys
//! are built; key `i` (0-based) is read from `hkey{i+1}.<field>` or
//! `dkey{i+1}.<field>`.

use crate::{
    model::{Configuration, DigitalKey, HallEffectKey},
    prober::ResponseMap,
};

// =============================================================================
// Public Interface
// =============================================================================

/// Builds the configuration described by `values`.
pub fn parse(values: &ResponseMap) -> Configuration {
    let hall_effect_count = count(values, "hkeys");
    let digital_count = count(values, "dkeys");

    Configuration {
        name: values.get("name").map(str::to_owned),
        hysteresis_tolerance: decode_int(values.get("htol")),
        rapid_trigger_tolerance: decode_int(values.get("rtol")),
        travel_distance: decode_int(values.get("trdt")),
        analog_resolution: decode_int(values.get("ares")),
        hall_effect_keys: (0..hall_effect_count)
            .map(|index| hall_effect_key(values, index))
            .collect(),
        digital_keys: (0..digital_count)
            .map(|index| digital_key(values, "dkey", index))
            .collect(),
    }
}

/// `"1"` is true, any other value false. Absent stays unknown.
pub fn decode_bool(value: Option<&str>) -> Option<bool> {
    value.map(|value| value == "1")
}

/// Base 10 integer, unknown when absent or malformed.
pub fn decode_int(value: Option<&str>) -> Option<i32> {
    value?.parse().ok()
}

/// Decimal code point of a character no larger than `U+FFFF`.
pub fn decode_char(value: Option<&str>) -> Option<char> {
    let code: u32 = value?.parse().ok()?;
    if code > u32::from(u16::MAX) {
        return None;
    }
    std::char::from_u32(code)
}

// =============================================================================
// Private stuff
// =============================================================================

/// Key counts above 255 are not plausible for a keypad and count as malformed.
fn count(values: &ResponseMap, key: &str) -> usize {
    values
        .get(key)
        .and_then(|value| value.parse::<u8>().ok())
        .map(usize::from)
        .unwrap_or(0)
}

fn field<'a>(values: &'a ResponseMap, prefix: &str, index: usize, name: &str) -> Option<&'a str> {
    values.get(&format!("{}{}.{}", prefix, index + 1, name))
}

fn digital_key(values: &ResponseMap, prefix: &str, index: usize) -> DigitalKey {
    DigitalKey {
        index: Some(index),
        key_char: decode_char(field(values, prefix, index, "char")),
        hid_enabled: decode_bool(field(values, prefix, index, "hid")),
    }
}

fn hall_effect_key(values: &ResponseMap, index: usize) -> HallEffectKey {
    let int = |name| decode_int(field(values, "hkey", index, name));
    let flag = |name| decode_bool(field(values, "hkey", index, name));

    HallEffectKey {
        base: digital_key(values, "hkey", index),
        rapid_trigger: flag("rt"),
        continuous_rapid_trigger: flag("crt"),
        rapid_trigger_up_sensitivity: int("rtus"),
        rapid_trigger_down_sensitivity: int("rtds"),
        lower_hysteresis: int("lh"),
        upper_hysteresis: int("uh"),
        rest_position: int("rest"),
        down_position: int("down"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> ResponseMap {
        let mut map = ResponseMap::new();
        for (key, value) in pairs {
            map.insert(*key, *value);
        }
        map
    }

    #[test]
    fn empty_answer_is_all_unknown() {
        assert_eq!(parse(&ResponseMap::new()), Configuration::default());
    }

    #[test]
    fn global_settings() {
        let config = parse(&map(&[
            ("name", "minipad"),
            ("htol", "10"),
            ("rtol", "5"),
            ("trdt", "400"),
            ("ares", "12"),
        ]));
        assert_eq!(config.name.as_deref(), Some("minipad"));
        assert_eq!(config.hysteresis_tolerance, Some(10));
        assert_eq!(config.rapid_trigger_tolerance, Some(5));
        assert_eq!(config.travel_distance, Some(400));
        assert_eq!(config.analog_resolution, Some(12));
    }

    #[test]
    fn wire_indexes_are_one_based() {
        let config = parse(&map(&[("hkeys", "3"), ("hkey3.rest", "1800")]));
        assert_eq!(config.hall_effect_keys.len(), 3);
        assert_eq!(config.hall_effect_keys[2].rest_position, Some(1800));
        assert_eq!(config.hall_effect_keys[2].base.index, Some(2));
        assert_eq!(config.hall_effect_keys[0].rest_position, None);
    }

    #[test]
    fn keys_beyond_the_count_are_ignored() {
        let config = parse(&map(&[
            ("hkeys", "1"),
            ("dkeys", "0"),
            ("hkey2.rest", "1800"),
            ("dkey1.char", "97"),
        ]));
        assert_eq!(config.hall_effect_keys.len(), 1);
        assert!(config.digital_keys.is_empty());
    }

    #[test]
    fn zero_keys() {
        let config = parse(&map(&[("hkeys", "0"), ("hkey1.rest", "1800")]));
        assert!(config.hall_effect_keys.is_empty());
    }

    #[test]
    fn malformed_counts_mean_no_keys() {
        let config = parse(&map(&[("hkeys", "two"), ("dkeys", "-1")]));
        assert!(config.hall_effect_keys.is_empty());
        assert!(config.digital_keys.is_empty());
    }

    #[test]
    fn implausible_counts_mean_no_keys() {
        let config = parse(&map(&[
            ("hkeys", "18446744073709551615"),
            ("dkeys", "4294967295"),
            ("hkey1.rest", "1800"),
        ]));
        assert!(config.hall_effect_keys.is_empty());
        assert!(config.digital_keys.is_empty());

        let config = parse(&map(&[("hkeys", "256"), ("dkeys", "255")]));
        assert!(config.hall_effect_keys.is_empty());
        assert_eq!(config.digital_keys.len(), 255);
    }

    #[test]
    fn full_hall_effect_key() {
        let config = parse(&map(&[
            ("hkeys", "1"),
            ("hkey1.rt", "1"),
            ("hkey1.crt", "0"),
            ("hkey1.rtus", "20"),
            ("hkey1.rtds", "60"),
            ("hkey1.lh", "280"),
            ("hkey1.uh", "330"),
            ("hkey1.char", "97"),
            ("hkey1.rest", "1800"),
            ("hkey1.down", "1100"),
            ("hkey1.hid", "1"),
        ]));
        assert_eq!(
            config.hall_effect_keys,
            vec![HallEffectKey {
                base: DigitalKey {
                    index: Some(0),
                    key_char: Some('a'),
                    hid_enabled: Some(true),
                },
                rapid_trigger: Some(true),
                continuous_rapid_trigger: Some(false),
                rapid_trigger_up_sensitivity: Some(20),
                rapid_trigger_down_sensitivity: Some(60),
                lower_hysteresis: Some(280),
                upper_hysteresis: Some(330),
                rest_position: Some(1800),
                down_position: Some(1100),
            }]
        );
    }

    #[test]
    fn digital_keys() {
        let config = parse(&map(&[
            ("dkeys", "2"),
            ("dkey1.char", "120"),
            ("dkey1.hid", "1"),
            ("dkey2.hid", "yes"),
        ]));
        assert_eq!(
            config.digital_keys,
            vec![
                DigitalKey {
                    index: Some(0),
                    key_char: Some('x'),
                    hid_enabled: Some(true),
                },
                DigitalKey {
                    index: Some(1),
                    key_char: None,
                    hid_enabled: Some(false),
                },
            ]
        );
    }

    #[test]
    fn decoders() {
        assert_eq!(decode_bool(Some("1")), Some(true));
        assert_eq!(decode_bool(Some("true")), Some(false));
        assert_eq!(decode_bool(None), None);

        assert_eq!(decode_int(Some("-42")), Some(-42));
        assert_eq!(decode_int(Some("4.2")), None);
        assert_eq!(decode_int(Some("")), None);

        assert_eq!(decode_char(Some("97")), Some('a'));
        assert_eq!(decode_char(Some("65535")), Some('\u{FFFF}'));
        assert_eq!(decode_char(Some("65536")), None);
        assert_eq!(decode_char(Some("-1")), None);
        assert_eq!(decode_char(Some("a")), None);
    }
}
