//! Human readable renderings of keypad state.
//!
//! Keys print in the same `name=value` shape the keypad's own commands use,
//! so a printed line can be turned back into commands by hand. Values the
//! keypad didn't report print as `?`.

use std::fmt::{self, Display, Formatter};

use crate::model::{Configuration, DigitalKey, HallEffectKey};

// =============================================================================
// Public Interface
// =============================================================================

impl Display for DigitalKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "dkey{}:", Known(&self.index.map(|index| index + 1)))?;
        write_base(f, self)
    }
}

impl Display for HallEffectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hkey{}: rt={} crt={} rtus={} rtds={} lh={} uh={} rest={} down={}",
            Known(&self.base.index.map(|index| index + 1)),
            Known(&self.rapid_trigger),
            Known(&self.continuous_rapid_trigger),
            Known(&self.rapid_trigger_up_sensitivity),
            Known(&self.rapid_trigger_down_sensitivity),
            Known(&self.lower_hysteresis),
            Known(&self.upper_hysteresis),
            Known(&self.rest_position),
            Known(&self.down_position),
        )?;
        write_base(f, &self.base)
    }
}

/// The general keypad values as `(label, value)` rows.
pub fn summary(configuration: &Configuration) -> Vec<(&'static str, String)> {
    vec![
        (
            "Hysteresis Tolerance",
            or_unknown(configuration.hysteresis_tolerance),
        ),
        (
            "Rapid Trigger Tolerance",
            or_unknown(configuration.rapid_trigger_tolerance),
        ),
        (
            "Analog Resolution",
            configuration
                .analog_resolution
                .map_or_else(|| "unknown".into(), |bits| format!("{}-bit", bits)),
        ),
        (
            "Travel Distance",
            configuration
                .travel_distance
                .map_or_else(|| "unknown".into(), |trdt| format!("{}mm", millimeters(trdt))),
        ),
    ]
}

/// One visualizer row: a label, the travel bar and the travelled distance
/// followed by the raw reading.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BarLine {
    pub prefix: String,
    pub bar: String,
    pub suffix: String,
}

impl Display for BarLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.prefix, self.bar, self.suffix)
    }
}

/// Renders the row of the hall effect key at 0-based `index` for a terminal
/// `width` columns wide.
///
/// `mapped` counts down from `travel` (at rest) to 0 (fully pressed); the
/// bar fills with `=` as the key is pressed. `resolution` is the analog
/// resolution in bits and only sizes the raw value column.
pub fn render_bar(
    index: usize,
    raw: i32,
    mapped: i32,
    key_count: usize,
    travel: i32,
    resolution: i32,
    width: usize,
) -> BarLine {
    let label_width = key_count.to_string().len();
    let mapped_width = travel.to_string().len();
    let raw_width = max_raw(resolution).to_string().len();
    let travelled = millimeters(travel - mapped);

    let prefix = format!("hkey{:<w$}: [", index + 1, w = label_width);
    let suffix = format!(
        "] {:>mw$}mm ({:>rw$})",
        travelled,
        raw,
        mw = mapped_width,
        rw = raw_width
    );

    let total = width.saturating_sub(prefix.len() + suffix.len() + 3);
    let blank = if travel > 0 {
        let mapped = mapped.max(0) as u64;
        let filled = (mapped * total as u64 + travel as u64 - 1) / travel as u64;
        (filled as usize).min(total)
    } else {
        0
    };
    let bar = format!("{}{}", "=".repeat(total - blank), " ".repeat(blank));

    BarLine { prefix, bar, suffix }
}

// =============================================================================
// Private stuff
// =============================================================================

struct Known<'a, T>(&'a Option<T>);

impl<T: Display> Display for Known<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => value.fmt(f),
            None => f.write_str("?"),
        }
    }
}

fn write_base(f: &mut Formatter<'_>, key: &DigitalKey) -> fmt::Result {
    match key.key_char {
        Some(c) => write!(f, " char='{}'", c)?,
        None => f.write_str(" char=?")?,
    }
    write!(f, " hid={}", Known(&key.hid_enabled))
}

fn or_unknown(value: Option<i32>) -> String {
    value.map_or_else(|| "unknown".into(), |value| value.to_string())
}

/// Hundredths of a millimeter, two decimals.
fn millimeters(hundredths: i32) -> String {
    format!("{:.2}", f64::from(hundredths) / 100.0)
}

fn max_raw(resolution: i32) -> u64 {
    match resolution {
        bits if bits <= 0 => 0,
        bits if bits >= 64 => u64::MAX,
        bits => (1u64 << bits) - 1,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
