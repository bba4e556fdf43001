//! Settings of the keypad serial link and of the device operations timing.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values.

use std::time::Duration;

pub use serialport::{DataBits, FlowControl, Parity, StopBits};

#[cfg(windows)]
const DEFAULT_PORT_PREFIX: &str = "COM";
#[cfg(not(windows))]
const DEFAULT_PORT_PREFIX: &str = "/dev/ttyACM";

// =============================================================================
// Public Interface
// =============================================================================

/// Groups all settings used by the device layer and acts as a
/// [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
/// for the settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    /// Prepended to an endpoint number to form the OS port name.
    pub port_prefix: String,
    /// The baud rate in symbols-per-second.
    pub baud_rate: u32,
    /// Number of bits used to represent a character sent on the line.
    pub data_bits: DataBits,
    /// The type of signalling to use for controlling data transfer.
    pub flow_control: FlowControl,
    /// Number of bits to use to signal the end of a character.
    pub stop_bits: StopBits,
    /// Parity used to talk to the configuration listener (`get`, raw
    /// commands, console sessions).
    pub query_parity: Parity,
    /// Parity used to talk to the sensor output listener (`out`).
    pub sample_parity: Parity,

    /// Serial read timeout of the receive thread. Bounds how long `close`
    /// waits for the thread to notice it should stop.
    pub read_timeout: Duration,
    /// How long the prober waits for `GET END`.
    pub probe_timeout: Duration,
    /// How long the sensor poller waits for a full set of readings. `None`
    /// waits forever.
    pub sample_timeout: Option<Duration>,
    /// Period of the mounted volume checks after entering the bootloader.
    pub volume_poll_interval: Duration,
    /// How long to wait for the bootloader volume. `None` waits forever.
    pub bootloader_timeout: Option<Duration>,

    /// Restrict creation of `Settings` instances unless through the
    /// `SettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}

impl Settings {
    /// The parameters of the serial line, with the given parity.
    pub fn line(&self, parity: Parity) -> LineSettings {
        LineSettings {
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            flow_control: self.flow_control,
            stop_bits: self.stop_bits,
            parity,
            read_timeout: self.read_timeout,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        SettingsBuilder::new().finalize()
    }
}

/// The subset of [`Settings`] needed to open one serial channel.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LineSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub flow_control: FlowControl,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub read_timeout: Duration,
}

/// The builder for the `Settings` values.
///
/// All values are optional and have default values that will be used if not
/// explicitly set.
///
/// **Example**
///
/// ```
/// use std::time::Duration;
///
/// let settings = minipad::SettingsBuilder::new()
///     .port_prefix("/dev/ttyUSB")
///     .probe_timeout(Duration::from_millis(100))
///     .finalize();
/// assert_eq!(settings.port_prefix, "/dev/ttyUSB");
/// ```
pub struct SettingsBuilder {
    settings: Settings,
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsBuilder {
    /// Start building the settings using default values.
    pub fn new() -> Self {
        SettingsBuilder {
            settings: Settings {
                port_prefix: DEFAULT_PORT_PREFIX.into(),
                baud_rate: 115_200,
                data_bits: DataBits::Eight,
                flow_control: FlowControl::None,
                stop_bits: StopBits::One,
                query_parity: Parity::Even,
                sample_parity: Parity::None,
                read_timeout: Duration::from_millis(10),
                probe_timeout: Duration::from_millis(50),
                sample_timeout: Some(Duration::from_secs(1)),
                volume_poll_interval: Duration::from_millis(100),
                bootloader_timeout: Some(Duration::from_secs(30)),
                _private_use_builder: (),
            },
        }
    }

    /// Set the prefix of the serial port names
    pub fn port_prefix<'a>(mut self, prefix: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.port_prefix = prefix.into().into_owned();
        self
    }

    /// Set the baud rate in symbols-per-second
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.settings.baud_rate = baud_rate;
        self
    }

    /// Set the number of bits used to represent a character sent on the line
    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.settings.data_bits = data_bits;
        self
    }

    /// Set the type of signalling to use for controlling data transfer
    pub fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.settings.flow_control = flow_control;
        self
    }

    /// Set the number of bits to use to signal the end of a character
    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.settings.stop_bits = stop_bits;
        self
    }

    /// Set the parity used for configuration queries and commands
    pub fn query_parity(mut self, parity: Parity) -> Self {
        self.settings.query_parity = parity;
        self
    }

    /// Set the parity used for sensor sampling
    pub fn sample_parity(mut self, parity: Parity) -> Self {
        self.settings.sample_parity = parity;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.settings.read_timeout = timeout;
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.settings.probe_timeout = timeout;
        self
    }

    pub fn sample_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.settings.sample_timeout = timeout;
        self
    }

    pub fn volume_poll_interval(mut self, interval: Duration) -> Self {
        self.settings.volume_poll_interval = interval;
        self
    }

    pub fn bootloader_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.settings.bootloader_timeout = timeout;
        self
    }

    pub fn finalize(self) -> Settings {
        self.settings
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn all_default() {
    let settings = SettingsBuilder::new().finalize();
    assert_eq!(
        settings,
        Settings {
            port_prefix: DEFAULT_PORT_PREFIX.into(),
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            stop_bits: StopBits::One,
            query_parity: Parity::Even,
            sample_parity: Parity::None,
            read_timeout: Duration::from_millis(10),
            probe_timeout: Duration::from_millis(50),
            sample_timeout: Some(Duration::from_secs(1)),
            volume_poll_interval: Duration::from_millis(100),
            bootloader_timeout: Some(Duration::from_secs(30)),
            _private_use_builder: (),
        }
    )
}

#[test]
fn port_prefix() {
    let settings = SettingsBuilder::new().port_prefix("COM").finalize();
    assert_eq!(settings.port_prefix, "COM");
}

#[test]
fn baud_rate() {
    let baud_rate = 9_600;
    let settings = SettingsBuilder::new().baud_rate(baud_rate).finalize();
    assert_eq!(settings.baud_rate, baud_rate);
}

#[test]
fn query_and_sample_parities_differ_by_default() {
    let settings = SettingsBuilder::default().finalize();
    assert_eq!(settings.line(settings.query_parity).parity, Parity::Even);
    assert_eq!(settings.line(settings.sample_parity).parity, Parity::None);
}

#[test]
fn unbounded_sampling() {
    let settings = SettingsBuilder::new().sample_timeout(None).finalize();
    assert_eq!(settings.sample_timeout, None);
}

#[test]
fn bootloader_timing() {
    let settings = SettingsBuilder::new()
        .volume_poll_interval(Duration::from_millis(250))
        .bootloader_timeout(Some(Duration::from_secs(5)))
        .finalize();
    assert_eq!(settings.volume_poll_interval, Duration::from_millis(250));
    assert_eq!(settings.bootloader_timeout, Some(Duration::from_secs(5)));
}

#[test]
fn line_settings_carry_the_serial_parameters() {
    let settings = SettingsBuilder::new()
        .stop_bits(StopBits::Two)
        .data_bits(DataBits::Seven)
        .flow_control(FlowControl::Hardware)
        .read_timeout(Duration::from_millis(3))
        .finalize();
    let line = settings.line(Parity::Odd);
    assert_eq!(line.stop_bits, StopBits::Two);
    assert_eq!(line.data_bits, DataBits::Seven);
    assert_eq!(line.flow_control, FlowControl::Hardware);
    assert_eq!(line.parity, Parity::Odd);
    assert_eq!(line.read_timeout, Duration::from_millis(3));
}
