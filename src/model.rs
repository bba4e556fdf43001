//! Value types describing a keypad and its configuration.
//!
//! Everything in here is a snapshot: a fresh [`Device`] is produced by every
//! probe and nothing is cached between operations. Every configuration field
//! is an `Option` because the firmware may omit any key it doesn't know or
//! hasn't set, and "unknown" must stay distinguishable from a legitimate zero.

mod config;
mod device;
mod keys;

pub use config::Configuration;
pub use device::{ConnectionState, Device, Endpoint};
pub use keys::{DigitalKey, HallEffectKey};
