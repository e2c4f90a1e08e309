//! Compile-time controller configuration.

use crate::rate::DEFAULT_REPORT_INTERVAL_MS;
use crate::state::DEFAULT_BATTERY_CONNECTION;

/// Tunables for the emulated controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerConfig {
    /// Minimum spacing between input reports.
    pub report_interval_ms: u64,
    /// Battery level (high nibble) and connection info (low nibble).
    /// `0x80` reads as full battery, not charging.
    pub battery_connection: u8,
    /// How long a `PRESS` macro holds its buttons before releasing.
    pub tap_ms: u32,
}

/// Default configuration.
///
/// - 8 ms report interval (125 Hz)
/// - Battery byte `0x80`
/// - 100 ms taps
pub const DEFAULT_CONFIG: ControllerConfig = ControllerConfig {
    report_interval_ms: DEFAULT_REPORT_INTERVAL_MS,
    battery_connection: DEFAULT_BATTERY_CONNECTION,
    tap_ms: 100,
};

impl Default for ControllerConfig {
    fn default() -> Self {
        DEFAULT_CONFIG
    }
}
