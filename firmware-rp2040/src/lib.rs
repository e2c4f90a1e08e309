//! Pro Controller emulator for RP2040.
//!
//! The firmware enumerates as a Nintendo Switch Pro Controller over USB and
//! plays text macros typed into a second, CDC-ACM serial interface on the same
//! cable.
//!
//! # Overview
//!
//! The firmware runs on a Raspberry Pi Pico (RP2040) and:
//! 1. Answers the console's USB handshake and subcommand requests
//! 2. Sends a full input report every 8 ms once the console asks for them
//! 3. Reads macro lines (`PRESS a`, `STICK l_stick 1 0`, `SLEEP 0.5`, ...) from
//!    the serial port and turns them into queued state changes
//! 4. Writes diagnostics (pairing, player number, errors) back to the serial port
//!
//! # Hardware Configuration
//!
//! | Function | GPIO | Description |
//! |----------|------|-------------|
//! | USB      | -    | HID (console) + CDC-ACM (macros, logs) |
//! | LED      | 25   | On-board LED (toggles on rejected macro lines) |
//!
//! # Architecture
//!
//! The firmware uses the Embassy async runtime with five concurrent tasks:
//!
//! - **USB Task**: Manages the USB device stack
//! - **HID Reader Task**: Receives console output reports, signals them onward
//! - **Report Task**: Runs the [`ReportPump`](procon_core::ReportPump)
//! - **Serial Task**: Reads macro lines, feeds the command queue
//! - **Log Task**: Drains the diagnostic logs to the serial port
//!
//! Requests travel from the HID reader to the report task through Embassy
//! [`Signal`](embassy_sync::signal::Signal)s with "latest value wins"
//! semantics. Macro commands travel through the lock-free
//! [`CommandQueue`](procon_core::CommandQueue).
//!
//! # Modules
//!
//! - [`usb_link`]: HID sink and request source ([`UsbReportSink`], [`SignalRequests`])
//! - [`serial`]: Macro reader and log writer ([`SerialMacroReader`], [`SerialLogWriter`])
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)

#![no_std]

use embassy_time::Instant;
use procon_core::Clock;

// Re-export core types for convenience
pub use procon_core::{
    CommandQueue, ControllerConfig, ControllerSession, DiagnosticLog, MacroRunner, ReportPump,
    DEFAULT_CONFIG,
};

pub mod serial;
pub mod usb_link;

pub use serial::{configure_usb_serial, SerialLogWriter, SerialMacroReader};
pub use usb_link::{
    configure_usb_hid, ProconRequestHandler, SignalRequests, UsbDriver, UsbReportSink,
};

/// [`Clock`] backed by the Embassy time driver.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}
