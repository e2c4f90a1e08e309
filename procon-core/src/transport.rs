//! Transport traits and error types.
//!
//! The HID link itself (Bluetooth or USB) lives outside this crate. It hands
//! requests in through [`RequestSource`], takes finished reports through
//! [`ReportSink`], and provides time through [`Clock`].

use core::future::Future;

use crate::engine::{OutgoingReport, REQUEST_LEN};

/// Error type for transport operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Link-level I/O error.
    Io,
    /// Link not ready (e.g. not connected or not enumerated).
    NotReady,
    /// Connection lost.
    Disconnected,
}

/// One raw request from the console, report id at byte 0.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RequestFrame {
    bytes: [u8; REQUEST_LEN],
    len: usize,
}

impl RequestFrame {
    /// Copy up to [`REQUEST_LEN`] bytes.
    pub fn new(data: &[u8]) -> Self {
        let len = data.len().min(REQUEST_LEN);
        let mut bytes = [0u8; REQUEST_LEN];
        bytes[..len].copy_from_slice(&data[..len]);
        Self { bytes, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn report_id(&self) -> Option<u8> {
        self.as_bytes().first().copied()
    }
}

impl core::fmt::Debug for RequestFrame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("RequestFrame").field(&self.as_bytes()).finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for RequestFrame {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "RequestFrame({=[u8]:x})", self.as_bytes())
    }
}

/// Async trait for report destinations.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap allocation.
pub trait ReportSink {
    /// Transmit one report. May wait until the link can take it.
    fn send(
        &mut self,
        report: &OutgoingReport,
    ) -> impl Future<Output = Result<(), TransportError>>;

    /// Ask the link to signal readiness for the next report.
    ///
    /// Called after every send attempt, successful or not. Links that are
    /// always ready need not override this.
    fn rearm(&mut self) {}
}

/// Non-blocking source of console requests.
pub trait RequestSource {
    /// Take the most recent request, if one arrived since the last call.
    fn try_take(&mut self) -> Option<RequestFrame>;
}

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> u64;
}
