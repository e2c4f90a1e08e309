//! Report pacing.

/// Minimum spacing between reports: 8 ms, i.e. 125 Hz.
pub const DEFAULT_REPORT_INTERVAL_MS: u64 = 8;

/// Decides when the next report may go out and whether state changed since
/// the last one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RateController {
    min_interval_ms: u64,
    last_sent_ms: Option<u64>,
    pending_update: bool,
}

impl RateController {
    pub const fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ms,
            last_sent_ms: None,
            pending_update: false,
        }
    }

    /// True before the first send, then once the interval has elapsed.
    pub fn can_send_report(&self, now_ms: u64) -> bool {
        match self.last_sent_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.min_interval_ms,
        }
    }

    /// Milliseconds until [`can_send_report`](Self::can_send_report) turns true.
    pub fn delay_until_ready_ms(&self, now_ms: u64) -> u64 {
        match self.last_sent_ms {
            None => 0,
            Some(last) => (last + self.min_interval_ms).saturating_sub(now_ms),
        }
    }

    /// Record a transmission. Clears the pending flag.
    pub fn mark_sent(&mut self, now_ms: u64) {
        self.last_sent_ms = Some(now_ms);
        self.pending_update = false;
    }

    /// Note that state changed and a report should reflect it.
    pub fn mark_pending(&mut self) {
        self.pending_update = true;
    }

    pub fn has_pending_update(&self) -> bool {
        self.pending_update
    }

    pub fn last_sent_ms(&self) -> Option<u64> {
        self.last_sent_ms
    }

    pub fn min_interval_ms(&self) -> u64 {
        self.min_interval_ms
    }
}

impl Default for RateController {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_report_always_allowed() {
        let rate = RateController::default();
        assert!(rate.can_send_report(0));
        assert_eq!(rate.delay_until_ready_ms(0), 0);
    }

    #[test]
    fn test_eight_millisecond_spacing() {
        let mut rate = RateController::default();
        rate.mark_sent(100);

        assert!(!rate.can_send_report(100));
        assert!(!rate.can_send_report(107));
        assert_eq!(rate.delay_until_ready_ms(103), 5);
        assert!(rate.can_send_report(108));
        assert_eq!(rate.delay_until_ready_ms(108), 0);
        assert!(rate.can_send_report(150));
    }

    #[test]
    fn test_simulated_clock_caps_at_125_hz() {
        let mut rate = RateController::default();
        let mut sent = 0;
        // poll every millisecond for one second
        for now in 0..1_000u64 {
            if rate.can_send_report(now) {
                rate.mark_sent(now);
                sent += 1;
            }
        }
        assert_eq!(sent, 125);
    }

    #[test]
    fn test_pending_flag_cleared_by_send() {
        let mut rate = RateController::new(4);
        assert!(!rate.has_pending_update());
        rate.mark_pending();
        assert!(rate.has_pending_update());
        rate.mark_sent(10);
        assert!(!rate.has_pending_update());
        assert_eq!(rate.last_sent_ms(), Some(10));
        assert!(rate.can_send_report(14));
    }

    #[test]
    fn test_clock_going_backwards_waits() {
        let mut rate = RateController::default();
        rate.mark_sent(50);
        assert!(!rate.can_send_report(40));
        assert_eq!(rate.delay_until_ready_ms(40), 18);
    }
}
