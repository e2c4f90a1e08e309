//! ReportPump: paces the session's reports onto a transport.

use embedded_hal_async::delay::DelayNs;

use crate::session::ControllerSession;
use crate::transport::{Clock, ReportSink, RequestSource, TransportError};

/// Drives a [`ControllerSession`] from a transport.
///
/// Each cycle takes any pending console request, waits out the report
/// interval, builds the report, sends it, and re-arms the sink. A failed send
/// is logged and otherwise ignored: the next cycle simply tries again.
///
/// Reports go out every interval whether or not the state changed. A state
/// change whose report fails to send stays pending, so it is only counted as
/// delivered once a later report carrying it gets through.
pub struct ReportPump<'a, S, R, C> {
    session: ControllerSession<'a>,
    sink: S,
    requests: R,
    clock: C,
    last_error: Option<TransportError>,
    updates_sent: u32,
}

impl<'a, S: ReportSink, R: RequestSource, C: Clock> ReportPump<'a, S, R, C> {
    pub fn new(session: ControllerSession<'a>, sink: S, requests: R, clock: C) -> Self {
        Self {
            session,
            sink,
            requests,
            clock,
            last_error: None,
            updates_sent: 0,
        }
    }

    /// Run the pump indefinitely.
    pub async fn run(&mut self, delay: &mut impl DelayNs) -> ! {
        loop {
            let _ = self.pump_once(delay).await;
        }
    }

    /// Run one report cycle.
    ///
    /// Returns the result of the send for testing purposes.
    pub async fn pump_once(&mut self, delay: &mut impl DelayNs) -> Result<(), TransportError> {
        self.take_request();

        let wait_ms = self.session.delay_until_ready_ms(self.clock.now_ms());
        if wait_ms > 0 {
            delay.delay_ms(wait_ms.min(u32::MAX as u64) as u32).await;
            // the console may have spoken while we slept
            self.take_request();
        }

        let report = self.session.on_ready_to_send(self.clock.now_ms());
        let result = self.sink.send(&report).await;
        self.sink.rearm();

        let fresh = self.session.report_carries_update();
        match result {
            Ok(()) => {
                if fresh {
                    self.updates_sent = self.updates_sent.wrapping_add(1);
                    trace!("state update delivered");
                }
                if self.last_error.take().is_some() {
                    diag!(self.session.log(), "link recovered");
                }
            }
            Err(e) => {
                if fresh {
                    self.session.mark_pending();
                }
                if self.last_error != Some(e) {
                    warn!("report send failed: {}", e);
                    diag!(self.session.log(), "report send failed: {:?}", e);
                }
                self.last_error = Some(e);
            }
        }
        result
    }

    fn take_request(&mut self) {
        if let Some(frame) = self.requests.try_take() {
            trace!("request {}", frame);
            self.session.on_subcommand_received(frame.as_bytes());
        }
    }

    /// Number of reports that delivered a new controller state.
    pub fn updates_sent(&self) -> u32 {
        self.updates_sent
    }

    pub fn session(&self) -> &ControllerSession<'a> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ControllerSession<'a> {
        &mut self.session
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Decompose the pump into its session and transport components.
    pub fn into_parts(self) -> (ControllerSession<'a>, S, R, C) {
        (self.session, self.sink, self.requests, self.clock)
    }
}
