//! The report-side owner of all controller state.

use crate::config::ControllerConfig;
use crate::diag::LogWriter;
use crate::engine::{DeviceMeta, OutgoingReport, ProtocolEngine};
use crate::queue::{CommandReceiver, CommitSummary};
use crate::rate::RateController;
use crate::rumble::decode_rumble;
use crate::state::ControllerState;

/// Everything the transport callbacks touch.
///
/// The serial side only holds the matching [`CommandSender`]; it never sees
/// this object. Both transport events (`on_subcommand_received` and
/// `on_ready_to_send`) run in the same context, so no locking is needed here.
///
/// [`CommandSender`]: crate::queue::CommandSender
pub struct ControllerSession<'a> {
    state: ControllerState,
    engine: ProtocolEngine,
    rate: RateController,
    commands: CommandReceiver<'a>,
    log: LogWriter<'a>,
    carries_update: bool,
}

impl<'a> ControllerSession<'a> {
    pub fn new(
        commands: CommandReceiver<'a>,
        log: LogWriter<'a>,
        config: &ControllerConfig,
        address: [u8; 6],
    ) -> Self {
        Self {
            state: ControllerState::with_battery(config.battery_connection),
            engine: ProtocolEngine::new(address),
            rate: RateController::new(config.report_interval_ms),
            commands,
            log,
            carries_update: false,
        }
    }

    /// Store a request from the console for the next report to answer.
    pub fn on_subcommand_received(&mut self, data: &[u8]) {
        if let Some(active) = decode_rumble(data) {
            if self.engine.set_rumble(active) {
                diag!(self.log, "rumble {}", if active { "on" } else { "off" });
            }
        }
        self.engine.store_request(data);
    }

    /// Apply every sealed command. Marks an update pending if anything changed.
    pub fn process_commands(&mut self) -> CommitSummary {
        let summary = self.commands.commit(&mut self.state);
        if summary.applied > 0 {
            self.rate.mark_pending();
        }
        if summary.dropped > 0 {
            warn!("command queue overflow: {} dropped", summary.dropped);
            diag!(self.log, "command queue full, dropped {}", summary.dropped);
        }
        summary
    }

    /// Build the report to transmit now and record the send time.
    ///
    /// ```
    /// use procon_core::{CommandQueue, ControllerSession, DiagnosticLog, Button, DEFAULT_CONFIG};
    ///
    /// let mut queue: CommandQueue = CommandQueue::new();
    /// let mut log: DiagnosticLog = DiagnosticLog::new();
    /// let (mut tx, rx) = queue.split();
    /// let (writer, _reader) = log.split();
    /// let mut session = ControllerSession::new(rx, writer, &DEFAULT_CONFIG, [0; 6]);
    ///
    /// tx.press(Button::A).unwrap();
    /// let report = session.on_ready_to_send(0);
    /// assert_eq!(report[4] & 0x08, 0x08);
    /// assert!(!session.can_send_report(4));
    /// ```
    pub fn on_ready_to_send(&mut self, now_ms: u64) -> OutgoingReport {
        self.process_commands();
        self.carries_update = self.rate.has_pending_update();

        let before = *self.engine.meta();
        let report = self.engine.generate_report(&self.state, now_ms);
        self.note_meta_changes(&before);

        self.rate.mark_sent(now_ms);
        report
    }

    fn note_meta_changes(&mut self, before: &DeviceMeta) {
        let after = *self.engine.meta();
        if after.paired && !before.paired {
            diag!(self.log, "paired");
        }
        if after.player_number != before.player_number {
            diag!(self.log, "player {}", after.player_number);
        }
        if after.vibration_enabled && !before.vibration_enabled {
            diag!(self.log, "vibration enabled");
        }
        if after.imu_enabled != before.imu_enabled {
            diag!(
                self.log,
                "imu {}",
                if after.imu_enabled { "on" } else { "off" }
            );
        }
    }

    pub fn can_send_report(&self, now_ms: u64) -> bool {
        self.rate.can_send_report(now_ms)
    }

    pub fn delay_until_ready_ms(&self, now_ms: u64) -> u64 {
        self.rate.delay_until_ready_ms(now_ms)
    }

    pub fn has_pending_update(&self) -> bool {
        self.rate.has_pending_update()
    }

    /// Flag the current state as not yet delivered.
    pub fn mark_pending(&mut self) {
        self.rate.mark_pending();
    }

    /// Whether the last report built carried a state change that no earlier
    /// report had.
    pub fn report_carries_update(&self) -> bool {
        self.carries_update
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn meta(&self) -> &DeviceMeta {
        self.engine.meta()
    }

    /// The session's log writer, for transport glue sharing its context.
    pub fn log(&mut self) -> &mut LogWriter<'a> {
        &mut self.log
    }
}
