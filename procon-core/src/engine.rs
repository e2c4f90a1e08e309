//! Protocol state engine: builds every outgoing report.
//!
//! The console drives the conversation. Each request it sends lands in the
//! [`RequestBuffer`]; the next time the transport can transmit, the engine
//! answers that request (or, with nothing to answer, emits a periodic input
//! report) and clears the buffer.
//!
//! # Report layout
//!
//! ```text
//! [0]      0xA1 transport envelope
//! [1]      0x21 subcommand reply / 0x30 periodic input
//! [2]      tick (4 per millisecond, wraps at 256)
//! [3..13]  battery + buttons + sticks
//! [13]     vibration byte
//! [14..50] subcommand reply, or IMU samples
//! ```

use core::ops::{Deref, DerefMut};

use crate::spi::{spi_block, ERASED};
use crate::state::{ControllerState, STATE_LEN};

/// Size of every outgoing report.
pub const REPORT_LEN: usize = 50;
/// Size of the stored request.
pub const REQUEST_LEN: usize = 100;
/// Transport envelope byte at report offset 0.
pub const REPORT_ENVELOPE: u8 = 0xA1;

/// Report type for subcommand replies.
pub const REPLY_SUBCOMMAND: u8 = 0x21;
/// Report type for periodic full input reports.
pub const REPLY_FULL_INPUT: u8 = 0x30;

/// Vibration byte sequence cycled through on each acknowledgement.
pub const VIBRATION_PATTERN: [u8; 4] = [0x0A, 0x0C, 0x0B, 0x09];

/// Placeholder IMU samples (three frames of accel + gyro).
#[rustfmt::skip]
pub const IMU_PLACEHOLDER: [u8; 36] = [
    0x75, 0xFD, 0xFD, 0xFF, 0x09, 0x10, 0x21, 0x00, 0xD5, 0xFF, 0xE0, 0xFF,
    0x72, 0xFD, 0xF9, 0xFF, 0x0A, 0x10, 0x22, 0x00, 0xD5, 0xFF, 0xE0, 0xFF,
    0x76, 0xFD, 0xFC, 0xFF, 0x09, 0x10, 0x23, 0x00, 0xD5, 0xFF, 0xE0, 0xFF,
];

const NFC_IR_CONFIG: [u8; 8] = [0x01, 0x00, 0xFF, 0x00, 0x08, 0x00, 0x1B, 0x01];
const NFC_IR_CONFIG_TRAILER: u8 = 0xC8;

const OFFSET_TYPE: usize = 1;
const OFFSET_TICK: usize = 2;
const OFFSET_STATE: usize = 3;
const OFFSET_VIBRATION: usize = 13;
const OFFSET_REPLY: usize = 14;
const OFFSET_SPI_DATA: usize = 21;

/// Firmware version reported in the device info reply.
const FIRMWARE_VERSION: [u8; 2] = [0x03, 0x48];
/// Controller type: Pro Controller.
const CONTROLLER_TYPE: u8 = 0x03;

/// A 50-byte outgoing report.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct OutgoingReport([u8; REPORT_LEN]);

impl Deref for OutgoingReport {
    type Target = [u8; REPORT_LEN];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for OutgoingReport {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl core::fmt::Debug for OutgoingReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("OutgoingReport").field(&&self.0[..]).finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for OutgoingReport {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "OutgoingReport({=[u8]:x})", &self.0[..])
    }
}

impl OutgoingReport {
    /// A zeroed report carrying only the envelope byte.
    pub const fn new() -> Self {
        let mut bytes = [0u8; REPORT_LEN];
        bytes[0] = REPORT_ENVELOPE;
        Self(bytes)
    }

    /// Raw bytes, envelope included.
    pub fn as_bytes(&self) -> &[u8; REPORT_LEN] {
        &self.0
    }

    /// Bytes after the envelope, as sent on transports that frame reports themselves.
    pub fn payload(&self) -> &[u8] {
        &self.0[1..]
    }

    /// 0x21 for subcommand replies, 0x30 for periodic input.
    pub fn report_type(&self) -> u8 {
        self[OFFSET_TYPE]
    }

    pub fn tick(&self) -> u8 {
        self[OFFSET_TICK]
    }

    pub fn vibration_byte(&self) -> u8 {
        self[OFFSET_VIBRATION]
    }

    /// Bytes 14.. (acknowledgement or IMU samples).
    pub fn reply(&self) -> &[u8] {
        &self[OFFSET_REPLY..]
    }

    fn set_report_type(&mut self, report_type: u8) {
        self[OFFSET_TYPE] = report_type;
    }

    fn set_tick(&mut self, tick: u8) {
        self[OFFSET_TICK] = tick;
    }

    fn set_state(&mut self, state: &ControllerState) {
        self[OFFSET_STATE..OFFSET_STATE + STATE_LEN].copy_from_slice(&state.to_bytes());
    }

    fn set_vibration(&mut self, byte: u8) {
        self[OFFSET_VIBRATION] = byte;
    }

    fn set_ack(&mut self, ack: u8, subcommand: u8) {
        self[OFFSET_REPLY] = ack;
        self[OFFSET_REPLY + 1] = subcommand;
    }
}

impl Default for OutgoingReport {
    fn default() -> Self {
        Self::new()
    }
}

/// The last request received from the console.
///
/// `[0]` report id, `[1]` packet counter, `[2..10]` rumble data,
/// `[10]` subcommand id, `[11..]` subcommand arguments.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestBuffer {
    bytes: [u8; REQUEST_LEN],
}

impl RequestBuffer {
    pub const fn new() -> Self {
        Self {
            bytes: [0; REQUEST_LEN],
        }
    }

    /// Replace the contents. Bytes beyond `data` are zero; excess input is dropped.
    pub fn store(&mut self, data: &[u8]) {
        self.bytes = [0; REQUEST_LEN];
        let len = data.len().min(REQUEST_LEN);
        self.bytes[..len].copy_from_slice(&data[..len]);
    }

    pub fn clear(&mut self) {
        self.bytes = [0; REQUEST_LEN];
    }

    pub fn report_id(&self) -> u8 {
        self.bytes[0]
    }

    pub fn subcommand_id(&self) -> u8 {
        self.bytes[10]
    }

    /// Subcommand argument `n` (request byte `11 + n`).
    pub fn arg(&self, n: usize) -> u8 {
        self.bytes.get(11 + n).copied().unwrap_or(0)
    }

    pub fn as_bytes(&self) -> &[u8; REQUEST_LEN] {
        &self.bytes
    }
}

impl Default for RequestBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Subcommands the engine answers. Anything else gets a periodic report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SubcommandKind {
    BluetoothPair = 0x01,
    DeviceInfo = 0x02,
    SetMode = 0x03,
    TriggerButtons = 0x04,
    Shipment = 0x08,
    SpiRead = 0x10,
    SetNfcIrConfig = 0x21,
    SetNfcIrState = 0x22,
    SetPlayerLights = 0x30,
    ToggleImu = 0x40,
    ImuSensitivity = 0x41,
    EnableVibration = 0x48,
}

impl SubcommandKind {
    pub const fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0x01 => Self::BluetoothPair,
            0x02 => Self::DeviceInfo,
            0x03 => Self::SetMode,
            0x04 => Self::TriggerButtons,
            0x08 => Self::Shipment,
            0x10 => Self::SpiRead,
            0x21 => Self::SetNfcIrConfig,
            0x22 => Self::SetNfcIrState,
            0x30 => Self::SetPlayerLights,
            0x40 => Self::ToggleImu,
            0x41 => Self::ImuSensitivity,
            0x48 => Self::EnableVibration,
            _ => return None,
        })
    }

    pub const fn id(self) -> u8 {
        self as u8
    }
}

/// Device-level state the console negotiates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceMeta {
    pub vibration_enabled: bool,
    /// Index into [`VIBRATION_PATTERN`].
    pub vibration_cursor: u8,
    pub vibration_byte: u8,
    pub imu_enabled: bool,
    /// 0 until the console assigns a player, then 1..=4.
    pub player_number: u8,
    /// Set once the console has asked for device info.
    pub paired: bool,
    pub tick_counter: u8,
    pub last_tick_ms: Option<u64>,
    /// Last rumble command decoded from the console.
    pub rumble_active: bool,
}

impl DeviceMeta {
    pub const fn new() -> Self {
        Self {
            vibration_enabled: false,
            vibration_cursor: 0,
            vibration_byte: 0,
            imu_enabled: false,
            player_number: 0,
            paired: false,
            tick_counter: 0,
            last_tick_ms: None,
            rumble_active: false,
        }
    }
}

impl Default for DeviceMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a player-lights bitfield to a player number.
///
/// Solid (`0x01`, `0x03`, ...) and flashing (`0x10`, `0x30`, ...) patterns
/// both count; anything else leaves the number unchanged.
pub fn player_from_lights(bitfield: u8) -> Option<u8> {
    match bitfield {
        0x01 | 0x10 => Some(1),
        0x03 | 0x30 => Some(2),
        0x07 | 0x70 => Some(3),
        0x0F | 0xF0 => Some(4),
        _ => None,
    }
}

/// Builds reports from the current request, controller state, and device meta.
pub struct ProtocolEngine {
    request: RequestBuffer,
    meta: DeviceMeta,
    address: [u8; 6],
}

impl ProtocolEngine {
    /// Create an engine that reports `address` as its device address.
    pub const fn new(address: [u8; 6]) -> Self {
        Self {
            request: RequestBuffer::new(),
            meta: DeviceMeta::new(),
            address,
        }
    }

    /// Store a request from the console, replacing any unanswered one.
    pub fn store_request(&mut self, data: &[u8]) {
        self.request.store(data);
    }

    pub fn request(&self) -> &RequestBuffer {
        &self.request
    }

    pub fn meta(&self) -> &DeviceMeta {
        &self.meta
    }

    pub fn address(&self) -> [u8; 6] {
        self.address
    }

    /// Record the decoded rumble state. Returns `true` if it changed.
    pub fn set_rumble(&mut self, active: bool) -> bool {
        let changed = self.meta.rumble_active != active;
        self.meta.rumble_active = active;
        changed
    }

    /// Build the next report and consume the stored request.
    ///
    /// ```
    /// use procon_core::{ControllerState, ProtocolEngine};
    ///
    /// let mut engine = ProtocolEngine::new([0x7C, 0xBB, 0x8A, 1, 2, 3]);
    /// let state = ControllerState::neutral();
    ///
    /// // Nothing to answer: periodic input report.
    /// let report = engine.generate_report(&state, 0);
    /// assert_eq!(report[0], 0xA1);
    /// assert_eq!(report.report_type(), 0x30);
    ///
    /// // Device info request.
    /// let mut request = [0u8; 12];
    /// request[0] = 0x01;
    /// request[10] = 0x02;
    /// engine.store_request(&request);
    /// let report = engine.generate_report(&state, 8);
    /// assert_eq!(report.report_type(), 0x21);
    /// assert_eq!(&report[14..16], &[0x82, 0x02]);
    /// assert!(engine.meta().paired);
    /// ```
    pub fn generate_report(&mut self, state: &ControllerState, now_ms: u64) -> OutgoingReport {
        let mut report = OutgoingReport::new();

        match SubcommandKind::from_id(self.request.subcommand_id()) {
            Some(kind) => {
                trace!("subcommand {:#x}", kind.id());
                self.write_reply_header(&mut report, state, now_ms);
                self.write_reply(kind, &mut report);
            }
            None => self.write_full_input(&mut report, state, now_ms),
        }

        self.request.clear();
        report
    }

    /// Byte 1 = 0x21, advance the vibration pattern, then the standard input fields.
    fn write_reply_header(
        &mut self,
        report: &mut OutgoingReport,
        state: &ControllerState,
        now_ms: u64,
    ) {
        report.set_report_type(REPLY_SUBCOMMAND);
        if self.meta.vibration_enabled {
            self.meta.vibration_cursor = (self.meta.vibration_cursor + 1) % 4;
            self.meta.vibration_byte = VIBRATION_PATTERN[self.meta.vibration_cursor as usize];
        }
        self.write_standard_input(report, state, now_ms);
    }

    fn write_full_input(
        &mut self,
        report: &mut OutgoingReport,
        state: &ControllerState,
        now_ms: u64,
    ) {
        report.set_report_type(REPLY_FULL_INPUT);
        self.write_standard_input(report, state, now_ms);
        if self.meta.imu_enabled {
            report[OFFSET_REPLY..OFFSET_REPLY + IMU_PLACEHOLDER.len()]
                .copy_from_slice(&IMU_PLACEHOLDER);
        }
    }

    fn write_standard_input(
        &mut self,
        report: &mut OutgoingReport,
        state: &ControllerState,
        now_ms: u64,
    ) {
        let tick = self.advance_tick(now_ms);
        report.set_tick(tick);
        report.set_state(state);
        report.set_vibration(self.meta.vibration_byte);
    }

    /// The first call starts the clock at tick 0; later calls add 4 ticks per
    /// elapsed millisecond, wrapping at 256.
    fn advance_tick(&mut self, now_ms: u64) -> u8 {
        match self.meta.last_tick_ms {
            None => {
                self.meta.last_tick_ms = Some(now_ms);
                0
            }
            Some(last) => {
                let elapsed = now_ms.saturating_sub(last);
                let ticks = elapsed.wrapping_mul(4) as u8;
                self.meta.tick_counter = self.meta.tick_counter.wrapping_add(ticks);
                self.meta.last_tick_ms = Some(now_ms);
                self.meta.tick_counter
            }
        }
    }

    fn write_reply(&mut self, kind: SubcommandKind, report: &mut OutgoingReport) {
        match kind {
            SubcommandKind::BluetoothPair => {
                report.set_ack(0x81, kind.id());
                report[OFFSET_REPLY + 2] = 0x03;
            }
            SubcommandKind::DeviceInfo => {
                self.meta.paired = true;
                report.set_ack(0x82, kind.id());
                report[16..18].copy_from_slice(&FIRMWARE_VERSION);
                report[18] = CONTROLLER_TYPE;
                report[19] = 0x02;
                report[20..26].copy_from_slice(&self.address);
                report[26] = 0x01;
                // colours come from SPI
                report[27] = 0x01;
            }
            SubcommandKind::SpiRead => self.write_spi_read(report),
            SubcommandKind::TriggerButtons => report.set_ack(0x83, kind.id()),
            SubcommandKind::ToggleImu => {
                self.meta.imu_enabled = self.request.arg(0) == 0x01;
                debug!("imu enabled: {}", self.meta.imu_enabled);
                report.set_ack(0x80, kind.id());
            }
            SubcommandKind::EnableVibration => {
                report.set_ack(0x80, kind.id());
                self.meta.vibration_enabled = true;
                self.meta.vibration_cursor = 0;
                self.meta.vibration_byte = VIBRATION_PATTERN[0];
            }
            SubcommandKind::SetPlayerLights => {
                report.set_ack(0x80, kind.id());
                if let Some(player) = player_from_lights(self.request.arg(0)) {
                    self.meta.player_number = player;
                }
            }
            SubcommandKind::SetNfcIrConfig => {
                report.set_ack(0xA0, kind.id());
                report[16..16 + NFC_IR_CONFIG.len()].copy_from_slice(&NFC_IR_CONFIG);
                report[REPORT_LEN - 1] = NFC_IR_CONFIG_TRAILER;
            }
            SubcommandKind::Shipment
            | SubcommandKind::SetMode
            | SubcommandKind::ImuSensitivity
            | SubcommandKind::SetNfcIrState => report.set_ack(0x80, kind.id()),
        }
    }

    /// Echo the address and length, then the emulated flash contents at byte 21.
    fn write_spi_read(&self, report: &mut OutgoingReport) {
        let addr_low = self.request.arg(0);
        let addr_high = self.request.arg(1);
        let length = self.request.arg(4);

        report.set_ack(0x90, SubcommandKind::SpiRead.id());
        report[16] = addr_low;
        report[17] = addr_high;
        report[20] = length;

        let data = &mut report[OFFSET_SPI_DATA..];
        match spi_block(addr_high, addr_low) {
            Some(block) => data[..block.len()].copy_from_slice(block),
            None => {
                let len = (length as usize).min(data.len());
                data[..len].fill(ERASED);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use procon_proto::Button;

    const ADDRESS: [u8; 6] = [0x7C, 0xBB, 0x8A, 0x11, 0x22, 0x33];

    fn subcommand(id: u8, args: &[u8]) -> [u8; 16] {
        let mut request = [0u8; 16];
        request[0] = 0x01;
        request[1] = 0x05;
        request[10] = id;
        request[11..11 + args.len()].copy_from_slice(args);
        request
    }

    fn answer(engine: &mut ProtocolEngine, id: u8, args: &[u8]) -> OutgoingReport {
        engine.store_request(&subcommand(id, args));
        engine.generate_report(&ControllerState::neutral(), 0)
    }

    #[test]
    fn test_periodic_report_without_request() {
        let mut engine = ProtocolEngine::new(ADDRESS);
        let mut state = ControllerState::neutral();
        state.press(Button::A);

        let report = engine.generate_report(&state, 100);
        assert_eq!(report[0], REPORT_ENVELOPE);
        assert_eq!(report.report_type(), REPLY_FULL_INPUT);
        assert_eq!(report.tick(), 0);
        assert_eq!(&report[3..13], &state.to_bytes());
        assert_eq!(report.vibration_byte(), 0);
        assert!(report.reply().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_unknown_subcommand_falls_back_to_periodic() {
        let mut engine = ProtocolEngine::new(ADDRESS);
        let report = answer(&mut engine, 0x7F, &[]);
        assert_eq!(report.report_type(), REPLY_FULL_INPUT);
    }

    #[test]
    fn test_request_consumed_after_one_report() {
        let mut engine = ProtocolEngine::new(ADDRESS);
        engine.store_request(&subcommand(0x03, &[0x30]));
        let state = ControllerState::neutral();

        assert_eq!(engine.generate_report(&state, 0).report_type(), REPLY_SUBCOMMAND);
        assert_eq!(engine.request().as_bytes(), &[0u8; REQUEST_LEN]);
        assert_eq!(engine.generate_report(&state, 8).report_type(), REPLY_FULL_INPUT);
    }

    #[test]
    fn test_store_zero_fills_previous_request() {
        let mut buffer = RequestBuffer::new();
        buffer.store(&[0xFF; 20]);
        buffer.store(&[0x01, 0x02]);
        assert_eq!(&buffer.as_bytes()[..3], &[0x01, 0x02, 0x00]);
        assert_eq!(buffer.subcommand_id(), 0);

        buffer.store(&[0xAA; 150]);
        assert_eq!(buffer.as_bytes(), &[0xAA; REQUEST_LEN]);
    }

    #[test]
    fn test_tick_advances_four_per_millisecond() {
        let mut engine = ProtocolEngine::new(ADDRESS);
        let state = ControllerState::neutral();

        assert_eq!(engine.generate_report(&state, 1_000).tick(), 0);
        assert_eq!(engine.generate_report(&state, 1_008).tick(), 32);
        assert_eq!(engine.generate_report(&state, 1_016).tick(), 64);
        // 100 ms = 400 ticks, wraps modulo 256
        assert_eq!(engine.generate_report(&state, 1_116).tick(), (64 + 400 - 256) as u8);
        assert_eq!(engine.meta().last_tick_ms, Some(1_116));
    }

    #[test]
    fn test_pair_and_simple_acks() {
        let mut engine = ProtocolEngine::new(ADDRESS);
        assert_eq!(&answer(&mut engine, 0x01, &[])[14..17], &[0x81, 0x01, 0x03]);
        assert_eq!(&answer(&mut engine, 0x08, &[])[14..16], &[0x80, 0x08]);
        assert_eq!(&answer(&mut engine, 0x03, &[0x30])[14..16], &[0x80, 0x03]);
        assert_eq!(&answer(&mut engine, 0x04, &[])[14..16], &[0x83, 0x04]);
        assert_eq!(&answer(&mut engine, 0x41, &[])[14..16], &[0x80, 0x41]);
        assert_eq!(&answer(&mut engine, 0x22, &[])[14..16], &[0x80, 0x22]);
    }

    #[test]
    fn test_device_info_reply() {
        let mut engine = ProtocolEngine::new(ADDRESS);
        assert!(!engine.meta().paired);

        let report = answer(&mut engine, 0x02, &[]);
        assert_eq!(report.report_type(), REPLY_SUBCOMMAND);
        assert_eq!(&report[14..20], &[0x82, 0x02, 0x03, 0x48, 0x03, 0x02]);
        assert_eq!(&report[20..26], &ADDRESS);
        assert_eq!(&report[26..28], &[0x01, 0x01]);
        assert!(engine.meta().paired);
    }

    #[test]
    fn test_toggle_imu_controls_periodic_samples() {
        let mut engine = ProtocolEngine::new(ADDRESS);
        let state = ControllerState::neutral();

        let report = answer(&mut engine, 0x40, &[0x01]);
        assert_eq!(&report[14..16], &[0x80, 0x40]);
        assert!(engine.meta().imu_enabled);

        let report = engine.generate_report(&state, 8);
        assert_eq!(&report[14..50], &IMU_PLACEHOLDER);

        answer(&mut engine, 0x40, &[0x00]);
        assert!(!engine.meta().imu_enabled);
        let report = engine.generate_report(&state, 16);
        assert!(report.reply().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_vibration_pattern_cycles_on_acks() {
        let mut engine = ProtocolEngine::new(ADDRESS);

        // Reply to the enabling request still carries the old byte.
        let report = answer(&mut engine, 0x48, &[0x01]);
        assert_eq!(&report[14..16], &[0x80, 0x48]);
        assert_eq!(report.vibration_byte(), 0x00);
        assert!(engine.meta().vibration_enabled);
        assert_eq!(engine.meta().vibration_byte, 0x0A);

        let bytes: std::vec::Vec<u8> = (0..5)
            .map(|_| answer(&mut engine, 0x03, &[]).vibration_byte())
            .collect();
        assert_eq!(bytes, [0x0C, 0x0B, 0x09, 0x0A, 0x0C]);

        // Periodic reports repeat the current byte without advancing.
        let report = engine.generate_report(&ControllerState::neutral(), 0);
        assert_eq!(report.vibration_byte(), 0x0C);
        assert_eq!(engine.meta().vibration_cursor, 1);
    }

    #[test]
    fn test_player_lights() {
        let mut engine = ProtocolEngine::new(ADDRESS);
        let cases = [
            (0x01, 1),
            (0x30, 2),
            (0x07, 3),
            (0xF0, 4),
            (0x02, 4), // unrecognised pattern leaves the number alone
            (0x10, 1),
        ];
        for (bitfield, player) in cases {
            let report = answer(&mut engine, 0x30, &[bitfield]);
            assert_eq!(&report[14..16], &[0x80, 0x30]);
            assert_eq!(engine.meta().player_number, player);
        }
    }

    #[test]
    fn test_nfc_ir_config_reply() {
        let mut engine = ProtocolEngine::new(ADDRESS);
        let report = answer(&mut engine, 0x21, &[]);
        assert_eq!(
            &report[14..24],
            &[0xA0, 0x21, 0x01, 0x00, 0xFF, 0x00, 0x08, 0x00, 0x1B, 0x01]
        );
        assert_eq!(report[49], 0xC8);
    }

    fn spi_request(high: u8, low: u8, length: u8) -> [u8; 5] {
        [low, high, 0x00, 0x00, length]
    }

    #[test]
    fn test_spi_read_serial_number() {
        let mut engine = ProtocolEngine::new(ADDRESS);
        let first = answer(&mut engine, 0x10, &spi_request(0x60, 0x00, 0x10));
        let second = answer(&mut engine, 0x10, &spi_request(0x60, 0x00, 0x10));

        assert_eq!(&first[14..21], &[0x90, 0x10, 0x00, 0x60, 0x00, 0x00, 0x10]);
        assert_eq!(&first[21..37], &[0xFF; 16]);
        assert_eq!(&first[37..], &[0x00; 13]);
        assert_eq!(&first[14..], &second[14..]);
    }

    #[test]
    fn test_spi_read_factory_stick_calibration() {
        let mut engine = ProtocolEngine::new(ADDRESS);
        let report = answer(&mut engine, 0x10, &spi_request(0x60, 0x3D, 0x19));

        assert_eq!(&report[14..21], &[0x90, 0x10, 0x3D, 0x60, 0x00, 0x00, 0x19]);
        assert_eq!(
            &report[21..30],
            &[0xD4, 0x75, 0x61, 0xE5, 0x87, 0x7C, 0xEC, 0x55, 0x61]
        );
        assert_eq!(
            &report[30..39],
            &[0x5D, 0xD8, 0x7F, 0x18, 0xE6, 0x61, 0x86, 0x65, 0x5D]
        );
        assert_eq!(report[39], 0xFF);
        assert_eq!(&report[40..43], &[0x32; 3]);
        assert_eq!(&report[43..46], &[0xFF; 3]);
    }

    #[test]
    fn test_spi_read_colours_and_parameters() {
        let mut engine = ProtocolEngine::new(ADDRESS);

        let report = answer(&mut engine, 0x10, &spi_request(0x60, 0x50, 0x0D));
        assert_eq!(&report[21..24], &[0x32; 3]);
        assert_eq!(&report[24..34], &[0xFF; 10]);
        assert_eq!(report[34], 0x00);

        let report = answer(&mut engine, 0x10, &spi_request(0x60, 0x80, 0x18));
        assert_eq!(&report[21..27], &[0x50, 0xFD, 0x00, 0x00, 0xC6, 0x0F]);
        assert_eq!(&report[27..45], &crate::spi::STICK_PARAMETERS);

        let report = answer(&mut engine, 0x10, &spi_request(0x80, 0x10, 0x18));
        assert_eq!(&report[21..24], &[0xFF; 3]);
        assert_eq!(report[24], 0x00);
    }

    #[test]
    fn test_spi_read_unknown_address_is_erased_and_capped() {
        let mut engine = ProtocolEngine::new(ADDRESS);

        let report = answer(&mut engine, 0x10, &spi_request(0x50, 0x00, 0x04));
        assert_eq!(&report[21..25], &[0xFF; 4]);
        assert_eq!(report[25], 0x00);

        let report = answer(&mut engine, 0x10, &spi_request(0x50, 0x00, 0xFF));
        assert_eq!(report[20], 0xFF);
        assert_eq!(&report[21..], &[0xFF; REPORT_LEN - 21]);
    }

    #[test]
    fn test_subcommand_reply_carries_state() {
        let mut engine = ProtocolEngine::new(ADDRESS);
        let mut state = ControllerState::neutral();
        state.press(Button::ZR);
        state.press(Button::DpadDown);

        engine.store_request(&subcommand(0x04, &[]));
        let report = engine.generate_report(&state, 0);
        assert_eq!(&report[3..13], &state.to_bytes());
    }

    #[test]
    fn test_rumble_change_tracking() {
        let mut engine = ProtocolEngine::new(ADDRESS);
        assert!(engine.set_rumble(true));
        assert!(!engine.set_rumble(true));
        assert!(engine.meta().rumble_active);
        assert!(engine.set_rumble(false));
    }
}
