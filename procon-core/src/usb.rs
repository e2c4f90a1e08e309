//! Framing for the wired link.
//!
//! Over USB the console speaks the same subcommand protocol, minus the
//! Bluetooth `0xA1` envelope, in fixed 64-byte packets. Before that it runs a
//! short handshake on report ids `0x80`/`0x81`, answered here without
//! involving the protocol engine.

use crate::descriptor::USB_REPORT_SIZE;
use crate::engine::{OutgoingReport, REPLY_FULL_INPUT};

/// Report id of the console's USB handshake requests.
pub const HANDSHAKE_REQUEST_ID: u8 = 0x80;
/// Report id of the controller's handshake replies.
pub const HANDSHAKE_REPLY_ID: u8 = 0x81;

/// One USB packet.
pub type UsbPacket = [u8; USB_REPORT_SIZE];

/// `0x80 <cmd>` handshake commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum UsbHandshake {
    /// Report controller type and address.
    Status = 0x01,
    Handshake = 0x02,
    /// Switch the link to 3 Mbit.
    HighSpeed = 0x03,
    /// Talk USB only: start streaming input reports.
    ForceUsb = 0x04,
    /// Fall back to Bluetooth timeouts: stop streaming.
    AllowTimeout = 0x05,
}

impl UsbHandshake {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0x01 => Some(Self::Status),
            0x02 => Some(Self::Handshake),
            0x03 => Some(Self::HighSpeed),
            0x04 => Some(Self::ForceUsb),
            0x05 => Some(Self::AllowTimeout),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Build the `0x81` reply, if this command gets one.
    ///
    /// ```
    /// use procon_core::UsbHandshake;
    ///
    /// let reply = UsbHandshake::Status.reply(&[1, 2, 3, 4, 5, 6]).unwrap();
    /// assert_eq!(&reply[..10], &[0x81, 0x01, 0x00, 0x03, 6, 5, 4, 3, 2, 1]);
    /// assert!(UsbHandshake::ForceUsb.reply(&[0; 6]).is_none());
    /// ```
    pub fn reply(self, address: &[u8; 6]) -> Option<UsbPacket> {
        let mut packet = [0u8; USB_REPORT_SIZE];
        packet[0] = HANDSHAKE_REPLY_ID;
        packet[1] = self.id();
        match self {
            Self::Status => {
                packet[3] = 0x03;
                for (dst, src) in packet[4..10].iter_mut().zip(address.iter().rev()) {
                    *dst = *src;
                }
            }
            Self::Handshake | Self::HighSpeed => {}
            Self::ForceUsb | Self::AllowTimeout => return None,
        }
        Some(packet)
    }
}

/// Strip the envelope and pad a report to one USB packet.
pub fn usb_frame(report: &OutgoingReport) -> UsbPacket {
    let payload = report.payload();
    let mut packet = [0u8; USB_REPORT_SIZE];
    packet[..payload.len()].copy_from_slice(payload);
    packet
}

/// What the USB link should do with an incoming output report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Incoming {
    /// Answer directly with this packet.
    Reply(UsbPacket),
    /// Handled; nothing to send.
    Handled,
    /// Not a handshake; hand it to the session.
    Forward,
}

/// Handshake and streaming state of the wired link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UsbLink {
    streaming: bool,
}

impl UsbLink {
    pub const fn new() -> Self {
        Self { streaming: false }
    }

    /// Whether periodic input reports are being sent.
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Sort an output report (report id at byte 0).
    pub fn on_output_report(&mut self, data: &[u8], address: &[u8; 6]) -> Incoming {
        if data.first() != Some(&HANDSHAKE_REQUEST_ID) {
            return Incoming::Forward;
        }
        let Some(command) = data.get(1).copied().and_then(UsbHandshake::from_id) else {
            return Incoming::Handled;
        };

        match command {
            UsbHandshake::ForceUsb => self.streaming = true,
            UsbHandshake::AllowTimeout => self.streaming = false,
            _ => {}
        }
        match command.reply(address) {
            Some(packet) => Incoming::Reply(packet),
            None => Incoming::Handled,
        }
    }

    /// Frame a report for sending, or `None` for a periodic input report
    /// while the console has not asked for them yet.
    pub fn frame(&self, report: &OutgoingReport) -> Option<UsbPacket> {
        if !self.streaming && report.report_type() == REPLY_FULL_INPUT {
            return None;
        }
        Some(usb_frame(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ProtocolEngine;
    use crate::state::ControllerState;

    const ADDRESS: [u8; 6] = [0x7C, 0xBB, 0x8A, 0x11, 0x22, 0x33];

    #[test]
    fn test_frame_strips_envelope() {
        let mut engine = ProtocolEngine::new(ADDRESS);
        let report = engine.generate_report(&ControllerState::neutral(), 0);
        let packet = usb_frame(&report);

        assert_eq!(packet[0], 0x30);
        assert_eq!(&packet[..49], &report[1..]);
        assert!(packet[49..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_handshake_sequence() {
        let mut link = UsbLink::new();

        let Incoming::Reply(status) = link.on_output_report(&[0x80, 0x01], &ADDRESS) else {
            panic!("expected status reply");
        };
        assert_eq!(&status[..4], &[0x81, 0x01, 0x00, 0x03]);
        assert_eq!(&status[4..10], &[0x33, 0x22, 0x11, 0x8A, 0xBB, 0x7C]);

        let Incoming::Reply(ack) = link.on_output_report(&[0x80, 0x02], &ADDRESS) else {
            panic!("expected handshake reply");
        };
        assert_eq!(&ack[..3], &[0x81, 0x02, 0x00]);

        assert!(!link.is_streaming());
        assert_eq!(
            link.on_output_report(&[0x80, 0x04], &ADDRESS),
            Incoming::Handled
        );
        assert!(link.is_streaming());

        link.on_output_report(&[0x80, 0x05], &ADDRESS);
        assert!(!link.is_streaming());
    }

    #[test]
    fn test_non_handshake_reports_forwarded() {
        let mut link = UsbLink::new();
        assert_eq!(link.on_output_report(&[0x01, 0x00], &ADDRESS), Incoming::Forward);
        assert_eq!(link.on_output_report(&[], &ADDRESS), Incoming::Forward);
        assert_eq!(link.on_output_report(&[0x80, 0x7F], &ADDRESS), Incoming::Handled);
    }

    #[test]
    fn test_input_reports_held_until_streaming() {
        let mut engine = ProtocolEngine::new(ADDRESS);
        let mut link = UsbLink::new();
        let state = ControllerState::neutral();

        assert!(link.frame(&engine.generate_report(&state, 0)).is_none());

        let mut request = [0u8; 11];
        request[0] = 0x01;
        request[10] = 0x02;
        engine.store_request(&request);
        let reply = link.frame(&engine.generate_report(&state, 8)).unwrap();
        assert_eq!(reply[0], 0x21);

        link.on_output_report(&[0x80, 0x04], &ADDRESS);
        assert!(link.frame(&engine.generate_report(&state, 16)).is_some());
    }
}
