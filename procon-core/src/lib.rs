//! Pro Controller emulation core: protocol engine, command queue, pacing,
//! and diagnostics.
//!
//! This crate holds everything that does not depend on a particular board or
//! HID link. It can be used both in embedded `no_std` environments and on
//! host for testing.
//!
//! # Overview
//!
//! The crate is organized into several modules:
//!
//! - [`state`]: The 10-byte input snapshot ([`ControllerState`])
//! - [`engine`]: Subcommand dispatch and report building ([`ProtocolEngine`])
//! - [`spi`]: Emulated flash contents served by SPI reads
//! - [`queue`]: SPSC command queue with consolidation windows ([`CommandQueue`])
//! - [`rate`]: Report pacing ([`RateController`])
//! - [`diag`]: Lock-free diagnostic log ([`DiagnosticLog`])
//! - [`session`]: Report-side owner of all of the above ([`ControllerSession`])
//! - [`pump`]: Drives a session over a transport ([`ReportPump`])
//! - [`script`]: Runs parsed macro lines ([`MacroRunner`])
//! - [`transport`]: Link traits ([`ReportSink`], [`RequestSource`], [`Clock`])
//! - [`usb`]: Wired-link framing and handshake ([`UsbLink`])
//!
//! # Data flow
//!
//! ```text
//! serial line -> parse_line -> MacroRunner -> CommandSender
//!                                                  |
//!                                            (SPSC ring)
//!                                                  v
//! console request -> ControllerSession <- CommandReceiver
//!                          |
//!                     OutgoingReport -> ReportSink
//! ```
//!
//! # Example
//!
//! ```rust
//! use procon_core::{Button, CommandQueue, ControllerSession, DiagnosticLog, DEFAULT_CONFIG};
//!
//! let mut queue: CommandQueue = CommandQueue::new();
//! let mut log: DiagnosticLog = DiagnosticLog::new();
//! let (mut tx, rx) = queue.split();
//! let (writer, _reader) = log.split();
//! let mut session = ControllerSession::new(rx, writer, &DEFAULT_CONFIG, [0; 6]);
//!
//! tx.start_consolidation(0);
//! tx.press(Button::A).unwrap();
//! tx.press(Button::B).unwrap();
//! tx.end_consolidation();
//!
//! let report = session.on_ready_to_send(0);
//! assert_eq!(report.report_type(), 0x30);
//! assert_eq!(report[4] & 0x0C, 0x0C);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// This must go FIRST so that all the other modules see its macros.
#[macro_use]
mod fmt;

#[macro_use]
pub mod diag;

pub mod config;
pub mod descriptor;
pub mod engine;
pub mod pump;
pub mod queue;
pub mod rate;
pub mod ring;
pub mod rumble;
pub mod script;
pub mod session;
pub mod spi;
pub mod state;
pub mod transport;
pub mod usb;

// Re-export main types at crate root
pub use config::{ControllerConfig, DEFAULT_CONFIG};
pub use diag::{DiagnosticLog, LogOutput, LogReader, LogWriter};
pub use engine::{
    DeviceMeta, OutgoingReport, ProtocolEngine, RequestBuffer, SubcommandKind, REPORT_LEN,
    REQUEST_LEN,
};
pub use pump::ReportPump;
pub use queue::{
    CommandQueue, CommandReceiver, CommandSender, CommitSummary, ConsolidationWindow,
    QueueFull, QueuedCommand, COMMAND_QUEUE_CAPACITY,
};
pub use rate::RateController;
pub use script::{MacroError, MacroRunner};
pub use session::ControllerSession;
pub use state::{ControllerState, STATE_LEN};
pub use transport::{Clock, ReportSink, RequestFrame, RequestSource, TransportError};
pub use usb::{usb_frame, Incoming, UsbHandshake, UsbLink, UsbPacket};

pub use procon_proto::{
    parse_line, Button, HatDirection, LineBuffer, MacroCommand, PackedStick, ParseError, Stick,
};
