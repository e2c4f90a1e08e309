//! USB HID link to the console.

use defmt::{debug, info, trace};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_usb::class::hid::{
    self, HidBootProtocol, HidReader, HidReaderWriter, HidSubclass, HidWriter, ReportId,
    RequestHandler, State,
};
use embassy_usb::control::OutResponse;
use embassy_usb::driver::EndpointError;
use embassy_usb::Builder;
use procon_core::descriptor::{USB_REPORT_DESCRIPTOR, USB_REPORT_SIZE};
use procon_core::usb::HANDSHAKE_REQUEST_ID;
use procon_core::{
    Incoming, OutgoingReport, ReportSink, RequestFrame, RequestSource, TransportError, UsbLink,
};

pub type UsbDriver = Driver<'static, USB>;

/// Latest console request not yet answered (subcommands, rumble).
static REQUEST_SIGNAL: Signal<CriticalSectionRawMutex, RequestFrame> = Signal::new();

/// Latest USB handshake request (report id `0x80`).
static HANDSHAKE_SIGNAL: Signal<CriticalSectionRawMutex, RequestFrame> = Signal::new();

/// Convert endpoint errors to [`TransportError`].
///
/// This is a helper function instead of a `From` impl to avoid orphan rule issues
/// (both `EndpointError` and `TransportError` are defined in external crates).
#[inline]
fn endpoint_error_to_transport_error(e: EndpointError) -> TransportError {
    match e {
        EndpointError::Disabled => TransportError::Disconnected,
        EndpointError::BufferOverflow => TransportError::Io,
    }
}

/// HID request handler for console output reports.
///
/// Runs in the HID reader task. Handshake requests and everything else go to
/// separate signals so a subcommand never displaces a pending handshake.
pub struct ProconRequestHandler;

impl RequestHandler for ProconRequestHandler {
    fn get_report(&mut self, id: ReportId, _buf: &mut [u8]) -> Option<usize> {
        debug!("get report for {:?}", id);
        None
    }

    fn set_report(&mut self, id: ReportId, data: &[u8]) -> OutResponse {
        trace!("set report for {:?}: {=[u8]:x}", id, data);

        let frame = RequestFrame::new(data);
        match frame.report_id() {
            Some(HANDSHAKE_REQUEST_ID) => HANDSHAKE_SIGNAL.signal(frame),
            Some(_) => REQUEST_SIGNAL.signal(frame),
            None => {}
        }

        OutResponse::Accepted
    }

    fn set_idle_ms(&mut self, _id: Option<ReportId>, _duration_ms: u32) {}

    fn get_idle_ms(&mut self, _id: Option<ReportId>) -> Option<u32> {
        None
    }
}

/// Console requests as a [`RequestSource`].
pub struct SignalRequests;

impl RequestSource for SignalRequests {
    fn try_take(&mut self) -> Option<RequestFrame> {
        REQUEST_SIGNAL.try_take()
    }
}

/// Report sink writing 64-byte packets to the HID IN endpoint.
///
/// Also answers pending USB handshake requests before each report, and holds
/// periodic input reports back until the console asks for them.
pub struct UsbReportSink {
    writer: HidWriter<'static, UsbDriver, USB_REPORT_SIZE>,
    link: UsbLink,
    address: [u8; 6],
    ready: bool,
}

impl UsbReportSink {
    pub fn new(writer: HidWriter<'static, UsbDriver, USB_REPORT_SIZE>, address: [u8; 6]) -> Self {
        Self {
            writer,
            link: UsbLink::new(),
            address,
            ready: false,
        }
    }

    /// Wait until the device is ready (USB enumerated).
    pub async fn wait_ready(&mut self) {
        self.writer.ready().await;
        self.ready = true;
    }

    pub fn is_streaming(&self) -> bool {
        self.link.is_streaming()
    }

    async fn answer_handshake(&mut self) -> Result<(), TransportError> {
        let Some(frame) = HANDSHAKE_SIGNAL.try_take() else {
            return Ok(());
        };

        let was_streaming = self.link.is_streaming();
        let result = match self.link.on_output_report(frame.as_bytes(), &self.address) {
            Incoming::Reply(packet) => self.write(&packet).await,
            Incoming::Handled | Incoming::Forward => Ok(()),
        };
        if self.link.is_streaming() != was_streaming {
            info!("input reports {}", if self.link.is_streaming() { "on" } else { "off" });
        }
        result
    }

    async fn write(&mut self, packet: &[u8]) -> Result<(), TransportError> {
        let result = self
            .writer
            .write(packet)
            .await
            .map_err(endpoint_error_to_transport_error);
        if result == Err(TransportError::Disconnected) {
            // a fresh enumeration starts a fresh handshake
            self.ready = false;
            self.link = UsbLink::new();
        }
        result
    }
}

impl ReportSink for UsbReportSink {
    async fn send(&mut self, report: &OutgoingReport) -> Result<(), TransportError> {
        if !self.ready {
            self.wait_ready().await;
        }
        self.answer_handshake().await?;

        match self.link.frame(report) {
            Some(packet) => self.write(&packet).await,
            None => Ok(()),
        }
    }
}

/// Configure the USB HID class in the USB builder.
///
/// Returns the reader for console output reports and the writer for input
/// reports.
pub fn configure_usb_hid(
    builder: &mut Builder<'static, UsbDriver>,
    state: &'static mut State<'static>,
) -> (
    HidReader<'static, UsbDriver, USB_REPORT_SIZE>,
    HidWriter<'static, UsbDriver, USB_REPORT_SIZE>,
) {
    let config = hid::Config {
        report_descriptor: USB_REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: 8,
        max_packet_size: USB_REPORT_SIZE as u16,
        hid_subclass: HidSubclass::No,
        hid_boot_protocol: HidBootProtocol::None,
    };

    HidReaderWriter::<_, USB_REPORT_SIZE, USB_REPORT_SIZE>::new(builder, state, config).split()
}
