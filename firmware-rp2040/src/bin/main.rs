#![no_std]
#![no_main]

use defmt::{info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_time::{Delay, Duration, Ticker};
use embassy_usb::class::cdc_acm::State as CdcState;
use embassy_usb::class::hid::{HidReader, State as HidState};
use embassy_usb::{Builder, Config as UsbConfig, UsbDevice};
use procon_core::descriptor::{
    device_address, DEVICE_NAME, USB_PRODUCT_ID, USB_REPORT_SIZE, USB_VENDOR_ID,
};
use procon_firmware_rp2040::{
    configure_usb_hid, configure_usb_serial, CommandQueue, ControllerSession, DiagnosticLog,
    EmbassyClock, MacroRunner, ProconRequestHandler, ReportPump, SerialLogWriter,
    SerialMacroReader, SignalRequests, UsbDriver, UsbReportSink, DEFAULT_CONFIG,
};
use rand::RngCore;
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

/// How often queued diagnostics are written to the serial port.
const LOG_FLUSH_INTERVAL: Duration = Duration::from_millis(50);

/// Serial-to-report command queue.
static COMMAND_QUEUE: StaticCell<CommandQueue> = StaticCell::new();

/// One log per writer context: report side and serial side.
static SESSION_LOG: StaticCell<DiagnosticLog> = StaticCell::new();
static SERIAL_LOG: StaticCell<DiagnosticLog> = StaticCell::new();

/// USB device configuration buffer.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// Class states.
static HID_STATE: StaticCell<HidState> = StaticCell::new();
static CDC_STATE: StaticCell<CdcState> = StaticCell::new();

type Pump = ReportPump<'static, UsbReportSink, SignalRequests, EmbassyClock>;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Pro Controller emulator starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());
    let config = DEFAULT_CONFIG;

    let mut random = [0u8; 3];
    RoscRng.fill_bytes(&mut random);
    let address = device_address(random);
    info!("device address {:02x}", address);

    // --- Shared state ---
    let (commands_tx, commands_rx) = COMMAND_QUEUE.init(CommandQueue::new()).split();
    let (session_log, session_log_reader) = SESSION_LOG.init(DiagnosticLog::new()).split();
    let (serial_log, serial_log_reader) = SERIAL_LOG.init(DiagnosticLog::new()).split();

    // --- USB Setup ---
    let usb_driver = Driver::new(p.USB, Irqs);

    let mut usb_config = UsbConfig::new(USB_VENDOR_ID, USB_PRODUCT_ID);
    usb_config.manufacturer = Some("Nintendo Co., Ltd.");
    usb_config.product = Some(DEVICE_NAME);
    usb_config.serial_number = Some("000000000001");
    usb_config.max_power = 500;
    usb_config.max_packet_size_0 = 64;

    // HID + CDC composite
    usb_config.device_class = 0xEF;
    usb_config.device_sub_class = 0x02;
    usb_config.device_protocol = 0x01;
    usb_config.composite_with_iads = true;

    let config_descriptor = CONFIG_DESCRIPTOR.init([0; 256]);
    let bos_descriptor = BOS_DESCRIPTOR.init([0; 256]);
    let msos_descriptor = MSOS_DESCRIPTOR.init([0; 256]);
    let control_buf = CONTROL_BUF.init([0; 64]);

    let mut builder = Builder::new(
        usb_driver,
        usb_config,
        config_descriptor,
        bos_descriptor,
        msos_descriptor,
        control_buf,
    );

    // Configure HID class (console) and CDC-ACM class (macros and logs)
    let (hid_reader, hid_writer) = configure_usb_hid(&mut builder, HID_STATE.init(HidState::new()));
    let (serial_tx, serial_rx) =
        configure_usb_serial(&mut builder, CDC_STATE.init(CdcState::new()));

    // Build the USB device
    let usb_device = builder.build();

    // --- Controller ---
    let session = ControllerSession::new(commands_rx, session_log, &config, address);
    let pump = ReportPump::new(
        session,
        UsbReportSink::new(hid_writer, address),
        SignalRequests,
        EmbassyClock,
    );

    // On-board LED for error indication
    let led = Output::new(p.PIN_25, Level::Low);
    let macros = SerialMacroReader::new(
        serial_rx,
        commands_tx,
        MacroRunner::new(&config),
        serial_log,
        led,
    );
    let logs = SerialLogWriter::new(serial_tx, [session_log_reader, serial_log_reader]);

    // Spawn tasks (unwrap the SpawnToken, then spawn)
    spawner.spawn(usb_task(usb_device).unwrap());
    spawner.spawn(hid_reader_task(hid_reader).unwrap());
    spawner.spawn(report_task(pump).unwrap());
    spawner.spawn(serial_task(macros).unwrap());
    spawner.spawn(log_task(logs).unwrap());

    info!("Pro Controller initialized, waiting for the console...");
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) {
    device.run().await;
}

/// HID reader task - hands console output reports to the report task.
#[embassy_executor::task]
async fn hid_reader_task(reader: HidReader<'static, UsbDriver, USB_REPORT_SIZE>) {
    let mut handler = ProconRequestHandler;
    reader.run(true, &mut handler).await;
}

/// Report task - answers requests and paces input reports.
#[embassy_executor::task]
async fn report_task(mut pump: Pump) {
    // Wait for USB to be ready
    pump.sink_mut().wait_ready().await;
    info!("USB HID ready, waiting for handshake...");

    pump.run(&mut Delay).await;
}

/// Serial task - runs macro lines as they arrive.
#[embassy_executor::task]
async fn serial_task(mut macros: SerialMacroReader) {
    macros.run().await;
}

/// Log task - periodically drains diagnostics to the serial port.
#[embassy_executor::task]
async fn log_task(mut logs: SerialLogWriter<2>) {
    loop {
        logs.wait_connection().await;
        let mut ticker = Ticker::every(LOG_FLUSH_INTERVAL);
        loop {
            ticker.next().await;
            if let Err(e) = logs.drain().await {
                warn!("log output error: {:?}", e);
                break;
            }
        }
    }
}
