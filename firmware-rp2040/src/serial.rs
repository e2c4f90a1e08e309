//! CDC-ACM serial console: macro lines in, diagnostics out.
//!
//! Lines follow the grammar of [`procon_core::parse_line`], one command per
//! line. A `SLEEP` blocks further reading until it has elapsed; USB flow
//! control holds the host back meanwhile.

use defmt::{info, warn};
use embassy_rp::gpio::Output;
use embassy_time::Delay;
use embassy_usb::class::cdc_acm::{CdcAcmClass, Receiver, Sender, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::Builder;
use procon_core::diag::{MAX_MESSAGE_LEN, OVERFLOW_NOTICE};
use procon_core::{diag, CommandSender, LineBuffer, LogReader, LogWriter, MacroError, MacroRunner};

use crate::usb_link::UsbDriver;
use crate::EmbassyClock;

/// Bulk packet size of the serial endpoints.
pub const SERIAL_PACKET_SIZE: usize = 64;

/// Configure the CDC-ACM class in the USB builder.
pub fn configure_usb_serial(
    builder: &mut Builder<'static, UsbDriver>,
    state: &'static mut State<'static>,
) -> (Sender<'static, UsbDriver>, Receiver<'static, UsbDriver>) {
    CdcAcmClass::new(builder, state, SERIAL_PACKET_SIZE as u16).split()
}

/// Reads macro lines from the serial port and runs them.
pub struct SerialMacroReader {
    rx: Receiver<'static, UsbDriver>,
    commands: CommandSender<'static>,
    runner: MacroRunner,
    log: LogWriter<'static>,
    led: Output<'static>,
}

impl SerialMacroReader {
    pub fn new(
        rx: Receiver<'static, UsbDriver>,
        commands: CommandSender<'static>,
        runner: MacroRunner,
        log: LogWriter<'static>,
        led: Output<'static>,
    ) -> Self {
        Self {
            rx,
            commands,
            runner,
            log,
            led,
        }
    }

    /// Serve terminal sessions forever.
    pub async fn run(&mut self) -> ! {
        loop {
            self.rx.wait_connection().await;
            info!("serial connected");
            let _ = self.read_lines().await;
            info!("serial disconnected");
        }
    }

    /// Read and run lines until the host goes away.
    async fn read_lines(&mut self) -> Result<(), EndpointError> {
        let mut lines = LineBuffer::new();
        let mut packet = [0u8; SERIAL_PACKET_SIZE];
        let mut delay = Delay;

        loop {
            let len = self.rx.read_packet(&mut packet).await?;
            for &byte in &packet[..len] {
                let Some(line) = lines.push(byte) else {
                    continue;
                };
                let result = match line {
                    Ok(line) => {
                        self.runner
                            .run_line(line, &mut self.commands, &EmbassyClock, &mut delay)
                            .await
                    }
                    Err(e) => Err(MacroError::from(e)),
                };
                if let Err(e) = result {
                    warn!("macro line rejected: {:?}", e);
                    diag!(self.log, "error: {:?}", e);
                    // Toggle LED to indicate error
                    self.led.toggle();
                }
            }
        }
    }
}

/// Drains diagnostic logs to the serial port.
pub struct SerialLogWriter<const L: usize> {
    tx: Sender<'static, UsbDriver>,
    logs: [LogReader<'static>; L],
}

impl<const L: usize> SerialLogWriter<L> {
    pub fn new(tx: Sender<'static, UsbDriver>, logs: [LogReader<'static>; L]) -> Self {
        Self { tx, logs }
    }

    pub async fn wait_connection(&mut self) {
        self.tx.wait_connection().await;
    }

    /// Write every queued message. Stops at the first endpoint error; a
    /// message lost that way is reported by the next overflow notice.
    pub async fn drain(&mut self) -> Result<(), EndpointError> {
        let mut buf = [0u8; MAX_MESSAGE_LEN];
        for log in self.logs.iter_mut() {
            let lost = log.take_overflowed();
            while let Some(len) = log.next_message(&mut buf) {
                if let Err(e) = write_message(&mut self.tx, &buf[..len]).await {
                    // the frame already left the ring
                    log.mark_overflowed();
                    return Err(e);
                }
            }
            if lost {
                if let Err(e) = write_message(&mut self.tx, OVERFLOW_NOTICE).await {
                    log.mark_overflowed();
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

/// Write one message, split into packets. A message ending on a packet
/// boundary is closed with a zero-length packet.
async fn write_message(
    tx: &mut Sender<'static, UsbDriver>,
    message: &[u8],
) -> Result<(), EndpointError> {
    for chunk in message.chunks(SERIAL_PACKET_SIZE) {
        tx.write_packet(chunk).await?;
    }
    if message.len() % SERIAL_PACKET_SIZE == 0 {
        tx.write_packet(&[]).await?;
    }
    Ok(())
}
