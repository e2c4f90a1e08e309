//! Lock-free diagnostic log.
//!
//! Messages are written into a byte ring as `text '\n' '\0'` frames and
//! drained later by whoever owns the serial port. Writing never blocks: a
//! frame that does not fit is dropped whole and the `overflowed` flag is
//! raised until the reader next takes a message.

use core::fmt::{self, Write};

use portable_atomic::{AtomicBool, Ordering};

use crate::ring::{Consumer, Producer, SpscRing};

/// Default ring size in bytes.
pub const LOG_BUFFER_SIZE: usize = 2048;
/// Largest frame, including the newline and terminator.
pub const MAX_MESSAGE_LEN: usize = 128;
/// Longest message text kept; longer text is truncated.
pub const MAX_TEXT_LEN: usize = MAX_MESSAGE_LEN - 2;

const TERMINATOR: u8 = b'\0';

/// Line emitted by [`LogReader::flush`] after messages were lost.
pub const OVERFLOW_NOTICE: &[u8] = b"[log overflow: messages dropped]\n";

/// Destination for drained log messages.
pub trait LogOutput {
    /// Emit one message, newline included.
    fn write_message(&mut self, message: &[u8]);
}

/// Byte ring plus the shared overflow flag.
pub struct DiagnosticLog<const N: usize = LOG_BUFFER_SIZE> {
    ring: SpscRing<u8, N>,
    overflowed: AtomicBool,
}

impl<const N: usize> DiagnosticLog<N> {
    pub const fn new() -> Self {
        Self {
            ring: SpscRing::new(0),
            overflowed: AtomicBool::new(false),
        }
    }

    /// Split into the writing and draining halves.
    pub fn split(&mut self) -> (LogWriter<'_, N>, LogReader<'_, N>) {
        let (tx, rx) = self.ring.split();
        let overflowed = &self.overflowed;
        (LogWriter { tx, overflowed }, LogReader { rx, overflowed })
    }
}

impl<const N: usize> Default for DiagnosticLog<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Writing half.
pub struct LogWriter<'a, const N: usize = LOG_BUFFER_SIZE> {
    tx: Producer<'a, u8, N>,
    overflowed: &'a AtomicBool,
}

impl<const N: usize> LogWriter<'_, N> {
    /// Queue a message. Returns `false` if it was dropped.
    pub fn log(&mut self, message: &str) -> bool {
        let mut frame = FrameBuf::new();
        // FrameBuf never fails
        let _ = frame.write_str(message);
        self.push(frame)
    }

    /// Format and queue a message. Returns `false` if it was dropped.
    ///
    /// ```
    /// use procon_core::diag::DiagnosticLog;
    ///
    /// let mut log: DiagnosticLog<256> = DiagnosticLog::new();
    /// let (mut writer, mut reader) = log.split();
    /// writer.log_fmt(format_args!("player {}", 2));
    ///
    /// let mut buf = [0u8; 128];
    /// let len = reader.next_message(&mut buf).unwrap();
    /// assert_eq!(&buf[..len], b"player 2\n");
    /// ```
    pub fn log_fmt(&mut self, args: fmt::Arguments<'_>) -> bool {
        let mut frame = FrameBuf::new();
        let _ = frame.write_fmt(args);
        self.push(frame)
    }

    /// Whether a message has been dropped since the reader last took one.
    pub fn overflowed(&self) -> bool {
        self.overflowed.load(Ordering::Relaxed)
    }

    fn push(&mut self, mut frame: FrameBuf) -> bool {
        let text_len = frame.len;
        frame.bytes[text_len] = b'\n';
        frame.bytes[text_len + 1] = TERMINATOR;

        if self.tx.enqueue_all(&frame.bytes[..text_len + 2]).is_ok() {
            true
        } else {
            self.overflowed.store(true, Ordering::Relaxed);
            false
        }
    }
}

/// Draining half.
pub struct LogReader<'a, const N: usize = LOG_BUFFER_SIZE> {
    rx: Consumer<'a, u8, N>,
    overflowed: &'a AtomicBool,
}

impl<const N: usize> LogReader<'_, N> {
    /// Copy the next message (newline included, terminator excluded) into
    /// `out` and return its length.
    pub fn next_message(&mut self, out: &mut [u8; MAX_MESSAGE_LEN]) -> Option<usize> {
        if self.rx.is_empty() {
            return None;
        }

        let mut len = 0;
        while let Some(byte) = self.rx.dequeue() {
            if byte == TERMINATOR {
                break;
            }
            if len < out.len() {
                out[len] = byte;
                len += 1;
            }
        }

        self.overflowed.store(false, Ordering::Relaxed);
        Some(len)
    }

    /// Emit every queued message to `output`. Returns how many were written.
    ///
    /// If messages were dropped before this call, [`OVERFLOW_NOTICE`] is
    /// emitted after the surviving ones.
    pub fn flush(&mut self, output: &mut impl LogOutput) -> usize {
        let lost = self.overflowed.load(Ordering::Relaxed);
        let mut buf = [0u8; MAX_MESSAGE_LEN];
        let mut count = 0;
        while let Some(len) = self.next_message(&mut buf) {
            output.write_message(&buf[..len]);
            count += 1;
        }
        if lost {
            self.overflowed.store(false, Ordering::Relaxed);
            output.write_message(OVERFLOW_NOTICE);
        }
        count
    }

    /// Whether messages were dropped since the last successful read.
    pub fn overflowed(&self) -> bool {
        self.overflowed.load(Ordering::Relaxed)
    }

    /// Read and clear the overflow flag.
    pub fn take_overflowed(&mut self) -> bool {
        self.overflowed.swap(false, Ordering::Relaxed)
    }

    /// Report a message as lost after it was taken from the ring, e.g. when
    /// the output failed to write it.
    pub fn mark_overflowed(&mut self) {
        self.overflowed.store(true, Ordering::Relaxed);
    }

    /// Whether anything is queued or a drop is unreported.
    pub fn has_pending(&self) -> bool {
        !self.rx.is_empty() || self.overflowed.load(Ordering::Relaxed)
    }
}

/// Fixed frame with room for the newline and terminator after the text.
struct FrameBuf {
    bytes: [u8; MAX_MESSAGE_LEN],
    len: usize,
    truncated: bool,
}

impl FrameBuf {
    const fn new() -> Self {
        Self {
            bytes: [0; MAX_MESSAGE_LEN],
            len: 0,
            truncated: false,
        }
    }
}

impl Write for FrameBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.truncated {
            return Ok(());
        }

        let room = MAX_TEXT_LEN - self.len;
        let mut take = s.len();
        if take > room {
            // cut on a char boundary so the frame stays valid UTF-8
            take = room;
            while !s.is_char_boundary(take) {
                take -= 1;
            }
            self.truncated = true;
        }

        for &byte in &s.as_bytes()[..take] {
            // an embedded terminator would split the frame
            self.bytes[self.len] = if byte == TERMINATOR { b'?' } else { byte };
            self.len += 1;
        }
        Ok(())
    }
}

/// Format into a [`LogWriter`].
///
/// ```
/// use procon_core::{diag, diag::DiagnosticLog};
///
/// let mut log: DiagnosticLog = DiagnosticLog::new();
/// let (mut writer, _reader) = log.split();
/// assert!(diag!(writer, "dropped {} commands", 3));
/// ```
#[macro_export]
macro_rules! diag {
    ($writer:expr, $($arg:tt)*) => {
        $writer.log_fmt(::core::format_args!($($arg)*))
    };
}
