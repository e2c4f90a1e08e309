//! Command queue with frame consolidation.
//!
//! Serial-driven mutations never touch [`ControllerState`] directly. The
//! [`CommandSender`] enqueues them; the [`CommandReceiver`], running on the
//! report side, applies them in FIFO order.
//!
//! Commands only become visible to the receiver once *sealed*. Outside a
//! consolidation window every enqueue seals itself, so single commands take
//! effect on the next report. Inside a window nothing is sealed until
//! [`CommandSender::end_consolidation`], so the whole batch lands in one
//! commit and the console never sees a half-applied frame.

use portable_atomic::{AtomicUsize, Ordering};
use procon_proto::{Button, PackedStick, Stick};

use crate::ring::{Consumer, Producer, SpscRing};
use crate::state::ControllerState;

/// Default number of pending commands.
pub const COMMAND_QUEUE_CAPACITY: usize = 32;

/// One pending state mutation. Stick positions are already fixed point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueuedCommand {
    Press(Button),
    Release(Button),
    SetStick { stick: Stick, position: PackedStick },
    ReleaseAll,
    CenterSticks,
}

impl QueuedCommand {
    /// Apply this command to `state`.
    pub fn apply(self, state: &mut ControllerState) {
        match self {
            QueuedCommand::Press(button) => state.press(button),
            QueuedCommand::Release(button) => state.release(button),
            QueuedCommand::SetStick { stick, position } => state.set_stick(stick, position),
            QueuedCommand::ReleaseAll => state.release_all(),
            QueuedCommand::CenterSticks => state.center_sticks(),
        }
    }
}

/// The queue was full; the command was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueFull;

/// An open or closed consolidation bracket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConsolidationWindow {
    pub active: bool,
    pub started_at_ms: u64,
}

/// Result of one commit pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommitSummary {
    /// Commands applied in this pass.
    pub applied: usize,
    /// Commands dropped on overflow since the previous pass.
    pub dropped: usize,
}

/// Bounded command queue shared by the serial side and the report side.
pub struct CommandQueue<const N: usize = COMMAND_QUEUE_CAPACITY> {
    ring: SpscRing<QueuedCommand, N>,
    /// Producer position at the last seal.
    sealed: AtomicUsize,
    /// Total commands dropped on overflow.
    dropped: AtomicUsize,
}

impl<const N: usize> CommandQueue<N> {
    pub const fn new() -> Self {
        Self {
            ring: SpscRing::new(QueuedCommand::ReleaseAll),
            sealed: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Split into the sending and receiving halves.
    ///
    /// ```
    /// use procon_core::{Button, CommandQueue, ControllerState};
    ///
    /// let mut queue: CommandQueue = CommandQueue::new();
    /// let (mut tx, mut rx) = queue.split();
    /// let mut state = ControllerState::neutral();
    ///
    /// tx.start_consolidation(0);
    /// tx.press(Button::A).unwrap();
    /// tx.press(Button::B).unwrap();
    /// assert_eq!(rx.commit(&mut state).applied, 0);
    ///
    /// tx.end_consolidation();
    /// assert_eq!(rx.commit(&mut state).applied, 2);
    /// assert!(state.is_pressed(Button::A) && state.is_pressed(Button::B));
    /// ```
    pub fn split(&mut self) -> (CommandSender<'_, N>, CommandReceiver<'_, N>) {
        let (tx, rx) = self.ring.split();
        let sealed = &self.sealed;
        let dropped = &self.dropped;
        (
            CommandSender {
                tx,
                sealed,
                dropped,
                window: ConsolidationWindow::default(),
            },
            CommandReceiver {
                rx,
                sealed,
                dropped,
                reported_dropped: 0,
            },
        )
    }
}

impl<const N: usize> Default for CommandQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer half: resolves commands and enqueues them.
pub struct CommandSender<'a, const N: usize = COMMAND_QUEUE_CAPACITY> {
    tx: Producer<'a, QueuedCommand, N>,
    sealed: &'a AtomicUsize,
    dropped: &'a AtomicUsize,
    window: ConsolidationWindow,
}

impl<const N: usize> CommandSender<'_, N> {
    pub fn press(&mut self, button: Button) -> Result<(), QueueFull> {
        self.enqueue(QueuedCommand::Press(button))
    }

    pub fn release(&mut self, button: Button) -> Result<(), QueueFull> {
        self.enqueue(QueuedCommand::Release(button))
    }

    /// Move a stick to normalized `[-1.0, 1.0]` axes.
    pub fn set_stick(
        &mut self,
        stick: Stick,
        horizontal: f32,
        vertical: f32,
    ) -> Result<(), QueueFull> {
        self.enqueue(QueuedCommand::SetStick {
            stick,
            position: PackedStick::from_normalized(horizontal, vertical),
        })
    }

    pub fn release_all(&mut self) -> Result<(), QueueFull> {
        self.enqueue(QueuedCommand::ReleaseAll)
    }

    pub fn center_sticks(&mut self) -> Result<(), QueueFull> {
        self.enqueue(QueuedCommand::CenterSticks)
    }

    /// Enqueue a command. On overflow the command is dropped and counted.
    pub fn enqueue(&mut self, command: QueuedCommand) -> Result<(), QueueFull> {
        match self.tx.enqueue(command) {
            Ok(()) => {
                if !self.window.active {
                    self.seal();
                }
                Ok(())
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("command queue full, dropped {}", command);
                Err(QueueFull)
            }
        }
    }

    /// Open a consolidation window. Opening an already open window keeps
    /// the original start time.
    pub fn start_consolidation(&mut self, now_ms: u64) {
        if !self.window.active {
            self.window = ConsolidationWindow {
                active: true,
                started_at_ms: now_ms,
            };
        }
    }

    /// Close the window and publish everything queued since it opened.
    pub fn end_consolidation(&mut self) {
        self.window.active = false;
        self.seal();
    }

    pub fn is_consolidating(&self) -> bool {
        self.window.active
    }

    pub fn window(&self) -> ConsolidationWindow {
        self.window
    }

    /// Slots currently free.
    pub fn free_space(&self) -> usize {
        self.tx.free_space()
    }

    fn seal(&self) {
        self.sealed.store(self.tx.position(), Ordering::Release);
    }
}

/// Consumer half: applies sealed commands to the controller state.
pub struct CommandReceiver<'a, const N: usize = COMMAND_QUEUE_CAPACITY> {
    rx: Consumer<'a, QueuedCommand, N>,
    sealed: &'a AtomicUsize,
    dropped: &'a AtomicUsize,
    reported_dropped: usize,
}

impl<const N: usize> CommandReceiver<'_, N> {
    /// Apply every sealed command to `state` in FIFO order.
    pub fn commit(&mut self, state: &mut ControllerState) -> CommitSummary {
        self.commit_with(|command| command.apply(state))
    }

    /// Hand every sealed command to `apply` in FIFO order.
    pub fn commit_with(&mut self, mut apply: impl FnMut(QueuedCommand)) -> CommitSummary {
        let sealed = self.sealed.load(Ordering::Acquire);
        let mut applied = 0;
        while self.rx.position() != sealed {
            match self.rx.dequeue() {
                Some(command) => {
                    apply(command);
                    applied += 1;
                }
                None => break,
            }
        }

        let total_dropped = self.dropped.load(Ordering::Relaxed);
        let dropped = total_dropped.wrapping_sub(self.reported_dropped);
        self.reported_dropped = total_dropped;

        CommitSummary { applied, dropped }
    }

    /// Whether a sealed batch is waiting.
    pub fn has_pending(&self) -> bool {
        self.rx.position() != self.sealed.load(Ordering::Acquire)
    }

    /// Commands queued, sealed or not.
    pub fn queued(&self) -> usize {
        self.rx.len()
    }
}
