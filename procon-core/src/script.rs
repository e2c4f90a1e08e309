//! Executes parsed macro commands against the command queue.

use embedded_hal_async::delay::DelayNs;
use procon_proto::{parse_line, Button, MacroCommand, ParseError};

use crate::config::ControllerConfig;
use crate::queue::{CommandSender, QueueFull};
use crate::transport::Clock;

/// Why a macro line had no (or only partial) effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacroError {
    /// The line did not fit the grammar.
    Parse(ParseError),
    /// The command queue overflowed; part of the line was dropped.
    QueueFull,
}

impl From<ParseError> for MacroError {
    fn from(err: ParseError) -> Self {
        MacroError::Parse(err)
    }
}

impl From<QueueFull> for MacroError {
    fn from(_: QueueFull) -> Self {
        MacroError::QueueFull
    }
}

/// Turns [`MacroCommand`]s into queued state changes.
///
/// Every state-changing command is wrapped in a consolidation window so the
/// report side applies it as one unit. `PRESS` opens two windows, one for the
/// press and one for the release, with the tap delay in between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacroRunner {
    tap_ms: u32,
}

impl MacroRunner {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            tap_ms: config.tap_ms,
        }
    }

    pub fn tap_ms(&self) -> u32 {
        self.tap_ms
    }

    /// Parse and run one serial line. Blank and comment lines do nothing.
    pub async fn run_line<const N: usize>(
        &self,
        line: &[u8],
        tx: &mut CommandSender<'_, N>,
        clock: &impl Clock,
        delay: &mut impl DelayNs,
    ) -> Result<(), MacroError> {
        if let Some(command) = parse_line(line)? {
            self.run(&command, tx, clock, delay).await?;
        }
        Ok(())
    }

    /// Run one command to completion.
    ///
    /// The window is always sealed, even when the queue fills part way
    /// through; the commands that did fit still take effect. The first
    /// [`QueueFull`] is returned.
    pub async fn run<const N: usize>(
        &self,
        command: &MacroCommand,
        tx: &mut CommandSender<'_, N>,
        clock: &impl Clock,
        delay: &mut impl DelayNs,
    ) -> Result<(), QueueFull> {
        match command {
            MacroCommand::Press(buttons) => {
                let pressed = bracket(tx, clock, |tx| each(buttons, |b| tx.press(b)));
                delay.delay_ms(self.tap_ms).await;
                let released = bracket(tx, clock, |tx| each(buttons, |b| tx.release(b)));
                pressed.and(released)
            }
            MacroCommand::Hold(buttons) => {
                bracket(tx, clock, |tx| each(buttons, |b| tx.press(b)))
            }
            MacroCommand::Release(buttons) => {
                bracket(tx, clock, |tx| each(buttons, |b| tx.release(b)))
            }
            MacroCommand::Stick {
                stick,
                horizontal,
                vertical,
            } => bracket(tx, clock, |tx| tx.set_stick(*stick, *horizontal, *vertical)),
            MacroCommand::Sleep { millis } => {
                delay.delay_ms(*millis).await;
                Ok(())
            }
            MacroCommand::CenterSticks => bracket(tx, clock, |tx| tx.center_sticks()),
            MacroCommand::ReleaseAll => bracket(tx, clock, |tx| tx.release_all()),
        }
    }
}

fn bracket<const N: usize>(
    tx: &mut CommandSender<'_, N>,
    clock: &impl Clock,
    body: impl FnOnce(&mut CommandSender<'_, N>) -> Result<(), QueueFull>,
) -> Result<(), QueueFull> {
    tx.start_consolidation(clock.now_ms());
    let result = body(tx);
    tx.end_consolidation();
    result
}

/// Apply `op` to every button, keeping going after a failure.
fn each(
    buttons: &[Button],
    mut op: impl FnMut(Button) -> Result<(), QueueFull>,
) -> Result<(), QueueFull> {
    buttons
        .iter()
        .fold(Ok(()), |result, &button| result.and(op(button)))
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::config::DEFAULT_CONFIG;
    use crate::pump::tests::{block_on, MockClock, MockDelay};
    use crate::queue::{CommandQueue, QueuedCommand};
    use crate::state::ControllerState;
    use procon_proto::{parse_line, PackedStick, Stick};
    use std::vec::Vec;

    fn command(line: &str) -> MacroCommand {
        parse_line(line.as_bytes()).unwrap().unwrap()
    }

    #[test]
    fn test_press_taps_in_two_windows() {
        let mut queue: CommandQueue = CommandQueue::new();
        let (mut tx, mut rx) = queue.split();
        let clock = MockClock::default();
        let mut delay = MockDelay::new(clock.clone());
        let runner = MacroRunner::new(&DEFAULT_CONFIG);

        block_on(runner.run(&command("PRESS A B"), &mut tx, &clock, &mut delay)).unwrap();

        assert_eq!(delay.waits_ms, [100]);
        assert!(!tx.is_consolidating());

        let mut seen = Vec::new();
        rx.commit_with(|c| seen.push(c));
        assert_eq!(
            seen,
            [
                QueuedCommand::Press(Button::A),
                QueuedCommand::Press(Button::B),
                QueuedCommand::Release(Button::A),
                QueuedCommand::Release(Button::B),
            ]
        );
    }

    #[test]
    fn test_hold_and_release() {
        let mut queue: CommandQueue = CommandQueue::new();
        let (mut tx, mut rx) = queue.split();
        let clock = MockClock::default();
        let mut delay = MockDelay::new(clock.clone());
        let runner = MacroRunner::new(&DEFAULT_CONFIG);
        let mut state = ControllerState::neutral();

        block_on(runner.run(&command("HOLD ZL DPAD_UP"), &mut tx, &clock, &mut delay)).unwrap();
        rx.commit(&mut state);
        assert!(state.is_pressed(Button::ZL));
        assert!(state.is_pressed(Button::DpadUp));

        block_on(runner.run(&command("RELEASE ZL"), &mut tx, &clock, &mut delay)).unwrap();
        rx.commit(&mut state);
        assert!(!state.is_pressed(Button::ZL));
        assert!(state.is_pressed(Button::DpadUp));
        assert!(delay.waits_ms.is_empty());
    }

    #[test]
    fn test_stick_center_and_release_all() {
        let mut queue: CommandQueue = CommandQueue::new();
        let (mut tx, mut rx) = queue.split();
        let clock = MockClock::default();
        let mut delay = MockDelay::new(clock.clone());
        let runner = MacroRunner::new(&DEFAULT_CONFIG);
        let mut state = ControllerState::neutral();

        block_on(runner.run(&command("STICK r_stick 1.0 -1.0"), &mut tx, &clock, &mut delay)).unwrap();
        block_on(runner.run(&command("HOLD X"), &mut tx, &clock, &mut delay)).unwrap();
        rx.commit(&mut state);
        assert_eq!(state.stick(Stick::Right).horizontal(), 0xFFF);
        assert_eq!(state.stick(Stick::Right).vertical(), 0x000);

        block_on(runner.run(&MacroCommand::CenterSticks, &mut tx, &clock, &mut delay)).unwrap();
        block_on(runner.run(&MacroCommand::ReleaseAll, &mut tx, &clock, &mut delay)).unwrap();
        rx.commit(&mut state);
        assert_eq!(state.stick(Stick::Right), PackedStick::CENTERED);
        assert_eq!(state, ControllerState::neutral());
    }

    #[test]
    fn test_sleep_waits_without_queueing() {
        let mut queue: CommandQueue = CommandQueue::new();
        let (mut tx, rx) = queue.split();
        let clock = MockClock::default();
        let mut delay = MockDelay::new(clock.clone());
        let runner = MacroRunner::new(&DEFAULT_CONFIG);

        block_on(runner.run(&command("SLEEP 0.25"), &mut tx, &clock, &mut delay)).unwrap();
        assert_eq!(delay.waits_ms, [250]);
        assert_eq!(clock.0.get(), 250);
        assert!(!rx.has_pending());
    }

    #[test]
    fn test_window_stamped_with_clock() {
        let mut queue: CommandQueue = CommandQueue::new();
        let (mut tx, _rx) = queue.split();
        let clock = MockClock::default();
        clock.0.set(1_234);
        let mut delay = MockDelay::new(clock.clone());
        let runner = MacroRunner::new(&DEFAULT_CONFIG);

        block_on(runner.run(&command("PRESS HOME"), &mut tx, &clock, &mut delay)).unwrap();
        // second window opens after the tap delay
        assert_eq!(tx.window().started_at_ms, 1_334);
        assert!(!tx.window().active);
    }

    #[test]
    fn test_full_queue_still_seals() {
        let mut queue: CommandQueue<4> = CommandQueue::new();
        let (mut tx, mut rx) = queue.split();
        let clock = MockClock::default();
        let mut delay = MockDelay::new(clock.clone());
        let runner = MacroRunner::new(&DEFAULT_CONFIG);
        let mut state = ControllerState::neutral();

        let result = block_on(runner.run(
            &command("HOLD A B X Y L R"),
            &mut tx,
            &clock,
            &mut delay,
        ));
        assert_eq!(result, Err(QueueFull));
        assert!(!tx.is_consolidating());

        let summary = rx.commit(&mut state);
        assert_eq!(summary.applied, 4);
        assert_eq!(summary.dropped, 2);
        assert!(state.is_pressed(Button::Y));
        assert!(!state.is_pressed(Button::L));
    }

    #[test]
    fn test_run_line_reports_errors() {
        let mut queue: CommandQueue = CommandQueue::new();
        let (mut tx, mut rx) = queue.split();
        let clock = MockClock::default();
        let mut delay = MockDelay::new(clock.clone());
        let runner = MacroRunner::new(&DEFAULT_CONFIG);
        let mut state = ControllerState::neutral();

        assert_eq!(
            block_on(runner.run_line(b"# idle\r\n", &mut tx, &clock, &mut delay)),
            Ok(())
        );
        assert_eq!(
            block_on(runner.run_line(b"JUMP a", &mut tx, &clock, &mut delay)),
            Err(MacroError::Parse(ParseError::UnknownCommand))
        );
        assert_eq!(
            block_on(runner.run_line(b"hold b\n", &mut tx, &clock, &mut delay)),
            Ok(())
        );
        rx.commit(&mut state);
        assert!(state.is_pressed(Button::B));
    }
}
