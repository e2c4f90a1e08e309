//! Serial macro grammar parser.
//!
//! One command per line, keywords case-insensitive:
//!
//! ```text
//! PRESS <btn>...          tap: press together, hold, release together
//! HOLD <btn>...           press and keep held
//! RELEASE <btn>...        release
//! STICK <stick> <h> <v>   h/v in [-1.0, 1.0]
//! SLEEP <seconds>
//! CENTER_STICKS
//! RELEASE_ALL
//! # comment
//! ```
//!
//! Unknown button and stick names are skipped without error. Anything else
//! that does not fit the grammar is a [`ParseError`].

use crate::types::{Button, Stick};
use heapless::Vec;

/// Maximum line length accepted from the serial link (excluding newline).
pub const MAX_LINE_LENGTH: usize = 128;

/// Maximum number of buttons a single PRESS/HOLD/RELEASE line may name.
pub const MAX_BUTTONS_PER_LINE: usize = 8;

/// Buttons named on one line, in the order they appeared.
pub type ButtonList = Vec<Button, MAX_BUTTONS_PER_LINE>;

/// Error type for macro line parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Keyword not part of the grammar.
    UnknownCommand,
    /// A required argument is absent.
    MissingArgument,
    /// A numeric argument did not parse or is out of range.
    InvalidNumber,
    /// More than [`MAX_BUTTONS_PER_LINE`] button names on one line.
    TooManyButtons,
    /// Line is not valid UTF-8 where a number was expected.
    InvalidUtf8,
    /// Line exceeded [`MAX_LINE_LENGTH`].
    LineTooLong,
}

/// One parsed macro line.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroCommand {
    /// Press the buttons together, hold for the tap duration, release together.
    Press(ButtonList),
    /// Press the buttons together and leave them held.
    Hold(ButtonList),
    /// Release the buttons together.
    Release(ButtonList),
    /// Move a stick to a normalized position.
    Stick {
        stick: Stick,
        horizontal: f32,
        vertical: f32,
    },
    /// Wait before processing the next line.
    Sleep { millis: u32 },
    /// Return both sticks to center.
    CenterSticks,
    /// Release every button and center the hat.
    ReleaseAll,
}

/// Parse a single line.
///
/// Returns `Ok(None)` for blank lines, comments, and lines that resolve to
/// nothing (e.g. `STICK` with an unknown stick name).
///
/// ```
/// use procon_proto::{parse_line, Button, MacroCommand};
///
/// let cmd = parse_line(b"press a b\r\n").unwrap().unwrap();
/// match cmd {
///     MacroCommand::Press(buttons) => assert_eq!(&buttons[..], &[Button::A, Button::B]),
///     _ => unreachable!(),
/// }
/// assert_eq!(parse_line(b"# warm up").unwrap(), None);
/// ```
pub fn parse_line(line: &[u8]) -> Result<Option<MacroCommand>, ParseError> {
    let line = strip_line_ending(line);
    if line.len() > MAX_LINE_LENGTH {
        return Err(ParseError::LineTooLong);
    }

    let line = trim_leading_whitespace(line);
    if line.is_empty() || line[0] == b'#' {
        return Ok(None);
    }

    let mut tokens = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty());

    let keyword = tokens.next().ok_or(ParseError::MissingArgument)?;

    let command = if keyword.eq_ignore_ascii_case(b"PRESS") {
        MacroCommand::Press(parse_buttons(tokens)?)
    } else if keyword.eq_ignore_ascii_case(b"HOLD") {
        MacroCommand::Hold(parse_buttons(tokens)?)
    } else if keyword.eq_ignore_ascii_case(b"RELEASE") {
        MacroCommand::Release(parse_buttons(tokens)?)
    } else if keyword.eq_ignore_ascii_case(b"STICK") {
        let name = tokens.next().ok_or(ParseError::MissingArgument)?;
        let horizontal = parse_f32(tokens.next().ok_or(ParseError::MissingArgument)?)?;
        let vertical = parse_f32(tokens.next().ok_or(ParseError::MissingArgument)?)?;
        match Stick::from_name(name) {
            Some(stick) => MacroCommand::Stick {
                stick,
                horizontal,
                vertical,
            },
            None => return Ok(None),
        }
    } else if keyword.eq_ignore_ascii_case(b"SLEEP") {
        let seconds = parse_f32(tokens.next().ok_or(ParseError::MissingArgument)?)?;
        MacroCommand::Sleep {
            millis: seconds_to_millis(seconds)?,
        }
    } else if keyword.eq_ignore_ascii_case(b"CENTER_STICKS") {
        MacroCommand::CenterSticks
    } else if keyword.eq_ignore_ascii_case(b"RELEASE_ALL") {
        MacroCommand::ReleaseAll
    } else {
        return Err(ParseError::UnknownCommand);
    };

    Ok(Some(command))
}

/// Collect button names, skipping unknown ones. At least one token is required.
fn parse_buttons<'a>(tokens: impl Iterator<Item = &'a [u8]>) -> Result<ButtonList, ParseError> {
    let mut buttons = ButtonList::new();
    let mut seen_token = false;

    for token in tokens {
        seen_token = true;
        if let Some(button) = Button::from_name(token) {
            buttons
                .push(button)
                .map_err(|_| ParseError::TooManyButtons)?;
        }
    }

    if !seen_token {
        return Err(ParseError::MissingArgument);
    }
    Ok(buttons)
}

/// Parse a decimal float token.
#[inline]
fn parse_f32(token: &[u8]) -> Result<f32, ParseError> {
    let text = core::str::from_utf8(token).map_err(|_| ParseError::InvalidUtf8)?;
    let value: f32 = text.parse().map_err(|_| ParseError::InvalidNumber)?;
    if value.is_nan() {
        return Err(ParseError::InvalidNumber);
    }
    Ok(value)
}

/// Convert a SLEEP duration to whole milliseconds.
#[inline]
fn seconds_to_millis(seconds: f32) -> Result<u32, ParseError> {
    if !(0.0..=(u32::MAX / 1000) as f32).contains(&seconds) {
        return Err(ParseError::InvalidNumber);
    }
    Ok((seconds * 1000.0) as u32)
}

/// Strip trailing CR and/or LF from a line.
#[inline]
fn strip_line_ending(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    if end > 0 && line[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && line[end - 1] == b'\r' {
        end -= 1;
    }
    &line[..end]
}

/// Trim leading ASCII whitespace.
#[inline]
fn trim_leading_whitespace(s: &[u8]) -> &[u8] {
    let start = s
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(s.len());
    &s[start..]
}

/// Room for one line plus a trailing `\r`.
const LINE_CAPACITY: usize = MAX_LINE_LENGTH + 1;

/// Assembles newline-terminated lines from a byte stream.
///
/// If a line outgrows the buffer, the rest of it is discarded up to the next
/// newline and reported as [`ParseError::LineTooLong`], so one bad line never
/// corrupts the following ones.
///
/// ```
/// use procon_proto::{LineBuffer, ParseError};
///
/// let mut lines = LineBuffer::new();
/// let mut done = None;
/// for &b in b"HOLD a\n" {
///     if let Some(line) = lines.push(b) {
///         done = Some(line.map(|l| l.len()));
///     }
/// }
/// assert_eq!(done, Some(Ok::<usize, ParseError>(6)));
/// ```
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8, LINE_CAPACITY>,
    complete: bool,
    overflowed: bool,
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            complete: false,
            overflowed: false,
        }
    }

    /// Feed one byte. Returns the finished line when `byte` is a newline.
    pub fn push(&mut self, byte: u8) -> Option<Result<&[u8], ParseError>> {
        if self.complete {
            self.buffer.clear();
            self.complete = false;
        }

        if byte == b'\n' {
            self.complete = true;
            if core::mem::take(&mut self.overflowed) {
                return Some(Err(ParseError::LineTooLong));
            }
            return Some(Ok(self.buffer.as_slice()));
        }

        if !self.overflowed && self.buffer.push(byte).is_err() {
            self.overflowed = true;
        }
        None
    }

    /// Bytes of the line in progress.
    pub fn pending(&self) -> usize {
        if self.complete {
            0
        } else {
            self.buffer.len()
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    fn buttons(list: &[Button]) -> ButtonList {
        let mut out = ButtonList::new();
        for &b in list {
            out.push(b).unwrap();
        }
        out
    }

    #[test]
    fn test_parse_blank_and_comment() {
        assert_eq!(parse_line(b""), Ok(None));
        assert_eq!(parse_line(b"\r\n"), Ok(None));
        assert_eq!(parse_line(b"   \t"), Ok(None));
        assert_eq!(parse_line(b"# press a"), Ok(None));
        assert_eq!(parse_line(b"   # indented comment\n"), Ok(None));
    }

    #[test]
    fn test_parse_press_multiple_buttons() {
        let cmd = parse_line(b"PRESS a b zr\n").unwrap();
        assert_eq!(
            cmd,
            Some(MacroCommand::Press(buttons(&[Button::A, Button::B, Button::ZR])))
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            parse_line(b"hold DPAD_UP"),
            Ok(Some(MacroCommand::Hold(buttons(&[Button::DpadUp]))))
        );
        assert_eq!(
            parse_line(b"Release home"),
            Ok(Some(MacroCommand::Release(buttons(&[Button::Home]))))
        );
    }

    #[test]
    fn test_unknown_button_names_are_skipped() {
        assert_eq!(
            parse_line(b"PRESS turbo a"),
            Ok(Some(MacroCommand::Press(buttons(&[Button::A]))))
        );
        assert_eq!(
            parse_line(b"PRESS turbo"),
            Ok(Some(MacroCommand::Press(ButtonList::new())))
        );
    }

    #[test]
    fn test_press_requires_argument() {
        assert_eq!(parse_line(b"PRESS"), Err(ParseError::MissingArgument));
        assert_eq!(parse_line(b"RELEASE   \r\n"), Err(ParseError::MissingArgument));
    }

    #[test]
    fn test_too_many_buttons() {
        let line = b"PRESS a b x y l r zl zr plus";
        assert_eq!(parse_line(line), Err(ParseError::TooManyButtons));
    }

    #[test]
    fn test_parse_stick() {
        assert_eq!(
            parse_line(b"STICK l_stick -1.0 0.5"),
            Ok(Some(MacroCommand::Stick {
                stick: Stick::Left,
                horizontal: -1.0,
                vertical: 0.5,
            }))
        );
        assert_eq!(
            parse_line(b"stick R_STICK 0 1"),
            Ok(Some(MacroCommand::Stick {
                stick: Stick::Right,
                horizontal: 0.0,
                vertical: 1.0,
            }))
        );
    }

    #[test]
    fn test_stick_unknown_name_is_noop() {
        assert_eq!(parse_line(b"STICK c_stick 0 0"), Ok(None));
    }

    #[test]
    fn test_stick_bad_numbers() {
        assert_eq!(parse_line(b"STICK l_stick 0"), Err(ParseError::MissingArgument));
        assert_eq!(parse_line(b"STICK l_stick up 0"), Err(ParseError::InvalidNumber));
        assert_eq!(parse_line(b"STICK l_stick NaN 0"), Err(ParseError::InvalidNumber));
        assert_eq!(
            parse_line(b"STICK l_stick \xFF 0"),
            Err(ParseError::InvalidUtf8)
        );
    }

    #[test]
    fn test_parse_sleep() {
        assert_eq!(
            parse_line(b"SLEEP 0.25"),
            Ok(Some(MacroCommand::Sleep { millis: 250 }))
        );
        assert_eq!(parse_line(b"SLEEP 2"), Ok(Some(MacroCommand::Sleep { millis: 2000 })));
        assert_eq!(parse_line(b"SLEEP -1"), Err(ParseError::InvalidNumber));
        assert_eq!(parse_line(b"SLEEP"), Err(ParseError::MissingArgument));
    }

    #[test]
    fn test_parse_bare_commands() {
        assert_eq!(parse_line(b"CENTER_STICKS"), Ok(Some(MacroCommand::CenterSticks)));
        assert_eq!(parse_line(b"release_all\n"), Ok(Some(MacroCommand::ReleaseAll)));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(parse_line(b"JUMP a"), Err(ParseError::UnknownCommand));
    }

    #[test]
    fn test_line_too_long() {
        let line = [b'a'; MAX_LINE_LENGTH + 1];
        assert_eq!(parse_line(&line), Err(ParseError::LineTooLong));
    }

    fn feed(lines: &mut LineBuffer, bytes: &[u8]) -> std::vec::Vec<Result<std::vec::Vec<u8>, ParseError>> {
        bytes
            .iter()
            .filter_map(|&b| lines.push(b).map(|r| r.map(|l| l.to_vec())))
            .collect()
    }

    #[test]
    fn test_line_buffer_splits_lines() {
        let mut lines = LineBuffer::new();
        let out = feed(&mut lines, b"HOLD a\r\nSLEEP 1\nRELE");
        assert_eq!(out, [Ok(b"HOLD a\r".to_vec()), Ok(b"SLEEP 1".to_vec())]);
        assert_eq!(lines.pending(), 4);

        let out = feed(&mut lines, b"ASE a\n");
        assert_eq!(out, [Ok(b"RELEASE a".to_vec())]);
        assert_eq!(lines.pending(), 0);
    }

    #[test]
    fn test_line_buffer_discards_overlong_line() {
        let mut lines = LineBuffer::new();
        let mut input = std::vec![b'x'; LINE_CAPACITY + 10];
        input.extend_from_slice(b"\nHOLD b\n");

        let out = feed(&mut lines, &input);
        assert_eq!(out, [Err(ParseError::LineTooLong), Ok(b"HOLD b".to_vec())]);
    }

    #[test]
    fn test_line_buffer_accepts_max_line_with_cr() {
        let mut lines = LineBuffer::new();
        let mut input = std::vec![b' '; MAX_LINE_LENGTH];
        input.extend_from_slice(b"\r\n");

        let out = feed(&mut lines, &input);
        assert_eq!(out.len(), 1);
        let line = out[0].as_ref().unwrap();
        assert_eq!(parse_line(line), Ok(None));
    }
}
