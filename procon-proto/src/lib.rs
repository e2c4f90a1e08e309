//! Pro Controller identifiers, stick packing, and the serial macro grammar.
//!
//! This crate holds the pieces of the controller emulator that have no timing
//! or concurrency concerns:
//!
//! - **Types**: closed identifier sets and the report bit layout
//!   - [`Button`] - every button, with its byte/mask or hat slot
//!   - [`HatDirection`] - the 4-bit D-pad code
//!   - [`Stick`] - left or right analog stick
//!   - [`PackedStick`] - two 12-bit axes packed into 3 bytes
//!
//! - **Parsing**: the line-oriented macro language sent over the serial link
//!   - [`parse_line()`] - parse one line into a [`MacroCommand`]
//!   - [`ParseError`] - why a line was rejected
//!
//! # Macro Grammar
//!
//! ```text
//! PRESS a b          # tap A and B together
//! HOLD zl            # keep ZL held
//! STICK l_stick -1 0 # full left on the left stick
//! SLEEP 0.5          # wait half a second
//! RELEASE zl
//! CENTER_STICKS
//! RELEASE_ALL
//! ```
//!
//! # Example
//!
//! ```
//! use procon_proto::{parse_line, MacroCommand, PackedStick, Stick};
//!
//! let Ok(Some(MacroCommand::Stick { stick, horizontal, vertical })) =
//!     parse_line(b"STICK r_stick 1.0 -1.0\n")
//! else {
//!     panic!("not a stick command");
//! };
//! assert_eq!(stick, Stick::Right);
//! let packed = PackedStick::from_normalized(horizontal, vertical);
//! assert_eq!(packed.horizontal(), 0xFFF);
//! assert_eq!(packed.vertical(), 0x000);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod parser;
pub mod types;

pub use parser::{
    parse_line, ButtonList, LineBuffer, MacroCommand, ParseError, MAX_BUTTONS_PER_LINE,
    MAX_LINE_LENGTH,
};
pub use types::{
    axis_to_raw, Button, ButtonSlot, HatDirection, PackedStick, Stick, AXIS_MAX, AXIS_MID,
    AXIS_MIN,
};
