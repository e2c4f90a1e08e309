//! Controller input state and its report encoding.

use procon_proto::{Button, ButtonSlot, HatDirection, PackedStick, Stick};

/// Number of bytes [`ControllerState::to_bytes`] produces.
pub const STATE_LEN: usize = 10;

/// Battery/connection byte the emulated controller always reports.
pub const DEFAULT_BATTERY_CONNECTION: u8 = 0x80;

/// Complete controller input snapshot.
///
/// Only the command commit step mutates this; the protocol engine reads it
/// when building a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerState {
    pub battery_connection: u8,
    /// Byte 0 right-hand buttons, byte 1 shared buttons, byte 2 hat nibble + L/ZL.
    pub buttons: [u8; 3],
    pub left_stick: PackedStick,
    pub right_stick: PackedStick,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::neutral()
    }
}

impl ControllerState {
    /// No buttons held, hat centered, both sticks centered.
    pub const fn neutral() -> Self {
        Self::with_battery(DEFAULT_BATTERY_CONNECTION)
    }

    /// Neutral state with a custom battery/connection byte.
    pub const fn with_battery(battery_connection: u8) -> Self {
        Self {
            battery_connection,
            buttons: [0; 3],
            left_stick: PackedStick::CENTERED,
            right_stick: PackedStick::CENTERED,
        }
    }

    /// Press a button.
    ///
    /// D-pad directions share one nibble, so pressing one replaces whichever
    /// direction was held before.
    pub fn press(&mut self, button: Button) {
        match button.slot() {
            ButtonSlot::Bit { byte, mask } => self.buttons[byte] |= mask,
            ButtonSlot::Hat(direction) => self.set_hat(direction),
        }
    }

    /// Release a button. Releasing any D-pad direction centers the hat.
    pub fn release(&mut self, button: Button) {
        match button.slot() {
            ButtonSlot::Bit { byte, mask } => self.buttons[byte] &= !mask,
            ButtonSlot::Hat(_) => self.set_hat(HatDirection::Centered),
        }
    }

    /// Whether a button is currently held.
    pub fn is_pressed(&self, button: Button) -> bool {
        match button.slot() {
            ButtonSlot::Bit { byte, mask } => self.buttons[byte] & mask != 0,
            ButtonSlot::Hat(direction) => self.hat() == direction,
        }
    }

    /// Release every button and center the hat.
    pub fn release_all(&mut self) {
        self.buttons = [0; 3];
    }

    /// Current hat direction. An unrecognised nibble reads as centered.
    pub fn hat(&self) -> HatDirection {
        HatDirection::from_code(self.buttons[2]).unwrap_or_default()
    }

    fn set_hat(&mut self, direction: HatDirection) {
        self.buttons[2] = (self.buttons[2] & !HatDirection::NIBBLE_MASK) | direction.code();
    }

    /// Set a stick's packed position.
    pub fn set_stick(&mut self, stick: Stick, position: PackedStick) {
        match stick {
            Stick::Left => self.left_stick = position,
            Stick::Right => self.right_stick = position,
        }
    }

    /// A stick's packed position.
    pub fn stick(&self, stick: Stick) -> PackedStick {
        match stick {
            Stick::Left => self.left_stick,
            Stick::Right => self.right_stick,
        }
    }

    /// Center both sticks.
    pub fn center_sticks(&mut self) {
        self.left_stick = PackedStick::CENTERED;
        self.right_stick = PackedStick::CENTERED;
    }

    /// Encode as it appears at report bytes 3..13: battery, buttons, left, right.
    pub fn to_bytes(&self) -> [u8; STATE_LEN] {
        let l = self.left_stick.bytes();
        let r = self.right_stick.bytes();
        [
            self.battery_connection,
            self.buttons[0],
            self.buttons[1],
            self.buttons[2],
            l[0],
            l[1],
            l[2],
            r[0],
            r[1],
            r[2],
        ]
    }
}
