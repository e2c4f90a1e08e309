//! Closed identifier sets and the Pro Controller bit layout.
//!
//! Button and stick names are resolved to these enums once, at the parsing
//! boundary, so the report path never compares strings.

/// Lowest value of a 12-bit stick axis.
pub const AXIS_MIN: u16 = 0x000;
/// Center value of a 12-bit stick axis.
pub const AXIS_MID: u16 = 0x7FF;
/// Highest value of a 12-bit stick axis.
pub const AXIS_MAX: u16 = 0xFFF;

/// A button on the emulated controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    A,
    B,
    X,
    Y,
    L,
    R,
    ZL,
    ZR,
    Plus,
    Minus,
    Home,
    Capture,
    /// Left stick click (L3).
    LStick,
    /// Right stick click (R3).
    RStick,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
}

/// Where a button lives inside the 3-byte button field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonSlot {
    /// A single bit: `buttons[byte] & mask`.
    Bit { byte: usize, mask: u8 },
    /// One direction of the shared hat nibble in byte 2.
    Hat(HatDirection),
}

impl Button {
    /// Every button, in the order the macro grammar documents them.
    pub const ALL: [Button; 18] = [
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
        Button::L,
        Button::R,
        Button::ZL,
        Button::ZR,
        Button::Plus,
        Button::Minus,
        Button::Home,
        Button::Capture,
        Button::LStick,
        Button::RStick,
        Button::DpadUp,
        Button::DpadDown,
        Button::DpadLeft,
        Button::DpadRight,
    ];

    /// Resolve a macro-grammar button name (case-insensitive).
    ///
    /// Returns `None` for unknown names; callers treat those as no-ops.
    ///
    /// ```
    /// use procon_proto::Button;
    ///
    /// assert_eq!(Button::from_name(b"ZR"), Some(Button::ZR));
    /// assert_eq!(Button::from_name(b"turbo"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &[u8]) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|button| button.name().as_bytes().eq_ignore_ascii_case(name))
    }

    /// The lowercase macro-grammar name of this button.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Button::A => "a",
            Button::B => "b",
            Button::X => "x",
            Button::Y => "y",
            Button::L => "l",
            Button::R => "r",
            Button::ZL => "zl",
            Button::ZR => "zr",
            Button::Plus => "plus",
            Button::Minus => "minus",
            Button::Home => "home",
            Button::Capture => "capture",
            Button::LStick => "l_stick",
            Button::RStick => "r_stick",
            Button::DpadUp => "dpad_up",
            Button::DpadDown => "dpad_down",
            Button::DpadLeft => "dpad_left",
            Button::DpadRight => "dpad_right",
        }
    }

    /// Byte/mask (or hat direction) this button maps to.
    #[must_use]
    pub const fn slot(self) -> ButtonSlot {
        match self {
            Button::Y => ButtonSlot::Bit { byte: 0, mask: 0x01 },
            Button::X => ButtonSlot::Bit { byte: 0, mask: 0x02 },
            Button::B => ButtonSlot::Bit { byte: 0, mask: 0x04 },
            Button::A => ButtonSlot::Bit { byte: 0, mask: 0x08 },
            Button::R => ButtonSlot::Bit { byte: 0, mask: 0x40 },
            Button::ZR => ButtonSlot::Bit { byte: 0, mask: 0x80 },

            Button::Minus => ButtonSlot::Bit { byte: 1, mask: 0x01 },
            Button::Plus => ButtonSlot::Bit { byte: 1, mask: 0x02 },
            Button::RStick => ButtonSlot::Bit { byte: 1, mask: 0x04 },
            Button::LStick => ButtonSlot::Bit { byte: 1, mask: 0x08 },
            Button::Home => ButtonSlot::Bit { byte: 1, mask: 0x10 },
            Button::Capture => ButtonSlot::Bit { byte: 1, mask: 0x20 },

            Button::L => ButtonSlot::Bit { byte: 2, mask: 0x40 },
            Button::ZL => ButtonSlot::Bit { byte: 2, mask: 0x80 },

            Button::DpadUp => ButtonSlot::Hat(HatDirection::Up),
            Button::DpadDown => ButtonSlot::Hat(HatDirection::Down),
            Button::DpadLeft => ButtonSlot::Hat(HatDirection::Left),
            Button::DpadRight => ButtonSlot::Hat(HatDirection::Right),
        }
    }

    /// Whether this button is one of the four D-pad directions.
    #[inline]
    #[must_use]
    pub const fn is_dpad(self) -> bool {
        matches!(self.slot(), ButtonSlot::Hat(_))
    }
}

/// 4-bit hat code stored in the low nibble of button byte 2.
///
/// The field can only hold one direction at a time, so D-pad presses replace
/// each other instead of combining.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HatDirection {
    #[default]
    Centered = 0x0,
    Down = 0x1,
    Up = 0x2,
    Right = 0x4,
    DownRight = 0x5,
    UpRight = 0x6,
    Left = 0x8,
    DownLeft = 0x9,
    UpLeft = 0xA,
}

impl HatDirection {
    /// Mask of the hat nibble inside button byte 2.
    pub const NIBBLE_MASK: u8 = 0x0F;

    /// The raw nibble value.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decode a nibble; unknown codes yield `None`.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code & Self::NIBBLE_MASK {
            0x0 => HatDirection::Centered,
            0x1 => HatDirection::Down,
            0x2 => HatDirection::Up,
            0x4 => HatDirection::Right,
            0x5 => HatDirection::DownRight,
            0x6 => HatDirection::UpRight,
            0x8 => HatDirection::Left,
            0x9 => HatDirection::DownLeft,
            0xA => HatDirection::UpLeft,
            _ => return None,
        })
    }
}

/// One of the two analog sticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stick {
    Left,
    Right,
}

impl Stick {
    /// Resolve a stick name by its first character (`l...` / `r...`).
    ///
    /// ```
    /// use procon_proto::Stick;
    ///
    /// assert_eq!(Stick::from_name(b"l_stick"), Some(Stick::Left));
    /// assert_eq!(Stick::from_name(b"R_STICK"), Some(Stick::Right));
    /// assert_eq!(Stick::from_name(b"c_stick"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name.first()?.to_ascii_lowercase() {
            b'l' => Some(Stick::Left),
            b'r' => Some(Stick::Right),
            _ => None,
        }
    }
}

/// Convert a normalized axis in `[-1.0, 1.0]` to the 12-bit report range.
///
/// `round((axis + 1.0) * 0x7FF)`, clamped to `[0x000, 0xFFF]`. Full
/// deflection saturates to `0xFFF`; the midpoint scale alone tops out at
/// `0xFFE`. NaN maps to center.
#[must_use]
pub fn axis_to_raw(axis: f32) -> u16 {
    if axis.is_nan() {
        return AXIS_MID;
    }
    if axis >= 1.0 {
        return AXIS_MAX;
    }
    let axis = axis.max(-1.0);
    // Non-negative here, so adding 0.5 and truncating rounds half up.
    let scaled = (axis + 1.0) * AXIS_MID as f32 + 0.5;
    (scaled as u16).min(AXIS_MAX)
}

/// Two 12-bit axes packed into 3 bytes, as the report carries them.
///
/// byte0 = H[7:0], byte1 = H[11:8] | V[3:0] << 4, byte2 = V[11:4].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PackedStick(pub [u8; 3]);

impl PackedStick {
    /// Both axes centered.
    pub const CENTERED: Self = Self::from_axes(AXIS_MID, AXIS_MID);

    /// Pack raw 12-bit axis values; bits above 12 are discarded.
    #[must_use]
    pub const fn from_axes(horizontal: u16, vertical: u16) -> Self {
        let h = horizontal & AXIS_MAX;
        let v = vertical & AXIS_MAX;
        Self([
            (h & 0xFF) as u8,
            (((h >> 8) & 0x0F) | ((v & 0x0F) << 4)) as u8,
            (v >> 4) as u8,
        ])
    }

    /// Pack normalized `[-1.0, 1.0]` axes.
    #[must_use]
    pub fn from_normalized(horizontal: f32, vertical: f32) -> Self {
        Self::from_axes(axis_to_raw(horizontal), axis_to_raw(vertical))
    }

    /// The 12-bit horizontal axis.
    #[inline]
    #[must_use]
    pub const fn horizontal(self) -> u16 {
        self.0[0] as u16 | ((self.0[1] as u16 & 0x0F) << 8)
    }

    /// The 12-bit vertical axis.
    #[inline]
    #[must_use]
    pub const fn vertical(self) -> u16 {
        (self.0[1] as u16 >> 4) | ((self.0[2] as u16) << 4)
    }

    /// The packed bytes.
    #[inline]
    #[must_use]
    pub const fn bytes(self) -> [u8; 3] {
        self.0
    }
}

impl Default for PackedStick {
    fn default() -> Self {
        Self::CENTERED
    }
}
