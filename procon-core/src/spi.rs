//! Emulated SPI flash contents.
//!
//! The console reads calibration and configuration from the controller's
//! flash during setup. There is no flash here; known addresses answer from
//! these fixed tables, everything else reads as erased (`0xFF`).

/// Factory stick parameters, shared by the left and right stick entries.
pub const STICK_PARAMETERS: [u8; 18] = [
    0x0F, 0x30, 0x61, 0x96, 0x30, 0xF3, 0xD4, 0x14, 0x54, 0x41, 0x15, 0x54, 0xC7, 0x79, 0x9C, 0x33,
    0x36, 0x63,
];

/// Serial number region (0x6000). Unset.
const SERIAL_NUMBER: [u8; 16] = [0xFF; 16];

/// Body and button colours (0x6050).
const COLOURS: [u8; 13] = [
    0x32, 0x32, 0x32, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// Sensor/stick header followed by the stick parameters (0x6080).
#[rustfmt::skip]
const SENSOR_AND_STICK_PARAMETERS: [u8; 24] = [
    0x50, 0xFD, 0x00, 0x00, 0xC6, 0x0F,
    0x0F, 0x30, 0x61, 0x96, 0x30, 0xF3, 0xD4, 0x14, 0x54, 0x41, 0x15, 0x54, 0xC7, 0x79, 0x9C, 0x33,
    0x36, 0x63,
];

/// User calibration magic (0x8010). Reads as "no user calibration".
const USER_CALIBRATION: [u8; 3] = [0xFF; 3];

/// Factory stick calibration and colours (0x603D).
#[rustfmt::skip]
const FACTORY_STICK_CALIBRATION: [u8; 25] = [
    // left stick
    0xD4, 0x75, 0x61, 0xE5, 0x87, 0x7C, 0xEC, 0x55, 0x61,
    // right stick
    0x5D, 0xD8, 0x7F, 0x18, 0xE6, 0x61, 0x86, 0x65, 0x5D,
    0xFF,
    0x32, 0x32, 0x32,
    0xFF, 0xFF, 0xFF,
];

/// Factory IMU calibration (0x6020).
#[rustfmt::skip]
const FACTORY_IMU_CALIBRATION: [u8; 24] = [
    0xCC, 0x00, 0x40, 0x00, 0x91, 0x01,
    0x00, 0x40, 0x00, 0x40, 0x00, 0x40,
    0xE7, 0xFF, 0x0E, 0x00, 0xDC, 0xFF,
    0x3B, 0x34, 0x3B, 0x34, 0x3B, 0x34,
];

/// Fill byte for addresses without a table entry.
pub const ERASED: u8 = 0xFF;

/// Look up the fixed block for an address, if one exists.
///
/// The block is returned whole, independent of the requested length.
///
/// ```
/// use procon_core::spi::spi_block;
///
/// assert_eq!(spi_block(0x80, 0x10), Some(&[0xFF, 0xFF, 0xFF][..]));
/// assert_eq!(spi_block(0x12, 0x34), None);
/// ```
pub fn spi_block(addr_high: u8, addr_low: u8) -> Option<&'static [u8]> {
    let block: &'static [u8] = match (addr_high, addr_low) {
        (0x60, 0x00) => &SERIAL_NUMBER,
        (0x60, 0x50) => &COLOURS,
        (0x60, 0x80) => &SENSOR_AND_STICK_PARAMETERS,
        (0x60, 0x98) => &STICK_PARAMETERS,
        (0x80, 0x10) => &USER_CALIBRATION,
        (0x60, 0x3D) => &FACTORY_STICK_CALIBRATION,
        (0x60, 0x20) => &FACTORY_IMU_CALIBRATION,
        _ => return None,
    };
    Some(block)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn test_stick_parameters_shared_between_entries() {
        let combined = spi_block(0x60, 0x80).unwrap();
        assert_eq!(&combined[6..], &STICK_PARAMETERS[..]);
        assert_eq!(spi_block(0x60, 0x98).unwrap(), &STICK_PARAMETERS[..]);
    }

    #[test]
    fn test_factory_stick_calibration_layout() {
        let block = spi_block(0x60, 0x3D).unwrap();
        assert_eq!(block.len(), 25);
        assert_eq!(&block[..3], &[0xD4, 0x75, 0x61]);
        assert_eq!(&block[9..12], &[0x5D, 0xD8, 0x7F]);
        assert_eq!(&block[18..], &[0xFF, 0x32, 0x32, 0x32, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_block_lengths() {
        assert_eq!(spi_block(0x60, 0x00).map(<[u8]>::len), Some(16));
        assert_eq!(spi_block(0x60, 0x50).map(<[u8]>::len), Some(13));
        assert_eq!(spi_block(0x60, 0x20).map(<[u8]>::len), Some(24));
        assert_eq!(spi_block(0x00, 0x60), None);
    }
}
