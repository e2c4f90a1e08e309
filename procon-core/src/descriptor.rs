//! Device identity: HID report descriptor, name, USB ids and address.

/// Advertised device name.
pub const DEVICE_NAME: &str = "Pro Controller";

/// Vendor prefix of the device address.
pub const ADDRESS_PREFIX: [u8; 3] = [0x7C, 0xBB, 0x8A];

/// Nintendo's USB vendor id.
pub const USB_VENDOR_ID: u16 = 0x057E;
/// Pro Controller USB product id.
pub const USB_PRODUCT_ID: u16 = 0x2009;

/// Build a device address from the vendor prefix and three random bytes.
///
/// `0xFF` is avoided in the random part.
///
/// ```
/// use procon_core::descriptor::device_address;
///
/// assert_eq!(device_address([1, 2, 0xFF]), [0x7C, 0xBB, 0x8A, 1, 2, 0]);
/// ```
pub const fn device_address(random: [u8; 3]) -> [u8; 6] {
    [
        ADDRESS_PREFIX[0],
        ADDRESS_PREFIX[1],
        ADDRESS_PREFIX[2],
        random[0] % 0xFF,
        random[1] % 0xFF,
        random[2] % 0xFF,
    ]
}

/// Size of every USB HID report, report id included.
pub const USB_REPORT_SIZE: usize = 64;

/// Report descriptor for the wired (USB) link.
///
/// Vendor reports 0x21/0x30 in, 0x01/0x10 out, each sized to a full 64-byte
/// packet, plus the 0x80/0x81 pair the console uses for the USB handshake.
#[rustfmt::skip]
pub const USB_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01,        // Usage Page (Generic Desktop Ctrls)
    0x15, 0x00,        // Logical Minimum (0)
    0x09, 0x04,        // Usage (Joystick)
    0xA1, 0x01,        // Collection (Application)
    0x06, 0x01, 0xFF,  //   Usage Page (Vendor Defined 0xFF01)

    0x85, 0x21,        //   Report ID (33)
    0x09, 0x21,        //   Usage (0x21)
    0x75, 0x08,        //   Report Size (8)
    0x95, 0x3F,        //   Report Count (63)
    0x81, 0x02,        //   Input (Data,Var,Abs)

    0x85, 0x30,        //   Report ID (48)
    0x09, 0x30,        //   Usage (0x30)
    0x75, 0x08,        //   Report Size (8)
    0x95, 0x3F,        //   Report Count (63)
    0x81, 0x02,        //   Input (Data,Var,Abs)

    0x85, 0x81,        //   Report ID (-127)
    0x09, 0x81,        //   Usage (0x81)
    0x75, 0x08,        //   Report Size (8)
    0x95, 0x3F,        //   Report Count (63)
    0x81, 0x02,        //   Input (Data,Var,Abs)

    0x85, 0x01,        //   Report ID (1)
    0x09, 0x01,        //   Usage (0x01)
    0x75, 0x08,        //   Report Size (8)
    0x95, 0x3F,        //   Report Count (63)
    0x91, 0x02,        //   Output (Data,Var,Abs)

    0x85, 0x10,        //   Report ID (16)
    0x09, 0x10,        //   Usage (0x10)
    0x75, 0x08,        //   Report Size (8)
    0x95, 0x3F,        //   Report Count (63)
    0x91, 0x02,        //   Output (Data,Var,Abs)

    0x85, 0x80,        //   Report ID (-128)
    0x09, 0x80,        //   Usage (0x80)
    0x75, 0x08,        //   Report Size (8)
    0x95, 0x3F,        //   Report Count (63)
    0x91, 0x02,        //   Output (Data,Var,Abs)

    0x85, 0x82,        //   Report ID (-126)
    0x09, 0x82,        //   Usage (0x82)
    0x75, 0x08,        //   Report Size (8)
    0x95, 0x3F,        //   Report Count (63)
    0x91, 0x02,        //   Output (Data,Var,Abs)
    0xC0,              // End Collection
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_closes_its_collection() {
        assert_eq!(USB_REPORT_DESCRIPTOR.last(), Some(&0xC0));
        assert_eq!(&USB_REPORT_DESCRIPTOR[..2], &[0x05, 0x01]);
    }

    #[test]
    fn test_usb_descriptor_declares_handshake_reports() {
        let has_report = |id: u8| USB_REPORT_DESCRIPTOR.windows(2).any(|w| w == [0x85, id]);
        for id in [0x21, 0x30, 0x81, 0x01, 0x10, 0x80, 0x82] {
            assert!(has_report(id), "missing report id {id:#x}");
        }
    }

    #[test]
    fn test_device_address_prefix() {
        let address = device_address([0x12, 0x34, 0x56]);
        assert_eq!(&address[..3], &ADDRESS_PREFIX);
        assert_eq!(&address[3..], &[0x12, 0x34, 0x56]);
    }
}
