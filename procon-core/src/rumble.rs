//! Rumble decoding for console output reports.
//!
//! Output reports 0x01, 0x10 and 0x11 carry a 4-byte HD rumble word per side
//! at bytes 2..6 (left) and 6..10 (right). Nothing is actuated; the decoded
//! on/off state is only tracked and logged.

/// Output report ids that carry rumble data.
pub const RUMBLE_REPORT_IDS: [u8; 3] = [0x01, 0x10, 0x11];

/// Amplitudes at or below this are treated as silence.
const AMPLITUDE_THRESHOLD: u8 = 0x02;

/// Decode whether a request asks for rumble.
///
/// Returns `None` for reports without rumble data or when neither side's
/// word is well formed.
///
/// ```
/// use procon_core::rumble::decode_rumble;
///
/// let mut report = [0u8; 10];
/// report[0] = 0x10;
/// report[5] = 0x40 | 0x20;
/// assert_eq!(decode_rumble(&report), Some(true));
/// ```
pub fn decode_rumble(report: &[u8]) -> Option<bool> {
    if report.len() < 10 || !RUMBLE_REPORT_IDS.contains(&report[0]) {
        return None;
    }

    let left = side_amplitude(report[2], report[5]);
    let right = side_amplitude(report[6], report[9]);
    if left.is_none() && right.is_none() {
        return None;
    }

    let amplitude = left.unwrap_or(0) | right.unwrap_or(0);
    Some(amplitude > AMPLITUDE_THRESHOLD)
}

/// Amplitude bits of one side, if the word is well formed.
#[inline]
fn side_amplitude(first: u8, last: u8) -> Option<u8> {
    if first & 0x03 == 0 && last & 0x40 == 0x40 {
        Some(last & 0x3F)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(id: u8, left: [u8; 4], right: [u8; 4]) -> [u8; 12] {
        let mut r = [0u8; 12];
        r[0] = id;
        r[2..6].copy_from_slice(&left);
        r[6..10].copy_from_slice(&right);
        r
    }

    #[test]
    fn test_neutral_rumble_is_inactive() {
        // The console's "no rumble" word.
        let neutral = [0x00, 0x01, 0x40, 0x40];
        assert_eq!(decode_rumble(&report(0x10, neutral, neutral)), Some(false));
    }

    #[test]
    fn test_either_side_can_activate() {
        let off = [0x00, 0x01, 0x40, 0x40];
        let on = [0x00, 0x01, 0x40, 0x48];
        assert_eq!(decode_rumble(&report(0x01, on, off)), Some(true));
        assert_eq!(decode_rumble(&report(0x11, off, on)), Some(true));
    }

    #[test]
    fn test_malformed_words_are_ignored() {
        let bad_prefix = [0x01, 0x00, 0x00, 0x7F];
        let bad_flag = [0x00, 0x00, 0x00, 0x3F];
        assert_eq!(decode_rumble(&report(0x10, bad_prefix, bad_flag)), None);

        let on = [0x00, 0x00, 0x00, 0x50];
        assert_eq!(decode_rumble(&report(0x10, bad_prefix, on)), Some(true));
    }

    #[test]
    fn test_other_reports_and_short_input() {
        let on = [0x00, 0x00, 0x00, 0x7F];
        assert_eq!(decode_rumble(&report(0x80, on, on)), None);
        assert_eq!(decode_rumble(&[0x10, 0x00, 0x00]), None);
    }
}
