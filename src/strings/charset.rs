//! Character class tests for the 8-bit encodings found in 65xx software.
//!
//! "Printable" tests accept only glyphs. "Extended" tests also accept the
//! line-ending control codes, so text with embedded carriage returns is still
//! recognized as one string.

use crate::config::TextScanMode;
use crate::core::format_descriptor::FormatSubType;

/// Byte classification predicate.
pub type CharTest = fn(u8) -> bool;

pub fn is_printable_low_ascii(val: u8) -> bool {
    (0x20..0x7f).contains(&val)
}

pub fn is_extended_low_ascii(val: u8) -> bool {
    is_printable_low_ascii(val) || val == 0x0a || val == 0x0d
}

pub fn is_printable_high_ascii(val: u8) -> bool {
    (0xa0..0xff).contains(&val)
}

pub fn is_extended_high_ascii(val: u8) -> bool {
    is_printable_high_ascii(val) || val == 0x8a || val == 0x8d
}

pub fn is_printable_low_or_high_ascii(val: u8) -> bool {
    is_printable_low_ascii(val) || is_printable_high_ascii(val)
}

pub fn is_extended_low_or_high_ascii(val: u8) -> bool {
    is_extended_low_ascii(val) || is_extended_high_ascii(val)
}

/// C64 PETSCII in either character set: digits, punctuation, both letter
/// ranges and the bracket/pound glyphs.
pub fn is_printable_c64_petscii(val: u8) -> bool {
    matches!(val, 0x20..=0x5d | 0xc1..=0xda)
}

pub fn is_extended_c64_petscii(val: u8) -> bool {
    is_printable_c64_petscii(val) || val == 0x0d
}

/// C64 screen codes, non-reversed glyphs only.
pub fn is_printable_c64_screen_code(val: u8) -> bool {
    matches!(val, 0x00..=0x1d | 0x20..=0x3f | 0x41..=0x5a)
}

/// Screen memory has no line-ending codes.
pub fn is_extended_c64_screen_code(val: u8) -> bool {
    is_printable_c64_screen_code(val)
}

/// Extended test and string sub-type used when scanning in `mode`.
///
/// For [`TextScanMode::LowHighAscii`] the sub-type is the generic
/// placeholder; the caller refines it once the first character is seen.
pub fn scan_test(mode: TextScanMode) -> (CharTest, FormatSubType) {
    match mode {
        TextScanMode::LowAscii => (is_extended_low_ascii, FormatSubType::Ascii),
        TextScanMode::LowHighAscii => (is_extended_low_or_high_ascii, FormatSubType::AsciiGeneric),
        TextScanMode::C64Petscii => (is_extended_c64_petscii, FormatSubType::C64Petscii),
        TextScanMode::C64ScreenCode => (is_extended_c64_screen_code, FormatSubType::C64Screen),
    }
}

/// Narrow a low-or-high ASCII scan to the half the first byte belongs to.
pub fn refine_low_high(first: u8) -> (CharTest, FormatSubType) {
    if is_extended_low_ascii(first) {
        (is_extended_low_ascii, FormatSubType::Ascii)
    } else {
        (is_extended_high_ascii, FormatSubType::HighAscii)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_ranges() {
        assert!(is_printable_low_ascii(b' '));
        assert!(is_printable_low_ascii(b'~'));
        assert!(!is_printable_low_ascii(0x7f));
        assert!(!is_printable_low_ascii(0x0d));
        assert!(is_extended_low_ascii(0x0d));
        assert!(is_extended_low_ascii(0x0a));

        assert!(is_printable_high_ascii(0xc1));
        assert!(!is_printable_high_ascii(0xff));
        assert!(is_extended_high_ascii(0x8d));
        assert!(!is_extended_high_ascii(0x0d));

        assert!(is_extended_low_or_high_ascii(b'A'));
        assert!(is_extended_low_or_high_ascii(0xc1));
        assert!(!is_extended_low_or_high_ascii(0x00));
        assert!(!is_printable_low_or_high_ascii(0x8d));
    }

    #[test]
    fn test_c64_ranges() {
        assert!(is_printable_c64_petscii(b'A'));
        assert!(is_printable_c64_petscii(0xc1));
        assert!(!is_printable_c64_petscii(0x00));
        assert!(is_extended_c64_petscii(0x0d));

        assert!(is_printable_c64_screen_code(0x01));
        assert!(is_printable_c64_screen_code(0x20));
        assert!(!is_printable_c64_screen_code(0x80));
        assert!(!is_extended_c64_screen_code(0x8d));
    }

    #[test]
    fn test_scan_test_selection() {
        let (test, sub) = scan_test(TextScanMode::LowHighAscii);
        assert_eq!(sub, FormatSubType::AsciiGeneric);
        assert!(test(b'a') && test(0xe1));

        let (test, sub) = refine_low_high(0xe1);
        assert_eq!(sub, FormatSubType::HighAscii);
        assert!(!test(b'a'));

        let (_, sub) = scan_test(TextScanMode::C64ScreenCode);
        assert_eq!(sub, FormatSubType::C64Screen);
    }
}
