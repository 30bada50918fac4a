//! Static recognizers for runs and structured strings.
//!
//! Each recognizer looks at a whole byte range and either accounts for every
//! byte or gives up: a range that is mostly strings with one bad byte returns
//! `None` rather than a partial count.

use memchr::memchr_iter;
use thiserror::Error;

use super::charset::CharTest;
use crate::core::format_descriptor::FormatType;

/// Reasons string data fails verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StringVerifyError {
    #[error("string runs past the end of the data")]
    OutOfRange,
    #[error("null byte found inside null-terminated string")]
    NullInsideNullTerm,
    #[error("null-terminated string has no null byte")]
    MissingNullTerm,
    #[error("leading 8-bit length does not match string length")]
    L8LengthMismatch,
    #[error("leading 16-bit length does not match string length")]
    L16LengthMismatch,
    #[error("DCI string must be at least two bytes")]
    DciTooShort,
    #[error("DCI string has mixed high-bit values")]
    DciMixedData,
    #[error("DCI string is not terminated")]
    DciNotTerminated,
    #[error("{0} is not a string type")]
    NotString(FormatType),
}

/// Byte counts by character class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighLowCounts {
    /// Characters with the high bit clear
    pub low: usize,
    /// Characters with the high bit set
    pub high: usize,
    pub non_char: usize,
}

/// Length of the run of identical bytes at the start of `buf`.
pub fn recognize_run(buf: &[u8]) -> usize {
    match buf.first() {
        Some(&first) => buf.iter().take_while(|&&b| b == first).count(),
        None => 0,
    }
}

/// Count low, high and non-character bytes. `test` must accept both halves.
pub fn count_high_low_bytes(buf: &[u8], test: CharTest) -> HighLowCounts {
    buf.iter().fold(HighLowCounts::default(), |mut acc, &b| {
        if !test(b) {
            acc.non_char += 1;
        } else if b & 0x80 == 0 {
            acc.low += 1;
        } else {
            acc.high += 1;
        }
        acc
    })
}

pub fn count_character_bytes(buf: &[u8], test: CharTest) -> usize {
    buf.iter().filter(|&&b| test(b)).count()
}

/// Check one string body: every byte passes `test` and, with
/// `limit_hi_bit`, all bytes share the first byte's high bit.
fn body_ok(body: &[u8], test: CharTest, limit_hi_bit: bool) -> bool {
    let Some(&first) = body.first() else {
        return true;
    };
    let hi = first & 0x80;
    body.iter()
        .all(|&b| test(b) && (!limit_hi_bit || b & 0x80 == hi))
}

/// Count null-terminated strings filling `buf`. Empty strings are allowed but
/// not counted.
pub fn recognize_null_terminated_strings(
    buf: &[u8],
    test: CharTest,
    limit_hi_bit: bool,
) -> Option<usize> {
    if buf.last() != Some(&0x00) {
        return None;
    }
    let mut count = 0;
    let mut start = 0;
    for end in memchr_iter(0x00, buf) {
        let body = &buf[start..end];
        if !body_ok(body, test, limit_hi_bit) {
            return None;
        }
        if !body.is_empty() {
            count += 1;
        }
        start = end + 1;
    }
    Some(count)
}

/// Count strings with a leading 8-bit length filling `buf`.
pub fn recognize_len8_strings(buf: &[u8], test: CharTest, limit_hi_bit: bool) -> Option<usize> {
    let mut posn = 0;
    let mut count = 0;
    while posn < buf.len() {
        let len = buf[posn] as usize;
        posn += 1;
        let body = buf.get(posn..posn + len)?;
        if !body_ok(body, test, limit_hi_bit) {
            return None;
        }
        if len != 0 {
            count += 1;
        }
        posn += len;
    }
    Some(count)
}

/// Count strings with a leading 16-bit little-endian length filling `buf`.
pub fn recognize_len16_strings(buf: &[u8], test: CharTest, limit_hi_bit: bool) -> Option<usize> {
    let mut posn = 0;
    let mut count = 0;
    while posn < buf.len() {
        let hdr = buf.get(posn..posn + 2)?;
        let len = u16::from_le_bytes([hdr[0], hdr[1]]) as usize;
        posn += 2;
        let body = buf.get(posn..posn + len)?;
        if !body_ok(body, test, limit_hi_bit) {
            return None;
        }
        if len != 0 {
            count += 1;
        }
        posn += len;
    }
    Some(count)
}

/// Shared DCI scan over bytes in string order.
fn scan_dci(bytes: impl Iterator<Item = u8>, expected_hi: u8, test: CharTest) -> Option<usize> {
    let mut count = 0;
    let mut len = 0;
    for b in bytes {
        if b & 0x80 != expected_hi {
            // terminator; two in a row is malformed
            if len == 0 {
                return None;
            }
            count += 1;
            len = 0;
        } else {
            len += 1;
        }
        if !test(b & 0x7f) {
            return None;
        }
    }
    Some(count)
}

/// Count DCI strings: the last byte of each string has its high bit flipped.
/// All strings must share one polarity.
pub fn recognize_dci_strings(buf: &[u8], test: CharTest) -> Option<usize> {
    let (&first, &last) = (buf.first()?, buf.last()?);
    let expected_hi = first & 0x80;
    if last & 0x80 == expected_hi {
        return None;
    }
    scan_dci(buf.iter().copied(), expected_hi, test)
}

/// Count reverse DCI strings: stored back to front, so the flipped byte
/// comes first in memory. Only plain ASCII is recognized.
pub fn recognize_reverse_dci_strings(buf: &[u8]) -> Option<usize> {
    let (&first, &last) = (buf.first()?, buf.last()?);
    let expected_hi = last & 0x80;
    if first & 0x80 == expected_hi {
        return None;
    }
    scan_dci(
        buf.iter().rev().copied(),
        expected_hi,
        super::charset::is_printable_low_ascii,
    )
}

/// Check the structure of string data at `data[offset..offset + length]`.
/// The character encoding is not examined.
pub fn verify_string_data(
    data: &[u8],
    offset: usize,
    length: usize,
    format_type: FormatType,
) -> Result<(), StringVerifyError> {
    let buf = data
        .get(offset..offset + length)
        .ok_or(StringVerifyError::OutOfRange)?;
    match format_type {
        FormatType::StringGeneric | FormatType::StringReverse => Ok(()),
        FormatType::StringNullTerm => match memchr::memchr(0x00, buf) {
            Some(pos) if pos == buf.len() - 1 => Ok(()),
            Some(_) => Err(StringVerifyError::NullInsideNullTerm),
            None => Err(StringVerifyError::MissingNullTerm),
        },
        FormatType::StringL8 => match buf.first() {
            Some(&len) if len as usize == length - 1 => Ok(()),
            _ => Err(StringVerifyError::L8LengthMismatch),
        },
        FormatType::StringL16 => match buf.get(0..2) {
            Some(hdr) if u16::from_le_bytes([hdr[0], hdr[1]]) as usize == length - 2 => Ok(()),
            _ => Err(StringVerifyError::L16LengthMismatch),
        },
        FormatType::StringDci => {
            if length < 2 {
                return Err(StringVerifyError::DciTooShort);
            }
            let hi = buf[0] & 0x80;
            if buf[1..length - 1].iter().any(|&b| b & 0x80 != hi) {
                return Err(StringVerifyError::DciMixedData);
            }
            if buf[length - 1] & 0x80 == hi {
                return Err(StringVerifyError::DciNotTerminated);
            }
            Ok(())
        }
        other => Err(StringVerifyError::NotString(other)),
    }
}

/// True if `data[offset..offset + length]` exists and holds one repeated byte.
pub fn verify_fill_data(data: &[u8], offset: usize, length: usize) -> bool {
    match data.get(offset..offset + length) {
        Some(buf) if !buf.is_empty() => recognize_run(buf) == length,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strings::charset::{is_extended_low_ascii, is_extended_low_or_high_ascii};

    #[test]
    fn test_recognize_run() {
        assert_eq!(recognize_run(&[1, 1, 1, 2]), 3);
        assert_eq!(recognize_run(&[7]), 1);
        assert_eq!(recognize_run(&[]), 0);
    }

    #[test]
    fn test_counts() {
        let buf = b"Hi\xc8\xc9\x00";
        let counts = count_high_low_bytes(buf, is_extended_low_or_high_ascii);
        assert_eq!(counts, HighLowCounts { low: 2, high: 2, non_char: 1 });
        assert_eq!(count_character_bytes(buf, is_extended_low_ascii), 2);
    }

    #[test]
    fn test_null_terminated() {
        let test = is_extended_low_or_high_ascii;
        assert_eq!(recognize_null_terminated_strings(b"ABC\0\0DE\0", test, true), Some(2));
        assert_eq!(recognize_null_terminated_strings(b"ABC", test, true), None);
        // mixed polarity in one string
        assert_eq!(recognize_null_terminated_strings(b"A\xc2\0", test, true), None);
        assert_eq!(recognize_null_terminated_strings(b"A\xc2\0", test, false), Some(1));
        assert_eq!(recognize_null_terminated_strings(b"A\x01\0", test, false), None);
    }

    #[test]
    fn test_length_prefixed() {
        let test = is_extended_low_ascii;
        assert_eq!(recognize_len8_strings(b"\x03ABC\x00\x02HI", test, true), Some(2));
        assert_eq!(recognize_len8_strings(b"\x05ABC", test, true), None);
        assert_eq!(recognize_len16_strings(b"\x02\x00HI\x01\x00X", test, true), Some(2));
        assert_eq!(recognize_len16_strings(b"\x02\x00HI\x01", test, true), None);
    }

    #[test]
    fn test_dci() {
        let test = is_extended_low_ascii;
        // "HI" and "OK" with the last character high
        assert_eq!(recognize_dci_strings(b"H\xc9O\xcb", test), Some(2));
        // two terminators in a row
        assert_eq!(recognize_dci_strings(b"H\xc9\xcb", test), None);
        assert_eq!(recognize_dci_strings(b"HI", test), None);
        // reversed: "HI" stored as I|0x80, H
        assert_eq!(recognize_reverse_dci_strings(b"\xc9H"), Some(1));
        assert_eq!(recognize_reverse_dci_strings(b"IH"), None);
    }

    #[test]
    fn test_verify_string_data() {
        assert!(verify_string_data(b"AB\0", 0, 3, FormatType::StringNullTerm).is_ok());
        assert_eq!(
            verify_string_data(b"A\0B\0", 0, 4, FormatType::StringNullTerm),
            Err(StringVerifyError::NullInsideNullTerm)
        );
        assert_eq!(
            verify_string_data(b"ABC", 0, 3, FormatType::StringNullTerm),
            Err(StringVerifyError::MissingNullTerm)
        );
        assert!(verify_string_data(b"\x02AB", 0, 3, FormatType::StringL8).is_ok());
        assert_eq!(
            verify_string_data(b"\x03AB", 0, 3, FormatType::StringL8),
            Err(StringVerifyError::L8LengthMismatch)
        );
        assert!(verify_string_data(b"\x02\x00AB", 0, 4, FormatType::StringL16).is_ok());
        assert!(verify_string_data(b"AB\xc3", 0, 3, FormatType::StringDci).is_ok());
        assert_eq!(
            verify_string_data(b"A\xc2\xc3", 0, 3, FormatType::StringDci),
            Err(StringVerifyError::DciMixedData)
        );
        assert_eq!(
            verify_string_data(b"ABC", 0, 3, FormatType::StringDci),
            Err(StringVerifyError::DciNotTerminated)
        );
        assert_eq!(
            verify_string_data(b"A", 0, 1, FormatType::StringDci),
            Err(StringVerifyError::DciTooShort)
        );
        assert_eq!(
            verify_string_data(b"AB", 1, 4, FormatType::StringGeneric),
            Err(StringVerifyError::OutOfRange)
        );
        assert!(verify_string_data(b"AB", 0, 2, FormatType::Fill).is_err());
    }

    #[test]
    fn test_verify_fill() {
        assert!(verify_fill_data(&[0, 9, 9, 9], 1, 3));
        assert!(!verify_fill_data(&[0, 9, 9, 9], 0, 3));
        assert!(!verify_fill_data(&[9, 9], 1, 3));
    }
}
