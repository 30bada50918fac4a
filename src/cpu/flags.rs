//! Processor status flags with per-bit tri-state tracking.
//!
//! Every flag is tracked with two mask bits: one meaning "could be zero" and
//! one meaning "could be one". A flag with neither bit set has not been
//! specified; with both set it is indeterminate. Merging ORs the masks, so a
//! flag that disagrees between two paths becomes indeterminate and stays that
//! way until an override replaces it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Glaurung65Error, Result};

/// Pair of 16-bit masks holding one tri-state value per bit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TriState16 {
    zero: u16,
    one: u16,
}

/// State of a single tracked bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagState {
    /// Never set by anything
    Unspecified,
    /// Could be either value
    Indeterminate,
    Zero,
    One,
}

impl FlagState {
    pub fn from_bool(value: bool) -> Self {
        if value {
            FlagState::One
        } else {
            FlagState::Zero
        }
    }

    /// True for `Zero` and `One`.
    pub fn is_known(&self) -> bool {
        matches!(self, FlagState::Zero | FlagState::One)
    }
}

impl TriState16 {
    pub const fn new(zero: u16, one: u16) -> Self {
        TriState16 { zero, one }
    }

    pub fn zero_mask(&self) -> u16 {
        self.zero
    }

    pub fn one_mask(&self) -> u16 {
        self.one
    }

    pub fn get(&self, bit: u32) -> FlagState {
        let z = self.zero >> bit & 1 != 0;
        let o = self.one >> bit & 1 != 0;
        match (z, o) {
            (false, false) => FlagState::Unspecified,
            (true, true) => FlagState::Indeterminate,
            (true, false) => FlagState::Zero,
            (false, true) => FlagState::One,
        }
    }

    pub fn set(&mut self, bit: u32, state: FlagState) {
        let mask = 1u16 << bit;
        match state {
            FlagState::Unspecified => {
                self.zero &= !mask;
                self.one &= !mask;
            }
            FlagState::Indeterminate => {
                self.zero |= mask;
                self.one |= mask;
            }
            FlagState::Zero => {
                self.zero |= mask;
                self.one &= !mask;
            }
            FlagState::One => {
                self.zero &= !mask;
                self.one |= mask;
            }
        }
    }

    /// Merge another value in. Bits that disagree become indeterminate.
    pub fn merge(&mut self, other: TriState16) {
        self.zero |= other.zero;
        self.one |= other.one;
    }

    /// Replace every bit that `overrides` specifies.
    pub fn apply(&mut self, overrides: TriState16) {
        let keep = !(overrides.zero | overrides.one);
        self.zero = (self.zero & keep) | overrides.zero;
        self.one = (self.one & keep) | overrides.one;
    }
}

/// Bit positions within [`StatusFlags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagBit {
    C = 0,
    Z = 1,
    I = 2,
    D = 3,
    /// Index width on the 65816 native mode, break flag otherwise
    X = 4,
    M = 5,
    V = 6,
    N = 7,
    /// Emulation flag (65816 only)
    E = 8,
}

impl FlagBit {
    /// Bits that REP and SEP can touch, in processor status order.
    pub const REGISTER_BITS: [FlagBit; 8] = [
        FlagBit::C,
        FlagBit::Z,
        FlagBit::I,
        FlagBit::D,
        FlagBit::X,
        FlagBit::M,
        FlagBit::V,
        FlagBit::N,
    ];

    pub fn index(self) -> u32 {
        self as u32
    }
}

/// Symbolic processor status register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub struct StatusFlags(TriState16);

impl StatusFlags {
    /// Nothing specified.
    pub const DEFAULT: StatusFlags = StatusFlags(TriState16::new(0, 0));

    /// Every flag, including E, indeterminate.
    pub const ALL_INDETERMINATE: StatusFlags = StatusFlags(TriState16::new(0x01ff, 0x01ff));

    pub fn get(&self, bit: FlagBit) -> FlagState {
        self.0.get(bit.index())
    }

    pub fn set(&mut self, bit: FlagBit, state: FlagState) {
        self.0.set(bit.index(), state);
    }

    /// Builder-style variant of [`StatusFlags::set`].
    pub fn with(mut self, bit: FlagBit, state: FlagState) -> Self {
        self.set(bit, state);
        self
    }

    pub fn merge(&mut self, other: StatusFlags) {
        self.0.merge(other.0);
    }

    pub fn apply(&mut self, overrides: StatusFlags) {
        self.0.apply(overrides.0);
    }

    /// True when the accumulator and memory are 8 bits wide.
    pub fn is_short_m(&self) -> bool {
        self.get(FlagBit::E) == FlagState::One || self.get(FlagBit::M) != FlagState::Zero
    }

    /// True when the index registers are 8 bits wide.
    pub fn is_short_x(&self) -> bool {
        self.get(FlagBit::E) == FlagState::One || self.get(FlagBit::X) != FlagState::Zero
    }

    pub fn is_emulation_mode(&self) -> bool {
        self.get(FlagBit::E) == FlagState::One
    }

    /// Packed form: zero mask in the low half, one mask in the high half.
    pub fn as_u32(&self) -> u32 {
        self.0.zero as u32 | (self.0.one as u32) << 16
    }

    pub fn from_u32(value: u32) -> Result<Self> {
        if value & !0x01ff_01ff != 0 {
            return Err(Glaurung65Error::InvalidInput(format!(
                "status flags value {:#010x} has undefined bits",
                value
            )));
        }
        Ok(StatusFlags(TriState16::new(
            (value & 0xffff) as u16,
            (value >> 16) as u16,
        )))
    }

    /// Render as `NVMXDIZC E`, or `NV-BDIZC` style without M, X and E.
    pub fn to_display_string(&self, show_mxe: bool) -> String {
        fn ch(state: FlagState, name: char) -> char {
            match state {
                FlagState::Unspecified => '-',
                FlagState::Indeterminate => '?',
                FlagState::Zero => name.to_ascii_lowercase(),
                FlagState::One => name,
            }
        }
        let mut s = String::with_capacity(10);
        s.push(ch(self.get(FlagBit::N), 'N'));
        s.push(ch(self.get(FlagBit::V), 'V'));
        if show_mxe {
            s.push(ch(self.get(FlagBit::M), 'M'));
            s.push(ch(self.get(FlagBit::X), 'X'));
        }
        s.push(ch(self.get(FlagBit::D), 'D'));
        s.push(ch(self.get(FlagBit::I), 'I'));
        s.push(ch(self.get(FlagBit::Z), 'Z'));
        s.push(ch(self.get(FlagBit::C), 'C'));
        if show_mxe {
            s.push(' ');
            s.push(ch(self.get(FlagBit::E), 'E'));
        }
        s
    }
}

impl From<StatusFlags> for u32 {
    fn from(flags: StatusFlags) -> u32 {
        flags.as_u32()
    }
}

impl TryFrom<u32> for StatusFlags {
    type Error = Glaurung65Error;

    fn try_from(value: u32) -> Result<Self> {
        StatusFlags::from_u32(value)
    }
}

impl fmt::Display for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(pairs: &[(FlagBit, FlagState)]) -> StatusFlags {
        pairs
            .iter()
            .fold(StatusFlags::DEFAULT, |f, &(b, s)| f.with(b, s))
    }

    #[test]
    fn test_set_and_get() {
        let mut f = StatusFlags::DEFAULT;
        assert_eq!(f.get(FlagBit::C), FlagState::Unspecified);
        f.set(FlagBit::C, FlagState::One);
        assert_eq!(f.get(FlagBit::C), FlagState::One);
        f.set(FlagBit::C, FlagState::Zero);
        assert_eq!(f.get(FlagBit::C), FlagState::Zero);
        f.set(FlagBit::C, FlagState::Indeterminate);
        assert_eq!(f.get(FlagBit::C), FlagState::Indeterminate);
        assert_eq!(f.get(FlagBit::Z), FlagState::Unspecified);
    }

    #[test]
    fn test_merge_agreement_and_disagreement() {
        let a = flags(&[(FlagBit::C, FlagState::One), (FlagBit::Z, FlagState::Zero)]);
        let b = flags(&[(FlagBit::C, FlagState::One), (FlagBit::Z, FlagState::One)]);
        let mut m = a;
        m.merge(b);
        assert_eq!(m.get(FlagBit::C), FlagState::One);
        assert_eq!(m.get(FlagBit::Z), FlagState::Indeterminate);

        // commutative and idempotent
        let mut m2 = b;
        m2.merge(a);
        assert_eq!(m, m2);
        let mut m3 = m;
        m3.merge(m);
        assert_eq!(m3, m);
    }

    #[test]
    fn test_merge_is_sticky() {
        let mut f = flags(&[(FlagBit::N, FlagState::Indeterminate)]);
        f.merge(flags(&[(FlagBit::N, FlagState::One)]));
        assert_eq!(f.get(FlagBit::N), FlagState::Indeterminate);
    }

    #[test]
    fn test_apply_override() {
        let mut f = StatusFlags::ALL_INDETERMINATE;
        f.apply(flags(&[(FlagBit::M, FlagState::One), (FlagBit::X, FlagState::Zero)]));
        assert_eq!(f.get(FlagBit::M), FlagState::One);
        assert_eq!(f.get(FlagBit::X), FlagState::Zero);
        assert_eq!(f.get(FlagBit::C), FlagState::Indeterminate);
    }

    #[test]
    fn test_short_registers() {
        assert!(StatusFlags::DEFAULT.is_short_m());
        let native = flags(&[
            (FlagBit::E, FlagState::Zero),
            (FlagBit::M, FlagState::Zero),
            (FlagBit::X, FlagState::One),
        ]);
        assert!(!native.is_short_m());
        assert!(native.is_short_x());
        let emu = native.with(FlagBit::E, FlagState::One);
        assert!(emu.is_short_m());
    }

    #[test]
    fn test_packed_round_trip() {
        let f = flags(&[(FlagBit::E, FlagState::One), (FlagBit::D, FlagState::Zero)]);
        assert_eq!(StatusFlags::from_u32(f.as_u32()).unwrap(), f);
        assert!(StatusFlags::from_u32(0x0200_0000).is_err());
        assert_eq!(StatusFlags::ALL_INDETERMINATE.as_u32(), 0x01ff_01ff);

        let json = serde_json::to_string(&f).unwrap();
        assert_eq!(json, f.as_u32().to_string());
        let back: StatusFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
    }

    #[test]
    fn test_display() {
        let f = flags(&[
            (FlagBit::N, FlagState::One),
            (FlagBit::Z, FlagState::Zero),
            (FlagBit::C, FlagState::Indeterminate),
            (FlagBit::E, FlagState::One),
        ]);
        assert_eq!(f.to_string(), "N-----z? E");
        assert_eq!(f.to_display_string(false), "N---z?");
    }
}
