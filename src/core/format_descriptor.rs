//! Format descriptors: how a run of bytes should be presented.
//!
//! A descriptor is an immutable value. Attribute records and symbols hold it
//! through an `Arc`, and "changing the format" means building a replacement
//! and swapping the reference. The most common one-byte descriptors are
//! prefabricated so that the analyzers, which attach one per uncategorized
//! byte, share a handful of allocations instead of creating thousands.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Glaurung65Error, Result};

/// Maximum length of a numeric item, in bytes.
pub const MAX_NUMERIC_LEN: usize = 4;

/// Primary interpretation of a byte run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormatType {
    /// Unformatted single byte
    Default,
    /// 1-4 byte number, little-endian
    NumericLE,
    /// 1-4 byte number, big-endian
    NumericBE,
    /// Character string
    StringGeneric,
    /// Character string stored in reverse order
    StringReverse,
    /// String terminated by a zero byte
    StringNullTerm,
    /// String preceded by an 8-bit length
    StringL8,
    /// String preceded by a 16-bit little-endian length
    StringL16,
    /// String whose last byte has the high bit flipped
    StringDci,
    /// Raw bytes, shown as compactly as possible
    Dense,
    /// Repeated single byte value
    Fill,
    /// Bytes with no meaning, optionally used for alignment
    Junk,
}

/// Secondary interpretation qualifying a [`FormatType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormatSubType {
    None,
    /// Placeholder for character data whose encoding is not yet known
    AsciiGeneric,
    Hex,
    Decimal,
    Binary,
    /// Address with no symbol assigned yet
    Address,
    /// Reference to a symbol by name
    Symbol,
    /// ASCII, high bit clear
    Ascii,
    /// ASCII, high bit set
    HighAscii,
    C64Petscii,
    C64Screen,
    Ignore,
    Align2,
    Align4,
    Align8,
    Align16,
    Align32,
    Align64,
    Align128,
    Align256,
    Align512,
    Align1024,
    Align2048,
    Align4096,
    Align8192,
    Align16384,
    Align32768,
    Align65536,
}

const ALIGNMENTS: [FormatSubType; 16] = [
    FormatSubType::Align2,
    FormatSubType::Align4,
    FormatSubType::Align8,
    FormatSubType::Align16,
    FormatSubType::Align32,
    FormatSubType::Align64,
    FormatSubType::Align128,
    FormatSubType::Align256,
    FormatSubType::Align512,
    FormatSubType::Align1024,
    FormatSubType::Align2048,
    FormatSubType::Align4096,
    FormatSubType::Align8192,
    FormatSubType::Align16384,
    FormatSubType::Align32768,
    FormatSubType::Align65536,
];

impl FormatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatType::Default => "Default",
            FormatType::NumericLE => "NumericLE",
            FormatType::NumericBE => "NumericBE",
            FormatType::StringGeneric => "StringGeneric",
            FormatType::StringReverse => "StringReverse",
            FormatType::StringNullTerm => "StringNullTerm",
            FormatType::StringL8 => "StringL8",
            FormatType::StringL16 => "StringL16",
            FormatType::StringDci => "StringDci",
            FormatType::Dense => "Dense",
            FormatType::Fill => "Fill",
            FormatType::Junk => "Junk",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FormatType::NumericLE | FormatType::NumericBE)
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            FormatType::StringGeneric
                | FormatType::StringReverse
                | FormatType::StringNullTerm
                | FormatType::StringL8
                | FormatType::StringL16
                | FormatType::StringDci
        )
    }
}

impl FormatSubType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatSubType::None => "None",
            FormatSubType::AsciiGeneric => "AsciiGeneric",
            FormatSubType::Hex => "Hex",
            FormatSubType::Decimal => "Decimal",
            FormatSubType::Binary => "Binary",
            FormatSubType::Address => "Address",
            FormatSubType::Symbol => "Symbol",
            FormatSubType::Ascii => "Ascii",
            FormatSubType::HighAscii => "HighAscii",
            FormatSubType::C64Petscii => "C64Petscii",
            FormatSubType::C64Screen => "C64Screen",
            FormatSubType::Ignore => "Ignore",
            FormatSubType::Align2 => "Align2",
            FormatSubType::Align4 => "Align4",
            FormatSubType::Align8 => "Align8",
            FormatSubType::Align16 => "Align16",
            FormatSubType::Align32 => "Align32",
            FormatSubType::Align64 => "Align64",
            FormatSubType::Align128 => "Align128",
            FormatSubType::Align256 => "Align256",
            FormatSubType::Align512 => "Align512",
            FormatSubType::Align1024 => "Align1024",
            FormatSubType::Align2048 => "Align2048",
            FormatSubType::Align4096 => "Align4096",
            FormatSubType::Align8192 => "Align8192",
            FormatSubType::Align16384 => "Align16384",
            FormatSubType::Align32768 => "Align32768",
            FormatSubType::Align65536 => "Align65536",
        }
    }

    /// Alignment in bytes for the `AlignN` sub-types.
    pub fn alignment(&self) -> Option<u32> {
        ALIGNMENTS
            .iter()
            .position(|a| a == self)
            .map(|i| 2u32 << i)
    }

    /// `AlignN` sub-type for a power-of-two alignment.
    pub fn for_alignment(align: u32) -> Option<FormatSubType> {
        if align < 2 || !align.is_power_of_two() {
            return None;
        }
        ALIGNMENTS
            .get(align.trailing_zeros() as usize - 1)
            .copied()
    }

    pub fn is_alignment(&self) -> bool {
        self.alignment().is_some()
    }

    pub fn is_string_or_character(&self) -> bool {
        matches!(
            self,
            FormatSubType::AsciiGeneric
                | FormatSubType::Ascii
                | FormatSubType::HighAscii
                | FormatSubType::C64Petscii
                | FormatSubType::C64Screen
        )
    }

    /// Sub-type that displays numbers in `base` (2, 10 or 16).
    pub fn for_base(base: u32) -> FormatSubType {
        match base {
            2 => FormatSubType::Binary,
            10 => FormatSubType::Decimal,
            _ => FormatSubType::Hex,
        }
    }
}

macro_rules! name_impls {
    ($ty:ident, [$($variant:ident),* $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Glaurung65Error;

            fn from_str(s: &str) -> Result<Self> {
                $(
                    if s == $ty::$variant.as_str() {
                        return Ok($ty::$variant);
                    }
                )*
                Err(Glaurung65Error::InvalidInput(format!(
                    "unknown {} '{}'",
                    stringify!($ty),
                    s
                )))
            }
        }
    };
}

name_impls!(
    FormatType,
    [
        Default,
        NumericLE,
        NumericBE,
        StringGeneric,
        StringReverse,
        StringNullTerm,
        StringL8,
        StringL16,
        StringDci,
        Dense,
        Fill,
        Junk
    ]
);

name_impls!(
    FormatSubType,
    [
        None,
        AsciiGeneric,
        Hex,
        Decimal,
        Binary,
        Address,
        Symbol,
        Ascii,
        HighAscii,
        C64Petscii,
        C64Screen,
        Ignore,
        Align2,
        Align4,
        Align8,
        Align16,
        Align32,
        Align64,
        Align128,
        Align256,
        Align512,
        Align1024,
        Align2048,
        Align4096,
        Align8192,
        Align16384,
        Align32768,
        Align65536
    ]
);

/// Which part of a symbol's value an operand uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolPart {
    #[default]
    Low,
    High,
    Bank,
}

/// Reference to a symbol by label.
///
/// The reference is by name so that descriptors survive symbol table
/// rebuilds; a label that no longer resolves is simply shown numerically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeakSymbolRef {
    pub label: String,
    pub part: SymbolPart,
}

impl WeakSymbolRef {
    pub fn new(label: impl Into<String>, part: SymbolPart) -> Self {
        WeakSymbolRef {
            label: label.into(),
            part,
        }
    }
}

impl fmt::Display for WeakSymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.label, self.part)
    }
}

/// Immutable presentation directive for a byte range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatDescriptor {
    length: usize,
    format_type: FormatType,
    sub_type: FormatSubType,
    symbol_ref: Option<WeakSymbolRef>,
}

fn prefab(format_type: FormatType, sub_type: FormatSubType) -> Arc<FormatDescriptor> {
    Arc::new(FormatDescriptor {
        length: 1,
        format_type,
        sub_type,
        symbol_ref: None,
    })
}

static ONE_DEFAULT: Lazy<Arc<FormatDescriptor>> =
    Lazy::new(|| prefab(FormatType::Default, FormatSubType::None));
static ONE_NONE: Lazy<Arc<FormatDescriptor>> =
    Lazy::new(|| prefab(FormatType::NumericLE, FormatSubType::None));
static ONE_HEX: Lazy<Arc<FormatDescriptor>> =
    Lazy::new(|| prefab(FormatType::NumericLE, FormatSubType::Hex));
static ONE_DECIMAL: Lazy<Arc<FormatDescriptor>> =
    Lazy::new(|| prefab(FormatType::NumericLE, FormatSubType::Decimal));
static ONE_BINARY: Lazy<Arc<FormatDescriptor>> =
    Lazy::new(|| prefab(FormatType::NumericLE, FormatSubType::Binary));
static ONE_LOW_ASCII: Lazy<Arc<FormatDescriptor>> =
    Lazy::new(|| prefab(FormatType::NumericLE, FormatSubType::Ascii));

impl FormatDescriptor {
    /// Create a descriptor.
    ///
    /// One-byte `Default` and common one-byte `NumericLE` descriptors are
    /// returned as shared instances.
    ///
    /// # Errors
    /// Returns an error for a zero length, an over-long numeric item, a
    /// `Default` item longer than one byte, a `Symbol` sub-type (use
    /// [`FormatDescriptor::create_symbol`]) or a sub-type that does not go with
    /// the primary type.
    pub fn create(
        length: usize,
        format_type: FormatType,
        sub_type: FormatSubType,
    ) -> Result<Arc<FormatDescriptor>> {
        validate(length, format_type, sub_type)?;
        if length == 1 {
            let shared = match (format_type, sub_type) {
                (FormatType::Default, _) => Some(&ONE_DEFAULT),
                (FormatType::NumericLE, FormatSubType::None) => Some(&ONE_NONE),
                (FormatType::NumericLE, FormatSubType::Hex) => Some(&ONE_HEX),
                (FormatType::NumericLE, FormatSubType::Decimal) => Some(&ONE_DECIMAL),
                (FormatType::NumericLE, FormatSubType::Binary) => Some(&ONE_BINARY),
                (FormatType::NumericLE, FormatSubType::Ascii) => Some(&ONE_LOW_ASCII),
                _ => None,
            };
            if let Some(shared) = shared {
                return Ok(Arc::clone(shared));
            }
        }
        Ok(Arc::new(FormatDescriptor {
            length,
            format_type,
            sub_type,
            symbol_ref: None,
        }))
    }

    /// Create a numeric descriptor that refers to a symbol.
    pub fn create_symbol(
        length: usize,
        symbol_ref: WeakSymbolRef,
        big_endian: bool,
    ) -> Result<Arc<FormatDescriptor>> {
        if length == 0 || length > MAX_NUMERIC_LEN {
            return Err(Glaurung65Error::InvalidDescriptor(format!(
                "bad length {} for symbol reference",
                length
            )));
        }
        if symbol_ref.label.is_empty() {
            return Err(Glaurung65Error::InvalidDescriptor(
                "symbol reference without a label".to_string(),
            ));
        }
        Ok(Arc::new(FormatDescriptor {
            length,
            format_type: if big_endian {
                FormatType::NumericBE
            } else {
                FormatType::NumericLE
            },
            sub_type: FormatSubType::Symbol,
            symbol_ref: Some(symbol_ref),
        }))
    }

    /// Descriptor giving the width and display base of a defined symbol.
    ///
    /// Symbol widths are not bound by [`MAX_NUMERIC_LEN`]; a symbol may
    /// describe a table of up to 64KB.
    pub fn create_symbol_width(width: usize, sub_type: FormatSubType) -> Result<Arc<FormatDescriptor>> {
        if width == 0 || width > 65536 {
            return Err(Glaurung65Error::InvalidDescriptor(format!(
                "symbol width {} out of range",
                width
            )));
        }
        if !matches!(
            sub_type,
            FormatSubType::None
                | FormatSubType::Hex
                | FormatSubType::Decimal
                | FormatSubType::Binary
                | FormatSubType::Ascii
                | FormatSubType::HighAscii
                | FormatSubType::C64Petscii
                | FormatSubType::C64Screen
                | FormatSubType::Address
        ) {
            return Err(Glaurung65Error::InvalidDescriptor(format!(
                "sub-type {} not usable for a symbol definition",
                sub_type
            )));
        }
        if width <= MAX_NUMERIC_LEN {
            return FormatDescriptor::create(width, FormatType::NumericLE, sub_type);
        }
        Ok(Arc::new(FormatDescriptor {
            length: width,
            format_type: FormatType::NumericLE,
            sub_type,
            symbol_ref: None,
        }))
    }

    /// The shared one-byte unformatted descriptor.
    pub fn one_byte_default() -> Arc<FormatDescriptor> {
        Arc::clone(&ONE_DEFAULT)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn format_type(&self) -> FormatType {
        self.format_type
    }

    pub fn sub_type(&self) -> FormatSubType {
        self.sub_type
    }

    pub fn symbol_ref(&self) -> Option<&WeakSymbolRef> {
        self.symbol_ref.as_ref()
    }

    pub fn is_numeric(&self) -> bool {
        self.format_type.is_numeric()
    }

    pub fn is_string(&self) -> bool {
        self.format_type.is_string()
    }

    pub fn is_string_or_character(&self) -> bool {
        self.sub_type.is_string_or_character()
    }

    pub fn has_symbol(&self) -> bool {
        self.symbol_ref.is_some()
    }

    pub fn has_symbol_or_address(&self) -> bool {
        self.has_symbol() || self.sub_type == FormatSubType::Address
    }

    /// Instruction operands can only use unformatted or little-endian numeric
    /// descriptors.
    pub fn is_valid_for_instruction(&self) -> bool {
        matches!(
            self.format_type,
            FormatType::Default | FormatType::NumericLE
        )
    }

    /// Display base of a numeric descriptor; 16 for anything else.
    pub fn num_base(&self) -> u32 {
        match self.sub_type {
            FormatSubType::Decimal => 10,
            FormatSubType::Binary => 2,
            _ => 16,
        }
    }

    /// Short description for the user interface.
    pub fn to_ui_string(&self) -> String {
        if self.is_string() {
            let charset = match self.sub_type {
                FormatSubType::Ascii => "ASCII",
                FormatSubType::HighAscii => "ASCII (high)",
                FormatSubType::C64Petscii => "C64 PETSCII",
                FormatSubType::C64Screen => "C64 Screen",
                _ => "???",
            };
            let framing = match self.format_type {
                FormatType::StringGeneric => "string",
                FormatType::StringReverse => "string (reverse)",
                FormatType::StringNullTerm => "string (null term)",
                FormatType::StringL8 => "string (1-byte len)",
                FormatType::StringL16 => "string (2-byte len)",
                FormatType::StringDci => "string (DCI)",
                _ => "???",
            };
            return format!("{} {}", charset, framing);
        }

        if self.format_type == FormatType::Junk {
            return match self.sub_type.alignment() {
                Some(align) => format!("Alignment to {} bytes", align),
                None => "Junk".to_string(),
            };
        }

        match self.sub_type {
            FormatSubType::None => match self.format_type {
                FormatType::Default | FormatType::NumericLE => "Numeric (little-endian)",
                FormatType::NumericBE => "Numeric (big-endian)",
                FormatType::Dense => "Dense",
                FormatType::Fill => "Fill",
                _ => "???",
            }
            .to_string(),
            FormatSubType::Hex => "Numeric, Hex".to_string(),
            FormatSubType::Decimal => "Numeric, Decimal".to_string(),
            FormatSubType::Binary => "Numeric, Binary".to_string(),
            FormatSubType::Address => "Address".to_string(),
            FormatSubType::Symbol => match &self.symbol_ref {
                Some(sym) => format!("Symbol \"{}\"", sym.label),
                None => "Symbol".to_string(),
            },
            FormatSubType::Ascii => "Numeric, ASCII".to_string(),
            FormatSubType::HighAscii => "Numeric, ASCII (high)".to_string(),
            FormatSubType::C64Petscii => "Numeric, C64 PETSCII".to_string(),
            FormatSubType::C64Screen => "Numeric, C64 Screen".to_string(),
            FormatSubType::Ignore => "Fill (ignored)".to_string(),
            _ => "???".to_string(),
        }
    }
}

fn validate(length: usize, format_type: FormatType, sub_type: FormatSubType) -> Result<()> {
    let bad = |why: &str| {
        Err(Glaurung65Error::InvalidDescriptor(format!(
            "{} (len={} type={} sub={})",
            why, length, format_type, sub_type
        )))
    };
    if length == 0 {
        return bad("zero length");
    }
    if sub_type.is_alignment() && format_type != FormatType::Junk {
        return bad("alignment sub-type on non-junk item");
    }
    if sub_type == FormatSubType::Symbol {
        return bad("symbol sub-type requires a symbol reference");
    }
    match format_type {
        FormatType::Default => {
            if length != 1 || sub_type != FormatSubType::None {
                return bad("default items are single unformatted bytes");
            }
        }
        FormatType::NumericLE | FormatType::NumericBE => {
            if length > MAX_NUMERIC_LEN {
                return bad("numeric item too long");
            }
            if sub_type == FormatSubType::Ignore {
                return bad("numeric items cannot be ignored");
            }
        }
        FormatType::Dense => {
            if sub_type != FormatSubType::None {
                return bad("dense items take no sub-type");
            }
        }
        FormatType::Fill => {
            if sub_type != FormatSubType::None && sub_type != FormatSubType::Ignore {
                return bad("fill items take no sub-type");
            }
        }
        FormatType::Junk => {
            if sub_type != FormatSubType::None && !sub_type.is_alignment() {
                return bad("junk items take only alignment sub-types");
            }
        }
        _ => {
            if !sub_type.is_string_or_character() {
                return bad("string items need a character encoding");
            }
        }
    }
    Ok(())
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[FmtDesc: len={} fmt={} sub={}",
            self.length, self.format_type, self.sub_type
        )?;
        if let Some(sym) = &self.symbol_ref {
            write!(f, " sym={}", sym)?;
        }
        write!(f, "]")
    }
}
