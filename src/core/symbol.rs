//! Symbols and symbol definitions.
//!
//! A [`Symbol`] names a value: an address the code refers to, or a constant.
//! A [`DefSymbol`] is a symbol defined outside the code (project and platform
//! definitions, local variables) that also carries a width, display format,
//! I/O direction and an optional address mask for registers that repeat
//! across the address space.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::core::format_descriptor::{FormatDescriptor, FormatSubType};
use crate::error::{Glaurung65Error, Result};

/// Longest accepted label.
pub const MAX_LABEL_LEN: usize = 255;

/// Where a symbol came from.
///
/// Variants are declared in priority order: when several symbols claim an
/// address, the one whose source compares lowest wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum SymbolSource {
    /// Label placed by the user
    User,
    /// Project-level definition
    Project,
    /// Definition loaded from a platform symbol file
    Platform,
    /// Label generated by analysis
    Auto,
    /// Local variable definition
    Variable,
}

/// What kind of value a symbol names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolType {
    LocalOrGlobalAddr,
    NonUniqueLocalAddr,
    GlobalAddr,
    GlobalAddrExport,
    ExternalAddr,
    Constant,
}

/// Display annotation on a label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelAnnotation {
    #[default]
    None,
    Uncertain,
    Generated,
}

impl SymbolSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolSource::User => "User",
            SymbolSource::Project => "Project",
            SymbolSource::Platform => "Platform",
            SymbolSource::Auto => "Auto",
            SymbolSource::Variable => "Variable",
        }
    }

    fn code(&self) -> char {
        match self {
            SymbolSource::User => 'U',
            SymbolSource::Project => 'R',
            SymbolSource::Platform => 'P',
            SymbolSource::Auto => 'A',
            SymbolSource::Variable => 'V',
        }
    }
}

impl SymbolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolType::LocalOrGlobalAddr => "LocalOrGlobalAddr",
            SymbolType::NonUniqueLocalAddr => "NonUniqueLocalAddr",
            SymbolType::GlobalAddr => "GlobalAddr",
            SymbolType::GlobalAddrExport => "GlobalAddrExport",
            SymbolType::ExternalAddr => "ExternalAddr",
            SymbolType::Constant => "Constant",
        }
    }

    fn code(&self) -> char {
        match self {
            SymbolType::LocalOrGlobalAddr => 'L',
            SymbolType::NonUniqueLocalAddr => 'N',
            SymbolType::GlobalAddr => 'G',
            SymbolType::GlobalAddrExport => 'X',
            SymbolType::ExternalAddr => 'E',
            SymbolType::Constant => 'C',
        }
    }
}

impl LabelAnnotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelAnnotation::None => "None",
            LabelAnnotation::Uncertain => "Uncertain",
            LabelAnnotation::Generated => "Generated",
        }
    }
}

macro_rules! named_enum {
    ($ty:ident, [$($variant:ident),* $(,)?]) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Glaurung65Error;

            fn from_str(s: &str) -> Result<Self> {
                [$($ty::$variant),*]
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| {
                        Glaurung65Error::InvalidInput(format!(
                            "unknown {} '{}'",
                            stringify!($ty),
                            s
                        ))
                    })
            }
        }
    };
}

named_enum!(SymbolSource, [User, Project, Platform, Auto, Variable]);
named_enum!(
    SymbolType,
    [
        LocalOrGlobalAddr,
        NonUniqueLocalAddr,
        GlobalAddr,
        GlobalAddrExport,
        ExternalAddr,
        Constant
    ]
);
named_enum!(LabelAnnotation, [None, Uncertain, Generated]);

/// Check label syntax: a letter or underscore, then letters, digits and
/// underscores.
pub fn is_valid_label(label: &str) -> bool {
    let mut chars = label.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    label.len() <= MAX_LABEL_LEN && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A named value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub label: String,
    pub value: u32,
    pub source: SymbolSource,
    pub sym_type: SymbolType,
    #[serde(default)]
    pub anno: LabelAnnotation,
}

impl Symbol {
    /// Create a symbol.
    ///
    /// # Errors
    /// Returns [`Glaurung65Error::InvalidInput`] if the label is malformed.
    pub fn new(
        label: impl Into<String>,
        value: u32,
        source: SymbolSource,
        sym_type: SymbolType,
        anno: LabelAnnotation,
    ) -> Result<Self> {
        let label = label.into();
        if !is_valid_label(&label) {
            return Err(Glaurung65Error::InvalidInput(format!(
                "invalid label '{}'",
                label
            )));
        }
        Ok(Symbol {
            label,
            value,
            source,
            sym_type,
            anno,
        })
    }

    /// True for labels that live in the code (user and auto labels).
    pub fn is_internal_label(&self) -> bool {
        matches!(self.source, SymbolSource::User | SymbolSource::Auto)
    }

    pub fn is_constant(&self) -> bool {
        self.sym_type == SymbolType::Constant
    }

    /// Two-letter source/type code, e.g. "UL" or "PC".
    pub fn source_type_string(&self) -> String {
        let mut s = String::with_capacity(2);
        s.push(self.source.code());
        s.push(self.sym_type.code());
        s
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{{{},{},val=${:04x}}}",
            self.label, self.source, self.sym_type, self.value
        )
    }
}

bitflags! {
    /// I/O direction of a memory-mapped definition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DirectionFlags: u8 {
        const READ = 1 << 1;
        const WRITE = 1 << 2;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

impl Default for DirectionFlags {
    fn default() -> Self {
        DirectionFlags::READ_WRITE
    }
}

/// Address mask for a register that appears at many addresses.
///
/// An address `a` matches when `a & compare_mask == compare_value`; the
/// symbol's own value is then compared against `a & address_mask`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct MultiAddressMask {
    pub compare_mask: u32,
    pub compare_value: u32,
    pub address_mask: u32,
}

impl MultiAddressMask {
    /// # Errors
    /// The compare value must fit inside the compare mask, and the masks must
    /// not overlap.
    pub fn new(compare_mask: u32, compare_value: u32, address_mask: u32) -> Result<Self> {
        if compare_value & !compare_mask != 0 {
            return Err(Glaurung65Error::InvalidInput(format!(
                "compare value ${:x} has bits outside mask ${:x}",
                compare_value, compare_mask
            )));
        }
        if compare_mask & address_mask != 0 {
            return Err(Glaurung65Error::InvalidInput(format!(
                "compare mask ${:x} overlaps address mask ${:x}",
                compare_mask, address_mask
            )));
        }
        Ok(MultiAddressMask {
            compare_mask,
            compare_value,
            address_mask,
        })
    }

    /// True if `addr` falls in the masked range.
    pub fn matches(&self, addr: u32) -> bool {
        addr & self.compare_mask == self.compare_value
    }
}

impl fmt::Display for MultiAddressMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cmp=${:x}/${:x} addr=${:x}",
            self.compare_mask, self.compare_value, self.address_mask
        )
    }
}

/// A symbol defined outside the code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefSymbol {
    symbol: Symbol,
    data_descriptor: Arc<FormatDescriptor>,
    has_width: bool,
    pub comment: String,
    pub tag: String,
    direction: DirectionFlags,
    multi_mask: Option<MultiAddressMask>,
    /// Position of the defining platform file in load order
    pub load_ordinal: i32,
    /// Name of the defining file
    pub file_ident: String,
}

impl DefSymbol {
    /// Create a one-byte hex definition with read/write direction.
    pub fn new(symbol: Symbol) -> Result<Self> {
        Ok(DefSymbol {
            symbol,
            data_descriptor: FormatDescriptor::create_symbol_width(1, FormatSubType::Hex)?,
            has_width: false,
            comment: String::new(),
            tag: String::new(),
            direction: DirectionFlags::READ_WRITE,
            multi_mask: None,
            load_ordinal: 0,
            file_ident: String::new(),
        })
    }

    /// Set an explicit width. Constants ignore it.
    pub fn with_width(mut self, width: usize) -> Result<Self> {
        if self.symbol.is_constant() {
            return Ok(self);
        }
        self.data_descriptor =
            FormatDescriptor::create_symbol_width(width, self.data_descriptor.sub_type())?;
        self.has_width = true;
        Ok(self)
    }

    /// Set the display base or character format.
    pub fn with_display(mut self, sub_type: FormatSubType) -> Result<Self> {
        self.data_descriptor =
            FormatDescriptor::create_symbol_width(self.data_descriptor.length(), sub_type)?;
        Ok(self)
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Set the I/O direction.
    ///
    /// # Errors
    /// A definition must be readable, writable or both.
    pub fn with_direction(mut self, direction: DirectionFlags) -> Result<Self> {
        if direction.is_empty() {
            return Err(Glaurung65Error::InvalidInput(format!(
                "symbol '{}' has no I/O direction",
                self.symbol.label
            )));
        }
        self.direction = direction;
        Ok(self)
    }

    /// Attach an address mask. Constants ignore it.
    pub fn with_multi_mask(mut self, mask: MultiAddressMask) -> Self {
        if !self.symbol.is_constant() {
            self.multi_mask = Some(mask);
        }
        self
    }

    pub fn with_origin(mut self, load_ordinal: i32, file_ident: impl Into<String>) -> Self {
        self.load_ordinal = load_ordinal;
        self.file_ident = file_ident.into();
        self
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn data_descriptor(&self) -> &Arc<FormatDescriptor> {
        &self.data_descriptor
    }

    /// Number of bytes covered by the definition.
    pub fn width(&self) -> usize {
        self.data_descriptor.length()
    }

    /// True if a width was given explicitly.
    pub fn has_width(&self) -> bool {
        self.has_width
    }

    pub fn direction(&self) -> DirectionFlags {
        self.direction
    }

    pub fn multi_mask(&self) -> Option<&MultiAddressMask> {
        self.multi_mask.as_ref()
    }

    /// True if this definition and the range `value..value+width` of the same
    /// symbol type share at least one value.
    pub fn check_overlap(&self, value: u32, width: usize, sym_type: SymbolType) -> bool {
        if width == 0 || self.symbol.sym_type != sym_type {
            return false;
        }
        let start = self.symbol.value.max(value) as u64;
        let end = (self.symbol.value as u64 + self.width() as u64 - 1)
            .min(value as u64 + width as u64 - 1);
        start <= end
    }
}

impl Deref for DefSymbol {
    type Target = Symbol;

    fn deref(&self) -> &Symbol {
        &self.symbol
    }
}

impl fmt::Display for DefSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} width={} {:?}", self.symbol, self.width(), self.direction)?;
        if let Some(mask) = &self.multi_mask {
            write!(f, " {}", mask)?;
        }
        Ok(())
    }
}

/// Entry stored in a symbol table: a plain label or a full definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableSymbol {
    Label(Symbol),
    Def(DefSymbol),
}

impl TableSymbol {
    pub fn def_symbol(&self) -> Option<&DefSymbol> {
        match self {
            TableSymbol::Label(_) => None,
            TableSymbol::Def(def) => Some(def),
        }
    }

    /// Number of addresses covered.
    pub fn width(&self) -> usize {
        self.def_symbol().map_or(1, |d| d.width())
    }

    pub fn direction(&self) -> DirectionFlags {
        self.def_symbol()
            .map_or(DirectionFlags::READ_WRITE, |d| d.direction())
    }

    pub fn load_ordinal(&self) -> i32 {
        self.def_symbol().map_or(0, |d| d.load_ordinal)
    }

    pub fn multi_mask(&self) -> Option<&MultiAddressMask> {
        self.def_symbol().and_then(|d| d.multi_mask())
    }
}

impl Deref for TableSymbol {
    type Target = Symbol;

    fn deref(&self) -> &Symbol {
        match self {
            TableSymbol::Label(sym) => sym,
            TableSymbol::Def(def) => def.symbol(),
        }
    }
}

impl From<Symbol> for TableSymbol {
    fn from(sym: Symbol) -> Self {
        TableSymbol::Label(sym)
    }
}

impl From<DefSymbol> for TableSymbol {
    fn from(def: DefSymbol) -> Self {
        TableSymbol::Def(def)
    }
}

impl fmt::Display for TableSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableSymbol::Label(sym) => sym.fmt(f),
            TableSymbol::Def(def) => def.fmt(f),
        }
    }
}

/// Compare two symbols claiming `addr`; `Less` means `a` is preferred.
///
/// Order: source, then later platform file, then the nearer defining value,
/// then label.
pub fn compare_priority(a: &TableSymbol, b: &TableSymbol, addr: u32) -> Ordering {
    a.source
        .cmp(&b.source)
        .then_with(|| {
            if a.source == SymbolSource::Platform {
                b.load_ordinal().cmp(&a.load_ordinal())
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| {
            let da = addr.wrapping_sub(a.value) & 0xffff;
            let db = addr.wrapping_sub(b.value) & 0xffff;
            da.cmp(&db)
        })
        .then_with(|| a.label.cmp(&b.label))
}
