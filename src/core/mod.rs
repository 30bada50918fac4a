//! Core data types for 65xx analysis.
//!
//! The address map places the byte image in the CPU's address space, the
//! attribute array records what the analyzers learn about each byte, and
//! format descriptors and symbols are the vocabulary the passes share.

pub mod address_map;
pub mod anattrib;
pub mod format_descriptor;
pub mod symbol;

pub use address_map::{AddressMap, AddressMapEntry};
pub use anattrib::{Anattrib, AttribFlags, TypeHint};
pub use format_descriptor::{
    FormatDescriptor, FormatSubType, FormatType, SymbolPart, WeakSymbolRef, MAX_NUMERIC_LEN,
};
pub use symbol::{
    DefSymbol, DirectionFlags, LabelAnnotation, MultiAddressMask, Symbol, SymbolSource,
    SymbolType, TableSymbol,
};
