//! # glaurung65
//!
//! Analysis core for a 6502 / 65C02 / 65816 disassembler. Given a byte image,
//! its placement in the address space and a few hints, the analyzers decide
//! which bytes are code, which are data, what the processor status is at
//! each instruction, and which operands refer to labels.
//!
//! ```ignore
//! use glaurung65::{Analyzer, AddressMap, AnalysisParameters, CpuDef, CpuType, TypeHint};
//!
//! let cpu = CpuDef::best_match(CpuType::Cpu65C02, false);
//! let map = AddressMap::single(image.len(), 0x2000)?;
//! let params = AnalysisParameters::default();
//! let mut hints = vec![TypeHint::None; image.len()];
//! hints[0] = TypeHint::Code;
//! let out = Analyzer::new(&image, &cpu, &map, &params)
//!     .with_type_hints(&hints)
//!     .run()?;
//! ```

pub mod analysis;
pub mod config;
pub mod core;
pub mod cpu;
pub mod error;
pub mod logging;
pub mod strings;
pub mod symbols;

pub use crate::analysis::{
    AnalysisOutput, Analyzer, CodeAnalysis, DataAnalysis, MessageEntry, MessageList, Plugin,
    PluginCaps,
};
pub use crate::config::{AnalysisParameters, AutoLabelStyle, TextScanMode};
pub use crate::core::{
    AddressMap, AddressMapEntry, Anattrib, AttribFlags, DefSymbol, FormatDescriptor,
    FormatSubType, FormatType, LabelAnnotation, Symbol, SymbolSource, SymbolType, TypeHint,
};
pub use crate::cpu::{CpuDef, CpuType, StatusFlags};
pub use crate::error::{Glaurung65Error, Result};
pub use crate::symbols::SymbolTable;
