//! # Symbols Module
//!
//! The symbol registry shared by the analysis passes. Symbol value types live
//! in [`crate::core::symbol`]; this module holds the indexed table.

pub mod table;

pub use table::{SymbolTable, MAX_UNIQUE_SUFFIX};
