//! Extension hooks consulted by the flow analyzer.
//!
//! A plugin recognizes calls that do not behave like ordinary subroutine
//! calls: a `JSR` followed by an inline parameter block, a `BRK` used as a
//! system call, a call that never returns. The analyzer asks every plugin
//! that declares the matching capability and combines the answers. While a
//! check runs the plugin may format the call's operand or declare the bytes
//! after the call as inline data through [`AnalyzerApi`].
//!
//! Plugins run inside the analyzer's call stack, one call at a time. They do
//! not need to be `Send` or reentrant.

use bitflags::bitflags;
use thiserror::Error;

use crate::core::format_descriptor::{FormatSubType, FormatType};

bitflags! {
    /// Checks a plugin wants to receive.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct PluginCaps: u8 {
        const JSR = 1 << 0;
        const JSL = 1 << 1;
        const BRK = 1 << 2;
    }
}

/// Errors raised by plugins or by the analyzer callbacks on a contract
/// violation. The analyzer logs them and treats the plugin as silent for
/// that call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PluginError {
    #[error("bad arguments: {0}")]
    BadArgs(String),
    #[error("unsupported format: {0}")]
    Unsupported(String),
    #[error("plugin failed: {0}")]
    Failed(String),
}

/// Analyzer state visible to a plugin during a check.
pub trait AnalyzerApi {
    /// The whole byte image.
    fn data(&self) -> &[u8];

    /// Address of the byte at `offset`.
    fn offset_to_address(&self, offset: usize) -> Option<u32>;

    /// Set the display format of the operand of the instruction at `offset`.
    ///
    /// Returns `Ok(false)` if the request was refused: the offset is not an
    /// instruction start, it already has a format, or a symbol reference was
    /// requested without a label.
    fn set_operand_format(
        &mut self,
        offset: usize,
        sub_type: FormatSubType,
        label: Option<&str>,
    ) -> Result<bool, PluginError>;

    /// Declare `length` bytes at `offset` as inline data.
    ///
    /// Returns `Ok(false)` if the request was refused: the range crosses an
    /// address region boundary, overlaps code or an existing format, or
    /// the bytes do not hold the declared string or fill.
    fn set_inline_data_format(
        &mut self,
        offset: usize,
        length: usize,
        format_type: FormatType,
        sub_type: FormatSubType,
        label: Option<&str>,
    ) -> Result<bool, PluginError>;
}

/// An inline-call recognizer.
///
/// Each check returns the plugin's "no continue" vote: `true` if execution
/// does not resume after the instruction. Checks a plugin does not override
/// abstain with the neutral answer.
pub trait Plugin {
    fn name(&self) -> &str;

    fn capabilities(&self) -> PluginCaps;

    /// Called on the first visit to a `JSR abs`.
    fn check_jsr(
        &mut self,
        _api: &mut dyn AnalyzerApi,
        _offset: usize,
        _target: u32,
    ) -> Result<bool, PluginError> {
        Ok(false)
    }

    /// Called on the first visit to a `JSL`.
    fn check_jsl(
        &mut self,
        _api: &mut dyn AnalyzerApi,
        _offset: usize,
        _target: u32,
    ) -> Result<bool, PluginError> {
        Ok(false)
    }

    /// Called whenever a `BRK` is analyzed. `two_byte` is true when the CPU
    /// table decodes `BRK` with a signature byte.
    fn check_brk(
        &mut self,
        _api: &mut dyn AnalyzerApi,
        _offset: usize,
        _two_byte: bool,
    ) -> Result<bool, PluginError> {
        Ok(true)
    }
}
