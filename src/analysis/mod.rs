//! Analysis passes over a 65xx byte image.
//!
//! [`CodeAnalysis`] traces execution from the hinted entry points and marks
//! instructions, [`DataAnalysis`] turns operand references into labels and
//! formats the remaining bytes, and [`Analyzer`] runs both with the project's
//! labels, formats and symbol files applied in between.

use std::fmt;

pub mod code;
pub mod data;
pub mod messages;
pub mod pipeline;
pub mod plugin;

pub use code::{default_entry_flags, CodeAnalysis};
pub use data::{read_word, DataAnalysis, AUTO_LABEL_PREFIX};
pub use messages::{MessageEntry, MessageList, MessageType, Resolution, Severity};
pub use pipeline::{AnalysisOutput, Analyzer};
pub use plugin::{AnalyzerApi, Plugin, PluginCaps, PluginError};

/// File offset in the `+001234` form used in log output.
pub(crate) struct OffsetFmt(pub usize);

impl fmt::Display for OffsetFmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{:06x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::OffsetFmt;

    #[test]
    fn test_offset_format() {
        assert_eq!(OffsetFmt(0x1234).to_string(), "+001234");
        assert_eq!(OffsetFmt(0x1234567).to_string(), "+1234567");
    }
}
