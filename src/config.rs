//! Analysis parameters threaded into the code and data passes.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Glaurung65Error, Result};

/// Character set used when looking for strings in uncategorized data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextScanMode {
    /// Plain 7-bit ASCII
    LowAscii,
    /// ASCII with or without the high bit set; a string keeps one case
    LowHighAscii,
    /// Commodore PETSCII
    C64Petscii,
    /// Commodore screen codes
    C64ScreenCode,
}

impl TextScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextScanMode::LowAscii => "LowAscii",
            TextScanMode::LowHighAscii => "LowHighAscii",
            TextScanMode::C64Petscii => "C64Petscii",
            TextScanMode::C64ScreenCode => "C64ScreenCode",
        }
    }
}

impl fmt::Display for TextScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextScanMode {
    type Err = Glaurung65Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LowAscii" => Ok(TextScanMode::LowAscii),
            "LowHighAscii" => Ok(TextScanMode::LowHighAscii),
            "C64Petscii" => Ok(TextScanMode::C64Petscii),
            "C64ScreenCode" => Ok(TextScanMode::C64ScreenCode),
            _ => Err(Glaurung65Error::InvalidInput(format!(
                "unknown text scan mode '{}'",
                s
            ))),
        }
    }
}

/// How generated labels are named.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutoLabelStyle {
    /// `L1234`
    #[default]
    Simple,
    /// Tag for the strongest kind of reference only, e.g. `S_1234`
    Annotated,
    /// Tags for every kind of reference, e.g. `WR_1234`
    FullyAnnotated,
}

impl AutoLabelStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoLabelStyle::Simple => "Simple",
            AutoLabelStyle::Annotated => "Annotated",
            AutoLabelStyle::FullyAnnotated => "FullyAnnotated",
        }
    }
}

impl fmt::Display for AutoLabelStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoLabelStyle {
    type Err = Glaurung65Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Simple" => Ok(AutoLabelStyle::Simple),
            "Annotated" => Ok(AutoLabelStyle::Annotated),
            "FullyAnnotated" => Ok(AutoLabelStyle::FullyAnnotated),
            _ => Err(Glaurung65Error::InvalidInput(format!(
                "unknown auto label style '{}'",
                s
            ))),
        }
    }
}

/// `min_chars_for_string` value that turns string detection off.
pub const MIN_CHARS_FOR_STRING_DISABLED: usize = usize::MAX;

/// Tunables for `CodeAnalysis` and `DataAnalysis`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParameters {
    /// Classify uncategorized bytes as strings and fills
    pub analyze_uncategorized_data: bool,
    /// Printable-character test for string detection
    pub default_text_scan_mode: TextScanMode,
    /// Minimum string length in characters
    pub min_chars_for_string: usize,
    /// Move auto-label targets onto nearby existing labels
    pub seek_nearby_targets: bool,
    /// Reuse the flags captured at the nearest PHP when analyzing a PLP
    pub smart_plp_handling: bool,
    /// Bytes scanned backward from a PLP looking for its PHP
    pub plp_search_window: usize,
    /// Shortest run of identical bytes emitted as a fill
    pub min_run_length: usize,
    /// Longest run of identical bytes still considered as string text
    pub max_string_run_length: usize,
    /// Naming of generated labels
    pub auto_label_style: AutoLabelStyle,
}

impl Default for AnalysisParameters {
    fn default() -> Self {
        Self {
            analyze_uncategorized_data: true,
            default_text_scan_mode: TextScanMode::LowHighAscii,
            min_chars_for_string: 4,
            seek_nearby_targets: true,
            smart_plp_handling: true,
            plp_search_window: 128,
            min_run_length: 5,
            max_string_run_length: 62,
            auto_label_style: AutoLabelStyle::Simple,
        }
    }
}

impl AnalysisParameters {
    /// True when `min_chars_for_string` disables string detection.
    pub fn strings_disabled(&self) -> bool {
        self.min_chars_for_string == MIN_CHARS_FOR_STRING_DISABLED
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load parameters from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = AnalysisParameters::default();
        assert!(p.analyze_uncategorized_data);
        assert!(p.smart_plp_handling);
        assert!(p.seek_nearby_targets);
        assert_eq!(p.min_chars_for_string, 4);
        assert_eq!(p.default_text_scan_mode, TextScanMode::LowHighAscii);
        assert!(!p.strings_disabled());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let p = AnalysisParameters::from_json_str(
            r#"{ "min_chars_for_string": 6, "default_text_scan_mode": "C64Petscii" }"#,
        )
        .unwrap();
        assert_eq!(p.min_chars_for_string, 6);
        assert_eq!(p.default_text_scan_mode, TextScanMode::C64Petscii);
        assert_eq!(p.min_run_length, 5);
        assert!(p.smart_plp_handling);
    }

    #[test]
    fn test_scan_mode_names() {
        for mode in [
            TextScanMode::LowAscii,
            TextScanMode::LowHighAscii,
            TextScanMode::C64Petscii,
            TextScanMode::C64ScreenCode,
        ] {
            assert_eq!(mode.as_str().parse::<TextScanMode>().unwrap(), mode);
        }
        assert!("Ebcdic".parse::<TextScanMode>().is_err());
    }

    #[test]
    fn test_auto_label_style_names() {
        for style in [
            AutoLabelStyle::Simple,
            AutoLabelStyle::Annotated,
            AutoLabelStyle::FullyAnnotated,
        ] {
            assert_eq!(style.as_str().parse::<AutoLabelStyle>().unwrap(), style);
        }
        let p = AnalysisParameters::from_json_str(r#"{ "auto_label_style": "FullyAnnotated" }"#)
            .unwrap();
        assert_eq!(p.auto_label_style, AutoLabelStyle::FullyAnnotated);
        assert_eq!(AnalysisParameters::default().auto_label_style, AutoLabelStyle::Simple);
    }
}
