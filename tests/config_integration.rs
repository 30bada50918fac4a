use glaurung65::config::MIN_CHARS_FOR_STRING_DISABLED;
use glaurung65::cpu::{FlagBit, FlagState};
use glaurung65::{AnalysisParameters, CpuType, Glaurung65Error, StatusFlags, TextScanMode, TypeHint};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_parameters_file_round_trip() {
    let params = AnalysisParameters {
        default_text_scan_mode: TextScanMode::C64ScreenCode,
        min_chars_for_string: MIN_CHARS_FOR_STRING_DISABLED,
        smart_plp_handling: false,
        ..AnalysisParameters::default()
    };
    let file = NamedTempFile::new().unwrap();
    params.save(file.path()).unwrap();

    let loaded = AnalysisParameters::load(file.path()).unwrap();
    assert_eq!(loaded, params);
    assert!(loaded.strings_disabled());
}

#[test]
fn test_hand_written_file_fills_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{ "seek_nearby_targets": false }}"#).unwrap();
    let loaded = AnalysisParameters::load(file.path()).unwrap();
    assert!(!loaded.seek_nearby_targets);
    assert_eq!(loaded.plp_search_window, 128);
    assert_eq!(loaded.max_string_run_length, 62);
}

#[test]
fn test_bad_files_are_errors() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "not json").unwrap();
    assert!(matches!(
        AnalysisParameters::load(file.path()),
        Err(Glaurung65Error::Serialization(_))
    ));

    let missing = file.path().with_extension("missing");
    assert!(matches!(
        AnalysisParameters::load(&missing),
        Err(Glaurung65Error::Io(_))
    ));
}

#[test]
fn test_persisted_enum_names() {
    assert_eq!(serde_json::to_string(&TypeHint::InlineData).unwrap(), "\"InlineData\"");
    assert_eq!(serde_json::to_string(&CpuType::Cpu65816).unwrap(), "\"65816\"");
    let cpu: CpuType = serde_json::from_str("\"65C02\"").unwrap();
    assert_eq!(cpu, CpuType::Cpu65C02);
}

#[test]
fn test_status_flags_persist_packed() {
    let flags = StatusFlags::DEFAULT
        .with(FlagBit::C, FlagState::Zero)
        .with(FlagBit::E, FlagState::One);
    let json = serde_json::to_string(&flags).unwrap();
    assert_eq!(json, (0x0001u32 | 0x0100 << 16).to_string());
    let back: StatusFlags = serde_json::from_str(&json).unwrap();
    assert_eq!(back, flags);

    assert!(serde_json::from_str::<StatusFlags>("4294967295").is_err());
}
