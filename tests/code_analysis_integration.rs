mod common;

use common::{line_starts, operand_label, Image};
use glaurung65::analysis::plugin::AnalyzerApi;
use glaurung65::cpu::{FlagBit, FlagState};
use glaurung65::{
    AnalysisParameters, Analyzer, CpuType, FormatSubType, FormatType, Plugin, PluginCaps,
    TypeHint,
};

#[test]
fn test_subroutine_and_loop() {
    // JSR $2006 / JMP $2003 / RTS
    let img = Image::at(0x2000, &[0x20, 0x06, 0x20, 0x4c, 0x03, 0x20, 0x60]);
    let out = img.analyze();

    assert_eq!(line_starts(&out), vec![0, 3, 6]);
    assert!(out.attrs.iter().all(|a| a.is_instruction()));
    assert!(out.attrs[0].is_entry_point());
    assert!(out.attrs[6].is_branch_target());
    assert_eq!(operand_label(&out, 0).as_deref(), Some("L2006"));
    assert_eq!(operand_label(&out, 3).as_deref(), Some("L2003"));
    assert!(out.messages.is_empty());
}

#[test]
fn test_unconditional_branch_skips_data() {
    // BRA +2 / .dd1 $ff,$ff / RTS
    let img = Image::with_cpu(CpuType::Cpu65C02, 0x1000, &[0x80, 0x02, 0xff, 0xff, 0x60]);
    let out = img.analyze();

    assert!(out.attrs[0].is_instruction_start());
    assert!(out.attrs[2].is_data());
    assert!(out.attrs[3].is_data());
    assert!(out.attrs[4].is_instruction_start());
    assert_eq!(
        out.attrs[2].data_descriptor.as_ref().unwrap().format_type(),
        FormatType::Default
    );
}

#[test]
fn test_native_mode_widens_immediates() {
    // CLC / XCE / REP #$30 / LDA #$1234 / RTS
    let img = Image::with_cpu(
        CpuType::Cpu65816,
        0x8000,
        &[0x18, 0xfb, 0xc2, 0x30, 0xa9, 0x34, 0x12, 0x60],
    );
    let out = img.analyze();

    assert_eq!(line_starts(&out), vec![0, 1, 2, 4, 7]);
    let flags = out.attrs[4].status_flags;
    assert_eq!(flags.get(FlagBit::E), FlagState::Zero);
    assert_eq!(flags.get(FlagBit::M), FlagState::Zero);
    assert_eq!(flags.get(FlagBit::X), FlagState::Zero);
    assert_eq!(out.attrs[4].length(), 3);
}

#[test]
fn test_emulation_mode_ignores_rep() {
    // REP #$30 / LDA #$34 / RTS with no XCE
    let img = Image::with_cpu(CpuType::Cpu65816, 0x8000, &[0xc2, 0x30, 0xa9, 0x34, 0x60]);
    let out = img.analyze();
    assert_eq!(line_starts(&out), vec![0, 2, 4]);
    assert_eq!(out.attrs[2].length(), 2);
}

#[test]
fn test_jump_into_second_region() {
    // JMP $2000 where $2000 is the last byte, mapped separately
    let img = Image::at(0x1000, &[0x4c, 0x00, 0x20, 0x60]).regions(&[(0, 3, 0x1000), (3, 1, 0x2000)]);
    let out = img.analyze();

    assert!(out.attrs[3].is_instruction_start());
    assert!(out.attrs[3].is_addr_region_change());
    assert_eq!(out.attrs[3].address, 0x2000);
    assert_eq!(operand_label(&out, 0).as_deref(), Some("L2000"));
}

#[test]
fn test_external_jump_is_not_followed() {
    // JMP $c000 (outside the image) / NOP
    let img = Image::at(0x1000, &[0x4c, 0x00, 0xc0, 0xea]);
    let out = img.analyze();
    assert!(out.attrs[0].is_external_branch());
    assert!(out.attrs[0].operand_offset.is_none());
    assert!(!out.attrs[3].is_instruction());
    assert!(out.attrs[3].is_data());
}

#[test]
fn test_data_hint_not_overridden_by_entry() {
    let img = Image::at(0x1000, &[0xea, 0xea, 0x60]).hint(0, TypeHint::Data);
    let out = img.analyze();
    assert!(out.attrs.iter().all(|a| !a.is_instruction()));
}

#[test]
fn test_repeat_runs_are_identical() {
    let img = Image::at(
        0x0800,
        &[0xa2, 0x00, 0xbd, 0x0c, 0x08, 0xf0, 0x04, 0xe8, 0x4c, 0x02, 0x08, 0x60, b'H', b'I', b'!', b'!', 0x00],
    );
    let first = img.analyze();
    let second = img.analyze();
    assert_eq!(first.attrs, second.attrs);
    assert_eq!(
        first.symbols.iter().map(|s| s.label.clone()).collect::<Vec<_>>(),
        second.symbols.iter().map(|s| s.label.clone()).collect::<Vec<_>>()
    );
}

/// Treats `JSR $F000` as "print the null-terminated string that follows".
struct InlineText;

impl Plugin for InlineText {
    fn name(&self) -> &str {
        "inline-text"
    }

    fn capabilities(&self) -> PluginCaps {
        PluginCaps::JSR
    }

    fn check_jsr(
        &mut self,
        api: &mut dyn AnalyzerApi,
        offset: usize,
        target: u32,
    ) -> Result<bool, glaurung65::analysis::PluginError> {
        if target != 0xf000 {
            return Ok(false);
        }
        let start = offset + 3;
        let len = api.data()[start..]
            .iter()
            .position(|&b| b == 0)
            .map(|n| n + 1)
            .unwrap_or(0);
        if len > 0 {
            api.set_inline_data_format(
                start,
                len,
                FormatType::StringNullTerm,
                FormatSubType::Ascii,
                None,
            )?;
        }
        Ok(false)
    }
}

#[test]
fn test_plugin_inline_string() {
    // JSR $F000 / "HI",0 / RTS
    let img = Image::at(0x1000, &[0x20, 0x00, 0xf0, b'H', b'I', 0x00, 0x60]);
    let params = AnalysisParameters::default();
    let mut plugins: Vec<Box<dyn Plugin>> = vec![Box::new(InlineText)];
    let out = Analyzer::new(&img.data, &img.cpu, &img.map, &params)
        .with_type_hints(&img.hints)
        .with_plugins(&mut plugins)
        .run()
        .unwrap();

    assert!(out.attrs[3].is_inline_data_start());
    let dfd = out.attrs[3].data_descriptor.as_ref().unwrap();
    assert_eq!(dfd.format_type(), FormatType::StringNullTerm);
    assert_eq!(dfd.length(), 3);
    assert!(out.attrs[6].is_instruction_start());
    assert_eq!(line_starts(&out), vec![0, 3, 6]);
}
