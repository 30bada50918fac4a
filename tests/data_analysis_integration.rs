mod common;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use common::{line_starts, operand_label, user_label, Image};
use glaurung65::{
    AnalysisParameters, Analyzer, FormatDescriptor, FormatSubType, FormatType, SymbolSource,
    TextScanMode,
};

// LDX #$00 / LDA $1010,X / BEQ +6 / JSR $FDED / INX / BNE -11 / RTS
// then two zero bytes, "HELLO" and eight more zeros
fn hello_image() -> Image {
    let mut data = vec![
        0xa2, 0x00, 0xbd, 0x10, 0x10, 0xf0, 0x06, 0x20, 0xed, 0xfd, 0xe8, 0xd0, 0xf5, 0x60,
        0x00, 0x00,
    ];
    data.extend_from_slice(b"HELLO");
    data.extend_from_slice(&[0x00; 8]);
    Image::at(0x1000, &data)
}

#[test]
fn test_print_loop_layout() {
    let img = hello_image();
    let out = img.analyze();

    assert_eq!(operand_label(&out, 2).as_deref(), Some("L1010"));
    assert!(out.attrs[16].symbol.is_some());
    let text = out.attrs[16].data_descriptor.as_ref().unwrap();
    assert_eq!(text.format_type(), FormatType::StringGeneric);
    assert_eq!(text.sub_type(), FormatSubType::Ascii);
    assert_eq!(text.length(), 5);

    let fill = out.attrs[21].data_descriptor.as_ref().unwrap();
    assert_eq!(fill.format_type(), FormatType::Fill);
    assert_eq!(fill.length(), 8);

    // every byte is covered exactly once by a line
    let starts = line_starts(&out);
    assert_eq!(*starts.last().unwrap(), 21);
    assert!(out.attrs.iter().all(|a| a.is_instruction() || a.is_data()));
}

#[test]
fn test_user_label_anchors_reference() {
    let img = hello_image();
    let params = AnalysisParameters::default();
    let labels = vec![(14, user_label("MSGBUF", 0x100e))];
    let out = Analyzer::new(&img.data, &img.cpu, &img.map, &params)
        .with_type_hints(&img.hints)
        .with_user_labels(&labels)
        .run()
        .unwrap();

    // two bytes past a user label: reuse it instead of making a new one
    assert_eq!(operand_label(&out, 2).as_deref(), Some("MSGBUF"));
    assert!(!out.symbols.contains_label("L1010"));
    assert_eq!(out.symbols.get("MSGBUF").unwrap().source, SymbolSource::User);
}

#[test]
fn test_address_table_gets_labels() {
    // JMP ($1003) / .dd2 $1007 / .dd2 $1008 / RTS / RTS
    let img = Image::at(0x1000, &[0x6c, 0x03, 0x10, 0x07, 0x10, 0x08, 0x10, 0x60, 0x60]);
    let params = AnalysisParameters::default();
    let addr = FormatDescriptor::create(2, FormatType::NumericLE, FormatSubType::Address).unwrap();
    let mut formats = BTreeMap::new();
    formats.insert(3, Arc::clone(&addr));
    formats.insert(5, addr);
    let img = img
        .hint(7, glaurung65::TypeHint::Code)
        .hint(8, glaurung65::TypeHint::Code);
    let out = Analyzer::new(&img.data, &img.cpu, &img.map, &params)
        .with_type_hints(&img.hints)
        .with_operand_formats(&formats)
        .run()
        .unwrap();

    assert!(out.messages.is_empty());
    assert_eq!(operand_label(&out, 3).as_deref(), Some("L1007"));
    assert_eq!(operand_label(&out, 5).as_deref(), Some("L1008"));
    assert_eq!(line_starts(&out), vec![0, 3, 5, 7, 8]);
}

#[test]
fn test_comment_splits_string() {
    let img = Image::at(0x1000, &[0x60, b'A', b'B', b'C', b'D', b'E', b'F', b'G', b'H']);
    let params = AnalysisParameters::default();
    let comments: BTreeSet<usize> = [5].into_iter().collect();
    let out = Analyzer::new(&img.data, &img.cpu, &img.map, &params)
        .with_type_hints(&img.hints)
        .with_comment_offsets(&comments)
        .run()
        .unwrap();
    assert_eq!(out.attrs[1].data_descriptor.as_ref().unwrap().length(), 4);
    assert_eq!(out.attrs[5].data_descriptor.as_ref().unwrap().length(), 4);
}

#[test]
fn test_petscii_scan_mode() {
    // RTS then "hello" in PETSCII upper/lower case
    let img = Image::at(0x0801, &[0x60, 0x48, 0x45, 0x4c, 0x4c, 0x4f]);
    let params = AnalysisParameters {
        default_text_scan_mode: TextScanMode::C64Petscii,
        ..AnalysisParameters::default()
    };
    let out = Analyzer::new(&img.data, &img.cpu, &img.map, &params)
        .with_type_hints(&img.hints)
        .run()
        .unwrap();
    let text = out.attrs[1].data_descriptor.as_ref().unwrap();
    assert_eq!(text.sub_type(), FormatSubType::C64Petscii);
    assert_eq!(text.length(), 5);
}

#[test]
fn test_high_ascii_message() {
    // RTS then "HELLO" with the high bit set, as on the Apple II
    let img = Image::at(0x0300, &[0x60, 0xc8, 0xc5, 0xcc, 0xcc, 0xcf]);
    let out = img.analyze();
    let text = out.attrs[1].data_descriptor.as_ref().unwrap();
    assert_eq!(text.sub_type(), FormatSubType::HighAscii);
    assert_eq!(text.length(), 5);
}

#[test]
fn test_uncategorized_analysis_off() {
    let img = hello_image();
    let params = AnalysisParameters {
        analyze_uncategorized_data: false,
        ..AnalysisParameters::default()
    };
    let out = Analyzer::new(&img.data, &img.cpu, &img.map, &params)
        .with_type_hints(&img.hints)
        .run()
        .unwrap();
    for attr in out.attrs.iter().filter(|a| a.is_data()) {
        assert_eq!(
            attr.data_descriptor.as_ref().unwrap().format_type(),
            FormatType::Default
        );
    }
}

#[test]
fn test_run_length_limits() {
    // RTS, a 63-byte divider line, a zero and three stars
    let mut data = vec![0x60];
    data.extend_from_slice(&[b'-'; 63]);
    data.push(0x00);
    data.extend_from_slice(b"***");
    let img = Image::at(0x1000, &data);
    let params = AnalysisParameters {
        min_chars_for_string: 6,
        ..AnalysisParameters::default()
    };
    let out = Analyzer::new(&img.data, &img.cpu, &img.map, &params)
        .with_type_hints(&img.hints)
        .run()
        .unwrap();

    let divider = out.attrs[1].data_descriptor.as_ref().unwrap();
    assert_eq!(divider.format_type(), FormatType::Fill);
    assert_eq!(divider.length(), 63);
    for offset in 65..68 {
        let d = out.attrs[offset].data_descriptor.as_ref().unwrap();
        assert_eq!(d.format_type(), FormatType::Default);
    }
}
