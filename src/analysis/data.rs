//! Data analysis: operand target labels and uncategorized byte formatting.
//!
//! Runs after [`CodeAnalysis`](crate::analysis::CodeAnalysis) once user labels
//! and formats have been merged into the attribute array. Two passes:
//!
//! 1. [`DataAnalysis::analyze_data_targets`] gives every in-image operand
//!    reference a symbolic format, creating auto labels where needed.
//! 2. [`DataAnalysis::analyze_uncategorized`] formats everything that is
//!    neither code nor formatted data as strings, fills or single bytes.
//!
//! [`DataAnalysis::annotate_auto_labels`] then renames auto labels after the
//! kinds of reference that reach them when an annotated style is selected.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bitflags::bitflags;
use tracing::{debug, info, info_span, trace};

use crate::analysis::OffsetFmt;
use crate::config::{AnalysisParameters, AutoLabelStyle, TextScanMode};
use crate::core::address_map::AddressMap;
use crate::core::anattrib::{Anattrib, AttribFlags};
use crate::core::format_descriptor::{
    FormatDescriptor, FormatSubType, FormatType, SymbolPart, WeakSymbolRef,
};
use crate::core::symbol::SymbolSource;
use crate::cpu::{CpuDef, MemoryEffect};
use crate::error::{Glaurung65Error, Result};
use crate::strings::charset::{refine_low_high, scan_test};
use crate::strings::recognize_run;
use crate::symbols::SymbolTable;

/// Prefix of generated labels.
pub const AUTO_LABEL_PREFIX: &str = "L";

/// How far a data reference may slide backward onto a user label.
const MAX_PROBE_BACK: usize = 3;
/// How far a data reference may slide forward onto a user label.
const MAX_PROBE_FWD: usize = 1;

enum Probe {
    Use,
    Boundary,
    Skip,
}

bitflags! {
    /// Kinds of reference to a labeled location, strongest first.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    struct RefKinds: u8 {
        const SUB_CALL = 1 << 0;
        const BRANCH = 1 << 1;
        const DATA_REF = 1 << 2;
        const WRITE = 1 << 3;
        const READ = 1 << 4;
    }
}

const REF_TAGS: [(RefKinds, char); 5] = [
    (RefKinds::SUB_CALL, 'S'),
    (RefKinds::BRANCH, 'B'),
    (RefKinds::DATA_REF, 'D'),
    (RefKinds::WRITE, 'W'),
    (RefKinds::READ, 'R'),
];

/// Label prefix for a location reached by `kinds`: the strongest tag alone
/// for [`AutoLabelStyle::Annotated`], every tag for the fully annotated
/// style.
fn annotation_prefix(kinds: RefKinds, style: AutoLabelStyle) -> String {
    let tags = REF_TAGS.iter().filter(|(k, _)| kinds.contains(*k)).map(|&(_, c)| c);
    let mut prefix: String = match style {
        AutoLabelStyle::Annotated => tags.take(1).collect(),
        _ => tags.collect(),
    };
    prefix.push('_');
    prefix
}

/// Data analysis over a finished code analysis.
pub struct DataAnalysis<'a> {
    data: &'a [u8],
    cpu: &'a CpuDef,
    addr_map: &'a AddressMap,
    params: &'a AnalysisParameters,
    symbols: &'a mut SymbolTable,
    attrs: &'a mut [Anattrib],
    comment_offsets: BTreeSet<usize>,
}

impl<'a> DataAnalysis<'a> {
    pub fn new(
        data: &'a [u8],
        cpu: &'a CpuDef,
        addr_map: &'a AddressMap,
        params: &'a AnalysisParameters,
        symbols: &'a mut SymbolTable,
        attrs: &'a mut [Anattrib],
    ) -> Result<Self> {
        if attrs.len() != data.len() || addr_map.total_length() != data.len() {
            return Err(Glaurung65Error::InvalidInput(format!(
                "attribute array ({}) and address map ({}) must match the image ({})",
                attrs.len(),
                addr_map.total_length(),
                data.len()
            )));
        }
        Ok(DataAnalysis {
            data,
            cpu,
            addr_map,
            params,
            symbols,
            attrs,
            comment_offsets: BTreeSet::new(),
        })
    }

    /// Offsets carrying a comment or note. Uncategorized ranges are split at
    /// these so an annotated byte starts its own item.
    pub fn with_comment_offsets(mut self, offsets: impl IntoIterator<Item = usize>) -> Self {
        self.comment_offsets.extend(offsets);
        self
    }

    /// Attach a symbolic operand format to every instruction or address data
    /// item that refers to a location inside the image.
    ///
    /// # Errors
    /// Fails only if an auto label cannot be added to the symbol table,
    /// which means the table and the attribute array disagree.
    pub fn analyze_data_targets(&mut self) -> Result<()> {
        let span = info_span!("data_targets", len = self.data.len());
        let _guard = span.enter();

        let mut offset = 0;
        while offset < self.attrs.len() {
            let attr = &self.attrs[offset];
            if attr.is_instruction_start() {
                // A format already on the operand wins. Advance by one byte, not
                // the instruction length, to catch embedded instructions.
                if attr.data_descriptor.is_none() {
                    if let Some(target) = attr.operand_offset {
                        let len = attr.instr_length;
                        self.set_data_target(offset, len, target, SymbolPart::Low)?;
                    }
                }
            } else if let Some(dfd) = attr.data_descriptor.clone() {
                if dfd.is_numeric() && dfd.sub_type() == FormatSubType::Address {
                    let big_endian = dfd.format_type() == FormatType::NumericBE;
                    let mut address = read_word(self.data, offset, dfd.length(), big_endian);
                    if dfd.length() < 3 {
                        address |= attr.address & 0x7fff_0000;
                    }
                    if let Some(target) = self.addr_map.address_to_offset(offset, address) {
                        self.set_data_target(offset, dfd.length(), target, SymbolPart::Low)?;
                    }
                }
                offset += dfd.length().max(1) - 1;
            }
            offset += 1;
        }
        info!(symbols = self.symbols.len(), "data targets resolved");
        Ok(())
    }

    /// Point the operand at `src_offset` to a label at or near `target`,
    /// generating the label if there is none.
    fn set_data_target(
        &mut self,
        src_offset: usize,
        src_len: usize,
        target: usize,
        part: SymbolPart,
    ) -> Result<()> {
        let orig_target = target;
        let mut target = target;

        if self.attrs[target].symbol.is_none() {
            if self.params.seek_nearby_targets {
                target = self.find_alternate_target(src_offset, target);
            }
            // Labels go on the opcode, or on the first byte of a data item.
            let tattr = &self.attrs[target];
            if tattr.is_instruction() && !tattr.is_instruction_start() {
                target = self.instruction_start_before(target);
            } else if !tattr.is_instruction() && !tattr.is_start() {
                if let Some(scan) = (0..target)
                    .rev()
                    .find(|&o| self.attrs[o].data_descriptor.is_some())
                {
                    let covers = self.attrs[scan]
                        .data_descriptor
                        .as_ref()
                        .is_some_and(|d| scan + d.length() > target);
                    if covers {
                        target = scan;
                    }
                }
            }
        }

        let existing = self.attrs[target].symbol.as_ref().map(|s| s.label.clone());
        let label = match existing {
            Some(label) => label,
            None => {
                let sym = self
                    .symbols
                    .generate_unique_for_address(self.attrs[target].address, AUTO_LABEL_PREFIX)?;
                self.symbols.add(sym.clone())?;
                let label = sym.label.clone();
                self.attrs[target].symbol = Some(sym);
                label
            }
        };

        let mut big_endian = false;
        match &self.attrs[src_offset].data_descriptor {
            Some(old) => {
                big_endian = old.format_type() == FormatType::NumericBE;
                debug!(
                    offset = %OffsetFmt(src_offset),
                    old = %old,
                    label = %label,
                    adj = orig_target as i64 - target as i64,
                    "replacing format with label reference"
                );
            }
            None => trace!(
                offset = %OffsetFmt(src_offset),
                label = %label,
                adj = orig_target as i64 - target as i64,
                "weak reference"
            ),
        }
        self.attrs[src_offset].data_descriptor = Some(FormatDescriptor::create_symbol(
            src_len,
            WeakSymbolRef::new(label, part),
            big_endian,
        )?);
        Ok(())
    }

    fn instruction_start_before(&self, mut offset: usize) -> usize {
        while offset > 0 && !self.attrs[offset].is_instruction_start() {
            offset -= 1;
        }
        offset
    }

    fn probe_user_label(&self, target: usize, probe: usize) -> Probe {
        match &self.attrs[probe].symbol {
            Some(sym) if sym.source == SymbolSource::User => {
                let addr_diff =
                    self.attrs[target].address as i64 - self.attrs[probe].address as i64;
                if addr_diff == target as i64 - probe as i64 {
                    Probe::Use
                } else {
                    Probe::Boundary
                }
            }
            _ => Probe::Skip,
        }
    }

    /// Find a better place for the label a reference from `src_offset` to
    /// `target` needs. Returns `target` if nothing better turns up.
    fn find_alternate_target(&self, src_offset: usize, target: usize) -> usize {
        let len = self.attrs.len();

        if !self.attrs[target].is_instruction() {
            // Data reference: reuse a user label a few bytes back, or one
            // forward, so LABEL+N is preferred over LABEL-N.
            for probe in (1..=MAX_PROBE_BACK).filter_map(|d| target.checked_sub(d)) {
                match self.probe_user_label(target, probe) {
                    Probe::Use => return probe,
                    Probe::Boundary => break,
                    Probe::Skip => {}
                }
            }
            for probe in (1..=MAX_PROBE_FWD).map(|d| target + d).filter(|&p| p < len) {
                match self.probe_user_label(target, probe) {
                    Probe::Use => return probe,
                    Probe::Boundary => break,
                    Probe::Skip => {}
                }
            }
            return target;
        }

        let plus_one = |t: usize| {
            if !self.attrs[t].is_instruction_start()
                && t + 1 < len
                && self.attrs[t + 1].is_instruction_start()
            {
                t + 1
            } else {
                t
            }
        };

        if !self.attrs[src_offset].is_instruction_start() {
            // Address table entry, possibly address-1 for an RTS dispatch.
            return plus_one(target);
        }

        let op = self.cpu.op(self.data[src_offset]);
        let adjusted = if op.is_branch_or_sub_call() {
            target
        } else if op.is_pea() || op.is_per() {
            plus_one(target)
        } else {
            // Data access into code: indexed access with an offset base if
            // data follows, otherwise self-modifying code.
            match (target + 1..=target + 2).find(|&i| i < len && !self.attrs[i].is_instruction()) {
                Some(nearby) => nearby,
                None if !self.attrs[target].is_instruction_start() => {
                    self.instruction_start_before(target)
                }
                None => target,
            }
        };
        if adjusted != target {
            trace!(offset = %OffsetFmt(src_offset), adj = target as i64 - adjusted as i64, "adjusted instruction reference");
        }
        adjusted
    }

    /// Mark every byte that is not code as data and give uncategorized
    /// ranges string, fill or single-byte formats.
    pub fn analyze_uncategorized(&mut self) -> Result<()> {
        let span = info_span!("uncategorized_data", len = self.data.len());
        let _guard = span.enter();

        let mut inline_covered = 0;
        for (offset, attr) in self.attrs.iter_mut().enumerate() {
            if attr.is_inline_data() {
                match attr.data_descriptor.as_ref().map(|d| d.length()) {
                    Some(len) => inline_covered = offset + len,
                    None if offset >= inline_covered => {
                        attr.data_descriptor = Some(FormatDescriptor::one_byte_default());
                    }
                    None => {}
                }
            } else if !attr.is_instruction() {
                attr.flags.insert(AttribFlags::DATA);
            }
        }

        let len = self.attrs.len();
        let mut range_start: Option<usize> = None;
        let mut offset = 0;
        while offset < len {
            let attr = &self.attrs[offset];
            let step = if attr.is_instruction() {
                Some(1)
            } else if attr.is_inline_data() || attr.is_data_start() {
                Some(attr.length().max(1))
            } else {
                None
            };
            let splits = attr.symbol.is_some() || self.comment_offsets.contains(&offset);
            if let Some(step) = step {
                if let Some(start) = range_start.take() {
                    self.analyze_range(start, offset)?;
                }
                offset += step;
            } else if splits {
                if let Some(start) = range_start {
                    self.analyze_range(start, offset)?;
                }
                range_start = Some(offset);
                offset += 1;
            } else {
                let start = *range_start.get_or_insert(offset);
                offset += 1;
                if offset < len && !self.addr_map.is_single_addr_range(offset - 1, 2) {
                    self.analyze_range(start, offset)?;
                    range_start = None;
                }
            }
        }
        if let Some(start) = range_start {
            self.analyze_range(start, len)?;
        }
        info!("uncategorized data formatted");
        Ok(())
    }

    /// Rename auto labels after the kinds of reference that reach them,
    /// e.g. `L1234` read and written by code becomes `WR_1234`. Operand
    /// formats naming a renamed label are updated to match. Does nothing
    /// for [`AutoLabelStyle::Simple`].
    ///
    /// Run after both other passes so every reference is in place.
    pub fn annotate_auto_labels(&mut self) -> Result<()> {
        let style = self.params.auto_label_style;
        if style == AutoLabelStyle::Simple {
            return Ok(());
        }
        let span = info_span!("annotate_auto_labels", style = %style);
        let _guard = span.enter();

        let mut refs: BTreeMap<String, RefKinds> = BTreeMap::new();
        for (offset, attr) in self.attrs.iter().enumerate() {
            if let Some(sym_ref) = attr.data_descriptor.as_ref().and_then(|d| d.symbol_ref()) {
                *refs.entry(sym_ref.label.clone()).or_default() |= self.ref_kind(offset);
            }
        }

        let mut renamed: BTreeMap<String, String> = BTreeMap::new();
        for offset in 0..self.attrs.len() {
            let Some(old) = self.attrs[offset]
                .symbol
                .as_ref()
                .filter(|s| s.source == SymbolSource::Auto)
                .map(|s| s.label.clone())
            else {
                continue;
            };
            let kinds = refs.get(&old).copied().unwrap_or_default();
            // nothing to name it after
            if kinds.is_empty() {
                continue;
            }
            let prefix = annotation_prefix(kinds, style);
            let sym = self
                .symbols
                .generate_unique_for_address(self.attrs[offset].address, &prefix)?;
            debug!(offset = %OffsetFmt(offset), old = %old, new = %sym.label, "annotating auto label");
            self.symbols.remove(&old);
            self.symbols.add(sym.clone())?;
            renamed.insert(old, sym.label.clone());
            self.attrs[offset].symbol = Some(sym);
        }

        for attr in self.attrs.iter_mut() {
            let Some(dfd) = attr.data_descriptor.as_ref() else {
                continue;
            };
            let Some(new_label) = dfd.symbol_ref().and_then(|r| renamed.get(&r.label)) else {
                continue;
            };
            let part = dfd.symbol_ref().map(|r| r.part).unwrap_or_default();
            let updated = FormatDescriptor::create_symbol(
                dfd.length(),
                WeakSymbolRef::new(new_label.clone(), part),
                dfd.format_type() == FormatType::NumericBE,
            )?;
            attr.data_descriptor = Some(updated);
        }
        info!(renamed = renamed.len(), "auto labels annotated");
        Ok(())
    }

    /// Kind of reference made by the operand or data item at `offset`.
    fn ref_kind(&self, offset: usize) -> RefKinds {
        if !self.attrs[offset].is_instruction_start() {
            return RefKinds::DATA_REF;
        }
        let op = self.cpu.op(self.data[offset]);
        if op.is_subroutine_call() {
            RefKinds::SUB_CALL
        } else if op.is_branch_or_sub_call() {
            RefKinds::BRANCH
        } else {
            match op.memory_effect() {
                MemoryEffect::Read => RefKinds::READ,
                MemoryEffect::Write => RefKinds::WRITE,
                MemoryEffect::ReadModifyWrite => RefKinds::READ | RefKinds::WRITE,
                MemoryEffect::None => RefKinds::empty(),
            }
        }
    }

    /// Format `start..end`, which holds only uncategorized bytes.
    fn analyze_range(&mut self, start: usize, end: usize) -> Result<()> {
        trace!(start = %OffsetFmt(start), end = %OffsetFmt(end), "analyzing range");
        let one_byte = FormatDescriptor::one_byte_default();

        if !self.params.analyze_uncategorized_data {
            for attr in &mut self.attrs[start..end] {
                attr.data_descriptor = Some(Arc::clone(&one_byte));
            }
            return Ok(());
        }

        let mode = self.params.default_text_scan_mode;
        let (test, base_sub_type) = scan_test(mode);
        let min_chars = self.params.min_chars_for_string;

        let mut posn = start;
        while posn < end {
            let buf = &self.data[posn..end];
            let run_len = recognize_run(buf);
            let mut print_len = 0;
            let mut sub_type = base_sub_type;

            if test(buf[0]) && run_len <= self.params.max_string_run_length {
                let mut refined = test;
                if mode == TextScanMode::LowHighAscii {
                    (refined, sub_type) = refine_low_high(buf[0]);
                }
                print_len = run_len
                    + buf[run_len..]
                        .iter()
                        .take_while(|&&b| refined(b))
                        .count();
            }

            if print_len >= min_chars {
                debug!(offset = %OffsetFmt(posn), sub_type = %sub_type, len = print_len, "string");
                self.attrs[posn].data_descriptor = Some(FormatDescriptor::create(
                    print_len,
                    FormatType::StringGeneric,
                    sub_type,
                )?);
                posn += print_len;
            } else if run_len >= self.params.min_run_length {
                trace!(offset = %OffsetFmt(posn), value = buf[0], len = run_len, "fill");
                self.attrs[posn].data_descriptor = Some(FormatDescriptor::create(
                    run_len,
                    FormatType::Fill,
                    FormatSubType::None,
                )?);
                posn += run_len;
            } else {
                // Shorter runs starting inside this one would be shorter still.
                for attr in &mut self.attrs[posn..posn + run_len] {
                    attr.data_descriptor = Some(Arc::clone(&one_byte));
                }
                posn += run_len;
            }
        }
        Ok(())
    }
}

/// Read a `len`-byte value at `offset`. Bytes past the end read as zero.
pub fn read_word(data: &[u8], offset: usize, len: usize, big_endian: bool) -> u32 {
    let bytes = data.get(offset..offset + len).unwrap_or(&[]);
    if big_endian {
        bytes.iter().fold(0u32, |acc, &b| acc << 8 | b as u32)
    } else {
        bytes.iter().rev().fold(0u32, |acc, &b| acc << 8 | b as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::symbol::{LabelAnnotation, Symbol, SymbolType};
    use crate::cpu::CpuType;

    struct Fixture {
        data: Vec<u8>,
        cpu: CpuDef,
        map: AddressMap,
        params: AnalysisParameters,
        symbols: SymbolTable,
        attrs: Vec<Anattrib>,
    }

    impl Fixture {
        fn new(data: &[u8]) -> Self {
            let map = AddressMap::single(data.len(), 0x1000).unwrap();
            let mut attrs = Anattrib::new_array(data.len());
            for (i, a) in attrs.iter_mut().enumerate() {
                a.address = 0x1000 + i as u32;
            }
            Fixture {
                data: data.to_vec(),
                cpu: CpuDef::best_match(CpuType::Cpu6502, false),
                map,
                params: AnalysisParameters::default(),
                symbols: SymbolTable::new(),
                attrs,
            }
        }

        fn instr(&mut self, offset: usize, len: usize, operand_offset: Option<usize>) {
            for a in &mut self.attrs[offset..offset + len] {
                a.flags.insert(AttribFlags::INSTRUCTION);
            }
            let a = &mut self.attrs[offset];
            a.flags.insert(AttribFlags::INSTR_START);
            a.instr_length = len;
            a.operand_offset = operand_offset;
        }

        fn user_label(&mut self, offset: usize, label: &str) {
            let sym = Symbol::new(
                label,
                self.attrs[offset].address,
                SymbolSource::User,
                SymbolType::GlobalAddr,
                LabelAnnotation::None,
            )
            .unwrap();
            self.symbols.add(sym.clone()).unwrap();
            self.attrs[offset].symbol = Some(sym);
        }

        fn analysis(&mut self) -> DataAnalysis<'_> {
            DataAnalysis::new(
                &self.data,
                &self.cpu,
                &self.map,
                &self.params,
                &mut self.symbols,
                &mut self.attrs,
            )
            .unwrap()
        }

        fn target_label(&self, offset: usize) -> String {
            self.attrs[offset]
                .data_descriptor
                .as_ref()
                .and_then(|d| d.symbol_ref())
                .map(|r| r.label.clone())
                .unwrap_or_default()
        }
    }

    #[test]
    fn test_read_word() {
        let data = [0x34, 0x12, 0x56];
        assert_eq!(read_word(&data, 0, 2, false), 0x1234);
        assert_eq!(read_word(&data, 0, 2, true), 0x3412);
        assert_eq!(read_word(&data, 0, 3, false), 0x561234);
        assert_eq!(read_word(&data, 2, 2, false), 0);
    }

    #[test]
    fn test_instruction_operand_gets_auto_label() {
        // JMP $1004 / NOP / RTS
        let mut fx = Fixture::new(&[0x4c, 0x04, 0x10, 0xea, 0x60]);
        fx.instr(0, 3, Some(4));
        fx.instr(3, 1, None);
        fx.instr(4, 1, None);
        fx.analysis().analyze_data_targets().unwrap();

        assert_eq!(fx.target_label(0), "L1004");
        let sym = fx.attrs[4].symbol.as_ref().unwrap();
        assert_eq!(sym.source, SymbolSource::Auto);
        assert!(fx.symbols.contains_label("L1004"));
    }

    #[test]
    fn test_existing_operand_format_is_kept() {
        let mut fx = Fixture::new(&[0x4c, 0x03, 0x10, 0x60]);
        fx.instr(0, 3, Some(3));
        fx.instr(3, 1, None);
        let hex = FormatDescriptor::create(3, FormatType::NumericLE, FormatSubType::Hex).unwrap();
        fx.attrs[0].data_descriptor = Some(hex);
        fx.analysis().analyze_data_targets().unwrap();
        assert!(fx.attrs[3].symbol.is_none());
        assert!(fx.symbols.is_empty());
    }

    #[test]
    fn test_data_reference_slides_to_user_label() {
        // LDA $1006 / RTS / table at $1004
        let mut fx = Fixture::new(&[0xad, 0x06, 0x10, 0x60, 0x00, 0x00, 0x00, 0x00]);
        fx.instr(0, 3, Some(6));
        fx.instr(3, 1, None);
        fx.user_label(4, "TABLE");
        fx.analysis().analyze_data_targets().unwrap();
        assert_eq!(fx.target_label(0), "TABLE");
        assert!(fx.attrs[6].symbol.is_none());
    }

    #[test]
    fn test_seek_nearby_disabled() {
        let mut fx = Fixture::new(&[0xad, 0x06, 0x10, 0x60, 0x00, 0x00, 0x00, 0x00]);
        fx.params.seek_nearby_targets = false;
        fx.instr(0, 3, Some(6));
        fx.instr(3, 1, None);
        fx.user_label(4, "TABLE");
        fx.analysis().analyze_data_targets().unwrap();
        assert_eq!(fx.target_label(0), "L1006");
    }

    #[test]
    fn test_self_modifying_store_labels_opcode() {
        // STA $1004 (operand byte of the LDA) / LDA #$00 / RTS
        let mut fx = Fixture::new(&[0x8d, 0x04, 0x10, 0xa9, 0x00, 0x60]);
        fx.instr(0, 3, Some(4));
        fx.instr(3, 2, None);
        fx.instr(5, 1, None);
        fx.analysis().analyze_data_targets().unwrap();
        assert_eq!(fx.target_label(0), "L1003");
        assert!(fx.attrs[3].symbol.is_some());
    }

    #[test]
    fn test_indexed_access_into_adjacent_data() {
        // LDA $1003,X where $1003 is the RTS and data follows
        let mut fx = Fixture::new(&[0xbd, 0x03, 0x10, 0x60, 0x11, 0x22]);
        fx.instr(0, 3, Some(3));
        fx.instr(3, 1, None);
        fx.analysis().analyze_data_targets().unwrap();
        assert_eq!(fx.target_label(0), "L1004");
    }

    #[test]
    fn test_branch_target_never_adjusted() {
        // JMP $1004, middle of the LDA #
        let mut fx = Fixture::new(&[0x4c, 0x04, 0x10, 0xa9, 0x00, 0x60]);
        fx.instr(0, 3, Some(4));
        fx.instr(3, 2, None);
        fx.instr(5, 1, None);
        fx.analysis().analyze_data_targets().unwrap();
        // still cannot label the middle of an instruction
        assert_eq!(fx.target_label(0), "L1003");
    }

    #[test]
    fn test_address_table_minus_one() {
        // .dd2 $1002 pointing one before the RTS dispatch target at $1003
        let mut fx = Fixture::new(&[0x02, 0x10, 0xea, 0x60]);
        fx.attrs[0].flags.insert(AttribFlags::DATA);
        fx.attrs[1].flags.insert(AttribFlags::DATA);
        fx.attrs[0].data_descriptor =
            Some(FormatDescriptor::create(2, FormatType::NumericLE, FormatSubType::Address).unwrap());
        // $1002 is the tail of an instruction; $1003 starts one
        fx.attrs[2].flags.insert(AttribFlags::INSTRUCTION);
        fx.instr(3, 1, None);
        fx.analysis().analyze_data_targets().unwrap();
        assert_eq!(fx.target_label(0), "L1003");
    }

    #[test]
    fn test_big_endian_address_data() {
        let mut fx = Fixture::new(&[0x10, 0x02, 0x60]);
        fx.instr(2, 1, None);
        fx.attrs[0].flags.insert(AttribFlags::DATA);
        fx.attrs[1].flags.insert(AttribFlags::DATA);
        fx.attrs[0].data_descriptor =
            Some(FormatDescriptor::create(2, FormatType::NumericBE, FormatSubType::Address).unwrap());
        fx.analysis().analyze_data_targets().unwrap();
        let dfd = fx.attrs[0].data_descriptor.as_ref().unwrap();
        assert_eq!(dfd.format_type(), FormatType::NumericBE);
        assert_eq!(dfd.symbol_ref().unwrap().label, "L1002");
    }

    #[test]
    fn test_auto_label_collision_gets_suffix() {
        let mut fx = Fixture::new(&[0x4c, 0x03, 0x10, 0x60]);
        fx.instr(0, 3, Some(3));
        fx.instr(3, 1, None);
        let clash = Symbol::new(
            "L1003",
            0xc000,
            SymbolSource::Platform,
            SymbolType::GlobalAddr,
            LabelAnnotation::None,
        )
        .unwrap();
        fx.symbols.add(clash).unwrap();
        fx.analysis().analyze_data_targets().unwrap();
        assert_eq!(fx.target_label(0), "L1003_0");
    }

    // STA $1009 / LDA $1009 / JSR $100A / .dd1 0 / RTS
    fn annotated_fixture(style: AutoLabelStyle) -> Fixture {
        let mut fx = Fixture::new(&[
            0x8d, 0x09, 0x10, 0xad, 0x09, 0x10, 0x20, 0x0a, 0x10, 0x00, 0x60,
        ]);
        fx.instr(0, 3, Some(9));
        fx.instr(3, 3, Some(9));
        fx.instr(6, 3, Some(10));
        fx.instr(10, 1, None);
        fx.params.auto_label_style = style;
        let mut da = fx.analysis();
        da.analyze_data_targets().unwrap();
        da.analyze_uncategorized().unwrap();
        da.annotate_auto_labels().unwrap();
        drop(da);
        fx
    }

    #[test]
    fn test_fully_annotated_labels_carry_every_tag() {
        let fx = annotated_fixture(AutoLabelStyle::FullyAnnotated);
        assert_eq!(fx.attrs[9].symbol.as_ref().unwrap().label, "WR_1009");
        assert_eq!(fx.attrs[10].symbol.as_ref().unwrap().label, "S_100A");
        assert_eq!(fx.target_label(0), "WR_1009");
        assert_eq!(fx.target_label(3), "WR_1009");
        assert_eq!(fx.target_label(6), "S_100A");
        assert!(fx.symbols.contains_label("WR_1009"));
        assert!(!fx.symbols.contains_label("L1009"));
        assert_eq!(fx.symbols.get("S_100A").unwrap().source, SymbolSource::Auto);
    }

    #[test]
    fn test_annotated_labels_keep_strongest_tag() {
        let fx = annotated_fixture(AutoLabelStyle::Annotated);
        assert_eq!(fx.target_label(0), "W_1009");
        assert_eq!(fx.target_label(6), "S_100A");
    }

    #[test]
    fn test_simple_style_leaves_labels() {
        let fx = annotated_fixture(AutoLabelStyle::Simple);
        assert_eq!(fx.target_label(0), "L1009");
        assert_eq!(fx.target_label(6), "L100A");
    }

    #[test]
    fn test_uncategorized_string_fill_and_bytes() {
        let mut data = b"HELLO".to_vec();
        data.extend_from_slice(&[0x00; 8]);
        data.extend_from_slice(&[0x01, 0x02]);
        let mut fx = Fixture::new(&data);
        fx.analysis().analyze_uncategorized().unwrap();

        let s = fx.attrs[0].data_descriptor.as_ref().unwrap();
        assert_eq!(s.format_type(), FormatType::StringGeneric);
        assert_eq!(s.sub_type(), FormatSubType::Ascii);
        assert_eq!(s.length(), 5);
        let f = fx.attrs[5].data_descriptor.as_ref().unwrap();
        assert_eq!(f.format_type(), FormatType::Fill);
        assert_eq!(f.length(), 8);
        assert_eq!(
            fx.attrs[13].data_descriptor.as_ref().unwrap().format_type(),
            FormatType::Default
        );
        assert!(fx.attrs.iter().all(|a| a.is_data()));
    }

    #[test]
    fn test_high_ascii_string_locks_case() {
        let data = [0xc1, 0xc2, 0xc3, 0xc4, b'e', b'f', b'g', b'h'];
        let mut fx = Fixture::new(&data);
        fx.analysis().analyze_uncategorized().unwrap();
        let first = fx.attrs[0].data_descriptor.as_ref().unwrap();
        assert_eq!(first.sub_type(), FormatSubType::HighAscii);
        assert_eq!(first.length(), 4);
        let second = fx.attrs[4].data_descriptor.as_ref().unwrap();
        assert_eq!(second.sub_type(), FormatSubType::Ascii);
    }

    #[test]
    fn test_string_prefers_text_over_short_run() {
        let mut fx = Fixture::new(b"*****HI");
        fx.analysis().analyze_uncategorized().unwrap();
        let s = fx.attrs[0].data_descriptor.as_ref().unwrap();
        assert_eq!(s.format_type(), FormatType::StringGeneric);
        assert_eq!(s.length(), 7);
    }

    #[test]
    fn test_short_printable_run_becomes_fill() {
        let mut fx = Fixture::new(b"*****");
        fx.params.min_chars_for_string = 6;
        fx.analysis().analyze_uncategorized().unwrap();
        let f = fx.attrs[0].data_descriptor.as_ref().unwrap();
        assert_eq!(f.format_type(), FormatType::Fill);
        assert_eq!(f.length(), 5);
    }

    #[test]
    fn test_run_below_both_thresholds_is_single_bytes() {
        let mut fx = Fixture::new(b"***");
        fx.params.min_chars_for_string = 6;
        fx.analysis().analyze_uncategorized().unwrap();
        for attr in &fx.attrs {
            let d = attr.data_descriptor.as_ref().unwrap();
            assert_eq!(d.format_type(), FormatType::Default);
            assert_eq!(d.length(), 1);
        }
    }

    #[test]
    fn test_long_runs_stop_being_strings() {
        let mut fx = Fixture::new(&[b'='; 62]);
        fx.analysis().analyze_uncategorized().unwrap();
        let s = fx.attrs[0].data_descriptor.as_ref().unwrap();
        assert_eq!(s.format_type(), FormatType::StringGeneric);
        assert_eq!(s.length(), 62);

        let mut fx = Fixture::new(&[b'='; 63]);
        fx.analysis().analyze_uncategorized().unwrap();
        let f = fx.attrs[0].data_descriptor.as_ref().unwrap();
        assert_eq!(f.format_type(), FormatType::Fill);
        assert_eq!(f.length(), 63);
    }

    #[test]
    fn test_label_and_comment_split_ranges() {
        let mut fx = Fixture::new(b"ABCDEFGH");
        fx.user_label(4, "SECOND");
        let mut da = fx.analysis().with_comment_offsets([6]);
        da.analyze_uncategorized().unwrap();
        drop(da);
        assert_eq!(fx.attrs[0].data_descriptor.as_ref().unwrap().length(), 4);
        // "EF" and "GH" are too short to be strings
        assert_eq!(
            fx.attrs[4].data_descriptor.as_ref().unwrap().format_type(),
            FormatType::Default
        );
        assert_eq!(
            fx.attrs[6].data_descriptor.as_ref().unwrap().format_type(),
            FormatType::Default
        );
    }

    #[test]
    fn test_analysis_disabled_gives_single_bytes() {
        let mut fx = Fixture::new(b"HELLO WORLD");
        fx.params.analyze_uncategorized_data = false;
        fx.analysis().analyze_uncategorized().unwrap();
        assert!(fx.attrs.iter().all(|a| a
            .data_descriptor
            .as_ref()
            .is_some_and(|d| d.format_type() == FormatType::Default)));
    }

    #[test]
    fn test_inline_data_without_format_gets_default() {
        let mut fx = Fixture::new(&[0x60, 0x02, b'A', b'B', 0x33]);
        fx.instr(0, 1, None);
        for a in &mut fx.attrs[1..5] {
            a.flags.insert(AttribFlags::INLINE_DATA);
        }
        fx.attrs[1].data_descriptor =
            Some(FormatDescriptor::create(3, FormatType::StringL8, FormatSubType::Ascii).unwrap());
        fx.analysis().analyze_uncategorized().unwrap();
        assert!(fx.attrs[2].data_descriptor.is_none());
        assert!(fx.attrs[3].data_descriptor.is_none());
        assert_eq!(
            fx.attrs[4].data_descriptor.as_ref().unwrap().format_type(),
            FormatType::Default
        );
        assert!(!fx.attrs[4].is_data());
    }

    #[test]
    fn test_address_discontinuity_splits_range() {
        let data = b"ABCDEFGH".to_vec();
        let mut fx = Fixture::new(&data);
        fx.map = AddressMap::new(
            8,
            vec![
                crate::core::address_map::AddressMapEntry::new(0, 4, 0x1000),
                crate::core::address_map::AddressMapEntry::new(4, 4, 0x3000),
            ],
        )
        .unwrap();
        fx.analysis().analyze_uncategorized().unwrap();
        assert_eq!(fx.attrs[0].data_descriptor.as_ref().unwrap().length(), 4);
        assert_eq!(fx.attrs[4].data_descriptor.as_ref().unwrap().length(), 4);
    }

    #[test]
    fn test_string_detection_disabled() {
        let mut fx = Fixture::new(b"HELLO");
        fx.params.min_chars_for_string = crate::config::MIN_CHARS_FOR_STRING_DISABLED;
        fx.analysis().analyze_uncategorized().unwrap();
        assert!(fx.attrs.iter().all(|a| a.data_descriptor.is_some()));
        assert_eq!(
            fx.attrs[0].data_descriptor.as_ref().unwrap().format_type(),
            FormatType::Default
        );
    }
}
