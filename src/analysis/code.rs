//! Code flow analysis.
//!
//! Starting from every byte hinted as code, the analyzer follows execution
//! forward: it decodes instructions with the CPU table, tracks the processor
//! status flags so 65816 immediate operands get the right width, follows
//! branches and calls into the image, and stops at anything that does not
//! fall through. The result is the per-byte [`Anattrib`] array with every
//! reachable instruction marked.
//!
//! Malformed input never fails the pass. An undefined opcode, an instruction
//! that runs off the end of the image or one that straddles an address region
//! boundary is logged and left as data.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, info, info_span, trace, warn};

use crate::analysis::plugin::{AnalyzerApi, Plugin, PluginCaps, PluginError};
use crate::analysis::OffsetFmt;
use crate::config::AnalysisParameters;
use crate::core::address_map::AddressMap;
use crate::core::anattrib::{Anattrib, AttribFlags, TypeHint};
use crate::core::format_descriptor::{
    FormatDescriptor, FormatSubType, FormatType, SymbolPart, WeakSymbolRef, MAX_NUMERIC_LEN,
};
use crate::cpu::{
    AddressMode, BranchTaken, CpuDef, CpuType, FlagBit, FlagState, FlagTransition, FlowEffect,
    OpDef, StatusFlags,
};
use crate::error::{Glaurung65Error, Result};
use crate::strings::{verify_fill_data, verify_string_data};

/// Flags assumed at an entry point when the caller supplies none: emulation
/// mode with 8-bit registers, everything else unknown.
pub fn default_entry_flags() -> StatusFlags {
    StatusFlags::DEFAULT
        .with(FlagBit::E, FlagState::One)
        .with(FlagBit::M, FlagState::One)
        .with(FlagBit::X, FlagState::One)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineCheck {
    Jsr,
    Jsl,
    Brk,
}

/// Inputs plus the attribute array under construction. Plugins see this
/// through [`AnalyzerApi`].
struct FlowState<'a> {
    data: &'a [u8],
    cpu: &'a CpuDef,
    addr_map: &'a AddressMap,
    hints: &'a [TypeHint],
    overrides: &'a [StatusFlags],
    params: &'a AnalysisParameters,
    attrs: Vec<Anattrib>,
}

impl FlowState<'_> {
    fn hint(&self, offset: usize) -> TypeHint {
        self.hints.get(offset).copied().unwrap_or_default()
    }

    fn flag_override(&self, offset: usize) -> StatusFlags {
        self.overrides.get(offset).copied().unwrap_or_default()
    }
}

impl AnalyzerApi for FlowState<'_> {
    fn data(&self) -> &[u8] {
        self.data
    }

    fn offset_to_address(&self, offset: usize) -> Option<u32> {
        self.addr_map.offset_to_address(offset)
    }

    fn set_operand_format(
        &mut self,
        offset: usize,
        sub_type: FormatSubType,
        label: Option<&str>,
    ) -> std::result::Result<bool, PluginError> {
        if offset >= self.data.len() {
            return Err(PluginError::BadArgs(format!("offset +{:06x}", offset)));
        }
        let attr = &self.attrs[offset];
        if attr.data_descriptor.is_some() {
            debug!(offset = %OffsetFmt(offset), "operand already formatted");
            return Ok(false);
        }
        if !attr.is_instruction_start() {
            return Ok(false);
        }
        let instr_len = attr.instr_length;
        let label = label.unwrap_or("");
        let dfd = match sub_type {
            FormatSubType::Symbol if label.is_empty() => return Ok(false),
            FormatSubType::Symbol => FormatDescriptor::create_symbol(
                instr_len,
                WeakSymbolRef::new(label, SymbolPart::Low),
                false,
            ),
            FormatSubType::Hex
            | FormatSubType::Decimal
            | FormatSubType::Binary
            | FormatSubType::Address
            | FormatSubType::Ascii
            | FormatSubType::HighAscii
            | FormatSubType::C64Petscii
            | FormatSubType::C64Screen => {
                FormatDescriptor::create(instr_len, FormatType::NumericLE, sub_type)
            }
            other => {
                return Err(PluginError::Unsupported(format!(
                    "operand sub-type {}",
                    other
                )))
            }
        }
        .map_err(|e| PluginError::BadArgs(e.to_string()))?;
        self.attrs[offset].data_descriptor = Some(dfd);
        Ok(true)
    }

    fn set_inline_data_format(
        &mut self,
        offset: usize,
        length: usize,
        format_type: FormatType,
        sub_type: FormatSubType,
        label: Option<&str>,
    ) -> std::result::Result<bool, PluginError> {
        let in_range = offset
            .checked_add(length)
            .is_some_and(|end| end <= self.data.len());
        if offset == 0 || length == 0 || !in_range {
            return Err(PluginError::BadArgs(format!(
                "range +{:06x} len {}",
                offset, length
            )));
        }
        if !self.addr_map.is_range_unbroken(offset, length) {
            warn!(offset = %OffsetFmt(offset), length, "inline data crosses an address region boundary");
            return Ok(false);
        }
        if self.attrs[offset].data_descriptor.is_some() {
            debug!(offset = %OffsetFmt(offset), "inline data already formatted");
            return Ok(false);
        }
        for i in offset..offset + length {
            if !matches!(self.hint(i), TypeHint::None | TypeHint::InlineData) {
                debug!(offset = %OffsetFmt(i), "inline data overlaps a type hint");
                return Ok(false);
            }
            if self.attrs[i].is_instruction() {
                debug!(offset = %OffsetFmt(i), "inline data overlaps code");
                return Ok(false);
            }
        }

        match format_type {
            FormatType::Default | FormatType::Junk => {
                return Err(PluginError::Unsupported(format!(
                    "inline data type {}",
                    format_type
                )));
            }
            FormatType::Dense | FormatType::Fill if sub_type != FormatSubType::None => {
                return Err(PluginError::BadArgs(format!(
                    "{} must not have a sub-type",
                    format_type
                )));
            }
            t if t.is_string()
                && (!sub_type.is_string_or_character() || sub_type == FormatSubType::AsciiGeneric) =>
            {
                return Err(PluginError::BadArgs(format!(
                    "{} needs a character encoding, got {}",
                    t, sub_type
                )));
            }
            t if t.is_numeric() && length > MAX_NUMERIC_LEN => {
                return Err(PluginError::BadArgs(format!(
                    "numeric length {} too long",
                    length
                )));
            }
            _ => {}
        }
        let label = label.unwrap_or("");
        if sub_type == FormatSubType::Symbol && label.is_empty() {
            return Err(PluginError::BadArgs("symbol reference without a label".into()));
        }

        if format_type.is_string() {
            if let Err(err) = verify_string_data(self.data, offset, length, format_type) {
                warn!(offset = %OffsetFmt(offset), error = %err, "inline string rejected");
                return Ok(false);
            }
        } else if format_type == FormatType::Fill && !verify_fill_data(self.data, offset, length) {
            warn!(offset = %OffsetFmt(offset), "inline fill bytes differ");
            return Ok(false);
        }

        let dfd = if sub_type == FormatSubType::Symbol {
            FormatDescriptor::create_symbol(
                length,
                WeakSymbolRef::new(label, SymbolPart::Low),
                format_type == FormatType::NumericBE,
            )
        } else {
            FormatDescriptor::create(length, format_type, sub_type)
        }
        .map_err(|e| PluginError::BadArgs(e.to_string()))?;

        self.attrs[offset].data_descriptor = Some(dfd);
        for attr in &mut self.attrs[offset..offset + length] {
            attr.flags.insert(AttribFlags::INLINE_DATA);
        }
        Ok(true)
    }
}

/// One run of the code flow analyzer over an image.
///
/// ```ignore
/// let cpu = CpuDef::best_match(CpuType::Cpu6502, false);
/// let map = AddressMap::single(data.len(), 0x1000)?;
/// let params = AnalysisParameters::default();
/// let attrs = CodeAnalysis::new(&data, &cpu, &map, &params)
///     .with_type_hints(&hints)
///     .analyze(Anattrib::new_array(data.len()))?;
/// ```
pub struct CodeAnalysis<'a> {
    state: FlowState<'a>,
    entry_flags: StatusFlags,
    plugins: &'a mut [Box<dyn Plugin>],
}

impl<'a> CodeAnalysis<'a> {
    pub fn new(
        data: &'a [u8],
        cpu: &'a CpuDef,
        addr_map: &'a AddressMap,
        params: &'a AnalysisParameters,
    ) -> Self {
        CodeAnalysis {
            state: FlowState {
                data,
                cpu,
                addr_map,
                hints: &[],
                overrides: &[],
                params,
                attrs: Vec::new(),
            },
            entry_flags: default_entry_flags(),
            plugins: &mut [],
        }
    }

    /// Per-byte type hints. Without hints nothing is analyzed.
    pub fn with_type_hints(mut self, hints: &'a [TypeHint]) -> Self {
        self.state.hints = hints;
        self
    }

    /// Per-byte status flag overrides, applied whenever flags flow into a byte.
    pub fn with_flag_overrides(mut self, overrides: &'a [StatusFlags]) -> Self {
        self.state.overrides = overrides;
        self
    }

    pub fn with_entry_flags(mut self, flags: StatusFlags) -> Self {
        self.entry_flags = flags;
        self
    }

    pub fn with_plugins(mut self, plugins: &'a mut [Box<dyn Plugin>]) -> Self {
        self.plugins = plugins;
        self
    }

    fn validate(&self, attrs: &[Anattrib]) -> Result<()> {
        let len = self.state.data.len();
        let check = |what: &str, n: usize, optional: bool| {
            if n == len || (optional && n == 0) {
                Ok(())
            } else {
                Err(Glaurung65Error::InvalidInput(format!(
                    "{} has {} entries, image is {} bytes",
                    what, n, len
                )))
            }
        };
        check("attribute array", attrs.len(), false)?;
        check("address map", self.state.addr_map.total_length(), false)?;
        check("type hint array", self.state.hints.len(), true)?;
        check("flag override array", self.state.overrides.len(), true)
    }

    /// Analyze the image, filling in `attrs`, which must be freshly allocated
    /// with one default entry per byte.
    ///
    /// # Errors
    /// Returns an error if the input arrays disagree in length, or if a CPU
    /// table entry yields a zero-length instruction.
    pub fn analyze(mut self, attrs: Vec<Anattrib>) -> Result<Vec<Anattrib>> {
        self.validate(&attrs)?;
        self.state.attrs = attrs;

        let span = info_span!(
            "code_analysis",
            len = self.state.data.len(),
            cpu = self.state.cpu.name
        );
        let _guard = span.enter();

        self.set_addresses();
        self.unpack_type_hints();

        let mut scan: Vec<usize> = Vec::new();
        let mut search_start = 0;
        let mut entries = 0usize;
        while let Some(entry) = self.find_first_unvisited(search_start) {
            debug!(offset = %OffsetFmt(entry), "entry point");
            entries += 1;
            let ovr = self.state.flag_override(entry);
            let attr = &mut self.state.attrs[entry];
            attr.flags.insert(AttribFlags::ENTRY_POINT);
            attr.status_flags = self.entry_flags;
            attr.status_flags.apply(ovr);

            let mut offset = entry;
            loop {
                self.analyze_segment(offset, &mut scan)?;
                match scan.pop() {
                    Some(next) => offset = next,
                    None => break,
                }
            }
            search_start = entry;
        }

        self.mark_unexecuted_embedded_code()?;
        info!(entries, "code analysis complete");
        Ok(self.state.attrs)
    }

    fn set_addresses(&mut self) {
        let map = self.state.addr_map;
        for ent in map.entries() {
            let region = &mut self.state.attrs[ent.offset..ent.offset + ent.length];
            for (i, attr) in region.iter_mut().enumerate() {
                attr.address = ent.address + i as u32;
            }
            self.state.attrs[ent.offset]
                .flags
                .insert(AttribFlags::ADDR_REGION_CHANGE);
        }
    }

    fn unpack_type_hints(&mut self) {
        let (data, cpu) = (self.state.data, self.state.cpu);
        for offset in 0..data.len() {
            let flag = match self.state.hint(offset) {
                TypeHint::None => continue,
                TypeHint::Code => {
                    if !cpu.op(data[offset]).is_valid() {
                        debug!(
                            offset = %OffsetFmt(offset),
                            opcode = data[offset],
                            "ignoring code hint on invalid opcode"
                        );
                        continue;
                    }
                    AttribFlags::INSTRUCTION
                }
                TypeHint::Data => AttribFlags::DATA,
                TypeHint::InlineData => AttribFlags::INLINE_DATA,
            };
            self.state.attrs[offset]
                .flags
                .insert(AttribFlags::HINTED | flag);
        }
    }

    fn find_first_unvisited(&self, start: usize) -> Option<usize> {
        (start..self.state.data.len()).find(|&offset| {
            let attr = &self.state.attrs[offset];
            if !attr.is_hinted() || attr.is_visited() || self.state.hint(offset) != TypeHint::Code {
                return false;
            }
            if attr.is_data() || attr.is_inline_data() {
                warn!(offset = %OffsetFmt(offset), "code hint on data, skipping");
                return false;
            }
            true
        })
    }

    fn reject_as_data(&mut self, offset: usize) {
        let flags = &mut self.state.attrs[offset].flags;
        flags.remove(AttribFlags::INSTR_START | AttribFlags::INSTRUCTION);
        flags.insert(AttribFlags::DATA);
    }

    /// Walk forward from `offset` until the flow stops, queueing branch
    /// targets on `scan`.
    fn analyze_segment(&mut self, mut offset: usize, scan: &mut Vec<usize>) -> Result<()> {
        let data = self.state.data;
        let len = data.len();

        while offset < len {
            let attr = &mut self.state.attrs[offset];
            if attr.is_visited() && !attr.is_changed() {
                trace!(offset = %OffsetFmt(offset), "already visited");
                return Ok(());
            }
            let first_visit = !attr.is_visited();
            attr.flags.insert(AttribFlags::VISITED);
            attr.flags.remove(AttribFlags::CHANGED);

            if attr.is_data() {
                debug!(offset = %OffsetFmt(offset), "code ran into data");
                return Ok(());
            }
            if attr.is_inline_data() {
                warn!(offset = %OffsetFmt(offset), "code ran into inline data");
                return Ok(());
            }

            let op: OpDef = *self.state.cpu.op(data[offset]);
            let flags = attr.status_flags;
            let instr_len = op.length(flags);

            if offset + instr_len > len {
                warn!(offset = %OffsetFmt(offset), len = instr_len, "instruction runs off end of file");
                self.reject_as_data(offset);
                return Ok(());
            }
            if (offset + 1..offset + instr_len).any(|i| self.state.attrs[i].is_addr_region_change()) {
                warn!(offset = %OffsetFmt(offset), "instruction crosses an address region boundary");
                self.reject_as_data(offset);
                return Ok(());
            }
            if !op.is_valid() {
                warn!(offset = %OffsetFmt(offset), opcode = data[offset], "invalid opcode");
                return Ok(());
            }
            if instr_len == 0 {
                return Err(Glaurung65Error::Internal(format!(
                    "zero-length instruction {} at +{:06x}",
                    op, offset
                )));
            }

            let start = &mut self.state.attrs[offset];
            start.flags.insert(AttribFlags::INSTR_START);
            start.instr_length = instr_len;
            for (i, attr) in self.state.attrs[offset..offset + instr_len]
                .iter_mut()
                .enumerate()
            {
                if attr.is_data() || attr.is_inline_data() {
                    warn!(offset = %OffsetFmt(offset + i), "instruction overlaps data, reclaiming");
                    attr.flags
                        .remove(AttribFlags::DATA | AttribFlags::INLINE_DATA);
                    attr.data_descriptor = None;
                }
                attr.flags.insert(AttribFlags::INSTRUCTION);
            }

            let transition = if op.is_plp() {
                let restored = self.guess_flags_for_plp(offset);
                FlagTransition {
                    next: restored,
                    taken: restored,
                }
            } else {
                op.compute_flag_changes(flags, data, offset)
            };

            if first_visit {
                self.decode_operand_address(offset, &op);
            }

            let mut branch_offset = None;
            if op.is_branch_or_sub_call() {
                let attr = &mut self.state.attrs[offset];
                if attr.is_operand_offset_direct {
                    branch_offset = attr.operand_offset;
                }
                if branch_offset.is_none() {
                    if !op.is_subroutine_call() {
                        debug!(offset = %OffsetFmt(offset), target = ?attr.operand_address, "branch leaves the file");
                    }
                    attr.flags.insert(AttribFlags::EXTERNAL_BRANCH);
                }
            }

            let mut do_continue = matches!(
                op.effect,
                FlowEffect::Cont | FlowEffect::CallSubroutine | FlowEffect::ConditionalBranch
            );
            if op.effect == FlowEffect::ConditionalBranch {
                if let Some(taken) = op.branch_taken(flags) {
                    match taken {
                        BranchTaken::Never => branch_offset = None,
                        BranchTaken::Always => do_continue = false,
                        BranchTaken::Indeterminate => {}
                    }
                    self.state.attrs[offset].branch_taken = taken;
                }
            }

            if let Some(target) = branch_offset {
                let tattr = &self.state.attrs[target];
                if tattr.is_data() || tattr.is_inline_data() {
                    warn!(
                        offset = %OffsetFmt(offset),
                        target = %OffsetFmt(target),
                        "branch into data, not following"
                    );
                } else {
                    self.follow_branch(target, transition.taken, scan);
                }
            }

            if op.is_brk() {
                let no_continue = self.check_inline_call(&op, offset, !do_continue);
                if !no_continue {
                    do_continue = true;
                }
            }

            self.state.attrs[offset]
                .flags
                .set(AttribFlags::NO_CONTINUE, !do_continue);
            if self.state.attrs[offset].does_not_continue() {
                break;
            }

            let mut next = offset + instr_len;
            if next >= len {
                warn!(offset = %OffsetFmt(offset), "code runs off end of file");
                break;
            }

            if first_visit && (op.is_jsr_abs() || op.is_jsl()) && self.check_inline_call(&op, offset, false) {
                debug!(offset = %OffsetFmt(offset), "call does not return");
                self.state.attrs[offset]
                    .flags
                    .insert(AttribFlags::NO_CONTINUE_SCRIPT);
                break;
            }

            let mut gap = 0u32;
            while next < len && self.state.attrs[next].is_inline_data() {
                gap += 1;
                next += 1;
            }
            if next >= len {
                warn!(offset = %OffsetFmt(offset), "inline data runs off end of file");
                break;
            }
            if self.state.attrs[next].is_data() {
                debug!(offset = %OffsetFmt(next), "code ran into data");
                break;
            }
            let expected = self.state.attrs[offset]
                .address
                .wrapping_add(instr_len as u32)
                .wrapping_add(gap);
            if self.state.attrs[next].address != expected {
                debug!(offset = %OffsetFmt(next), "address discontinuity, stopping");
                break;
            }

            let ovr = self.state.flag_override(next);
            let nattr = &mut self.state.attrs[next];
            let before = nattr.status_flags;
            nattr.status_flags.merge(transition.next);
            nattr.status_flags.apply(ovr);
            if nattr.is_visited() && !nattr.is_changed() {
                if nattr.status_flags == before {
                    break;
                }
                nattr.flags.insert(AttribFlags::CHANGED);
            }
            offset = next;
        }
        Ok(())
    }

    fn follow_branch(&mut self, target: usize, taken: StatusFlags, scan: &mut Vec<usize>) {
        let ovr = self.state.flag_override(target);
        let attr = &mut self.state.attrs[target];
        attr.flags.insert(AttribFlags::BRANCH_TARGET);
        let before = attr.status_flags;
        attr.status_flags.merge(taken);
        attr.status_flags.apply(ovr);

        let queue = if !attr.is_visited() {
            true
        } else if attr.status_flags != before {
            attr.flags.insert(AttribFlags::CHANGED);
            true
        } else {
            false
        };
        if queue && !scan.contains(&target) {
            trace!(target = %OffsetFmt(target), "queued");
            scan.push(target);
        }
    }

    /// Flags in effect after a PLP at `plp_offset`.
    ///
    /// With smart PLP handling the flags captured at the nearest earlier PHP
    /// are reused. Failing that everything is indeterminate, except that on
    /// the 65816 the register widths are kept so operand lengths stay sane.
    /// The E flag is never restored by PLP.
    fn guess_flags_for_plp(&self, plp_offset: usize) -> StatusFlags {
        let mut flags = StatusFlags::ALL_INDETERMINATE;
        if self.state.params.smart_plp_handling {
            let limit = plp_offset.saturating_sub(self.state.params.plp_search_window);
            for offset in (limit..plp_offset).rev() {
                let attr = &self.state.attrs[offset];
                if !attr.is_instruction_start() || !attr.is_visited() {
                    continue;
                }
                if self.state.cpu.op(self.state.data[offset]).is_php() {
                    trace!(php = %OffsetFmt(offset), plp = %OffsetFmt(plp_offset), "matched PHP");
                    flags = attr.status_flags;
                    break;
                }
            }
        }

        let cur = self.state.attrs[plp_offset].status_flags;
        if flags == StatusFlags::ALL_INDETERMINATE && self.state.cpu.cpu_type == CpuType::Cpu65816 {
            flags.set(FlagBit::M, cur.get(FlagBit::M));
            flags.set(FlagBit::X, cur.get(FlagBit::X));
        }
        flags.set(FlagBit::E, cur.get(FlagBit::E));
        flags
    }

    /// Work out the address an operand refers to and, when it is inside the
    /// image, its file offset.
    ///
    /// Absolute operands take the bank of the instruction itself. That is
    /// correct for jumps and only an approximation for data accesses, which
    /// use the data bank register.
    fn decode_operand_address(&mut self, offset: usize, op: &OpDef) {
        use AddressMode::*;

        let attr = &self.state.attrs[offset];
        let Some(operand) = op.operand(self.state.data, offset, attr.status_flags) else {
            return;
        };
        let addr = attr.address;
        let bank = addr & 0x7fff_0000;
        let target = match op.addr_mode {
            Abs | AbsIndexX | AbsIndexY | StackAbs | AbsIndexXInd => operand | bank,
            AbsInd | AbsIndLong | Dp | DpIndexX | DpIndexY | DpIndexXInd | DpInd | DpIndLong
            | DpIndIndexY | DpIndIndexYLong | StackDpInd => operand,
            AbsLong | AbsIndexXLong => operand,
            PcRel => rel_offset8(addr, operand as u8 as i8) | bank,
            PcRelLong | StackPcRelLong => rel_offset16(addr, operand as u16 as i16) | bank,
            _ => return,
        };

        let operand_offset = self.state.addr_map.address_to_offset(offset, target);
        let attr = &mut self.state.attrs[offset];
        attr.operand_address = Some(target);
        attr.operand_offset = operand_offset;
        attr.is_operand_offset_direct = operand_offset.is_some()
            && matches!(
                op.addr_mode,
                Abs | AbsLong | Dp | PcRel | PcRelLong | StackPcRelLong | StackAbs
            );
    }

    /// Ask the plugins about a JSR, JSL or BRK. JSR/JSL votes are OR-ed
    /// into `no_continue`; BRK votes are AND-ed.
    fn check_inline_call(&mut self, op: &OpDef, offset: usize, mut no_continue: bool) -> bool {
        let (cap, kind) = if op.is_jsr_abs() {
            (PluginCaps::JSR, InlineCheck::Jsr)
        } else if op.is_jsl() {
            (PluginCaps::JSL, InlineCheck::Jsl)
        } else if op.is_brk() {
            (PluginCaps::BRK, InlineCheck::Brk)
        } else {
            return no_continue;
        };
        let flags = self.state.attrs[offset].status_flags;
        let operand = op.operand(self.state.data, offset, flags).unwrap_or(0);
        let two_byte = op.addr_mode == AddressMode::StackInt;

        let state = &mut self.state;
        for plugin in self.plugins.iter_mut() {
            if !plugin.capabilities().contains(cap) {
                continue;
            }
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| match kind {
                InlineCheck::Jsr => plugin.check_jsr(&mut *state, offset, operand),
                InlineCheck::Jsl => plugin.check_jsl(&mut *state, offset, operand),
                InlineCheck::Brk => plugin.check_brk(&mut *state, offset, two_byte),
            }));
            match outcome {
                Ok(Ok(vote)) => {
                    if kind == InlineCheck::Brk {
                        no_continue &= vote;
                    } else {
                        no_continue |= vote;
                    }
                }
                Ok(Err(err)) => warn!(
                    plugin = plugin.name(),
                    offset = %OffsetFmt(offset),
                    error = %err,
                    "plugin check failed"
                ),
                Err(_) => warn!(
                    plugin = plugin.name(),
                    offset = %OffsetFmt(offset),
                    "plugin panicked"
                ),
            }
        }
        no_continue
    }

    /// Bytes that belong to an instruction some path decoded but where no
    /// path ever started an instruction become one-byte inline data.
    fn mark_unexecuted_embedded_code(&mut self) -> Result<()> {
        let len = self.state.data.len();
        let mut offset = 0;
        while offset < len {
            let attr = &self.state.attrs[offset];
            if attr.is_instruction_start() {
                let instr_len = attr.instr_length.max(1);
                let mut step = 1;
                while step < instr_len && !self.state.attrs[offset + step].is_instruction_start() {
                    step += 1;
                }
                offset += step;
                continue;
            }
            if attr.is_instruction() {
                let stray = attr.is_data() || attr.is_inline_data();
                let attr = &mut self.state.attrs[offset];
                attr.flags.remove(AttribFlags::INSTRUCTION);
                if !stray {
                    debug!(offset = %OffsetFmt(offset), "unexecuted embedded code");
                    attr.flags.insert(AttribFlags::INLINE_DATA);
                    attr.data_descriptor = Some(FormatDescriptor::create(
                        1,
                        FormatType::NumericLE,
                        FormatSubType::None,
                    )?);
                }
            }
            offset += 1;
        }
        Ok(())
    }
}

/// Target of an 8-bit relative branch, wrapping within the bank.
fn rel_offset8(addr: u32, disp: i8) -> u32 {
    ((addr & 0xffff) as i32 + 2 + disp as i32) as u32 & 0xffff
}

/// Target of a 16-bit relative branch, wrapping within the bank.
fn rel_offset16(addr: u32, disp: i16) -> u32 {
    ((addr & 0xffff) as i32 + 3 + disp as i32) as u32 & 0xffff
}
