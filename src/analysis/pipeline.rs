//! The full analysis sequence for one project.
//!
//! [`Analyzer`] takes the image plus everything the user has told us about it
//! (entry hints, labels, formats, symbol files) and produces the per-byte
//! attribute array, the populated symbol table and a list of problems found
//! along the way. Bad project data is reported and skipped; only internal
//! failures are returned as errors.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::analysis::code::{default_entry_flags, CodeAnalysis};
use crate::analysis::data::DataAnalysis;
use crate::analysis::messages::{MessageEntry, MessageList, MessageType, Resolution, Severity};
use crate::analysis::plugin::Plugin;
use crate::analysis::OffsetFmt;
use crate::config::AnalysisParameters;
use crate::core::address_map::AddressMap;
use crate::core::anattrib::{Anattrib, TypeHint};
use crate::core::format_descriptor::FormatDescriptor;
use crate::core::symbol::{DefSymbol, Symbol};
use crate::cpu::{CpuDef, StatusFlags};
use crate::error::{Glaurung65Error, Result};
use crate::symbols::SymbolTable;

/// Result of [`Analyzer::run`].
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub attrs: Vec<Anattrib>,
    pub symbols: SymbolTable,
    pub messages: MessageList,
}

/// Analysis session over one image and its project data.
pub struct Analyzer<'a> {
    data: &'a [u8],
    cpu: &'a CpuDef,
    addr_map: &'a AddressMap,
    params: &'a AnalysisParameters,
    entry_flags: StatusFlags,
    type_hints: &'a [TypeHint],
    flag_overrides: &'a [StatusFlags],
    platform_symbols: &'a [Vec<DefSymbol>],
    project_symbols: &'a [DefSymbol],
    user_labels: &'a [(usize, Symbol)],
    operand_formats: &'a BTreeMap<usize, Arc<FormatDescriptor>>,
    comment_offsets: &'a BTreeSet<usize>,
    plugins: &'a mut [Box<dyn Plugin>],
}

static NO_FORMATS: BTreeMap<usize, Arc<FormatDescriptor>> = BTreeMap::new();
static NO_COMMENTS: BTreeSet<usize> = BTreeSet::new();

impl<'a> Analyzer<'a> {
    pub fn new(
        data: &'a [u8],
        cpu: &'a CpuDef,
        addr_map: &'a AddressMap,
        params: &'a AnalysisParameters,
    ) -> Self {
        Analyzer {
            data,
            cpu,
            addr_map,
            params,
            entry_flags: default_entry_flags(),
            type_hints: &[],
            flag_overrides: &[],
            platform_symbols: &[],
            project_symbols: &[],
            user_labels: &[],
            operand_formats: &NO_FORMATS,
            comment_offsets: &NO_COMMENTS,
            plugins: &mut [],
        }
    }

    pub fn with_entry_flags(mut self, flags: StatusFlags) -> Self {
        self.entry_flags = flags;
        self
    }

    pub fn with_type_hints(mut self, hints: &'a [TypeHint]) -> Self {
        self.type_hints = hints;
        self
    }

    pub fn with_flag_overrides(mut self, overrides: &'a [StatusFlags]) -> Self {
        self.flag_overrides = overrides;
        self
    }

    /// Platform symbol files in load order. Later files replace labels
    /// defined by earlier ones.
    pub fn with_platform_symbols(mut self, files: &'a [Vec<DefSymbol>]) -> Self {
        self.platform_symbols = files;
        self
    }

    pub fn with_project_symbols(mut self, symbols: &'a [DefSymbol]) -> Self {
        self.project_symbols = symbols;
        self
    }

    /// User labels keyed by file offset.
    pub fn with_user_labels(mut self, labels: &'a [(usize, Symbol)]) -> Self {
        self.user_labels = labels;
        self
    }

    /// User format descriptors for operands and data items, keyed by offset.
    pub fn with_operand_formats(
        mut self,
        formats: &'a BTreeMap<usize, Arc<FormatDescriptor>>,
    ) -> Self {
        self.operand_formats = formats;
        self
    }

    /// Offsets carrying comments or notes.
    pub fn with_comment_offsets(mut self, offsets: &'a BTreeSet<usize>) -> Self {
        self.comment_offsets = offsets;
        self
    }

    pub fn with_plugins(mut self, plugins: &'a mut [Box<dyn Plugin>]) -> Self {
        self.plugins = plugins;
        self
    }

    /// Run every pass.
    ///
    /// # Errors
    /// Fails if the inputs disagree in length, or if auto-label generation
    /// runs out of unique names.
    pub fn run(mut self) -> Result<AnalysisOutput> {
        if self.addr_map.total_length() != self.data.len() {
            return Err(Glaurung65Error::InvalidAddressMap(format!(
                "map covers {} bytes, image is {}",
                self.addr_map.total_length(),
                self.data.len()
            )));
        }
        let span = crate::span_trace!("analyze", len = self.data.len(), cpu = self.cpu.name);
        let _guard = span.enter();

        let mut messages = MessageList::new();
        let mut symbols = SymbolTable::new();
        self.merge_def_symbols(&mut symbols);
        let labels = self.merge_user_labels(&mut symbols, &mut messages);

        let mut attrs = CodeAnalysis::new(self.data, self.cpu, self.addr_map, self.params)
            .with_type_hints(self.type_hints)
            .with_flag_overrides(self.flag_overrides)
            .with_entry_flags(self.entry_flags)
            .with_plugins(&mut *self.plugins)
            .analyze(Anattrib::new_array(self.data.len()))
            .map_err(|e| crate::log_error!(e, "code analysis failed"))?;

        apply_user_labels(&labels, &mut attrs, &mut messages);
        self.apply_format_descriptors(&mut attrs, &mut messages);

        {
            let mut da = DataAnalysis::new(
                self.data,
                self.cpu,
                self.addr_map,
                self.params,
                &mut symbols,
                &mut attrs,
            )?
            .with_comment_offsets(self.comment_offsets.iter().copied());
            da.analyze_data_targets()
                .map_err(|e| crate::log_error!(e, "data target resolution failed"))?;
            da.analyze_uncategorized()?;
            da.annotate_auto_labels()?;
        }

        remove_hidden_labels(&labels, &mut attrs, &mut symbols, &mut messages);

        info!(
            symbols = symbols.len(),
            messages = messages.len(),
            "analysis complete"
        );
        Ok(AnalysisOutput {
            attrs,
            symbols,
            messages,
        })
    }

    fn merge_def_symbols(&self, symbols: &mut SymbolTable) {
        for file in self.platform_symbols {
            for def in file {
                symbols.set(def.clone());
            }
        }
        for def in self.project_symbols {
            symbols.set(def.clone());
        }
        debug!(count = symbols.len(), "platform and project symbols merged");
    }

    /// Check the user labels and merge the good ones into the table, fixing
    /// up values left stale by address map edits. Returns the accepted
    /// labels.
    fn merge_user_labels(
        &self,
        symbols: &mut SymbolTable,
        messages: &mut MessageList,
    ) -> Vec<(usize, Symbol)> {
        let mut accepted = Vec::with_capacity(self.user_labels.len());
        let mut seen = BTreeSet::new();
        let mut names = BTreeSet::new();
        for (offset, sym) in self.user_labels {
            let Some(addr) = self.addr_map.offset_to_address(*offset) else {
                error!(offset = %OffsetFmt(*offset), label = %sym.label, "label offset outside image");
                messages.add(MessageEntry::new(
                    Severity::Error,
                    *offset,
                    MessageType::InvalidOffsetOrLength,
                    sym.label.clone(),
                    Resolution::LabelIgnored,
                ));
                continue;
            };
            if seen.contains(offset) || names.contains(sym.label.as_str()) {
                warn!(offset = %OffsetFmt(*offset), label = %sym.label, "duplicate label");
                messages.add(MessageEntry::new(
                    Severity::Warning,
                    *offset,
                    MessageType::DuplicateLabel,
                    sym.label.clone(),
                    Resolution::LabelIgnored,
                ));
                continue;
            }
            seen.insert(*offset);
            names.insert(sym.label.as_str());
            let mut sym = sym.clone();
            if sym.value != addr {
                debug!(label = %sym.label, old = sym.value, new = addr, "updating label value");
                sym.value = addr;
            }
            symbols.set(sym.clone());
            accepted.push((*offset, sym));
        }
        accepted
    }

    fn apply_format_descriptors(&self, attrs: &mut [Anattrib], messages: &mut MessageList) {
        info!(count = self.operand_formats.len(), "applying format descriptors");
        for (&offset, dfd) in self.operand_formats {
            match self.check_format(offset, dfd, attrs) {
                Ok(()) => attrs[offset].data_descriptor = Some(Arc::clone(dfd)),
                Err((severity, msg_type, context)) => {
                    warn!(offset = %OffsetFmt(offset), "{}", context);
                    messages.add(MessageEntry::new(
                        severity,
                        offset,
                        msg_type,
                        context,
                        Resolution::FormatDescriptorIgnored,
                    ));
                }
            }
        }
    }

    fn check_format(
        &self,
        offset: usize,
        dfd: &FormatDescriptor,
        attrs: &[Anattrib],
    ) -> std::result::Result<(), (Severity, MessageType, String)> {
        use MessageType::*;
        use Severity::*;

        let len = self.data.len();
        if offset >= len {
            return Err((Error, InvalidOffsetOrLength, format!("invalid offset (desc={})", dfd)));
        }
        if offset + dfd.length() > len {
            return Err((
                Error,
                InvalidOffsetOrLength,
                format!("invalid offset+len: len={} file={}", dfd.length(), len),
            ));
        }
        if !self.addr_map.is_range_unbroken(offset, dfd.length()) {
            return Err((
                Warning,
                InvalidOffsetOrLength,
                format!("descriptor straddles address change; len={}", dfd.length()),
            ));
        }

        let attr = &attrs[offset];
        if attr.is_instruction_start() {
            if dfd.length() != attr.length() {
                return Err((
                    Warning,
                    InvalidOffsetOrLength,
                    format!(
                        "unexpected length on instr format descriptor ({} vs {})",
                        dfd.length(),
                        attr.length()
                    ),
                ));
            }
            if dfd.length() == 1 {
                return Err((
                    Warning,
                    InvalidDescriptor,
                    "unexpected format descriptor on single-byte op".to_string(),
                ));
            }
            if !dfd.is_valid_for_instruction() {
                return Err((
                    Warning,
                    InvalidDescriptor,
                    format!("descriptor not valid for instruction: {}", dfd),
                ));
            }
        } else if attr.is_instruction() {
            return Err((
                Warning,
                InvalidDescriptor,
                "unexpected mid-instruction format descriptor".to_string(),
            ));
        } else if let Some(i) =
            (offset..offset + dfd.length()).find(|&i| attrs[i].is_instruction())
        {
            return Err((
                Warning,
                InvalidDescriptor,
                format!("data format descriptor overlaps code at {}", OffsetFmt(i)),
            ));
        }
        Ok(())
    }
}

fn apply_user_labels(labels: &[(usize, Symbol)], attrs: &mut [Anattrib], messages: &mut MessageList) {
    for (offset, sym) in labels {
        let attr = &mut attrs[*offset];
        if let Some(existing) = &attr.symbol {
            warn!(
                offset = %OffsetFmt(*offset),
                "multiple labels: {} / {}",
                sym.label,
                existing.label
            );
            messages.add(MessageEntry::new(
                Severity::Warning,
                *offset,
                MessageType::DuplicateLabel,
                sym.label.clone(),
                Resolution::LabelIgnored,
            ));
            continue;
        }
        attr.symbol = Some(sym.clone());
    }
}

/// Drop user labels that ended up inside an instruction or data item.
fn remove_hidden_labels(
    labels: &[(usize, Symbol)],
    attrs: &mut [Anattrib],
    symbols: &mut SymbolTable,
    messages: &mut MessageList,
) {
    for (offset, sym) in labels {
        if attrs[*offset].is_start() {
            continue;
        }
        debug!(label = %sym.label, "stripping hidden label");
        symbols.remove(&sym.label);
        if attrs[*offset].symbol.as_ref() == Some(sym) {
            attrs[*offset].symbol = None;
        }
        messages.add(MessageEntry::new(
            Severity::Warning,
            *offset,
            MessageType::HiddenLabel,
            sym.label.clone(),
            Resolution::LabelIgnored,
        ));
    }
}
