//! Shared builders for integration tests.

#![allow(dead_code)]

use glaurung65::{
    AddressMap, AddressMapEntry, AnalysisOutput, AnalysisParameters, Analyzer, CpuDef, CpuType,
    LabelAnnotation, Symbol, SymbolSource, SymbolType, TypeHint,
};

/// A byte image with its load address and code hints.
pub struct Image {
    pub data: Vec<u8>,
    pub map: AddressMap,
    pub hints: Vec<TypeHint>,
    pub cpu: CpuDef,
}

impl Image {
    /// Image loaded at `addr` with a code hint on the first byte.
    pub fn at(addr: u32, data: &[u8]) -> Self {
        Self::with_cpu(CpuType::Cpu6502, addr, data)
    }

    pub fn with_cpu(cpu_type: CpuType, addr: u32, data: &[u8]) -> Self {
        let mut hints = vec![TypeHint::None; data.len()];
        if !hints.is_empty() {
            hints[0] = TypeHint::Code;
        }
        Image {
            data: data.to_vec(),
            map: AddressMap::single(data.len(), addr).expect("address map"),
            hints,
            cpu: CpuDef::best_match(cpu_type, false),
        }
    }

    /// Replace the address map with regions given as `(offset, length, address)`.
    pub fn regions(mut self, regions: &[(usize, usize, u32)]) -> Self {
        let entries = regions
            .iter()
            .map(|&(offset, length, address)| AddressMapEntry::new(offset, length, address))
            .collect();
        self.map = AddressMap::new(self.data.len(), entries).expect("address map");
        self
    }

    pub fn hint(mut self, offset: usize, hint: TypeHint) -> Self {
        self.hints[offset] = hint;
        self
    }

    /// Run the full pipeline with default parameters.
    pub fn analyze(&self) -> AnalysisOutput {
        let params = AnalysisParameters::default();
        Analyzer::new(&self.data, &self.cpu, &self.map, &params)
            .with_type_hints(&self.hints)
            .run()
            .expect("analysis")
    }
}

pub fn user_label(label: &str, value: u32) -> Symbol {
    Symbol::new(
        label,
        value,
        SymbolSource::User,
        SymbolType::GlobalAddr,
        LabelAnnotation::None,
    )
    .expect("valid label")
}

pub fn platform_symbol(label: &str, value: u32) -> Symbol {
    Symbol::new(
        label,
        value,
        SymbolSource::Platform,
        SymbolType::ExternalAddr,
        LabelAnnotation::None,
    )
    .expect("valid label")
}

/// Label referenced by the operand or data item at `offset`, if any.
pub fn operand_label(out: &AnalysisOutput, offset: usize) -> Option<String> {
    out.attrs[offset]
        .data_descriptor
        .as_ref()
        .and_then(|d| d.symbol_ref())
        .map(|r| r.label.clone())
}

/// Walk the attribute array line by line, returning each line's start offset.
pub fn line_starts(out: &AnalysisOutput) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut offset = 0;
    while offset < out.attrs.len() {
        starts.push(offset);
        offset += out.attrs[offset].length().max(1);
    }
    starts
}
