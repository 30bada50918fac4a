//! CPU definitions and their 256-entry opcode tables.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::flags::FlagBit;
use super::opdef::{AddressMode::*, FlagUpdate as F, FlowEffect::*, OpDef};
use crate::error::{Glaurung65Error, Result};

/// CPU families with distinct instruction sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpuType {
    #[serde(rename = "6502")]
    Cpu6502,
    #[serde(rename = "65C02")]
    Cpu65C02,
    #[serde(rename = "65816")]
    Cpu65816,
}

impl CpuType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CpuType::Cpu6502 => "6502",
            CpuType::Cpu65C02 => "65C02",
            CpuType::Cpu65816 => "65816",
        }
    }

    /// Map a part number to its instruction set family.
    pub fn from_name(name: &str) -> Option<CpuType> {
        match name.to_ascii_uppercase().as_str() {
            "6502" | "6502B" | "6502C" | "6507" | "6510" | "8502" | "2A03" => {
                Some(CpuType::Cpu6502)
            }
            "65C02" | "65SC02" => Some(CpuType::Cpu65C02),
            "65802" | "65816" | "5A22" => Some(CpuType::Cpu65816),
            _ => None,
        }
    }
}

impl fmt::Display for CpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CpuType {
    type Err = Glaurung65Error;

    fn from_str(s: &str) -> Result<Self> {
        CpuType::from_name(s)
            .ok_or_else(|| Glaurung65Error::InvalidInput(format!("unknown CPU '{}'", s)))
    }
}

/// Instruction set of one CPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuDef {
    pub cpu_type: CpuType,
    pub name: &'static str,
    pub max_address: u32,
    /// True if the E flag exists (65802/65816)
    pub has_emu_flag: bool,
    pub include_undocumented: bool,
    ops: [OpDef; 256],
}

impl CpuDef {
    /// Table for `cpu_type`. When `include_undocumented` is false the
    /// undocumented opcodes decode as invalid.
    pub fn best_match(cpu_type: CpuType, include_undocumented: bool) -> CpuDef {
        let (name, max_address, has_emu_flag, table): (_, _, _, &[OpDef; 256]) = match cpu_type {
            CpuType::Cpu6502 => ("MOS 6502", 0xffff, false, &*TABLE_6502),
            CpuType::Cpu65C02 => ("WDC W65C02S", 0xffff, false, &*TABLE_65C02),
            CpuType::Cpu65816 => ("WDC W65C816S", 0xff_ffff, true, &*TABLE_65816),
        };
        let mut ops = *table;
        if !include_undocumented {
            for op in ops.iter_mut().filter(|op| op.undocumented) {
                *op = OpDef::invalid(op.opcode);
            }
        }
        CpuDef {
            cpu_type,
            name,
            max_address,
            has_emu_flag,
            include_undocumented,
            ops,
        }
    }

    pub fn op(&self, opcode: u8) -> &OpDef {
        &self.ops[opcode as usize]
    }

    /// True when addresses fit in 16 bits.
    pub fn has_addr16(&self) -> bool {
        self.max_address <= 0xffff
    }

    pub fn ops(&self) -> impl Iterator<Item = &OpDef> {
        self.ops.iter()
    }
}

impl fmt::Display for CpuDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}{})",
            self.name,
            self.cpu_type,
            if self.include_undocumented { ", undoc" } else { "" }
        )
    }
}

const fn op(
    opcode: u8,
    mnemonic: &'static str,
    mode: super::opdef::AddressMode,
    effect: super::opdef::FlowEffect,
    update: F,
) -> OpDef {
    OpDef::new(opcode, mnemonic, mode, effect, update)
}

const fn cont(opcode: u8, mnemonic: &'static str, mode: super::opdef::AddressMode, update: F) -> OpDef {
    OpDef::new(opcode, mnemonic, mode, Cont, update)
}

const fn force(opcode: u8, mnemonic: &'static str, bit: FlagBit, value: bool) -> OpDef {
    OpDef::new(opcode, mnemonic, Implied, Cont, F::Force(bit, value))
}

const fn bra(opcode: u8, mnemonic: &'static str, bit: FlagBit, when: bool) -> OpDef {
    OpDef::new(opcode, mnemonic, PcRel, ConditionalBranch, F::Branch(bit, when))
}

fn build(layers: &[&[OpDef]]) -> [OpDef; 256] {
    let mut table: [OpDef; 256] = std::array::from_fn(|i| OpDef::invalid(i as u8));
    for layer in layers {
        for op in layer.iter() {
            table[op.opcode as usize] = *op;
        }
    }
    table
}

static TABLE_6502: Lazy<[OpDef; 256]> = Lazy::new(|| build(&[NMOS_6502, NMOS_6502_UNDOC]));

static TABLE_65C02: Lazy<[OpDef; 256]> =
    Lazy::new(|| build(&[NMOS_6502, CMOS_65C02, CMOS_65C02_UNDOC]));

static TABLE_65816: Lazy<[OpDef; 256]> =
    Lazy::new(|| build(&[NMOS_6502, CMOS_65C02, W65816]));

/// Documented NMOS 6502 instructions, shared by every family.
const NMOS_6502: &[OpDef] = &[
    cont(0x69, "ADC", Imm, F::Nvzc),
    cont(0x65, "ADC", Dp, F::Nvzc),
    cont(0x75, "ADC", DpIndexX, F::Nvzc),
    cont(0x6d, "ADC", Abs, F::Nvzc),
    cont(0x7d, "ADC", AbsIndexX, F::Nvzc),
    cont(0x79, "ADC", AbsIndexY, F::Nvzc),
    cont(0x61, "ADC", DpIndexXInd, F::Nvzc),
    cont(0x71, "ADC", DpIndIndexY, F::Nvzc),
    cont(0x29, "AND", Imm, F::AndImm),
    cont(0x25, "AND", Dp, F::Nz),
    cont(0x35, "AND", DpIndexX, F::Nz),
    cont(0x2d, "AND", Abs, F::Nz),
    cont(0x3d, "AND", AbsIndexX, F::Nz),
    cont(0x39, "AND", AbsIndexY, F::Nz),
    cont(0x21, "AND", DpIndexXInd, F::Nz),
    cont(0x31, "AND", DpIndIndexY, F::Nz),
    cont(0x0a, "ASL", Acc, F::Nzc),
    cont(0x06, "ASL", Dp, F::Nzc),
    cont(0x16, "ASL", DpIndexX, F::Nzc),
    cont(0x0e, "ASL", Abs, F::Nzc),
    cont(0x1e, "ASL", AbsIndexX, F::Nzc),
    bra(0x10, "BPL", FlagBit::N, false),
    bra(0x30, "BMI", FlagBit::N, true),
    bra(0x50, "BVC", FlagBit::V, false),
    bra(0x70, "BVS", FlagBit::V, true),
    bra(0x90, "BCC", FlagBit::C, false),
    bra(0xb0, "BCS", FlagBit::C, true),
    bra(0xd0, "BNE", FlagBit::Z, false),
    bra(0xf0, "BEQ", FlagBit::Z, true),
    cont(0x24, "BIT", Dp, F::Nvz),
    cont(0x2c, "BIT", Abs, F::Nvz),
    op(0x00, "BRK", StackInt, NoCont, F::NoChange),
    force(0x18, "CLC", FlagBit::C, false),
    force(0xd8, "CLD", FlagBit::D, false),
    force(0x58, "CLI", FlagBit::I, false),
    force(0xb8, "CLV", FlagBit::V, false),
    cont(0xc9, "CMP", Imm, F::Nzc),
    cont(0xc5, "CMP", Dp, F::Nzc),
    cont(0xd5, "CMP", DpIndexX, F::Nzc),
    cont(0xcd, "CMP", Abs, F::Nzc),
    cont(0xdd, "CMP", AbsIndexX, F::Nzc),
    cont(0xd9, "CMP", AbsIndexY, F::Nzc),
    cont(0xc1, "CMP", DpIndexXInd, F::Nzc),
    cont(0xd1, "CMP", DpIndIndexY, F::Nzc),
    cont(0xe0, "CPX", Imm, F::Nzc),
    cont(0xe4, "CPX", Dp, F::Nzc),
    cont(0xec, "CPX", Abs, F::Nzc),
    cont(0xc0, "CPY", Imm, F::Nzc),
    cont(0xc4, "CPY", Dp, F::Nzc),
    cont(0xcc, "CPY", Abs, F::Nzc),
    cont(0xc6, "DEC", Dp, F::Nz),
    cont(0xd6, "DEC", DpIndexX, F::Nz),
    cont(0xce, "DEC", Abs, F::Nz),
    cont(0xde, "DEC", AbsIndexX, F::Nz),
    cont(0xca, "DEX", Implied, F::Nz),
    cont(0x88, "DEY", Implied, F::Nz),
    cont(0x49, "EOR", Imm, F::Nz),
    cont(0x45, "EOR", Dp, F::Nz),
    cont(0x55, "EOR", DpIndexX, F::Nz),
    cont(0x4d, "EOR", Abs, F::Nz),
    cont(0x5d, "EOR", AbsIndexX, F::Nz),
    cont(0x59, "EOR", AbsIndexY, F::Nz),
    cont(0x41, "EOR", DpIndexXInd, F::Nz),
    cont(0x51, "EOR", DpIndIndexY, F::Nz),
    cont(0xe6, "INC", Dp, F::Nz),
    cont(0xf6, "INC", DpIndexX, F::Nz),
    cont(0xee, "INC", Abs, F::Nz),
    cont(0xfe, "INC", AbsIndexX, F::Nz),
    cont(0xe8, "INX", Implied, F::Nz),
    cont(0xc8, "INY", Implied, F::Nz),
    op(0x4c, "JMP", Abs, Branch, F::NoChange),
    op(0x6c, "JMP", AbsInd, Branch, F::NoChange),
    op(0x20, "JSR", Abs, CallSubroutine, F::Subroutine),
    cont(0xa9, "LDA", Imm, F::LoadImm),
    cont(0xa5, "LDA", Dp, F::Nz),
    cont(0xb5, "LDA", DpIndexX, F::Nz),
    cont(0xad, "LDA", Abs, F::Nz),
    cont(0xbd, "LDA", AbsIndexX, F::Nz),
    cont(0xb9, "LDA", AbsIndexY, F::Nz),
    cont(0xa1, "LDA", DpIndexXInd, F::Nz),
    cont(0xb1, "LDA", DpIndIndexY, F::Nz),
    cont(0xa2, "LDX", Imm, F::LoadImm),
    cont(0xa6, "LDX", Dp, F::Nz),
    cont(0xb6, "LDX", DpIndexY, F::Nz),
    cont(0xae, "LDX", Abs, F::Nz),
    cont(0xbe, "LDX", AbsIndexY, F::Nz),
    cont(0xa0, "LDY", Imm, F::LoadImm),
    cont(0xa4, "LDY", Dp, F::Nz),
    cont(0xb4, "LDY", DpIndexX, F::Nz),
    cont(0xac, "LDY", Abs, F::Nz),
    cont(0xbc, "LDY", AbsIndexX, F::Nz),
    cont(0x4a, "LSR", Acc, F::Nzc),
    cont(0x46, "LSR", Dp, F::Nzc),
    cont(0x56, "LSR", DpIndexX, F::Nzc),
    cont(0x4e, "LSR", Abs, F::Nzc),
    cont(0x5e, "LSR", AbsIndexX, F::Nzc),
    cont(0xea, "NOP", Implied, F::NoChange),
    cont(0x09, "ORA", Imm, F::OraImm),
    cont(0x05, "ORA", Dp, F::Nz),
    cont(0x15, "ORA", DpIndexX, F::Nz),
    cont(0x0d, "ORA", Abs, F::Nz),
    cont(0x1d, "ORA", AbsIndexX, F::Nz),
    cont(0x19, "ORA", AbsIndexY, F::Nz),
    cont(0x01, "ORA", DpIndexXInd, F::Nz),
    cont(0x11, "ORA", DpIndIndexY, F::Nz),
    cont(0x48, "PHA", StackPush, F::NoChange),
    cont(0x08, "PHP", StackPush, F::NoChange),
    cont(0x68, "PLA", StackPull, F::Nz),
    cont(0x28, "PLP", StackPull, F::Plp),
    cont(0x2a, "ROL", Acc, F::Rol),
    cont(0x26, "ROL", Dp, F::Rol),
    cont(0x36, "ROL", DpIndexX, F::Rol),
    cont(0x2e, "ROL", Abs, F::Rol),
    cont(0x3e, "ROL", AbsIndexX, F::Rol),
    cont(0x6a, "ROR", Acc, F::Ror),
    cont(0x66, "ROR", Dp, F::Ror),
    cont(0x76, "ROR", DpIndexX, F::Ror),
    cont(0x6e, "ROR", Abs, F::Ror),
    cont(0x7e, "ROR", AbsIndexX, F::Ror),
    op(0x40, "RTI", StackRti, NoCont, F::NoChange),
    op(0x60, "RTS", StackRts, NoCont, F::NoChange),
    cont(0xe9, "SBC", Imm, F::Nvzc),
    cont(0xe5, "SBC", Dp, F::Nvzc),
    cont(0xf5, "SBC", DpIndexX, F::Nvzc),
    cont(0xed, "SBC", Abs, F::Nvzc),
    cont(0xfd, "SBC", AbsIndexX, F::Nvzc),
    cont(0xf9, "SBC", AbsIndexY, F::Nvzc),
    cont(0xe1, "SBC", DpIndexXInd, F::Nvzc),
    cont(0xf1, "SBC", DpIndIndexY, F::Nvzc),
    force(0x38, "SEC", FlagBit::C, true),
    force(0xf8, "SED", FlagBit::D, true),
    force(0x78, "SEI", FlagBit::I, true),
    cont(0x85, "STA", Dp, F::NoChange),
    cont(0x95, "STA", DpIndexX, F::NoChange),
    cont(0x8d, "STA", Abs, F::NoChange),
    cont(0x9d, "STA", AbsIndexX, F::NoChange),
    cont(0x99, "STA", AbsIndexY, F::NoChange),
    cont(0x81, "STA", DpIndexXInd, F::NoChange),
    cont(0x91, "STA", DpIndIndexY, F::NoChange),
    cont(0x86, "STX", Dp, F::NoChange),
    cont(0x96, "STX", DpIndexY, F::NoChange),
    cont(0x8e, "STX", Abs, F::NoChange),
    cont(0x84, "STY", Dp, F::NoChange),
    cont(0x94, "STY", DpIndexX, F::NoChange),
    cont(0x8c, "STY", Abs, F::NoChange),
    cont(0xaa, "TAX", Implied, F::Nz),
    cont(0xa8, "TAY", Implied, F::Nz),
    cont(0xba, "TSX", Implied, F::Nz),
    cont(0x8a, "TXA", Implied, F::Nz),
    cont(0x9a, "TXS", Implied, F::NoChange),
    cont(0x98, "TYA", Implied, F::Nz),
];

/// Illegal NMOS opcodes. Several are unstable on real hardware.
const NMOS_6502_UNDOC: &[OpDef] = &[
    op(0x02, "JAM", Implied, NoCont, F::NoChange).undoc(),
    op(0x12, "JAM", Implied, NoCont, F::NoChange).undoc(),
    op(0x22, "JAM", Implied, NoCont, F::NoChange).undoc(),
    op(0x32, "JAM", Implied, NoCont, F::NoChange).undoc(),
    op(0x42, "JAM", Implied, NoCont, F::NoChange).undoc(),
    op(0x52, "JAM", Implied, NoCont, F::NoChange).undoc(),
    op(0x62, "JAM", Implied, NoCont, F::NoChange).undoc(),
    op(0x72, "JAM", Implied, NoCont, F::NoChange).undoc(),
    op(0x92, "JAM", Implied, NoCont, F::NoChange).undoc(),
    op(0xb2, "JAM", Implied, NoCont, F::NoChange).undoc(),
    op(0xd2, "JAM", Implied, NoCont, F::NoChange).undoc(),
    op(0xf2, "JAM", Implied, NoCont, F::NoChange).undoc(),
    cont(0x03, "SLO", DpIndexXInd, F::Nzc).undoc(),
    cont(0x07, "SLO", Dp, F::Nzc).undoc(),
    cont(0x0f, "SLO", Abs, F::Nzc).undoc(),
    cont(0x13, "SLO", DpIndIndexY, F::Nzc).undoc(),
    cont(0x17, "SLO", DpIndexX, F::Nzc).undoc(),
    cont(0x1b, "SLO", AbsIndexY, F::Nzc).undoc(),
    cont(0x1f, "SLO", AbsIndexX, F::Nzc).undoc(),
    cont(0x23, "RLA", DpIndexXInd, F::Nzc).undoc(),
    cont(0x27, "RLA", Dp, F::Nzc).undoc(),
    cont(0x2f, "RLA", Abs, F::Nzc).undoc(),
    cont(0x33, "RLA", DpIndIndexY, F::Nzc).undoc(),
    cont(0x37, "RLA", DpIndexX, F::Nzc).undoc(),
    cont(0x3b, "RLA", AbsIndexY, F::Nzc).undoc(),
    cont(0x3f, "RLA", AbsIndexX, F::Nzc).undoc(),
    cont(0x43, "SRE", DpIndexXInd, F::Nzc).undoc(),
    cont(0x47, "SRE", Dp, F::Nzc).undoc(),
    cont(0x4f, "SRE", Abs, F::Nzc).undoc(),
    cont(0x53, "SRE", DpIndIndexY, F::Nzc).undoc(),
    cont(0x57, "SRE", DpIndexX, F::Nzc).undoc(),
    cont(0x5b, "SRE", AbsIndexY, F::Nzc).undoc(),
    cont(0x5f, "SRE", AbsIndexX, F::Nzc).undoc(),
    cont(0x63, "RRA", DpIndexXInd, F::Nvzc).undoc(),
    cont(0x67, "RRA", Dp, F::Nvzc).undoc(),
    cont(0x6f, "RRA", Abs, F::Nvzc).undoc(),
    cont(0x73, "RRA", DpIndIndexY, F::Nvzc).undoc(),
    cont(0x77, "RRA", DpIndexX, F::Nvzc).undoc(),
    cont(0x7b, "RRA", AbsIndexY, F::Nvzc).undoc(),
    cont(0x7f, "RRA", AbsIndexX, F::Nvzc).undoc(),
    cont(0x83, "SAX", DpIndexXInd, F::Nz).undoc(),
    cont(0x87, "SAX", Dp, F::Nz).undoc(),
    cont(0x8f, "SAX", Abs, F::Nz).undoc(),
    cont(0x97, "SAX", DpIndexY, F::Nz).undoc(),
    cont(0xa3, "LAX", DpIndexXInd, F::Nz).undoc(),
    cont(0xa7, "LAX", Dp, F::Nz).undoc(),
    cont(0xaf, "LAX", Abs, F::Nz).undoc(),
    cont(0xb3, "LAX", DpIndIndexY, F::Nz).undoc(),
    cont(0xb7, "LAX", DpIndexY, F::Nz).undoc(),
    cont(0xbf, "LAX", AbsIndexY, F::Nz).undoc(),
    cont(0xab, "LAX", Imm, F::Nz).undoc(),
    cont(0xc3, "DCP", DpIndexXInd, F::C).undoc(),
    cont(0xc7, "DCP", Dp, F::C).undoc(),
    cont(0xcf, "DCP", Abs, F::C).undoc(),
    cont(0xd3, "DCP", DpIndIndexY, F::C).undoc(),
    cont(0xd7, "DCP", DpIndexX, F::C).undoc(),
    cont(0xdb, "DCP", AbsIndexY, F::C).undoc(),
    cont(0xdf, "DCP", AbsIndexX, F::C).undoc(),
    cont(0xe3, "ISC", DpIndexXInd, F::Nvzc).undoc(),
    cont(0xe7, "ISC", Dp, F::Nvzc).undoc(),
    cont(0xef, "ISC", Abs, F::Nvzc).undoc(),
    cont(0xf3, "ISC", DpIndIndexY, F::Nvzc).undoc(),
    cont(0xf7, "ISC", DpIndexX, F::Nvzc).undoc(),
    cont(0xfb, "ISC", AbsIndexY, F::Nvzc).undoc(),
    cont(0xff, "ISC", AbsIndexX, F::Nvzc).undoc(),
    cont(0x0b, "ANC", Imm, F::Nzc).undoc(),
    cont(0x2b, "ANC", Imm, F::Nzc).undoc(),
    cont(0x4b, "ALR", Imm, F::Nzc).undoc(),
    cont(0x6b, "ARR", Imm, F::Nvzc).undoc(),
    cont(0x8b, "ANE", Imm, F::NoChange).undoc(),
    cont(0xcb, "SBX", Imm, F::Nzc).undoc(),
    cont(0xbb, "LAS", AbsIndexY, F::Nz).undoc(),
    cont(0x9b, "TAS", AbsIndexY, F::NoChange).undoc(),
    cont(0x93, "SHA", DpIndIndexY, F::NoChange).undoc(),
    cont(0x9f, "SHA", AbsIndexY, F::NoChange).undoc(),
    cont(0x9c, "SHY", AbsIndexX, F::NoChange).undoc(),
    cont(0x9e, "SHX", AbsIndexY, F::NoChange).undoc(),
    cont(0x04, "DOP", Dp, F::NoChange).undoc(),
    cont(0x44, "DOP", Dp, F::NoChange).undoc(),
    cont(0x64, "DOP", Dp, F::NoChange).undoc(),
    cont(0x14, "DOP", DpIndexX, F::NoChange).undoc(),
    cont(0x34, "DOP", DpIndexX, F::NoChange).undoc(),
    cont(0x54, "DOP", DpIndexX, F::NoChange).undoc(),
    cont(0x74, "DOP", DpIndexX, F::NoChange).undoc(),
    cont(0xd4, "DOP", DpIndexX, F::NoChange).undoc(),
    cont(0xf4, "DOP", DpIndexX, F::NoChange).undoc(),
    cont(0x80, "DOP", Imm, F::NoChange).undoc(),
    cont(0x82, "DOP", Imm, F::NoChange).undoc(),
    cont(0x89, "DOP", Imm, F::NoChange).undoc(),
    cont(0xc2, "DOP", Imm, F::NoChange).undoc(),
    cont(0xe2, "DOP", Imm, F::NoChange).undoc(),
    cont(0x0c, "TOP", Abs, F::NoChange).undoc(),
    cont(0x1c, "TOP", AbsIndexX, F::NoChange).undoc(),
    cont(0x3c, "TOP", AbsIndexX, F::NoChange).undoc(),
    cont(0x5c, "TOP", AbsIndexX, F::NoChange).undoc(),
    cont(0x7c, "TOP", AbsIndexX, F::NoChange).undoc(),
    cont(0xdc, "TOP", AbsIndexX, F::NoChange).undoc(),
    cont(0xfc, "TOP", AbsIndexX, F::NoChange).undoc(),
    cont(0x1a, "NOP", Implied, F::NoChange).undoc(),
    cont(0x3a, "NOP", Implied, F::NoChange).undoc(),
    cont(0x5a, "NOP", Implied, F::NoChange).undoc(),
    cont(0x7a, "NOP", Implied, F::NoChange).undoc(),
    cont(0xda, "NOP", Implied, F::NoChange).undoc(),
    cont(0xfa, "NOP", Implied, F::NoChange).undoc(),
    cont(0xeb, "SBC", Imm, F::Nvzc).undoc(),
];

/// 65C02 additions to the NMOS set.
const CMOS_65C02: &[OpDef] = &[
    cont(0x12, "ORA", DpInd, F::Nz),
    cont(0x32, "AND", DpInd, F::Nz),
    cont(0x52, "EOR", DpInd, F::Nz),
    cont(0x72, "ADC", DpInd, F::Nvzc),
    cont(0x92, "STA", DpInd, F::NoChange),
    cont(0xb2, "LDA", DpInd, F::Nz),
    cont(0xd2, "CMP", DpInd, F::Nzc),
    cont(0xf2, "SBC", DpInd, F::Nvzc),
    cont(0x89, "BIT", Imm, F::Z),
    cont(0x34, "BIT", DpIndexX, F::Nvz),
    cont(0x3c, "BIT", AbsIndexX, F::Nvz),
    cont(0x1a, "INC", Acc, F::Nz),
    cont(0x3a, "DEC", Acc, F::Nz),
    cont(0x04, "TSB", Dp, F::Z),
    cont(0x0c, "TSB", Abs, F::Z),
    cont(0x14, "TRB", Dp, F::Z),
    cont(0x1c, "TRB", Abs, F::Z),
    cont(0x64, "STZ", Dp, F::NoChange),
    cont(0x74, "STZ", DpIndexX, F::NoChange),
    cont(0x9c, "STZ", Abs, F::NoChange),
    cont(0x9e, "STZ", AbsIndexX, F::NoChange),
    cont(0x5a, "PHY", StackPush, F::NoChange),
    cont(0x7a, "PLY", StackPull, F::Nz),
    cont(0xda, "PHX", StackPush, F::NoChange),
    cont(0xfa, "PLX", StackPull, F::Nz),
    op(0x80, "BRA", PcRel, Branch, F::NoChange),
    op(0x7c, "JMP", AbsIndexXInd, Branch, F::NoChange),
];

/// Reserved 65C02 opcodes, which execute as NOPs of various lengths.
const CMOS_65C02_UNDOC: &[OpDef] = &{
    let mut list = [OpDef::invalid(0); 78];
    let mut i = 0;
    // one-byte NOPs fill columns 3, 7, B and F
    while i < 64 {
        let opcode = ((i / 4) << 4 | [0x03, 0x07, 0x0b, 0x0f][i % 4]) as u8;
        list[i] = cont(opcode, "NOP", Implied, F::NoChange).undoc();
        i += 1;
    }
    list[64] = cont(0x02, "LDD", Imm, F::NoChange).undoc();
    list[65] = cont(0x22, "LDD", Imm, F::NoChange).undoc();
    list[66] = cont(0x42, "LDD", Imm, F::NoChange).undoc();
    list[67] = cont(0x62, "LDD", Imm, F::NoChange).undoc();
    list[68] = cont(0x82, "LDD", Imm, F::NoChange).undoc();
    list[69] = cont(0xc2, "LDD", Imm, F::NoChange).undoc();
    list[70] = cont(0xe2, "LDD", Imm, F::NoChange).undoc();
    list[71] = cont(0x44, "LDD", Dp, F::NoChange).undoc();
    list[72] = cont(0x54, "LDD", DpIndexX, F::NoChange).undoc();
    list[73] = cont(0xd4, "LDD", DpIndexX, F::NoChange).undoc();
    list[74] = cont(0xf4, "LDD", DpIndexX, F::NoChange).undoc();
    // $5C takes eight cycles but is still three bytes long
    list[75] = cont(0x5c, "LDD", Abs, F::NoChange).undoc();
    list[76] = cont(0xdc, "LDD", Abs, F::NoChange).undoc();
    list[77] = cont(0xfc, "LDD", Abs, F::NoChange).undoc();
    list
};

/// 65802/65816 additions and replacements.
const W65816: &[OpDef] = &[
    op(0x02, "COP", StackInt, Cont, F::NoChange),
    cont(0x03, "ORA", StackRel, F::Nz),
    cont(0x07, "ORA", DpIndLong, F::Nz),
    cont(0x0f, "ORA", AbsLong, F::Nz),
    cont(0x13, "ORA", StackRelIndIndexY, F::Nz),
    cont(0x17, "ORA", DpIndIndexYLong, F::Nz),
    cont(0x1f, "ORA", AbsIndexXLong, F::Nz),
    cont(0x23, "AND", StackRel, F::Nz),
    cont(0x27, "AND", DpIndLong, F::Nz),
    cont(0x2f, "AND", AbsLong, F::Nz),
    cont(0x33, "AND", StackRelIndIndexY, F::Nz),
    cont(0x37, "AND", DpIndIndexYLong, F::Nz),
    cont(0x3f, "AND", AbsIndexXLong, F::Nz),
    cont(0x43, "EOR", StackRel, F::Nz),
    cont(0x47, "EOR", DpIndLong, F::Nz),
    cont(0x4f, "EOR", AbsLong, F::Nz),
    cont(0x53, "EOR", StackRelIndIndexY, F::Nz),
    cont(0x57, "EOR", DpIndIndexYLong, F::Nz),
    cont(0x5f, "EOR", AbsIndexXLong, F::Nz),
    cont(0x63, "ADC", StackRel, F::Nvzc),
    cont(0x67, "ADC", DpIndLong, F::Nvzc),
    cont(0x6f, "ADC", AbsLong, F::Nvzc),
    cont(0x73, "ADC", StackRelIndIndexY, F::Nvzc),
    cont(0x77, "ADC", DpIndIndexYLong, F::Nvzc),
    cont(0x7f, "ADC", AbsIndexXLong, F::Nvzc),
    cont(0x83, "STA", StackRel, F::NoChange),
    cont(0x87, "STA", DpIndLong, F::NoChange),
    cont(0x8f, "STA", AbsLong, F::NoChange),
    cont(0x93, "STA", StackRelIndIndexY, F::NoChange),
    cont(0x97, "STA", DpIndIndexYLong, F::NoChange),
    cont(0x9f, "STA", AbsIndexXLong, F::NoChange),
    cont(0xa3, "LDA", StackRel, F::Nz),
    cont(0xa7, "LDA", DpIndLong, F::Nz),
    cont(0xaf, "LDA", AbsLong, F::Nz),
    cont(0xb3, "LDA", StackRelIndIndexY, F::Nz),
    cont(0xb7, "LDA", DpIndIndexYLong, F::Nz),
    cont(0xbf, "LDA", AbsIndexXLong, F::Nz),
    cont(0xc3, "CMP", StackRel, F::Nzc),
    cont(0xc7, "CMP", DpIndLong, F::Nzc),
    cont(0xcf, "CMP", AbsLong, F::Nzc),
    cont(0xd3, "CMP", StackRelIndIndexY, F::Nzc),
    cont(0xd7, "CMP", DpIndIndexYLong, F::Nzc),
    cont(0xdf, "CMP", AbsIndexXLong, F::Nzc),
    cont(0xe3, "SBC", StackRel, F::Nvzc),
    cont(0xe7, "SBC", DpIndLong, F::Nvzc),
    cont(0xef, "SBC", AbsLong, F::Nvzc),
    cont(0xf3, "SBC", StackRelIndIndexY, F::Nvzc),
    cont(0xf7, "SBC", DpIndIndexYLong, F::Nvzc),
    cont(0xff, "SBC", AbsIndexXLong, F::Nvzc),
    cont(0x0b, "PHD", StackPush, F::NoChange),
    cont(0x2b, "PLD", StackPull, F::Nz),
    cont(0x4b, "PHK", StackPush, F::NoChange),
    cont(0x8b, "PHB", StackPush, F::NoChange),
    cont(0xab, "PLB", StackPull, F::Nz),
    cont(0x1b, "TCS", Implied, F::NoChange),
    cont(0x3b, "TSC", Implied, F::Nz),
    cont(0x5b, "TCD", Implied, F::Nz),
    cont(0x7b, "TDC", Implied, F::Nz),
    cont(0x9b, "TXY", Implied, F::Nz),
    cont(0xbb, "TYX", Implied, F::Nz),
    cont(0xeb, "XBA", Implied, F::Nz),
    cont(0xfb, "XCE", Implied, F::Xce),
    cont(0xcb, "WAI", Implied, F::NoChange),
    op(0xdb, "STP", Implied, NoCont, F::NoChange),
    op(0x22, "JSL", AbsLong, CallSubroutine, F::Subroutine),
    op(0x5c, "JML", AbsLong, Branch, F::NoChange),
    op(0xdc, "JML", AbsIndLong, Branch, F::NoChange),
    op(0xfc, "JSR", AbsIndexXInd, CallSubroutine, F::Subroutine),
    op(0x6b, "RTL", StackRtl, NoCont, F::NoChange),
    cont(0x44, "MVP", BlockMove, F::NoChange),
    cont(0x54, "MVN", BlockMove, F::NoChange),
    cont(0xd4, "PEI", StackDpInd, F::NoChange),
    cont(0xf4, "PEA", StackAbs, F::NoChange),
    cont(0x62, "PER", StackPcRelLong, F::NoChange),
    op(0x82, "BRL", PcRelLong, Branch, F::NoChange),
    cont(0xc2, "REP", Imm, F::Rep),
    cont(0xe2, "SEP", Imm, F::Sep),
    cont(0x42, "WDM", Wdm, F::NoChange),
    // immediates whose width follows M or X
    cont(0x09, "ORA", ImmLongA, F::OraImm),
    cont(0x29, "AND", ImmLongA, F::AndImm),
    cont(0x49, "EOR", ImmLongA, F::Nz),
    cont(0x69, "ADC", ImmLongA, F::Nvzc),
    cont(0x89, "BIT", ImmLongA, F::Z),
    cont(0xa9, "LDA", ImmLongA, F::LoadImm),
    cont(0xc9, "CMP", ImmLongA, F::Nzc),
    cont(0xe9, "SBC", ImmLongA, F::Nvzc),
    cont(0xa0, "LDY", ImmLongXY, F::LoadImm),
    cont(0xa2, "LDX", ImmLongXY, F::LoadImm),
    cont(0xc0, "CPY", ImmLongXY, F::Nzc),
    cont(0xe0, "CPX", ImmLongXY, F::Nzc),
];
