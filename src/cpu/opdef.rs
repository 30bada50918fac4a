//! Opcode definitions: addressing modes, control-flow effects and the
//! effect each instruction has on the status flags.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::flags::{FlagBit, FlagState, StatusFlags};

/// 65xx addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Unknown,
    Abs,
    AbsInd,
    AbsIndLong,
    AbsIndexX,
    AbsIndexXInd,
    AbsIndexXLong,
    AbsIndexY,
    AbsLong,
    Acc,
    BlockMove,
    Dp,
    DpInd,
    DpIndIndexY,
    DpIndIndexYLong,
    DpIndLong,
    DpIndexX,
    DpIndexXInd,
    DpIndexY,
    Imm,
    /// Immediate whose width follows M
    ImmLongA,
    /// Immediate whose width follows X
    ImmLongXY,
    Implied,
    PcRel,
    PcRelLong,
    StackAbs,
    StackDpInd,
    StackInt,
    StackPcRelLong,
    StackPull,
    StackPush,
    StackRti,
    StackRtl,
    StackRts,
    StackRel,
    StackRelIndIndexY,
    Wdm,
}

impl AddressMode {
    /// Instruction length in bytes, opcode included.
    pub fn length(self, flags: StatusFlags) -> usize {
        use AddressMode::*;
        match self {
            Unknown | Acc | Implied | StackPull | StackPush | StackRti | StackRtl | StackRts => 1,
            Dp | DpIndexX | DpIndexY | DpIndexXInd | DpInd | DpIndLong | DpIndIndexY
            | DpIndIndexYLong | Imm | PcRel | StackDpInd | StackInt | StackRel
            | StackRelIndIndexY | Wdm => 2,
            Abs | AbsIndexX | AbsIndexY | AbsIndexXInd | AbsInd | AbsIndLong | BlockMove
            | PcRelLong | StackAbs | StackPcRelLong => 3,
            AbsLong | AbsIndexXLong => 4,
            ImmLongA => {
                if flags.is_short_m() {
                    2
                } else {
                    3
                }
            }
            ImmLongXY => {
                if flags.is_short_x() {
                    2
                } else {
                    3
                }
            }
        }
    }

    pub fn is_immediate(self) -> bool {
        matches!(
            self,
            AddressMode::Imm | AddressMode::ImmLongA | AddressMode::ImmLongXY
        )
    }
}

/// How an instruction affects the flow of execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowEffect {
    /// Execution continues at the next instruction
    Cont,
    /// Execution does not continue (RTS, BRK, JAM)
    NoCont,
    /// Unconditional branch or jump
    Branch,
    ConditionalBranch,
    CallSubroutine,
}

/// What an instruction does to the memory its operand names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryEffect {
    None,
    Read,
    Write,
    ReadModifyWrite,
}

/// Outcome of a conditional branch given the current flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BranchTaken {
    #[default]
    Indeterminate,
    Never,
    Always,
}

/// Status flag updater attached to each opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum FlagUpdate {
    NoChange,
    /// Callee may change anything arithmetic
    Subroutine,
    Z,
    C,
    Nz,
    Nzc,
    Nvz,
    Nvzc,
    LoadImm,
    AndImm,
    OraImm,
    Rol,
    Ror,
    Plp,
    Rep,
    Sep,
    Xce,
    /// CLC, SEC and friends
    Force(FlagBit, bool),
    /// Branch taken when the flag equals the value
    Branch(FlagBit, bool),
}

/// Status flags after an instruction executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagTransition {
    /// Flags at the next instruction
    pub next: StatusFlags,
    /// Flags at the target of a taken branch or called subroutine
    pub taken: StatusFlags,
}

/// Immediate operand with its width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Immediate {
    pub value: u16,
    pub wide: bool,
}

impl Immediate {
    pub fn high_bit_set(&self) -> bool {
        let bit = if self.wide { 15 } else { 7 };
        self.value >> bit & 1 != 0
    }
}

/// Definition of one opcode on one CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpDef {
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub addr_mode: AddressMode,
    pub effect: FlowEffect,
    pub undocumented: bool,
    pub(crate) flag_update: FlagUpdate,
}

impl OpDef {
    pub(crate) const fn new(
        opcode: u8,
        mnemonic: &'static str,
        addr_mode: AddressMode,
        effect: FlowEffect,
        flag_update: FlagUpdate,
    ) -> Self {
        OpDef {
            opcode,
            mnemonic,
            addr_mode,
            effect,
            undocumented: false,
            flag_update,
        }
    }

    pub(crate) const fn undoc(mut self) -> Self {
        self.undocumented = true;
        self
    }

    /// Placeholder for opcodes the CPU does not define.
    pub const fn invalid(opcode: u8) -> Self {
        OpDef::new(
            opcode,
            "???",
            AddressMode::Unknown,
            FlowEffect::Cont,
            FlagUpdate::NoChange,
        )
    }

    pub fn is_valid(&self) -> bool {
        self.addr_mode != AddressMode::Unknown
    }

    pub fn length(&self, flags: StatusFlags) -> usize {
        self.addr_mode.length(flags)
    }

    /// Little-endian operand following the opcode, if the instruction has one
    /// and it fits in `data`.
    pub fn operand(&self, data: &[u8], offset: usize, flags: StatusFlags) -> Option<u32> {
        let len = self.length(flags);
        if len < 2 || offset + len > data.len() {
            return None;
        }
        Some(
            data[offset + 1..offset + len]
                .iter()
                .rev()
                .fold(0u32, |acc, &b| acc << 8 | b as u32),
        )
    }

    /// Immediate operand, sized by the current M/X state.
    pub fn immediate(&self, data: &[u8], offset: usize, flags: StatusFlags) -> Option<Immediate> {
        if !self.addr_mode.is_immediate() {
            return None;
        }
        let wide = self.length(flags) == 3;
        self.operand(data, offset, flags).map(|v| Immediate {
            value: v as u16,
            wide,
        })
    }

    pub fn is_branch_or_sub_call(&self) -> bool {
        matches!(
            self.effect,
            FlowEffect::Branch | FlowEffect::ConditionalBranch | FlowEffect::CallSubroutine
        )
    }

    pub fn is_subroutine_call(&self) -> bool {
        self.effect == FlowEffect::CallSubroutine
    }

    pub fn is_php(&self) -> bool {
        self.opcode == 0x08 && self.addr_mode == AddressMode::StackPush
    }

    pub fn is_plp(&self) -> bool {
        self.opcode == 0x28 && self.addr_mode == AddressMode::StackPull
    }

    pub fn is_brk(&self) -> bool {
        self.opcode == 0x00 && self.is_valid()
    }

    pub fn is_jsr_abs(&self) -> bool {
        self.opcode == 0x20 && self.addr_mode == AddressMode::Abs
    }

    pub fn is_jsl(&self) -> bool {
        self.opcode == 0x22 && self.addr_mode == AddressMode::AbsLong
    }

    pub fn is_pea(&self) -> bool {
        self.opcode == 0xf4 && self.addr_mode == AddressMode::StackAbs
    }

    pub fn is_per(&self) -> bool {
        self.opcode == 0x62 && self.addr_mode == AddressMode::StackPcRelLong
    }

    /// Memory access through the operand. Flow control, immediates and
    /// stack or register operations touch nothing.
    pub fn memory_effect(&self) -> MemoryEffect {
        use AddressMode::*;
        if self.is_branch_or_sub_call() || self.effect == FlowEffect::NoCont {
            return MemoryEffect::None;
        }
        match self.addr_mode {
            Unknown | Acc | Implied | Imm | ImmLongA | ImmLongXY | BlockMove | PcRel
            | PcRelLong | StackAbs | StackInt | StackPcRelLong | StackPull | StackPush
            | StackRti | StackRtl | StackRts | Wdm => return MemoryEffect::None,
            _ => {}
        }
        match self.mnemonic {
            "STA" | "STX" | "STY" | "STZ" | "SAX" | "SHA" | "SHX" | "SHY" | "TAS" => {
                MemoryEffect::Write
            }
            "ASL" | "LSR" | "ROL" | "ROR" | "INC" | "DEC" | "TSB" | "TRB" | "DCP" | "ISC"
            | "SLO" | "SRE" | "RLA" | "RRA" => MemoryEffect::ReadModifyWrite,
            "NOP" | "DOP" | "TOP" => MemoryEffect::None,
            _ => MemoryEffect::Read,
        }
    }

    /// Branch verdict for a conditional branch, `None` for anything else.
    pub fn branch_taken(&self, flags: StatusFlags) -> Option<BranchTaken> {
        match self.flag_update {
            FlagUpdate::Branch(bit, when) => Some(match flags.get(bit) {
                FlagState::Zero | FlagState::One => {
                    if (flags.get(bit) == FlagState::One) == when {
                        BranchTaken::Always
                    } else {
                        BranchTaken::Never
                    }
                }
                _ => BranchTaken::Indeterminate,
            }),
            _ => None,
        }
    }

    /// Compute the flags after this instruction. `taken` starts out equal to
    /// the incoming flags, so branches and calls hand the current state to
    /// their target.
    pub fn compute_flag_changes(
        &self,
        cur: StatusFlags,
        data: &[u8],
        offset: usize,
    ) -> FlagTransition {
        use FlagState::{Indeterminate, One, Zero};

        let imm = self.immediate(data, offset, cur);
        let mut next = cur;
        let mut taken = cur;

        let indeterminate = |f: &mut StatusFlags, bits: &[FlagBit]| {
            for &b in bits {
                f.set(b, Indeterminate);
            }
        };

        match self.flag_update {
            FlagUpdate::NoChange => {}
            FlagUpdate::Z => indeterminate(&mut next, &[FlagBit::Z]),
            FlagUpdate::C => indeterminate(&mut next, &[FlagBit::C]),
            FlagUpdate::Nz => indeterminate(&mut next, &[FlagBit::N, FlagBit::Z]),
            FlagUpdate::Nzc => indeterminate(&mut next, &[FlagBit::N, FlagBit::Z, FlagBit::C]),
            FlagUpdate::Nvz => indeterminate(&mut next, &[FlagBit::N, FlagBit::V, FlagBit::Z]),
            FlagUpdate::Nvzc | FlagUpdate::Subroutine => indeterminate(
                &mut next,
                &[FlagBit::N, FlagBit::V, FlagBit::Z, FlagBit::C],
            ),
            FlagUpdate::LoadImm => match imm {
                Some(imm) => {
                    next.set(FlagBit::Z, FlagState::from_bool(imm.value == 0));
                    next.set(FlagBit::N, FlagState::from_bool(imm.high_bit_set()));
                }
                None => indeterminate(&mut next, &[FlagBit::N, FlagBit::Z]),
            },
            FlagUpdate::AndImm => {
                if let Some(imm) = imm {
                    if imm.value == 0 {
                        next.set(FlagBit::Z, One);
                    }
                    if !imm.high_bit_set() {
                        next.set(FlagBit::N, Zero);
                    }
                }
            }
            FlagUpdate::OraImm => {
                if let Some(imm) = imm {
                    if imm.value != 0 {
                        next.set(FlagBit::Z, Zero);
                    }
                    if imm.high_bit_set() {
                        next.set(FlagBit::N, One);
                    }
                }
            }
            FlagUpdate::Rol => {
                // N rotates into C
                next.set(FlagBit::C, cur.get(FlagBit::N));
                if cur.get(FlagBit::C) == One {
                    next.set(FlagBit::Z, Zero);
                    next.set(FlagBit::N, Indeterminate);
                } else {
                    indeterminate(&mut next, &[FlagBit::N, FlagBit::Z]);
                }
            }
            FlagUpdate::Ror => match cur.get(FlagBit::C) {
                One => {
                    next.set(FlagBit::Z, Zero);
                    next.set(FlagBit::N, One);
                    next.set(FlagBit::C, Indeterminate);
                }
                Zero => {
                    next.set(FlagBit::N, Zero);
                    indeterminate(&mut next, &[FlagBit::Z, FlagBit::C]);
                }
                _ => indeterminate(&mut next, &[FlagBit::N, FlagBit::Z, FlagBit::C]),
            },
            FlagUpdate::Plp => indeterminate(&mut next, &FlagBit::REGISTER_BITS[..]),
            FlagUpdate::Rep | FlagUpdate::Sep => {
                let state = if self.flag_update == FlagUpdate::Sep {
                    One
                } else {
                    Zero
                };
                let mask = imm.map(|i| i.value).unwrap_or(0);
                for bit in FlagBit::REGISTER_BITS {
                    if mask >> bit.index() & 1 != 0 {
                        next.set(bit, state);
                    }
                }
            }
            FlagUpdate::Xce => {
                // E must always end up definite; an unknown carry is taken as
                // a return to emulation mode.
                let to_native = cur.get(FlagBit::C) == Zero;
                next.set(FlagBit::E, FlagState::from_bool(!to_native));
                next.set(FlagBit::X, One);
                next.set(FlagBit::M, One);
                next.set(FlagBit::C, cur.get(FlagBit::E));
            }
            FlagUpdate::Force(bit, value) => next.set(bit, FlagState::from_bool(value)),
            FlagUpdate::Branch(bit, when) => {
                taken.set(bit, FlagState::from_bool(when));
                next.set(bit, FlagState::from_bool(!when));
            }
        }

        FlagTransition { next, taken }
    }
}

impl fmt::Display for OpDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${:02x} {} {:?}{}",
            self.opcode,
            self.mnemonic,
            self.addr_mode,
            if self.undocumented { " (undoc)" } else { "" }
        )
    }
}
