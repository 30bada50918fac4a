//! Per-byte analysis attributes.
//!
//! One [`Anattrib`] exists for every byte of the image. The array is owned by
//! the analysis session and filled in place by the code and data passes.
//! Cross references (operand offsets) are indices into the same array.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::core::format_descriptor::FormatDescriptor;
use crate::core::symbol::Symbol;
use crate::cpu::{BranchTaken, StatusFlags};
use crate::error::{Glaurung65Error, Result};

bitflags! {
    /// Classification and bookkeeping bits for one byte.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct AttribFlags: u16 {
        /// First byte of an instruction
        const INSTR_START = 1 << 0;
        /// Part of an instruction
        const INSTRUCTION = 1 << 1;
        /// Data embedded in the instruction stream
        const INLINE_DATA = 1 << 2;
        const DATA = 1 << 3;
        /// Analysis started here
        const ENTRY_POINT = 1 << 4;
        const BRANCH_TARGET = 1 << 5;
        /// Jumps or calls outside the image
        const EXTERNAL_BRANCH = 1 << 6;
        const VISITED = 1 << 7;
        /// Flags changed since the last visit
        const CHANGED = 1 << 8;
        /// Classified by a type hint
        const HINTED = 1 << 9;
        /// Execution does not continue past this instruction
        const NO_CONTINUE = 1 << 10;
        /// A plugin declared that a call does not return
        const NO_CONTINUE_SCRIPT = 1 << 11;
        /// First byte of an address map region
        const ADDR_REGION_CHANGE = 1 << 12;
    }
}

/// Analysis result for a single byte.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Anattrib {
    pub flags: AttribFlags,
    /// Address of the byte
    pub address: u32,
    /// Instruction length; meaningful at instruction starts only
    pub instr_length: usize,
    /// Processor status at this instruction
    pub status_flags: StatusFlags,
    /// Conditional branch verdict
    pub branch_taken: BranchTaken,
    /// Address referenced by the operand or data item
    pub operand_address: Option<u32>,
    /// File offset of `operand_address`, when it lies inside the image
    pub operand_offset: Option<usize>,
    /// True if `operand_offset` is a branch or call target rather than a
    /// derived reference
    pub is_operand_offset_direct: bool,
    pub symbol: Option<Symbol>,
    pub data_descriptor: Option<Arc<FormatDescriptor>>,
}

impl Anattrib {
    /// Allocate a fresh attribute array.
    pub fn new_array(len: usize) -> Vec<Anattrib> {
        vec![Anattrib::default(); len]
    }

    pub fn is_instruction_start(&self) -> bool {
        self.flags.contains(AttribFlags::INSTR_START)
    }

    pub fn is_instruction(&self) -> bool {
        self.flags.contains(AttribFlags::INSTRUCTION)
    }

    pub fn is_inline_data(&self) -> bool {
        self.flags.contains(AttribFlags::INLINE_DATA)
    }

    pub fn is_data(&self) -> bool {
        self.flags.contains(AttribFlags::DATA)
    }

    pub fn is_entry_point(&self) -> bool {
        self.flags.contains(AttribFlags::ENTRY_POINT)
    }

    pub fn is_branch_target(&self) -> bool {
        self.flags.contains(AttribFlags::BRANCH_TARGET)
    }

    pub fn is_external_branch(&self) -> bool {
        self.flags.contains(AttribFlags::EXTERNAL_BRANCH)
    }

    pub fn is_visited(&self) -> bool {
        self.flags.contains(AttribFlags::VISITED)
    }

    pub fn is_changed(&self) -> bool {
        self.flags.contains(AttribFlags::CHANGED)
    }

    pub fn is_hinted(&self) -> bool {
        self.flags.contains(AttribFlags::HINTED)
    }

    pub fn is_addr_region_change(&self) -> bool {
        self.flags.contains(AttribFlags::ADDR_REGION_CHANGE)
    }

    /// True if execution stops after this instruction, for either reason.
    pub fn does_not_continue(&self) -> bool {
        self.flags
            .intersects(AttribFlags::NO_CONTINUE | AttribFlags::NO_CONTINUE_SCRIPT)
    }

    /// True for a conditional branch that can never be taken.
    pub fn does_not_branch(&self) -> bool {
        self.branch_taken == BranchTaken::Never
    }

    pub fn is_data_start(&self) -> bool {
        self.is_data() && self.data_descriptor.is_some()
    }

    pub fn is_inline_data_start(&self) -> bool {
        self.is_inline_data() && self.data_descriptor.is_some()
    }

    /// First byte of any line: instruction, data item or inline data item.
    pub fn is_start(&self) -> bool {
        self.is_instruction_start() || self.is_data_start() || self.is_inline_data_start()
    }

    /// Not yet claimed by code, data or inline data.
    pub fn is_untyped(&self) -> bool {
        !self.is_instruction() && !self.is_data() && !self.is_inline_data()
    }

    /// Length of the item starting here. Data items take their length from the
    /// descriptor and report 0 without one.
    pub fn length(&self) -> usize {
        if self.is_data() || self.is_inline_data() {
            return self.data_descriptor.as_ref().map_or(0, |d| d.length());
        }
        self.instr_length
    }

    /// Instruction with an operand (not implied or accumulator mode).
    pub fn is_instruction_with_operand(&self) -> bool {
        self.is_instruction_start() && self.length() != 1
    }

    /// Five-character marker string for dumps: entry, no-branch, no-continue,
    /// branch target.
    pub fn to_attr_string(&self) -> String {
        let mark = |cond: bool, c: char| if cond { c } else { '.' };
        [
            mark(self.is_entry_point(), '@'),
            mark(self.is_hinted(), 'H'),
            mark(self.does_not_branch(), '!'),
            mark(self.does_not_continue(), '#'),
            mark(self.is_branch_target(), '>'),
        ]
        .iter()
        .collect()
    }
}

impl fmt::Display for Anattrib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_instruction() {
            write!(f, "Inst")?;
        } else if self.is_data() {
            write!(f, "Data")?;
        } else if self.is_inline_data() {
            write!(f, "Inli")?;
        }
        if self.is_start() {
            write!(f, "Start")?;
        }
        write!(f, " len={}", self.length())
    }
}

/// User classification of a byte, consulted by the code analyzer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeHint {
    #[default]
    None,
    Code,
    Data,
    InlineData,
}

impl TypeHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeHint::None => "None",
            TypeHint::Code => "Code",
            TypeHint::Data => "Data",
            TypeHint::InlineData => "InlineData",
        }
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeHint {
    type Err = Glaurung65Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "None" => Ok(TypeHint::None),
            "Code" => Ok(TypeHint::Code),
            "Data" => Ok(TypeHint::Data),
            "InlineData" => Ok(TypeHint::InlineData),
            _ => Err(Glaurung65Error::InvalidInput(format!(
                "unknown type hint '{}'",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::format_descriptor::{FormatSubType, FormatType};

    #[test]
    fn test_default_is_untyped() {
        let arr = Anattrib::new_array(4);
        assert_eq!(arr.len(), 4);
        assert!(arr.iter().all(|a| a.is_untyped() && !a.is_start()));
        assert_eq!(arr[0].length(), 0);
    }

    #[test]
    fn test_length_follows_descriptor_for_data() {
        let mut attr = Anattrib {
            flags: AttribFlags::DATA,
            ..Default::default()
        };
        assert_eq!(attr.length(), 0);
        assert!(!attr.is_data_start());
        attr.data_descriptor =
            Some(FormatDescriptor::create(3, FormatType::NumericLE, FormatSubType::Hex).unwrap());
        assert_eq!(attr.length(), 3);
        assert!(attr.is_data_start());
        assert!(attr.is_start());
    }

    #[test]
    fn test_instruction_queries() {
        let attr = Anattrib {
            flags: AttribFlags::INSTRUCTION | AttribFlags::INSTR_START | AttribFlags::NO_CONTINUE,
            instr_length: 3,
            ..Default::default()
        };
        assert!(attr.is_instruction_with_operand());
        assert!(attr.does_not_continue());
        assert_eq!(attr.to_attr_string(), "...#.");
        assert_eq!(attr.to_string(), "InstStart len=3");
    }

    #[test]
    fn test_type_hint_names() {
        for hint in [TypeHint::None, TypeHint::Code, TypeHint::Data, TypeHint::InlineData] {
            assert_eq!(hint.as_str().parse::<TypeHint>().unwrap(), hint);
        }
        assert_eq!(serde_json::to_string(&TypeHint::InlineData).unwrap(), "\"InlineData\"");
    }
}
