//! 65xx CPU model: status flags, opcode definitions and per-family tables.

pub mod cpudef;
pub mod flags;
pub mod opdef;

pub use cpudef::{CpuDef, CpuType};
pub use flags::{FlagBit, FlagState, StatusFlags, TriState16};
pub use opdef::{
    AddressMode, BranchTaken, FlagTransition, FlowEffect, Immediate, MemoryEffect, OpDef,
};
