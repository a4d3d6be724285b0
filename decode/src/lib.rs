//! ARM64 (AArch64) instruction decoder: a pure function from a 32-bit
//! instruction word to a tagged, fully-resolved `DecodedInstruction`. No
//! state, no I/O, no dependency on the code generator — the decision tree
//! is a hand-written bitfield decoder, not a generated table.

mod classify;
mod fields;
mod instr;

pub use classify::decode;
pub use instr::{
    AddrMode, AluOp, BitfieldVariant, BranchRegVariant, CompareOp, CondSelVariant, DecodedInstruction,
    ExtendKind, FpConvertVariant, FpMoveVariant, FpOp, InstructionClass, MemOp, MovWideVariant, MulOp,
    Operand2, ShiftKind, SystemRegister,
};
