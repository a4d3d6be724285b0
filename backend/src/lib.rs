//! x86-64 host code generator for the ARM64-on-x86_64 dynamic binary
//! translator: per-instruction-class translators driven by a block
//! translation loop, plus the fixed `ThreadState` field layout they address.
//!
//! No decoding and no execution/dispatch live here — see `jitaarch64-decode`
//! for the former and `jitaarch64-exec` for the latter. This crate only
//! knows how to turn a stream of [`jitaarch64_decode::DecodedInstruction`]s
//! into host machine code that reads and writes `ThreadState` memory.

pub mod block;
pub mod state_layout;
pub mod translate;
pub mod x86_64;

pub use block::{translate_block, BlockExit, InstructionFetch};
pub use x86_64::X86_64CodeGen;
