//! Per-`InstructionClass` translators: each takes a [`jitaarch64_core::CodeBuffer`]
//! and the decoded class and emits the equivalent host code, operating
//! purely on `ThreadState` memory and scratch host registers (see
//! [`common`] for the shared load/store/condition helpers).

pub mod alu;
pub mod bitfield;
pub mod branch;
pub mod common;
pub mod condsel;
pub mod fpsimd;
pub mod memory;
pub mod movwide;
pub mod muldiv;
pub mod system;
