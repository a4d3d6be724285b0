//! Terminator translators: unconditional/conditional/link branches, the
//! compare-and-branch and test-bit-and-branch short forms, and the register
//! (indirect) branch family.
//!
//! Every decoded branch immediate is already the final, sign-extended,
//! pre-shifted byte displacement (see the decoder's `branch_exception_system`),
//! so a static target is simply `pc.wrapping_add(imm as u64)`.
//!
//! Static-target exits are emitted with
//! [`X86_64CodeGen::emit_exit_tb_patchable`] rather than the plain
//! `emit_exit_tb`, and the returned jump offset is handed back to the block
//! translator as a [`BranchExit`] so it can later rewrite the exit into a
//! direct jump to an already-translated successor (`goto_tb` chaining) once
//! that successor exists. Indirect branches have no such target at
//! translation time and always exit through [`ExitTarget::Dynamic`].

use jitaarch64_core::{CodeBuffer, Cond};
use jitaarch64_decode::BranchRegVariant;

use crate::translate::common::{
    emit_jcc_forward, emit_test_cond, load_gpr, load_pstate, patch_forward, store_gpr,
};
use crate::x86_64::emitter::*;
use crate::x86_64::regs::Reg;
use crate::x86_64::X86_64CodeGen;

const SCRATCH: Reg = Reg::Rax;
const NZCV: Reg = Reg::Rdx;
const COND_SCRATCH: Reg = Reg::R8;

/// Guest link register, written by BL/BLR with the address of the
/// instruction following the call.
const LINK_REG: u8 = 30;

/// Where a terminator hands control after this block: a guest PC already
/// known at translation time (chainable) or one only available in a host
/// register at run time (must fall back to the dispatch loop's lookup).
#[derive(Debug, Clone, Copy)]
pub enum ExitTarget {
    Static(u64),
    Dynamic,
}

/// One terminator exit path: its target, and — for a static target — the
/// offset of the `jmp` instruction `goto_tb` chaining can later rewrite,
/// plus the offset right after it (recorded for the block's
/// `jmp_reset_offset`).
#[derive(Debug, Clone, Copy)]
pub struct BranchExit {
    pub target: ExitTarget,
    pub patch_offset: Option<usize>,
    pub reset_offset: Option<usize>,
}

impl BranchExit {
    fn static_at(target: u64, patch_offset: usize, reset_offset: usize) -> Self {
        BranchExit {
            target: ExitTarget::Static(target),
            patch_offset: Some(patch_offset),
            reset_offset: Some(reset_offset),
        }
    }

    fn dynamic() -> Self {
        BranchExit { target: ExitTarget::Dynamic, patch_offset: None, reset_offset: None }
    }
}

/// A conditional terminator's two possible exits. `taken` and `not_taken`
/// correspond directly to `TranslationBlock`'s two `jmp_insn_offset` slots.
#[derive(Debug, Clone, Copy)]
pub struct ConditionalExits {
    pub taken: BranchExit,
    pub not_taken: BranchExit,
}

pub fn translate_branch_unconditional(
    buf: &mut CodeBuffer,
    codegen: &X86_64CodeGen,
    pc: u64,
    imm: i64,
) -> BranchExit {
    let target = pc.wrapping_add(imm as u64);
    let (patch_offset, reset_offset) = codegen.emit_exit_tb_patchable(buf, target);
    BranchExit::static_at(target, patch_offset, reset_offset)
}

pub fn translate_branch_link(
    buf: &mut CodeBuffer,
    codegen: &X86_64CodeGen,
    pc: u64,
    imm: i64,
) -> BranchExit {
    store_gpr_link(buf, pc + 4);
    translate_branch_unconditional(buf, codegen, pc, imm)
}

pub fn translate_branch_conditional(
    buf: &mut CodeBuffer,
    codegen: &X86_64CodeGen,
    pc: u64,
    cond: Cond,
    imm: i64,
) -> ConditionalExits {
    load_pstate(buf, NZCV);
    emit_test_cond(buf, COND_SCRATCH, NZCV, cond);
    // emit_test_cond clears ZF iff `cond` holds, so Jne takes the taken path.
    let to_taken = emit_jcc_forward(buf, X86Cond::Jne);

    let not_taken_target = pc + 4;
    let (not_taken_offset, not_taken_reset) = codegen.emit_exit_tb_patchable(buf, not_taken_target);

    patch_forward(buf, to_taken, buf.offset());
    let taken_target = pc.wrapping_add(imm as u64);
    let (taken_offset, taken_reset) = codegen.emit_exit_tb_patchable(buf, taken_target);

    ConditionalExits {
        taken: BranchExit::static_at(taken_target, taken_offset, taken_reset),
        not_taken: BranchExit::static_at(not_taken_target, not_taken_offset, not_taken_reset),
    }
}

pub fn translate_compare_and_branch(
    buf: &mut CodeBuffer,
    codegen: &X86_64CodeGen,
    pc: u64,
    is_nonzero: bool,
    size64: bool,
    rt: u8,
    imm: i64,
) -> ConditionalExits {
    load_gpr(buf, SCRATCH, rt);
    emit_test_rr(buf, size64, SCRATCH, SCRATCH);
    let taken_cond = if is_nonzero { X86Cond::Jne } else { X86Cond::Je };
    emit_branch_pair(buf, codegen, pc, imm, taken_cond)
}

pub fn translate_test_bit_branch(
    buf: &mut CodeBuffer,
    codegen: &X86_64CodeGen,
    pc: u64,
    is_nonzero: bool,
    bit: u8,
    rt: u8,
    imm: i64,
) -> ConditionalExits {
    load_gpr(buf, SCRATCH, rt);
    emit_bt_ri(buf, true, SCRATCH, bit);
    let taken_cond = X86Cond::from_single_flag_bit(is_nonzero);
    emit_branch_pair(buf, codegen, pc, imm, taken_cond)
}

/// Shared tail for CBZ/CBNZ/TBZ/TBNZ once the host flags already reflect the
/// branch condition: jump to the taken exit when `taken_cond` holds, fall
/// through to the not-taken exit otherwise.
fn emit_branch_pair(
    buf: &mut CodeBuffer,
    codegen: &X86_64CodeGen,
    pc: u64,
    imm: i64,
    taken_cond: X86Cond,
) -> ConditionalExits {
    let to_taken = emit_jcc_forward(buf, taken_cond);

    let not_taken_target = pc + 4;
    let (not_taken_offset, not_taken_reset) = codegen.emit_exit_tb_patchable(buf, not_taken_target);

    patch_forward(buf, to_taken, buf.offset());
    let taken_target = pc.wrapping_add(imm as u64);
    let (taken_offset, taken_reset) = codegen.emit_exit_tb_patchable(buf, taken_target);

    ConditionalExits {
        taken: BranchExit::static_at(taken_target, taken_offset, taken_reset),
        not_taken: BranchExit::static_at(not_taken_target, not_taken_offset, not_taken_reset),
    }
}

/// BR/BLR/RET: the target is a guest address only known at run time, so the
/// block always exits to the dispatch loop for a fresh translation-cache
/// lookup rather than attempting to chain.
pub fn translate_branch_register(
    buf: &mut CodeBuffer,
    codegen: &X86_64CodeGen,
    pc: u64,
    variant: BranchRegVariant,
    rn: u8,
) -> BranchExit {
    load_gpr(buf, SCRATCH, rn);
    if variant == BranchRegVariant::Blr {
        store_gpr_link(buf, pc + 4);
    }
    codegen.emit_exit_tb_reg(buf, SCRATCH);
    BranchExit::dynamic()
}

/// Materialize `return_pc` and store it into X30 (the link register).
fn store_gpr_link(buf: &mut CodeBuffer, return_pc: u64) {
    emit_mov_ri(buf, true, SCRATCH, return_pc);
    store_gpr(buf, LINK_REG, SCRATCH);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backing(len: usize) -> Vec<u8> {
        vec![0u8; len]
    }

    fn new_codegen(buf: &mut CodeBuffer) -> X86_64CodeGen {
        let mut gen = X86_64CodeGen::new();
        gen.emit_prologue(buf);
        gen.emit_epilogue(buf);
        gen
    }

    #[test]
    fn unconditional_branch_targets_pc_plus_imm() {
        let mut mem = backing(256);
        let mut buf = CodeBuffer::new(mem.as_mut_ptr(), mem.len());
        let gen = new_codegen(&mut buf);
        let exit = translate_branch_unconditional(&mut buf, &gen, 0x1000, 0x40);
        match exit.target {
            ExitTarget::Static(t) => assert_eq!(t, 0x1040),
            ExitTarget::Dynamic => panic!("expected a static target"),
        }
        assert!(exit.patch_offset.is_some());
        assert!(exit.reset_offset.is_some());
    }

    #[test]
    fn conditional_branch_produces_two_distinct_static_exits() {
        let mut mem = backing(256);
        let mut buf = CodeBuffer::new(mem.as_mut_ptr(), mem.len());
        let gen = new_codegen(&mut buf);
        let exits = translate_branch_conditional(&mut buf, &gen, 0x2000, Cond::Eq, -0x10);
        let ExitTarget::Static(taken) = exits.taken.target else { panic!("taken should be static") };
        let ExitTarget::Static(not_taken) = exits.not_taken.target else { panic!("not_taken should be static") };
        assert_eq!(taken, 0x1ff0);
        assert_eq!(not_taken, 0x2004);
        assert_ne!(exits.taken.patch_offset, exits.not_taken.patch_offset);
    }

    #[test]
    fn branch_register_is_always_dynamic() {
        let mut mem = backing(256);
        let mut buf = CodeBuffer::new(mem.as_mut_ptr(), mem.len());
        let gen = new_codegen(&mut buf);
        let exit = translate_branch_register(&mut buf, &gen, 0x3000, BranchRegVariant::Ret, 30);
        assert!(matches!(exit.target, ExitTarget::Dynamic));
        assert!(exit.patch_offset.is_none());
    }
}
