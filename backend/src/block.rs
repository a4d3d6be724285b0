//! The block translator: decode-and-translate guest instructions starting at
//! a given PC into one host code sequence, stopping at the first terminator
//! or at the per-block instruction budget.
//!
//! This mirrors the shape of the teacher's `translator_loop`/`TranslatorOps`
//! (init, then a bounded `insn_start`/`translate_insn` loop until a jump
//! decision fires) without a generic IR tier: there is no `tcg_core::Context`
//! equivalent here, so each decoded instruction is translated straight to
//! host machine code by the matching per-class translator in
//! [`crate::translate`] instead of being built into an intermediate op list.

use jitaarch64_core::tb::flags;
use jitaarch64_core::{CodeBuffer, JitConfig, TranslationBlock, STOP_SENTINEL};
use jitaarch64_decode::{decode, DecodedInstruction, InstructionClass};

use crate::translate::branch::{
    translate_branch_conditional, translate_branch_link, translate_branch_register,
    translate_branch_unconditional, translate_compare_and_branch, translate_test_bit_branch,
    BranchExit, ExitTarget,
};
use crate::translate::{alu, bitfield, condsel, fpsimd, memory, movwide, muldiv, system};
use crate::x86_64::X86_64CodeGen;

/// Fetches one guest instruction word at a guest PC. `jitaarch64-backend`
/// has no dependency on an `AddressSpace` collaborator of its own (see
/// design notes on keeping codegen and memory-mapping concerns separate);
/// the caller supplies the raw fetch, typically backed by the same
/// `guest_base`-relative mapping generated load/store code already uses.
pub trait InstructionFetch {
    fn fetch(&self, pc: u64) -> u32;
}

/// How a translated block hands control back once it stops executing.
pub enum BlockExit {
    /// A single statically-known successor (unconditional/link branch, an
    /// indirect branch whose target is [`ExitTarget::Dynamic`], or simply
    /// running past the instruction budget).
    Single(BranchExit),
    /// A conditional branch's two possible successors.
    Conditional { taken: BranchExit, not_taken: BranchExit },
    /// SVC: the block ends with a static successor at `pc + 4`, but the
    /// dispatch loop must invoke the syscall collaborator before resuming
    /// there (`TranslationBlock::flags` carries `SYSCALL_ENDING`).
    Syscall(BranchExit),
    /// BRK/HLT/an unrecognized instruction: the block stashes the trapping
    /// guest PC into `ThreadState.pc` and returns the stop sentinel rather
    /// than a chainable exit. There is nothing to chain.
    Trap,
}

/// Translate one basic block starting at `start_pc`, emitting into `buf`
/// (a view already positioned at `host_offset` within the owning code
/// cache) and returning its descriptor plus how it exits.
pub fn translate_block<F: InstructionFetch>(
    buf: &mut CodeBuffer,
    codegen: &X86_64CodeGen,
    host_offset: usize,
    start_pc: u64,
    fetch: &F,
    config: &JitConfig,
) -> (TranslationBlock, BlockExit) {
    let mut tb = TranslationBlock::new(start_pc, host_offset);
    let mut pc = start_pc;

    loop {
        let raw = fetch.fetch(pc);
        let insn = decode(raw, pc);
        tb.guest_insn_count += 1;

        if let Some(exit) = translate_instruction(buf, codegen, &insn) {
            tb.guest_byte_len = (pc + DecodedInstruction::LEN - start_pc) as u32;
            return finish(tb, exit);
        }

        pc += DecodedInstruction::LEN;

        if tb.guest_insn_count as usize >= config.max_block_instructions {
            tb.guest_byte_len = (pc - start_pc) as u32;
            let target = pc;
            let (patch_offset, reset_offset) = codegen.emit_exit_tb_patchable(buf, target);
            let exit = BlockExit::Single(BranchExit {
                target: ExitTarget::Static(target),
                patch_offset: Some(patch_offset),
                reset_offset: Some(reset_offset),
            });
            return finish(tb, exit);
        }
    }
}

/// Record each exit's patchable jump offset into the block's chaining slots
/// and return `(tb, exit)`. Kept as a plain function (rather than inlined at
/// both call sites above) so the bookkeeping between `BlockExit` and
/// `TranslationBlock::jmp_insn_offset` stays in one place.
fn finish(mut tb: TranslationBlock, exit: BlockExit) -> (TranslationBlock, BlockExit) {
    match &exit {
        BlockExit::Single(e) => {
            tb.jmp_insn_offset[0] = e.patch_offset;
            tb.jmp_reset_offset[0] = e.reset_offset;
            tb.exit_target[0] = static_target(e.target);
        }
        // The syscall collaborator decides the real resume PC; chaining
        // straight off this exit's static `pc + 4` would assume it always
        // resumes there, so `exit_target` is left unset.
        BlockExit::Syscall(e) => {
            tb.jmp_insn_offset[0] = e.patch_offset;
            tb.jmp_reset_offset[0] = e.reset_offset;
        }
        BlockExit::Conditional { taken, not_taken } => {
            tb.jmp_insn_offset[0] = taken.patch_offset;
            tb.jmp_reset_offset[0] = taken.reset_offset;
            tb.exit_target[0] = static_target(taken.target);
            tb.jmp_insn_offset[1] = not_taken.patch_offset;
            tb.jmp_reset_offset[1] = not_taken.reset_offset;
            tb.exit_target[1] = static_target(not_taken.target);
        }
        BlockExit::Trap => {}
    }
    if matches!(exit, BlockExit::Syscall(_)) {
        tb.flags |= flags::SYSCALL_ENDING;
    }
    tb.flags |= flags::VALID;
    (tb, exit)
}

fn static_target(target: ExitTarget) -> Option<u64> {
    match target {
        ExitTarget::Static(pc) => Some(pc),
        ExitTarget::Dynamic => None,
    }
}

/// Translate one decoded instruction. Returns `Some` exactly when `insn` is
/// a terminator (matching [`DecodedInstruction::is_terminator`]) and the
/// block translation loop should stop.
fn translate_instruction(buf: &mut CodeBuffer, codegen: &X86_64CodeGen, insn: &DecodedInstruction) -> Option<BlockExit> {
    match insn.class {
        InstructionClass::AluRegister { .. } => {
            alu::translate_alu_register(buf, &insn.class);
            None
        }
        InstructionClass::MovWide { .. } => {
            movwide::translate_mov_wide(buf, &insn.class);
            None
        }
        InstructionClass::Bitfield { .. } => {
            bitfield::translate_bitfield(buf, &insn.class);
            None
        }
        InstructionClass::MultiplyExtend { .. } => {
            muldiv::translate_multiply_extend(buf, &insn.class);
            None
        }
        InstructionClass::Divide { .. } => {
            muldiv::translate_divide(buf, &insn.class);
            None
        }
        InstructionClass::ConditionalSelect { .. } => {
            condsel::translate_conditional_select(buf, &insn.class);
            None
        }
        InstructionClass::CompareRegister { .. } => {
            alu::translate_compare_register(buf, &insn.class);
            None
        }
        InstructionClass::Test { .. } => {
            alu::translate_test(buf, &insn.class);
            None
        }
        InstructionClass::LoadStore { .. } => {
            memory::translate_load_store(buf, &insn.class);
            None
        }
        InstructionClass::LoadStorePair { .. } => {
            memory::translate_load_store_pair(buf, &insn.class);
            None
        }
        InstructionClass::BranchUnconditional { imm } => {
            Some(BlockExit::Single(translate_branch_unconditional(buf, codegen, insn.pc, imm)))
        }
        InstructionClass::BranchLink { imm } => {
            Some(BlockExit::Single(translate_branch_link(buf, codegen, insn.pc, imm)))
        }
        InstructionClass::BranchConditional { cond, imm } => {
            let exits = translate_branch_conditional(buf, codegen, insn.pc, cond, imm);
            Some(BlockExit::Conditional { taken: exits.taken, not_taken: exits.not_taken })
        }
        InstructionClass::CompareAndBranch { is_nonzero, size64, rt, imm } => {
            let exits = translate_compare_and_branch(buf, codegen, insn.pc, is_nonzero, size64, rt, imm);
            Some(BlockExit::Conditional { taken: exits.taken, not_taken: exits.not_taken })
        }
        InstructionClass::TestBitBranch { is_nonzero, bit, rt, imm } => {
            let exits = translate_test_bit_branch(buf, codegen, insn.pc, is_nonzero, bit, rt, imm);
            Some(BlockExit::Conditional { taken: exits.taken, not_taken: exits.not_taken })
        }
        InstructionClass::BranchRegister { variant, rn } => {
            Some(BlockExit::Single(translate_branch_register(buf, codegen, insn.pc, variant, rn)))
        }
        InstructionClass::SupervisorCall { .. } => {
            system::translate_supervisor_call(buf, insn.pc);
            let target = insn.pc + 4;
            let (patch_offset, reset_offset) = codegen.emit_exit_tb_patchable(buf, target);
            Some(BlockExit::Syscall(BranchExit {
                target: ExitTarget::Static(target),
                patch_offset: Some(patch_offset),
                reset_offset: Some(reset_offset),
            }))
        }
        InstructionClass::Breakpoint { .. } | InstructionClass::Halt { .. } => {
            system::translate_trap(buf, insn.pc);
            codegen.emit_exit_tb(buf, STOP_SENTINEL);
            Some(BlockExit::Trap)
        }
        InstructionClass::SystemRegisterRead { .. } => {
            system::translate_system_register_read(buf, &insn.class);
            None
        }
        InstructionClass::SystemRegisterWrite { .. } => {
            system::translate_system_register_write(buf, &insn.class);
            None
        }
        InstructionClass::Barrier => {
            system::translate_barrier(buf, &insn.class);
            None
        }
        InstructionClass::FpDataProcessing { .. } => {
            fpsimd::translate_fp_data_processing(buf, &insn.class);
            None
        }
        InstructionClass::FpConvert { .. } => {
            fpsimd::translate_fp_convert(buf, &insn.class);
            None
        }
        InstructionClass::FpCompare { .. } => {
            fpsimd::translate_fp_compare(buf, &insn.class);
            None
        }
        InstructionClass::FpMove { .. } => {
            fpsimd::translate_fp_move(buf, &insn.class);
            None
        }
        InstructionClass::SimdArith { .. } => {
            fpsimd::translate_simd_arith(buf, &insn.class);
            None
        }
        InstructionClass::SimdLoadStore { .. } => {
            fpsimd::translate_simd_load_store(buf, &insn.class);
            None
        }
        InstructionClass::Unsupported | InstructionClass::Unknown => {
            system::translate_trap(buf, insn.pc);
            codegen.emit_exit_tb(buf, STOP_SENTINEL);
            Some(BlockExit::Trap)
        }
    }
}
