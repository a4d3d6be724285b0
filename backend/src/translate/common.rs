//! Shared codegen helpers used by every per-class translator: moving a
//! guest GPR between `ThreadState` memory and a scratch host register, and
//! folding a computed NZCV into the packed flags word.
//!
//! Registers are never allocated across instructions — each translator
//! loads its operands from `ThreadState`, computes in scratch host
//! registers, and stores the result straight back. This keeps every
//! translator self-contained at the cost of redundant loads/stores that a
//! register-allocating tier would eliminate (see design notes on dropping
//! the generic register allocator).

use jitaarch64_core::{CodeBuffer, Cond};

use crate::state_layout::{gpr_offset, GUEST_BASE, PC, PSTATE, SP};
use crate::x86_64::emitter::*;
use crate::x86_64::regs::{Reg, CALL_ARG_REGS, STATE_REG};

/// Load guest GPR `idx` into `dst`. Register 31 is the zero register in
/// every data-processing context (see design notes); callers that need SP
/// semantics for register 31 (load/store base registers) use
/// [`load_sp`] instead.
pub fn load_gpr(buf: &mut CodeBuffer, dst: Reg, idx: u8) {
    if idx == 31 {
        emit_mov_ri(buf, true, dst, 0);
    } else {
        emit_load(buf, true, dst, STATE_REG, gpr_offset(idx));
    }
}

/// Store `src` into guest GPR `idx`, discarding writes to the zero
/// register.
pub fn store_gpr(buf: &mut CodeBuffer, idx: u8, src: Reg) {
    if idx != 31 {
        emit_store(buf, true, src, STATE_REG, gpr_offset(idx));
    }
}

pub fn load_sp(buf: &mut CodeBuffer, dst: Reg) {
    emit_load(buf, true, dst, STATE_REG, SP as i32);
}

pub fn store_sp(buf: &mut CodeBuffer, src: Reg) {
    emit_store(buf, true, src, STATE_REG, SP as i32);
}

/// Load either GPR `idx` or SP, matching the AArch64 convention that the
/// base register of a load/store addressing mode is SP when the field
/// encodes 31 (never the zero register).
pub fn load_gpr_or_sp(buf: &mut CodeBuffer, dst: Reg, idx: u8) {
    if idx == 31 {
        load_sp(buf, dst);
    } else {
        emit_load(buf, true, dst, STATE_REG, gpr_offset(idx));
    }
}

pub fn store_gpr_or_sp(buf: &mut CodeBuffer, idx: u8, src: Reg) {
    if idx == 31 {
        store_sp(buf, src);
    } else {
        emit_store(buf, true, src, STATE_REG, gpr_offset(idx));
    }
}

pub fn load_pstate(buf: &mut CodeBuffer, dst: Reg) {
    emit_load(buf, false, dst, STATE_REG, PSTATE as i32);
}

pub fn store_pstate(buf: &mut CodeBuffer, src: Reg) {
    emit_store(buf, false, src, STATE_REG, PSTATE as i32);
}

pub fn load_pc(buf: &mut CodeBuffer, dst: Reg) {
    emit_load(buf, true, dst, STATE_REG, PC as i32);
}

pub fn store_pc_imm(buf: &mut CodeBuffer, scratch: Reg, pc: u64) {
    emit_mov_ri(buf, true, scratch, pc);
    emit_store(buf, true, scratch, STATE_REG, PC as i32);
}

/// Turn the guest effective address already in `addr` into a host pointer
/// by adding the mapped address space's base, resolved once by the
/// `AddressSpace` collaborator at block-translation time and cached in
/// `ThreadState.guest_base`. This is the only sanctioned guest-to-host
/// address translation path generated code takes (see design notes on the
/// flat linux-user mapping).
pub fn effective_to_host(buf: &mut CodeBuffer, addr: Reg, scratch: Reg) {
    emit_load(buf, true, scratch, STATE_REG, GUEST_BASE as i32);
    emit_arith_rr(buf, ArithOp::Add, true, addr, scratch);
}

/// Narrow a 64-bit scratch register to 32 bits by zeroing its upper half
/// (every 32-bit x86 write already does this; this exists purely so call
/// sites can state the intent).
pub fn zero_upper_32(buf: &mut CodeBuffer, reg: Reg) {
    emit_mov_rr(buf, false, reg, reg);
}

/// Compute the packed NZCV word from four boolean host conditions already
/// reduced to 0/1 in `n`, `z`, `c`, `v` (each `SETcc`'d into a byte
/// register) and OR them together in `dst`, matching the bit layout in
/// `jitaarch64_core::thread_state::nzcv`.
pub fn pack_nzcv(buf: &mut CodeBuffer, dst: Reg, n: Reg, z: Reg, c: Reg, v: Reg) {
    emit_shift_ri(buf, ShiftOp::Shl, false, n, 31);
    emit_shift_ri(buf, ShiftOp::Shl, false, z, 30);
    emit_shift_ri(buf, ShiftOp::Shl, false, c, 29);
    emit_shift_ri(buf, ShiftOp::Shl, false, v, 28);
    emit_mov_rr(buf, false, dst, n);
    emit_arith_rr(buf, ArithOp::Or, false, dst, z);
    emit_arith_rr(buf, ArithOp::Or, false, dst, c);
    emit_arith_rr(buf, ArithOp::Or, false, dst, v);
}

/// Emit code testing guest condition `cond` against the NZCV word already
/// loaded into `nzcv_reg`, leaving the host zero flag set such that `Jne`
/// (via [`X86Cond::Jne`]) is taken exactly when `cond` holds. Composite
/// conditions (Ge/Lt/Gt/Le/Hi/Ls) are expanded to a handful of bit tests
/// and boolean combinations rather than a single host flag.
pub fn emit_test_cond(buf: &mut CodeBuffer, scratch: Reg, nzcv_reg: Reg, cond: Cond) {
    use jitaarch64_core::thread_state::nzcv::{C_BIT, N_BIT, V_BIT, Z_BIT};

    let mask = |bits: u32| bits as i32;
    match cond {
        Cond::Eq => emit_test_bits_set(buf, nzcv_reg, mask(Z_BIT)),
        Cond::Ne => emit_test_bits_clear(buf, nzcv_reg, mask(Z_BIT)),
        Cond::Cs => emit_test_bits_set(buf, nzcv_reg, mask(C_BIT)),
        Cond::Cc => emit_test_bits_clear(buf, nzcv_reg, mask(C_BIT)),
        Cond::Mi => emit_test_bits_set(buf, nzcv_reg, mask(N_BIT)),
        Cond::Pl => emit_test_bits_clear(buf, nzcv_reg, mask(N_BIT)),
        Cond::Vs => emit_test_bits_set(buf, nzcv_reg, mask(V_BIT)),
        Cond::Vc => emit_test_bits_clear(buf, nzcv_reg, mask(V_BIT)),
        Cond::Al | Cond::Nv => {
            emit_test_rr(buf, false, nzcv_reg, nzcv_reg);
        }
        Cond::Hi | Cond::Ls | Cond::Ge | Cond::Lt | Cond::Gt | Cond::Le => {
            emit_composite_cond(buf, scratch, nzcv_reg, cond);
        }
    }
}

/// Emit a conditional jump to a placeholder target, returning the offset of
/// the 4-byte displacement field to patch once the real target offset is
/// known. Used for in-block control flow (guard sequences, taken/fallthrough
/// branch exits) where the target isn't emitted until after the jump.
pub fn emit_jcc_forward(buf: &mut CodeBuffer, cond: X86Cond) -> usize {
    emit_jcc(buf, cond, 0);
    buf.offset() - 4
}

/// Unconditional counterpart to [`emit_jcc_forward`].
pub fn emit_jmp_forward(buf: &mut CodeBuffer) -> usize {
    emit_jmp(buf, 0);
    buf.offset() - 4
}

/// Patch a displacement field previously returned by [`emit_jcc_forward`] or
/// [`emit_jmp_forward`] now that `target_offset` is known.
pub fn patch_forward(buf: &mut CodeBuffer, disp_offset: usize, target_offset: usize) {
    let disp = target_offset as i64 - (disp_offset as i64 + 4);
    buf.patch_u32(disp_offset, disp as u32);
}

/// Emit a call into a host Rust function taking `*mut ThreadState` (already
/// live in `STATE_REG`) as its first argument, followed by `imm_args` as
/// additional System V integer arguments. Used by translators that fall back
/// to a Rust-side interpreter for operations this tier doesn't emit native
/// host code for directly (see `translate::fpsimd`).
pub fn emit_helper_call(buf: &mut CodeBuffer, func: usize, imm_args: &[u64]) {
    debug_assert!(imm_args.len() + 1 <= CALL_ARG_REGS.len());
    emit_mov_rr(buf, true, CALL_ARG_REGS[0], STATE_REG);
    for (i, &arg) in imm_args.iter().enumerate() {
        emit_mov_ri(buf, true, CALL_ARG_REGS[i + 1], arg);
    }
    let target = Reg::R10;
    emit_mov_ri(buf, true, target, func as u64);
    emit_call_reg(buf, target);
}

fn emit_test_bits_set(buf: &mut CodeBuffer, reg: Reg, mask: i32) {
    emit_arith_ri(buf, ArithOp::And, false, reg, mask);
}

fn emit_test_bits_clear(buf: &mut CodeBuffer, reg: Reg, mask: i32) {
    emit_arith_ri(buf, ArithOp::And, false, reg, mask);
    emit_arith_ri(buf, ArithOp::Xor, false, reg, mask);
}

/// Expand a composite condition by materializing N, Z, C, V as 0/1 values
/// in scratch registers and combining them with ordinary ALU ops, ending
/// with a TEST that is nonzero iff `cond` holds.
fn emit_composite_cond(buf: &mut CodeBuffer, scratch: Reg, nzcv_reg: Reg, cond: Cond) {
    use jitaarch64_core::thread_state::nzcv::{C_BIT, N_BIT, V_BIT, Z_BIT};

    let bit_into = |buf: &mut CodeBuffer, dst: Reg, src: Reg, bit: u32| {
        emit_mov_rr(buf, false, dst, src);
        emit_shift_ri(buf, ShiftOp::Shr, false, dst, bit as u8);
        emit_arith_ri(buf, ArithOp::And, false, dst, 1);
    };

    // scratch = N, nzcv_reg reused to stage Z/C/V successively via a
    // second scratch pass; Rax/Rcx/Rdx are plentiful in this tier since
    // nothing is register-allocated across instructions.
    let n = Reg::Rax;
    let z = Reg::Rcx;
    let v = Reg::Rdx;
    bit_into(buf, n, nzcv_reg, N_BIT.trailing_zeros());
    bit_into(buf, z, nzcv_reg, Z_BIT.trailing_zeros());
    bit_into(buf, v, nzcv_reg, V_BIT.trailing_zeros());

    match cond {
        Cond::Ge | Cond::Lt => {
            emit_arith_rr(buf, ArithOp::Xor, false, n, v); // n != v  <=>  Lt
            if cond == Cond::Ge {
                emit_arith_ri(buf, ArithOp::Xor, false, n, 1); // invert: n == v
            }
            emit_mov_rr(buf, false, scratch, n);
        }
        Cond::Gt | Cond::Le => {
            emit_arith_rr(buf, ArithOp::Xor, false, n, v);
            emit_arith_ri(buf, ArithOp::Xor, false, n, 1); // n == v
            emit_arith_ri(buf, ArithOp::Xor, false, z, 1); // !z
            emit_arith_rr(buf, ArithOp::And, false, n, z); // !z && n==v  <=> Gt
            if cond == Cond::Le {
                emit_arith_ri(buf, ArithOp::Xor, false, n, 1);
            }
            emit_mov_rr(buf, false, scratch, n);
        }
        Cond::Hi | Cond::Ls => {
            let c = Reg::R8;
            bit_into(buf, c, nzcv_reg, C_BIT.trailing_zeros());
            emit_arith_ri(buf, ArithOp::Xor, false, z, 1); // !z
            emit_arith_rr(buf, ArithOp::And, false, c, z); // c && !z <=> Hi
            if cond == Cond::Ls {
                emit_arith_ri(buf, ArithOp::Xor, false, c, 1);
            }
            emit_mov_rr(buf, false, scratch, c);
        }
        _ => unreachable!("emit_composite_cond only handles Ge/Lt/Gt/Le/Hi/Ls"),
    }
    emit_test_rr(buf, false, scratch, scratch);
}
