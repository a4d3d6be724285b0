//! AluRegister, CompareRegister, and Test translators: arithmetic and
//! logical instructions whose second operand may be an immediate, a
//! shifted register, or an extended register.

use jitaarch64_core::CodeBuffer;
use jitaarch64_decode::{AluOp, CompareOp, ExtendKind, InstructionClass, Operand2, ShiftKind};

use crate::translate::common::*;
use crate::x86_64::emitter::*;
use crate::x86_64::regs::Reg;

const SCRATCH_DST: Reg = Reg::Rax;
const SCRATCH_SRC: Reg = Reg::Rcx;

/// Materialize `operand2` into `SCRATCH_SRC`, applying its shift/extend.
fn materialize_operand2(buf: &mut CodeBuffer, operand2: Operand2) {
    match operand2 {
        Operand2::Immediate(imm) => emit_mov_ri(buf, true, SCRATCH_SRC, imm),
        Operand2::ShiftedReg { rm, kind, amount } => {
            load_gpr(buf, SCRATCH_SRC, rm);
            if amount > 0 {
                let op = match kind {
                    ShiftKind::Lsl => ShiftOp::Shl,
                    ShiftKind::Lsr => ShiftOp::Shr,
                    ShiftKind::Asr => ShiftOp::Sar,
                    ShiftKind::Ror => ShiftOp::Ror,
                };
                emit_shift_ri(buf, op, true, SCRATCH_SRC, amount);
            }
        }
        Operand2::ExtendedReg { rm, kind, amount } => {
            load_gpr(buf, SCRATCH_SRC, rm);
            match kind {
                ExtendKind::Uxtb => emit_movzx(buf, OPC_MOVZBL, SCRATCH_SRC, SCRATCH_SRC),
                ExtendKind::Uxth => emit_movzx(buf, OPC_MOVZWL, SCRATCH_SRC, SCRATCH_SRC),
                ExtendKind::Uxtw => zero_upper_32(buf, SCRATCH_SRC),
                ExtendKind::Uxtx => {}
                ExtendKind::Sxtb => emit_movsx(buf, OPC_MOVSBL, SCRATCH_SRC, SCRATCH_SRC),
                ExtendKind::Sxth => emit_movsx(buf, OPC_MOVSWL, SCRATCH_SRC, SCRATCH_SRC),
                ExtendKind::Sxtw => emit_movsx(buf, OPC_MOVSLQ, SCRATCH_SRC, SCRATCH_SRC),
                ExtendKind::Sxtx => {}
            }
            if amount > 0 {
                emit_shift_ri(buf, ShiftOp::Shl, true, SCRATCH_SRC, amount);
            }
        }
    }
}

fn alu_op_to_x86(op: AluOp) -> ArithOp {
    match op {
        AluOp::Add => ArithOp::Add,
        AluOp::Sub => ArithOp::Sub,
        AluOp::And | AluOp::Bic => ArithOp::And,
        AluOp::Orr | AluOp::Orn => ArithOp::Or,
        AluOp::Eor | AluOp::Eon => ArithOp::Xor,
    }
}

/// Invert the second operand in place (for BIC/ORN/EON, which are the
/// shifted-register forms computed as `dst OP (~operand2)`).
fn negate_if_needed(buf: &mut CodeBuffer, op: AluOp) {
    if matches!(op, AluOp::Bic | AluOp::Orn | AluOp::Eon) {
        emit_not(buf, true, SCRATCH_SRC);
    }
}

/// Compute flags for an add/sub and pack them into `ThreadState.pstate`.
/// Uses the host's own flags from the just-executed ADD/SUB via SETcc,
/// since x86 ADD/SUB set N/Z/C/V-equivalent flags the same way ARM does
/// for the common add/sub case (carry sense matches; x86 CF after SUB is
/// the borrow flag, which is the logical complement of ARM's carry-as-NOT-
/// borrow — flipped explicitly below).
fn set_flags_after_addsub(buf: &mut CodeBuffer, is_sub: bool) {
    let n = Reg::Rdx;
    let z = Reg::R8;
    let c = Reg::R9;
    let v = Reg::R10;

    emit_setcc(buf, X86Cond::Js, n);
    emit_setcc(buf, X86Cond::Je, z);
    if is_sub {
        // x86 CF after SUB is the borrow; ARM carry is NOT-borrow.
        emit_setcc(buf, X86Cond::Jae, c);
    } else {
        emit_setcc(buf, X86Cond::Jb, c);
    }
    emit_setcc(buf, X86Cond::Jo, v);

    let dst = Reg::R11;
    pack_nzcv(buf, dst, n, z, c, v);
    store_pstate(buf, dst);
}

/// Compute flags for a logical operation (AND/ORR/EOR/...): ARM clears C
/// and V, sets N/Z from the result.
fn set_flags_after_logical(buf: &mut CodeBuffer, result: Reg) {
    emit_test_rr(buf, true, result, result);
    let n = Reg::Rdx;
    let z = Reg::R8;
    let c = Reg::R9;
    let v = Reg::R10;
    emit_setcc(buf, X86Cond::Js, n);
    emit_setcc(buf, X86Cond::Je, z);
    emit_mov_ri(buf, false, c, 0);
    emit_mov_ri(buf, false, v, 0);
    let dst = Reg::R11;
    pack_nzcv(buf, dst, n, z, c, v);
    store_pstate(buf, dst);
}

pub fn translate_alu_register(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::AluRegister { op, set_flags, size64, rd, rn, operand2 } = *class {
        load_gpr(buf, SCRATCH_DST, rn);
        materialize_operand2(buf, operand2);
        negate_if_needed(buf, op);

        let x86_op = alu_op_to_x86(op);
        emit_arith_rr(buf, x86_op, size64, SCRATCH_DST, SCRATCH_SRC);

        if set_flags {
            match op {
                AluOp::Add | AluOp::Sub => set_flags_after_addsub(buf, op == AluOp::Sub),
                _ => set_flags_after_logical(buf, SCRATCH_DST),
            }
        }
        store_gpr(buf, rd, SCRATCH_DST);
    }
}

pub fn translate_compare_register(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::CompareRegister { op, size64, rn, operand2 } = *class {
        load_gpr(buf, SCRATCH_DST, rn);
        materialize_operand2(buf, operand2);
        let x86_op = match op {
            CompareOp::Cmp => ArithOp::Sub,
            CompareOp::Cmn => ArithOp::Add,
        };
        emit_arith_rr(buf, x86_op, size64, SCRATCH_DST, SCRATCH_SRC);
        set_flags_after_addsub(buf, op == CompareOp::Cmp);
    }
}

pub fn translate_test(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::Test { size64: _, rn, operand2 } = *class {
        load_gpr(buf, SCRATCH_DST, rn);
        materialize_operand2(buf, operand2);
        emit_arith_rr(buf, ArithOp::And, true, SCRATCH_DST, SCRATCH_SRC);
        set_flags_after_logical(buf, SCRATCH_DST);
    }
}
