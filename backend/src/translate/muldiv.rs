//! MultiplyExtend (MADD/MSUB/SMADDL/UMADDL/SMSUBL/UMSUBL/SMULH/UMULH) and
//! Divide (SDIV/UDIV) translators.

use jitaarch64_core::CodeBuffer;
use jitaarch64_decode::{InstructionClass, MulOp};

use crate::translate::common::{emit_jcc_forward, emit_jmp_forward, load_gpr, patch_forward, store_gpr};
use crate::x86_64::emitter::*;
use crate::x86_64::regs::Reg;

const LHS: Reg = Reg::Rax;
const RHS: Reg = Reg::Rcx;
const ACC: Reg = Reg::Rdx;

pub fn translate_multiply_extend(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::MultiplyExtend { op, size64, rd, rn, rm, ra } = *class {
        match op {
            MulOp::Madd | MulOp::Msub => {
                load_gpr(buf, LHS, rn);
                load_gpr(buf, RHS, rm);
                emit_imul_rr(buf, size64, LHS, RHS);
                load_gpr(buf, ACC, ra);
                if op == MulOp::Madd {
                    emit_arith_rr(buf, ArithOp::Add, size64, ACC, LHS);
                } else {
                    emit_arith_rr(buf, ArithOp::Sub, size64, ACC, LHS);
                }
                // 32-bit arithmetic on x86-64 zeroes the destination's upper
                // half, matching the architectural zero-extend for a W-sized
                // MADD/MSUB result.
                store_gpr(buf, rd, ACC);
            }
            MulOp::SmaddlUmaddl { signed } | MulOp::SmsublUmsubl { signed } => {
                load_gpr(buf, LHS, rn);
                load_gpr(buf, RHS, rm);
                if signed {
                    emit_movsx(buf, OPC_MOVSLQ, LHS, LHS);
                    emit_movsx(buf, OPC_MOVSLQ, RHS, RHS);
                }
                // Unsigned 32-bit operands are already zero-extended by the
                // convention every 32-bit-writing translator upholds.
                emit_imul_rr(buf, true, LHS, RHS);
                load_gpr(buf, ACC, ra);
                if matches!(op, MulOp::SmaddlUmaddl { .. }) {
                    emit_arith_rr(buf, ArithOp::Add, true, ACC, LHS);
                } else {
                    emit_arith_rr(buf, ArithOp::Sub, true, ACC, LHS);
                }
                store_gpr(buf, rd, ACC);
            }
            MulOp::SmulhUmulh { signed } => {
                load_gpr(buf, Reg::Rax, rn);
                load_gpr(buf, RHS, rm);
                if signed {
                    emit_imul1(buf, true, RHS);
                } else {
                    emit_mul(buf, true, RHS);
                }
                // High 64 bits of the 128-bit product land in RDX.
                store_gpr(buf, rd, Reg::Rdx);
            }
        }
    }
}

pub fn translate_divide(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::Divide { signed, size64, rd, rn, rm } = *class {
        load_gpr(buf, LHS, rn);
        load_gpr(buf, RHS, rm);

        // ARM SDIV/UDIV define division by zero as a result of zero rather
        // than a trap; x86 DIV/IDIV fault on a zero divisor, so the
        // division is skipped entirely and the destination zeroed instead.
        emit_test_rr(buf, size64, RHS, RHS);
        let skip_to_zero = emit_jcc_forward(buf, X86Cond::Je);

        // Signed INT_MIN / -1 overflows the quotient register on x86
        // (#DE) but ARM defines it as a plain INT_MIN result with no trap;
        // skip straight to the end (LHS already holds INT_MIN) in that case.
        let skip_to_end_int_min = if signed {
            emit_arith_ri(buf, ArithOp::Cmp, size64, RHS, -1);
            let not_minus_one = emit_jcc_forward(buf, X86Cond::Jne);
            let int_min = if size64 { i64::MIN as u64 } else { (i32::MIN as i64) as u64 };
            emit_mov_ri(buf, true, Reg::R9, int_min);
            emit_arith_rr(buf, ArithOp::Cmp, size64, LHS, Reg::R9);
            let not_int_min = emit_jcc_forward(buf, X86Cond::Jne);
            let to_end = emit_jmp_forward(buf);
            patch_forward(buf, not_minus_one, buf.offset());
            patch_forward(buf, not_int_min, buf.offset());
            Some(to_end)
        } else {
            None
        };

        if signed {
            if size64 {
                emit_cqo(buf);
            } else {
                emit_cdq(buf);
            }
            emit_idiv(buf, size64, RHS);
        } else {
            emit_mov_ri(buf, true, Reg::Rdx, 0);
            emit_div(buf, size64, RHS);
        }
        let to_end_divided = emit_jmp_forward(buf);

        patch_forward(buf, skip_to_zero, buf.offset());
        emit_mov_ri(buf, true, LHS, 0);
        // Falls through to `end` below.

        let end = buf.offset();
        patch_forward(buf, to_end_divided, end);
        if let Some(to_end) = skip_to_end_int_min {
            patch_forward(buf, to_end, end);
        }

        store_gpr(buf, rd, LHS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backing(len: usize) -> Vec<u8> {
        vec![0u8; len]
    }

    #[test]
    fn forward_je_patches_to_a_later_offset() {
        let mut mem = backing(64);
        let mut buf = CodeBuffer::new(mem.as_mut_ptr(), mem.len());
        emit_test_rr(&mut buf, true, Reg::Rax, Reg::Rax);
        let disp_offset = emit_jcc_forward(&mut buf, X86Cond::Je);
        emit_mov_ri(&mut buf, true, Reg::Rcx, 0);
        let target = buf.offset();
        patch_forward(&mut buf, disp_offset, target);
        let disp = buf.read_u32(disp_offset) as i32;
        assert_eq!(disp_offset as i64 + 4 + disp as i64, target as i64);
    }
}
