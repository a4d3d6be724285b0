//! MOVZ/MOVN/MOVK translator.

use jitaarch64_core::CodeBuffer;
use jitaarch64_decode::{InstructionClass, MovWideVariant};

use crate::translate::common::{load_gpr, store_gpr};
use crate::x86_64::emitter::*;
use crate::x86_64::regs::Reg;

const SCRATCH: Reg = Reg::Rax;

pub fn translate_mov_wide(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::MovWide { variant, size64, rd, imm16, shift } = *class {
        match variant {
            MovWideVariant::Movz => {
                emit_mov_ri(buf, size64, SCRATCH, imm16 << shift);
            }
            MovWideVariant::Movn => {
                let shifted = imm16 << shift;
                let value = if size64 { !shifted } else { (!shifted) & 0xFFFF_FFFF };
                emit_mov_ri(buf, size64, SCRATCH, value);
            }
            MovWideVariant::Movk => {
                load_gpr(buf, SCRATCH, rd);
                let mask = !(0xFFFFu64 << shift);
                emit_mov_ri(buf, true, Reg::Rcx, mask);
                emit_arith_rr(buf, ArithOp::And, true, SCRATCH, Reg::Rcx);
                emit_mov_ri(buf, true, Reg::Rcx, imm16 << shift);
                emit_arith_rr(buf, ArithOp::Or, true, SCRATCH, Reg::Rcx);
            }
        }
        store_gpr(buf, rd, SCRATCH);
    }
}
