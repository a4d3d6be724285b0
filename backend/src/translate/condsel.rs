//! ConditionalSelect (CSEL/CSINC/CSINV/CSNEG) translator.

use jitaarch64_core::CodeBuffer;
use jitaarch64_decode::{CondSelVariant, InstructionClass};

use crate::translate::common::{load_gpr, load_pstate, store_gpr};
use crate::x86_64::emitter::*;
use crate::x86_64::regs::Reg;

const TRUE_VAL: Reg = Reg::Rax;
const FALSE_VAL: Reg = Reg::Rcx;
const NZCV: Reg = Reg::Rdx;
const COND_SCRATCH: Reg = Reg::R8;

pub fn translate_conditional_select(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::ConditionalSelect { variant, size64, rd, rn, rm, cond } = *class {
        load_gpr(buf, TRUE_VAL, rn);
        load_gpr(buf, FALSE_VAL, rm);

        match variant {
            CondSelVariant::Csel => {}
            CondSelVariant::Csinc => emit_arith_ri(buf, ArithOp::Add, size64, FALSE_VAL, 1),
            CondSelVariant::Csinv => emit_not(buf, size64, FALSE_VAL),
            CondSelVariant::Csneg => emit_neg(buf, size64, FALSE_VAL),
        }

        load_pstate(buf, NZCV);
        crate::translate::common::emit_test_cond(buf, COND_SCRATCH, NZCV, cond);
        // emit_test_cond clears ZF iff `cond` holds. CMOVE (ZF=1, cond
        // false) overwrites TRUE_VAL with FALSE_VAL; otherwise TRUE_VAL
        // (already in the destination) is left untouched.
        emit_cmovcc(buf, X86Cond::Je, size64, TRUE_VAL, FALSE_VAL);

        store_gpr(buf, rd, TRUE_VAL);
    }
}
