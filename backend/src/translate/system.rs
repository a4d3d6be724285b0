//! SupervisorCall/Breakpoint/Halt, MRS/MSR, and Barrier translators.
//!
//! SVC/BRK/HLT only need to stash the guest PC the dispatch loop should
//! report; the exit sequence itself (which sentinel to return, whether to
//! mark the block `SYSCALL_ENDING`) is the block translator's job, since it
//! already owns `emit_exit_tb`.

use jitaarch64_core::CodeBuffer;
use jitaarch64_decode::{InstructionClass, SystemRegister};

use crate::state_layout::{FPCR, FPSR, PSTATE, TPIDR_EL0};
use crate::translate::common::{store_gpr, store_pc_imm};
use crate::x86_64::emitter::*;
use crate::x86_64::regs::{Reg, STATE_REG};

const SCRATCH: Reg = Reg::Rax;

/// SVC terminates the block at the instruction following it; the syscall
/// veneer reads its syscall number and arguments straight out of the fixed
/// guest registers the ABI already defines (x8, x0..x5), so nothing else
/// needs to be staged here.
pub fn translate_supervisor_call(buf: &mut CodeBuffer, pc: u64) {
    store_pc_imm(buf, SCRATCH, pc + 4);
}

/// BRK/HLT trap at their own address; the dispatch loop reports that PC as
/// the guest trap location.
pub fn translate_trap(buf: &mut CodeBuffer, pc: u64) {
    store_pc_imm(buf, SCRATCH, pc);
}

/// Byte offset and width (`true` = 64-bit) of the `ThreadState` field
/// backing a directly-storable system register. NZCV/FPCR/FPSR are 32-bit
/// fields; only TPIDR_EL0 is a full 64-bit register.
fn sysreg_offset(reg: SystemRegister) -> Option<(i32, bool)> {
    match reg {
        SystemRegister::Nzcv => Some((PSTATE as i32, false)),
        SystemRegister::Fpcr => Some((FPCR as i32, false)),
        SystemRegister::Fpsr => Some((FPSR as i32, false)),
        SystemRegister::TpidrEl0 => Some((TPIDR_EL0 as i32, true)),
        SystemRegister::CntvctEl0
        | SystemRegister::CntfrqEl0
        | SystemRegister::CtrEl0
        | SystemRegister::Unknown(_) => None,
    }
}

/// A fixed value for the read-only system registers this backend models
/// without per-thread storage: an architectural frequency for CNTFRQ_EL0
/// and a minimal CTR_EL0 (4-word I/D cache lines, no further hints).
fn fixed_constant(reg: SystemRegister) -> Option<u64> {
    match reg {
        SystemRegister::CntfrqEl0 => Some(1_000_000_000),
        SystemRegister::CtrEl0 => Some(0x8000_0004),
        SystemRegister::Unknown(_) => Some(0),
        _ => None,
    }
}

pub fn translate_system_register_read(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::SystemRegisterRead { rt, reg } = *class {
        if reg == SystemRegister::CntvctEl0 {
            // RDTSC zero-extends both halves in 64-bit mode; reassemble
            // the full 64-bit counter from EDX:EAX into SCRATCH (= RAX).
            emit_rdtsc(buf);
            emit_shift_ri(buf, ShiftOp::Shl, true, Reg::Rdx, 32);
            emit_arith_rr(buf, ArithOp::Or, true, SCRATCH, Reg::Rdx);
            store_gpr(buf, rt, SCRATCH);
            return;
        }
        if let Some(value) = fixed_constant(reg) {
            emit_mov_ri(buf, true, SCRATCH, value);
            store_gpr(buf, rt, SCRATCH);
            return;
        }
        if let Some((offset, is64)) = sysreg_offset(reg) {
            emit_load(buf, is64, SCRATCH, STATE_REG, offset);
            store_gpr(buf, rt, SCRATCH);
        }
    }
}

pub fn translate_system_register_write(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::SystemRegisterWrite { rt, reg } = *class {
        if let Some((offset, is64)) = sysreg_offset(reg) {
            crate::translate::common::load_gpr(buf, SCRATCH, rt);
            emit_store(buf, is64, SCRATCH, STATE_REG, offset);
        }
        // CNTVCT_EL0/CNTFRQ_EL0/CTR_EL0/unknown registers are read-only or
        // unmodeled; writes to them are silently ignored.
    }
}

/// DMB/DSB/ISB: every memory access this backend emits is already strongly
/// ordered on the host (x86-64 TSO, single-threaded translation), so these
/// are no-ops.
pub fn translate_barrier(_buf: &mut CodeBuffer, _class: &InstructionClass) {}
