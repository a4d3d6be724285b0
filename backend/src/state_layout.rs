//! Byte offsets of `ThreadState` fields, computed with `offset_of!` rather
//! than hand-derived arithmetic so a field reorder in `jitaarch64-core`
//! cannot silently desynchronize the code generator.

use std::mem::offset_of;

use jitaarch64_core::ThreadState;

pub const GPR_BASE: usize = offset_of!(ThreadState, gpr);
pub const SP: usize = offset_of!(ThreadState, sp);
pub const PC: usize = offset_of!(ThreadState, pc);
pub const PSTATE: usize = offset_of!(ThreadState, pstate);
pub const SYSCALL_NO: usize = offset_of!(ThreadState, syscall_no);
pub const SYSCALL_RESULT: usize = offset_of!(ThreadState, syscall_result);
pub const SYSCALL_ERRNO: usize = offset_of!(ThreadState, syscall_errno);
pub const FPSR: usize = offset_of!(ThreadState, fpsr);
pub const FPCR: usize = offset_of!(ThreadState, fpcr);
pub const GUEST_BASE: usize = offset_of!(ThreadState, guest_base);
pub const TPIDR_EL0: usize = offset_of!(ThreadState, tpidr_el0);
pub const VREG_BASE: usize = offset_of!(ThreadState, vreg);

/// Byte offset of guest GPR `idx` (0..=30). The caller is responsible for
/// mapping register 31 to SP or the zero register per the instruction's
/// own addressing-mode rules — this function never special-cases it.
#[inline]
pub fn gpr_offset(idx: u8) -> i32 {
    debug_assert!(idx < 31);
    (GPR_BASE + idx as usize * 8) as i32
}

/// Byte offset of the low 64 bits of vector/FP register `idx` (0..=31).
#[inline]
pub fn vreg_offset(idx: u8) -> i32 {
    debug_assert!(idx < 32);
    (VREG_BASE + idx as usize * 16) as i32
}

/// Byte offset of the high 64 bits of vector/FP register `idx` (0..=31).
#[inline]
pub fn vreg_hi_offset(idx: u8) -> i32 {
    vreg_offset(idx) + 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpr_offsets_are_distinct_and_increasing() {
        assert!(gpr_offset(1) > gpr_offset(0));
        assert_eq!(gpr_offset(0) as usize, GPR_BASE);
    }
}
