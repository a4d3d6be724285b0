/// x86-64 general-purpose register indices.
///
/// Encoding matches the x86-64 ModR/M and REX register numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reg {
    Rax = 0,
    Rcx = 1,
    Rdx = 2,
    Rbx = 3,
    Rsp = 4,
    Rbp = 5,
    Rsi = 6,
    Rdi = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

impl Reg {
    /// Low 3 bits of the register encoding (for ModR/M).
    #[inline]
    pub const fn low3(self) -> u8 {
        (self as u8) & 0x7
    }

    /// Whether this register requires a REX prefix (R8-R15).
    #[inline]
    pub const fn needs_rex(self) -> bool {
        (self as u8) >= 8
    }
}

/// Persistent pointer to the guest `ThreadState`, held live across an
/// entire block (and across goto_tb chains) in a callee-saved register so
/// every per-class translator can address it without reloading it.
pub const STATE_REG: Reg = Reg::Rbp;

/// Scratch registers the per-class translators may clobber freely; none of
/// them is `STATE_REG`, a callee-saved register, or an argument register
/// that carries a live value across a call.
pub const SCRATCH_REGS: &[Reg] = &[Reg::Rax, Reg::Rcx, Reg::Rdx, Reg::R8, Reg::R9, Reg::R10, Reg::R11];

/// Callee-saved registers the prologue must save/restore (System V ABI).
pub const CALLEE_SAVED: &[Reg] = &[Reg::Rbp, Reg::Rbx, Reg::R12, Reg::R13, Reg::R14, Reg::R15];

/// Function argument registers (System V AMD64 ABI). The dispatch loop
/// calls a translated block as `fn(*mut ThreadState, *const u8) -> u64`,
/// so argument 0 lands in `Rdi` and argument 1 in `Rsi`.
pub const CALL_ARG_REGS: &[Reg] = &[Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::Rcx, Reg::R8, Reg::R9];

/// Stack frame constants (matching the layout a System V prologue needs).
pub const STACK_ALIGN: usize = 16;

/// Total push size: return address (implicit) + callee-saved pushes.
pub const PUSH_SIZE: usize = (1 + CALLEE_SAVED.len()) * 8;

/// Scratch stack space reserved below the frame for spills the block
/// translator may need (e.g. staging a 128-bit multiply result).
pub const SCRATCH_STACK_BYTES: usize = 64;

/// Total frame size (16-byte aligned).
pub const FRAME_SIZE: usize = {
    let raw = PUSH_SIZE + SCRATCH_STACK_BYTES;
    (raw + STACK_ALIGN - 1) & !(STACK_ALIGN - 1)
};

/// Stack adjustment after pushes.
pub const STACK_ADDEND: usize = FRAME_SIZE - PUSH_SIZE;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_size_is_16_byte_aligned() {
        assert_eq!(FRAME_SIZE % STACK_ALIGN, 0);
    }

    #[test]
    fn high_registers_need_rex() {
        assert!(Reg::R8.needs_rex());
        assert!(!Reg::Rax.needs_rex());
    }
}
