//! Shared guest-image assembly helpers and a no-op `SyscallHandler` for the
//! end-to-end scenario and property tests. Encodings are built field-by-field
//! against the exact bit layout `jitaarch64-decode`'s decision tree reads,
//! rather than lifted from an assembler, since this repo doesn't carry one.

use jitaarch64_core::ThreadState;
use jitaarch64_exec::SyscallHandler;
use jitaarch64_linux_user::LinuxAddrSpace;

/// A `SyscallHandler` for scenarios that never execute an SVC. Panics if
/// invoked so a test that unexpectedly reaches a syscall fails loudly
/// instead of silently returning a next PC.
pub struct NoSyscalls;

impl SyscallHandler for NoSyscalls {
    fn dispatch_syscall(&mut self, _state: &mut ThreadState) -> u64 {
        panic!("unexpected syscall dispatch in a scenario with no SVC");
    }
}

/// Reserve a guest address space and map one RW page at `guest_addr`,
/// page-aligned down, ready to hold test-assembled instructions or data.
pub fn new_mapped_space(guest_addr: u64) -> LinuxAddrSpace {
    let space = LinuxAddrSpace::new().expect("failed to reserve guest address space");
    let page = jitaarch64_linux_user::addr_space::page_size();
    let base = guest_addr & !((page as u64) - 1);
    space
        .map_guest(base, page, libc::PROT_READ | libc::PROT_WRITE)
        .expect("failed to map guest test page");
    space
}

pub fn write_program(space: &LinuxAddrSpace, addr: u64, insns: &[u32]) {
    let mut bytes = Vec::with_capacity(insns.len() * 4);
    for insn in insns {
        bytes.extend_from_slice(&insn.to_le_bytes());
    }
    unsafe {
        space.write_bytes(addr, &bytes);
    }
}

pub fn new_state(space: &LinuxAddrSpace) -> ThreadState {
    ThreadState::new(space.guest_base())
}

/// `ADD Xd, Xn, Xm` (64-bit, no shift).
pub fn add_reg(rd: u32, rn: u32, rm: u32) -> u32 {
    0x8b000000 | (rm << 16) | (rn << 5) | rd
}

/// `SUBS Xd, Xn, Xm` (64-bit, no shift). `rd == 31` is the `CMP` alias.
pub fn subs_reg(rd: u32, rn: u32, rm: u32) -> u32 {
    0xeb000000 | (rm << 16) | (rn << 5) | rd
}

/// `MOVZ Xd, #imm16` (64-bit, no shift).
pub fn movz(rd: u32, imm16: u16) -> u32 {
    0xd2800000 | ((imm16 as u32) << 5) | rd
}

/// `B.cond` with a byte offset (must be a multiple of 4). `cond` is the
/// 4-bit AArch64 condition code (`0b0000` = EQ).
pub fn b_cond(cond: u32, byte_offset: i32) -> u32 {
    let imm19 = ((byte_offset / 4) as u32) & 0x7_ffff;
    0x5400_0000 | (imm19 << 5) | cond
}

/// `B` unconditional with a byte offset (must be a multiple of 4).
pub fn b_uncond(byte_offset: i32) -> u32 {
    let imm26 = ((byte_offset / 4) as u32) & 0x3ff_ffff;
    0x1400_0000 | imm26
}

/// `RET Xn` (defaults to X30 in the alias form, but this repo's decoder
/// reads `Rn` directly so any register works).
pub fn ret(rn: u32) -> u32 {
    0xd65f_0000 | (rn << 5)
}

/// `MADD Wd, Wn, Wm, Wa` (32-bit).
pub fn madd32(rd: u32, rn: u32, rm: u32, ra: u32) -> u32 {
    0x1B00_0000 | (rm << 16) | (ra << 10) | (rn << 5) | rd
}

/// `LDRSB Xt, [Xn, #imm12]` (signed byte load, 64-bit destination).
pub fn ldrsb_x(rt: u32, rn: u32, imm12: u32) -> u32 {
    0x3980_0000 | (imm12 << 10) | (rn << 5) | rt
}

/// `LDRSB Wt, [Xn, #imm12]` (signed byte load, 32-bit destination).
pub fn ldrsb_w(rt: u32, rn: u32, imm12: u32) -> u32 {
    0x39C0_0000 | (imm12 << 10) | (rn << 5) | rt
}

/// `LDRSH Xt, [Xn, #(imm12*2)]` (signed halfword load, 64-bit destination).
pub fn ldrsh_x(rt: u32, rn: u32, imm12: u32) -> u32 {
    0x7980_0000 | (imm12 << 10) | (rn << 5) | rt
}

/// `LDRSH Wt, [Xn, #(imm12*2)]` (signed halfword load, 32-bit destination).
pub fn ldrsh_w(rt: u32, rn: u32, imm12: u32) -> u32 {
    0x79C0_0000 | (imm12 << 10) | (rn << 5) | rt
}

/// `SVC #imm16`.
pub fn svc(imm16: u16) -> u32 {
    0xd400_0001 | ((imm16 as u32) << 5)
}

/// `BRK #imm16`.
pub fn brk(imm16: u16) -> u32 {
    0xd420_0000 | ((imm16 as u32) << 5)
}

/// `UBFM Xd, Xn, #immr, #imms` (64-bit). `UBFIZ`/`UBFX` are both aliases of
/// this one encoding, distinguished only by the `immr`/`imms` relationship
/// the backend's extraction-vs-insertion branch already handles.
pub fn ubfm(rd: u32, rn: u32, immr: u32, imms: u32) -> u32 {
    0xd340_0000 | (immr << 16) | (imms << 10) | (rn << 5) | rd
}

/// `UBFIZ Xd, Xn, #lsb, #width`.
pub fn ubfiz(rd: u32, rn: u32, lsb: u32, width: u32) -> u32 {
    ubfm(rd, rn, (64 - lsb) % 64, width - 1)
}

/// `UBFX Xd, Xn, #lsb, #width`.
pub fn ubfx(rd: u32, rn: u32, lsb: u32, width: u32) -> u32 {
    ubfm(rd, rn, lsb, lsb + width - 1)
}

/// `FADD Sd, Sn, Sm` (single precision).
pub fn fadd_reg(rd: u32, rn: u32, rm: u32) -> u32 {
    0x1E20_2800 | (rm << 16) | (rn << 5) | rd
}

/// `FMOV Wd, Sn` (raw bits, single precision FP register to GPR).
pub fn fmov_fp_to_gpr(rd: u32, rn: u32) -> u32 {
    0x1E26_0000 | (rn << 5) | rd
}

/// `FMOV Sd, Wn` (raw bits, GPR to single precision FP register).
pub fn fmov_gpr_to_fp(rd: u32, rn: u32) -> u32 {
    0x1E27_0000 | (rn << 5) | rd
}

/// `ADD Vd.4S, Vn.4S, Vm.4S` (four lanes of 32-bit integers).
pub fn simd_add_4s(rd: u32, rn: u32, rm: u32) -> u32 {
    0x4EA0_8400 | (rm << 16) | (rn << 5) | rd
}

/// `LDR St, [Xn, #(imm12*4)]` (scalar single-precision load, unsigned offset).
pub fn ldr_s(rt: u32, rn: u32, imm12: u32) -> u32 {
    0xBD40_0000 | (imm12 << 10) | (rn << 5) | rt
}

/// `STR St, [Xn, #(imm12*4)]` (scalar single-precision store, unsigned offset).
pub fn str_s(rt: u32, rn: u32, imm12: u32) -> u32 {
    0xBD00_0000 | (imm12 << 10) | (rn << 5) | rt
}

/// The stop sentinel every guest call site parks in the link register so a
/// top-level `RET` naturally ends a `dispatch` call, the way a real runtime
/// would arrange the outermost frame's return address.
pub const LR_STOP: u64 = jitaarch64_core::STOP_SENTINEL;
