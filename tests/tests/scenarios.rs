//! End-to-end scenarios driving a `JitContext` through `dispatch` over
//! hand-assembled guest programs.

mod support;

use jitaarch64_core::JitConfig;
use jitaarch64_exec::{DispatchStatus, JitContext};
use support::{
    add_reg, b_cond, b_uncond, brk, fadd_reg, fmov_fp_to_gpr, fmov_gpr_to_fp, ldr_s, ldrsb_w, ldrsb_x, ldrsh_w,
    ldrsh_x, madd32, movz, new_mapped_space, new_state, ret, simd_add_4s, subs_reg, write_program, NoSyscalls,
    LR_STOP,
};

const PC: u64 = 0x4000;

fn new_ctx() -> JitContext {
    JitContext::jit_init(JitConfig::default()).expect("jit_init should succeed with default config")
}

/// S1. Single-block ADD translation.
#[test]
fn single_block_add_translation() {
    let space = new_mapped_space(PC);
    write_program(&space, PC, &[add_reg(2, 0, 1), ret(30)]);

    let mut state = new_state(&space);
    state.pc = PC;
    state.gpr[0] = 7;
    state.gpr[1] = 35;
    state.gpr[30] = LR_STOP;

    let mut ctx = new_ctx();
    let mut sys = NoSyscalls;
    let (next_pc, status) = unsafe { ctx.dispatch(PC, &mut state, &space, &mut sys) };

    assert_eq!(next_pc, LR_STOP);
    assert_eq!(status, DispatchStatus::Stop);
    assert_eq!(state.gpr[2], 42);
    assert_eq!(state.pstate, 0, "ADD without S must not touch flags");
}

/// S2. Conditional branch taken.
#[test]
fn conditional_branch_taken() {
    let space = new_mapped_space(PC);
    write_program(
        &space,
        PC,
        &[
            subs_reg(0, 0, 1),   // SUBS X0, X0, X1
            b_cond(0b0000, 12),  // B.EQ -> MOVZ X2,#2 (skips the not-taken block)
            movz(2, 1),          // MOVZ X2, #1   (not-taken path)
            b_uncond(8),         // B -> RET (skips the taken-path MOVZ)
            movz(2, 2),          // MOVZ X2, #2   (taken path)
            ret(30),
        ],
    );

    let mut state = new_state(&space);
    state.pc = PC;
    state.gpr[0] = 10;
    state.gpr[1] = 10;
    state.gpr[30] = LR_STOP;

    let mut ctx = new_ctx();
    let mut sys = NoSyscalls;
    let (next_pc, status) = unsafe { ctx.dispatch(PC, &mut state, &space, &mut sys) };

    assert_eq!(next_pc, LR_STOP);
    assert_eq!(status, DispatchStatus::Stop);
    assert_eq!(state.gpr[2], 2);
    assert!(state.flag_z());
}

/// S3. Translation cache hit.
#[test]
fn translation_cache_hit() {
    let space = new_mapped_space(PC);
    write_program(&space, PC, &[add_reg(2, 0, 1), ret(30)]);

    let mut ctx = new_ctx();
    let first = ctx.translate_block(PC, &space).expect("first translation should succeed");
    let second = ctx.translate_block(PC, &space).expect("second translation should succeed");

    assert_eq!(first, second);
    assert_eq!(ctx.stats().jump_cache_hits, 1);
    assert_eq!(ctx.translation_cache_stats().blocks_translated, 1);
}

/// S4. Invalidate + retranslate.
#[test]
fn invalidate_then_retranslate() {
    let space = new_mapped_space(PC);
    write_program(&space, PC, &[add_reg(2, 0, 1), ret(30)]);

    let mut ctx = new_ctx();
    ctx.translate_block(PC, &space).expect("initial translation should succeed");

    assert!(ctx.translation_invalidate(PC));
    assert!(ctx.translation_lookup(PC).is_none());

    ctx.translate_block(PC, &space).expect("retranslation after invalidate should succeed");
    assert_eq!(ctx.translation_cache_stats().blocks_translated, 2);
}

/// S5. Flush with reset.
#[test]
fn flush_with_reset() {
    let space = new_mapped_space(PC);
    write_program(&space, PC, &[add_reg(2, 0, 1), ret(30)]);

    let mut ctx = new_ctx();
    ctx.translate_block(PC, &space).expect("translation should succeed");
    assert_eq!(ctx.resident_count(), 1);
    assert!(ctx.code_cache_offset() > 0);

    ctx.jit_reset().expect("reset should succeed");
    assert_eq!(ctx.resident_count(), 0);
    assert_eq!(ctx.code_cache_offset(), 0);

    // The cache is usable again after reset: translating the same guest
    // program from scratch still works and produces the same guest result.
    let mut state = new_state(&space);
    state.pc = PC;
    state.gpr[0] = 1;
    state.gpr[1] = 2;
    state.gpr[30] = LR_STOP;
    let mut sys = NoSyscalls;
    let (_, status) = unsafe { ctx.dispatch(PC, &mut state, &space, &mut sys) };
    assert_eq!(status, DispatchStatus::Stop);
    assert_eq!(state.gpr[2], 3);
}

/// S6. Guest BRK traps.
#[test]
fn guest_brk_traps() {
    let space = new_mapped_space(PC);
    write_program(&space, PC, &[brk(0)]);

    let mut state = new_state(&space);
    state.pc = PC;

    let mut ctx = new_ctx();
    let mut sys = NoSyscalls;
    let (next_pc, status) = unsafe { ctx.dispatch(PC, &mut state, &space, &mut sys) };

    assert_eq!(next_pc, jitaarch64_core::STOP_SENTINEL);
    assert_eq!(status, DispatchStatus::Trap(PC));
    // No subsequent instruction ran: the only effect of a single BRK block
    // is the PC stash, nothing else in the thread state changes.
    assert_eq!(state.gpr, [0u64; 31]);
}

/// S7. Scalar FP load, add, and raw-bits move back to a GPR.
#[test]
fn scalar_fp_load_and_add() {
    const DATA_ADDR: u64 = PC + 0x100;

    let space = new_mapped_space(PC);
    write_program(
        &space,
        PC,
        &[
            movz(1, (DATA_ADDR & 0xffff) as u16), // X1 = DATA_ADDR
            ldr_s(0, 1, 0),                       // LDR S0, [X1]
            fadd_reg(1, 0, 0),                    // FADD S1, S0, S0
            fmov_fp_to_gpr(2, 1),                 // FMOV W2, S1
            ret(30),
        ],
    );
    unsafe {
        space.write_bytes(DATA_ADDR, &3.5f32.to_bits().to_le_bytes());
    }

    let mut state = new_state(&space);
    state.pc = PC;
    state.gpr[30] = LR_STOP;

    let mut ctx = new_ctx();
    let mut sys = NoSyscalls;
    let (next_pc, status) = unsafe { ctx.dispatch(PC, &mut state, &space, &mut sys) };

    assert_eq!(next_pc, LR_STOP);
    assert_eq!(status, DispatchStatus::Stop);
    assert_eq!(f32::from_bits(state.gpr[2] as u32), 7.0);
    assert_eq!(state.gpr[2] >> 32, 0, "FMOV Wd must zero-extend into the full GPR");
}

/// S8. Raw bits into two vector registers, a lane-wise SIMD add, and the
/// result's low lane moved back out through a GPR.
#[test]
fn simd_add_round_trips_through_gpr() {
    let space = new_mapped_space(PC);
    write_program(
        &space,
        PC,
        &[
            movz(0, 100),
            movz(1, 200),
            fmov_gpr_to_fp(0, 0), // V0 low lane = 100
            fmov_gpr_to_fp(1, 1), // V1 low lane = 200
            simd_add_4s(2, 0, 1), // V2.4S = V0.4S + V1.4S
            fmov_fp_to_gpr(2, 2), // X2 = V2 low lane
            ret(30),
        ],
    );

    let mut state = new_state(&space);
    state.pc = PC;
    state.gpr[30] = LR_STOP;

    let mut ctx = new_ctx();
    let mut sys = NoSyscalls;
    let (next_pc, status) = unsafe { ctx.dispatch(PC, &mut state, &space, &mut sys) };

    assert_eq!(next_pc, LR_STOP);
    assert_eq!(status, DispatchStatus::Stop);
    assert_eq!(state.gpr[2], 300);
}

/// S9. 32-bit MADD zero-extends its result despite garbage in the operands'
/// and accumulator's upper 32 bits.
#[test]
fn madd_32bit_zero_extends_result() {
    let space = new_mapped_space(PC);
    write_program(&space, PC, &[madd32(2, 0, 1, 2), ret(30)]);

    let mut state = new_state(&space);
    state.pc = PC;
    state.gpr[0] = 0xFFFF_FFFF_FFFF_FFFF; // Wn = -1, upper half garbage
    state.gpr[1] = 2;
    state.gpr[2] = 0xFFFF_FFFF_0000_0000; // Wa = 0, upper half garbage
    state.gpr[30] = LR_STOP;

    let mut ctx = new_ctx();
    let mut sys = NoSyscalls;
    let (next_pc, status) = unsafe { ctx.dispatch(PC, &mut state, &space, &mut sys) };

    assert_eq!(next_pc, LR_STOP);
    assert_eq!(status, DispatchStatus::Stop);
    // (-1 * 2) + 0 = -2, truncated to 32 bits and zero-extended.
    assert_eq!(state.gpr[2], 0xFFFF_FFFE);
}

/// S10. LDRSB/LDRSH sign-extend a negative byte/halfword into a 64-bit
/// destination, and zero-extend the upper half when the destination is 32-bit.
#[test]
fn signed_sub_word_loads_at_width_boundaries() {
    const BYTE_ADDR: u64 = PC + 0x100;
    const HALF_ADDR: u64 = PC + 0x108;

    let space = new_mapped_space(PC);
    write_program(
        &space,
        PC,
        &[
            movz(1, (BYTE_ADDR & 0xffff) as u16), // X1 = BYTE_ADDR
            ldrsb_x(0, 1, 0),                     // X0  = sign-extend(byte)
            ldrsb_w(2, 1, 0),                     // W2  = sign-extend(byte), zero upper
            movz(1, (HALF_ADDR & 0xffff) as u16), // X1 = HALF_ADDR
            ldrsh_x(3, 1, 0),                      // X3  = sign-extend(half)
            ldrsh_w(4, 1, 0),                      // W4  = sign-extend(half), zero upper
            ret(30),
        ],
    );
    unsafe {
        space.write_bytes(BYTE_ADDR, &[0xFFu8]); // -1 as i8
        space.write_bytes(HALF_ADDR, &0x8000u16.to_le_bytes()); // -32768 as i16
    }

    let mut state = new_state(&space);
    state.pc = PC;
    state.gpr[30] = LR_STOP;

    let mut ctx = new_ctx();
    let mut sys = NoSyscalls;
    let (next_pc, status) = unsafe { ctx.dispatch(PC, &mut state, &space, &mut sys) };

    assert_eq!(next_pc, LR_STOP);
    assert_eq!(status, DispatchStatus::Stop);
    assert_eq!(state.gpr[0], u64::MAX, "LDRSB Xt must sign-extend to 64 bits");
    assert_eq!(state.gpr[2], 0xFFFF_FFFF, "LDRSB Wt must zero the upper half");
    assert_eq!(state.gpr[3], 0xFFFF_FFFF_FFFF_8000, "LDRSH Xt must sign-extend to 64 bits");
    assert_eq!(state.gpr[4], 0xFFFF_8000, "LDRSH Wt must zero the upper half");
}
