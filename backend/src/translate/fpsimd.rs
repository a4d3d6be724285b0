//! Scalar FP and vector SIMD translators.
//!
//! This tier has no SSE/XMM emitter (see `x86_64::emitter`'s comment on the
//! integer-only instruction set it covers), so every operation here is
//! emitted as a call into a Rust-side `helper_*` function that interprets
//! the operation directly against `ThreadState`'s `vreg`/`gpr`/`fpsr`/`fpcr`
//! fields — the same "reference implementation" shape the vector ops are
//! documented to use, applied uniformly to scalar FP too rather than mixing
//! a native scalar path with an interpreted vector path.
//!
//! `STATE_REG` is callee-saved, so it survives the call into the helper
//! without needing to be spilled around it; every other live value the
//! translator cares about has already been written back to `ThreadState`
//! before the call and is read back out of it by the helper directly.

use jitaarch64_core::{CodeBuffer, ThreadState};
use jitaarch64_decode::{FpConvertVariant, FpMoveVariant, FpOp, InstructionClass, MemOp};

use crate::state_layout::{vreg_hi_offset, vreg_offset};
use crate::translate::common::{effective_to_host, emit_helper_call};
use crate::translate::memory::{apply_post_index, materialize_address};
use crate::x86_64::emitter::*;
use crate::x86_64::regs::{Reg, STATE_REG};

const ADDR: Reg = Reg::Rax;
const HOST: Reg = Reg::Rcx;
const VALUE: Reg = Reg::Rdx;

fn encode_fp_op(op: FpOp) -> u64 {
    match op {
        FpOp::Add => 0,
        FpOp::Sub => 1,
        FpOp::Mul => 2,
        FpOp::Div => 3,
    }
}

fn encode_convert_variant(variant: FpConvertVariant) -> u64 {
    match variant {
        FpConvertVariant::IntToFp { signed: true } => 0,
        FpConvertVariant::IntToFp { signed: false } => 1,
        FpConvertVariant::FpToInt { signed: true } => 2,
        FpConvertVariant::FpToInt { signed: false } => 3,
        FpConvertVariant::Precision => 4,
    }
}

fn encode_move_variant(variant: FpMoveVariant) -> u64 {
    match variant {
        FpMoveVariant::FpToFp => 0,
        FpMoveVariant::GprToFp => 1,
        FpMoveVariant::FpToGpr => 2,
    }
}

pub fn translate_fp_data_processing(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::FpDataProcessing { op, size64, rd, rn, rm } = *class {
        emit_helper_call(
            buf,
            helper_fp_arith as usize,
            &[encode_fp_op(op), size64 as u64, rd as u64, rn as u64, rm as u64],
        );
    }
}

pub fn translate_fp_compare(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::FpCompare { size64, rn, rm } = *class {
        emit_helper_call(buf, helper_fp_compare as usize, &[size64 as u64, rn as u64, rm as u64]);
    }
}

pub fn translate_fp_move(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::FpMove { variant, size64, rd, rn } = *class {
        emit_helper_call(
            buf,
            helper_fp_move as usize,
            &[encode_move_variant(variant), size64 as u64, rd as u64, rn as u64],
        );
    }
}

pub fn translate_fp_convert(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::FpConvert { variant, size64, rd, rn } = *class {
        emit_helper_call(
            buf,
            helper_fp_convert as usize,
            &[encode_convert_variant(variant), size64 as u64, rd as u64, rn as u64],
        );
    }
}

pub fn translate_simd_arith(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::SimdArith { op, lane_bits, elements, rd, rn, rm } = *class {
        let packed_shape = (encode_fp_op(op) << 16) | ((lane_bits as u64) << 8) | elements as u64;
        let packed_regs = ((rd as u64) << 16) | ((rn as u64) << 8) | rm as u64;
        emit_helper_call(buf, helper_simd_arith as usize, &[packed_shape, packed_regs]);
    }
}

/// Straight scalar SIMD/FP load or store, emitted directly rather than
/// through a helper call: the access itself is an ordinary host load/store
/// at `vreg_offset`, identical in shape to `memory::translate_load_store`.
pub fn translate_simd_load_store(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::SimdLoadStore { op, byte_width, rt, rn, mode } = *class {
        materialize_address(buf, rn, mode);
        effective_to_host(buf, ADDR, HOST);

        match op {
            MemOp::Store => {
                match byte_width {
                    1 => emit_load_zx(buf, OPC_MOVZBL, VALUE, STATE_REG, vreg_offset(rt)),
                    2 => emit_load_zx(buf, OPC_MOVZWL, VALUE, STATE_REG, vreg_offset(rt)),
                    4 => emit_load(buf, false, VALUE, STATE_REG, vreg_offset(rt)),
                    8 => emit_load(buf, true, VALUE, STATE_REG, vreg_offset(rt)),
                    _ => unreachable!("byte_width is always 1/2/4/8"),
                }
                match byte_width {
                    1 => emit_store_byte(buf, VALUE, ADDR, 0),
                    2 => emit_store_half(buf, VALUE, ADDR, 0),
                    4 => emit_store(buf, false, VALUE, ADDR, 0),
                    8 => emit_store(buf, true, VALUE, ADDR, 0),
                    _ => unreachable!("byte_width is always 1/2/4/8"),
                }
            }
            MemOp::Load => {
                // A scalar FP/SIMD load zeroes the rest of the destination
                // register, not just the bytes the access itself covers.
                emit_mov_ri(buf, true, VALUE, 0);
                emit_store(buf, true, VALUE, STATE_REG, vreg_offset(rt));
                emit_store(buf, true, VALUE, STATE_REG, vreg_hi_offset(rt));
                match byte_width {
                    1 => emit_load_zx(buf, OPC_MOVZBL, VALUE, ADDR, 0),
                    2 => emit_load_zx(buf, OPC_MOVZWL, VALUE, ADDR, 0),
                    4 => emit_load(buf, false, VALUE, ADDR, 0),
                    8 => emit_load(buf, true, VALUE, ADDR, 0),
                    _ => unreachable!("byte_width is always 1/2/4/8"),
                }
                emit_store(buf, true, VALUE, STATE_REG, vreg_offset(rt));
            }
            MemOp::LoadSigned32 | MemOp::LoadSigned64 => {
                unreachable!("decode never produces a signed SimdLoadStore")
            }
        }
        apply_post_index(buf, rn, mode);
    }
}

// -- Helpers: the Rust-side interpreters the emitted calls above reach. --

extern "C" fn helper_fp_arith(state: *mut ThreadState, op: u64, size64: u64, rd: u64, rn: u64, rm: u64) {
    let ts = unsafe { &mut *state };
    let (rd, rn, rm) = (rd as usize, rn as usize, rm as usize);
    if size64 != 0 {
        let a = f64::from_bits(ts.vreg[rn][0]);
        let b = f64::from_bits(ts.vreg[rm][0]);
        let r = apply_fp_op(op, a, b);
        ts.vreg[rd][0] = r.to_bits();
    } else {
        let a = f32::from_bits(ts.vreg[rn][0] as u32);
        let b = f32::from_bits(ts.vreg[rm][0] as u32);
        let r = apply_fp_op(op, a, b);
        ts.vreg[rd][0] = r.to_bits() as u64;
    }
    ts.vreg[rd][1] = 0;
}

fn apply_fp_op<T: std::ops::Add<Output = T> + std::ops::Sub<Output = T> + std::ops::Mul<Output = T> + std::ops::Div<Output = T>>(
    op: u64,
    a: T,
    b: T,
) -> T {
    match op {
        0 => a + b,
        1 => a - b,
        2 => a * b,
        3 => a / b,
        _ => unreachable!("encode_fp_op only ever produces 0..=3"),
    }
}

extern "C" fn helper_fp_compare(state: *mut ThreadState, size64: u64, rn: u64, rm: u64) {
    let ts = unsafe { &mut *state };
    let (rn, rm) = (rn as usize, rm as usize);
    let ordering = if size64 != 0 {
        let a = f64::from_bits(ts.vreg[rn][0]);
        let b = f64::from_bits(ts.vreg[rm][0]);
        a.partial_cmp(&b)
    } else {
        let a = f32::from_bits(ts.vreg[rn][0] as u32);
        let b = f32::from_bits(ts.vreg[rm][0] as u32);
        a.partial_cmp(&b)
    };

    match ordering {
        None => ts.set_nzcv(false, false, true, true), // unordered (NaN operand)
        Some(std::cmp::Ordering::Equal) => ts.set_nzcv(false, true, true, false),
        Some(std::cmp::Ordering::Less) => ts.set_nzcv(true, false, false, false),
        Some(std::cmp::Ordering::Greater) => ts.set_nzcv(false, false, true, false),
    }
}

extern "C" fn helper_fp_move(state: *mut ThreadState, variant: u64, size64: u64, rd: u64, rn: u64) {
    let ts = unsafe { &mut *state };
    let (rd, rn) = (rd as usize, rn as usize);
    match variant {
        0 => {
            // FMOV Vd, Vn: register-to-register, no conversion. The scalar
            // value lives in the low lane; the high lane stays cleared.
            ts.vreg[rd][0] = ts.vreg[rn][0];
            ts.vreg[rd][1] = 0;
        }
        1 => {
            // FMOV Vd, Xn/Wn: raw bit pattern, GPR -> FP register.
            let bits = ts.read_gpr_or_zero(rn as u8);
            ts.vreg[rd][0] = if size64 != 0 { bits } else { bits & 0xFFFF_FFFF };
            ts.vreg[rd][1] = 0;
        }
        2 => {
            // FMOV Xd/Wd, Vn: raw bit pattern, FP register -> GPR.
            let bits = ts.vreg[rn][0];
            let val = if size64 != 0 { bits } else { bits & 0xFFFF_FFFF };
            ts.write_gpr_or_discard(rd as u8, val);
        }
        _ => unreachable!("encode_move_variant only ever produces 0..=2"),
    }
}

extern "C" fn helper_fp_convert(state: *mut ThreadState, variant: u64, size64: u64, rd: u64, rn: u64) {
    let ts = unsafe { &mut *state };
    let (rd, rn) = (rd as usize, rn as usize);
    match variant {
        0 => {
            // SCVTF: signed GPR -> single-precision float.
            let src = ts.read_gpr_or_zero(rn as u8);
            let val = if size64 != 0 { src as i64 as f32 } else { src as i32 as f32 };
            ts.vreg[rd][0] = val.to_bits() as u64;
            ts.vreg[rd][1] = 0;
        }
        1 => {
            // UCVTF: unsigned GPR -> single-precision float.
            let src = ts.read_gpr_or_zero(rn as u8);
            let val = if size64 != 0 { src as f32 } else { (src as u32) as f32 };
            ts.vreg[rd][0] = val.to_bits() as u64;
            ts.vreg[rd][1] = 0;
        }
        2 => {
            // FCVTZS: single-precision float -> signed GPR, round toward zero.
            let src = f32::from_bits(ts.vreg[rn][0] as u32);
            let val = if size64 != 0 { src as i64 as u64 } else { (src as i32 as u32) as u64 };
            ts.write_gpr_or_discard(rd as u8, val);
        }
        3 => {
            // FCVTZU: single-precision float -> unsigned GPR, round toward zero.
            let src = f32::from_bits(ts.vreg[rn][0] as u32);
            let val = if size64 != 0 { src as u64 } else { (src as u32) as u64 };
            ts.write_gpr_or_discard(rd as u8, val);
        }
        4 => {
            // Precision change: size64 names the source width here.
            if size64 != 0 {
                let src = f64::from_bits(ts.vreg[rn][0]);
                ts.vreg[rd][0] = (src as f32).to_bits() as u64;
            } else {
                let src = f32::from_bits(ts.vreg[rn][0] as u32);
                ts.vreg[rd][0] = (src as f64).to_bits();
            }
            ts.vreg[rd][1] = 0;
        }
        _ => unreachable!("encode_convert_variant only ever produces 0..=4"),
    }
}

extern "C" fn helper_simd_arith(state: *mut ThreadState, packed_shape: u64, packed_regs: u64) {
    let ts = unsafe { &mut *state };
    let op = (packed_shape >> 16) & 0xFF;
    let lane_bits = ((packed_shape >> 8) & 0xFF) as u32;
    let elements = (packed_shape & 0xFF) as usize;
    let rd = ((packed_regs >> 16) & 0xFF) as usize;
    let rn = ((packed_regs >> 8) & 0xFF) as usize;
    let rm = (packed_regs & 0xFF) as usize;

    let src_n = vreg_to_bytes(ts.vreg[rn]);
    let src_m = vreg_to_bytes(ts.vreg[rm]);
    let mut out = [0u8; 16];
    let lane_bytes = (lane_bits / 8) as usize;

    for i in 0..elements {
        let off = i * lane_bytes;
        let a = read_lane(&src_n, off, lane_bytes);
        let b = read_lane(&src_m, off, lane_bytes);
        let r = match op {
            0 => a.wrapping_add(b),
            1 => a.wrapping_sub(b),
            2 => a.wrapping_mul(b),
            _ => unreachable!("SimdArith only ever carries Add/Sub/Mul"),
        };
        write_lane(&mut out, off, lane_bytes, r);
    }

    ts.vreg[rd] = vreg_from_bytes(out);
}

fn vreg_to_bytes(lanes: [u64; 2]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[0..8].copy_from_slice(&lanes[0].to_le_bytes());
    out[8..16].copy_from_slice(&lanes[1].to_le_bytes());
    out
}

fn vreg_from_bytes(bytes: [u8; 16]) -> [u64; 2] {
    [
        u64::from_le_bytes(bytes[0..8].try_into().unwrap()),
        u64::from_le_bytes(bytes[8..16].try_into().unwrap()),
    ]
}

fn read_lane(bytes: &[u8; 16], off: usize, width: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(&bytes[off..off + width]);
    u64::from_le_bytes(buf)
}

fn write_lane(bytes: &mut [u8; 16], off: usize, width: usize, val: u64) {
    let le = val.to_le_bytes();
    bytes[off..off + width].copy_from_slice(&le[..width]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_state() -> ThreadState {
        ThreadState::new(std::ptr::null_mut())
    }

    #[test]
    fn fp_arith_adds_single_precision() {
        let mut ts = new_state();
        ts.vreg[1][0] = 1.5f32.to_bits() as u64;
        ts.vreg[2][0] = 2.5f32.to_bits() as u64;
        helper_fp_arith(&mut ts, encode_fp_op(FpOp::Add), 0, 0, 1, 2);
        assert_eq!(f32::from_bits(ts.vreg[0][0] as u32), 4.0);
        assert_eq!(ts.vreg[0][1], 0);
    }

    #[test]
    fn fp_arith_divides_double_precision() {
        let mut ts = new_state();
        ts.vreg[1][0] = 9.0f64.to_bits();
        ts.vreg[2][0] = 2.0f64.to_bits();
        helper_fp_arith(&mut ts, encode_fp_op(FpOp::Div), 1, 0, 1, 2);
        assert_eq!(f64::from_bits(ts.vreg[0][0]), 4.5);
    }

    #[test]
    fn fp_compare_sets_equal_flags() {
        let mut ts = new_state();
        ts.vreg[0][0] = 3.0f32.to_bits() as u64;
        ts.vreg[1][0] = 3.0f32.to_bits() as u64;
        helper_fp_compare(&mut ts, 0, 0, 1);
        assert!(ts.flag_z());
        assert!(ts.flag_c());
        assert!(!ts.flag_n());
        assert!(!ts.flag_v());
    }

    #[test]
    fn fp_compare_sets_unordered_flags_on_nan() {
        let mut ts = new_state();
        ts.vreg[0][0] = f32::NAN.to_bits() as u64;
        ts.vreg[1][0] = 1.0f32.to_bits() as u64;
        helper_fp_compare(&mut ts, 0, 0, 1);
        assert!(ts.flag_c());
        assert!(ts.flag_v());
        assert!(!ts.flag_z());
        assert!(!ts.flag_n());
    }

    #[test]
    fn fp_move_raw_bits_round_trip_through_gpr() {
        let mut ts = new_state();
        ts.gpr[0] = 0x3F80_0000; // 1.0f32 raw bits
        helper_fp_move(&mut ts, encode_move_variant(FpMoveVariant::GprToFp), 0, 1, 0);
        assert_eq!(f32::from_bits(ts.vreg[1][0] as u32), 1.0);

        helper_fp_move(&mut ts, encode_move_variant(FpMoveVariant::FpToGpr), 0, 2, 1);
        assert_eq!(ts.gpr[2], 0x3F80_0000);
    }

    #[test]
    fn fp_convert_scvtf_and_fcvtzs_round_trip() {
        let mut ts = new_state();
        ts.gpr[0] = (-7i64) as u64;
        helper_fp_convert(&mut ts, encode_convert_variant(FpConvertVariant::IntToFp { signed: true }), 1, 1, 0);
        assert_eq!(f32::from_bits(ts.vreg[1][0] as u32), -7.0);

        helper_fp_convert(&mut ts, encode_convert_variant(FpConvertVariant::FpToInt { signed: true }), 1, 2, 1);
        assert_eq!(ts.gpr[2] as i64, -7);
    }

    #[test]
    fn fp_convert_precision_widens_and_narrows() {
        let mut ts = new_state();
        ts.vreg[0][0] = 1.25f32.to_bits() as u64;
        helper_fp_convert(&mut ts, encode_convert_variant(FpConvertVariant::Precision), 0, 1, 0);
        assert_eq!(f64::from_bits(ts.vreg[1][0]), 1.25);

        helper_fp_convert(&mut ts, encode_convert_variant(FpConvertVariant::Precision), 1, 2, 1);
        assert_eq!(f32::from_bits(ts.vreg[2][0] as u32), 1.25);
    }

    #[test]
    fn simd_arith_adds_four_lanes_of_32_bits() {
        let mut ts = new_state();
        ts.vreg[1] = vreg_from_bytes([1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0, 0]);
        ts.vreg[2] = vreg_from_bytes([10, 0, 0, 0, 20, 0, 0, 0, 30, 0, 0, 0, 40, 0, 0, 0]);
        let packed_shape = (encode_fp_op(FpOp::Add) << 16) | (32u64 << 8) | 4;
        let packed_regs = (0u64 << 16) | (1u64 << 8) | 2;
        helper_simd_arith(&mut ts, packed_shape, packed_regs);
        let out = vreg_to_bytes(ts.vreg[0]);
        assert_eq!(read_lane(&out, 0, 4), 11);
        assert_eq!(read_lane(&out, 4, 4), 22);
        assert_eq!(read_lane(&out, 8, 4), 33);
        assert_eq!(read_lane(&out, 12, 4), 44);
    }

    #[test]
    fn simd_arith_wraps_on_overflow_at_lane_width() {
        let mut ts = new_state();
        ts.vreg[1] = vreg_from_bytes([0xFF, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        ts.vreg[2] = vreg_from_bytes([1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let packed_shape = (encode_fp_op(FpOp::Add) << 16) | (8u64 << 8) | 16;
        let packed_regs = (0u64 << 16) | (1u64 << 8) | 2;
        helper_simd_arith(&mut ts, packed_shape, packed_regs);
        let out = vreg_to_bytes(ts.vreg[0]);
        assert_eq!(out[0], 0);
    }
}
