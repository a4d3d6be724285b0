//! LoadStore and LoadStorePair translators.
//!
//! Every effective address is computed in a scratch register and resolved
//! to a host pointer with [`effective_to_host`] before it is dereferenced —
//! the sanctioned (and only) guest-to-host address translation path, backed
//! by the flat `guest_base`-relative mapping an `AddressSpace` collaborator
//! establishes at block-translation time.

use jitaarch64_core::CodeBuffer;
use jitaarch64_decode::{AddrMode, ExtendKind, InstructionClass, MemOp};

use crate::translate::common::{
    effective_to_host, load_gpr, load_gpr_or_sp, store_gpr, store_gpr_or_sp,
};
use crate::x86_64::emitter::*;
use crate::x86_64::regs::Reg;

const ADDR: Reg = Reg::Rax;
const HOST: Reg = Reg::Rcx;
const VALUE: Reg = Reg::Rdx;
const VALUE2: Reg = Reg::R8;

/// Compute the effective guest address for `mode` into `ADDR`, writing any
/// pre/post-index base-register update back to `rn` as the mode requires.
/// Every immediate in `mode` is already a final byte offset — the decoder
/// applies the access-size scale factor before building `AddrMode`.
pub(crate) fn materialize_address(buf: &mut CodeBuffer, rn: u8, mode: AddrMode) {
    load_gpr_or_sp(buf, ADDR, rn);
    match mode {
        AddrMode::UnsignedOffset(imm) => {
            if imm != 0 {
                emit_arith_ri(buf, ArithOp::Add, true, ADDR, imm as i32);
            }
        }
        AddrMode::Unscaled(simm) => {
            if simm != 0 {
                emit_arith_ri(buf, ArithOp::Add, true, ADDR, simm);
            }
        }
        AddrMode::PreIndex(simm) => {
            if simm != 0 {
                emit_arith_ri(buf, ArithOp::Add, true, ADDR, simm);
            }
            store_gpr_or_sp(buf, rn, ADDR);
        }
        AddrMode::PostIndex(_) => {
            // Access happens at the address loaded above; the write-back
            // below adds the index afterward.
        }
        AddrMode::RegisterOffset { rm, extend, amount } => {
            load_gpr(buf, HOST, rm);
            match extend {
                ExtendKind::Uxtw => emit_mov_rr(buf, false, HOST, HOST),
                ExtendKind::Sxtw => emit_movsx(buf, OPC_MOVSLQ, HOST, HOST),
                ExtendKind::Uxtx | ExtendKind::Sxtx => {}
                _ => {}
            }
            if amount > 0 {
                emit_shift_ri(buf, ShiftOp::Shl, true, HOST, amount);
            }
            emit_arith_rr(buf, ArithOp::Add, true, ADDR, HOST);
        }
    }
}

/// Apply a post-index write-back of `simm` to `rn`, if `mode` calls for one.
pub(crate) fn apply_post_index(buf: &mut CodeBuffer, rn: u8, mode: AddrMode) {
    if let AddrMode::PostIndex(simm) = mode {
        let updated = Reg::R9;
        load_gpr_or_sp(buf, updated, rn);
        if simm != 0 {
            emit_arith_ri(buf, ArithOp::Add, true, updated, simm);
        }
        store_gpr_or_sp(buf, rn, updated);
    }
}

pub fn translate_load_store(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::LoadStore { op, size64, byte_width, rt, rn, mode } = *class {
        materialize_address(buf, rn, mode);
        effective_to_host(buf, ADDR, HOST);

        match op {
            MemOp::Load => {
                match byte_width {
                    1 => emit_load_zx(buf, OPC_MOVZBL, VALUE, ADDR, 0),
                    2 => emit_load_zx(buf, OPC_MOVZWL, VALUE, ADDR, 0),
                    4 => emit_load(buf, false, VALUE, ADDR, 0),
                    8 => emit_load(buf, true, VALUE, ADDR, 0),
                    _ => unreachable!("byte_width is always 1/2/4/8"),
                }
                store_gpr(buf, rt, VALUE);
            }
            MemOp::LoadSigned32 => {
                // 32-bit destination (LDRSB/LDRSH Wt) or LDRSW Xt; byte_width
                // tells which. The 32-bit forms zero the upper half on x86,
                // matching the W-register's architectural zero-extend.
                match byte_width {
                    1 => emit_load_sx(buf, OPC_MOVSBL, VALUE, ADDR, 0),
                    2 => emit_load_sx(buf, OPC_MOVSWL, VALUE, ADDR, 0),
                    4 => emit_load_sx(buf, OPC_MOVSLQ, VALUE, ADDR, 0),
                    _ => unreachable!("LoadSigned32 only applies to byte/half/word widths"),
                }
                store_gpr(buf, rt, VALUE);
            }
            MemOp::LoadSigned64 => {
                // LDRSB/LDRSH 64-bit destination; byte_width carries which.
                // These need the REX.W-qualified opcodes: the plain
                // MOVSBL/MOVSWL forms only sign-extend into a 32-bit
                // destination and zero bits 32-63 instead.
                match byte_width {
                    1 => emit_load_sx(buf, OPC_MOVSBQ, VALUE, ADDR, 0),
                    2 => emit_load_sx(buf, OPC_MOVSWQ, VALUE, ADDR, 0),
                    _ => unreachable!("LoadSigned64 only applies to byte/half widths"),
                }
                store_gpr(buf, rt, VALUE);
            }
            MemOp::Store => {
                load_gpr(buf, VALUE, rt);
                match byte_width {
                    1 => emit_store_byte(buf, VALUE, ADDR, 0),
                    2 => emit_store_half(buf, VALUE, ADDR, 0),
                    4 => emit_store(buf, false, VALUE, ADDR, 0),
                    8 => emit_store(buf, true, VALUE, ADDR, 0),
                    _ => unreachable!("byte_width is always 1/2/4/8"),
                }
            }
        }
        let _ = size64;
        apply_post_index(buf, rn, mode);
    }
}

pub fn translate_load_store_pair(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::LoadStorePair { is_load, size64, rt, rt2, rn, mode } = *class {
        let word_bytes: u32 = if size64 { 8 } else { 4 };
        materialize_address(buf, rn, mode);
        effective_to_host(buf, ADDR, HOST);

        if is_load {
            emit_load(buf, size64, VALUE, ADDR, 0);
            emit_load(buf, size64, VALUE2, ADDR, word_bytes as i32);
            store_gpr(buf, rt, VALUE);
            store_gpr(buf, rt2, VALUE2);
        } else {
            load_gpr(buf, VALUE, rt);
            load_gpr(buf, VALUE2, rt2);
            emit_store(buf, size64, VALUE, ADDR, 0);
            emit_store(buf, size64, VALUE2, ADDR, word_bytes as i32);
        }
        apply_post_index(buf, rn, mode);
    }
}
