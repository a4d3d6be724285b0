//! SBFM/BFM/UBFM translator.
//!
//! Covers the two dominant shapes every bitfield encoding reduces to:
//! extraction (`imms >= immr`, the UBFX/SBFX/ASR/LSR aliases) and
//! zero/sign insertion (`imms < immr`, the UBFIZ/SBFIZ/LSL aliases).
//! `BFM` additionally merges into the untouched bits of the destination
//! instead of zero-filling them.

use jitaarch64_core::CodeBuffer;
use jitaarch64_decode::{BitfieldVariant, InstructionClass};

use crate::translate::common::{load_gpr, store_gpr};
use crate::x86_64::emitter::*;
use crate::x86_64::regs::Reg;

const SCRATCH: Reg = Reg::Rax;
const MERGE: Reg = Reg::Rcx;

pub fn translate_bitfield(buf: &mut CodeBuffer, class: &InstructionClass) {
    if let InstructionClass::Bitfield { variant, size64, rd, rn, immr, imms } = *class {
        let width_bits = if size64 { 64 } else { 32 };
        load_gpr(buf, SCRATCH, rn);
        if !size64 {
            zero_upper_32_bits(buf);
        }

        if imms >= immr {
            // Extraction: field width = imms - immr + 1, starting at bit immr.
            let field_width = imms - immr + 1;
            emit_shift_ri(buf, ShiftOp::Shr, true, SCRATCH, immr as u8);
            mask_low_bits(buf, field_width);
            if variant == BitfieldVariant::Sbfm && field_width < width_bits {
                sign_extend_from_bit(buf, field_width - 1, width_bits);
            }
        } else {
            // Insertion: field width = imms + 1, shifted up to bit
            // (width_bits - immr).
            let field_width = imms + 1;
            mask_low_bits(buf, field_width);
            let dest_lsb = width_bits - immr;
            emit_shift_ri(buf, ShiftOp::Shl, true, SCRATCH, dest_lsb as u8);
        }

        if variant == BitfieldVariant::Bfm {
            // Merge into the bits of Rd that this field doesn't touch.
            load_gpr(buf, MERGE, rd);
            let dest_mask = bitfield_dest_mask(variant, immr, imms, width_bits);
            emit_mov_ri(buf, true, Reg::Rdx, !dest_mask);
            emit_arith_rr(buf, ArithOp::And, true, MERGE, Reg::Rdx);
            emit_arith_rr(buf, ArithOp::Or, true, SCRATCH, MERGE);
        }

        store_gpr(buf, rd, SCRATCH);
    }
}

fn zero_upper_32_bits(buf: &mut CodeBuffer) {
    emit_mov_rr(buf, false, SCRATCH, SCRATCH);
}

fn mask_low_bits(buf: &mut CodeBuffer, width: u32) {
    if width >= 64 {
        return;
    }
    let mask = (1u64 << width) - 1;
    emit_mov_ri(buf, true, Reg::Rdx, mask);
    emit_arith_rr(buf, ArithOp::And, true, SCRATCH, Reg::Rdx);
}

fn sign_extend_from_bit(buf: &mut CodeBuffer, sign_bit: u32, width_bits: u32) {
    let shift = width_bits - 1 - sign_bit;
    emit_shift_ri(buf, ShiftOp::Shl, true, SCRATCH, shift as u8);
    emit_shift_ri(buf, ShiftOp::Sar, true, SCRATCH, shift as u8);
}

fn bitfield_dest_mask(_variant: BitfieldVariant, immr: u32, imms: u32, width_bits: u32) -> u64 {
    if imms >= immr {
        let field_width = imms - immr + 1;
        if field_width >= 64 {
            u64::MAX
        } else {
            (1u64 << field_width) - 1
        }
    } else {
        let field_width = imms + 1;
        let dest_lsb = width_bits - immr;
        let mask = if field_width >= 64 { u64::MAX } else { (1u64 << field_width) - 1 };
        mask << dest_lsb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dest_mask_extraction_is_low_aligned() {
        assert_eq!(bitfield_dest_mask(BitfieldVariant::Bfm, 0, 7, 32), 0xFF);
    }
}
