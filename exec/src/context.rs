//! `JitContext`: owns the code cache, translation cache, and block-descriptor
//! arena, and drives translation and dispatch.
//!
//! Grounded on the teacher's `ExecEnv` constructor shape (pre-allocate the
//! code cache, emit the prologue/epilogue trampoline once, build the lookup
//! tables) and `cpu_exec_loop`/`tb_find`/`tb_gen_code`/`cpu_tb_exec` for
//! control flow, but de-atomicized: single writer, plain owned fields, no
//! `Arc`/`Mutex`/`UnsafeCell` anywhere in this crate.

use jitaarch64_backend::{translate_block as backend_translate_block, InstructionFetch, X86_64CodeGen};
use jitaarch64_core::tb::flags;
use jitaarch64_core::{
    CodeCache, JitConfig, JitError, JitResult, JumpCache, ThreadState, TranslationBlock,
    TranslationCache, TranslationCacheStats, STOP_SENTINEL,
};

use crate::collab::{AddressSpace, SyscallHandler};

/// How a call to [`JitContext::dispatch`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// The loop ran until a caller-arranged stop (see spec design notes on
    /// cancellation): some block returned the stop sentinel without a trap
    /// having fired.
    Stop,
    /// A guest BRK/HLT/undefined instruction fired; the guest PC it fired
    /// at is carried alongside.
    Trap(u64),
    /// A fatal, non-recoverable error (cache exhaustion, OS protection
    /// failure). The caller must reset or tear down the context.
    Fatal,
}

/// Running counters mirroring the teacher's `ExecStats`, trimmed to what a
/// single-writer, non-chaining-yet dispatch loop can actually produce.
#[derive(Debug, Default, Clone, Copy)]
pub struct DispatchStats {
    pub loop_iters: u64,
    pub translations: u64,
    pub jump_cache_hits: u64,
    pub translation_cache_hits: u64,
    pub chain_patched: u64,
}

impl std::fmt::Display for DispatchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "iters={} translations={} jc_hit={} tc_hit={} chained={}",
            self.loop_iters, self.translations, self.jump_cache_hits, self.translation_cache_hits, self.chain_patched
        )
    }
}

/// Owns every piece of mutable JIT state for one guest thread: the
/// executable-memory bump allocator, the guest-pc → host-code lookup
/// tables, and the block-descriptor arena chaining links point into.
pub struct JitContext {
    code_cache: CodeCache,
    codegen: X86_64CodeGen,
    entry_offset: usize,
    translation_cache: TranslationCache,
    jump_cache: JumpCache,
    blocks: Vec<TranslationBlock>,
    config: JitConfig,
    stats: DispatchStats,
}

/// Bridges an embedder's [`AddressSpace`] into the backend's narrower
/// [`InstructionFetch`] contract, which the block translator is the only
/// thing that needs.
struct AddrSpaceFetch<'a, A: AddressSpace>(&'a A);

impl<'a, A: AddressSpace> InstructionFetch for AddrSpaceFetch<'a, A> {
    fn fetch(&self, pc: u64) -> u32 {
        self.0.fetch_u32(pc)
    }
}

impl JitContext {
    /// `jit_init`: allocate the code cache (0 means the reference 16 MiB
    /// default, substituted by [`JitConfig::new`]) and the translation
    /// table, then emit the fixed prologue/epilogue trampoline once.
    pub fn jit_init(config: JitConfig) -> JitResult<Self> {
        config.validate()?;

        let mut code_cache = CodeCache::new(config.code_cache_bytes)?;
        let mut codegen = X86_64CodeGen::new();

        let mut buf = code_cache.begin_block()?;
        codegen.emit_prologue(&mut buf);
        codegen.emit_epilogue(&mut buf);
        if buf.overflowed() {
            return Err(JitError::BufferOverflow);
        }
        let entry_offset = code_cache.commit(&buf)?;

        Ok(Self {
            code_cache,
            codegen,
            entry_offset,
            translation_cache: TranslationCache::new(config.translation_table_size),
            jump_cache: JumpCache::new(),
            blocks: Vec::new(),
            config,
            stats: DispatchStats::default(),
        })
    }

    /// `jit_reset`: flush every lookup table and rewind the code cache,
    /// then re-emit the trampoline (the one piece of code every dispatch
    /// depends on). Keeps the original allocations.
    pub fn jit_reset(&mut self) -> JitResult<()> {
        self.translation_cache.flush();
        self.jump_cache.invalidate_all();
        self.blocks.clear();
        self.stats = DispatchStats::default();
        self.code_cache.reset()?;

        let mut buf = self.code_cache.begin_block()?;
        self.codegen = X86_64CodeGen::new();
        self.codegen.emit_prologue(&mut buf);
        self.codegen.emit_epilogue(&mut buf);
        if buf.overflowed() {
            return Err(JitError::BufferOverflow);
        }
        self.entry_offset = self.code_cache.commit(&buf)?;
        Ok(())
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn translation_cache_stats(&self) -> TranslationCacheStats {
        self.translation_cache.stats()
    }

    /// Number of currently-resident translation-cache slots.
    pub fn resident_count(&self) -> usize {
        self.translation_cache.resident_count()
    }

    /// Current write offset into the code cache, in bytes.
    pub fn code_cache_offset(&self) -> usize {
        self.code_cache.offset()
    }

    /// `translation_lookup`: resolve a guest PC to an already-translated
    /// block's host entry pointer, consulting the jump cache before the
    /// translation table.
    pub fn translation_lookup(&mut self, guest_pc: u64) -> Option<*const u8> {
        if let Some(idx) = self.jump_cache.lookup(guest_pc) {
            if self.blocks[idx].is_valid() && self.blocks[idx].guest_pc == guest_pc {
                self.stats.jump_cache_hits += 1;
                return Some(self.blocks[idx].host_entry(self.code_cache.base_ptr()));
            }
        }
        if let Some(idx) = self.translation_cache.lookup(guest_pc) {
            self.jump_cache.insert(guest_pc, idx);
            self.stats.translation_cache_hits += 1;
            return Some(self.blocks[idx].host_entry(self.code_cache.base_ptr()));
        }
        None
    }

    /// `translation_insert`: record a freshly-translated block and make it
    /// reachable from both lookup tables. Returns its arena index.
    fn translation_insert(&mut self, tb: TranslationBlock) -> usize {
        let guest_pc = tb.guest_pc;
        let idx = self.blocks.len();
        self.blocks.push(tb);
        self.translation_cache.insert(guest_pc, idx);
        self.jump_cache.insert(guest_pc, idx);
        idx
    }

    /// `translation_invalidate`: remove a block from both lookup tables.
    /// The block descriptor itself and its host code remain in the arena
    /// and code cache (this core does not compact or reclaim); a stale
    /// descriptor simply becomes unreachable.
    pub fn translation_invalidate(&mut self, guest_pc: u64) -> bool {
        self.jump_cache.remove(guest_pc);
        if let Some(idx) = self.translation_cache.invalidate(guest_pc) {
            self.blocks[idx].flags &= !flags::VALID;
            self.unlink(idx);
            true
        } else {
            false
        }
    }

    /// Undo any `goto_tb` chaining touching `idx` in either direction,
    /// resetting the patched jump(s) back to their `tb_ret_offset` default
    /// so a stale successor's host code is never jumped into directly.
    fn unlink(&mut self, idx: usize) {
        if let Some(succ_idx) = self.blocks[idx].successor.take() {
            let succ_pc = self.blocks[succ_idx].guest_pc;
            self.reset_chained_jump(idx, succ_pc);
            self.blocks[idx].flags &= !flags::LINKED;
            if self.blocks[succ_idx].predecessor == Some(idx) {
                self.blocks[succ_idx].predecessor = None;
                self.blocks[succ_idx].flags &= !flags::LINKED;
            }
        }
        if let Some(pred_idx) = self.blocks[idx].predecessor.take() {
            let this_pc = self.blocks[idx].guest_pc;
            self.reset_chained_jump(pred_idx, this_pc);
            self.blocks[idx].flags &= !flags::LINKED;
            if self.blocks[pred_idx].successor == Some(idx) {
                self.blocks[pred_idx].successor = None;
                self.blocks[pred_idx].flags &= !flags::LINKED;
            }
        }
    }

    /// Rewrite `idx`'s exit slot targeting guest PC `target_pc` back to
    /// `tb_ret_offset`, the state it had before chaining patched it.
    fn reset_chained_jump(&mut self, idx: usize, target_pc: u64) {
        let Some(slot) = self.blocks[idx].exit_target.iter().position(|t| *t == Some(target_pc)) else {
            return;
        };
        let Some(jmp_offset) = self.blocks[idx].jmp_insn_offset[slot] else {
            return;
        };
        let codegen = &self.codegen;
        let tb_ret_offset = codegen.tb_ret_offset;
        let _ = self.code_cache.patch_region(jmp_offset, 5, |region| {
            codegen.patch_jump_region(region, jmp_offset, tb_ret_offset);
        });
    }

    /// `goto_tb` chaining: if the block just executed (`pred_idx`) exited
    /// toward `next_pc` through a static exit slot and a block at `next_pc`
    /// is already resident, rewrite that slot's patchable jump to land
    /// directly in the successor's host code instead of round-tripping
    /// through the epilogue and the dispatch loop's own lookup.
    fn try_chain(&mut self, pred_idx: usize, next_pc: u64) {
        if self.blocks[pred_idx].successor.is_some() {
            return;
        }
        let Some(succ_idx) = self.translation_cache.peek(next_pc) else {
            return;
        };
        let Some(slot) = self.blocks[pred_idx].exit_target.iter().position(|t| *t == Some(next_pc)) else {
            return;
        };
        let Some(jmp_offset) = self.blocks[pred_idx].jmp_insn_offset[slot] else {
            return;
        };
        let succ_host_offset = self.blocks[succ_idx].host_offset;
        let codegen = &self.codegen;
        let patched = self.code_cache.patch_region(jmp_offset, 5, |region| {
            codegen.patch_jump_region(region, jmp_offset, succ_host_offset);
        });
        if patched.is_err() {
            return;
        }

        self.blocks[pred_idx].successor = Some(succ_idx);
        self.blocks[pred_idx].flags |= flags::LINKED;
        self.blocks[succ_idx].predecessor = Some(pred_idx);
        self.blocks[succ_idx].flags |= flags::LINKED;
        self.stats.chain_patched += 1;
    }

    pub fn translation_flush(&mut self) {
        self.translation_cache.flush();
        self.jump_cache.invalidate_all();
    }

    /// `translate_block`: resolve `guest_pc` to host code, translating a
    /// fresh block on a lookup miss. Mirrors `tb_find`/`tb_gen_code`.
    pub fn translate_block<A: AddressSpace>(&mut self, guest_pc: u64, addr_space: &A) -> JitResult<*const u8> {
        if let Some(ptr) = self.translation_lookup(guest_pc) {
            return Ok(ptr);
        }

        let mut buf = self.code_cache.begin_block()?;
        let host_offset = self.code_cache.offset();
        let fetch = AddrSpaceFetch(addr_space);
        let (tb, _exit) = backend_translate_block(&mut buf, &self.codegen, host_offset, guest_pc, &fetch, &self.config);

        if buf.overflowed() {
            self.code_cache.abandon(&buf);
            return Err(JitError::BufferOverflow);
        }

        self.code_cache.commit(&buf)?;
        self.stats.translations += 1;
        let idx = self.translation_insert(tb);
        Ok(self.blocks[idx].host_entry(self.code_cache.base_ptr()))
    }

    /// Run one translated block through the fixed prologue/epilogue
    /// trampoline and return the next guest PC it reports.
    ///
    /// # Safety
    /// `state` must be a valid, fully-initialized `ThreadState` for the
    /// guest thread this context is translating; `tb_ptr` must point at a
    /// block previously produced by this same context's code cache.
    unsafe fn exec_one(&self, state: &mut ThreadState, tb_ptr: *const u8) -> u64 {
        let entry_ptr = self.code_cache.ptr_at(self.entry_offset);
        let trampoline: unsafe extern "C" fn(*mut u8, *const u8) -> u64 = std::mem::transmute(entry_ptr);
        trampoline(state as *mut ThreadState as *mut u8, tb_ptr)
    }

    /// `dispatch`: the main execution loop. Repeatedly looks up or
    /// translates a block at the current guest PC and runs it, handling
    /// SVC hand-off to `syscalls`, until a block reports the stop sentinel.
    ///
    /// # Safety
    /// `state` must be a valid `ThreadState` whose `guest_base`-relative
    /// layout matches what `addr_space` actually backs; generated code
    /// dereferences it directly.
    pub unsafe fn dispatch<A: AddressSpace, S: SyscallHandler>(
        &mut self,
        guest_pc: u64,
        state: &mut ThreadState,
        addr_space: &A,
        syscalls: &mut S,
    ) -> (u64, DispatchStatus) {
        let mut pc = guest_pc;

        loop {
            self.stats.loop_iters += 1;

            let tb_ptr = match self.translate_block(pc, addr_space) {
                Ok(ptr) => ptr,
                Err(_) => return (STOP_SENTINEL, DispatchStatus::Fatal),
            };

            let idx = self
                .translation_cache
                .peek(pc)
                .expect("translate_block just inserted this guest_pc");
            let tb_flags = self.blocks[idx].flags;
            // A trap block (BRK/HLT/Unsupported/Unknown) is the only kind
            // the block translator produces with no chain slot at all; a
            // normal terminator always sets at least jmp_insn_offset[0].
            let is_trap_block = self.blocks[idx].jmp_insn_offset == [None, None];
            self.blocks[idx].exec_count += 1;

            let next_pc = self.exec_one(state, tb_ptr);

            if tb_flags & flags::SYSCALL_ENDING != 0 {
                let resume_pc = syscalls.dispatch_syscall(state);
                if resume_pc == STOP_SENTINEL {
                    return (STOP_SENTINEL, DispatchStatus::Stop);
                }
                pc = resume_pc;
                continue;
            }

            if next_pc == STOP_SENTINEL {
                if is_trap_block {
                    return (STOP_SENTINEL, DispatchStatus::Trap(state.pc));
                }
                return (STOP_SENTINEL, DispatchStatus::Stop);
            }

            self.try_chain(idx, next_pc);
            pc = next_pc;
        }
    }
}
