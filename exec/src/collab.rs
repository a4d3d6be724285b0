//! Trait boundaries for the two external collaborators the dispatch loop
//! needs but does not implement itself: guest memory mapping and syscalls.
//!
//! Neither trait is implemented in this crate — see `jitaarch64-linux-user`
//! for the reference implementations used by the demo binary.

use jitaarch64_core::ThreadState;

/// Guest-address-space veneer: guest↔host address translation plus the
/// map/unmap/protect primitives the syscall handler needs to implement
/// brk/mmap/mprotect. Also used by the block translator's instruction
/// fetch path.
pub trait AddressSpace {
    /// Translate a guest address to a host pointer, or `None` if the
    /// address is outside any mapped region.
    fn translate_addr(&self, guest_addr: u64) -> Option<*mut u8>;

    /// Map `length` bytes of guest address space starting at `guest_addr`
    /// with the given `protection` (a `libc::PROT_*` mask), returning the
    /// host pointer backing it. Takes `&self`, not `&mut self`: the
    /// underlying `mmap`/`mprotect` calls need no exclusive Rust borrow,
    /// only OS-level synchronization this single-writer core never needs.
    fn map_guest(&self, guest_addr: u64, length: usize, protection: i32) -> Option<*mut u8>;

    fn unmap_guest(&self, guest_addr: u64, length: usize);

    fn protect_guest(&self, guest_addr: u64, length: usize, protection: i32) -> bool;

    /// Fetch one 4-byte guest instruction word at `pc`. Instruction fetch
    /// is always aligned and always readable once a guest program starts
    /// executing, so this panics rather than returning `Option` — an
    /// unmapped fetch address means the embedder built a broken image.
    fn fetch_u32(&self, pc: u64) -> u32 {
        let ptr = self
            .translate_addr(pc)
            .unwrap_or_else(|| panic!("instruction fetch at unmapped guest pc {pc:#x}"));
        // SAFETY: translate_addr only returns pointers into mapped, readable guest memory.
        unsafe { (ptr as *const u32).read_unaligned() }
    }
}

/// Syscall veneer: marshals the fixed ARM64 Linux syscall ABI (number in
/// X8, arguments in X0-X5, result in X0) into host OS calls.
pub trait SyscallHandler {
    /// Reads the syscall number and arguments from `state`, performs the
    /// call, and writes the result back into `state`. Returns the guest PC
    /// execution should resume at (ordinarily `state.pc`, already advanced
    /// past the SVC by the block translator).
    fn dispatch_syscall(&mut self, state: &mut ThreadState) -> u64;
}
