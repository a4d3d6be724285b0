use std::cell::Cell;
use std::io;
use std::rc::Rc;

use jitaarch64_exec::AddressSpace;

/// Guest address space size: 1 GiB, reserved up front with `PROT_NONE` and
/// carved up on demand by `mmap_fixed`.
const GUEST_SPACE_SIZE: usize = 1 << 30;

pub const GUEST_STACK_TOP: u64 = 0x3FFF_0000;
pub const GUEST_STACK_SIZE: usize = 8 * 1024 * 1024;

/// `AddressSpace` reference implementation over one anonymous mmap
/// reservation. `Clone` is cheap (a raw pointer, a length, and a shared
/// `brk` cursor) so the same guest memory can be reached both from the
/// dispatch loop's instruction fetch and from a `SyscallHandler` that needs
/// to grow the heap, without the two ever needing `&mut` at the same time.
#[derive(Clone)]
pub struct LinuxAddrSpace {
    base: *mut u8,
    size: usize,
    brk: Rc<Cell<u64>>,
}

// SAFETY: the reservation is exclusively owned by this process; every
// mutation goes through mmap/mprotect syscalls or the Cell, neither of
// which requires an exclusive Rust borrow.
unsafe impl Send for LinuxAddrSpace {}

impl LinuxAddrSpace {
    /// Reserve a 1 GiB guest address space.
    pub fn new() -> io::Result<Self> {
        // SAFETY: PROT_NONE reservation, no file backing.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                GUEST_SPACE_SIZE,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { base: ptr as *mut u8, size: GUEST_SPACE_SIZE, brk: Rc::new(Cell::new(0)) })
    }

    #[inline]
    pub fn g2h(&self, guest_addr: u64) -> *mut u8 {
        assert!((guest_addr as usize) < self.size, "guest addr {guest_addr:#x} out of range");
        unsafe { self.base.add(guest_addr as usize) }
    }

    #[inline]
    pub fn h2g(&self, host_ptr: *const u8) -> u64 {
        let off = host_ptr as usize - self.base as usize;
        assert!(off < self.size, "host pointer not in guest space");
        off as u64
    }

    /// Base pointer for `ThreadState.guest_base`.
    #[inline]
    pub fn guest_base(&self) -> *mut u8 {
        self.base
    }

    #[inline]
    pub fn brk(&self) -> u64 {
        self.brk.get()
    }

    #[inline]
    pub fn set_brk(&self, brk: u64) {
        self.brk.set(brk);
    }

    /// Write bytes at a guest address.
    ///
    /// # Safety
    /// The guest region must already be mapped writable.
    pub unsafe fn write_bytes(&self, guest_addr: u64, data: &[u8]) {
        let dst = self.g2h(guest_addr);
        std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
    }
}

impl AddressSpace for LinuxAddrSpace {
    fn translate_addr(&self, guest_addr: u64) -> Option<*mut u8> {
        if (guest_addr as usize) < self.size {
            Some(unsafe { self.base.add(guest_addr as usize) })
        } else {
            None
        }
    }

    fn map_guest(&self, guest_addr: u64, length: usize, protection: i32) -> Option<*mut u8> {
        let host = self.g2h(guest_addr);
        // SAFETY: within our reserved region.
        let ret = unsafe {
            libc::mmap(
                host as *mut libc::c_void,
                length,
                protection,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_FIXED,
                -1,
                0,
            )
        };
        if ret == libc::MAP_FAILED {
            None
        } else {
            Some(ret as *mut u8)
        }
    }

    fn unmap_guest(&self, guest_addr: u64, length: usize) {
        let host = self.g2h(guest_addr);
        // SAFETY: within our reserved region; re-reserved PROT_NONE rather
        // than actually munmap'd so the address stays within our range for
        // future mmap_fixed calls.
        unsafe {
            libc::mmap(
                host as *mut libc::c_void,
                length,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_FIXED,
                -1,
                0,
            );
        }
    }

    fn protect_guest(&self, guest_addr: u64, length: usize, protection: i32) -> bool {
        let host = self.g2h(guest_addr);
        let ret = unsafe { libc::mprotect(host as *mut libc::c_void, length, protection) };
        ret == 0
    }
}

impl Drop for LinuxAddrSpace {
    fn drop(&mut self) {
        // Only the last clone (the one holding the final strong reference
        // to `brk`) actually owns the mapping; earlier clones sharing the
        // same `base` would otherwise double-unmap it.
        if Rc::strong_count(&self.brk) == 1 && !self.base.is_null() {
            unsafe {
                libc::munmap(self.base as *mut libc::c_void, self.size);
            }
        }
    }
}

pub fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        4096
    } else {
        size as usize
    }
}

pub fn page_align_up(addr: u64) -> u64 {
    let ps = page_size() as u64;
    (addr + ps - 1) & !(ps - 1)
}

pub fn page_align_down(addr: u64) -> u64 {
    let ps = page_size() as u64;
    addr & !(ps - 1)
}
