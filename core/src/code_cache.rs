use std::io;
use std::ptr;

use crate::code_buffer::CodeBuffer;
use crate::error::JitError;

/// Contiguous region of OS memory holding translated host code.
///
/// Bump-allocated: blocks are appended one after another and never
/// individually reclaimed. Pages are read+write while code is being
/// written into them and re-marked read+execute once a block commits,
/// following W^X discipline.
pub struct CodeCache {
    base: *mut u8,
    capacity: usize,
    offset: usize,
    page_size: usize,
}

// SAFETY: CodeCache owns its mmap'd region exclusively; the single-writer
// model (see concurrency docs) means no two threads ever mutate it at once.
unsafe impl Send for CodeCache {}

impl CodeCache {
    pub fn new(capacity: usize) -> Result<Self, JitError> {
        let page_size = page_size();
        let capacity = round_up(capacity, page_size);

        // SAFETY: anonymous, private mapping; no file backing.
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                capacity,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(JitError::OutOfMemory(io::Error::last_os_error()));
        }

        Ok(Self {
            base: ptr as *mut u8,
            capacity,
            offset: 0,
            page_size,
        })
    }

    #[inline]
    pub fn base_ptr(&self) -> *const u8 {
        self.base as *const u8
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.offset
    }

    /// Reserve a [`CodeBuffer`] view over the remaining capacity, starting
    /// at the current bump offset. The buffer does not advance the cache's
    /// offset until [`CodeCache::commit`] is called with it.
    pub fn begin_block(&mut self) -> Result<CodeBuffer, JitError> {
        if self.remaining() == 0 {
            return Err(JitError::CacheFull {
                requested: 1,
                remaining: 0,
            });
        }
        // SAFETY: offset <= capacity is an invariant of this type; the
        // resulting pointer and length stay within the mmap'd region.
        let ptr = unsafe { self.base.add(self.offset) };
        Ok(CodeBuffer::new(ptr, self.remaining()))
    }

    /// Commit a successfully-filled buffer: mark its pages executable and
    /// advance the bump offset by its length. The caller must not call this
    /// with a buffer whose overflow flag is set (inspect it first).
    pub fn commit(&mut self, buf: &CodeBuffer) -> Result<usize, JitError> {
        debug_assert!(!buf.overflowed());
        let host_offset = self.offset;
        let len = buf.bytes_written();

        let region_start = round_down(host_offset, self.page_size);
        let region_end = round_up(host_offset + len, self.page_size);
        self.set_protection(region_start, region_end - region_start, libc::PROT_READ | libc::PROT_EXEC)?;

        // Advance to the next page boundary, not just past the block's own
        // bytes: the page we just marked executable must not also contain
        // the start of a future, not-yet-written block (see spec design
        // notes on executable memory protection, option (a) — wasted space
        // at page boundaries is the price of a single allocator here).
        self.offset = region_end;
        Ok(host_offset)
    }

    /// Abandon an in-progress buffer: the cache offset is untouched because
    /// [`CodeCache::begin_block`] never advanced it, so this is a no-op
    /// kept for symmetry with the commit path and for documentation.
    pub fn abandon(&mut self, _buf: &CodeBuffer) {}

    /// Temporarily reopen a committed region for writing, run `patch`
    /// against it, then restore the executable mapping. Used by block
    /// chaining to rewrite a previously-committed `goto_tb` jump target
    /// (spec design notes: executable memory protection, option (a)).
    pub fn patch_region<F: FnOnce(&mut [u8])>(
        &mut self,
        offset: usize,
        len: usize,
        patch: F,
    ) -> Result<(), JitError> {
        let region_start = round_down(offset, self.page_size);
        let region_end = round_up(offset + len, self.page_size);
        let region_len = region_end - region_start;

        self.set_protection(region_start, region_len, libc::PROT_READ | libc::PROT_WRITE)?;
        // SAFETY: region was just mapped RW and lies within the mmap'd capacity.
        let slice = unsafe {
            std::slice::from_raw_parts_mut(self.base.add(offset), len)
        };
        patch(slice);
        self.set_protection(region_start, region_len, libc::PROT_READ | libc::PROT_EXEC)?;
        Ok(())
    }

    fn set_protection(&self, start: usize, len: usize, prot: i32) -> Result<(), JitError> {
        // SAFETY: start/len are rounded to page boundaries within capacity.
        let ret = unsafe {
            libc::mprotect(self.base.add(start) as *mut libc::c_void, len, prot)
        };
        if ret != 0 {
            Err(JitError::Fault(io::Error::last_os_error()))
        } else {
            Ok(())
        }
    }

    /// Reset the bump offset to zero without releasing pages. Callers must
    /// have already flushed any descriptors pointing into this cache.
    pub fn reset(&mut self) -> Result<(), JitError> {
        self.offset = 0;
        self.set_protection(0, self.capacity, libc::PROT_READ | libc::PROT_WRITE)
    }

    pub fn ptr_at(&self, offset: usize) -> *const u8 {
        assert!(offset <= self.capacity);
        // SAFETY: bounded by the assert above.
        unsafe { self.base.add(offset) }
    }
}

impl Drop for CodeCache {
    fn drop(&mut self) {
        if !self.base.is_null() {
            // SAFETY: base/capacity came from the matching mmap call.
            unsafe {
                libc::munmap(self.base as *mut libc::c_void, self.capacity);
            }
        }
    }
}

fn page_size() -> usize {
    // SAFETY: sysconf with a valid name is always safe.
    let sz = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if sz <= 0 {
        4096
    } else {
        sz as usize
    }
}

fn round_up(n: usize, align: usize) -> usize {
    (n + align - 1) & !(align - 1)
}

fn round_down(n: usize, align: usize) -> usize {
    n & !(align - 1)
}
