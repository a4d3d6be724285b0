//! Linux-user reference collaborators for the ARM64-on-x86_64 dynamic
//! binary translator: a flat-mmap `AddressSpace` and a minimal
//! `SyscallHandler` covering enough of the generic Linux syscall ABI to run
//! a freestanding guest program to completion.

pub mod addr_space;
pub mod syscall;

pub use addr_space::LinuxAddrSpace;
pub use syscall::{LinuxSyscalls, SyscallOutcome};
