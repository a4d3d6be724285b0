//! Dispatch loop and translation-cache lifecycle for the ARM64-on-x86_64
//! dynamic binary translator.
//!
//! This crate owns nothing about decoding or code generation (see
//! `jitaarch64-decode`/`jitaarch64-backend`) and nothing about guest memory
//! mapping or syscalls (see the `AddressSpace`/`SyscallHandler` traits in
//! [`collab`], implemented by `jitaarch64-linux-user`). It is the glue that
//! turns "guest PC in, next guest PC out" into a running program: look up or
//! translate a block, run it, repeat.

pub mod collab;
pub mod context;

pub use collab::{AddressSpace, SyscallHandler};
pub use context::{DispatchStats, DispatchStatus, JitContext};
