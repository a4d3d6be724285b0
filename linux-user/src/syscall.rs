//! Minimal ARM64 Linux syscall dispatch: enough of the generic syscall ABI
//! to run a freestanding guest program to completion (exit paths and a
//! growable brk heap) plus `write` for visible output.

use std::cell::Cell;

use jitaarch64_core::{ThreadState, STOP_SENTINEL};
use jitaarch64_exec::SyscallHandler;

use crate::addr_space::{page_align_up, LinuxAddrSpace};

const SYS_WRITE: u64 = 64;
const SYS_EXIT: u64 = 93;
const SYS_EXIT_GROUP: u64 = 94;
const SYS_BRK: u64 = 214;

const ENOSYS: u64 = (-38i64) as u64;

/// Status a syscall's effect on the dispatch loop reduces to: either guest
/// execution resumes normally, or the process is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallOutcome {
    Continue,
    Exit(i32),
}

/// Reference `SyscallHandler`: shares a [`LinuxAddrSpace`] with the fetch
/// path (for `brk`'s heap growth and for `write`'s buffer lookup) and
/// records the last outcome so `main.rs` can decide whether to keep
/// dispatching.
pub struct LinuxSyscalls {
    space: LinuxAddrSpace,
    last_outcome: Cell<SyscallOutcome>,
}

impl LinuxSyscalls {
    pub fn new(space: LinuxAddrSpace) -> Self {
        Self { space, last_outcome: Cell::new(SyscallOutcome::Continue) }
    }

    pub fn last_outcome(&self) -> SyscallOutcome {
        self.last_outcome.get()
    }
}

impl SyscallHandler for LinuxSyscalls {
    fn dispatch_syscall(&mut self, state: &mut ThreadState) -> u64 {
        let nr = state.gpr[8];
        let a0 = state.gpr[0];
        let a1 = state.gpr[1];
        let a2 = state.gpr[2];
        state.syscall_no = nr;

        let (result, outcome) = match nr {
            SYS_WRITE => {
                let fd = a0 as i32;
                let len = a2 as usize;
                let host_buf = self.space.translate_addr(a1).expect("write() with unmapped buffer");
                let ret = unsafe { libc::write(fd, host_buf as *const libc::c_void, len) };
                let result = if ret < 0 { errno_ret() } else { ret as u64 };
                (result, SyscallOutcome::Continue)
            }
            SYS_EXIT | SYS_EXIT_GROUP => (0, SyscallOutcome::Exit(a0 as i32)),
            SYS_BRK => {
                let result = if a0 == 0 {
                    self.space.brk()
                } else if a0 >= self.space.brk() {
                    let old_aligned = page_align_up(self.space.brk());
                    let new_aligned = page_align_up(a0);
                    if new_aligned > old_aligned {
                        let sz = (new_aligned - old_aligned) as usize;
                        self.space.map_guest(old_aligned, sz, libc::PROT_READ | libc::PROT_WRITE);
                    }
                    self.space.set_brk(a0);
                    a0
                } else {
                    self.space.brk()
                };
                (result, SyscallOutcome::Continue)
            }
            _ => {
                log::warn!("unhandled syscall {nr} -> -ENOSYS");
                (ENOSYS, SyscallOutcome::Continue)
            }
        };

        state.syscall_result = result;
        state.gpr[0] = result;
        self.last_outcome.set(outcome);

        match outcome {
            SyscallOutcome::Exit(_) => STOP_SENTINEL,
            SyscallOutcome::Continue => state.pc,
        }
    }
}

fn errno_ret() -> u64 {
    let e = unsafe { *libc::__errno_location() };
    (-e as i64) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_state(space: &LinuxAddrSpace) -> ThreadState {
        ThreadState::new(space.guest_base())
    }

    #[test]
    fn brk_grows_monotonically_and_reports_current_value() {
        let space = LinuxAddrSpace::new().unwrap();
        let mut state = new_state(&space);
        let mut handler = LinuxSyscalls::new(space);

        state.gpr[8] = SYS_BRK;
        state.gpr[0] = 0;
        handler.dispatch_syscall(&mut state);
        assert_eq!(state.gpr[0], 0);

        state.gpr[8] = SYS_BRK;
        state.gpr[0] = 0x2000;
        handler.dispatch_syscall(&mut state);
        assert_eq!(state.gpr[0], 0x2000);

        state.gpr[8] = SYS_BRK;
        state.gpr[0] = 0;
        handler.dispatch_syscall(&mut state);
        assert_eq!(state.gpr[0], 0x2000);
    }

    #[test]
    fn exit_group_reports_exit_outcome() {
        let space = LinuxAddrSpace::new().unwrap();
        let mut state = new_state(&space);
        let mut handler = LinuxSyscalls::new(space);

        state.gpr[8] = SYS_EXIT_GROUP;
        state.gpr[0] = 7;
        handler.dispatch_syscall(&mut state);
        assert_eq!(handler.last_outcome(), SyscallOutcome::Exit(7));
    }

    #[test]
    fn unknown_syscall_returns_enosys() {
        let space = LinuxAddrSpace::new().unwrap();
        let mut state = new_state(&space);
        let mut handler = LinuxSyscalls::new(space);

        state.gpr[8] = 0xffff;
        handler.dispatch_syscall(&mut state);
        assert_eq!(state.gpr[0], ENOSYS);
    }
}
