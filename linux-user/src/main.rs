//! Demo driver for the ARM64-on-x86_64 dynamic binary translator: builds a
//! guest address space and thread state by hand (there is no ELF loader in
//! this crate, see DESIGN.md), writes a small guest program into it, and
//! runs `JitContext::dispatch` to completion.

use std::process;

use clap::Parser;

use jitaarch64_core::{JitConfig, ThreadState};
use jitaarch64_exec::{DispatchStatus, JitContext};
use jitaarch64_linux_user::addr_space::{self, LinuxAddrSpace, GUEST_STACK_SIZE, GUEST_STACK_TOP};
use jitaarch64_linux_user::syscall::{LinuxSyscalls, SyscallOutcome};

/// Run the bundled demo guest program instead of needing a real ARM64
/// binary on disk; there is no ELF loader in this build.
#[derive(Parser, Debug)]
#[command(name = "jitaarch64-run", about = "Dynamic ARM64 -> x86_64 binary translator demo")]
struct Cli {
    /// Guest code cache size in bytes (0 = default).
    #[arg(long, default_value_t = 0)]
    code_cache_bytes: usize,

    /// Print dispatch/translation stats on exit.
    #[arg(long)]
    stats: bool,
}

/// `mov x0, #1; mov x1, <msg addr>; mov x2, #11; mov x8, #64; svc #0;
/// mov x8, #94; svc #0` — SYS_write("hello, jit\n") followed by
/// SYS_exit_group(0). `msg_addr` is assumed to fit in 16 bits (one MOVZ,
/// no MOVK needed) since the demo maps its data page low in guest space.
fn build_demo_program(space: &LinuxAddrSpace, code_addr: u64, msg_addr: u64) {
    let message: &[u8] = b"hello, jit\n";

    let insns: [u32; 7] = [
        movz(0, 1),                       // mov x0, #1 (fd = stdout)
        movz(1, msg_addr as u16),         // mov x1, #msg_addr
        movz(2, message.len() as u16),    // mov x2, #len
        movz(8, 64),                      // mov x8, #64 (SYS_write)
        0xd4000001,                       // svc #0
        movz(8, 94),                       // mov x8, #94 (SYS_exit_group)
        0xd4000001,                       // svc #0
    ];

    let mut bytes = Vec::with_capacity(insns.len() * 4);
    for insn in &insns {
        bytes.extend_from_slice(&insn.to_le_bytes());
    }

    unsafe {
        space.write_bytes(code_addr, &bytes);
        space.write_bytes(msg_addr, message);
    }
}

/// `MOVZ Xd, #imm16` (64-bit, no shift).
fn movz(rd: u32, imm16: u16) -> u32 {
    0x_d280_0000 | ((imm16 as u32) << 5) | rd
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let space = LinuxAddrSpace::new().expect("failed to reserve guest address space");

    const CODE_BASE: u64 = 0x1000;
    const MSG_BASE: u64 = 0x2000;
    let page = addr_space::page_size();
    space
        .map_guest(CODE_BASE, page, libc::PROT_READ | libc::PROT_WRITE)
        .expect("failed to map code page");
    space
        .map_guest(MSG_BASE, page, libc::PROT_READ | libc::PROT_WRITE)
        .expect("failed to map data page");
    build_demo_program(&space, CODE_BASE, MSG_BASE);

    let stack_base = GUEST_STACK_TOP - GUEST_STACK_SIZE as u64;
    space
        .map_guest(stack_base, GUEST_STACK_SIZE, libc::PROT_READ | libc::PROT_WRITE)
        .expect("failed to map guest stack");

    let mut state = ThreadState::new(space.guest_base());
    state.pc = CODE_BASE;
    state.sp = GUEST_STACK_TOP;

    let config = JitConfig::new(cli.code_cache_bytes, 0, 0).expect("invalid JIT configuration");
    let mut ctx = JitContext::jit_init(config).expect("failed to initialize JIT context");
    let mut syscalls = LinuxSyscalls::new(space.clone());

    let (_, status) = unsafe { ctx.dispatch(CODE_BASE, &mut state, &space, &mut syscalls) };

    if cli.stats {
        eprintln!("{}", ctx.stats());
    }

    match status {
        DispatchStatus::Stop => match syscalls.last_outcome() {
            SyscallOutcome::Exit(code) => process::exit(code),
            SyscallOutcome::Continue => process::exit(0),
        },
        DispatchStatus::Trap(pc) => {
            eprintln!("guest trap at pc={pc:#x}");
            process::exit(1);
        }
        DispatchStatus::Fatal => {
            eprintln!("fatal JIT error");
            process::exit(1);
        }
    }
}
