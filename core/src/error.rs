use std::io;

/// Error kinds produced and propagated by the JIT core.
///
/// Every fallible public entry point returns `Result<_, JitError>`; low-level
/// emitter/cache failures are folded into one of these before they cross a
/// module boundary.
#[derive(Debug, thiserror::Error)]
pub enum JitError {
    /// A null handle or an out-of-range parameter was passed to a public entry point.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Code cache or translation-table allocation failed.
    #[error("out of memory: {0}")]
    OutOfMemory(#[source] io::Error),

    /// Code-cache bump allocation could not satisfy the request.
    #[error("code cache full: requested {requested} bytes, {remaining} remaining")]
    CacheFull { requested: usize, remaining: usize },

    /// A block translation exceeded the reserved code-buffer capacity.
    #[error("code buffer overflow during block translation")]
    BufferOverflow,

    /// The decoder could not classify a guest instruction word.
    #[error("undefined instruction {word:#010x} at guest pc {pc:#018x}")]
    UndefinedInstruction { pc: u64, word: u32 },

    /// The OS refused to change page protection. Fatal; caller must reset the context.
    #[error("page protection fault: {0}")]
    Fault(#[source] io::Error),
}

pub type JitResult<T> = Result<T, JitError>;
