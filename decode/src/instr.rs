//! The decoder's output types: a tagged `InstructionClass` carrying exactly
//! the operands its class needs, wrapped in `DecodedInstruction` alongside
//! the fields every class shares (address, raw word, instruction length).

use jitaarch64_core::Cond;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    And,
    Orr,
    Eor,
    Orn,
    Bic,
    Eon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendKind {
    Uxtb,
    Uxth,
    Uxtw,
    Uxtx,
    Sxtb,
    Sxth,
    Sxtw,
    Sxtx,
}

/// The second ALU operand: either a shifted/extended register or an
/// immediate, normalized so translators don't special-case the encoding
/// family (shifted-register vs. extended-register vs. immediate) twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand2 {
    ShiftedReg { rm: u8, kind: ShiftKind, amount: u8 },
    ExtendedReg { rm: u8, kind: ExtendKind, amount: u8 },
    Immediate(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovWideVariant {
    Movn,
    Movz,
    Movk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitfieldVariant {
    Sbfm,
    Bfm,
    Ubfm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondSelVariant {
    Csel,
    Csinc,
    Csinv,
    Csneg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MulOp {
    Madd,
    Msub,
    SmaddlUmaddl { signed: bool },
    SmsublUmsubl { signed: bool },
    SmulhUmulh { signed: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchRegVariant {
    Br,
    Blr,
    Ret,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemOp {
    Load,
    Store,
    LoadSigned32,
    LoadSigned64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// `[Rn, #imm]`, offset not applied back to Rn.
    UnsignedOffset(u32),
    /// `[Rn, #simm]`, unscaled, not applied back to Rn.
    Unscaled(i32),
    /// `[Rn, #simm]!` — write address back to Rn before the access.
    PreIndex(i32),
    /// `[Rn], #simm` — access at Rn, then write address back to Rn.
    PostIndex(i32),
    /// `[Rn, Rm{, extend #amount}]`.
    RegisterOffset { rm: u8, extend: ExtendKind, amount: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemRegister {
    Nzcv,
    Fpcr,
    Fpsr,
    TpidrEl0,
    CntvctEl0,
    CntfrqEl0,
    CtrEl0,
    Unknown(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Cmp,
    Cmn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpConvertVariant {
    /// GPR -> FP register, integer reinterpreted as a signed or unsigned value.
    IntToFp { signed: bool },
    /// FP register -> GPR, rounding toward zero.
    FpToInt { signed: bool },
    /// FP register -> FP register, changing between single and double
    /// precision (`size64` on the decoded instruction names the *source*
    /// width; the destination is the other one).
    Precision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpMoveVariant {
    /// FMOV Dd, Dn / FMOV Sd, Sn: register-to-register, same width, no
    /// conversion.
    FpToFp,
    /// FMOV Dd, Xn (or Sd, Wn): raw bit pattern, GPR -> FP register.
    GprToFp,
    /// FMOV Xd, Dn (or Wd, Sn): raw bit pattern, FP register -> GPR.
    FpToGpr,
}

/// The operation an instruction performs, carrying exactly the operands that
/// class needs. `size64` distinguishes the W-register (32-bit) and
/// X-register (64-bit) variants of the same opcode family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionClass {
    AluRegister {
        op: AluOp,
        set_flags: bool,
        size64: bool,
        rd: u8,
        rn: u8,
        operand2: Operand2,
    },
    MovWide {
        variant: MovWideVariant,
        size64: bool,
        rd: u8,
        imm16: u64,
        shift: u32,
    },
    Bitfield {
        variant: BitfieldVariant,
        size64: bool,
        rd: u8,
        rn: u8,
        immr: u32,
        imms: u32,
    },
    MultiplyExtend {
        op: MulOp,
        /// Only meaningful for `MulOp::Madd`/`Msub`: the long- and
        /// high-multiply forms always operate at the widths their own
        /// semantics require regardless of this flag.
        size64: bool,
        rd: u8,
        rn: u8,
        rm: u8,
        ra: u8,
    },
    Divide {
        signed: bool,
        size64: bool,
        rd: u8,
        rn: u8,
        rm: u8,
    },
    ConditionalSelect {
        variant: CondSelVariant,
        size64: bool,
        rd: u8,
        rn: u8,
        rm: u8,
        cond: Cond,
    },
    CompareRegister {
        op: CompareOp,
        size64: bool,
        rn: u8,
        operand2: Operand2,
    },
    Test {
        size64: bool,
        rn: u8,
        operand2: Operand2,
    },
    LoadStore {
        op: MemOp,
        size64: bool,
        byte_width: u8,
        rt: u8,
        rn: u8,
        mode: AddrMode,
    },
    LoadStorePair {
        is_load: bool,
        size64: bool,
        rt: u8,
        rt2: u8,
        rn: u8,
        mode: AddrMode,
    },
    BranchUnconditional {
        imm: i64,
    },
    BranchLink {
        imm: i64,
    },
    BranchConditional {
        cond: Cond,
        imm: i64,
    },
    CompareAndBranch {
        is_nonzero: bool,
        size64: bool,
        rt: u8,
        imm: i64,
    },
    TestBitBranch {
        is_nonzero: bool,
        bit: u8,
        rt: u8,
        imm: i64,
    },
    BranchRegister {
        variant: BranchRegVariant,
        rn: u8,
    },
    SupervisorCall {
        imm16: u16,
    },
    Breakpoint {
        imm16: u16,
    },
    Halt {
        imm16: u16,
    },
    SystemRegisterRead {
        rt: u8,
        reg: SystemRegister,
    },
    SystemRegisterWrite {
        rt: u8,
        reg: SystemRegister,
    },
    Barrier,
    /// Scalar floating-point arithmetic: `Vd = Vn op Vm`.
    FpDataProcessing {
        op: FpOp,
        size64: bool,
        rd: u8,
        rn: u8,
        rm: u8,
    },
    /// Integer<->float and single<->double conversions.
    FpConvert {
        variant: FpConvertVariant,
        size64: bool,
        rd: u8,
        rn: u8,
    },
    /// FCMP: sets NZCV from comparing two scalar FP registers.
    FpCompare {
        size64: bool,
        rn: u8,
        rm: u8,
    },
    /// FMOV in any of its register-to-register/GPR-interchange forms.
    FpMove {
        variant: FpMoveVariant,
        size64: bool,
        rd: u8,
        rn: u8,
    },
    /// Vector lane-wise arithmetic over the 128-bit register file, reduced
    /// to ADD/SUB/MUL at lane widths 8/16/32/64 (see design notes Open
    /// Question (c)); permute and saturating variants classify as
    /// `Unsupported` instead.
    SimdArith {
        op: FpOp,
        lane_bits: u8,
        elements: u8,
        rd: u8,
        rn: u8,
        rm: u8,
    },
    /// Straight scalar SIMD/FP load or store (no permute, no multi-register
    /// structures).
    SimdLoadStore {
        op: MemOp,
        byte_width: u8,
        rt: u8,
        rn: u8,
        mode: AddrMode,
    },
    /// Floating-point, NEON, and any other instruction outside the
    /// supported subset: recognized as "well-formed but not translated"
    /// rather than folded into Unknown.
    Unsupported,
    /// A 32-bit word that matches no recognized encoding.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub pc: u64,
    pub raw: u32,
    pub class: InstructionClass,
}

impl DecodedInstruction {
    /// Every instruction this decoder recognizes is a fixed 4 bytes.
    pub const LEN: u64 = 4;

    pub fn is_terminator(&self) -> bool {
        matches!(
            self.class,
            InstructionClass::BranchUnconditional { .. }
                | InstructionClass::BranchLink { .. }
                | InstructionClass::BranchConditional { .. }
                | InstructionClass::CompareAndBranch { .. }
                | InstructionClass::TestBitBranch { .. }
                | InstructionClass::BranchRegister { .. }
                | InstructionClass::SupervisorCall { .. }
                | InstructionClass::Breakpoint { .. }
                | InstructionClass::Halt { .. }
        )
    }
}
