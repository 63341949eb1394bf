//! Instructions, opcodes and comparison predicates.

use super::types::Type;
use super::value::{Idx, ValueId};
use super::BlockId;
use std::fmt;

/// Marker type for the instruction index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstTag;

/// Index into `Function::insts`.
pub type InstId = Idx<InstTag>;

/// Instruction opcodes understood by the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Terminators
    Ret,
    Br,
    Switch,
    IndirectBr,
    Unreachable,

    // Unary
    FNeg,

    // Binary
    Add,
    FAdd,
    Sub,
    FSub,
    Mul,
    FMul,
    UDiv,
    SDiv,
    FDiv,
    URem,
    SRem,
    FRem,

    // Bitwise binary
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,

    // Memory
    Alloca,
    Load,
    Store,
    GetElementPtr,
    Fence,
    CmpXchg,
    AtomicRMW,

    // Casts
    Trunc,
    ZExt,
    SExt,
    FPToUI,
    FPToSI,
    UIToFP,
    SIToFP,
    FPTrunc,
    FPExt,
    PtrToInt,
    IntToPtr,
    BitCast,
    AddrSpaceCast,

    // Other
    ICmp,
    FCmp,
    Phi,
    Call,
    Select,
    VAArg,
    ExtractElement,
    InsertElement,
    ShuffleVector,
    ExtractValue,
    InsertValue,
    Freeze,
}

impl Opcode {
    /// The host's mnemonic for this opcode.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Ret => "ret",
            Opcode::Br => "br",
            Opcode::Switch => "switch",
            Opcode::IndirectBr => "indirectbr",
            Opcode::Unreachable => "unreachable",
            Opcode::FNeg => "fneg",
            Opcode::Add => "add",
            Opcode::FAdd => "fadd",
            Opcode::Sub => "sub",
            Opcode::FSub => "fsub",
            Opcode::Mul => "mul",
            Opcode::FMul => "fmul",
            Opcode::UDiv => "udiv",
            Opcode::SDiv => "sdiv",
            Opcode::FDiv => "fdiv",
            Opcode::URem => "urem",
            Opcode::SRem => "srem",
            Opcode::FRem => "frem",
            Opcode::Shl => "shl",
            Opcode::LShr => "lshr",
            Opcode::AShr => "ashr",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Alloca => "alloca",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::GetElementPtr => "getelementptr",
            Opcode::Fence => "fence",
            Opcode::CmpXchg => "cmpxchg",
            Opcode::AtomicRMW => "atomicrmw",
            Opcode::Trunc => "trunc",
            Opcode::ZExt => "zext",
            Opcode::SExt => "sext",
            Opcode::FPToUI => "fptoui",
            Opcode::FPToSI => "fptosi",
            Opcode::UIToFP => "uitofp",
            Opcode::SIToFP => "sitofp",
            Opcode::FPTrunc => "fptrunc",
            Opcode::FPExt => "fpext",
            Opcode::PtrToInt => "ptrtoint",
            Opcode::IntToPtr => "inttoptr",
            Opcode::BitCast => "bitcast",
            Opcode::AddrSpaceCast => "addrspacecast",
            Opcode::ICmp => "icmp",
            Opcode::FCmp => "fcmp",
            Opcode::Phi => "phi",
            Opcode::Call => "call",
            Opcode::Select => "select",
            Opcode::VAArg => "va_arg",
            Opcode::ExtractElement => "extractelement",
            Opcode::InsertElement => "insertelement",
            Opcode::ShuffleVector => "shufflevector",
            Opcode::ExtractValue => "extractvalue",
            Opcode::InsertValue => "insertvalue",
            Opcode::Freeze => "freeze",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        let op = match s {
            "ret" => Opcode::Ret,
            "br" => Opcode::Br,
            "switch" => Opcode::Switch,
            "indirectbr" => Opcode::IndirectBr,
            "unreachable" => Opcode::Unreachable,
            "fneg" => Opcode::FNeg,
            "add" => Opcode::Add,
            "fadd" => Opcode::FAdd,
            "sub" => Opcode::Sub,
            "fsub" => Opcode::FSub,
            "mul" => Opcode::Mul,
            "fmul" => Opcode::FMul,
            "udiv" => Opcode::UDiv,
            "sdiv" => Opcode::SDiv,
            "fdiv" => Opcode::FDiv,
            "urem" => Opcode::URem,
            "srem" => Opcode::SRem,
            "frem" => Opcode::FRem,
            "shl" => Opcode::Shl,
            "lshr" => Opcode::LShr,
            "ashr" => Opcode::AShr,
            "and" => Opcode::And,
            "or" => Opcode::Or,
            "xor" => Opcode::Xor,
            "alloca" => Opcode::Alloca,
            "load" => Opcode::Load,
            "store" => Opcode::Store,
            "getelementptr" => Opcode::GetElementPtr,
            "fence" => Opcode::Fence,
            "cmpxchg" => Opcode::CmpXchg,
            "atomicrmw" => Opcode::AtomicRMW,
            "trunc" => Opcode::Trunc,
            "zext" => Opcode::ZExt,
            "sext" => Opcode::SExt,
            "fptoui" => Opcode::FPToUI,
            "fptosi" => Opcode::FPToSI,
            "uitofp" => Opcode::UIToFP,
            "sitofp" => Opcode::SIToFP,
            "fptrunc" => Opcode::FPTrunc,
            "fpext" => Opcode::FPExt,
            "ptrtoint" => Opcode::PtrToInt,
            "inttoptr" => Opcode::IntToPtr,
            "bitcast" => Opcode::BitCast,
            "addrspacecast" => Opcode::AddrSpaceCast,
            "icmp" => Opcode::ICmp,
            "fcmp" => Opcode::FCmp,
            "phi" => Opcode::Phi,
            "call" => Opcode::Call,
            "select" => Opcode::Select,
            "va_arg" => Opcode::VAArg,
            "extractelement" => Opcode::ExtractElement,
            "insertelement" => Opcode::InsertElement,
            "shufflevector" => Opcode::ShuffleVector,
            "extractvalue" => Opcode::ExtractValue,
            "insertvalue" => Opcode::InsertValue,
            "freeze" => Opcode::Freeze,
            _ => return None,
        };
        Some(op)
    }

    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Opcode::Ret | Opcode::Br | Opcode::Switch | Opcode::IndirectBr | Opcode::Unreachable
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Comparison predicates of `fcmp` and `icmp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    // fcmp
    FcmpFalse,
    FcmpOeq,
    FcmpOgt,
    FcmpOge,
    FcmpOlt,
    FcmpOle,
    FcmpOne,
    FcmpOrd,
    FcmpUno,
    FcmpUeq,
    FcmpUgt,
    FcmpUge,
    FcmpUlt,
    FcmpUle,
    FcmpUne,
    FcmpTrue,

    // icmp
    IcmpEq,
    IcmpNe,
    IcmpUgt,
    IcmpUge,
    IcmpUlt,
    IcmpUle,
    IcmpSgt,
    IcmpSge,
    IcmpSlt,
    IcmpSle,
}

impl Predicate {
    /// The host's predicate name.
    pub fn name(self) -> &'static str {
        match self {
            Predicate::FcmpFalse => "false",
            Predicate::FcmpOeq => "oeq",
            Predicate::FcmpOgt => "ogt",
            Predicate::FcmpOge => "oge",
            Predicate::FcmpOlt => "olt",
            Predicate::FcmpOle => "ole",
            Predicate::FcmpOne => "one",
            Predicate::FcmpOrd => "ord",
            Predicate::FcmpUno => "uno",
            Predicate::FcmpUeq => "ueq",
            Predicate::FcmpUgt => "ugt",
            Predicate::FcmpUge => "uge",
            Predicate::FcmpUlt => "ult",
            Predicate::FcmpUle => "ule",
            Predicate::FcmpUne => "une",
            Predicate::FcmpTrue => "true",
            Predicate::IcmpEq => "eq",
            Predicate::IcmpNe => "ne",
            Predicate::IcmpUgt => "ugt",
            Predicate::IcmpUge => "uge",
            Predicate::IcmpUlt => "ult",
            Predicate::IcmpUle => "ule",
            Predicate::IcmpSgt => "sgt",
            Predicate::IcmpSge => "sge",
            Predicate::IcmpSlt => "slt",
            Predicate::IcmpSle => "sle",
        }
    }

    pub fn int_from_name(s: &str) -> Option<Self> {
        let pred = match s {
            "eq" => Predicate::IcmpEq,
            "ne" => Predicate::IcmpNe,
            "ugt" => Predicate::IcmpUgt,
            "uge" => Predicate::IcmpUge,
            "ult" => Predicate::IcmpUlt,
            "ule" => Predicate::IcmpUle,
            "sgt" => Predicate::IcmpSgt,
            "sge" => Predicate::IcmpSge,
            "slt" => Predicate::IcmpSlt,
            "sle" => Predicate::IcmpSle,
            _ => return None,
        };
        Some(pred)
    }

    pub fn float_from_name(s: &str) -> Option<Self> {
        let pred = match s {
            "false" => Predicate::FcmpFalse,
            "oeq" => Predicate::FcmpOeq,
            "ogt" => Predicate::FcmpOgt,
            "oge" => Predicate::FcmpOge,
            "olt" => Predicate::FcmpOlt,
            "ole" => Predicate::FcmpOle,
            "one" => Predicate::FcmpOne,
            "ord" => Predicate::FcmpOrd,
            "uno" => Predicate::FcmpUno,
            "ueq" => Predicate::FcmpUeq,
            "ugt" => Predicate::FcmpUgt,
            "uge" => Predicate::FcmpUge,
            "ult" => Predicate::FcmpUlt,
            "ule" => Predicate::FcmpUle,
            "une" => Predicate::FcmpUne,
            "true" => Predicate::FcmpTrue,
            _ => return None,
        };
        Some(pred)
    }
}

/// Opcode-specific payload of an instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum InstKind {
    Plain,
    /// `icmp` / `fcmp`
    Compare(Predicate),
    /// `alloca`; the element count is operand 0.
    Alloca { allocated: Type },
    /// `phi`; `incoming[i]` is the predecessor block of operand `i`.
    Phi { incoming: Vec<BlockId> },
}

/// One use of a value: the operand at position `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Use {
    pub index: usize,
    pub value: ValueId,
}

/// An instruction node.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The value this instruction defines (name and result type).
    pub result: ValueId,
    pub opcode: Opcode,
    /// Operands in the host's declared operand order.
    pub operands: Vec<ValueId>,
    pub kind: InstKind,
}

impl Instruction {
    /// Uses in operand order.
    pub fn uses(&self) -> impl Iterator<Item = Use> + '_ {
        self.operands
            .iter()
            .enumerate()
            .map(|(index, &value)| Use { index, value })
    }

    /// Predecessor block a phi operand flows in from; `None` for every
    /// other instruction.
    pub fn incoming_block(&self, operand: Use) -> Option<BlockId> {
        match &self.kind {
            InstKind::Phi { incoming } => incoming.get(operand.index).copied(),
            _ => None,
        }
    }

    /// Element-count operand of an `alloca`.
    pub fn array_size(&self) -> Option<ValueId> {
        match self.kind {
            InstKind::Alloca { .. } => self.operands.first().copied(),
            _ => None,
        }
    }
}
