//! Instruction syntax.
//!
//! Each opcode parses its operands in source order and computes its result
//! type. Operand order in the resulting instruction follows the host's
//! internal layout where it differs from the text (conditional branches,
//! calls).

use super::function::{LocalKey, PendingKind, PendingOperand};
use super::lexer::TokenKind;
use super::types::is_type_start;
use super::Parser;
use crate::ir::{FunctionType, Opcode, Predicate, StructType, Type, ValueData, ValueKind};
use anyhow::Result;

const FAST_MATH_FLAGS: &[&str] = &[
    "nnan", "ninf", "nsz", "arcp", "contract", "afn", "reassoc", "fast",
];
const WRAP_FLAGS: &[&str] = &["nuw", "nsw", "exact", "disjoint"];
const CALL_MARKERS: &[&str] = &["tail", "musttail", "notail"];
const MEMORY_FLAGS: &[&str] = &["atomic", "volatile"];
const ORDERINGS: &[&str] = &[
    "unordered", "monotonic", "acquire", "release", "acq_rel", "seq_cst",
];
const ATOMIC_RMW_OPS: &[&str] = &[
    "xchg", "add", "sub", "and", "nand", "or", "xor", "max", "min", "umax", "umin", "fadd",
    "fsub", "fmax", "fmin", "fmaximum", "fminimum", "uinc_wrap", "udec_wrap", "usub_cond",
    "usub_sat",
];
const ASM_FLAGS: &[&str] = &["sideeffect", "alignstack", "inteldialect", "unwind"];

/// Attributes that may follow an argument type at a call site.
const PARAM_ATTRS: &[&str] = &[
    "align",
    "allocalign",
    "allocptr",
    "byref",
    "byval",
    "captures",
    "dead_on_unwind",
    "dereferenceable",
    "dereferenceable_or_null",
    "elementtype",
    "immarg",
    "inalloca",
    "initializes",
    "inreg",
    "nest",
    "noalias",
    "nocapture",
    "noext",
    "nofpclass",
    "nofree",
    "nonnull",
    "noundef",
    "preallocated",
    "range",
    "readnone",
    "readonly",
    "returned",
    "signext",
    "sret",
    "swiftasync",
    "swifterror",
    "swiftself",
    "writable",
    "writeonly",
    "zeroext",
];

/// A parsed instruction, operands not yet resolved.
#[derive(Debug, Clone)]
pub(super) struct ParsedInst {
    pub opcode: Opcode,
    /// Result type; `Void` for instructions without a value.
    pub ty: Type,
    pub operands: Vec<PendingOperand>,
    pub kind: PendingKind,
}

impl ParsedInst {
    fn plain(opcode: Opcode, ty: Type, operands: Vec<PendingOperand>) -> Self {
        Self {
            opcode,
            ty,
            operands,
            kind: PendingKind::Plain,
        }
    }
}

impl Parser<'_> {
    pub(super) fn parse_instruction(&mut self) -> Result<ParsedInst> {
        self.eat_words(CALL_MARKERS);
        let opcode = match self.peek() {
            TokenKind::Word(word) => Opcode::from_mnemonic(word),
            _ => None,
        };
        let Some(opcode) = opcode else {
            if self.at_word("invoke") || self.at_word("callbr") {
                return Err(self.unexpected("an instruction (exception handling is not supported)"));
            }
            return Err(self.unexpected("an instruction"));
        };
        let op_tok = self.bump();

        use Opcode::*;
        let parsed = match opcode {
            Ret => {
                if self.eat_word("void") {
                    ParsedInst::plain(Ret, Type::Void, vec![])
                } else {
                    let (_, value) = self.parse_typed_operand()?;
                    ParsedInst::plain(Ret, Type::Void, vec![value])
                }
            }
            Br => self.parse_br()?,
            Switch => self.parse_switch()?,
            IndirectBr => self.parse_indirectbr()?,
            Unreachable | Fence => ParsedInst::plain(opcode, Type::Void, vec![]),
            FNeg => {
                self.eat_words(FAST_MATH_FLAGS);
                let (ty, value) = self.parse_typed_operand()?;
                ParsedInst::plain(FNeg, ty, vec![value])
            }
            Add | FAdd | Sub | FSub | Mul | FMul | UDiv | SDiv | FDiv | URem | SRem | FRem
            | Shl | LShr | AShr | And | Or | Xor => {
                self.eat_flags();
                let ty = self.parse_type()?;
                let lhs = self.parse_operand(ty.clone())?;
                self.expect(TokenKind::Comma, "','")?;
                let rhs = self.parse_operand(ty.clone())?;
                ParsedInst::plain(opcode, ty, vec![lhs, rhs])
            }
            ICmp | FCmp => self.parse_compare(opcode)?,
            Alloca => self.parse_alloca()?,
            Load => {
                self.eat_words(MEMORY_FLAGS);
                let ty = self.parse_type()?;
                self.expect(TokenKind::Comma, "','")?;
                let (_, ptr) = self.parse_typed_operand()?;
                ParsedInst::plain(Load, ty, vec![ptr])
            }
            Store => {
                self.eat_words(MEMORY_FLAGS);
                let (_, value) = self.parse_typed_operand()?;
                self.expect(TokenKind::Comma, "','")?;
                let (_, ptr) = self.parse_typed_operand()?;
                ParsedInst::plain(Store, Type::Void, vec![value, ptr])
            }
            GetElementPtr => self.parse_gep()?,
            CmpXchg => self.parse_cmpxchg()?,
            AtomicRMW => self.parse_atomicrmw()?,
            Trunc | ZExt | SExt | FPToUI | FPToSI | UIToFP | SIToFP | FPTrunc | FPExt
            | PtrToInt | IntToPtr | BitCast | AddrSpaceCast => {
                self.eat_flags();
                let (_, value) = self.parse_typed_operand()?;
                self.expect_word("to")?;
                let ty = self.parse_type()?;
                ParsedInst::plain(opcode, ty, vec![value])
            }
            Phi => self.parse_phi()?,
            Call => self.parse_call()?,
            Select => {
                self.eat_words(FAST_MATH_FLAGS);
                let (_, cond) = self.parse_typed_operand()?;
                self.expect(TokenKind::Comma, "','")?;
                let (ty, on_true) = self.parse_typed_operand()?;
                self.expect(TokenKind::Comma, "','")?;
                let (_, on_false) = self.parse_typed_operand()?;
                ParsedInst::plain(Select, ty, vec![cond, on_true, on_false])
            }
            VAArg => {
                let (_, list) = self.parse_typed_operand()?;
                self.expect(TokenKind::Comma, "','")?;
                let ty = self.parse_type()?;
                ParsedInst::plain(VAArg, ty, vec![list])
            }
            ExtractElement => {
                let (vec_ty, vector) = self.parse_typed_operand()?;
                self.expect(TokenKind::Comma, "','")?;
                let (_, index) = self.parse_typed_operand()?;
                let Some(elem) = vec_ty.element_type().cloned() else {
                    return Err(self.error_at(&op_tok, format!("{} is not a vector", vec_ty)));
                };
                ParsedInst::plain(ExtractElement, elem, vec![vector, index])
            }
            InsertElement => {
                let (vec_ty, vector) = self.parse_typed_operand()?;
                self.expect(TokenKind::Comma, "','")?;
                let (_, elem) = self.parse_typed_operand()?;
                self.expect(TokenKind::Comma, "','")?;
                let (_, index) = self.parse_typed_operand()?;
                ParsedInst::plain(InsertElement, vec_ty, vec![vector, elem, index])
            }
            ShuffleVector => {
                let (vec_ty, lhs) = self.parse_typed_operand()?;
                self.expect(TokenKind::Comma, "','")?;
                let (_, rhs) = self.parse_typed_operand()?;
                self.expect(TokenKind::Comma, "','")?;
                // The mask is a constant attribute of the instruction, not an
                // operand.
                let (mask_ty, _) = self.parse_typed_operand()?;
                let Some(elem) = vec_ty.element_type().cloned() else {
                    return Err(self.error_at(&op_tok, format!("{} is not a vector", vec_ty)));
                };
                let ty = Type::with_vector_shape_of(&mask_ty, elem);
                ParsedInst::plain(ShuffleVector, ty, vec![lhs, rhs])
            }
            ExtractValue => {
                let (agg_ty, agg) = self.parse_typed_operand()?;
                let indices = self.parse_aggregate_indices()?;
                let ty = self
                    .types
                    .indexed_type(&agg_ty, &indices)
                    .map_err(|e| self.error_at(&op_tok, e))?;
                ParsedInst::plain(ExtractValue, ty, vec![agg])
            }
            InsertValue => {
                let (agg_ty, agg) = self.parse_typed_operand()?;
                self.expect(TokenKind::Comma, "','")?;
                let (_, value) = self.parse_typed_operand()?;
                self.parse_aggregate_indices()?;
                ParsedInst::plain(InsertValue, agg_ty, vec![agg, value])
            }
            Freeze => {
                let (ty, value) = self.parse_typed_operand()?;
                ParsedInst::plain(Freeze, ty, vec![value])
            }
        };
        Ok(parsed)
    }

    /// `nuw`, `nsw`, `exact`, `disjoint`, `nneg` and fast-math flags.
    fn eat_flags(&mut self) {
        loop {
            let before = self.pos;
            self.eat_words(WRAP_FLAGS);
            self.eat_words(FAST_MATH_FLAGS);
            self.eat_words(&["nneg", "samesign"]);
            if self.pos == before {
                return;
            }
        }
    }

    /// `br label %dest` or `br i1 %cond, label %then, label %else`.
    /// Conditional operands are stored as `[cond, else, then]`.
    fn parse_br(&mut self) -> Result<ParsedInst> {
        let (ty, first) = self.parse_typed_operand()?;
        if ty == Type::Label {
            return Ok(ParsedInst::plain(Opcode::Br, Type::Void, vec![first]));
        }
        self.expect(TokenKind::Comma, "','")?;
        let (_, on_true) = self.parse_typed_operand()?;
        self.expect(TokenKind::Comma, "','")?;
        let (_, on_false) = self.parse_typed_operand()?;
        Ok(ParsedInst::plain(
            Opcode::Br,
            Type::Void,
            vec![first, on_false, on_true],
        ))
    }

    /// `switch i32 %v, label %default [ i32 0, label %a ... ]`
    fn parse_switch(&mut self) -> Result<ParsedInst> {
        let (_, cond) = self.parse_typed_operand()?;
        self.expect(TokenKind::Comma, "','")?;
        let (_, default) = self.parse_typed_operand()?;
        self.expect(TokenKind::LBracket, "'['")?;
        let mut operands = vec![cond, default];
        while !self.eat(&TokenKind::RBracket) {
            let (_, value) = self.parse_typed_operand()?;
            self.expect(TokenKind::Comma, "','")?;
            let (_, dest) = self.parse_typed_operand()?;
            operands.push(value);
            operands.push(dest);
        }
        Ok(ParsedInst::plain(Opcode::Switch, Type::Void, operands))
    }

    /// `indirectbr ptr %addr, [ label %a, label %b ]`
    fn parse_indirectbr(&mut self) -> Result<ParsedInst> {
        let (_, addr) = self.parse_typed_operand()?;
        self.expect(TokenKind::Comma, "','")?;
        self.expect(TokenKind::LBracket, "'['")?;
        let mut operands = vec![addr];
        if !self.eat(&TokenKind::RBracket) {
            loop {
                operands.push(self.parse_typed_operand()?.1);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RBracket, "']'")?;
        }
        Ok(ParsedInst::plain(Opcode::IndirectBr, Type::Void, operands))
    }

    fn parse_compare(&mut self, opcode: Opcode) -> Result<ParsedInst> {
        self.eat_flags();
        let pred = match self.peek() {
            TokenKind::Word(word) if opcode == Opcode::ICmp => Predicate::int_from_name(word),
            TokenKind::Word(word) => Predicate::float_from_name(word),
            _ => None,
        };
        let Some(pred) = pred else {
            return Err(self.unexpected(&format!("{} predicate", opcode)));
        };
        self.bump();
        let ty = self.parse_type()?;
        let lhs = self.parse_operand(ty.clone())?;
        self.expect(TokenKind::Comma, "','")?;
        let rhs = self.parse_operand(ty.clone())?;
        Ok(ParsedInst {
            opcode,
            ty: Type::with_vector_shape_of(&ty, Type::i1()),
            operands: vec![lhs, rhs],
            kind: PendingKind::Compare(pred),
        })
    }

    /// `alloca T[, <ty> <count>][, align N][, addrspace(N)]`.
    /// Without an explicit count the size operand is the constant `i32 1`.
    fn parse_alloca(&mut self) -> Result<ParsedInst> {
        self.eat_words(&["inalloca", "swifterror"]);
        let allocated = self.parse_type()?;
        let size = if self.at(&TokenKind::Comma) && is_type_start(self.peek_nth(1)) {
            self.bump();
            self.parse_typed_operand()?.1
        } else {
            PendingOperand::Value(ValueData::constant(Type::int(32), "1"))
        };
        let mut addrspace = 0;
        while self.at(&TokenKind::Comma) {
            match self.peek_nth(1) {
                TokenKind::Word(w) if w == "addrspace" => {
                    self.bump();
                    addrspace = self.parse_addrspace()?;
                }
                TokenKind::Word(w) if w == "align" => {
                    self.bump();
                    self.bump();
                    self.expect_int::<u64>("an alignment")?;
                }
                // Metadata attachments.
                _ => break,
            }
        }
        let ty = match self.pointer_to(allocated.clone()) {
            Type::Pointer { pointee, .. } => Type::Pointer { pointee, addrspace },
            other => other,
        };
        Ok(ParsedInst {
            opcode: Opcode::Alloca,
            ty,
            operands: vec![size],
            kind: PendingKind::Alloca(allocated),
        })
    }

    /// `cmpxchg [weak] [volatile] ptr %p, T %cmp, T %new <orderings>`.
    /// The result is the literal struct `{ T, i1 }`.
    fn parse_cmpxchg(&mut self) -> Result<ParsedInst> {
        self.eat_words(&["weak", "volatile"]);
        let (_, ptr) = self.parse_typed_operand()?;
        self.expect(TokenKind::Comma, "','")?;
        let (ty, cmp) = self.parse_typed_operand()?;
        self.expect(TokenKind::Comma, "','")?;
        let (_, new) = self.parse_typed_operand()?;
        self.skip_atomic_ordering()?;
        let result = Type::Struct(StructType::Literal {
            fields: vec![ty, Type::i1()],
            packed: false,
        });
        Ok(ParsedInst::plain(Opcode::CmpXchg, result, vec![ptr, cmp, new]))
    }

    /// `atomicrmw [volatile] <op> ptr %p, T %v <ordering>`
    fn parse_atomicrmw(&mut self) -> Result<ParsedInst> {
        self.eat_word("volatile");
        let known = matches!(self.peek(), TokenKind::Word(w) if ATOMIC_RMW_OPS.contains(&w.as_str()));
        if !known {
            return Err(self.unexpected("an atomicrmw operation"));
        }
        self.bump();
        let (_, ptr) = self.parse_typed_operand()?;
        self.expect(TokenKind::Comma, "','")?;
        let (ty, value) = self.parse_typed_operand()?;
        self.skip_atomic_ordering()?;
        Ok(ParsedInst::plain(Opcode::AtomicRMW, ty, vec![ptr, value]))
    }

    /// `[syncscope("...")] <ordering>...`
    fn skip_atomic_ordering(&mut self) -> Result<()> {
        if self.eat_word("syncscope") && self.at(&TokenKind::LParen) {
            self.skip_group()?;
        }
        self.eat_words(ORDERINGS);
        Ok(())
    }

    /// `getelementptr [inbounds] T, ptr %base, <ty> <idx>...`
    ///
    /// A vector base or any vector index makes the result a vector of
    /// pointers of the same shape.
    fn parse_gep(&mut self) -> Result<ParsedInst> {
        let gep_tok = self.tok().clone();
        self.eat_words(&["inbounds", "nuw", "nusw"]);
        self.skip_inrange()?;
        let source = self.parse_type()?;
        self.expect(TokenKind::Comma, "','")?;
        let (base_ty, base) = self.parse_typed_operand()?;

        let mut shape = base_ty.is_vector().then(|| base_ty.clone());
        let mut operands = vec![base];
        let mut const_indices = Vec::new();
        while self.at(&TokenKind::Comma)
            && (is_type_start(self.peek_nth(1))
                || matches!(self.peek_nth(1), TokenKind::Word(w) if w == "inrange"))
        {
            self.bump();
            self.skip_inrange()?;
            let (index_ty, index) = self.parse_typed_operand()?;
            if shape.is_none() && index_ty.is_vector() {
                shape = Some(index_ty);
            }
            const_indices.push(constant_index(&index));
            operands.push(index);
        }

        let ptr = match base_ty.scalar_type() {
            Type::Pointer {
                pointee: Some(_),
                addrspace,
            } => {
                let steps = const_indices.get(1..).unwrap_or(&[]);
                let elem = self
                    .types
                    .indexed_type(&source, steps)
                    .map_err(|e| self.error_at(&gep_tok, e))?;
                Type::Pointer {
                    pointee: Some(Box::new(elem)),
                    addrspace: *addrspace,
                }
            }
            other => other.clone(),
        };
        let ty = match &shape {
            Some(shape) => Type::with_vector_shape_of(shape, ptr),
            None => ptr,
        };
        Ok(ParsedInst::plain(Opcode::GetElementPtr, ty, operands))
    }

    fn skip_inrange(&mut self) -> Result<()> {
        if self.eat_word("inrange") && self.at(&TokenKind::LParen) {
            self.skip_group()?;
        }
        Ok(())
    }

    /// `phi T [ %v, %bb ], ...`
    fn parse_phi(&mut self) -> Result<ParsedInst> {
        self.eat_words(FAST_MATH_FLAGS);
        let ty = self.parse_type()?;
        let mut operands = Vec::new();
        let mut incoming = Vec::new();
        loop {
            self.expect(TokenKind::LBracket, "'['")?;
            operands.push(self.parse_operand(ty.clone())?);
            self.expect(TokenKind::Comma, "','")?;
            let at = self.current_pos();
            let key = match self.peek() {
                TokenKind::LocalVar(name) => LocalKey::Named(name.clone()),
                TokenKind::LocalId(slot) => LocalKey::Numbered(*slot),
                _ => return Err(self.unexpected("an incoming block")),
            };
            self.bump();
            incoming.push((key, at));
            self.expect(TokenKind::RBracket, "']'")?;
            if !(self.at(&TokenKind::Comma) && self.peek_nth(1) == &TokenKind::LBracket) {
                break;
            }
            self.bump();
        }
        Ok(ParsedInst {
            opcode: Opcode::Phi,
            ty,
            operands,
            kind: PendingKind::Phi(incoming),
        })
    }

    /// `call [cc] [ret attrs] <ty> <callee>(<args>) [fn attrs]`.
    /// Operands are the arguments followed by the callee.
    fn parse_call(&mut self) -> Result<ParsedInst> {
        self.eat_words(FAST_MATH_FLAGS);
        while let TokenKind::Word(word) = self.peek() {
            if is_type_start(self.peek()) {
                break;
            }
            let takes_int = matches!(word.as_str(), "align" | "cc");
            self.bump();
            if self.at(&TokenKind::LParen) {
                self.skip_group()?;
            } else if takes_int && matches!(self.peek(), TokenKind::Int(_)) {
                self.bump();
            }
        }

        let ret_or_fn = self.parse_type()?;
        // The callee's type depends on the arguments; it is fixed up below.
        let mut callee = self.parse_operand(Type::Void)?;

        self.expect(TokenKind::LParen, "'('")?;
        let mut operands = Vec::new();
        let mut arg_types = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                let ty = self.parse_type()?;
                self.skip_param_attrs()?;
                operands.push(self.parse_operand(ty.clone())?);
                arg_types.push(ty);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "')'")?;
        }

        let fn_ty = match ret_or_fn {
            Type::Function(fn_ty) => fn_ty,
            ret => FunctionType {
                ret: Box::new(ret),
                params: arg_types,
                vararg: false,
            },
        };
        let ty = (*fn_ty.ret).clone();
        callee.set_type(self.pointer_to(Type::Function(fn_ty)));
        operands.push(callee);
        Ok(ParsedInst::plain(Opcode::Call, ty, operands))
    }

    fn skip_param_attrs(&mut self) -> Result<()> {
        while let TokenKind::Word(word) = self.peek() {
            if !PARAM_ATTRS.contains(&word.as_str()) {
                break;
            }
            let takes_int = word == "align";
            self.bump();
            if self.at(&TokenKind::LParen) {
                self.skip_group()?;
            } else if takes_int && matches!(self.peek(), TokenKind::Int(_)) {
                self.bump();
            }
        }
        Ok(())
    }

    /// `, 0, 1` after an aggregate operand.
    fn parse_aggregate_indices(&mut self) -> Result<Vec<Option<u64>>> {
        let mut indices = Vec::new();
        while self.at(&TokenKind::Comma) && matches!(self.peek_nth(1), TokenKind::Int(_)) {
            self.bump();
            indices.push(Some(self.expect_int("an index")?));
        }
        if indices.is_empty() {
            return Err(self.unexpected("',' followed by an index"));
        }
        Ok(indices)
    }

    // ── Operands ────────────────────────────────────────────────────────────

    fn parse_typed_operand(&mut self) -> Result<(Type, PendingOperand)> {
        let ty = self.parse_type()?;
        let operand = self.parse_operand(ty.clone())?;
        Ok((ty, operand))
    }

    /// An operand of known type: a local, a global, a constant or metadata.
    pub(super) fn parse_operand(&mut self, ty: Type) -> Result<PendingOperand> {
        if ty == Type::Metadata {
            let text = self.parse_metadata_text()?;
            return Ok(PendingOperand::Value(ValueData::constant(ty, text)));
        }
        let at = self.current_pos();
        let operand = match self.peek() {
            TokenKind::LocalVar(name) => PendingOperand::Local {
                key: LocalKey::Named(name.clone()),
                ty,
                at,
            },
            TokenKind::LocalId(slot) => PendingOperand::Local {
                key: LocalKey::Numbered(*slot),
                ty,
                at,
            },
            TokenKind::GlobalVar(name) => PendingOperand::Value(ValueData::global(name.clone(), ty)),
            TokenKind::GlobalId(slot) => PendingOperand::Value(ValueData {
                name: String::new(),
                slot: Some(*slot),
                ty,
                kind: ValueKind::Global,
            }),
            _ => {
                let text = self.parse_constant_text()?;
                return Ok(PendingOperand::Value(ValueData::constant(ty, text)));
            }
        };
        self.bump();
        Ok(operand)
    }

    /// Source text of a constant, normalized to single spaces.
    fn parse_constant_text(&mut self) -> Result<String> {
        let start = self.pos;
        match self.peek() {
            TokenKind::Int(_) | TokenKind::Float(_) | TokenKind::CStr(_) => {
                self.bump();
            }
            TokenKind::LBracket | TokenKind::LBrace | TokenKind::Less => self.skip_group()?,
            TokenKind::Word(word) => match word.as_str() {
                "true" | "false" | "null" | "undef" | "poison" | "zeroinitializer" | "none" => {
                    self.bump();
                }
                // Inline assembly callee: `asm sideeffect "nop", "~{memory}"`.
                "asm" => {
                    self.bump();
                    self.eat_words(ASM_FLAGS);
                    self.expect_str("an assembly string")?;
                    self.expect(TokenKind::Comma, "','")?;
                    self.expect_str("a constraint string")?;
                }
                "dso_local_equivalent" | "no_cfi" => {
                    self.bump();
                    if !matches!(self.peek(), TokenKind::GlobalVar(_) | TokenKind::GlobalId(_)) {
                        return Err(self.unexpected("a global"));
                    }
                    self.bump();
                }
                // Constant expressions: `getelementptr inbounds (...)`,
                // `bitcast (...)`, `blockaddress(@f, %bb)`.
                _ => {
                    while matches!(self.peek(), TokenKind::Word(_)) {
                        self.bump();
                    }
                    if !self.at(&TokenKind::LParen) {
                        return Err(self.unexpected("a value"));
                    }
                    self.skip_group()?;
                }
            },
            _ => return Err(self.unexpected("a value")),
        }
        Ok(self.text_from(start))
    }

    fn expect_str(&mut self, what: &str) -> Result<()> {
        if !matches!(self.peek(), TokenKind::Str(_)) {
            return Err(self.unexpected(what));
        }
        self.bump();
        Ok(())
    }

    /// `!7`, `!{...}`, `!"str"`, `!DILocation(...)` or `<ty> <value>`.
    fn parse_metadata_text(&mut self) -> Result<String> {
        let start = self.pos;
        match self.peek() {
            TokenKind::Metadata(_) => {
                self.bump();
                if self.at(&TokenKind::LParen) {
                    self.skip_group()?;
                }
            }
            TokenKind::Bang => {
                self.bump();
                if self.at(&TokenKind::LBrace) {
                    self.skip_group()?;
                } else if matches!(self.peek(), TokenKind::Str(_)) {
                    self.bump();
                } else {
                    return Err(self.unexpected("metadata"));
                }
            }
            _ => {
                self.parse_type()?;
                if matches!(
                    self.peek(),
                    TokenKind::LocalVar(_)
                        | TokenKind::LocalId(_)
                        | TokenKind::GlobalVar(_)
                        | TokenKind::GlobalId(_)
                ) {
                    self.bump();
                } else {
                    self.parse_constant_text()?;
                }
            }
        }
        Ok(self.text_from(start))
    }
}

/// Numeric value of a constant integer operand (struct field selectors).
fn constant_index(operand: &PendingOperand) -> Option<u64> {
    match operand {
        PendingOperand::Value(ValueData {
            kind: ValueKind::Constant { text },
            ..
        }) => text.parse().ok(),
        _ => None,
    }
}
