//! Function headers and bodies.
//!
//! Bodies are parsed in one pass into pending instructions whose local
//! operands are still names. [`BodyBuilder::finish`] then lays out the value
//! arena (arguments, block labels, instruction results, in that order) and
//! resolves every use, so forward references to later blocks and to values
//! defined further down (phi operands) need no special casing.

use super::instr::ParsedInst;
use super::lexer::TokenKind;
use super::types::is_type_word;
use super::{Parser, Pos};
use crate::ir::{
    Block, BlockId, Function, InstId, InstKind, Instruction, Type, ValueData, ValueId, ValueKind,
};
use anyhow::{bail, Result};
use log::debug;
use std::collections::HashMap;
use std::fmt;

/// Name of a local value as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) enum LocalKey {
    Named(String),
    Numbered(u32),
}

impl fmt::Display for LocalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalKey::Named(name) => write!(f, "%{}", crate::ir::quote_name(name)),
            LocalKey::Numbered(slot) => write!(f, "%{}", slot),
        }
    }
}

/// An operand before use resolution.
#[derive(Debug, Clone)]
pub(super) enum PendingOperand {
    /// Reference to a local, checked against its definition's type.
    Local { key: LocalKey, ty: Type, at: Pos },
    /// Constants, globals and metadata; these never need resolving.
    Value(ValueData),
}

impl PendingOperand {
    pub(super) fn set_type(&mut self, new_ty: Type) {
        match self {
            PendingOperand::Local { ty, .. } => *ty = new_ty,
            PendingOperand::Value(data) => data.ty = new_ty,
        }
    }
}

#[derive(Debug, Clone)]
pub(super) enum PendingKind {
    Plain,
    Compare(crate::ir::Predicate),
    Alloca(Type),
    /// Incoming block labels, one per operand.
    Phi(Vec<(LocalKey, Pos)>),
}

struct PendingInst {
    /// `None` for void results.
    result: Option<LocalKey>,
    parsed: ParsedInst,
    at: Pos,
}

struct PendingBlock {
    key: LocalKey,
    at: Pos,
    insts: Vec<PendingInst>,
}

struct Param {
    ty: Type,
    key: LocalKey,
    at: Pos,
}

pub(super) struct FunctionHeader {
    name: String,
    ret_type: Type,
    params: Vec<(Type, Option<LocalKey>, Pos)>,
    vararg: bool,
}

impl Parser<'_> {
    /// `declare` has been consumed.
    pub(super) fn parse_declare(&mut self) -> Result<Function> {
        let header = self.parse_function_header()?;
        self.skip_rest_of_line();
        debug!("declaration @{}", header.name);
        BodyBuilder::new(header)?.finish()
    }

    /// `define` has been consumed.
    pub(super) fn parse_define(&mut self) -> Result<Function> {
        let header = self.parse_function_header()?;
        debug!("definition @{}", header.name);

        // Function attributes, section, personality, ... up to the body.
        while !self.at(&TokenKind::LBrace) && !self.at(&TokenKind::Eof) {
            self.bump();
        }
        self.expect(TokenKind::LBrace, "'{'")?;

        let mut body = BodyBuilder::new(header)?;
        loop {
            match self.peek() {
                TokenKind::RBrace => {
                    self.bump();
                    break;
                }
                TokenKind::Eof => return Err(self.unexpected("'}' at end of function body")),
                TokenKind::Label(text) => {
                    let key = label_key(text.clone());
                    let at = self.current_pos();
                    self.bump();
                    body.start_block(key, at)?;
                }
                // Debug records (`#dbg_value(...)`) are not instructions.
                TokenKind::Hash(_) => self.skip_line(),
                _ => self.parse_statement(&mut body)?,
            }
        }
        body.finish()
    }

    fn parse_statement(&mut self, body: &mut BodyBuilder) -> Result<()> {
        let at = self.current_pos();
        let result = match (self.peek(), self.peek_nth(1)) {
            (TokenKind::LocalVar(name), TokenKind::Equal) => Some(LocalKey::Named(name.clone())),
            (TokenKind::LocalId(slot), TokenKind::Equal) => Some(LocalKey::Numbered(*slot)),
            _ => None,
        };
        if result.is_some() {
            self.bump();
            self.bump();
        }
        let parsed = self.parse_instruction()?;
        self.skip_rest_of_line();
        body.push_inst(result, parsed, at)
    }

    fn parse_function_header(&mut self) -> Result<FunctionHeader> {
        // Linkage, visibility, calling convention and return attributes.
        self.skip_attributes()?;
        let ret_type = self.parse_type()?;

        let name = match self.peek().clone() {
            TokenKind::GlobalVar(name) => name,
            // Numbered functions have no name of their own.
            TokenKind::GlobalId(_) => String::new(),
            _ => return Err(self.unexpected("a function name")),
        };
        self.bump();

        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        let mut vararg = false;
        if !self.eat(&TokenKind::RParen) {
            loop {
                if self.eat(&TokenKind::Ellipsis) {
                    vararg = true;
                    break;
                }
                let at = self.current_pos();
                let ty = self.parse_type()?;
                self.skip_attributes()?;
                let key = match self.peek().clone() {
                    TokenKind::LocalVar(name) => Some(LocalKey::Named(name)),
                    TokenKind::LocalId(slot) => Some(LocalKey::Numbered(slot)),
                    _ => None,
                };
                if key.is_some() {
                    self.bump();
                }
                params.push((ty, key, at));
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "')'")?;
        }

        Ok(FunctionHeader {
            name,
            ret_type,
            params,
            vararg,
        })
    }

    /// Skip keywords that are not types, with their parenthesized or integer
    /// arguments (`align 8`, `dereferenceable(4)`, `cc 10`).
    fn skip_attributes(&mut self) -> Result<()> {
        while let TokenKind::Word(word) = self.peek() {
            if is_type_word(word) {
                break;
            }
            self.bump();
            if self.at(&TokenKind::LParen) {
                self.skip_group()?;
            } else if matches!(self.peek(), TokenKind::Int(_)) {
                self.bump();
            }
        }
        // Parameter attribute group references: `#0`.
        while matches!(self.peek(), TokenKind::Hash(_)) {
            self.bump();
        }
        Ok(())
    }
}

fn label_key(text: String) -> LocalKey {
    match text.parse::<u32>() {
        Ok(slot) if text.bytes().all(|b| b.is_ascii_digit()) => LocalKey::Numbered(slot),
        _ => LocalKey::Named(text),
    }
}

/// Accumulates a function body and enforces slot numbering: unnamed
/// arguments, blocks and non-void results take consecutive numbers, and an
/// explicit `%N` must be the next number in sequence.
pub(super) struct BodyBuilder {
    name: String,
    ret_type: Type,
    vararg: bool,
    params: Vec<Param>,
    blocks: Vec<PendingBlock>,
    next_slot: u32,
}

impl BodyBuilder {
    fn new(header: FunctionHeader) -> Result<Self> {
        let mut builder = Self {
            name: header.name,
            ret_type: header.ret_type,
            vararg: header.vararg,
            params: Vec::with_capacity(header.params.len()),
            blocks: Vec::new(),
            next_slot: 0,
        };
        for (ty, key, at) in header.params {
            let key = builder.number(key, at, "argument")?;
            builder.params.push(Param { ty, key, at });
        }
        Ok(builder)
    }

    /// Assign the next slot to an unnamed definition, or check an explicit one.
    fn number(&mut self, key: Option<LocalKey>, at: Pos, what: &str) -> Result<LocalKey> {
        match key {
            Some(LocalKey::Numbered(slot)) => {
                if slot != self.next_slot {
                    bail!(
                        "{}: {} expected to be numbered '%{}', found '%{}'",
                        at,
                        what,
                        self.next_slot,
                        slot
                    );
                }
                self.next_slot += 1;
                Ok(LocalKey::Numbered(slot))
            }
            Some(named) => Ok(named),
            None => {
                let slot = self.next_slot;
                self.next_slot += 1;
                Ok(LocalKey::Numbered(slot))
            }
        }
    }

    fn start_block(&mut self, key: LocalKey, at: Pos) -> Result<()> {
        let key = self.number(Some(key), at, "label")?;
        self.blocks.push(PendingBlock {
            key,
            at,
            insts: Vec::new(),
        });
        Ok(())
    }

    fn push_inst(&mut self, result: Option<LocalKey>, parsed: ParsedInst, at: Pos) -> Result<()> {
        // An instruction without a label opens an implicitly numbered block:
        // the entry block, or the block after a terminator.
        let needs_block = match self.blocks.last() {
            None => true,
            Some(block) => block
                .insts
                .last()
                .is_some_and(|inst| inst.parsed.opcode.is_terminator()),
        };
        if needs_block {
            let key = self.number(None, at, "label")?;
            self.blocks.push(PendingBlock {
                key,
                at,
                insts: Vec::new(),
            });
        }

        let result = if parsed.ty.is_void() {
            if let Some(key) = result {
                bail!("{}: instructions returning void cannot have a name ({})", at, key);
            }
            None
        } else {
            Some(self.number(result, at, "instruction")?)
        };

        if let Some(block) = self.blocks.last_mut() {
            block.insts.push(PendingInst { result, parsed, at });
        }
        Ok(())
    }

    /// Lay out the value arena and resolve every operand.
    fn finish(self) -> Result<Function> {
        let mut values: Vec<ValueData> = Vec::new();
        let mut defs: HashMap<LocalKey, ValueId> = HashMap::new();

        fn define(
            values: &mut Vec<ValueData>,
            defs: &mut HashMap<LocalKey, ValueId>,
            key: Option<&LocalKey>,
            ty: Type,
            kind: ValueKind,
            at: Pos,
        ) -> Result<ValueId> {
            let (name, slot) = match key {
                Some(LocalKey::Named(name)) => (name.clone(), None),
                Some(LocalKey::Numbered(slot)) => (String::new(), Some(*slot)),
                None => (String::new(), None),
            };
            let id = ValueId::new(values.len());
            values.push(ValueData {
                name,
                slot,
                ty,
                kind,
            });
            if let Some(key) = key {
                if defs.insert(key.clone(), id).is_some() {
                    bail!("{}: redefinition of value '{}'", at, key);
                }
            }
            Ok(id)
        }

        let mut args = Vec::with_capacity(self.params.len());
        for (index, param) in self.params.iter().enumerate() {
            args.push(define(
                &mut values,
                &mut defs,
                Some(&param.key),
                param.ty.clone(),
                ValueKind::Argument { index },
                param.at,
            )?);
        }

        let mut blocks = Vec::with_capacity(self.blocks.len());
        for (index, block) in self.blocks.iter().enumerate() {
            let label = define(
                &mut values,
                &mut defs,
                Some(&block.key),
                Type::Label,
                ValueKind::Block(BlockId::new(index)),
                block.at,
            )?;
            let name = match &block.key {
                LocalKey::Named(name) => name.clone(),
                LocalKey::Numbered(_) => String::new(),
            };
            blocks.push(Block {
                name,
                label,
                insts: Vec::with_capacity(block.insts.len()),
            });
        }

        let mut results = Vec::new();
        for (block_index, block) in self.blocks.iter().enumerate() {
            for pending in &block.insts {
                let inst_id = InstId::new(results.len());
                let result = define(
                    &mut values,
                    &mut defs,
                    pending.result.as_ref(),
                    pending.parsed.ty.clone(),
                    ValueKind::Instruction(inst_id),
                    pending.at,
                )?;
                results.push(result);
                blocks[block_index].insts.push(inst_id);
            }
        }

        let mut insts = Vec::with_capacity(results.len());
        let pending_insts = self.blocks.into_iter().flat_map(|block| block.insts);
        for (pending, result) in pending_insts.zip(results) {
            let ParsedInst {
                opcode,
                operands: pending_operands,
                kind,
                ..
            } = pending.parsed;

            let mut operands = Vec::with_capacity(pending_operands.len());
            for operand in pending_operands {
                let id = match operand {
                    PendingOperand::Value(data) => {
                        values.push(data);
                        ValueId::new(values.len() - 1)
                    }
                    PendingOperand::Local { key, ty, at } => {
                        let Some(&id) = defs.get(&key) else {
                            bail!("{}: use of undefined value '{}'", at, key);
                        };
                        let defined = &values[id.as_usize()].ty;
                        if *defined != ty {
                            bail!(
                                "{}: '{}' defined with type '{}' but expected '{}'",
                                at,
                                key,
                                defined,
                                ty
                            );
                        }
                        id
                    }
                };
                operands.push(id);
            }

            let kind = match kind {
                PendingKind::Plain => InstKind::Plain,
                PendingKind::Compare(pred) => InstKind::Compare(pred),
                PendingKind::Alloca(allocated) => InstKind::Alloca { allocated },
                PendingKind::Phi(labels) => {
                    let mut incoming = Vec::with_capacity(labels.len());
                    for (key, at) in labels {
                        let block = defs.get(&key).map(|id| &values[id.as_usize()].kind);
                        let Some(ValueKind::Block(block)) = block else {
                            bail!("{}: '{}' is not a basic block", at, key);
                        };
                        incoming.push(*block);
                    }
                    InstKind::Phi { incoming }
                }
            };

            insts.push(Instruction {
                result,
                opcode,
                operands,
                kind,
            });
        }

        Ok(Function {
            name: self.name,
            ret_type: self.ret_type,
            vararg: self.vararg,
            args,
            blocks,
            values,
            insts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse_module;
    use crate::ir::{Function, Opcode, Type, ValueKind};

    fn parse_one(src: &str) -> Function {
        let mut module = parse_module(src).unwrap();
        assert_eq!(module.functions.len(), 1);
        module.functions.remove(0)
    }

    fn parse_err(src: &str) -> String {
        parse_module(src).unwrap_err().to_string()
    }

    #[test]
    fn test_simple_function() {
        let func = parse_one(
            "define i32 @id(i32 %a) {\n\
             entry:\n  ret i32 %a\n\
             }\n",
        );
        assert_eq!(func.name, "id");
        assert_eq!(func.ret_type, Type::int(32));
        assert_eq!(func.args.len(), 1);
        assert_eq!(func.value(func.args[0]).name, "a");
        assert_eq!(func.blocks.len(), 1);
        assert_eq!(func.blocks[0].name, "entry");

        let ret = func.inst(func.blocks[0].insts[0]);
        assert_eq!(ret.opcode, Opcode::Ret);
        assert_eq!(ret.operands, vec![func.args[0]]);
        assert!(func.value(ret.result).ty.is_void());
    }

    #[test]
    fn test_implicit_numbering() {
        let func = parse_one(
            "define i32 @f(i32, i32) {\n\
               %3 = add i32 %0, %1\n\
               br label %4\n\
             4:\n\
               ret i32 %3\n\
             }\n",
        );
        assert_eq!(func.value(func.args[0]).slot, Some(0));
        assert_eq!(func.value(func.args[1]).slot, Some(1));
        // The unlabeled entry block takes slot 2.
        assert_eq!(func.value(func.blocks[0].label).slot, Some(2));
        assert_eq!(func.blocks[0].name, "");
        assert_eq!(func.value(func.blocks[1].label).slot, Some(4));
        let add = func.inst(func.blocks[0].insts[0]);
        assert_eq!(func.value(add.result).slot, Some(3));
        assert_eq!(func.value(add.result).name, "");
    }

    #[test]
    fn test_numbering_must_be_sequential() {
        let err = parse_err("define void @f() {\n  %5 = add i32 1, 2\n  ret void\n}\n");
        assert!(
            err.contains("instruction expected to be numbered '%1', found '%5'"),
            "{err}"
        );
    }

    #[test]
    fn test_forward_references_resolve() {
        let func = parse_one(
            "define i32 @loop(i32 %n) {\n\
             entry:\n  br label %head\n\
             head:\n\
               %i = phi i32 [ 0, %entry ], [ %next, %head ]\n\
               %next = add nsw i32 %i, 1\n\
               %done = icmp eq i32 %next, %n\n\
               br i1 %done, label %exit, label %head\n\
             exit:\n  ret i32 %i\n\
             }\n",
        );
        let names: Vec<&str> = func.blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["entry", "head", "exit"]);

        let phi = func.inst(func.blocks[1].insts[0]);
        let next = func.inst(func.blocks[1].insts[1]);
        assert_eq!(phi.operands[1], next.result);
        assert!(matches!(
            &func.value(phi.operands[0]).kind,
            ValueKind::Constant { text } if text == "0"
        ));
    }

    #[test]
    fn test_undefined_value() {
        let err = parse_err("define i32 @f() {\n  ret i32 %missing\n}\n");
        assert_eq!(err, "2:11: use of undefined value '%missing'");
    }

    #[test]
    fn test_redefinition() {
        let err = parse_err(
            "define i32 @f(i32 %x) {\n  %x = add i32 1, 2\n  ret i32 %x\n}\n",
        );
        assert!(err.contains("redefinition of value '%x'"), "{err}");
    }

    #[test]
    fn test_type_mismatch() {
        let err = parse_err("define i64 @f(i32 %x) {\n  ret i64 %x\n}\n");
        assert!(
            err.contains("'%x' defined with type 'i32' but expected 'i64'"),
            "{err}"
        );
    }

    #[test]
    fn test_named_void_result_is_rejected() {
        let err = parse_err("define void @f(ptr %p) {\n  %s = store i32 0, ptr %p\n  ret void\n}\n");
        assert!(err.contains("cannot have a name"), "{err}");
    }

    #[test]
    fn test_unterminated_body() {
        let err = parse_err("define void @f() {\n  ret void\n");
        assert!(err.contains("expected '}' at end of function body"), "{err}");
    }

    #[test]
    fn test_header_attributes_and_debug_records_are_skipped() {
        let func = parse_one(
            "define dso_local noundef i32 @main(i32 noundef %argc, ptr nocapture readonly %argv) local_unnamed_addr #0 !dbg !9 {\n\
             entry:\n\
                 #dbg_value(i32 %argc, !15, !DIExpression(), !17)\n\
               ret i32 0, !dbg !18\n\
             }\n",
        );
        assert_eq!(func.name, "main");
        assert_eq!(func.args.len(), 2);
        assert_eq!(func.value(func.args[1]).ty, Type::opaque_pointer());
        assert_eq!(func.blocks[0].insts.len(), 1);
    }

    #[test]
    fn test_quoted_names() {
        let func = parse_one(
            "define void @\"odd name\"(i32 %\"a b\") {\n\
             \"my block\":\n  ret void\n\
             }\n",
        );
        assert_eq!(func.name, "odd name");
        assert_eq!(func.value(func.args[0]).name, "a b");
        assert_eq!(func.blocks[0].name, "my block");
    }
}
