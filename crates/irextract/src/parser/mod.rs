//! Textual IR frontend.
//!
//! Parses the subset of the host compiler's textual IR (`.ll`) needed to load
//! real compiler output into an [`ir::Module`](crate::ir::Module).
//!
//! ## Structure
//!
//! | Module       | Responsibility                                           |
//! |--------------|----------------------------------------------------------|
//! | [`lexer`]    | tokens with byte spans and line/column positions         |
//! | `types`      | type syntax, named struct definitions                    |
//! | `function`   | function headers, bodies, slot numbering, use resolution |
//! | `instr`      | per-opcode instruction syntax and result types           |
//!
//! Everything at module level that is not a function or a named type
//! (globals, attribute groups, metadata, target info) is skipped.

pub mod lexer;

mod function;
mod instr;
mod types;

use crate::ir::{quote_name, Module, StructBody, Type, TypeTable};
use anyhow::{anyhow, bail, Result};
use lexer::{tokenize, Token, TokenKind};
use log::debug;
use std::collections::HashMap;
use std::fmt;

/// Parse a whole module.
pub fn parse_module(src: &str) -> Result<Module> {
    let tokens = tokenize(src)?;
    let opaque_pointers = tokens
        .iter()
        .any(|t| matches!(&t.kind, TokenKind::Word(w) if w == "ptr"));
    let mut parser = Parser::new(src, tokens, opaque_pointers);
    parser.parse_module()
}

/// Source position used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pos {
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Token cursor shared by all parsing stages.
pub(crate) struct Parser<'src> {
    src: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    opaque_pointers: bool,
    types: TypeTable,
}

impl<'src> Parser<'src> {
    fn new(src: &'src str, tokens: Vec<Token>, opaque_pointers: bool) -> Self {
        Self {
            src,
            tokens,
            pos: 0,
            opaque_pointers,
            types: TypeTable::new(),
        }
    }

    fn parse_module(&mut self) -> Result<Module> {
        self.prescan_named_types()?;

        let mut functions = Vec::new();
        let mut defined: HashMap<String, Pos> = HashMap::new();
        while !self.at(&TokenKind::Eof) {
            let at = self.current_pos();
            let func = if self.eat_word("define") {
                self.parse_define()?
            } else if self.eat_word("declare") {
                self.parse_declare()?
            } else {
                if self.at_word("attributes") {
                    self.skip_attribute_group()?;
                } else {
                    // Globals, named types (already collected), metadata,
                    // target triple, source_filename, comdats...
                    self.skip_line();
                }
                continue;
            };
            // Numbered functions are not checked.
            if !func.name.is_empty() {
                if let Some(first) = defined.insert(func.name.clone(), at) {
                    bail!(
                        "{}: invalid redefinition of function '@{}' (first defined at {})",
                        at,
                        quote_name(&func.name),
                        first
                    );
                }
            }
            functions.push(func);
        }

        debug!(
            "parsed module: {} functions, {} named types",
            functions.len(),
            self.types.len()
        );
        Ok(Module {
            types: std::mem::take(&mut self.types),
            functions,
            opaque_pointers: self.opaque_pointers,
        })
    }

    /// Collect `%T = type ...` definitions up front so function bodies can
    /// index into structs defined anywhere in the module.
    fn prescan_named_types(&mut self) -> Result<()> {
        while !self.at(&TokenKind::Eof) {
            let is_type_def = self.tok().col == 1
                && matches!(self.peek(), TokenKind::LocalVar(_) | TokenKind::LocalId(_))
                && self.peek_nth(1) == &TokenKind::Equal
                && matches!(self.peek_nth(2), TokenKind::Word(w) if w == "type");
            if is_type_def {
                self.parse_named_type()?;
            } else {
                self.bump();
            }
        }
        self.pos = 0;
        Ok(())
    }

    fn parse_named_type(&mut self) -> Result<()> {
        let name = match self.peek() {
            TokenKind::LocalVar(name) => name.clone(),
            TokenKind::LocalId(id) => id.to_string(),
            _ => return Err(self.unexpected("a type name")),
        };
        self.bump();
        self.expect(TokenKind::Equal, "'='")?;
        self.expect_word("type")?;

        let body = if self.eat_word("opaque") {
            StructBody {
                fields: None,
                packed: false,
            }
        } else {
            let start = self.tok().clone();
            match self.parse_type()? {
                Type::Struct(crate::ir::StructType::Literal { fields, packed }) => StructBody {
                    fields: Some(fields),
                    packed,
                },
                other => {
                    return Err(self.error_at(
                        &start,
                        format!("named type %{} must be a struct, found {}", name, other),
                    ))
                }
            }
        };
        self.types.define(name, body);
        Ok(())
    }

    /// `attributes #0 = { ... }` may span several lines.
    fn skip_attribute_group(&mut self) -> Result<()> {
        while !self.at(&TokenKind::LBrace) && !self.at(&TokenKind::Eof) {
            self.bump();
        }
        if self.at(&TokenKind::LBrace) {
            self.skip_group()?;
        }
        Ok(())
    }

    // ── Token cursor ────────────────────────────────────────────────────────

    fn tok(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek(&self) -> &TokenKind {
        &self.tok().kind
    }

    fn peek_nth(&self, n: usize) -> &TokenKind {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn current_pos(&self) -> Pos {
        let tok = self.tok();
        Pos {
            line: tok.line,
            col: tok.col,
        }
    }

    /// Consume the current token. The cursor never moves past `Eof`.
    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        if self.at(&kind) {
            Ok(self.bump())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn at_word(&self, word: &str) -> bool {
        matches!(self.peek(), TokenKind::Word(w) if w == word)
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<()> {
        if self.eat_word(word) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", word)))
        }
    }

    /// Consume any run of the given keywords (instruction flags).
    fn eat_words(&mut self, words: &[&str]) {
        while matches!(self.peek(), TokenKind::Word(w) if words.contains(&w.as_str())) {
            self.bump();
        }
    }

    fn expect_int<T: std::str::FromStr>(&mut self, what: &str) -> Result<T> {
        if let TokenKind::Int(text) = self.peek() {
            if let Ok(value) = text.parse::<T>() {
                self.bump();
                return Ok(value);
            }
        }
        Err(self.unexpected(what))
    }

    /// Skip every token on the current token's line.
    fn skip_line(&mut self) {
        let line = self.tok().line;
        while !self.at(&TokenKind::Eof) && self.tok().line == line {
            self.bump();
        }
    }

    /// Skip the remaining tokens on the line of the last consumed token
    /// (alignment, metadata attachments, function attributes).
    fn skip_rest_of_line(&mut self) {
        let Some(prev) = self.pos.checked_sub(1).map(|p| self.tokens[p].line) else {
            return;
        };
        while !self.at(&TokenKind::Eof) && self.tok().line == prev {
            self.bump();
        }
    }

    /// Skip a bracketed group starting at the current opener, including all
    /// nested groups.
    fn skip_group(&mut self) -> Result<()> {
        let open = self.tok().clone();
        let mut stack: Vec<TokenKind> = Vec::new();
        loop {
            let closer = match self.peek() {
                TokenKind::LParen => Some(TokenKind::RParen),
                TokenKind::LBracket => Some(TokenKind::RBracket),
                TokenKind::LBrace => Some(TokenKind::RBrace),
                TokenKind::Less => Some(TokenKind::Greater),
                _ => None,
            };
            if let Some(closer) = closer {
                stack.push(closer);
            } else if self.at(&TokenKind::Eof) {
                return Err(self.error_at(&open, "unbalanced brackets"));
            } else if stack.last() == Some(self.peek()) {
                stack.pop();
            }
            self.bump();
            if stack.is_empty() {
                return Ok(());
            }
        }
    }

    /// Source text from token `start` up to the last consumed token, with
    /// whitespace runs outside string literals collapsed to one space.
    fn text_from(&self, start: usize) -> String {
        if self.pos <= start {
            return String::new();
        }
        let begin = self.tokens[start].start;
        let end = self.tokens[self.pos - 1].end;
        collapse_whitespace(&self.src[begin..end])
    }

    // ── Errors ──────────────────────────────────────────────────────────────

    fn error_at(&self, tok: &Token, msg: impl fmt::Display) -> anyhow::Error {
        anyhow!("{}:{}: {}", tok.line, tok.col, msg)
    }

    fn unexpected(&self, expected: &str) -> anyhow::Error {
        let tok = self.tok();
        let found = if tok.kind == TokenKind::Eof {
            "end of file".to_string()
        } else {
            format!("'{}'", &self.src[tok.start..tok.end])
        };
        self.error_at(tok, format!("expected {}, found {}", expected, found))
    }

    fn pointer_to(&self, pointee: Type) -> Type {
        if self.opaque_pointers {
            Type::opaque_pointer()
        } else {
            Type::pointer_to(pointee)
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut pending_space = false;
    for c in text.chars() {
        if !in_string && c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        if c == '"' {
            in_string = !in_string;
        }
        out.push(c);
    }
    out
}
