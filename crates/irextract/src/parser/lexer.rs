//! Tokenizer for textual IR.
//!
//! Comments (`;` to end of line) and whitespace are dropped. Every token
//! keeps its byte span and line/column so the parser can report positions
//! and slice constant text out of the source.

use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `%name` or `%"quoted name"`
    LocalVar(String),
    /// `%7`
    LocalId(u32),
    /// `@name` or `@"quoted name"`
    GlobalVar(String),
    /// `@7`
    GlobalId(u32),
    /// Label definition: `entry:`, `7:`, `"quoted":`
    Label(String),
    /// Keywords, type names and other bare identifiers.
    Word(String),
    Int(String),
    Float(String),
    /// `"..."` with escapes resolved.
    Str(String),
    /// `c"..."`
    CStr(String),
    /// `!name`, `!7`
    Metadata(String),
    /// Bare `!` (before `{` or a string).
    Bang,
    /// `#0`, `#dbg_value`
    Hash(String),
    Equal,
    Comma,
    Star,
    Ellipsis,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Less,
    Greater,
    /// Anything else (`:` and `|` inside metadata, ...).
    Other(char),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub col: u32,
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'$' | b'.' | b'_')
}

/// Value and label names end up in JSON strings, so they must be UTF-8.
/// String and `c"..."` payloads are never rendered from the decoded bytes.
fn utf8_name(bytes: Vec<u8>, line: u32, col: u32) -> Result<String> {
    match String::from_utf8(bytes) {
        Ok(name) => Ok(name),
        Err(_) => bail!("{}:{}: name is not valid UTF-8", line, col),
    }
}

struct Lexer<'src> {
    text: &'src str,
    src: &'src [u8],
    pos: usize,
    line: u32,
    line_start: usize,
}

/// Split `src` into tokens, ending with a single [`TokenKind::Eof`].
pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer {
        text: src,
        src: src.as_bytes(),
        pos: 0,
        line: 1,
        line_start: 0,
    };
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }
    Ok(tokens)
}

impl<'src> Lexer<'src> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn skip_trivia(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    self.line_start = self.pos;
                }
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b';' => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia();
        let start = self.pos;
        let line = self.line;
        let col = (start - self.line_start + 1) as u32;
        let kind = match self.peek() {
            None => TokenKind::Eof,
            Some(b) => self.lex_token(b, line, col)?,
        };
        Ok(Token {
            kind,
            start,
            end: self.pos,
            line,
            col,
        })
    }

    fn lex_token(&mut self, b: u8, line: u32, col: u32) -> Result<TokenKind> {
        let punct = match b {
            b'=' => Some(TokenKind::Equal),
            b',' => Some(TokenKind::Comma),
            b'*' => Some(TokenKind::Star),
            b'(' => Some(TokenKind::LParen),
            b')' => Some(TokenKind::RParen),
            b'[' => Some(TokenKind::LBracket),
            b']' => Some(TokenKind::RBracket),
            b'{' => Some(TokenKind::LBrace),
            b'}' => Some(TokenKind::RBrace),
            b'<' => Some(TokenKind::Less),
            b'>' => Some(TokenKind::Greater),
            _ => None,
        };
        if let Some(kind) = punct {
            self.pos += 1;
            return Ok(kind);
        }

        match b {
            b'.' if self.src[self.pos..].starts_with(b"...") => {
                self.pos += 3;
                Ok(TokenKind::Ellipsis)
            }
            b'%' | b'@' => {
                self.pos += 1;
                self.lex_sigiled(b == b'%', line, col)
            }
            b'!' => {
                self.pos += 1;
                match self.peek() {
                    Some(c) if is_ident_char(c) || c == b'\\' => {
                        let name = self.take_while(|c| is_ident_char(c) || c == b'\\');
                        Ok(TokenKind::Metadata(name))
                    }
                    _ => Ok(TokenKind::Bang),
                }
            }
            b'#' => {
                self.pos += 1;
                Ok(TokenKind::Hash(self.take_while(is_ident_char)))
            }
            b'"' => {
                let bytes = self.lex_string(line, col)?;
                if self.peek() == Some(b':') {
                    self.pos += 1;
                    Ok(TokenKind::Label(utf8_name(bytes, line, col)?))
                } else {
                    Ok(TokenKind::Str(String::from_utf8_lossy(&bytes).into_owned()))
                }
            }
            b'c' if self.peek_at(1) == Some(b'"') => {
                self.pos += 1;
                let bytes = self.lex_string(line, col)?;
                Ok(TokenKind::CStr(String::from_utf8_lossy(&bytes).into_owned()))
            }
            b'-' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.pos += 1;
                let number = self.lex_number();
                Ok(match number {
                    TokenKind::Int(text) => TokenKind::Int(format!("-{}", text)),
                    TokenKind::Float(text) => TokenKind::Float(format!("-{}", text)),
                    other => other,
                })
            }
            b'0'..=b'9' => {
                // Numeric labels (`7:`) first, then plain numbers.
                let digits_end = self.src[self.pos..]
                    .iter()
                    .position(|c| !c.is_ascii_digit())
                    .map_or(self.src.len(), |n| self.pos + n);
                if self.src.get(digits_end) == Some(&b':') {
                    let text = self.slice(self.pos, digits_end);
                    self.pos = digits_end + 1;
                    return Ok(TokenKind::Label(text));
                }
                Ok(self.lex_number())
            }
            c if is_ident_char(c) => {
                let word = self.take_while(is_ident_char);
                if self.peek() == Some(b':') {
                    self.pos += 1;
                    Ok(TokenKind::Label(word))
                } else {
                    Ok(TokenKind::Word(word))
                }
            }
            other => {
                // Multi-byte UTF-8 sequences only appear inside strings and
                // comments in well-formed input; step over the whole char.
                let ch = self.text[self.pos..]
                    .chars()
                    .next()
                    .unwrap_or(other as char);
                self.pos += ch.len_utf8();
                Ok(TokenKind::Other(ch))
            }
        }
    }

    fn lex_sigiled(&mut self, local: bool, line: u32, col: u32) -> Result<TokenKind> {
        match self.peek() {
            Some(b'"') => {
                let name = utf8_name(self.lex_string(line, col)?, line, col)?;
                Ok(if local {
                    TokenKind::LocalVar(name)
                } else {
                    TokenKind::GlobalVar(name)
                })
            }
            Some(c) if c.is_ascii_digit() => {
                let digits = self.take_while(|c| c.is_ascii_digit());
                let Ok(id) = digits.parse::<u32>() else {
                    bail!("{}:{}: value number '{}' is too large", line, col, digits);
                };
                Ok(if local {
                    TokenKind::LocalId(id)
                } else {
                    TokenKind::GlobalId(id)
                })
            }
            Some(c) if is_ident_char(c) => {
                let name = self.take_while(is_ident_char);
                Ok(if local {
                    TokenKind::LocalVar(name)
                } else {
                    TokenKind::GlobalVar(name)
                })
            }
            _ => bail!(
                "{}:{}: expected a name after '{}'",
                line,
                col,
                if local { '%' } else { '@' }
            ),
        }
    }

    /// Lex a quoted string starting at the opening `"`, resolving `\\` and
    /// `\XX` hex escapes.
    fn lex_string(&mut self, line: u32, col: u32) -> Result<Vec<u8>> {
        self.pos += 1;
        let mut bytes = Vec::new();
        loop {
            match self.peek() {
                None => bail!("{}:{}: unterminated string", line, col),
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    let hex = self
                        .src
                        .get(self.pos + 1..self.pos + 3)
                        .and_then(|h| std::str::from_utf8(h).ok())
                        .and_then(|h| u8::from_str_radix(h, 16).ok());
                    match (self.peek_at(1), hex) {
                        (Some(b'\\'), _) => {
                            bytes.push(b'\\');
                            self.pos += 2;
                        }
                        (_, Some(byte)) => {
                            bytes.push(byte);
                            self.pos += 3;
                        }
                        _ => {
                            bytes.push(b'\\');
                            self.pos += 1;
                        }
                    }
                }
                Some(b) => {
                    if b == b'\n' {
                        self.line += 1;
                        self.line_start = self.pos + 1;
                    }
                    bytes.push(b);
                    self.pos += 1;
                }
            }
        }
        Ok(bytes)
    }

    /// Decimal integers, decimal floats with fraction/exponent, and
    /// `0x`-prefixed hex float constants (`0x3FF0000000000000`, `0xK...`).
    fn lex_number(&mut self) -> TokenKind {
        let start = self.pos;
        if self.peek() == Some(b'0') && self.peek_at(1) == Some(b'x') {
            self.pos += 2;
            self.take_while(|c| c.is_ascii_hexdigit() || matches!(c, b'K' | b'L' | b'M' | b'H' | b'R'));
            return TokenKind::Float(self.slice(start, self.pos));
        }

        self.take_while(|c| c.is_ascii_digit());
        let mut is_float = false;
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.pos += 1;
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some(b'+' | b'-')));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += 1 + sign;
                self.take_while(|c| c.is_ascii_digit());
            }
        }
        let text = self.slice(start, self.pos);
        if is_float {
            TokenKind::Float(text)
        } else {
            TokenKind::Int(text)
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.slice(start, self.pos)
    }

    fn slice(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.src[start..end]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_instruction_tokens() {
        assert_eq!(
            kinds("%sum = add nsw i32 %a, -1 ; trailing comment"),
            vec![
                TokenKind::LocalVar("sum".into()),
                TokenKind::Equal,
                TokenKind::Word("add".into()),
                TokenKind::Word("nsw".into()),
                TokenKind::Word("i32".into()),
                TokenKind::LocalVar("a".into()),
                TokenKind::Comma,
                TokenKind::Int("-1".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(
            kinds("entry:\n7:\n\"odd name\":\nfor.body:"),
            vec![
                TokenKind::Label("entry".into()),
                TokenKind::Label("7".into()),
                TokenKind::Label("odd name".into()),
                TokenKind::Label("for.body".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbered_and_quoted_values() {
        assert_eq!(
            kinds("%3 @0 %\"a b\" @\"\\01foo\""),
            vec![
                TokenKind::LocalId(3),
                TokenKind::GlobalId(0),
                TokenKind::LocalVar("a b".into()),
                TokenKind::GlobalVar("\u{1}foo".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 1.000000e+00 -2.5 0x3FF0000000000000 0xK4000"),
            vec![
                TokenKind::Int("42".into()),
                TokenKind::Float("1.000000e+00".into()),
                TokenKind::Float("-2.5".into()),
                TokenKind::Float("0x3FF0000000000000".into()),
                TokenKind::Float("0xK4000".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_metadata_and_attributes() {
        assert_eq!(
            kinds("!dbg !12 !{ } #0 c\"hi\\00\" ..."),
            vec![
                TokenKind::Metadata("dbg".into()),
                TokenKind::Metadata("12".into()),
                TokenKind::Bang,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Hash("0".into()),
                TokenKind::CStr("hi\0".into()),
                TokenKind::Ellipsis,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("define void\n  @f").unwrap();
        assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
        assert_eq!((tokens[2].line, tokens[2].col), (2, 3));
        assert_eq!(&"define void\n  @f"[tokens[2].start..tokens[2].end], "@f");
    }

    #[test]
    fn test_non_utf8_names_are_rejected() {
        let err = tokenize("define void @\"\\FF\\FE\"()").unwrap_err();
        assert_eq!(err.to_string(), "1:13: name is not valid UTF-8");
        let err = tokenize("\n\"\\C3\":").unwrap_err();
        assert_eq!(err.to_string(), "2:1: name is not valid UTF-8");
        // Escaped UTF-8 sequences are fine.
        assert_eq!(
            kinds("%\"\\C3\\A9t\\C3\\A9\""),
            vec![TokenKind::LocalVar("\u{e9}t\u{e9}".into()), TokenKind::Eof]
        );
        // String payloads may hold arbitrary bytes.
        assert!(tokenize("c\"\\FF\\00\"").is_ok());
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        assert!(tokenize("@\"oops").is_err());
    }
}
