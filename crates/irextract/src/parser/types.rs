//! Type syntax.

use super::lexer::TokenKind;
use super::Parser;
use crate::ir::{FunctionType, StructType, Type};
use anyhow::Result;

const PRIMITIVE_TYPES: &[&str] = &[
    "void",
    "half",
    "bfloat",
    "float",
    "double",
    "x86_fp80",
    "fp128",
    "ppc_fp128",
    "label",
    "metadata",
    "x86_mmx",
    "x86_amx",
    "token",
    "ptr",
];

fn int_width(word: &str) -> Option<u32> {
    let digits = word.strip_prefix('i')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|bits| *bits > 0)
}

pub(super) fn is_type_word(word: &str) -> bool {
    PRIMITIVE_TYPES.contains(&word) || int_width(word).is_some()
}

/// Whether a type can start at this token.
pub(super) fn is_type_start(kind: &TokenKind) -> bool {
    match kind {
        TokenKind::Word(w) => is_type_word(w),
        TokenKind::LBracket
        | TokenKind::LBrace
        | TokenKind::Less
        | TokenKind::LocalVar(_)
        | TokenKind::LocalId(_) => true,
        _ => false,
    }
}

impl Parser<'_> {
    pub(super) fn parse_type(&mut self) -> Result<Type> {
        let mut ty = self.parse_base_type()?;
        loop {
            if self.eat(&TokenKind::Star) {
                ty = Type::Pointer {
                    pointee: Some(Box::new(ty)),
                    addrspace: 0,
                };
            } else if self.at_word("addrspace") {
                let addrspace = self.parse_addrspace()?;
                self.expect(TokenKind::Star, "'*'")?;
                ty = Type::Pointer {
                    pointee: Some(Box::new(ty)),
                    addrspace,
                };
            } else if self.at(&TokenKind::LParen) {
                ty = Type::Function(self.parse_function_params(ty)?);
            } else {
                return Ok(ty);
            }
        }
    }

    fn parse_base_type(&mut self) -> Result<Type> {
        let ty = match self.peek().clone() {
            TokenKind::Word(word) => {
                let ty = match word.as_str() {
                    "void" => Type::Void,
                    "half" => Type::Half,
                    "bfloat" => Type::BFloat,
                    "float" => Type::Float,
                    "double" => Type::Double,
                    "x86_fp80" => Type::X86Fp80,
                    "fp128" => Type::Fp128,
                    "ppc_fp128" => Type::PpcFp128,
                    "label" => Type::Label,
                    "metadata" => Type::Metadata,
                    "x86_mmx" => Type::X86Mmx,
                    "x86_amx" => Type::X86Amx,
                    "token" => Type::Token,
                    "ptr" => {
                        self.bump();
                        let addrspace = if self.at_word("addrspace") {
                            self.parse_addrspace()?
                        } else {
                            0
                        };
                        return Ok(Type::Pointer {
                            pointee: None,
                            addrspace,
                        });
                    }
                    other => match int_width(other) {
                        Some(bits) => Type::Integer(bits),
                        None => return Err(self.unexpected("a type")),
                    },
                };
                self.bump();
                ty
            }
            TokenKind::LBracket => {
                self.bump();
                let len = self.expect_int("an array length")?;
                self.expect_word("x")?;
                let elem = self.parse_type()?;
                self.expect(TokenKind::RBracket, "']'")?;
                Type::Array {
                    len,
                    elem: Box::new(elem),
                }
            }
            TokenKind::Less => {
                self.bump();
                if self.at(&TokenKind::LBrace) {
                    let fields = self.parse_struct_fields()?;
                    self.expect(TokenKind::Greater, "'>'")?;
                    return Ok(Type::Struct(StructType::Literal {
                        fields,
                        packed: true,
                    }));
                }
                let scalable = self.eat_word("vscale");
                if scalable {
                    self.expect_word("x")?;
                }
                let len = self.expect_int("a vector length")?;
                self.expect_word("x")?;
                let elem = Box::new(self.parse_type()?);
                self.expect(TokenKind::Greater, "'>'")?;
                if scalable {
                    Type::ScalableVector { len, elem }
                } else {
                    Type::FixedVector { len, elem }
                }
            }
            TokenKind::LBrace => Type::Struct(StructType::Literal {
                fields: self.parse_struct_fields()?,
                packed: false,
            }),
            TokenKind::LocalVar(name) => {
                self.bump();
                Type::Struct(StructType::Named(name))
            }
            TokenKind::LocalId(id) => {
                self.bump();
                Type::Struct(StructType::Named(id.to_string()))
            }
            _ => return Err(self.unexpected("a type")),
        };
        Ok(ty)
    }

    fn parse_struct_fields(&mut self) -> Result<Vec<Type>> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        if self.eat(&TokenKind::RBrace) {
            return Ok(fields);
        }
        loop {
            fields.push(self.parse_type()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(fields)
    }

    /// `(i32, ptr, ...)` following a return type.
    fn parse_function_params(&mut self, ret: Type) -> Result<FunctionType> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        let mut vararg = false;
        if !self.eat(&TokenKind::RParen) {
            loop {
                if self.eat(&TokenKind::Ellipsis) {
                    vararg = true;
                    break;
                }
                params.push(self.parse_type()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "')'")?;
        }
        Ok(FunctionType {
            ret: Box::new(ret),
            params,
            vararg,
        })
    }

    /// `addrspace(N)`
    pub(super) fn parse_addrspace(&mut self) -> Result<u32> {
        self.expect_word("addrspace")?;
        self.expect(TokenKind::LParen, "'('")?;
        let addrspace = self.expect_int("an address space")?;
        self.expect(TokenKind::RParen, "')'")?;
        Ok(addrspace)
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::tokenize;
    use super::*;

    fn parse(src: &str) -> Type {
        let mut parser = Parser::new(src, tokenize(src).unwrap(), false);
        let ty = parser.parse_type().unwrap();
        assert!(parser.at(&TokenKind::Eof), "trailing input in {src:?}");
        ty
    }

    #[test]
    fn test_int_width() {
        assert_eq!(int_width("i32"), Some(32));
        assert_eq!(int_width("i1"), Some(1));
        assert_eq!(int_width("i0"), None);
        assert_eq!(int_width("i"), None);
        assert_eq!(int_width("inbounds"), None);
    }

    #[test]
    fn test_primitive_and_derived_types() {
        assert_eq!(parse("i64"), Type::int(64));
        assert_eq!(parse("x86_fp80"), Type::X86Fp80);
        assert_eq!(parse("[4 x i32]"), Type::array(4, Type::int(32)));
        assert_eq!(parse("i8**"), Type::pointer_to(Type::pointer_to(Type::int(8))));
        assert_eq!(
            parse("<vscale x 4 x float>"),
            Type::ScalableVector {
                len: 4,
                elem: Box::new(Type::Float)
            }
        );
        assert_eq!(
            parse("ptr addrspace(3)"),
            Type::Pointer {
                pointee: None,
                addrspace: 3
            }
        );
        assert_eq!(
            parse("i32 addrspace(1)*"),
            Type::Pointer {
                pointee: Some(Box::new(Type::int(32))),
                addrspace: 1
            }
        );
    }

    #[test]
    fn test_struct_and_function_types() {
        assert_eq!(
            parse("<{ i8, i32 }>"),
            Type::Struct(StructType::Literal {
                fields: vec![Type::int(8), Type::int(32)],
                packed: true
            })
        );
        assert_eq!(
            parse("{}"),
            Type::Struct(StructType::Literal {
                fields: vec![],
                packed: false
            })
        );
        let printf = parse("i32 (i8*, ...)*");
        let Type::Pointer {
            pointee: Some(inner),
            ..
        } = printf
        else {
            panic!("expected pointer, got {printf}");
        };
        assert_eq!(
            *inner,
            Type::Function(FunctionType {
                ret: Box::new(Type::int(32)),
                params: vec![Type::pointer_to(Type::int(8))],
                vararg: true,
            })
        );
        assert_eq!(parse("%struct.S*").to_string(), "%struct.S*");
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        for src in ["[2 x <4 x i16>]", "{ i32, [3 x ptr] }", "void (i32)*"] {
            assert_eq!(parse(src).to_string(), src);
        }
    }

    #[test]
    fn test_rejects_non_types() {
        let src = "nonsense";
        let mut parser = Parser::new(src, tokenize(src).unwrap(), false);
        let err = parser.parse_type().unwrap_err();
        assert_eq!(err.to_string(), "1:1: expected a type, found 'nonsense'");
    }
}
