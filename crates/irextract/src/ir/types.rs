//! IR type definitions.
//!
//! These types mirror the host compiler's type system: a fixed set of
//! primitive kinds plus derived kinds (integers, pointers, arrays, structs,
//! function and vector types). Identified structs are referenced by name and
//! their bodies live in a [`TypeTable`], so a self-referential struct such as
//! `%node = type { i32, %node* }` never makes a `Type` value cyclic.

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::fmt;

/// A type node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Half,
    BFloat,
    Float,
    Double,
    X86Fp80,
    Fp128,
    PpcFp128,
    Void,
    Label,
    Metadata,
    X86Mmx,
    X86Amx,
    Token,

    /// Arbitrary bit width integer (`i1`, `i32`, `i128`, ...)
    Integer(u32),

    Function(FunctionType),

    /// `pointee` is `None` for opaque pointers (`ptr`).
    Pointer {
        pointee: Option<Box<Type>>,
        addrspace: u32,
    },

    Struct(StructType),

    Array {
        len: u64,
        elem: Box<Type>,
    },

    FixedVector {
        len: u32,
        elem: Box<Type>,
    },

    ScalableVector {
        len: u32,
        elem: Box<Type>,
    },
}

/// Signature of a function type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub ret: Box<Type>,
    pub params: Vec<Type>,
    pub vararg: bool,
}

/// Struct types are either identified (named, body in the [`TypeTable`]) or
/// literal (structural, body inline).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StructType {
    Named(String),
    Literal { fields: Vec<Type>, packed: bool },
}

/// Kind tag of a [`Type`], one per variant.
///
/// The order follows the host's type-ID enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Half,
    BFloat,
    Float,
    Double,
    X86Fp80,
    Fp128,
    PpcFp128,
    Void,
    Label,
    Metadata,
    X86Mmx,
    X86Amx,
    Token,
    Integer,
    Function,
    Pointer,
    Struct,
    Array,
    FixedVector,
    ScalableVector,
}

impl TypeKind {
    /// The literal name of this kind in serialized output.
    ///
    /// This match must stay exhaustive: a new kind has to get a name here
    /// before anything can be built.
    pub fn name(self) -> &'static str {
        match self {
            TypeKind::Half => "Half",
            TypeKind::BFloat => "BFloat",
            TypeKind::Float => "Float",
            TypeKind::Double => "Double",
            TypeKind::X86Fp80 => "X86_FP80",
            TypeKind::Fp128 => "FP128",
            TypeKind::PpcFp128 => "PPC_FP128",
            TypeKind::Void => "Void",
            TypeKind::Label => "Label",
            TypeKind::Metadata => "Metadata",
            TypeKind::X86Mmx => "X86_MMX",
            TypeKind::X86Amx => "X86_AMX",
            TypeKind::Token => "Token",
            TypeKind::Integer => "Integer",
            TypeKind::Function => "Function",
            TypeKind::Pointer => "Pointer",
            TypeKind::Struct => "Struct",
            TypeKind::Array => "Array",
            TypeKind::FixedVector => "FixedVector",
            TypeKind::ScalableVector => "ScalableVector",
        }
    }
}

impl Type {
    pub fn int(bits: u32) -> Self {
        Type::Integer(bits)
    }

    pub fn i1() -> Self {
        Type::Integer(1)
    }

    /// Typed pointer to `pointee` in address space 0.
    pub fn pointer_to(pointee: Type) -> Self {
        Type::Pointer {
            pointee: Some(Box::new(pointee)),
            addrspace: 0,
        }
    }

    /// Opaque pointer (`ptr`) in address space 0.
    pub fn opaque_pointer() -> Self {
        Type::Pointer {
            pointee: None,
            addrspace: 0,
        }
    }

    pub fn array(len: u64, elem: Type) -> Self {
        Type::Array {
            len,
            elem: Box::new(elem),
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            Type::Half => TypeKind::Half,
            Type::BFloat => TypeKind::BFloat,
            Type::Float => TypeKind::Float,
            Type::Double => TypeKind::Double,
            Type::X86Fp80 => TypeKind::X86Fp80,
            Type::Fp128 => TypeKind::Fp128,
            Type::PpcFp128 => TypeKind::PpcFp128,
            Type::Void => TypeKind::Void,
            Type::Label => TypeKind::Label,
            Type::Metadata => TypeKind::Metadata,
            Type::X86Mmx => TypeKind::X86Mmx,
            Type::X86Amx => TypeKind::X86Amx,
            Type::Token => TypeKind::Token,
            Type::Integer(_) => TypeKind::Integer,
            Type::Function(_) => TypeKind::Function,
            Type::Pointer { .. } => TypeKind::Pointer,
            Type::Struct(_) => TypeKind::Struct,
            Type::Array { .. } => TypeKind::Array,
            Type::FixedVector { .. } => TypeKind::FixedVector,
            Type::ScalableVector { .. } => TypeKind::ScalableVector,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    /// Element type of an array or vector.
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array { elem, .. }
            | Type::FixedVector { elem, .. }
            | Type::ScalableVector { elem, .. } => Some(elem),
            _ => None,
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Type::FixedVector { .. } | Type::ScalableVector { .. })
    }

    /// Element type of a vector, the type itself otherwise.
    pub fn scalar_type(&self) -> &Type {
        match self {
            Type::FixedVector { elem, .. } | Type::ScalableVector { elem, .. } => &**elem,
            other => other,
        }
    }

    /// Replace the element type of a vector, keeping its shape.
    /// Non-vector types are returned as `elem` unchanged.
    pub fn with_vector_shape_of(shape: &Type, elem: Type) -> Type {
        match shape {
            Type::FixedVector { len, .. } => Type::FixedVector {
                len: *len,
                elem: Box::new(elem),
            },
            Type::ScalableVector { len, .. } => Type::ScalableVector {
                len: *len,
                elem: Box::new(elem),
            },
            _ => elem,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Half => write!(f, "half"),
            Type::BFloat => write!(f, "bfloat"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::X86Fp80 => write!(f, "x86_fp80"),
            Type::Fp128 => write!(f, "fp128"),
            Type::PpcFp128 => write!(f, "ppc_fp128"),
            Type::Void => write!(f, "void"),
            Type::Label => write!(f, "label"),
            Type::Metadata => write!(f, "metadata"),
            Type::X86Mmx => write!(f, "x86_mmx"),
            Type::X86Amx => write!(f, "x86_amx"),
            Type::Token => write!(f, "token"),
            Type::Integer(bits) => write!(f, "i{}", bits),
            Type::Function(ft) => {
                write!(f, "{} (", ft.ret)?;
                write_list(f, &ft.params)?;
                if ft.vararg {
                    if !ft.params.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...")?;
                }
                write!(f, ")")
            }
            Type::Pointer {
                pointee: None,
                addrspace: 0,
            } => write!(f, "ptr"),
            Type::Pointer {
                pointee: None,
                addrspace,
            } => write!(f, "ptr addrspace({})", addrspace),
            Type::Pointer {
                pointee: Some(p),
                addrspace: 0,
            } => write!(f, "{}*", p),
            Type::Pointer {
                pointee: Some(p),
                addrspace,
            } => write!(f, "{} addrspace({})*", p, addrspace),
            Type::Struct(StructType::Named(name)) => write!(f, "%{}", name),
            Type::Struct(StructType::Literal { fields, packed }) => {
                if *packed {
                    write!(f, "<")?;
                }
                if fields.is_empty() {
                    write!(f, "{{}}")?;
                } else {
                    write!(f, "{{ ")?;
                    write_list(f, fields)?;
                    write!(f, " }}")?;
                }
                if *packed {
                    write!(f, ">")?;
                }
                Ok(())
            }
            Type::Array { len, elem } => write!(f, "[{} x {}]", len, elem),
            Type::FixedVector { len, elem } => write!(f, "<{} x {}>", len, elem),
            Type::ScalableVector { len, elem } => write!(f, "<vscale x {} x {}>", len, elem),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, types: &[Type]) -> fmt::Result {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", ty)?;
    }
    Ok(())
}

/// Body of an identified struct. `fields` is `None` for `type opaque`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructBody {
    pub fields: Option<Vec<Type>>,
    pub packed: bool,
}

/// Identified struct definitions of a module.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    structs: HashMap<String, StructBody>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: impl Into<String>, body: StructBody) {
        self.structs.insert(name.into(), body);
    }

    pub fn get(&self, name: &str) -> Option<&StructBody> {
        self.structs.get(name)
    }

    pub fn len(&self) -> usize {
        self.structs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }

    /// Field types of a struct type, resolving identified structs.
    pub fn struct_fields<'a>(&'a self, st: &'a StructType) -> Result<&'a [Type]> {
        match st {
            StructType::Literal { fields, .. } => Ok(fields),
            StructType::Named(name) => match self.structs.get(name) {
                Some(StructBody {
                    fields: Some(fields),
                    ..
                }) => Ok(fields),
                Some(_) => bail!("cannot index into opaque struct %{}", name),
                None => bail!("use of undefined type %{}", name),
            },
        }
    }

    /// Type reached by stepping into `ty` along `indices`.
    ///
    /// Struct steps need a known field number; array and vector steps accept
    /// any index (`None` for a non-constant one).
    pub fn indexed_type(&self, ty: &Type, indices: &[Option<u64>]) -> Result<Type> {
        let mut current = ty.clone();
        for index in indices {
            current = match &current {
                Type::Struct(st) => {
                    let Some(field) = index else {
                        bail!("struct index into {} must be a constant", current);
                    };
                    let fields = self.struct_fields(st)?;
                    match fields.get(*field as usize) {
                        Some(t) => t.clone(),
                        None => bail!("field index {} out of range for {}", field, current),
                    }
                }
                Type::Array { elem, .. }
                | Type::FixedVector { elem, .. }
                | Type::ScalableVector { elem, .. } => (**elem).clone(),
                other => bail!("invalid index into non-aggregate type {}", other),
            };
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [TypeKind; 20] = [
        TypeKind::Half,
        TypeKind::BFloat,
        TypeKind::Float,
        TypeKind::Double,
        TypeKind::X86Fp80,
        TypeKind::Fp128,
        TypeKind::PpcFp128,
        TypeKind::Void,
        TypeKind::Label,
        TypeKind::Metadata,
        TypeKind::X86Mmx,
        TypeKind::X86Amx,
        TypeKind::Token,
        TypeKind::Integer,
        TypeKind::Function,
        TypeKind::Pointer,
        TypeKind::Struct,
        TypeKind::Array,
        TypeKind::FixedVector,
        TypeKind::ScalableVector,
    ];

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(Type::int(32).kind(), TypeKind::Integer);
        assert_eq!(Type::opaque_pointer().kind(), TypeKind::Pointer);
        assert_eq!(Type::array(4, Type::Float).kind(), TypeKind::Array);
        assert_eq!(Type::Void.kind(), TypeKind::Void);
        assert_eq!(
            Type::Struct(StructType::Named("S".into())).kind(),
            TypeKind::Struct
        );
    }

    #[test]
    fn test_kind_names_are_unique() {
        let mut names: Vec<&str> = ALL_KINDS.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_KINDS.len());
    }

    #[test]
    fn test_vector_shape_helpers() {
        let v = Type::FixedVector {
            len: 2,
            elem: Box::new(Type::opaque_pointer()),
        };
        assert!(v.is_vector());
        assert!(!Type::array(2, Type::Float).is_vector());
        assert_eq!(v.scalar_type(), &Type::opaque_pointer());
        assert_eq!(Type::Float.scalar_type(), &Type::Float);
    }

    #[test]
    fn test_type_display() {
        assert_eq!(Type::int(32).to_string(), "i32");
        assert_eq!(Type::pointer_to(Type::int(8)).to_string(), "i8*");
        assert_eq!(Type::opaque_pointer().to_string(), "ptr");
        assert_eq!(Type::array(4, Type::int(32)).to_string(), "[4 x i32]");
        assert_eq!(
            Type::ScalableVector {
                len: 4,
                elem: Box::new(Type::Float)
            }
            .to_string(),
            "<vscale x 4 x float>"
        );
        let ft = Type::Function(FunctionType {
            ret: Box::new(Type::int(32)),
            params: vec![Type::pointer_to(Type::int(8))],
            vararg: true,
        });
        assert_eq!(ft.to_string(), "i32 (i8*, ...)");
        let packed = Type::Struct(StructType::Literal {
            fields: vec![Type::int(8), Type::int(32)],
            packed: true,
        });
        assert_eq!(packed.to_string(), "<{ i8, i32 }>");
    }

    #[test]
    fn test_indexed_type_walks_structs_and_arrays() {
        let mut table = TypeTable::new();
        table.define(
            "pair",
            StructBody {
                fields: Some(vec![Type::int(32), Type::array(3, Type::Double)]),
                packed: false,
            },
        );
        let pair = Type::Struct(StructType::Named("pair".into()));

        assert_eq!(
            table.indexed_type(&pair, &[Some(0)]).unwrap(),
            Type::int(32)
        );
        assert_eq!(
            table.indexed_type(&pair, &[Some(1), None]).unwrap(),
            Type::Double
        );
        assert!(table.indexed_type(&pair, &[None]).is_err());
        assert!(table.indexed_type(&pair, &[Some(2)]).is_err());
        assert!(table.indexed_type(&Type::int(32), &[Some(0)]).is_err());
    }

    #[test]
    fn test_opaque_struct_cannot_be_indexed() {
        let mut table = TypeTable::new();
        table.define(
            "handle",
            StructBody {
                fields: None,
                packed: false,
            },
        );
        let handle = Type::Struct(StructType::Named("handle".into()));
        assert!(table.indexed_type(&handle, &[Some(0)]).is_err());
    }
}
