//! Canonical type names.
//!
//! Integers, arrays and pointers compose recursively with `-` separators
//! (`I32`, `Array-4-I32`, `Pointer-Pointer-I8`); every other kind is named
//! by its kind tag alone.

use crate::ir::Type;

/// Canonical name of a type. Total over every type the IR can hold.
///
/// Examples:
/// - `i32` → `"I32"`
/// - `[4 x i32]` → `"Array-4-I32"`
/// - `i32**` → `"Pointer-Pointer-I32"`
/// - `ptr` → `"Pointer"`
/// - `{ i32, float }` → `"Struct"`
pub fn type_name(ty: &Type) -> String {
    match ty {
        Type::Integer(bits) => format!("I{}", bits),
        Type::Array { len, elem } => format!("Array-{}-{}", len, type_name(elem)),
        Type::Pointer {
            pointee: Some(pointee),
            ..
        } => format!("Pointer-{}", type_name(pointee)),
        _ => ty.kind().name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionType, StructType};
    use proptest::prelude::*;

    /// Integer, array and pointer shapes over a few scalar leaves.
    fn shape() -> impl Strategy<Value = Type> {
        let leaf = prop_oneof![
            (1u32..=128).prop_map(Type::int),
            Just(Type::Float),
            Just(Type::Double),
            Just(Type::opaque_pointer()),
        ];
        leaf.prop_recursive(4, 16, 1, |inner| {
            prop_oneof![
                (0u64..64, inner.clone()).prop_map(|(len, elem)| Type::array(len, elem)),
                inner.prop_map(Type::pointer_to),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_integer_names(bits in 1u32..(1 << 23)) {
            prop_assert_eq!(type_name(&Type::int(bits)), format!("I{}", bits));
        }

        #[test]
        fn prop_array_and_pointer_names_compose(len in 0u64..1024, elem in shape()) {
            let inner = type_name(&elem);
            prop_assert_eq!(
                type_name(&Type::array(len, elem.clone())),
                format!("Array-{}-{}", len, inner)
            );
            prop_assert_eq!(type_name(&Type::pointer_to(elem)), format!("Pointer-{}", inner));
        }

        #[test]
        fn prop_names_are_injective(a in shape(), b in shape()) {
            prop_assert_eq!(a == b, type_name(&a) == type_name(&b));
        }
    }

    #[test]
    fn test_integer_names() {
        for bits in [1, 8, 16, 32, 64, 128, 17] {
            assert_eq!(type_name(&Type::int(bits)), format!("I{}", bits));
        }
    }

    #[test]
    fn test_array_names_compose() {
        assert_eq!(type_name(&Type::array(4, Type::int(32))), "Array-4-I32");
        assert_eq!(
            type_name(&Type::array(2, Type::array(3, Type::int(8)))),
            "Array-2-Array-3-I8"
        );
        assert_eq!(
            type_name(&Type::array(0, Type::pointer_to(Type::Double))),
            "Array-0-Pointer-Double"
        );
    }

    #[test]
    fn test_pointer_names_compose() {
        assert_eq!(
            type_name(&Type::pointer_to(Type::pointer_to(Type::int(32)))),
            "Pointer-Pointer-I32"
        );
        assert_eq!(
            type_name(&Type::pointer_to(Type::array(4, Type::Float))),
            "Pointer-Array-4-Float"
        );
        assert_eq!(type_name(&Type::opaque_pointer()), "Pointer");
    }

    #[test]
    fn test_nominal_names() {
        assert_eq!(type_name(&Type::Void), "Void");
        assert_eq!(type_name(&Type::Label), "Label");
        assert_eq!(type_name(&Type::Half), "Half");
        assert_eq!(type_name(&Type::Double), "Double");
        assert_eq!(type_name(&Type::X86Fp80), "X86_FP80");
        assert_eq!(
            type_name(&Type::Struct(StructType::Named("struct.S".into()))),
            "Struct"
        );
        assert_eq!(
            type_name(&Type::Function(FunctionType {
                ret: Box::new(Type::Void),
                params: vec![],
                vararg: false,
            })),
            "Function"
        );
        assert_eq!(
            type_name(&Type::FixedVector {
                len: 4,
                elem: Box::new(Type::int(32))
            }),
            "FixedVector"
        );
        assert_eq!(
            type_name(&Type::ScalableVector {
                len: 2,
                elem: Box::new(Type::Double)
            }),
            "ScalableVector"
        );
    }

    #[test]
    fn test_distinct_shapes_never_collide() {
        let shapes = [
            Type::int(32),
            Type::int(3),
            Type::array(2, Type::int(32)),
            Type::array(23, Type::int(2)),
            Type::array(2, Type::array(3, Type::int(2))),
            Type::pointer_to(Type::int(32)),
            Type::pointer_to(Type::array(2, Type::int(32))),
            Type::array(2, Type::pointer_to(Type::int(32))),
            Type::opaque_pointer(),
            Type::Float,
        ];
        let mut names: Vec<String> = shapes.iter().map(type_name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), shapes.len());
    }
}
