//! Values: everything that has a name and a type and can be used as an
//! operand.
//!
//! Values of a function live in an arena owned by that function and are
//! referenced by [`ValueId`]. Every use refers to a value by id; nothing is
//! deduplicated, so two constants with the same text are two values.

use super::types::Type;
use super::{BlockId, InstId};

/// Generic index type with a phantom tag to distinguish different index spaces.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Idx<TAG> {
    idx: usize,
    _marker: std::marker::PhantomData<TAG>,
}

impl<TAG> Idx<TAG> {
    pub fn new(idx: usize) -> Self {
        Self {
            idx,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn as_usize(&self) -> usize {
        self.idx
    }
}

// Manual impls: a derive would require `TAG: Clone/Copy`.
impl<TAG> Clone for Idx<TAG> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<TAG> Copy for Idx<TAG> {}

impl<TAG> From<Idx<TAG>> for usize {
    fn from(idx: Idx<TAG>) -> Self {
        idx.idx
    }
}

/// Marker type for the value index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueTag;

/// Index into `Function::values`.
pub type ValueId = Idx<ValueTag>;

/// What produced a value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// Formal argument at position `index`.
    Argument { index: usize },
    /// Result of an instruction (void instructions have one too).
    Instruction(InstId),
    /// A basic block used as a label operand.
    Block(BlockId),
    /// Constant or metadata operand; `text` is its canonical rendering.
    Constant { text: String },
    /// Reference to a global variable or function.
    Global,
}

/// A value node.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueData {
    /// Declared name, empty for numbered and constant values.
    pub name: String,
    /// Slot number of an unnamed local or global (`%3`, `@0`).
    pub slot: Option<u32>,
    pub ty: Type,
    pub kind: ValueKind,
}

impl ValueData {
    pub fn constant(ty: Type, text: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            slot: None,
            ty,
            kind: ValueKind::Constant { text: text.into() },
        }
    }

    pub fn global(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            slot: None,
            ty,
            kind: ValueKind::Global,
        }
    }

    /// Render the value the way it appears as an operand in textual IR,
    /// without its type: `%x`, `%3`, `@main`, `42`, `null`.
    pub fn render_operand(&self) -> String {
        match &self.kind {
            ValueKind::Constant { text } => text.clone(),
            ValueKind::Global => self.render_named('@'),
            ValueKind::Argument { .. } | ValueKind::Instruction(_) | ValueKind::Block(_) => {
                self.render_named('%')
            }
        }
    }

    fn render_named(&self, sigil: char) -> String {
        if !self.name.is_empty() {
            format!("{}{}", sigil, quote_name(&self.name))
        } else if let Some(slot) = self.slot {
            format!("{}{}", sigil, slot)
        } else {
            "<badref>".to_string()
        }
    }
}

/// Quote a local/global name when it contains characters outside the bare
/// identifier set or starts with a digit.
pub fn quote_name(name: &str) -> String {
    let bare = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '$' | '.' | '_'));
    if bare {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for byte in name.bytes() {
        if byte == b'"' || byte == b'\\' || !(0x20..0x7f).contains(&byte) {
            out.push_str(&format!("\\{:02X}", byte));
        } else {
            out.push(byte as char);
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(name: &str, slot: Option<u32>) -> ValueData {
        ValueData {
            name: name.to_string(),
            slot,
            ty: Type::int(32),
            kind: ValueKind::Argument { index: 0 },
        }
    }

    #[test]
    fn test_render_named_local() {
        assert_eq!(local("x", None).render_operand(), "%x");
    }

    #[test]
    fn test_render_numbered_local() {
        assert_eq!(local("", Some(7)).render_operand(), "%7");
    }

    #[test]
    fn test_render_unslotted_local() {
        assert_eq!(local("", None).render_operand(), "<badref>");
    }

    #[test]
    fn test_render_global_and_constant() {
        assert_eq!(
            ValueData::global("main", Type::opaque_pointer()).render_operand(),
            "@main"
        );
        assert_eq!(
            ValueData::constant(Type::int(32), "-5").render_operand(),
            "-5"
        );
    }

    #[test]
    fn test_quote_name() {
        assert_eq!(quote_name("for.body"), "for.body");
        assert_eq!(quote_name("a b"), "\"a b\"");
        assert_eq!(quote_name("1x"), "\"1x\"");
        assert_eq!(quote_name("q\"t"), "\"q\\22t\"");
    }

    #[test]
    fn test_idx_roundtrip() {
        let id = ValueId::new(3);
        assert_eq!(id.as_usize(), 3);
        assert_eq!(usize::from(id), 3);
    }
}
