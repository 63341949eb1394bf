//! Value and operand records.

use super::types::type_name;
use crate::ir::{Function, Instruction, Use, ValueData};
use serde::Serialize;

/// `{name, type, value}` record of a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueRecord {
    /// Declared name; empty for numbered values and constants.
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    /// Operand rendering with the leading `%`/`@` removed.
    pub value: String,
}

/// A value record as seen from one use. Phi operands also carry the
/// predecessor block of the incoming edge.
///
/// Fields are declared in key order so output objects come out sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperandRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_block: Option<String>,
    #[serde(rename = "type")]
    pub ty: String,
    pub value: String,
}

/// Encode a value node.
pub fn encode_value(value: &ValueData) -> ValueRecord {
    let rendered = value.render_operand();
    ValueRecord {
        name: value.name.clone(),
        ty: type_name(&value.ty),
        value: strip_sigil(&rendered).to_string(),
    }
}

/// Encode the value behind `operand` of `inst`.
pub fn encode_operand(func: &Function, inst: &Instruction, operand: Use) -> OperandRecord {
    let ValueRecord { name, ty, value } = encode_value(func.value(operand.value));
    let prev_block = inst
        .incoming_block(operand)
        .map(|block| func.block(block).name.clone());
    OperandRecord {
        name,
        prev_block,
        ty,
        value,
    }
}

/// Drop one leading local (`%`) or global (`@`) sigil.
fn strip_sigil(rendered: &str) -> &str {
    rendered
        .strip_prefix(|c: char| c == '%' || c == '@')
        .unwrap_or(rendered)
}
