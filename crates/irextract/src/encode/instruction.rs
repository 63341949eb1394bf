//! Instruction records.

use super::types::type_name;
use super::value::{encode_operand, OperandRecord};
use crate::ir::{Function, InstKind, Instruction};
use serde::Serialize;

/// Serialized form of one instruction.
///
/// `predicate` is present only on comparisons, `alloca_size`/`alloca_type`
/// only on stack allocations. `alloca_size` is the operand's text, not a
/// number: the count may be a named value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructionRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alloca_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alloca_type: Option<String>,
    pub name: String,
    pub opcode: String,
    pub operands: Vec<OperandRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Encode an instruction of `func`.
pub fn encode_instruction(func: &Function, inst: &Instruction) -> InstructionRecord {
    let result = func.value(inst.result);

    let (predicate, alloca_size, alloca_type) = match &inst.kind {
        InstKind::Compare(pred) => (Some(pred.name().to_string()), None, None),
        InstKind::Alloca { allocated } => (
            None,
            inst.array_size()
                .map(|size| func.value(size).render_operand()),
            Some(type_name(allocated)),
        ),
        InstKind::Phi { .. } | InstKind::Plain => (None, None, None),
    };

    let operands = inst
        .uses()
        .map(|operand| encode_operand(func, inst, operand))
        .collect();

    InstructionRecord {
        alloca_size,
        alloca_type,
        name: result.name.clone(),
        opcode: inst.opcode.mnemonic().to_string(),
        operands,
        predicate,
        ty: type_name(&result.ty),
    }
}
