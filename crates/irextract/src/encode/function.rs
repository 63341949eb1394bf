//! Basic block and function records.

use super::instruction::{encode_instruction, InstructionRecord};
use super::types::type_name;
use super::value::{encode_value, ValueRecord};
use crate::ir::{Block, Function};
use log::trace;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockRecord {
    /// Instructions in execution order.
    pub insts: Vec<InstructionRecord>,
    pub name: String,
}

/// Serialized form of a whole function; the document the extractor emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionRecord {
    pub args: Vec<ValueRecord>,
    pub basic_blocks: Vec<BlockRecord>,
    pub name: String,
    pub ret_type: String,
}

pub fn encode_block(func: &Function, block: &Block) -> BlockRecord {
    trace!("encoding block '{}' of @{}", block.name, func.name);
    BlockRecord {
        insts: func
            .block_insts(block)
            .map(|inst| encode_instruction(func, inst))
            .collect(),
        name: block.name.clone(),
    }
}

pub fn encode_function(func: &Function) -> FunctionRecord {
    FunctionRecord {
        args: func.arguments().map(encode_value).collect(),
        basic_blocks: func
            .blocks
            .iter()
            .map(|block| encode_block(func, block))
            .collect(),
        name: func.name.clone(),
        ret_type: type_name(&func.ret_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        BlockId, InstId, InstKind, Instruction, Opcode, Type, ValueData, ValueId, ValueKind,
    };

    /// `define i32 @pick(i32 %v) { bb1: br label %join  bb2: br label %join
    ///  join: %r = phi i32 [ %v, %bb1 ], [ %v, %bb2 ]  ret i32 %r }`
    fn phi_function() -> Function {
        let values = vec![
            // 0: %v
            ValueData {
                name: "v".into(),
                slot: None,
                ty: Type::int(32),
                kind: ValueKind::Argument { index: 0 },
            },
            // 1..=3: labels
            ValueData {
                name: "bb1".into(),
                slot: None,
                ty: Type::Label,
                kind: ValueKind::Block(BlockId::new(0)),
            },
            ValueData {
                name: "bb2".into(),
                slot: None,
                ty: Type::Label,
                kind: ValueKind::Block(BlockId::new(1)),
            },
            ValueData {
                name: "join".into(),
                slot: None,
                ty: Type::Label,
                kind: ValueKind::Block(BlockId::new(2)),
            },
            // 4..=7: instruction results
            ValueData {
                name: String::new(),
                slot: None,
                ty: Type::Void,
                kind: ValueKind::Instruction(InstId::new(0)),
            },
            ValueData {
                name: String::new(),
                slot: None,
                ty: Type::Void,
                kind: ValueKind::Instruction(InstId::new(1)),
            },
            ValueData {
                name: "r".into(),
                slot: None,
                ty: Type::int(32),
                kind: ValueKind::Instruction(InstId::new(2)),
            },
            ValueData {
                name: String::new(),
                slot: None,
                ty: Type::Void,
                kind: ValueKind::Instruction(InstId::new(3)),
            },
        ];
        let br = |result: usize| Instruction {
            result: ValueId::new(result),
            opcode: Opcode::Br,
            operands: vec![ValueId::new(3)],
            kind: InstKind::Plain,
        };
        Function {
            name: "pick".into(),
            ret_type: Type::int(32),
            vararg: false,
            args: vec![ValueId::new(0)],
            blocks: vec![
                Block {
                    name: "bb1".into(),
                    label: ValueId::new(1),
                    insts: vec![InstId::new(0)],
                },
                Block {
                    name: "bb2".into(),
                    label: ValueId::new(2),
                    insts: vec![InstId::new(1)],
                },
                Block {
                    name: "join".into(),
                    label: ValueId::new(3),
                    insts: vec![InstId::new(2), InstId::new(3)],
                },
            ],
            values,
            insts: vec![
                br(4),
                br(5),
                Instruction {
                    result: ValueId::new(6),
                    opcode: Opcode::Phi,
                    operands: vec![ValueId::new(0), ValueId::new(0)],
                    kind: InstKind::Phi {
                        incoming: vec![BlockId::new(0), BlockId::new(1)],
                    },
                },
                Instruction {
                    result: ValueId::new(7),
                    opcode: Opcode::Ret,
                    operands: vec![ValueId::new(6)],
                    kind: InstKind::Plain,
                },
            ],
        }
    }

    #[test]
    fn test_function_record_shape() {
        let record = encode_function(&phi_function());
        assert_eq!(record.name, "pick");
        assert_eq!(record.ret_type, "I32");
        assert_eq!(
            record.args,
            vec![ValueRecord {
                name: "v".into(),
                ty: "I32".into(),
                value: "v".into(),
            }]
        );
        let names: Vec<&str> = record.basic_blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["bb1", "bb2", "join"]);
        let opcodes: Vec<&str> = record.basic_blocks[2]
            .insts
            .iter()
            .map(|i| i.opcode.as_str())
            .collect();
        assert_eq!(opcodes, ["phi", "ret"]);
    }

    #[test]
    fn test_phi_operands_differ_only_in_prev_block() {
        let record = encode_function(&phi_function());
        let phi = &record.basic_blocks[2].insts[0];
        assert_eq!(phi.operands.len(), 2);
        let (a, b) = (&phi.operands[0], &phi.operands[1]);
        assert_eq!(a.prev_block.as_deref(), Some("bb1"));
        assert_eq!(b.prev_block.as_deref(), Some("bb2"));
        assert_eq!((&a.name, &a.ty, &a.value), (&b.name, &b.ty, &b.value));
    }

    #[test]
    fn test_non_phi_operands_have_no_prev_block() {
        let record = encode_function(&phi_function());
        let br = &record.basic_blocks[0].insts[0];
        assert_eq!(br.operands[0].value, "join");
        assert_eq!(br.operands[0].ty, "Label");
        assert!(br.operands[0].prev_block.is_none());
        let ret = &record.basic_blocks[2].insts[1];
        assert!(ret.operands[0].prev_block.is_none());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let func = phi_function();
        let first = serde_json::to_string(&encode_function(&func)).unwrap();
        let second = serde_json::to_string(&encode_function(&func)).unwrap();
        assert_eq!(first, second);
    }
}
