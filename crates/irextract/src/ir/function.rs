//! Functions, basic blocks and modules.

use super::instr::{InstId, Instruction};
use super::types::{Type, TypeTable};
use super::value::{Idx, ValueData, ValueId};

/// Marker type for the basic block index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockTag;

/// Index into `Function::blocks`.
pub type BlockId = Idx<BlockTag>;

/// A basic block: instructions in execution order, single entry and exit.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Declared label, empty for numbered blocks.
    pub name: String,
    /// The block's label value (what branches and phis refer to).
    pub label: ValueId,
    pub insts: Vec<InstId>,
}

/// A function definition or declaration.
///
/// All values and instructions are owned by arenas on the function; blocks
/// and instructions refer into them by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub ret_type: Type,
    pub vararg: bool,
    /// Formal arguments in declared order.
    pub args: Vec<ValueId>,
    /// Basic blocks in declaration order; empty for a declaration.
    pub blocks: Vec<Block>,
    pub values: Vec<ValueData>,
    pub insts: Vec<Instruction>,
}

impl Function {
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn value(&self, id: ValueId) -> &ValueData {
        &self.values[id.as_usize()]
    }

    pub fn inst(&self, id: InstId) -> &Instruction {
        &self.insts[id.as_usize()]
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.as_usize()]
    }

    /// Argument values in declared order.
    pub fn arguments(&self) -> impl Iterator<Item = &ValueData> + '_ {
        self.args.iter().map(|&id| self.value(id))
    }

    /// Instructions of `block` in execution order.
    pub fn block_insts<'a>(&'a self, block: &'a Block) -> impl Iterator<Item = &'a Instruction> + 'a {
        block.insts.iter().map(|&id| self.inst(id))
    }
}

/// A translation unit: named struct types plus functions in source order.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub types: TypeTable,
    pub functions: Vec<Function>,
    /// Whether pointers are opaque (`ptr`) rather than typed (`i32*`).
    pub opaque_pointers: bool,
}

impl Module {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Functions with a body, in source order.
    pub fn definitions(&self) -> impl Iterator<Item = &Function> + '_ {
        self.functions.iter().filter(|f| !f.is_declaration())
    }
}
