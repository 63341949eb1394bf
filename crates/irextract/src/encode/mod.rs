//! IR → JSON record encoding.
//!
//! Pure functions over a read-only [`Function`](crate::ir::Function), built
//! bottom-up:
//!
//! | Module          | Produces                                          |
//! |-----------------|---------------------------------------------------|
//! | [`types`]       | canonical type names (`I32`, `Array-4-I32`, ...)  |
//! | [`value`]       | `{name, type, value}` and operand records         |
//! | [`instruction`] | instruction records with opcode-specific fields   |
//! | [`function`]    | block and function records                        |
//!
//! Every record is fully built by the function that returns it. Record
//! fields are declared in key order, so serialized objects have sorted keys.

pub mod function;
pub mod instruction;
pub mod types;
pub mod value;

pub use function::{encode_block, encode_function, BlockRecord, FunctionRecord};
pub use instruction::{encode_instruction, InstructionRecord};
pub use types::type_name;
pub use value::{encode_operand, encode_value, OperandRecord, ValueRecord};
