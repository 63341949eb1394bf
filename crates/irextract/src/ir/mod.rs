//! Read-only object model of the compiler IR.
//!
//! A [`Module`] owns [`Function`]s; a function owns its basic blocks,
//! instructions and values. Uses are references by id ([`ValueId`]), never
//! ownership, so a phi may refer to a value defined in a block that comes
//! later in the function.

mod function;
mod instr;
mod types;
mod value;

pub use function::*;
pub use instr::*;
pub use types::*;
pub use value::*;
