pub mod arith;
pub mod array;
pub mod branch;
pub mod codegen;
pub mod cond;
pub mod proc;
pub mod seq;

pub use branch::Branch;
pub use codegen::CodeGen;
pub use cond::Relation;
pub use proc::{Call, Proc};
pub use seq::{Line, Mnemonic, SeqId, Sequence};
