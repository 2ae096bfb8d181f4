pub mod alu;
pub mod inst;
pub mod operand;

pub use alu::{Flags, ALU};
pub use inst::Inst;
pub use operand::{Dst, Jump, Src};
