use std::fmt;

use strum::{Display, EnumString};

use crate::alu::Flags;

/// Source operand of `LDA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Src {
    /// `0Xh`
    Imm(u8),
    /// `[0XXXh]`, absolute cell in bank 0
    Mem(u16),
    /// `[B]0XXXh`, cell addressed by B and the current bank
    Banked(u16),
}

/// Destination operand of `STA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dst {
    Mem(u16),
    Banked(u16),
}

impl fmt::Display for Src {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Src::Imm(v) => write!(f, "{}", nibble(*v)),
            Src::Mem(addr) => write!(f, "[{}]", cell(*addr)),
            Src::Banked(addr) => write!(f, "[B]{}", cell(*addr)),
        }
    }
}

impl fmt::Display for Dst {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Dst::Mem(addr) => write!(f, "[{}]", cell(*addr)),
            Dst::Banked(addr) => write!(f, "[B]{}", cell(*addr)),
        }
    }
}

impl Src {
    /// Cell address of a memory operand.
    pub fn addr(&self) -> Option<u16> {
        match self {
            Src::Imm(_) => None,
            Src::Mem(addr) | Src::Banked(addr) => Some(*addr),
        }
    }
}

impl Dst {
    pub fn addr(&self) -> u16 {
        match self {
            Dst::Mem(addr) | Dst::Banked(addr) => *addr,
        }
    }
}

/// Jump kinds. `JE` is the assembler alias of `JZ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Jump {
    JMP,
    JA,
    JB,
    JZ,
    JE,
}

impl Jump {
    pub fn taken(self, flags: Flags) -> bool {
        match self {
            Jump::JMP => true,
            Jump::JA => !flags.carry && !flags.zero,
            Jump::JB => flags.carry,
            Jump::JZ | Jump::JE => flags.zero,
        }
    }
}

/// `0Xh`
pub fn nibble(v: u8) -> String {
    format!("0{:X}h", v & 0xF)
}

/// `0XXXh`
pub fn cell(addr: u16) -> String {
    format!("0{:03X}h", addr & 0xFFF)
}
