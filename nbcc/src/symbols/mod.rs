pub mod allocator;
pub mod scope;

use std::fmt;

/// Scalar width. Ordered by size so the wider of two operands is `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Width {
    Nibble,
    Byte,
    Word,
}

impl Width {
    /// Number of 4-bit memory cells.
    pub fn cells(self) -> u16 {
        match self {
            Width::Nibble => 1,
            Width::Byte => 2,
            Width::Word => 4,
        }
    }

    /// Narrowest width holding `value`.
    pub fn fit(value: u16) -> Width {
        match value {
            0..=0xF => Width::Nibble,
            0x10..=0xFF => Width::Byte,
            _ => Width::Word,
        }
    }

    pub fn parse(name: &str) -> Option<Width> {
        match name {
            "nibble" => Some(Width::Nibble),
            "byte" => Some(Width::Byte),
            "word" => Some(Width::Word),
            _ => None,
        }
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Width::Nibble => write!(f, "Nibble"),
            Width::Byte => write!(f, "Byte"),
            Width::Word => write!(f, "Word"),
        }
    }
}

/// Scalar variable in bank 0. Cell `i` lives at `addr + i`, least significant first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Var {
    pub name: String,
    pub width: Width,
    pub addr: u16,
    pub block: String,
    pub temp: bool,
}

impl Var {
    pub fn cells(&self) -> u16 {
        self.width.cells()
    }

    pub fn cell(&self, i: u16) -> u16 {
        self.addr + i
    }

    /// Most significant cell.
    pub fn top(&self) -> u16 {
        self.addr + self.cells() - 1
    }
}

/// Array living in its own 256-cell slot of a bank above 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayVar {
    pub name: String,
    pub width: Width,
    /// Offset of the slot inside the bank.
    pub addr: u16,
    pub len: u16,
    pub bank: u8,
    pub block: String,
}

impl ArrayVar {
    /// Total number of cells the elements occupy.
    pub fn size(&self) -> u16 {
        self.len * self.width.cells()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Scalar(Var),
    Array(ArrayVar),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Scalar(var) => &var.name,
            Symbol::Array(arr) => &arr.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_of_literal() {
        assert_eq!(Width::fit(15), Width::Nibble);
        assert_eq!(Width::fit(16), Width::Byte);
        assert_eq!(Width::fit(255), Width::Byte);
        assert_eq!(Width::fit(256), Width::Word);
    }

    #[test]
    fn widths_are_ordered() {
        assert!(Width::Nibble < Width::Byte && Width::Byte < Width::Word);
        assert_eq!(Width::Byte.max(Width::Word), Width::Word);
    }
}
