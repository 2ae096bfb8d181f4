use strum::{Display, EnumString};

/// Operations of the nibble ALU. The second operand is always the B-low register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ALU {
    NOT,
    ADD,
    SUB,
    AND,
    OR,
    SHL,
    SHR,
    XOR,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub carry: bool,
    pub zero: bool,
}

/// Applies `op` to the accumulator and `b`, updating carry and zero.
/// Only the low nibble of the inputs is significant.
pub fn valu(op: ALU, acc: u8, b: u8, flags: &mut Flags) -> u8 {
    use ALU::*;
    let (acc, b) = (acc & 0xF, b & 0xF);
    let res = match op {
        NOT => !acc & 0xF,
        ADD => {
            let sum = acc + b + flags.carry as u8;
            flags.carry = sum > 0xF;
            sum & 0xF
        }
        SUB => {
            let diff = acc as i8 - b as i8 - flags.carry as i8;
            flags.carry = diff < 0;
            (diff & 0xF) as u8
        }
        AND => acc & b,
        OR => acc | b,
        XOR => acc ^ b,
        SHL => {
            let res = ((acc << 1) | flags.carry as u8) & 0xF;
            flags.carry = acc & 0x8 != 0;
            res
        }
        SHR => {
            let res = (acc >> 1) | if flags.carry { 0x8 } else { 0 };
            flags.carry = acc & 0x1 != 0;
            res
        }
    };
    flags.zero = res == 0;
    res
}

/// `CMP`: subtracts `b` and the carry from the accumulator, keeping only the flags.
pub fn vcmp(acc: u8, b: u8, flags: &mut Flags) {
    let diff = (acc & 0xF) as i8 - (b & 0xF) as i8 - flags.carry as i8;
    flags.carry = diff < 0;
    flags.zero = diff == 0;
}
