use crate::{
    alu::ALU,
    operand::{nibble, Dst, Jump, Src},
};

use color_print::cformat;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inst {
    NOP,
    LDA(Src),
    STA(Dst),
    LDBL,
    LDBH,
    CALC(ALU),
    CMP,
    /// Jump target is a label name. An empty name is a jump still waiting for its target.
    JUMP(Jump, String),
    STC(u8),
    BNK(u8),
    OUT(u8),
    IN(u8),
    HLT,
}

impl Inst {
    pub fn command(&self) -> String {
        match self {
            Inst::NOP => "NOP".to_string(),
            Inst::LDA(_) => "LDA".to_string(),
            Inst::STA(_) => "STA".to_string(),
            Inst::LDBL => "LDBL".to_string(),
            Inst::LDBH => "LDBH".to_string(),
            Inst::CALC(alu) => alu.to_string(),
            Inst::CMP => "CMP".to_string(),
            Inst::JUMP(kind, _) => kind.to_string(),
            Inst::STC(_) => "STC".to_string(),
            Inst::BNK(_) => "BNK".to_string(),
            Inst::OUT(_) => "OUT".to_string(),
            Inst::IN(_) => "IN".to_string(),
            Inst::HLT => "HLT".to_string(),
        }
    }

    pub fn param(&self) -> Option<String> {
        match self {
            Inst::LDA(src) => Some(src.to_string()),
            Inst::STA(dst) => Some(dst.to_string()),
            Inst::JUMP(_, label) if label.is_empty() => None,
            Inst::JUMP(_, label) => Some(label.clone()),
            Inst::STC(v) | Inst::BNK(v) | Inst::OUT(v) | Inst::IN(v) => Some(nibble(*v)),
            _ => None,
        }
    }

    pub fn cformat(&self) -> String {
        match self.param() {
            Some(param) => match self {
                Inst::JUMP(..) => cformat!("<r>{:<5}</><g>{}</>", self.command(), param),
                Inst::LDA(Src::Imm(_)) | Inst::STC(_) | Inst::BNK(_) | Inst::OUT(_) | Inst::IN(_) => {
                    cformat!("<r>{:<5}</><y>{}</>", self.command(), param)
                }
                _ => cformat!("<r>{:<5}</><b>{}</>", self.command(), param),
            },
            None => cformat!("<r>{}</>", self.command()),
        }
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.param() {
            Some(param) => write!(f, "{} {}", self.command(), param),
            None => write!(f, "{}", self.command()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_inst {
        ($name:ident, $inst:expr, $text:expr) => {
            #[test]
            fn $name() {
                assert_eq!($inst.to_string(), $text);
            }
        };
    }

    test_inst!(nop, Inst::NOP, "NOP");
    test_inst!(lda_imm, Inst::LDA(Src::Imm(2)), "LDA 02h");
    test_inst!(lda_mem, Inst::LDA(Src::Mem(0x01F)), "LDA [001Fh]");
    test_inst!(sta_banked, Inst::STA(Dst::Banked(0x200)), "STA [B]0200h");
    test_inst!(alu, Inst::CALC(ALU::SHR), "SHR");
    test_inst!(jump, Inst::JUMP(Jump::JA, "@label3".into()), "JA @label3");
    test_inst!(unresolved, Inst::JUMP(Jump::JMP, String::new()), "JMP");
    test_inst!(stc, Inst::STC(1), "STC 01h");
    test_inst!(bank, Inst::BNK(15), "BNK 0Fh");
}
