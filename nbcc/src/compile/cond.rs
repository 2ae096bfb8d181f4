use super::branch::Branch;
use super::codegen::CodeGen;
use crate::error::Error;
use crate::symbols::Var;
use arch::{Inst, Jump, ALU};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CodeGen {
    /// Compares `a` with `b` cell by cell from the top, leaving every exit pending.
    pub fn eval_condition(&mut self, a: &Var, b: &Var, rel: Relation) -> Result<Branch, Error> {
        if a.width != b.width {
            return Err(Error::syntax(
                self.alloc.here(),
                format!("types not equal in condition: {} and {}", a.width, b.width),
            ));
        }

        let mut br = Branch::new();
        self.carry(0);
        for i in (0..a.cells()).rev() {
            self.load(b.cell(i));
            self.emit(Inst::LDBL);
            self.load(a.cell(i));
            self.emit(Inst::CMP);
            self.branching(rel, &mut br, i == 0);
        }
        Ok(br)
    }

    /// Exits for one cell of a comparison. The lowest cell also decides equality.
    fn branching(&mut self, rel: Relation, br: &mut Branch, last: bool) {
        use Relation::*;
        match rel {
            Eq | Ne => {
                let next = self.new_label();
                self.jump(Jump::JE, &next);
                if rel == Eq {
                    br.jump_false(&mut self.seq, Jump::JMP);
                } else {
                    br.jump_true(&mut self.seq, Jump::JMP);
                }
                self.place(&next);
                if last {
                    if rel == Eq {
                        br.jump_true(&mut self.seq, Jump::JMP);
                    } else {
                        br.jump_false(&mut self.seq, Jump::JMP);
                    }
                }
            }
            Gt | Ge => {
                br.jump_true(&mut self.seq, Jump::JA);
                br.jump_false(&mut self.seq, Jump::JB);
            }
            Lt | Le => {
                br.jump_true(&mut self.seq, Jump::JB);
                br.jump_false(&mut self.seq, Jump::JA);
            }
        }
        if last {
            match rel {
                Gt | Lt => br.jump_false(&mut self.seq, Jump::JMP),
                Ge | Le => br.jump_true(&mut self.seq, Jump::JMP),
                Eq | Ne => {}
            }
        }
    }

    /// `odd v`: tests bit 0 of the lowest cell.
    pub fn check_odd(&mut self, var: &Var) -> Branch {
        let mut br = Branch::new();
        self.load_imm(1);
        self.emit(Inst::LDBL);
        self.load(var.cell(0));
        self.calc(ALU::AND);
        br.jump_false(&mut self.seq, Jump::JZ);
        br.jump_true(&mut self.seq, Jump::JMP);
        br
    }

    /// `v > 0` and `v # 0`: any non-zero cell makes it true.
    pub fn check_not_zero(&mut self, var: &Var) -> Branch {
        let mut br = Branch::new();
        self.carry(0);
        self.load_imm(0);
        self.emit(Inst::LDBL);
        for i in 0..var.cells() {
            self.load(var.cell(i));
            self.emit(Inst::CMP);
            br.jump_true(&mut self.seq, Jump::JA);
        }
        br.jump_false(&mut self.seq, Jump::JMP);
        br
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::Width;

    #[test]
    fn equality_of_nibbles() {
        let mut gen = CodeGen::new();
        let a = gen.alloc.define_var("a", Width::Nibble, "").unwrap();
        let b = gen.alloc.define_var("b", Width::Nibble, "").unwrap();
        let mut br = gen.eval_condition(&a, &b, Relation::Eq).unwrap();
        gen.resolve_true(&mut br, "@t");
        gen.resolve_false(&mut br, "@f");
        let text: Vec<_> = gen.items().iter().map(|m| m.to_string()).collect();
        assert_eq!(
            text,
            vec![
                "\tSTC 00h", "\tLDA [0001h]", "\tLDBL", "\tLDA [0000h]", "\tCMP",
                "\tJE @label0", "\tJMP @f", "@label0:", "\tJMP @t",
            ]
        );
    }

    #[test]
    fn mismatched_widths_are_rejected() {
        let mut gen = CodeGen::new();
        let a = gen.alloc.define_var("a", Width::Nibble, "").unwrap();
        let b = gen.alloc.define_var("b", Width::Byte, "").unwrap();
        assert!(matches!(
            gen.eval_condition(&a, &b, Relation::Lt),
            Err(Error::Syntax { .. })
        ));
    }

    #[test]
    fn not_zero_checks_every_cell() {
        let mut gen = CodeGen::new();
        let w = gen.alloc.define_var("w", Width::Word, "").unwrap();
        let mut br = gen.check_not_zero(&w);
        gen.resolve_true(&mut br, "@t");
        gen.resolve_false(&mut br, "@f");
        assert!(br.is_resolved());
        let ja = gen
            .items()
            .iter()
            .filter(|m| m.to_string() == "\tJA @t")
            .count();
        assert_eq!(ja, 4);
    }
}
