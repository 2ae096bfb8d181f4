use super::codegen::CodeGen;
use crate::error::Error;
use crate::symbols::{Var, Width};
use arch::{Inst, Jump, ALU};

impl CodeGen {
    /// `z := x * y` by shift and add. The product wraps at the operand width.
    pub fn mul(&mut self, x: &Var, y: &Var, z: &Var) -> Result<(), Error> {
        self.comment(&format!("{} = {} * {}", z.name, x.name, y.name));

        let a = self.temp(x.width)?;
        let b = self.temp(x.width)?;
        self.comment("a := x");
        self.assign(x, &a, None);
        self.comment("b := y");
        self.assign(y, &b, None);
        self.comment("z := 0");
        self.set_zero(z);

        self.comment("WHILE b > 0 DO");
        let start = self.new_label();
        let exit = self.new_label();
        let body = self.new_label();
        self.place(&start);
        self.load_imm(0);
        self.emit(Inst::LDBL);
        self.carry(0);
        if x.width == Width::Nibble {
            self.load(b.cell(0));
            self.emit(Inst::CMP);
            self.jump(Jump::JZ, &exit);
        } else {
            for i in 0..b.cells() {
                self.load(b.cell(i));
                self.emit(Inst::CMP);
                self.jump(Jump::JA, &body);
            }
            self.jump(Jump::JMP, &exit);
            self.place(&body);
        }

        self.comment("IF ODD b THEN");
        let even = self.new_label();
        self.load_imm(1);
        self.emit(Inst::LDBL);
        self.load(b.cell(0));
        self.calc(ALU::AND);
        self.jump(Jump::JZ, &even);
        self.comment("z := z + a;");
        self.alu_op(ALU::ADD, z, &a, z);
        self.place(&even);

        self.comment("a := 2 * a;");
        self.shl(&a);
        self.comment("b := b / 2;");
        self.shr(&b);
        self.jump(Jump::JMP, &start);
        self.place(&exit);

        self.free_silent(&a);
        self.free_silent(&b);
        Ok(())
    }

    /// `q := x / y`, or `x % y` when `modulo` is set, by shift and subtract.
    /// The divisor is doubled only while its top bit is clear, so it never overflows.
    /// Division by zero does not terminate.
    pub fn div(&mut self, x: &Var, y: &Var, q: &Var, modulo: bool) -> Result<(), Error> {
        let op = if modulo { "%" } else { "/" };
        self.comment(&format!("{} = {} {} {}", q.name, x.name, op, y.name));

        let r = self.temp(x.width)?;
        let w = self.temp(x.width)?;
        self.assign(x, &r, None);
        self.assign(y, &w, None);
        self.set_zero(q);

        self.comment("WHILE w <= r AND w < 2^(n-1) DO w := 2 * w;");
        let start = self.new_label();
        let body = self.new_label();
        let shift = self.new_label();
        let exit = self.new_label();
        self.place(&start);
        self.compare(&w, &r, &exit, &body);
        self.place(&body);
        self.load_imm(0x8);
        self.emit(Inst::LDBL);
        self.load(w.top());
        self.calc(ALU::AND);
        self.jump(Jump::JZ, &shift);
        self.jump(Jump::JMP, &exit);
        self.place(&shift);
        self.shl(&w);
        self.jump(Jump::JMP, &start);
        self.place(&exit);

        self.comment("LOOP");
        let next = self.new_label();
        let sub = self.new_label();
        let halve = self.new_label();
        let done = self.new_label();
        let lp = self.new_label();
        self.place(&lp);
        self.comment("IF w <= r THEN");
        self.compare(&w, &r, &next, &sub);
        self.place(&sub);
        self.comment("r := r - w");
        self.alu_op(ALU::SUB, &r, &w, &r);
        self.comment("q := q + 1");
        self.inc(q);
        self.place(&next);

        self.comment("IF w = y THEN EXIT");
        self.compare(&w, y, &halve, &done);
        self.jump(Jump::JMP, &done);
        self.place(&halve);
        self.comment("q := 2 * q;");
        self.shl(q);
        self.comment("w := w / 2;");
        self.shr(&w);
        self.jump(Jump::JMP, &lp);
        self.place(&done);

        if modulo {
            self.assign(&r, q, None);
        }

        self.free_silent(&r);
        self.free_silent(&w);
        Ok(())
    }
}
