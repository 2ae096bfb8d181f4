use super::branch::Branch;
use super::seq::{Line, Mnemonic, SeqId, Sequence};
use crate::error::Error;
use crate::symbols::allocator::Allocator;
use crate::symbols::{Var, Width};
use arch::{Dst, Inst, Jump, Src, ALU};

/// Emits instruction sequences for the parser. Owns the output sequence and the memory allocator.
pub struct CodeGen {
    pub(super) seq: Sequence,
    pub alloc: Allocator,
    labels: usize,
}

impl Default for CodeGen {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGen {
    pub fn new() -> Self {
        Self {
            seq: Sequence::new(),
            alloc: Allocator::new(),
            labels: 0,
        }
    }

    pub fn into_parts(self) -> (Sequence, Allocator) {
        (self.seq, self.alloc)
    }

    pub fn items(&self) -> &[Mnemonic] {
        self.seq.items()
    }
}

// ----------------------------------------------------------------------------
// Emission helpers
// ----------------------------------------------------------------------------

impl CodeGen {
    pub fn emit(&mut self, inst: Inst) -> SeqId {
        self.seq.push(Line::Inst(inst))
    }

    pub(super) fn load(&mut self, addr: u16) {
        self.emit(Inst::LDA(Src::Mem(addr)));
    }

    pub(super) fn load_imm(&mut self, value: u8) {
        self.emit(Inst::LDA(Src::Imm(value & 0xF)));
    }

    pub(super) fn store(&mut self, addr: u16) {
        self.emit(Inst::STA(Dst::Mem(addr)));
    }

    pub(super) fn calc(&mut self, op: ALU) {
        self.emit(Inst::CALC(op));
    }

    pub(super) fn carry(&mut self, value: u8) {
        self.emit(Inst::STC(value));
    }

    pub fn new_label(&mut self) -> String {
        let label = format!("@label{}", self.labels);
        self.labels += 1;
        label
    }

    pub fn place(&mut self, label: &str) {
        self.seq.push(Line::Label(label.to_string()));
    }

    pub fn comment(&mut self, text: &str) {
        self.seq.push(Line::Comment(format!("; {}", text)));
    }

    pub fn jump(&mut self, kind: Jump, label: &str) -> SeqId {
        self.emit(Inst::JUMP(kind, label.to_string()))
    }

    pub fn raw(&mut self, command: &str, param: Option<String>) {
        self.seq.push(Line::Raw {
            command: command.to_string(),
            param,
        });
    }

    /// Line of an inline `asm` block that is kept as it was written.
    pub fn verbatim(&mut self, text: &str) {
        self.seq.push(Line::Comment(text.to_string()));
    }

    pub fn branch_true(&mut self, branch: &mut Branch, kind: Jump) {
        branch.jump_true(&mut self.seq, kind);
    }

    pub fn branch_false(&mut self, branch: &mut Branch, kind: Jump) {
        branch.jump_false(&mut self.seq, kind);
    }

    pub fn resolve_true(&mut self, branch: &mut Branch, label: &str) {
        branch.resolve_true(&mut self.seq, label);
    }

    pub fn resolve_false(&mut self, branch: &mut Branch, label: &str) {
        branch.resolve_false(&mut self.seq, label);
    }

    pub fn temp(&mut self, width: Width) -> Result<Var, Error> {
        self.alloc.temp(width)
    }

    /// Returns a temporary to its pool and records the release in the output.
    pub fn free(&mut self, var: &Var) {
        if self.alloc.release(var) {
            self.seq.push(Line::Release(var.addr));
        }
    }

    /// Returns an internal temporary without a release marker.
    pub(super) fn free_silent(&mut self, var: &Var) {
        self.alloc.release(var);
    }
}

// ----------------------------------------------------------------------------
// Scalars
// ----------------------------------------------------------------------------

impl CodeGen {
    /// Resets the output ports and enters `@main`.
    pub fn init(&mut self) {
        self.emit(Inst::BNK(0));
        self.load_imm(0);
        for port in 0..4 {
            self.emit(Inst::OUT(port));
        }
        self.load_imm(2);
        self.emit(Inst::OUT(4));
        self.jump(Jump::JMP, "@main");
    }

    pub fn nop(&mut self) -> SeqId {
        self.emit(Inst::NOP)
    }

    /// Copies `src` into `dst` cell by cell, optionally passing each cell through `op`.
    pub fn assign(&mut self, src: &Var, dst: &Var, op: Option<ALU>) {
        for i in 0..src.cells() {
            self.load(src.cell(i));
            if let Some(op) = op {
                self.calc(op);
            }
            self.store(dst.cell(i));
        }
    }

    pub fn assign_const(&mut self, value: u16, dst: &Var) {
        for i in 0..dst.cells() {
            self.load_imm((value >> (4 * i)) as u8);
            self.store(dst.cell(i));
        }
    }

    pub fn set_zero(&mut self, var: &Var) {
        self.load_imm(0);
        for i in 0..var.cells() {
            self.store(var.cell(i));
        }
    }

    /// Copies between different widths. Narrowing truncates; widening zero-fills.
    pub fn change_width(&mut self, src: &Var, dst: &Var) {
        assert_ne!(src.width, dst.width, "conversion between equal widths");

        self.load(src.cell(0));
        self.store(dst.cell(0));

        if src.width > dst.width {
            if dst.width != Width::Nibble {
                self.load(src.cell(1));
                self.store(dst.cell(1));
            }
            return;
        }

        if src.width == Width::Byte {
            self.load(src.cell(1));
            self.store(dst.cell(1));
            self.load_imm(0);
        } else {
            self.load_imm(0);
            self.store(dst.cell(1));
        }

        if dst.width == Width::Word {
            self.store(dst.cell(2));
            self.store(dst.cell(3));
        }
    }

    /// `dst := a op b` for two operands of equal width. Add and subtract chain the carry upward.
    pub fn alu_op(&mut self, op: ALU, a: &Var, b: &Var, dst: &Var) {
        self.comment(&format!("{} = {} {} {}", dst.name, a.name, op, b.name));
        let chained = matches!(op, ALU::ADD | ALU::SUB);
        for i in 0..a.cells() {
            self.load(b.cell(i));
            self.emit(Inst::LDBL);
            self.load(a.cell(i));
            if chained && i == 0 {
                self.carry(0);
            }
            self.calc(op);
            self.store(dst.cell(i));
        }
    }

    pub fn inc(&mut self, var: &Var) {
        self.step(var, ALU::ADD);
    }

    pub fn dec(&mut self, var: &Var) {
        self.step(var, ALU::SUB);
    }

    fn step(&mut self, var: &Var, op: ALU) {
        self.carry(1);
        self.load_imm(0);
        self.emit(Inst::LDBL);
        self.assign(var, var, Some(op));
    }

    pub fn shl(&mut self, var: &Var) {
        self.carry(0);
        self.assign(var, var, Some(ALU::SHL));
    }

    pub fn shr(&mut self, var: &Var) {
        self.carry(0);
        for i in (0..var.cells()).rev() {
            self.load(var.cell(i));
            self.calc(ALU::SHR);
            self.store(var.cell(i));
        }
    }

    /// Low half of `var`. A nibble is its own low half.
    pub fn lo(&mut self, var: &Var) -> Result<Var, Error> {
        self.half(var, 0)
    }

    pub fn hi(&mut self, var: &Var) -> Result<Var, Error> {
        self.half(var, var.cells() / 2)
    }

    fn half(&mut self, var: &Var, from: u16) -> Result<Var, Error> {
        let width = match var.width {
            Width::Nibble => return Ok(var.clone()),
            Width::Byte => Width::Nibble,
            Width::Word => Width::Byte,
        };
        let res = self.temp(width)?;
        for i in 0..res.cells() {
            self.load(var.cell(from + i));
            self.store(res.cell(i));
        }
        Ok(res)
    }

    /// Writes the low cell of `var` to `port`.
    pub fn out(&mut self, port: u8, var: &Var) {
        self.load(var.cell(0));
        self.emit(Inst::OUT(port));
    }

    /// Reads one nibble from `port` into `var`, clearing the upper cells.
    pub fn inp(&mut self, port: u8, var: &Var) {
        self.emit(Inst::IN(port));
        self.store(var.cell(0));
        if var.cells() > 1 {
            self.load_imm(0);
            for i in 1..var.cells() {
                self.store(var.cell(i));
            }
        }
    }

    /// Unsigned compare from the most significant cell down. Falls through when equal.
    pub fn compare(&mut self, a: &Var, b: &Var, above: &str, below: &str) {
        self.carry(0);
        for i in (0..a.cells()).rev() {
            self.load(b.cell(i));
            self.emit(Inst::LDBL);
            self.load(a.cell(i));
            self.emit(Inst::CMP);
            self.jump(Jump::JA, above);
            self.jump(Jump::JB, below);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(gen: &CodeGen) -> Vec<String> {
        gen.items().iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn preamble() {
        let mut gen = CodeGen::new();
        gen.init();
        assert_eq!(
            text(&gen),
            vec![
                "\tBNK 00h", "\tLDA 00h", "\tOUT 00h", "\tOUT 01h", "\tOUT 02h", "\tOUT 03h",
                "\tLDA 02h", "\tOUT 04h", "\tJMP @main",
            ]
        );
    }

    #[test]
    fn constant_cells_low_first() {
        let mut gen = CodeGen::new();
        let w = gen.alloc.define_var("w", Width::Word, "").unwrap();
        gen.assign_const(0x1A2B, &w);
        assert_eq!(
            text(&gen),
            vec![
                "\tLDA 0Bh", "\tSTA [0000h]", "\tLDA 02h", "\tSTA [0001h]",
                "\tLDA 0Ah", "\tSTA [0002h]", "\tLDA 01h", "\tSTA [0003h]",
            ]
        );
    }

    #[test]
    fn widen_nibble_to_word() {
        let mut gen = CodeGen::new();
        let n = gen.alloc.define_var("n", Width::Nibble, "").unwrap();
        let w = gen.alloc.define_var("w", Width::Word, "").unwrap();
        gen.change_width(&n, &w);
        assert_eq!(
            text(&gen),
            vec![
                "\tLDA [0000h]", "\tSTA [0001h]", "\tLDA 00h", "\tSTA [0002h]",
                "\tSTA [0003h]", "\tSTA [0004h]",
            ]
        );
    }

    #[test]
    #[should_panic]
    fn equal_width_conversion_panics() {
        let mut gen = CodeGen::new();
        let a = gen.alloc.define_var("a", Width::Byte, "").unwrap();
        let b = gen.alloc.define_var("b", Width::Byte, "").unwrap();
        gen.change_width(&a, &b);
    }

    #[test]
    fn add_clears_carry_once() {
        let mut gen = CodeGen::new();
        let a = gen.alloc.define_var("a", Width::Byte, "").unwrap();
        let b = gen.alloc.define_var("b", Width::Byte, "").unwrap();
        gen.alu_op(ALU::ADD, &a, &b, &a);
        let lines = text(&gen);
        assert_eq!(lines[0], "; a = a ADD b");
        assert_eq!(lines.iter().filter(|l| *l == "\tSTC 00h").count(), 1);
        assert_eq!(lines.iter().filter(|l| *l == "\tADD").count(), 2);
    }

    #[test]
    fn free_marks_only_temps() {
        let mut gen = CodeGen::new();
        let a = gen.alloc.define_var("a", Width::Byte, "").unwrap();
        let t = gen.temp(Width::Byte).unwrap();
        gen.free(&a);
        gen.free(&t);
        assert_eq!(text(&gen), vec!["; free [0002h]"]);
    }

    #[test]
    fn hi_of_word_is_upper_byte() {
        let mut gen = CodeGen::new();
        let w = gen.alloc.define_var("w", Width::Word, "").unwrap();
        let h = gen.hi(&w).unwrap();
        assert_eq!(h.width, Width::Byte);
        assert_eq!(
            text(&gen),
            vec!["\tLDA [0002h]", "\tSTA [0004h]", "\tLDA [0003h]", "\tSTA [0005h]"]
        );
    }
}
