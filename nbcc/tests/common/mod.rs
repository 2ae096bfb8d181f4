#![allow(dead_code)]

use arch::alu::{valu, vcmp};
use arch::{Dst, Flags, Inst, Src};
use nbcc::symbols::{ArrayVar, Var};
use nbcc::{compile_source, Compilation, Line, Mnemonic, Options};
use std::collections::HashMap;

/// Interpreter for generated code, used to check what the code computes.
pub struct Machine {
    program: Vec<(Inst, usize)>,
    pub acc: u8,
    pub bl: u8,
    pub bh: u8,
    pub bank: u8,
    pub flags: Flags,
    /// 16 banks of 4096 cells. Bank 0 holds the scalars.
    pub mem: Vec<u8>,
    pub out: [u8; 16],
    pub inp: [u8; 16],
    pub steps: usize,
}

impl Machine {
    pub fn new(items: &[Mnemonic]) -> Self {
        let mut labels = HashMap::new();
        let mut insts = Vec::new();
        for m in items {
            match &m.line {
                Line::Label(name) => {
                    labels.insert(name.clone(), insts.len());
                }
                Line::Inst(inst) => insts.push(inst.clone()),
                Line::Raw { command, .. } => panic!("inline asm is not interpreted: {}", command),
                _ => {}
            }
        }
        let program = insts
            .into_iter()
            .map(|inst| {
                let target = match &inst {
                    Inst::JUMP(_, label) => *labels
                        .get(label)
                        .unwrap_or_else(|| panic!("undefined label {:?}", label)),
                    _ => 0,
                };
                (inst, target)
            })
            .collect();
        Self {
            program,
            acc: 0,
            bl: 0,
            bh: 0,
            bank: 0,
            flags: Flags::default(),
            mem: vec![0; 0x10000],
            out: [0; 16],
            inp: [0; 16],
            steps: 0,
        }
    }

    /// Direct addresses are 12 bits wide and land in the selected bank.
    fn direct(&self, addr: u16) -> usize {
        usize::from(addr & 0xFFF) + (usize::from(self.bank) << 12)
    }

    fn banked(&self, offset: u16) -> usize {
        usize::from(self.bl)
            + (usize::from(self.bh) << 4)
            + usize::from(offset & 0xF00)
            + (usize::from(self.bank) << 12)
    }

    /// Runs until `HLT` or the end of the program. Panics after `limit` steps.
    pub fn run(&mut self, limit: usize) {
        let mut pc = 0;
        while pc < self.program.len() {
            self.steps += 1;
            assert!(self.steps <= limit, "no halt after {} steps", limit);
            let (inst, target) = &self.program[pc];
            pc += 1;
            match inst {
                Inst::NOP => {}
                Inst::LDA(Src::Imm(v)) => self.acc = v & 0xF,
                Inst::LDA(Src::Mem(addr)) => self.acc = self.mem[self.direct(*addr)],
                Inst::LDA(Src::Banked(offset)) => self.acc = self.mem[self.banked(*offset)],
                Inst::STA(Dst::Mem(addr)) => {
                    let at = self.direct(*addr);
                    self.mem[at] = self.acc;
                }
                Inst::STA(Dst::Banked(offset)) => {
                    let at = self.banked(*offset);
                    self.mem[at] = self.acc;
                }
                Inst::LDBL => self.bl = self.acc,
                Inst::LDBH => self.bh = self.acc,
                Inst::CALC(op) => self.acc = valu(*op, self.acc, self.bl, &mut self.flags),
                Inst::CMP => vcmp(self.acc, self.bl, &mut self.flags),
                Inst::JUMP(kind, _) => {
                    if kind.taken(self.flags) {
                        pc = *target;
                    }
                }
                Inst::STC(v) => self.flags.carry = *v != 0,
                Inst::BNK(v) => self.bank = v & 0xF,
                Inst::OUT(port) => self.out[usize::from(*port)] = self.acc,
                Inst::IN(port) => self.acc = self.inp[usize::from(*port)],
                Inst::HLT => return,
            }
        }
    }

    pub fn set(&mut self, var: &Var, value: u16) {
        for i in 0..var.cells() {
            self.mem[usize::from(var.cell(i))] = ((value >> (4 * i)) & 0xF) as u8;
        }
    }

    pub fn get(&self, var: &Var) -> u16 {
        (0..var.cells()).fold(0, |acc, i| {
            acc | (u16::from(self.mem[usize::from(var.cell(i))]) << (4 * i))
        })
    }

    pub fn element(&self, arr: &ArrayVar, idx: u16) -> u16 {
        let cells = arr.width.cells();
        let base = (usize::from(arr.bank) << 12) + usize::from(arr.addr);
        (0..cells).fold(0, |acc, i| {
            let at = base + usize::from(idx * cells + i);
            acc | (u16::from(self.mem[at]) << (4 * i))
        })
    }

    pub fn set_element(&mut self, arr: &ArrayVar, idx: u16, value: u16) {
        let cells = arr.width.cells();
        let base = (usize::from(arr.bank) << 12) + usize::from(arr.addr);
        for i in 0..cells {
            self.mem[base + usize::from(idx * cells + i)] = ((value >> (4 * i)) & 0xF) as u8;
        }
    }
}

pub fn compile(code: &str) -> Compilation {
    compile_source("test.pas", code, &Options::default())
}

/// Compiles and panics with the diagnostic if compilation failed.
pub fn compile_ok(code: &str) -> Compilation {
    let c = compile(code);
    if let Some(e) = &c.error {
        panic!("{}: {:?}\n{}", e, e.location(), code);
    }
    c
}

pub fn var(c: &Compilation, name: &str) -> Var {
    c.symbols
        .vars()
        .iter()
        .find(|var| var.name == name)
        .cloned()
        .unwrap_or_else(|| panic!("no variable {}", name))
}

pub fn array(c: &Compilation, name: &str) -> ArrayVar {
    c.symbols
        .arrays()
        .iter()
        .find(|arr| arr.name == name)
        .cloned()
        .unwrap_or_else(|| panic!("no array {}", name))
}

/// Runs the program once with the given inputs preset.
pub fn exec(c: &Compilation, inputs: &[(&str, u16)]) -> Machine {
    let mut m = Machine::new(&c.mnemonics);
    for (name, value) in inputs {
        m.set(&var(c, name), *value);
    }
    m.run(1_000_000);
    m
}

/// Deterministic pseudo random values for sampled tests.
pub struct Lcg(u32);

impl Lcg {
    pub fn new(seed: u32) -> Self {
        Self(seed)
    }

    pub fn next(&mut self) -> u16 {
        self.0 = self.0.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        (self.0 >> 8) as u16
    }
}
