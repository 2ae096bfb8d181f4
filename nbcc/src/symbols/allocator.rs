use super::{ArrayVar, Var, Width};
use crate::error::Error;
use crate::grammer::token::Pos;
use std::collections::HashMap;

/// Cells of scalar memory in bank 0.
pub const MEM_SIZE: u16 = 4096;
/// Cells reserved per array.
pub const SLOT_SIZE: u16 = 256;
const SLOTS_PER_BANK: u16 = 16;
const MAX_BANK: u8 = 15;
const TEMP_PREFIX: &str = "$SYS";

/// Hands out scalar cells in bank 0 and array slots in banks 1..=15.
/// Scalar memory is never reclaimed; temporaries are recycled through per-width pools.
pub struct Allocator {
    free: u16,
    slot: u16,
    bank: u8,
    pools: HashMap<Width, Vec<Var>>,
    temps: usize,
    vars: Vec<Var>,
    arrays: Vec<ArrayVar>,
    here: Pos,
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Allocator {
    pub fn new() -> Self {
        Self {
            free: 0,
            slot: 0,
            bank: 1,
            pools: HashMap::new(),
            temps: 0,
            vars: Vec::new(),
            arrays: Vec::new(),
            here: Pos::default(),
        }
    }

    /// Source position reported by out-of-memory errors.
    pub fn locate(&mut self, pos: &Pos) {
        self.here = pos.clone();
    }

    pub fn here(&self) -> &Pos {
        &self.here
    }

    pub fn define_var(&mut self, name: &str, width: Width, block: &str) -> Result<Var, Error> {
        self.define(name, width, block, false)
    }

    fn define(&mut self, name: &str, width: Width, block: &str, temp: bool) -> Result<Var, Error> {
        if self.free + width.cells() > MEM_SIZE {
            return Err(Error::out_of_memory(
                &self.here,
                format!("no room for {} {}", width, name),
            ));
        }
        let var = Var {
            name: name.to_string(),
            width,
            addr: self.free,
            block: block.to_string(),
            temp,
        };
        self.free += width.cells();
        self.vars.push(var.clone());
        Ok(var)
    }

    pub fn define_array(
        &mut self,
        name: &str,
        width: Width,
        len: u16,
        block: &str,
    ) -> Result<ArrayVar, Error> {
        if self.bank > MAX_BANK {
            return Err(Error::out_of_memory(
                &self.here,
                format!("no bank left for array {}", name),
            ));
        }
        let arr = ArrayVar {
            name: name.to_string(),
            width,
            addr: self.slot * SLOT_SIZE,
            len,
            bank: self.bank,
            block: block.to_string(),
        };
        self.slot += 1;
        if self.slot == SLOTS_PER_BANK {
            self.slot = 0;
            self.bank += 1;
        }
        self.arrays.push(arr.clone());
        Ok(arr)
    }

    /// Pops a pooled temporary of `width` or defines a new one.
    pub fn temp(&mut self, width: Width) -> Result<Var, Error> {
        if let Some(var) = self.pools.get_mut(&width).and_then(Vec::pop) {
            return Ok(var);
        }
        let name = format!("{}{}", TEMP_PREFIX, self.temps);
        self.temps += 1;
        self.define(&name, width, "", true)
    }

    /// Returns a temporary to its pool. User variables are left alone.
    pub fn release(&mut self, var: &Var) -> bool {
        if !var.temp {
            return false;
        }
        self.pools.entry(var.width).or_default().push(var.clone());
        true
    }

    pub fn used(&self) -> u16 {
        self.free
    }

    pub fn vars(&self) -> &[Var] {
        &self.vars
    }

    pub fn arrays(&self) -> &[ArrayVar] {
        &self.arrays
    }

    /// Symbol table in the layout the IDE reads.
    pub fn symbol_table(&self) -> Vec<String> {
        let mut lines = vec![
            format!("{} bytes used.", self.free),
            format!("{} bytes free.", MEM_SIZE - self.free),
            String::new(),
        ];
        for var in &self.vars {
            let end = match var.width {
                Width::Nibble => "\t".to_string(),
                _ => format!("-${:03X}", var.top()),
            };
            lines.push(format!("${:03X}{}\t{}\t{}", var.addr, end, var.width, var.name));
        }
        lines.push(String::new());
        for arr in &self.arrays {
            let end = arr.addr + arr.size().max(1) - 1;
            lines.push(format!(
                "${bank}:{:03X}-${bank}:{:03X}\t{}[{}]\t{}",
                arr.addr,
                end,
                arr.width,
                arr.len,
                arr.name,
                bank = arr.bank
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_packed() {
        let mut alloc = Allocator::new();
        let a = alloc.define_var("a", Width::Nibble, "").unwrap();
        let b = alloc.define_var("b", Width::Word, "").unwrap();
        let c = alloc.define_var("c", Width::Byte, "").unwrap();
        assert_eq!((a.addr, b.addr, c.addr), (0, 1, 5));
        assert_eq!(alloc.used(), 7);
    }

    #[test]
    fn memory_boundary() {
        let mut alloc = Allocator::new();
        for i in 0..MEM_SIZE {
            alloc.define_var(&format!("v{}", i), Width::Nibble, "").unwrap();
        }
        assert!(matches!(
            alloc.define_var("over", Width::Nibble, ""),
            Err(Error::OutOfMemory { .. })
        ));
    }

    #[test]
    fn word_does_not_straddle_end() {
        let mut alloc = Allocator::new();
        for i in 0..MEM_SIZE - 2 {
            alloc.define_var(&format!("v{}", i), Width::Nibble, "").unwrap();
        }
        assert!(alloc.define_var("w", Width::Word, "").is_err());
        assert!(alloc.define_var("b", Width::Byte, "").is_ok());
    }

    #[test]
    fn temps_are_recycled_per_width() {
        let mut alloc = Allocator::new();
        let t0 = alloc.temp(Width::Byte).unwrap();
        let t1 = alloc.temp(Width::Nibble).unwrap();
        assert_eq!((t0.name.as_str(), t1.name.as_str()), ("$SYS0", "$SYS1"));
        assert!(alloc.release(&t0));
        assert_eq!(alloc.temp(Width::Nibble).unwrap().name, "$SYS2");
        assert_eq!(alloc.temp(Width::Byte).unwrap(), t0);
    }

    #[test]
    fn user_vars_are_not_pooled() {
        let mut alloc = Allocator::new();
        let a = alloc.define_var("a", Width::Byte, "").unwrap();
        assert!(!alloc.release(&a));
        assert_eq!(alloc.temp(Width::Byte).unwrap().name, "$SYS0");
    }

    #[test]
    fn arrays_fill_banks() {
        let mut alloc = Allocator::new();
        let mut last = None;
        for i in 0..15 * 16 {
            last = Some(alloc.define_array(&format!("a{}", i), Width::Byte, 4, "").unwrap());
        }
        let last = last.unwrap();
        assert_eq!((last.bank, last.addr), (15, 0xF00));
        assert!(alloc.define_array("over", Width::Byte, 4, "").is_err());
    }

    #[test]
    fn symbol_table_layout() {
        let mut alloc = Allocator::new();
        alloc.define_var("n", Width::Nibble, "").unwrap();
        alloc.define_var("w", Width::Word, "").unwrap();
        alloc.define_array("s", Width::Byte, 10, "").unwrap();
        assert_eq!(
            alloc.symbol_table(),
            vec![
                "5 bytes used.",
                "4091 bytes free.",
                "",
                "$000\t\tNibble\tn",
                "$001-$004\tWord\tw",
                "",
                "$1:000-$1:013\tByte[10]\ts",
            ]
        );
    }
}
