use super::codegen::CodeGen;
use crate::error::Error;
use crate::symbols::{ArrayVar, Var, Width};
use arch::{Dst, Inst, Src};

impl CodeGen {
    /// Cell offset of element `index` in a byte temporary. Wider indices are truncated.
    fn element_offset(&mut self, arr: &ArrayVar, index: &Var) -> Result<Var, Error> {
        let offset = self.temp(Width::Byte)?;
        self.load(index.cell(0));
        self.store(offset.cell(0));
        if index.width > Width::Nibble {
            self.load(index.cell(1));
        } else {
            self.load_imm(0);
        }
        self.store(offset.cell(1));

        if arr.width.cells() > 1 {
            self.shl(&offset);
        }
        if arr.width == Width::Word {
            self.shl(&offset);
        }
        Ok(offset)
    }

    fn point_b(&mut self, offset: &Var) {
        self.load(offset.cell(0));
        self.emit(Inst::LDBL);
        self.load(offset.cell(1));
        self.emit(Inst::LDBH);
    }

    /// `dst := arr[index]`
    pub fn array_read(&mut self, arr: &ArrayVar, index: &Var, dst: &Var) -> Result<(), Error> {
        let offset = self.element_offset(arr, index)?;
        let cells = arr.width.cells();
        for i in 0..cells {
            self.point_b(&offset);
            self.emit(Inst::BNK(arr.bank));
            self.emit(Inst::LDA(Src::Banked(arr.addr)));
            self.emit(Inst::BNK(0));
            self.store(dst.cell(i));
            if i + 1 < cells {
                self.inc(&offset);
            }
        }
        self.free_silent(&offset);
        Ok(())
    }

    /// `arr[index] := src`. `src` must have the element width.
    pub fn array_write(&mut self, arr: &ArrayVar, index: &Var, src: &Var) -> Result<(), Error> {
        assert_eq!(arr.width, src.width, "array element width mismatch");
        let offset = self.element_offset(arr, index)?;
        let cells = arr.width.cells();
        for i in 0..cells {
            self.point_b(&offset);
            self.load(src.cell(i));
            self.emit(Inst::BNK(arr.bank));
            self.emit(Inst::STA(Dst::Banked(arr.addr)));
            self.emit(Inst::BNK(0));
            if i + 1 < cells {
                self.inc(&offset);
            }
        }
        self.free_silent(&offset);
        Ok(())
    }

    /// Sets B to cell `idx` of a slot. The high nibble is reloaded only when it changes.
    fn point_b_const(&mut self, idx: u16) {
        self.load_imm((idx & 0xF) as u8);
        self.emit(Inst::LDBL);
        if idx == 0 || (idx & 0xF0) != ((idx - 1) & 0xF0) {
            self.load_imm(((idx & 0xF0) >> 4) as u8);
            self.emit(Inst::LDBH);
        }
    }

    /// Stores constant cells into the array from its first cell on.
    pub fn array_fill(&mut self, arr: &ArrayVar, cells: &[u8]) {
        self.emit(Inst::BNK(arr.bank));
        for (idx, value) in cells.iter().enumerate() {
            self.point_b_const(idx as u16);
            self.load_imm(*value);
            self.emit(Inst::STA(Dst::Banked(arr.addr)));
        }
        self.emit(Inst::BNK(0));
    }

    /// `dst := src` element by element. `src` must not be longer than `dst`.
    pub fn array_copy(&mut self, src: &ArrayVar, dst: &ArrayVar) {
        self.comment(&format!("{} := {}", dst.name, src.name));
        for idx in 0..src.size() {
            self.point_b_const(idx);
            self.emit(Inst::BNK(src.bank));
            self.emit(Inst::LDA(Src::Banked(src.addr)));
            self.emit(Inst::BNK(dst.bank));
            self.emit(Inst::STA(Dst::Banked(dst.addr)));
        }
        self.emit(Inst::BNK(0));
    }
}

/// Two cells per character, low nibble first. Fails on the first character above `\u{ff}`.
pub fn text_cells(text: &str) -> Result<Vec<u8>, char> {
    let mut cells = Vec::with_capacity(2 * text.len());
    for ch in text.chars() {
        let code = u8::try_from(ch).map_err(|_| ch)?;
        cells.extend([code & 0xF, code >> 4]);
    }
    Ok(cells)
}

/// Cells of each value at the element width.
pub fn value_cells(values: &[u16], width: Width) -> Vec<u8> {
    values
        .iter()
        .flat_map(|&value| (0..width.cells()).map(move |i| ((value >> (4 * i)) & 0xF) as u8))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_stored_as_bytes() {
        assert_eq!(text_cells("Hi"), Ok(vec![0x8, 0x4, 0x9, 0x6]));
        assert_eq!(text_cells("\u{e9}"), Ok(vec![0x9, 0xE]));
    }

    #[test]
    fn text_beyond_latin1() {
        assert_eq!(text_cells("a\u{20ac}b"), Err('\u{20ac}'));
    }

    #[test]
    fn values_follow_element_width() {
        assert_eq!(value_cells(&[0x12, 0x3], Width::Byte), vec![2, 1, 3, 0]);
        assert_eq!(value_cells(&[0x5], Width::Nibble), vec![5]);
    }

    #[test]
    fn fill_reloads_high_nibble_on_change() {
        let mut gen = CodeGen::new();
        let arr = gen.alloc.define_array("s", Width::Nibble, 32, "").unwrap();
        gen.array_fill(&arr, &[0; 17]);
        let ldbh = gen
            .items()
            .iter()
            .filter(|m| m.inst() == Some(&Inst::LDBH))
            .count();
        assert_eq!(ldbh, 2);
    }
}
