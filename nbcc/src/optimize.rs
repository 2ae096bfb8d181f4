use crate::compile::{Line, Mnemonic};
use arch::operand::cell;
use arch::{Dst, Inst, Src};

/// Peephole cleanup over a finished sequence. Every jump must already have its target.
pub fn optimize(mut items: Vec<Mnemonic>) -> Vec<Mnemonic> {
    redundant(&mut items);
    dead_stores(&mut items);
    items
}

/// Drops reloads of a just-stored cell and jumps to the label right below them.
fn redundant(items: &mut Vec<Mnemonic>) {
    let mut idx = 0;
    while idx < items.len() {
        if reloads_stored(items, idx) || jumps_to_next(items, idx) {
            items.remove(idx);
        } else {
            idx += 1;
        }
    }
}

/// `STA [x]` then `LDA [x]`, ignoring comments and carry updates in between.
fn reloads_stored(items: &[Mnemonic], idx: usize) -> bool {
    let Some(Inst::LDA(Src::Mem(addr))) = items[idx].inst() else {
        return false;
    };
    let prev = items[..idx]
        .iter()
        .rev()
        .find(|m| !m.is_comment() && !matches!(m.inst(), Some(Inst::STC(_))));
    matches!(
        prev.and_then(Mnemonic::inst),
        Some(Inst::STA(Dst::Mem(stored))) if stored == addr
    )
}

fn jumps_to_next(items: &[Mnemonic], idx: usize) -> bool {
    let Some(Inst::JUMP(_, target)) = items[idx].inst() else {
        return false;
    };
    items[idx + 1..]
        .iter()
        .find(|m| !m.is_comment())
        .map_or(false, |m| matches!(&m.line, Line::Label(label) if label == target))
}

/// Drops stores into temporaries that are released before anything reads them.
fn dead_stores(items: &mut Vec<Mnemonic>) {
    let mut idx = 0;
    while idx < items.len() {
        if let Some(Inst::STA(Dst::Mem(addr))) = items[idx].inst() {
            if let Some(release) = unread_release(items, idx, *addr) {
                items.remove(release);
                items.remove(idx);
                continue;
            }
        }
        idx += 1;
    }
}

/// Position of the release of `addr` after `idx`, if nothing touches `addr` before it.
fn unread_release(items: &[Mnemonic], idx: usize, addr: u16) -> Option<usize> {
    let text = cell(addr);
    for (pos, m) in items.iter().enumerate().skip(idx + 1) {
        match &m.line {
            Line::Release(released) if *released == addr => return Some(pos),
            Line::EndProc(_) => return None,
            Line::Inst(Inst::LDA(Src::Mem(used)) | Inst::STA(Dst::Mem(used))) if *used == addr => {
                return None
            }
            Line::Raw {
                param: Some(param), ..
            } if param.contains(&text) => return None,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::Sequence;
    use arch::Jump;

    fn build(lines: Vec<Line>) -> Vec<Mnemonic> {
        let mut seq = Sequence::new();
        for line in lines {
            seq.push(line);
        }
        seq.into_vec()
    }

    fn text(items: &[Mnemonic]) -> Vec<String> {
        items.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn reload_after_store() {
        let items = build(vec![
            Line::Inst(Inst::STA(Dst::Mem(5))),
            Line::Comment("; note".to_string()),
            Line::Inst(Inst::STC(0)),
            Line::Inst(Inst::LDA(Src::Mem(5))),
            Line::Inst(Inst::LDA(Src::Mem(6))),
        ]);
        assert_eq!(
            text(&optimize(items)),
            vec!["\tSTA [0005h]", "; note", "\tSTC 00h", "\tLDA [0006h]"]
        );
    }

    #[test]
    fn reload_after_label_is_kept() {
        let items = build(vec![
            Line::Inst(Inst::STA(Dst::Mem(5))),
            Line::Label("@label0".to_string()),
            Line::Inst(Inst::LDA(Src::Mem(5))),
        ]);
        assert_eq!(optimize(items).len(), 3);
    }

    #[test]
    fn jump_to_following_label() {
        let items = build(vec![
            Line::Inst(Inst::JUMP(Jump::JZ, "@label1".to_string())),
            Line::Release(3),
            Line::Label("@label1".to_string()),
            Line::Inst(Inst::JUMP(Jump::JMP, "@label0".to_string())),
            Line::Label("@label1".to_string()),
        ]);
        assert_eq!(
            text(&optimize(items)),
            vec!["; free [0003h]", "@label1:", "\tJMP @label0", "@label1:"]
        );
    }

    #[test]
    fn store_released_unread() {
        let items = build(vec![
            Line::Inst(Inst::STA(Dst::Mem(7))),
            Line::Inst(Inst::LDA(Src::Imm(1))),
            Line::Release(7),
        ]);
        assert_eq!(text(&optimize(items)), vec!["\tLDA 01h"]);
    }

    #[test]
    fn store_read_before_release() {
        let items = build(vec![
            Line::Inst(Inst::STA(Dst::Mem(7))),
            Line::Inst(Inst::LDA(Src::Imm(1))),
            Line::Inst(Inst::LDA(Src::Mem(7))),
            Line::Release(7),
        ]);
        assert_eq!(optimize(items).len(), 4);
    }

    #[test]
    fn store_stops_at_procedure_end() {
        let items = build(vec![
            Line::Inst(Inst::STA(Dst::Mem(7))),
            Line::EndProc("p".to_string()),
            Line::Release(7),
        ]);
        assert_eq!(optimize(items).len(), 3);
    }

    #[test]
    fn store_read_by_inline_asm() {
        let items = build(vec![
            Line::Inst(Inst::STA(Dst::Mem(7))),
            Line::Raw {
                command: "LDA".to_string(),
                param: Some("[0007h]".to_string()),
            },
            Line::Release(7),
        ]);
        assert_eq!(optimize(items).len(), 3);
    }
}
