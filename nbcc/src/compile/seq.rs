use arch::{operand::cell, Inst};
use std::collections::HashMap;
use std::fmt;

/// Stable identity of a sequence entry. Survives insertions around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeqId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Inst(Inst),
    Label(String),
    /// Printed verbatim, including the leading `;`.
    Comment(String),
    /// `; free [addr]`, marks the point a temporary went back to its pool.
    Release(u16),
    /// `; endproc name`
    EndProc(String),
    /// Line of an inline `asm` block.
    Raw { command: String, param: Option<String> },
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Line::Inst(inst) => write!(f, "\t{}", inst),
            Line::Label(name) => write!(f, "{}:", name),
            Line::Comment(text) => write!(f, "{}", text),
            Line::Release(addr) => write!(f, "; free [{}]", cell(*addr)),
            Line::EndProc(name) => write!(f, "; endproc {}", name),
            Line::Raw { command, param: Some(param) } => write!(f, "\t{} {}", command, param),
            Line::Raw { command, param: None } => write!(f, "\t{}", command),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mnemonic {
    pub id: SeqId,
    pub line: Line,
}

impl Mnemonic {
    pub fn inst(&self) -> Option<&Inst> {
        match &self.line {
            Line::Inst(inst) => Some(inst),
            _ => None,
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(
            self.line,
            Line::Comment(_) | Line::Release(_) | Line::EndProc(_)
        )
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.line.fmt(f)
    }
}

/// Splice applied to one entry during [`Sequence::rewrite`].
#[derive(Debug, Clone)]
pub enum Edit {
    Replace(Vec<Line>),
    InsertBefore(Vec<Line>),
}

/// Output under construction. Append-only while parsing; jumps are patched by id.
#[derive(Debug, Default)]
pub struct Sequence {
    items: Vec<Mnemonic>,
    index: HashMap<SeqId, usize>,
    next: usize,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    fn make(&mut self, line: Line) -> Mnemonic {
        let id = SeqId(self.next);
        self.next += 1;
        Mnemonic { id, line }
    }

    pub fn push(&mut self, line: Line) -> SeqId {
        let m = self.make(line);
        let id = m.id;
        self.index.insert(id, self.items.len());
        self.items.push(m);
        id
    }

    #[cfg(test)]
    fn get(&self, id: SeqId) -> Option<&Mnemonic> {
        self.index.get(&id).map(|&pos| &self.items[pos])
    }

    /// Sets the target of a pending jump. Each jump gets its target exactly once.
    pub fn patch(&mut self, id: SeqId, label: &str) {
        let pos = match self.index.get(&id) {
            Some(&pos) => pos,
            None => panic!("patch of unknown sequence id {:?}", id),
        };
        match &mut self.items[pos].line {
            Line::Inst(Inst::JUMP(_, target)) if target.is_empty() => *target = label.to_string(),
            other => panic!("cannot patch {:?} with {}", other, label),
        }
    }

    /// Applies all edits in one pass. Every edited id must exist.
    pub fn rewrite(&mut self, mut edits: HashMap<SeqId, Edit>) {
        let items = std::mem::take(&mut self.items);
        let mut out = Vec::with_capacity(items.len() + edits.len() * 4);
        for m in items {
            match edits.remove(&m.id) {
                None => out.push(m),
                Some(Edit::InsertBefore(lines)) => {
                    out.extend(lines.into_iter().map(|line| self.make(line)));
                    out.push(m);
                }
                Some(Edit::Replace(lines)) => {
                    out.extend(lines.into_iter().map(|line| self.make(line)));
                }
            }
        }
        if let Some(id) = edits.keys().next() {
            panic!("rewrite of unknown sequence id {:?}", id);
        }
        self.index = out.iter().enumerate().map(|(pos, m)| (m.id, pos)).collect();
        self.items = out;
    }

    /// First jump that never received a target.
    pub fn unresolved(&self) -> Option<&Mnemonic> {
        self.items
            .iter()
            .find(|m| matches!(&m.line, Line::Inst(Inst::JUMP(_, target)) if target.is_empty()))
    }

    pub fn items(&self) -> &[Mnemonic] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<Mnemonic> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch::{Jump, Src};

    #[test]
    fn line_text() {
        assert_eq!(Line::Inst(Inst::LDA(Src::Mem(3))).to_string(), "\tLDA [0003h]");
        assert_eq!(Line::Label("@main".into()).to_string(), "@main:");
        assert_eq!(Line::Release(0x12).to_string(), "; free [0012h]");
        assert_eq!(Line::EndProc("p".into()).to_string(), "; endproc p");
        let raw = Line::Raw {
            command: "OUT".into(),
            param: Some("1".into()),
        };
        assert_eq!(raw.to_string(), "\tOUT 1");
    }

    #[test]
    fn patch_sets_target_once() {
        let mut seq = Sequence::new();
        let id = seq.push(Line::Inst(Inst::JUMP(Jump::JZ, String::new())));
        assert!(seq.unresolved().is_some());
        seq.patch(id, "@label0");
        assert!(seq.unresolved().is_none());
        assert_eq!(seq.items()[0].to_string(), "\tJZ @label0");
    }

    #[test]
    #[should_panic]
    fn patch_twice_panics() {
        let mut seq = Sequence::new();
        let id = seq.push(Line::Inst(Inst::JUMP(Jump::JMP, String::new())));
        seq.patch(id, "@a");
        seq.patch(id, "@b");
    }

    #[test]
    fn rewrite_keeps_ids() {
        let mut seq = Sequence::new();
        let a = seq.push(Line::Label("a".into()));
        let b = seq.push(Line::Inst(Inst::NOP));
        let c = seq.push(Line::Label("c".into()));
        let mut edits = HashMap::new();
        edits.insert(b, Edit::Replace(vec![Line::Inst(Inst::HLT)]));
        edits.insert(c, Edit::InsertBefore(vec![Line::Inst(Inst::LDBL)]));
        seq.rewrite(edits);
        let text: Vec<_> = seq.items().iter().map(|m| m.to_string()).collect();
        assert_eq!(text, vec!["a:", "\tHLT", "\tLDBL", "c:"]);
        assert_eq!(seq.get(a).map(|m| m.to_string()), Some("a:".into()));
        assert!(seq.get(b).is_none());
        assert!(seq.get(c).is_some());
    }

    #[test]
    #[should_panic]
    fn rewrite_of_unknown_id_panics() {
        let mut seq = Sequence::new();
        let mut edits = HashMap::new();
        edits.insert(SeqId(42), Edit::Replace(vec![]));
        seq.rewrite(edits);
    }
}
