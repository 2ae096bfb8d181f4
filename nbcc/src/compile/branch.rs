use super::seq::{Line, SeqId, Sequence};
use arch::{Inst, Jump};

/// Jumps of a condition still waiting for their targets.
/// Whoever receives a `Branch` must resolve both lists.
#[must_use]
#[derive(Debug, Default)]
pub struct Branch {
    on_true: Vec<SeqId>,
    on_false: Vec<SeqId>,
}

impl Branch {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(seq: &mut Sequence, kind: Jump) -> SeqId {
        seq.push(Line::Inst(Inst::JUMP(kind, String::new())))
    }

    pub fn jump_true(&mut self, seq: &mut Sequence, kind: Jump) {
        self.on_true.push(Self::pending(seq, kind));
    }

    pub fn jump_false(&mut self, seq: &mut Sequence, kind: Jump) {
        self.on_false.push(Self::pending(seq, kind));
    }

    pub fn resolve_true(&mut self, seq: &mut Sequence, label: &str) {
        for id in self.on_true.drain(..) {
            seq.patch(id, label);
        }
    }

    pub fn resolve_false(&mut self, seq: &mut Sequence, label: &str) {
        for id in self.on_false.drain(..) {
            seq.patch(id, label);
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.on_true.is_empty() && self.on_false.is_empty()
    }
}
