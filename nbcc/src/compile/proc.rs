use super::codegen::CodeGen;
use super::seq::{Edit, Line, SeqId};
use crate::error::Error;
use crate::grammer::token::Pos;
use crate::symbols::Var;
use arch::{Dst, Inst, Jump, Src, ALU};
use indexmap::IndexMap;
use std::collections::HashMap;

/// The selector nibble limits a procedure to this many call sites.
pub const MAX_CALLS: usize = 16;

#[derive(Debug, Clone)]
pub struct Call {
    /// The `JMP` into the procedure.
    pub id: SeqId,
    pub ret: String,
}

/// A procedure has no stack frame. It returns through a jump chosen by `selector`,
/// which each call site sets to its own index.
#[derive(Debug, Clone)]
pub struct Proc {
    pub name: String,
    pub label: String,
    pub selector: Var,
    pub calls: Vec<Call>,
    /// `NOP` marking the end of the body, replaced by the return dispatch.
    pub end: Option<SeqId>,
    pub pos: Pos,
}

impl CodeGen {
    pub fn call(&mut self, proc: &mut Proc) {
        let id = self.jump(Jump::JMP, &proc.label);
        let ret = self.new_label();
        self.place(&ret);
        proc.calls.push(Call { id, ret });
    }

    pub fn end_proc(&mut self, proc: &mut Proc) {
        proc.end = Some(self.nop());
        self.seq.push(Line::EndProc(proc.name.clone()));
    }

    /// Replaces every end marker with its return dispatch, in declaration order.
    pub fn dispatch(&mut self, procs: &IndexMap<String, Proc>) -> Result<(), Error> {
        if let Some(proc) = procs.values().find(|p| p.calls.len() > MAX_CALLS) {
            return Err(Error::syntax(
                &proc.pos,
                format!("too many calls of procedure {}", proc.name),
            ));
        }

        let mut edits = HashMap::new();
        for proc in procs.values().filter(|p| !p.calls.is_empty()) {
            let Some(end) = proc.end else {
                panic!("procedure {} has no end marker", proc.name);
            };
            edits.insert(end, Edit::Replace(return_dispatch(proc)));
            if proc.calls.len() > 1 {
                for (idx, call) in proc.calls.iter().enumerate() {
                    let set = vec![
                        Line::Inst(Inst::LDA(Src::Imm(idx as u8))),
                        Line::Inst(Inst::STA(Dst::Mem(proc.selector.addr))),
                    ];
                    edits.insert(call.id, Edit::InsertBefore(set));
                }
            }
        }
        self.seq.rewrite(edits);
        Ok(())
    }
}

/// Counts the selector down to zero, jumping to the matching return label.
fn return_dispatch(proc: &Proc) -> Vec<Line> {
    let jump = |kind, label: &str| Line::Inst(Inst::JUMP(kind, label.to_string()));
    let n = proc.calls.len();
    if n == 1 {
        return vec![jump(Jump::JMP, &proc.calls[0].ret)];
    }

    let mut lines = vec![
        Line::Inst(Inst::STC(0)),
        Line::Inst(Inst::LDA(Src::Imm(1))),
        Line::Inst(Inst::LDBL),
        Line::Inst(Inst::LDA(Src::Mem(proc.selector.addr))),
        Line::Inst(Inst::CALC(ALU::SUB)),
        jump(Jump::JB, &proc.calls[0].ret),
    ];
    for (idx, call) in proc.calls.iter().enumerate().skip(1) {
        if idx == n - 1 {
            lines.push(jump(Jump::JMP, &call.ret));
        } else {
            lines.push(jump(Jump::JZ, &call.ret));
            if idx < n - 2 {
                lines.push(Line::Inst(Inst::CALC(ALU::SUB)));
            }
        }
    }
    lines
}
