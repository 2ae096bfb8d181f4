use super::parsercore::Parser;
use super::token::{Token, TokenKind::*};
use crate::compile::array::{text_cells, value_cells};
use crate::compile::{Branch, CodeGen, Proc, Relation};
use crate::error::Error;
use crate::symbols::allocator::SLOT_SIZE;
use crate::symbols::{self, Symbol, Width};
use crate::{check, expect, optional, separated};
use arch::{operand::cell, Jump, ALU};

#[derive(Debug, Clone, Copy)]
enum BinOp {
    Calc(ALU),
    Mul,
    Div,
    Mod,
}

impl Parser {
    /// Parses the whole program. The generator comes back even on error so the partial
    /// output can still be written.
    pub fn parse(mut self) -> (CodeGen, Result<(), Error>) {
        let result = self
            .parse_program()
            .and_then(|_| self.gen.dispatch(&self.procs));
        (self.gen, result)
    }
}

// ----------------------------------------------------------------------------
// Declarations
// ----------------------------------------------------------------------------

impl Parser {
    /// program = block "."
    fn parse_program(&mut self) -> Result<(), Error> {
        self.gen.init();
        self.parse_block("@main", "main")?;
        expect!(self, Period)?;
        Ok(())
    }

    /// block = { "const" consts | "var" vars | "procedure" procedure } statement
    fn parse_block(&mut self, label: &str, name: &str) -> Result<(), Error> {
        self.scope.enter();
        loop {
            if optional!(self, Const).is_some() {
                self.parse_consts()?;
            } else if optional!(self, Var).is_some() {
                self.parse_vars(name)?;
            } else if optional!(self, Procedure).is_some() {
                self.parse_procedure()?;
            } else {
                break;
            }
        }
        self.gen.place(label);
        self.parse_statement()?;
        self.scope.leave();
        Ok(())
    }

    /// consts = ident "=" number { "," ident "=" number } ";"
    /// Constants are checked but not bound.
    fn parse_consts(&mut self) -> Result<(), Error> {
        loop {
            expect!(self, Ident)?;
            expect!(self, Equal)?;
            let token = expect!(self, Number)?;
            parse_number(&token)?;
            if optional!(self, Comma).is_none() {
                break;
            }
        }
        expect!(self, Semicolon)?;
        Ok(())
    }

    /// vars = decl { ( "," | ";" ) decl } ";"
    /// decl = ident { "," ident } ":" type [ "[" number "]" ]
    fn parse_vars(&mut self, block: &str) -> Result<(), Error> {
        loop {
            let mut names = vec![expect!(self, Ident)?];
            while optional!(self, Comma).is_some() {
                names.push(expect!(self, Ident)?);
            }
            expect!(self, Colon)?;
            let ty = expect!(self, DataType)?;
            let width = Width::parse(&ty.text)
                .ok_or_else(|| Error::syntax(&ty.pos, format!("unknown type {}", ty.text)))?;

            let len = match optional!(self, LBracket) {
                Some(_) => {
                    let token = expect!(self, Number)?;
                    let len = parse_number(&token)?;
                    expect!(self, RBracket)?;
                    if len == 0 {
                        return Err(Error::syntax(&token.pos, "array length must be positive"));
                    }
                    if u32::from(len) * u32::from(width.cells()) > u32::from(SLOT_SIZE) {
                        return Err(Error::syntax(
                            &token.pos,
                            format!("array of {} {} exceeds {} cells", len, width, SLOT_SIZE),
                        ));
                    }
                    Some(len)
                }
                None => None,
            };

            for name in names {
                self.gen.alloc.locate(&name.pos);
                let symbol = match len {
                    Some(len) => Symbol::Array(self.gen.alloc.define_array(&name.text, width, len, block)?),
                    None => Symbol::Scalar(self.gen.alloc.define_var(&name.text, width, block)?),
                };
                if !self.scope.declare(symbol) {
                    return Err(Error::syntax(
                        &name.pos,
                        format!("duplicate identifier {}", name.text),
                    ));
                }
            }

            if optional!(self, Comma).is_some() {
                continue;
            }
            expect!(self, Semicolon)?;
            if !self.starts_declaration() {
                break;
            }
        }
        Ok(())
    }

    /// `ident :` or `ident ,` continues a `var` section after its `;`.
    fn starts_declaration(&self) -> bool {
        check!(self, Ident) && self.peek_nth(1).map_or(false, |t| matches!(t.kind, Colon | Comma))
    }

    /// procedure = ident ";" block ";"
    fn parse_procedure(&mut self) -> Result<(), Error> {
        let token = expect!(self, Ident)?;
        expect!(self, Semicolon)?;
        let name = token.text.clone();
        // Labels are global, so a name is taken even after its block has closed.
        if self.procs.contains_key(&name) || !self.scope.declare_proc(&name) {
            return Err(Error::syntax(
                &token.pos,
                format!("duplicate procedure {}", name),
            ));
        }

        self.gen.alloc.locate(&token.pos);
        let selector = self
            .gen
            .alloc
            .define_var(&format!("$procret_{}", name), Width::Nibble, "")?;
        let label = format!("@proc_{}", name);
        self.procs.insert(
            name.clone(),
            Proc {
                name: name.clone(),
                label: label.clone(),
                selector,
                calls: Vec::new(),
                end: None,
                pos: token.pos.clone(),
            },
        );

        self.parse_block(&label, &name)?;
        expect!(self, Semicolon)?;

        if let Some(proc) = self.procs.get_mut(&name) {
            self.gen.end_proc(proc);
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Statements
// ----------------------------------------------------------------------------

impl Parser {
    fn parse_statement(&mut self) -> Result<(), Error> {
        self.sync();
        let Some(token) = self.peek().cloned() else {
            return Err(Error::syntax(&self.here(), "unexpected end of file"));
        };
        match token.kind {
            Ident => self.parse_assignment(),
            Call => self.parse_call(),
            Begin => {
                expect!(self, Begin)?;
                separated!(self, self.parse_statement(), End);
                expect!(self, End)?;
                Ok(())
            }
            Asm => self.parse_asm(),
            If => self.parse_if(),
            While => self.parse_while(),
            Repeat => self.parse_repeat(),
            For => self.parse_for(),
            Shr | Shl | Inc | Dec => {
                self.next();
                let var = self.parse_scalar_ident(&token.text)?;
                match token.kind {
                    Shr => self.gen.shr(&var),
                    Shl => self.gen.shl(&var),
                    Inc => self.gen.inc(&var),
                    _ => self.gen.dec(&var),
                }
                Ok(())
            }
            Nop => {
                self.next();
                self.gen.nop();
                Ok(())
            }
            Outp => {
                self.next();
                let port = self.parse_port()?;
                expect!(self, Comma)?;
                let value = self.parse_expression()?;
                self.gen.out(port, &value);
                self.gen.free(&value);
                Ok(())
            }
            Inp => {
                self.next();
                let var = self.parse_scalar_ident("inp")?;
                expect!(self, Comma)?;
                let port = self.parse_port()?;
                self.gen.inp(port, &var);
                Ok(())
            }
            _ => Err(Error::syntax(
                &token.pos,
                format!("unknown statement: {}", token.text),
            )),
        }
    }

    /// Port number, 0 to 15.
    fn parse_port(&mut self) -> Result<u8, Error> {
        let token = expect!(self, Number)?;
        match parse_number(&token)? {
            port @ 0..=15 => Ok(port as u8),
            port => Err(Error::syntax(
                &token.pos,
                format!("port {} out of range 0..15", port),
            )),
        }
    }

    fn lookup(&self, token: &Token) -> Result<Symbol, Error> {
        self.scope
            .get(&token.text)
            .cloned()
            .ok_or_else(|| Error::syntax(&token.pos, format!("unknown variable {}", token.text)))
    }

    /// Identifier that must name a scalar. `what` names the construct for the error.
    fn parse_scalar_ident(&mut self, what: &str) -> Result<symbols::Var, Error> {
        let token = expect!(self, Ident)?;
        match self.lookup(&token)? {
            Symbol::Scalar(var) => Ok(var),
            Symbol::Array(_) => Err(Error::syntax(
                &token.pos,
                format!("{} not allowed for arrays", what),
            )),
        }
    }

    /// assignment = ident ":=" expr
    ///            | ident "[" expr "]" ":=" expr
    ///            | ident ":=" ( "(" number { "," number } ")" | ident | text )
    fn parse_assignment(&mut self) -> Result<(), Error> {
        let token = expect!(self, Ident)?;
        match self.lookup(&token)? {
            Symbol::Scalar(dst) => {
                expect!(self, Assign)?;
                let value = self.parse_expression()?;
                self.store(&value, &dst);
                self.gen.free(&value);
            }
            Symbol::Array(arr) => {
                if optional!(self, LBracket).is_some() {
                    let index = self.parse_expression()?;
                    expect!(self, RBracket)?;
                    expect!(self, Assign)?;
                    let value = self.parse_expression()?;
                    let value = self.convert(value, arr.width)?;
                    self.gen.array_write(&arr, &index, &value)?;
                    self.gen.free(&index);
                    self.gen.free(&value);
                    return Ok(());
                }

                expect!(self, Assign)?;
                if optional!(self, LParen).is_some() {
                    let mut values = Vec::new();
                    loop {
                        values.push(parse_number(&expect!(self, Number)?)?);
                        if optional!(self, Comma).is_none() {
                            break;
                        }
                    }
                    expect!(self, RParen)?;
                    let cells = value_cells(&values, arr.width);
                    if cells.len() > usize::from(arr.size()) {
                        return Err(Error::syntax(
                            &token.pos,
                            format!("array {} too short for array assignment", arr.name),
                        ));
                    }
                    self.gen.array_fill(&arr, &cells);
                } else if let Some(src_token) = optional!(self, Ident) {
                    let Symbol::Array(src) = self.lookup(&src_token)? else {
                        return Err(Error::syntax(
                            &src_token.pos,
                            format!("variable {} has to be of array type.", src_token.text),
                        ));
                    };
                    if src.width != arr.width {
                        return Err(Error::syntax(
                            &src_token.pos,
                            format!("types of {} and {} different.", arr.name, src.name),
                        ));
                    }
                    if src.len > arr.len {
                        return Err(Error::syntax(
                            &src_token.pos,
                            format!("array {} too short for {}", arr.name, src.name),
                        ));
                    }
                    self.gen.array_copy(&src, &arr);
                } else {
                    let text = expect!(self, Text | Number)?;
                    let inner = text
                        .text
                        .strip_prefix('\'')
                        .and_then(|s| s.strip_suffix('\''))
                        .ok_or_else(|| {
                            Error::syntax(&text.pos, format!("invalid string {}", text.text))
                        })?;
                    let cells = text_cells(inner).map_err(|ch| {
                        Error::syntax(&text.pos, format!("character {} does not fit in a byte", ch))
                    })?;
                    if cells.len() > usize::from(arr.size()) {
                        return Err(Error::syntax(
                            &text.pos,
                            format!("array {} too short for string {}", arr.name, text.text),
                        ));
                    }
                    self.gen.array_fill(&arr, &cells);
                }
            }
        }
        Ok(())
    }

    /// call = "call" ident
    fn parse_call(&mut self) -> Result<(), Error> {
        expect!(self, Call)?;
        let token = expect!(self, Ident)?;
        let visible = self.scope.has_proc(&token.text);
        match self.procs.get_mut(&token.text).filter(|_| visible) {
            Some(proc) => {
                self.gen.call(proc);
                Ok(())
            }
            None => Err(Error::syntax(
                &token.pos,
                format!("unknown procedure {}", token.text),
            )),
        }
    }

    /// asm = "asm" { line } "end"
    fn parse_asm(&mut self) -> Result<(), Error> {
        expect!(self, Asm)?;
        while let Some(line) = optional!(self, AsmLine) {
            self.parse_asm_line(&line)?;
        }
        expect!(self, End)?;
        Ok(())
    }

    /// Copies one line of inline assembly, replacing `(name)` and `(name+n)` with addresses.
    fn parse_asm_line(&mut self, line: &Token) -> Result<(), Error> {
        let text = line.text.trim();
        if text.starts_with(';') {
            self.gen.verbatim(text);
            return Ok(());
        }
        match text.split_once(' ') {
            None => match text.strip_suffix(':') {
                Some(label) => self.gen.place(label),
                None => self.gen.raw(text, None),
            },
            Some((command, param)) => {
                let mut param = param.to_string();
                while let Some(open) = param.find('(') {
                    let Some(len) = param[open..].find(')').filter(|&len| len > 1) else {
                        break;
                    };
                    let inner = &param[open + 1..open + len];
                    let (name, offset) = match inner.split_once('+') {
                        Some((name, offset)) => (name.trim(), offset.trim()),
                        None => (inner.trim(), "0"),
                    };
                    let base = match self.scope.get(name) {
                        Some(Symbol::Scalar(var)) => var.addr,
                        Some(Symbol::Array(arr)) => arr.addr,
                        None => {
                            return Err(Error::syntax(
                                &line.pos,
                                format!("unknown variable: {}", name),
                            ))
                        }
                    };
                    let offset: u16 = offset.parse().map_err(|_| {
                        Error::syntax(&line.pos, format!("invalid offset: {}", offset))
                    })?;
                    param.replace_range(open..open + len + 1, &cell(base.wrapping_add(offset)));
                }
                self.gen.raw(command.trim(), Some(param));
            }
        }
        Ok(())
    }

    /// if = "if" cond "then" statement [ "else" statement ]
    fn parse_if(&mut self) -> Result<(), Error> {
        expect!(self, If)?;
        let then = self.gen.new_label();
        let other = self.gen.new_label();
        let exit = self.gen.new_label();

        let mut branch = self.parse_cond_group()?;
        self.gen.resolve_true(&mut branch, &then);
        expect!(self, Then)?;
        self.gen.place(&then);
        self.parse_statement()?;
        if optional!(self, Else).is_some() {
            self.gen.resolve_false(&mut branch, &other);
            self.gen.jump(Jump::JMP, &exit);
            self.gen.place(&other);
            self.parse_statement()?;
        } else {
            self.gen.resolve_false(&mut branch, &exit);
        }
        self.gen.place(&exit);
        Ok(())
    }

    /// while = "while" cond "do" statement
    fn parse_while(&mut self) -> Result<(), Error> {
        expect!(self, While)?;
        let start = self.gen.new_label();
        let body = self.gen.new_label();
        let exit = self.gen.new_label();

        self.gen.place(&start);
        let mut branch = self.parse_cond_group()?;
        self.gen.resolve_true(&mut branch, &body);
        self.gen.resolve_false(&mut branch, &exit);
        expect!(self, Do)?;

        self.gen.place(&body);
        self.parse_statement()?;
        self.gen.jump(Jump::JMP, &start);
        self.gen.place(&exit);
        Ok(())
    }

    /// repeat = "repeat" statement { ";" statement } "until" cond
    fn parse_repeat(&mut self) -> Result<(), Error> {
        expect!(self, Repeat)?;
        let start = self.gen.new_label();
        let exit = self.gen.new_label();

        self.gen.place(&start);
        separated!(self, self.parse_statement(), Until);
        expect!(self, Until)?;
        let mut branch = self.parse_cond_group()?;
        self.gen.resolve_true(&mut branch, &exit);
        self.gen.resolve_false(&mut branch, &start);
        self.gen.place(&exit);
        Ok(())
    }

    /// for = "for" ident ":=" expr ( "to" | "downto" ) expr "do" statement
    /// The limit is evaluated once. The loop also stops after the pass where the
    /// variable equals the limit, so it never wraps around.
    fn parse_for(&mut self) -> Result<(), Error> {
        expect!(self, For)?;
        let var = self.parse_scalar_ident("for")?;
        expect!(self, Assign)?;
        let init = self.parse_expression()?;
        self.store(&init, &var);
        self.gen.free(&init);

        let down = match optional!(self, To | Downto) {
            Some(token) => token.kind == Downto,
            None => return Err(Error::syntax(&self.here(), "to or downto expected")),
        };
        let limit = self.parse_expression()?;
        let end = self.gen.temp(var.width)?;
        self.store(&limit, &end);
        self.gen.free(&limit);
        expect!(self, Do)?;

        let test = self.gen.new_label();
        let body = self.gen.new_label();
        let step = self.gen.new_label();
        let exit = self.gen.new_label();

        self.gen.place(&test);
        let past = if down { Relation::Lt } else { Relation::Gt };
        let mut branch = self.gen.eval_condition(&var, &end, past)?;
        self.gen.resolve_true(&mut branch, &exit);
        self.gen.resolve_false(&mut branch, &body);

        self.gen.place(&body);
        self.parse_statement()?;

        let mut last = self.gen.eval_condition(&var, &end, Relation::Eq)?;
        self.gen.resolve_true(&mut last, &exit);
        self.gen.resolve_false(&mut last, &step);
        self.gen.place(&step);
        if down {
            self.gen.dec(&var);
        } else {
            self.gen.inc(&var);
        }
        self.gen.jump(Jump::JMP, &test);
        self.gen.place(&exit);
        self.gen.free(&end);
        Ok(())
    }

    /// `dst := src`, converting the width if needed.
    fn store(&mut self, src: &symbols::Var, dst: &symbols::Var) {
        if src.width == dst.width {
            self.gen.assign(src, dst, None);
        } else {
            self.gen.change_width(src, dst);
        }
    }
}

// ----------------------------------------------------------------------------
// Conditions
// ----------------------------------------------------------------------------

impl Parser {
    /// cond_group = conjunction { "or" conjunction }
    fn parse_cond_group(&mut self) -> Result<Branch, Error> {
        let mut last = self.parse_conjunction()?;
        if !check!(self, Or) {
            return Ok(last);
        }

        let on_true = self.gen.new_label();
        let on_false = self.gen.new_label();
        while optional!(self, Or).is_some() {
            let next = self.gen.new_label();
            self.gen.place(&next);
            let branch = self.parse_conjunction()?;
            self.gen.resolve_true(&mut last, &on_true);
            self.gen.resolve_false(&mut last, &next);
            last = branch;
        }
        self.merge(last, &on_true, &on_false)
    }

    /// conjunction = condition [ "and" conjunction ]
    fn parse_conjunction(&mut self) -> Result<Branch, Error> {
        let mut first = self.parse_condition()?;
        if optional!(self, And).is_none() {
            return Ok(first);
        }

        let on_true = self.gen.new_label();
        let on_false = self.gen.new_label();
        let next = self.gen.new_label();
        self.gen.place(&next);
        let rest = self.parse_conjunction()?;
        self.gen.resolve_true(&mut first, &next);
        self.gen.resolve_false(&mut first, &on_false);
        self.merge(rest, &on_true, &on_false)
    }

    /// Funnels the last term into a pair of fresh exits.
    fn merge(&mut self, mut last: Branch, on_true: &str, on_false: &str) -> Result<Branch, Error> {
        self.gen.resolve_true(&mut last, on_true);
        self.gen.resolve_false(&mut last, on_false);

        let mut merged = Branch::new();
        self.gen.place(on_true);
        self.gen.branch_true(&mut merged, Jump::JMP);
        self.gen.place(on_false);
        self.gen.branch_false(&mut merged, Jump::JMP);
        Ok(merged)
    }

    /// condition = "{" cond_group "}" | "odd" expr | expr relop expr
    fn parse_condition(&mut self) -> Result<Branch, Error> {
        if optional!(self, LCurly).is_some() {
            let branch = self.parse_cond_group()?;
            expect!(self, RCurly)?;
            return Ok(branch);
        }

        if optional!(self, Odd).is_some() {
            let var = self.parse_expression()?;
            let branch = self.gen.check_odd(&var);
            self.gen.free(&var);
            return Ok(branch);
        }

        let lhs = self.parse_expression()?;
        let token = expect!(self, Equal | Hash | RAngle | RAngleEqual | LAngle | LAngleEqual)
            .map_err(|_| Error::syntax(&self.here(), "condition: invalid operator"))?;
        let rel = match token.kind {
            Equal => Relation::Eq,
            Hash => Relation::Ne,
            RAngle => Relation::Gt,
            RAngleEqual => Relation::Ge,
            LAngle => Relation::Lt,
            _ => Relation::Le,
        };

        if matches!(rel, Relation::Gt | Relation::Ne) && self.is_lone_zero() {
            self.next();
            let branch = self.gen.check_not_zero(&lhs);
            self.gen.free(&lhs);
            return Ok(branch);
        }

        let rhs = self.parse_expression()?;
        let (lhs, rhs) = self.same_width(lhs, rhs)?;
        let branch = self.gen.eval_condition(&lhs, &rhs, rel)?;
        self.gen.free(&lhs);
        self.gen.free(&rhs);
        Ok(branch)
    }

    /// Literal `0` not followed by an operator.
    fn is_lone_zero(&self) -> bool {
        let zero = self
            .peek()
            .filter(|t| t.kind == Number)
            .map_or(false, |t| matches!(parse_number(t), Ok(0)));
        let operator = self.peek_nth(1).map_or(false, |t| t.kind.is_operator());
        zero && !operator
    }
}

// ----------------------------------------------------------------------------
// Expressions
// ----------------------------------------------------------------------------

impl Parser {
    /// expr = [ "+" | "-" ] term { ( "+" | "-" ) term }
    fn parse_expression(&mut self) -> Result<symbols::Var, Error> {
        let negate = match optional!(self, Plus | Minus) {
            Some(token) => token.kind == Minus,
            None => false,
        };

        let mut res = if negate {
            self.parse_negated_term()?
        } else {
            self.parse_term()?
        };
        while let Some(token) = optional!(self, Plus | Minus) {
            let op = if token.kind == Plus { ALU::ADD } else { ALU::SUB };
            let rhs = self.parse_term()?;
            res = self.binary(BinOp::Calc(op), res, rhs)?;
        }
        Ok(res)
    }

    /// term = factor { ( "*" | "/" | "%" | "&" | "|" | "^" ) factor }
    fn parse_term(&mut self) -> Result<symbols::Var, Error> {
        let mut res = self.parse_factor()?;
        while let Some(token) = optional!(self, Star | Slash | Percent | Ampasand | Pipe | Caret) {
            let op = match token.kind {
                Star => BinOp::Mul,
                Slash => BinOp::Div,
                Percent => BinOp::Mod,
                Ampasand => BinOp::Calc(ALU::AND),
                Pipe => BinOp::Calc(ALU::OR),
                _ => BinOp::Calc(ALU::XOR),
            };
            let rhs = self.parse_factor()?;
            res = self.binary(op, res, rhs)?;
        }
        Ok(res)
    }

    /// factor = ident [ "[" expr "]" ] | number | "(" expr ")" | ( "lo" | "hi" ) "(" ident ")"
    fn parse_factor(&mut self) -> Result<symbols::Var, Error> {
        self.sync();
        let Some(token) = self.next() else {
            return Err(Error::syntax(&self.here(), "unexpected end of file"));
        };
        match token.kind {
            Ident => match self.lookup(&token)? {
                Symbol::Scalar(var) => Ok(var),
                Symbol::Array(arr) => {
                    expect!(self, LBracket)?;
                    let index = self.parse_expression()?;
                    expect!(self, RBracket)?;
                    let res = self.gen.temp(arr.width)?;
                    self.gen.array_read(&arr, &index, &res)?;
                    self.gen.free(&index);
                    Ok(res)
                }
            },
            Number => {
                let value = parse_number(&token)?;
                let res = self.gen.temp(Width::fit(value))?;
                self.gen.assign_const(value, &res);
                Ok(res)
            }
            LParen => {
                let res = self.parse_expression()?;
                expect!(self, RParen)?;
                Ok(res)
            }
            Lo | Hi => {
                expect!(self, LParen)?;
                let var = self.parse_scalar_ident(&token.text)?;
                expect!(self, RParen)?;
                if token.kind == Lo {
                    self.gen.lo(&var)
                } else {
                    self.gen.hi(&var)
                }
            }
            _ => Err(Error::syntax(
                &token.pos,
                format!("unexpected symbol: {}", token.text),
            )),
        }
    }

    fn binary(&mut self, op: BinOp, lhs: symbols::Var, rhs: symbols::Var) -> Result<symbols::Var, Error> {
        let (lhs, rhs) = self.same_width(lhs, rhs)?;
        let res = self.gen.temp(lhs.width)?;
        match op {
            BinOp::Calc(alu) => self.gen.alu_op(alu, &lhs, &rhs, &res),
            BinOp::Mul => self.gen.mul(&lhs, &rhs, &res)?,
            BinOp::Div => self.gen.div(&lhs, &rhs, &res, false)?,
            BinOp::Mod => self.gen.div(&lhs, &rhs, &res, true)?,
        }
        self.gen.free(&lhs);
        self.gen.free(&rhs);
        Ok(res)
    }

    /// Term after a leading `-`. The result is always a word, so `-1` is `$FFFF`.
    fn parse_negated_term(&mut self) -> Result<symbols::Var, Error> {
        self.sync();
        if let Some(token) = self.peek().filter(|t| t.kind == Number).cloned() {
            let value = parse_number(&token)?;
            if value > 0x8000 {
                return Err(Error::syntax(
                    &token.pos,
                    format!("number does not fit in 16 bits: -{}", token.text),
                ));
            }
            let alone = self.peek_nth(1).map_or(true, |t| {
                !matches!(t.kind, Star | Slash | Percent | Ampasand | Pipe | Caret)
            });
            if alone {
                self.next();
                let res = self.gen.temp(Width::Word)?;
                self.gen.assign_const(value.wrapping_neg(), &res);
                return Ok(res);
            }
        }
        let term = self.parse_term()?;
        let wide = self.convert(term, Width::Word)?;
        self.negate(wide)
    }

    /// `0 - var` at the width of `var`.
    fn negate(&mut self, var: symbols::Var) -> Result<symbols::Var, Error> {
        let res = self.gen.temp(var.width)?;
        self.gen.set_zero(&res);
        self.gen.alu_op(ALU::SUB, &res, &var, &res);
        self.gen.free(&var);
        Ok(res)
    }

    /// Widens the narrower operand into a temporary.
    fn same_width(
        &mut self,
        lhs: symbols::Var,
        rhs: symbols::Var,
    ) -> Result<(symbols::Var, symbols::Var), Error> {
        if lhs.width == rhs.width {
            return Ok((lhs, rhs));
        }
        if lhs.width < rhs.width {
            let wide = self.convert(lhs, rhs.width)?;
            Ok((wide, rhs))
        } else {
            let wide = self.convert(rhs, lhs.width)?;
            Ok((lhs, wide))
        }
    }

    /// Copy of `var` at `width`, releasing `var` if it was a temporary.
    fn convert(&mut self, var: symbols::Var, width: Width) -> Result<symbols::Var, Error> {
        if var.width == width {
            return Ok(var);
        }
        let res = self.gen.temp(width)?;
        self.gen.change_width(&var, &res);
        self.gen.free(&var);
        Ok(res)
    }
}

/// Decimal, `$hex`, `%binary` or `'c'`. Must fit in 16 bits.
pub fn parse_number(token: &Token) -> Result<u16, Error> {
    let text = token.text.as_str();
    let value = if let Some(hex) = text.strip_prefix('$') {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = text.strip_prefix('%') {
        u64::from_str_radix(bin, 2).ok()
    } else if text.len() >= 3 && text.starts_with('\'') && text.ends_with('\'') {
        match text[1..text.len() - 1].chars().next() {
            Some(ch) => match u8::try_from(ch) {
                Ok(code) => Some(u64::from(code)),
                Err(_) => {
                    return Err(Error::syntax(
                        &token.pos,
                        format!("character {} does not fit in a byte", text),
                    ))
                }
            },
            None => None,
        }
    } else {
        text.parse::<u64>().ok()
    };
    match value {
        Some(value) if value <= 0xFFFF => Ok(value as u16),
        _ => Err(Error::syntax(
            &token.pos,
            format!("number does not fit in 16 bits: {}", text),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammer::token::Pos;

    fn number(text: &str) -> Result<u16, Error> {
        parse_number(&Token::new(Number, text, Pos::new("t", 1)))
    }

    #[test]
    fn number_forms() {
        assert_eq!(number("42").unwrap(), 42);
        assert_eq!(number("$1F").unwrap(), 31);
        assert_eq!(number("%101").unwrap(), 5);
        assert_eq!(number("'A'").unwrap(), 65);
        assert_eq!(number("65535").unwrap(), 0xFFFF);
    }

    #[test]
    fn number_out_of_range() {
        assert!(number("65536").is_err());
        assert!(number("$10000").is_err());
        assert!(number("99999999999999999999999").is_err());
    }

    #[test]
    fn character_range() {
        assert_eq!(number("'\u{ff}'").unwrap(), 0xFF);
        assert!(number("'\u{100}'").is_err());
        assert!(number("'\u{20ac}'").is_err());
    }
}
