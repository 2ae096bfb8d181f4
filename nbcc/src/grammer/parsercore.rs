use super::token::{Pos, Token, TokenKind};
use crate::compile::{CodeGen, Proc};
use crate::error::Error;
use crate::symbols::scope::Scope;
use indexmap::IndexMap;

/// Single-pass parser. Code is generated while the tokens are consumed.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    file: String,
    pub(super) gen: CodeGen,
    pub(super) scope: Scope,
    pub(super) procs: IndexMap<String, Proc>,
}

impl Parser {
    /// `file` names the source for errors raised before any token is seen.
    pub fn new(tokens: Vec<Token>, file: &str) -> Self {
        Parser {
            tokens: tokens.into_iter().filter(|t| !t.ignorable).collect(),
            position: 0,
            file: file.to_string(),
            gen: CodeGen::new(),
            scope: Scope::new(),
            procs: IndexMap::new(),
        }
    }
}

impl Parser {
    /// Peek : Watch next token without consuming it
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    /// Next : Consume next token and return it
    pub fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Position of the next token, or of the last one at end of input.
    pub fn here(&self) -> Pos {
        self.peek()
            .or(self.tokens.last())
            .map(|t| t.pos.clone())
            .unwrap_or_else(|| Pos::new(&self.file, 1))
    }

    /// Points allocator errors at the next token.
    pub fn sync(&mut self) {
        let here = self.here();
        self.gen.alloc.locate(&here);
    }

    /// Peek and check next token is match with condition
    pub fn check_if<F: Fn(&Token) -> bool>(&self, cond: F) -> bool {
        self.peek().map_or(false, cond)
    }

    /// Consume if next token is match with condition
    pub fn consume_if<F: Fn(&Token) -> bool>(&mut self, cond: F) -> Option<Token> {
        if self.check_if(cond) {
            self.next()
        } else {
            None
        }
    }

    /// Next token must be match with condition
    pub fn expect_tobe<F: Fn(&Token) -> bool>(&mut self, cond: F) -> Result<Token, Error> {
        let Some(token) = self.peek() else {
            return Err(Error::syntax(&self.here(), "unexpected end of file"));
        };
        if !cond(token) {
            return Err(Error::syntax(
                &token.pos,
                format!("unexpected symbol: {}", token.text),
            ));
        }
        let token = token.clone();
        self.position += 1;
        Ok(token)
    }

    pub fn kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }
}

#[macro_export]
macro_rules! check {
    ($parser:expr, $kind:pat) => {
        $parser.check_if(|token| matches!(token.kind, $kind))
    };
}

#[macro_export]
macro_rules! expect {
    ($parser:expr, $kind:pat) => {
        $parser.expect_tobe(|token| matches!(token.kind, $kind))
    };
}

#[macro_export]
macro_rules! optional {
    ($parser:expr, $trigger:pat) => {
        $parser.consume_if(|token| matches!(token.kind, $trigger))
    };
}

/// `{ element ";" } terminal`, where empty statements are allowed and the last `;` is optional.
#[macro_export]
macro_rules! separated {
    ($parser:expr, $elem:expr, $terminal:pat) => {{
        while !$crate::check!($parser, $terminal) {
            if $crate::optional!($parser, $crate::grammer::token::TokenKind::Semicolon).is_some() {
                continue;
            }
            $elem?;
            if $crate::optional!($parser, $crate::grammer::token::TokenKind::Semicolon).is_none() {
                break;
            }
        }
    }};
}
