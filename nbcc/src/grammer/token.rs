use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub pos: Pos,
    /// Whitespace and comments. Filtered out before parsing.
    pub ignorable: bool,
}

impl Token {
    pub fn new(kind: TokenKind, text: &str, pos: Pos) -> Self {
        let ignorable = matches!(kind, TokenKind::Whitespace | TokenKind::Comment);
        Token {
            kind,
            text: text.to_string(),
            pos,
            ignorable,
        }
    }
}

/// Source position. `line` starts at 1.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pos {
    pub file: String,
    pub line: usize,
}

impl Pos {
    pub fn new(file: &str, line: usize) -> Self {
        Pos {
            file: file.to_string(),
            line,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Comment,    // "//..."
    Whitespace, // spaces and tabs

    // Keywords
    Begin,
    End,
    Asm,
    Var,
    Const,
    For,
    To,
    Downto,
    While,
    If,
    Then,
    Else,
    Repeat,
    Until,
    Odd,
    Procedure,
    Do,
    Call,
    Inp,
    Outp,
    Hi,
    Lo,
    Inc,
    Dec,
    And,
    Or,
    Nop,

    // Brackets
    LParen,   // '('
    RParen,   // ')'
    LBracket, // '['
    RBracket, // ']'
    LCurly,   // '{'
    RCurly,   // '}'

    // Literals
    DataType, // "nibble" | "byte" | "word"
    Number,   // decimal, $hex, %bin, 'c'
    Text,     // '...'

    // Punctuation
    Semicolon,   // ';'
    Comma,       // ','
    Period,      // '.'
    Assign,      // ':='
    Colon,       // ':'
    LAngleEqual, // '<='
    RAngleEqual, // '>='
    LAngle,      // '<'
    RAngle,      // '>'
    Equal,       // '='
    Hash,        // '#', not equal
    Plus,        // '+'
    Minus,       // '-'
    Star,        // '*'
    Slash,       // '/'
    Percent,     // '%'
    Ampasand,    // '&'
    Pipe,        // '|'
    Caret,       // '^'
    Shr,         // "shr"
    Shl,         // "shl"

    Ident,

    /// One line of an `asm` block.
    AsmLine,
    /// A character no pattern accepts.
    Unknown,
}

impl TokenKind {
    pub fn is_operator(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Plus | Minus | Star | Slash | Percent | Ampasand | Pipe | Caret
        )
    }
}
