use super::token::{Pos, Token, TokenKind};
use crate::error::Error;
use indexmap::IndexMap;

/// How a token kind is recognised at the start of the remaining line.
enum Pattern {
    /// Keyword. Needs a word boundary unless legacy prefix matching is on.
    Word(&'static str),
    /// Fixed punctuation.
    Lit(&'static str),
    DataType,
    Number,
    Text,
    Ident,
    Whitespace,
    Comment,
}

/// Tried in order; the first match wins.
const PATTERNS: &[(TokenKind, Pattern)] = {
    use Pattern::*;
    use TokenKind as K;
    &[
        (K::Comment, Comment),
        (K::Begin, Word("begin")),
        (K::End, Word("end")),
        (K::Asm, Word("asm")),
        (K::Var, Word("var")),
        (K::Const, Word("const")),
        (K::For, Word("for")),
        (K::To, Word("to")),
        (K::Downto, Word("downto")),
        (K::While, Word("while")),
        (K::If, Word("if")),
        (K::Then, Word("then")),
        (K::Else, Word("else")),
        (K::Repeat, Word("repeat")),
        (K::Until, Word("until")),
        (K::Odd, Word("odd")),
        (K::Procedure, Word("procedure")),
        (K::Do, Word("do")),
        (K::Call, Word("call")),
        (K::Inp, Word("inp")),
        (K::Outp, Word("outp")),
        (K::Hi, Word("hi")),
        (K::Lo, Word("lo")),
        (K::Inc, Word("inc")),
        (K::Dec, Word("dec")),
        (K::And, Word("and")),
        (K::Or, Word("or")),
        (K::Nop, Word("nop")),
        (K::LParen, Lit("(")),
        (K::RParen, Lit(")")),
        (K::LBracket, Lit("[")),
        (K::RBracket, Lit("]")),
        (K::LCurly, Lit("{")),
        (K::RCurly, Lit("}")),
        (K::DataType, DataType),
        (K::Number, Number),
        (K::Text, Text),
        (K::Semicolon, Lit(";")),
        (K::Comma, Lit(",")),
        (K::Period, Lit(".")),
        (K::Assign, Lit(":=")),
        (K::Colon, Lit(":")),
        (K::LAngleEqual, Lit("<=")),
        (K::RAngleEqual, Lit(">=")),
        (K::LAngle, Lit("<")),
        (K::RAngle, Lit(">")),
        (K::Equal, Lit("=")),
        (K::Hash, Lit("#")),
        (K::Plus, Lit("+")),
        (K::Minus, Lit("-")),
        (K::Star, Lit("*")),
        (K::Slash, Lit("/")),
        (K::Percent, Lit("%")),
        (K::Ampasand, Lit("&")),
        (K::Pipe, Lit("|")),
        (K::Caret, Lit("^")),
        (K::Shr, Word("shr")),
        (K::Shl, Word("shl")),
        (K::Ident, Ident),
        (K::Whitespace, Whitespace),
    ]
};

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

impl Pattern {
    /// Length in bytes of the match at the start of `rest`.
    fn matches(&self, rest: &str, legacy: bool) -> Option<usize> {
        let word = |w: &str| -> Option<usize> {
            if !rest.starts_with(w) {
                return None;
            }
            match rest[w.len()..].chars().next() {
                Some(ch) if !legacy && is_word_char(ch) => None,
                _ => Some(w.len()),
            }
        };
        match self {
            Pattern::Word(w) => word(w),
            Pattern::Lit(s) => rest.starts_with(s).then_some(s.len()),
            Pattern::DataType => ["nibble", "byte", "word"].iter().find_map(|w| word(w)),
            Pattern::Number => number_len(rest),
            Pattern::Text => {
                let body = rest.strip_prefix('\'')?;
                body.find('\'').map(|end| end + 2)
            }
            Pattern::Ident => {
                let first = rest.chars().next()?;
                if first != '_' && !first.is_ascii_alphabetic() {
                    return None;
                }
                Some(
                    rest.find(|ch: char| !is_word_char(ch))
                        .unwrap_or(rest.len()),
                )
            }
            Pattern::Whitespace => {
                let len = rest.len() - rest.trim_start_matches([' ', '\t']).len();
                (len > 0).then_some(len)
            }
            Pattern::Comment => rest.starts_with("//").then_some(rest.len()),
        }
    }
}

/// `\d+`, `$hex`, `%bin` or a single quoted character.
fn number_len(rest: &str) -> Option<usize> {
    let run = |s: &str, f: fn(&char) -> bool| -> usize {
        s.chars().take_while(f).map(char::len_utf8).sum()
    };
    let mut chars = rest.chars();
    match chars.next()? {
        '0'..='9' => Some(run(rest, char::is_ascii_digit)),
        '$' => {
            let len = run(&rest[1..], char::is_ascii_hexdigit);
            (len > 0).then_some(len + 1)
        }
        '%' => {
            let len = run(&rest[1..], |ch| matches!(*ch, '0' | '1'));
            (len > 0).then_some(len + 1)
        }
        '\'' => {
            let ch = chars.next()?;
            (ch != '\'' && chars.next() == Some('\'')).then_some(ch.len_utf8() + 2)
        }
        _ => None,
    }
}

/// Splits one source line into tokens.
pub struct LineLexer<'a> {
    line: &'a str,
    pos: Pos,
    legacy: bool,
}

impl<'a> LineLexer<'a> {
    pub fn new(line: &'a str, pos: Pos, legacy: bool) -> Self {
        Self { line, pos, legacy }
    }

    pub fn parse(self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut rest = self.line;
        while !rest.trim().is_empty() {
            let found = PATTERNS
                .iter()
                .find_map(|(kind, pat)| pat.matches(rest, self.legacy).map(|len| (*kind, len)));
            let (kind, len) = match found {
                Some(found) => found,
                None => {
                    let len = rest.chars().next().map_or(1, char::len_utf8);
                    (TokenKind::Unknown, len)
                }
            };
            tokens.push(Token::new(kind, &rest[..len], self.pos.clone()));
            rest = &rest[len..];
        }
        tokens
    }
}

/// Tokenizes a source file and everything it includes.
pub struct Lexer {
    legacy: bool,
    in_asm: bool,
    including: Vec<String>,
    sources: IndexMap<String, Vec<String>>,
}

impl Lexer {
    pub fn new(legacy_keywords: bool) -> Self {
        Lexer {
            legacy: legacy_keywords,
            in_asm: false,
            including: Vec::new(),
            sources: IndexMap::new(),
        }
    }

    /// Source lines of every file read, for diagnostics.
    pub fn into_sources(self) -> IndexMap<String, Vec<String>> {
        self.sources
    }

    pub fn lex_file(&mut self, path: &str) -> Result<Vec<Token>, Error> {
        let code = std::fs::read_to_string(path)?;
        self.lex_str(path, &code)
    }

    pub fn lex_str(&mut self, file: &str, code: &str) -> Result<Vec<Token>, Error> {
        let lines: Vec<String> = code.lines().map(str::to_string).collect();
        self.sources.insert(file.to_string(), lines.clone());
        self.including.push(file.to_string());

        let mut tokens = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            let pos = Pos::new(file, idx + 1);

            if let Some(rest) = line.strip_prefix("#include") {
                if let Some((_, path)) = rest.split_once(' ') {
                    tokens.extend(self.include(path.trim(), &pos)?);
                }
                continue;
            }

            if self.lex_asm_line(line, &pos, &mut tokens) {
                continue;
            }

            tokens.extend(LineLexer::new(line, pos, self.legacy).parse());
        }

        self.including.pop();
        if self.in_asm {
            return Err(Error::UnterminatedAsm {
                file: file.to_string(),
                line: lines.len() + 1,
            });
        }
        Ok(tokens)
    }

    fn include(&mut self, path: &str, at: &Pos) -> Result<Vec<Token>, Error> {
        if self.including.iter().any(|file| file == path) {
            return Err(Error::syntax(at, format!("recursive include of {}", path)));
        }
        let code = std::fs::read_to_string(path).map_err(|_| Error::IncludeNotFound {
            path: path.to_string(),
            file: at.file.clone(),
            line: at.line,
        })?;
        self.lex_str(path, &code)
    }

    /// Handles the `asm` ... `end;` block mode. Returns true if the line was consumed.
    fn lex_asm_line(&mut self, line: &str, pos: &Pos, tokens: &mut Vec<Token>) -> bool {
        let trimmed = line.trim();
        if !self.in_asm {
            if trimmed == "asm" {
                tokens.push(Token::new(TokenKind::Asm, "asm", pos.clone()));
                self.in_asm = true;
                return true;
            }
            return false;
        }

        if trimmed == "end;" {
            tokens.push(Token::new(TokenKind::End, "end", pos.clone()));
            tokens.push(Token::new(TokenKind::Semicolon, ";", pos.clone()));
            self.in_asm = false;
        } else if !trimmed.is_empty() {
            tokens.push(Token::new(TokenKind::AsmLine, trimmed, pos.clone()));
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn kinds(line: &str, legacy: bool) -> Vec<TokenKind> {
        LineLexer::new(line, Pos::new("t", 1), legacy)
            .parse()
            .into_iter()
            .filter(|t| !t.ignorable)
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn keyword_needs_boundary() {
        assert_eq!(kinds("order", false), vec![Ident]);
        assert_eq!(kinds("order", true), vec![Or, Ident]);
        assert_eq!(kinds("downto do", false), vec![Downto, Do]);
    }

    #[test]
    fn numbers() {
        assert_eq!(number_len("$1Fz"), Some(3));
        assert_eq!(number_len("%102"), Some(3));
        assert_eq!(number_len("'a' "), Some(3));
        assert_eq!(number_len("'ab'"), None);
        assert_eq!(number_len("$"), None);
        assert_eq!(number_len("12ab"), Some(2));
    }

    #[test]
    fn unknown_character() {
        assert_eq!(kinds("a ! b", false), vec![Ident, Unknown, Ident]);
    }
}
