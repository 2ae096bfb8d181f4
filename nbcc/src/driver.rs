use crate::compile::Mnemonic;
use crate::error::Error;
use crate::grammer::lexer::Lexer;
use crate::grammer::parsercore::Parser;
use crate::grammer::token::Token;
use crate::optimize::optimize;
use crate::symbols::allocator::Allocator;
use indexmap::IndexMap;

/// Effective settings of one compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub legacy_keywords: bool,
    pub optimize: bool,
    pub verbose: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            legacy_keywords: false,
            optimize: true,
            verbose: false,
        }
    }
}

/// Result of a compilation. Output is produced even when `error` is set.
pub struct Compilation {
    pub mnemonics: Vec<Mnemonic>,
    pub symbols: Allocator,
    pub error: Option<Error>,
    /// Source lines of every file read, for diagnostics.
    pub sources: IndexMap<String, Vec<String>>,
}

impl Compilation {
    /// Assembly text, one entry per line, closed by a halt.
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.mnemonics.iter().map(|m| m.to_string()).collect();
        lines.push(String::new());
        lines.push("\tHLT".to_string());
        lines
    }

    pub fn text(&self) -> String {
        let mut text = self.lines().join("\n");
        text.push('\n');
        text
    }

    pub fn symbol_text(&self) -> String {
        let mut text = self.symbols.symbol_table().join("\n");
        text.push('\n');
        text
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub fn compile_source(name: &str, code: &str, options: &Options) -> Compilation {
    let mut lexer = Lexer::new(options.legacy_keywords);
    if options.verbose {
        println!("1. Lex {}", name);
    }
    let tokens = lexer.lex_str(name, code);
    compile_tokens(lexer, tokens, name, options)
}

pub fn compile_file(path: &str, options: &Options) -> Compilation {
    let mut lexer = Lexer::new(options.legacy_keywords);
    if options.verbose {
        println!("1. Lex {}", path);
    }
    let tokens = lexer.lex_file(path);
    compile_tokens(lexer, tokens, path, options)
}

fn compile_tokens(
    lexer: Lexer,
    tokens: Result<Vec<Token>, Error>,
    file: &str,
    options: &Options,
) -> Compilation {
    let sources = lexer.into_sources();
    let tokens = match tokens {
        Ok(tokens) => tokens,
        Err(error) => {
            return Compilation {
                mnemonics: Vec::new(),
                symbols: Allocator::new(),
                error: Some(error),
                sources,
            }
        }
    };
    if options.verbose {
        println!("  {} tokens", tokens.len());
        println!("2. Parse and generate code");
    }

    let (gen, result) = Parser::new(tokens, file).parse();
    let (seq, symbols) = gen.into_parts();

    let mnemonics = match &result {
        Ok(()) => {
            if let Some(m) = seq.unresolved() {
                panic!("jump without target left in output: {:?}", m);
            }
            if options.optimize {
                let before = seq.items().len();
                let items = optimize(seq.into_vec());
                if options.verbose {
                    println!("3. Optimize");
                    println!("  {} -> {} lines", before, items.len());
                }
                items
            } else {
                seq.into_vec()
            }
        }
        Err(_) => seq.into_vec(),
    };

    if options.verbose {
        println!("  {} cells used", symbols.used());
    }

    Compilation {
        mnemonics,
        symbols,
        error: result.err(),
        sources,
    }
}
