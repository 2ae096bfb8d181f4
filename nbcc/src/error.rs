use crate::grammer::token::Pos;
use color_print::cprintln;
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Syntax error: {msg}")]
    Syntax { file: String, line: usize, msg: String },

    #[error("Out of memory: {what}")]
    OutOfMemory { file: String, line: usize, what: String },

    #[error("Include file {path} not found")]
    IncludeNotFound { path: String, file: String, line: usize },

    #[error("asm block has no end")]
    UnterminatedAsm { file: String, line: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Config(String),
}

impl Error {
    pub fn syntax(at: &Pos, msg: impl Into<String>) -> Self {
        Error::Syntax {
            file: at.file.clone(),
            line: at.line,
            msg: msg.into(),
        }
    }

    pub fn out_of_memory(at: &Pos, what: impl Into<String>) -> Self {
        Error::OutOfMemory {
            file: at.file.clone(),
            line: at.line,
            what: what.into(),
        }
    }

    /// File and 1-based line the error points at, if any.
    pub fn location(&self) -> Option<(&str, usize)> {
        match self {
            Error::Syntax { file, line, .. }
            | Error::OutOfMemory { file, line, .. }
            | Error::IncludeNotFound { file, line, .. }
            | Error::UnterminatedAsm { file, line } => Some((file.as_str(), *line)),
            Error::Io(_) | Error::Config(_) => None,
        }
    }

    /// Print error with the offending source line
    pub fn print_diag(&self, files: &IndexMap<String, Vec<String>>) {
        cprintln!("<red,bold>error</>: {}", self);

        let Some((file, line)) = self.location() else {
            return;
        };
        cprintln!("     <blue>--></> <underline>{}:{}</>", file, line);
        cprintln!("      <blue>|</>");

        let content = files
            .get(file)
            .and_then(|lines| lines.get(line.wrapping_sub(1)))
            .map(|s| s.as_str())
            .unwrap_or("");

        cprintln!(" <blue>{:>4} |</> {}", line, content);
        cprintln!("      <blue>|</>");
    }
}
