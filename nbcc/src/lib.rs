pub mod compile;
pub mod config;
pub mod driver;
pub mod error;
pub mod grammer;
pub mod optimize;
pub mod symbols;
pub mod util;

pub use compile::{Line, Mnemonic};
pub use config::Config;
pub use driver::{compile_file, compile_source, Compilation, Options};
pub use error::Error;
pub use grammer::lexer::Lexer;
pub use grammer::parsercore::Parser;
pub use symbols::allocator::Allocator;
pub use util::display::print_listing;
