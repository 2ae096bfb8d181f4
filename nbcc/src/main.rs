use nbcc::{compile_file, print_listing, Config, Error, Options};
use std::path::Path;

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {author}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(author, version, about, help_template = HELP_TEMPLATE)]
struct Args {
    /// Input file
    #[clap(default_value = "main.pas")]
    input: String,

    /// Output file [default: input with .asm extension]
    #[clap(short, long)]
    output: Option<String>,

    /// Symbol table file [default: varlist.txt]
    #[clap(short, long)]
    symbols: Option<String>,

    /// YAML config file
    #[clap(short, long)]
    config: Option<String>,

    /// Skip the peephole optimizer
    #[clap(long)]
    no_optimize: bool,

    /// Match keywords as plain prefixes
    #[clap(long)]
    legacy_keywords: bool,

    /// Dump generated code and memory map
    #[clap(short, long)]
    dump: bool,

    /// Enable verbose output
    #[clap(short, long)]
    verbose: bool,
}

fn main() {
    use clap::Parser;

    let args = Args::parse();
    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            color_print::cprintln!("<red,bold>error</>: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns false when compilation failed. Output files are written either way.
fn run(args: &Args) -> Result<bool, Error> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let output = args
        .output
        .clone()
        .or(config.output)
        .unwrap_or_else(|| default_output(&args.input));
    let symbols = args
        .symbols
        .clone()
        .or(config.symbols)
        .unwrap_or_else(|| "varlist.txt".to_string());
    let options = Options {
        legacy_keywords: args.legacy_keywords || config.legacy_keywords.unwrap_or(false),
        optimize: !args.no_optimize && config.optimize.unwrap_or(true),
        verbose: args.verbose,
    };

    if args.verbose {
        println!("4-bit Pascal compiler");
        println!("  < {}", args.input);
    }
    let compilation = compile_file(&args.input, &options);

    if let Some(e) = &compilation.error {
        e.print_diag(&compilation.sources);
    }

    if args.verbose {
        println!("4. Write files");
        println!("  > {}", output);
        println!("  > {}", symbols);
    }
    std::fs::write(&output, compilation.text())?;
    std::fs::write(&symbols, compilation.symbol_text())?;

    if args.dump {
        print_listing(&compilation.mnemonics, &compilation.symbols);
    }
    Ok(compilation.is_ok())
}

fn default_output(input: &str) -> String {
    Path::new(input)
        .with_extension("asm")
        .to_string_lossy()
        .into_owned()
}
