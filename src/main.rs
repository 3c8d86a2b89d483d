use std::{fs, path::PathBuf, process::ExitCode};

use clap::Parser;
use clap_stdin::FileOrStdin;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pvmc::{ast::Node, compile, Error, Options};

/// Compiles a parsed program (JSON AST) to stack-machine assembly.
#[derive(Parser, Debug)]
#[command(name = "pvmc", version, about)]
struct Args {
    /// JSON AST file, or `-`/nothing for stdin
    #[arg(default_value = "-")]
    input: FileOrStdin,

    /// Write the listing here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip constant folding and static `if` removal
    #[arg(long)]
    no_optimize: bool,

    /// Print the parsed tree to stderr before compiling
    #[arg(long)]
    dump_ast: bool,
}

fn run(args: Args) -> Result<(), Error> {
    let source = args.input.contents()?;
    let program: Node = serde_json::from_str(&source)?;
    if args.dump_ast {
        eprintln!("{program:#?}");
    }

    let options = Options {
        optimize: !args.no_optimize,
    };
    let compiled = compile(&program, &options)?;
    for w in compiled.warnings.iter() {
        eprintln!("warning: {w}");
    }

    let listing = compiled.listing();
    match args.output {
        Some(path) => fs::write(path, listing)?,
        None => print!("{listing}"),
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Semantic(analysis)) => {
            for w in analysis.warning_messages() {
                eprintln!("warning: {w}");
            }
            for e in analysis.error_messages() {
                eprintln!("error: {e}");
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
