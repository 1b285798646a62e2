use clap::Parser;
use ebnfc::ebnfc::compiler::{self, Backend};
use ebnfc::ebnfc::error::CompileError;
use ebnfc::ebnfc::tree;
use std::fs;
use std::io;
use std::process::ExitCode;

/// Compiles an EBNF grammar read from standard input into a pair of
/// table-driven parsing files, or dumps its syntax tree.
#[derive(Parser, Debug)]
#[command(name = "ebnfc", about = "Compiles an EBNF grammar into table-driven parsing data")]
struct Args {
    /// Parse and dump the tree in indented form to standard output; no output files are created.
    #[arg(short = 't', long = "tree")]
    tree: bool,

    /// Select the assembly backend (`<stem>.inc`/`<stem>.nasm`) instead of the structured-record one.
    #[arg(short = 'a', long = "asm")]
    asm: bool,

    /// Output file stem.
    stem: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), CompileError> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if err.kind() == clap::error::ErrorKind::DisplayHelp => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(CompileError::argument(err.to_string().trim_end())),
    };

    if args.tree {
        let root = compiler::build_tree(io::stdin())?;
        let mut dump = String::new();
        tree::dump(&root, &mut dump).expect("writing to a String never fails");
        print!("{dump}");
        return Ok(());
    }

    let backend = if args.asm { Backend::Asm } else { Backend::Structured };
    let output = compiler::compile(io::stdin(), &args.stem, backend)?;

    fs::write(&output.declaration_filename, &output.declaration).map_err(CompileError::io)?;
    fs::write(&output.implementation_filename, &output.implementation).map_err(CompileError::io)?;
    Ok(())
}
