// File: src/main.rs
//
// Command-line entry point for the keai interpreter:
//   keai -e 'print(1 + 2)'   execute a string
//   keai -v                  print the version
//   keai script.keai         run a file
//   keai                     start the REPL

use clap::Parser as ClapParser;
use std::path::PathBuf;
use std::process;

use keai::{evaluate, evaluate_file, repl};

#[derive(ClapParser)]
#[command(name = "keai", about = "Simple general-purpose interpreted programming language")]
struct Cli {
    /// Code to execute
    #[arg(short, long, value_name = "STR")]
    eval: Option<String>,

    /// Show our version and exit
    #[arg(short = 'v', long = "version")]
    version: bool,

    /// Script file to run
    file: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    if cli.version {
        println!("keai {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    if let Some(source) = cli.eval {
        process::exit(evaluate(&source));
    }

    if let Some(file) = cli.file {
        process::exit(evaluate_file(&file.to_string_lossy()));
    }

    if let Err(e) = repl::start() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
