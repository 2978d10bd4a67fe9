// File: src/errors.rs
//
// Fatal-diagnostic plumbing. Runtime type errors, unknown identifiers
// and bad assignments abort a batch run with an exit code; in the REPL
// the same paths print their diagnostic and keep the session alive.
// Diagnostic wording is not a stable interface.

use colored::Colorize;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};

static INTERACTIVE: AtomicBool = AtomicBool::new(false);

/// Marks the process as interactive (REPL); fatal paths then return
/// instead of exiting.
pub fn set_interactive(interactive: bool) {
    INTERACTIVE.store(interactive, Ordering::SeqCst);
}

pub fn is_interactive() -> bool {
    INTERACTIVE.load(Ordering::SeqCst)
}

/// Exits with `code` unless the process is interactive.
pub fn exit_conditionally(code: i32) {
    if !is_interactive() {
        process::exit(code);
    }
}

/// Prints a runtime diagnostic to stderr.
pub fn report(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}

/// Prints the parser's accumulated errors to stderr.
pub fn print_parser_errors(errors: &[String]) {
    eprintln!("{}", "parser errors:".red().bold());
    for error in errors {
        eprintln!("  {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::{is_interactive, set_interactive};

    #[test]
    fn test_interactive_flag_roundtrip() {
        set_interactive(true);
        assert!(is_interactive());
    }
}
