// File: src/repl.rs
//
// Interactive shell for keai. Line editing and persistent history come
// from rustyline; the history file lives at ~/.keai_history (capped by
// KEAI_HISTSIZE, default 1000) and ~/.keai_init is evaluated after the
// standard library, before the first prompt.

use rustyline::config::Config;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::Editor;
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::{base_environment, errors, repl_step};

fn history_size() -> usize {
    env::var("KEAI_HISTSIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(1000)
}

fn home_based_file(name: &str) -> Option<PathBuf> {
    env::var("HOME").ok().map(|home| PathBuf::from(home).join(name))
}

/// Runs the REPL until EOF or interrupt.
pub fn start() -> Result<(), Box<dyn std::error::Error>> {
    // errors must not kill the session
    errors::set_interactive(true);

    println!("keai version {}", env!("CARGO_PKG_VERSION"));
    println!("Use ctrl+d to quit");

    let env = base_environment();

    // ~/.keai_init runs before the first prompt, errors and all
    if let Some(init_path) = home_based_file(".keai_init") {
        if let Ok(init_source) = fs::read_to_string(&init_path) {
            let mut sink = io::sink();
            repl_step(&env, &init_source, &mut sink);
        }
    }

    let config = Config::builder().max_history_size(history_size())?.auto_add_history(true).build();
    let mut editor: Editor<(), FileHistory> = Editor::with_config(config)?;

    let history_path = home_based_file(".keai_history");
    if let Some(path) = &history_path {
        let _ = editor.load_history(path);
    }

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let mut stdout = io::stdout();
                repl_step(&env, line, &mut stdout);
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    if let Some(path) = &history_path {
        let _ = editor.save_history(path);
    }

    Ok(())
}
