//! Manual test harness for `recli-grammar`, modeled on `nimbleparse`'s role
//! for `cfgrammar`/`lrtable`: load a grammar (and optionally a help file)
//! and drive `check`, tab completion, and help lookup straight from the
//! command line. This is not the restricted shell itself — no REPL, no
//! line editor, no child-process exec, no permissions matcher.

use std::path::PathBuf;
use std::process;

use getopts::Options;
use recli_grammar::{check, tab_complete, Engine, HelpBinder, Progress};

fn usage(program: &str, opts: &Options) -> String {
    let brief = format!(
        "Usage: {} -g GRAMMAR [-h HELP_FILE] [-c ARGV... | -t BUFFER | -s ARGV... | -H ARGV...]",
        program
    );
    opts.usage(&brief)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("g", "grammar", "grammar source file to load", "GRAMMAR");
    opts.optopt("h", "help-file", "help source file to load", "HELP_FILE");
    opts.optopt("c", "check", "validate ARGV against the grammar", "ARGV...");
    opts.optopt("t", "complete", "tab-complete BUFFER against the grammar", "BUFFER");
    opts.optopt("s", "short-help", "print short-form help for ARGV", "ARGV...");
    opts.optopt("H", "long-help", "print long-form help for ARGV", "ARGV...");
    opts.optflag("?", "usage", "print this help message");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", usage(&program, &opts));
            process::exit(2);
        }
    };

    if matches.opt_present("?") || !matches.opt_present("g") {
        println!("{}", usage(&program, &opts));
        process::exit(if matches.opt_present("?") { 0 } else { 2 });
    }

    let grammar_path = PathBuf::from(matches.opt_str("g").unwrap());
    let mut engine = Engine::new();
    tracing::info!(path = %grammar_path.display(), "loading grammar");
    let grammar = match engine.parse_file(&grammar_path) {
        Ok(Some(g)) => g,
        Ok(None) => {
            eprintln!("{}: grammar file contains no grammar lines", grammar_path.display());
            process::exit(1);
        }
        Err(_) => process::exit(1),
    };

    let mut help = HelpBinder::new();
    if let Some(help_path) = matches.opt_str("h") {
        let path = PathBuf::from(help_path);
        tracing::info!(path = %path.display(), "loading help file");
        if help.parse_file(&mut engine, &path).is_err() {
            process::exit(1);
        }
    }

    if let Some(raw) = matches.opt_str("c") {
        let argv = recli_grammar::tokenize::tokenize(&raw);
        tracing::debug!(argv = ?argv, "check");
        match check(&grammar, &argv, 0) {
            Progress::Complete { consumed, needs_terminal } => {
                println!("OK ({} token(s) consumed, needs_terminal={})", consumed, needs_terminal);
            }
            Progress::WantMore { consumed, .. } => {
                println!("INCOMPLETE (consumed {} token(s), more input required)", consumed);
            }
            Progress::Fail { at, message } => {
                if at < argv.len() {
                    let err: recli_grammar::EngineError =
                        recli_grammar::error::MatchError { argv_index: at, message }.into();
                    println!("{}", recli_grammar::error::render_argv_error(&raw, &argv, &err));
                } else {
                    println!("{}", message);
                }
                process::exit(1);
            }
        }
        return;
    }

    if let Some(buffer) = matches.opt_str("t") {
        for candidate in tab_complete(&mut engine, &grammar, &buffer, 64) {
            println!("{}", candidate);
        }
        return;
    }

    if let Some(raw) = matches.opt_str("s") {
        let argv = recli_grammar::tokenize::tokenize(&raw);
        match help.print_context_help(&mut engine, &argv) {
            Some(text) => println!("{}", text),
            None => println!("{}", help.print_context_help_subcommands(&mut engine, &grammar, &argv)),
        }
        return;
    }

    if let Some(raw) = matches.opt_str("H") {
        let argv = recli_grammar::tokenize::tokenize(&raw);
        match help.show_help(&mut engine, &argv) {
            Some(text) => println!("{}", text),
            None => {
                eprintln!("no long-form help bound to '{}'", raw);
                process::exit(1);
            }
        }
        return;
    }

    println!("{}", usage(&program, &opts));
}
