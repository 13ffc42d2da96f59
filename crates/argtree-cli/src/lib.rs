//! Process wiring for `argtree` command trees.
//!
//! A binary hands its tree to [`run_main`], which picks one of three modes from
//! the environment:
//!
//! - `COMP_LINE` and `COMP_CWORD` set: print shell completions, one per line.
//! - `ARGTREE_GENERATE_MAN=<dir>`: write a man page per command into `<dir>`.
//! - otherwise: parse `std::env::args()` and run the selected command.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use argtree::{CommandTree, ParseOutcome, Parser, SchemaError, autocomplete, man_pages};
use tracing_subscriber::{EnvFilter, fmt};

pub const ENV_COMPLETE_LINE: &str = "COMP_LINE";
pub const ENV_COMPLETE_WORD: &str = "COMP_CWORD";
pub const ENV_GENERATE_MAN: &str = "ARGTREE_GENERATE_MAN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Parse the command line and run the selected command.
    Execute,
    /// Invoked by bash `complete -C`: suggest the word at index `cword` of `line`.
    /// Index 0 is the program name, which gets no suggestions.
    Complete { line: String, cword: usize },
    /// Write man pages into `dir`.
    GenerateMan { dir: PathBuf },
}

impl Mode {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Resolve the mode from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let (Some(line), Some(cword)) = (non_empty(ENV_COMPLETE_LINE), non_empty(ENV_COMPLETE_WORD)) {
            // A malformed index completes nothing.
            let cword = cword.trim().parse().unwrap_or_else(|_| {
                tracing::debug!(%cword, "ignoring malformed completion word index");
                0
            });
            return Self::Complete { line, cword };
        }
        if let Some(dir) = non_empty(ENV_GENERATE_MAN) {
            return Self::GenerateMan { dir: dir.into() };
        }
        Self::Execute
    }
}

/// Run `tree` in `mode`. `args` includes the program name.
///
/// Help text and completions go to `out`; handlers write wherever they like.
pub fn run(tree: &CommandTree, mode: Mode, args: &[String], out: &mut impl Write) -> Result<()> {
    let program = args.first().map(String::as_str).unwrap_or(tree.root().name());

    match mode {
        Mode::Execute => {
            let rest = args.get(1..).unwrap_or_default();
            match Parser::with_program(tree, program).parse_all(rest)? {
                ParseOutcome::HelpRequested(help) => {
                    out.write_all(help.render().as_bytes())
                        .context("failed to write help")?;
                    Ok(())
                }
                ParseOutcome::Bound(bound) => bound.run(),
            }
        }
        Mode::Complete { cword: 0, .. } => Ok(()),
        Mode::Complete { line, cword } => {
            let words: Vec<&str> = line.split_whitespace().collect();
            let end = cword.min(words.len());
            let partial = words.get(1..end).unwrap_or_default();
            for suggestion in autocomplete(tree, partial) {
                writeln!(out, "{suggestion}").context("failed to write completions")?;
            }
            Ok(())
        }
        Mode::GenerateMan { dir } => {
            if !dir.is_dir() {
                bail!("man page directory does not exist: {}", dir.display());
            }
            for (name, page) in man_pages(tree, program) {
                let path = dir.join(&name);
                fs::write(&path, page)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                tracing::info!(path = %path.display(), "wrote man page");
            }
            Ok(())
        }
    }
}

/// Entry point for binaries: `fn main() -> ExitCode { run_main(tree()) }`.
///
/// A schema error is a programming mistake, so it aborts with a panic instead of
/// an exit status. Runtime errors print a single line to stderr and exit with 1.
pub fn run_main(tree: Result<CommandTree, SchemaError>) -> ExitCode {
    init_tracing();

    let tree = match tree {
        Ok(tree) => tree,
        Err(err) => panic!("invalid command tree: {err}"),
    };
    let args: Vec<String> = std::env::args().collect();
    let mut stdout = std::io::stdout().lock();

    match run(&tree, Mode::from_env(), &args, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A host binary may already have installed a subscriber.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
