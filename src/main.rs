//! Thin CLI shell over the `kconfigure` library: wires argument parsing,
//! logging and file I/O around `choices`/`interpreter`/`graph`, which do
//! all of the actual work.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use kconfigure::choices::ConfigChoices;
use kconfigure::config::ConfigMap;
use kconfigure::interpreter::{FsDirectiveSource, Interpreter};
use kconfigure::settings::Settings;
use kconfigure::symtab::SymbolTable;
use kconfigure::symview;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// External parser's JSON symbol-view dump (§6).
    #[arg(long, value_name = "FILE")]
    symbols: PathBuf,

    /// Project settings file (search paths, DISCARD_N_SOLUTIONS).
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Resolves directives against a configuration basis and writes the
    /// result as a `.config` file.
    Generate(RunArgs),
    /// Resolves directives without writing anything, reporting conflicts.
    Check(RunArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// A `.config` file forming the configuration basis. May be repeated;
    /// later files override earlier ones.
    #[arg(long = "base", value_name = "FILE")]
    base: Vec<PathBuf>,

    /// A directive file to run.
    #[arg(long, value_name = "FILE")]
    directives: Option<PathBuf>,

    /// An inline directive program, run after `--directives` if both are
    /// given.
    #[arg(long, value_name = "PROGRAM")]
    eval: Option<String>,

    /// Where to write the resulting `.config` (`generate` only).
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => Settings::load(path).with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if settings.discard_n_solutions {
        std::env::set_var("DISCARD_N_SOLUTIONS", "1");
    }

    println!("{} {}", "kconfigure".green().bold(), format!("v{VERSION}").white());

    let mut table = load_symbol_table(&args.symbols)?;

    match &args.action {
        Action::Generate(run) => {
            let output = run.output.as_ref().context("generate requires --output")?;
            let resolved = run_pipeline(&mut table, run, &settings)?;
            let text = resolved.write_str(&table);
            std::fs::write(output, text).with_context(|| format!("writing {}", output.display()))?;
            println!("{} {}", ">>".cyan(), format!("wrote {}", output.display()).green());
        }
        Action::Check(run) => {
            run_pipeline(&mut table, run, &settings)?;
            println!("{} {}", ">>".cyan(), "no conflicts".green().bold());
        }
    }

    Ok(())
}

fn load_symbol_table(path: &PathBuf) -> Result<SymbolTable> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let view = symview::parse_symbol_table_json(&text)
        .with_context(|| format!("parsing symbol view {}", path.display()))?;

    let mut table = SymbolTable::new();
    symview::import_into(&mut table, view).context("importing symbol view")?;
    table.link().context("linking symbol table")?;
    Ok(table)
}

fn load_base(table: &mut SymbolTable, bases: &[PathBuf]) -> Result<ConfigMap> {
    let mut merged = ConfigMap::new();
    for path in bases {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let map = ConfigMap::read_str(table, &text).with_context(|| format!("parsing {}", path.display()))?;
        for (sym, value) in map.iter() {
            merged.set(sym, value.cloned());
        }
    }
    Ok(merged)
}

fn run_pipeline(table: &mut SymbolTable, run: &RunArgs, settings: &Settings) -> Result<ConfigMap> {
    let base = load_base(table, &run.base)?;
    let mut choices = ConfigChoices::new(table, &base);

    {
        let mut interp = Interpreter::new(&mut choices, settings.search_paths.clone());
        if let Some(path) = &run.directives {
            interp.run_file(&FsDirectiveSource, path).with_context(|| format!("running {}", path.display()))?;
        }
        if let Some(program) = &run.eval {
            interp.run_str(program).context("running --eval program")?;
        }
    }

    choices.resolve().context("resolving configuration")
}
