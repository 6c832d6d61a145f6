use anyhow::Context as _;
use clap::{Parser as _, Subcommand};
use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use synan_runtime::{
    config::MessageConfig,
    token::load_tokens,
    Grammar, Messages, ParseTables, Parser,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate the parse tables from a grammar file.
    Build {
        /// The path of grammar definition file.
        #[arg(long)]
        grammar: PathBuf,

        /// The directory where the tables and diagnostics are written.
        #[arg(long)]
        out_dir: PathBuf,
    },

    /// Check the scanner outputs with the generated tables.
    Analyze {
        /// The path of grammar definition file.
        #[arg(long)]
        grammar: PathBuf,

        /// The path of diagnostic message file.
        #[arg(long)]
        messages: PathBuf,

        /// The directory containing `actions.txt' and `gotos.txt'.
        #[arg(long)]
        tables: PathBuf,

        /// Token files, paired in order with `--output`.
        #[arg(long = "source", required = true)]
        sources: Vec<PathBuf>,

        /// Error report files, paired in order with `--source`.
        #[arg(long = "output", required = true)]
        outputs: Vec<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    match args.command {
        Command::Build { grammar, out_dir } => {
            let started = Instant::now();
            let summary = synan::build::process(&grammar, &out_dir)?;
            tracing::info!(
                "generated {} states ({} actions, {} gotos) in {:?}",
                summary.states,
                summary.actions,
                summary.gotos,
                started.elapsed()
            );
        }
        Command::Analyze {
            grammar,
            messages,
            tables,
            sources,
            outputs,
        } => analyze(&grammar, &messages, &tables, &sources, &outputs)?,
    }

    Ok(())
}

fn analyze(
    grammar_file: &Path,
    messages_file: &Path,
    tables_dir: &Path,
    sources: &[PathBuf],
    outputs: &[PathBuf],
) -> anyhow::Result<()> {
    anyhow::ensure!(
        sources.len() == outputs.len(),
        "the number of sources ({}) does not match the number of outputs ({})",
        sources.len(),
        outputs.len()
    );

    let grammar = Grammar::from_file(grammar_file).with_context(|| {
        format!(
            "failed to load the grammar from `{}'",
            grammar_file.display()
        )
    })?;
    let messages = MessageConfig::from_file(messages_file)
        .map_err(anyhow::Error::from)
        .and_then(|config| Ok(Messages::from_config(&config)?))
        .with_context(|| {
            format!(
                "failed to load the messages from `{}'",
                messages_file.display()
            )
        })?;
    let tables = ParseTables::load(tables_dir).with_context(|| {
        format!("failed to load the tables from `{}'", tables_dir.display())
    })?;
    tables.validate(&grammar).with_context(|| {
        format!(
            "the tables in `{}' were not generated from `{}'",
            tables_dir.display(),
            grammar_file.display()
        )
    })?;

    let mut parser = Parser::new(&tables, &grammar, &messages);
    for (source, output) in sources.iter().zip(outputs) {
        let started = Instant::now();

        let input = fs::read_to_string(source)
            .with_context(|| format!("failed to read `{}'", source.display()))?;
        let tokens = load_tokens(&input)
            .with_context(|| format!("malformed token in `{}'", source.display()))?;

        let errors = parser.analysis(&tokens);

        let mut report = String::new();
        for error in &errors {
            writeln!(report, "{}", error)?;
        }
        fs::write(output, report)
            .with_context(|| format!("failed to write `{}'", output.display()))?;

        tracing::info!(
            "{}: {} error(s), {:?} in {:?}",
            source.display(),
            errors.len(),
            parser.state(),
            started.elapsed()
        );
    }

    Ok(())
}
