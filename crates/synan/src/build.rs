//! Table generation pipeline.

use crate::table::GeneratedTables;
use anyhow::Context as _;
use std::{
    fs,
    path::{Path, PathBuf},
};
use synan_runtime::{
    grammar::Grammar,
    table::{ACTIONS_FILE, GOTOS_FILE},
};

pub const ITEMS_FILE: &str = "items.txt";
pub const CONFLICTS_FILE: &str = "conflicts.txt";
pub const GRAMMAR_FILE: &str = "grammar.txt";

/// Shortcut for `Build::new(grammar_file, out_dir).process()`.
pub fn process(grammar_file: &Path, out_dir: &Path) -> anyhow::Result<BuildSummary> {
    Build::new(grammar_file, out_dir).process()
}

/// Statistics of a finished build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub productions: usize,
    pub states: usize,
    pub actions: usize,
    pub gotos: usize,
    pub conflicts: usize,
}

#[derive(Debug)]
pub struct Build {
    grammar_file: PathBuf,
    out_dir: PathBuf,
}

impl Build {
    pub fn new(grammar_file: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            grammar_file: grammar_file.into(),
            out_dir: out_dir.into(),
        }
    }

    /// Generate the tables from the grammar file and write every artifact
    /// into the output directory.
    pub fn process(&self) -> anyhow::Result<BuildSummary> {
        let span = tracing::debug_span!("build", grammar = %self.grammar_file.display());
        let _entered = span.enter();

        let grammar = Grammar::from_file(&self.grammar_file).with_context(|| {
            format!(
                "failed to load the grammar from `{}'",
                self.grammar_file.display()
            )
        })?;

        let undefined: Vec<&str> = grammar.undefined_nonterminals().collect();
        if !undefined.is_empty() {
            tracing::warn!(
                "The following nonterminals have no associated production rule: {:?}",
                undefined
            );
        }

        let generated = GeneratedTables::generate(&grammar);

        fs::create_dir_all(&self.out_dir).with_context(|| {
            format!(
                "failed to create the output directory `{}'",
                self.out_dir.display()
            )
        })?;
        self.write(ACTIONS_FILE, generated.tables.display_actions())?;
        self.write(GOTOS_FILE, generated.tables.display_gotos())?;
        self.write(ITEMS_FILE, generated.display_items(&grammar))?;
        self.write(CONFLICTS_FILE, generated.display_conflicts())?;
        self.write(GRAMMAR_FILE, &grammar)?;

        let conflicts = generated.conflict_count();
        if conflicts > 0 {
            let suffix = if conflicts == 1 { "" } else { "s" };
            tracing::warn!(
                "The grammar has {} conflict{}. See {} for details.",
                conflicts,
                suffix,
                self.out_dir.join(CONFLICTS_FILE).display()
            );
        }

        Ok(BuildSummary {
            productions: grammar.len(),
            states: generated.automaton.len(),
            actions: generated.tables.actions.len(),
            gotos: generated.tables.gotos.len(),
            conflicts,
        })
    }

    fn write(&self, name: &str, content: impl std::fmt::Display) -> anyhow::Result<()> {
        let path = self.out_dir.join(name);
        fs::write(&path, content.to_string())
            .with_context(|| format!("failed to write `{}'", path.display()))
    }
}
