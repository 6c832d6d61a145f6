//! Calculation of first set function.

use synan_runtime::{
    grammar::{Grammar, Symbol},
    token::Token,
    types::{Map, Set},
};

/// Memoized `First(X)` for every nonterminal of a grammar.
#[derive(Debug)]
pub struct FirstSets {
    map: Map<String, Set<Token>>,
}

impl FirstSets {
    pub fn new(grammar: &Grammar) -> Self {
        let span = tracing::trace_span!("first_sets");
        let _entered = span.enter();

        let map = grammar
            .nonterminals()
            .map(|name| {
                let first = first_of_nonterminal(grammar, name, &Set::default());
                tracing::trace!("First({}) = {} token(s)", name, first.len());
                (name.to_owned(), first)
            })
            .collect();
        Self { map }
    }

    /// `First(symbol)`
    pub fn get(&self, symbol: &Symbol) -> Set<Token> {
        match symbol {
            Symbol::T(t) => Some(t.clone()).into_iter().collect(),
            Symbol::N(n) => self.map.get(n).cloned().unwrap_or_default(),
        }
    }
}

/// Compute the terminals that can begin a derivation from `symbol`.
///
/// Only the first element of each right-hand side is examined, and the
/// nonterminals in `excluded` are not expanded again. `excluded` grows by the
/// expanded nonterminal on every recursive call, so the computation terminates
/// on left-recursive grammars as well.
pub fn first_set<'g>(
    grammar: &'g Grammar,
    symbol: &'g Symbol,
    excluded: &Set<&'g str>,
) -> Set<Token> {
    match symbol {
        Symbol::T(t) => Some(t.clone()).into_iter().collect(),
        Symbol::N(n) => first_of_nonterminal(grammar, n, excluded),
    }
}

fn first_of_nonterminal<'g>(
    grammar: &'g Grammar,
    name: &'g str,
    excluded: &Set<&'g str>,
) -> Set<Token> {
    let mut excluded = excluded.clone();
    excluded.insert(name);

    let mut res = Set::default();
    for production in grammar.productions_of(name) {
        let Some(head) = production.right().first() else {
            // empty productions contribute nothing.
            continue;
        };
        if matches!(head, Symbol::N(n) if excluded.contains(&n[..])) {
            continue;
        }
        res.extend(first_set(grammar, head, &excluded));
    }
    res
}
