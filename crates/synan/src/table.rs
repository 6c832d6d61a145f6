//! Construction of the action/goto tables from the canonical collection.

use crate::lr1::Automaton;
use std::fmt;
use synan_runtime::{
    grammar::{Grammar, ProductionID, Symbol},
    table::{Action, ParseTables},
    util::display_fn,
};

/// Fill the parse tables from the transitions and the finished items of `automaton`.
///
/// Every write goes through [`Table::insert`](synan_runtime::table::Table::insert),
/// so the first write to a cell wins and the later ones are kept as conflicts.
pub fn generate(g: &Grammar, automaton: &Automaton) -> ParseTables {
    let span = tracing::trace_span!("parse_table");
    let _entered = span.enter();

    let mut tables = ParseTables::default();

    for (source, symbol, target) in automaton.transitions().iter() {
        match symbol {
            Symbol::T(token) => {
                tables
                    .actions
                    .insert(source, token.clone(), Action::Shift(*target));
            }
            Symbol::N(name) => {
                tables.gotos.insert(source, name.clone(), *target);
            }
        }
    }

    for (id, items) in automaton.states() {
        for item in items.iter().filter(|item| item.is_finished(g)) {
            let action = if item.production == ProductionID::ACCEPT && item.lookahead.is_end() {
                Action::Accept
            } else {
                Action::Reduce(item.production)
            };
            tables.actions.insert(id, item.lookahead.clone(), action);
        }
    }

    tracing::debug!(
        "{} action(s), {} goto(s), {} conflict(s)",
        tables.actions.len(),
        tables.gotos.len(),
        tables.actions.conflicts().len() + tables.gotos.conflicts().len()
    );

    tables
}

/// The result of the table construction, along with its byproducts.
#[derive(Debug)]
pub struct GeneratedTables {
    pub automaton: Automaton,
    pub tables: ParseTables,
}

impl GeneratedTables {
    pub fn generate(g: &Grammar) -> Self {
        let automaton = Automaton::generate(g);
        let tables = generate(g, &automaton);
        Self { automaton, tables }
    }

    /// The number of discarded writes over every table.
    pub fn conflict_count(&self) -> usize {
        self.automaton.transitions().conflicts().len()
            + self.tables.actions.conflicts().len()
            + self.tables.gotos.conflicts().len()
    }

    /// One line per discarded write: transitions first, then actions and gotos.
    pub fn display_conflicts(&self) -> impl fmt::Display + '_ {
        display_fn(move |f| {
            for conflict in self.automaton.transitions().conflicts() {
                writeln!(f, "{}", conflict)?;
            }
            for conflict in self.tables.actions.conflicts() {
                writeln!(f, "{}", conflict)?;
            }
            for conflict in self.tables.gotos.conflicts() {
                writeln!(f, "{}", conflict)?;
            }
            Ok(())
        })
    }

    pub fn display_items<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        self.automaton.display(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synan_runtime::{table::StateID, token::Token};

    fn keyword(text: &str) -> Token {
        Token::new("keywords", text)
    }

    #[test]
    fn balanced_tables() {
        let g = Grammar::from_formulas([
            "S' -> S",
            "S -> <keywords,a> S <keywords,b>",
            "S ->",
        ])
        .unwrap();
        let generated = GeneratedTables::generate(&g);
        let tables = &generated.tables;
        assert_eq!(generated.conflict_count(), 0);
        assert_eq!(generated.display_conflicts().to_string(), "");

        let s0 = StateID::START;
        assert_eq!(
            tables.actions.get(s0, &keyword("a")),
            Some(&Action::Shift(StateID::from_raw(2)))
        );
        assert_eq!(
            tables.actions.get(s0, &Token::end()),
            Some(&Action::Reduce(ProductionID::from_raw(2)))
        );
        assert_eq!(tables.actions.get(s0, &keyword("b")), None);
        assert_eq!(tables.gotos.get(s0, "S"), Some(&StateID::from_raw(1)));
        assert_eq!(
            tables.actions.get(StateID::from_raw(1), &Token::end()),
            Some(&Action::Accept)
        );
    }

    #[test]
    fn deterministic_output() {
        let formulas = [
            "P -> E",
            "E -> E <operators,+> T",
            "E -> T",
            "T -> T <operators,*> F",
            "T -> F",
            "F -> <delimiters,(> E <delimiters,)>",
            "F -> <identifiers,id>",
        ];
        let render = || {
            let g = Grammar::from_formulas(formulas).unwrap();
            let generated = GeneratedTables::generate(&g);
            let rendered = (
                generated.tables.display_actions().to_string(),
                generated.tables.display_gotos().to_string(),
                generated.display_items(&g).to_string(),
            );
            rendered
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn conflict_accounting() {
        // E -> E + E is ambiguous.
        let g = Grammar::from_formulas([
            "P -> E",
            "E -> E <operators,+> E",
            "E -> <identifiers,id>",
        ])
        .unwrap();
        let generated = GeneratedTables::generate(&g);
        let tables = &generated.tables;

        let shifts = generated
            .automaton
            .transitions()
            .iter()
            .filter(|(_, symbol, _)| symbol.is_terminal())
            .count();
        let gotos = generated.automaton.transitions().len() - shifts;
        let finished: usize = generated
            .automaton
            .states()
            .map(|(_, items)| items.iter().filter(|item| item.is_finished(&g)).count())
            .sum();

        let action_conflicts = tables.actions.conflicts().len();
        assert!(action_conflicts > 0);
        assert_eq!(tables.actions.len() + action_conflicts, shifts + finished);
        assert_eq!(tables.gotos.len() + tables.gotos.conflicts().len(), gotos);

        let log = generated.display_conflicts().to_string();
        assert_eq!(log.lines().count(), generated.conflict_count());
        assert!(log
            .lines()
            .all(|line| line.starts_with("action conflicts at (")));
        // shift wins over reduce, since transitions are written first.
        let conflict = &tables.actions.conflicts()[0];
        assert!(matches!(conflict.kept, Action::Shift(..)));
        assert!(matches!(conflict.discarded, Action::Reduce(..)));
    }
}
