//! Action/goto tables and their persisted textual format.

use crate::{
    definition::ParseTable,
    grammar::{Grammar, ProductionID},
    token::Token,
    types::Map,
    util::display_fn,
};
use indexmap::Equivalent;
use std::{
    borrow::Borrow,
    fmt, fs,
    hash::{Hash, Hasher},
    io,
    path::Path,
    str::FromStr,
};

/// File name of the persisted action table.
pub const ACTIONS_FILE: &str = "actions.txt";

/// File name of the persisted goto table.
pub const GOTOS_FILE: &str = "gotos.txt";

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u32);
impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}
impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
impl StateID {
    /// The initial state, i.e. the closure of `[S' -> . S, #]`.
    pub const START: Self = Self(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u32 {
        self.0
    }
}

/// The action that the LR automaton in a state performs on a particular
/// lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce to the specified production rule.
    Reduce(ProductionID),

    Accept,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(next) => write!(f, "S-{}", next),
            Self::Reduce(production) => write!(f, "R-{}", production),
            Self::Accept => f.write_str("A-0"),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, number) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid action `{}'", s))?;
        let invalid_number = || format!("invalid number in action `{}'", s);
        match kind {
            "A" => Ok(Self::Accept),
            "S" => Ok(Self::Shift(StateID(
                number.parse().map_err(|_| invalid_number())?,
            ))),
            "R" => Ok(Self::Reduce(ProductionID::from_raw(
                number.parse().map_err(|_| invalid_number())?,
            ))),
            _ => Err(format!("unknown action kind in `{}'", s)),
        }
    }
}

/// A rejected write to an already populated table cell.
#[derive(Debug, Clone)]
pub struct Conflict<K, V> {
    pub kind: &'static str,
    pub state: StateID,
    pub key: K,
    /// The value that stays in the table.
    pub kept: V,
    pub discarded: V,
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for Conflict<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} conflicts at ({}, {}) old {}: {} new {}: {}",
            self.kind,
            self.state,
            self.key,
            self.value_name(),
            self.kept,
            self.value_name(),
            self.discarded,
        )
    }
}

impl<K, V> Conflict<K, V> {
    fn value_name(&self) -> &'static str {
        match self.kind {
            "action" => "action",
            _ => "target",
        }
    }
}

/// A mapping `(state, key) -> value` where the first write to a cell wins.
///
/// Every later write to an occupied cell is recorded as a [`Conflict`]
/// instead of replacing the value. Iteration follows insertion order.
#[derive(Debug, Clone)]
pub struct Table<K, V> {
    kind: &'static str,
    cells: Map<(StateID, K), V>,
    conflicts: Vec<Conflict<K, V>>,
}

impl<K, V> Table<K, V>
where
    K: Eq + Hash + Clone + fmt::Display,
    V: Clone + fmt::Display,
{
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            cells: Map::default(),
            conflicts: vec![],
        }
    }

    /// Write `value` into the cell `(state, key)` unless it is already populated.
    ///
    /// Returns `false` and logs a conflict when the cell has been occupied.
    pub fn insert(&mut self, state: StateID, key: K, value: V) -> bool {
        if let Some(kept) = self.get(state, &key) {
            let conflict = Conflict {
                kind: self.kind,
                state,
                key,
                kept: kept.clone(),
                discarded: value,
            };
            tracing::debug!("{}", conflict);
            self.conflicts.push(conflict);
            return false;
        }
        self.cells.insert((state, key), value);
        true
    }

    pub fn get<Q>(&self, state: StateID, key: &Q) -> Option<&V>
    where
        Q: ?Sized + Hash + Eq,
        K: Borrow<Q>,
    {
        self.cells.get(&Cell(state, key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateID, &K, &V)> + '_ {
        self.cells.iter().map(|((state, key), value)| (*state, key, value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn conflicts(&self) -> &[Conflict<K, V>] {
        &self.conflicts[..]
    }
}

/// Borrowed lookup key for `(StateID, K)`.
struct Cell<'a, Q: ?Sized>(StateID, &'a Q);

impl<Q: ?Sized + Hash> Hash for Cell<'_, Q> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // must agree with the `Hash` of `(StateID, K)`.
        self.0.hash(state);
        self.1.hash(state);
    }
}

impl<Q, K> Equivalent<(StateID, K)> for Cell<'_, Q>
where
    Q: ?Sized + Eq,
    K: Borrow<Q>,
{
    fn equivalent(&self, key: &(StateID, K)) -> bool {
        self.0 == key.0 && *self.1 == *key.1.borrow()
    }
}

pub type ActionTable = Table<Token, Action>;
pub type GotoTable = Table<String, StateID>;

/// The pair of action and goto tables that drives the parser.
#[derive(Debug, Clone)]
pub struct ParseTables {
    pub actions: ActionTable,
    pub gotos: GotoTable,
}

impl Default for ParseTables {
    fn default() -> Self {
        Self {
            actions: Table::new("action"),
            gotos: Table::new("goto"),
        }
    }
}

impl ParseTable for ParseTables {
    fn action(&self, current: StateID, lookahead: &Token) -> Option<Action> {
        self.actions.get(current, lookahead).copied()
    }

    fn goto(&self, current: StateID, symbol: &str) -> Option<StateID> {
        self.gotos.get(current, symbol).copied()
    }
}

impl ParseTables {
    /// The contents of the action file, `state <class,text> action` per line.
    pub fn display_actions(&self) -> impl fmt::Display + '_ {
        display_fn(|f| {
            for (state, token, action) in self.actions.iter() {
                writeln!(f, "{} {} {}", state, token, action)?;
            }
            Ok(())
        })
    }

    /// The contents of the goto file, `source nonterminal target` per line.
    pub fn display_gotos(&self) -> impl fmt::Display + '_ {
        display_fn(|f| {
            for (state, symbol, target) in self.gotos.iter() {
                writeln!(f, "{} {} {}", state, symbol, target)?;
            }
            Ok(())
        })
    }

    /// Write both tables into `dir` as [`ACTIONS_FILE`] and [`GOTOS_FILE`].
    pub fn save(&self, dir: impl AsRef<Path>) -> io::Result<()> {
        let dir = dir.as_ref();
        fs::write(dir.join(ACTIONS_FILE), self.display_actions().to_string())?;
        fs::write(dir.join(GOTOS_FILE), self.display_gotos().to_string())?;
        Ok(())
    }

    /// Read both tables from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, TableLoadError> {
        let dir = dir.as_ref();
        let actions = fs::read_to_string(dir.join(ACTIONS_FILE)).map_err(TableLoadError::IO)?;
        let gotos = fs::read_to_string(dir.join(GOTOS_FILE)).map_err(TableLoadError::IO)?;
        Self::parse(&actions, &gotos)
    }

    /// Check that every reduction and goto refers to something in `grammar`.
    ///
    /// Tables built from an older version of the grammar are rejected here
    /// instead of failing in the middle of an analysis.
    pub fn validate(&self, grammar: &Grammar) -> Result<(), TableLoadError> {
        for (state, token, action) in self.actions.iter() {
            if let Action::Reduce(id) = action {
                if usize::from(id.into_raw()) >= grammar.len() {
                    return Err(TableLoadError::Stale {
                        cell: format!("{} {} {}", state, token, action),
                        reason: format!("the grammar has no production {}", id),
                    });
                }
            }
        }
        for (state, symbol, target) in self.gotos.iter() {
            if grammar.productions_of(symbol).next().is_none() {
                return Err(TableLoadError::Stale {
                    cell: format!("{} {} {}", state, symbol, target),
                    reason: format!("`{}' is not a nonterminal of the grammar", symbol),
                });
            }
        }
        Ok(())
    }

    pub fn parse(actions: &str, gotos: &str) -> Result<Self, TableLoadError> {
        let mut tables = Self::default();

        for (i, line) in lines(actions) {
            let malformed = |reason: String| TableLoadError::Malformed { line: i, reason };
            let (state, rest) = line
                .split_once(' ')
                .ok_or_else(|| malformed("expected `state token action'".into()))?;
            let (token, action) = rest
                .trim()
                .rsplit_once(' ')
                .ok_or_else(|| malformed("expected `state token action'".into()))?;
            let state = parse_state(state).map_err(malformed)?;
            let token = Token::parse_short(token.trim()).map_err(|e| malformed(e.to_string()))?;
            let action = action.parse().map_err(malformed)?;
            if !tables.actions.insert(state, token, action) {
                return Err(TableLoadError::Duplicate {
                    line: i,
                    cell: line.to_owned(),
                });
            }
        }

        for (i, line) in lines(gotos) {
            let malformed = |reason: String| TableLoadError::Malformed { line: i, reason };
            let fields: Vec<&str> = line.split_whitespace().collect();
            let &[source, symbol, target] = &fields[..] else {
                return Err(malformed("expected `source nonterminal target'".into()));
            };
            let source = parse_state(source).map_err(malformed)?;
            let target = parse_state(target).map_err(malformed)?;
            if !tables.gotos.insert(source, symbol.to_owned(), target) {
                return Err(TableLoadError::Duplicate {
                    line: i,
                    cell: line.to_owned(),
                });
            }
        }

        tracing::debug!(
            "parsed {} actions and {} gotos",
            tables.actions.len(),
            tables.gotos.len()
        );

        Ok(tables)
    }
}

/// Non-blank lines with 1-based line numbers.
fn lines(source: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

fn parse_state(s: &str) -> Result<StateID, String> {
    s.parse()
        .map(StateID)
        .map_err(|_| format!("invalid state number `{}'", s))
}

#[derive(Debug, thiserror::Error)]
pub enum TableLoadError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("malformed table at line {}: {}", line, reason)]
    Malformed { line: usize, reason: String },

    #[error("duplicate table entry at line {}: `{}'", line, cell)]
    Duplicate { line: usize, cell: String },

    #[error("table entry `{}' does not match the grammar: {}", cell, reason)]
    Stale { cell: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyword(text: &str) -> Token {
        Token::new("keywords", text)
    }

    #[test]
    fn first_write_wins() {
        let mut table = ActionTable::new("action");
        assert!(table.insert(StateID(0), keyword("a"), Action::Shift(StateID(2))));
        assert!(table.insert(StateID(0), Token::end(), Action::Accept));
        assert!(!table.insert(
            StateID(0),
            keyword("a"),
            Action::Reduce(ProductionID::from_raw(1))
        ));
        assert!(table.insert(
            StateID(1),
            keyword("a"),
            Action::Reduce(ProductionID::from_raw(1))
        ));

        assert_eq!(table.len(), 3);
        assert_eq!(
            table.get(StateID(0), &keyword("a")),
            Some(&Action::Shift(StateID(2)))
        );
        assert_eq!(table.get(StateID(2), &keyword("a")), None);

        let [conflict] = table.conflicts() else {
            panic!("expected exactly one conflict");
        };
        assert_eq!(
            conflict.to_string(),
            "action conflicts at (0, <keywords,a>) old action: S-2 new action: R-1"
        );
    }

    #[test]
    fn lookup_by_borrowed_key() {
        let mut gotos = GotoTable::new("goto");
        gotos.insert(StateID(4), "expr".to_owned(), StateID(7));
        assert_eq!(gotos.get(StateID(4), "expr"), Some(&StateID(7)));
        assert_eq!(gotos.get(StateID(4), "term"), None);
        assert_eq!(gotos.get(StateID(5), "expr"), None);
    }

    #[test]
    fn identifiers_share_one_cell() {
        let mut tables = ParseTables::default();
        tables.actions.insert(
            StateID(0),
            Token::new(Token::IDENTIFIERS, "id"),
            Action::Shift(StateID(3)),
        );
        assert_eq!(
            tables.action(StateID(0), &Token::new(Token::IDENTIFIERS, "count")),
            Some(Action::Shift(StateID(3)))
        );
    }

    #[test]
    fn persisted_format() {
        let mut tables = ParseTables::default();
        tables
            .actions
            .insert(StateID(0), keyword("a"), Action::Shift(StateID(2)));
        tables
            .actions
            .insert(StateID(1), Token::end(), Action::Accept);
        tables.actions.insert(
            StateID(7),
            Token::new("strings", "hello world"),
            Action::Reduce(ProductionID::from_raw(3)),
        );
        tables
            .gotos
            .insert(StateID(0), "S".to_owned(), StateID(1));

        let actions = tables.display_actions().to_string();
        let gotos = tables.display_gotos().to_string();
        assert_eq!(
            actions,
            "0 <keywords,a> S-2\n1 <ends,#> A-0\n7 <strings,hello world> R-3\n"
        );
        assert_eq!(gotos, "0 S 1\n");

        let reloaded = ParseTables::parse(&actions, &gotos).unwrap();
        assert_eq!(reloaded.display_actions().to_string(), actions);
        assert_eq!(
            reloaded.action(StateID(7), &Token::new("strings", "hello world")),
            Some(Action::Reduce(ProductionID::from_raw(3)))
        );
        assert_eq!(reloaded.goto(StateID(0), "S"), Some(StateID(1)));
    }

    #[test]
    fn reject_tables_of_another_grammar() {
        let grammar = Grammar::from_formulas(["S' -> S", "S -> <keywords,a>"]).unwrap();

        let tables =
            ParseTables::parse("0 <keywords,a> S-2\n2 <ends,#> R-1\n", "0 S 1\n").unwrap();
        assert!(tables.validate(&grammar).is_ok());

        let tables = ParseTables::parse("0 <keywords,a> R-2\n", "").unwrap();
        let err = tables.validate(&grammar).unwrap_err();
        assert!(matches!(
            err,
            TableLoadError::Stale { ref cell, .. } if cell == "0 <keywords,a> R-2"
        ));

        let tables = ParseTables::parse("", "0 T 1\n").unwrap();
        assert!(matches!(
            tables.validate(&grammar),
            Err(TableLoadError::Stale { .. })
        ));
    }

    #[test]
    fn save_and_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut tables = ParseTables::default();
        tables
            .actions
            .insert(StateID(0), keyword("a"), Action::Shift(StateID(1)));
        tables
            .gotos
            .insert(StateID(0), "S".to_owned(), StateID(2));
        tables.save(dir.path()).unwrap();

        let loaded = ParseTables::load(dir.path()).unwrap();
        assert_eq!(loaded.actions.len(), 1);
        assert_eq!(loaded.gotos.len(), 1);

        assert!(matches!(
            ParseTables::load(dir.path().join("nowhere")),
            Err(TableLoadError::IO(..))
        ));
    }

    #[test]
    fn reject_malformed_tables() {
        assert!(matches!(
            ParseTables::parse("0 <keywords,a>\n", ""),
            Err(TableLoadError::Malformed { line: 1, .. })
        ));
        assert!(matches!(
            ParseTables::parse("x <keywords,a> S-1\n", ""),
            Err(TableLoadError::Malformed { .. })
        ));
        assert!(matches!(
            ParseTables::parse("0 <keywords,a> X-1\n", ""),
            Err(TableLoadError::Malformed { .. })
        ));
        assert!(matches!(
            ParseTables::parse("", "\n0 S\n"),
            Err(TableLoadError::Malformed { line: 2, .. })
        ));
        assert!(matches!(
            ParseTables::parse("0 <keywords,a> S-1\n0 <keywords,a> R-2\n", ""),
            Err(TableLoadError::Duplicate { line: 2, .. })
        ));
    }
}
