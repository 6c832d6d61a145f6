//! Grammar types.

use crate::{
    config::{ConfigError, GrammarConfig},
    token::{Token, TokenParseError},
    types::Map,
    util::display_fn,
};
use std::{fmt, marker::PhantomData, path::Path};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProductionID {
    raw: u16,
}

impl ProductionID {
    /// The augmented start production, `S' -> S`.
    pub const ACCEPT: Self = Self::new(0);

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self::new(raw)
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }

    #[inline]
    fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Display for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// A grammar symbol appearing in the right-hand side of a production.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    /// A terminal symbol.
    T(Token),
    /// A nonterminal symbol, referred by its name.
    N(String),
}

impl Symbol {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::T(..))
    }

    pub fn as_nonterminal(&self) -> Option<&str> {
        match self {
            Self::N(name) => Some(name),
            Self::T(..) => None,
        }
    }

    /// Parse a right-hand side element: `<class,text>` or a nonterminal name.
    pub fn parse(s: &str) -> Result<Self, GrammarDefError> {
        if s.starts_with('<') {
            Ok(Self::T(Token::parse_short(s)?))
        } else if verify_nonterminal(s) {
            Ok(Self::N(s.to_owned()))
        } else {
            Err(GrammarDefError::InvalidName(s.to_owned()))
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T(t) => fmt::Display::fmt(t, f),
            Self::N(n) => f.write_str(n),
        }
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug)]
pub struct Production {
    id: ProductionID,
    left: String,
    right: Vec<Symbol>,
}

impl Production {
    pub fn id(&self) -> ProductionID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> &str {
        &self.left
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[Symbol] {
        &self.right[..]
    }
}

// `"LHS -> R1 R2 R3"`
impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.left)?;
        for symbol in &self.right {
            write!(f, " {}", symbol)?;
        }
        Ok(())
    }
}

/// The grammar definition used to derive the parser tables.
///
/// Productions are numbered in definition order, and the production `0` is
/// the augmented start production whose left-hand side is the start symbol
/// of the automaton.
#[derive(Debug)]
pub struct Grammar {
    productions: Vec<Production>,
    by_left: Map<String, Vec<ProductionID>>,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## nonterminals:")?;
        for name in self.by_left.keys() {
            write!(f, "{}", name)?;
            if name == self.start_symbol() {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## productions:")?;
        for production in &self.productions {
            writeln!(f, "{}: {}", production.id, production)?;
        }

        Ok(())
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarDefError> {
        let config = GrammarConfig::from_file(path)?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &GrammarConfig) -> Result<Grammar, GrammarDefError> {
        Self::from_formulas(&config.formulas)
    }

    /// Build a grammar from production lines of the form `lhs -> sym1 ... symN`.
    pub fn from_formulas<I>(formulas: I) -> Result<Grammar, GrammarDefError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Grammar::define(|g| {
            for formula in formulas {
                g.formula(formula.as_ref())?;
            }
            Ok(())
        })
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarDefError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarDefError>,
    {
        let mut def = GrammarDef {
            productions: vec![],
            by_left: Map::default(),
            _marker: PhantomData,
        };
        f(&mut def)?;
        def.end()
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[id.index()]
    }

    pub fn productions(&self) -> impl Iterator<Item = &Production> + '_ {
        self.productions.iter()
    }

    /// Return the productions whose left-hand side is `left`, in definition order.
    pub fn productions_of<'g>(&'g self, left: &str) -> impl Iterator<Item = &'g Production> + 'g {
        self.by_left
            .get(left)
            .map(|ids| &ids[..])
            .unwrap_or(&[])
            .iter()
            .map(|id| self.production(*id))
    }

    /// Look up the number of the production `left -> right`.
    pub fn find(&self, left: &str, right: &[Symbol]) -> Option<ProductionID> {
        self.productions_of(left)
            .find(|production| production.right == right)
            .map(|production| production.id)
    }

    /// Nonterminal names that have at least one production, in order of
    /// their first definition.
    pub fn nonterminals(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_left.keys().map(|name| &name[..])
    }

    pub fn start_symbol(&self) -> &str {
        self.production(ProductionID::ACCEPT).left()
    }

    pub fn len(&self) -> usize {
        self.productions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }

    /// Nonterminals referred in some right-hand side but never defined.
    pub fn undefined_nonterminals(&self) -> impl Iterator<Item = &str> + '_ {
        let mut seen = crate::types::Set::default();
        self.productions
            .iter()
            .flat_map(|production| production.right.iter())
            .filter_map(Symbol::as_nonterminal)
            .filter(move |name| !self.by_left.contains_key(*name) && seen.insert(*name))
    }

    pub fn display_production<'g>(&'g self, id: ProductionID) -> impl fmt::Display + 'g {
        display_fn(move |f| write!(f, "{}: {}", id, self.production(id)))
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef<'def> {
    productions: Vec<Production>,
    by_left: Map<String, Vec<ProductionID>>,
    _marker: PhantomData<&'def mut ()>,
}

impl<'def> GrammarDef<'def> {
    /// Parse a production line `lhs -> sym1 sym2 ... symN` and add it to this grammar.
    pub fn formula(&mut self, formula: &str) -> Result<ProductionID, GrammarDefError> {
        let (left, right) =
            formula
                .trim()
                .split_once("->")
                .ok_or_else(|| GrammarDefError::Formula {
                    formula: formula.to_owned(),
                    reason: "missing `->'".into(),
                })?;
        let right = right
            .split_whitespace()
            .map(Symbol::parse)
            .collect::<Result<Vec<_>, _>>()?;
        self.production(left.trim(), right)
    }

    /// Specify a production rule into this grammer.
    pub fn production<I>(&mut self, left: &str, right: I) -> Result<ProductionID, GrammarDefError>
    where
        I: IntoIterator<Item = Symbol>,
    {
        if !verify_nonterminal(left) {
            return Err(GrammarDefError::InvalidName(left.to_owned()));
        }
        let right: Vec<Symbol> = right.into_iter().collect();
        for symbol in &right {
            if let Symbol::N(name) = symbol {
                if !verify_nonterminal(name) {
                    return Err(GrammarDefError::InvalidName(name.clone()));
                }
            }
        }

        let ids = self.by_left.get(left).map(|ids| &ids[..]).unwrap_or(&[]);
        if ids
            .iter()
            .any(|id| self.productions[id.index()].right == right)
        {
            let production = Production {
                id: ProductionID::new(0),
                left: left.to_owned(),
                right,
            };
            return Err(GrammarDefError::Duplicate(production.to_string()));
        }

        let raw = u16::try_from(self.productions.len())
            .map_err(|_| GrammarDefError::from("too many production rules"))?;
        let id = ProductionID::new(raw);
        self.productions.push(Production {
            id,
            left: left.to_owned(),
            right,
        });
        self.by_left.entry(left.to_owned()).or_default().push(id);

        Ok(id)
    }

    fn end(self) -> Result<Grammar, GrammarDefError> {
        if self.productions.is_empty() {
            return Err("empty production rules".into());
        }
        Ok(Grammar {
            productions: self.productions,
            by_left: self.by_left,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarDefError {
    #[error("Config error: {}", _0)]
    Config(#[from] ConfigError),

    #[error("Syntax error in `{}': {}", formula, reason)]
    Formula { formula: String, reason: String },

    #[error("Token error: {}", _0)]
    Token(#[from] TokenParseError),

    #[error("incorrect nonterminal name: `{}'", _0)]
    InvalidName(String),

    #[error("Duplicate production rule detected: `{}'", _0)]
    Duplicate(String),

    #[error("Other error: {}", msg)]
    Other { msg: String },
}
impl From<&str> for GrammarDefError {
    fn from(msg: &str) -> Self {
        Self::Other { msg: msg.into() }
    }
}
impl From<String> for GrammarDefError {
    fn from(msg: String) -> Self {
        Self::Other { msg }
    }
}

fn verify_nonterminal(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        // The name must not be empty.
        return false;
    };
    if !(first == '_' || unicode_ident::is_xid_start(first)) {
        return false;
    }
    // primes are allowed for augmented symbols, e.g. `S'`.
    chars.all(|ch| ch == '\'' || unicode_ident::is_xid_continue(ch))
}
