//! The implementation of canonical LR(1) automaton.

use crate::first_sets::FirstSets;
use std::{collections::BTreeSet, fmt};
use synan_runtime::{
    grammar::{Grammar, ProductionID, Symbol},
    table::{StateID, Table},
    token::Token,
    types::{Queue, Set},
    util::display_fn,
};

/// LR(1) item, i.e. a production with a marker position and one lookahead symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LRItem {
    pub production: ProductionID,
    /// The index of the next unmatched element in the right-hand side.
    pub marker: usize,
    pub lookahead: Token,
}

impl LRItem {
    pub fn new(production: ProductionID, marker: usize, lookahead: Token) -> Self {
        Self {
            production,
            marker,
            lookahead,
        }
    }

    pub fn is_finished(&self, g: &Grammar) -> bool {
        self.marker >= g.production(self.production).right().len()
    }

    /// The symbol right after the marker.
    pub fn current_symbol<'g>(&self, g: &'g Grammar) -> Option<&'g Symbol> {
        g.production(self.production).right().get(self.marker)
    }

    /// The symbol following the current symbol.
    pub fn next_symbol<'g>(&self, g: &'g Grammar) -> Option<&'g Symbol> {
        g.production(self.production).right().get(self.marker + 1)
    }

    pub fn is_closure_eligible(&self, g: &Grammar) -> bool {
        matches!(self.current_symbol(g), Some(Symbol::N(..)))
    }

    /// Move the marker over the current symbol.
    pub fn advance(&self) -> Self {
        Self {
            marker: self.marker + 1,
            ..self.clone()
        }
    }

    // `[S -> <keywords,a> . S <keywords,b>, <ends,#>]`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let production = g.production(self.production);
            write!(f, "[{} ->", production.left())?;
            for (i, symbol) in production.right().iter().enumerate() {
                if i == self.marker {
                    f.write_str(" .")?;
                }
                write!(f, " {}", symbol)?;
            }
            if self.marker >= production.right().len() {
                f.write_str(" .")?;
            }
            write!(f, ", {}]", self.lookahead)
        })
    }
}

/// A set of LR(1) items, i.e. a state of the automaton.
///
/// Being ordered, two sets with the same items compare and hash equal
/// regardless of the order in which they were built.
pub type ItemSet = BTreeSet<LRItem>;

/// Closure and goto calculation over a grammar.
#[derive(Debug)]
pub struct ItemSetExtractor<'g> {
    grammar: &'g Grammar,
    first_sets: FirstSets,
}

impl<'g> ItemSetExtractor<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            first_sets: FirstSets::new(grammar),
        }
    }

    /// Expand `items` with every item reachable without reading a symbol.
    pub fn closure(&self, mut items: ItemSet) -> ItemSet {
        let g = self.grammar;
        let mut pending: Vec<LRItem> = items.iter().cloned().collect();

        while let Some(item) = pending.pop() {
            // [X -> ... . Y beta, a]
            let Some(Symbol::N(y_symbol)) = item.current_symbol(g) else {
                continue;
            };

            let lookaheads = match item.next_symbol(g) {
                Some(next) => self.first_sets.get(next),
                None => Some(item.lookahead.clone()).into_iter().collect(),
            };

            for production in g.productions_of(y_symbol) {
                for lookahead in &lookaheads {
                    let new_item = LRItem::new(production.id(), 0, lookahead.clone());
                    if !items.contains(&new_item) {
                        items.insert(new_item.clone());
                        pending.push(new_item);
                    }
                }
            }
        }

        items
    }

    /// The items of `items` whose marker has moved over `symbol` (not closed).
    pub fn goto(&self, items: &ItemSet, symbol: &Symbol) -> ItemSet {
        items
            .iter()
            .filter(|item| item.current_symbol(self.grammar) == Some(symbol))
            .map(LRItem::advance)
            .collect()
    }

    /// `closure(goto(items, symbol))`
    pub fn reachable(&self, items: &ItemSet, symbol: &Symbol) -> ItemSet {
        self.closure(self.goto(items, symbol))
    }

    /// The distinct symbols right after the marker, in item order.
    pub fn transition_symbols(&self, items: &ItemSet) -> Set<Symbol> {
        items
            .iter()
            .filter_map(|item| item.current_symbol(self.grammar))
            .cloned()
            .collect()
    }
}

/// The canonical collection of LR(1) item sets and the transitions between them.
#[derive(Debug)]
pub struct Automaton {
    states: Set<ItemSet>,
    transitions: Table<Symbol, StateID>,
}

impl Automaton {
    pub fn generate(grammar: &Grammar) -> Self {
        let span = tracing::trace_span!("automaton");
        let _entered = span.enter();

        let extractor = ItemSetExtractor::new(grammar);
        let mut gen = AutomatonGenerator {
            states: Set::default(),
            pending: Queue::default(),
            transitions: Table::new("transition"),
        };

        let start = LRItem::new(ProductionID::ACCEPT, 0, Token::end());
        gen.register(extractor.closure(Some(start).into_iter().collect()));

        // 新しい状態が見つからなくなるまで繰り返す
        while let Some(current) = gen.pending.pop() {
            let items = &gen.states[index(current)];
            let successors: Vec<(Symbol, ItemSet)> = extractor
                .transition_symbols(items)
                .into_iter()
                .map(|symbol| {
                    let next = extractor.reachable(items, &symbol);
                    (symbol, next)
                })
                .collect();

            for (symbol, next) in successors {
                let target = gen.register(next);
                gen.transitions.insert(current, symbol, target);
            }
        }

        tracing::debug!(
            "canonical collection: {} states, {} transitions",
            gen.states.len(),
            gen.transitions.len()
        );

        Automaton {
            states: gen.states,
            transitions: gen.transitions,
        }
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &ItemSet)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, items)| (state_id(i), items))
    }

    pub fn state(&self, id: StateID) -> Option<&ItemSet> {
        self.states.get_index(index(id))
    }

    /// Look up the number of a state by its items.
    pub fn find(&self, items: &ItemSet) -> Option<StateID> {
        self.states.get_index_of(items).map(state_id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The transitions `(state, symbol) -> state`, in discovery order.
    pub fn transitions(&self) -> &Table<Symbol, StateID> {
        &self.transitions
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            writeln!(f, "total states: {}", self.len())?;
            for (id, items) in self.states() {
                writeln!(f, "\n#### State {:02}", id)?;
                for item in items {
                    writeln!(f, "- {}", item.display(g))?;
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug)]
struct AutomatonGenerator {
    states: Set<ItemSet>,
    pending: Queue<StateID>,
    transitions: Table<Symbol, StateID>,
}

impl AutomatonGenerator {
    /// Obtain the number of `items`, allocating the next one if it is unseen.
    fn register(&mut self, items: ItemSet) -> StateID {
        let (i, added) = self.states.insert_full(items);
        let id = state_id(i);
        if added {
            tracing::trace!("new state {:?} ({} items)", id, self.states[i].len());
            self.pending.push(id);
        }
        id
    }
}

fn state_id(index: usize) -> StateID {
    let raw = u32::try_from(index).unwrap_or_else(|_| panic!("too many states: {}", index));
    StateID::from_raw(raw)
}

fn index(id: StateID) -> usize {
    id.into_raw() as usize
}
