//! Parser definition.

use crate::{table::Action, table::StateID, token::Token};

/// The trait for abstracting the generated LR(1) parse table.
pub trait ParseTable {
    /// Return the action for the specified state and lookahead token,
    /// or `None` if the table has no entry for them.
    fn action(&self, current: StateID, lookahead: &Token) -> Option<Action>;

    /// Return the successor state after reducing to `symbol` in `current`.
    fn goto(&self, current: StateID, symbol: &str) -> Option<StateID>;
}

impl<T: ?Sized> ParseTable for &T
where
    T: ParseTable,
{
    fn action(&self, current: StateID, lookahead: &Token) -> Option<Action> {
        (**self).action(current, lookahead)
    }

    fn goto(&self, current: StateID, symbol: &str) -> Option<StateID> {
        (**self).goto(current, symbol)
    }
}

impl<T: ?Sized> ParseTable for std::rc::Rc<T>
where
    T: ParseTable,
{
    fn action(&self, current: StateID, lookahead: &Token) -> Option<Action> {
        (**self).action(current, lookahead)
    }

    fn goto(&self, current: StateID, symbol: &str) -> Option<StateID> {
        (**self).goto(current, symbol)
    }
}

impl<T: ?Sized> ParseTable for std::sync::Arc<T>
where
    T: ParseTable,
{
    fn action(&self, current: StateID, lookahead: &Token) -> Option<Action> {
        (**self).action(current, lookahead)
    }

    fn goto(&self, current: StateID, symbol: &str) -> Option<StateID> {
        (**self).goto(current, symbol)
    }
}
