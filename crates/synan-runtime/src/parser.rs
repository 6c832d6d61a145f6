//! Parser.

use crate::{
    definition::ParseTable,
    grammar::{Grammar, Symbol},
    message::Messages,
    table::{Action, StateID},
    token::Token,
};
use std::{fmt, mem};

/// A syntax error found during the analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub token: Token,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error at {}:{} `{}`: {}",
            self.token.line(),
            self.token.column(),
            self.token.text(),
            self.message
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParserState {
    Running,
    /// The accept action has been taken.
    Accepted,
    /// A reduction had no goto target; the rest of the input is ignored.
    RecoveryFatal,
    /// The input has been exhausted without reaching the accept action.
    Finished,
}

/// The shift-reduce parser driven based on the generated parse table.
///
/// An instance can be reused for any number of inputs, since every call to
/// [`Parser::analysis`] starts from a fresh configuration.
#[derive(Debug)]
pub struct Parser<'a, TDef>
where
    TDef: ParseTable,
{
    definition: TDef,
    grammar: &'a Grammar,
    messages: &'a Messages,
    state_stack: Vec<StateID>,
    symbol_stack: Vec<Symbol>,
    parser_state: ParserState,
    cursor: usize,
    errors: Vec<SyntaxError>,
}

impl<'a, TDef> Parser<'a, TDef>
where
    TDef: ParseTable,
{
    /// Create an instance of `Parser` using the specified parse table.
    pub fn new(definition: TDef, grammar: &'a Grammar, messages: &'a Messages) -> Self {
        Self {
            definition,
            grammar,
            messages,
            state_stack: vec![StateID::START],
            symbol_stack: vec![Symbol::T(Token::end())],
            parser_state: ParserState::Running,
            cursor: 0,
            errors: vec![],
        }
    }

    /// Run the analysis over the scanner output and return the syntax errors
    /// in the order they were found.
    ///
    /// The end-of-input token is appended to `tokens` internally.
    pub fn analysis(&mut self, tokens: &[Token]) -> Vec<SyntaxError> {
        let span = tracing::debug_span!("analysis", tokens = tokens.len());
        let _entered = span.enter();

        let mut input = Vec::with_capacity(tokens.len() + 1);
        input.extend_from_slice(tokens);
        input.push(Token::end());

        self.state_stack.clear();
        self.state_stack.push(StateID::START);
        self.symbol_stack.clear();
        self.symbol_stack.push(Symbol::T(Token::end()));
        self.parser_state = ParserState::Running;
        self.cursor = 0;
        self.errors.clear();

        while self.parser_state == ParserState::Running {
            if self.cursor >= input.len() {
                self.parser_state = ParserState::Finished;
                break;
            }
            self.step(&input);
        }

        tracing::debug!(
            "analysis ended in {:?} with {} error(s)",
            self.parser_state,
            self.errors.len()
        );
        mem::take(&mut self.errors)
    }

    /// The state in which the last analysis ended.
    pub fn state(&self) -> ParserState {
        self.parser_state
    }

    /// The symbols on the stack, bottom first.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbol_stack[..]
    }

    /// The position of the cursor in the last input.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn step(&mut self, input: &[Token]) {
        let current = self.current_state();
        let lookahead = &input[self.cursor];

        match self.definition.action(current, lookahead) {
            None => {
                tracing::trace!("no action for {} in {:?}", lookahead, current);
                self.report(lookahead);

                // skip tokens until the current state accepts one.
                self.cursor += 1;
                while self.cursor < input.len()
                    && self
                        .definition
                        .action(current, &input[self.cursor])
                        .is_none()
                {
                    self.cursor += 1;
                }
            }

            Some(Action::Accept) => {
                tracing::trace!("accept");
                self.parser_state = ParserState::Accepted;
            }

            Some(Action::Shift(next)) => {
                tracing::trace!("shift {} => {:?}", lookahead, next);
                self.symbol_stack.push(Symbol::T(lookahead.clone()));
                self.state_stack.push(next);
                self.cursor += 1;
            }

            Some(Action::Reduce(id)) => {
                let grammar = self.grammar;
                if usize::from(id.into_raw()) >= grammar.len() {
                    tracing::trace!("reduce to unknown production {}", id);
                    self.report(lookahead);
                    self.parser_state = ParserState::RecoveryFatal;
                    return;
                }
                let production = grammar.production(id);
                let n = production.right().len();
                tracing::trace!("reduce {}", grammar.display_production(id));

                // the bottom entries must survive any reduction.
                if n >= self.state_stack.len() {
                    self.report(lookahead);
                    self.parser_state = ParserState::RecoveryFatal;
                    return;
                }
                self.state_stack.truncate(self.state_stack.len() - n);
                self.symbol_stack
                    .truncate(self.symbol_stack.len().saturating_sub(n));

                let current = self.current_state();
                match self.definition.goto(current, production.left()) {
                    Some(next) => {
                        self.state_stack.push(next);
                        self.symbol_stack
                            .push(Symbol::N(production.left().to_owned()));
                    }
                    None => {
                        tracing::trace!("no goto for {} in {:?}", production.left(), current);
                        self.report(lookahead);
                        self.parser_state = ParserState::RecoveryFatal;
                    }
                }
            }
        }
    }

    fn current_state(&self) -> StateID {
        self.state_stack.last().copied().unwrap_or(StateID::START)
    }

    fn report(&mut self, token: &Token) {
        let message = self.messages.get(token).to_owned();
        tracing::debug!(
            "syntax error at {}:{} {}: {}",
            token.line(),
            token.column(),
            token,
            message
        );
        self.errors.push(SyntaxError {
            token: token.clone(),
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grammar::ProductionID, table::ParseTables};

    fn keyword(text: &str) -> Token {
        Token::new("keywords", text)
    }

    // S' -> S ; S -> a
    fn single_token_grammar() -> Grammar {
        Grammar::from_formulas(["S' -> S", "S -> <keywords,a>"]).unwrap()
    }

    fn single_token_tables(with_goto: bool) -> ParseTables {
        let mut tables = ParseTables::default();
        tables.actions.insert(
            StateID::from_raw(0),
            keyword("a"),
            Action::Shift(StateID::from_raw(2)),
        );
        tables
            .actions
            .insert(StateID::from_raw(1), Token::end(), Action::Accept);
        tables.actions.insert(
            StateID::from_raw(2),
            Token::end(),
            Action::Reduce(ProductionID::from_raw(1)),
        );
        if with_goto {
            tables
                .gotos
                .insert(StateID::from_raw(0), "S".into(), StateID::from_raw(1));
        }
        tables
    }

    #[test]
    fn accept_valid_input() {
        let grammar = single_token_grammar();
        let messages = Messages::new("unexpected token");
        let tables = single_token_tables(true);
        let mut parser = Parser::new(&tables, &grammar, &messages);

        let errors = parser.analysis(&[keyword("a")]);
        assert!(errors.is_empty());
        assert_eq!(parser.state(), ParserState::Accepted);
        assert_eq!(parser.cursor(), 1);
    }

    #[test]
    fn missing_goto_is_fatal() {
        let grammar = single_token_grammar();
        let messages = Messages::new("unexpected token");
        let tables = single_token_tables(false);
        let mut parser = Parser::new(&tables, &grammar, &messages);

        let errors = parser.analysis(&[keyword("a"), keyword("b"), keyword("c")]);
        assert_eq!(parser.state(), ParserState::RecoveryFatal);
        // the first error is the stray `b', then the goto miss stops everything.
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].token, keyword("b"));
        assert!(errors[1].token.is_end());
    }

    #[test]
    fn skipped_input_runs_out() {
        let grammar = single_token_grammar();
        let mut messages = Messages::new("unexpected token");
        messages.insert(keyword("b"), "`b' is not allowed here");
        let tables = single_token_tables(true);
        let mut parser = Parser::new(&tables, &grammar, &messages);

        let errors = parser.analysis(&[
            Token::with_position("keywords", "b", 3, 5),
            keyword("b"),
        ]);
        assert_eq!(parser.state(), ParserState::Finished);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "Error at 3:5 `b`: `b' is not allowed here"
        );
    }

    #[test]
    fn symbols_after_reduction() {
        // S' -> S ; S -> S a | a
        let grammar =
            Grammar::from_formulas(["S' -> S", "S -> S <keywords,a>", "S -> <keywords,a>"])
                .unwrap();
        let mut tables = ParseTables::default();
        let s = StateID::from_raw;
        let r = |raw| Action::Reduce(ProductionID::from_raw(raw));
        tables.actions.insert(s(0), keyword("a"), Action::Shift(s(2)));
        tables.actions.insert(s(1), keyword("a"), Action::Shift(s(3)));
        tables.actions.insert(s(1), Token::end(), Action::Accept);
        tables.actions.insert(s(2), keyword("a"), r(2));
        tables.actions.insert(s(2), Token::end(), r(2));
        tables.actions.insert(s(3), keyword("a"), r(1));
        tables.actions.insert(s(3), Token::end(), r(1));
        tables.gotos.insert(s(0), "S".into(), s(1));

        let messages = Messages::new("unexpected token");
        let mut parser = Parser::new(&tables, &grammar, &messages);
        let errors = parser.analysis(&[keyword("a"), keyword("a"), keyword("a")]);
        assert!(errors.is_empty());
        assert_eq!(parser.state(), ParserState::Accepted);
        assert_eq!(
            parser.symbols(),
            [Symbol::T(Token::end()), Symbol::N("S".into())]
        );
    }

    #[test]
    fn reduce_to_unknown_production_is_fatal() {
        let grammar = single_token_grammar();
        let messages = Messages::new("unexpected token");
        let mut tables = ParseTables::default();
        tables.actions.insert(
            StateID::from_raw(0),
            keyword("a"),
            Action::Reduce(ProductionID::from_raw(2)),
        );
        let mut parser = Parser::new(&tables, &grammar, &messages);

        let errors = parser.analysis(&[keyword("a")]);
        assert_eq!(parser.state(), ParserState::RecoveryFatal);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].token, keyword("a"));
    }

    #[test]
    fn reuse_across_inputs() {
        let grammar = single_token_grammar();
        let messages = Messages::new("unexpected token");
        let tables = single_token_tables(true);
        let mut parser = Parser::new(std::sync::Arc::new(tables), &grammar, &messages);

        assert_eq!(parser.analysis(&[keyword("b")]).len(), 1);
        assert!(parser.analysis(&[keyword("a")]).is_empty());
        assert_eq!(parser.state(), ParserState::Accepted);
        assert_eq!(parser.analysis(&[keyword("b")]).len(), 1);
    }
}
