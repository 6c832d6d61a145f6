//! Runtime support for `synan`: the grammar model, parse tables and the
//! recovering shift-reduce parser.

pub mod config;
pub mod definition;
pub mod grammar;
pub mod message;
pub mod parser;
pub mod table;
pub mod token;
pub mod types;
pub mod util;

pub use crate::{
    definition::ParseTable,
    grammar::{Grammar, ProductionID, Symbol},
    message::Messages,
    parser::{Parser, ParserState, SyntaxError},
    table::{Action, ParseTables, StateID},
    token::Token,
};
