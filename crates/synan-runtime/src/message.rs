//! Diagnostic messages attached to syntax errors.

use crate::{
    config::MessageConfig,
    token::{Token, TokenParseError},
    types::Map,
};

/// Messages keyed by the offending token.
///
/// Lookups use the relaxed token equality, so a rule for `<identifiers,x>`
/// applies to every identifier.
#[derive(Debug, Clone)]
pub struct Messages {
    default: String,
    rules: Map<Token, String>,
}

impl Messages {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            rules: Map::default(),
        }
    }

    pub fn from_config(config: &MessageConfig) -> Result<Self, TokenParseError> {
        let mut messages = Self::new(config.defaults.clone());
        for rule in &config.messages {
            messages.insert(Token::parse_short(&rule.token)?, rule.message.clone());
        }
        Ok(messages)
    }

    /// Register the message for `token`, replacing any earlier rule for an equal token.
    pub fn insert(&mut self, token: Token, message: impl Into<String>) {
        self.rules.insert(token, message.into());
    }

    pub fn get(&self, token: &Token) -> &str {
        self.rules.get(token).unwrap_or(&self.default)
    }
}
