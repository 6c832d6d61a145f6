//! Terminal symbols and their textual forms.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

/// A terminal occurrence produced by the scanner.
///
/// Tokens of the classes [`Token::IDENTIFIERS`] and [`Token::CONSTANTS`] compare
/// equal regardless of their text, so that a single grammar terminal matches
/// every identifier (resp. constant) lexeme. Any other pair of tokens is equal
/// only when both the class and the text match. The source position never
/// takes part in comparisons.
#[derive(Debug, Clone)]
pub struct Token {
    class: String,
    text: String,
    line: u32,
    column: u32,
}

impl Token {
    pub const IDENTIFIERS: &'static str = "identifiers";
    pub const CONSTANTS: &'static str = "constants";
    pub const ENDS: &'static str = "ends";

    /// Create a token without source position.
    pub fn new(class: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_position(class, text, 0, 0)
    }

    pub fn with_position(
        class: impl Into<String>,
        text: impl Into<String>,
        line: u32,
        column: u32,
    ) -> Self {
        Self {
            class: class.into(),
            text: text.into(),
            line,
            column,
        }
    }

    /// The synthesized end-of-input token, `<ends,#>`.
    pub fn end() -> Self {
        Self::new(Self::ENDS, "#")
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn is_end(&self) -> bool {
        self.class == Self::ENDS && self.text == "#"
    }

    /// Whether the text of this token is ignored by comparisons.
    fn is_text_insensitive(&self) -> bool {
        self.class == Self::IDENTIFIERS || self.class == Self::CONSTANTS
    }

    /// Parse the short form `<class,text>`.
    ///
    /// The class ends at the first comma, so the text itself may contain commas.
    pub fn parse_short(s: &str) -> Result<Self, TokenParseError> {
        let inner = strip_brackets(s)?;
        let (class, text) = inner
            .split_once(',')
            .ok_or_else(|| TokenParseError::new(s, "missing `,' between class and text"))?;
        if class.is_empty() {
            return Err(TokenParseError::new(s, "empty token class"));
        }
        Ok(Self::new(class, text))
    }

    /// Parse the full form `<line, column, class, text>` emitted by the scanner.
    pub fn parse_full(s: &str) -> Result<Self, TokenParseError> {
        let inner = strip_brackets(s)?;
        let mut fields = inner.splitn(4, ", ");
        let (Some(line), Some(column), Some(class), Some(text)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(TokenParseError::new(s, "expected 4 fields"));
        };
        let line = line
            .trim()
            .parse()
            .map_err(|_| TokenParseError::new(s, "invalid line number"))?;
        let column = column
            .trim()
            .parse()
            .map_err(|_| TokenParseError::new(s, "invalid column number"))?;
        if class.is_empty() {
            return Err(TokenParseError::new(s, "empty token class"));
        }
        Ok(Self::with_position(class, text, line, column))
    }
}

fn strip_brackets(s: &str) -> Result<&str, TokenParseError> {
    s.trim()
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .ok_or_else(|| TokenParseError::new(s, "a token must be enclosed by `<' and `>'"))
}

/// Read the scanner output, one token per line in the full form.
///
/// Blank lines are skipped. The end-of-input token is *not* appended.
pub fn load_tokens(source: &str) -> Result<Vec<Token>, TokenParseError> {
    source
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(Token::parse_full)
        .collect()
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        if self.class != other.class {
            return false;
        }
        self.is_text_insensitive() || self.text == other.text
    }
}
impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class.hash(state);
        if !self.is_text_insensitive() {
            self.text.hash(state);
        }
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.class.cmp(&other.class) {
            Ordering::Equal if self.is_text_insensitive() => Ordering::Equal,
            Ordering::Equal => self.text.cmp(&other.text),
            ord => ord,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{},{}>", self.class, self.text)
    }
}

impl FromStr for Token {
    type Err = TokenParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_short(s)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid token `{input}': {reason}")]
pub struct TokenParseError {
    input: String,
    reason: &'static str,
}
impl TokenParseError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_owned(),
            reason,
        }
    }
}
