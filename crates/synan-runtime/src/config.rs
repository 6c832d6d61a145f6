//! JSON configuration files.
//!
//! ```json
//! { "formulas": ["S' -> S", "S -> <keywords,a> S <keywords,b>", "S ->"] }
//! ```
//!
//! ```json
//! {
//!   "defaults": "unexpected token",
//!   "messages": [{ "token": "<delimiters,;>", "message": "missing expression" }]
//! }
//! ```

use serde::{de::DeserializeOwned, Deserialize};
use std::{fs, io, path::Path};

/// The production list, in the order that fixes production numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct GrammarConfig {
    pub formulas: Vec<String>,
}

impl GrammarConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_json(path.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageConfig {
    /// The message used for tokens without a specific rule.
    pub defaults: String,
    #[serde(default)]
    pub messages: Vec<MessageRule>,
}

impl MessageConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_json(path.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageRule {
    /// A token in the short form `<class,text>`.
    pub token: String,
    pub message: String,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let source = fs::read_to_string(path).map_err(ConfigError::IO)?;
    let config = serde_json::from_str(&source)?;
    tracing::debug!("loaded configuration from {}", path.display());
    Ok(config)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("malformed JSON: {}", _0)]
    Json(#[from] serde_json::Error),
}
