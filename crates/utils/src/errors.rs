use thiserror::Error;

/// Error type for reading and parsing instruction listings.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("could not read listing '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("listing parse error at line {line}: {msg} ⇒ `{raw}`")]
    Syntax {
        line: usize,
        msg: String,
        raw: String,
    },

    #[error("unknown opcode `{mnemonic}` at line {line}")]
    UnknownOpcode { line: usize, mnemonic: String },

    #[error("label {label} is referenced in method {method} but never placed")]
    UndefinedLabel { method: String, label: String },

    #[error("method {0} is missing its `end` line")]
    UnterminatedMethod(String),

    #[error("listing does not declare a class")]
    MissingClass,
}

impl ParseError {
    /// Shorthand for a syntax error on a given (zero-based) line.
    pub fn syntax(line: usize, msg: impl Into<String>, raw: &str) -> Self {
        Self::Syntax {
            line: line + 1,
            msg: msg.into(),
            raw: raw.to_string(),
        }
    }
}

/// Error type for JVM type descriptor parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("malformed method descriptor `{0}`")]
    Malformed(String),
    #[error("unexpected character '{found}' at offset {offset} in `{descriptor}`")]
    UnexpectedChar {
        descriptor: String,
        offset: usize,
        found: char,
    },
}

/// Error type for loading analysis configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown filter: {0}")]
    UnknownFilter(String),
}
