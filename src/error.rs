use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Problems found while compiling a layout pattern.
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("layout pattern is empty")]
    Empty,
    #[error("unknown conversion '%{token}' in layout pattern")]
    UnknownConversion { token: String },
    #[error("invalid qualifier '{qualifier}' for '%{identifier}': expected a positive integer")]
    BadQualifier { identifier: char, qualifier: String },
    #[error("unsupported date format character '{symbol}' in '{format}'")]
    DateFormat { symbol: char, format: String },
    #[error("unterminated quote in date format '{0}'")]
    UnterminatedQuote(String),
    #[error("layout pattern produced an invalid regex: {0}")]
    Regex(#[from] regex::Error),
}

/// A token was requested from an event the compiled pattern does not match.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("layout pattern does not match event (is the layout pattern right for this log?): {event}")]
pub struct TokenError {
    pub event: String,
}

/// Fatal errors surfaced by the pipeline and the binary.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("failed to read {path}: {source}", path = .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("layout pattern '{layout}' matched no line of the input")]
    LayoutMismatch { layout: String },
    #[error("invalid filter '{spec}': {reason}")]
    InvalidFilter { spec: String, reason: String },
    #[error("analyzer '{analyzer}' requires --{option}")]
    MissingOption {
        analyzer: &'static str,
        option: &'static str,
    },
    #[error("no input files matched {0:?}")]
    NoInput(Vec<String>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
