use crate::{Field, NewsId};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building, persisting or querying an index.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    QuerySyntax(#[from] QuerySyntaxError),

    #[error("phrase query on field '{field}' requires an index built with positional support")]
    PositionalUnavailable { field: Field },

    #[error("wildcard term '{pattern}' requires an index built with permuterm support")]
    WildcardUnavailable { pattern: String },

    #[error("index format version {found} does not match version {expected}; rebuild it")]
    IncompatibleIndex { found: u32, expected: u32 },

    #[error("news item {0} is not in the index")]
    UnknownNews(NewsId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable label for API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Load { .. } => "load_error",
            Error::QuerySyntax(_) => "query_syntax_error",
            Error::PositionalUnavailable { .. } => "positional_unavailable",
            Error::WildcardUnavailable { .. } => "wildcard_unavailable",
            Error::IncompatibleIndex { .. } => "incompatible_index",
            Error::UnknownNews(_) => "unknown_news",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Json(_) => "json_error",
        }
    }

    /// True for errors caused by the query text or the index configuration rather than the
    /// environment.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::QuerySyntax(_) | Error::PositionalUnavailable { .. } | Error::WildcardUnavailable { .. } | Error::UnknownNews(_)
        )
    }
}

/// A malformed query. `position` is a char offset into the query text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} at position {position}")]
pub struct QuerySyntaxError {
    pub kind: SyntaxErrorKind,
    pub position: usize,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    #[error("unterminated phrase quote")]
    UnterminatedQuote,
    #[error("unmatched '('")]
    UnmatchedOpenParen,
    #[error("unmatched ')'")]
    UnmatchedCloseParen,
    #[error("expected a term, phrase or group")]
    ExpectedOperand,
    #[error("expected 'and' or 'or'")]
    ExpectedOperator,
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("malformed term '{0}'")]
    MalformedLeaf(String),
    #[error("groups and negations nested deeper than {0} levels")]
    TooDeep(usize),
}

impl QuerySyntaxError {
    pub fn new(kind: SyntaxErrorKind, position: usize) -> Self { Self { kind, position } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_errors_display_kind_and_position() {
        let err: Error = QuerySyntaxError::new(SyntaxErrorKind::UnmatchedOpenParen, 0).into();
        assert_eq!(err.to_string(), "unmatched '(' at position 0");
        assert_eq!(err.kind(), "query_syntax_error");
        assert!(err.is_client_error());
    }

    #[test]
    fn positional_error_names_field() {
        let err = Error::PositionalUnavailable { field: Field::Title };
        assert!(err.to_string().contains("'title'"));
        assert!(!Error::Io(std::io::Error::other("x")).is_client_error());
    }
}
