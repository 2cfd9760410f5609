use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub mod config;
pub mod error;
pub mod extensions;
pub mod index;
pub mod loader;
pub mod persist;
pub mod postings;
pub mod present;
pub mod query;
pub mod search;
pub mod snippet;
pub mod tokenizer;

pub use config::{IndexConfig, LoadPolicy};
pub use error::{Error, Result};
pub use index::{IndexBuilder, InvertedIndex};
pub use loader::{DocumentLoader, JsonLoader, NewsItem};
pub use query::Query;
pub use search::Searcher;

pub type DocId = u32;
pub type NewsId = u32;

/// A named projection of a news item. Every field except `date` is tokenized;
/// dates are indexed as one literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Date,
    Keywords,
    Article,
    Summary,
}

impl Field {
    /// Schema order, also the order snippets are rendered in.
    pub const ALL: [Field; 5] = [Field::Title, Field::Date, Field::Keywords, Field::Article, Field::Summary];

    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Date => "date",
            Field::Keywords => "keywords",
            Field::Article => "article",
            Field::Summary => "summary",
        }
    }

    pub fn is_tokenized(self) -> bool { !matches!(self, Field::Date) }
}

impl Default for Field {
    fn default() -> Self { Field::Article }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| s.to_string())
    }
}

/// A source file registered in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocMeta {
    pub path: PathBuf,
}

/// Where a news item lives: its owning document and its 0-based position in that file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsRef {
    pub doc_id: DocId,
    pub position: u32,
}
