//! Highlighted snippets: a window of tokens around each query match, with overlapping windows
//! of the same field coalesced.

use crate::extensions::is_wildcard;
use crate::loader::NewsItem;
use crate::query::Query;
use crate::tokenizer::tokenize;
use crate::Field;
use std::collections::BTreeMap;

/// Tokens shown on each side of a match.
pub const WINDOW_RADIUS: usize = 6;

const ELLIPSIS: &str = "...";

/// Inclusive token range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn new(start: usize, end: usize) -> Self { Self { start, end } }

    /// Window around a match of `len` tokens at `offset`, clipped to a field of `field_len` tokens.
    pub fn around(offset: usize, len: usize, field_len: usize) -> Self {
        let last = (offset + len.max(1) - 1 + WINDOW_RADIUS).min(field_len.saturating_sub(1));
        Self { start: offset.saturating_sub(WINDOW_RADIUS), end: last }
    }

    /// Union of `self` and a window starting no earlier, if they share at least one token.
    pub fn merge(self, next: Window) -> Option<Window> {
        if self.end >= next.start {
            Some(Window { start: self.start, end: self.end.max(next.end) })
        } else {
            None
        }
    }
}

/// Sort by left bound and merge every run of overlapping windows.
pub fn coalesce(mut windows: Vec<Window>) -> Vec<Window> {
    windows.sort();
    let mut out: Vec<Window> = Vec::with_capacity(windows.len());
    for w in windows {
        if let Some(last) = out.last_mut() {
            if let Some(merged) = last.merge(w) {
                *last = merged;
                continue;
            }
        }
        out.push(w);
    }
    out
}

/// The rendering snippets work on: tokens for tokenized fields, the literal value otherwise.
pub fn field_tokens(item: &NewsItem, field: Field) -> Vec<String> {
    let value = item.field(field);
    if field.is_tokenized() {
        tokenize(value)
    } else if value.is_empty() {
        Vec::new()
    } else {
        vec![value.to_string()]
    }
}

/// Offset of the first exact occurrence of `terms` as a consecutive run.
pub fn locate(tokens: &[String], terms: &[String]) -> Option<usize> {
    if terms.is_empty() || terms.len() > tokens.len() {
        return None;
    }
    tokens.windows(terms.len()).position(|w| w == terms)
}

fn leaf_terms(leaf: &Query) -> Option<(Field, Vec<String>)> {
    match leaf {
        Query::Term { field, value } if is_wildcard(value) => {
            tracing::trace!(%field, %value, "wildcard leaves are not highlighted");
            None
        }
        Query::Term { field, value } | Query::Phrase { field, value } if field.is_tokenized() => {
            Some((*field, tokenize(value)))
        }
        Query::Term { field, value } => Some((*field, vec![value.clone()])),
        Query::Phrase { field, value } => Some((*field, value.split_whitespace().map(str::to_string).collect())),
        _ => None,
    }
}

/// Windows per field for every leaf of `query` found in `item`. Leaves without an occurrence
/// (negated terms, the losing side of an `or`) contribute nothing.
pub fn windows(item: &NewsItem, query: &Query) -> BTreeMap<Field, (Vec<String>, Vec<Window>)> {
    let mut fields: BTreeMap<Field, (Vec<String>, Vec<Window>)> = BTreeMap::new();
    for leaf in query.leaves() {
        let Some((field, terms)) = leaf_terms(leaf) else { continue };
        let (tokens, found) = fields.entry(field).or_insert_with(|| (field_tokens(item, field), Vec::new()));
        if let Some(offset) = locate(tokens, &terms) {
            found.push(Window::around(offset, terms.len(), tokens.len()));
        }
    }
    for (_, found) in fields.values_mut() {
        *found = coalesce(std::mem::take(found));
    }
    fields
}

/// Render the snippet of `item` for `query`: fields in schema order, each merged window as its
/// tokens joined by spaces, windows separated by an ellipsis. Empty when nothing matched.
pub fn snippet(item: &NewsItem, query: &Query) -> String {
    let pieces: Vec<String> = windows(item, query)
        .values()
        .flat_map(|(tokens, found)| found.iter().map(move |w| tokens[w.start..=w.end].join(" ")))
        .collect();
    if pieces.is_empty() {
        return String::new();
    }
    format!("{ELLIPSIS} {} {ELLIPSIS}", pieces.join(&format!(" {ELLIPSIS} ")))
}
