use crate::error::{Error, Result};
use crate::index::InvertedIndex;
use crate::loader::{DocumentLoader, NewsItem};
use crate::query::Query;
use crate::snippet::snippet;
use crate::{DocId, NewsId};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Results shown when the caller does not ask for all of them.
pub const SHOW_MAX: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct PresentOptions {
    /// `None` shows every result.
    pub limit: Option<usize>,
    pub snippets: bool,
}

impl Default for PresentOptions {
    fn default() -> Self { Self { limit: Some(SHOW_MAX), snippets: false } }
}

/// One displayed result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hit {
    /// 1-based position in the result list.
    pub rank: usize,
    pub news_id: NewsId,
    pub date: String,
    pub title: String,
    pub keywords: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Maps result ids back to their source records. The index only keeps postings, so items are
/// re-read from their files; each file is loaded at most once per presenter.
pub struct Presenter<'a> {
    index: &'a InvertedIndex,
    loader: &'a dyn DocumentLoader,
    cache: HashMap<DocId, Vec<NewsItem>>,
}

impl<'a> Presenter<'a> {
    pub fn new(index: &'a InvertedIndex, loader: &'a dyn DocumentLoader) -> Self {
        Self { index, loader, cache: HashMap::new() }
    }

    /// The full source record of an item.
    pub fn item(&mut self, news_id: NewsId) -> Result<&NewsItem> {
        let index = self.index;
        let news = index.news_ref(news_id).ok_or(Error::UnknownNews(news_id))?;
        let doc = index.doc(news.doc_id).ok_or(Error::UnknownNews(news_id))?;
        let items = match self.cache.entry(news.doc_id) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(self.loader.load(&doc.path)?),
        };
        items.get(news.position as usize).ok_or_else(|| Error::Load {
            path: doc.path.clone(),
            source: format!("item {} no longer exists; the index is stale", news.position).into(),
        })
    }

    /// Build the displayed hits for `results`, in the given order.
    pub fn present(&mut self, results: &[NewsId], query: Option<&Query>, options: PresentOptions) -> Result<Vec<Hit>> {
        let shown = options.limit.unwrap_or(results.len()).min(results.len());
        let mut hits = Vec::with_capacity(shown);
        for (i, &news_id) in results[..shown].iter().enumerate() {
            let item = self.item(news_id)?;
            let snippet = match query {
                Some(q) if options.snippets => Some(snippet(item, q)),
                _ => None,
            };
            hits.push(Hit {
                rank: i + 1,
                news_id,
                date: item.date.clone(),
                title: item.title.clone(),
                keywords: item.keywords.clone(),
                snippet,
            });
        }
        Ok(hits)
    }
}
