use crate::config::{IndexConfig, LoadPolicy};
use crate::error::{Error, Result};
use crate::loader::{DocumentLoader, NewsItem};
use crate::postings::Posting;
use crate::tokenizer::tokenize;
use crate::{DocId, DocMeta, Field, NewsId, NewsRef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Dictionary entry for one term of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    /// Every indexed occurrence of the term, across all items.
    pub occurrences: u32,
    /// Sorted by news id, one posting per item.
    pub postings: Vec<Posting>,
}

impl TermEntry {
    pub fn doc_frequency(&self) -> usize { self.postings.len() }
}

pub type FieldIndex = HashMap<String, TermEntry>;

/// Read-only inverted index produced by [`IndexBuilder::finish`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InvertedIndex {
    config: IndexConfig,
    fields: HashMap<Field, FieldIndex>,
    docs: Vec<DocMeta>,
    news: Vec<NewsRef>,
}

impl InvertedIndex {
    pub fn config(&self) -> &IndexConfig { &self.config }

    pub fn is_positional(&self) -> bool { self.config.positional }

    /// Total number of news items; the exclusive upper bound of every id.
    pub fn news_count(&self) -> NewsId { self.news.len() as NewsId }

    pub fn doc_count(&self) -> usize { self.docs.len() }

    pub fn entry(&self, field: Field, term: &str) -> Option<&TermEntry> {
        self.fields.get(&field)?.get(term)
    }

    /// Postings of `term` in `field`; empty if the term (or the field) was never indexed.
    pub fn postings(&self, field: Field, term: &str) -> &[Posting] {
        self.entry(field, term).map(|e| e.postings.as_slice()).unwrap_or(&[])
    }

    /// Vocabulary of a field, in no particular order.
    pub fn terms(&self, field: Field) -> impl Iterator<Item = &str> {
        self.fields.get(&field).into_iter().flat_map(|f| f.keys().map(String::as_str))
    }

    pub fn vocabulary_size(&self, field: Field) -> usize {
        self.fields.get(&field).map(HashMap::len).unwrap_or(0)
    }

    pub fn news_ref(&self, news_id: NewsId) -> Option<NewsRef> { self.news.get(news_id as usize).copied() }

    pub fn doc(&self, doc_id: DocId) -> Option<&DocMeta> { self.docs.get(doc_id as usize) }

    /// Source file and in-file position of an item.
    pub fn locate(&self, news_id: NewsId) -> Result<(&Path, u32)> {
        let news = self.news_ref(news_id).ok_or(Error::UnknownNews(news_id))?;
        let doc = self.doc(news.doc_id).ok_or(Error::UnknownNews(news_id))?;
        Ok((doc.path.as_path(), news.position))
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            // Dates are only indexed in multifield mode, so this is 0 for article-only indexes.
            days: self.vocabulary_size(Field::Date),
            news: self.news.len(),
            docs: self.docs.len(),
            vocabulary: self
                .config
                .fields()
                .iter()
                .map(|&f| (f, self.vocabulary_size(f)))
                .collect(),
            positional: self.config.positional,
            stemming: self.config.stemming,
            permuterm: self.config.permuterm,
        }
    }
}

/// Summary counters of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub days: usize,
    pub news: usize,
    pub docs: usize,
    pub vocabulary: Vec<(Field, usize)>,
    pub positional: bool,
    pub stemming: bool,
    pub permuterm: bool,
}

/// Single writer of an [`InvertedIndex`].
///
/// Ids are handed out in the order documents and items are fed in, and postings are appended in
/// that same order, which keeps every postings list sorted without any insertion in the middle.
/// Feed documents from one thread, in a stable order, then call [`IndexBuilder::finish`].
pub struct IndexBuilder {
    index: InvertedIndex,
    next_doc_id: DocId,
    next_news_id: NewsId,
}

impl IndexBuilder {
    pub fn new(config: IndexConfig) -> Self {
        let fields = config.fields().iter().map(|&f| (f, FieldIndex::new())).collect();
        Self {
            index: InvertedIndex { config, fields, docs: Vec::new(), news: Vec::new() },
            next_doc_id: 0,
            next_news_id: 0,
        }
    }

    pub fn config(&self) -> &IndexConfig { &self.index.config }

    /// Walk `root` recursively in file-name order and index every file the loader accepts.
    /// `root` may also be a single file.
    pub fn index_dir(&mut self, root: &Path, loader: &dyn DocumentLoader) -> Result<()> {
        let mut files: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Load { path: root.to_path_buf(), source: Box::new(e) })?;
            let p = entry.path();
            if p.is_file() && loader.accepts(p) {
                files.push(p.to_path_buf());
            }
        }

        for file in files {
            match self.index_file(&file, loader) {
                Ok(_) => {}
                Err(err @ Error::Load { .. }) if self.index.config.on_load_error == LoadPolicy::Skip => {
                    tracing::warn!(error = %err, "skipping unreadable source");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Load one file and index all of its items as a new document.
    pub fn index_file(&mut self, path: &Path, loader: &dyn DocumentLoader) -> Result<DocId> {
        let items = loader.load(path)?;
        let doc_id = self.add_document(path, &items);
        tracing::debug!(path = %path.display(), doc_id, items = items.len(), "indexed file");
        Ok(doc_id)
    }

    /// Register a document and index its items in file order.
    pub fn add_document(&mut self, location: impl Into<PathBuf>, items: &[NewsItem]) -> DocId {
        let doc_id = self.next_doc_id;
        self.next_doc_id += 1;
        self.index.docs.push(DocMeta { path: location.into() });
        for (position, item) in items.iter().enumerate() {
            self.index_item(doc_id, position as u32, item);
        }
        doc_id
    }

    /// Index one item of document `doc_id` and return its id.
    pub fn index_item(&mut self, doc_id: DocId, position: u32, item: &NewsItem) -> NewsId {
        let news_id = self.next_news_id;
        self.next_news_id += 1;
        let positional = self.index.config.positional;

        for &field in self.index.config.fields() {
            let Some(dict) = self.index.fields.get_mut(&field) else { continue };
            let value = item.field(field);
            if field.is_tokenized() {
                for (offset, token) in tokenize(value).into_iter().enumerate() {
                    record(dict, token, news_id, offset as u32, positional);
                }
            } else if !value.is_empty() {
                record(dict, value.to_string(), news_id, 0, positional);
            }
        }

        self.index.news.push(NewsRef { doc_id, position });
        news_id
    }

    /// Freeze the index. No more items can be added afterwards.
    pub fn finish(self) -> InvertedIndex {
        tracing::info!(
            docs = self.index.docs.len(),
            news = self.index.news.len(),
            terms = self.index.fields.values().map(HashMap::len).sum::<usize>(),
            "index build complete"
        );
        self.index
    }
}

fn record(dict: &mut FieldIndex, term: String, news_id: NewsId, offset: u32, positional: bool) {
    let entry = dict.entry(term).or_default();
    entry.occurrences += 1;
    match entry.postings.last_mut() {
        Some(last) if last.news_id == news_id => {
            if positional { last.positions.push(offset); }
        }
        _ => {
            let positions = if positional { vec![offset] } else { Vec::new() };
            entry.postings.push(Posting { news_id, positions });
        }
    }
}
