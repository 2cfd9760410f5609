use crate::error::{Error, Result};
use crate::extensions::{is_wildcard, PermutermIndex, Ranker, SnowballStemIndex, StemIndex, WildcardIndex};
use crate::index::InvertedIndex;
use crate::postings::{complement, ids, intersect, positional_intersect, union, Posting};
use crate::query::{self, Operator, Query};
use crate::tokenizer::tokenize;
use crate::{Field, NewsId};

/// Query evaluator over a frozen index, plus whichever optional capabilities are installed.
pub struct Searcher {
    index: InvertedIndex,
    stems: Option<Box<dyn StemIndex>>,
    wildcards: Option<Box<dyn WildcardIndex>>,
    ranker: Option<Box<dyn Ranker>>,
}

impl Searcher {
    /// Wrap an index, building the stem and permuterm indexes its configuration asks for.
    pub fn new(index: InvertedIndex) -> Self {
        let stems: Option<Box<dyn StemIndex>> =
            index.config().stemming.then(|| Box::new(SnowballStemIndex::build(&index)) as Box<dyn StemIndex>);
        let wildcards: Option<Box<dyn WildcardIndex>> =
            index.config().permuterm.then(|| Box::new(PermutermIndex::build(&index)) as Box<dyn WildcardIndex>);
        Self { index, stems, wildcards, ranker: None }
    }

    pub fn with_stem_index(mut self, stems: impl StemIndex + 'static) -> Self {
        self.stems = Some(Box::new(stems));
        self
    }

    /// Resolve terms literally even if the index was built with stemming.
    pub fn without_stemming(mut self) -> Self {
        self.stems = None;
        self
    }

    pub fn with_wildcard_index(mut self, wildcards: impl WildcardIndex + 'static) -> Self {
        self.wildcards = Some(Box::new(wildcards));
        self
    }

    pub fn with_ranker(mut self, ranker: impl Ranker + 'static) -> Self {
        self.ranker = Some(Box::new(ranker));
        self
    }

    pub fn index(&self) -> &InvertedIndex { &self.index }

    pub fn uses_stemming(&self) -> bool { self.stems.is_some() }

    /// Sorted ids of the items matching `query`. Blank queries match nothing; malformed ones are
    /// an error.
    pub fn solve(&self, query: &str) -> Result<Vec<NewsId>> {
        match query::parse(query)? {
            None => Ok(Vec::new()),
            Some(parsed) => {
                let result = self.evaluate(&parsed)?;
                tracing::debug!(query = %parsed, hits = result.len(), "solved query");
                Ok(result)
            }
        }
    }

    pub fn count(&self, query: &str) -> Result<usize> { Ok(self.solve(query)?.len()) }

    /// Apply the installed ranker, if any. Without one, results stay in index order.
    pub fn rank(&self, results: Vec<NewsId>, query: &Query) -> Vec<NewsId> {
        match &self.ranker {
            Some(ranker) => ranker.rank(&self.index, results, query),
            None => results,
        }
    }

    /// Ids matching a parsed query. A phrase anywhere in it fails up front on a non-positional
    /// index, before any postings are merged.
    pub fn evaluate(&self, query: &Query) -> Result<Vec<NewsId>> {
        if !self.index.is_positional() {
            if let Some(field) = query.phrase_field() {
                return Err(Error::PositionalUnavailable { field });
            }
        }
        self.eval(query)
    }

    /// Recursion only descends into groups and negations; `and`/`or` chains fold in a loop.
    fn eval(&self, query: &Query) -> Result<Vec<NewsId>> {
        let (first, rest) = query.chain();
        let mut acc = self.operand(first)?;
        for (op, rhs) in rest {
            let rhs = self.operand(rhs)?;
            acc = match op {
                Operator::And => intersect(&acc, &rhs),
                Operator::Or => union(&acc, &rhs),
            };
        }
        Ok(acc)
    }

    fn operand(&self, query: &Query) -> Result<Vec<NewsId>> {
        match query {
            Query::Term { field, value } => self.term(*field, value),
            Query::Phrase { field, value } => {
                let terms = if field.is_tokenized() {
                    tokenize(value)
                } else {
                    value.split_whitespace().map(str::to_string).collect()
                };
                self.phrase(*field, &terms)
            }
            Query::Not(inner) => Ok(complement(&self.eval(inner)?, self.index.news_count())),
            Query::And(..) | Query::Or(..) => self.eval(query),
        }
    }

    fn term(&self, field: Field, value: &str) -> Result<Vec<NewsId>> {
        if is_wildcard(value) {
            return self.wildcard(field, value);
        }
        if !field.is_tokenized() {
            return Ok(ids(self.index.postings(field, value)));
        }

        let tokens = tokenize(value);
        match tokens.as_slice() {
            [] => Ok(Vec::new()),
            [token] => Ok(self.token(field, token)),
            // A value such as `covid-19` splits into several tokens.
            _ if self.index.is_positional() => self.phrase(field, &tokens),
            _ => Ok(tokens
                .iter()
                .map(|t| self.token(field, t))
                .reduce(|acc, p| intersect(&acc, &p))
                .unwrap_or_default()),
        }
    }

    fn token(&self, field: Field, token: &str) -> Vec<NewsId> {
        match &self.stems {
            Some(stems) => stems
                .terms(field, &stems.canonical(token))
                .iter()
                .fold(ids(self.index.postings(field, token)), |acc, term| union(&acc, &ids(self.index.postings(field, term)))),
            None => ids(self.index.postings(field, token)),
        }
    }

    fn wildcard(&self, field: Field, pattern: &str) -> Result<Vec<NewsId>> {
        let wildcards = self
            .wildcards
            .as_ref()
            .ok_or_else(|| Error::WildcardUnavailable { pattern: pattern.to_string() })?;
        let pattern = if field.is_tokenized() { pattern.to_lowercase() } else { pattern.to_string() };
        Ok(wildcards
            .expand(field, &pattern)
            .iter()
            .fold(Vec::new(), |acc, term| union(&acc, &ids(self.index.postings(field, term)))))
    }

    fn phrase(&self, field: Field, terms: &[String]) -> Result<Vec<NewsId>> {
        if !self.index.is_positional() {
            return Err(Error::PositionalUnavailable { field });
        }
        let lists: Vec<&[Posting]> = terms.iter().map(|t| self.index.postings(field, t)).collect();
        Ok(positional_intersect(&lists))
    }
}
