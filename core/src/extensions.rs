//! Optional query capabilities. The searcher consults each of them only when one is installed.

use crate::index::InvertedIndex;
use crate::query::Query;
use crate::{Field, NewsId};
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{BTreeMap, HashMap};

/// Maps a term to its canonical (stemmed) form and back to every indexed term sharing it.
pub trait StemIndex: Send + Sync {
    fn canonical(&self, term: &str) -> String;

    /// Indexed terms of `field` whose canonical form is `stem`.
    fn terms(&self, field: Field, stem: &str) -> &[String];
}

/// Resolves a wildcard pattern (`*` = any run, `?` = one character) to indexed terms.
pub trait WildcardIndex: Send + Sync {
    fn expand(&self, field: Field, pattern: &str) -> Vec<String>;
}

/// Reorders a result list. Implementations must return a permutation of `results`.
pub trait Ranker: Send + Sync {
    fn rank(&self, index: &InvertedIndex, results: Vec<NewsId>, query: &Query) -> Vec<NewsId>;
}

pub fn is_wildcard(term: &str) -> bool { term.contains(['*', '?']) }

/// Snowball stems of the vocabulary of every tokenized field.
pub struct SnowballStemIndex {
    stemmer: Stemmer,
    stems: HashMap<Field, HashMap<String, Vec<String>>>,
}

impl SnowballStemIndex {
    /// Spanish stemmer, matching the language of the news corpus.
    pub fn build(index: &InvertedIndex) -> Self { Self::with_algorithm(index, Algorithm::Spanish) }

    pub fn with_algorithm(index: &InvertedIndex, algorithm: Algorithm) -> Self {
        let stemmer = Stemmer::create(algorithm);
        let mut stems: HashMap<Field, HashMap<String, Vec<String>>> = HashMap::new();
        for &field in index.config().fields().iter().filter(|f| f.is_tokenized()) {
            let by_stem = stems.entry(field).or_default();
            for term in index.terms(field) {
                by_stem.entry(stemmer.stem(term).into_owned()).or_default().push(term.to_string());
            }
            by_stem.values_mut().for_each(|terms| terms.sort());
        }
        tracing::debug!(fields = stems.len(), "built stem index");
        Self { stemmer, stems }
    }
}

impl StemIndex for SnowballStemIndex {
    fn canonical(&self, term: &str) -> String { self.stemmer.stem(term).into_owned() }

    fn terms(&self, field: Field, stem: &str) -> &[String] {
        self.stems.get(&field).and_then(|m| m.get(stem)).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Permuterm index: every term `t` is reachable from each rotation of `t$`.
pub struct PermutermIndex {
    rotations: HashMap<Field, BTreeMap<String, String>>,
}

const END: char = '$';

impl PermutermIndex {
    pub fn build(index: &InvertedIndex) -> Self {
        let mut rotations: HashMap<Field, BTreeMap<String, String>> = HashMap::new();
        for &field in index.config().fields() {
            let map = rotations.entry(field).or_default();
            for term in index.terms(field) {
                for rotation in rotations_of(term) {
                    map.insert(rotation, term.to_string());
                }
            }
        }
        tracing::debug!(fields = rotations.len(), "built permuterm index");
        Self { rotations }
    }
}

impl WildcardIndex for PermutermIndex {
    fn expand(&self, field: Field, pattern: &str) -> Vec<String> {
        let Some(map) = self.rotations.get(&field) else { return Vec::new() };
        let key = permuterm_key(pattern);
        let matcher = match glob_regex(pattern) {
            Ok(re) => re,
            Err(err) => {
                tracing::warn!(%pattern, error = %err, "unusable wildcard pattern");
                return Vec::new();
            }
        };
        let mut terms: Vec<String> = map
            .range(key.clone()..)
            .take_while(|(rotation, _)| rotation.starts_with(&key))
            .map(|(_, term)| term)
            .filter(|term| matcher.is_match(term))
            .cloned()
            .collect();
        terms.sort();
        terms.dedup();
        terms
    }
}

fn rotations_of(term: &str) -> Vec<String> {
    let marked = format!("{term}{END}");
    marked
        .char_indices()
        .map(|(i, _)| format!("{}{}", &marked[i..], &marked[..i]))
        .collect()
}

/// Lookup prefix for a pattern: the text after its last wildcard, the end marker, then the text
/// before its first wildcard. Patterns without wildcards look up the exact term.
fn permuterm_key(pattern: &str) -> String {
    let marked = format!("{pattern}{END}");
    let first = marked.find(['*', '?']);
    let last = marked.rfind(['*', '?']);
    match (first, last) {
        (Some(first), Some(last)) => format!("{}{}", &marked[last + 1..], &marked[..first]),
        _ => marked,
    }
}

fn glob_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut re = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    re.push('$');
    Regex::new(&re)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::index::IndexBuilder;
    use crate::loader::NewsItem;

    fn index_of(articles: &[&str]) -> InvertedIndex {
        let mut b = IndexBuilder::new(IndexConfig::default());
        let items: Vec<NewsItem> =
            articles.iter().map(|a| NewsItem { article: a.to_string(), ..Default::default() }).collect();
        b.add_document("a.json", &items);
        b.finish()
    }

    #[test]
    fn rotations_cover_every_cut() {
        assert_eq!(rotations_of("ab"), vec!["ab$", "b$a", "$ab"]);
    }

    #[test]
    fn key_moves_suffix_in_front() {
        assert_eq!(permuterm_key("cas*"), "$cas");
        assert_eq!(permuterm_key("*ción"), "ción$");
        assert_eq!(permuterm_key("c*s?"), "$c");
        assert_eq!(permuterm_key("casa"), "casa$");
    }

    #[test]
    fn expands_prefix_suffix_and_infix_patterns() {
        let index = index_of(&["casa casas caso cosa acción nación"]);
        let pt = PermutermIndex::build(&index);
        assert_eq!(pt.expand(Field::Article, "cas*"), vec!["casa", "casas", "caso"]);
        assert_eq!(pt.expand(Field::Article, "*ción"), vec!["acción", "nación"]);
        assert_eq!(pt.expand(Field::Article, "c?sa"), vec!["casa", "cosa"]);
        assert_eq!(pt.expand(Field::Article, "c*s*"), vec!["casa", "casas", "caso", "cosa"]);
        assert!(pt.expand(Field::Title, "cas*").is_empty());
    }

    #[test]
    fn question_mark_matches_exactly_one_char() {
        let index = index_of(&["casa casas"]);
        let pt = PermutermIndex::build(&index);
        assert_eq!(pt.expand(Field::Article, "cas?"), vec!["casa"]);
    }

    #[test]
    fn stems_group_inflected_forms() {
        let index = index_of(&["gobierno gobiernos", "mercado"]);
        let stems = SnowballStemIndex::build(&index);
        let stem = stems.canonical("gobiernos");
        assert_eq!(stems.terms(Field::Article, &stem), ["gobierno".to_string(), "gobiernos".to_string()]);
        assert!(stems.terms(Field::Title, &stem).is_empty());
    }

    #[test]
    fn wildcard_detection() {
        assert!(is_wildcard("cas*"));
        assert!(is_wildcard("c?sa"));
        assert!(!is_wildcard("casa"));
    }
}
