use crate::error::{Error, Result};
use crate::Field;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One retrievable news item as stored in a source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsItem {
    pub title: String,
    pub date: String,
    pub keywords: String,
    pub article: String,
    pub summary: String,
}

impl NewsItem {
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Date => &self.date,
            Field::Keywords => &self.keywords,
            Field::Article => &self.article,
            Field::Summary => &self.summary,
        }
    }
}

/// Reads the ordered items of one source file.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Vec<NewsItem>>;

    /// Whether `index_dir` should pick up this file.
    fn accepts(&self, path: &Path) -> bool;
}

/// Loads `.json` files holding an array of items (a single object counts as one item) and
/// `.jsonl` files holding one item per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLoader;

impl JsonLoader {
    fn load_json(path: &Path) -> std::result::Result<Vec<NewsItem>, Box<dyn std::error::Error + Send + Sync>> {
        let reader = BufReader::new(File::open(path)?);
        let json: serde_json::Value = serde_json::from_reader(reader)?;
        let items = match json {
            serde_json::Value::Array(arr) => arr
                .into_iter()
                .map(serde_json::from_value)
                .collect::<std::result::Result<Vec<NewsItem>, _>>()?,
            serde_json::Value::Object(_) => vec![serde_json::from_value(json)?],
            other => return Err(format!("expected an array of news items, found {}", json_kind(&other)).into()),
        };
        Ok(items)
    }

    fn load_jsonl(path: &Path) -> std::result::Result<Vec<NewsItem>, Box<dyn std::error::Error + Send + Sync>> {
        let reader = BufReader::new(File::open(path)?);
        let mut items = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            items.push(serde_json::from_str(&line)?);
        }
        Ok(items)
    }
}

impl DocumentLoader for JsonLoader {
    fn load(&self, path: &Path) -> Result<Vec<NewsItem>> {
        let loaded = if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            Self::load_jsonl(path)
        } else {
            Self::load_json(path)
        };
        loaded.map_err(|source| Error::Load { path: path.to_path_buf(), source })
    }

    fn accepts(&self, path: &Path) -> bool {
        matches!(path.extension().and_then(|s| s.to_str()), Some("json" | "jsonl"))
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn loads_array_in_file_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("day.json");
        fs::write(
            &path,
            r#"[{"title": "uno", "date": "2015-01-01", "keywords": "k", "article": "a", "summary": "s"},
                {"title": "dos", "article": "b"}]"#,
        )
        .unwrap();
        let items = JsonLoader.load(&path).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].field(Field::Date), "2015-01-01");
        assert_eq!(items[1].title, "dos");
        assert_eq!(items[1].summary, "");
    }

    #[test]
    fn loads_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feed.jsonl");
        fs::write(&path, "{\"title\": \"a\"}\n\n{\"title\": \"b\"}\n").unwrap();
        let items = JsonLoader.load(&path).unwrap();
        assert_eq!(items.iter().map(|i| i.title.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn malformed_source_is_a_load_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "[{\"title\": ").unwrap();
        let err = JsonLoader.load(&path).unwrap_err();
        assert!(matches!(err, Error::Load { .. }));

        fs::write(&path, "42").unwrap();
        let err = JsonLoader.load(&path).unwrap_err();
        assert!(err.to_string().contains("a number"));
    }

    #[test]
    fn accepts_only_json_extensions() {
        assert!(JsonLoader.accepts(Path::new("a/b.json")));
        assert!(JsonLoader.accepts(Path::new("b.jsonl")));
        assert!(!JsonLoader.accepts(Path::new("notes.txt")));
    }
}
