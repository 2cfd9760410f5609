use crate::Field;
use serde::{Deserialize, Serialize};

/// What to do when a source file cannot be loaded during `index_dir`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPolicy {
    #[default]
    Abort,
    Skip,
}

/// Index-time switches. Stored alongside the index so queries know what it supports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Index every field instead of the article only.
    pub multifield: bool,
    /// Keep token offsets in postings, enabling phrase queries.
    pub positional: bool,
    /// Build a stem index over the vocabulary.
    pub stemming: bool,
    /// Build a permuterm index for wildcard terms.
    pub permuterm: bool,
    pub on_load_error: LoadPolicy,
}

impl IndexConfig {
    /// Fields that take part in indexing under this configuration.
    pub fn fields(&self) -> &'static [Field] {
        if self.multifield { &Field::ALL } else { &[Field::Article] }
    }
}
