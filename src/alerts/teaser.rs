//! Document teasers
//!
//! A teaser is the short summary of a document shown with an alert.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::TeaserConfig;
use crate::documents::lookup_path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teaser {
    pub collection: Option<String>,
    pub date: Option<String>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
}

impl Teaser {
    /// Build a teaser from a document, each field cut to the configured limit
    pub fn from_document(document: &Value, collection: Option<&str>, config: &TeaserConfig) -> Self {
        let field = |name: &str| {
            lookup_path(document, name)
                .and_then(text_of)
                .map(|text| truncate_chars(&text, config.char_limit))
        };

        Self {
            collection: collection.map(str::to_string),
            date: field(&config.date_field),
            author: field(&config.author_field),
            title: field(&config.title_field),
            content: field(&config.content_field),
        }
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Cut a string to at most `limit` characters
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
