use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A quote - the star of the show
///
/// `id` is only ever set for records that came from the remote source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    pub text: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl Quote {
    /// A locally created quote
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
            id: None,
        }
    }

    /// A quote that originated from the remote source
    pub fn remote(id: u64, text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
            id: Some(id),
        }
    }

    pub fn is_remote(&self) -> bool {
        self.id.is_some()
    }

    /// De-duplication key for local-origin entries
    pub fn local_key(&self) -> (&str, &str) {
        (&self.text, &self.category)
    }

    /// Same logical entry under the local rule (text + category)
    pub fn same_entry(&self, other: &Quote) -> bool {
        self.local_key() == other.local_key()
    }

    /// The collection's duplicate rule. Remote-origin entries are keyed by
    /// id alone, local ones by text + category among other local entries.
    pub fn duplicates(&self, other: &Quote) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.same_entry(other),
            _ => false,
        }
    }
}

impl std::fmt::Display for Quote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" ({})", self.text, self.category)
    }
}

/// The display pool selector: everything, or one category
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String),
}

/// Sentinel string for "no filter"
pub const ALL_CATEGORIES: &str = "all";

impl CategoryFilter {
    pub fn matches(&self, quote: &Quote) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(category) => quote.category == *category,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CategoryFilter::All => ALL_CATEGORIES,
            CategoryFilter::Category(category) => category,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == ALL_CATEGORIES {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Category(trimmed.to_string()))
        }
    }
}

impl std::fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four quotes a fresh install starts with
pub fn default_quotes() -> Vec<Quote> {
    vec![
        Quote::new(
            "The only way to do great work is to love what you do.",
            "Motivation",
        ),
        Quote::new(
            "Life is what happens when you're busy making other plans.",
            "Life",
        ),
        Quote::new("In the middle of difficulty lies opportunity.", "Inspiration"),
        Quote::new("Simplicity is the ultimate sophistication.", "Wisdom"),
    ]
}
