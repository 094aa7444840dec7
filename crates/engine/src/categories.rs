//! Market categories derived from tag keywords

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Politics,
    Sports,
    Crypto,
    Business,
    Entertainment,
    Science,
    Other,
}

/// Checked in order; the first category with a matching keyword wins
const KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Politics,
        &["politics", "election", "biden", "trump", "congress"],
    ),
    (
        Category::Sports,
        &["sports", "nba", "nfl", "mlb", "soccer", "football"],
    ),
    (
        Category::Crypto,
        &["crypto", "bitcoin", "ethereum", "btc", "eth"],
    ),
    (Category::Business, &["business", "tech", "stocks", "economy"]),
    (
        Category::Entertainment,
        &["entertainment", "celebrity", "movies", "music"],
    ),
    (Category::Science, &["science", "ai", "technology", "space"]),
];

impl Category {
    pub const ALL: [Category; 7] = [
        Self::Politics,
        Self::Sports,
        Self::Crypto,
        Self::Business,
        Self::Entertainment,
        Self::Science,
        Self::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Politics => "Politics",
            Self::Sports => "Sports",
            Self::Crypto => "Crypto",
            Self::Business => "Business",
            Self::Entertainment => "Entertainment",
            Self::Science => "Science",
            Self::Other => "Other",
        }
    }

    /// CSV export file for traders whose main category is this one
    pub fn export_file_name(&self) -> String {
        format!("traders_{}.csv", self.label().to_lowercase())
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Categorize a market from its tags (exact, case-insensitive keyword match)
pub fn categorize_market<S: AsRef<str>>(tags: &[S]) -> Category {
    if tags.is_empty() {
        return Category::Other;
    }

    let lowered: Vec<String> = tags.iter().map(|t| t.as_ref().trim().to_lowercase()).collect();
    KEYWORDS
        .iter()
        .find(|(_, words)| lowered.iter().any(|t| words.contains(&t.as_str())))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}

/// Keyword tokens of a market slug, e.g. `will-trump-win` → `[will, trump, win]`
pub fn slug_tokens(slug: &str) -> impl Iterator<Item = String> + '_ {
    slug.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}
