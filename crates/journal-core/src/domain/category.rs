use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed set of post categories.
///
/// `Other` is the sentinel that requires a free-text sub-category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Tech,
    Programming,
    Science,
    Health,
    Lifestyle,
    Travel,
    Food,
    Education,
    Finance,
    Entertainment,
    Sports,
    Other,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Tech,
        Category::Programming,
        Category::Science,
        Category::Health,
        Category::Lifestyle,
        Category::Travel,
        Category::Food,
        Category::Education,
        Category::Finance,
        Category::Entertainment,
        Category::Sports,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tech => "TECH",
            Category::Programming => "PROGRAMMING",
            Category::Science => "SCIENCE",
            Category::Health => "HEALTH",
            Category::Lifestyle => "LIFESTYLE",
            Category::Travel => "TRAVEL",
            Category::Food => "FOOD",
            Category::Education => "EDUCATION",
            Category::Finance => "FINANCE",
            Category::Entertainment => "ENTERTAINMENT",
            Category::Sports => "SPORTS",
            Category::Other => "OTHER",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}
