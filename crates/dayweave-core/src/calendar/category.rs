//! Event categories.
//!
//! One closed tag per event instead of a type per kind of activity.
//! Anything that varies by category is answered by a match on the tag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::travel::TransportMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Work,
    Study,
    Sport,
    Leisure,
    Household,
    Meeting,
    /// Protected deep-work block.
    Focus,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Work,
        Category::Study,
        Category::Sport,
        Category::Leisure,
        Category::Household,
        Category::Meeting,
        Category::Focus,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Study => "study",
            Category::Sport => "sport",
            Category::Leisure => "leisure",
            Category::Household => "household",
            Category::Meeting => "meeting",
            Category::Focus => "focus",
            Category::Other => "other",
        }
    }

    /// Whether events of this category consume the daily commitment budget.
    pub fn counts_toward_budget(self) -> bool {
        !matches!(self, Category::Focus)
    }

    /// Transport mode assumed when an event of this category does not name one.
    pub fn default_transport_mode(self) -> Option<TransportMode> {
        match self {
            Category::Sport => Some(TransportMode::Cycling),
            Category::Leisure | Category::Household => Some(TransportMode::Walking),
            Category::Study => Some(TransportMode::Transit),
            Category::Work | Category::Meeting => Some(TransportMode::Driving),
            Category::Focus | Category::Other => None,
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Other
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// Finer-grained kind of event; each one belongs to exactly one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subcategory {
    Shift,
    Lecture,
    Exam,
    Revision,
    Training,
    Match,
    Outing,
    Reading,
    Cleaning,
    Groceries,
    OneOnOne,
    Social,
}

impl Subcategory {
    pub const ALL: [Subcategory; 12] = [
        Subcategory::Shift,
        Subcategory::Lecture,
        Subcategory::Exam,
        Subcategory::Revision,
        Subcategory::Training,
        Subcategory::Match,
        Subcategory::Outing,
        Subcategory::Reading,
        Subcategory::Cleaning,
        Subcategory::Groceries,
        Subcategory::OneOnOne,
        Subcategory::Social,
    ];

    pub fn category(self) -> Category {
        match self {
            Subcategory::Shift => Category::Work,
            Subcategory::Lecture | Subcategory::Exam | Subcategory::Revision => Category::Study,
            Subcategory::Training | Subcategory::Match => Category::Sport,
            Subcategory::Outing | Subcategory::Reading => Category::Leisure,
            Subcategory::Cleaning | Subcategory::Groceries => Category::Household,
            Subcategory::OneOnOne | Subcategory::Social => Category::Meeting,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Subcategory::Shift => "shift",
            Subcategory::Lecture => "lecture",
            Subcategory::Exam => "exam",
            Subcategory::Revision => "revision",
            Subcategory::Training => "training",
            Subcategory::Match => "match",
            Subcategory::Outing => "outing",
            Subcategory::Reading => "reading",
            Subcategory::Cleaning => "cleaning",
            Subcategory::Groceries => "groceries",
            Subcategory::OneOnOne => "one_on_one",
            Subcategory::Social => "social",
        }
    }
}

impl fmt::Display for Subcategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subcategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Subcategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown subcategory: {s}"))
    }
}
