// SPDX-License-Identifier: MIT
//! Content models for the quotes feed.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One quote card in the feed.
///
/// The id is assigned once and serialized with the quote, so a favorited
/// quote keeps its identity across launches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quote {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub author: String,
}

impl Quote {
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            body: body.into(),
            author: author.into(),
        }
    }
}

/// Built-in deck shown before any remote content loads.
pub fn sample_quotes() -> Vec<Quote> {
    vec![
        Quote::new(
            "Fear Itself",
            "The only thing we have to fear is fear itself.",
            "Franklin D. Roosevelt",
        ),
        Quote::new(
            "Stay Hungry",
            "Stay hungry, stay foolish.",
            "Steve Jobs",
        ),
        Quote::new(
            "The Journey",
            "A journey of a thousand miles begins with a single step.",
            "Lao Tzu",
        ),
        Quote::new(
            "Within You",
            "What lies behind us and what lies before us are tiny matters compared to what lies within us.",
            "Ralph Waldo Emerson",
        ),
    ]
}

// ─── Chapters ─────────────────────────────────────────────────────────────────

/// A chapter of verses with matching explanations, parsed from the bundled
/// content JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: u32,
    pub verses: Vec<String>,
    pub explanations: Vec<String>,
}

impl Chapter {
    pub fn title(&self) -> String {
        format!("Chapter {}", self.id)
    }

    pub fn verse_count(&self) -> usize {
        self.verses.len()
    }
}

/// The full bundled chapter set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterSet {
    pub chapters: Vec<Chapter>,
}

impl ChapterSet {
    /// Parse the bundled content JSON.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("failed to parse chapter content")
    }

    pub fn chapter(&self, id: u32) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }
}
