use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const UNTITLED: &str = "Untitled";

/// One entry of the advisory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorySummary {
    pub title: String,
    pub publication_date: NaiveDate,
    pub alert_code: String,
    pub detail_url: String,
}

/// A summary plus the structured content of its detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryRecord {
    #[serde(flatten)]
    pub summary: AdvisorySummary,
    pub sections: Vec<Section>,
}

impl AdvisoryRecord {
    pub fn new(summary: AdvisorySummary, sections: Vec<Section>) -> Self {
        Self { summary, sections }
    }

    pub fn block_count(&self) -> usize {
        self.sections.iter().map(|s| s.blocks.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub blocks: Vec<ContentBlock>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Paragraph {
        text: String,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    List {
        items: Vec<String>,
    },
    Image {
        url: String,
        position_index: usize,
    },
    File {
        name: String,
        url: String,
        position_index: usize,
    },
}

// ── Tests ──
