use reqwest::Url;
use tracing::debug;

use super::nodes::{Anchor, Cell, MarkupNode};
use super::normalize::normalize_text;
use crate::model::{ContentBlock, Section, UNTITLED};

const FILE_EXTENSIONS: &[&str] = &["pdf", "json", "xml"];

/// Single-pass builder turning role-tagged nodes into titled sections.
///
/// A heading closes the open section and opens a new one. Paragraphs arriving
/// before any heading open an "Untitled" section; every other block kind is
/// dropped when no section is open.
pub struct DocumentBuilder<'a> {
    base: &'a Url,
    sections: Vec<Section>,
    current: Option<Section>,
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(base: &'a Url) -> Self {
        Self {
            base,
            sections: Vec::new(),
            current: None,
        }
    }

    pub fn push(&mut self, node: &MarkupNode) {
        match node {
            MarkupNode::Heading(text) => self.heading(text),
            MarkupNode::Paragraph(text) => self.paragraph(text),
            MarkupNode::Table(rows) => self.table(rows),
            MarkupNode::List(items) => self.list(items),
            MarkupNode::Figure(sources) => self.figure(sources),
            MarkupNode::FileDownload(anchors) => self.file(anchors),
        }
    }

    /// Flush the trailing section and return everything built so far.
    pub fn finish(mut self) -> Vec<Section> {
        if let Some(section) = self.current.take() {
            self.sections.push(section);
        }
        self.sections
    }

    fn heading(&mut self, text: &str) {
        if let Some(section) = self.current.take() {
            self.sections.push(section);
        }
        self.current = Some(Section::new(normalize_text(text)));
    }

    fn paragraph(&mut self, raw: &str) {
        let text = normalize_text(raw);
        if text.is_empty() {
            return;
        }
        let section = self.current.get_or_insert_with(|| Section::new(UNTITLED));
        if let Some(ContentBlock::Paragraph { text: prev }) = section.blocks.last_mut() {
            prev.push(' ');
            prev.push_str(&text);
        } else {
            section.blocks.push(ContentBlock::Paragraph { text });
        }
    }

    fn table(&mut self, rows: &[Vec<Cell>]) {
        let Some(section) = self.current.as_mut() else {
            debug!("dropping table outside any section");
            return;
        };
        let header: Vec<String> = rows
            .iter()
            .flatten()
            .filter(|c| c.is_header)
            .map(|c| normalize_text(&c.text))
            .collect();
        let rows: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                row.iter()
                    .filter(|c| !c.is_header)
                    .map(|c| normalize_text(&c.text))
                    .collect::<Vec<_>>()
            })
            .filter(|row| !row.is_empty())
            .collect();
        section.blocks.push(ContentBlock::Table { header, rows });
    }

    fn list(&mut self, items: &[String]) {
        let items: Vec<String> = items
            .iter()
            .map(|i| normalize_text(i))
            .filter(|i| !i.is_empty())
            .collect();
        if items.is_empty() {
            return;
        }
        match self.current.as_mut() {
            Some(section) => section.blocks.push(ContentBlock::List { items }),
            None => debug!("dropping list outside any section"),
        }
    }

    fn figure(&mut self, sources: &[String]) {
        let Some(url) = sources.first().and_then(|s| resolve(self.base, s)) else {
            return;
        };
        let Some(section) = self.current.as_mut() else {
            debug!("dropping image outside any section");
            return;
        };
        let position_index = section.blocks.len() + 1;
        section.blocks.push(ContentBlock::Image {
            url: url.to_string(),
            position_index,
        });
    }

    fn file(&mut self, anchors: &[Anchor]) {
        let Some((anchor, url)) = anchors.iter().find_map(|a| {
            let url = resolve(self.base, &a.href)?;
            has_document_extension(&url).then_some((a, url))
        }) else {
            return;
        };
        let Some(section) = self.current.as_mut() else {
            debug!("dropping file outside any section");
            return;
        };
        let position_index = section.blocks.len() + 1;
        section.blocks.push(ContentBlock::File {
            name: normalize_text(&anchor.text),
            url: url.to_string(),
            position_index,
        });
    }
}

/// Build sections from a full node sequence.
pub fn build_sections(nodes: &[MarkupNode], base: &Url) -> Vec<Section> {
    let mut builder = DocumentBuilder::new(base);
    for node in nodes {
        builder.push(node);
    }
    builder.finish()
}

fn resolve(base: &Url, href: &str) -> Option<Url> {
    base.join(href.trim()).ok()
}

fn has_document_extension(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    path.rsplit_once('.')
        .is_some_and(|(_, ext)| FILE_EXTENSIONS.contains(&ext))
}

// ── Tests ──
