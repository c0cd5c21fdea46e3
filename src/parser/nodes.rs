use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

static CONTENT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["div.l-full__main", "main", "article"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});
static ROLE_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h2, h3, h4, h5, h6, p, table, ul, ol, figure, div.c-file").unwrap()
});
static TR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure", "h1", "h2",
    "h3", "h4", "h5", "h6", "hr", "li", "ol", "p", "pre", "section", "table", "tbody", "td", "th",
    "thead", "tr", "ul",
];

/// A detail-page element reduced to the role it plays in the document.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Heading(String),
    Paragraph(String),
    Table(Vec<Vec<Cell>>),
    List(Vec<String>),
    Figure(Vec<String>),
    FileDownload(Vec<Anchor>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    pub is_header: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub text: String,
    pub href: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Heading,
    Paragraph,
    Table,
    List,
    Figure,
    FileDownload,
}

impl Role {
    /// Roles whose descendants belong to them and are not visited on their own.
    fn is_container(self) -> bool {
        !matches!(self, Role::Heading | Role::Paragraph)
    }
}

fn role_of(el: &ElementRef) -> Option<Role> {
    let v = el.value();
    match v.name() {
        "h2" | "h3" | "h4" | "h5" | "h6" => Some(Role::Heading),
        "p" => Some(Role::Paragraph),
        "table" => Some(Role::Table),
        "ul" | "ol" => Some(Role::List),
        // CKEditor wraps tables in <figure class="table">; only image figures are figures
        "figure" if el.select(&IMG_SEL).next().is_some() => Some(Role::Figure),
        "div" if v.classes().any(|c| c == "c-file") => Some(Role::FileDownload),
        _ => None,
    }
}

/// Parse a detail page into its ordered role-tagged nodes.
///
/// Only the main content region is walked when one can be found. Elements
/// nested inside a table, list, figure or file container are folded into that
/// container and never emitted twice.
pub fn parse_nodes(html: &str) -> Vec<MarkupNode> {
    let document = Html::parse_document(html);
    let root = CONTENT_SELECTORS
        .iter()
        .find_map(|sel| document.select(sel).next())
        .unwrap_or_else(|| document.root_element());

    let mut nodes = Vec::new();
    for el in root.select(&ROLE_SEL) {
        let Some(role) = role_of(&el) else { continue };
        if inside_container(&el, &root) {
            continue;
        }
        nodes.push(match role {
            Role::Heading => MarkupNode::Heading(elem_text(&el)),
            Role::Paragraph => MarkupNode::Paragraph(elem_text(&el)),
            Role::Table => MarkupNode::Table(table_rows(&el)),
            Role::List => MarkupNode::List(list_items(&el)),
            Role::Figure => MarkupNode::Figure(image_sources(&el)),
            Role::FileDownload => MarkupNode::FileDownload(anchors(&el)),
        });
    }
    nodes
}

fn inside_container(el: &ElementRef, root: &ElementRef) -> bool {
    for ancestor in el.ancestors() {
        if ancestor.id() == root.id() {
            return false;
        }
        if let Some(parent) = ElementRef::wrap(ancestor) {
            if role_of(&parent).is_some_and(Role::is_container) {
                return true;
            }
        }
    }
    false
}

/// Text of an element, with `<br>` and block-level boundaries kept as spaces.
fn elem_text(el: &ElementRef) -> String {
    let mut out = String::new();
    push_text(el, &mut out);
    out
}

fn push_text(el: &ElementRef, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if name == "br" {
                out.push(' ');
                continue;
            }
            let block = BLOCK_ELEMENTS.contains(&name);
            if block {
                out.push(' ');
            }
            push_text(&child_el, out);
            if block {
                out.push(' ');
            }
        }
    }
}

fn table_rows(table: &ElementRef) -> Vec<Vec<Cell>> {
    table
        .select(&TR_SEL)
        .map(|tr| {
            tr.children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "th" | "td"))
                .map(|c| Cell {
                    text: elem_text(&c),
                    is_header: c.value().name() == "th",
                })
                .collect()
        })
        .collect()
}

fn list_items(list: &ElementRef) -> Vec<String> {
    list.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| c.value().name() == "li")
        .map(|li| elem_text(&li))
        .collect()
}

fn image_sources(figure: &ElementRef) -> Vec<String> {
    figure
        .select(&IMG_SEL)
        .filter_map(|img| {
            let v = img.value();
            v.attr("src").or_else(|| v.attr("data-src"))
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn anchors(container: &ElementRef) -> Vec<Anchor> {
    container
        .select(&ANCHOR_SEL)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            Some(Anchor {
                text: elem_text(&a),
                href: href.to_string(),
            })
        })
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_in_document_order() {
        let html = r#"<html><body><main>
            <h2>Summary</h2>
            <p>First.</p>
            <ul><li>one</li><li>two</li></ul>
            <h3>Details</h3>
            <figure><img src="/img/a.png"></figure>
        </main></body></html>"#;
        let nodes = parse_nodes(html);
        assert_eq!(
            nodes,
            vec![
                MarkupNode::Heading("Summary".into()),
                MarkupNode::Paragraph("First.".into()),
                MarkupNode::List(vec!["one".into(), "two".into()]),
                MarkupNode::Heading("Details".into()),
                MarkupNode::Figure(vec!["/img/a.png".into()]),
            ]
        );
    }

    #[test]
    fn content_outside_main_is_ignored() {
        let html = "<body><nav><p>Skip to content</p></nav><main><p>Body</p></main><footer><p>Foot</p></footer></body>";
        assert_eq!(parse_nodes(html), vec![MarkupNode::Paragraph("Body".into())]);
    }

    #[test]
    fn nested_elements_are_not_emitted_twice() {
        let html = r#"<main>
            <table><tr><td><p>cell para</p></td></tr></table>
            <ul><li><p>item para</p><ul><li>inner</li></ul></li></ul>
            <figure><img src="a.png"><figcaption><p>caption</p></figcaption></figure>
        </main>"#;
        let nodes = parse_nodes(html);
        assert_eq!(nodes.len(), 3);
        assert!(matches!(nodes[0], MarkupNode::Table(_)));
        assert!(matches!(&nodes[1], MarkupNode::List(items) if items.len() == 1));
        assert!(matches!(nodes[2], MarkupNode::Figure(_)));
    }

    #[test]
    fn table_cells_keep_header_flag() {
        let html = "<main><table><tr><th>Product</th><th>Version</th></tr><tr><td>X</td><td>1.0</td></tr></table></main>";
        let nodes = parse_nodes(html);
        let MarkupNode::Table(rows) = &nodes[0] else {
            panic!("expected table, got {:?}", nodes);
        };
        assert_eq!(rows.len(), 2);
        assert!(rows[0].iter().all(|c| c.is_header));
        assert!(rows[1].iter().all(|c| !c.is_header));
        assert_eq!(rows[1][1].text, "1.0");
    }

    #[test]
    fn file_container_anchors() {
        let html = r#"<main><div class="c-file"><a href="/sites/default/files/x.json">CSAF file</a></div></main>"#;
        assert_eq!(
            parse_nodes(html),
            vec![MarkupNode::FileDownload(vec![Anchor {
                text: "CSAF file".into(),
                href: "/sites/default/files/x.json".into(),
            }])]
        );
    }

    #[test]
    fn table_inside_figure_wrapper_is_kept() {
        let html = r#"<main><h2>Affected</h2><figure class="table"><table><tr><th>Product</th></tr><tr><td>X</td></tr></table></figure></main>"#;
        let nodes = parse_nodes(html);
        assert_eq!(nodes.len(), 2);
        let MarkupNode::Table(rows) = &nodes[1] else {
            panic!("expected table, got {:?}", nodes);
        };
        assert_eq!(rows[0][0].text, "Product");
        assert_eq!(rows[1][0].text, "X");
    }

    #[test]
    fn imageless_figure_contents_are_emitted() {
        let html = "<main><figure><ul><li>a</li></ul><p>note</p></figure></main>";
        assert_eq!(
            parse_nodes(html),
            vec![MarkupNode::List(vec!["a".into()]), MarkupNode::Paragraph("note".into())]
        );
    }

    #[test]
    fn line_breaks_and_block_children_separate_text() {
        let html = "<main><p>Line one<br>Line two</p>\
            <table><tr><td>1.0<br>2.0</td></tr></table>\
            <ul><li>outer<ul><li>inner</li></ul></li></ul></main>";
        let nodes = parse_nodes(html);
        assert_eq!(nodes[0], MarkupNode::Paragraph("Line one Line two".into()));
        let MarkupNode::Table(rows) = &nodes[1] else {
            panic!("expected table, got {:?}", nodes);
        };
        assert_eq!(rows[0][0].text.split_whitespace().collect::<Vec<_>>(), vec!["1.0", "2.0"]);
        let MarkupNode::List(items) = &nodes[2] else {
            panic!("expected list, got {:?}", nodes);
        };
        assert_eq!(items[0].split_whitespace().collect::<Vec<_>>(), vec!["outer", "inner"]);
    }

    #[test]
    fn inline_markup_does_not_add_spaces() {
        let html = "<main><p><strong>ATTENTION</strong>: remote<em>ly</em></p></main>";
        assert_eq!(parse_nodes(html), vec![MarkupNode::Paragraph("ATTENTION: remotely".into())]);
    }

    #[test]
    fn falls_back_to_whole_document() {
        let nodes = parse_nodes("<html><body><h2>Only</h2></body></html>");
        assert_eq!(nodes, vec![MarkupNode::Heading("Only".into())]);
    }
}
