pub mod nodes;
pub mod normalize;
pub mod sections;

use reqwest::Url;

use crate::model::Section;

/// Two-pass pipeline: html → role-tagged nodes → sections.
pub fn process_page(html: &str, base: &Url) -> Vec<Section> {
    let nodes = nodes::parse_nodes(html);
    sections::build_sections(&nodes, base)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentBlock, UNTITLED};

    fn fixture_sections() -> Vec<Section> {
        let html = std::fs::read_to_string("tests/fixtures/advisory_detail.html").unwrap();
        process_page(&html, &Url::parse("https://www.cisa.gov").unwrap())
    }

    #[test]
    fn detail_fixture_section_titles() {
        let titles: Vec<_> = fixture_sections().into_iter().map(|s| s.title).collect();
        assert_eq!(
            titles,
            vec![
                UNTITLED,
                "1. EXECUTIVE SUMMARY",
                "2. RISK EVALUATION",
                "3. TECHNICAL DETAILS",
                "4. MITIGATIONS",
            ]
        );
    }

    #[test]
    fn detail_fixture_blocks() {
        let sections = fixture_sections();

        // lead-in paragraph before the first heading
        assert_eq!(
            sections[0].blocks,
            vec![ContentBlock::Paragraph {
                text: "CISA is sharing this advisory on behalf of the vendor. It was coordinated with the \"Example Corp\" PSIRT.".into()
            }]
        );

        let summary = &sections[1];
        assert!(matches!(
            &summary.blocks[0],
            ContentBlock::List { items } if items[1] == "ATTENTION: Exploitable remotely" && items.len() == 3
        ));

        let details = &sections[3];
        let kinds: Vec<_> = details
            .blocks
            .iter()
            .map(|b| match b {
                ContentBlock::Paragraph { .. } => "paragraph",
                ContentBlock::Table { .. } => "table",
                ContentBlock::List { .. } => "list",
                ContentBlock::Image { .. } => "image",
                ContentBlock::File { .. } => "file",
            })
            .collect();
        assert_eq!(kinds, vec!["paragraph", "table", "image", "file"]);
        assert_eq!(
            details.blocks[1],
            ContentBlock::Table {
                header: vec!["Product".into(), "Affected Versions".into()],
                rows: vec![
                    vec!["Controller A".into(), "4.1 and prior".into()],
                    vec!["Controller B".into(), "all versions".into()],
                ],
            }
        );
        assert_eq!(
            details.blocks[2],
            ContentBlock::Image {
                url: "https://www.cisa.gov/sites/default/files/images/topology.png".into(),
                position_index: 3,
            }
        );
        assert_eq!(
            details.blocks[3],
            ContentBlock::File {
                name: "ICSA-23-012-01 CSAF".into(),
                url: "https://www.cisa.gov/sites/default/files/csaf/icsa-23-012-01.json".into(),
                position_index: 4,
            }
        );

        let mitigations = &sections[4];
        assert_eq!(
            mitigations.blocks,
            vec![
                ContentBlock::Paragraph {
                    text: "Vendor recommends users update to version 4.2. Users should also minimize network exposure.".into()
                },
                ContentBlock::List {
                    items: vec!["Locate control system networks behind firewalls.".into(), "Use secure remote access methods.".into()]
                },
            ]
        );
    }

    #[test]
    fn figure_wrapped_table_becomes_table_block() {
        let html = r#"<main><h2>Affected</h2><figure class="table"><table>
            <tr><th>Product</th><th>Versions</th></tr>
            <tr><td>X</td><td>1.0<br>2.0</td></tr>
        </table></figure></main>"#;
        let sections = process_page(html, &Url::parse("https://www.cisa.gov").unwrap());
        assert_eq!(sections.len(), 1);
        assert_eq!(
            sections[0].blocks,
            vec![ContentBlock::Table {
                header: vec!["Product".into(), "Versions".into()],
                rows: vec![vec!["X".into(), "1.0 2.0".into()]],
            }]
        );
    }
}
