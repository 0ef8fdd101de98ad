use pdfsense::config::Headings;
use pdfsense::layout::{BBox, DocumentLayout, Page, TextFragment};
use pdfsense::outline::{HeadingClassifier, HeadingLevel, Outline};
use pdfsense::report::OutlineReport;
use std::collections::HashSet;

const WIDTH: f32 = 612.0;
const HEIGHT: f32 = 792.0;

struct PageBuilder {
    number: u32,
    fragments: Vec<TextFragment>,
}

impl PageBuilder {
    fn new(number: u32) -> Self {
        Self {
            number,
            fragments: Vec::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn span(&mut self, text: &str, size: f32, bold: bool, x0: f32, y0: f32, block: u32, line: u32) -> &mut Self {
        let width = text.chars().count() as f32 * size * 0.5;
        self.fragments.push(TextFragment {
            text: text.into(),
            page: self.number,
            font_size: size,
            is_bold: bold,
            font_name: if bold { "Helvetica-Bold" } else { "Helvetica" }.into(),
            bbox: BBox::new(x0, y0, x0 + width, y0 + size),
            order: self.fragments.len(),
            block,
            line,
        });
        self
    }

    fn heading(&mut self, text: &str, size: f32, y0: f32, block: u32) -> &mut Self {
        self.span(text, size, true, 72.0, y0, block, 0)
    }

    /// Body paragraph of `n` 11pt lines starting at `y0`, 14pt apart.
    fn body(&mut self, n: u32, y0: f32, block: u32) -> &mut Self {
        for i in 0..n {
            self.span(
                "Plain running prose that keeps going across the whole line",
                11.0,
                false,
                72.0,
                y0 + i as f32 * 14.0,
                block,
                i,
            );
        }
        self
    }

    fn build(&mut self) -> Page {
        Page {
            number: self.number,
            width: WIDTH,
            height: HEIGHT,
            text: String::new(),
            fragments: std::mem::take(&mut self.fragments),
        }
    }
}

fn classify(pages: Vec<Page>) -> Outline {
    classify_with(&Headings::default(), pages)
}

fn classify_with(cfg: &Headings, pages: Vec<Page>) -> Outline {
    let doc = DocumentLayout {
        name: "doc.pdf".into(),
        pages,
    };
    HeadingClassifier::new(cfg).classify(&doc).unwrap()
}

fn entries(o: &Outline) -> Vec<(HeadingLevel, String, u32)> {
    o.entries
        .iter()
        .map(|e| (e.level, e.text.clone(), e.page))
        .collect()
}

#[test]
fn numbered_introduction_over_body_text() {
    let page = PageBuilder::new(1)
        .heading("1. Introduction", 18.0, 72.0, 0)
        .body(5, 110.0, 1)
        .build();
    let outline = classify(vec![page]);

    let json = serde_json::to_value(OutlineReport::from(&outline)).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "title": "",
            "outline": [{"level": "H1", "text": "Introduction", "page": 1}]
        })
    );
}

#[test]
fn split_numbering_prefix_is_merged() {
    let page = PageBuilder::new(1)
        .span("1.", 18.0, true, 72.0, 72.0, 0, 0)
        .span("Introduction", 18.0, true, 96.0, 72.0, 0, 0)
        .body(5, 110.0, 1)
        .build();
    let outline = classify(vec![page]);
    assert_eq!(
        entries(&outline),
        vec![(HeadingLevel::H1, "Introduction".to_string(), 1)]
    );
}

#[test]
fn numbering_depth_overrides_font_size() {
    let page = PageBuilder::new(1)
        .heading("Annual Plan", 24.0, 60.0, 0)
        .heading("1.2.3 Deep Topic", 24.0, 100.0, 1)
        .body(5, 140.0, 2)
        .heading("2. Scope", 12.0, 230.0, 3)
        .body(3, 250.0, 4)
        .build();
    let outline = classify(vec![page]);
    assert_eq!(outline.title, "Annual Plan");
    assert_eq!(
        entries(&outline),
        vec![
            (HeadingLevel::H3, "Deep Topic".to_string(), 1),
            (HeadingLevel::H1, "Scope".to_string(), 1),
        ]
    );
}

fn page_with_table() -> Page {
    let mut b = PageBuilder::new(1);
    b.heading("1. Introduction", 18.0, 72.0, 0).body(3, 110.0, 1);
    let cells = [
        ["1. Total", "2. Net", "3. Gross"],
        ["4. Fees", "5. Taxes", "6. Other"],
        ["7. Costs", "8. Fines", "9. Extra"],
    ];
    for (row, texts) in cells.iter().enumerate() {
        for (col, text) in texts.iter().enumerate() {
            b.span(
                text,
                14.0,
                true,
                72.0 + col as f32 * 130.0,
                200.0 + row as f32 * 20.0,
                2,
                row as u32,
            );
        }
    }
    b.build()
}

#[test]
fn table_cells_never_become_headings() {
    let outline = classify(vec![page_with_table()]);
    assert_eq!(
        entries(&outline),
        vec![(HeadingLevel::H1, "Introduction".to_string(), 1)]
    );
}

#[test]
fn table_cells_would_score_without_suppression() {
    let mut cfg = Headings::default();
    cfg.tables.enabled = false;
    let outline = classify_with(&cfg, vec![page_with_table()]);
    assert!(outline.entries.iter().any(|e| e.text == "Total"));
}

#[test]
fn title_is_not_repeated_and_entries_are_unique() {
    let first = PageBuilder::new(1)
        .heading("Travel Guide", 24.0, 60.0, 0)
        .body(5, 100.0, 1)
        .build();
    let second = PageBuilder::new(2)
        .heading("Travel Guide", 24.0, 60.0, 0)
        .heading("Packing Tips", 16.0, 100.0, 1)
        .body(4, 130.0, 2)
        .heading("Packing Tips", 16.0, 250.0, 3)
        .body(4, 280.0, 4)
        .build();
    let outline = classify(vec![first, second]);

    assert_eq!(outline.title, "Travel Guide");
    assert!(outline.entries.iter().all(|e| e.text != outline.title));
    let mut seen = HashSet::new();
    for e in &outline.entries {
        assert!(seen.insert((e.text.to_lowercase(), e.page)), "duplicate {:?}", e);
    }
    assert_eq!(
        entries(&outline),
        vec![(HeadingLevel::H1, "Packing Tips".to_string(), 2)]
    );
}

#[test]
fn uniform_font_document_uses_weight_spacing_and_keywords() {
    let page = PageBuilder::new(1)
        .body(3, 72.0, 0)
        .span("Background", 11.0, true, 72.0, 140.0, 1, 0)
        .body(4, 165.0, 2)
        .build();
    let outline = classify(vec![page]);
    assert_eq!(outline.title, "");
    assert_eq!(
        entries(&outline),
        vec![(HeadingLevel::H2, "Background".to_string(), 1)]
    );
}

#[test]
fn empty_document_gives_empty_outline() {
    let outline = classify(vec![PageBuilder::new(1).build()]);
    assert_eq!(outline, Outline::default());
}

#[test]
fn entries_are_in_page_then_position_order() {
    let one = PageBuilder::new(1)
        .heading("1. Getting Started", 16.0, 80.0, 0)
        .body(4, 110.0, 1)
        .heading("2. Daily Routine", 16.0, 200.0, 2)
        .body(4, 230.0, 3)
        .build();
    let two = PageBuilder::new(2)
        .heading("3. Wrapping Up", 16.0, 80.0, 0)
        .body(4, 110.0, 1)
        .build();
    let outline = classify(vec![one, two]);
    let pos: Vec<_> = outline.entries.iter().map(|e| (e.page, e.order)).collect();
    let mut sorted = pos.clone();
    sorted.sort();
    assert_eq!(pos, sorted);
    assert_eq!(outline.entries.len(), 3);
}
