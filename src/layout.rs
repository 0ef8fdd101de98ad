//! Per-document text and layout, converted from the engine's wire format.

use crate::engine::{LayoutOut, PageOut};
use crate::text::{clean_text, collapse_whitespace};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// One visually distinct run of text on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub page: u32,
    pub font_size: f32,
    pub is_bold: bool,
    pub font_name: String,
    pub bbox: BBox,
    /// Reading-order index within the page.
    pub order: usize,
    pub block: u32,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub number: u32,
    pub width: f32,
    pub height: f32,
    pub text: String,
    pub fragments: Vec<TextFragment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayout {
    pub name: String,
    pub pages: Vec<Page>,
}

impl DocumentLayout {
    pub fn from_engine(name: &str, out: LayoutOut) -> Self {
        let pages = out
            .pages
            .into_iter()
            .map(page_from_engine)
            .collect::<Vec<_>>();
        Self {
            name: name.to_string(),
            pages,
        }
    }

    pub fn fragments(&self) -> impl Iterator<Item = &TextFragment> {
        self.pages.iter().flat_map(|p| p.fragments.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.fragments().next().is_none()
    }

    /// Mode of font sizes weighted by character count. Ties go to the
    /// smaller size.
    pub fn body_size(&self) -> f32 {
        let mut weights: BTreeMap<i32, usize> = BTreeMap::new();
        for f in self.fragments() {
            *weights.entry(size_key(f.font_size)).or_insert(0) += f.text.chars().count();
        }
        weights
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(k, _)| key_size(k))
            .unwrap_or(12.0)
    }

    /// Cleaned page texts in page order.
    pub fn page_texts(&self) -> Vec<(u32, String)> {
        self.pages
            .iter()
            .map(|p| (p.number, clean_text(&p.text)))
            .collect()
    }
}

/// Span text gets the same NFKC and whitespace clean-up as page text so
/// headings can be found again in the page lines.
fn page_from_engine(p: PageOut) -> Page {
    let number = p.page;
    let fragments = p
        .spans
        .into_iter()
        .filter_map(|s| {
            let text = collapse_whitespace(&clean_text(&s.text));
            (!text.is_empty()).then_some((text, s))
        })
        .enumerate()
        .map(|(order, (text, s))| TextFragment {
            is_bold: s.is_bold(),
            text,
            page: number,
            font_size: s.size,
            font_name: s.font,
            bbox: BBox::new(s.bbox[0], s.bbox[1], s.bbox[2], s.bbox[3]),
            order,
            block: s.block,
            line: s.line,
        })
        .collect();
    Page {
        number,
        width: p.width,
        height: p.height,
        text: p.text,
        fragments,
    }
}

/// Font sizes compared at 0.1 pt resolution.
pub fn size_key(size: f32) -> i32 {
    (size * 10.0).round() as i32
}

pub fn key_size(key: i32) -> f32 {
    key as f32 / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SpanOut;

    fn span(text: &str, size: f32) -> SpanOut {
        SpanOut {
            text: text.into(),
            size,
            flags: 0,
            font: "Helvetica".into(),
            bbox: [0.0, 0.0, 10.0, 10.0],
            block: 0,
            line: 0,
        }
    }

    #[test]
    fn body_size_weights_by_characters() {
        let out = LayoutOut {
            ok: true,
            page_count: 1,
            pages: vec![PageOut {
                page: 1,
                width: 600.0,
                height: 800.0,
                text: String::new(),
                spans: vec![
                    span("Big", 20.0),
                    span("Another big", 20.0),
                    span("a long run of ordinary body text", 11.0),
                ],
            }],
            warnings: vec![],
            error: None,
        };
        let doc = DocumentLayout::from_engine("x.pdf", out);
        assert_eq!(doc.body_size(), 11.0);
    }

    #[test]
    fn empty_document_defaults() {
        let doc = DocumentLayout::from_engine("x.pdf", LayoutOut::default());
        assert!(doc.is_empty());
        assert_eq!(doc.body_size(), 12.0);
    }

    #[test]
    fn span_text_is_normalised_like_page_text() {
        let out = LayoutOut {
            ok: true,
            page_count: 1,
            pages: vec![PageOut {
                page: 1,
                width: 600.0,
                height: 800.0,
                text: "Pro\u{FB01}le  Settings".into(),
                spans: vec![span(" Pro\u{FB01}le  Settings ", 16.0), span("  \u{0007} ", 11.0)],
            }],
            warnings: vec![],
            error: None,
        };
        let doc = DocumentLayout::from_engine("x.pdf", out);
        let frags: Vec<_> = doc.fragments().collect();
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].text, "Profile Settings");
        assert_eq!(doc.page_texts()[0].1, frags[0].text);
    }
}
