//! Splits page text into titled sections, guided by the outline when one is
//! available.

use crate::config;
use crate::outline::{HeadingLevel, Outline, OutlineEntry};
use crate::text::{clean_text, collapse_whitespace, paragraphs, truncate_chars};
use tracing::debug;

/// Longest run of text lines a single heading may be wrapped over.
const MAX_HEADING_LINES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub document: String,
    pub page: u32,
    pub title: String,
    pub content: String,
    /// Position within the document, starting at 0.
    pub index: usize,
}

pub struct Segmenter {
    target_chars: usize,
    title_max_chars: usize,
}

impl Segmenter {
    pub fn new(cfg: &config::Segmenter) -> Self {
        Self {
            target_chars: cfg.paragraph_target_chars.max(1),
            title_max_chars: cfg.title_max_chars.max(1),
        }
    }

    pub fn segment(
        &self,
        document: &str,
        pages: &[(u32, String)],
        outline: Option<&Outline>,
    ) -> Vec<Section> {
        let mut out = SectionSink::new(document, self.title_max_chars);
        match outline {
            Some(o) if !o.is_empty() => self.by_headings(&mut out, pages, o),
            _ => self.by_paragraphs(&mut out, pages),
        }
        debug!("{}: {} sections", document, out.sections.len());
        out.sections
    }

    fn by_headings(&self, out: &mut SectionSink, pages: &[(u32, String)], outline: &Outline) {
        let mut cur = HeadingCursor::default();
        let mut last_page = 1;
        // The document title heads the first page's text.
        let title_entry = OutlineEntry {
            level: HeadingLevel::Title,
            text: outline.title.clone(),
            source_text: outline.title.clone(),
            page: 1,
            order: 0,
        };

        for (page, raw) in pages {
            let text = clean_text(raw);
            if text.trim().is_empty() {
                continue;
            }
            last_page = *page;
            let mut heads: Vec<&OutlineEntry> = Vec::new();
            if *page == 1 && !outline.title.is_empty() {
                heads.push(&title_entry);
            }
            heads.extend(outline.on_page(*page));
            let lines: Vec<&str> = text.lines().collect();
            let mut next_head = 0;
            let mut body: Vec<&str> = Vec::new();
            let mut i = 0;

            while i < lines.len() {
                if let Some((k, used)) = find_heading(&lines[i..], &heads[next_head..]) {
                    cur.flush(out, *page, &mut body);
                    cur.start(&heads[next_head + k].text);
                    next_head += k + 1;
                    i += used;
                    continue;
                }
                body.push(lines[i]);
                i += 1;
            }
            cur.flush(out, *page, &mut body);
        }
        cur.finish(out, last_page);
    }

    fn by_paragraphs(&self, out: &mut SectionSink, pages: &[(u32, String)]) {
        for (page, raw) in pages {
            let text = clean_text(raw);
            let mut group = String::new();
            for para in paragraphs(&text) {
                if !group.is_empty() && group.chars().count() >= self.target_chars {
                    let title = first_line(&group);
                    out.push(*page, &title, std::mem::take(&mut group));
                }
                if !group.is_empty() {
                    group.push_str("\n\n");
                }
                group.push_str(para);
            }
            if !group.trim().is_empty() {
                let title = first_line(&group);
                out.push(*page, &title, group);
            }
        }
    }
}

struct SectionSink {
    document: String,
    title_max_chars: usize,
    sections: Vec<Section>,
}

impl SectionSink {
    fn new(document: &str, title_max_chars: usize) -> Self {
        Self {
            document: document.to_string(),
            title_max_chars,
            sections: Vec::new(),
        }
    }

    fn push(&mut self, page: u32, title: &str, content: String) {
        let content = content.trim().to_string();
        if content.is_empty() {
            return;
        }
        self.sections.push(Section {
            document: self.document.clone(),
            page,
            title: truncate_chars(title.trim(), self.title_max_chars),
            content,
            index: self.sections.len(),
        });
    }

    fn append_to_last(&mut self, text: &str) -> bool {
        match self.sections.last_mut() {
            Some(last) => {
                last.content.push('\n');
                last.content.push_str(text);
                true
            }
            None => false,
        }
    }
}

/// Heading in force while walking the pages. A heading that never gets a
/// body is held back and its text leads the next section that has one.
#[derive(Default)]
struct HeadingCursor {
    title: String,
    has_body: bool,
    orphans: Vec<String>,
}

impl HeadingCursor {
    fn start(&mut self, title: &str) {
        self.hold_if_bodiless();
        self.title = title.to_string();
        self.has_body = false;
    }

    fn hold_if_bodiless(&mut self) {
        if !self.title.is_empty() && !self.has_body {
            self.orphans.push(std::mem::take(&mut self.title));
        }
    }

    /// Emits the pending body under the current title.
    fn flush(&mut self, out: &mut SectionSink, page: u32, body: &mut Vec<&str>) {
        let text = body.join("\n");
        body.clear();
        if text.trim().is_empty() {
            return;
        }
        let mut content = String::new();
        for o in self.orphans.drain(..) {
            content.push_str(&o);
            content.push('\n');
        }
        content.push_str(&text);
        let shown = if self.title.is_empty() {
            first_line(&text)
        } else {
            self.title.clone()
        };
        out.push(page, &shown, content);
        self.has_body = true;
    }

    /// Headings still waiting for a body at the end of the document join the
    /// last section, or form one of their own when there is none.
    fn finish(mut self, out: &mut SectionSink, page: u32) {
        self.hold_if_bodiless();
        if self.orphans.is_empty() {
            return;
        }
        let tail = self.orphans.join("\n");
        if !out.append_to_last(&tail) {
            let title = self.orphans[0].clone();
            out.push(page, &title, tail);
        }
    }
}

/// Looks for the earliest remaining heading that starts at `lines[0]`,
/// allowing it to wrap over a few lines. Returns the heading's offset in
/// `heads` and the number of lines it spans.
fn find_heading(lines: &[&str], heads: &[&OutlineEntry]) -> Option<(usize, usize)> {
    if lines.first().is_none_or(|l| l.trim().is_empty()) {
        return None;
    }
    for (k, h) in heads.iter().enumerate() {
        let wanted = [normalize(&h.source_text), normalize(&h.text)];
        let mut joined = String::new();
        for (n, line) in lines.iter().take(MAX_HEADING_LINES).enumerate() {
            if !joined.is_empty() {
                joined.push(' ');
            }
            joined.push_str(&normalize(line));
            if wanted.iter().any(|w| !w.is_empty() && *w == joined) {
                return Some((k, n + 1));
            }
            if !wanted.iter().any(|w| w.starts_with(&joined)) {
                break;
            }
        }
    }
    None
}

fn normalize(s: &str) -> String {
    collapse_whitespace(s).to_lowercase()
}

fn first_line(s: &str) -> String {
    s.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}
