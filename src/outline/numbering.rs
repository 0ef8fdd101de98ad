//! Heading numbering prefixes and prefix/label merging.

use crate::layout::TextFragment;
use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Numbering {
    /// 1 for `1.`, 2 for `1.2`, 3 for `1.2.3` and deeper.
    pub depth: u8,
    /// Byte length of the prefix including trailing whitespace.
    pub prefix_len: usize,
}

struct Matcher {
    re: Regex,
    depth: fn(&regex::Captures) -> u8,
}

fn dotted_depth(caps: &regex::Captures) -> u8 {
    caps.get(1)
        .map(|m| m.as_str().split('.').filter(|p| !p.is_empty()).count())
        .unwrap_or(1)
        .min(u8::MAX as usize) as u8
}

// Order matters: the first match wins.
static MATCHERS: LazyLock<Vec<Matcher>> = LazyLock::new(|| {
    let m = |pattern: &str, depth: fn(&regex::Captures) -> u8| Matcher {
        re: Regex::new(pattern).expect("valid numbering regex"),
        depth,
    };
    vec![
        // 1.2 / 1.2.3 with an optional trailing dot
        m(r"^(\d{1,3}(?:\.\d{1,3})+)\.?\s+\S", dotted_depth),
        // 1.
        m(r"^(\d{1,3})\.\s+\S", |_| 1),
        // 1 Introduction
        m(r"^(\d{1,2})\s+[A-Za-z]", |_| 1),
        // (1) / (1.2)
        m(r"^\((\d{1,3}(?:\.\d{1,3})*)\)\s+\S", |c| {
            (dotted_depth(c) + 1).min(3)
        }),
        // (A) / (a)
        m(r"^\(([A-Za-z])\)\s+\S", |_| 2),
        // A. / C. / V.
        m(r"^([A-Z])\.\s+\S", |_| 1),
        // II. / IV. (a lone numeral is caught as a letter above)
        m(r"^([IVXLC]{2,6})\.\s+\S", |_| 1),
        // a)
        m(r"^([a-z])\)\s+\S", |_| 3),
    ]
});

static PREFIX_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+\s+").expect("valid regex"));

static BARE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,3}(\.\d{1,3}){0,3}\.?|[A-Z]\.|\(\d{1,3}\)|\([A-Za-z]\)|[ivxlc]{1,6}\.?)$")
        .expect("valid regex")
});

pub fn detect(text: &str) -> Option<Numbering> {
    let text = text.trim();
    for m in MATCHERS.iter() {
        if let Some(caps) = m.re.captures(text) {
            let prefix_len = PREFIX_BOUNDARY
                .find(text)
                .map(|p| p.end())
                .unwrap_or(0);
            return Some(Numbering {
                depth: (m.depth)(&caps).max(1),
                prefix_len,
            });
        }
    }
    None
}

/// Text with the numbering prefix removed, or the text itself when there is
/// no prefix or nothing would remain.
pub fn strip_prefix(text: &str) -> &str {
    let text = text.trim();
    match detect(text) {
        Some(n) if n.prefix_len < text.len() => text[n.prefix_len..].trim(),
        _ => text,
    }
}

/// A fragment holding only a numbering prefix, e.g. `2.1` or `(a)`.
pub fn is_bare_prefix(text: &str) -> bool {
    BARE_PREFIX.is_match(text.trim())
}

/// Text that carries nothing but numbering or punctuation.
pub fn is_just_number(text: &str) -> bool {
    let stripped: String = text
        .chars()
        .filter(|c| !matches!(c, '.' | '(' | ')' | '-') && !c.is_whitespace())
        .collect();
    if stripped.chars().count() <= 2 {
        return true;
    }
    stripped.chars().all(|c| c.is_ascii_digit())
        || stripped
            .to_ascii_lowercase()
            .chars()
            .all(|c| matches!(c, 'i' | 'v' | 'x'))
}

/// Merges a bare numbering prefix with the label that follows it on the same
/// line. `max_gap_em` bounds the horizontal gap in multiples of the prefix's
/// font size.
pub fn merge_split_prefixes(fragments: &[TextFragment], max_gap_em: f32) -> Vec<TextFragment> {
    let mut out = Vec::with_capacity(fragments.len());
    let mut i = 0;
    while i < fragments.len() {
        let cur = &fragments[i];
        if let Some(next) = fragments.get(i + 1) {
            if is_bare_prefix(&cur.text) && same_line_neighbour(cur, next, max_gap_em) {
                out.push(TextFragment {
                    text: format!("{} {}", cur.text.trim(), next.text.trim()),
                    font_size: cur.font_size.max(next.font_size),
                    is_bold: cur.is_bold || next.is_bold,
                    font_name: if next.font_name.is_empty() {
                        cur.font_name.clone()
                    } else {
                        next.font_name.clone()
                    },
                    bbox: cur.bbox.union(&next.bbox),
                    ..cur.clone()
                });
                i += 2;
                continue;
            }
        }
        out.push(cur.clone());
        i += 1;
    }
    out
}

fn same_line_neighbour(a: &TextFragment, b: &TextFragment, max_gap_em: f32) -> bool {
    if a.page != b.page {
        return false;
    }
    let line_height = a.bbox.height().max(b.bbox.height()).max(1.0);
    let same_line = (a.bbox.y0 - b.bbox.y0).abs() < line_height * 0.5
        || (a.block == b.block && a.line == b.line);
    let gap = b.bbox.x0 - a.bbox.x1;
    same_line && gap >= -1.0 && gap <= a.font_size.max(1.0) * max_gap_em
}
