//! Heading score: independent layout and text signals in [0, 1] combined by
//! fixed weights.

use crate::layout::{Page, TextFragment};
use crate::text::word_count;
use std::collections::HashMap;

const W_FONT_SIZE: f64 = 0.28;
const W_BOLD: f64 = 0.14;
const W_GAP: f64 = 0.12;
const W_ALIGNMENT: f64 = 0.05;
const W_CASING: f64 = 0.08;
const W_LENGTH: f64 = 0.09;
const W_KEYWORD: f64 = 0.10;
const W_FONT_NAME: f64 = 0.05;
const W_PAGE_TOP: f64 = 0.05;
const W_NUMBERING: f64 = 0.04;

const HEAVY_FONT_MARKERS: &[&str] = &["bold", "black", "heavy", "semibold", "demi"];

/// Everything the scorers need to know about one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    pub font_ratio: f64,
    pub is_bold: bool,
    /// Gap to the previous line, in multiples of the median inter-line gap.
    pub gap_before: f64,
    pub gap_after: f64,
    pub centered: bool,
    pub left_margin_ratio: f64,
    pub all_caps: bool,
    pub title_case: bool,
    pub words: usize,
    pub chars: usize,
    pub has_keyword: bool,
    pub heavy_font: bool,
    pub page: u32,
    pub top_ratio: f64,
    pub numbered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Signals {
    pub font_size: f64,
    pub bold: f64,
    pub gap: f64,
    pub alignment: f64,
    pub casing: f64,
    pub length: f64,
    pub keyword: f64,
    pub font_name: f64,
    pub page_top: f64,
    pub numbering: f64,
}

impl Signals {
    pub fn from_features(f: &Features, gap_multiple: f64) -> Self {
        Self {
            font_size: font_size_signal(f.font_ratio),
            bold: if f.is_bold { 1.0 } else { 0.0 },
            gap: gap_signal(f.gap_before, f.gap_after, gap_multiple),
            alignment: alignment_signal(f.centered, f.left_margin_ratio),
            casing: casing_signal(f.all_caps, f.title_case, f.chars),
            length: length_signal(f.words, f.chars),
            keyword: if f.has_keyword { 1.0 } else { 0.0 },
            font_name: if f.heavy_font { 1.0 } else { 0.0 },
            page_top: page_top_signal(f.page, f.top_ratio),
            numbering: if f.numbered { 1.0 } else { 0.0 },
        }
    }

    pub fn score(&self) -> f64 {
        W_FONT_SIZE * self.font_size
            + W_BOLD * self.bold
            + W_GAP * self.gap
            + W_ALIGNMENT * self.alignment
            + W_CASING * self.casing
            + W_LENGTH * self.length
            + W_KEYWORD * self.keyword
            + W_FONT_NAME * self.font_name
            + W_PAGE_TOP * self.page_top
            + W_NUMBERING * self.numbering
    }
}

/// Linear from body size, saturating at 1.5x.
pub fn font_size_signal(ratio: f64) -> f64 {
    ((ratio - 1.0) / 0.5).clamp(0.0, 1.0)
}

/// Gaps beyond `multiple` times the median start to count and saturate at
/// twice that.
pub fn gap_signal(before: f64, after: f64, multiple: f64) -> f64 {
    let m = multiple.max(1.0);
    let part = |g: f64| ((g - m) / m).clamp(0.0, 1.0);
    (0.7 * part(before) + 0.3 * part(after)).min(1.0)
}

pub fn alignment_signal(centered: bool, left_margin_ratio: f64) -> f64 {
    if centered {
        1.0
    } else if left_margin_ratio < 0.2 {
        0.6
    } else {
        0.0
    }
}

pub fn casing_signal(all_caps: bool, title_case: bool, chars: usize) -> f64 {
    if all_caps && chars > 3 && chars < 80 {
        1.0
    } else if title_case {
        0.6
    } else {
        0.0
    }
}

/// Plausible heading length is 2 to 15 words.
pub fn length_signal(words: usize, chars: usize) -> f64 {
    if chars > 200 {
        return 0.0;
    }
    match words {
        0 => 0.0,
        1 => 0.5,
        2..=15 => 1.0,
        16..=25 => 0.3,
        _ => 0.0,
    }
}

/// Page 1 tops often hold titles and running headers, so they earn less.
pub fn page_top_signal(page: u32, top_ratio: f64) -> f64 {
    if top_ratio >= 0.2 {
        0.0
    } else if page > 1 {
        1.0
    } else {
        0.4
    }
}

pub fn is_all_caps(text: &str) -> bool {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
}

/// Every alphabetic word starts upper-case, ignoring short joiners.
pub fn is_title_case(text: &str) -> bool {
    const JOINERS: &[&str] = &["a", "an", "and", "the", "of", "for", "to", "in", "on", "or", "with"];
    let mut any = false;
    for (i, w) in text.split_whitespace().enumerate() {
        let Some(first) = w.chars().find(|c| c.is_alphabetic()) else {
            continue;
        };
        if i > 0 && JOINERS.contains(&w.to_lowercase().as_str()) {
            continue;
        }
        if !first.is_uppercase() {
            return false;
        }
        any = true;
    }
    any
}

pub fn has_structural_keyword(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k.as_str()))
}

pub fn is_heavy_font(font_name: &str) -> bool {
    let lower = font_name.to_lowercase();
    HEAVY_FONT_MARKERS.iter().any(|m| lower.contains(m))
}

/// Vertical gaps between visual lines, keyed by (page, reading order).
#[derive(Debug, Default)]
pub struct LineGaps {
    gaps: HashMap<(u32, usize), (f64, f64)>,
    median: f64,
}

impl LineGaps {
    pub fn measure(pages: &[Page]) -> Self {
        let mut gaps = HashMap::new();
        let mut all = Vec::new();
        for page in pages {
            let lines = visual_lines(&page.fragments);
            for (i, line) in lines.iter().enumerate() {
                let before = if i > 0 {
                    (line.y0 - lines[i - 1].y1).max(0.0) as f64
                } else {
                    0.0
                };
                let after = lines
                    .get(i + 1)
                    .map(|next| (next.y0 - line.y1).max(0.0) as f64)
                    .unwrap_or(0.0);
                if i > 0 && before > 0.0 {
                    all.push(before);
                }
                for &order in &line.members {
                    gaps.insert((page.number, order), (before, after));
                }
            }
        }
        all.sort_by(f64::total_cmp);
        let median = all.get(all.len() / 2).copied().unwrap_or(0.0);
        Self { gaps, median }
    }

    /// (before, after) as multiples of the median gap.
    pub fn relative(&self, page: u32, order: usize) -> (f64, f64) {
        let (before, after) = self.gaps.get(&(page, order)).copied().unwrap_or((0.0, 0.0));
        if self.median <= f64::EPSILON {
            // No measurable line spacing: any gap counts as a large one.
            let flag = |g: f64| if g > 0.0 { 3.0 } else { 0.0 };
            return (flag(before), flag(after));
        }
        (before / self.median, after / self.median)
    }
}

struct VisualLine {
    y0: f32,
    y1: f32,
    members: Vec<usize>,
}

/// Groups fragments whose vertical extents overlap into lines, top to bottom.
fn visual_lines(fragments: &[TextFragment]) -> Vec<VisualLine> {
    let mut sorted: Vec<&TextFragment> = fragments.iter().collect();
    sorted.sort_by(|a, b| a.bbox.y0.total_cmp(&b.bbox.y0).then(a.order.cmp(&b.order)));
    let mut lines: Vec<VisualLine> = Vec::new();
    for f in sorted {
        let mid = (f.bbox.y0 + f.bbox.y1) / 2.0;
        match lines.last_mut() {
            Some(line) if mid >= line.y0 && mid <= line.y1 => {
                line.y1 = line.y1.max(f.bbox.y1);
                line.members.push(f.order);
            }
            _ => lines.push(VisualLine {
                y0: f.bbox.y0,
                y1: f.bbox.y1,
                members: vec![f.order],
            }),
        }
    }
    lines
}

/// Builds the feature record for one (possibly merged) fragment.
pub fn features(
    f: &TextFragment,
    page: &Page,
    body_size: f32,
    gaps: &LineGaps,
    keywords: &[String],
    numbered: bool,
) -> Features {
    let (gap_before, gap_after) = gaps.relative(f.page, f.order);
    let width = page.width.max(1.0);
    let height = page.height.max(1.0);
    let text = f.text.trim();
    Features {
        font_ratio: (f.font_size / body_size.max(1.0)) as f64,
        is_bold: f.is_bold,
        gap_before,
        gap_after,
        centered: (f.bbox.center_x() - width / 2.0).abs() < width * 0.1,
        left_margin_ratio: (f.bbox.x0 / width) as f64,
        all_caps: is_all_caps(text),
        title_case: is_title_case(text),
        words: word_count(text),
        chars: text.chars().count(),
        has_keyword: has_structural_keyword(text, keywords),
        heavy_font: is_heavy_font(&f.font_name),
        page: f.page,
        top_ratio: (f.bbox.y0 / height) as f64,
        numbered,
    }
}
