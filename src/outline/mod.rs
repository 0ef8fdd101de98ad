//! Heading classification: turns one document's fragments into a title and a
//! leveled outline.

pub mod furniture;
pub mod numbering;
pub mod scoring;
pub mod tables;

use crate::config::Headings;
use crate::layout::{DocumentLayout, TextFragment, size_key};
use anyhow::Result;
use furniture::FurnitureFilter;
use numbering::Numbering;
use scoring::{LineGaps, Signals};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Horizontal gap allowed between a numbering prefix and its label, in ems.
const MAX_PREFIX_GAP_EM: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HeadingLevel {
    Title,
    H1,
    H2,
    H3,
    None,
}

impl HeadingLevel {
    pub fn from_depth(depth: u8) -> Self {
        match depth {
            0 | 1 => HeadingLevel::H1,
            2 => HeadingLevel::H2,
            3 => HeadingLevel::H3,
            _ => HeadingLevel::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadingCandidate {
    /// Text as extracted, numbering prefix included.
    pub source_text: String,
    pub text: String,
    pub page: u32,
    pub order: usize,
    pub font_size: f32,
    pub score: f64,
    pub numbering: Option<Numbering>,
    pub level: HeadingLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlineEntry {
    pub level: HeadingLevel,
    pub text: String,
    pub source_text: String,
    pub page: u32,
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outline {
    pub title: String,
    pub entries: Vec<OutlineEntry>,
}

impl Outline {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn on_page(&self, page: u32) -> impl Iterator<Item = &OutlineEntry> {
        self.entries.iter().filter(move |e| e.page == page)
    }
}

pub struct HeadingClassifier {
    cfg: Headings,
    log_candidates: bool,
}

impl HeadingClassifier {
    pub fn new(cfg: &Headings) -> Self {
        Self {
            cfg: cfg.clone(),
            log_candidates: false,
        }
    }

    pub fn with_candidate_logging(mut self, on: bool) -> Self {
        self.log_candidates = on;
        self
    }

    pub fn classify(&self, doc: &DocumentLayout) -> Result<Outline> {
        if doc.is_empty() {
            debug!("{}: no fragments, empty outline", doc.name);
            return Ok(Outline::default());
        }

        let body_size = doc.body_size();
        let candidates = self.candidates(doc, body_size)?;
        // Body-sized text is never a title.
        let max_key = candidates
            .iter()
            .map(|c| size_key(c.font_size))
            .max()
            .filter(|k| *k > size_key(body_size));
        let mut candidates = assign_levels(candidates, body_size, self.cfg.promote_score);

        let title = take_title(&mut candidates, max_key);
        let title_key = normalize_key(&title);

        candidates.retain(|c| c.level != HeadingLevel::None);
        candidates.sort_by(|a, b| a.page.cmp(&b.page).then(a.order.cmp(&b.order)));

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for c in candidates {
            let key = normalize_key(&c.text);
            if key.is_empty() || key == title_key {
                continue;
            }
            if !seen.insert((key, c.page)) {
                continue;
            }
            entries.push(OutlineEntry {
                level: c.level,
                text: c.text,
                source_text: c.source_text,
                page: c.page,
                order: c.order,
            });
        }

        debug!(
            "{}: body_size={} title={:?} headings={}",
            doc.name,
            body_size,
            title,
            entries.len()
        );
        Ok(Outline { title, entries })
    }

    /// Scored fragments above the floor, tables and page furniture excluded.
    fn candidates(&self, doc: &DocumentLayout, body_size: f32) -> Result<Vec<HeadingCandidate>> {
        let furniture = FurnitureFilter::new(&self.cfg.furniture, doc)?;
        let gaps = LineGaps::measure(&doc.pages);
        let mut out = Vec::new();

        for page in &doc.pages {
            let tables = tables::table_fragments(&self.cfg.tables, page);
            if !tables.is_empty() {
                debug!("page {}: {} fragments in tables", page.number, tables.len());
            }
            let kept: Vec<TextFragment> = page
                .fragments
                .iter()
                .filter(|f| !tables.contains(&f.order))
                .cloned()
                .collect();

            for f in numbering::merge_split_prefixes(&kept, MAX_PREFIX_GAP_EM) {
                let text = f.text.trim();
                let chars = text.chars().count();
                if chars < self.cfg.min_chars || chars > self.cfg.max_chars {
                    continue;
                }
                if numbering::is_just_number(text) || furniture.is_furniture(text) {
                    continue;
                }

                let numbering = numbering::detect(text);
                let feats = scoring::features(
                    &f,
                    page,
                    body_size,
                    &gaps,
                    &self.cfg.structural_keywords,
                    numbering.is_some(),
                );
                let signals = Signals::from_features(&feats, self.cfg.gap_multiple);
                let score = signals.score();
                let floor = if numbering.is_some() {
                    self.cfg.numbered_min_score
                } else {
                    self.cfg.min_score
                };
                if self.log_candidates {
                    debug!(page = f.page, score, ?signals, "candidate {:?}", text);
                }
                if score < floor {
                    continue;
                }

                let display = if self.cfg.strip_numbering {
                    numbering::strip_prefix(text)
                } else {
                    text
                };
                out.push(HeadingCandidate {
                    source_text: text.to_string(),
                    text: display.to_string(),
                    page: f.page,
                    order: f.order,
                    font_size: f.font_size,
                    score,
                    numbering,
                    level: HeadingLevel::None,
                });
            }
        }
        Ok(out)
    }
}

/// Numbering depth wins outright. Otherwise the three largest candidate sizes
/// above body size map to H1..H3 and body-sized text sits one level below the
/// smallest of them (never above H2); a high score promotes by one level.
pub fn assign_levels(
    mut candidates: Vec<HeadingCandidate>,
    body_size: f32,
    promote_score: f64,
) -> Vec<HeadingCandidate> {
    let body_key = size_key(body_size);
    let sizes: BTreeSet<i32> = candidates
        .iter()
        .map(|c| size_key(c.font_size))
        .filter(|k| *k > body_key)
        .collect();
    let ranked: Vec<i32> = sizes.into_iter().rev().collect();

    for c in candidates.iter_mut() {
        if let Some(n) = c.numbering {
            c.level = HeadingLevel::from_depth(n.depth.min(3));
            continue;
        }
        let key = size_key(c.font_size);
        let mut raw = if key > body_key {
            ranked.iter().position(|k| *k == key).map(|i| i + 1).unwrap_or(4)
        } else {
            (ranked.len() + 1).max(2)
        };
        if c.score >= promote_score && raw > 1 {
            raw -= 1;
        }
        c.level = HeadingLevel::from_depth(raw.min(4) as u8);
    }
    candidates
}

/// Removes and returns the title: the best-scoring page-1 candidate at the
/// largest candidate font size. Numbered headings are never titles.
pub fn take_title(candidates: &mut Vec<HeadingCandidate>, max_key: Option<i32>) -> String {
    let Some(max_key) = max_key else {
        return String::new();
    };
    let best = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            c.page == 1 && c.numbering.is_none() && size_key(c.font_size) == max_key
        })
        .max_by(|(_, a), (_, b)| a.score.total_cmp(&b.score).then(b.order.cmp(&a.order)))
        .map(|(i, _)| i);
    match best {
        Some(i) => {
            let mut title = candidates.remove(i);
            title.level = HeadingLevel::Title;
            title.text
        }
        None => String::new(),
    }
}

fn normalize_key(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(text: &str, page: u32, order: usize, size: f32, score: f64) -> HeadingCandidate {
        HeadingCandidate {
            source_text: text.into(),
            text: numbering::strip_prefix(text).into(),
            page,
            order,
            font_size: size,
            score,
            numbering: numbering::detect(text),
            level: HeadingLevel::None,
        }
    }

    #[test]
    fn numbering_beats_font_size() {
        let out = assign_levels(
            vec![cand("1.2.3 Deep detail", 1, 0, 30.0, 0.9), cand("Big", 1, 1, 30.0, 0.9)],
            11.0,
            0.75,
        );
        assert_eq!(out[0].level, HeadingLevel::H3);
        assert_eq!(out[1].level, HeadingLevel::H1);
    }

    #[test]
    fn sizes_rank_into_levels() {
        let out = assign_levels(
            vec![
                cand("Chapter", 1, 0, 24.0, 0.5),
                cand("Part", 1, 1, 18.0, 0.5),
                cand("Piece", 1, 2, 14.0, 0.5),
                cand("Bit", 1, 3, 12.5, 0.5),
                cand("Bold body", 1, 4, 11.0, 0.5),
            ],
            11.0,
            0.75,
        );
        let levels: Vec<_> = out.iter().map(|c| c.level).collect();
        assert_eq!(
            levels,
            vec![
                HeadingLevel::H1,
                HeadingLevel::H2,
                HeadingLevel::H3,
                HeadingLevel::None,
                HeadingLevel::None
            ]
        );
    }

    #[test]
    fn high_score_promotes_one_level() {
        let out = assign_levels(
            vec![cand("Large", 1, 0, 20.0, 0.5), cand("Emphasised", 1, 1, 11.0, 0.8)],
            11.0,
            0.75,
        );
        assert_eq!(out[0].level, HeadingLevel::H1);
        assert_eq!(out[1].level, HeadingLevel::H1);
    }

    #[test]
    fn uniform_fonts_fall_back_to_score() {
        let out = assign_levels(
            vec![cand("Strong", 1, 0, 11.0, 0.8), cand("Weak", 1, 1, 11.0, 0.45)],
            11.0,
            0.75,
        );
        assert_eq!(out[0].level, HeadingLevel::H1);
        assert_eq!(out[1].level, HeadingLevel::H2);
    }

    #[test]
    fn title_is_page_one_largest_unnumbered() {
        let mut cands = vec![
            cand("1. Introduction", 1, 1, 24.0, 0.95),
            cand("Annual Report", 1, 0, 24.0, 0.7),
            cand("Later Big", 2, 0, 24.0, 0.99),
        ];
        let title = take_title(&mut cands, Some(240));
        assert_eq!(title, "Annual Report");
        assert_eq!(cands.len(), 2);
    }

    #[test]
    fn no_title_when_only_numbered() {
        let mut cands = vec![cand("1. Introduction", 1, 0, 18.0, 0.9)];
        assert_eq!(take_title(&mut cands, Some(180)), "");
        assert_eq!(cands.len(), 1);
    }
}
