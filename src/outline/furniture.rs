//! Page furniture: running headers/footers and boilerplate lines such as page
//! numbers. Matching fragments are dropped before heading scoring.

use crate::config::Furniture;
use crate::layout::DocumentLayout;
use anyhow::Result;
use regex::Regex;
use std::collections::{HashMap, HashSet};

pub struct FurnitureFilter {
    repeated: HashSet<String>,
    patterns: Vec<Regex>,
}

impl FurnitureFilter {
    pub fn new(cfg: &Furniture, doc: &DocumentLayout) -> Result<Self> {
        let repeated = if cfg.remove_repeated_lines {
            repeated_lines(cfg, doc)
        } else {
            HashSet::new()
        };
        let patterns = if cfg.remove_by_regex {
            cfg.patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };
        Ok(Self { repeated, patterns })
    }

    pub fn is_furniture(&self, text: &str) -> bool {
        let t = text.trim();
        self.repeated.contains(&normalize(t)) || self.patterns.iter().any(|r| r.is_match(t))
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Lines that appear on at least `repeated_line_min_pages` distinct pages.
fn repeated_lines(cfg: &Furniture, doc: &DocumentLayout) -> HashSet<String> {
    let mut pages_by_line: HashMap<String, HashSet<u32>> = HashMap::new();
    for f in doc.fragments() {
        let key = normalize(&f.text);
        if key.is_empty() || key.len() > cfg.repeated_line_max_length {
            continue;
        }
        pages_by_line.entry(key).or_default().insert(f.page);
    }
    let min = cfg.repeated_line_min_pages.max(2);
    pages_by_line
        .into_iter()
        .filter(|(_, pages)| pages.len() >= min)
        .map(|(line, _)| line)
        .collect()
}
