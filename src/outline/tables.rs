//! Table-region detection. Fragments inside a table never become heading
//! candidates.

use crate::config::Tables;
use crate::layout::{Page, TextFragment};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Reading-order indices of fragments on `page` that sit inside a table.
pub fn table_fragments(cfg: &Tables, page: &Page) -> HashSet<usize> {
    let mut suppressed = HashSet::new();
    if !cfg.enabled {
        return suppressed;
    }
    let mut blocks: BTreeMap<u32, Vec<&TextFragment>> = BTreeMap::new();
    for f in &page.fragments {
        blocks.entry(f.block).or_default().push(f);
    }
    for frags in blocks.values() {
        if short_span_table(cfg, frags) || column_table(cfg, frags, page.width) {
            suppressed.extend(frags.iter().map(|f| f.order));
        }
    }
    suppressed
}

fn lines_of<'a>(frags: &[&'a TextFragment]) -> BTreeMap<u32, Vec<&'a TextFragment>> {
    let mut lines: BTreeMap<u32, Vec<&TextFragment>> = BTreeMap::new();
    for f in frags {
        lines.entry(f.line).or_default().push(*f);
    }
    lines
}

/// Many short spans laid out over several columns.
fn short_span_table(cfg: &Tables, frags: &[&TextFragment]) -> bool {
    if lines_of(frags).len() < 2 || frags.len() < cfg.min_spans {
        return false;
    }
    let short = frags
        .iter()
        .filter(|f| f.text.chars().count() < cfg.short_span_chars)
        .count();
    if (short as f64) / (frags.len() as f64) <= cfg.short_span_ratio {
        return false;
    }
    let columns: BTreeSet<i32> = frags
        .iter()
        .map(|f| ((f.bbox.x0 / 10.0).round() * 10.0) as i32)
        .collect();
    columns.len() >= cfg.min_columns
}

/// Several multi-cell lines whose cells share column positions, with narrow
/// cells.
fn column_table(cfg: &Tables, frags: &[&TextFragment], page_width: f32) -> bool {
    let lines = lines_of(frags);
    let rows: Vec<&Vec<&TextFragment>> = lines.values().filter(|l| l.len() >= 2).collect();
    if rows.len() < 2 {
        return false;
    }

    let mut anchors: Vec<(f32, usize)> = Vec::new();
    for row in &rows {
        let mut seen_in_row: Vec<usize> = Vec::new();
        for f in row.iter() {
            let x = f.bbox.x0;
            match anchors
                .iter()
                .position(|(ax, _)| (ax - x).abs() <= cfg.column_tolerance)
            {
                Some(idx) => {
                    if !seen_in_row.contains(&idx) {
                        anchors[idx].1 += 1;
                        seen_in_row.push(idx);
                    }
                }
                None => {
                    anchors.push((x, 1));
                    seen_in_row.push(anchors.len() - 1);
                }
            }
        }
    }
    let shared_columns = anchors.iter().filter(|(_, n)| *n >= 2).count();
    if shared_columns < 2 {
        return false;
    }

    let mut widths: Vec<f32> = rows
        .iter()
        .flat_map(|r| r.iter().map(|f| f.bbox.width()))
        .collect();
    widths.sort_by(f32::total_cmp);
    let median = widths[widths.len() / 2];
    page_width > 0.0 && median < page_width * cfg.max_cell_width_ratio
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BBox;

    fn cell(text: &str, block: u32, line: u32, x0: f32, width: f32, order: usize) -> TextFragment {
        let y0 = 100.0 + line as f32 * 14.0;
        TextFragment {
            text: text.into(),
            page: 1,
            font_size: 10.0,
            is_bold: false,
            font_name: String::new(),
            bbox: BBox::new(x0, y0, x0 + width, y0 + 10.0),
            order,
            block,
            line,
        }
    }

    fn page(fragments: Vec<TextFragment>) -> Page {
        Page {
            number: 1,
            width: 600.0,
            height: 800.0,
            text: String::new(),
            fragments,
        }
    }

    #[test]
    fn grid_of_cells_is_a_table() {
        let mut frags = Vec::new();
        let mut order = 0;
        for line in 0..3u32 {
            for (col, x) in [50.0_f32, 200.0, 350.0].iter().enumerate() {
                frags.push(cell(&format!("r{line}c{col}"), 1, line, *x, 60.0, order));
                order += 1;
            }
        }
        let p = page(frags);
        let hidden = table_fragments(&Tables::default(), &p);
        assert_eq!(hidden.len(), 9);
    }

    #[test]
    fn two_column_header_row_grid() {
        // Longer cells fail the short-span rule; the column rule still applies.
        let frags = vec![
            cell("Application Deadline", 2, 0, 50.0, 110.0, 0),
            cell("Submission Method", 2, 0, 250.0, 100.0, 1),
            cell("Fifteenth of March", 2, 1, 50.0, 100.0, 2),
            cell("Online portal only", 2, 1, 250.0, 100.0, 3),
        ];
        let p = page(frags);
        assert_eq!(table_fragments(&Tables::default(), &p).len(), 4);
    }

    #[test]
    fn prose_block_is_not_a_table() {
        let frags = vec![
            cell("1. Introduction", 0, 0, 50.0, 120.0, 0),
            cell("This document describes the overall approach taken.", 1, 0, 50.0, 480.0, 1),
            cell("It continues on a second line of ordinary prose.", 1, 1, 50.0, 470.0, 2),
        ];
        let p = page(frags);
        assert!(table_fragments(&Tables::default(), &p).is_empty());
    }
}
