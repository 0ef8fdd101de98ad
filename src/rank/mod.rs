//! Hybrid relevance ranking of sections against a persona + task query.

pub mod tfidf;

use crate::config;
use crate::embed::{Embedder, cosine};
use crate::segment::Section;
use crate::text::{keyword_set, sentences};
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tfidf::TfidfIndex;
use tracing::{debug, info};

pub const W_SEMANTIC: f64 = 0.4;
pub const W_TFIDF: f64 = 0.3;
pub const W_KEYWORD: f64 = 0.3;

/// Share of the ranked list tagged HIGH, and HIGH + MEDIUM together.
const HIGH_PERCENT: usize = 20;
const HIGH_MEDIUM_PERCENT: usize = 50;

/// Bounds on sentences per sub-section group.
const GROUP_SENTENCES: usize = 4;
const MIN_GROUP_SENTENCES: usize = 3;

#[derive(Debug, Clone)]
pub struct RelevanceQuery {
    pub persona: String,
    pub task: String,
    pub text: String,
    pub keywords: HashSet<String>,
}

impl RelevanceQuery {
    pub fn new(persona: &str, task: &str, top_k: usize) -> Self {
        let persona = persona.trim().to_string();
        let task = task.trim().to_string();
        let text = format!("{persona} {task}").trim().to_string();
        let keywords = keyword_set(&text, top_k);
        Self {
            persona,
            task,
            text,
            keywords,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImportanceRank {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone)]
pub struct ScoredSection {
    pub section: Section,
    pub semantic: f64,
    pub tfidf: f64,
    pub keyword: f64,
    pub combined: f64,
    pub importance: ImportanceRank,
    /// 1-based position in the final order.
    pub rank: usize,
}

#[derive(Debug, Clone)]
pub struct SubSection {
    pub document: String,
    pub page: u32,
    pub text: String,
    pub score: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Ranking {
    pub sections: Vec<ScoredSection>,
    pub subsections: Vec<SubSection>,
}

pub struct Ranker<E: Embedder> {
    cfg: config::Ranking,
    embedder: E,
}

impl<E: Embedder> Ranker<E> {
    pub fn new(cfg: &config::Ranking, embedder: E) -> Self {
        Self {
            cfg: cfg.clone(),
            embedder,
        }
    }

    pub fn query(&self, persona: &str, task: &str) -> RelevanceQuery {
        RelevanceQuery::new(persona, task, self.cfg.query_keywords)
    }

    /// Sections must arrive in their stable order (document, page, index);
    /// equal scores keep it.
    pub fn rank(&self, query: &RelevanceQuery, sections: Vec<Section>) -> Result<Ranking> {
        if sections.is_empty() {
            return Ok(Ranking::default());
        }
        if query.keywords.is_empty() {
            debug!("query has no keywords; keyword score is 0 for every section");
        }

        let q = self.embed_query(&query.text)?;
        let contents: Vec<&str> = sections.iter().map(|s| s.content.as_str()).collect();
        let semantic = self.semantic_scores(&q, &contents)?;
        let lexical = tfidf_scores(&query.text, &contents, &self.cfg);
        let keyword: Vec<f64> = contents
            .iter()
            .map(|c| keyword_overlap(&query.keywords, c, self.cfg.section_keywords))
            .collect();

        let mut scored: Vec<ScoredSection> = sections
            .into_iter()
            .enumerate()
            .map(|(i, section)| ScoredSection {
                section,
                semantic: semantic[i],
                tfidf: lexical[i],
                keyword: keyword[i],
                combined: combine(semantic[i], lexical[i], keyword[i]),
                importance: ImportanceRank::Low,
                rank: 0,
            })
            .collect();
        scored.sort_by(|a, b| b.combined.total_cmp(&a.combined));

        let (high, medium, _) = tier_counts(scored.len());
        for (i, s) in scored.iter_mut().enumerate() {
            s.rank = i + 1;
            s.importance = if i < high {
                ImportanceRank::High
            } else if i < high + medium {
                ImportanceRank::Medium
            } else {
                ImportanceRank::Low
            };
        }

        let subsections = self.subsections(&q, &scored)?;
        info!(
            "ranked {} sections ({} high, {} medium), {} sub-sections",
            scored.len(),
            high,
            medium,
            subsections.len()
        );
        Ok(Ranking {
            sections: scored,
            subsections,
        })
    }

    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        match self.embedder.embed(&[query])?.into_iter().next() {
            Some(q) => Ok(q),
            None => bail!("embedder returned nothing for the query"),
        }
    }

    fn semantic_scores(&self, q: &[f32], texts: &[&str]) -> Result<Vec<f64>> {
        let docs = self.embedder.embed(texts)?;
        if docs.len() != texts.len() {
            bail!("embedder returned {} vectors for {} texts", docs.len(), texts.len());
        }
        Ok(docs.iter().map(|d| cosine(q, d).clamp(0.0, 1.0)).collect())
    }

    /// Sentence groups from HIGH and MEDIUM sections, best `max_subsections`
    /// per section, ranked together by semantic similarity.
    fn subsections(&self, q: &[f32], scored: &[ScoredSection]) -> Result<Vec<SubSection>> {
        let mut out = Vec::new();
        for s in scored
            .iter()
            .filter(|s| s.importance != ImportanceRank::Low)
        {
            let groups: Vec<String> = group_sentences(&sentences(&s.section.content))
                .into_iter()
                .filter(|g| g.chars().count() >= self.cfg.min_subsection_chars)
                .collect();
            if groups.is_empty() {
                continue;
            }
            let refs: Vec<&str> = groups.iter().map(String::as_str).collect();
            let scores = self.semantic_scores(q, &refs)?;
            let mut local: Vec<(String, f64)> = groups.into_iter().zip(scores).collect();
            local.sort_by(|a, b| b.1.total_cmp(&a.1));
            local.truncate(self.cfg.max_subsections);
            out.extend(local.into_iter().map(|(text, score)| SubSection {
                document: s.section.document.clone(),
                page: s.section.page,
                text,
                score,
                rank: 0,
            }));
        }
        out.sort_by(|a, b| b.score.total_cmp(&a.score));
        for (i, sub) in out.iter_mut().enumerate() {
            sub.rank = i + 1;
        }
        Ok(out)
    }
}

pub fn combine(semantic: f64, tfidf: f64, keyword: f64) -> f64 {
    W_SEMANTIC * semantic + W_TFIDF * tfidf + W_KEYWORD * keyword
}

/// (high, medium, low) counts for `n` ranked sections.
pub fn tier_counts(n: usize) -> (usize, usize, usize) {
    if n == 0 {
        return (0, 0, 0);
    }
    let high = (n * HIGH_PERCENT).div_ceil(100);
    let medium_end = (n * HIGH_MEDIUM_PERCENT).div_ceil(100).max(high + 1).min(n);
    (high, medium_end - high, n - medium_end)
}

/// Splits sentences into consecutive groups of three or four. Fewer than
/// six sentences stay together as one group.
pub fn group_sentences(sentences: &[String]) -> Vec<String> {
    let n = sentences.len();
    if n == 0 {
        return Vec::new();
    }
    let groups = n
        .div_ceil(GROUP_SENTENCES)
        .min(n / MIN_GROUP_SENTENCES)
        .max(1);
    let base = n / groups;
    let extra = n % groups;
    let mut out = Vec::with_capacity(groups);
    let mut start = 0;
    for g in 0..groups {
        let len = base + usize::from(g < extra);
        out.push(sentences[start..start + len].join(" "));
        start += len;
    }
    out
}

pub fn keyword_overlap(query: &HashSet<String>, text: &str, top_k: usize) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let section = keyword_set(text, top_k);
    query.intersection(&section).count() as f64 / query.len() as f64
}

fn tfidf_scores(query: &str, contents: &[&str], cfg: &config::Ranking) -> Vec<f64> {
    let mut corpus: Vec<&str> = contents.to_vec();
    corpus.push(query);
    let index = TfidfIndex::fit(&corpus, cfg.tfidf_max_features, cfg.tfidf_max_ngram);
    debug!("tf-idf vocabulary: {} terms", index.len());
    let q = index.transform(query);
    contents
        .iter()
        .map(|c| tfidf::cosine(&q, &index.transform(c)).clamp(0.0, 1.0))
        .collect()
}
