use crate::{
    outline::{HeadingLevel, Outline},
    rank::{ImportanceRank, Ranking},
    util::round4,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineReport {
    pub title: String,
    pub outline: Vec<OutlineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineItem {
    pub level: HeadingLevel,
    pub text: String,
    pub page: u32,
}

impl From<&Outline> for OutlineReport {
    fn from(o: &Outline) -> Self {
        Self {
            title: o.title.clone(),
            outline: o
                .entries
                .iter()
                .map(|e| OutlineItem {
                    level: e.level,
                    text: e.text.clone(),
                    page: e.page,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingReport {
    pub metadata: RankingMetadata,
    pub extracted_sections: Vec<ExtractedSection>,
    pub subsection_analysis: Vec<SubsectionAnalysis>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingMetadata {
    pub input_documents: Vec<String>,
    pub persona: String,
    pub job_to_be_done: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_timestamp: Option<String>,
    pub input_digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedSection {
    pub document: String,
    pub page_number: u32,
    pub section_title: String,
    pub importance_rank: ImportanceRank,
    pub rank: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tfidf_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsectionAnalysis {
    pub document: String,
    pub page_number: u32,
    pub refined_text: String,
    pub rank: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

impl RankingReport {
    pub fn build(metadata: RankingMetadata, ranking: &Ranking, include_scores: bool) -> Self {
        let score = |s: f64| include_scores.then(|| round4(s));
        Self {
            metadata,
            extracted_sections: ranking
                .sections
                .iter()
                .map(|s| ExtractedSection {
                    document: s.section.document.clone(),
                    page_number: s.section.page,
                    section_title: s.section.title.clone(),
                    importance_rank: s.importance,
                    rank: s.rank,
                    relevance_score: score(s.combined),
                    semantic_score: score(s.semantic),
                    tfidf_score: score(s.tfidf),
                    keyword_score: score(s.keyword),
                })
                .collect(),
            subsection_analysis: ranking
                .subsections
                .iter()
                .map(|s| SubsectionAnalysis {
                    document: s.document.clone(),
                    page_number: s.page,
                    refined_text: s.text.clone(),
                    rank: s.rank,
                    relevance_score: score(s.score),
                })
                .collect(),
        }
    }
}
