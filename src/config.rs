use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub engine: Engine,
    #[serde(default)]
    pub headings: Headings,
    #[serde(default)]
    pub segmenter: Segmenter,
    #[serde(default)]
    pub ranking: Ranking,
    #[serde(default)]
    pub embedding: Embedding,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            global: Default::default(),
            paths: Default::default(),
            limits: Default::default(),
            engine: Default::default(),
            headings: Default::default(),
            segmenter: Default::default(),
            ranking: Default::default(),
            embedding: Default::default(),
            output: Default::default(),
            logging: Default::default(),
            debug: Default::default(),
            security: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub out_dir: String,
    pub scripts_dir: String,
    pub model_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            out_dir: "output".into(),
            scripts_dir: "scripts".into(),
            model_dir: "models/all-MiniLM-L6-v2".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_input_file_bytes: u64,
    pub max_pages: u32,
    pub min_documents: usize,
    pub max_documents: usize,
}
impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_file_bytes: 200 * 1024 * 1024,
            max_pages: 50,
            min_documents: 3,
            max_documents: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Engine {
    pub python_exe: String,
    pub layout_timeout_seconds: u64,
    pub keep_python_stderr: bool,
    #[serde(default)]
    pub env: std::collections::BTreeMap<String, String>,
}
impl Default for Engine {
    fn default() -> Self {
        Self {
            python_exe: "python3".into(),
            layout_timeout_seconds: 60,
            keep_python_stderr: true,
            env: Default::default(),
        }
    }
}

/// Thresholds for the heading classifier. Signal weights are fixed in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Headings {
    pub min_score: f64,
    pub numbered_min_score: f64,
    pub promote_score: f64,
    pub gap_multiple: f64,
    pub min_chars: usize,
    pub max_chars: usize,
    pub strip_numbering: bool,
    pub structural_keywords: Vec<String>,
    #[serde(default)]
    pub tables: Tables,
    #[serde(default)]
    pub furniture: Furniture,
}
impl Default for Headings {
    fn default() -> Self {
        Self {
            min_score: 0.40,
            numbered_min_score: 0.25,
            promote_score: 0.75,
            gap_multiple: 1.5,
            min_chars: 3,
            max_chars: 300,
            strip_numbering: true,
            structural_keywords: [
                "introduction",
                "conclusion",
                "summary",
                "overview",
                "background",
                "methodology",
                "results",
                "discussion",
                "chapter",
                "section",
                "appendix",
                "references",
                "bibliography",
                "glossary",
                "acknowledgements",
                "requirements",
                "objectives",
                "scope",
                "purpose",
                "abstract",
                "table of contents",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            tables: Default::default(),
            furniture: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tables {
    pub enabled: bool,
    pub short_span_chars: usize,
    pub short_span_ratio: f64,
    pub min_spans: usize,
    pub min_columns: usize,
    pub column_tolerance: f32,
    pub max_cell_width_ratio: f32,
}
impl Default for Tables {
    fn default() -> Self {
        Self {
            enabled: true,
            short_span_chars: 15,
            short_span_ratio: 0.7,
            min_spans: 5,
            min_columns: 3,
            column_tolerance: 4.0,
            max_cell_width_ratio: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Furniture {
    pub remove_repeated_lines: bool,
    pub repeated_line_min_pages: usize,
    pub repeated_line_max_length: usize,
    pub remove_by_regex: bool,
    pub patterns: Vec<String>,
}
impl Default for Furniture {
    fn default() -> Self {
        Self {
            remove_repeated_lines: true,
            repeated_line_min_pages: 3,
            repeated_line_max_length: 120,
            remove_by_regex: true,
            patterns: vec![
                "(?i)^(page\\s+\\d+(\\s+of\\s+\\d+)?|\\d+\\s*/\\s*\\d+)$".into(),
                "^[\\d\\s.\\-]+$".into(),
                "(?i)^(copyright|©)".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Segmenter {
    pub paragraph_target_chars: usize,
    pub title_max_chars: usize,
}
impl Default for Segmenter {
    fn default() -> Self {
        Self {
            paragraph_target_chars: 800,
            title_max_chars: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ranking {
    pub query_keywords: usize,
    pub section_keywords: usize,
    pub tfidf_max_features: usize,
    pub tfidf_max_ngram: usize,
    pub max_subsections: usize,
    pub min_subsection_chars: usize,
}
impl Default for Ranking {
    fn default() -> Self {
        Self {
            query_keywords: 10,
            section_keywords: 20,
            tfidf_max_features: 5000,
            tfidf_max_ngram: 2,
            max_subsections: 5,
            min_subsection_chars: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Embedding {
    pub model_file: String,
    pub tokenizer_file: String,
    pub max_sequence_length: usize,
    pub batch_size: usize,
    pub intra_threads: usize,
}
impl Default for Embedding {
    fn default() -> Self {
        Self {
            model_file: "model.onnx".into(),
            tokenizer_file: "tokenizer.json".into(),
            max_sequence_length: 256,
            batch_size: 32,
            intra_threads: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub ranking_filename: String,
    pub include_scores: bool,
    pub write_timestamp: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            ranking_filename: "ranking.json".into(),
            include_scores: true,
            write_timestamp: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub dump_effective_config: bool,
    pub log_candidates: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            dump_effective_config: false,
            log_candidates: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Security {
    pub reject_url_inputs: bool,
    pub pin_scripts_dir: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
            pin_scripts_dir: false,
        }
    }
}
