use crate::{
    config::Config,
    embed::Embedder,
    engine::{LayoutEngine, layout_request},
    layout::DocumentLayout,
    outline::{HeadingClassifier, Outline},
    rank::Ranker,
    report::{OutlineReport, RankingMetadata, RankingReport},
    segment::{Section, Segmenter},
    util::{ensure_dir, file_name, hash_file, list_pdfs, now_rfc3339, sha256_hex},
};
use anyhow::{Context, Result, anyhow, bail};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

pub const PERSONA_FILE: &str = "persona.txt";
pub const JOB_FILE: &str = "job_description.txt";

pub struct Pipeline<E: LayoutEngine> {
    cfg: Config,
    engine: E,
    classifier: HeadingClassifier,
    segmenter: Segmenter,
}

impl<E: LayoutEngine> Pipeline<E> {
    pub fn new(cfg: &Config, engine: E) -> Self {
        Self {
            cfg: cfg.clone(),
            engine,
            classifier: HeadingClassifier::new(&cfg.headings)
                .with_candidate_logging(cfg.debug.log_candidates),
            segmenter: Segmenter::new(&cfg.segmenter),
        }
    }

    pub fn load_document(&self, input: &Path) -> Result<DocumentLayout> {
        let meta = std::fs::metadata(input)
            .with_context(|| format!("stat input: {}", input.display()))?;
        if meta.len() > self.cfg.limits.max_input_file_bytes {
            bail!(
                "input exceeds max_input_file_bytes ({} > {}): {}",
                meta.len(),
                self.cfg.limits.max_input_file_bytes,
                input.display()
            );
        }

        let req = layout_request(input, self.cfg.limits.max_pages);
        let out = self
            .engine
            .extract_layout(&req)
            .with_context(|| format!("layout extraction failed: {}", input.display()))?;
        if out.page_count > self.cfg.limits.max_pages {
            bail!(
                "document has {} pages, limit is {}: {}",
                out.page_count,
                self.cfg.limits.max_pages,
                input.display()
            );
        }
        for w in &out.warnings {
            warn!("{}: {}", input.display(), w);
        }
        info!("{}: {} pages", input.display(), out.page_count);
        Ok(DocumentLayout::from_engine(&file_name(input), out))
    }

    pub fn outline_document(&self, input: &Path) -> Result<Outline> {
        let started = Instant::now();
        let doc = self.load_document(input)?;
        let outline = self.classifier.classify(&doc)?;
        debug!(
            "{}: outline in {} ms",
            doc.name,
            started.elapsed().as_millis()
        );
        Ok(outline)
    }

    /// Writes `<stem>.json` into `out_dir` and returns its path.
    pub fn write_outline(&self, input: &Path, out_dir: &Path) -> Result<PathBuf> {
        let outline = self.outline_document(input)?;
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("input has no file name: {}", input.display()))?;
        ensure_dir(out_dir)?;
        let path = out_dir.join(format!("{stem}.json"));
        let report = OutlineReport::from(&outline);
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("write outline: {}", path.display()))?;
        info!(
            "{} -> {} ({} headings)",
            input.display(),
            path.display(),
            report.outline.len()
        );
        Ok(path)
    }

    pub fn document_sections(&self, input: &Path) -> Result<Vec<Section>> {
        let doc = self.load_document(input)?;
        let outline = self.classifier.classify(&doc)?;
        Ok(self
            .segmenter
            .segment(&doc.name, &doc.page_texts(), Some(&outline)))
    }

    /// Sections of every readable document, in input order. Failing
    /// documents are logged and skipped.
    pub fn collect_sections(&self, pdfs: &[PathBuf]) -> Vec<Section> {
        let mut all = Vec::new();
        for pdf in pdfs {
            match self.document_sections(pdf) {
                Ok(sections) if sections.is_empty() => {
                    warn!("{}: no text extracted, skipping", pdf.display());
                }
                Ok(sections) => all.extend(sections),
                Err(err) => warn!("skipping {}: {:#}", pdf.display(), err),
            }
        }
        all
    }

    pub fn rank_collection<R: Embedder>(
        &self,
        input_dir: &Path,
        ranker: &Ranker<R>,
    ) -> Result<RankingReport> {
        let persona = read_required(&input_dir.join(PERSONA_FILE))?;
        let job = read_required(&input_dir.join(JOB_FILE))?;

        let pdfs = list_pdfs(input_dir)?;
        let limits = &self.cfg.limits;
        if pdfs.len() < limits.min_documents || pdfs.len() > limits.max_documents {
            warn!(
                "collection has {} documents; expected {}..={}",
                pdfs.len(),
                limits.min_documents,
                limits.max_documents
            );
        }

        // Unreadable files are skipped here, before any layout work.
        let mut hashed = Vec::with_capacity(pdfs.len());
        let mut readable = Vec::with_capacity(pdfs.len());
        for p in &pdfs {
            match hash_file(p) {
                Ok(hash) => {
                    hashed.push((file_name(p), hash));
                    readable.push(p.clone());
                }
                Err(err) => warn!("skipping {}: {:#}", p.display(), err),
            }
        }
        let digest = input_digest(&persona, &job, &hashed);

        let sections = self.collect_sections(&readable);
        info!("{} sections from {} documents", sections.len(), readable.len());

        let query = ranker.query(&persona, &job);
        let ranking = ranker.rank(&query, sections)?;

        let metadata = RankingMetadata {
            input_documents: pdfs.iter().map(|p| file_name(p)).collect(),
            persona: query.persona.clone(),
            job_to_be_done: query.task.clone(),
            processing_timestamp: self.cfg.output.write_timestamp.then(now_rfc3339),
            input_digest: digest,
        };
        Ok(RankingReport::build(
            metadata,
            &ranking,
            self.cfg.output.include_scores,
        ))
    }
}

/// Hash over the query text and each input file's name and content hash.
pub fn input_digest(persona: &str, job: &str, files: &[(String, String)]) -> String {
    let mut buf = format!("persona:{}\njob:{}\n", persona.trim(), job.trim());
    for (name, hash) in files {
        buf.push_str(&format!("file:{name}:{hash}\n"));
    }
    sha256_hex(buf.as_bytes())
}

fn read_required(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let text = raw.trim();
    if text.is_empty() {
        bail!("{} is empty", path.display());
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_depends_on_every_input() {
        let files = vec![("a.pdf".to_string(), "h1".to_string())];
        let base = input_digest("p", "j", &files);
        assert_eq!(base, input_digest(" p ", "j\n", &files));
        assert_ne!(base, input_digest("p", "k", &files));
        let other = vec![("a.pdf".to_string(), "h2".to_string())];
        assert_ne!(base, input_digest("p", "j", &other));
    }
}
