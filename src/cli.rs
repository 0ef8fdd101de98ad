use crate::{
    config::Config,
    embed::OnnxEmbedder,
    engine::{LayoutEngine, python::PythonEngine},
    pipeline::Pipeline,
    rank::Ranker,
    util::{ensure_dir, list_pdfs},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG_FILE: &str = "pdfsense.toml";
const EXAMPLE_CONFIG_FILE: &str = "pdfsense.example.toml";
const LOG_FILE: &str = "pdfsense.log";

#[derive(Parser, Debug)]
#[command(name = "pdfsense")]
#[command(about = "PDF outline extraction and persona-driven section ranking")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./pdfsense.toml if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check the layout engine (python + PyMuPDF).
    Doctor {},
    /// Extract title and headings from a PDF or every PDF in a directory.
    Outline {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Rank the sections of a document collection for a persona and task.
    Rank {
        #[arg(long)]
        input_dir: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref())? {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    match &args.cmd {
        Command::Doctor {} => doctor(&cfg),
        Command::Outline { input, out_dir } => outline(&cfg, input, out_dir.as_deref()),
        Command::Rank { input_dir, out } => rank(&cfg, input_dir, out.as_deref()),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(p) = user {
        if !p.exists() {
            return Err(anyhow!("config file not found: {}", p.display()));
        }
        return Ok(Some(p.to_path_buf()));
    }
    Ok([CONFIG_FILE, EXAMPLE_CONFIG_FILE]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists()))
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the JSON results, so logs go to stderr
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn doctor(cfg: &Config) -> Result<()> {
    let engine = PythonEngine::new(cfg)?;
    let diag = engine.doctor()?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "engine": diag,
            "script": crate::engine::python::script_path(cfg),
            "model_dir": cfg.paths.model_dir,
        }))?
    );
    Ok(())
}

fn outline(cfg: &Config, input: &Path, out_override: Option<&Path>) -> Result<()> {
    let out_dir = out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.out_dir));
    ensure_dir(&out_dir)?;
    dump_effective_config(cfg, &out_dir)?;

    let engine = PythonEngine::new(cfg)?;
    let pipeline = Pipeline::new(cfg, engine);

    let mut written = Vec::new();
    let mut skipped = Vec::new();
    if input.is_dir() {
        let pdfs = list_pdfs(input)?;
        if pdfs.is_empty() {
            warn!("no PDF files in {}", input.display());
        }
        for pdf in &pdfs {
            if let Err(err) = validate_input(cfg, pdf) {
                warn!("skipping {}: {:#}", pdf.display(), err);
                skipped.push(pdf.clone());
                continue;
            }
            match pipeline.write_outline(pdf, &out_dir) {
                Ok(path) => written.push(path),
                Err(err) => {
                    warn!("skipping {}: {:#}", pdf.display(), err);
                    skipped.push(pdf.clone());
                }
            }
        }
    } else {
        validate_input(cfg, input)?;
        written.push(pipeline.write_outline(input, &out_dir)?);
    }

    info!("wrote {} outlines, skipped {}", written.len(), skipped.len());
    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "outputs": written,
                "skipped": skipped,
                "status": "ok"
            }))?
        );
    }
    Ok(())
}

fn rank(cfg: &Config, input_dir: &Path, out_override: Option<&Path>) -> Result<()> {
    let input_str = input_dir.display().to_string();
    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are disabled: {input_str}"));
    }
    if !input_dir.is_dir() {
        return Err(anyhow!("input directory does not exist: {}", input_dir.display()));
    }

    let out_path = out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.out_dir).join(&cfg.output.ranking_filename));
    let out_dir = out_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    ensure_dir(out_dir)?;
    dump_effective_config(cfg, out_dir)?;

    // The model is loaded before any document is touched.
    let embedder = OnnxEmbedder::load(cfg).with_context(|| "loading embedding model")?;
    let ranker = Ranker::new(&cfg.ranking, embedder);

    let engine = PythonEngine::new(cfg)?;
    let pipeline = Pipeline::new(cfg, engine);
    let report = pipeline.rank_collection(input_dir, &ranker)?;

    std::fs::write(&out_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("write ranking: {}", out_path.display()))?;
    info!("ranking written to {}", out_path.display());

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "output": out_path,
                "documents": report.metadata.input_documents.len(),
                "sections": report.extracted_sections.len(),
                "subsections": report.subsection_analysis.len(),
                "status": "ok"
            }))?
        );
    }
    Ok(())
}

fn dump_effective_config(cfg: &Config, dir: &Path) -> Result<()> {
    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).with_context(|| "serializing config")?;
        std::fs::write(dir.join("effective-config.toml"), raw)?;
    }
    Ok(())
}

fn validate_input(cfg: &Config, input: &Path) -> Result<()> {
    let input_str = input.display().to_string();

    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are disabled: {input_str}"));
    }

    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    if let Some(ext) = input.extension().and_then(|s| s.to_str()) {
        if !ext.eq_ignore_ascii_case("pdf") {
            return Err(anyhow!("input is not a PDF: {}", input.display()));
        }
    } else {
        warn!("input has no extension; assuming PDF: {}", input.display());
    }

    Ok(())
}

fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    Some(PathBuf::from(&cfg.paths.out_dir).join(LOG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_inputs_are_recognised() {
        assert!(looks_like_url("HTTPS://example.org/a.pdf"));
        assert!(looks_like_url("file:///tmp/a.pdf"));
        assert!(!looks_like_url("docs/a.pdf"));
    }

    #[test]
    fn non_pdf_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "x").unwrap();
        assert!(validate_input(&Config::default(), &txt).is_err());
        let pdf = dir.path().join("doc.PDF");
        std::fs::write(&pdf, "x").unwrap();
        assert!(validate_input(&Config::default(), &pdf).is_ok());
    }

    #[test]
    fn parses_subcommands() {
        let args = Args::try_parse_from([
            "pdfsense",
            "--log-level",
            "debug",
            "rank",
            "--input-dir",
            "collection",
        ])
        .unwrap();
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(matches!(args.cmd, Command::Rank { .. }));
    }
}
