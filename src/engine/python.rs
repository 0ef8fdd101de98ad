use super::{LayoutEngine, types::*};
use crate::config::Config;
use anyhow::{Context, Result, anyhow};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const LAYOUT_SCRIPT: &str = "pdf_layout.py";

/// Runs `scripts/pdf_layout.py` (PyMuPDF) as a JSON-over-stdio subprocess.
pub struct PythonEngine {
    cfg: Config,
    script: PathBuf,
    python_exe: PathBuf,
}

impl PythonEngine {
    pub fn new(cfg: &Config) -> Result<Self> {
        let scripts_dir = PathBuf::from(&cfg.paths.scripts_dir);
        if cfg.security.pin_scripts_dir {
            let cwd = std::env::current_dir().with_context(|| "current_dir")?;
            let canon = scripts_dir
                .canonicalize()
                .with_context(|| format!("canonicalize scripts_dir: {}", scripts_dir.display()))?;
            if !canon.starts_with(&cwd) {
                return Err(anyhow!(
                    "scripts_dir is outside cwd while pin_scripts_dir=true: {}",
                    canon.display()
                ));
            }
        }
        let script = scripts_dir.join(LAYOUT_SCRIPT);
        if !script.exists() {
            return Err(anyhow!("missing script: {}", script.display()));
        }
        let python_exe = resolve_python_exe(&cfg.engine.python_exe);
        Ok(Self {
            cfg: cfg.clone(),
            script,
            python_exe,
        })
    }

    fn run_json<I: serde::Serialize, O: for<'de> serde::Deserialize<'de>>(
        &self,
        input: &I,
        timeout_seconds: Option<u64>,
    ) -> Result<O> {
        debug!(
            "python run {} timeout={:?}",
            self.script.display(),
            timeout_seconds
        );
        let mut cmd = Command::new(&self.python_exe);
        cmd.arg(&self.script);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        for (k, v) in &self.cfg.engine.env {
            cmd.env(k, v);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning python: {}", self.script.display()))?;

        {
            let mut stdin = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
            let bytes = serde_json::to_vec(input)?;
            use std::io::Write;
            stdin.write_all(&bytes)?;
            stdin.flush().ok();
        }

        let output = if let Some(secs) = timeout_seconds {
            wait_with_timeout(&mut child, Duration::from_secs(secs))?
        } else {
            child
                .wait_with_output()
                .with_context(|| "waiting for python")?
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "python script failed: {}\n{}",
                self.script.display(),
                stderr
            ));
        }

        if self.cfg.engine.keep_python_stderr && !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("python stderr {}: {}", self.script.display(), stderr.trim());
        }

        let out: O = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("parsing python JSON output: {}", self.script.display()))?;
        Ok(out)
    }

    fn timeout(&self) -> Option<u64> {
        if self.cfg.engine.layout_timeout_seconds > 0 {
            Some(self.cfg.engine.layout_timeout_seconds)
        } else {
            None
        }
    }
}

fn resolve_python_exe(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Ok(env_val) = std::env::var("PDFSENSE_PYTHON") {
            let p = expand_tilde(&env_val);
            if p.exists() {
                return p;
            }
        }
        return PathBuf::from("python3");
    }
    expand_tilde(raw)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

impl LayoutEngine for PythonEngine {
    fn doctor(&self) -> Result<DocDiag> {
        self.run_json::<serde_json::Value, DocDiag>(&serde_json::json!({"cmd": "doctor"}), Some(30))
    }

    fn extract_layout(&self, req: &LayoutIn) -> Result<LayoutOut> {
        let out: LayoutOut = self.run_json(
            &serde_json::json!({"cmd": "layout", "req": req}),
            self.timeout(),
        )?;
        if let Some(err) = out.error.as_deref() {
            return Err(anyhow!("pdf_layout error for {}: {err}", req.input_pdf));
        }
        if !out.ok {
            warn!("layout extraction returned ok=false for {}", req.input_pdf);
        }
        Ok(out)
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output> {
    // Drain pipes while waiting so a large layout dump can't block the child
    // on a full stdout buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf).with_context(|| "read stdout")?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf).with_context(|| "read stderr")?;
        }
        Ok(buf)
    });

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            let stdout = stdout_thread
                .join()
                .map_err(|_| anyhow!("stdout reader thread panicked"))??;
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))??;
            return Ok(Output {
                status,
                stdout,
                stderr,
            });
        }

        if start.elapsed() > timeout {
            warn!("python process timed out after {:?}", timeout);
            let _ = child.kill();
            child.wait().with_context(|| "wait after kill")?;
            let _ = stdout_thread.join();
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))??;
            return Err(anyhow!(
                "python process exceeded timeout ({:?}); stderr: {}",
                timeout,
                String::from_utf8_lossy(&stderr)
            ));
        }

        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Used by `doctor` output and logs.
pub fn script_path(cfg: &Config) -> PathBuf {
    Path::new(&cfg.paths.scripts_dir).join(LAYOUT_SCRIPT)
}
