//! Local sentence-transformer model run through ONNX Runtime on the CPU.

use super::Embedder;
use crate::config::Config;
use anyhow::{Context, Result, anyhow, bail};
use ndarray::{Array2, ArrayView3, Axis};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::{DynValue, Tensor};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;
use tracing::{debug, info};

pub struct OnnxEmbedder {
    session: Session,
    tokenizer: Tokenizer,
    max_seq_length: usize,
    batch_size: usize,
    wants_token_types: bool,
    model_path: PathBuf,
}

impl OnnxEmbedder {
    /// Loads model and tokenizer from `paths.model_dir`. Missing files are an
    /// error so a run fails before any document is read.
    pub fn load(cfg: &Config) -> Result<Self> {
        let dir = Path::new(&cfg.paths.model_dir);
        let model_path = dir.join(&cfg.embedding.model_file);
        let tokenizer_path = dir.join(&cfg.embedding.tokenizer_file);
        if !model_path.is_file() {
            bail!("ONNX model not found: {}", model_path.display());
        }
        if !tokenizer_path.is_file() {
            bail!("tokenizer not found: {}", tokenizer_path.display());
        }

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("loading tokenizer {}: {e}", tokenizer_path.display()))?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(cfg.embedding.intra_threads.max(1))?
            .commit_from_file(&model_path)
            .with_context(|| format!("loading ONNX model {}", model_path.display()))?;

        let wants_token_types = session.inputs.iter().any(|i| i.name == "token_type_ids");
        info!(
            "embedding model {} loaded (token_type_ids={})",
            model_path.display(),
            wants_token_types
        );

        Ok(Self {
            session,
            tokenizer,
            max_seq_length: cfg.embedding.max_sequence_length.max(8),
            batch_size: cfg.embedding.batch_size.max(1),
            wants_token_types,
            model_path,
        })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let encodings = texts
            .iter()
            .map(|t| {
                self.tokenizer
                    .encode(*t, true)
                    .map_err(|e| anyhow!("tokenizing input: {e}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let batch = encodings.len();
        let seq = encodings
            .iter()
            .map(|e| e.get_ids().len().min(self.max_seq_length))
            .max()
            .unwrap_or(1)
            .max(1);

        let mut ids = Array2::<i64>::zeros((batch, seq));
        let mut mask = Array2::<i64>::zeros((batch, seq));
        let mut types = Array2::<i64>::zeros((batch, seq));
        for (row, enc) in encodings.iter().enumerate() {
            let n = enc.get_ids().len().min(seq);
            for col in 0..n {
                ids[[row, col]] = enc.get_ids()[col] as i64;
                mask[[row, col]] = enc.get_attention_mask()[col] as i64;
                types[[row, col]] = enc.get_type_ids()[col] as i64;
            }
        }

        let mut inputs: Vec<(&str, DynValue)> = vec![
            ("input_ids", to_value(&ids)?),
            ("attention_mask", to_value(&mask)?),
        ];
        if self.wants_token_types {
            inputs.push(("token_type_ids", to_value(&types)?));
        }

        let outputs = self
            .session
            .run(inputs)
            .with_context(|| format!("running {}", self.model_path.display()))?;

        if let Some(pooled) = outputs.get("sentence_embedding") {
            let (shape, data) = pooled.try_extract_raw_tensor::<f32>()?;
            if shape.len() != 2 {
                bail!("unexpected sentence_embedding shape {shape:?}");
            }
            let dim = shape[1] as usize;
            if dim == 0 {
                bail!("model returned empty embeddings");
            }
            return Ok(data.chunks(dim).map(<[f32]>::to_vec).collect());
        }

        let hidden = outputs
            .get("last_hidden_state")
            .ok_or_else(|| anyhow!("model has neither sentence_embedding nor last_hidden_state"))?;
        let (shape, data) = hidden.try_extract_raw_tensor::<f32>()?;
        if shape.len() != 3 {
            bail!("unexpected last_hidden_state shape {shape:?}");
        }
        let dims = (shape[0] as usize, shape[1] as usize, shape[2] as usize);
        let hidden = ArrayView3::from_shape(dims, data)?;
        Ok(mean_pool(hidden, &mask))
    }
}

impl Embedder for OnnxEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            out.extend(self.embed_batch(chunk)?);
        }
        debug!("embedded {} texts", out.len());
        Ok(out)
    }
}

fn to_value(a: &Array2<i64>) -> Result<DynValue> {
    let shape = a.shape().to_vec();
    let data = a.iter().copied().collect::<Vec<_>>();
    Ok(Tensor::from_array((shape, data))?.into_dyn())
}

/// Attention-masked mean over tokens, L2-normalised.
fn mean_pool(hidden: ArrayView3<f32>, mask: &Array2<i64>) -> Vec<Vec<f32>> {
    hidden
        .axis_iter(Axis(0))
        .enumerate()
        .map(|(row, tokens)| {
            let dim = tokens.shape()[1];
            let mut sum = vec![0.0_f32; dim];
            let mut count = 0.0_f32;
            for (t, vec) in tokens.axis_iter(Axis(0)).enumerate() {
                if mask.get([row, t]).copied().unwrap_or(0) == 0 {
                    continue;
                }
                count += 1.0;
                for (s, v) in sum.iter_mut().zip(vec.iter()) {
                    *s += *v;
                }
            }
            let count = count.max(1e-9);
            sum.iter_mut().for_each(|s| *s /= count);
            let norm = sum.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > 0.0 {
                sum.iter_mut().for_each(|s| *s /= norm);
            }
            sum
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn mean_pool_ignores_padding() {
        let hidden = Array3::from_shape_vec(
            (1, 3, 2),
            vec![1.0, 0.0, 3.0, 0.0, 100.0, 100.0],
        )
        .unwrap();
        let mask = Array2::from_shape_vec((1, 3), vec![1, 1, 0]).unwrap();
        let pooled = mean_pool(hidden.view(), &mask);
        assert_eq!(pooled.len(), 1);
        assert!((pooled[0][0] - 1.0).abs() < 1e-6);
        assert!(pooled[0][1].abs() < 1e-6);
    }

    #[test]
    fn missing_model_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.paths.model_dir = dir.path().display().to_string();
        let err = OnnxEmbedder::load(&cfg).err().unwrap();
        assert!(err.to_string().contains("ONNX model not found"));
    }
}
