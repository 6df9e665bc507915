//! Pretrained sentiment strategy: a fine-tuned transformer classifier
//! shared process-wide.
//!
//! The default checkpoint is DistilBERT fine-tuned on SST-2, pulled from the
//! Hugging Face hub (or read from a local directory) and run on CPU with
//! candle. Loading it means downloading and mapping a few hundred megabytes,
//! so the model lives in a [`ModelSlot`]: the first classification triggers a
//! single load, concurrent first callers wait on that same load, and the
//! loaded instance is then reused for the rest of the process. A failed load
//! leaves the slot empty so a later call can try again.
//!
//! Every [`PretrainedBackend`] built with [`PretrainedBackend::new`] shares
//! one slot, so whichever loader initializes it first decides the model for
//! the whole process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use candle_core::{D, DType, Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder, ops::softmax};
use candle_transformers::models::distilbert::{Config as DistilBertConfig, DistilBertModel};
use hf_hub::api::tokio::ApiBuilder;
use hf_hub::{Repo, RepoType};
use serde::Deserialize;
use tokenizers::Tokenizer;
use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::bert::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::processors::bert::BertProcessing;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::SentimentBackend;
use crate::error::ClassificationError;
use crate::pipeline::types::{Sentiment, SentimentLabel};

/// Default binary sentiment checkpoint.
pub const DEFAULT_MODEL_REPO: &str = "distilbert/distilbert-base-uncased-finetuned-sst-2-english";

/// Default hub revision.
pub const DEFAULT_REVISION: &str = "main";

// ── Model trait ─────────────────────────────────────────────────────

/// A pretrained binary sentiment model.
///
/// `predict_batch` consumes the whole batch at once and must return one
/// prediction per input, in input order. Once loaded the model is shared
/// read-only across concurrent classifications, so implementations must be
/// reentrant; a model whose inference mutates internal state has to
/// serialize it behind its own mutex.
pub trait LabelModel: Send + Sync {
    fn name(&self) -> &str;

    fn predict_batch(&self, texts: &[&str]) -> Result<Vec<Sentiment>, ClassificationError>;
}

// ── Labels ──────────────────────────────────────────────────────────

/// Map a checkpoint's `id2label` onto the binary label set, indexed by class id.
///
/// Anything other than exactly one `POSITIVE` and one `NEGATIVE` class is
/// rejected; a neutral or third class never reaches the pipeline.
pub fn binary_labels(
    id2label: &HashMap<String, String>,
) -> Result<[SentimentLabel; 2], ClassificationError> {
    if id2label.len() != 2 {
        let mut names: Vec<&str> = id2label.values().map(String::as_str).collect();
        names.sort_unstable();
        return Err(ClassificationError::InvalidModel {
            reason: format!(
                "expected a binary classifier, found {} labels [{}]",
                id2label.len(),
                names.join(", ")
            ),
        });
    }

    let label_at = |id: &str| {
        let name = id2label
            .get(id)
            .ok_or_else(|| ClassificationError::InvalidModel {
                reason: format!("id2label has no class {id}"),
            })?;
        name.parse::<SentimentLabel>()
            .map_err(|reason| ClassificationError::InvalidModel { reason })
    };

    let labels = [label_at("0")?, label_at("1")?];
    if labels[0] == labels[1] {
        return Err(ClassificationError::InvalidModel {
            reason: format!("both classes are labelled {}", labels[0]),
        });
    }
    Ok(labels)
}

/// Pick the most probable class. Confidence is that class's probability.
///
/// An exact tie goes to `POSITIVE`.
fn sentiment_from_probs(
    probs: &[f32],
    labels: &[SentimentLabel; 2],
) -> Result<Sentiment, ClassificationError> {
    let [p0, p1] = probs else {
        return Err(ClassificationError::Inference(format!(
            "expected 2 class probabilities, got {}",
            probs.len()
        )));
    };

    let index = if p0 > p1 {
        0
    } else if p1 > p0 {
        1
    } else {
        labels
            .iter()
            .position(|l| *l == SentimentLabel::Positive)
            .unwrap_or(0)
    };
    Ok(Sentiment::new(labels[index], f64::from(probs[index])))
}

fn inference_error(e: candle_core::Error) -> ClassificationError {
    ClassificationError::Inference(e.to_string())
}

fn invalid_model(reason: impl Into<String>) -> ClassificationError {
    ClassificationError::InvalidModel {
        reason: reason.into(),
    }
}

// ── Transformer classifier ──────────────────────────────────────────

/// Classifier fields of `config.json` the encoder config does not expose.
#[derive(Debug, Deserialize)]
struct ClassifierConfigJson {
    dim: usize,
    max_position_embeddings: usize,
    #[serde(default)]
    id2label: HashMap<String, String>,
}

/// DistilBERT encoder with the sequence-classification head.
struct DistilBertHead {
    encoder: DistilBertModel,
    pre_classifier: Linear,
    classifier: Linear,
}

impl DistilBertHead {
    fn load(vb: VarBuilder, config: &DistilBertConfig, dim: usize) -> candle_core::Result<Self> {
        Ok(Self {
            encoder: DistilBertModel::load(vb.pp("distilbert"), config)?,
            pre_classifier: candle_nn::linear(dim, dim, vb.pp("pre_classifier"))?,
            classifier: candle_nn::linear(dim, 2, vb.pp("classifier"))?,
        })
    }

    /// Class probabilities, shape `(batch, 2)`.
    ///
    /// `pad_mask` is `(batch, 1, 1, seq)` with 1 on padding positions.
    fn forward(&self, input_ids: &Tensor, pad_mask: &Tensor) -> candle_core::Result<Tensor> {
        let hidden = self.encoder.forward(input_ids, pad_mask)?;
        let cls = hidden.i((.., 0))?;
        let pooled = self.pre_classifier.forward(&cls)?.relu()?;
        let logits = self.classifier.forward(&pooled)?;
        softmax(&logits, D::Minus1)
    }
}

/// Tokenizer definition shipped with a checkpoint.
#[derive(Debug, Clone)]
pub enum TokenizerFile {
    /// A serialized `tokenizer.json`.
    Json(PathBuf),
    /// A WordPiece `vocab.txt` for an uncased BERT tokenizer.
    Vocab(PathBuf),
}

/// Local paths of one checkpoint.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub weights: PathBuf,
    pub tokenizer: TokenizerFile,
}

/// A DistilBERT sequence classifier restricted to binary sentiment.
pub struct TransformerClassifier {
    name: String,
    model: DistilBertHead,
    tokenizer: Tokenizer,
    labels: [SentimentLabel; 2],
    max_len: usize,
    pad_id: u32,
    device: Device,
}

impl TransformerClassifier {
    /// Build a classifier from checkpoint files. CPU-bound; call off the runtime.
    pub fn from_files(name: impl Into<String>, files: &ModelFiles) -> Result<Self, ClassificationError> {
        let device = Device::Cpu;

        let config_str = std::fs::read_to_string(&files.config)
            .map_err(|e| invalid_model(format!("failed to read {}: {e}", files.config.display())))?;
        let config: DistilBertConfig = serde_json::from_str(&config_str)
            .map_err(|e| invalid_model(format!("unsupported model config: {e}")))?;
        let head: ClassifierConfigJson = serde_json::from_str(&config_str)
            .map_err(|e| invalid_model(format!("unsupported model config: {e}")))?;
        let labels = binary_labels(&head.id2label)?;

        let weights = if files.weights.extension().is_some_and(|e| e == "safetensors") {
            // SAFETY: the weights file is not modified while mapped.
            unsafe {
                VarBuilder::from_mmaped_safetensors(
                    std::slice::from_ref(&files.weights),
                    DType::F32,
                    &device,
                )
            }
        } else {
            VarBuilder::from_pth(&files.weights, DType::F32, &device)
        };
        let vb = weights.map_err(|e| invalid_model(format!("failed to read weights: {e}")))?;

        let model = DistilBertHead::load(vb, &config, head.dim)
            .map_err(|e| invalid_model(format!("weights do not match config: {e}")))?;
        let tokenizer = load_tokenizer(&files.tokenizer)?;
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);

        Ok(Self {
            name: name.into(),
            model,
            tokenizer,
            labels,
            max_len: head.max_position_embeddings,
            pad_id,
            device,
        })
    }

    fn encode(&self, text: &str) -> Result<Vec<u32>, ClassificationError> {
        let encoding = self.tokenizer.encode(text, true).map_err(|e| {
            ClassificationError::Inference(format!(
                "tokenization failed on '{}': {e}",
                text.chars().take(50).collect::<String>()
            ))
        })?;
        Ok(truncate_ids(encoding.get_ids().to_vec(), self.max_len))
    }
}

/// Cut to `max_len` tokens, keeping the trailing separator.
fn truncate_ids(mut ids: Vec<u32>, max_len: usize) -> Vec<u32> {
    if ids.len() <= max_len {
        return ids;
    }
    let last = ids[ids.len() - 1];
    ids.truncate(max_len.saturating_sub(1));
    ids.push(last);
    ids
}

impl LabelModel for TransformerClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_batch(&self, texts: &[&str]) -> Result<Vec<Sentiment>, ClassificationError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let rows = texts
            .iter()
            .map(|text| self.encode(text))
            .collect::<Result<Vec<_>, _>>()?;
        let seq_len = rows.iter().map(Vec::len).max().unwrap_or(0);

        let mut input_ids: Vec<u32> = Vec::with_capacity(rows.len() * seq_len);
        let mut pad_mask: Vec<u8> = Vec::with_capacity(rows.len() * seq_len);
        for row in &rows {
            let padding = seq_len - row.len();
            input_ids.extend(row);
            input_ids.extend(std::iter::repeat_n(self.pad_id, padding));
            pad_mask.extend(std::iter::repeat_n(0u8, row.len()));
            pad_mask.extend(std::iter::repeat_n(1u8, padding));
        }

        let batch = rows.len();
        let input_ids =
            Tensor::from_vec(input_ids, (batch, seq_len), &self.device).map_err(inference_error)?;
        let pad_mask = Tensor::from_vec(pad_mask, (batch, 1, 1, seq_len), &self.device)
            .map_err(inference_error)?;

        let probs = self
            .model
            .forward(&input_ids, &pad_mask)
            .and_then(|p| p.to_vec2::<f32>())
            .map_err(inference_error)?;

        probs
            .iter()
            .map(|row| sentiment_from_probs(row, &self.labels))
            .collect()
    }
}

fn load_tokenizer(file: &TokenizerFile) -> Result<Tokenizer, ClassificationError> {
    match file {
        TokenizerFile::Json(path) => Tokenizer::from_file(path).map_err(|e| {
            invalid_model(format!("failed to load tokenizer {}: {e}", path.display()))
        }),
        TokenizerFile::Vocab(path) => wordpiece_tokenizer(path),
    }
}

/// Uncased BERT tokenizer over a WordPiece vocabulary.
fn wordpiece_tokenizer(vocab: &Path) -> Result<Tokenizer, ClassificationError> {
    let vocab_str = vocab
        .to_str()
        .ok_or_else(|| invalid_model(format!("non UTF-8 vocabulary path {}", vocab.display())))?;
    let wordpiece = WordPiece::from_file(vocab_str)
        .unk_token("[UNK]".to_string())
        .build()
        .map_err(|e| invalid_model(format!("failed to load vocabulary: {e}")))?;

    let mut tokenizer = Tokenizer::new(wordpiece);
    let special = |token: &str| {
        tokenizer
            .token_to_id(token)
            .ok_or_else(|| invalid_model(format!("vocabulary has no {token} token")))
    };
    let sep = special("[SEP]")?;
    let cls = special("[CLS]")?;

    tokenizer
        .with_normalizer(Some(BertNormalizer::new(true, true, None, true)))
        .with_pre_tokenizer(Some(BertPreTokenizer))
        .with_post_processor(Some(BertProcessing::new(
            ("[SEP]".to_string(), sep),
            ("[CLS]".to_string(), cls),
        )));
    Ok(tokenizer)
}

// ── Loading ─────────────────────────────────────────────────────────

/// Something that can materialize a [`LabelModel`].
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Human-readable origin, for logs and errors.
    fn describe(&self) -> String;

    async fn load(&self) -> Result<Arc<dyn LabelModel>, ClassificationError>;
}

/// Where checkpoint files come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// A Hugging Face hub repository. `endpoint` overrides the hub URL.
    Hub {
        repo: String,
        revision: String,
        endpoint: Option<String>,
    },
    /// A local directory holding `config.json`, weights and a tokenizer.
    Local(PathBuf),
}

impl Default for ModelSource {
    fn default() -> Self {
        Self::Hub {
            repo: DEFAULT_MODEL_REPO.to_string(),
            revision: DEFAULT_REVISION.to_string(),
            endpoint: None,
        }
    }
}

impl ModelSource {
    /// `"default"`, a hub id (`owner/name` or `owner/name@revision`), or a
    /// local directory.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("default") {
            return Self::default();
        }

        let looks_local = Path::new(value).is_dir()
            || value.starts_with(['.', '/', '~'])
            || value.matches('/').count() != 1;
        if looks_local {
            return Self::Local(PathBuf::from(value));
        }

        let (repo, revision) = value.split_once('@').unwrap_or((value, DEFAULT_REVISION));
        Self::Hub {
            repo: repo.to_string(),
            revision: revision.to_string(),
            endpoint: None,
        }
    }

    /// Point a hub source at a mirror. Local sources are unchanged.
    pub fn with_endpoint(self, url: impl Into<String>) -> Self {
        match self {
            Self::Hub { repo, revision, .. } => Self::Hub {
                repo,
                revision,
                endpoint: Some(url.into()),
            },
            local => local,
        }
    }

    fn unavailable(&self, reason: impl Into<String>) -> ClassificationError {
        ClassificationError::BackendUnavailable {
            backend: format!("pretrained ({})", self.describe()),
            reason: reason.into(),
        }
    }

    /// Resolve checkpoint files, downloading into the hub cache if needed.
    async fn fetch_files(&self) -> Result<ModelFiles, ClassificationError> {
        match self {
            Self::Local(dir) => self.local_files(dir),
            Self::Hub {
                repo,
                revision,
                endpoint,
            } => {
                let mut builder = ApiBuilder::from_env().with_progress(false);
                if let Some(endpoint) = endpoint {
                    builder = builder.with_endpoint(endpoint.clone());
                }
                let api = builder
                    .build()
                    .map_err(|e| self.unavailable(format!("failed to initialize hub client: {e}")))?;
                let hub = api.repo(Repo::with_revision(
                    repo.clone(),
                    RepoType::Model,
                    revision.clone(),
                ));

                let config = hub
                    .get("config.json")
                    .await
                    .map_err(|e| self.unavailable(format!("failed to download config.json: {e}")))?;
                let weights = match hub.get("model.safetensors").await {
                    Ok(path) => path,
                    Err(_) => hub.get("pytorch_model.bin").await.map_err(|e| {
                        self.unavailable(format!("failed to download weights: {e}"))
                    })?,
                };
                let tokenizer = match hub.get("tokenizer.json").await {
                    Ok(path) => TokenizerFile::Json(path),
                    Err(_) => TokenizerFile::Vocab(hub.get("vocab.txt").await.map_err(|e| {
                        self.unavailable(format!("failed to download tokenizer: {e}"))
                    })?),
                };

                Ok(ModelFiles {
                    config,
                    weights,
                    tokenizer,
                })
            }
        }
    }

    fn local_files(&self, dir: &Path) -> Result<ModelFiles, ClassificationError> {
        let first = |names: &[&str]| names.iter().map(|n| dir.join(n)).find(|p| p.is_file());
        let missing = |what: &str| self.unavailable(format!("{} has no {what}", dir.display()));

        let config = first(&["config.json"]).ok_or_else(|| missing("config.json"))?;
        let weights = first(&["model.safetensors", "pytorch_model.bin"])
            .ok_or_else(|| missing("model weights"))?;
        let tokenizer = match first(&["tokenizer.json"]) {
            Some(path) => TokenizerFile::Json(path),
            None => TokenizerFile::Vocab(
                first(&["vocab.txt"]).ok_or_else(|| missing("tokenizer.json or vocab.txt"))?,
            ),
        };

        Ok(ModelFiles {
            config,
            weights,
            tokenizer,
        })
    }
}

#[async_trait]
impl ModelLoader for ModelSource {
    fn describe(&self) -> String {
        match self {
            Self::Hub { repo, revision, .. } => format!("{repo}@{revision}"),
            Self::Local(dir) => dir.display().to_string(),
        }
    }

    async fn load(&self) -> Result<Arc<dyn LabelModel>, ClassificationError> {
        let files = self.fetch_files().await?;
        debug!(config = %files.config.display(), weights = %files.weights.display(), "Resolved model files");

        let name = self.describe();
        let model = tokio::task::spawn_blocking(move || TransformerClassifier::from_files(name, &files))
            .await
            .map_err(|e| self.unavailable(format!("model load task failed: {e}")))??;
        Ok(Arc::new(model))
    }
}

// ── Model slot ──────────────────────────────────────────────────────

/// Lazily initialized, never invalidated home for a loaded model.
pub struct ModelSlot {
    cell: OnceCell<Arc<dyn LabelModel>>,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Return the loaded model, loading it through `loader` on first use.
    ///
    /// Concurrent first callers share a single in-flight load.
    pub async fn get_or_load(
        &self,
        loader: &dyn ModelLoader,
    ) -> Result<Arc<dyn LabelModel>, ClassificationError> {
        self.cell
            .get_or_try_init(|| async {
                let source = loader.describe();
                info!(source = %source, "Initializing pretrained sentiment model");
                let model = loader.load().await?;
                info!(source = %source, model = model.name(), "Pretrained sentiment model ready");
                Ok::<_, ClassificationError>(model)
            })
            .await
            .cloned()
    }
}

impl Default for ModelSlot {
    fn default() -> Self {
        Self::new()
    }
}

static SHARED_SLOT: LazyLock<Arc<ModelSlot>> = LazyLock::new(|| Arc::new(ModelSlot::new()));

/// The process-wide model slot.
pub fn shared_slot() -> Arc<ModelSlot> {
    Arc::clone(&SHARED_SLOT)
}

// ── Backend ─────────────────────────────────────────────────────────

/// Backend that classifies with a pretrained [`LabelModel`].
pub struct PretrainedBackend {
    loader: Arc<dyn ModelLoader>,
    slot: Arc<ModelSlot>,
}

impl PretrainedBackend {
    /// Backend using the process-wide model slot.
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self::with_slot(loader, shared_slot())
    }

    /// Backend using its own slot.
    pub fn with_slot(loader: Arc<dyn ModelLoader>, slot: Arc<ModelSlot>) -> Self {
        Self { loader, slot }
    }
}

#[async_trait]
impl SentimentBackend for PretrainedBackend {
    fn name(&self) -> &str {
        "pretrained"
    }

    async fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Sentiment>, ClassificationError> {
        let model = self.slot.get_or_load(self.loader.as_ref()).await?;
        debug!(count = texts.len(), model = model.name(), "Running batch inference");

        // Inference is CPU-bound; keep it off the async workers.
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        tokio::task::spawn_blocking(move || {
            let texts: Vec<&str> = owned.iter().map(String::as_str).collect();
            model.predict_batch(&texts)
        })
        .await
        .map_err(|e| ClassificationError::Inference(format!("inference task failed: {e}")))?
    }
}
