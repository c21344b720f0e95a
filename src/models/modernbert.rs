use candle_core::{DType, Device, Tensor, D};
use candle_nn::{ops::softmax, VarBuilder};
use candle_transformers::models::modernbert::{
    ClassifierConfig, ClassifierPooling, Config,
    ModernBertForSequenceClassification as CandleModernBertForSequenceClassification,
};
use hf_hub::{api::sync::Api, Repo, RepoType};
use serde::Deserialize;
use std::collections::HashMap;
use tokenizers::{Encoding, Tokenizer};

use crate::error::{PipelineError, Result};
use crate::pipelines::sentiment::{Classification, SentimentClassifier, SentimentLabel};

/// Available ModernBERT model sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModernBertSize {
    /// Base model (~150M parameters).
    Base,
    /// Large model (~400M parameters).
    Large,
}

impl ModernBertSize {
    fn repo_id(&self) -> &'static str {
        match self {
            ModernBertSize::Base => "clapAI/modernBERT-base-multilingual-sentiment",
            ModernBertSize::Large => "clapAI/modernBERT-large-multilingual-sentiment",
        }
    }
}

impl std::fmt::Display for ModernBertSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModernBertSize::Base => "modernbert-base",
            ModernBertSize::Large => "modernbert-large",
        };
        write!(f, "{name}")
    }
}

/// ModernBERT fine-tuned for sentiment, emitting `positive`, `negative`, and `neutral`.
///
/// Weights and tokenizer are fetched from the HuggingFace Hub and cached locally.
pub struct ModernBertClassifier {
    model: CandleModernBertForSequenceClassification,
    tokenizer: Tokenizer,
    device: Device,
    id2label: HashMap<String, String>,
}

impl ModernBertClassifier {
    /// Download (or reuse from cache) and load the model on `device`.
    pub fn new(size: ModernBertSize, device: Device) -> Result<Self> {
        let repo_id = size.repo_id();

        let (config, vb, id2label) = load_classifier_model(repo_id, &device)?;
        let model = CandleModernBertForSequenceClassification::load(vb, &config)?;
        let tokenizer = load_tokenizer(repo_id)?;

        Ok(Self {
            model,
            tokenizer,
            device,
            id2label,
        })
    }

    /// Returns the device (CPU/GPU) the model is running on.
    pub fn device(&self) -> &Device {
        &self.device
    }

    fn encode(&self, text: &str) -> Result<Encoding> {
        self.tokenizer.encode(text, true).map_err(|e| {
            PipelineError::Tokenization(format!(
                "Tokenization failed on '{}': {}",
                &text.chars().take(50).collect::<String>(),
                e
            ))
        })
    }

    fn label_for(&self, pred_id: u32, score: f32) -> Result<Classification> {
        let raw = self.id2label.get(&pred_id.to_string()).ok_or_else(|| {
            let available: Vec<&str> = self.id2label.values().map(String::as_str).collect();
            PipelineError::Classification(format!(
                "Predicted label ID {} not in id2label. Available: {}",
                pred_id,
                available.join(", ")
            ))
        })?;
        Ok(Classification::new(
            SentimentLabel::parse_model_label(raw)?,
            score,
        ))
    }

    fn pad_token_id(&self) -> u32 {
        self.tokenizer
            .get_padding()
            .map(|p| p.pad_id)
            .or_else(|| self.tokenizer.token_to_id("<pad>"))
            .or_else(|| self.tokenizer.token_to_id("[PAD]"))
            .unwrap_or(0)
    }
}

impl SentimentClassifier for ModernBertClassifier {
    fn classify(&self, text: &str) -> Result<Classification> {
        let tokens = self.encode(text)?;

        let input_ids = Tensor::new(tokens.get_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask =
            Tensor::new(tokens.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let logits = self.model.forward(&input_ids, &attention_mask)?;
        let pred_id = logits.argmax(D::Minus1)?.squeeze(0)?.to_scalar::<u32>()?;

        let probs = softmax(&logits, D::Minus1)?;
        let probs_vec = probs.squeeze(0)?.to_vec1::<f32>()?;
        let score = probs_vec.get(pred_id as usize).copied().unwrap_or(0.0);

        self.label_for(pred_id, score)
    }

    /// Pads all tokenizable texts into one forward pass. Texts that fail to tokenize get
    /// their own error without affecting the rest.
    fn classify_batch(&self, texts: &[&str]) -> Result<Vec<Result<Classification>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut results: Vec<Result<Classification>> = Vec::with_capacity(texts.len());
        let mut valid: Vec<(usize, Encoding)> = Vec::with_capacity(texts.len());

        for (i, text) in texts.iter().enumerate() {
            match self.encode(text) {
                Ok(encoding) => {
                    valid.push((i, encoding));
                    results.push(Err(PipelineError::Unexpected(
                        "Model returned no prediction".into(),
                    )));
                }
                Err(e) => results.push(Err(e)),
            }
        }

        if valid.is_empty() {
            return Ok(results);
        }

        let pad_token_id = self.pad_token_id();
        let max_len = valid.iter().map(|(_, e)| e.len()).max().unwrap_or(0);

        let mut all_token_ids: Vec<u32> = Vec::with_capacity(valid.len() * max_len);
        let mut all_attention_masks: Vec<u32> = Vec::with_capacity(valid.len() * max_len);

        for (_, encoding) in &valid {
            let mut token_ids = encoding.get_ids().to_vec();
            let mut attention_mask = encoding.get_attention_mask().to_vec();
            token_ids.resize(max_len, pad_token_id);
            attention_mask.resize(max_len, 0);
            all_token_ids.extend(token_ids);
            all_attention_masks.extend(attention_mask);
        }

        let batch_size = valid.len();
        let input_ids = Tensor::from_vec(all_token_ids, (batch_size, max_len), &self.device)?;
        let attention_mask =
            Tensor::from_vec(all_attention_masks, (batch_size, max_len), &self.device)?;

        let logits = self.model.forward(&input_ids, &attention_mask)?;
        let probs = softmax(&logits, D::Minus1)?;
        let pred_ids = logits.argmax(D::Minus1)?.to_vec1::<u32>()?;
        let probs_2d = probs.to_vec2::<f32>()?;

        for (batch_idx, (orig_idx, _)) in valid.iter().enumerate() {
            let pred_id = pred_ids[batch_idx];
            let score = probs_2d[batch_idx]
                .get(pred_id as usize)
                .copied()
                .unwrap_or(0.0);
            results[*orig_idx] = self.label_for(pred_id, score);
        }

        Ok(results)
    }
}

fn load_tokenizer(repo_id: &str) -> Result<Tokenizer> {
    let api = Api::new()?;
    let repo = api.repo(Repo::new(repo_id.to_string(), RepoType::Model));
    let tokenizer_path = repo.get("tokenizer.json")?;
    let path_str = tokenizer_path.display().to_string();
    Tokenizer::from_file(&tokenizer_path).map_err(|e| {
        PipelineError::Tokenization(format!(
            "Failed to load tokenizer from '{}': {}",
            path_str, e
        ))
    })
}

#[derive(Deserialize)]
struct ClassifierConfigJson {
    #[serde(default)]
    id2label: HashMap<String, String>,
    #[serde(default)]
    label2id: HashMap<String, u32>,
}

fn patch_config_num_labels(config: &mut Config, num_labels: usize) {
    let configured = config
        .classifier_config
        .as_ref()
        .map(|c| c.id2label.len())
        .unwrap_or(0);

    if configured != num_labels {
        let id2label: HashMap<String, String> = (0..num_labels)
            .map(|i| (i.to_string(), format!("label_{i}")))
            .collect();
        let label2id: HashMap<String, String> = id2label
            .iter()
            .map(|(k, v)| (v.clone(), k.clone()))
            .collect();

        config.classifier_config = Some(ClassifierConfig {
            id2label,
            label2id,
            classifier_pooling: ClassifierPooling::default(),
        });
    }
}

fn load_classifier_model(
    repo_id: &str,
    device: &Device,
) -> Result<(Config, VarBuilder<'static>, HashMap<String, String>)> {
    let api = Api::new()?;
    let repo = api.repo(Repo::new(repo_id.to_string(), RepoType::Model));

    let config_path = repo.get("config.json")?;
    let weights_path = repo
        .get("model.safetensors")
        .or_else(|_| repo.get("pytorch_model.bin"))?;

    let config_str = std::fs::read_to_string(&config_path)?;
    let mut config: Config = serde_json::from_str(&config_str)?;
    let class_cfg: ClassifierConfigJson = serde_json::from_str(&config_str)?;

    let num_labels = class_cfg.label2id.len().max(class_cfg.id2label.len());
    patch_config_num_labels(&mut config, num_labels);

    let vb = if weights_path.extension().is_some_and(|e| e == "safetensors") {
        unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)? }
    } else {
        VarBuilder::from_pth(&weights_path, DType::F32, device)?
    };

    Ok((config, vb, class_cfg.id2label))
}
