//! The model handle and the seam the orchestrator calls it through.
//!
//! [`DocTagsModel`] is built once, before the first page, and borrowed by
//! every call afterwards. Anything that turns a [`PageImage`] into a tag
//! stream can stand in for it by implementing [`DocTagsGenerator`]; the
//! integration tests use a scripted generator instead of a live server.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::pipeline::encode::encode_page;
use crate::pipeline::render::PageImage;
use crate::prompts::DOCTAGS_PROMPT;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// Marker SmolDocling appends when generation ends cleanly.
pub const END_OF_UTTERANCE: &str = "<end_of_utterance>";

/// A tag stream as generated for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDocTags {
    /// Normalised model output: see [`normalize_output`].
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Produces a DocTags stream for a page image.
pub trait DocTagsGenerator {
    fn generate(
        &self,
        page: &PageImage,
    ) -> impl Future<Output = Result<RawDocTags, ExtractError>>;
}

/// Strip leading whitespace and the end-of-generation marker.
pub fn normalize_output(raw: &str) -> String {
    let text = raw.trim();
    text.strip_suffix(END_OF_UTTERANCE)
        .unwrap_or(text)
        .trim_end()
        .to_string()
}

/// SmolDocling reached through an `edgequake-llm` provider.
pub struct DocTagsModel {
    provider: Arc<dyn LLMProvider>,
    /// How the provider was chosen, for logs.
    source: String,
    model: String,
    prompt: String,
    options: CompletionOptions,
}

impl fmt::Debug for DocTagsModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocTagsModel")
            .field("source", &self.source)
            .field("model", &self.model)
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

impl DocTagsModel {
    /// Resolve a provider from `config` and build the handle.
    pub fn load(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let (provider, source) = resolve_provider(config)?;
        info!("Model ready: {} via {}", config.model, source);
        Ok(Self::from_parts(provider, source, config))
    }

    /// Wrap an already constructed provider.
    pub fn with_provider(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self::from_parts(provider, "custom".to_string(), config)
    }

    fn from_parts(provider: Arc<dyn LLMProvider>, source: String, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            source,
            model: config.model.clone(),
            prompt: config
                .prompt
                .clone()
                .unwrap_or_else(|| DOCTAGS_PROMPT.to_string()),
            options: build_options(config),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model
    }
}

impl DocTagsGenerator for DocTagsModel {
    /// One request per page: the image plus the conversion instruction.
    /// Failures are not retried.
    async fn generate(&self, page: &PageImage) -> Result<RawDocTags, ExtractError> {
        let image = encode_page(&page.image, page.page_num)?;
        let messages = vec![ChatMessage::user_with_images(self.prompt.as_str(), vec![image])];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| ExtractError::InferenceFailed {
                page: page.page_num,
                detail: e.to_string(),
            })?;

        debug!(
            "Page {}: {} input tokens, {} output tokens",
            page.page_num, response.prompt_tokens, response.completion_tokens
        );

        Ok(RawDocTags {
            text: normalize_output(&response.content),
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ModelNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the provider, from most specific to least specific:
///
/// 1. a pre-built provider on the config,
/// 2. `provider_name` + `model`,
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, both non-empty,
/// 4. `openai` when `OPENAI_API_KEY` is set (any OpenAI-compatible server
///    hosting SmolDocling, selected by the provider's base-URL variable),
/// 5. `ProviderFactory::from_env`.
fn resolve_provider(
    config: &ExtractionConfig,
) -> Result<(Arc<dyn LLMProvider>, String), ExtractError> {
    if let Some(ref provider) = config.provider {
        return Ok((Arc::clone(provider), "custom".to_string()));
    }

    if let Some(ref name) = config.provider_name {
        return Ok((create_provider(name, &config.model)?, name.clone()));
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return Ok((create_provider(&prov, &model)?, prov));
        }
    }

    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.is_empty() {
            return Ok((create_provider("openai", &config.model)?, "openai".to_string()));
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ModelNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No provider could be auto-detected from environment.\n\
                Point OPENAI_API_KEY and OPENAI_BASE_URL at a server hosting {}, \
                or pass --provider.\n\
                Error: {}",
                config.model, e
            ),
        })?;

    Ok((llm_provider, "auto".to_string()))
}
