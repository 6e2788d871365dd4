// Question pipeline: retrieve -> build prompt -> complete -> resolve source link
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::completion::{CompletionService, OllamaCompletion, RetryManager};
use crate::config::Config;
use crate::embedding::OllamaEmbedder;
use crate::errors::{QaError, Result};
use crate::links::{LinkResolver, SignedLinkResolver};
use crate::rag::prompt::{ContextBoundary, PromptBuilder};
use crate::rag::retrieval::{validate_question, Retriever};
use crate::store::{open_store, ScoredChunk};
use crate::telemetry::{timed, StageTimings};

/// Answer to one question
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Top-ranked chunk's document, None when nothing was retrieved
    pub source_identifier: Option<String>,
    pub source_link: Option<String>,
    /// Retrieved chunks in rank order
    pub sources: Vec<ScoredChunk>,
    pub timings: StageTimings,
}

impl Answer {
    /// Markdown link to the source document, if any
    pub fn source_markdown(&self) -> Option<String> {
        match (&self.source_identifier, &self.source_link) {
            (Some(id), Some(link)) => Some(format!("[{}]({})", id, link)),
            _ => None,
        }
    }
}

/// End-to-end question answering over one store
pub struct QaPipeline {
    retriever: Retriever,
    prompt_builder: PromptBuilder,
    completion: Arc<dyn CompletionService>,
    links: Arc<dyn LinkResolver>,
    model_name: String,
    top_k: usize,
}

impl QaPipeline {
    pub fn new(
        retriever: Retriever,
        completion: Arc<dyn CompletionService>,
        links: Arc<dyn LinkResolver>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            retriever,
            prompt_builder: PromptBuilder::default(),
            completion,
            links,
            model_name: model_name.into(),
            top_k: 3,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_context_boundary(mut self, boundary: ContextBoundary) -> Self {
        self.prompt_builder = PromptBuilder::new(boundary);
        self
    }

    /// Wire Ollama, the configured store and signed links from `config`
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let timeout = Duration::from_secs(config.ollama.request_timeout_secs);
        let retry = RetryManager::from_config(&config.retry);
        let base_url = config.ollama_url();

        let embedder = OllamaEmbedder::new(&base_url, &config.ollama.embedding_model, timeout)?
            .with_retry(retry.clone());
        let completion = OllamaCompletion::new(&base_url, timeout)?.with_retry(retry);
        let store = open_store(config).await?;
        let links = SignedLinkResolver::from_config(&config.links);

        Ok(Self::new(
            Retriever::new(Arc::new(embedder), store),
            Arc::new(completion),
            Arc::new(links),
            config.ollama.completion_model.clone(),
        )
        .with_top_k(config.retrieval.top_k)
        .with_context_boundary(config.retrieval.context_boundary))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer `question`; each stage runs after the previous one finishes
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let question = validate_question(question)?;
        if self.top_k == 0 {
            return Err(QaError::InvalidTopK(self.top_k));
        }
        let mut timings = StageTimings::default();

        let (retrieved, elapsed) = timed(self.retriever.retrieve(question, self.top_k)).await;
        timings.retrieval = elapsed;
        let retrieved = retrieved?;
        if retrieved.is_empty() {
            info!("no chunks retrieved, answering with empty context");
        }

        let start = Instant::now();
        let texts: Vec<&str> = retrieved.iter().map(|c| c.text.as_str()).collect();
        let prompt = self.prompt_builder.build_prompt(question, &texts);
        timings.prompt = start.elapsed();

        let (text, elapsed) = timed(self.completion.complete(&prompt, &self.model_name)).await;
        timings.completion = elapsed;
        let text = text?;

        let source_identifier = retrieved.first().map(|c| c.source_identifier.clone());
        let source_link = match &source_identifier {
            Some(id) => {
                let (link, elapsed) = timed(self.links.resolve(id)).await;
                timings.link = elapsed;
                Some(link?)
            }
            None => None,
        };

        debug!(%timings, chunks = retrieved.len(), "answered question");

        Ok(Answer {
            text: text.trim().to_string(),
            source_identifier,
            source_link,
            sources: retrieved,
            timings,
        })
    }
}
