//! Interactive question loop
//! 
//! Reads questions with rustyline, answers them through the pipeline one at
//! a time, and keeps the last answer's sources for `/sources`.

pub mod commands;
pub mod display;
pub mod input;

use anyhow::Result;
use std::path::PathBuf;

use crate::cli::Verbosity;
use crate::rag::{Answer, QaPipeline};
use crate::repl::commands::{is_command, Command};
pub use crate::repl::display::DisplayManager;
use crate::repl::input::InputHandler;

pub struct ReplSession {
    input_handler: InputHandler,
    display_manager: DisplayManager,
    verbosity: Verbosity,
    last_answer: Option<Answer>,
}

impl ReplSession {
    pub fn new(verbosity: Verbosity) -> Result<Self> {
        Ok(Self::from_parts(InputHandler::new()?, verbosity))
    }

    /// Session with persistent history
    pub fn with_history(history_path: PathBuf, verbosity: Verbosity) -> Result<Self> {
        Ok(Self::from_parts(InputHandler::with_history(history_path)?, verbosity))
    }

    fn from_parts(input_handler: InputHandler, verbosity: Verbosity) -> Self {
        ReplSession {
            input_handler,
            display_manager: DisplayManager::new(verbosity.show_progress()),
            verbosity,
            last_answer: None,
        }
    }

    /// Read-answer loop until `/exit` or Ctrl-D
    pub async fn run(&mut self, pipeline: &QaPipeline, version: &str) -> Result<()> {
        self.show_startup(pipeline, version).await;

        while let Some(line) = self.input_handler.read_line()? {
            if !self.handle_input(pipeline, &line).await? {
                break;
            }
        }

        self.input_handler.save_history()?;
        Ok(())
    }

    /// Banner plus a note about the store; returns the chunk count when readable
    pub async fn show_startup(&mut self, pipeline: &QaPipeline, version: &str) -> Option<u64> {
        let count = pipeline.retriever().store().count().await;
        self.display_manager
            .show_banner(version, pipeline.model_name(), count.as_ref().ok().copied());

        match count {
            Ok(0) => {
                self.display_manager
                    .show_warning("The document store is empty. Run `docqa ingest <PATHS>` first.");
                Some(0)
            }
            Ok(n) => Some(n),
            Err(e) => {
                self.display_manager
                    .show_error(&format!("Could not read the document store: {}", e));
                None
            }
        }
    }

    /// Handle a command or question; returns false when the session should end
    pub async fn handle_input(&mut self, pipeline: &QaPipeline, input: &str) -> Result<bool> {
        if input.trim().is_empty() {
            return Ok(true);
        }

        if is_command(input) {
            return self.execute(commands::parse(input));
        }

        self.display_manager.start_spinner("Searching documents...");
        match pipeline.ask(input).await {
            Ok(answer) => {
                self.display_manager
                    .show_answer(&answer, self.verbosity.show_details());
                self.last_answer = Some(answer);
            }
            Err(e) => self.display_manager.show_error(&e.to_string()),
        }
        Ok(true)
    }

    fn execute(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Help => commands::show_help(),
            Command::Sources => {
                let sources = self
                    .last_answer
                    .as_ref()
                    .map(|a| a.sources.as_slice())
                    .unwrap_or(&[]);
                self.display_manager.show_sources(sources);
            }
            Command::Clear => self.display_manager.clear_screen()?,
            Command::Exit => {
                self.display_manager.show_success("Goodbye!");
                return Ok(false);
            }
            Command::Unknown { input } => {
                self.display_manager
                    .show_error(&format!("Unknown command: {} (try /help)", input));
            }
        }
        Ok(true)
    }

    pub fn last_answer(&self) -> Option<&Answer> {
        self.last_answer.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionService;
    use crate::embedding::Embedder;
    use crate::errors::{QaError, Result as QaResult};
    use crate::links::LinkResolver;
    use crate::rag::Retriever;
    use crate::store::{Chunk, DocumentStore, EmbeddingSpec, MemoryStore, ScoredChunk};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Fixed;

    #[async_trait]
    impl Embedder for Fixed {
        fn model(&self) -> &str {
            "fixed"
        }
        async fn embed(&self, _text: &str) -> QaResult<Vec<f32>> {
            Ok(vec![1.0])
        }
    }

    #[async_trait]
    impl CompletionService for Fixed {
        async fn complete(&self, _prompt: &str, _model: &str) -> QaResult<String> {
            Ok("42".to_string())
        }
    }

    #[async_trait]
    impl LinkResolver for Fixed {
        async fn resolve(&self, id: &str) -> QaResult<String> {
            Ok(format!("https://docs/{}", id))
        }
    }

    async fn pipeline() -> QaPipeline {
        let store = Arc::new(MemoryStore::new());
        store
            .append(
                &EmbeddingSpec::new("fixed", 1),
                vec![Chunk {
                    source_identifier: "answer.txt".to_string(),
                    chunk_index: 0,
                    text: "The answer is 42".to_string(),
                    embedding: vec![1.0],
                }],
            )
            .await
            .unwrap();
        QaPipeline::new(
            Retriever::new(Arc::new(Fixed), store),
            Arc::new(Fixed),
            Arc::new(Fixed),
            "test-model",
        )
    }

    /// Store whose backend is unreachable
    struct DownStore;

    #[async_trait]
    impl DocumentStore for DownStore {
        async fn append(&self, _spec: &EmbeddingSpec, _chunks: Vec<Chunk>) -> QaResult<usize> {
            Err(QaError::unavailable("qdrant", "connection refused"))
        }
        async fn search(
            &self,
            _spec: &EmbeddingSpec,
            _embedding: &[f32],
            _k: usize,
        ) -> QaResult<Vec<ScoredChunk>> {
            Err(QaError::unavailable("qdrant", "connection refused"))
        }
        async fn count(&self) -> QaResult<u64> {
            Err(QaError::unavailable("qdrant", "connection refused"))
        }
        async fn remove_document(&self, _source_identifier: &str) -> QaResult<u64> {
            Err(QaError::unavailable("qdrant", "connection refused"))
        }
        async fn clear(&self) -> QaResult<()> {
            Err(QaError::unavailable("qdrant", "connection refused"))
        }
        async fn embedding_spec(&self) -> QaResult<Option<EmbeddingSpec>> {
            Err(QaError::unavailable("qdrant", "connection refused"))
        }
    }

    fn session() -> ReplSession {
        ReplSession::new(Verbosity::Quiet).unwrap()
    }

    #[tokio::test]
    async fn test_question_stores_last_answer() {
        let pipeline = pipeline().await;
        let mut session = session();

        assert!(session.handle_input(&pipeline, "what is the answer?").await.unwrap());
        let answer = session.last_answer().unwrap();
        assert_eq!(answer.text, "42");
        assert_eq!(answer.source_link.as_deref(), Some("https://docs/answer.txt"));
    }

    #[tokio::test]
    async fn test_commands_and_blank_lines() {
        let pipeline = pipeline().await;
        let mut session = session();

        assert!(session.handle_input(&pipeline, "   ").await.unwrap());
        assert!(session.handle_input(&pipeline, "/help").await.unwrap());
        assert!(session.handle_input(&pipeline, "/sources").await.unwrap());
        assert!(session.handle_input(&pipeline, "/clear").await.unwrap());
        assert!(session.handle_input(&pipeline, "/bogus").await.unwrap());
        assert!(!session.handle_input(&pipeline, "/exit").await.unwrap());
        assert!(session.last_answer().is_none());
    }

    #[tokio::test]
    async fn test_startup_reports_store_state() {
        let mut session = session();
        assert_eq!(session.show_startup(&pipeline().await, "0.1.0").await, Some(1));

        let down = QaPipeline::new(
            Retriever::new(Arc::new(Fixed), Arc::new(DownStore)),
            Arc::new(Fixed),
            Arc::new(Fixed),
            "test-model",
        );
        assert_eq!(session.show_startup(&down, "0.1.0").await, None);
    }
}
