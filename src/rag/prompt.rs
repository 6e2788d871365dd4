// Prompt assembly: retrieved chunks + question -> one instruction prompt
use serde::{Deserialize, Serialize};

/// Characters removed from the context block and question
const STRIPPED: [char; 2] = ['"', '\''];

const INSTRUCTIONS: &str = "You are an assistant that extracts information from the context provided.\n\
Answer the question using only the context between the <context> tags.\n\
Be concise and do not make anything up.\n\
If the context does not contain the answer, say that you do not have that information.";

/// Which retrieved chunks make it into the context block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextBoundary {
    /// Every retrieved chunk
    #[default]
    Inclusive,
    /// All but the last retrieved chunk
    ExcludeLast,
}

impl ContextBoundary {
    /// Slice of `chunks` that belongs in the context
    pub fn select<'a, T>(&self, chunks: &'a [T]) -> &'a [T] {
        match self {
            ContextBoundary::Inclusive => chunks,
            ContextBoundary::ExcludeLast => &chunks[..chunks.len().saturating_sub(1)],
        }
    }
}

/// Builds the completion prompt
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder {
    boundary: ContextBoundary,
}

impl PromptBuilder {
    pub fn new(boundary: ContextBoundary) -> Self {
        Self { boundary }
    }

    pub fn boundary(&self) -> ContextBoundary {
        self.boundary
    }

    /// Context block: selected chunks joined by blank lines, quotes stripped
    pub fn build_context<S: AsRef<str>>(&self, retrieved: &[S]) -> String {
        self.boundary
            .select(retrieved)
            .iter()
            .map(|chunk| sanitize(chunk.as_ref()))
            .filter(|chunk| !chunk.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Full prompt for `question` over `retrieved` chunk texts, in rank order
    pub fn build_prompt<S: AsRef<str>>(&self, question: &str, retrieved: &[S]) -> String {
        let context = self.build_context(retrieved);
        format!(
            "{}\n\n<context>\n{}\n</context>\n\nQuestion: {}\nAnswer:",
            INSTRUCTIONS,
            context,
            sanitize(question)
        )
    }
}

fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !STRIPPED.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}
