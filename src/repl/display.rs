//! Display manager for terminal output
//! 
//! Spinners while the pipeline runs, colored answers, sources and errors.

use colored::*;
use crossterm::{
    cursor,
    execute,
    terminal::{Clear, ClearType},
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::time::Duration;

use crate::rag::Answer;
use crate::store::ScoredChunk;

/// Plain-text answer followed by a markdown link to its source
pub fn render_answer(answer: &Answer) -> String {
    match answer.source_markdown() {
        Some(link) => format!("{}\n\nSource: {}", answer.text, link),
        None => answer.text.clone(),
    }
}

/// One line per retrieved chunk: rank, score, identifier#index, preview
pub fn render_sources(sources: &[ScoredChunk], preview_chars: usize) -> Vec<String> {
    sources
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let mut preview: String = chunk
                .text
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .chars()
                .take(preview_chars)
                .collect();
            if chunk.text.chars().count() > preview_chars {
                preview.push('…');
            }
            format!(
                "{}. [{:.3}] {}#{} {}",
                i + 1,
                chunk.score,
                chunk.source_identifier,
                chunk.chunk_index,
                preview
            )
        })
        .collect()
}

pub struct DisplayManager {
    current_bar: Option<ProgressBar>,
    update_interval: Duration,
    show_progress: bool,
}

impl DisplayManager {
    pub fn new(show_progress: bool) -> Self {
        DisplayManager {
            current_bar: None,
            update_interval: Duration::from_millis(100),
            show_progress,
        }
    }

    /// Show welcome banner
    /// `chunks` is None when the store could not be read
    pub fn show_banner(&self, version: &str, model: &str, chunks: Option<u64>) {
        let width = 64;
        let title = format!("  docqa {} - Document Question Answering", version);
        let chunks = chunks.map_or_else(|| "?".to_string(), |n| n.to_string());
        let info = format!("  Model: {} | Chunks: {} | Mode: REPL", model, chunks);

        println!("\n{}", "=".repeat(width).cyan());
        println!("{}", title.bold().cyan());
        println!("{}", info.dimmed());
        println!("{}\n", "=".repeat(width).cyan());
        println!(
            "Ask a question (or {} for commands, {} to quit)\n",
            "/help".green(),
            "/exit".green()
        );
    }

    /// Spinner shown while a question is being answered
    pub fn start_spinner(&mut self, message: &str) {
        self.finish_current();
        if !self.show_progress {
            return;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(self.update_interval);
        self.current_bar = Some(pb);
    }

    pub fn finish_current(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_and_clear();
        }
    }

    pub fn show_answer(&mut self, answer: &Answer, show_details: bool) {
        self.finish_current();

        println!("\n{}", answer.text);
        if let Some(link) = answer.source_markdown() {
            println!("\n{} {}", "Source:".bold(), link.cyan());
        } else {
            println!("\n{}", "No matching documents in the store.".dimmed());
        }
        if show_details {
            println!("{}", answer.timings.to_string().dimmed());
        }
        println!();
    }

    pub fn show_sources(&self, sources: &[ScoredChunk]) {
        if sources.is_empty() {
            println!("{}", "No sources for the last answer.".yellow());
            return;
        }

        println!("\n{}", "Retrieved chunks:".bold().cyan());
        println!("{}", "-".repeat(60).cyan());
        for line in render_sources(sources, 80) {
            println!("  {}", line);
        }
        println!();
    }

    pub fn show_error(&mut self, error: &str) {
        self.finish_current();
        println!("{} {}", "Error:".red().bold(), error.red());
    }

    pub fn show_warning(&self, warning: &str) {
        println!("{} {}", "Warning:".yellow().bold(), warning.yellow());
    }

    pub fn show_success(&self, message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    pub fn clear_screen(&self) -> io::Result<()> {
        execute!(io::stdout(), Clear(ClearType::All), cursor::MoveTo(0, 0))
    }
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new(true)
    }
}
