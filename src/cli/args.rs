//! Command-line argument parsing for docqa
//! 
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// docqa - Ask questions about your documents using local Ollama models
#[derive(Parser, Debug)]
#[command(name = "docqa")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version)]
#[command(about = "Answer questions from ingested documents with a local Ollama model", long_about = None)]
pub struct Args {
    /// Question to answer (one-shot mode)
    #[arg(value_name = "QUESTION")]
    pub question: Option<String>,

    /// Completion model (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Embedding model (overrides config)
    #[arg(long)]
    pub embedding_model: Option<String>,

    /// Ollama host (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Ollama port (overrides config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Number of chunks to retrieve (overrides config)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only print the answer)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start interactive question loop
    Start,

    /// Chunk, embed and store text documents
    Ingest {
        /// Files, or directories of .txt/.md files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Clear the store before ingesting
        #[arg(long)]
        reset: bool,
    },

    /// Check Ollama, model availability and store size
    Status,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Verbosity from flags, falling back to the configured default
    pub fn verbosity(&self, default: Verbosity) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => default,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// A question and a subcommand are mutually exclusive
    pub fn validate(&self) -> Result<(), String> {
        if self.command.is_some() && self.question.is_some() {
            return Err("Cannot specify a question with a subcommand.".to_string());
        }
        Ok(())
    }

    /// Apply flag overrides on top of file configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.ollama.host = host.clone();
        }
        if let Some(port) = self.port {
            config.ollama.port = port;
        }
        if let Some(model) = &self.model {
            config.ollama.completion_model = model.clone();
        }
        if let Some(model) = &self.embedding_model {
            config.ollama.embedding_model = model.clone();
        }
        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = top_k;
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Parse the names produced by `as_str`
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "quiet" => Some(Verbosity::Quiet),
            "normal" => Some(Verbosity::Normal),
            "verbose" => Some(Verbosity::Verbose),
            "very_verbose" => Some(Verbosity::VeryVerbose),
            _ => None,
        }
    }

    /// Log filter directive for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::VeryVerbose => "debug",
        }
    }

    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should print sources and stage timings
    pub fn show_details(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_one_shot_question() {
        let args = parse(&["docqa", "What is the invoice total?"]);
        assert_eq!(args.question.as_deref(), Some("What is the invoice total?"));
        assert!(args.command.is_none());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["docqa", "-q"]).verbosity(Verbosity::Normal), Verbosity::Quiet);
        assert_eq!(parse(&["docqa"]).verbosity(Verbosity::Normal), Verbosity::Normal);
        assert_eq!(parse(&["docqa", "-v"]).verbosity(Verbosity::Normal), Verbosity::Verbose);
        assert_eq!(parse(&["docqa", "-vv"]).verbosity(Verbosity::Normal), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_verbosity_default_from_config() {
        assert_eq!(parse(&["docqa"]).verbosity(Verbosity::Verbose), Verbosity::Verbose);
    }

    #[test]
    fn test_ingest_subcommand() {
        let args = parse(&["docqa", "ingest", "a.txt", "docs/", "--reset"]);
        assert_eq!(
            args.command,
            Some(Commands::Ingest {
                paths: vec![PathBuf::from("a.txt"), PathBuf::from("docs/")],
                reset: true,
            })
        );
    }

    #[test]
    fn test_ingest_requires_paths() {
        assert!(Args::try_parse_from(["docqa", "ingest"]).is_err());
    }

    #[test]
    fn test_validate_fail_both_question_and_command() {
        let mut args = parse(&["docqa", "status"]);
        args.question = Some("q".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_overrides_applied() {
        let args = parse(&[
            "docqa", "--host", "10.0.0.5", "--port", "8080", "--model", "mistral",
            "--embedding-model", "mxbai-embed-large", "--top-k", "5",
        ]);
        let mut config = Config::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.ollama_url(), "http://10.0.0.5:8080");
        assert_eq!(config.ollama.completion_model, "mistral");
        assert_eq!(config.ollama.embedding_model, "mxbai-embed-large");
        assert_eq!(config.retrieval.top_k, 5);
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = Config::default();
        parse(&["docqa"]).apply_overrides(&mut config);
        assert_eq!(config.ollama.port, 11434);
        assert_eq!(config.retrieval.top_k, 3);
    }

    #[test]
    fn test_verbosity_names_round_trip() {
        for v in [Verbosity::Quiet, Verbosity::Normal, Verbosity::Verbose, Verbosity::VeryVerbose] {
            assert_eq!(Verbosity::parse(v.as_str()), Some(v));
        }
        assert_eq!(Verbosity::parse("loud"), None);
    }

    #[test]
    fn test_verbosity_methods() {
        assert!(!Verbosity::Quiet.show_progress());
        assert!(Verbosity::Normal.show_progress());
        assert!(!Verbosity::Normal.show_details());
        assert!(Verbosity::Verbose.show_details());
        assert_eq!(Verbosity::VeryVerbose.filter_directive(), "debug");
    }
}
