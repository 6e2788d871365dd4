//! Telemetry for docqa
//! 
//! Log subscriber setup and per-stage timing of the question pipeline.

use std::fmt;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use crate::cli::Verbosity;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the verbosity-derived level. Calling this twice is
/// harmless: the second install is ignored.
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Wall-clock time spent in each pipeline stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    /// Question embedding plus similarity search
    pub retrieval: Duration,
    pub prompt: Duration,
    pub completion: Duration,
    pub link: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.retrieval + self.prompt + self.completion + self.link
    }
}

impl fmt::Display for StageTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "retrieval {}ms, prompt {}ms, completion {}ms, link {}ms (total {}ms)",
            self.retrieval.as_millis(),
            self.prompt.as_millis(),
            self.completion.as_millis(),
            self.link.as_millis(),
            self.total().as_millis()
        )
    }
}

/// Run `f`, returning its output and how long it took
pub async fn timed<F, T>(f: F) -> (T, Duration)
where
    F: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let out = f.await;
    (out, start.elapsed())
}
