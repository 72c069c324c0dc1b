//! Console Progress Rendering
//!
//! Prints one line per progress event while a run is in flight:
//!
//! ```text
//! ▶ code: 5 model(s)
//!   ✓ code-openai/gpt-4.1 (1/5 done)
//!   ✗ code-x-ai/grok-3 (2/5 done)
//! ■ 4 succeeded, 1 failed in 12.3s
//! ```

use console::style;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::benchmark::{ProgressEvent, ProgressTracker, progress_label};

pub struct ConsoleRenderer {
    receiver: broadcast::Receiver<ProgressEvent>,
    /// Stop after this many runs have finished
    expected_runs: usize,
}

impl ConsoleRenderer {
    /// Subscribe now, so no event emitted after this call is missed
    pub fn new(tracker: &ProgressTracker, expected_runs: usize) -> Self {
        Self {
            receiver: tracker.subscribe(),
            expected_runs,
        }
    }

    /// Render one event as a console line
    pub fn render(event: &ProgressEvent) -> String {
        match event {
            ProgressEvent::RunStarted {
                category, total, ..
            } => format!("{} {}: {} model(s)", style("▶").cyan(), category, total),
            ProgressEvent::ModelCompleted {
                key,
                success,
                completed,
                total,
                ..
            } => {
                let mark = if *success {
                    style("✓").green()
                } else {
                    style("✗").red()
                };
                format!(
                    "  {} {} ({})",
                    mark,
                    key,
                    style(progress_label(*completed, *total)).dim()
                )
            }
            ProgressEvent::RunFinished {
                succeeded,
                failed,
                duration_ms,
                ..
            } => format!(
                "{} {} succeeded, {} failed in {:.1}s",
                style("■").cyan(),
                succeeded,
                failed,
                *duration_ms as f64 / 1000.0
            ),
        }
    }

    /// Print events on a background task until the expected runs finish
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut finished = 0;
            while finished < self.expected_runs {
                match self.receiver.recv().await {
                    Ok(event) => {
                        if matches!(event, ProgressEvent::RunFinished { .. }) {
                            finished += 1;
                        }
                        println!("{}", Self::render(&event));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("Progress renderer skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;
    use uuid::Uuid;

    #[test]
    fn test_render_lines() {
        console::set_colors_enabled(false);
        let run_id = Uuid::new_v4();

        let started = ConsoleRenderer::render(&ProgressEvent::RunStarted {
            run_id,
            category: Category::Ascii,
            total: 5,
        });
        assert!(started.ends_with("ascii: 5 model(s)"));

        let completed = ConsoleRenderer::render(&ProgressEvent::ModelCompleted {
            run_id,
            key: "ascii-m".to_string(),
            success: false,
            completed: 3,
            total: 5,
        });
        assert!(completed.contains("ascii-m (3/5 done)"));

        let finished = ConsoleRenderer::render(&ProgressEvent::RunFinished {
            run_id,
            succeeded: 4,
            failed: 1,
            duration_ms: 12_300,
        });
        assert!(finished.ends_with("4 succeeded, 1 failed in 12.3s"));
    }

    #[tokio::test]
    async fn test_spawn_stops_after_expected_runs() {
        let tracker = ProgressTracker::new();
        let handle = ConsoleRenderer::new(&tracker, 1).spawn();

        let run = tracker.begin_run(Uuid::new_v4(), Category::Code, 1);
        run.model_settled("code-a", true);
        run.finish(1, 0);

        handle.await.unwrap();
    }
}
