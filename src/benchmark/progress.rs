//! Run Progress Reporting
//!
//! Broadcast-based progress events so a caller can render "N/M done"
//! while a run is in flight. The completed counter only moves when a
//! model has fully settled (success or failure), never on start.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::types::Category;

/// Progress event types
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Run accepted; nothing invoked yet
    RunStarted {
        run_id: Uuid,
        category: Category,
        total: usize,
    },
    /// One model settled
    ModelCompleted {
        run_id: Uuid,
        key: String,
        success: bool,
        completed: usize,
        total: usize,
    },
    /// Every model settled
    RunFinished {
        run_id: Uuid,
        succeeded: usize,
        failed: usize,
        duration_ms: u64,
    },
}

/// Fan-out point for progress events of every run
#[derive(Clone)]
pub struct ProgressTracker {
    sender: broadcast::Sender<ProgressEvent>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Subscribe to progress events
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    /// Send an event through the broadcast channel.
    /// Silently discards if no receivers are listening.
    #[inline]
    fn emit(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }

    /// Begin counting one run
    pub fn begin_run(&self, run_id: Uuid, category: Category, total: usize) -> RunProgress {
        self.emit(ProgressEvent::RunStarted {
            run_id,
            category,
            total,
        });

        RunProgress {
            tracker: self.clone(),
            run_id,
            total,
            completed: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }
}

/// Completion counter for one run
pub struct RunProgress {
    tracker: ProgressTracker,
    run_id: Uuid,
    total: usize,
    completed: AtomicUsize,
    started: Instant,
}

impl RunProgress {
    /// Record a settled model; returns the new completed count
    pub fn model_settled(&self, key: &str, success: bool) -> usize {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;

        self.tracker.emit(ProgressEvent::ModelCompleted {
            run_id: self.run_id,
            key: key.to_string(),
            success,
            completed,
            total: self.total,
        });

        completed
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn finish(self, succeeded: usize, failed: usize) {
        self.tracker.emit(ProgressEvent::RunFinished {
            run_id: self.run_id,
            succeeded,
            failed,
            duration_ms: self.started.elapsed().as_millis() as u64,
        });
    }
}

/// "3/5 done" style label
pub fn progress_label(completed: usize, total: usize) -> String {
    format!("{}/{} done", completed, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_emits_on_settle() {
        let tracker = ProgressTracker::new();
        let mut rx = tracker.subscribe();
        let run_id = Uuid::new_v4();

        let run = tracker.begin_run(run_id, Category::Code, 2);
        assert_eq!(run.completed(), 0);

        assert_eq!(run.model_settled("code-a", true), 1);
        assert_eq!(run.model_settled("code-b", false), 2);
        run.finish(1, 1);

        assert!(matches!(
            rx.try_recv().unwrap(),
            ProgressEvent::RunStarted { total: 2, .. }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            ProgressEvent::ModelCompleted { completed: 1, success: true, .. }
        ));
        let second = rx.try_recv().unwrap();
        assert!(matches!(
            second,
            ProgressEvent::ModelCompleted { run_id: id, completed: 2, success: false, .. } if id == run_id
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            ProgressEvent::RunFinished { succeeded: 1, failed: 1, .. }
        ));
    }

    #[test]
    fn test_emit_without_subscribers() {
        let tracker = ProgressTracker::new();
        let run = tracker.begin_run(Uuid::new_v4(), Category::Ascii, 1);
        assert_eq!(run.model_settled("ascii-a", true), 1);
    }

    #[test]
    fn test_progress_label() {
        assert_eq!(progress_label(3, 5), "3/5 done");
    }
}
