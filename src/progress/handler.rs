//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while an engine evaluates a container
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Evaluation started
    EvaluationStarted {
        run_id: String,
        base_image: String,
        steps: usize,
    },

    /// A step (exec, directory copy, service binding) started
    StepStarted {
        index: usize,
        total: usize,
        description: String,
    },

    /// A step finished
    StepCompleted {
        index: usize,
        total: usize,
        description: String,
        duration: Duration,
    },

    /// A bound service is up and listening
    ServiceReady {
        alias: String,
        image: String,
        wait_time: Duration,
    },

    /// Image pushed to a registry
    PublishCompleted { reference: String },

    /// Evaluation completed successfully
    EvaluationCompleted { run_id: String, duration: Duration },

    /// Evaluation failed
    EvaluationFailed { run_id: String, error: String },
}

/// Trait for handling progress events during evaluation
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ProgressHandler for CountingHandler {
        fn on_progress(&self, _event: &ProgressEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_noop_handler() {
        let handler = NoOpHandler;
        handler.on_progress(&ProgressEvent::PublishCompleted {
            reference: "ttl.sh/app:latest".to_string(),
        });
    }

    #[test]
    fn test_progress_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler {
            count: count.clone(),
        };

        handler.on_progress(&ProgressEvent::EvaluationStarted {
            run_id: "abc".to_string(),
            base_image: "php:8.3-cli".to_string(),
            steps: 2,
        });
        handler.on_progress(&ProgressEvent::StepStarted {
            index: 1,
            total: 2,
            description: "exec apt-get update".to_string(),
        });
        handler.on_progress(&ProgressEvent::EvaluationCompleted {
            run_id: "abc".to_string(),
            duration: Duration::from_secs(5),
        });

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_event_debug() {
        let event = ProgressEvent::StepStarted {
            index: 3,
            total: 9,
            description: "exec composer install".to_string(),
        };
        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("StepStarted"));
        assert!(debug_str.contains("index: 3"));
    }
}
