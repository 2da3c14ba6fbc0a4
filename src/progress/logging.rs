//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::EvaluationStarted {
                run_id,
                base_image,
                steps,
            } => {
                info!(run = %run_id, image = %base_image, steps, "Starting evaluation");
            }
            ProgressEvent::StepStarted {
                index,
                total,
                description,
            } => {
                info!(
                    progress = format!("{}/{}", index, total),
                    "{}", description
                );
            }
            ProgressEvent::StepCompleted {
                index,
                total,
                description,
                duration,
            } => {
                debug!(
                    progress = format!("{}/{}", index, total),
                    duration_ms = duration.as_millis(),
                    "Done: {}", description
                );
            }
            ProgressEvent::ServiceReady {
                alias,
                image,
                wait_time,
            } => {
                info!(
                    service = %alias,
                    image = %image,
                    wait_ms = wait_time.as_millis(),
                    "Service ready"
                );
            }
            ProgressEvent::PublishCompleted { reference } => {
                info!(reference = %reference, "Image published");
            }
            ProgressEvent::EvaluationCompleted { run_id, duration } => {
                info!(
                    run = %run_id,
                    duration_ms = duration.as_millis(),
                    "Evaluation complete"
                );
            }
            ProgressEvent::EvaluationFailed { run_id, error } => {
                warn!(run = %run_id, error = %error, "Evaluation failed");
            }
        }
    }
}
