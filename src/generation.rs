use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::watch;

use crate::catalog::TemplateSelection;
use crate::photo::{GeneratedPhoto, SourcePhoto};
use crate::remote::RemoteError;

/// Remote capability turning one photo plus a template into an image reference.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        photo: &SourcePhoto,
        selection: &TemplateSelection,
    ) -> Result<String, RemoteError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationProgress {
    pub total: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl GenerationProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.attempted as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub results: Vec<GeneratedPhoto>,
    pub attempted: usize,
    pub failed: usize,
}

impl GenerationReport {
    /// "2 of 3 portraits generated"
    pub fn summary(&self) -> String {
        format!(
            "{} of {} portraits generated",
            self.results.len(),
            self.attempted
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(GenerationReport),
    /// Another run was in flight; this call did nothing.
    AlreadyRunning,
    /// The run was cancelled; late results were dropped.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation failed for all {attempted} photo(s). Please check your network or use clearer photos and try again.")]
    BatchGenerationFailed { attempted: usize },
}

#[derive(Debug, Default)]
struct RunGuard {
    active: Option<u64>,
    last_run: u64,
}

/// Drives one generation call per photo, strictly in input order.
///
/// A single failed photo is logged and skipped; the run only fails when
/// nothing succeeded. At most one run is in flight per orchestrator, and a
/// cancelled run can never publish progress or results afterwards.
pub struct GenerationOrchestrator {
    generator: Arc<dyn ImageGenerator>,
    call_timeout: Duration,
    settle_delay: Duration,
    guard: Mutex<RunGuard>,
    progress: watch::Sender<GenerationProgress>,
    cancelled: watch::Sender<u64>,
}

/// Clears the in-flight flag even when the run future is dropped mid-way.
struct ActiveRun<'a> {
    orchestrator: &'a GenerationOrchestrator,
    run_id: u64,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        let mut guard = self.orchestrator.lock_guard();
        if guard.active == Some(self.run_id) {
            guard.active = None;
        }
    }
}

impl GenerationOrchestrator {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        call_timeout: Duration,
        settle_delay: Duration,
    ) -> Self {
        let (progress, _) = watch::channel(GenerationProgress::default());
        let (cancelled, _) = watch::channel(0);
        Self {
            generator,
            call_timeout,
            settle_delay,
            guard: Mutex::new(RunGuard::default()),
            progress,
            cancelled,
        }
    }

    fn lock_guard(&self) -> MutexGuard<'_, RunGuard> {
        self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.lock_guard().active.is_some()
    }

    pub fn progress(&self) -> GenerationProgress {
        *self.progress.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<GenerationProgress> {
        self.progress.subscribe()
    }

    /// Stops the in-flight run, if any, so a fresh `run` can start.
    pub fn cancel(&self) -> bool {
        let mut guard = self.lock_guard();
        match guard.active.take() {
            Some(run_id) => {
                self.cancelled.send_replace(run_id);
                info!("Generation run {} cancelled", run_id);
                true
            }
            None => false,
        }
    }

    fn begin(&self, total: usize) -> Option<ActiveRun<'_>> {
        let mut guard = self.lock_guard();
        if guard.active.is_some() {
            return None;
        }
        guard.last_run += 1;
        let run_id = guard.last_run;
        guard.active = Some(run_id);
        self.progress.send_replace(GenerationProgress {
            total,
            ..Default::default()
        });
        Some(ActiveRun {
            orchestrator: self,
            run_id,
        })
    }

    fn is_current(&self, run_id: u64) -> bool {
        self.lock_guard().active == Some(run_id)
    }

    /// Returns false when the run has been superseded; nothing is recorded then.
    fn record_attempt(&self, run_id: u64, succeeded: bool) -> bool {
        let guard = self.lock_guard();
        if guard.active != Some(run_id) {
            return false;
        }
        self.progress.send_modify(|progress| {
            progress.attempted += 1;
            if succeeded {
                progress.succeeded += 1;
            } else {
                progress.failed += 1;
            }
        });
        true
    }

    pub async fn run(
        &self,
        photos: &[SourcePhoto],
        selection: &TemplateSelection,
    ) -> Result<RunOutcome, GenerationError> {
        let Some(active) = self.begin(photos.len()) else {
            info!("Generation already in progress, ignoring new request");
            return Ok(RunOutcome::AlreadyRunning);
        };
        let run_id = active.run_id;
        let template_name = selection.template_name();
        let mut cancelled = self.cancelled.subscribe();

        info!(
            "Generation run {} started: {} photo(s), template '{}'",
            run_id,
            photos.len(),
            template_name
        );

        let mut results = Vec::with_capacity(photos.len());
        for photo in photos {
            if !self.is_current(run_id) {
                return Ok(RunOutcome::Cancelled);
            }

            let call = self.generator.generate(photo, selection);
            let attempt = tokio::select! {
                attempt = tokio::time::timeout(self.call_timeout, call) => attempt,
                _ = wait_cancelled(&mut cancelled, run_id) => {
                    info!("Discarding in-flight generation for photo {}", photo.id);
                    return Ok(RunOutcome::Cancelled);
                }
            };

            let generated = match attempt {
                Ok(Ok(url)) => {
                    let mut generated =
                        GeneratedPhoto::new(url, photo.id.clone(), template_name.clone());
                    if results.iter().any(|r: &GeneratedPhoto| r.id == generated.id) {
                        generated.id = format!("{}_{}", generated.id, results.len());
                    }
                    Some(generated)
                }
                Ok(Err(e)) => {
                    warn!("Single generation failed for photo {}: {}", photo.id, e);
                    None
                }
                Err(_) => {
                    warn!(
                        "Generation for photo {} timed out after {:?}",
                        photo.id, self.call_timeout
                    );
                    None
                }
            };

            if !self.record_attempt(run_id, generated.is_some()) {
                info!("Dropping late result for photo {}", photo.id);
                return Ok(RunOutcome::Cancelled);
            }
            results.extend(generated);
        }

        if results.is_empty() {
            error!(
                "Generation run {} failed: all {} photo(s) failed",
                run_id,
                photos.len()
            );
            return Err(GenerationError::BatchGenerationFailed {
                attempted: photos.len(),
            });
        }

        let report = GenerationReport {
            attempted: photos.len(),
            failed: photos.len() - results.len(),
            results,
        };
        info!("Generation run {} finished: {}", run_id, report.summary());

        if !self.settle_delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.settle_delay) => {}
                _ = wait_cancelled(&mut cancelled, run_id) => return Ok(RunOutcome::Cancelled),
            }
        }
        if !self.is_current(run_id) {
            return Ok(RunOutcome::Cancelled);
        }

        drop(active);
        Ok(RunOutcome::Completed(report))
    }
}

/// Run ids only grow, so a cancelled id at or past `run_id` covers this run.
async fn wait_cancelled(cancelled: &mut watch::Receiver<u64>, run_id: u64) {
    loop {
        if *cancelled.borrow_and_update() >= run_id {
            return;
        }
        if cancelled.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fraction() {
        let mut progress = GenerationProgress {
            total: 4,
            ..Default::default()
        };
        assert_eq!(progress.fraction(), 0.0);
        progress.attempted = 1;
        assert_eq!(progress.fraction(), 0.25);
        assert_eq!(GenerationProgress::default().fraction(), 0.0);
    }

    #[test]
    fn test_report_summary() {
        let report = GenerationReport {
            results: Vec::new(),
            attempted: 3,
            failed: 3,
        };
        assert_eq!(report.summary(), "0 of 3 portraits generated");
    }
}
