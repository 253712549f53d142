use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use crate::catalog::{TemplateSelection, UnknownTemplate};
use crate::config::Config;
use crate::face_validation::{FaceDetector, FaceValidator};
use crate::generation::{
    GenerationError, GenerationOrchestrator, GenerationReport, ImageGenerator, RunOutcome,
};
use crate::intake::{self, IntakeError, IntakeOutcome, PhotoFile, PhotoIntake, MAX_PHOTOS};
use crate::photo::{GeneratedPhoto, PhotoId, PhotoStatus};
use crate::photo_store::PhotoStore;
use crate::preview::PreviewStore;
use crate::viewer::{ResultViewer, ViewerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Home,
    Upload,
    Template,
    Generating,
    Result,
}

/// Corrective actions offered next to an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    Retry,
    GoBack,
    RemovePhoto,
    ReselectPhotos,
    ChooseTemplate,
    StartOver,
}

#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Viewer(#[from] ViewerError),
    #[error(transparent)]
    Template(#[from] UnknownTemplate),
    #[error("Every photo needs a clearly detected face before continuing. Remove or replace the flagged photos.")]
    BatchNotReady,
    #[error("This action is not available on the {actual:?} step (expected {expected:?})")]
    WrongStep { expected: Step, actual: Step },
}

impl StudioError {
    pub fn suggested_actions(&self) -> &'static [UserAction] {
        match self {
            StudioError::Intake(IntakeError::CapacityExceeded { .. }) => {
                &[UserAction::ReselectPhotos, UserAction::RemovePhoto]
            }
            StudioError::Intake(_) => &[UserAction::ReselectPhotos],
            StudioError::Generation(_) => &[UserAction::Retry, UserAction::GoBack],
            StudioError::Viewer(_) => &[UserAction::StartOver],
            StudioError::Template(_) => &[UserAction::ChooseTemplate],
            StudioError::BatchNotReady => &[UserAction::RemovePhoto, UserAction::ReselectPhotos],
            StudioError::WrongStep { .. } => &[UserAction::GoBack],
        }
    }
}

pub type StudioResult<T> = Result<T, StudioError>;

/// One user's pass through the wizard: upload, pick a template, generate, review.
pub struct StudioSession {
    step: Step,
    store: PhotoStore,
    intake: PhotoIntake,
    validator: FaceValidator,
    orchestrator: Arc<GenerationOrchestrator>,
    selection: TemplateSelection,
    pending: Vec<PhotoFile>,
    viewer: ResultViewer,
    last_report: Option<GenerationReport>,
    last_error: Option<GenerationError>,
}

impl StudioSession {
    pub fn new(
        config: &Config,
        detector: Arc<dyn FaceDetector>,
        generator: Arc<dyn ImageGenerator>,
    ) -> Self {
        let store = PhotoStore::new();
        let previews = PreviewStore::new(config.preview.store_max_size_mb);

        Self {
            step: Step::Home,
            intake: PhotoIntake::new(previews, config.preview.max_edge_px),
            validator: FaceValidator::new(
                detector,
                store.clone(),
                config.remote.detection_timeout,
            ),
            orchestrator: Arc::new(GenerationOrchestrator::new(
                generator,
                config.remote.generation_timeout,
                config.settle_delay,
            )),
            store,
            selection: TemplateSelection::default(),
            pending: Vec::new(),
            viewer: ResultViewer::default(),
            last_report: None,
            last_error: None,
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    fn expect_step(&self, expected: Step) -> StudioResult<()> {
        if self.step != expected {
            return Err(StudioError::WrongStep {
                expected,
                actual: self.step,
            });
        }
        Ok(())
    }

    fn go_to(&mut self, step: Step) {
        info!("Wizard step {:?} -> {:?}", self.step, step);
        self.step = step;
    }

    pub fn store(&self) -> &PhotoStore {
        &self.store
    }

    pub fn previews(&self) -> &PreviewStore {
        self.intake.previews()
    }

    pub fn orchestrator(&self) -> Arc<GenerationOrchestrator> {
        self.orchestrator.clone()
    }

    pub fn selection(&self) -> TemplateSelection {
        self.selection
    }

    pub fn start(&mut self) -> StudioResult<()> {
        self.expect_step(Step::Home)?;
        self.go_to(Step::Upload);
        Ok(())
    }

    // ---- upload ----

    /// Filters the selection and parks the accepted files until consent.
    ///
    /// A new selection replaces whatever was still waiting for consent.
    pub fn select_files(&mut self, candidates: Vec<PhotoFile>) -> StudioResult<IntakeOutcome> {
        self.expect_step(Step::Upload)?;
        let outcome = intake::filter_files(candidates);
        self.pending = outcome.accepted.clone();
        Ok(outcome)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn decline_privacy(&mut self) {
        if !self.pending.is_empty() {
            let count = self.pending.len();
            info!("Consent declined, discarding {} pending file(s)", count);
        }
        self.pending.clear();
    }

    /// Guardian consent given: pending files join the set and validation starts.
    ///
    /// When the set would exceed [`MAX_PHOTOS`] nothing is added and the
    /// pending files are discarded.
    pub async fn agree_to_privacy(&mut self) -> StudioResult<Vec<PhotoId>> {
        self.expect_step(Step::Upload)?;
        let files = std::mem::take(&mut self.pending);
        if files.is_empty() {
            return Err(IntakeError::NothingPending.into());
        }
        let accepted = intake::accept_files(files, self.store.len())?.accepted;

        let photos = self.intake.create_photos(accepted).await;
        let ids: Vec<PhotoId> = photos.iter().map(|p| p.id().clone()).collect();

        self.store.update(|set| {
            intake::check_capacity(set.len(), photos.len())?;
            set.extend(photos);
            Ok::<_, IntakeError>(())
        })?;

        for id in &ids {
            self.validator.request_validation(id);
        }
        Ok(ids)
    }

    pub fn photos(&self) -> Vec<PhotoStatus> {
        self.store.statuses()
    }

    pub fn can_add_more(&self) -> bool {
        self.store.len() < MAX_PHOTOS
    }

    pub fn remove_photo(&mut self, id: &PhotoId) -> StudioResult<bool> {
        self.expect_step(Step::Upload)?;
        Ok(self.store.remove(id))
    }

    pub fn rotate_photo(&mut self, id: &PhotoId) -> StudioResult<bool> {
        self.expect_step(Step::Upload)?;
        Ok(self.validator.rotate(id).is_some())
    }

    pub fn is_batch_ready(&self) -> bool {
        self.store.is_batch_ready()
    }

    pub async fn wait_for_validations(&self) {
        self.store.wait_for_validations().await
    }

    pub fn back_to_home(&mut self) -> StudioResult<()> {
        self.expect_step(Step::Upload)?;
        self.go_to(Step::Home);
        Ok(())
    }

    pub fn continue_to_templates(&mut self) -> StudioResult<()> {
        self.expect_step(Step::Upload)?;
        if !self.store.is_batch_ready() {
            return Err(StudioError::BatchNotReady);
        }
        self.go_to(Step::Template);
        Ok(())
    }

    // ---- template ----

    pub fn back_to_upload(&mut self) -> StudioResult<()> {
        self.expect_step(Step::Template)?;
        self.go_to(Step::Upload);
        Ok(())
    }

    /// Locks in the template and enters generation, which starts right away.
    ///
    /// The run lives inside the returned future: dropping it (a timeout, a
    /// `select!` against user input) abandons the run and frees the
    /// orchestrator. The session stays on [`Step::Generating`] until
    /// [`StudioSession::back_from_generation`] or a retry.
    pub async fn confirm_template(
        &mut self,
        scene_id: &str,
        style_id: &str,
    ) -> StudioResult<RunOutcome> {
        self.expect_step(Step::Template)?;
        self.selection = TemplateSelection::from_ids(scene_id, style_id)?;
        self.go_to(Step::Generating);
        self.generate().await
    }

    // ---- generating ----

    pub async fn retry_generation(&mut self) -> StudioResult<RunOutcome> {
        self.expect_step(Step::Generating)?;
        self.generate().await
    }

    async fn generate(&mut self) -> StudioResult<RunOutcome> {
        self.last_error = None;
        let sources = self.store.sources();
        let orchestrator = self.orchestrator.clone();

        match orchestrator.run(&sources, &self.selection).await {
            Ok(RunOutcome::Completed(report)) => {
                if report.failed > 0 {
                    warn!("{}", report.summary());
                }
                self.viewer = ResultViewer::new(report.results.clone());
                self.last_report = Some(report.clone());
                self.go_to(Step::Result);
                Ok(RunOutcome::Completed(report))
            }
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.last_error = Some(e.clone());
                Err(e.into())
            }
        }
    }

    /// The failure shown on the generating step, if the last run failed.
    pub fn generation_error(&self) -> Option<&GenerationError> {
        self.last_error.as_ref()
    }

    /// Returns to template selection.
    ///
    /// `confirm_template` and `retry_generation` borrow the session mutably
    /// for the whole run, so by the time this is callable the session's own
    /// run has finished or its future was dropped. The cancel here covers a
    /// run started through a shared [`StudioSession::orchestrator`] handle.
    pub fn back_from_generation(&mut self) -> StudioResult<()> {
        self.expect_step(Step::Generating)?;
        self.orchestrator.cancel();
        self.last_error = None;
        self.go_to(Step::Template);
        Ok(())
    }

    // ---- result ----

    pub fn last_report(&self) -> Option<&GenerationReport> {
        self.last_report.as_ref()
    }

    pub fn viewer(&self) -> &ResultViewer {
        &self.viewer
    }

    pub fn current_result(&self) -> StudioResult<&GeneratedPhoto> {
        Ok(self.viewer.current()?)
    }

    pub fn next_result(&mut self) -> bool {
        self.viewer.next()
    }

    pub fn previous_result(&mut self) -> bool {
        self.viewer.previous()
    }

    /// `full_reset` drops photos and results and goes home; otherwise the
    /// photos are kept for another template.
    pub fn restart(&mut self, full_reset: bool) -> StudioResult<()> {
        self.expect_step(Step::Result)?;
        if full_reset {
            self.store.clear();
            self.pending.clear();
            self.viewer = ResultViewer::default();
            self.last_report = None;
            self.go_to(Step::Home);
        } else {
            self.go_to(Step::Template);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_error_offers_an_action() {
        let errors = vec![
            StudioError::Intake(IntakeError::CapacityExceeded {
                existing: 3,
                incoming: 1,
                limit: 3,
            }),
            StudioError::Intake(IntakeError::NothingPending),
            StudioError::Generation(GenerationError::BatchGenerationFailed { attempted: 2 }),
            StudioError::Viewer(ViewerError::EmptyResultSet),
            StudioError::Template(UnknownTemplate::Scene("x".to_string())),
            StudioError::BatchNotReady,
            StudioError::WrongStep {
                expected: Step::Upload,
                actual: Step::Home,
            },
        ];
        for error in errors {
            assert!(!error.suggested_actions().is_empty(), "{error}");
            assert!(!error.to_string().is_empty());
        }
    }

    #[test]
    fn test_generation_failure_offers_retry_and_back() {
        let error = StudioError::from(GenerationError::BatchGenerationFailed { attempted: 1 });
        assert_eq!(
            error.suggested_actions(),
            &[UserAction::Retry, UserAction::GoBack]
        );
    }
}
