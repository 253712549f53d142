use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::task::JoinHandle;

use crate::photo::{FaceStatus, PhotoId, SourcePhoto, ValidationTicket};
use crate::photo_store::PhotoStore;
use crate::remote::RemoteError;

/// Remote capability answering "is there a usable face at this rotation?"
#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect(&self, photo: &SourcePhoto) -> Result<bool, RemoteError>;
}

/// Runs face detection per photo and writes the outcome back into the store.
///
/// Checks for different photos run concurrently. A completion is applied
/// only if the photo still carries the ticket's epoch, so a check for an
/// old rotation can never overwrite the result for the current one.
#[derive(Clone)]
pub struct FaceValidator {
    detector: Arc<dyn FaceDetector>,
    store: PhotoStore,
    timeout: Duration,
}

impl FaceValidator {
    pub fn new(detector: Arc<dyn FaceDetector>, store: PhotoStore, timeout: Duration) -> Self {
        Self {
            detector,
            store,
            timeout,
        }
    }

    /// Marks the photo as validating and starts a check at its current rotation.
    pub fn request_validation(&self, id: &PhotoId) -> Option<JoinHandle<()>> {
        let ticket = self
            .store
            .update(|set| set.get_mut(id).map(|photo| photo.begin_validation()))?;
        Some(self.spawn_check(ticket))
    }

    /// Rotates by a quarter turn and re-validates at the new angle.
    pub fn rotate(&self, id: &PhotoId) -> Option<JoinHandle<()>> {
        let ticket = self
            .store
            .update(|set| set.get_mut(id).map(|photo| photo.rotate()))?;
        debug!(
            "Photo {} rotated to {} degrees",
            id,
            ticket.source.rotation.degrees()
        );
        Some(self.spawn_check(ticket))
    }

    fn spawn_check(&self, ticket: ValidationTicket) -> JoinHandle<()> {
        let detector = self.detector.clone();
        let store = self.store.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let id = ticket.source.id.clone();
            let status = check_face(detector.as_ref(), &ticket.source, timeout).await;

            let applied = store.update(|set| match set.get_mut(&id) {
                Some(photo) => photo.complete_validation(ticket.epoch, status),
                None => false,
            });

            if applied {
                info!("Face check for photo {}: {:?}", id, status);
            } else {
                debug!("Discarding stale face check for photo {}", id);
            }
        })
    }
}

/// Failures and timeouts both end in [`FaceStatus::CheckFailed`].
pub async fn check_face(
    detector: &dyn FaceDetector,
    photo: &SourcePhoto,
    timeout: Duration,
) -> FaceStatus {
    match tokio::time::timeout(timeout, detector.detect(photo)).await {
        Ok(Ok(true)) => FaceStatus::Present,
        Ok(Ok(false)) => FaceStatus::Absent,
        Ok(Err(e)) => {
            warn!("Face detection failed for photo {}: {}", photo.id, e);
            FaceStatus::CheckFailed
        }
        Err(_) => {
            warn!(
                "Face detection for photo {} timed out after {:?}",
                photo.id, timeout
            );
            FaceStatus::CheckFailed
        }
    }
}
