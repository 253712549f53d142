use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Serialize;

use crate::preview::PreviewHandle;

fn random_token(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PhotoId(String);

impl PhotoId {
    pub fn generate() -> Self {
        Self(random_token(9))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PhotoId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u16")]
pub struct Rotation(u8);

impl Rotation {
    pub fn from_degrees(degrees: u16) -> Option<Self> {
        if degrees % 90 == 0 {
            Some(Self(((degrees / 90) % 4) as u8))
        } else {
            None
        }
    }

    pub fn degrees(self) -> u16 {
        self.0 as u16 * 90
    }

    pub fn next(self) -> Self {
        Self((self.0 + 1) % 4)
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceStatus {
    Unknown,
    Present,
    Absent,
    /// Detection errored or timed out. Reads as "no usable face".
    CheckFailed,
}

impl FaceStatus {
    pub fn has_face(self) -> Option<bool> {
        match self {
            FaceStatus::Unknown => None,
            FaceStatus::Present => Some(true),
            FaceStatus::Absent | FaceStatus::CheckFailed => Some(false),
        }
    }
}

/// Immutable copy of what the remote capabilities need from a photo.
#[derive(Debug, Clone)]
pub struct SourcePhoto {
    pub id: PhotoId,
    pub file_name: String,
    pub content: Arc<Vec<u8>>,
    pub rotation: Rotation,
}

/// Issued whenever a photo enters validation; completions carrying an
/// older epoch are stale and get discarded.
#[derive(Debug, Clone)]
pub struct ValidationTicket {
    pub source: SourcePhoto,
    pub epoch: u64,
}

#[derive(Debug)]
pub struct Photo {
    id: PhotoId,
    file_name: String,
    content: Arc<Vec<u8>>,
    preview: PreviewHandle,
    rotation: Rotation,
    is_validating: bool,
    face: FaceStatus,
    validation_epoch: u64,
}

impl Photo {
    pub(crate) fn new(
        id: PhotoId,
        file_name: String,
        content: Arc<Vec<u8>>,
        preview: PreviewHandle,
    ) -> Self {
        Self {
            id,
            file_name,
            content,
            preview,
            rotation: Rotation::default(),
            is_validating: true,
            face: FaceStatus::Unknown,
            validation_epoch: 0,
        }
    }

    pub fn id(&self) -> &PhotoId {
        &self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }

    pub fn preview_url(&self) -> String {
        self.preview.url()
    }

    /// Falls back to the original content if the preview was not stored.
    pub fn preview_bytes(&self) -> Arc<Vec<u8>> {
        self.preview.bytes().unwrap_or_else(|| self.content.clone())
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn is_validating(&self) -> bool {
        self.is_validating
    }

    pub fn face_status(&self) -> FaceStatus {
        self.face
    }

    /// Only meaningful once validation has finished.
    pub fn has_face(&self) -> Option<bool> {
        if self.is_validating {
            None
        } else {
            self.face.has_face()
        }
    }

    pub fn is_usable(&self) -> bool {
        !self.is_validating && self.face == FaceStatus::Present
    }

    pub fn source(&self) -> SourcePhoto {
        SourcePhoto {
            id: self.id.clone(),
            file_name: self.file_name.clone(),
            content: self.content.clone(),
            rotation: self.rotation,
        }
    }

    pub(crate) fn begin_validation(&mut self) -> ValidationTicket {
        self.is_validating = true;
        self.validation_epoch += 1;
        ValidationTicket {
            source: self.source(),
            epoch: self.validation_epoch,
        }
    }

    /// Advances the rotation and opens a new validation against the new angle.
    pub(crate) fn rotate(&mut self) -> ValidationTicket {
        self.rotation = self.rotation.next();
        self.begin_validation()
    }

    /// Returns false (and changes nothing) for a stale ticket.
    pub(crate) fn complete_validation(&mut self, epoch: u64, face: FaceStatus) -> bool {
        if epoch != self.validation_epoch {
            return false;
        }
        self.is_validating = false;
        self.face = face;
        true
    }

    pub fn status(&self) -> PhotoStatus {
        PhotoStatus {
            id: self.id.clone(),
            file_name: self.file_name.clone(),
            preview_url: self.preview_url(),
            rotation: self.rotation,
            is_validating: self.is_validating,
            face: self.face,
            usable: self.is_usable(),
        }
    }
}

/// Presentation snapshot of a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoStatus {
    pub id: PhotoId,
    pub file_name: String,
    pub preview_url: String,
    pub rotation: Rotation,
    pub is_validating: bool,
    pub face: FaceStatus,
    pub usable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedPhoto {
    pub id: String,
    pub url: String,
    pub original_photo_id: PhotoId,
    pub template_name: String,
    pub generated_at: DateTime<Utc>,
}

impl GeneratedPhoto {
    pub fn new(url: String, original_photo_id: PhotoId, template_name: String) -> Self {
        let generated_at = Utc::now();
        let millis = generated_at.timestamp_millis();
        Self {
            id: format!("gen_{}_{}", millis, random_token(5)),
            url,
            original_photo_id,
            template_name,
            generated_at,
        }
    }

    pub fn download_file_name(&self) -> String {
        format!("baby_photo_{}.jpg", self.id)
    }
}
