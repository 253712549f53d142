use std::path::Path;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::mimetype_detector;
use crate::photo::{Photo, PhotoId};
use crate::preview::{render_preview, PreviewStore};

/// Per-photo size ceiling (10 MiB).
pub const MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;
/// Hard cap on photos in one session.
pub const MAX_PHOTOS: usize = 3;

/// Shown with the guardian consent prompt before any photo is accepted.
pub const PRIVACY_POLICY_TEXT: &str = "\
1. 数据用途：您上传的照片仅用于本次AI写真生成，系统不会将其用于任何其他商业用途或泄露给第三方。
2. 存储期限：为了您的隐私安全，原始照片将在服务器保留7天后自动删除，生成的写真将在24小时后自动删除（无登录状态下）。
3. 法律合规：请确保您是照片中婴儿的法定监护人。严禁上传违法、色情或侵犯他人隐私的照片。
4. 免责声明：AI生成结果可能存在随机性，仅供娱乐和记录使用。
";

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("At most {limit} photos can be uploaded ({existing} already added, {incoming} selected). Please reselect.")]
    CapacityExceeded {
        existing: usize,
        incoming: usize,
        limit: usize,
    },
    #[error("No selected photos are waiting for consent")]
    NothingPending,
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A user-selected file before it becomes a [`Photo`].
#[derive(Debug, Clone)]
pub struct PhotoFile {
    pub name: String,
    pub content: Arc<Vec<u8>>,
}

impl PhotoFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content: Arc::new(content),
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, IntakeError> {
        let content = tokio::fs::read(path).await.map_err(|source| IntakeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("photo")
            .to_string();
        Ok(Self::new(name, content))
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    fn is_supported(&self) -> bool {
        mimetype_detector::from_file_name(&self.name)
            .map(|mime| mime.is_accepted_upload())
            .unwrap_or(false)
    }
}

#[derive(Debug, Default)]
pub struct IntakeOutcome {
    pub accepted: Vec<PhotoFile>,
    pub rejected_oversize: Vec<PhotoFile>,
    pub rejected_unsupported: Vec<PhotoFile>,
}

impl IntakeOutcome {
    /// User-facing notice when something was filtered out.
    pub fn notice(&self) -> Option<String> {
        let mut parts = Vec::new();
        if !self.rejected_oversize.is_empty() {
            parts.push(format!(
                "{} photo(s) exceed 10MB and were skipped",
                self.rejected_oversize.len()
            ));
        }
        if !self.rejected_unsupported.is_empty() {
            parts.push(format!(
                "{} file(s) are not JPG/PNG and were skipped",
                self.rejected_unsupported.len()
            ));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

/// Splits candidates by the size ceiling and the JPG/PNG type filter.
pub fn filter_files(candidates: Vec<PhotoFile>) -> IntakeOutcome {
    let mut outcome = IntakeOutcome::default();
    for file in candidates {
        if file.size() > MAX_FILE_SIZE_BYTES {
            debug!("Rejecting {}: {} bytes", file.name, file.size());
            outcome.rejected_oversize.push(file);
        } else if !file.is_supported() {
            debug!("Rejecting {}: unsupported type", file.name);
            outcome.rejected_unsupported.push(file);
        } else {
            outcome.accepted.push(file);
        }
    }

    if let Some(notice) = outcome.notice() {
        warn!("{}", notice);
    }
    outcome
}

pub fn check_capacity(existing: usize, incoming: usize) -> Result<(), IntakeError> {
    if existing + incoming > MAX_PHOTOS {
        return Err(IntakeError::CapacityExceeded {
            existing,
            incoming,
            limit: MAX_PHOTOS,
        });
    }
    Ok(())
}

/// Filters `candidates` and refuses the batch if the accepted files would
/// push the set past [`MAX_PHOTOS`].
///
/// The session filters at selection time (so rejections show up before the
/// consent prompt) and calls this at consent time, when the files actually
/// join the set.
pub fn accept_files(
    candidates: Vec<PhotoFile>,
    existing_count: usize,
) -> Result<IntakeOutcome, IntakeError> {
    let outcome = filter_files(candidates);
    check_capacity(existing_count, outcome.accepted.len())?;
    Ok(outcome)
}

/// Turns accepted files into photos, rendering a preview for each.
#[derive(Clone)]
pub struct PhotoIntake {
    previews: PreviewStore,
    preview_edge: u32,
}

impl PhotoIntake {
    pub fn new(previews: PreviewStore, preview_edge: u32) -> Self {
        Self {
            previews,
            preview_edge,
        }
    }

    pub fn previews(&self) -> &PreviewStore {
        &self.previews
    }

    pub async fn create_photo(&self, file: PhotoFile) -> Photo {
        let id = PhotoId::generate();
        let content = file.content.clone();
        let edge = self.preview_edge;

        let rendered = tokio::task::spawn_blocking(move || render_preview(&content, edge))
            .await;
        let preview_data = match rendered {
            Ok(Ok(data)) => data,
            Ok(Err(e)) => {
                debug!("Preview for {} uses source bytes: {}", file.name, e);
                file.content.as_ref().clone()
            }
            Err(e) => {
                warn!("Preview task for {} failed: {}", file.name, e);
                file.content.as_ref().clone()
            }
        };

        let preview = self.previews.acquire(id.clone(), preview_data);
        info!("Accepted photo {} as {}", file.name, id);
        Photo::new(id, file.name, file.content, preview)
    }

    pub async fn create_photos(&self, files: Vec<PhotoFile>) -> Vec<Photo> {
        let mut photos = Vec::with_capacity(files.len());
        for file in files {
            photos.push(self.create_photo(file).await);
        }
        photos
    }
}
