use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use crate::photo::PhotoId;

pub mod render;

pub use render::{render_preview, rotate_encoded};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewKey {
    pub photo_id: PhotoId,
}

impl PreviewKey {
    pub fn new(photo_id: PhotoId) -> Self {
        Self { photo_id }
    }
}

impl fmt::Display for PreviewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "preview://{}", self.photo_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type PreviewResult<T> = Result<T, PreviewError>;

#[derive(Default)]
struct StoreInner {
    entries: HashMap<String, Arc<Vec<u8>>>,
    current_size: usize,
}

/// In-memory home of every live photo preview.
///
/// Entries are only ever removed by the owning [`PreviewHandle`] being
/// dropped, or by [`PreviewStore::clear`].
#[derive(Clone)]
pub struct PreviewStore {
    inner: Arc<Mutex<StoreInner>>,
    max_size_bytes: usize,
}

impl PreviewStore {
    pub fn new(max_size_mb: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner::default())),
            max_size_bytes: max_size_mb * 1024 * 1024,
        }
    }

    /// Stores `data` under a key derived from `photo_id` and returns the
    /// handle that owns the entry.
    pub fn acquire(&self, photo_id: PhotoId, data: Vec<u8>) -> PreviewHandle {
        let key = PreviewKey::new(photo_id);
        let key_str = key.to_string();
        let data_size = data.len();

        match self.inner.lock() {
            Ok(mut inner) => {
                if inner.current_size + data_size > self.max_size_bytes {
                    warn!(
                        "Preview store full ({} of {} bytes), {} will render from source",
                        inner.current_size, self.max_size_bytes, key_str
                    );
                } else {
                    if let Some(old) = inner.entries.insert(key_str.clone(), Arc::new(data)) {
                        inner.current_size = inner.current_size.saturating_sub(old.len());
                    }
                    inner.current_size += data_size;
                    debug!(
                        "Added {} to preview store, total size: {} bytes",
                        key_str, inner.current_size
                    );
                }
            }
            Err(_) => warn!("Failed to acquire preview store lock"),
        }

        PreviewHandle {
            key,
            store: self.clone(),
        }
    }

    pub fn get(&self, key: &PreviewKey) -> Option<Arc<Vec<u8>>> {
        let inner = self.inner.lock().ok()?;
        inner.entries.get(&key.to_string()).cloned()
    }

    fn release(&self, key: &PreviewKey) {
        let key_str = key.to_string();
        if let Ok(mut inner) = self.inner.lock() {
            if let Some(data) = inner.entries.remove(&key_str) {
                inner.current_size = inner.current_size.saturating_sub(data.len());
                debug!("Released {} from preview store", key_str);
            }
        }
    }

    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.clear();
            inner.current_size = 0;
            debug!("Cleared preview store");
        }
    }

    /// (entries, bytes)
    pub fn stats(&self) -> (usize, usize) {
        match self.inner.lock() {
            Ok(inner) => (inner.entries.len(), inner.current_size),
            Err(_) => (0, 0),
        }
    }
}

/// Owns one preview entry; the entry is released when the handle drops.
pub struct PreviewHandle {
    key: PreviewKey,
    store: PreviewStore,
}

impl PreviewHandle {
    pub fn url(&self) -> String {
        self.key.to_string()
    }

    pub fn bytes(&self) -> Option<Arc<Vec<u8>>> {
        self.store.get(&self.key)
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle").field("key", &self.key).finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.store.release(&self.key);
    }
}
