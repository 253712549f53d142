use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::photo::{Photo, PhotoId, PhotoStatus, SourcePhoto};

/// The session's working set, in insertion order.
#[derive(Debug, Default)]
pub struct PhotoSet {
    photos: Vec<Photo>,
}

impl PhotoSet {
    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Photo> {
        self.photos.iter()
    }

    pub fn get(&self, id: &PhotoId) -> Option<&Photo> {
        self.photos.iter().find(|p| p.id() == id)
    }

    pub fn get_mut(&mut self, id: &PhotoId) -> Option<&mut Photo> {
        self.photos.iter_mut().find(|p| p.id() == id)
    }

    pub(crate) fn extend(&mut self, photos: Vec<Photo>) {
        self.photos.extend(photos);
    }

    /// Dropping the removed photo releases its preview.
    pub(crate) fn remove(&mut self, id: &PhotoId) -> bool {
        let before = self.photos.len();
        self.photos.retain(|p| p.id() != id);
        self.photos.len() != before
    }

    pub(crate) fn clear(&mut self) {
        self.photos.clear();
    }

    /// Non-empty and every photo finished validation with a face.
    pub fn is_batch_ready(&self) -> bool {
        !self.photos.is_empty() && self.photos.iter().all(Photo::is_usable)
    }
}

/// Single-writer container for the photo set.
///
/// Every mutation runs as a closure against the latest state while the
/// lock is held, so user actions and detection completions never write
/// back a stale snapshot. Observers can await changes through
/// [`PhotoStore::wait_until`].
#[derive(Clone)]
pub struct PhotoStore {
    set: Arc<Mutex<PhotoSet>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for PhotoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PhotoStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            set: Arc::new(Mutex::new(PhotoSet::default())),
            revision: Arc::new(revision),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PhotoSet> {
        // a panicking writer cannot leave a photo half-updated, so keep going
        self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut PhotoSet) -> R) -> R {
        let result = {
            let mut set = self.lock();
            f(&mut set)
        };
        self.revision.send_modify(|rev| *rev += 1);
        result
    }

    pub fn read<R>(&self, f: impl FnOnce(&PhotoSet) -> R) -> R {
        let set = self.lock();
        f(&set)
    }

    pub fn len(&self) -> usize {
        self.read(PhotoSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.read(PhotoSet::is_empty)
    }

    pub fn is_batch_ready(&self) -> bool {
        self.read(PhotoSet::is_batch_ready)
    }

    pub fn statuses(&self) -> Vec<PhotoStatus> {
        self.read(|set| set.iter().map(Photo::status).collect())
    }

    pub fn sources(&self) -> Vec<SourcePhoto> {
        self.read(|set| set.iter().map(Photo::source).collect())
    }

    /// Idempotent: removing an absent id is not an error.
    pub fn remove(&self, id: &PhotoId) -> bool {
        self.update(|set| set.remove(id))
    }

    pub fn clear(&self) {
        self.update(PhotoSet::clear)
    }

    /// Resolves once `predicate` holds for the current state.
    pub async fn wait_until(&self, predicate: impl Fn(&PhotoSet) -> bool) {
        let mut changes = self.revision.subscribe();
        loop {
            if self.read(&predicate) {
                return;
            }
            if changes.changed().await.is_err() {
                return;
            }
        }
    }

    /// Resolves once no photo is waiting on face detection.
    pub async fn wait_for_validations(&self) {
        self.wait_until(|set| set.iter().all(|p| !p.is_validating()))
            .await
    }
}
