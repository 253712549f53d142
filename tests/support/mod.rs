#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use portrait_studio::config::Config;
use portrait_studio::{
    FaceDetector, ImageGenerator, PhotoId, RemoteError, Rotation, SourcePhoto, TemplateSelection,
};

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.settle_delay = Duration::ZERO;
    config.remote.detection_timeout = Duration::from_secs(5);
    config.remote.generation_timeout = Duration::from_secs(5);
    config
}

pub fn source(name: &str) -> SourcePhoto {
    SourcePhoto {
        id: PhotoId::from(name),
        file_name: format!("{name}.jpg"),
        content: Arc::new(vec![0; 16]),
        rotation: Rotation::default(),
    }
}

/// Face decisions by file name:
/// - "noface" never has a face
/// - "error" makes detection fail
/// - "sideways" only has a face once rotated to 90 degrees
/// - "slow" delays the answer at 0 degrees
#[derive(Default)]
pub struct RecordingDetector {
    pub calls: Mutex<Vec<(String, u16)>>,
}

impl RecordingDetector {
    pub fn calls(&self) -> Vec<(String, u16)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FaceDetector for RecordingDetector {
    async fn detect(&self, photo: &SourcePhoto) -> Result<bool, RemoteError> {
        let degrees = photo.rotation.degrees();
        self.calls
            .lock()
            .unwrap()
            .push((photo.file_name.clone(), degrees));

        let name = photo.file_name.as_str();
        if name.contains("slow") && degrees == 0 {
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        if name.contains("error") {
            return Err(RemoteError::Other("detector offline".to_string()));
        }
        if name.contains("noface") {
            return Ok(false);
        }
        if name.contains("sideways") {
            return Ok(degrees == 90);
        }
        Ok(true)
    }
}

/// Fails every photo whose file name contains "fail" (or all photos while
/// `fail_all` is set); hangs forever on "hang".
#[derive(Default)]
pub struct ScriptedGenerator {
    pub fail_all: AtomicBool,
    pub calls: Mutex<Vec<PhotoId>>,
}

impl ScriptedGenerator {
    pub fn calls(&self) -> Vec<PhotoId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        photo: &SourcePhoto,
        selection: &TemplateSelection,
    ) -> Result<String, RemoteError> {
        self.calls.lock().unwrap().push(photo.id.clone());
        if photo.file_name.contains("hang") {
            std::future::pending::<()>().await;
        }
        if self.fail_all.load(Ordering::SeqCst) || photo.file_name.contains("fail") {
            return Err(RemoteError::Other("model overloaded".to_string()));
        }
        Ok(format!(
            "https://cdn.example/{}/{}-{}.jpg",
            photo.id, selection.scene.id, selection.style.id
        ))
    }
}

/// Blocks every call until a permit is released.
pub struct GatedGenerator {
    pub entered: Notify,
    pub release: Semaphore,
    pub calls: AtomicUsize,
}

impl GatedGenerator {
    pub fn new() -> Self {
        Self {
            entered: Notify::new(),
            release: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ImageGenerator for GatedGenerator {
    async fn generate(
        &self,
        photo: &SourcePhoto,
        _selection: &TemplateSelection,
    ) -> Result<String, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        let permit = self
            .release
            .acquire()
            .await
            .map_err(|e| RemoteError::Other(e.to_string()))?;
        permit.forget();
        Ok(format!("https://cdn.example/{}.jpg", photo.id))
    }
}
