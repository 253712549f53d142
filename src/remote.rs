use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::catalog::TemplateSelection;
use crate::config::RemoteConfig;
use crate::face_validation::FaceDetector;
use crate::generation::ImageGenerator;
use crate::photo::{GeneratedPhoto, SourcePhoto};
use crate::preview::{rotate_encoded, PreviewError};

/// Largest generated image we are willing to download.
const MAX_DOWNLOAD_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),
    #[error("Image processing error: {0}")]
    Image(#[from] PreviewError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("Background task failed: {0}")]
    Task(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    has_face: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    url: String,
}

#[derive(Clone)]
struct Endpoint {
    agent: ureq::Agent,
    url: String,
    api_key: Option<String>,
}

impl Endpoint {
    fn new(url: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            url: url.to_string(),
            api_key,
        }
    }

    /// Blocking; call from `spawn_blocking`.
    fn post_image<T: DeserializeOwned>(
        &self,
        body: &[u8],
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        let mut request = self
            .agent
            .post(&self.url)
            .header("Content-Type", "image/jpeg");
        for (key, value) in query {
            request = request.query(key, value);
        }
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let mut response = request.send(body)?;
        Ok(response.body_mut().read_json::<T>()?)
    }
}

/// Pixels the remote side should see: the upload turned by `rotation`.
fn upright_bytes(photo: &SourcePhoto) -> Result<Vec<u8>, RemoteError> {
    if photo.rotation.degrees() == 0 {
        Ok(photo.content.as_ref().clone())
    } else {
        Ok(rotate_encoded(&photo.content, photo.rotation)?)
    }
}

fn generation_query(selection: &TemplateSelection) -> Vec<(&'static str, String)> {
    vec![
        ("scene", selection.scene.id.to_string()),
        ("style", selection.style.id.to_string()),
        ("prompt", selection.prompt()),
    ]
}

async fn run_blocking<T, F>(task: F) -> Result<T, RemoteError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, RemoteError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| RemoteError::Task(e.to_string()))?
}

/// Face detection over HTTP: posts the upright JPEG, expects `{"has_face": bool}`.
pub struct HttpFaceDetector {
    endpoint: Endpoint,
}

impl HttpFaceDetector {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            endpoint: Endpoint::new(
                &config.detect_endpoint,
                config.api_key.clone(),
                config.detection_timeout,
            ),
        }
    }
}

#[async_trait]
impl FaceDetector for HttpFaceDetector {
    async fn detect(&self, photo: &SourcePhoto) -> Result<bool, RemoteError> {
        let endpoint = self.endpoint.clone();
        let photo = photo.clone();
        debug!(
            "Requesting face detection for {} at {} degrees",
            photo.id,
            photo.rotation.degrees()
        );

        let response: DetectResponse = run_blocking(move || {
            let body = upright_bytes(&photo)?;
            endpoint.post_image(&body, &[])
        })
        .await?;
        Ok(response.has_face)
    }
}

/// Portrait generation over HTTP: posts the upright JPEG with the template
/// as query parameters, expects `{"url": "..."}`.
pub struct HttpImageGenerator {
    endpoint: Endpoint,
}

impl HttpImageGenerator {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            endpoint: Endpoint::new(
                &config.generate_endpoint,
                config.api_key.clone(),
                config.generation_timeout,
            ),
        }
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    async fn generate(
        &self,
        photo: &SourcePhoto,
        selection: &TemplateSelection,
    ) -> Result<String, RemoteError> {
        let endpoint = self.endpoint.clone();
        let photo = photo.clone();
        let query = generation_query(selection);

        let response: GenerateResponse = run_blocking(move || {
            let body = upright_bytes(&photo)?;
            endpoint.post_image(&body, &query)
        })
        .await?;

        if response.url.trim().is_empty() {
            return Err(RemoteError::InvalidResponse(
                "generation returned an empty image reference".to_string(),
            ));
        }
        Ok(response.url)
    }
}

/// Payload of a `data:` reference (the part after the scheme).
fn decode_data_url(payload: &str) -> Result<Vec<u8>, RemoteError> {
    let Some((media_type, data)) = payload.split_once(',') else {
        return Err(RemoteError::InvalidResponse(
            "data reference has no payload".to_string(),
        ));
    };
    if !media_type.ends_with(";base64") {
        return Err(RemoteError::InvalidResponse(format!(
            "unsupported data reference encoding: {}",
            media_type
        )));
    }
    Ok(STANDARD.decode(data.trim())?)
}

/// Saves a generated portrait into `dir` under its download file name.
///
/// http(s) references are downloaded, base64 `data:` references are
/// decoded, anything else is read as a local path.
pub async fn save_result(photo: &GeneratedPhoto, dir: &Path) -> Result<PathBuf, RemoteError> {
    let data = if let Some(payload) = photo.url.strip_prefix("data:") {
        decode_data_url(payload)?
    } else if photo.url.starts_with("http://") || photo.url.starts_with("https://") {
        let url = photo.url.clone();
        run_blocking(move || {
            let mut response = ureq::get(&url).call()?;
            Ok(response
                .body_mut()
                .with_config()
                .limit(MAX_DOWNLOAD_BYTES)
                .read_to_vec()?)
        })
        .await?
    } else {
        tokio::fs::read(&photo.url).await?
    };

    tokio::fs::create_dir_all(dir).await?;
    let target = dir.join(photo.download_file_name());
    tokio::fs::write(&target, &data).await?;
    info!(
        "Saved {} ({} bytes) to {}",
        photo.id,
        data.len(),
        target.display()
    );
    Ok(target)
}
