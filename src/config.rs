use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub detect_endpoint: String,
    pub generate_endpoint: String,
    pub api_key: Option<String>,
    pub detection_timeout: Duration,
    pub generation_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PreviewConfig {
    pub max_edge_px: u32,
    pub store_max_size_mb: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub remote: RemoteConfig,
    pub preview: PreviewConfig,
    /// Pause between a successful run and handing results to the viewer.
    pub settle_delay: Duration,
    pub output_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            remote: RemoteConfig {
                detect_endpoint: "http://localhost:18480/v1/faces:detect".to_string(),
                generate_endpoint: "http://localhost:18480/v1/portraits:generate".to_string(),
                api_key: None,
                detection_timeout: Duration::from_secs(30),
                generation_timeout: Duration::from_secs(120),
            },
            preview: PreviewConfig {
                max_edge_px: 400,
                store_max_size_mb: 64,
            },
            settle_delay: Duration::from_millis(800),
            output_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let defaults = Config::default();

        Ok(Config {
            remote: RemoteConfig {
                detect_endpoint: env::var("PORTRAIT_STUDIO_DETECT_ENDPOINT")
                    .unwrap_or(defaults.remote.detect_endpoint),
                generate_endpoint: env::var("PORTRAIT_STUDIO_GENERATE_ENDPOINT")
                    .unwrap_or(defaults.remote.generate_endpoint),
                api_key: env::var("PORTRAIT_STUDIO_API_KEY")
                    .ok()
                    .filter(|key| !key.trim().is_empty()),
                detection_timeout: Duration::from_secs(
                    env::var("PORTRAIT_STUDIO_DETECTION_TIMEOUT_SECS")
                        .unwrap_or_else(|_| "30".to_string())
                        .parse()?,
                ),
                generation_timeout: Duration::from_secs(
                    env::var("PORTRAIT_STUDIO_GENERATION_TIMEOUT_SECS")
                        .unwrap_or_else(|_| "120".to_string())
                        .parse()?,
                ),
            },
            preview: PreviewConfig {
                max_edge_px: env::var("PORTRAIT_STUDIO_PREVIEW_EDGE_PX")
                    .unwrap_or_else(|_| "400".to_string())
                    .parse()?,
                store_max_size_mb: env::var("PORTRAIT_STUDIO_PREVIEW_STORE_MAX_SIZE_MB")
                    .unwrap_or_else(|_| "64".to_string())
                    .parse()?,
            },
            settle_delay: Duration::from_millis(
                env::var("PORTRAIT_STUDIO_SETTLE_DELAY_MS")
                    .unwrap_or_else(|_| "800".to_string())
                    .parse()?,
            ),
            output_dir: env::var("PORTRAIT_STUDIO_OUTPUT_DIR")
                .ok()
                .filter(|dir| !dir.trim().is_empty()),
        })
    }
}
