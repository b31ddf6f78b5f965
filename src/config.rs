// Runtime settings for the uploader. Defaults match the public ESDoc hosting
// service; the binary overrides them from flags and environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Base URL of the ESDoc hosting API.
pub const DEFAULT_API_URL: &str = "https://doc.esdoc.org";

/// How the uploader waits for a build to finish.
///
/// The status endpoint is checked at a fixed `interval` with no backoff. With
/// `max_attempts` left at `None` polling never gives up, which is the
/// behaviour of the hosting service's own tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            interval: Duration::from_millis(4000),
            max_attempts: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploaderConfig {
    /// Scheme and host the relative API paths are joined to.
    pub api_url: String,
    /// Path of the endpoint that registers a new documentation build.
    pub create_path: String,
    /// File appended to the tracking path to build the status endpoint.
    pub finish_file: String,
    /// Manifest consulted when no repository url is given explicitly.
    pub manifest_path: PathBuf,
    pub poll: PollPolicy,
    /// Delay between two frames of the progress indicator.
    pub indicator_interval: Duration,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        UploaderConfig {
            api_url: DEFAULT_API_URL.to_string(),
            create_path: "/api/create".to_string(),
            finish_file: "/.finish.json".to_string(),
            manifest_path: PathBuf::from("package.json"),
            poll: PollPolicy::default(),
            indicator_interval: Duration::from_millis(500),
        }
    }
}

impl UploaderConfig {
    /// Absolute URL for a path relative to the API host.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }
}
