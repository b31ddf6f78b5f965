// Upload orchestration: registers a documentation build for the resolved
// repository, then polls the build's status file until the API says it is
// done. Only one upload runs at a time per `Uploader`.

use crate::api::{ApiGateway, RawResponse};
use crate::config::UploaderConfig;
use crate::error::Diagnostic;
use crate::locator::{resolve, RepositoryLocator};
use crate::ui::{Indicator, Reporter, SharedTerminal};
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// What an upload ends with: the documentation URL, or why it failed.
pub type UploadResult = Result<String, Diagnostic>;

/// Invoked exactly once when an upload ends.
pub type UploadCallback = Box<dyn FnOnce(UploadResult) + Send + 'static>;

/// Body of both API endpoints. Missing fields are tolerated so a terse
/// failure like `{"success": false}` still parses.
#[derive(Debug, Default, Deserialize)]
struct ApiReply {
    #[serde(default)]
    success: bool,
    message: Option<String>,
    path: Option<String>,
}

impl ApiReply {
    fn parse(response: &RawResponse) -> Result<Self, Diagnostic> {
        serde_json::from_str(&response.body).map_err(|e| {
            debug!(error = %e, status = response.status, "API body is not the expected JSON");
            Diagnostic::Unexpected
        })
    }
}

/// API paths used during one upload. `path` and `status` are only known once
/// the create request has answered.
#[derive(Debug, Clone, Default)]
struct Endpoints {
    create: String,
    path: Option<String>,
    status: Option<String>,
}

impl Endpoints {
    fn track(&mut self, path: &str, finish_file: &str) -> String {
        let status = format!("{path}{finish_file}");
        self.path = Some(path.to_string());
        self.status = Some(status.clone());
        status
    }
}

#[derive(Default)]
struct UploadState {
    uploading: bool,
    callback: Option<UploadCallback>,
    endpoints: Endpoints,
}

struct Inner {
    locator: Option<RepositoryLocator>,
    gateway: Arc<dyn ApiGateway>,
    reporter: Arc<dyn Reporter>,
    terminal: SharedTerminal,
    config: UploaderConfig,
    state: Mutex<UploadState>,
}

/// Handle on an accepted upload.
pub struct UploadHandle(JoinHandle<()>);

impl UploadHandle {
    /// Blocks until the upload has ended and its callback has run.
    pub fn wait(self) {
        if self.0.join().is_err() {
            error!("Upload worker panicked");
        }
    }
}

/// Uploads documentation for one repository to the ESDoc hosting API.
pub struct Uploader {
    inner: Arc<Inner>,
}

impl Uploader {
    /// Resolves the repository from `url`, or from the configured manifest
    /// when `url` is `None`. Resolution problems are reported right away.
    pub fn new(
        url: Option<&str>,
        gateway: Arc<dyn ApiGateway>,
        reporter: Arc<dyn Reporter>,
        terminal: SharedTerminal,
        config: UploaderConfig,
    ) -> Self {
        let resolution = resolve(url, &config.manifest_path);
        for diagnostic in &resolution.diagnostics {
            reporter.failure(diagnostic);
        }
        if let Some(locator) = &resolution.locator {
            info!(%locator, "Repository resolved");
        }

        let state = UploadState {
            endpoints: Endpoints { create: config.create_path.clone(), ..Endpoints::default() },
            ..UploadState::default()
        };
        Uploader {
            inner: Arc::new(Inner {
                locator: resolution.locator,
                gateway,
                reporter,
                terminal,
                config,
                state: Mutex::new(state),
            }),
        }
    }

    /// Whether a valid repository url was found.
    pub fn can_upload(&self) -> bool {
        self.inner.locator.is_some()
    }

    /// The repository url sent to the API.
    pub fn url(&self) -> Option<&RepositoryLocator> {
        self.inner.locator.as_ref()
    }

    /// Whether an upload is currently in flight.
    pub fn is_uploading(&self) -> bool {
        self.inner.lock_state().uploading
    }

    /// Starts an upload without a completion callback.
    pub fn upload(&self) -> Option<UploadHandle> {
        self.start(None)
    }

    /// Starts an upload and calls `callback` once it ends.
    ///
    /// When there is no repository url, or another upload is already running,
    /// `callback` is called with an error before this returns and `None` is
    /// returned. A rejected call leaves the running upload untouched.
    pub fn upload_with<F>(&self, callback: F) -> Option<UploadHandle>
    where
        F: FnOnce(UploadResult) + Send + 'static,
    {
        self.start(Some(Box::new(callback)))
    }

    fn start(&self, callback: Option<UploadCallback>) -> Option<UploadHandle> {
        let Some(locator) = self.inner.locator.clone() else {
            return self.inner.reject(Diagnostic::InvalidUrl, callback);
        };

        {
            let mut state = self.inner.lock_state();
            if state.uploading {
                drop(state);
                return self.inner.reject(Diagnostic::Uploading, callback);
            }
            state.uploading = true;
            state.callback = callback;
        }

        let inner = Arc::clone(&self.inner);
        let spawned = thread::Builder::new()
            .name("esdoc-upload".into())
            .spawn(move || inner.run(&locator));
        match spawned {
            Ok(worker) => Some(UploadHandle(worker)),
            Err(e) => {
                self.inner.finish(Err(Diagnostic::Transport(e.to_string())), None);
                None
            }
        }
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, UploadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reject(&self, diagnostic: Diagnostic, callback: Option<UploadCallback>) -> Option<UploadHandle> {
        self.reporter.failure(&diagnostic);
        if let Some(callback) = callback {
            callback(Err(diagnostic));
        }
        None
    }

    fn run(&self, locator: &RepositoryLocator) {
        let indicator = Indicator::start(Arc::clone(&self.terminal), self.config.indicator_interval);
        let result = self.create(locator).and_then(|()| self.poll());
        self.finish(result, Some(indicator));
    }

    /// Registers the build and records where to poll for it.
    fn create(&self, locator: &RepositoryLocator) -> Result<(), Diagnostic> {
        let create_path = self.lock_state().endpoints.create.clone();
        info!(%locator, path = %create_path, "Requesting documentation build");

        let response = self
            .gateway
            .post_json(&create_path, &json!({ "gitUrl": locator.as_str() }))
            .map_err(|e| {
                error!(error = %e, "Create request failed");
                Diagnostic::Transport(e.to_string())
            })?;

        let reply = ApiReply::parse(&response)?;
        if !reply.success {
            return Err(Diagnostic::from_api_message(reply.message));
        }
        let path = reply.path.ok_or(Diagnostic::Unexpected)?;
        let status_path = self.lock_state().endpoints.track(&path, &self.config.finish_file);
        info!(%path, status = %status_path, "Documentation build registered");
        Ok(())
    }

    /// Waits for the build and returns the documentation URL.
    ///
    /// Failed requests and HTML placeholder pages mean "not ready yet"; the
    /// first JSON answer decides the outcome.
    fn poll(&self) -> Result<String, Diagnostic> {
        let (path, status_path) = {
            let state = self.lock_state();
            match (&state.endpoints.path, &state.endpoints.status) {
                (Some(path), Some(status)) => (path.clone(), status.clone()),
                _ => return Err(Diagnostic::Unexpected),
            }
        };
        let policy = self.config.poll;
        let mut attempts: u32 = 0;
        loop {
            thread::sleep(policy.interval);
            attempts += 1;
            match self.gateway.get_raw(&status_path) {
                Err(e) => debug!(attempt = attempts, error = %e, "Status not available yet"),
                Ok(response) if response.body.contains("<html>") => {
                    debug!(attempt = attempts, status = response.status, "Status page is a placeholder")
                }
                Ok(response) => {
                    let reply = ApiReply::parse(&response)?;
                    if !reply.success {
                        return Err(Diagnostic::from_api_message(reply.message));
                    }
                    return Ok(self.config.url_for(&path));
                }
            }
            if policy.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(Diagnostic::PollingExhausted(attempts));
            }
        }
    }

    /// Ends the current upload: frees the slot, stops the animation, prints
    /// the outcome and hands it to the stored callback.
    fn finish(&self, result: UploadResult, indicator: Option<Indicator>) {
        let callback = {
            let mut state = self.lock_state();
            state.uploading = false;
            state.callback.take()
        };
        if let Some(indicator) = indicator {
            indicator.stop();
        }
        match &result {
            Ok(url) => self.reporter.success(url),
            Err(diagnostic) => self.reporter.failure(diagnostic),
        }
        if let Some(callback) = callback {
            callback(result);
        }
    }
}
