// Command line glue: parses arguments, wires the HTTP gateway, the terminal
// and the uploader together, and waits for the upload to end.

use crate::api::HttpGateway;
use crate::config::{PollPolicy, UploaderConfig, DEFAULT_API_URL};
use crate::ui::{stdout_terminal, TerminalReporter};
use crate::uploader::Uploader;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::Duration;

/// Upload your project's documentation to the ESDoc hosting service.
#[derive(Debug, Parser)]
#[command(name = "esdoc-uploader", version, about, long_about = None)]
pub struct Cli {
    /// Repository url, as `git@github.com:[author]/[repository].git`.
    /// Read from the package.json when omitted.
    pub url: Option<String>,

    /// Manifest to read the repository from
    #[arg(long, default_value = "package.json")]
    pub manifest: PathBuf,

    /// ESDoc hosting API
    #[arg(long, env = "ESDOC_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Delay between two status checks, in milliseconds
    #[arg(long, default_value_t = 4000)]
    pub poll_interval_ms: u64,

    /// Stop waiting after this many status checks (default: wait forever)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_polls: Option<u32>,
}

impl Cli {
    pub fn config(&self) -> UploaderConfig {
        UploaderConfig {
            api_url: self.api_url.clone(),
            manifest_path: self.manifest.clone(),
            poll: PollPolicy {
                interval: Duration::from_millis(self.poll_interval_ms),
                max_attempts: self.max_polls,
            },
            ..UploaderConfig::default()
        }
    }
}

/// Runs the command. `Ok(true)` means the documentation was uploaded;
/// `Ok(false)` means the problem has already been reported to the user.
pub fn run(cli: Cli) -> Result<bool> {
    let config = cli.config();
    tracing::info!(api_url = %config.api_url, manifest = %config.manifest_path.display(), "Starting");

    let gateway = HttpGateway::new(&config.api_url)?;
    let terminal = stdout_terminal();
    let reporter = Arc::new(TerminalReporter::new(Arc::clone(&terminal)));
    let uploader = Uploader::new(cli.url.as_deref(), Arc::new(gateway), reporter, terminal, config);

    if !uploader.can_upload() {
        return Ok(false);
    }

    let (done, outcome) = mpsc::channel();
    let Some(handle) = uploader.upload_with(move |result| {
        // The receiver outlives the upload; a failed send only means it was dropped.
        let _ = done.send(result.is_ok());
    }) else {
        return Ok(false);
    };
    handle.wait();
    Ok(outcome.recv().unwrap_or(false))
}
