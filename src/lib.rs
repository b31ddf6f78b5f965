// Library root
// -----------
// This crate exposes the uploader as a library; the binary (`main.rs`) is a
// thin command line wrapper around it.
//
// Module responsibilities:
// - `locator`: finds and validates the repository url (argument or
//   package.json).
// - `api`: HTTP access to the ESDoc hosting API.
// - `uploader`: the create request and the status polling that follows.
// - `ui`: progress indicator and user facing messages.
// - `cli`: argument parsing and wiring for the binary.
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod locator;
pub mod ui;
pub mod uploader;

pub use config::{PollPolicy, UploaderConfig};
pub use error::{Diagnostic, GatewayError};
pub use locator::RepositoryLocator;
pub use uploader::{UploadHandle, UploadResult, Uploader};
