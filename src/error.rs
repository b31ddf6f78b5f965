// Error types shared by the resolver, the HTTP gateway and the uploader.
// Everything a user may see ends up as a `Diagnostic`; the gateway keeps its
// own error so callers can tell a dead connection from an HTTP error status.

use thiserror::Error;

/// Every message the uploader can print. The fixed variants form the message
/// table; `Api`, `Transport` and `PollingExhausted` carry text produced at
/// runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    #[error("The repository url is invalid")]
    InvalidUrl,

    #[error("The repository url is invalid. There is likely additional logging output above")]
    InvalidPackageUrl,

    #[error("The documentation is already being uploaded")]
    Uploading,

    #[error("Unexpected error, please try again")]
    Unexpected,

    #[error("There's no package.json in this directory")]
    NoPackage,

    #[error("There's no repository information in the package.json")]
    NoRepository,

    #[error("The repository from the package.json is not valid. Expected format \"[author]/[repository]\"")]
    InvalidFormat,

    #[error("ESDoc only supports Github repositories")]
    OnlyGithub,

    /// A `message` sent back by the API alongside `success: false`.
    #[error("{0}")]
    Api(String),

    /// The request never produced a usable response.
    #[error("{0}")]
    Transport(String),

    #[error("Gave up waiting for the documentation after {0} status checks")]
    PollingExhausted(u32),
}

impl Diagnostic {
    /// Maps an optional API message to a diagnostic, falling back to
    /// `Unexpected` when the API did not explain itself.
    pub fn from_api_message(message: Option<String>) -> Self {
        match message {
            Some(message) if !message.is_empty() => Diagnostic::Api(message),
            _ => Diagnostic::Unexpected,
        }
    }
}

/// Errors raised by an `ApiGateway`.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connection, TLS or body streaming failure.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a status code of 400 or more.
    #[error("The API responded with a {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },
}

impl GatewayError {
    /// Response body attached to the error, if the server sent one.
    pub fn body(&self) -> Option<&str> {
        match self {
            GatewayError::Status { body, .. } => Some(body),
            GatewayError::Transport(_) => None,
        }
    }
}
