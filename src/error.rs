use thiserror::Error;

/// Errors raised while fetching or extracting from a source.
///
/// Every variant renders a message that names the failed operation and the
/// identifier (slug, page, query or URL) it was invoked with, because the
/// message is exposed verbatim in error envelopes.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("{operation} failed for {target}: {source}")]
    Transport {
        operation: &'static str,
        target: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} failed for {target}: upstream returned HTTP {status}")]
    Status {
        operation: &'static str,
        target: String,
        status: u16,
    },

    #[error("{operation} failed for {target}: browser error: {message}")]
    Browser {
        operation: &'static str,
        target: String,
        message: String,
    },

    #[error("{operation} timed out for {target}")]
    Timeout {
        operation: &'static str,
        target: String,
    },

    #[error("{operation} cancelled for {target}")]
    Cancelled {
        operation: &'static str,
        target: String,
    },

    #[error("could not decode {operation} response for {target}: {message}")]
    Decode {
        operation: &'static str,
        target: String,
        message: String,
    },

    #[error("no {field} found for '{slug}'; the source layout may have changed")]
    MissingField { field: &'static str, slug: String },

    #[error("invalid {operation} request: {message}")]
    InvalidInput {
        operation: &'static str,
        message: String,
    },

    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

impl ScrapeError {
    /// Whether the failure happened at the network/browser boundary.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ScrapeError::Transport { .. }
                | ScrapeError::Status { .. }
                | ScrapeError::Browser { .. }
                | ScrapeError::Timeout { .. }
                | ScrapeError::Cancelled { .. }
        )
    }
}
