use thiserror::Error;

/// Errors that can occur while serving the site
#[derive(Error, Debug)]
pub enum SiteError {
    #[error("Failed to read request body: {0}")]
    RequestBodyError(String),

    #[error("Failed to read response body: {0}")]
    ResponseBodyError(String),

    #[error("Renderer request failed for {0}: {1}")]
    UpstreamRequestFailed(String, String),

    #[error("Renderer timeout for {0}")]
    UpstreamTimeout(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Data proxy setup failed: {0}")]
    DataProxy(#[from] data_proxy::InitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
