use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{0} is not set")]
    MissingCredential(String),
    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("model returned an empty response")]
    EmptyResponse,
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{0}")]
    CommandFailed(String),
    #[error("error copying to clipboard: {0}")]
    Clipboard(String),
}
