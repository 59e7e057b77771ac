use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key was configured for the completion endpoint.
    #[error("no API key configured for the chat-completion endpoint")]
    MissingApiKey,

    /// The configured base URL could not be joined with the completions path.
    #[error("invalid chat-completion base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The underlying HTTP client returned an error.
    #[error("chat-completion request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint returned a non-success HTTP status.
    #[error("chat-completion endpoint returned {status}: {message}")]
    Http { status: StatusCode, message: String },

    /// The response carried no choices or an empty message.
    #[error("chat-completion response contained no content")]
    EmptyResponse,
}
