use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("completion request failed with status {status}: {body}")]
    Completion { status: u16, body: String },

    #[error("client disconnected before the reply completed")]
    Disconnected,

    #[error("upstream request error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type AgentResult<T> = Result<T, AgentError>;
