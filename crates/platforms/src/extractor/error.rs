use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("no av or BV identifier found in `{0}`")]
    InvalidIdentifier(String),
    #[error("login required: {message}. {}", session_hint(.logged_in))]
    AuthRequired { message: String, logged_in: bool },
    #[error("access denied: {message}. A higher membership tier may be required for this quality")]
    Forbidden { message: String },
    #[error("api error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("no playable stream returned, the video may be copyright-restricted")]
    NoPlayableStream,
    #[error("could not find the cid of {0}")]
    MissingCid(String),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
}

fn session_hint(logged_in: &bool) -> &'static str {
    if *logged_in {
        "Make sure the configured SESSDATA session token has access to this video"
    } else {
        "Supply a valid SESSDATA session token and retry"
    }
}
