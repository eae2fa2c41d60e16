use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("marker not found (tried: {})", .tried.join(" | "))]
    MarkerNotFound { tried: Vec<String> },

    #[error("assignment for flag `{flag}` not found after marker")]
    AssignmentNotFound { flag: String },

    #[error("flag `{flag}` has invalid token `{token}`")]
    InvalidToken { flag: String, token: String },

    #[error("invalid assignment pattern: {0}")]
    Pattern(#[from] regex::Error),
}
