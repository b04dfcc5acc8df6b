use thiserror::Error;

pub type Result<T> = std::result::Result<T, I18nError>;

#[derive(Debug, Error)]
pub enum I18nError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid lexicon entry {key}: expected string or list of strings, found {found}")]
    InvalidEntry { key: String, found: &'static str },

    #[error("lexicon root must be an object, found {found}")]
    InvalidRoot { found: &'static str },
}
