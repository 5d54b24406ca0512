//! Error types for folio operations.

use thiserror::Error;

/// Errors that can occur while rendering a page.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("template cycle detected: {url}")]
    TemplateCycle { url: String },

    #[error("invalid front matter: {0}")]
    FrontMatter(#[from] serde_yaml::Error),

    #[error("invalid site config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("malformed document: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a fetch error from a url and any displayable transport failure.
    pub fn fetch(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
