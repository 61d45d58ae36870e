use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Every way an extraction call can fail. A call either yields a fully valid
/// result or exactly one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum ScrapeError {
    /// The token stream did not hold what the layout requires at `index`.
    /// `expected` is `None` for plain reads past the end of the stream.
    #[error("unexpected token at {index}: expected {expected:?}, found {actual:?}")]
    UnexpectedToken {
        index: usize,
        expected: Option<String>,
        actual: Option<String>,
    },

    /// A field failed its grammar or the document had an unexpected shape.
    #[error("malformed {field}: {fragment:?}")]
    Malformed { field: String, fragment: String },

    /// The survey option heuristic matched no known shape.
    #[error("unsupported survey schema for {question:?}: option {option:?}")]
    UnsupportedSchema { question: String, option: String },

    /// The portal answered with its login prompt instead of data.
    #[error("session expired")]
    SessionExpired,

    #[error("fetch of {path} failed: {message}")]
    Fetch { path: String, message: String },
}

impl ScrapeError {
    pub fn malformed(field: impl Into<String>, fragment: impl Into<String>) -> Self {
        ScrapeError::Malformed {
            field: field.into(),
            fragment: fragment.into(),
        }
    }

    pub fn fetch(path: impl Into<String>, message: impl ToString) -> Self {
        ScrapeError::Fetch {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Structural failures: the source layout no longer matches what we parse.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            ScrapeError::UnexpectedToken { .. }
                | ScrapeError::Malformed { .. }
                | ScrapeError::UnsupportedSchema { .. }
        )
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ScrapeError::SessionExpired)
    }
}
