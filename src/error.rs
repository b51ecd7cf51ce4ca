use thiserror::Error;

pub const SIGN_IN_MESSAGE: &str = "Please sign in to search documents.";
pub const UNAVAILABLE_MESSAGE: &str = "Search is unavailable right now. Try again in a moment.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("not signed in")]
    Unauthenticated,
    #[error("search request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
}

impl SearchError {
    /// Message shown in the dropdown, one per failure kind.
    pub fn user_message(&self) -> String {
        match self {
            SearchError::Unauthenticated => SIGN_IN_MESSAGE.to_string(),
            SearchError::RequestFailed { status, .. } => {
                format!("The search request failed (status {status}).")
            }
            SearchError::Network(_) => UNAVAILABLE_MESSAGE.to_string(),
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SearchError::Network("request timed out".to_string())
        } else {
            SearchError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(SearchError::Unauthenticated.user_message(), SIGN_IN_MESSAGE);
        let failed = SearchError::RequestFailed {
            status: 500,
            message: "boom".into(),
        };
        let network = SearchError::Network("refused".into());
        assert_eq!(failed.user_message(), "The search request failed (status 500).");
        assert_eq!(network.user_message(), UNAVAILABLE_MESSAGE);
        assert_ne!(failed.user_message(), network.user_message());
        assert_ne!(failed.user_message(), SIGN_IN_MESSAGE);
    }
}
