use thiserror::Error;

/// Message shown when the scoring service fails without saying why.
pub const GENERIC_SCORING_FAILURE: &str = "Scoring failed.";

/// Every way an analysis cycle can fail.
/// All variants are caught at the top of the cycle and rendered with `user_message`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("No active tab found.")]
    NoActiveTab,

    #[error("Could not extract JD text from this page.")]
    EmptyExtraction,

    /// Non-2xx status or a body that is not JSON.
    #[error("{0}")]
    ScoringService(String),

    #[error("{0}")]
    Network(String),

    #[error("Could not read the active tab: {0}")]
    TabLoad(String),
}

impl AnalysisError {
    /// Single-line status text, e.g. `Error: bad input`.
    pub fn user_message(&self) -> String {
        format!("Error: {self}")
    }
}

impl From<reqwest::Error> for AnalysisError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Network error: {err}");
        AnalysisError::Network(err.to_string())
    }
}
