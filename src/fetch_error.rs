#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Remote API unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),
    #[error("Remote API rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Only transport failures are worth another attempt; a rejection or a
    /// bad body will come back the same way.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Unavailable(_))
    }
}
