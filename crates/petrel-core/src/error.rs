use thiserror::Error;

/// Application-wide error types for petrel.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// The API answered HTTP 429. Always retried by the fetcher stack,
    /// so callers above the retry layer normally never see this.
    #[error("rate limited by API")]
    RateLimited,

    /// The request could not be completed at the transport level
    /// (connection refused, host unreachable, DNS failure).
    #[error("transport failure: {0}")]
    Transport(String),

    /// Request timed out.
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Non-200 response (other than the retried 429 case).
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Response body failed to parse or lacked an expected field.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A collected blob failed the well-formedness check at commit time.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The output sink could not be written.
    #[error("sink error: {0}")]
    Sink(String),
}

impl From<serde_json::Error> for HarvestError {
    fn from(e: serde_json::Error) -> Self {
        HarvestError::MalformedResponse(e.to_string())
    }
}

impl HarvestError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HarvestError::RateLimited | HarvestError::Transport(_) | HarvestError::Timeout(_)
        )
    }

    /// Returns true for transport-class failures (retried exactly once).
    pub fn is_transport(&self) -> bool {
        matches!(self, HarvestError::Transport(_) | HarvestError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(HarvestError::RateLimited.is_retryable());
        assert!(HarvestError::Transport("refused".into()).is_retryable());
        assert!(HarvestError::Timeout(30).is_retryable());
        assert!(!HarvestError::HttpStatus(404).is_retryable());
        assert!(!HarvestError::MalformedResponse("bad json".into()).is_retryable());
        assert!(!HarvestError::Validation("not an array".into()).is_retryable());
    }

    #[test]
    fn test_transport_class() {
        assert!(HarvestError::Transport("dns".into()).is_transport());
        assert!(HarvestError::Timeout(30).is_transport());
        assert!(!HarvestError::RateLimited.is_transport());
        assert!(!HarvestError::HttpStatus(500).is_transport());
    }

    #[test]
    fn test_from_serde_json() {
        let err: HarvestError =
            serde_json::from_str::<serde_json::Value>("{not json").unwrap_err().into();
        assert!(matches!(err, HarvestError::MalformedResponse(_)));
    }
}
