//! Rate limiting errors.

/// Errors returned by [`crate::RateLimiter::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    /// The run was cancelled while waiting for a token.
    #[error("cancelled while waiting for a rate limit token")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            RateLimitError::Cancelled.to_string(),
            "cancelled while waiting for a rate limit token"
        );
    }
}
