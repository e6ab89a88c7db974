//! Types shared across the factcheck crates.
//!
//! Every crate in the workspace depends on it:
//!
//! - [`FactcheckError`] and [`Result`]: shared error handling
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use factcheck_common::{FactcheckError, Result};
//!
//! fn fails() -> Result<()> {
//!     Err(FactcheckError::Upstream("Gemini API error (429): quota".into()))
//! }
//!
//! let err = fails().unwrap_err();
//! assert_eq!(err.to_string(), "Upstream error: Gemini API error (429): quota");
//! ```
pub mod observability;

/// Error types used across the factcheck service.
#[derive(thiserror::Error, Debug)]
pub enum FactcheckError {
    /// The remote model API failed or answered with an error status.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FactcheckError {
    /// Message without the variant prefix, suitable for surfacing to callers.
    pub fn detail(&self) -> String {
        match self {
            FactcheckError::Upstream(msg) | FactcheckError::Config(msg) => msg.clone(),
        }
    }
}

/// Convenient alias for results that use [`FactcheckError`].
pub type Result<T> = std::result::Result<T, FactcheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_strips_variant_prefix() {
        let err = FactcheckError::Upstream("Invalid API key".into());
        assert_eq!(err.detail(), "Invalid API key");
        assert_eq!(err.to_string(), "Upstream error: Invalid API key");
    }

    #[test]
    fn config_detail_has_no_prefix() {
        let err = FactcheckError::Config("bad base url".into());
        assert_eq!(err.detail(), "bad base url");
        assert_eq!(err.to_string(), "Configuration error: bad base url");
    }
}
