//! Sanitized error categories for the HTTP boundary.
//!
//! Internal error types (`RepositoryError`, `ProviderError`, `UseCaseError`, ...) carry
//! whatever detail is useful for logging. `Categorizable` maps any of them to an
//! `ErrorCategory` plus a message that is safe to hand back to an HTTP caller — no SQL
//! text, no provider response bodies, nothing that isn't already described in the
//! Validation/NotFound cases.
//!
//! # Safe message contract
//!
//! Only `Validation` and `SyncStatus` categories may return their `Display` text
//! verbatim; every other category must return a generic message.

use std::borrow::Cow;

/// Sanitized error category, independent of the concrete error type that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input; HTTP 400; never retried; never reaches a provider.
    Validation,
    /// A routing is not in a legal state for the requested transition; non-fatal.
    SyncStatus,
    /// Missing or malformed provider credentials; HTTP 502 on synchronous paths.
    ProviderNotConfigured,
    /// Provider rate limit; retryable, consumed by the retry executor.
    ProviderRateLimited,
    /// Provider returned a non-retryable 4xx (not rate-limit).
    ProviderApiError,
    /// Provider returned a 5xx / network error / timeout; retryable.
    ProviderTransient,
    /// Unexpected database error; HTTP 500; transaction rolled back.
    Database,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::Validation => "validation_error",
            ErrorCategory::SyncStatus => "sync_status_error",
            ErrorCategory::ProviderNotConfigured => "provider_not_configured",
            ErrorCategory::ProviderRateLimited => "provider_rate_limited",
            ErrorCategory::ProviderApiError => "provider_api_error",
            ErrorCategory::ProviderTransient => "provider_transient_error",
            ErrorCategory::Database => "database_error",
        };
        write!(f, "{s}")
    }
}

impl ErrorCategory {
    /// HTTP status this category maps to at the API boundary.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCategory::Validation => 400,
            ErrorCategory::SyncStatus => 409,
            ErrorCategory::ProviderNotConfigured => 502,
            ErrorCategory::ProviderRateLimited => 429,
            ErrorCategory::ProviderApiError => 502,
            ErrorCategory::ProviderTransient => 502,
            ErrorCategory::Database => 500,
        }
    }

    /// Whether the retry executor (C7) should retry an error of this category.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::ProviderRateLimited | ErrorCategory::ProviderTransient
        )
    }
}

/// Implemented by every internal error enum so it can be safely surfaced at a boundary.
pub trait Categorizable: std::error::Error {
    fn category(&self) -> ErrorCategory;

    /// A message safe to return to an HTTP caller or persist in `error_message`.
    ///
    /// Only `Validation` and `SyncStatus` may echo internal detail; every other
    /// category must return a fixed, generic string.
    fn safe_message(&self) -> Cow<'static, str>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_categories() {
        assert!(ErrorCategory::ProviderRateLimited.is_retryable());
        assert!(ErrorCategory::ProviderTransient.is_retryable());
        assert!(!ErrorCategory::ProviderApiError.is_retryable());
        assert!(!ErrorCategory::Validation.is_retryable());
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(ErrorCategory::Validation.http_status(), 400);
        assert_eq!(ErrorCategory::Database.http_status(), 500);
        assert_eq!(ErrorCategory::ProviderNotConfigured.http_status(), 502);
    }
}
