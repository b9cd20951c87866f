/*!
 * Error types for the loctrans application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// No provider passed startup validation, or all were disabled
    #[error("No translation provider available")]
    NoProviderAvailable,

    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// A rate-limiter slot could not be acquired within the wait ceiling
    #[error("Rate limit wait timed out: {0}")]
    RateLimitTimeout(String),

    /// All retry attempts were exhausted for a translate call
    #[error("Provider {provider} failed after {attempts} attempts for languages [{languages}]: {message}")]
    Exhausted {
        /// Name of the last provider tried
        provider: String,
        /// Number of attempts made
        attempts: u32,
        /// Languages that were in flight
        languages: String,
        /// Last underlying error message
        message: String,
    },
}

/// Errors that can occur when loading or persisting the translation cache
#[derive(Error, Debug)]
pub enum CacheError {
    /// The persisted store could not be decoded
    #[error("Cache store is corrupt: {0}")]
    Corruption(String),

    /// Filesystem error while reading or writing the store
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store could not be serialized for persistence
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors that can occur while reading or writing localization files
#[derive(Error, Debug)]
pub enum LocalizationError {
    /// The file has no parsable header row
    #[error("Missing or invalid header in {0}")]
    InvalidHeader(String),

    /// A row does not line up with the header columns
    #[error("Malformed row {row} in {file}: {message}")]
    MalformedRow {
        /// Path of the offending file
        file: String,
        /// 1-based row number
        row: usize,
        /// What went wrong
        message: String,
    },

    /// Filesystem error
    #[error("Localization file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the translation cache
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Error from localization file handling
    #[error("Localization error: {0}")]
    Localization(#[from] LocalizationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
