//! Error handling for simvox
//!
//! This module defines the crate error type and a Result alias. Note that
//! nothing on the dispatch hot path returns these errors: overflow, unknown
//! variables and partial display refreshes are normal conditions that are
//! counted or logged instead. Errors are reserved for configuration, catalog
//! loading and channel plumbing.

use thiserror::Error;

/// Main error type for simvox operations
#[derive(Error, Debug)]
pub enum SimVoxError {
    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to variable registry catalogs
    #[error("Registry error: {0}")]
    Registry(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<SimVoxError>,
    },
}

impl SimVoxError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        SimVoxError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for SimVoxError {
    fn from(err: serde_json::Error) -> Self {
        SimVoxError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for SimVoxError {
    fn from(err: toml::de::Error) -> Self {
        SimVoxError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for SimVoxError {
    fn from(err: toml::ser::Error) -> Self {
        SimVoxError::Serialization(err.to_string())
    }
}

/// Result type alias for simvox operations
pub type Result<T> = std::result::Result<T, SimVoxError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
