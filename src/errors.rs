/*!
 * Error types for the readaloud application.
 *
 * This module contains custom error types for the layout, speech and playback
 * subsystems, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors raised by a structured-document backend while reading a document
#[derive(Error, Debug)]
pub enum LayoutError {
    /// The byte stream does not carry a signature the backend understands
    #[error("Unsupported document format")]
    UnsupportedFormat,

    /// The backend could not load the document
    #[error("Failed to load document: {0}")]
    LoadFailed(String),

    /// A page could not be decoded
    #[error("Failed to decode page {page}: {message}")]
    PageDecode {
        /// Zero-based page index
        page: usize,
        /// Backend message
        message: String,
    },
}

/// Errors that can occur when talking to a speech backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// Error when making a synthesis request fails
    #[error("Synthesis request failed: {0}")]
    RequestFailed(String),

    /// Error returned by the speech service itself
    #[error("Speech service responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the service
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The returned audio could not be decoded
    #[error("Failed to decode audio: {0}")]
    DecodeError(String),

    /// The backend is not available in this process
    #[error("Speech backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur while synthesizing a line
#[derive(Error, Debug)]
pub enum SpeechError {
    /// Error from the speech backend
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Error while encoding or decoding WAV data
    #[error("Audio error: {0}")]
    Audio(String),

    /// Error while persisting or loading an audio artifact
    #[error("Audio store error: {0}")]
    Store(#[from] std::io::Error),
}

impl From<hound::Error> for SpeechError {
    fn from(error: hound::Error) -> Self {
        Self::Audio(error.to_string())
    }
}

/// Error reported by an event subscriber during notification
#[derive(Error, Debug)]
pub enum SubscriberError {
    /// The subscriber could not deliver the event to its sink
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// The subscriber's sink has gone away
    #[error("Subscriber closed")]
    Closed,
}

/// Errors raised by configuration validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A field holds a value outside its accepted range
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Field name in the configuration file
        field: String,
        /// What is wrong with it
        message: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from layout extraction
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Error from speech synthesis
    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    /// Error from configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

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
