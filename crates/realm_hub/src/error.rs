//! Error types and handling for the realm hub.
//!
//! This module defines the error types that can occur during hub operations,
//! providing clear categorization of different failure modes.

/// Enumeration of possible hub errors.
///
/// Categorizes errors into network, authentication, and internal failures.
/// Every error is scoped to a single connection or operation; nothing in
/// this crate treats an error as fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Network-related errors such as binding failures or handshake issues
    #[error("Network error: {0}")]
    Network(String),

    /// Connection authentication failures (bad or expired tokens)
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Internal hub errors including serialization and channel failures
    #[error("Internal error: {0}")]
    Internal(String),
}
