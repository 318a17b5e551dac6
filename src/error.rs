//! Error taxonomy shared by the query, mutation and processing paths.
//!
//! The HTTP layer maps each variant to a distinct status code (see
//! [`crate::server`]); the CLI simply prints the message.

use thiserror::Error;

/// Errors produced by chunk operations and their collaborators.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// The caller supplied an unusable request (missing fields, bad patch).
    #[error("{0}")]
    InvalidArgument(String),

    /// The requested chunk does not exist in the index.
    #[error("{0}")]
    NotFound(String),

    /// An embedding, vector-store or language-model call failed or
    /// returned an unusable result.
    #[error("{provider} error: {message}")]
    Upstream {
        /// Collaborator that failed (e.g. `"pinecone"`, `"voyage"`).
        provider: String,
        /// Upstream message, wrapped verbatim.
        message: String,
    },

    /// A required credential or setting is absent at first use.
    #[error("{0} is not configured")]
    ConfigurationMissing(String),
}

impl ChunkError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_found(id: &str) -> Self {
        Self::NotFound(format!("Chunk with id {} not found", id))
    }

    pub fn upstream(provider: impl Into<String>, message: impl ToString) -> Self {
        Self::Upstream {
            provider: provider.into(),
            message: message.to_string(),
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, ChunkError>;
