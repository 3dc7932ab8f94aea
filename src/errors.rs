//! Error types
//!
//! Playback failures that are recovered by retry/failover, and server
//! exhaustion, are controller states rather than errors. They reach the user
//! through the player status line.

use thiserror::Error;

/// The source document could not be obtained or understood
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("Read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decompression failed: {0}")]
    Decompress(String),

    #[error("Invalid document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Document is not a JSON object")]
    NotAnObject,
}

/// Resolver outcomes that end up as a dedicated view instead of a player
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No event or channel matches the request")]
    NoMatch,

    #[error("No valid stream URLs found for this item")]
    NoPlayableLinks,
}

/// Host media stack failures
#[derive(Error, Debug)]
pub enum MediaError {
    /// The player could not be constructed; fatal for the session
    #[error("Player '{player}' is not available: {reason}")]
    PlayerInit { player: String, reason: String },

    #[error("Failed to launch player '{player}': {source}")]
    Spawn {
        player: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Source rejected: {0}")]
    Rejected(String),
}
