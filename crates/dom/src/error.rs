//! Error types for tree serialization
//!
//! Simple, flat error hierarchy. No over-engineering.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomError>;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(u32),

    #[error("Style sheet not found: {0}")]
    SheetNotFound(u32),

    #[error("No root node set")]
    NoRoot,

    #[error("Node {0} has no shadow root")]
    NoShadowRoot(u32),

    #[error("Appending node {child} to {parent} would create a cycle")]
    CyclicTree { parent: u32, child: u32 },

    #[error("Invalid node type: expected {expected}, got {actual}")]
    InvalidNodeType { expected: String, actual: String },

    #[error("Malformed tree snapshot: {0}")]
    MalformedTree(String),

    #[error("Invalid style cache key: {0:?}")]
    InvalidCacheKey(String),

    #[error("Global style failed to resolve: {0}")]
    GlobalStyle(String),

    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Maximum tree depth exceeded: {current} > {max}")]
    MaxDepthExceeded { current: usize, max: usize },
}
