//! Error types for level loading, stepping and checkpoint persistence.

use thiserror::Error;

use crate::sim::{BodyKind, Owner, PoolId};

/// Errors raised while stepping the simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// The collision table has no row for this pair of kinds.
    #[error("Unclassified collision {first:?} ({first_owner:?}) vs {second:?} ({second_owner:?})")]
    UnclassifiedPair {
        first: BodyKind,
        first_owner: Owner,
        second: BodyKind,
        second_owner: Owner,
    },

    /// A broad-phase query was issued before the previous one was drained.
    #[error("Spatial query issued with {pending} overlapping pairs still pending")]
    QueryNotDrained { pending: usize },

    /// A pool was configured without any slots.
    #[error("Pool {0:?} has zero capacity")]
    EmptyPool(PoolId),

    /// A handle no longer resolves to a live body.
    #[error("Stale body handle {0:?}")]
    MissingBody(Owner),

    #[error(transparent)]
    Level(#[from] LevelError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised while reading level data.
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("Unknown entity type '{0}'")]
    UnknownEntity(String),

    #[error("Unknown area type '{0}'")]
    UnknownArea(String),

    /// Text triggers carry exactly `string`, `repeat` and `ttl`.
    #[error("Expected {expected} properties on '{entity}', found {found}")]
    PropertyCount {
        entity: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid value '{value}' for property '{key}'")]
    InvalidProperty { key: String, value: String },

    #[error("Unknown tile {value} at ({x}, {y})")]
    UnknownTile { value: u8, x: u32, y: u32 },

    #[error("Tilemap mismatch: expected {expected} tiles for {width}x{height}, got {found}")]
    TilemapSize {
        width: u32,
        height: u32,
        expected: usize,
        found: usize,
    },

    #[error("Tilemap of {width}x{height} tiles is too large to address")]
    TilemapTooLarge { width: u32, height: u32 },

    #[error("Level has no player spawn")]
    MissingPlayer,

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised by a checkpoint store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access checkpoint file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed checkpoint data: {0}")]
    Format(#[from] serde_json::Error),
}
