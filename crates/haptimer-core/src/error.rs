//! Core error types for haptimer-core.
//!
//! Every error here is local and recoverable: the operation that produced it
//! was rejected and the prior state is retained.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::timer::CountdownState;

/// Core error type for haptimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid engine state transition
    #[error("Precondition violation: {0}")]
    Precondition(#[from] PreconditionViolation),

    /// Trigger point placement rejected
    #[error("Placement error: {0}")]
    Placement(#[from] PlacementError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Saved timer storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Invalid countdown engine transition.
///
/// The engine state is never modified when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionViolation {
    /// The command is not allowed in the current state
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: CountdownState,
    },

    /// Duration outside the supported range
    #[error("duration {duration}s is outside {min}..={max}s")]
    DurationOutOfRange { duration: u32, min: u32, max: u32 },

    /// The deadline passed and the next tick has not completed the countdown yet
    #[error("cannot pause: the countdown has already run out")]
    CountdownElapsed,
}

/// Trigger point placement errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// Another point sits within the minimum spacing
    #[error("{at}s is within {spacing}s of the point at {neighbour}s")]
    TooClose { at: u32, neighbour: u32, spacing: u32 },

    /// Outside `(0, duration - spacing]`
    #[error("{at}s is outside the valid range 1..={max}s")]
    OutOfRange { at: u32, max: u32 },

    /// Tier capacity for custom points reached
    #[error("maximum of {capacity} haptic points reached")]
    CapacityReached { capacity: usize },

    /// Randomized placement exhausted its attempts
    #[error("no free position found after {attempts} attempts")]
    NoValidPositionFound { attempts: usize },

    /// The completion point cannot be moved or removed
    #[error("the completion point cannot be moved or removed")]
    MutationOfMandatoryPoint,

    /// Unknown point id
    #[error("no haptic point with id {0}")]
    PointNotFound(Uuid),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Saved timer storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt timer store {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no saved timer named '{0}'")]
    NotFound(String),

    /// All saved timer slots for the tier are in use
    #[error("all {slots} saved timer slots are in use")]
    SlotsExhausted { slots: usize },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
