use std::io;
use thiserror::Error;

/// Error types for rig loading, pose track decoding and compilation
#[derive(Error, Debug)]
pub enum AnimError {
    /// I/O error while reading a rig or pose file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed GHS rig description
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary decoding error from the shared byte reader
    #[error(transparent)]
    Pm2(#[from] ghs_pm2::Pm2Error),

    /// Rig, default bindings and clips disagree about joints
    #[error("Invalid rig: {0}")]
    InvalidRig(String),

    /// Pose track layout is inconsistent
    #[error("Invalid pose track: {0}")]
    InvalidPoseTrack(String),
}

/// Result type using AnimError
pub type Result<T> = std::result::Result<T, AnimError>;
