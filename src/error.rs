// THEORY:
// Every failure the engine can produce is named here. Both public components are
// fail-soft or fail-closed at their outer boundary (an empty detection, a `false`
// verification), but internally each failure keeps its reason so that callers and
// logs can tell "no holds found" apart from "the upload was not an image", and
// "wrong signature" apart from "the operator never configured a bot token".

use thiserror::Error;

/// Why a detection run produced no result.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// The uploaded buffer had no bytes at all.
    #[error("input image data is empty")]
    EmptyInput,

    /// The bytes or file could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Scan parameters or the colour registry are unusable.
    #[error("invalid detection configuration: {0}")]
    InvalidConfig(String),

    /// The caller raised the cancel flag before the scan finished.
    #[error("scan cancelled")]
    Cancelled,

    /// The scan pool has shut down or a worker dropped its reply.
    #[error("scan pool is closed")]
    PoolClosed,
}

/// Why a launch payload was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// No bot token is configured; every payload is rejected.
    #[error("bot token is not configured")]
    MissingToken,

    /// The payload carries no `hash` field.
    #[error("launch payload has no hash")]
    MissingHash,

    /// The `hash` field is not a lowercase hex SHA-256 digest.
    #[error("launch payload hash is not a lowercase hex digest")]
    MalformedHash,

    /// The payload itself could not be read as a flat key/value map.
    #[error("malformed launch payload: {0}")]
    MalformedPayload(String),

    /// The computed HMAC does not match the supplied hash.
    #[error("launch payload signature mismatch")]
    SignatureMismatch,
}
