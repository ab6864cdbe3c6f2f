/// Error taxonomy for the viewer core
///
/// Every failure the engine can produce is one of these variants.
/// Callers at the `AppState` boundary recover with a safe default
/// (identity transform, white text, no-op) and only surface the
/// ones that have no default to the user.

use thiserror::Error;

use crate::state::data::Realm;

/// All errors produced by the viewer core
#[derive(Debug, Error)]
pub enum ViewerError {
    /// The realm already holds the maximum number of images
    #[error("realm `{realm}` already holds {capacity} images")]
    CapacityExceeded { realm: Realm, capacity: usize },

    /// An image could not be read or decoded
    #[error("could not decode image: {0}")]
    DecodeFailure(String),

    /// The backing store is unavailable or rejected the write
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] rusqlite::Error),

    /// A persisted record or payload could not be (de)serialized
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Brightness sampling produced no usable pixels
    #[error("brightness sampling failed")]
    SamplingFailure,

    /// A share link token is not a valid payload
    #[error("corrupt share payload: {0}")]
    CorruptSharePayload(String),

    /// Edits are refused in a shared view
    #[error("shared views are read-only")]
    ReadOnly,

    /// An action needs an image on screen and there is none
    #[error("no image is on screen")]
    NothingOnScreen,

    /// Filesystem error (config file, image files)
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ViewerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_message_names_realm() {
        let err = ViewerError::CapacityExceeded {
            realm: Realm::Eternal,
            capacity: 7,
        };
        assert_eq!(err.to_string(), "realm `eternal` already holds 7 images");
    }
}
