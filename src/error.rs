//! Error types for scene, render, resource and configuration operations.

use thiserror::Error;

use crate::overlay::OverlayId;

/// Invariant violations raised by scene operations.
///
/// These indicate a programming error in the caller (acting on an overlay
/// that does not exist, establishing without a drawing handler, ...).
#[derive(Error, Debug)]
pub enum SceneError {
    /// No overlay with this id is registered in the scene
    #[error("Overlay not found: {id}")]
    OverlayNotFound {
        /// The missing overlay id
        id: OverlayId,
    },

    /// An overlay with this id is already registered
    #[error("Overlay already exists: {id}")]
    DuplicateOverlay {
        /// The conflicting overlay id
        id: OverlayId,
    },

    /// The operation needs a canonical media overlay
    #[error("Scene has no canonical media")]
    NoCanonicalMedia,

    /// The operation needs a media overlay
    #[error("Overlay '{id}' is not a media overlay")]
    NotMedia {
        /// The offending overlay id
        id: OverlayId,
    },

    /// The operation needs a bounding box overlay
    #[error("Overlay '{id}' is not a spatial overlay")]
    NotSpatial {
        /// The offending overlay id
        id: OverlayId,
    },

    /// A requested paint order is not a permutation of the registered overlays
    #[error("Invalid overlay order: {message}")]
    InvalidOverlayOrder {
        /// Description of what is wrong with the order
        message: String,
    },

    /// Establishing requires interactive mode
    #[error("No interactive detection handler is active")]
    NoInteractiveHandler,

    /// Commit was requested before a box was drawn
    #[error("No established bounds to commit")]
    NothingEstablished,

    /// The scene was destroyed
    #[error("Scene has been destroyed")]
    Destroyed,

    /// Shared render context misuse
    #[error("Render context error: {0}")]
    Context(#[from] ContextError),
}

impl SceneError {
    /// Create an overlay-not-found error.
    pub fn not_found(id: &OverlayId) -> Self {
        Self::OverlayNotFound { id: id.clone() }
    }

    /// Create an invalid order error with a message.
    pub fn invalid_order(message: impl Into<String>) -> Self {
        Self::InvalidOverlayOrder {
            message: message.into(),
        }
    }
}

/// Per-overlay render faults. Caught by the render loop, never propagated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The drawing backend rejected a draw call
    #[error("Backend error: {message}")]
    Backend {
        /// Backend-provided description
        message: String,
    },

    /// A resource the overlay depends on failed to load
    #[error("Resource error: {0}")]
    Resource(#[from] LoadError),
}

impl RenderError {
    /// Create a backend error with a message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Resource loading faults.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Nothing exists at the url
    #[error("Resource not found: {url}")]
    NotFound {
        /// The requested url
        url: String,
    },

    /// The resource exists but could not be decoded
    #[error("Failed to decode '{url}': {message}")]
    Decode {
        /// The requested url
        url: String,
        /// Decoder message
        message: String,
    },

    /// Every retry failed
    #[error("Giving up on '{url}' after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// The requested url
        url: String,
        /// Number of attempts made
        attempts: u32,
        /// The error from the final attempt
        last_error: String,
    },
}

impl LoadError {
    /// Create a decode error.
    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Errors from the shared render context lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// `acquire` was called before `init`
    #[error("Render context not initialized")]
    NotInitialized,

    /// `init` was called twice without `shutdown`
    #[error("Render context already initialized")]
    AlreadyInitialized,

    /// `shutdown` was called while scenes are still attached
    #[error("Render context still in use by {attached} scene(s)")]
    InUse {
        /// Number of attached scenes
        attached: usize,
    },
}
