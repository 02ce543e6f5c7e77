//! Physics error taxonomy
//!
//! Setup-time failures are fatal and unrecoverable: there is no
//! partial-simulation mode. Per-body capacity failures are reported to the
//! caller, which decides whether to retry after removing bodies or to skip
//! the entity. Operating on a stale [`BodyHandle`](super::BodyHandle) is a
//! programmer error handled by debug assertions, not by this enum.

use super::layers::CollisionLayer;
use thiserror::Error;

/// Errors reported by the physics subsystem
#[derive(Error, Debug)]
pub enum PhysicsError {
    /// Physics world or worker pool initialization failed (fatal at startup)
    #[error("physics setup failed: {0}")]
    Setup(String),

    /// A collision layer outside the configured matrix was referenced
    /// (fatal at setup time, never silently defaulted)
    #[error("unknown collision layer {0:?}")]
    UnknownLayer(CollisionLayer),

    /// Body creation beyond the configured capacity (recoverable: existing
    /// bodies are untouched and the caller may retry after removing some)
    #[error("body capacity exceeded: {max_bodies} bodies already live")]
    CapacityExceeded {
        /// The configured body cap that was hit
        max_bodies: usize,
    },

    /// A dynamic body was requested with a non-positive mass. Routing
    /// `mass == 0` to a static body is the component layer's policy;
    /// `Simulation` treats mass strictly.
    #[error("dynamic body requires positive mass, got {0}")]
    InvalidMass(f32),
}
