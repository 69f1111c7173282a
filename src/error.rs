//! Error taxonomy for the surface subsystem.
//!
//! Every fallible operation reports one of a small fixed set of kinds.
//! Failures are synchronous and never retried internally; a rejected
//! creation allocates nothing and a rejected blit leaves the destination
//! untouched.

/// Errors surfaced at the subsystem boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    /// Malformed or contradictory parameters (conflicting flags, missing
    /// required fields, missing required color key).
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// Capability-flag combination that names no valid surface kind.
    #[error("invalid capability combination: {0}")]
    InvalidCaps(&'static str),

    /// Geometry or capability mismatch when attaching surfaces.
    #[error("cannot attach surface: {0}")]
    CannotAttach(&'static str),

    /// No attached surface matched the filter, or no stored color key.
    #[error("not found: {0}")]
    NotFound(&'static str),

    /// Interface version that this object does not expose.
    #[error("no such interface: version {0}")]
    NoInterface(u32),

    /// The surface's pixel buffer is locked by another caller.
    #[error("surface is busy")]
    SurfaceBusy,

    /// Functionality the backend does not provide.
    #[error("unsupported by backend: {0}")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, SurfaceError>;
