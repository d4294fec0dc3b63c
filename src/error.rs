use thiserror::Error as ThisError;

#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum Error {
    /// Malformed input, rejected before any backend call is made.
    #[error("invalid parameter: {0}")]
    Validation(String),
    /// A referenced interface, master device or namespace target does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Name collision, address already present/absent, device already enslaved.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Opaque failure surfaced from the kernel-facing backend.
    #[error("backend failure: {0}")]
    Backend(String),
    /// No kernel-facing backend is available on this host.
    #[error("not implemented on this platform")]
    UnsupportedPlatform,
}
