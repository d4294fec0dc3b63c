//! Interface-name validation and random-name generation.
//!
//! Names are checked against the host kernel's constraints before any
//! backend call, so a bad name always surfaces as [`Error::Validation`]
//! rather than an opaque backend failure.

use crate::Error;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        /// Kernel buffer size for an interface name, terminating NUL included.
        pub const IFNAMSIZ: usize = libc::IFNAMSIZ;
    } else {
        pub const IFNAMSIZ: usize = 16;
    }
}

/// Checks that `name` is acceptable as a host interface name: non-empty,
/// shorter than [`IFNAMSIZ`] (null-terminated) and free of NUL, whitespace
/// and `/` bytes.
pub fn validate(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::Validation("interface name is empty".to_string()));
    }
    if name.len() >= IFNAMSIZ {
        return Err(Error::Validation(format!(
            "interface name is > {} (null-terminated): {:?}",
            IFNAMSIZ - 1,
            name
        )));
    }
    if name.bytes().any(|b| b == 0 || b == b'/') || name.contains(char::is_whitespace) {
        return Err(Error::Validation(format!(
            "interface name contains invalid characters: {name:?}"
        )));
    }
    Ok(())
}

/// Produces `prefix` followed by a random hex suffix, always short enough
/// to pass [`validate`].
///
/// Uniqueness among live interfaces is only established by the backend at
/// creation time; a race with an external creator surfaces as a conflict
/// error from the create call, never as a silent retry.
pub(crate) fn random(prefix: &str) -> String {
    format!("{}{:08x}", prefix, rand::random::<u32>())
}
