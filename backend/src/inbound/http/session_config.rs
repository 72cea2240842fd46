//! Session cookie settings.
//!
//! Builds the signing key and cookie flags from the loaded server settings.
//! Release builds insist on a key file of at least 64 bytes; debug builds
//! fall back to a generated key so the server starts without secrets.

use std::path::{Path, PathBuf};

use actix_web::cookie::{Key, SameSite};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use zeroize::Zeroize;

const SESSION_KEY_MIN_LEN: usize = 64;
const FINGERPRINT_BYTES: usize = 8;

/// Build mode for session configuration validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Debug builds tolerate a missing key file.
    Debug,
    /// Release builds require a key file.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use gatherings::inbound::http::session_config::BuildMode;
    ///
    /// let mode = BuildMode::from_debug_assertions();
    /// if cfg!(debug_assertions) {
    ///     assert_eq!(mode, BuildMode::Debug);
    /// } else {
    ///     assert_eq!(mode, BuildMode::Release);
    /// }
    /// ```
    #[must_use]
    pub const fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    const fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Cookie session settings.
pub struct SessionSettings {
    /// Signing and encryption key for cookie sessions.
    pub key: Key,
    /// Whether session cookies are marked `Secure`.
    pub cookie_secure: bool,
    /// `SameSite` policy for session cookies.
    pub same_site: SameSite,
}

/// Errors raised while preparing session settings.
#[derive(thiserror::Error, Debug)]
pub enum SessionConfigError {
    /// Release builds need an explicit key file.
    #[error("session_key_file must be set in release builds")]
    EphemeralNotAllowed,
    /// Reading the session key file failed.
    #[error("failed to read session key at {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The key file is shorter than the minimum.
    #[error("session key at {path} too short: need >= {min_len} bytes, got {length}")]
    KeyTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
}

/// Prepare session settings.
///
/// # Errors
///
/// Returns [`SessionConfigError`] when the key file cannot be read or is too
/// short, or when a release build has no key file.
///
/// # Examples
///
/// ```rust
/// use gatherings::inbound::http::session_config::{BuildMode, session_settings};
///
/// let settings = session_settings(None, false, BuildMode::Debug).expect("debug fallback");
/// assert!(!settings.cookie_secure);
/// ```
pub fn session_settings(
    key_file: Option<&Path>,
    cookie_secure: bool,
    mode: BuildMode,
) -> Result<SessionSettings, SessionConfigError> {
    let key = match key_file {
        Some(path) => read_key(path, mode)?,
        None if mode.is_debug() => {
            warn!("session_key_file not set; using temporary session key (dev only)");
            Key::generate()
        }
        None => return Err(SessionConfigError::EphemeralNotAllowed),
    };
    if !cookie_secure {
        warn!("session cookies are not marked Secure");
    }
    info!(fingerprint = %key_fingerprint(&key), "session key loaded");
    Ok(SessionSettings {
        key,
        cookie_secure,
        same_site: if mode.is_debug() {
            SameSite::Lax
        } else {
            SameSite::Strict
        },
    })
}

fn read_key(path: &Path, mode: BuildMode) -> Result<Key, SessionConfigError> {
    let mut bytes = std::fs::read(path).map_err(|source| SessionConfigError::KeyRead {
        path: path.to_path_buf(),
        source,
    })?;
    let length = bytes.len();
    // Key::derive_from panics below 32 bytes, so the floor applies in debug too.
    let min_len = if mode.is_debug() { 32 } else { SESSION_KEY_MIN_LEN };
    if length < min_len {
        bytes.zeroize();
        return Err(SessionConfigError::KeyTooShort {
            path: path.to_path_buf(),
            length,
            min_len,
        });
    }
    let key = Key::derive_from(&bytes);
    bytes.zeroize();
    Ok(key)
}

/// Truncated SHA-256 of the signing key, safe to log.
#[must_use]
pub fn key_fingerprint(key: &Key) -> String {
    let digest = Sha256::digest(key.signing());
    hex::encode(digest.iter().take(FINGERPRINT_BYTES).copied().collect::<Vec<u8>>())
}
