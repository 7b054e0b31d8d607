//! Session snapshot file I/O.
//!
//! Writes the current user and token pair to a versioned JSON file with
//! 0o600 permissions so a later process start can restore the session
//! without re-prompting for credentials. Loading is tolerant: a missing,
//! unreadable, malformed, or wrong-version file is treated as "no saved
//! session".

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use taskline_backend::Session;
use taskline_core::User;

use crate::errors::StoreError;

/// Default snapshot file name.
const SESSION_FILE_NAME: &str = "session.json";

/// Snapshot format version.
const VERSION: u32 = 1;

/// On-disk shape of a saved session.
#[derive(Debug, Serialize, Deserialize)]
pub struct SavedSession {
    /// Snapshot format version.
    pub version: u32,
    /// Profile as last observed; refreshed after restore.
    pub user: User,
    /// Token pair used to resume the backend session.
    pub session: Session,
    /// When the snapshot was written, RFC 3339.
    pub saved_at: String,
}

/// Snapshot file path under the given data directory.
pub fn session_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SESSION_FILE_NAME)
}

/// Load a saved session, if a valid one exists.
pub fn load_saved_session(path: &Path) -> Option<SavedSession> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("failed to read session file: {e}");
            return None;
        }
    };

    match serde_json::from_str::<SavedSession>(&data) {
        Ok(saved) if saved.version == VERSION => Some(saved),
        Ok(saved) => {
            tracing::warn!("unsupported session snapshot version: {}", saved.version);
            None
        }
        Err(e) => {
            tracing::warn!("failed to parse session file: {e}");
            None
        }
    }
}

/// Save the session snapshot, creating parent directories if needed and
/// restricting permissions to 0o600.
pub fn save_session(path: &Path, user: &User, session: &Session) -> Result<(), StoreError> {
    let saved = SavedSession {
        version: VERSION,
        user: user.clone(),
        session: session.clone(),
        saved_at: chrono::Utc::now().to_rfc3339(),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(&saved)?;
    std::fs::write(path, &json)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        let _ = std::fs::set_permissions(path, perms);
    }

    Ok(())
}

/// Remove the snapshot. Missing files are fine.
pub fn clear_session(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("failed to remove session file: {e}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
