use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Opaque bearer token. Never parsed, only attached to requests.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Process-wide holder of the console credential.
///
/// Clones share the same slot. When built with [`Session::persistent`] the
/// credential is mirrored to a token file so it survives restarts.
#[derive(Clone, Default)]
pub struct Session {
    slot: Arc<RwLock<Option<Credential>>>,
    token_file: Option<Arc<PathBuf>>,
}

impl Session {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Session backed by `path`. A token already stored there is picked up.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stored = read_token_file(&path);
        if stored.is_some() {
            debug!(path = %path.display(), "restored stored credential");
        }
        Self {
            slot: Arc::new(RwLock::new(stored)),
            token_file: Some(Arc::new(path)),
        }
    }

    pub fn set(&self, credential: Credential) {
        if let Some(path) = &self.token_file {
            if let Err(e) = write_token_file(path, &credential) {
                warn!(path = %path.display(), error = %e, "failed to store credential");
            }
        }
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = Some(credential);
    }

    pub fn get(&self) -> Option<Credential> {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        if let Some(path) = &self.token_file {
            match std::fs::remove_file(path.as_path()) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove stored credential"),
            }
        }
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn is_active(&self) -> bool {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("active", &self.is_active())
            .field("token_file", &self.token_file)
            .finish()
    }
}

fn read_token_file(path: &Path) -> Option<Credential> {
    let raw = std::fs::read_to_string(path).ok()?;
    let token = raw.trim();
    if token.is_empty() {
        None
    } else {
        Some(Credential::new(token))
    }
}

fn write_token_file(path: &Path, credential: &Credential) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts.open(path)?;
    // `mode` only applies on creation; tighten a file left by an older run
    // before the token goes in.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(credential.as_str().as_bytes())?;
    Ok(())
}
