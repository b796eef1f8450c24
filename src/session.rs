//! Persisted login state and the per-check-in context built from it.

use crate::error::SessionError;
use crate::model::{BenefitCategory, GuardSession, Period};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SESSION_FILE: &str = "session.bin";

/// What survives between runs: the credential, who it belongs to, and the
/// benefit the guard last selected.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    pub guard: GuardSession,
    pub benefit: BenefitCategory,
}

// Keep the credential out of debug output
impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession")
            .field("access_token", &"<redacted>")
            .field("guard", &self.guard)
            .field("benefit", &self.benefit)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store the session inside `dir` (normally the app data dir).
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        SessionStore {
            path: dir.as_ref().join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when nobody is logged in.
    pub fn load(&self) -> Result<Option<StoredSession>, SessionError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session: StoredSession = bincode::deserialize_from(BufReader::new(file))?;
        debug!(guard = %session.guard.username, "loaded session");
        Ok(Some(session))
    }

    pub fn require(&self) -> Result<StoredSession, SessionError> {
        self.load()?.ok_or(SessionError::NotLoggedIn)
    }

    pub fn save(&self, session: &StoredSession) -> Result<(), SessionError> {
        if let Some(dir) = self.path.parent() {
            create_dir_all(dir)?;
        }
        // Write beside the real file and rename, so a crash mid-write never
        // leaves a truncated session behind
        let tmp = self.path.with_extension("bin.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            bincode::serialize_into(&mut writer, session)?;
            std::io::Write::flush(&mut writer)?;
        }
        std::fs::rename(&tmp, &self.path)?;
        info!(guard = %session.guard.username, "session saved");
        Ok(())
    }

    pub fn save_benefit(&self, benefit: BenefitCategory) -> Result<StoredSession, SessionError> {
        let mut session = self.require()?;
        session.benefit = benefit;
        self.save(&session)?;
        Ok(session)
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("session cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Read-only inputs for one check-in, handed to the state machine when it
/// is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInContext {
    pub guard: GuardSession,
    pub period: Period,
    pub benefit: BenefitCategory,
    pub device_id: Option<String>,
}

impl CheckInContext {
    pub fn new(session: &StoredSession, period: Period, device_id: Option<String>) -> Self {
        CheckInContext {
            guard: session.guard.clone(),
            period,
            benefit: session.benefit,
            device_id,
        }
    }
}
