//! Process-wide authenticated session.
//!
//! The bearer token lives here and nowhere else. Storage is injected through
//! [`TokenStore`] so business logic never touches the filesystem directly,
//! and subscribers learn about login/logout through a watch channel.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::api_types::{LoginResponse, SessionUser};

/// What gets persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
  pub access: String,
  #[serde(default)]
  pub refresh: Option<String>,
  #[serde(default)]
  pub user: Option<SessionUser>,
}

impl From<LoginResponse> for StoredSession {
  fn from(response: LoginResponse) -> Self {
    Self {
      access: response.access,
      refresh: response.refresh,
      user: response.user,
    }
  }
}

/// Persistence for the session token.
pub trait TokenStore: Send + Sync {
  fn load(&self) -> Result<Option<StoredSession>>;
  fn save(&self, session: &StoredSession) -> Result<()>;
  fn clear(&self) -> Result<()>;
}

/// JSON file under the user's data directory.
pub struct FileTokenStore {
  path: PathBuf,
}

impl FileTokenStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// `<data_dir>/bursar/session.json`
  pub fn default_location() -> Result<Self> {
    Ok(Self::new(crate::config::data_dir()?.join("session.json")))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl TokenStore for FileTokenStore {
  fn load(&self) -> Result<Option<StoredSession>> {
    if !self.path.exists() {
      return Ok(None);
    }
    let contents = std::fs::read_to_string(&self.path)
      .map_err(|e| eyre!("Failed to read session file {}: {}", self.path.display(), e))?;
    let session = serde_json::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse session file {}: {}", self.path.display(), e))?;
    Ok(Some(session))
  }

  fn save(&self, session: &StoredSession) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create session directory: {}", e))?;
    }
    let contents = serde_json::to_string_pretty(session)?;
    std::fs::write(&self.path, contents)
      .map_err(|e| eyre!("Failed to write session file {}: {}", self.path.display(), e))?;
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    match std::fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(eyre!(
        "Failed to remove session file {}: {}",
        self.path.display(),
        e
      )),
    }
  }
}

/// In-memory store, used for env-supplied tokens and in tests.
#[derive(Default)]
pub struct MemoryTokenStore {
  slot: Mutex<Option<StoredSession>>,
}

impl MemoryTokenStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(session: StoredSession) -> Self {
    Self {
      slot: Mutex::new(Some(session)),
    }
  }

  fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<StoredSession>>> {
    self
      .slot
      .lock()
      .map_err(|_| eyre!("session store lock poisoned"))
  }
}

impl TokenStore for MemoryTokenStore {
  fn load(&self) -> Result<Option<StoredSession>> {
    Ok(self.slot()?.clone())
  }

  fn save(&self, session: &StoredSession) -> Result<()> {
    *self.slot()? = Some(session.clone());
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    *self.slot()? = None;
    Ok(())
  }
}

struct SessionInner {
  store: Arc<dyn TokenStore>,
  state: watch::Sender<Option<StoredSession>>,
}

/// Shared handle to the current session. Cheap to clone.
#[derive(Clone)]
pub struct Session {
  inner: Arc<SessionInner>,
}

impl Session {
  /// Read the persisted token once and start tracking it.
  pub fn init(store: Arc<dyn TokenStore>) -> Result<Self> {
    let current = match store.load() {
      Ok(session) => session,
      Err(e) => {
        // A corrupt session file means "logged out", not a startup failure
        warn!(error = %e, "ignoring unreadable persisted session");
        None
      }
    };
    info!(authenticated = current.is_some(), "session initialised");
    let (state, _) = watch::channel(current);
    Ok(Self {
      inner: Arc::new(SessionInner { store, state }),
    })
  }

  /// Session backed by a bare token, as supplied through `BURSAR_TOKEN`.
  pub fn from_token(token: impl Into<String>) -> Result<Self> {
    let stored = StoredSession {
      access: token.into(),
      refresh: None,
      user: None,
    };
    Self::init(Arc::new(MemoryTokenStore::with(stored)))
  }

  pub fn token(&self) -> Option<String> {
    self.inner.state.borrow().as_ref().map(|s| s.access.clone())
  }

  pub fn user(&self) -> Option<SessionUser> {
    self.inner.state.borrow().as_ref().and_then(|s| s.user.clone())
  }

  pub fn is_authenticated(&self) -> bool {
    self.inner.state.borrow().is_some()
  }

  /// Persist a freshly issued token and notify subscribers.
  pub fn establish(&self, session: StoredSession) -> Result<()> {
    self.inner.store.save(&session)?;
    self.inner.state.send_replace(Some(session));
    info!("session established");
    Ok(())
  }

  /// Clear storage and memory, then notify subscribers.
  pub fn logout(&self) -> Result<()> {
    self.inner.store.clear()?;
    self.inner.state.send_replace(None);
    info!("session cleared");
    Ok(())
  }

  pub fn subscribe(&self) -> watch::Receiver<Option<StoredSession>> {
    self.inner.state.subscribe()
  }
}
