use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::warn;

use crate::listing::{self, DirEntryRow};
use crate::resolve;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

/// One open window's directory state. All fields are replaced together
/// under the session lock; `path`, `last_mtime` and `entries` always
/// describe the same successful open.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub path: Option<PathBuf>,
    pub show_hidden: bool,
    pub last_mtime: Option<SystemTime>,
    pub entries: Vec<DirEntryRow>,
    /// Set at unregister so a handle obtained before removal becomes inert.
    pub closed: bool,
}

pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Debug, Clone)]
pub enum Notice {
    SnapshotReady { session: SessionId, title: String },
}

/// Sending half of the notice channel back to the presentation-owning
/// thread. Cloned into the poller; both it and foreground dispatch report
/// listing updates through this same boundary.
#[derive(Clone)]
pub struct NoticeSender(Sender<Notice>);

impl NoticeSender {
    pub fn snapshot_ready(&self, session: SessionId, title: String) {
        let _ = self.0.send(Notice::SnapshotReady { session, title });
    }
}

pub fn notice_channel() -> (NoticeSender, Receiver<Notice>) {
    let (tx, rx) = channel();
    (NoticeSender(tx), rx)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    Active,
    Empty,
}

/// Registry of live sessions, shared between the dispatch loop and the
/// poller. The membership list has its own lock, independent of the
/// per-session locks; registry methods must not be called while a session
/// lock is held.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<Vec<(SessionId, SessionHandle)>>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, show_hidden: bool) -> SessionHandle {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handle = Arc::new(Mutex::new(Session {
            id,
            path: None,
            show_hidden,
            last_mtime: None,
            entries: Vec::new(),
            closed: false,
        }));
        self.sessions.lock().push((id, Arc::clone(&handle)));
        handle
    }

    /// Remove a session. `Empty` after the last removal is the shutdown
    /// signal; acting on it is the owning control loop's job.
    pub fn unregister(&self, id: SessionId) -> RegistryState {
        let mut sessions = self.sessions.lock();
        if let Some(pos) = sessions.iter().position(|(sid, _)| *sid == id) {
            let (_, handle) = sessions.remove(pos);
            handle.lock().closed = true;
        }
        if sessions.is_empty() {
            RegistryState::Empty
        } else {
            RegistryState::Active
        }
    }

    /// Consistent membership snapshot for iteration. Sessions removed after
    /// the snapshot was taken are skipped by their `closed` flag.
    pub fn handles(&self) -> Vec<SessionHandle> {
        self.sessions
            .lock()
            .iter()
            .map(|(_, handle)| Arc::clone(handle))
            .collect()
    }

    pub fn find(&self, id: SessionId) -> Option<SessionHandle> {
        self.sessions
            .lock()
            .iter()
            .find(|(sid, _)| *sid == id)
            .map(|(_, handle)| Arc::clone(handle))
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

/// Open `candidate` into `session`: resolve, snapshot, then replace the
/// session's directory state in one step and notify the presentation layer.
///
/// Any failure leaves the session exactly as it was. A read failure after a
/// successful resolve is treated the same as a resolution failure so the
/// state is never half-updated.
pub fn open_path(session: &mut Session, candidate: &str, notices: &NoticeSender) {
    let resolved = match resolve::resolve(candidate, session.path.as_deref()) {
        Ok(resolved) => resolved,
        Err(err) => {
            warn!(candidate, error = %err, "cannot open directory");
            return;
        }
    };

    let entries = match listing::snapshot(&resolved, session.show_hidden) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(
                path = %resolved.display(),
                error = %err,
                "directory read failed, keeping previous listing"
            );
            return;
        }
    };

    let title = resolved.display().to_string();
    session.last_mtime = listing::dir_mtime(&resolved).ok();
    session.path = Some(resolved);
    session.entries = entries;
    notices.snapshot_ready(session.id, title);
}
