use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::listing;
use crate::session::{NoticeSender, SessionRegistry, open_path};

/// Cooperative stop flag with an interruptible sleep. Triggering it wakes
/// the poller mid-interval instead of waiting the sleep out.
#[derive(Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl StopSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn trigger(&self) {
        *self.stopped.lock() = true;
        self.condvar.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Block for up to `timeout`. Returns true when stop was triggered.
    pub fn sleep(&self, timeout: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if *stopped {
            return true;
        }
        self.condvar.wait_for(&mut stopped, timeout);
        *stopped
    }
}

/// Background change-detection loop: one cycle per interval until stopped.
pub fn spawn(
    registry: Arc<SessionRegistry>,
    notices: NoticeSender,
    interval: Duration,
    stop: Arc<StopSignal>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while !stop.sleep(interval) {
            poll_once(&registry, &notices);
        }
        debug!("refresh poller stopped");
    })
}

/// One poll cycle over the registered sessions.
///
/// A session reloads when its directory stat fails (removed or unreachable,
/// the reload then climbs to an ancestor) or when the observed modification
/// time is strictly newer than the one captured at the last snapshot. Only
/// one session's lock is held at a time.
pub fn poll_once(registry: &SessionRegistry, notices: &NoticeSender) {
    for handle in registry.handles() {
        let mut session = handle.lock();
        if session.closed {
            continue;
        }
        let Some(path) = session.path.clone() else {
            continue;
        };

        let reload = match listing::dir_mtime(&path) {
            Ok(mtime) => session.last_mtime.is_none_or(|last| mtime > last),
            Err(_) => true,
        };
        if reload {
            debug!(path = %path.display(), "change detected, reloading");
            let candidate = path.to_string_lossy().into_owned();
            open_path(&mut session, &candidate, notices);
        }
    }
}
