//! Network namespace handles.
//!
//! Changing the namespace of a thread is per-thread kernel state, so the
//! rest of the crate avoids it wherever a namespace-scoped API exists:
//! sockets are created on a short-lived worker thread that enters the
//! target namespace and exits afterwards ([`NetNs::run_in`]).
//!
//! The one exception is state with no namespace-scoped API at all
//! (`/proc/sys/net/*`). For that the calling thread itself has to switch,
//! which is what [`NetnsSwitch`] models: a process-wide lock, the switch,
//! and a guaranteed restore of the original namespace when the guard is
//! dropped.

use crate::error::{NetdraError, Result};
use nix::sched::{setns, CloneFlags};
use parking_lot::{const_mutex, Mutex, MutexGuard};
use std::fs::File;
use std::io;
use std::os::fd::{AsFd, OwnedFd};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Namespace of the calling thread (not the thread group leader).
const THREAD_NETNS_PATH: &str = "/proc/thread-self/ns/net";

/// Serializes every switch of a thread's ambient namespace in this process.
static NETNS_SWITCH_LOCK: Mutex<()> = const_mutex(());

/// An open network namespace.
///
/// The file descriptor is closed when the handle is dropped.
#[derive(Debug)]
pub struct NetNs {
    fd: OwnedFd,
    path: PathBuf,
}

impl NetNs {
    /// Open a namespace from a bind-mounted or `/proc/<pid>/ns/net` path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| NetdraError::Namespace {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self {
            fd: file.into(),
            path: path.to_path_buf(),
        })
    }

    /// Open the namespace the calling thread currently lives in.
    pub fn current() -> Result<Self> {
        Self::from_path(THREAD_NETNS_PATH)
    }

    /// Path this handle was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the calling thread into this namespace.
    fn enter(&self) -> Result<()> {
        setns(self.fd.as_fd(), CloneFlags::CLONE_NEWNET).map_err(|errno| {
            NetdraError::Namespace {
                path: self.path.display().to_string(),
                source: io::Error::from(errno),
            }
        })
    }

    /// Run `f` on a dedicated OS thread that lives inside this namespace.
    ///
    /// The worker thread exits when `f` returns, so the namespace change
    /// never leaks to any other thread. File descriptors opened by `f`
    /// (e.g. sockets) stay bound to this namespace.
    pub fn run_in<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send,
        T: Send,
    {
        std::thread::scope(|scope| {
            let worker = scope.spawn(|| {
                self.enter()?;
                f()
            });
            worker.join().unwrap_or_else(|_| {
                Err(NetdraError::Namespace {
                    path: self.path.display().to_string(),
                    source: io::Error::other("namespace worker thread panicked"),
                })
            })
        })
    }
}

/// Guard that holds the calling thread inside a target namespace.
///
/// While the guard is alive:
/// - the process-wide switch lock is held, so no other switch can interleave;
/// - the calling thread lives in the target namespace.
///
/// Dropping the guard moves the thread back to its original namespace and
/// then releases the lock, on every exit path. The guard is `!Send`, and
/// work done under it must be synchronous so the OS thread cannot change
/// underneath it.
pub struct NetnsSwitch {
    original: NetNs,
    target: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl NetnsSwitch {
    /// Lock, remember the current namespace, then enter `target`.
    pub fn enter(target: &NetNs) -> Result<Self> {
        let lock = NETNS_SWITCH_LOCK.lock();
        let original = NetNs::current()?;
        target.enter()?;
        debug!(target_ns = %target.path().display(), "Switched thread network namespace");
        Ok(Self {
            original,
            target: target.path().to_path_buf(),
            _lock: lock,
        })
    }
}

impl Drop for NetnsSwitch {
    fn drop(&mut self) {
        match self.original.enter() {
            Ok(()) => debug!(
                target_ns = %self.target.display(),
                "Restored thread network namespace"
            ),
            Err(e) => error!(
                error = %e,
                target_ns = %self.target.display(),
                "Failed to restore original network namespace"
            ),
        }
    }
}

/// Run `f` with the calling thread switched into `target`.
pub fn with_netns<T>(target: &NetNs, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let _switch = NetnsSwitch::enter(target)?;
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;

    fn thread_netns_inode() -> u64 {
        std::fs::metadata(THREAD_NETNS_PATH).unwrap().ino()
    }

    /// A fresh namespace, kept alive by the returned handle.
    fn new_namespace() -> NetNs {
        std::thread::spawn(|| {
            nix::sched::unshare(CloneFlags::CLONE_NEWNET).unwrap();
            NetNs::current().unwrap()
        })
        .join()
        .unwrap()
    }

    fn running_as_root() -> bool {
        nix::unistd::Uid::effective().is_root()
    }

    #[test]
    fn test_from_path_missing() {
        let err = NetNs::from_path("/nonexistent/netns/pod").unwrap_err();
        assert!(matches!(err, NetdraError::Namespace { .. }));
        assert!(err.to_string().contains("/nonexistent/netns/pod"));
    }

    #[test]
    fn test_current_namespace() {
        let ns = NetNs::current().unwrap();
        assert_eq!(ns.path(), Path::new(THREAD_NETNS_PATH));
    }

    #[test]
    fn test_run_in_reports_enter_failure() {
        // A regular file is not a namespace, so setns fails on the worker
        // and the error surfaces without touching the calling thread.
        let file = tempfile::NamedTempFile::new().unwrap();
        let ns = NetNs::from_path(file.path()).unwrap();
        let err = ns.run_in(|| Ok(())).unwrap_err();
        assert!(matches!(err, NetdraError::Namespace { .. }));
    }

    #[test]
    fn test_switch_failure_releases_lock() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let not_a_namespace = NetNs::from_path(file.path()).unwrap();
        let before = thread_netns_inode();

        assert!(NetnsSwitch::enter(&not_a_namespace).is_err());
        // A second attempt must not block on a lock leaked by the first.
        assert!(NetnsSwitch::enter(&not_a_namespace).is_err());
        assert!(NETNS_SWITCH_LOCK.try_lock_for(Duration::from_secs(5)).is_some());

        let err = with_netns(&not_a_namespace, || Ok(())).unwrap_err();
        assert!(matches!(err, NetdraError::Namespace { .. }));
        assert_eq!(thread_netns_inode(), before);
    }

    #[test]
    #[ignore = "requires CAP_SYS_ADMIN"]
    fn test_with_netns_restores_namespace() {
        if !running_as_root() {
            return;
        }
        let target = new_namespace();
        let original = thread_netns_inode();

        let inside = with_netns(&target, || {
            assert!(NETNS_SWITCH_LOCK.try_lock().is_none());
            Ok(thread_netns_inode())
        })
        .unwrap();
        assert_ne!(inside, original);
        assert_eq!(thread_netns_inode(), original);

        let err = with_netns(&target, || -> Result<()> {
            assert_eq!(thread_netns_inode(), inside);
            Err(NetdraError::invalid("sysctl", "write rejected"))
        })
        .unwrap_err();
        assert!(matches!(err, NetdraError::Invalid { .. }));
        assert_eq!(thread_netns_inode(), original);
        assert!(NETNS_SWITCH_LOCK.try_lock_for(Duration::from_secs(5)).is_some());
    }
}
