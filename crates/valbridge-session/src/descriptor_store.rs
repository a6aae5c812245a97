//! Reads the session descriptor file and tracks identity changes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use valbridge_protocol::SessionDescriptor;

use crate::SessionError;

/// Where the local client writes its descriptor, relative to the platform's
/// local data directory.
const DESCRIPTOR_RELATIVE_PATH: [&str; 4] = ["Riot Games", "Riot Client", "Config", "lockfile"];

/// Reads the session descriptor on demand.
///
/// The store performs no retries: every [`read`](Self::read) is one file
/// read. It remembers the last descriptor it saw so callers can tell when
/// the local client restarted on a new port.
#[derive(Debug)]
pub struct DescriptorStore {
    path: PathBuf,
    cached: Mutex<Option<SessionDescriptor>>,
    /// Bumped whenever a read finds a different port than the cached one.
    identity: AtomicU64,
}

impl DescriptorStore {
    /// Creates a store that reads `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
            identity: AtomicU64::new(0),
        }
    }

    /// The platform's default descriptor path, if a local data directory
    /// exists.
    pub fn default_location() -> Option<PathBuf> {
        let mut path = dirs::data_local_dir()?;
        path.extend(DESCRIPTOR_RELATIVE_PATH);
        Some(path)
    }

    /// The path this store reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the descriptor.
    ///
    /// A missing file or a malformed record means the client isn't
    /// running: with `ignore_absence` that is `Ok(None)`, otherwise
    /// [`SessionError::DescriptorUnavailable`]. Other I/O failures are
    /// returned as [`SessionError::Io`] unless `ignore_absence` is set.
    pub async fn read(
        &self,
        ignore_absence: bool,
    ) -> Result<Option<SessionDescriptor>, SessionError> {
        let record = match tokio::fs::read_to_string(&self.path).await {
            Ok(record) => record,
            Err(e) if e.kind() == ErrorKind::NotFound => return self.absent(ignore_absence),
            Err(e) if ignore_absence => {
                tracing::debug!(path = %self.path.display(), error = %e, "descriptor unreadable");
                return Ok(None);
            }
            Err(e) => return Err(SessionError::Io(e)),
        };

        let Some(descriptor) = SessionDescriptor::parse(&record) else {
            tracing::debug!(path = %self.path.display(), "descriptor malformed");
            return self.absent(ignore_absence);
        };

        self.remember(&descriptor);
        Ok(Some(descriptor))
    }

    /// The descriptor seen by the last successful read.
    pub fn cached(&self) -> Option<SessionDescriptor> {
        self.lock().clone()
    }

    /// Identity counter: 0 before the first successful read, then bumped
    /// each time a read finds the client on a new port.
    ///
    /// Consumers keep their own copy and compare, so one reader noticing a
    /// restart does not hide it from another.
    pub fn identity(&self) -> u64 {
        self.identity.load(Ordering::Acquire)
    }

    fn absent(&self, ignore_absence: bool) -> Result<Option<SessionDescriptor>, SessionError> {
        if ignore_absence {
            Ok(None)
        } else {
            Err(SessionError::DescriptorUnavailable(self.path.clone()))
        }
    }

    fn remember(&self, descriptor: &SessionDescriptor) {
        let mut cached = self.lock();
        let changed = !cached
            .as_ref()
            .is_some_and(|previous| previous.same_endpoint(descriptor));
        if changed {
            tracing::info!(port = descriptor.port, pid = descriptor.process_id, "session descriptor changed");
            *cached = Some(descriptor.clone());
            self.identity.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<SessionDescriptor>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A unique scratch file path under the system temp dir.
    fn scratch(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("valbridge-store-{}-{name}", std::process::id()));
        path
    }

    #[tokio::test]
    async fn test_read_missing_file_ignored_returns_none() {
        let store = DescriptorStore::new(scratch("missing"));
        assert!(store.read(true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_missing_file_returns_unavailable() {
        let store = DescriptorStore::new(scratch("missing-strict"));
        let err = store.read(false).await.unwrap_err();
        assert!(matches!(err, SessionError::DescriptorUnavailable(_)));
    }

    #[tokio::test]
    async fn test_read_malformed_record_is_absent() {
        let path = scratch("malformed");
        std::fs::write(&path, "Riot Client:1:2::https").unwrap();
        let store = DescriptorStore::new(&path);

        assert!(store.read(true).await.unwrap().is_none());
        assert!(matches!(
            store.read(false).await,
            Err(SessionError::DescriptorUnavailable(_))
        ));
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_read_tracks_port_changes() {
        let path = scratch("port-change");
        std::fs::write(&path, "Riot Client:10:5000:pw1:https").unwrap();
        let store = DescriptorStore::new(&path);

        assert_eq!(store.identity(), 0);
        let first = store.read(false).await.unwrap().unwrap();
        assert_eq!(first.port, 5000);
        assert_eq!(store.identity(), 1);

        store.read(false).await.unwrap();
        assert_eq!(store.identity(), 1);

        std::fs::write(&path, "Riot Client:11:6000:pw2:https").unwrap();
        let third = store.read(false).await.unwrap().unwrap();
        assert_eq!(third.port, 6000);
        assert_eq!(store.identity(), 2);
        // Later reads of the same port leave the counter alone.
        store.read(false).await.unwrap();
        assert_eq!(store.identity(), 2);
        assert_eq!(store.cached().unwrap().password, "pw2");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_default_location_ends_with_lockfile() {
        if let Some(path) = DescriptorStore::default_location() {
            assert!(path.ends_with("Riot Games/Riot Client/Config/lockfile"));
        }
    }
}
