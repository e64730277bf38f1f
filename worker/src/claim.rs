//! At-most-once work claiming between independent worker processes.
//!
//! A claim is nothing but the existence of a marker. There's no owner identity and no heartbeat:
//! a marker left behind by a crashed process blocks its job until it's cleared, either by hand or
//! through [`ClaimStore::is_orphaned`] and a maximum age.

use std::{
    fs, io,
    path::{Path, PathBuf},
    process,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use crate::config::ReleasePolicy;

/// Somewhere markers can be created atomically.
pub trait ClaimStore {
    /// Tries to create the marker for `key`.
    ///
    /// # Returns
    /// `true` if this call created it; `false` if it already existed or couldn't be created.
    fn try_claim(&self, key: &Path) -> bool;

    /// Removes the marker for `key`. A marker that's already gone counts as released.
    fn release(&self, key: &Path) -> io::Result<()>;

    /// Whether a marker for `key` exists and is older than `max_age`.
    fn is_orphaned(&self, key: &Path, max_age: Duration) -> bool;

    /// Removes the marker for `key` if it's older than `max_age`.
    ///
    /// When several callers find the same orphan, at most one of them clears it.
    ///
    /// # Returns
    /// `true` if this call cleared it.
    fn clear_orphan(&self, key: &Path, max_age: Duration) -> bool;
}

/// Markers are directories, `create_dir` being atomic on a shared filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirClaimStore;

impl ClaimStore for DirClaimStore {
    fn try_claim(&self, key: &Path) -> bool {
        if key.exists() {
            return false;
        }

        match fs::create_dir(key) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("lost claim on {}: {e}", key.display());
                false
            }
        }
    }

    fn release(&self, key: &Path) -> io::Result<()> {
        match fs::remove_dir(key) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!("claim {} was already released", key.display());
                Ok(())
            }
            result => result,
        }
    }

    fn is_orphaned(&self, key: &Path, max_age: Duration) -> bool {
        fs::metadata(key)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age >= max_age)
    }

    fn clear_orphan(&self, key: &Path, max_age: Duration) -> bool {
        if !self.is_orphaned(key, max_age) {
            return false;
        }

        // Only one rename of the marker can succeed, the others find it gone.
        let stale = stale_path(key);
        if let Err(e) = fs::rename(key, &stale) {
            log::debug!("lost orphan {} to another worker: {e}", key.display());
            return false;
        }

        if let Err(e) = fs::remove_dir(&stale) {
            log::warn!("cannot remove stale claim {}: {e}", stale.display());
        }
        true
    }
}

/// A sibling of `key` no other process will pick.
fn stale_path(key: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    let mut stale = key.as_os_str().to_owned();
    stale.push(format!(".stale-{}-{nanos}", process::id()));
    PathBuf::from(stale)
}

/// A held claim.
///
/// Under [`ReleasePolicy::Always`] the marker is removed when the claim is dropped, whatever the
/// exit path. Under [`ReleasePolicy::OnSuccess`] only [`Claim::complete`] removes it.
#[must_use = "dropping a claim may release it right away"]
pub struct Claim<'s, S: ClaimStore + ?Sized> {
    store: &'s S,
    key: PathBuf,
    policy: ReleasePolicy,
    done: bool,
}

impl<'s, S: ClaimStore + ?Sized> Claim<'s, S> {
    /// Tries to claim `key` in `store`.
    ///
    /// # Returns
    /// The claim, or `None` if someone else holds it.
    pub fn acquire<P: Into<PathBuf>>(store: &'s S, key: P, policy: ReleasePolicy) -> Option<Self> {
        let key = key.into();

        store.try_claim(&key).then_some(Self {
            store,
            key,
            policy,
            done: false,
        })
    }

    pub fn key(&self) -> &Path {
        &self.key
    }

    /// Releases the claim after its work was persisted.
    ///
    /// A marker someone else already removed is not an error, the work is done either way.
    pub fn complete(mut self) -> io::Result<()> {
        self.done = true;

        match self.store.release(&self.key) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!("claim {} vanished before completion", self.key.display());
                Ok(())
            }
            result => result,
        }
    }
}

impl<S: ClaimStore + ?Sized> Drop for Claim<'_, S> {
    fn drop(&mut self) {
        if self.done {
            return;
        }

        match self.policy {
            ReleasePolicy::Always => {
                if let Err(e) = self.store.release(&self.key) {
                    log::warn!("cannot release claim {}: {e}", self.key.display());
                }
            }
            ReleasePolicy::OnSuccess => {
                log::warn!(
                    "leaving claim {} in place, remove it to retry the job",
                    self.key.display()
                );
            }
        }
    }
}
