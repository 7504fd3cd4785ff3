//! Keyed mutex registry.
//!
//! Requests are serialized per logical domain: two operations under the
//! same key never overlap, operations under different keys run freely.
//! Entries are created on demand and removed on release, so the map only
//! ever holds keys that are currently locked.

use crate::cancel::CancelToken;
use crate::error::Result;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How often a waiter re-checks its cancellation token.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Lock keys partitioning the tenant API by domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKey {
    Profile,
    Application,
    AdvancedSetting,
    Constraint,
    ResourceType,
    ResponseTemplate,
    ServerAccess,
    ResourceLabel,
    ResourceManagerProfile,
    ResourceManagerProfilePolicy,
    ResourceManagerProfilePermission,
    ResourceManagerResourcePolicy,
    Tag,
    Permission,
    Role,
    Policy,
}

impl LockKey {
    pub const ALL: [LockKey; 16] = [
        LockKey::Profile,
        LockKey::Application,
        LockKey::AdvancedSetting,
        LockKey::Constraint,
        LockKey::ResourceType,
        LockKey::ResponseTemplate,
        LockKey::ServerAccess,
        LockKey::ResourceLabel,
        LockKey::ResourceManagerProfile,
        LockKey::ResourceManagerProfilePolicy,
        LockKey::ResourceManagerProfilePermission,
        LockKey::ResourceManagerResourcePolicy,
        LockKey::Tag,
        LockKey::Permission,
        LockKey::Role,
        LockKey::Policy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LockKey::Profile => "profileLock",
            LockKey::Application => "applicationLock",
            LockKey::AdvancedSetting => "advancedSettingLock",
            LockKey::Constraint => "constraintLock",
            LockKey::ResourceType => "resourceTypeLock",
            LockKey::ResponseTemplate => "responseTemplateLock",
            LockKey::ServerAccess => "serverAccessLock",
            LockKey::ResourceLabel => "resourceLabelLock",
            LockKey::ResourceManagerProfile => "resourceManagerProfileLock",
            LockKey::ResourceManagerProfilePolicy => "resourceManagerProfilePolicyLock",
            LockKey::ResourceManagerProfilePermission => "resourceManagerProfilePermissionLock",
            LockKey::ResourceManagerResourcePolicy => "resourceManagerResourcePolicyLock",
            LockKey::Tag => "tagLock",
            LockKey::Permission => "permissionLock",
            LockKey::Role => "roleLock",
            LockKey::Policy => "policyLock",
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One exclusive lock. Held state lives behind a mutex/condvar pair so a
/// waiter can wake up periodically to observe cancellation.
#[derive(Default)]
struct KeyLock {
    held: Mutex<bool>,
    released: Condvar,
}

impl KeyLock {
    fn lock(&self, cancel: &CancelToken) -> Result<()> {
        let mut held = self.held.lock();
        while *held {
            cancel.check()?;
            self.released.wait_for(&mut held, CANCEL_POLL);
        }
        *held = true;
        Ok(())
    }

    fn unlock(&self) {
        *self.held.lock() = false;
        self.released.notify_one();
    }
}

/// Process-wide map from key to exclusive lock, injected via the client.
#[derive(Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, Arc<KeyLock>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, waiting while another holder has it.
    ///
    /// A fresh candidate lock is stored under the key unless one is already
    /// there, and the stored lock is then acquired. If the acquired lock is
    /// not our candidate, its holder released it (and removed it from the
    /// map) while we waited, so it is released again and the acquisition
    /// restarts. Only the holder of the lock currently in the map proceeds.
    pub fn acquire(&self, key: &str, cancel: &CancelToken) -> Result<KeyGuard<'_>> {
        loop {
            cancel.check()?;
            let candidate = Arc::new(KeyLock::default());
            let actual = {
                let mut locks = self.locks.lock();
                Arc::clone(
                    locks
                        .entry(key.to_string())
                        .or_insert_with(|| Arc::clone(&candidate)),
                )
            };

            if !Arc::ptr_eq(&actual, &candidate) {
                log::trace!("waiting for {key}");
            }
            actual.lock(cancel)?;

            if Arc::ptr_eq(&actual, &candidate) {
                return Ok(KeyGuard {
                    registry: self,
                    key: key.to_string(),
                    lock: actual,
                });
            }
            actual.unlock();
        }
    }

    /// Number of keys currently held.
    pub fn held(&self) -> usize {
        self.locks.lock().len()
    }

    fn release(&self, key: &str, lock: &Arc<KeyLock>) {
        {
            let mut locks = self.locks.lock();
            if locks.get(key).is_some_and(|current| Arc::ptr_eq(current, lock)) {
                locks.remove(key);
            }
        }
        lock.unlock();
    }
}

impl fmt::Debug for LockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockRegistry")
            .field("held", &self.held())
            .finish()
    }
}

/// Releases its key on drop: the map entry is removed before unlocking.
pub struct KeyGuard<'a> {
    registry: &'a LockRegistry,
    key: String,
    lock: Arc<KeyLock>,
}

impl KeyGuard<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.key, &self.lock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_key_names() {
        assert_eq!(LockKey::Profile.as_str(), "profileLock");
        assert_eq!(LockKey::Application.to_string(), "applicationLock");
        let unique: std::collections::HashSet<_> =
            LockKey::ALL.iter().map(LockKey::as_str).collect();
        assert_eq!(unique.len(), 16);
    }

    #[test]
    fn test_release_removes_entry() {
        let registry = LockRegistry::new();
        let cancel = CancelToken::new();
        {
            let guard = registry.acquire("profileLock", &cancel).unwrap();
            assert_eq!(guard.key(), "profileLock");
            assert_eq!(registry.held(), 1);
        }
        assert_eq!(registry.held(), 0);
        let _again = registry.acquire("profileLock", &cancel).unwrap();
    }

    #[test]
    fn test_same_key_serializes() {
        let registry = Arc::new(LockRegistry::new());
        let intervals = Arc::new(Mutex::new(Vec::new()));
        let start = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let intervals = Arc::clone(&intervals);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    let cancel = CancelToken::new();
                    start.wait();
                    for _ in 0..5 {
                        let _guard = registry.acquire("applicationLock", &cancel).unwrap();
                        let begin = Instant::now();
                        thread::sleep(Duration::from_millis(2));
                        intervals.lock().push((begin, Instant::now()));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut intervals = intervals.lock().clone();
        assert_eq!(intervals.len(), 20);
        intervals.sort_by_key(|(begin, _)| *begin);
        for pair in intervals.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "critical sections overlapped");
        }
        assert_eq!(registry.held(), 0);
    }

    #[test]
    fn test_distinct_keys_run_concurrently() {
        let registry = Arc::new(LockRegistry::new());
        let both_inside = Arc::new(Barrier::new(2));

        let handles: Vec<_> = ["tagLock", "roleLock"]
            .into_iter()
            .map(|key| {
                let registry = Arc::clone(&registry);
                let both_inside = Arc::clone(&both_inside);
                thread::spawn(move || {
                    let cancel = CancelToken::new();
                    let _guard = registry.acquire(key, &cancel).unwrap();
                    // Deadlocks unless both threads hold their keys at once.
                    both_inside.wait();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_cancel_while_waiting() {
        let registry = Arc::new(LockRegistry::new());
        let cancel = CancelToken::new();
        let _held = registry.acquire("policyLock", &cancel).unwrap();

        let waiter_cancel = CancelToken::new();
        let waiter = {
            let registry = Arc::clone(&registry);
            let waiter_cancel = waiter_cancel.clone();
            thread::spawn(move || registry.acquire("policyLock", &waiter_cancel).map(|_| ()))
        };
        thread::sleep(Duration::from_millis(20));
        waiter_cancel.cancel();
        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(crate::Error::Cancelled)));
    }
}
