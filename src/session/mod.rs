//! Session store: the list of user profiles and which one is active
//!
//! Loading never fails. Anything missing, corrupt or dangling in the persisted
//! state is replaced by the smallest valid state and the correction is written
//! back. Every mutation is persisted before the method returns.

mod partition;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::constants::session::{
    CURRENT_PARTITION_KEY, DEFAULT_PARTITION, USERS_KEY, USER_NAME_PREFIX,
};
use crate::store::KeyValueStore;
use partition::{random_candidate, unique_partition};

/// One isolated user of the hosted application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub partition: String,
}

impl UserProfile {
    pub fn new(name: impl Into<String>, partition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition: partition.into(),
        }
    }

    /// "User <n>" for the profile at 1-based position `n`
    pub fn numbered(n: usize, partition: impl Into<String>) -> Self {
        Self::new(format!("{USER_NAME_PREFIX} {n}"), partition)
    }
}

/// Result of a switch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Profile was already active; nothing persisted, no window work needed
    Unchanged,
    /// Profile is now active and persisted; the caller must replace the window
    Switched(UserProfile),
}

pub struct SessionStore<S: KeyValueStore> {
    store: S,
    users: Vec<UserProfile>,
    current: usize,
}

impl<S: KeyValueStore> SessionStore<S> {
    /// Read the persisted profiles, healing whatever is invalid
    pub fn load(store: S) -> Self {
        let (users, users_dirty) = read_users(&store);
        let persisted_current = store
            .get(CURRENT_PARTITION_KEY)
            .and_then(|v| v.as_str().map(str::to_string));

        let (current, current_dirty) = match persisted_current
            .as_deref()
            .and_then(|p| users.iter().position(|u| u.partition == p))
        {
            Some(idx) => (idx, false),
            None => {
                if !users_dirty {
                    warn!(
                        persisted = ?persisted_current,
                        fallback = %users[0].partition,
                        "Current partition matches no profile, resetting to first"
                    );
                }
                (0, true)
            }
        };

        let mut session = Self { store, users, current };

        if users_dirty
            && let Err(e) = session.persist_users()
        {
            warn!(error = ?e, "Failed to persist healed profile list");
        }
        if current_dirty
            && let Err(e) = session.persist_current()
        {
            warn!(error = ?e, "Failed to persist healed current partition");
        }

        info!(
            users = session.users.len(),
            current = %session.current().partition,
            "Session state loaded"
        );
        session
    }

    pub fn users(&self) -> &[UserProfile] {
        &self.users
    }

    pub fn current(&self) -> &UserProfile {
        &self.users[self.current]
    }

    pub fn find(&self, partition: &str) -> Option<&UserProfile> {
        self.users.iter().find(|u| u.partition == partition)
    }

    /// Resolve a CLI argument that is either a partition or a display name
    pub fn resolve(&self, partition_or_name: &str) -> Option<&UserProfile> {
        self.find(partition_or_name)
            .or_else(|| self.users.iter().find(|u| u.name == partition_or_name))
    }

    /// Make `partition` the active profile
    pub fn switch_to(&mut self, partition: &str) -> Result<SwitchOutcome> {
        if self.current().partition == partition {
            return Ok(SwitchOutcome::Unchanged);
        }

        let idx = self
            .users
            .iter()
            .position(|u| u.partition == partition)
            .ok_or_else(|| anyhow!("No profile with partition '{}'", partition))?;

        let previous = self.current;
        self.current = idx;
        if let Err(e) = self.persist_current() {
            self.current = previous;
            return Err(e).context(format!("Failed to switch to profile '{}'", partition));
        }

        info!(name = %self.current().name, partition = %partition, "Switched active profile");
        Ok(SwitchOutcome::Switched(self.current().clone()))
    }

    /// Append a new profile with a fresh partition and make it active
    pub fn add_user(&mut self) -> Result<UserProfile> {
        self.add_user_with(random_candidate)
    }

    pub(crate) fn add_user_with(&mut self, candidate: impl FnMut() -> String) -> Result<UserProfile> {
        let partition = unique_partition(self.users.iter().map(|u| u.partition.as_str()), candidate);
        let profile = UserProfile::numbered(self.users.len() + 1, partition);

        let previous = self.current;
        self.users.push(profile.clone());
        self.current = self.users.len() - 1;

        let persisted = self.persist_users().and_then(|_| self.persist_current());
        if let Err(e) = persisted {
            self.users.pop();
            self.current = previous;
            // Bring the durable copy back in line with memory
            if let Err(rollback) = self.persist_users().and_then(|_| self.persist_current()) {
                warn!(error = ?rollback, "Failed to persist profiles after rolling back add_user");
            }
            return Err(e).context("Failed to add user");
        }

        info!(name = %profile.name, partition = %profile.partition, "Added user");
        Ok(profile)
    }

    #[cfg(test)]
    pub fn backing_store(&self) -> &S {
        &self.store
    }

    fn persist_users(&mut self) -> Result<()> {
        let value = serde_json::to_value(&self.users).context("Failed to serialize profiles")?;
        self.store.set(USERS_KEY, value)
    }

    fn persist_current(&mut self) -> Result<()> {
        let partition = self.users[self.current].partition.clone();
        self.store.set(CURRENT_PARTITION_KEY, Value::String(partition))
    }
}

/// Parse the persisted profile list. Returns the list plus whether it had to be
/// repaired (absent, corrupt, empty, blank or duplicate partitions).
fn read_users<S: KeyValueStore>(store: &S) -> (Vec<UserProfile>, bool) {
    let raw = match store.get(USERS_KEY) {
        Some(value) => match serde_json::from_value::<Vec<UserProfile>>(value) {
            Ok(users) => users,
            Err(e) => {
                warn!(error = %e, "Persisted profile list is corrupt, regenerating");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let original_len = raw.len();
    let mut seen = HashSet::new();
    let users: Vec<UserProfile> = raw
        .into_iter()
        .filter(|u| {
            if u.partition.trim().is_empty() {
                warn!(name = %u.name, "Dropping profile without partition");
                return false;
            }
            if !seen.insert(u.partition.clone()) {
                warn!(name = %u.name, partition = %u.partition, "Dropping profile with duplicate partition");
                return false;
            }
            true
        })
        .collect();

    if users.is_empty() {
        info!(partition = DEFAULT_PARTITION, "No profiles found, creating default");
        return (vec![UserProfile::numbered(1, DEFAULT_PARTITION)], true);
    }

    let dirty = users.len() != original_len;
    (users, dirty)
}
