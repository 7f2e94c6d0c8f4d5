//! Per-realm who-is-here bookkeeping and the start-quorum decision.
//!
//! The roster tracks which users are present in each realm, which
//! connections back each user (a user may be connected from several tabs
//! or devices at once), and each user's declared participation intent.
//! It knows nothing about game content.

use dashmap::DashMap;
use realm_hub::{ConnectionId, Realm};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, error};

/// A user's declared participation state within a realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// The user asked to start; only players with this intent count
    /// toward the quorum
    WantsToPlay,
    /// Present but explicitly spectating; does not block a start
    Watching,
    /// Present but undeclared; blocks a start until they opt in or out.
    /// The first joiner of an empty realm starts here.
    Sitting,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Intent::WantsToPlay => "WantsToPlay",
            Intent::Watching => "Watching",
            Intent::Sitting => "Sitting",
        })
    }
}

#[derive(Debug)]
struct UserInfo {
    connection_ids: HashSet<ConnectionId>,
    intent: Intent,
}

/// Concurrent-safe membership table: realm → username → connections and
/// intent. A user is only considered departed when their last connection
/// id is removed.
#[derive(Debug, Default)]
pub struct Roster {
    realms: DashMap<Realm, HashMap<String, UserInfo>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent upsert of a user's presence.
    ///
    /// A user already present keeps their stored intent; the `intent`
    /// argument only seeds brand-new entries, so a reconnecting player who
    /// already asked to play is not knocked back to watching.
    pub fn add(&self, realm: &Realm, user: &str, intent: Intent, conn_id: ConnectionId) {
        debug!("Adding user {} to realm {} as {}", user, realm, intent);
        let mut users = self.realms.entry(realm.clone()).or_default();
        match users.get_mut(user) {
            Some(info) => {
                info.connection_ids.insert(conn_id);
            }
            None => {
                users.insert(
                    user.to_string(),
                    UserInfo {
                        connection_ids: HashSet::from([conn_id]),
                        intent,
                    },
                );
            }
        }
    }

    /// Removes one of a user's connections; the user entry goes away only
    /// when its connection set empties. Removing an id that is not present
    /// is a safe no-op (duplicate or late unregisters).
    pub fn remove(&self, realm: &Realm, user: &str, conn_id: ConnectionId) {
        debug!("Removing user {} ({}) from realm {}", user, conn_id, realm);
        let mut drop_realm = false;
        if let Some(mut users) = self.realms.get_mut(realm) {
            if let Some(info) = users.get_mut(user) {
                if info.connection_ids.remove(&conn_id) && info.connection_ids.is_empty() {
                    users.remove(user);
                }
            }
            drop_realm = users.is_empty();
        }
        if drop_realm {
            self.realms.remove_if(realm, |_, users| users.is_empty());
        }
    }

    /// Changes a present user's intent. Intent changes for absent users
    /// are dropped rather than conjuring a phantom entry.
    pub fn set_intent(&self, realm: &Realm, user: &str, intent: Intent) -> bool {
        if let Some(mut users) = self.realms.get_mut(realm) {
            if let Some(info) = users.get_mut(user) {
                debug!("User {} in realm {} is now {}", user, realm, intent);
                info.intent = intent;
                return true;
            }
        }
        error!("User {} not in realm {}; intent change dropped", user, realm);
        false
    }

    /// Marks a user as wanting to play.
    pub fn wants_to_play(&self, realm: &Realm, user: &str) -> bool {
        self.set_intent(realm, user, Intent::WantsToPlay)
    }

    /// The start-quorum rule: true iff at least one present user wants to
    /// play and every other present user is either playing or watching.
    ///
    /// The decision is a point-in-time snapshot; callers must tolerate it
    /// going stale the moment the lock is released.
    pub fn allow_start(&self, realm: &Realm) -> bool {
        let Some(users) = self.realms.get(realm) else {
            return false;
        };
        let mut want_to_play = 0usize;
        let mut watching = 0usize;
        for info in users.values() {
            match info.intent {
                Intent::WantsToPlay => want_to_play += 1,
                Intent::Watching => watching += 1,
                Intent::Sitting => {}
            }
        }
        want_to_play > 0 && want_to_play + watching == users.len()
    }

    /// Number of users present in a realm.
    pub fn user_count(&self, realm: &Realm) -> usize {
        self.realms.get(realm).map_or(0, |users| users.len())
    }

    /// Clears all realms. Teardown hook for tests.
    pub fn reset(&self) {
        self.realms.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const TABLE: &str = "footable";
    const USERNAME: &str = "cesar";

    fn ids(n: usize) -> Vec<ConnectionId> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_join() {
        let roster = Roster::new();
        let realm = Realm::from(TABLE);
        let conn = ids(2);
        roster.add(&realm, USERNAME, Intent::Sitting, conn[0]);
        roster.add(&realm, USERNAME, Intent::Watching, conn[1]);
        assert_eq!(roster.user_count(&realm), 1);
    }

    #[test]
    fn test_join_and_leave() {
        let roster = Roster::new();
        let realm = Realm::from(TABLE);
        let conn = ids(2);
        roster.add(&realm, USERNAME, Intent::Sitting, conn[0]);
        roster.add(&realm, USERNAME, Intent::Watching, conn[1]);
        roster.remove(&realm, USERNAME, conn[1]);
        assert_eq!(roster.user_count(&realm), 1);
    }

    #[test]
    fn test_single_join_and_leave() {
        let roster = Roster::new();
        let realm = Realm::from(TABLE);
        let conn = ids(1);
        roster.add(&realm, USERNAME, Intent::Sitting, conn[0]);
        roster.remove(&realm, USERNAME, conn[0]);
        assert_eq!(roster.user_count(&realm), 0);
    }

    #[test]
    fn test_single_join_and_leave_mismatched_ids() {
        let roster = Roster::new();
        let realm = Realm::from(TABLE);
        let conn = ids(2);
        roster.add(&realm, USERNAME, Intent::Sitting, conn[0]);
        // Not this user's connection; don't remove anything.
        roster.remove(&realm, USERNAME, conn[1]);
        assert_eq!(roster.user_count(&realm), 1);
    }

    #[test]
    fn test_join_leave_and_start() {
        let roster = Roster::new();
        let realm = Realm::from(TABLE);
        let conn = ids(2);
        roster.add(&realm, USERNAME, Intent::Sitting, conn[0]);
        roster.add(&realm, USERNAME, Intent::Watching, conn[1]);
        roster.remove(&realm, USERNAME, conn[1]);
        roster.wants_to_play(&realm, USERNAME);
        assert_eq!(roster.user_count(&realm), 1);
        assert!(roster.allow_start(&realm));
    }

    #[test]
    fn test_reconnect_preserves_intent() {
        let roster = Roster::new();
        let realm = Realm::from(TABLE);
        let conn = ids(2);
        roster.add(&realm, USERNAME, Intent::Sitting, conn[0]);
        roster.wants_to_play(&realm, USERNAME);
        // A second tab joining with the watcher default must not knock the
        // player back to watching.
        roster.add(&realm, USERNAME, Intent::Watching, conn[1]);
        assert!(roster.allow_start(&realm));
    }

    #[test]
    fn test_intent_change_for_absent_user_is_dropped() {
        let roster = Roster::new();
        let realm = Realm::from(TABLE);
        assert!(!roster.set_intent(&realm, USERNAME, Intent::WantsToPlay));
        assert_eq!(roster.user_count(&realm), 0);
        assert!(!roster.allow_start(&realm));
    }

    #[test]
    fn test_allow_start_quorum() {
        let roster = Roster::new();
        let realm = Realm::from(TABLE);

        // Nobody present.
        assert!(!roster.allow_start(&realm));

        // One sitting user has not opted in or out.
        let conn = ids(4);
        roster.add(&realm, "cesar", Intent::Sitting, conn[0]);
        assert!(!roster.allow_start(&realm));

        // A lone player is a quorum.
        roster.wants_to_play(&realm, "cesar");
        assert!(roster.allow_start(&realm));

        // Watchers do not block.
        roster.add(&realm, "messi", Intent::Watching, conn[1]);
        assert!(roster.allow_start(&realm));

        // A sitting user blocks everyone.
        roster.add(&realm, "xavi", Intent::Sitting, conn[2]);
        assert!(!roster.allow_start(&realm));
        roster.set_intent(&realm, "xavi", Intent::Watching);
        assert!(roster.allow_start(&realm));

        // An all-watching realm cannot start.
        roster.set_intent(&realm, "cesar", Intent::Watching);
        assert!(!roster.allow_start(&realm));
    }
}
