//! Online/offline status of every username ever seen.

use dashmap::DashMap;

use crate::domain::{UserPresence, Username};

/// Presence table. Entries are never removed, only flipped offline.
#[derive(Debug, Default)]
pub struct PresenceTable {
    users: DashMap<Username, bool>,
}

impl PresenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_online(&self, username: &Username) {
        self.users.insert(username.clone(), true);
    }

    pub fn set_offline(&self, username: &Username) {
        self.users.insert(username.clone(), false);
    }

    pub fn is_online(&self, username: &Username) -> bool {
        self.users.get(username).is_some_and(|online| *online)
    }

    /// Every known user, sorted by username.
    pub fn list(&self) -> Vec<UserPresence> {
        self.collect(|_| true)
    }

    /// Every known user other than `username`, sorted by username.
    pub fn list_except(&self, username: &Username) -> Vec<UserPresence> {
        self.collect(|u| u != username)
    }

    fn collect<F>(&self, filter: F) -> Vec<UserPresence>
    where
        F: Fn(&Username) -> bool,
    {
        let mut users: Vec<UserPresence> = self
            .users
            .iter()
            .filter(|entry| filter(entry.key()))
            .map(|entry| UserPresence {
                username: entry.key().clone(),
                online: *entry.value(),
            })
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> Username {
        Username::parse(name).unwrap()
    }

    #[test]
    fn test_presence_is_sorted_and_keeps_offline_users() {
        // テスト項目: 一度見たユーザーはオフラインでも一覧に残り、名前順に並ぶ
        // given (前提条件):
        let presence = PresenceTable::new();
        presence.set_online(&user("carol"));
        presence.set_online(&user("alice"));
        presence.set_online(&user("bob"));

        // when (操作):
        presence.set_offline(&user("alice"));

        // then (期待する結果):
        let list = presence.list();
        let names: Vec<&str> = list.iter().map(|p| p.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
        assert!(!list[0].online);
        assert!(list[1].online && list[2].online);
    }

    #[test]
    fn test_list_except_omits_requester() {
        // テスト項目: list_except は指定ユーザーを除外する
        let presence = PresenceTable::new();
        presence.set_online(&user("alice"));

        assert!(presence.list_except(&user("alice")).is_empty());

        presence.set_online(&user("bob"));
        let others = presence.list_except(&user("alice"));
        assert_eq!(
            others,
            vec![UserPresence {
                username: user("bob"),
                online: true,
            }]
        );
    }

    #[test]
    fn test_unknown_user_is_offline() {
        // テスト項目: 未知のユーザーはオフライン扱い
        let presence = PresenceTable::new();

        assert!(!presence.is_online(&user("ghost")));
    }
}
