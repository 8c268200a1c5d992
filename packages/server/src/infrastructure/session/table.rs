//! Username → live connection map.

use std::{collections::HashMap, future::Future, sync::Arc};

use tokio::sync::RwLock;

use crate::domain::{MessageSink, Username};

/// A recipient captured from the session table.
pub type Recipient = (Username, Arc<dyn MessageSink>);

/// Logged-in sessions, at most one per username.
///
/// Login and logout take the write lock. Broadcasts only take the read lock
/// long enough to copy out their recipients.
///
/// Work that must be atomic with a session change (presence, the history
/// handed to a newcomer, persisting a message that is about to be
/// broadcast) runs while the corresponding lock is held.
#[derive(Default)]
pub struct SessionTable {
    sessions: RwLock<HashMap<Username, Arc<dyn MessageSink>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. Returns false, leaving the existing session
    /// untouched, when the username is taken.
    pub async fn try_register(&self, username: Username, sink: Arc<dyn MessageSink>) -> bool {
        self.register_with(username, sink, async {}).await.is_some()
    }

    /// Register a session, then run `on_registered` before the write lock is
    /// released. Returns `None` without running it when the username is taken.
    pub async fn register_with<T, Fut>(
        &self,
        username: Username,
        sink: Arc<dyn MessageSink>,
        on_registered: Fut,
    ) -> Option<T>
    where
        Fut: Future<Output = T>,
    {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&username) {
            return None;
        }
        sessions.insert(username, sink);
        Some(on_registered.await)
    }

    pub async fn remove(&self, username: &Username) -> Option<Arc<dyn MessageSink>> {
        self.remove_with(username, || {}).await
    }

    /// Remove a session and call `on_removed` before the write lock is
    /// released. `on_removed` is not called when there was no session.
    pub async fn remove_with<F>(
        &self,
        username: &Username,
        on_removed: F,
    ) -> Option<Arc<dyn MessageSink>>
    where
        F: FnOnce(),
    {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(username)?;
        on_removed();
        Some(removed)
    }

    pub async fn contains(&self, username: &Username) -> bool {
        self.sessions.read().await.contains_key(username)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Copy out every session accepted by `filter`. The lock is released
    /// before this returns.
    pub async fn snapshot<F>(&self, filter: F) -> Vec<Recipient>
    where
        F: Fn(&Username) -> bool,
    {
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .filter(|(username, _)| filter(username))
            .map(|(username, sink)| (username.clone(), sink.clone()))
            .collect()
    }

    /// Run `produce` under the read lock and copy out the sessions accepted
    /// by `filter` before releasing it. No session can register or leave
    /// between the two.
    pub async fn snapshot_with<T, Fut, F>(&self, produce: Fut, filter: F) -> (T, Vec<Recipient>)
    where
        Fut: Future<Output = T>,
        F: Fn(&Username) -> bool,
    {
        let sessions = self.sessions.read().await;
        let value = produce.await;
        let recipients = sessions
            .iter()
            .filter(|(username, _)| filter(username))
            .map(|(username, sink)| (username.clone(), sink.clone()))
            .collect();
        (value, recipients)
    }

    /// Usernames of every live session, sorted.
    pub async fn online_usernames(&self) -> Vec<Username> {
        let mut usernames: Vec<Username> =
            self.sessions.read().await.keys().cloned().collect();
        usernames.sort();
        usernames
    }
}
