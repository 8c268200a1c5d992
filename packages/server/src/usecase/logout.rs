//! UseCase: ログアウト処理
//!
//! 接続が閉じたときに呼ばれ、セッション削除・退出通知・プレゼンス更新を行います。

use std::sync::Arc;

use crate::{
    domain::Username,
    infrastructure::{Broadcaster, PresenceTable, SessionTable, dto::websocket::ServerKind},
};

/// ログアウトのユースケース
pub struct LogoutUseCase {
    sessions: Arc<SessionTable>,
    presence: Arc<PresenceTable>,
    broadcaster: Broadcaster,
}

impl LogoutUseCase {
    pub fn new(
        sessions: Arc<SessionTable>,
        presence: Arc<PresenceTable>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            sessions,
            presence,
            broadcaster,
        }
    }

    /// ログアウトを実行
    ///
    /// Returns false when `username` had no session.
    pub async fn execute(&self, username: &Username) -> bool {
        // セッション削除とプレゼンス更新は同じロックの中で行う
        let presence = &self.presence;
        let removed = self
            .sessions
            .remove_with(username, || presence.set_offline(username))
            .await;
        if removed.is_none() {
            tracing::debug!("Logout of '{}' ignored: no session", username);
            return false;
        }

        if let Err(e) = self
            .broadcaster
            .all_except(ServerKind::UserLoggedOut, &username.as_str(), username)
            .await
        {
            tracing::error!("Failed to broadcast logout of '{}': {}", username, e);
        }

        tracing::info!("'{}' logged out", username);
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::usecase::test_support::{Fixture, user};

    fn create_usecase(fixture: &Fixture) -> LogoutUseCase {
        LogoutUseCase::new(
            fixture.sessions.clone(),
            fixture.presence.clone(),
            fixture.broadcaster.clone(),
        )
    }

    #[tokio::test]
    async fn test_logout_notifies_remaining_users() {
        // テスト項目: ログアウトすると残りのユーザーに通知され、オフラインになる
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = create_usecase(&fixture);
        let mut alice_inbox = fixture.connect("alice").await;
        let mut bob_inbox = fixture.connect("bob").await;

        // when (操作):
        let removed = usecase.execute(&user("alice")).await;

        // then (期待する結果):
        assert!(removed);
        assert!(alice_inbox.drain().is_empty());
        assert_eq!(
            bob_inbox.drain(),
            vec![json!({"kind": "user_logged_out", "data": "alice"})]
        );
        assert!(!fixture.sessions.contains(&user("alice")).await);
        assert!(!fixture.presence.is_online(&user("alice")));
        assert_eq!(fixture.presence.list().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_presence_follows_session_when_relogin_races_logout() {
        // テスト項目: ログアウトと同名の再ログインが競合しても、セッションがあればオンライン表示になる
        // given (前提条件):
        let fixture = Fixture::new();
        let logout = Arc::new(create_usecase(&fixture));
        let login = Arc::new(crate::usecase::LoginUseCase::new(
            fixture.sessions.clone(),
            fixture.presence.clone(),
            fixture.repository.clone(),
            fixture.broadcaster.clone(),
        ));
        let _bob_inbox = fixture.connect("bob").await;

        for _ in 0..50 {
            let _alice_inbox = fixture.connect("alice").await;

            // when (操作):
            let logout_task = {
                let logout = logout.clone();
                tokio::spawn(async move { logout.execute(&user("alice")).await })
            };
            let login_task = {
                let login = login.clone();
                tokio::spawn(async move {
                    let (sink, _inbox) = crate::usecase::test_support::channel_sink();
                    login.execute(None, &json!("alice"), sink).await.is_ok()
                })
            };
            logout_task.await.unwrap();
            login_task.await.unwrap();

            // then (期待する結果):
            let alice = user("alice");
            assert_eq!(
                fixture.sessions.contains(&alice).await,
                fixture.presence.is_online(&alice)
            );
            fixture
                .sessions
                .remove_with(&alice, || fixture.presence.set_offline(&alice))
                .await;
        }
    }

    #[tokio::test]
    async fn test_logout_without_session_is_noop() {
        // テスト項目: セッションが無いユーザーのログアウトは何もしない
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = create_usecase(&fixture);
        let mut bob_inbox = fixture.connect("bob").await;

        // when (操作):
        let removed = usecase.execute(&user("ghost")).await;

        // then (期待する結果):
        assert!(!removed);
        assert!(bob_inbox.drain().is_empty());
        assert!(fixture.presence.list_except(&user("bob")).is_empty());
    }
}
