//! UseCase: ログイン処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - LoginUseCase::execute() メソッド
//! - ユーザー名の検証、重複チェック、参加通知、履歴とユーザー一覧の構築
//!
//! ### なぜこのテストが必要か
//! - ユーザー名ごとにセッションは 1 つだけという不変条件を守る
//! - 新規ユーザーには自分が見られる履歴だけが返ることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：最初のユーザー、既存ユーザーがいる状態でのログイン
//! - 異常系：不正なユーザー名、重複ログイン、同じ接続での再ログイン

use std::sync::Arc;

use serde_json::Value;

use crate::{
    domain::{ChatMessage, MessageRepository, MessageSink, UserPresence, Username},
    infrastructure::{Broadcaster, PresenceTable, SessionTable, dto::websocket::ServerKind},
};

use super::error::LoginError;

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub username: Username,
    /// Messages visible to the new user, in persistence order.
    pub history: Vec<ChatMessage>,
    /// Every other user ever seen, sorted by username.
    pub users: Vec<UserPresence>,
}

/// ログインのユースケース
pub struct LoginUseCase {
    sessions: Arc<SessionTable>,
    presence: Arc<PresenceTable>,
    repository: Arc<dyn MessageRepository>,
    broadcaster: Broadcaster,
}

impl LoginUseCase {
    pub fn new(
        sessions: Arc<SessionTable>,
        presence: Arc<PresenceTable>,
        repository: Arc<dyn MessageRepository>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            sessions,
            presence,
            repository,
            broadcaster,
        }
    }

    /// ログインを実行
    ///
    /// Registration, the presence flip and the history snapshot happen
    /// under the session table's write lock, so every message persisted
    /// concurrently ends up either in `history` or in a live `new_message`
    /// for the new session, never both. Other users are told later by
    /// [`LoginUseCase::announce`].
    ///
    /// # Arguments
    ///
    /// * `current` - この接続で既にログインしているユーザー名
    /// * `data` - `log_in` の生ペイロード（文字列であること）
    /// * `sink` - 新しいセッションへの送信口
    pub async fn execute(
        &self,
        current: Option<&Username>,
        data: &Value,
        sink: Arc<dyn MessageSink>,
    ) -> Result<LoginOutcome, LoginError> {
        if let Some(current) = current {
            tracing::warn!("'{}' tried to log in again on the same connection", current);
            return Err(LoginError::AlreadyLoggedIn);
        }

        let raw = data
            .as_str()
            .ok_or_else(|| LoginError::BadUsername("username is not a string".to_string()))?;
        let username =
            Username::parse(raw).map_err(|e| LoginError::BadUsername(e.to_string()))?;

        // 1. セッション登録とプレゼンス更新、履歴の取得（既存のセッションは変更しない）
        let presence = &self.presence;
        let repository = &self.repository;
        let registered = self
            .sessions
            .register_with(username.clone(), sink, async {
                presence.set_online(&username);
                repository.history_for(&username).await
            })
            .await;
        let Some(history) = registered else {
            tracing::warn!("Username '{}' is already logged in", username);
            return Err(LoginError::AlreadyLoggedIn);
        };

        // 2. ユーザー一覧を構築
        let users = self.presence.list_except(&username);

        tracing::info!("'{}' logged in", username);
        Ok(LoginOutcome {
            username,
            history,
            users,
        })
    }

    /// 他のユーザーへ参加を通知
    ///
    /// Called once the login replies have reached the new user.
    pub async fn announce(&self, username: &Username) {
        if let Err(e) = self
            .broadcaster
            .all_except(ServerKind::UserLoggedIn, &username.as_str(), username)
            .await
        {
            tracing::error!("Failed to broadcast login of '{}': {}", username, e);
        }
    }
}
