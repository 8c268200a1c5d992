//! Server state shared by every connection handler.

use std::sync::Arc;

use kairo_shared::time::Clock;

use crate::{
    domain::MessageRepository,
    infrastructure::{
        Broadcaster, InMemoryMessageRepository, PresenceTable, ScheduledMessages, SessionTable,
    },
    usecase::{DeliverScheduledUseCase, LoginUseCase, LogoutUseCase, SendMessageUseCase},
};

/// Shared application state
pub struct AppState {
    /// Live sessions, needed directly only for shutdown
    pub sessions: Arc<SessionTable>,
    /// LoginUseCase（ログインのユースケース）
    pub login_usecase: Arc<LoginUseCase>,
    /// LogoutUseCase（ログアウトのユースケース）
    pub logout_usecase: Arc<LogoutUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// DeliverScheduledUseCase（予約配信のユースケース）
    pub deliver_scheduled_usecase: Arc<DeliverScheduledUseCase>,
}

impl AppState {
    /// Wire every store and use case in memory.
    ///
    /// Initialization order:
    /// 1. Stores (sessions, presence, messages, scheduled set)
    /// 2. Broadcaster
    /// 3. UseCases
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        // 1. ストア
        let sessions = Arc::new(SessionTable::new());
        let presence = Arc::new(PresenceTable::new());
        let repository: Arc<dyn MessageRepository> =
            Arc::new(InMemoryMessageRepository::new(clock.clone()));
        let scheduled = Arc::new(ScheduledMessages::new());

        // 2. ブロードキャスト
        let broadcaster = Broadcaster::new(sessions.clone());

        // 3. ユースケース
        let login_usecase = Arc::new(LoginUseCase::new(
            sessions.clone(),
            presence.clone(),
            repository.clone(),
            broadcaster.clone(),
        ));
        let logout_usecase = Arc::new(LogoutUseCase::new(
            sessions.clone(),
            presence,
            broadcaster.clone(),
        ));
        let send_message_usecase = Arc::new(SendMessageUseCase::new(
            repository.clone(),
            scheduled.clone(),
            broadcaster.clone(),
        ));
        let deliver_scheduled_usecase = Arc::new(DeliverScheduledUseCase::new(
            repository,
            scheduled,
            broadcaster,
            clock,
        ));

        Self {
            sessions,
            login_usecase,
            logout_usecase,
            send_message_usecase,
            deliver_scheduled_usecase,
        }
    }
}
