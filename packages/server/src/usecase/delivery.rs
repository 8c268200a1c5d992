//! Routing of `new_message` envelopes.

use crate::{
    domain::{ChatMessage, MessageRepository, PendingMessage, Username},
    infrastructure::{
        BroadcastError, Broadcaster,
        dto::websocket::{ChatMessageDto, ServerKind},
    },
};

/// Persist a message and broadcast it to its online receivers.
///
/// Persisting and choosing the recipients happen under one session-table
/// read lock, so a user logging in at the same time gets the message either
/// in `message_history` or as `new_message`, never both.
///
/// Immediate sends leave the sender out (they get `send_success` instead);
/// scheduled deliveries include the sender.
pub(crate) async fn persist_and_broadcast(
    repository: &dyn MessageRepository,
    broadcaster: &Broadcaster,
    message: PendingMessage,
    include_sender: bool,
) -> (ChatMessage, Result<usize, BroadcastError>) {
    let sender = message.sender.clone();
    let receivers = message.receivers.clone();

    broadcaster
        .publish(
            ServerKind::NewMessage,
            repository.persist(message),
            |username| is_recipient(username, &sender, &receivers, include_sender),
            |persisted: &ChatMessage| ChatMessageDto::from(persisted),
        )
        .await
}

fn is_recipient(
    username: &Username,
    sender: &Username,
    receivers: &[Username],
    include_sender: bool,
) -> bool {
    if username == sender {
        return include_sender;
    }
    receivers.is_empty() || receivers.contains(username)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::user;

    #[test]
    fn test_is_recipient_for_everyone() {
        // テスト項目: 全体宛てでは送信者以外の全員が宛先、送信者は指定次第
        assert!(is_recipient(&user("bob"), &user("alice"), &[], false));
        assert!(!is_recipient(&user("alice"), &user("alice"), &[], false));
        assert!(is_recipient(&user("alice"), &user("alice"), &[], true));
    }

    #[test]
    fn test_is_recipient_for_direct_message() {
        // テスト項目: 個別宛てでは宛先リストのユーザーだけが宛先
        let receivers = [user("bob"), user("alice")];

        assert!(is_recipient(&user("bob"), &user("alice"), &receivers, false));
        assert!(!is_recipient(&user("carol"), &user("alice"), &receivers, true));
        assert!(!is_recipient(&user("alice"), &user("alice"), &receivers, false));
        assert!(is_recipient(&user("alice"), &user("alice"), &[user("bob")], true));
    }
}
