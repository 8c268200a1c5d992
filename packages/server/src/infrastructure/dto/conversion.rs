//! Conversion logic between DTOs and domain entities.

use crate::domain::{ChatMessage, UserPresence};
use crate::infrastructure::dto::websocket as dto;

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&ChatMessage> for dto::ChatMessageDto {
    fn from(model: &ChatMessage) -> Self {
        Self {
            id: model.id.value(),
            sender: model.sender.as_str().to_string(),
            receivers: model
                .receivers
                .iter()
                .map(|r| r.as_str().to_string())
                .collect(),
            timestamp: model.timestamp,
            body: model.body.clone(),
        }
    }
}

impl From<ChatMessage> for dto::ChatMessageDto {
    fn from(model: ChatMessage) -> Self {
        Self {
            id: model.id.value(),
            sender: model.sender.into_string(),
            receivers: model.receivers.into_iter().map(|r| r.into_string()).collect(),
            timestamp: model.timestamp,
            body: model.body,
        }
    }
}

impl From<UserPresence> for dto::UserPresenceDto {
    fn from(model: UserPresence) -> Self {
        Self {
            username: model.username.into_string(),
            online: model.online,
        }
    }
}

impl From<&ChatMessage> for dto::SendSuccessDto {
    fn from(model: &ChatMessage) -> Self {
        Self {
            id: model.id.value(),
            timestamp: model.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageId, Username};
    use chrono::{TimeZone, Utc};

    fn user(name: &str) -> Username {
        Username::parse(name).unwrap()
    }

    #[test]
    fn test_domain_chat_message_to_dto() {
        // テスト項目: ドメインエンティティの ChatMessage が DTO に変換される
        // given (前提条件):
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let domain_msg = ChatMessage {
            id: MessageId::new(7),
            sender: user("alice"),
            receivers: vec![user("bob"), user("carol")],
            timestamp,
            body: "hello".to_string(),
        };

        // when (操作):
        let by_ref: dto::ChatMessageDto = (&domain_msg).into();
        let by_value: dto::ChatMessageDto = domain_msg.into();

        // then (期待する結果):
        assert_eq!(by_ref, by_value);
        assert_eq!(by_value.id, 7);
        assert_eq!(by_value.sender, "alice");
        assert_eq!(by_value.receivers, vec!["bob", "carol"]);
        assert_eq!(by_value.timestamp, timestamp);
        assert_eq!(by_value.body, "hello");
    }

    #[test]
    fn test_domain_presence_to_dto() {
        // テスト項目: UserPresence が DTO に変換される
        let presence = UserPresence {
            username: user("bob"),
            online: false,
        };

        let dto: dto::UserPresenceDto = presence.into();

        assert_eq!(dto.username, "bob");
        assert!(!dto.online);
    }

    #[test]
    fn test_send_success_carries_id_and_timestamp() {
        // テスト項目: send_success の DTO は ID とタイムスタンプだけを持つ
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let message = ChatMessage {
            id: MessageId::new(1),
            sender: user("alice"),
            receivers: vec![],
            timestamp,
            body: "hi".to_string(),
        };

        let dto: dto::SendSuccessDto = (&message).into();

        assert_eq!(dto, dto::SendSuccessDto { id: 1, timestamp });
    }
}
