//! Message formatting utilities for client display.

use chrono::{DateTime, Utc};
use kairo_server::infrastructure::dto::websocket::{
    ChatMessageDto, SendSuccessDto, ServerEnvelope, ServerKind, UserPresenceDto,
};
use kairo_shared::time::format_time_of_day;
use serde::de::DeserializeOwned;
use serde_json::Value;

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Render any server envelope.
    ///
    /// Payloads that do not match their kind are shown raw.
    pub fn format_envelope(envelope: &ServerEnvelope, current_username: &str) -> String {
        let data = &envelope.data;
        let formatted = match envelope.kind {
            ServerKind::LoginStatus => {
                decode::<String>(data).map(|status| Self::format_login_status(&status))
            }
            ServerKind::MessageHistory => decode::<Vec<ChatMessageDto>>(data)
                .map(|history| Self::format_history(&history, current_username)),
            ServerKind::Users => decode::<Vec<UserPresenceDto>>(data)
                .map(|users| Self::format_users(&users)),
            ServerKind::UserLoggedIn => {
                decode::<String>(data).map(|name| Self::format_user_logged_in(&name))
            }
            ServerKind::UserLoggedOut => {
                decode::<String>(data).map(|name| Self::format_user_logged_out(&name))
            }
            ServerKind::NewMessage => decode::<ChatMessageDto>(data)
                .map(|message| Self::format_chat_message(&message, current_username)),
            ServerKind::SendSuccess => decode::<SendSuccessDto>(data)
                .map(|success| Self::format_sent_confirmation(success.id, &success.timestamp)),
            ServerKind::ScheduleSuccess => Some(Self::format_schedule_confirmation()),
            ServerKind::SendFail => {
                decode::<String>(data).map(|reason| Self::format_send_fail(&reason))
            }
            ServerKind::Status => decode::<String>(data).map(|text| Self::format_status(&text)),
        };

        formatted.unwrap_or_else(|| Self::format_raw_message(&data.to_string()))
    }

    pub fn format_login_status(status: &str) -> String {
        format!("\n* login: {}\n", status)
    }

    /// Format the history received right after login
    pub fn format_history(history: &[ChatMessageDto], current_username: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n\n{}\nHistory:\n", RULE));

        if history.is_empty() {
            output.push_str("(No messages)\n");
        } else {
            for message in history {
                output.push_str(&format!(
                    "[{}] {}\n",
                    format_time_of_day(&message.timestamp),
                    Self::headline(message, current_username)
                ));
            }
        }

        output.push_str(RULE);
        output.push('\n');
        output
    }

    /// Format the user list, marking who is online
    pub fn format_users(users: &[UserPresenceDto]) -> String {
        let mut output = String::new();
        output.push_str("Users:\n");

        if users.is_empty() {
            output.push_str("(No other users)\n");
        } else {
            for user in users {
                let state = if user.online { "online" } else { "offline" };
                output.push_str(&format!("{} - {}\n", user.username, state));
            }
        }

        output.push_str(RULE);
        output.push('\n');
        output
    }

    pub fn format_user_logged_in(username: &str) -> String {
        format!("\n+ {} logged in\n", username)
    }

    pub fn format_user_logged_out(username: &str) -> String {
        format!("\n- {} logged out\n", username)
    }

    /// Format a chat message
    pub fn format_chat_message(message: &ChatMessageDto, current_username: &str) -> String {
        format!(
            "\n\n{}\n{}\nsent at {}\n{}\n",
            THIN_RULE,
            Self::headline(message, current_username),
            format_time_of_day(&message.timestamp),
            THIN_RULE
        )
    }

    pub fn format_sent_confirmation(id: u64, timestamp: &DateTime<Utc>) -> String {
        format!("\n#{} sent at {}\n", id, format_time_of_day(timestamp))
    }

    pub fn format_schedule_confirmation() -> String {
        "\nscheduled\n".to_string()
    }

    pub fn format_send_fail(reason: &str) -> String {
        format!("\n! send failed: {}\n", reason)
    }

    pub fn format_status(text: &str) -> String {
        format!("\n* {}\n", text)
    }

    /// Format a binary message notification
    pub fn format_binary_message(byte_count: usize) -> String {
        format!("\n← Received {} bytes of binary data\n", byte_count)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }

    /// `@sender: body`, or `@sender → a, b: body` for a direct message.
    fn headline(message: &ChatMessageDto, current_username: &str) -> String {
        let sender = if message.sender == current_username {
            format!("@{} (me)", message.sender)
        } else {
            format!("@{}", message.sender)
        };

        if message.receivers.is_empty() {
            format!("{}: {}", sender, message.body)
        } else {
            format!("{} → {}: {}", sender, message.receivers.join(", "), message.body)
        }
    }
}

fn decode<T: DeserializeOwned>(data: &Value) -> Option<T> {
    T::deserialize(data).ok()
}
