//! UseCase 層
//!
//! チャットのビジネスロジック（ログイン、ログアウト、送信、予約配信）を提供します。
//! UI 層はここで定義されたユースケースだけを呼び出します。

mod delivery;
pub mod deliver_scheduled;
pub mod error;
pub mod login;
pub mod logout;
pub mod send_message;

#[cfg(test)]
pub(crate) mod test_support;

pub use deliver_scheduled::DeliverScheduledUseCase;
pub use error::{LoginError, SendMessageError};
pub use login::{LoginOutcome, LoginUseCase};
pub use logout::LogoutUseCase;
pub use send_message::{SendMessageUseCase, SendOutcome};
