//! Fan-out of one server envelope to many sessions.

use std::{future::Future, sync::Arc};

use serde::Serialize;
use thiserror::Error;

use crate::{
    domain::Username,
    infrastructure::{
        dto::websocket::{ServerKind, encode_envelope},
        session::{Recipient, SessionTable},
    },
};

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Sends envelopes to the sessions in the shared [`SessionTable`].
///
/// The envelope is serialized once. Recipients are copied out under the
/// table's read lock and the lock is released before any write, so a slow
/// recipient never blocks login or logout.
#[derive(Clone)]
pub struct Broadcaster {
    sessions: Arc<SessionTable>,
}

impl Broadcaster {
    pub fn new(sessions: Arc<SessionTable>) -> Self {
        Self { sessions }
    }

    /// Send to every session. Returns how many recipients accepted the frame.
    pub async fn all<T: Serialize>(&self, kind: ServerKind, data: &T) -> Result<usize, BroadcastError> {
        let text = encode_envelope(kind, data)?;
        let recipients = self.sessions.snapshot(|_| true).await;
        Ok(deliver(kind, &text, recipients).await)
    }

    /// Send to every session except `except`.
    pub async fn all_except<T: Serialize>(
        &self,
        kind: ServerKind,
        data: &T,
        except: &Username,
    ) -> Result<usize, BroadcastError> {
        let text = encode_envelope(kind, data)?;
        let recipients = self.sessions.snapshot(|u| u != except).await;
        Ok(deliver(kind, &text, recipients).await)
    }

    /// Send to the listed usernames that currently have a session.
    pub async fn filter<T: Serialize>(
        &self,
        kind: ServerKind,
        data: &T,
        usernames: &[Username],
    ) -> Result<usize, BroadcastError> {
        let text = encode_envelope(kind, data)?;
        let recipients = self.sessions.snapshot(|u| usernames.contains(u)).await;
        Ok(deliver(kind, &text, recipients).await)
    }

    /// Run `produce` and pick the sessions `filter` accepts under the same
    /// session-table read lock, then send `to_data(&value)` to them.
    ///
    /// A session registering concurrently either exists before `produce`
    /// runs (and receives the envelope) or registers after it (and sees the
    /// produced value through whatever it snapshots at registration).
    pub async fn publish<T, D, Fut, F, C>(
        &self,
        kind: ServerKind,
        produce: Fut,
        filter: F,
        to_data: C,
    ) -> (T, Result<usize, BroadcastError>)
    where
        Fut: Future<Output = T>,
        F: Fn(&Username) -> bool,
        C: FnOnce(&T) -> D,
        D: Serialize,
    {
        let (value, recipients) = self.sessions.snapshot_with(produce, filter).await;
        let result = match encode_envelope(kind, &to_data(&value)) {
            Ok(text) => Ok(deliver(kind, &text, recipients).await),
            Err(e) => Err(BroadcastError::from(e)),
        };
        (value, result)
    }
}

async fn deliver(kind: ServerKind, text: &str, recipients: Vec<Recipient>) -> usize {
    let mut delivered = 0;
    for (username, sink) in recipients {
        match sink.send_text(text).await {
            Ok(()) => delivered += 1,
            Err(e) => {
                // 一部の送信失敗は許容し、残りの宛先へ配信を続ける
                tracing::warn!("Failed to send {:?} to '{}': {}", kind, username, e);
            }
        }
    }
    delivered
}
