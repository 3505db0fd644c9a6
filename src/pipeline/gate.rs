//! Human-in-the-loop confirmation for large jobs.

use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Decides whether a large run may start
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// Resolve to `true` to proceed with `chunk_count` chunks
    async fn confirm(&self, chunk_count: usize) -> bool;
}

/// Gate that never asks
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysProceed;

#[async_trait]
impl ConfirmationGate for AlwaysProceed {
    async fn confirm(&self, _chunk_count: usize) -> bool {
        true
    }
}

/// Gate that suspends until a decision arrives on a oneshot channel.
///
/// A dropped sender counts as a refusal. The gate answers only once;
/// later calls are refused.
#[derive(Debug)]
pub struct ChannelGate {
    receiver: Mutex<Option<oneshot::Receiver<bool>>>,
}

impl ChannelGate {
    /// Create the gate and the sender that releases it
    pub fn new() -> (Self, oneshot::Sender<bool>) {
        let (sender, receiver) = oneshot::channel();
        let gate = Self {
            receiver: Mutex::new(Some(receiver)),
        };
        (gate, sender)
    }
}

#[async_trait]
impl ConfirmationGate for ChannelGate {
    async fn confirm(&self, chunk_count: usize) -> bool {
        let receiver = self.receiver.lock().ok().and_then(|mut r| r.take());
        let Some(receiver) = receiver else {
            return false;
        };
        tracing::info!("Waiting for go-ahead to process {} chunks", chunk_count);
        receiver.await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_proceed() {
        assert!(tokio_test::block_on(AlwaysProceed.confirm(1_000)));
    }

    #[tokio::test]
    async fn test_channel_gate_answers_once() {
        let (gate, sender) = ChannelGate::new();
        sender.send(true).unwrap();
        assert!(gate.confirm(12).await);
        assert!(!gate.confirm(12).await);
    }

    #[tokio::test]
    async fn test_dropped_sender_declines() {
        let (gate, sender) = ChannelGate::new();
        drop(sender);
        assert!(!gate.confirm(12).await);
    }
}
