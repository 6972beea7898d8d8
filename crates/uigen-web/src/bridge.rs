//! Live sync between the editing session and an open preview.
//!
//! The bridge owns the latest code buffer and a monotonically
//! increasing sequence number. Pushes go out fire-and-forget: the edit
//! loop never blocks on the network, and a failed push is a log line.
//! On the receiving side, [`SeqGuard`] drops pushes that arrive out of
//! order so a slow early request cannot clobber a newer preview.

use crate::client::{GenerationClient, NetworkError, PreviewUpdate};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receiving-side staleness filter. `accept` answers whether a push
/// with the given sequence number is newer than anything seen so far.
#[derive(Debug, Default)]
pub struct SeqGuard(AtomicU64);

impl SeqGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `seq` if it is strictly newer than every previously
    /// accepted sequence number. Safe under concurrent calls: fetch_max
    /// decides a single winner per value.
    pub fn accept(&self, seq: u64) -> bool {
        self.0.fetch_max(seq, Ordering::AcqRel) < seq
    }

    pub fn latest(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

/// Sending side of the live preview channel.
pub struct SyncBridge {
    client: Arc<GenerationClient>,
    buffer: String,
    seq: u64,
}

impl SyncBridge {
    pub fn new(client: GenerationClient) -> Self {
        Self {
            client: Arc::new(client),
            buffer: String::new(),
            seq: 0,
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Replace the buffer and push it to the preview channel. Returns
    /// the sequence number stamped on the push. Outside a tokio runtime
    /// the buffer still updates; only the network push is skipped.
    pub fn push(&mut self, code: impl Into<String>) -> u64 {
        self.buffer = code.into();
        self.seq += 1;
        let seq = self.seq;

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(seq, "no async runtime, preview push skipped");
            return seq;
        };
        let client = Arc::clone(&self.client);
        let code = self.buffer.clone();
        handle.spawn(async move {
            let update = PreviewUpdate { code: &code, seq };
            if let Err(err) = client.update_preview(&update).await {
                log_push_failure(seq, &err);
            }
        });
        seq
    }
}

fn log_push_failure(seq: u64, err: &NetworkError) {
    tracing::warn!(seq, error = %err, "preview push failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn guard_accepts_strictly_increasing_sequences() {
        let guard = SeqGuard::new();
        assert!(guard.accept(1));
        assert!(guard.accept(2));
        assert!(guard.accept(5));
        assert_eq!(guard.latest(), 5);
    }

    #[test]
    fn guard_rejects_stale_and_duplicate_sequences() {
        let guard = SeqGuard::new();
        assert!(guard.accept(3));
        assert!(!guard.accept(3));
        assert!(!guard.accept(2));
        assert!(guard.accept(4));
    }

    #[test]
    fn push_outside_a_runtime_updates_the_buffer_without_panicking() {
        let client = GenerationClient::new("http://127.0.0.1:1").unwrap();
        let mut bridge = SyncBridge::new(client);
        assert_eq!(bridge.push("offline edit"), 1);
        assert_eq!(bridge.buffer(), "offline edit");
        assert_eq!(bridge.seq(), 1);
    }

    #[tokio::test]
    async fn push_stamps_increasing_sequence_numbers() {
        let client = GenerationClient::new("http://127.0.0.1:1").unwrap();
        let mut bridge = SyncBridge::new(client);
        assert_eq!(bridge.push("a"), 1);
        assert_eq!(bridge.push("b"), 2);
        assert_eq!(bridge.buffer(), "b");
        assert_eq!(bridge.seq(), 2);
    }
}
