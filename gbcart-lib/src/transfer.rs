//! Per-call transfer bookkeeping and request cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::CartError;

/// Shared flag a caller flips to abandon a running request.
///
/// Clones share the same flag, so the token handed to a request can be
/// cancelled from a signal handler or another task.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` once the token has fired.
    pub fn check(&self) -> Result<(), CartError> {
        if self.is_cancelled() {
            Err(CartError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Byte accounting for one engine call.
///
/// Reads append into the accumulator; writes only advance the counter.
/// `completed` never exceeds `target`.
#[derive(Debug)]
pub struct Transfer {
    buffer: Vec<u8>,
    target: u64,
    completed: u64,
    cancel: CancelToken,
}

impl Transfer {
    pub fn new(target: u64, cancel: CancelToken) -> Self {
        Self {
            buffer: Vec::with_capacity(target as usize),
            target,
            completed: 0,
            cancel,
        }
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn remaining(&self) -> u64 {
        self.target - self.completed
    }

    pub fn is_done(&self) -> bool {
        self.completed == self.target
    }

    /// Whether the counter sits on a packet boundary.
    pub fn is_page_complete(&self, packet_size: usize) -> bool {
        self.completed % packet_size as u64 == 0
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Append received bytes in arrival order.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), CartError> {
        self.advance(bytes.len() as u64)?;
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Count bytes that were sent rather than received.
    pub fn advance(&mut self, count: u64) -> Result<(), CartError> {
        if count > self.remaining() {
            return Err(CartError::protocol(format!(
                "transfer overrun: {} bytes past a target of {}",
                self.completed + count - self.target,
                self.target
            )));
        }
        self.completed += count;
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_tracks_pages() {
        let mut t = Transfer::new(128, CancelToken::new());
        assert!(t.is_page_complete(64));
        t.append(&[1; 32]).unwrap();
        assert!(!t.is_page_complete(64));
        t.append(&[2; 32]).unwrap();
        assert!(t.is_page_complete(64));
        assert_eq!(t.remaining(), 64);
        t.append(&[3; 64]).unwrap();
        assert!(t.is_done());
        assert_eq!(t.into_bytes().len(), 128);
    }

    #[test]
    fn test_overrun_is_rejected() {
        let mut t = Transfer::new(64, CancelToken::new());
        t.advance(60).unwrap();
        assert!(matches!(t.append(&[0; 8]), Err(CartError::Protocol(_))));
        assert_eq!(t.completed(), 60);
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let t = Transfer::new(64, token.clone());
        assert!(t.cancel_token().check().is_ok());
        token.cancel();
        assert!(matches!(t.cancel_token().check(), Err(CartError::Cancelled)));
    }
}
