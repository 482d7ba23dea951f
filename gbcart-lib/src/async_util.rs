//! Async utilities for driving requests with progress channels.
//!
//! Provides a reusable pattern for awaiting a request while draining its
//! progress channel, so a frontend can redraw a progress bar without
//! blocking the worker that runs the transfer.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

/// Maximum time to drain remaining events after the task completes.
/// If senders are leaked (detached tasks holding clones), we don't block
/// forever waiting for the channel to close.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Abstraction over bounded and unbounded mpsc receivers.
#[allow(async_fn_in_trait)]
pub trait EventReceiver<E> {
    /// Receive the next event, returning `None` when the channel is closed.
    async fn recv(&mut self) -> Option<E>;
}

impl<E> EventReceiver<E> for mpsc::Receiver<E> {
    async fn recv(&mut self) -> Option<E> {
        mpsc::Receiver::recv(self).await
    }
}

impl<E> EventReceiver<E> for mpsc::UnboundedReceiver<E> {
    async fn recv(&mut self) -> Option<E> {
        mpsc::UnboundedReceiver::recv(self).await
    }
}

/// Drive an async task while processing events from its channel.
///
/// Runs `task` to completion, calling `on_event` for each event received on
/// `event_rx`. Returns the task's result after the channel is fully drained
/// (or after a timeout if senders are not dropped promptly).
pub async fn drive_with_progress<F, E, R, Rx>(
    task: F,
    mut event_rx: Rx,
    mut on_event: impl FnMut(E),
) -> R
where
    F: Future<Output = R>,
    Rx: EventReceiver<E> + Unpin,
{
    tokio::pin!(task);
    let mut event_count: u64 = 0;

    // Select between task completion and events
    let result = loop {
        tokio::select! {
            r = &mut task => break Some(r),
            event = event_rx.recv() => match event {
                Some(e) => {
                    event_count += 1;
                    on_event(e);
                }
                // Channel closed before the task finished
                None => break None,
            }
        }
    };

    let Some(result) = result else {
        log::debug!(
            "drive_with_progress: channel closed after {} events, awaiting task",
            event_count
        );
        return task.await;
    };

    // Drain remaining events with a timeout
    let deadline = Instant::now() + DRAIN_TIMEOUT;
    loop {
        match tokio::time::timeout_at(deadline, event_rx.recv()).await {
            Ok(Some(e)) => {
                event_count += 1;
                on_event(e);
            }
            Ok(None) => break,
            Err(_) => {
                log::warn!(
                    "drive_with_progress: drain timed out after {}s, senders likely leaked",
                    DRAIN_TIMEOUT.as_secs()
                );
                break;
            }
        }
    }
    log::debug!("drive_with_progress: done ({} events)", event_count);
    result
}
