//! Exclusive ownership of the serial link to the adapter.
//!
//! A [`Link`] wraps one [`Transport`] and hands it out to a single holder
//! at a time. Bytes from the device land in an [`Inbox`] filled by the
//! transport's own I/O context; the holder drains it with
//! [`LinkHandle::receive`]. Dropping the handle releases the link.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::CartError;
use crate::transfer::CancelToken;

/// Default bound on buffered inbound bytes.
pub const INBOX_CAPACITY: usize = 64 * 1024;

/// How often a blocked receive re-checks its cancellation token.
const CANCEL_POLL: Duration = Duration::from_millis(20);

/// A byte pipe to the adapter.
///
/// Implementations deliver inbound bytes to the inbox passed to
/// [`open`](Transport::open) from their own thread or callback, and mark
/// it removed when the device goes away.
pub trait Transport: Send {
    /// Open the device. Called on every acquire while closed.
    fn open(&mut self, inbox: Arc<Inbox>) -> Result<(), CartError>;

    fn is_open(&self) -> bool;

    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn close(&mut self);

    /// Short human-readable description (port path, "simulated", ...).
    fn describe(&self) -> String;
}

#[derive(Debug, Default)]
struct InboxState {
    bytes: VecDeque<u8>,
    removed: bool,
    overrun: bool,
}

/// Bounded buffer of bytes received from the device.
///
/// [`deliver`](Inbox::deliver) never blocks. Bytes past the bound are
/// dropped and the overrun is reported to the next receive.
#[derive(Debug)]
pub struct Inbox {
    state: Mutex<InboxState>,
    arrived: Condvar,
    capacity: usize,
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new(INBOX_CAPACITY)
    }
}

impl Inbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(InboxState::default()),
            arrived: Condvar::new(),
            capacity,
        }
    }

    /// Append bytes from the device.
    pub fn deliver(&self, data: &[u8]) {
        let mut state = self.state.lock();
        let room = self.capacity.saturating_sub(state.bytes.len());
        if data.len() > room {
            state.overrun = true;
        }
        state.bytes.extend(&data[..data.len().min(room)]);
        drop(state);
        self.arrived.notify_all();
    }

    /// Record that the device went away and wake any waiter.
    pub fn mark_removed(&self) {
        self.state.lock().removed = true;
        self.arrived.notify_all();
    }

    pub fn is_removed(&self) -> bool {
        self.state.lock().removed
    }

    pub fn len(&self) -> usize {
        self.state.lock().bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop stale bytes and clear the overrun flag.
    pub fn flush(&self) {
        let mut state = self.state.lock();
        state.bytes.clear();
        state.overrun = false;
    }

    /// Forget a previous removal, called when the port is reopened.
    fn reset(&self) {
        *self.state.lock() = InboxState::default();
    }

    /// Wait until `count` bytes are buffered, then take them.
    ///
    /// Buffered bytes win over a removal that happened after they arrived.
    pub fn take(
        &self,
        count: usize,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, CartError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if state.overrun {
                state.overrun = false;
                state.bytes.clear();
                return Err(CartError::protocol("inbound buffer overrun"));
            }
            if state.bytes.len() >= count {
                return Ok(state.bytes.drain(..count).collect());
            }
            if state.removed {
                return Err(CartError::DeviceRemoved);
            }
            if cancel.is_cancelled() {
                return Err(CartError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(CartError::Timeout("adapter response"));
            }
            let slice = (deadline - now).min(CANCEL_POLL);
            self.arrived.wait_for(&mut state, slice);
        }
    }
}

#[derive(Debug, Default)]
struct HolderSlot {
    holder: Option<u64>,
}

/// The serial link, shared by every request a session runs.
pub struct Link {
    transport: Mutex<Box<dyn Transport>>,
    inbox: Arc<Inbox>,
    slot: Mutex<HolderSlot>,
    freed: Condvar,
    next_holder: AtomicU64,
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("transport", &self.describe())
            .field("holder", &self.slot.lock().holder)
            .finish()
    }
}

impl Link {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_inbox(transport, Inbox::default())
    }

    pub fn with_inbox(transport: impl Transport + 'static, inbox: Inbox) -> Self {
        Self {
            transport: Mutex::new(Box::new(transport)),
            inbox: Arc::new(inbox),
            slot: Mutex::new(HolderSlot::default()),
            freed: Condvar::new(),
            next_holder: AtomicU64::new(1),
        }
    }

    pub fn describe(&self) -> String {
        self.transport.lock().describe()
    }

    pub fn is_held(&self) -> bool {
        self.slot.lock().holder.is_some()
    }

    /// Become the link's only holder, opening the port if needed.
    ///
    /// Blocks while another handle is alive. Fails with `Timeout` if the
    /// link is still held after `timeout`, or with the transport's error
    /// (usually `DeviceNotFound`) if the port cannot be opened.
    pub fn acquire(&self, timeout: Duration) -> Result<LinkHandle<'_>, CartError> {
        let deadline = Instant::now() + timeout;
        let holder = self.next_holder.fetch_add(1, Ordering::Relaxed);
        {
            let mut slot = self.slot.lock();
            while slot.holder.is_some() {
                if self.freed.wait_until(&mut slot, deadline).timed_out() && slot.holder.is_some()
                {
                    return Err(CartError::Timeout("the link to be released"));
                }
            }
            slot.holder = Some(holder);
        }
        log::debug!("link acquired by holder {}", holder);

        // From here the handle's Drop releases the slot on every path.
        let handle = LinkHandle { link: self, holder };
        {
            let mut transport = self.transport.lock();
            if transport.is_open() && self.inbox.is_removed() {
                transport.close();
            }
            if !transport.is_open() {
                self.inbox.reset();
                transport.open(Arc::clone(&self.inbox))?;
                log::debug!("opened {}", transport.describe());
            }
        }
        self.inbox.flush();
        Ok(handle)
    }

    fn release(&self, holder: u64) {
        if self.inbox.is_removed() {
            let mut transport = self.transport.lock();
            if transport.is_open() {
                log::warn!("{} was removed, closing it", transport.describe());
                transport.close();
            }
        }
        let mut slot = self.slot.lock();
        if slot.holder == Some(holder) {
            slot.holder = None;
        }
        drop(slot);
        self.freed.notify_one();
        log::debug!("link released by holder {}", holder);
    }
}

/// Proof of exclusive access to a [`Link`]. Dropping it releases the link.
#[derive(Debug)]
pub struct LinkHandle<'a> {
    link: &'a Link,
    holder: u64,
}

impl LinkHandle<'_> {
    pub fn holder(&self) -> u64 {
        self.holder
    }

    /// Write raw bytes. Returns `false` if the port is not open or the
    /// write failed; a failed write marks the device removed.
    pub fn send(&self, bytes: &[u8]) -> bool {
        let mut transport = self.link.transport.lock();
        if !transport.is_open() {
            return false;
        }
        match transport.write(bytes) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("write to {} failed: {}", transport.describe(), e);
                self.link.inbox.mark_removed();
                false
            }
        }
    }

    /// Block until `count` bytes arrive.
    pub fn receive(
        &self,
        count: usize,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, CartError> {
        self.link.inbox.take(count, timeout, cancel)
    }

    pub fn is_removed(&self) -> bool {
        self.link.inbox.is_removed()
    }

    /// Release the link explicitly.
    pub fn release(self) {}
}

impl Drop for LinkHandle<'_> {
    fn drop(&mut self) {
        self.link.release(self.holder);
    }
}

#[cfg(test)]
#[path = "tests/link_tests.rs"]
mod tests;
