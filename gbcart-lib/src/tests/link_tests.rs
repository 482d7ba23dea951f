use std::sync::mpsc;
use std::thread;

use super::*;

/// Transport that echoes every write back into the inbox.
#[derive(Default)]
struct Echo {
    inbox: Option<Arc<Inbox>>,
    opens: Arc<AtomicU64>,
    missing: bool,
}

impl Transport for Echo {
    fn open(&mut self, inbox: Arc<Inbox>) -> Result<(), CartError> {
        if self.missing {
            return Err(CartError::DeviceNotFound("echo".into()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inbox = Some(inbox);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.inbox.is_some()
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        match &self.inbox {
            Some(inbox) => {
                inbox.deliver(bytes);
                Ok(())
            }
            None => Err(io::Error::from(io::ErrorKind::NotConnected)),
        }
    }

    fn close(&mut self) {
        self.inbox = None;
    }

    fn describe(&self) -> String {
        "echo".into()
    }
}

const SHORT: Duration = Duration::from_millis(50);

#[test]
fn test_send_and_receive() {
    let link = Link::new(Echo::default());
    let handle = link.acquire(SHORT).unwrap();
    assert!(handle.send(b"hello"));
    let cancel = CancelToken::new();
    assert_eq!(handle.receive(2, SHORT, &cancel).unwrap(), b"he");
    assert_eq!(handle.receive(3, SHORT, &cancel).unwrap(), b"llo");
}

#[test]
fn test_receive_times_out() {
    let link = Link::new(Echo::default());
    let handle = link.acquire(SHORT).unwrap();
    handle.send(b"x");
    let err = handle.receive(2, SHORT, &CancelToken::new()).unwrap_err();
    assert!(matches!(err, CartError::Timeout(_)));
}

#[test]
fn test_receive_observes_cancellation() {
    let link = Link::new(Echo::default());
    let handle = link.acquire(SHORT).unwrap();
    let cancel = CancelToken::new();
    let remote = cancel.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        remote.cancel();
    });
    let started = Instant::now();
    let err = handle
        .receive(1, Duration::from_secs(5), &cancel)
        .unwrap_err();
    canceller.join().unwrap();
    assert!(matches!(err, CartError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_second_acquire_blocks_until_release() {
    let link = Arc::new(Link::new(Echo::default()));
    let first = link.acquire(SHORT).unwrap();
    assert!(link.is_held());

    let (tx, rx) = mpsc::channel();
    let other = Arc::clone(&link);
    let waiter = thread::spawn(move || {
        let handle = other.acquire(Duration::from_secs(5)).unwrap();
        tx.send(handle.holder()).unwrap();
    });

    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    let first_id = first.holder();
    drop(first);
    let second_id = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    waiter.join().unwrap();
    assert_ne!(first_id, second_id);
    assert!(!link.is_held());
}

#[test]
fn test_acquire_times_out_while_held() {
    let link = Link::new(Echo::default());
    let _held = link.acquire(SHORT).unwrap();
    let err = link.acquire(SHORT).unwrap_err();
    assert!(matches!(err, CartError::Timeout(_)));
}

#[test]
fn test_open_failure_frees_the_slot() {
    let link = Link::new(Echo {
        missing: true,
        ..Default::default()
    });
    let err = link.acquire(SHORT).unwrap_err();
    assert!(matches!(err, CartError::DeviceNotFound(_)));
    assert!(!link.is_held());
}

#[test]
fn test_stale_bytes_are_flushed_on_acquire() {
    let link = Link::new(Echo::default());
    {
        let handle = link.acquire(SHORT).unwrap();
        handle.send(b"leftover");
    }
    let handle = link.acquire(SHORT).unwrap();
    let err = handle.receive(1, SHORT, &CancelToken::new()).unwrap_err();
    assert!(matches!(err, CartError::Timeout(_)));
}

#[test]
fn test_removal_closes_port_and_next_acquire_reopens() {
    let opens = Arc::new(AtomicU64::new(0));
    let link = Link::new(Echo {
        opens: Arc::clone(&opens),
        ..Default::default()
    });
    {
        let handle = link.acquire(SHORT).unwrap();
        link.inbox.mark_removed();
        assert!(handle.is_removed());
        let err = handle
            .receive(1, Duration::from_secs(5), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, CartError::DeviceRemoved));
    }
    assert!(!link.transport.lock().is_open());

    let handle = link.acquire(SHORT).unwrap();
    assert!(!handle.is_removed());
    assert_eq!(opens.load(Ordering::SeqCst), 2);
}

#[test]
fn test_inbox_overrun_is_a_protocol_error() {
    let inbox = Inbox::new(4);
    inbox.deliver(b"abcdef");
    assert_eq!(inbox.len(), 4);
    let err = inbox.take(1, SHORT, &CancelToken::new()).unwrap_err();
    assert!(matches!(err, CartError::Protocol(_)));
    assert!(inbox.is_empty());
}

#[test]
fn test_buffered_bytes_survive_removal() {
    let inbox = Inbox::default();
    inbox.deliver(b"ok");
    inbox.mark_removed();
    assert_eq!(inbox.take(2, SHORT, &CancelToken::new()).unwrap(), b"ok");
    assert!(matches!(
        inbox.take(1, SHORT, &CancelToken::new()),
        Err(CartError::DeviceRemoved)
    ));
}
