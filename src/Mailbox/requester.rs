// src/Mailbox/requester.rs

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use crossbeam_utils::Backoff;
use parking_lot::Mutex;
use tracing::trace;

use super::layout::{RequestState, MAILBOX_CAPACITY};
use super::region::Mailbox;
use crate::error::{MailboxError, Result};

/// The parent side of the mailbox.
///
/// Attaches to a segment created by the worker and issues one request at a
/// time. Calls from several threads of the same process are serialized; a
/// second requester process is not supported.
pub struct Requester {
    mailbox: Mailbox,
    timeout: Duration,
    next_sequence: AtomicU32,
    call_lock: Mutex<Vec<u8>>,
}

impl Requester {
    pub(crate) fn new(mailbox: Mailbox, timeout: Duration) -> Self {
        // Continue after whatever an earlier requester left behind
        let start = mailbox.sequence().wrapping_add(1);
        Self {
            mailbox,
            timeout,
            next_sequence: AtomicU32::new(start),
            call_lock: Mutex::new(Vec::with_capacity(MAILBOX_CAPACITY)),
        }
    }

    /// Sends a command line and returns the worker's textual answer.
    ///
    /// Error responses produced by the worker (`error: ...`) are returned as
    /// `Ok`; only transport failures are `Err`.
    pub fn call(&self, line: &str) -> Result<String> {
        let response = self.call_bytes(line.as_bytes())?;
        Ok(String::from_utf8_lossy(&response).into_owned())
    }

    /// Sends a raw payload and waits for the raw response.
    ///
    /// # Returns
    /// * `Ok(bytes)` once the worker published a response
    /// * `Err(PayloadTooLarge)` if the payload exceeds the mailbox capacity
    /// * `Err(Timeout)` if the worker did not release the mailbox or answer in time
    pub fn call_bytes(&self, payload: &[u8]) -> Result<Vec<u8>> {
        if payload.len() > MAILBOX_CAPACITY {
            return Err(MailboxError::PayloadTooLarge {
                len: payload.len(),
                capacity: MAILBOX_CAPACITY,
            });
        }

        let mut response = self.call_lock.lock();
        let deadline = Instant::now() + self.timeout;

        self.wait_until(deadline, "the mailbox to become empty", |mailbox| {
            Ok(mailbox.request_state() == Some(RequestState::Empty))
        })?;

        let seq = self.take_sequence();
        self.mailbox.publish_request(seq, payload)?;
        trace!(seq, len = payload.len(), "Request published");

        let mailbox_response = &mut *response;
        self.wait_until(deadline, "a response", |mailbox| {
            mailbox.take_response(mailbox_response)
        })?;

        Ok(response.clone())
    }

    fn take_sequence(&self) -> u32 {
        loop {
            let seq = self.next_sequence.fetch_add(1, Ordering::Relaxed);
            // 0 is the value of a freshly zeroed mailbox
            if seq != 0 {
                return seq;
            }
        }
    }

    fn wait_until<F>(&self, deadline: Instant, what: &'static str, mut ready: F) -> Result<()>
    where
        F: FnMut(&Mailbox) -> Result<bool>,
    {
        let backoff = Backoff::new();
        loop {
            if ready(&self.mailbox)? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(MailboxError::Timeout(what));
            }
            if backoff.is_completed() {
                std::thread::yield_now();
            } else {
                backoff.snooze();
            }
        }
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
