// Atomic handshake on a mailbox.
//
// request_flag:  Empty -> Pending (requester) -> Processing -> Empty (worker)
// response_flag: NotReady -> Ready (worker) -> NotReady (requester)
//
// Every flag store that hands a buffer to the other side is a release store,
// every flag load that takes a buffer over is an acquire load.

use std::ptr::{self, addr_of, addr_of_mut};
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Relaxed, Release};
use std::time::{SystemTime, UNIX_EPOCH};

use super::layout::{RequestState, ResponseState, MAILBOX_CAPACITY};
use super::region::Mailbox;
use crate::error::{MailboxError, Result};

/// Microseconds since the Unix epoch.
pub fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

impl Mailbox {
    #[inline]
    fn request_flag(&self) -> &AtomicU32 {
        unsafe { &(*self.layout).request_flag }
    }

    #[inline]
    fn response_flag(&self) -> &AtomicU32 {
        unsafe { &(*self.layout).response_flag }
    }

    #[inline]
    fn sequence_id(&self) -> &AtomicU32 {
        unsafe { &(*self.layout).sequence_id }
    }

    /// Current request state, `None` if the word holds an unknown value.
    pub fn request_state(&self) -> Option<RequestState> {
        RequestState::from_u32(self.request_flag().load(Acquire))
    }

    /// Current response state, `None` if the word holds an unknown value.
    pub fn response_state(&self) -> Option<ResponseState> {
        ResponseState::from_u32(self.response_flag().load(Acquire))
    }

    /// Sequence id of the most recently published request.
    pub fn sequence(&self) -> u32 {
        self.sequence_id().load(Acquire)
    }

    pub fn last_request_time(&self) -> u64 {
        unsafe { addr_of!((*self.layout).last_request_time).read_volatile() }
    }

    pub fn last_response_time(&self) -> u64 {
        unsafe { addr_of!((*self.layout).last_response_time).read_volatile() }
    }

    // ---------------------------------------------------------------------
    // Requester side
    // ---------------------------------------------------------------------

    /// Write a request and mark it pending.
    ///
    /// Fails without touching the mailbox if the payload does not fit or if
    /// the previous request has not been handed back yet. An unconsumed
    /// response left from an earlier cycle is discarded first.
    pub fn publish_request(&self, seq: u32, payload: &[u8]) -> Result<()> {
        if payload.len() > MAILBOX_CAPACITY {
            return Err(MailboxError::PayloadTooLarge {
                len: payload.len(),
                capacity: MAILBOX_CAPACITY,
            });
        }
        if self.request_flag().load(Acquire) != RequestState::Empty as u32 {
            return Err(MailboxError::Busy);
        }

        self.response_flag()
            .store(ResponseState::NotReady as u32, Release);

        unsafe {
            ptr::copy_nonoverlapping(
                payload.as_ptr(),
                addr_of_mut!((*self.layout).request_buffer) as *mut u8,
                payload.len(),
            );
            addr_of_mut!((*self.layout).request_size).write(payload.len() as u32);
        }

        self.sequence_id().store(seq, Relaxed);
        // Publishes the payload, size and sequence above
        self.request_flag()
            .store(RequestState::Pending as u32, Release);
        Ok(())
    }

    /// Copy a ready response into `out` and hand the response area back.
    ///
    /// Returns `Ok(false)` if no response is ready.
    pub fn take_response(&self, out: &mut Vec<u8>) -> Result<bool> {
        if self.response_flag().load(Acquire) != ResponseState::Ready as u32 {
            return Ok(false);
        }

        let len = unsafe { addr_of!((*self.layout).response_size).read() } as usize;
        if len > MAILBOX_CAPACITY {
            self.response_flag()
                .store(ResponseState::NotReady as u32, Release);
            return Err(MailboxError::ProtocolViolation(format!(
                "response size {} exceeds capacity {}",
                len, MAILBOX_CAPACITY
            )));
        }

        out.clear();
        out.extend_from_slice(unsafe {
            std::slice::from_raw_parts(addr_of!((*self.layout).response_buffer) as *const u8, len)
        });

        self.response_flag()
            .store(ResponseState::NotReady as u32, Release);
        Ok(true)
    }

    // ---------------------------------------------------------------------
    // Worker side
    // ---------------------------------------------------------------------

    /// Sequence id of an actionable request, if any.
    ///
    /// A pending request whose sequence equals `last_completed` has already
    /// been serviced and is not actionable.
    pub fn poll_request(&self, last_completed: Option<u32>) -> Option<u32> {
        if self.request_flag().load(Acquire) != RequestState::Pending as u32 {
            return None;
        }
        let seq = self.sequence_id().load(Acquire);
        if last_completed == Some(seq) {
            return None;
        }
        Some(seq)
    }

    /// Whether a pending request carries an already-completed sequence.
    pub fn is_duplicate(&self, last_completed: Option<u32>) -> bool {
        last_completed.is_some()
            && self.request_flag().load(Acquire) == RequestState::Pending as u32
            && Some(self.sequence_id().load(Acquire)) == last_completed
    }

    /// Move a pending request to processing. Returns false if it was not pending.
    pub fn claim(&self) -> bool {
        let claimed = self
            .request_flag()
            .compare_exchange(
                RequestState::Pending as u32,
                RequestState::Processing as u32,
                AcqRel,
                Acquire,
            )
            .is_ok();
        if claimed {
            let stamp = now_micros();
            unsafe { addr_of_mut!((*self.layout).last_request_time).write_volatile(stamp) };
        }
        claimed
    }

    /// Bytes of the claimed request.
    ///
    /// Only valid between [`claim`](Self::claim) and [`complete`](Self::complete).
    pub fn request_payload(&self) -> Result<&[u8]> {
        let len = unsafe { addr_of!((*self.layout).request_size).read() } as usize;
        if len > MAILBOX_CAPACITY {
            return Err(MailboxError::ProtocolViolation(format!(
                "request size {} exceeds capacity {}",
                len, MAILBOX_CAPACITY
            )));
        }
        Ok(unsafe {
            std::slice::from_raw_parts(addr_of!((*self.layout).request_buffer) as *const u8, len)
        })
    }

    /// Publish the response to the claimed request and release the request area.
    ///
    /// The handshake always completes. A response that does not fit is
    /// replaced by a protocol-violation error string and reported as
    /// `PayloadTooLarge`.
    pub fn complete(&self, response: &[u8]) -> Result<()> {
        let mut outcome = Ok(());
        let overflow;
        let response = if response.len() > MAILBOX_CAPACITY {
            outcome = Err(MailboxError::PayloadTooLarge {
                len: response.len(),
                capacity: MAILBOX_CAPACITY,
            });
            overflow = format!(
                "error: protocol violation: response of {} bytes exceeds capacity {}",
                response.len(),
                MAILBOX_CAPACITY
            );
            overflow.as_bytes()
        } else {
            response
        };

        unsafe {
            ptr::copy_nonoverlapping(
                response.as_ptr(),
                addr_of_mut!((*self.layout).response_buffer) as *mut u8,
                response.len(),
            );
            addr_of_mut!((*self.layout).response_size).write(response.len() as u32);
            addr_of_mut!((*self.layout).last_response_time).write_volatile(now_micros());

            // Wipe the consumed request while the worker still owns it
            let stale = addr_of!((*self.layout).request_size).read() as usize;
            let stale = stale.min(MAILBOX_CAPACITY);
            ptr::write_bytes(addr_of_mut!((*self.layout).request_buffer) as *mut u8, 0, stale);
            addr_of_mut!((*self.layout).request_size).write(0);
        }

        self.response_flag()
            .store(ResponseState::Ready as u32, Release);
        self.request_flag()
            .store(RequestState::Empty as u32, Release);
        outcome
    }
}
