// src/Mailbox/worker.rs

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::layout::MAILBOX_CAPACITY;
use super::region::Mailbox;
use crate::error::{CommandError, MailboxError, Result};
use crate::handler::{error_response, CommandHandler};
use crate::Core::liveness::{Liveness, LivenessMonitor};
use crate::Core::pacing::PollPolicy;

/// Why [`Worker::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The parent process exited; the loop finished its current iteration.
    ParentExited,
    /// The parent's identifier stopped resolving; the loop returned at once.
    ParentVanished,
    /// The running flag was cleared from outside (signal handler, test).
    Stopped,
}

/// Counters kept by the poll loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Requests that went through the full handshake.
    pub serviced: u64,
    /// Of those, how many were answered with an error response.
    pub errors: u64,
    /// Completed sequences that were signaled pending again and skipped.
    pub duplicates_ignored: u64,
}

/// The worker side of the mailbox.
///
/// Owns the segment it created, the handler that turns requests into
/// responses, and the liveness monitor watching the parent. Everything runs on
/// the thread that calls [`run`](Self::run).
pub struct Worker {
    pub(crate) mailbox: Mailbox,
    handler: Box<dyn CommandHandler>,
    monitor: LivenessMonitor,
    policy: PollPolicy,
    running: Arc<AtomicBool>,
    last_completed: Option<u32>,
    scratch: Vec<u8>,
    stats: WorkerStats,
    diagnostics: bool,
    duplicate_reported: Option<u32>,
}

impl Worker {
    pub(crate) fn new(
        mailbox: Mailbox,
        handler: Box<dyn CommandHandler>,
        monitor: LivenessMonitor,
        policy: PollPolicy,
        diagnostics: bool,
    ) -> Self {
        Self {
            mailbox,
            handler,
            monitor,
            policy,
            running: Arc::new(AtomicBool::new(true)),
            last_completed: None,
            scratch: Vec::with_capacity(MAILBOX_CAPACITY),
            stats: WorkerStats::default(),
            diagnostics,
            duplicate_reported: None,
        }
    }

    /// Poll the mailbox and the parent until told to stop.
    ///
    /// A parent that exited clears the running flag and the loop ends at its
    /// next check; a parent that vanished ends the loop immediately.
    pub fn run(&mut self) -> StopReason {
        let mut pending = StopReason::Stopped;
        info!(
            name = self.mailbox.name(),
            policy = ?self.policy,
            "Starting mailbox processing loop"
        );

        let reason = loop {
            if !self.running.load(Ordering::Acquire) {
                break pending;
            }

            self.service_once();

            match self.monitor.check() {
                Liveness::Alive => {}
                Liveness::ParentVanished => {
                    self.running.store(false, Ordering::Release);
                    break StopReason::ParentVanished;
                }
                Liveness::ParentExited => {
                    self.running.store(false, Ordering::Release);
                    pending = StopReason::ParentExited;
                }
            }

            self.policy.pause();
        };

        info!(
            ?reason,
            serviced = self.stats.serviced,
            errors = self.stats.errors,
            duplicates_ignored = self.stats.duplicates_ignored,
            "Mailbox processing loop stopped"
        );
        reason
    }

    /// Service at most one request. Returns its sequence id if one was handled.
    ///
    /// Whatever the handler does (succeed, fail, panic), the handshake is
    /// completed so the requester is never left waiting.
    pub fn service_once(&mut self) -> Option<u32> {
        let seq = match self.mailbox.poll_request(self.last_completed) {
            Some(seq) => seq,
            None => {
                self.note_duplicate();
                return None;
            }
        };

        if !self.mailbox.claim() {
            return None;
        }

        self.scratch.clear();
        let outcome = match self.mailbox.request_payload() {
            Ok(request) => {
                if self.diagnostics {
                    debug!(seq, "Received request: {}", String::from_utf8_lossy(request));
                }
                let handler = &mut self.handler;
                let scratch = &mut self.scratch;
                panic::catch_unwind(AssertUnwindSafe(|| handler.handle(request, scratch)))
                    .unwrap_or_else(|payload| Err(CommandError::Panicked(panic_message(&*payload))))
            }
            Err(MailboxError::ProtocolViolation(detail)) => {
                Err(CommandError::ProtocolViolation(detail))
            }
            Err(e) => Err(CommandError::ProtocolViolation(e.to_string())),
        };

        if let Err(e) = outcome {
            if matches!(e, CommandError::Panicked(_)) {
                error!(seq, "{}", e);
            }
            self.stats.errors += 1;
            self.scratch.clear();
            self.scratch.extend_from_slice(error_response(&e).as_bytes());
        }

        if let Err(e) = self.mailbox.complete(&self.scratch) {
            warn!(seq, "{}", e);
            self.stats.errors += 1;
        }

        self.last_completed = Some(seq);
        self.stats.serviced += 1;
        Some(seq)
    }

    fn note_duplicate(&mut self) {
        if self.duplicate_reported != self.last_completed
            && self.mailbox.is_duplicate(self.last_completed)
        {
            self.duplicate_reported = self.last_completed;
            self.stats.duplicates_ignored += 1;
            debug!(seq = ?self.last_completed, "Ignoring already completed request");
        }
    }

    /// Flag shared with whoever may stop the loop from outside.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Stop the loop on Ctrl+C.
    ///
    /// Only one handler can be installed per process.
    pub fn stop_on_ctrlc(&self) -> Result<()> {
        let running = self.stop_handle();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })?;
        Ok(())
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats
    }

    pub fn last_completed(&self) -> Option<u32> {
        self.last_completed
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
