use std::fmt;

use crate::Mailbox::{Mailbox, Requester, Worker};

/// Debug function for Mailbox
///
/// Shows the segment name, the creator/attacher role and a snapshot of the
/// handshake words. The payload buffers are never dereferenced.
pub fn debug_mailbox(mailbox: &Mailbox, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Mailbox")
        .field("name", &mailbox.name())
        .field("role", &mailbox.role())
        .field("layout", &format_args!("{:p}", mailbox.layout_ptr()))
        .field("request", &mailbox.request_state())
        .field("response", &mailbox.response_state())
        .field("sequence", &mailbox.sequence())
        .finish()
}

/// Debug function for Worker
pub fn debug_worker(worker: &Worker, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Worker")
        .field("mailbox", worker.mailbox())
        .field("policy", &worker.policy())
        .field("last_completed", &worker.last_completed())
        .field("stats", &worker.stats())
        .finish_non_exhaustive()
}

/// Debug function for Requester
pub fn debug_requester(requester: &Requester, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Requester")
        .field("mailbox", requester.mailbox())
        .field("timeout", &requester.timeout())
        .finish_non_exhaustive()
}
