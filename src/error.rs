//! Error types for the mailbox

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid mailbox name: {0:?}")]
    InvalidName(String),

    #[error("Mailbox {0} was never initialized by its creator")]
    NotInitialized(String),

    #[error("Mailbox layout version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Shared memory too small: expected at least {expected} bytes, got {actual}")]
    SegmentTooSmall { expected: usize, actual: usize },

    #[error("Payload too large ({len} > {capacity})")]
    PayloadTooLarge { len: usize, capacity: usize },

    #[error("A request is already in flight")]
    Busy,

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Parent liveness query failed: {0}")]
    LivenessQuery(String),

    #[error("Error setting Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

pub type Result<T> = std::result::Result<T, MailboxError>;

/// Failure raised while decoding or dispatching one command line.
///
/// These never escape the worker loop; they are rendered into the
/// response buffer as `error: ...` text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("request is not valid text")]
    Decode,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("{name} expects {expected} arguments, got {actual}")]
    Arity {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("{name} expects at least {min} arguments, got {actual}")]
    TooFewArguments {
        name: String,
        min: usize,
        actual: usize,
    },

    #[error("{name} argument {index}: expected {kind}, got '{token}'")]
    InvalidArgument {
        name: String,
        index: usize,
        kind: &'static str,
        token: String,
    },

    #[error("{name} failed: {message}")]
    Driver { name: String, message: String },

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}
