use std::sync::atomic::AtomicU32;

/// Capacity of each payload buffer in bytes.
pub const MAILBOX_CAPACITY: usize = 4096;

/// "MBX1", published last by the creator once the segment is initialized.
pub const MAILBOX_MAGIC: u32 = 0x4D42_5831;

/// Version of the binary layout below.
pub const MAILBOX_VERSION: u32 = 1;

/// Name both processes agree on when none is given.
pub const DEFAULT_MAILBOX_NAME: &str = "shm_mailbox";

/// States of `request_flag`.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestState {
    Empty = 0,
    Pending = 1,
    Processing = 2,
}

impl RequestState {
    #[inline]
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(RequestState::Empty),
            1 => Some(RequestState::Pending),
            2 => Some(RequestState::Processing),
            _ => None,
        }
    }
}

/// States of `response_flag`.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseState {
    NotReady = 0,
    Ready = 1,
}

impl ResponseState {
    #[inline]
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(ResponseState::NotReady),
            1 => Some(ResponseState::Ready),
            _ => None,
        }
    }
}

/// The mailbox as it sits in shared memory.
///
/// Every offset is the same for 32-bit and 64-bit processes: the 64-bit
/// timestamps start on an 8-byte boundary and nothing in here is a pointer.
///
/// Ownership of the plain fields follows the flags:
/// - `request_size` / `request_buffer` belong to the requester while
///   `request_flag` is `Empty`, and to the worker otherwise.
/// - `response_size` / `response_buffer` belong to the worker until it
///   publishes `response_flag = Ready`, then to the requester until it
///   resets the flag.
#[repr(C, align(64))]
pub struct MailboxLayout {
    /// `MAILBOX_MAGIC` once the creator finished initialization.
    pub magic: AtomicU32,

    /// `MAILBOX_VERSION` of the creator.
    pub version: u32,

    /// 0 = empty, 1 = request pending, 2 = being processed.
    pub request_flag: AtomicU32,

    /// 0 = no response, 1 = response ready.
    pub response_flag: AtomicU32,

    /// Tag set by the requester for every new request.
    pub sequence_id: AtomicU32,

    /// Valid bytes in `request_buffer`.
    pub request_size: u32,

    /// Valid bytes in `response_buffer`.
    pub response_size: u32,

    pub reserved: u32,

    /// Microseconds since the Unix epoch when the last request was claimed.
    pub last_request_time: u64,

    /// Microseconds since the Unix epoch when the last response was published.
    pub last_response_time: u64,

    pub request_buffer: [u8; MAILBOX_CAPACITY],

    pub response_buffer: [u8; MAILBOX_CAPACITY],
}

const _: () = assert!(std::mem::size_of::<MailboxLayout>() == 8256);

impl MailboxLayout {
    /// Bytes a segment must hold to carry one mailbox.
    pub const SIZE: usize = std::mem::size_of::<MailboxLayout>();
}
