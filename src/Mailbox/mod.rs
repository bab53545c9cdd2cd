mod builder;
mod debug;
mod handshake;
mod region;
mod requester;
mod worker;

pub mod layout;

pub use builder::{RequesterBuilder, WorkerBuilder};
pub use handshake::now_micros;
pub use layout::{
    MailboxLayout, RequestState, ResponseState, DEFAULT_MAILBOX_NAME, MAILBOX_CAPACITY,
};
pub use region::Mailbox;
pub use requester::Requester;
pub use worker::{StopReason, Worker, WorkerStats};
