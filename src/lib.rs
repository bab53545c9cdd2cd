// Module naming follows project convention (Core = platform plumbing, Mailbox = protocol)
#![allow(non_snake_case)]

pub mod Core;
pub mod Debug;
pub mod Mailbox;
pub mod error;
pub mod ffi;
pub mod handler;

pub use error::{CommandError, MailboxError, Result};
pub use handler::{CapabilityTable, CommandHandler};
pub use Mailbox::{Requester, RequesterBuilder, StopReason, Worker, WorkerBuilder};
