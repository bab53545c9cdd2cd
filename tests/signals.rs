// Ctrl+C handling. Kept in its own test binary because the handler is
// process-wide and can only be installed once.

#![cfg(target_os = "linux")]

mod common;

use std::path::Path;
use std::thread;

use common::{unique_name, ScriptedProbe};
use shm_mailbox::Core::ParentStatus;
use shm_mailbox::Core::SharedMemory::segment_path;
use shm_mailbox::{MailboxError, StopReason, Worker, WorkerBuilder};

fn worker(name: &str) -> Worker {
    WorkerBuilder::new()
        .with_name(name)
        .with_probe(Box::new(ScriptedProbe::always(ParentStatus::Running)))
        .build()
        .unwrap()
}

#[test]
fn test_ctrlc_stops_worker_and_second_handler_fails() {
    let mut first = worker(&unique_name("sigint"));
    first.stop_on_ctrlc().unwrap();

    // A second handler is refused; the worker still owns and removes its segment
    let name = unique_name("sigint_second");
    let second = worker(&name);
    assert!(matches!(second.stop_on_ctrlc(), Err(MailboxError::Signal(_))));
    drop(second);
    assert!(!Path::new(&segment_path(&name)).exists());

    let handle = thread::spawn(move || first.run());
    unsafe { libc::kill(std::process::id() as libc::pid_t, libc::SIGINT) };
    assert_eq!(handle.join().unwrap(), StopReason::Stopped);
}
